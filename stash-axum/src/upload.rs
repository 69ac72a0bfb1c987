use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Method},
    routing, Router,
};
use stash_core::UploadError;

use crate::{StashAxumError, StashAxumState, UploadResponse};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Router with the upload handler mounted at `path` for every method;
/// anything but `POST` answers 405 inside the envelope.
pub fn upload_router(path: &str, state: StashAxumState) -> Router<()> {
    Router::new()
        .route(path, routing::any(upload))
        .with_state(state)
}

pub async fn upload(
    State(state): State<StashAxumState>,
    method: Method,
    headers: HeaderMap,
    body: Body,
) -> Result<UploadResponse, StashAxumError> {
    if method != Method::POST {
        return Err(UploadError::MethodNotAllowed.into());
    }

    let request_id = headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());

    let stored = state
        .pipeline
        .ingest(&request_id, content_type, body.into_data_stream())
        .await?;

    Ok(stored.into())
}
