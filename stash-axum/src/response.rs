use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use stash_blob::StoredUpload;

/// Success side of the upload envelope.
///
/// `filename` is the generated storage key, not the name the client sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub url: String,
    pub filename: String,
    pub size: u64,
    pub mimetype: String,
}

impl From<StoredUpload> for UploadResponse {
    fn from(stored: StoredUpload) -> Self {
        Self {
            success: true,
            url: stored.url,
            filename: stored.key.into_string(),
            size: stored.size_bytes,
            mimetype: stored.mime_type,
        }
    }
}

impl IntoResponse for UploadResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}
