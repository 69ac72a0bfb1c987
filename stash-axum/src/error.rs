use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use stash_blob::BlobError;
use stash_core::UploadError;

/// Error side of the upload envelope: `{success: false, error}`.
#[derive(Debug)]
pub struct StashAxumError(pub UploadError);

impl From<UploadError> for StashAxumError {
    fn from(e: UploadError) -> Self {
        Self(e)
    }
}

impl From<BlobError> for StashAxumError {
    fn from(e: BlobError) -> Self {
        Self(e.into())
    }
}

impl IntoResponse for StashAxumError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(kind = self.0.kind().name(), error = %self.0, "upload failed");
        }

        let body = json!({
            "success": false,
            "error": self.0.to_string(),
        });
        let mut res = (status, Json(body)).into_response();

        if matches!(self.0, UploadError::MethodNotAllowed) {
            res.headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static("POST"));
        }
        res
    }
}
