use bytes::Bytes;

/// A decoded file part that passed the upload policy.
#[derive(Debug, Clone)]
pub struct UploadedPart {
    pub field_name: String,
    /// As sent by the client. Never use it as a path.
    pub original_filename: Option<String>,
    pub mime_type: String,
    pub payload: Bytes,
    pub size: u64,
}
