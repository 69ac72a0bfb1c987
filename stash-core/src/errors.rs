//! # Upload errors
//!
//! Every way an upload request can fail is an [`UploadError`]. Each variant
//! belongs to an [`ErrorKind`], which fixes the HTTP status the transport layer
//! answers with. Client-class errors are always raised before any byte reaches
//! a storage backend.

use thiserror::Error;

/// Result type for upload operations.
pub type UploadResult<T> = std::result::Result<T, UploadError>;

/// Status class of an upload failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,       // 400
    MethodNotAllowed, // 405
    GeneralError,     // 500
}

impl ErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::MethodNotAllowed => 405,
            ErrorKind::GeneralError => 500,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "BadRequest",
            ErrorKind::MethodNotAllowed => "MethodNotAllowed",
            ErrorKind::GeneralError => "GeneralError",
        }
    }

    pub fn class_name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "bad-request",
            ErrorKind::MethodNotAllowed => "method-not-allowed",
            ErrorKind::GeneralError => "general-error",
        }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self, ErrorKind::BadRequest | ErrorKind::MethodNotAllowed)
    }
}

/// Errors produced while ingesting an upload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    /// Malformed boundary, headers or content type.
    #[error("Malformed multipart body: {message}")]
    Parse { message: String },

    /// The body ended (or the transport failed) before the closing boundary.
    #[error("Incomplete upload: {message}")]
    Incomplete { message: String },

    #[error("Invalid file type: {mime_type}. Allowed types: {allowed}")]
    InvalidType { mime_type: String, allowed: String },

    #[error("{message}")]
    PayloadTooLarge { limit: u64, message: String },

    #[error("No file uploaded")]
    MissingFile,

    #[error("Method Not Allowed")]
    MethodNotAllowed,

    /// The backend write itself failed. Nothing is reachable under the key.
    #[error("{message}")]
    StorageWrite { message: String },

    #[error("{message}")]
    Internal { message: String },
}

impl UploadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            UploadError::Parse { .. }
            | UploadError::Incomplete { .. }
            | UploadError::InvalidType { .. }
            | UploadError::PayloadTooLarge { .. }
            | UploadError::MissingFile => ErrorKind::BadRequest,
            UploadError::MethodNotAllowed => ErrorKind::MethodNotAllowed,
            UploadError::StorageWrite { .. } | UploadError::Internal { .. } => {
                ErrorKind::GeneralError
            }
        }
    }

    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }

    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub fn incomplete<S: Into<String>>(message: S) -> Self {
        Self::Incomplete {
            message: message.into(),
        }
    }

    pub fn invalid_type<S: Into<String>>(mime_type: S, allowed: &[&str]) -> Self {
        Self::InvalidType {
            mime_type: mime_type.into(),
            allowed: allowed.join(", "),
        }
    }

    /// The file part alone exceeded the per-file ceiling.
    pub fn payload_too_large(limit: u64) -> Self {
        Self::PayloadTooLarge {
            limit,
            message: format!("File too large (max {})", human_size(limit)),
        }
    }

    /// The whole body, discarded parts included, exceeded the request ceiling.
    pub fn body_too_large(limit: u64) -> Self {
        Self::PayloadTooLarge {
            limit,
            message: format!("Request body too large (max {})", human_size(limit)),
        }
    }

    pub fn storage_write<S: Into<String>>(message: S) -> Self {
        Self::StorageWrite {
            message: message.into(),
        }
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

const MIB: u64 = 1024 * 1024;

fn human_size(bytes: u64) -> String {
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else {
        format!("{} bytes", bytes)
    }
}
