use stash_core::UploadError;
use thiserror::Error;

/// Result type for storage operations
pub type BlobResult<T> = Result<T, BlobError>;

/// Errors that can occur while writing to or configuring a storage backend
#[derive(Error, Debug)]
pub enum BlobError {
    #[error("Invalid storage key: {key}")]
    InvalidKey { key: String },

    #[error("Object already exists: {key}")]
    AlreadyExists { key: String },

    #[error("Invalid storage configuration: {message}")]
    Invalid { message: String },

    #[error("Storage backend error: {message}")]
    Backend {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The object was written but the public-read step failed.
    #[error("Object could not be made public: {message}")]
    Visibility { message: String },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl BlobError {
    /// Create a backend error from any error type
    pub fn backend<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            message: error.to_string(),
            source: Some(Box::new(error)),
        }
    }

    /// Backend error carrying a pre-rendered message
    pub fn backend_message<E>(message: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            message: message.into(),
            source: Some(Box::new(error)),
        }
    }

    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    pub fn invalid_key<S: Into<String>>(key: S) -> Self {
        Self::InvalidKey { key: key.into() }
    }

    pub fn visibility<S: Into<String>>(message: S) -> Self {
        Self::Visibility {
            message: message.into(),
        }
    }
}

/// Any storage failure surfaces to the client as a failed write.
impl From<BlobError> for UploadError {
    fn from(err: BlobError) -> Self {
        UploadError::storage_write(err.to_string())
    }
}
