use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;

use stash_core::StorageKey;

use crate::BlobResult;

/// Where a backend put an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageLocation {
    /// File under the local uploads directory.
    Local { key: StorageKey, path: PathBuf },
    /// Object inside a bucket. `object_key` includes the backend's key prefix.
    Object {
        key: StorageKey,
        bucket: String,
        object_key: String,
    },
}

impl StorageLocation {
    pub fn key(&self) -> &StorageKey {
        match self {
            StorageLocation::Local { key, .. } | StorageLocation::Object { key, .. } => key,
        }
    }
}

/// Whether the backend confirmed the object is publicly readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    /// The public-read step failed; the URL may not resolve yet.
    Unconfirmed,
}

/// Result of a successful write
#[derive(Debug, Clone)]
pub struct PutResult {
    pub location: StorageLocation,
    pub size_bytes: u64,
    pub etag: Option<String>,
    pub visibility: Visibility,
}

/// Storage operations every upload backend implements
#[async_trait]
pub trait UploadStore: Send + Sync {
    /// Persist `bytes` under `key`. Either the whole object becomes reachable
    /// or nothing does.
    async fn write(
        &self,
        key: &StorageKey,
        bytes: Bytes,
        mime_type: &str,
    ) -> BlobResult<PutResult>;

    /// Public URL for a location this backend produced.
    fn public_url(&self, location: &StorageLocation) -> BlobResult<String>;

    /// Remove an object, used to roll back a write that cannot be published.
    async fn delete(&self, location: &StorageLocation) -> BlobResult<()>;

    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;
}
