use stash_core::StorageKey;

use crate::{StorageLocation, Visibility};

/// Receipt returned after an upload has been written and its URL resolved
#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub key: StorageKey,
    pub url: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub original_filename: Option<String>,
    pub location: StorageLocation,
    pub visibility: Visibility,
}
