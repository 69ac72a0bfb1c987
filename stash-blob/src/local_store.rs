use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use stash_core::StorageKey;

use crate::{BlobError, BlobResult, PutResult, StorageLocation, UploadStore, Visibility};

/// Stores uploads as files in one flat directory.
///
/// Files are written to a hidden temporary name first and linked into place,
/// so a failed write never leaves a reachable file behind and an existing
/// key is never replaced.
#[derive(Debug, Clone)]
pub struct LocalFsStore {
    root: PathBuf,
    public_prefix: String,
}

impl LocalFsStore {
    /// Create the uploads directory if needed and open the store.
    ///
    /// Safe to call repeatedly; an existing directory is reused.
    pub async fn open(
        root: impl Into<PathBuf>,
        public_prefix: impl Into<String>,
    ) -> BlobResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        let root = tokio::fs::canonicalize(&root).await?;

        let public_prefix = public_prefix.into().trim_end_matches('/').to_string();
        debug!(root = %root.display(), prefix = %public_prefix, "local upload store ready");

        Ok(Self { root, public_prefix })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a key to its file path, refusing anything outside the root.
    fn path_for(&self, key: &StorageKey) -> BlobResult<PathBuf> {
        let checked = StorageKey::parse(key.as_str())
            .ok_or_else(|| BlobError::invalid_key(key.as_str()))?;

        let path = self.root.join(checked.as_str());
        if path.parent() != Some(self.root.as_path()) {
            return Err(BlobError::invalid_key(key.as_str()));
        }
        Ok(path)
    }

    async fn write_temp(&self, temp: &Path, bytes: &[u8]) -> BlobResult<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(temp)
            .await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        Ok(())
    }
}

#[async_trait]
impl UploadStore for LocalFsStore {
    async fn write(
        &self,
        key: &StorageKey,
        bytes: Bytes,
        _mime_type: &str,
    ) -> BlobResult<PutResult> {
        let path = self.path_for(key)?;
        let temp = self
            .root
            .join(format!(".{}.{}.partial", key, uuid::Uuid::new_v4().simple()));

        // hard_link fails if `path` already exists, unlike rename.
        let written = match self.write_temp(&temp, &bytes).await {
            Ok(()) => tokio::fs::hard_link(&temp, &path).await.map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    BlobError::AlreadyExists {
                        key: key.to_string(),
                    }
                } else {
                    BlobError::from(e)
                }
            }),
            Err(e) => Err(e),
        };

        if let Err(cleanup) = tokio::fs::remove_file(&temp).await {
            if cleanup.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %temp.display(), error = %cleanup, "failed to remove partial upload");
            }
        }
        written?;

        Ok(PutResult {
            location: StorageLocation::Local {
                key: key.clone(),
                path,
            },
            size_bytes: bytes.len() as u64,
            etag: None,
            visibility: Visibility::Public,
        })
    }

    fn public_url(&self, location: &StorageLocation) -> BlobResult<String> {
        match location {
            StorageLocation::Local { key, .. } => Ok(format!("{}/{}", self.public_prefix, key)),
            StorageLocation::Object { .. } => Err(BlobError::invalid(
                "object-store location passed to the local backend",
            )),
        }
    }

    async fn delete(&self, location: &StorageLocation) -> BlobResult<()> {
        let path = self.path_for(location.key())?;
        tokio::fs::remove_file(path).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}
