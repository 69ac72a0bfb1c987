use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

use crate::{BlobResult, LocalFsStore, S3CompatibleStore, StorageSettings, UploadStore};

/// Builds the configured backend on first use and hands out the same
/// instance afterwards. Concurrent first callers wait for a single init.
pub struct StoreProvider {
    settings: StorageSettings,
    store: OnceCell<Arc<dyn UploadStore>>,
}

impl StoreProvider {
    pub fn new(settings: StorageSettings) -> Self {
        Self {
            settings,
            store: OnceCell::new(),
        }
    }

    pub fn settings(&self) -> &StorageSettings {
        &self.settings
    }

    /// A failed init is not cached; the next call tries again.
    pub async fn get(&self) -> BlobResult<Arc<dyn UploadStore>> {
        let store = self
            .store
            .get_or_try_init(|| async { build_store(&self.settings).await })
            .await?;
        Ok(Arc::clone(store))
    }
}

async fn build_store(settings: &StorageSettings) -> BlobResult<Arc<dyn UploadStore>> {
    let store: Arc<dyn UploadStore> = match settings {
        StorageSettings::Local(local) => {
            Arc::new(LocalFsStore::open(&local.root, &local.public_prefix).await?)
        }
        StorageSettings::S3(s3) => Arc::new(S3CompatibleStore::connect(s3.clone()).await),
    };
    info!(backend = store.backend_name(), "upload storage initialised");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LocalConfig;

    #[tokio::test]
    async fn initialises_once_and_reuses_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let provider = StoreProvider::new(StorageSettings::Local(LocalConfig {
            root: dir.path().join("uploads"),
            public_prefix: "/uploads".to_string(),
        }));

        let first = provider.get().await.unwrap();
        let second = provider.get().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.backend_name(), "local");
        assert!(dir.path().join("uploads").is_dir());
    }

    #[tokio::test]
    async fn concurrent_first_calls_share_one_instance() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(StoreProvider::new(StorageSettings::Local(LocalConfig {
            root: dir.path().join("uploads"),
            public_prefix: "/uploads".to_string(),
        })));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let provider = Arc::clone(&provider);
                tokio::spawn(async move { provider.get().await.unwrap() })
            })
            .collect();

        let mut stores = Vec::new();
        for task in tasks {
            stores.push(task.await.unwrap());
        }
        assert!(stores.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }
}
