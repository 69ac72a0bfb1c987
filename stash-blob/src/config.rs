use std::path::PathBuf;

use stash_core::StashConfigSnapshot;

use crate::{BlobError, BlobResult, S3Config};

/// Local uploads directory and the URL path it is served under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalConfig {
    pub root: PathBuf,
    pub public_prefix: String,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("public/uploads"),
            public_prefix: "/uploads".to_string(),
        }
    }
}

/// Backend selection, decided once per process
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageSettings {
    Local(LocalConfig),
    S3(S3Config),
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings::Local(LocalConfig::default())
    }
}

impl StorageSettings {
    /// Read `storage.backend` and the matching `storage.local.*` or
    /// `storage.s3.*` keys.
    pub fn from_config(config: &StashConfigSnapshot) -> BlobResult<Self> {
        let backend = config
            .get("storage.backend")
            .unwrap_or("local")
            .to_ascii_lowercase();

        match backend.as_str() {
            "local" | "fs" | "disk" => {
                let mut local = LocalConfig::default();
                if let Some(root) = config.get_string("storage.local.root") {
                    local.root = PathBuf::from(root);
                }
                if let Some(prefix) = config.get_string("storage.local.public_prefix") {
                    local.public_prefix = prefix;
                }
                Ok(StorageSettings::Local(local))
            }
            "s3" | "object" | "remote" => Ok(StorageSettings::S3(S3Config::from_config(config)?)),
            other => Err(BlobError::invalid(format!(
                "unknown storage.backend '{}', expected 'local' or 's3'",
                other
            ))),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            StorageSettings::Local(_) => "local",
            StorageSettings::S3(_) => "s3",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stash_core::StashConfig;

    #[test]
    fn defaults_to_local_public_uploads() {
        let settings = StorageSettings::from_config(&StashConfig::new().snapshot()).unwrap();
        assert_eq!(settings, StorageSettings::Local(LocalConfig::default()));
    }

    #[test]
    fn selects_s3_backend() {
        let mut config = StashConfig::new();
        config.set("storage.backend", "S3");
        config.set("storage.s3.bucket", "assets");
        let settings = StorageSettings::from_config(&config.snapshot()).unwrap();
        assert_eq!(settings.backend_name(), "s3");
    }

    #[test]
    fn unknown_backend_is_an_error() {
        let mut config = StashConfig::new();
        config.set("storage.backend", "ftp");
        assert!(StorageSettings::from_config(&config.snapshot()).is_err());
    }
}
