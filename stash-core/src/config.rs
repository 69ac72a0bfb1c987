//! # Configuration
//!
//! stash uses a flat string key/value store for deployment settings. Values
//! are loaded once at startup, frozen into a [`StashConfigSnapshot`], and read
//! through typed getters when the server builds its policy and backend.
//!
//! ```rust
//! use stash_core::StashConfig;
//!
//! let mut config = StashConfig::new();
//! config.set("upload.max_file_bytes", "1048576");
//! config.set("upload.allowed_types", "image/png, image/jpeg");
//!
//! let snapshot = config.snapshot();
//! assert_eq!(snapshot.get_u64("upload.max_file_bytes"), Some(1_048_576));
//! assert_eq!(snapshot.get_list("upload.allowed_types").unwrap().len(), 2);
//! ```
//!
//! ## Environment overrides
//!
//! [`StashConfig::from_env`] maps prefixed variables onto dotted keys, with a
//! double underscore as the separator:
//!
//! ```bash
//! export STASH__STORAGE__BACKEND=s3   # storage.backend = "s3"
//! ```

use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct StashConfig {
    values: HashMap<String, String>,
}

impl StashConfig {
    /// Create an empty config store.
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Build a config from every environment variable starting with `prefix`.
    pub fn from_env(prefix: &str) -> Self {
        Self::from_vars(prefix, std::env::vars())
    }

    /// Same as [`StashConfig::from_env`], over an explicit variable list.
    pub fn from_vars<I>(prefix: &str, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut config = Self::new();
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(prefix) {
                let normalized = stripped.to_lowercase().replace("__", ".");
                config.set(normalized, value);
            }
        }
        config
    }

    /// Set a configuration key to a string value.
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    /// Set a key only when it is not present yet.
    pub fn set_default<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        let entry = self.values.entry(key.into());
        entry.or_insert_with(|| value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn snapshot(&self) -> StashConfigSnapshot {
        StashConfigSnapshot::new(self.values.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct StashConfigSnapshot {
    map: HashMap<String, String>,
}

impl StashConfigSnapshot {
    pub(crate) fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map
            .get(key)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).map(str::to_string)
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.parse::<usize>().ok())
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.parse::<u64>().ok())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.parse::<bool>().ok())
    }

    /// Comma separated list, empty items dropped.
    pub fn get_list(&self, key: &str) -> Option<Vec<String>> {
        self.get(key).map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
    }
}
