//! stash-core: transport-agnostic building blocks for file uploads.
//!
//! The crate knows nothing about HTTP servers or storage providers. It turns a
//! `multipart/form-data` byte stream into a single validated [`UploadedPart`],
//! and produces the [`StorageKey`] under which a backend should persist it.
//!
//! ```rust
//! use stash_core::{KeyStrategy, TimestampKeyStrategy, UploadPolicy};
//!
//! let policy = UploadPolicy::default();
//! assert!(policy.check("image/png", 1024).is_ok());
//! assert!(policy.check("application/x-msdownload", 1).is_err());
//!
//! let key = TimestampKeyStrategy.generate(Some("../../etc/passwd"));
//! assert!(!key.as_str().contains('/'));
//! ```

pub mod config;
pub mod errors;
pub mod keys;
pub mod multipart;
pub mod part;
pub mod phase;
pub mod policy;

pub use config::{StashConfig, StashConfigSnapshot};
pub use errors::{ErrorKind, UploadError, UploadResult};
pub use keys::{sanitize_filename, KeyStrategy, StorageKey, TimestampKeyStrategy};
pub use multipart::MultipartStreamParser;
pub use part::UploadedPart;
pub use phase::{PhaseTracker, UploadPhase};
pub use policy::UploadPolicy;
