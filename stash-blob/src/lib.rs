//! # stash-blob: storage backends for uploads
//!
//! `stash-blob` persists validated uploads and derives the public URL they are
//! served from. Two backends ship with the crate:
//!
//! - [`LocalFsStore`] writes under a dedicated uploads directory that the HTTP
//!   layer serves statically;
//! - [`S3CompatibleStore`] writes to a bucket under a fixed key prefix and asks
//!   the provider to make the object public-read.
//!
//! Which one runs is a deployment decision made once through
//! [`StorageSettings`]; request handling only ever sees `dyn UploadStore`.
//!
//! ```text
//! ┌──────────────────┐
//! │  HTTP handler    │  ← status + JSON envelope
//! ├──────────────────┤
//! │  UploadPipeline  │  ← parse → key → write → URL
//! ├──────────────────┤
//! │  UploadStore     │  ← local directory or bucket
//! └──────────────────┘
//! ```
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use stash_blob::{LocalFsStore, UploadPipeline};
//! use stash_core::UploadPolicy;
//!
//! # async fn run() -> stash_blob::BlobResult<()> {
//! let store = LocalFsStore::open("public/uploads", "/uploads").await?;
//! let pipeline = UploadPipeline::new(Arc::new(store), UploadPolicy::default());
//! # let _ = pipeline;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod local_store;
mod pipeline;
mod provider;
mod receipt;
mod s3_store;
pub mod store;

pub use config::{LocalConfig, StorageSettings};
pub use error::{BlobError, BlobResult};
pub use local_store::LocalFsStore;
pub use pipeline::UploadPipeline;
pub use provider::StoreProvider;
pub use receipt::StoredUpload;
pub use s3_store::{S3CompatibleStore, S3Config};
pub use store::{PutResult, StorageLocation, UploadStore, Visibility};

