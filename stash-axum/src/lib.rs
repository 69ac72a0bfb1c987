//! stash-axum: Axum adapter for stash uploads.
//!
//! Exposes the upload route, the JSON envelope every upload request answers
//! with, and a small router builder that adds request ids, tracing, CORS and
//! static serving of stored files.

pub mod app;
pub mod response;
pub mod state;
pub mod upload;
mod error;
pub use error::StashAxumError;
pub use response::UploadResponse;
pub use state::StashAxumState;

pub use app::{axum, AxumApp};
