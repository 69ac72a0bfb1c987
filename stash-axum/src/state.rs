use std::sync::Arc;

use stash_blob::UploadPipeline;

/// Shared state handed to the upload route
#[derive(Clone)]
pub struct StashAxumState {
    pub pipeline: Arc<UploadPipeline>,
}

impl StashAxumState {
    pub fn new(pipeline: UploadPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}
