use bytes::Bytes;
use futures::Stream;
use std::sync::Arc;
use tracing::{error, info, warn};

use stash_core::{
    KeyStrategy, MultipartStreamParser, PhaseTracker, TimestampKeyStrategy, UploadError,
    UploadPhase, UploadPolicy, UploadResult, UploadedPart,
};

use crate::{StoredUpload, UploadStore, Visibility};

/// Wires the parser, key strategy and storage backend into one request flow:
/// parse and validate, generate a key, write, resolve the public URL.
///
/// Nothing is written unless the whole body parsed and the part passed the
/// policy.
#[derive(Clone)]
pub struct UploadPipeline {
    store: Arc<dyn UploadStore>,
    keys: Arc<dyn KeyStrategy>,
    parser: MultipartStreamParser,
}

impl UploadPipeline {
    pub fn new(store: Arc<dyn UploadStore>, policy: UploadPolicy) -> Self {
        Self {
            store,
            keys: Arc::new(TimestampKeyStrategy),
            parser: MultipartStreamParser::new(policy),
        }
    }

    /// Replace the default `{millis}-{random}-{name}` key strategy
    pub fn with_key_strategy<K: KeyStrategy + 'static>(mut self, keys: K) -> Self {
        self.keys = Arc::new(keys);
        self
    }

    pub fn policy(&self) -> &UploadPolicy {
        self.parser.policy()
    }

    pub fn store(&self) -> &Arc<dyn UploadStore> {
        &self.store
    }

    /// Run one upload request from raw body to stored object.
    pub async fn ingest<S, O, E>(
        &self,
        request_id: &str,
        content_type: Option<&str>,
        body: S,
    ) -> UploadResult<StoredUpload>
    where
        S: Stream<Item = Result<O, E>> + Send + 'static,
        O: Into<Bytes> + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
    {
        let mut phases = PhaseTracker::new(request_id);
        phases.advance(UploadPhase::Parsing);

        let read = self.parser.read_first_file(content_type, body, &mut phases);
        let part = match read.await {
            Ok(part) => part,
            Err(e) => {
                phases.fail();
                info!(request_id, error = %e, "upload rejected");
                return Err(e);
            }
        };
        phases.advance(UploadPhase::Validating);

        self.store_part(part, &mut phases).await
    }

    /// Persist an already validated part.
    pub async fn store_part(
        &self,
        part: UploadedPart,
        phases: &mut PhaseTracker,
    ) -> UploadResult<StoredUpload> {
        let key = self.keys.generate(part.original_filename.as_deref());
        if !phases.advance(UploadPhase::Writing) {
            return Err(UploadError::internal("upload is not ready to be written"));
        }

        let put = match self.store.write(&key, part.payload, &part.mime_type).await {
            Ok(put) => put,
            Err(e) => {
                phases.fail();
                error!(
                    key = %key,
                    backend = self.store.backend_name(),
                    error = %e,
                    "storage write failed"
                );
                return Err(e.into());
            }
        };

        let url = match self.store.public_url(&put.location) {
            Ok(url) => url,
            Err(e) => {
                phases.fail();
                error!(key = %key, error = %e, "could not resolve public URL, removing object");
                if let Err(cleanup) = self.store.delete(&put.location).await {
                    warn!(key = %key, error = %cleanup, "failed to remove unresolvable object");
                }
                return Err(e.into());
            }
        };

        if put.visibility == Visibility::Unconfirmed {
            warn!(key = %key, url = %url, "returning URL for an object not confirmed public");
        }

        phases.advance(UploadPhase::Resolved);
        info!(
            key = %key,
            size = part.size,
            mime_type = %part.mime_type,
            backend = self.store.backend_name(),
            "upload stored"
        );

        Ok(StoredUpload {
            key,
            url,
            size_bytes: part.size,
            mime_type: part.mime_type,
            original_filename: part.original_filename,
            location: put.location,
            visibility: put.visibility,
        })
    }
}
