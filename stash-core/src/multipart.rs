//! # Streaming multipart parser
//!
//! Decodes a `multipart/form-data` body as it arrives and returns the first
//! file-bearing part. The upload policy is applied while reading:
//!
//! - the content type is checked as soon as the part headers are decoded,
//!   before any of its payload is pulled from the stream;
//! - the running size is checked on every chunk, and the read stops at the
//!   first chunk that crosses the ceiling.
//!
//! Parts after the first file (and text fields before it) are drained and
//! discarded so the client always sees its whole body consumed. Draining is
//! bounded by the policy's total body ceiling. The whole body is read before
//! the part is handed back, so a malformed tail rejects the request before
//! anything is stored.

use bytes::{Bytes, BytesMut};
use futures::Stream;
use multer::{Constraints, Multipart, SizeLimit};
use tracing::debug;

use crate::{PhaseTracker, UploadError, UploadPhase, UploadPolicy, UploadResult, UploadedPart};

const FALLBACK_MIME: &str = "application/octet-stream";

#[derive(Debug, Clone)]
pub struct MultipartStreamParser {
    policy: UploadPolicy,
}

impl MultipartStreamParser {
    pub fn new(policy: UploadPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    /// Extract the boundary from a `Content-Type` header value.
    pub fn boundary(content_type: Option<&str>) -> UploadResult<String> {
        let content_type = content_type
            .ok_or_else(|| UploadError::parse("missing Content-Type header"))?;

        if !content_type
            .trim_start()
            .to_ascii_lowercase()
            .starts_with("multipart/form-data")
        {
            return Err(UploadError::parse(format!(
                "expected multipart/form-data, got '{}'",
                content_type
            )));
        }

        multer::parse_boundary(content_type).map_err(|e| UploadError::parse(e.to_string()))
    }

    /// Read `body` to the end and return the first valid file part.
    pub async fn first_file<S, O, E>(
        &self,
        content_type: Option<&str>,
        body: S,
    ) -> UploadResult<UploadedPart>
    where
        S: Stream<Item = Result<O, E>> + Send + 'static,
        O: Into<Bytes> + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
    {
        let mut phases = PhaseTracker::new("parser");
        phases.advance(UploadPhase::Parsing);
        self.read_first_file(content_type, body, &mut phases).await
    }

    /// Like [`MultipartStreamParser::first_file`], reporting phase changes to
    /// the caller's tracker. The tracker is left in `Parsing` on success.
    pub async fn read_first_file<S, O, E>(
        &self,
        content_type: Option<&str>,
        body: S,
        phases: &mut PhaseTracker,
    ) -> UploadResult<UploadedPart>
    where
        S: Stream<Item = Result<O, E>> + Send + 'static,
        O: Into<Bytes> + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
    {
        let boundary = Self::boundary(content_type)?;
        let max_total = self.policy.max_total_bytes();

        // multer buffers whatever the transport has ready; cap that buffer too.
        let constraints =
            Constraints::new().size_limit(SizeLimit::new().whole_stream(max_total));
        let mut multipart = Multipart::with_constraints(body, boundary, constraints);

        let mut total: u64 = 0;
        let mut chosen: Option<UploadedPart> = None;

        while let Some(mut field) = multipart.next_field().await.map_err(classify)? {
            let field_name = field.name().unwrap_or_default().to_string();
            let filename = field.file_name().map(str::to_string);

            if chosen.is_some() || filename.is_none() {
                let mut discarded: u64 = 0;
                while let Some(chunk) = field.chunk().await.map_err(classify)? {
                    discarded += chunk.len() as u64;
                    total += chunk.len() as u64;
                    if total > max_total {
                        return Err(UploadError::body_too_large(max_total));
                    }
                }
                debug!(field = %field_name, bytes = discarded, "discarded multipart field");
                continue;
            }

            phases.advance(UploadPhase::Validating);
            let mime_type = field
                .content_type()
                .map(|mime| mime.essence_str().to_string())
                .unwrap_or_else(|| FALLBACK_MIME.to_string());

            self.policy.check_type(&mime_type)?;

            let mut buffer = BytesMut::new();
            while let Some(chunk) = field.chunk().await.map_err(classify)? {
                let running = buffer.len() as u64 + chunk.len() as u64;
                self.policy.check(&mime_type, running)?;

                total += chunk.len() as u64;
                if total > max_total {
                    return Err(UploadError::body_too_large(max_total));
                }
                buffer.extend_from_slice(&chunk);
            }
            phases.advance(UploadPhase::Parsing);

            let payload = buffer.freeze();
            debug!(
                field = %field_name,
                mime_type = %mime_type,
                bytes = payload.len(),
                "accepted file part"
            );
            chosen = Some(UploadedPart {
                field_name,
                original_filename: filename,
                mime_type,
                size: payload.len() as u64,
                payload,
            });
        }

        chosen.ok_or(UploadError::MissingFile)
    }
}

/// Early end of input, including a failing transport, is `Incomplete`.
/// Everything else multer reports besides size limits is a framing problem.
fn classify(err: multer::Error) -> UploadError {
    match &err {
        multer::Error::StreamSizeExceeded { limit, .. } => UploadError::body_too_large(*limit),
        multer::Error::FieldSizeExceeded { limit, .. } => UploadError::payload_too_large(*limit),
        multer::Error::IncompleteStream
        | multer::Error::IncompleteHeaders
        | multer::Error::IncompleteFieldData { .. }
        | multer::Error::StreamReadFailed(_) => UploadError::incomplete(err.to_string()),
        _ => UploadError::parse(err.to_string()),
    }
}
