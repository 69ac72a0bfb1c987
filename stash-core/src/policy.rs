use crate::{StashConfigSnapshot, UploadError, UploadResult};

/// Type and size rules applied to an upload while it is being read.
///
/// The policy is immutable once built and shared by every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    allowed_types: Vec<String>,
    max_file_bytes: u64,
    max_total_bytes: u64,
}

impl UploadPolicy {
    pub const DEFAULT_ALLOWED_TYPES: &'static [&'static str] =
        &["image/jpeg", "image/png", "image/webp", "image/svg+xml"];
    pub const DEFAULT_MAX_FILE_BYTES: u64 = 20 * 1024 * 1024; // 20MB

    /// Headroom for multipart framing and discarded fields on top of the file ceiling.
    const TOTAL_HEADROOM_BYTES: u64 = 1024 * 1024;

    pub fn new() -> Self {
        Self::default()
    }

    /// Policy with no allowed types; add them with [`UploadPolicy::allow_type`].
    pub fn empty(max_file_bytes: u64) -> Self {
        Self {
            allowed_types: Vec::new(),
            max_file_bytes,
            max_total_bytes: max_file_bytes.saturating_add(Self::TOTAL_HEADROOM_BYTES),
        }
    }

    /// Read `upload.*` keys, falling back to the defaults for anything missing.
    pub fn from_config(config: &StashConfigSnapshot) -> Self {
        let max_file_bytes = config
            .get_u64("upload.max_file_bytes")
            .unwrap_or(Self::DEFAULT_MAX_FILE_BYTES);

        let mut policy = Self::empty(max_file_bytes);
        match config.get_list("upload.allowed_types") {
            Some(types) if !types.is_empty() => {
                for mime in types {
                    policy = policy.allow_type(&mime);
                }
            }
            _ => {
                for mime in Self::DEFAULT_ALLOWED_TYPES {
                    policy = policy.allow_type(mime);
                }
            }
        }
        if let Some(total) = config.get_u64("upload.max_total_bytes") {
            policy = policy.with_max_total_bytes(total);
        }
        policy
    }

    pub fn allow_type(mut self, mime_type: &str) -> Self {
        let mime = essence(mime_type);
        if !mime.is_empty() && !self.allowed_types.contains(&mime) {
            self.allowed_types.push(mime);
        }
        self
    }

    /// Set the per-file ceiling. The body ceiling is raised with it so a file
    /// exactly at the limit still fits once multipart framing is counted.
    pub fn with_max_file_bytes(mut self, bytes: u64) -> Self {
        self.max_file_bytes = bytes;
        self.max_total_bytes = self.max_total_bytes.max(self.min_total_bytes());
        self
    }

    /// Never below the file ceiling plus framing headroom.
    pub fn with_max_total_bytes(mut self, bytes: u64) -> Self {
        self.max_total_bytes = bytes.max(self.min_total_bytes());
        self
    }

    fn min_total_bytes(&self) -> u64 {
        let file = self.max_file_bytes;
        file.saturating_add(Self::TOTAL_HEADROOM_BYTES)
    }

    pub fn allowed_types(&self) -> &[String] {
        &self.allowed_types
    }

    pub fn max_file_bytes(&self) -> u64 {
        self.max_file_bytes
    }

    pub fn max_total_bytes(&self) -> u64 {
        self.max_total_bytes
    }

    pub fn allows(&self, mime_type: &str) -> bool {
        let mime = essence(mime_type);
        self.allowed_types.iter().any(|allowed| *allowed == mime)
    }

    pub fn check_type(&self, mime_type: &str) -> UploadResult<()> {
        if self.allows(mime_type) {
            return Ok(());
        }
        let allowed: Vec<&str> = self.allowed_types.iter().map(String::as_str).collect();
        Err(UploadError::invalid_type(essence(mime_type), &allowed))
    }

    pub fn check_size(&self, running_size: u64) -> UploadResult<()> {
        if running_size > self.max_file_bytes {
            return Err(UploadError::payload_too_large(self.max_file_bytes));
        }
        Ok(())
    }

    /// Accept or reject a part given its type and the bytes seen so far.
    ///
    /// Called once per chunk, so an oversized part is rejected as soon as the
    /// running size crosses the ceiling.
    pub fn check(&self, mime_type: &str, running_size: u64) -> UploadResult<()> {
        self.check_type(mime_type)?;
        self.check_size(running_size)
    }
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self::DEFAULT_ALLOWED_TYPES
            .iter()
            .fold(Self::empty(Self::DEFAULT_MAX_FILE_BYTES), |policy, mime| {
                policy.allow_type(mime)
            })
    }
}

/// `image/PNG; charset=binary` -> `image/png`
fn essence(mime_type: &str) -> String {
    mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
