use rand::Rng;

/// Longest sanitized filename kept as a key suffix.
const MAX_SUFFIX_LEN: usize = 100;
const MAX_KEY_LEN: usize = 255;

/// Unique, path-safe identifier for one stored object.
///
/// A key is a single path segment made of ASCII letters, digits, `.`, `-` and
/// `_`. It never contains a separator or a `..` sequence, so joining it onto a
/// storage root cannot escape that root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey(String);

impl StorageKey {
    /// Validate an existing key string.
    pub fn parse(raw: &str) -> Option<Self> {
        if is_safe_segment(raw) {
            Some(Self(raw.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for StorageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for StorageKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Strategy for generating storage keys
pub trait KeyStrategy: Send + Sync {
    fn generate(&self, original_filename: Option<&str>) -> StorageKey;
}

/// `{millis}-{random}[-{sanitized filename}]`
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampKeyStrategy;

impl KeyStrategy for TimestampKeyStrategy {
    fn generate(&self, original_filename: Option<&str>) -> StorageKey {
        let millis = chrono::Utc::now().timestamp_millis();
        let nonce: u32 = rand::thread_rng().gen_range(0..1_000_000_000);

        let key = match original_filename.and_then(sanitize_filename) {
            Some(suffix) => format!("{}-{}-{}", millis, nonce, suffix),
            None => format!("{}-{}", millis, nonce),
        };
        StorageKey(key)
    }
}

/// Reduce an untrusted client filename to a safe key suffix.
///
/// Whitespace runs become a single `_`, separators and characters outside
/// `[A-Za-z0-9._-]` are dropped, `..` runs collapse to `.` and leading dots are
/// removed. The extension is kept when the name has to be shortened. Returns
/// `None` when nothing usable is left.
pub fn sanitize_filename(raw: &str) -> Option<String> {
    let mut cleaned = String::with_capacity(raw.len());
    let mut in_whitespace = false;

    for ch in raw.chars() {
        if ch.is_whitespace() {
            if !in_whitespace {
                cleaned.push('_');
                in_whitespace = true;
            }
            continue;
        }
        in_whitespace = false;

        if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') {
            cleaned.push(ch);
        }
    }

    while cleaned.contains("..") {
        cleaned = cleaned.replace("..", ".");
    }

    let cleaned = cleaned.trim_start_matches('.').trim_end_matches('.');
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '_' || c == '-') {
        return None;
    }

    Some(truncate_keeping_extension(cleaned, MAX_SUFFIX_LEN))
}

// Input is ASCII only at this point, so byte slicing is safe.
fn truncate_keeping_extension(name: &str, max: usize) -> String {
    if name.len() <= max {
        return name.to_string();
    }
    match name.rfind('.') {
        Some(dot) if name.len() - dot <= 16 => {
            let ext = &name[dot..];
            format!("{}{}", &name[..max - ext.len()], ext)
        }
        _ => name[..max].to_string(),
    }
}

fn is_safe_segment(raw: &str) -> bool {
    !raw.is_empty()
        && raw.len() <= MAX_KEY_LEN
        && !raw.starts_with('.')
        && !raw.contains("..")
        && raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
}
