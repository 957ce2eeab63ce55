use crate::error::static_cache_error::StaticCacheError;
use crate::error::static_cache_error_enums::PathResolutionError;
use crate::logging::syslog::debug;

/// A request path that has been query-stripped, percent-decoded once and
/// lexically normalized. Always rooted (`/`-prefixed) and never ends with a
/// slash, except for the root itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizedPath {
    path: String,
}

impl NormalizedPath {
    pub fn new(request_path: &str) -> Result<Self, StaticCacheError> {
        let raw_path = strip_query(request_path);

        let decoded = Self::decode(raw_path).map_err(|e| {
            debug(format!("Failed to decode request path '{}'", raw_path));
            e
        })?;
        Self::check_characters(&decoded)?;

        let path = Self::normalize_segments(&decoded)?;
        Ok(NormalizedPath { path })
    }

    pub fn as_str(&self) -> &str {
        &self.path
    }

    pub fn is_root(&self) -> bool {
        self.path == "/"
    }

    // Last segment, empty for the root
    pub fn basename(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or("")
    }

    pub fn is_hidden(&self) -> bool {
        self.basename().starts_with('.')
    }

    /// The path with the leading separator stripped, suitable for joining
    /// onto a directory.
    pub fn relative(&self) -> &str {
        self.path.trim_start_matches('/')
    }

    pub fn join(&self, segment: &str) -> NormalizedPath {
        let segment = segment.trim_matches('/');
        if self.is_root() {
            NormalizedPath { path: format!("/{}", segment) }
        } else {
            NormalizedPath { path: format!("{}/{}", self.path, segment) }
        }
    }

    /// Returns the part of this path below `prefix`, or `None` if the path
    /// is not under it. The prefix match is segment-wise, `/static` does
    /// not own `/staticfoo`.
    pub fn strip_prefix(&self, prefix: &str) -> Option<NormalizedPath> {
        if prefix == "/" {
            return Some(self.clone());
        }
        if self.path == prefix {
            return Some(NormalizedPath { path: "/".to_string() });
        }
        self.path
            .strip_prefix(prefix)
            .filter(|rest| rest.starts_with('/'))
            .map(|rest| NormalizedPath { path: rest.to_string() })
    }

    // Single pass percent-decoding, malformed escapes are a failure rather than kept literally
    fn decode(path: &str) -> Result<String, StaticCacheError> {
        let bytes = path.as_bytes();
        for (idx, byte) in bytes.iter().enumerate() {
            if *byte == b'%' {
                let valid = bytes.get(idx + 1).is_some_and(u8::is_ascii_hexdigit) && bytes.get(idx + 2).is_some_and(u8::is_ascii_hexdigit);
                if !valid {
                    return Err(StaticCacheError::path(PathResolutionError::DecodeFailure));
                }
            }
        }

        urlencoding::decode(path)
            .map(|decoded| decoded.into_owned())
            .map_err(|_| StaticCacheError::path(PathResolutionError::DecodeFailure))
    }

    fn check_characters(path: &str) -> Result<(), StaticCacheError> {
        for ch in path.chars() {
            if ch.is_control() || ch == '\\' {
                return Err(StaticCacheError::path(PathResolutionError::InvalidCharacters));
            }

            // Confusable slashes and dots
            if matches!(
                ch,
                '\u{2215}' | // ∕ division slash
                '\u{2044}' | // ⁄ fraction slash
                '\u{FF0F}' | // ／ fullwidth solidus
                '\u{29F8}' | // ⧸ big solidus
                '\u{FF0E}' | // ． fullwidth full stop
                '\u{2024}' // ․ one dot leader
            ) {
                return Err(StaticCacheError::path(PathResolutionError::InvalidCharacters));
            }
        }
        Ok(())
    }

    // Collapse empty and "." segments and resolve ".." lexically, never climbing above the root
    fn normalize_segments(path: &str) -> Result<String, StaticCacheError> {
        let mut parts: Vec<&str> = Vec::new();
        for part in path.split('/') {
            match part {
                "" | "." => continue,
                ".." => {
                    if parts.pop().is_none() {
                        return Err(StaticCacheError::path(PathResolutionError::Traversal));
                    }
                }
                _ => parts.push(part),
            }
        }

        Ok(format!("/{}", parts.join("/")))
    }
}

// Query strings and fragments never take part in file lookup
pub fn strip_query(request_path: &str) -> &str {
    let end = request_path.find(['?', '#']).unwrap_or(request_path.len());
    &request_path[..end]
}
