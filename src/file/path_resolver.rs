use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::{
    error::{
        static_cache_error::StaticCacheError,
        static_cache_error_enums::{PathResolutionError, StaticCacheErrorKind},
    },
    file::{
        file_cache::FileCache,
        file_record::FileRecord,
        normalized_path::{NormalizedPath, strip_query},
    },
    logging::syslog::trace,
};

const INDEX_DOCUMENT: &str = "index.html";

#[derive(Debug)]
pub enum ResolvedPath {
    // Already loaded, no filesystem access was needed
    Cached(Arc<FileRecord>),
    // A regular file on disk that is not cached yet
    OnDisk { key: String, full_path: PathBuf },
}

/// Maps request paths onto files below a canonicalized web root.
#[derive(Clone, Debug)]
pub struct PathResolver {
    prefix: String,
    web_root: PathBuf,
}

impl PathResolver {
    pub fn new(dir: &Path, prefix: &str) -> Result<Self, StaticCacheError> {
        let web_root = std::fs::canonicalize(dir)
            .map_err(|e| StaticCacheError::new(StaticCacheErrorKind::PathResolution(PathResolutionError::WebRoot(e)), dir.display().to_string()))?;
        if !web_root.is_dir() {
            return Err(StaticCacheError::new(
                StaticCacheErrorKind::PathResolution(PathResolutionError::WebRoot(std::io::Error::new(
                    std::io::ErrorKind::NotADirectory,
                    "web root is not a directory",
                ))),
                web_root.display().to_string(),
            ));
        }

        Ok(PathResolver {
            prefix: normalize_prefix(prefix),
            web_root,
        })
    }

    pub fn get_prefix(&self) -> &str {
        &self.prefix
    }

    pub fn get_web_root(&self) -> &Path {
        &self.web_root
    }

    /// Cheap check on the raw request path, done before any decoding.
    pub fn matches_prefix(&self, request_path: &str) -> bool {
        let raw_path = strip_query(request_path);
        if self.prefix == "/" {
            return raw_path.starts_with('/');
        }
        match raw_path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    // Key under which a file found by enumeration is cached
    pub fn cache_key_for(&self, relative_path: &str) -> String {
        let relative_path = relative_path.trim_start_matches('/');
        if self.prefix == "/" {
            format!("/{}", relative_path)
        } else {
            format!("{}/{}", self.prefix, relative_path)
        }
    }

    pub async fn resolve(&self, request_path: &str, cache: &FileCache) -> Result<ResolvedPath, StaticCacheError> {
        if !self.matches_prefix(request_path) {
            return Err(StaticCacheError::path(PathResolutionError::PrefixMismatch));
        }

        let mut normalized = NormalizedPath::new(request_path)?;
        // Normalization may have climbed out of the prefix, e.g. /static/../other
        let mut relative = normalized
            .strip_prefix(&self.prefix)
            .ok_or_else(|| StaticCacheError::path(PathResolutionError::PrefixMismatch))?;

        if normalized.is_hidden() {
            trace(format!("Declining hidden file: {}", normalized.as_str()));
            return Err(StaticCacheError::path(PathResolutionError::HiddenFile));
        }

        if let Some(record) = cache.get_cached(normalized.as_str()) {
            return Ok(ResolvedPath::Cached(record));
        }

        let index_candidate = self.web_root.join(relative.relative()).join(INDEX_DOCUMENT);
        let has_index = tokio::fs::metadata(&index_candidate).await.map(|m| m.is_file()).unwrap_or(false);
        if has_index {
            trace(format!("Using index document for {}", normalized.as_str()));
            normalized = normalized.join(INDEX_DOCUMENT);
            relative = relative.join(INDEX_DOCUMENT);
            if let Some(record) = cache.get_cached(normalized.as_str()) {
                return Ok(ResolvedPath::Cached(record));
            }
        }

        let full_path = self.web_root.join(relative.relative());
        if !full_path.starts_with(&self.web_root) {
            return Err(StaticCacheError::new(
                StaticCacheErrorKind::PathResolution(PathResolutionError::OutsideWebRoot),
                full_path.display().to_string(),
            ));
        }

        let metadata = match tokio::fs::metadata(&full_path).await {
            Ok(metadata) => metadata,
            Err(e) => {
                trace(format!("File not found on disk: {} ({})", full_path.display(), e));
                return Err(StaticCacheError::new(StaticCacheErrorKind::PathResolution(PathResolutionError::NotFound), full_path.display().to_string()));
            }
        };
        if !metadata.is_file() {
            return Err(StaticCacheError::new(StaticCacheErrorKind::PathResolution(PathResolutionError::NotAFile), full_path.display().to_string()));
        }

        Ok(ResolvedPath::OnDisk {
            key: normalized.as_str().to_string(),
            full_path,
        })
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}
