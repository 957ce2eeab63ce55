use std::fmt;

use crate::error::static_cache_error_enums::*;

/// Reason a request was not served by the static file handler.
///
/// None of these are failures of the server: the composition layer decides
/// what happens next, which for the terminal handler is a plain 404.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclineReason {
    NotOwned,
    NotFound,
    DecodeFailure,
    IoFailure,
}

#[derive(Debug)]
pub struct StaticCacheError {
    pub kind: StaticCacheErrorKind,
    pub message: String,
}

impl StaticCacheError {
    pub fn new(kind: StaticCacheErrorKind, message: String) -> Self {
        Self { kind, message }
    }

    pub fn new_with_kind_only(kind: StaticCacheErrorKind) -> Self {
        Self { kind, message: String::new() }
    }

    pub fn path(error: PathResolutionError) -> Self {
        Self::new_with_kind_only(StaticCacheErrorKind::PathResolution(error))
    }

    pub fn file_cache(error: FileCacheError, message: String) -> Self {
        Self::new(StaticCacheErrorKind::FileCache(error), message)
    }

    pub fn configuration(error: ConfigurationError, message: String) -> Self {
        Self::new(StaticCacheErrorKind::Configuration(error), message)
    }

    // Map every error onto the pass-through taxonomy used by the request handler
    pub fn decline_reason(&self) -> DeclineReason {
        match &self.kind {
            StaticCacheErrorKind::PathResolution(error) => match error {
                PathResolutionError::DecodeFailure => DeclineReason::DecodeFailure,
                PathResolutionError::NotFound | PathResolutionError::NotAFile => DeclineReason::NotFound,
                PathResolutionError::WebRoot(_) => DeclineReason::IoFailure,
                _ => DeclineReason::NotOwned,
            },
            StaticCacheErrorKind::FileCache(error) => match error {
                FileCacheError::Io(_) => DeclineReason::IoFailure,
                FileCacheError::NotAFile | FileCacheError::NotDiscoverable => DeclineReason::NotFound,
            },
            StaticCacheErrorKind::Compression(_) | StaticCacheErrorKind::Logging(_) => DeclineReason::IoFailure,
            StaticCacheErrorKind::Configuration(_) | StaticCacheErrorKind::Server(_) => DeclineReason::NotOwned,
        }
    }
}

impl fmt::Display for StaticCacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            StaticCacheErrorKind::Configuration(ConfigurationError::Invalid(errors)) => {
                write!(f, "Invalid configuration: {}", errors.join("; "))
            }
            kind if self.message.is_empty() => write!(f, "{:?}", kind),
            kind => write!(f, "{:?}: {}", kind, self.message),
        }
    }
}

impl std::error::Error for StaticCacheError {}
