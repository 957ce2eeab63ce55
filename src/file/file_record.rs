use base64::{Engine, engine::general_purpose::STANDARD};
use hyper::body::Bytes;
use md5::{Digest, Md5};
use parking_lot::RwLock;
use std::{
    path::{Path, PathBuf},
    time::SystemTime,
};
use tokio::sync::Mutex;

use crate::{
    error::{
        static_cache_error::StaticCacheError,
        static_cache_error_enums::{FileCacheError, StaticCacheErrorKind},
    },
    file::mime_types::lookup_mime_type,
    logging::syslog::trace,
};

// Base64 encoded MD5 of the content, used for both ETag and Content-MD5
pub fn compute_content_hash(content: &[u8]) -> String {
    STANDARD.encode(Md5::digest(content))
}

/// What is known about a file once it has been loaded.
///
/// `content_hash` and `compressed_content` always describe the bytes of the
/// current `generation`; a detected change on disk bumps the generation and
/// clears both.
#[derive(Clone, Debug)]
pub struct LoadedFile {
    pub length: u64,
    pub modified_at: SystemTime,
    pub content: Option<Bytes>,
    pub content_hash: Option<String>,
    pub compressed_content: Option<Bytes>,
    pub generation: u64,
}

#[derive(Debug)]
pub enum RecordState {
    Unloaded,
    Loaded(LoadedFile),
}

/// One cached file, keyed by its normalized request path.
///
/// Transitions: `Unloaded` -> `Loaded` on first load, hash cleared on a newer
/// modification time (streamed records only), hash filled in after the first
/// complete stream, compressed copy filled in on first compression of a
/// buffered record. Loads and compression are serialized by `load_gate`, the
/// state itself is only ever locked for short synchronous sections.
pub struct FileRecord {
    key: String,
    path: PathBuf,
    mime_type: String,
    max_age: u64,
    buffered: bool,
    state: RwLock<RecordState>,
    load_gate: Mutex<()>,
}

impl FileRecord {
    pub fn new(key: &str, path: &Path, max_age: u64, buffered: bool) -> Self {
        FileRecord {
            key: key.to_string(),
            path: path.to_path_buf(),
            mime_type: lookup_mime_type(path),
            max_age,
            buffered,
            state: RwLock::new(RecordState::Unloaded),
            load_gate: Mutex::new(()),
        }
    }

    pub fn get_key(&self) -> &str {
        &self.key
    }

    pub fn get_path(&self) -> &Path {
        &self.path
    }

    pub fn get_mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn get_max_age(&self) -> u64 {
        self.max_age
    }

    pub fn is_buffered(&self) -> bool {
        self.buffered
    }

    pub fn is_loaded(&self) -> bool {
        matches!(*self.state.read(), RecordState::Loaded(_))
    }

    pub fn snapshot(&self) -> Option<LoadedFile> {
        match &*self.state.read() {
            RecordState::Loaded(loaded) => Some(loaded.clone()),
            RecordState::Unloaded => None,
        }
    }

    // Loads the file once, concurrent callers wait for the first load instead of repeating it
    pub async fn ensure_loaded(&self) -> Result<LoadedFile, StaticCacheError> {
        if let Some(loaded) = self.snapshot() {
            return Ok(loaded);
        }

        let _gate = self.load_gate.lock().await;
        if let Some(loaded) = self.snapshot() {
            return Ok(loaded);
        }

        let loaded = self.read_from_disk().await?;
        trace(format!(
            "Loaded file {} from {} (length: {}, buffered: {})",
            self.key,
            self.path.display(),
            loaded.length,
            self.buffered
        ));
        self.set_state(RecordState::Loaded(loaded.clone()));
        Ok(loaded)
    }

    async fn read_from_disk(&self) -> Result<LoadedFile, StaticCacheError> {
        let metadata = tokio::fs::metadata(&self.path).await.map_err(|e| self.io_error(e))?;
        if !metadata.is_file() {
            return Err(StaticCacheError::file_cache(FileCacheError::NotAFile, self.path.display().to_string()));
        }
        let modified_at = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);

        if !self.buffered {
            // Hash is computed while the first full stream passes through
            return Ok(LoadedFile {
                length: metadata.len(),
                modified_at,
                content: None,
                content_hash: None,
                compressed_content: None,
                generation: 0,
            });
        }

        let content = Bytes::from(tokio::fs::read(&self.path).await.map_err(|e| self.io_error(e))?);
        let content_hash = {
            let content = content.clone();
            tokio::task::spawn_blocking(move || compute_content_hash(&content))
                .await
                .map_err(|e| self.io_error(std::io::Error::other(e)))?
        };
        Ok(LoadedFile {
            length: content.len() as u64,
            modified_at,
            content: Some(content),
            content_hash: Some(content_hash),
            compressed_content: None,
            generation: 0,
        })
    }

    /// Re-stats a streamed record and invalidates its hash when the file on
    /// disk is strictly newer. Buffered records are a frozen snapshot and are
    /// returned as is.
    pub async fn refresh_if_stale(&self) -> Result<LoadedFile, StaticCacheError> {
        let loaded = self.ensure_loaded().await?;
        if self.buffered {
            return Ok(loaded);
        }

        let metadata = tokio::fs::metadata(&self.path).await.map_err(|e| self.io_error(e))?;
        if !metadata.is_file() {
            return Err(StaticCacheError::file_cache(FileCacheError::NotAFile, self.path.display().to_string()));
        }
        let modified_at = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        if modified_at <= loaded.modified_at {
            return Ok(loaded);
        }

        Ok(self.apply_newer_metadata(metadata.len(), modified_at))
    }

    fn apply_newer_metadata(&self, length: u64, modified_at: SystemTime) -> LoadedFile {
        let mut state = self.state.write();
        match &mut *state {
            RecordState::Loaded(current) => {
                // Another request may already have applied the same or a newer change
                if modified_at > current.modified_at {
                    trace(format!("File {} changed on disk, invalidating its hash", self.key));
                    current.modified_at = modified_at;
                    current.length = length;
                    current.content_hash = None;
                    current.compressed_content = None;
                    current.generation += 1;
                }
                current.clone()
            }
            RecordState::Unloaded => {
                let loaded = LoadedFile {
                    length,
                    modified_at,
                    content: None,
                    content_hash: None,
                    compressed_content: None,
                    generation: 0,
                };
                *state = RecordState::Loaded(loaded.clone());
                loaded
            }
        }
    }

    /// Returns the cached compressed copy of a buffered record, compressing
    /// and caching it on first use. `None` for streamed records.
    pub async fn compressed_content_with<F>(&self, compress: F) -> Result<Option<Bytes>, StaticCacheError>
    where
        F: FnOnce(&[u8]) -> Result<Vec<u8>, std::io::Error> + Send + 'static,
    {
        let _gate = self.load_gate.lock().await;
        let loaded = match self.snapshot() {
            Some(loaded) => loaded,
            None => return Ok(None),
        };
        if let Some(compressed) = loaded.compressed_content {
            return Ok(Some(compressed));
        }
        let content = match loaded.content {
            Some(content) => content,
            None => return Ok(None),
        };

        let uncompressed = content.clone();
        let compressed = tokio::task::spawn_blocking(move || compress(&uncompressed))
            .await
            .map_err(std::io::Error::other)
            .and_then(|result| result)
            .map_err(|e| StaticCacheError::new(StaticCacheErrorKind::Compression(e), self.key.clone()))?;
        let compressed = Bytes::from(compressed);
        trace(format!("Compressed {} from {} to {} bytes", self.key, content.len(), compressed.len()));
        self.store_compressed(loaded.generation, compressed.clone());
        Ok(Some(compressed))
    }

    fn store_compressed(&self, generation: u64, compressed: Bytes) {
        let mut state = self.state.write();
        if let RecordState::Loaded(current) = &mut *state {
            if current.generation == generation && current.content.is_some() {
                current.compressed_content = Some(compressed);
            }
        }
    }

    /// Stores a hash computed over a complete stream of the file. Ignored if
    /// the record moved on to a newer generation or the streamed length does
    /// not match, since the digest would then describe other bytes.
    pub fn store_streamed_hash(&self, generation: u64, streamed_length: u64, content_hash: String) -> bool {
        let mut state = self.state.write();
        if let RecordState::Loaded(current) = &mut *state {
            if current.generation == generation && current.length == streamed_length && current.content_hash.is_none() {
                current.content_hash = Some(content_hash);
                return true;
            }
        }
        false
    }

    fn set_state(&self, state: RecordState) {
        *self.state.write() = state;
    }

    fn io_error(&self, error: std::io::Error) -> StaticCacheError {
        StaticCacheError::file_cache(FileCacheError::Io(error), self.path.display().to_string())
    }
}

impl std::fmt::Debug for FileRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileRecord")
            .field("key", &self.key)
            .field("path", &self.path)
            .field("mime_type", &self.mime_type)
            .field("max_age", &self.max_age)
            .field("buffered", &self.buffered)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
