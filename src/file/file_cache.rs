use dashmap::DashMap;
use futures::StreamExt;
use std::path::Path;
use std::sync::Arc;

use crate::{
    configuration::configuration::Configuration,
    error::{static_cache_error::StaticCacheError, static_cache_error_enums::FileCacheError},
    file::{
        file_enumerator::enumerate_files,
        file_record::{FileRecord, LoadedFile},
        path_resolver::PathResolver,
    },
    logging::syslog::{debug, info, trace, warn},
};

// Number of files loaded concurrently while preloading
const PRELOAD_CONCURRENCY: usize = 16;

/// Maps normalized request paths to their file records.
///
/// Owned by the server and shared with the handler. Entries are never
/// removed once loaded, the cache grows with the number of distinct files
/// served.
pub struct FileCache {
    records: DashMap<String, Arc<FileRecord>>,
    buffer: bool,
    max_age: u64,
    dynamic: bool,
}

impl FileCache {
    pub fn new(buffer: bool, max_age: u64, dynamic: bool) -> Self {
        FileCache {
            records: DashMap::new(),
            buffer,
            max_age,
            dynamic,
        }
    }

    pub fn from_configuration(configuration: &Configuration) -> Self {
        Self::new(configuration.buffer, configuration.max_age, configuration.dynamic)
    }

    pub fn get_current_item_count(&self) -> usize {
        self.records.len()
    }

    // Only loaded records count as hits, in-flight placeholders do not
    pub fn get_cached(&self, key: &str) -> Option<Arc<FileRecord>> {
        let record = self.records.get(key)?.value().clone();
        if record.is_loaded() {
            trace(format!("File found in cache: {}", key));
            Some(record)
        } else {
            None
        }
    }

    /// Returns the record for `key`, loading it from `full_path` on a miss.
    /// Misses are only served in dynamic mode.
    pub async fn get_or_load(&self, key: &str, full_path: &Path) -> Result<Arc<FileRecord>, StaticCacheError> {
        if let Some(record) = self.get_cached(key) {
            return Ok(record);
        }
        if !self.dynamic {
            trace(format!("File not in cache and dynamic loading is disabled: {}", key));
            return Err(StaticCacheError::file_cache(FileCacheError::NotDiscoverable, key.to_string()));
        }

        trace(format!("File not found in cache, loading from disk: {}", key));
        self.load_record(key, full_path).await
    }

    async fn load_record(&self, key: &str, full_path: &Path) -> Result<Arc<FileRecord>, StaticCacheError> {
        loop {
            // Concurrent first accesses share one placeholder and wait on its load gate
            let record = self
                .records
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(FileRecord::new(key, full_path, self.max_age, self.buffer)))
                .value()
                .clone();

            match record.ensure_loaded().await {
                Ok(_) => {
                    if let Some(record) = self.claim_loaded(key, record) {
                        return Ok(record);
                    }
                    trace(format!("Record for {} was replaced while loading, retrying", key));
                }
                Err(e) => {
                    self.records.remove_if(key, |_, existing| Arc::ptr_eq(existing, &record) && !existing.is_loaded());
                    debug(format!("Failed to load {} from {}: {}", key, full_path.display(), e));
                    return Err(e);
                }
            }
        }
    }

    // A failed load removes its placeholder while other callers may still hold it,
    // a record is only handed out if it is the one the map holds for its key
    fn claim_loaded(&self, key: &str, record: Arc<FileRecord>) -> Option<Arc<FileRecord>> {
        let current = self.records.entry(key.to_string()).or_insert_with(|| record.clone()).value().clone();
        if Arc::ptr_eq(&current, &record) { Some(record) } else { None }
    }

    /// Current view of a record, re-checking the disk for streamed records.
    pub async fn refresh(&self, record: &FileRecord) -> Result<LoadedFile, StaticCacheError> {
        record.refresh_if_stale().await
    }

    /// Loads every non-hidden file below the web root. Individual failures are
    /// logged and skipped. Returns the number of records loaded.
    pub async fn preload(&self, resolver: &PathResolver) -> Result<usize, StaticCacheError> {
        let web_root = resolver.get_web_root().to_path_buf();
        let enumeration_root = web_root.clone();
        let files = tokio::task::spawn_blocking(move || enumerate_files(&enumeration_root))
            .await
            .map_err(|e| StaticCacheError::file_cache(FileCacheError::Io(std::io::Error::other(e)), web_root.display().to_string()))?
            .map_err(|e| StaticCacheError::file_cache(FileCacheError::Io(e), web_root.display().to_string()))?;

        let total = files.len();
        let loaded = futures::stream::iter(files)
            .map(|file| async move {
                let key = resolver.cache_key_for(&file.relative_path);
                match self.load_record(&key, &file.full_path).await {
                    Ok(_) => true,
                    Err(e) => {
                        warn(format!("Failed to preload {}: {}", file.full_path.display(), e));
                        false
                    }
                }
            })
            .buffer_unordered(PRELOAD_CONCURRENCY)
            .filter(|loaded| futures::future::ready(*loaded))
            .count()
            .await;

        info(format!("Preloaded {} of {} files from {}", loaded, total, web_root.display()));
        Ok(loaded)
    }
}
