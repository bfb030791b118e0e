// SPDX-License-Identifier: PMPL-1.0-or-later
//! Content-addressed scan cache.
//!
//! Entries are keyed by absolute path and only valid while the SHA-256 of
//! the current file bytes matches the stored hash. The whole table is
//! persisted through a [`CacheStore`] after every write.

use crate::error::{A11yError, Result};
use crate::model::ScanResult;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// File name of the persisted table inside the cache directory
pub const CACHE_FILE_NAME: &str = "scan-cache.json";

/// Default age after which [`FileCache::cleanup`] drops entries
pub const DEFAULT_MAX_AGE_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// SHA-256 hex digest of the file bytes that produced `result`
    pub content_hash: String,
    pub timestamp: DateTime<Utc>,
    pub result: ScanResult,
}

/// SHA-256 hex digest of `bytes`
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Persistence backend for the cache table
pub trait CacheStore: Send + Sync {
    /// Load the persisted table; unreadable data loads as empty
    fn load(&self) -> HashMap<String, CacheEntry>;

    /// Replace the persisted table
    fn save(&self, entries: &HashMap<String, CacheEntry>) -> Result<()>;
}

/// One JSON file inside a cache directory
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(CACHE_FILE_NAME)
    }
}

impl CacheStore for JsonFileStore {
    fn load(&self) -> HashMap<String, CacheEntry> {
        let path = self.path();
        if !path.exists() {
            return HashMap::new();
        }

        let parsed: Result<HashMap<String, CacheEntry>> = std::fs::read_to_string(&path)
            .map_err(A11yError::from)
            .and_then(|json| Ok(serde_json::from_str(&json)?));

        match parsed {
            Ok(entries) => {
                debug!(path = %path.display(), "Loaded scan cache");
                entries
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable scan cache");
                HashMap::new()
            }
        }
    }

    fn save(&self, entries: &HashMap<String, CacheEntry>) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path();
        let json = serde_json::to_string_pretty(entries)?;
        std::fs::write(&path, json)?;
        debug!(path = %path.display(), entries = entries.len(), "Saved scan cache");
        Ok(())
    }
}

/// Store that keeps the last saved table in memory
#[derive(Default)]
pub struct MemoryStore {
    saved: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryStore {
    fn load(&self) -> HashMap<String, CacheEntry> {
        self.saved.lock().map(|m| m.clone()).unwrap_or_default()
    }

    fn save(&self, entries: &HashMap<String, CacheEntry>) -> Result<()> {
        if let Ok(mut saved) = self.saved.lock() {
            *saved = entries.clone();
        }
        Ok(())
    }
}

/// Scan results keyed by path and validated by content hash
pub struct FileCache {
    entries: HashMap<String, CacheEntry>,
    store: Box<dyn CacheStore>,
}

impl FileCache {
    /// Create a cache backed by `store`, loading whatever it holds
    pub fn new(store: Box<dyn CacheStore>) -> Self {
        let entries = store.load();
        Self { entries, store }
    }

    /// Open the JSON cache in `dir`
    pub fn open(dir: &Path) -> Self {
        Self::new(Box::new(JsonFileStore::new(dir)))
    }

    fn key(path: &Path) -> String {
        path.to_string_lossy().into_owned()
    }

    /// Cached result for `path`, only if `content` is what was scanned
    pub fn get(&self, path: &Path, content: &[u8]) -> Option<ScanResult> {
        let entry = self.entries.get(&Self::key(path))?;
        if entry.content_hash == content_hash(content) {
            debug!(path = %path.display(), "Cache hit");
            Some(entry.result.clone())
        } else {
            debug!(path = %path.display(), "Cache entry is stale");
            None
        }
    }

    /// Record `result` for `path` and persist the table
    pub fn set(&mut self, path: &Path, content: &[u8], result: ScanResult) -> Result<()> {
        self.entries.insert(
            Self::key(path),
            CacheEntry {
                content_hash: content_hash(content),
                timestamp: Utc::now(),
                result,
            },
        );
        self.store.save(&self.entries)
    }

    /// Drop entries older than `max_age`; returns how many were removed
    pub fn cleanup(&mut self, max_age: Duration) -> Result<usize> {
        self.cleanup_at(Utc::now(), max_age)
    }

    /// [`FileCache::cleanup`] against an explicit clock
    pub fn cleanup_at(&mut self, now: DateTime<Utc>, max_age: Duration) -> Result<usize> {
        let before = self.entries.len();
        self.entries.retain(|_, entry| now - entry.timestamp <= max_age);
        let removed = before - self.entries.len();

        if removed > 0 {
            self.store.save(&self.entries)?;
            info!(removed, remaining = self.entries.len(), "Cleaned up scan cache");
        }
        Ok(removed)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every entry and persist the empty table
    pub fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        self.store.save(&self.entries)
    }
}
