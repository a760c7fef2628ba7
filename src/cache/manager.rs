//! Revenue cache persisted as a single JSON snapshot
//!
//! Provides a `RevenueCache` that maps app ids to provider records with the time
//! they were stored. Entries older than the expiration window are dropped lazily
//! when read.
//!
//! Consistency model: memory is authoritative for the running process. Every
//! mutation rewrites the snapshot file before returning, but a failed write is
//! only logged; the in-memory map keeps the new state regardless.

use chrono::{Duration, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::data::AppRecord;

/// Name of the snapshot file inside the cache directory
pub const CACHE_FILE_NAME: &str = "revenue-cache.json";

/// Days after which a cached record is considered stale
pub const CACHE_EXPIRATION_DAYS: i64 = 30;

/// Expiration window in milliseconds
pub fn expiration_window_ms() -> i64 {
    Duration::days(CACHE_EXPIRATION_DAYS).num_milliseconds()
}

/// Current wall-clock time in milliseconds since the Unix epoch
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// A cached record and when it was stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The provider record
    pub data: AppRecord,
    /// Insertion time in milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl CacheEntry {
    /// Whether the entry is still inside the expiration window at `now`
    ///
    /// Timestamps come from disk; an age that overflows counts as expired.
    pub fn is_fresh_at(&self, now: i64) -> bool {
        now.saturating_sub(self.timestamp) <= expiration_window_ms()
    }
}

/// Entry counts reported alongside lookup results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Every entry in the map, including expired ones not yet evicted
    pub total_entries: usize,
    /// Entries still inside the expiration window
    pub valid_entries: usize,
}

/// Errors from reading or writing the snapshot file
///
/// These never reach callers of the cache; they are logged and absorbed.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache file is not valid JSON: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Process-wide revenue cache backed by a JSON file
///
/// All access goes through one mutex, held across both the map update and the
/// snapshot write, so concurrent writers cannot interleave file contents.
#[derive(Debug)]
pub struct RevenueCache {
    /// Directory holding the snapshot file
    cache_dir: PathBuf,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl RevenueCache {
    /// Returns the XDG-compliant cache directory for this application
    ///
    /// `~/.cache/appstore-revenue/` on Linux. `None` if no home directory can be
    /// determined.
    pub fn default_dir() -> Option<PathBuf> {
        let project_dirs = ProjectDirs::from("", "", "appstore-revenue")?;
        Some(project_dirs.cache_dir().to_path_buf())
    }

    /// Opens the cache stored in `cache_dir`
    ///
    /// Creates the directory if needed and loads the snapshot. Never fails: a
    /// missing or unreadable snapshot leaves the cache empty.
    pub fn open(cache_dir: impl Into<PathBuf>) -> Self {
        let cache = Self {
            cache_dir: cache_dir.into(),
            entries: Mutex::new(HashMap::new()),
        };
        cache.init();
        cache
    }

    /// Path of the snapshot file
    pub fn path(&self) -> PathBuf {
        self.cache_dir.join(CACHE_FILE_NAME)
    }

    fn init(&self) {
        if let Err(e) = fs::create_dir_all(&self.cache_dir) {
            warn!(dir = %self.cache_dir.display(), error = %e, "Failed to create cache directory");
        }

        let path = self.path();
        let loaded = match load_snapshot(&path) {
            Ok(entries) => {
                info!(path = %path.display(), entries = entries.len(), "Loaded revenue cache");
                entries
            }
            Err(CacheError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No revenue cache file yet, starting empty");
                HashMap::new()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to load revenue cache, starting empty");
                HashMap::new()
            }
        };

        *self.lock() = loaded;
    }

    /// Returns the record for `app_id` if present and fresh
    pub fn get(&self, app_id: &str) -> Option<AppRecord> {
        self.get_at(app_id, now_ms())
    }

    /// Like `get`, evaluated at `now` (milliseconds since the epoch)
    ///
    /// An expired entry is removed and the snapshot rewritten.
    pub fn get_at(&self, app_id: &str, now: i64) -> Option<AppRecord> {
        let mut entries = self.lock();
        let entry = entries.get(app_id)?;

        if entry.is_fresh_at(now) {
            return Some(entry.data.clone());
        }

        debug!(app_id, "Evicting expired cache entry");
        entries.remove(app_id);
        self.persist(&entries);
        None
    }

    /// Stores `data` for `app_id`, stamped with the current time
    pub fn set(&self, app_id: &str, data: AppRecord) {
        self.set_at(app_id, data, now_ms());
    }

    /// Like `set`, stamped with `now` (milliseconds since the epoch)
    pub fn set_at(&self, app_id: &str, data: AppRecord, now: i64) {
        let mut entries = self.lock();
        entries.insert(
            app_id.to_string(),
            CacheEntry {
                data,
                timestamp: now,
            },
        );
        self.persist(&entries);
    }

    /// Removes every entry
    pub fn clear(&self) {
        let mut entries = self.lock();
        entries.clear();
        self.persist(&entries);
    }

    /// Counts entries at the current time without evicting anything
    pub fn stats(&self) -> CacheStats {
        self.stats_at(now_ms())
    }

    /// Counts entries at `now` without evicting anything
    pub fn stats_at(&self, now: i64) -> CacheStats {
        let entries = self.lock();
        CacheStats {
            total_entries: entries.len(),
            valid_entries: entries.values().filter(|e| e.is_fresh_at(now)).count(),
        }
    }

    /// Acquires the map, recovering it if a previous holder panicked
    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Writes the snapshot; failures are logged, not returned
    fn persist(&self, entries: &HashMap<String, CacheEntry>) {
        if let Err(e) = save_snapshot(&self.path(), entries) {
            warn!(path = %self.path().display(), error = %e, "Failed to save revenue cache");
        }
    }
}

/// Reads the whole snapshot file
fn load_snapshot(path: &Path) -> Result<HashMap<String, CacheEntry>, CacheError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Writes the whole snapshot to a temp file, then renames it into place
fn save_snapshot(path: &Path, entries: &HashMap<String, CacheEntry>) -> Result<(), CacheError> {
    let json = serde_json::to_string_pretty(entries)?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, json)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}
