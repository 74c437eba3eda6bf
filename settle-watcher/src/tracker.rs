//! Shared table of files that are still settling.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;

use crate::event::StableFile;

/// A file that has been touched and not yet reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Path to the file.
    pub path: PathBuf,

    /// Most recent touch. Never moves backwards.
    pub last_touch: Instant,

    /// Touches recorded in this burst.
    pub touches: u32,
}

impl FileRecord {
    fn new(path: PathBuf, at: Instant) -> Self {
        Self {
            path,
            last_touch: at,
            touches: 1,
        }
    }

    /// Time elapsed since the last touch.
    pub fn idle_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_touch)
    }
}

/// Concurrency-safe table of pending files keyed by path.
///
/// Every operation runs under a single lock, so a touch can never land between
/// the age check and the removal performed by [`StabilityTracker::take_settled`].
#[derive(Debug, Default)]
pub struct StabilityTracker {
    records: Mutex<HashMap<PathBuf, FileRecord>>,
}

impl StabilityTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, FileRecord>> {
        // The table holds plain data, so a poisoned lock is still consistent.
        self.records
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Record a touch of `path` at `at`.
    ///
    /// Returns `true` if the path was not being tracked yet.
    pub fn touch(&self, path: impl Into<PathBuf>, at: Instant) -> bool {
        let path = path.into();
        let mut records = self.lock();

        match records.get_mut(&path) {
            Some(record) => {
                record.last_touch = record.last_touch.max(at);
                record.touches = record.touches.saturating_add(1);
                false
            }
            None => {
                records.insert(path.clone(), FileRecord::new(path, at));
                true
            }
        }
    }

    /// Remove and return every record idle for at least `quiescence` at `now`,
    /// ordered by path.
    pub fn take_settled(&self, now: Instant, quiescence: Duration) -> Vec<StableFile> {
        let mut records = self.lock();

        let mut ready: Vec<PathBuf> = records
            .values()
            .filter(|record| record.idle_at(now) >= quiescence)
            .map(|record| record.path.clone())
            .collect();
        ready.sort();

        ready
            .into_iter()
            .filter_map(|path| records.remove(&path))
            .map(|record| {
                let idle = record.idle_at(now);
                StableFile::new(record.path, idle, record.touches)
            })
            .collect()
    }

    /// Stop tracking `path` without reporting it.
    pub fn forget(&self, path: &Path) -> Option<FileRecord> {
        self.lock().remove(path)
    }

    /// Get a copy of the record for `path`.
    pub fn get(&self, path: &Path) -> Option<FileRecord> {
        self.lock().get(path).cloned()
    }

    /// Whether `path` is pending.
    pub fn contains(&self, path: &Path) -> bool {
        self.lock().contains_key(path)
    }

    /// Number of pending files.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
