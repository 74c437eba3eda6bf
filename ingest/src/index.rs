//! Persistent index of files that have already been converted.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::error::Result;

/// A converted file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Row id.
    pub id: i64,

    /// Source path as reported by the watcher.
    pub file_name: String,

    /// Dedup key, see [`name_hash`].
    pub file_name_hash: String,

    /// When the entry was recorded.
    pub created_at: DateTime<Utc>,
}

/// Dedup key for a path: base64 of the SHA-256 of the path's raw bytes.
pub fn name_hash(path: &Path) -> String {
    let digest = Sha256::digest(path.as_os_str().as_encoded_bytes());
    STANDARD.encode(digest)
}

/// SQLite-backed index keyed by [`name_hash`].
#[derive(Debug)]
pub struct IndexStore {
    db: Mutex<Connection>,
}

impl IndexStore {
    /// Open or create the index database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Connection::open(path)?;
        db.busy_timeout(std::time::Duration::from_secs(30))?;
        let store = Self::with_connection(db)?;
        info!("Opened file index at {} ({} entries)", path.display(), store.len()?);
        Ok(store)
    }

    /// Open a throwaway in-memory index.
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(db: Connection) -> Result<Self> {
        db.execute_batch(
            "CREATE TABLE IF NOT EXISTS file_index (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                file_name TEXT NOT NULL,
                file_name_hash TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL
            );",
        )?;
        Ok(Self { db: Mutex::new(db) })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.db
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Look up the entry for `path`.
    pub fn find_by_name(&self, path: &Path) -> Result<Option<IndexEntry>> {
        let entry = self
            .lock()
            .query_row(
                "SELECT id, file_name, file_name_hash, created_at
                 FROM file_index WHERE file_name_hash = ?1",
                params![name_hash(path)],
                |row| {
                    Ok(IndexEntry {
                        id: row.get(0)?,
                        file_name: row.get(1)?,
                        file_name_hash: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(entry)
    }

    /// Record `path` as converted.
    pub fn insert(&self, path: &Path) -> Result<IndexEntry> {
        let db = self.lock();
        let file_name = path.to_string_lossy().into_owned();
        let file_name_hash = name_hash(path);
        let created_at = Utc::now();

        db.execute(
            "INSERT INTO file_index (file_name, file_name_hash, created_at) VALUES (?1, ?2, ?3)",
            params![file_name, file_name_hash, created_at],
        )?;

        Ok(IndexEntry {
            id: db.last_insert_rowid(),
            file_name,
            file_name_hash,
            created_at,
        })
    }

    /// Number of recorded files.
    pub fn len(&self) -> Result<usize> {
        let count: i64 = self
            .lock()
            .query_row("SELECT COUNT(*) FROM file_index", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}
