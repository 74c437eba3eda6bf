//! Error types for the ingest pipeline.

use thiserror::Error;

use dngwatch_settle_watcher::WatcherError;

/// Result type alias for ingest operations.
pub type Result<T> = std::result::Result<T, IngestError>;

/// Errors that can occur while ingesting a file.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Index database error.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The converter could not be started.
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The converter ran but reported failure.
    #[error("{program} exited with {status}")]
    ConvertFailed { program: String, status: String },

    /// Watcher error.
    #[error("watcher error: {0}")]
    Watcher(#[from] WatcherError),

    /// The ingest task panicked or was aborted.
    #[error("ingest task failed: {0}")]
    TaskFailed(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}
