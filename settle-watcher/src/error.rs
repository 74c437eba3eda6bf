//! Error types for the settle watcher.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for watcher operations.
pub type Result<T> = std::result::Result<T, WatcherError>;

/// Errors that can occur in the settle watcher.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// A watched root does not exist.
    #[error("directory not found: {}", .0.display())]
    RootNotFound(PathBuf),

    /// A watched root exists but is not a directory.
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// A watched root could not be read.
    #[error("cannot access {}: {source}", .path.display())]
    RootInaccessible {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Watcher already started.
    #[error("watcher already running")]
    AlreadyWatching,

    /// Watcher was stopped and cannot be started again.
    #[error("watcher has been stopped")]
    Stopped,

    /// A background task panicked or was aborted.
    #[error("background task failed: {0}")]
    TaskFailed(String),

    /// Notify error.
    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}
