//! Classification of raw file system events and the stable-file notification.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use notify::EventKind;
use notify::event::{ModifyKind, RenameMode};
use serde::{Deserialize, Serialize};

/// How a raw notify event affects stability tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchKind {
    /// A file was created.
    Created,

    /// File contents were written.
    Written,

    /// A file was renamed or moved to a watched path.
    MovedIn,

    /// Anything else: the old name of a rename, removals, metadata and
    /// access changes.
    Ignored,
}

impl TouchKind {
    /// Classify a notify event kind.
    pub fn classify(kind: EventKind) -> Self {
        match kind {
            EventKind::Create(_) => Self::Created,
            EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any | ModifyKind::Other) => {
                Self::Written
            }
            EventKind::Modify(ModifyKind::Name(
                RenameMode::To | RenameMode::Both | RenameMode::Any,
            )) => Self::MovedIn,
            _ => Self::Ignored,
        }
    }

    /// Whether the event should refresh the file's last touch.
    pub fn is_touch(self) -> bool {
        !matches!(self, Self::Ignored)
    }
}

/// Paths of `event` that a touch applies to.
///
/// A `RenameMode::Both` event carries `[from, to]`; only the destination counts.
pub fn touched_paths(event: &notify::Event) -> &[PathBuf] {
    match event.kind {
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            event.paths.get(1..).unwrap_or_default()
        }
        kind if TouchKind::classify(kind).is_touch() => &event.paths,
        _ => &[],
    }
}

impl From<EventKind> for TouchKind {
    fn from(kind: EventKind) -> Self {
        Self::classify(kind)
    }
}

/// Notification that a file has stopped changing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StableFile {
    /// Path to the file, as observed under its watched root.
    pub path: PathBuf,

    /// How long the file had been untouched when it was detected.
    pub idle: Duration,

    /// Number of touches recorded since the file was last reported.
    pub touches: u32,

    /// When the settle pass picked the file up.
    pub detected_at: DateTime<Utc>,
}

impl StableFile {
    /// Create a notification detected now.
    pub fn new(path: impl Into<PathBuf>, idle: Duration, touches: u32) -> Self {
        Self {
            path: path.into(),
            idle,
            touches,
            detected_at: Utc::now(),
        }
    }

    /// File name for log prefixes.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}
