//! One-time recursive scan that seeds the tracker at startup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{Result, WatcherError};
use crate::tracker::StabilityTracker;

/// Result of a startup scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    /// Number of roots scanned.
    pub roots: usize,

    /// Number of files seeded into the tracker.
    pub files_seeded: usize,

    /// Entries below a root that could not be read.
    pub skipped: usize,

    /// Time taken.
    pub duration: Duration,
}

/// Make sure `root` is a readable directory.
pub fn check_root(root: &Path) -> Result<()> {
    let metadata = match std::fs::metadata(root) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(WatcherError::RootNotFound(root.to_path_buf()));
        }
        Err(source) => {
            return Err(WatcherError::RootInaccessible {
                path: root.to_path_buf(),
                source,
            });
        }
    };

    if !metadata.is_dir() {
        return Err(WatcherError::NotADirectory(root.to_path_buf()));
    }

    std::fs::read_dir(root).map_err(|source| WatcherError::RootInaccessible {
        path: root.to_path_buf(),
        source,
    })?;

    Ok(())
}

/// Touch every regular file under `roots` as it is visited.
///
/// An unreadable root is fatal. Unreadable entries below a root are logged and
/// skipped.
pub fn scan_roots(roots: &[PathBuf], tracker: &StabilityTracker) -> Result<ScanSummary> {
    let start = std::time::Instant::now();
    let mut summary = ScanSummary {
        roots: roots.len(),
        ..ScanSummary::default()
    };

    for root in roots {
        check_root(root)?;
        let (seeded, skipped) = scan_root(root, tracker);
        debug!(
            "Scanned {}: {seeded} files, {skipped} skipped",
            root.display()
        );
        summary.files_seeded += seeded;
        summary.skipped += skipped;
    }

    summary.duration = start.elapsed();
    info!(
        "Seeded {} files from {} root(s) in {:?} ({} skipped)",
        summary.files_seeded, summary.roots, summary.duration, summary.skipped
    );

    Ok(summary)
}

fn scan_root(root: &Path, tracker: &StabilityTracker) -> (usize, usize) {
    let mut seeded = 0;
    let mut skipped = 0;

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {e}", root.display());
                skipped += 1;
                continue;
            }
        };

        if entry.file_type().is_file() {
            // Stamped per entry: a long walk must not age what it saw first.
            tracker.touch(entry.into_path(), Instant::now());
            seeded += 1;
        }
    }

    (seeded, skipped)
}
