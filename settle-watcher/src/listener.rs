//! Live change notifications that keep the tracker current.

use std::sync::Arc;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use crate::config::WatchConfig;
use crate::error::Result;
use crate::event::{TouchKind, touched_paths};
use crate::tracker::StabilityTracker;

type RawEvent = notify::Result<notify::Event>;

/// Subscribes to OS change notifications for every watched root.
pub struct ChangeListener {
    /// Dropping the watcher releases the OS watch handles.
    watcher: RecommendedWatcher,

    /// Raw events forwarded from the notify backend thread.
    event_rx: mpsc::Receiver<RawEvent>,
}

impl ChangeListener {
    /// Initialize the notify backend and register every root.
    pub fn new(config: &WatchConfig) -> Result<Self> {
        let (event_tx, event_rx) = mpsc::channel(config.event_buffer);

        let mut watcher = notify::recommended_watcher(move |res: RawEvent| {
            if event_tx.blocking_send(res).is_err() {
                debug!("Change listener is gone; dropping file system event");
            }
        })?;

        let mode = if config.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };

        for root in &config.roots {
            watcher.watch(root, mode)?;
            debug!("Started watching: {}", root.display());
        }

        Ok(Self { watcher, event_rx })
    }

    /// Apply events to `tracker` until cancelled or the backend goes away.
    pub async fn run(mut self, tracker: Arc<StabilityTracker>, cancel: CancellationToken) {
        info!("Change listener started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                res = self.event_rx.recv() => match res {
                    Some(Ok(event)) => {
                        apply_event(&tracker, &event, Instant::now());
                    }
                    Some(Err(e)) => {
                        error!("Watch error: {e}");
                    }
                    None => {
                        debug!("Event source closed");
                        break;
                    }
                },
            }
        }

        drop(self.watcher);
        info!("Change listener stopped");
    }
}

/// Touch every file path a create, write or move-in event lands on.
///
/// Returns the number of paths touched.
pub fn apply_event(tracker: &StabilityTracker, event: &notify::Event, now: Instant) -> usize {
    let kind = TouchKind::classify(event.kind);
    let paths = touched_paths(event);
    if paths.is_empty() {
        trace!("Ignoring {:?} for {:?}", event.kind, event.paths);
        return 0;
    }

    let mut touched = 0;
    for path in paths {
        // One stat per path; events arrive a handful of paths at a time.
        if path.is_dir() {
            continue;
        }
        if tracker.touch(path.clone(), now) {
            debug!("Tracking {} ({kind:?})", path.display());
        }
        touched += 1;
    }
    touched
}
