//! Lifecycle controller wiring the scanner, listener and detector together.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::WatchConfig;
use crate::detector::SettleDetector;
use crate::error::{Result, WatcherError};
use crate::hub::{StableFileReceiver, SubscriberHub};
use crate::listener::ChangeListener;
use crate::scanner::{ScanSummary, check_root, scan_roots};
use crate::tracker::StabilityTracker;

#[derive(Debug, Default)]
enum State {
    #[default]
    Idle,
    Running(Vec<JoinHandle<()>>),
    Stopped,
}

/// Watches a set of roots and reports each file once it stops changing.
///
/// The watcher:
/// - Seeds pending files from a recursive scan of every root
/// - Refreshes them from live create/write notifications
/// - Publishes files idle for the quiescence period to every subscriber
pub struct SettleWatcher {
    config: WatchConfig,
    tracker: Arc<StabilityTracker>,
    hub: Arc<SubscriberHub>,
    cancel: CancellationToken,
    state: Mutex<State>,
    emitted: Arc<AtomicU64>,
}

impl SettleWatcher {
    /// Create a watcher for `config`.
    pub fn new(config: WatchConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            tracker: Arc::new(StabilityTracker::new()),
            hub: Arc::new(SubscriberHub::new()),
            cancel: CancellationToken::new(),
            state: Mutex::new(State::Idle),
            emitted: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Register a new subscriber. Works before or during watching.
    pub fn subscribe(&self) -> StableFileReceiver {
        self.hub.subscribe()
    }

    /// Start the listener, scan the roots, then start the detector.
    ///
    /// The listener runs before the scan so writes made while the walk is in
    /// progress still refresh their files. Returns once both tasks are running.
    /// Startup failures (unreadable root, notify backend error) are returned
    /// and leave the watcher idle.
    pub async fn start(&self) -> Result<ScanSummary> {
        let mut state = self.state.lock().await;
        match *state {
            State::Idle => {}
            State::Running(_) => return Err(WatcherError::AlreadyWatching),
            State::Stopped => return Err(WatcherError::Stopped),
        }

        for root in &self.config.roots {
            check_root(root)?;
        }

        let listener = ChangeListener::new(&self.config)?;
        let listener_cancel = self.cancel.child_token();
        let listener_handle =
            tokio::spawn(listener.run(self.tracker.clone(), listener_cancel.clone()));

        let roots = self.config.roots.clone();
        let tracker = self.tracker.clone();
        let scanned = tokio::task::spawn_blocking(move || scan_roots(&roots, &tracker))
            .await
            .map_err(|e| WatcherError::TaskFailed(e.to_string()))
            .and_then(|res| res);
        let summary = match scanned {
            Ok(summary) => summary,
            Err(e) => {
                listener_cancel.cancel();
                if let Err(join_err) = listener_handle.await {
                    error!("Change listener failed during startup: {join_err}");
                }
                return Err(e);
            }
        };

        let detector = SettleDetector::new(
            self.tracker.clone(),
            self.hub.clone(),
            self.config.quiescence_period,
            self.config.poll_interval,
        )
        .with_counter(self.emitted.clone());

        let handles = vec![
            listener_handle,
            tokio::spawn(detector.run(self.cancel.child_token())),
        ];
        *state = State::Running(handles);

        info!(
            "Watching {} root(s) ({} files pending)",
            self.config.roots.len(),
            self.tracker.len()
        );
        Ok(summary)
    }

    /// Start watching and wait until [`SettleWatcher::stop`] is called.
    pub async fn watch(&self) -> Result<()> {
        self.start().await?;
        self.cancel.cancelled().await;
        self.shutdown().await
    }

    /// Stop all background work and close every subscription.
    ///
    /// When this returns the listener and detector have exited and no further
    /// notifications will be delivered. Calling it again is a no-op.
    pub async fn stop(&self) -> Result<()> {
        self.cancel.cancel();
        self.shutdown().await
    }

    async fn shutdown(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        let handles = match std::mem::replace(&mut *state, State::Stopped) {
            State::Running(handles) => handles,
            State::Idle | State::Stopped => Vec::new(),
        };

        let mut failure = None;
        for handle in handles {
            if let Err(e) = handle.await {
                error!("Watcher task failed: {e}");
                failure = Some(WatcherError::TaskFailed(e.to_string()));
            }
        }

        self.hub.close();
        info!("Settle watcher stopped");

        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Whether the background tasks are running.
    pub async fn is_running(&self) -> bool {
        matches!(*self.state.lock().await, State::Running(_))
    }

    /// The watcher's configuration.
    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    /// Token that stops the watcher when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Get statistics about the watcher.
    pub fn stats(&self) -> WatcherStats {
        WatcherStats {
            roots: self.config.roots.len(),
            pending_files: self.tracker.len(),
            subscribers: self.hub.len(),
            emitted: self.emitted.load(Ordering::Relaxed),
        }
    }
}

/// Statistics about the settle watcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatcherStats {
    /// Number of watched roots.
    pub roots: usize,

    /// Files seen but not yet reported.
    pub pending_files: usize,

    /// Live subscribers.
    pub subscribers: usize,

    /// Files reported since startup.
    pub emitted: u64,
}
