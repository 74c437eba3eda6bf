//! Periodic pass that reports files which have stopped changing.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::event::StableFile;
use crate::hub::SubscriberHub;
use crate::tracker::StabilityTracker;

/// Polls the tracker and publishes settled files.
#[derive(Debug)]
pub struct SettleDetector {
    tracker: Arc<StabilityTracker>,
    hub: Arc<SubscriberHub>,
    quiescence: Duration,
    poll_interval: Duration,
    emitted: Arc<AtomicU64>,
}

impl SettleDetector {
    /// Create a detector over shared state.
    pub fn new(
        tracker: Arc<StabilityTracker>,
        hub: Arc<SubscriberHub>,
        quiescence: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            tracker,
            hub,
            quiescence,
            poll_interval,
            emitted: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Share an emitted-files counter with the caller.
    pub fn with_counter(mut self, emitted: Arc<AtomicU64>) -> Self {
        self.emitted = emitted;
        self
    }

    /// Run one pass at `now`. Returns the number of files published.
    pub async fn pass(&self, now: Instant) -> usize {
        let settled = self.tracker.take_settled(now, self.quiescence);
        if settled.is_empty() {
            return 0;
        }

        // Existence checks stat every file; keep them off the async workers.
        let present = match tokio::task::spawn_blocking(move || retain_present(settled)).await {
            Ok(present) => present,
            Err(e) => {
                error!("Settle pass failed: {e}");
                return 0;
            }
        };

        let mut published = 0;
        for stable in present {
            info!(
                "Stable: {} (idle {:?}, {} touch(es))",
                stable.path.display(),
                stable.idle,
                stable.touches
            );
            let reached = self.hub.publish(&stable);
            if reached == 0 {
                debug!("No subscribers for {}", stable.path.display());
            }
            self.emitted.fetch_add(1, Ordering::Relaxed);
            published += 1;
        }

        published
    }

    /// Run passes every poll interval until cancelled.
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            "Settle detector started (quiescence {:?}, poll {:?})",
            self.quiescence, self.poll_interval
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.pass(Instant::now()).await;
                }
            }
        }

        info!("Settle detector stopped");
    }
}

/// Drop files removed before they settled.
fn retain_present(settled: Vec<StableFile>) -> Vec<StableFile> {
    settled
        .into_iter()
        .filter(|stable| {
            let present = stable.path.is_file();
            if !present {
                debug!("Dropping vanished file {}", stable.path.display());
            }
            present
        })
        .collect()
}
