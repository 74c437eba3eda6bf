//! Fan-out of stable-file notifications to subscribers.

use std::sync::{Mutex, MutexGuard};

use tokio::sync::mpsc;
use tracing::debug;

use crate::event::StableFile;

/// Receiving end of a subscription.
pub type StableFileReceiver = mpsc::UnboundedReceiver<StableFile>;

/// Registry of subscriber queues.
///
/// Each subscriber gets its own unbounded queue, so publishing never waits on
/// a consumer. Subscribers whose receiver has been dropped are pruned.
#[derive(Debug, Default)]
pub struct SubscriberHub {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<StableFile>>>,
}

impl SubscriberHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<mpsc::UnboundedSender<StableFile>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Register a new subscriber.
    pub fn subscribe(&self) -> StableFileReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().push(tx);
        rx
    }

    /// Deliver `stable` to every subscriber in registration order.
    ///
    /// Returns how many subscribers received it.
    pub fn publish(&self, stable: &StableFile) -> usize {
        let mut subscribers = self.lock();
        let before = subscribers.len();

        subscribers.retain(|tx| tx.send(stable.clone()).is_ok());

        let pruned = before - subscribers.len();
        if pruned > 0 {
            debug!("Dropped {pruned} closed subscriber(s)");
        }
        subscribers.len()
    }

    /// Drop every sender so receivers see the end of the stream.
    pub fn close(&self) {
        self.lock().clear();
    }

    /// Number of live subscribers.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether there are no subscribers.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
