//! # Settle Watcher
//!
//! This crate reports files under a set of watched directories once they have
//! stopped being written. Each file is reported exactly once per burst of
//! writes, so a consumer can act on a complete file instead of a partial one.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Settle Watcher                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  scan_roots ──────┐                                             │
//! │                   ├──► StabilityTracker ──► SettleDetector      │
//! │  ChangeListener ──┘                              │              │
//! │                                                  ▼              │
//! │                                    SubscriberHub ──► receivers  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dngwatch_settle_watcher::{SettleWatcher, WatchConfig};
//!
//! let watcher = SettleWatcher::new(WatchConfig::new(["/data/incoming"]))?;
//! let mut rx = watcher.subscribe();
//! watcher.start().await?;
//!
//! while let Some(stable) = rx.recv().await {
//!     println!("ready: {}", stable.path.display());
//! }
//! ```

pub mod config;
pub mod detector;
pub mod error;
pub mod event;
pub mod hub;
pub mod listener;
pub mod scanner;
pub mod tracker;
pub mod watcher;

pub use config::WatchConfig;
pub use error::{Result, WatcherError};
pub use event::{StableFile, TouchKind};
pub use hub::{StableFileReceiver, SubscriberHub};
pub use scanner::ScanSummary;
pub use tracker::{FileRecord, StabilityTracker};
pub use watcher::{SettleWatcher, WatcherStats};
