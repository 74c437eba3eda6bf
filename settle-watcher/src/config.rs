//! Configuration for the settle watcher.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WatcherError};

/// Default time a file must stay untouched before it is reported.
pub const DEFAULT_QUIESCENCE_PERIOD: Duration = Duration::from_secs(15);

/// Default cadence of the settle pass.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Default capacity of the channel between the notify backend and the listener.
pub const DEFAULT_EVENT_BUFFER: usize = 1000;

/// Configuration for a settle watcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Root directories to scan and watch.
    pub roots: Vec<PathBuf>,

    /// Time of inactivity before a file is declared stable.
    pub quiescence_period: Duration,

    /// Cadence of the settle-check pass.
    pub poll_interval: Duration,

    /// Whether subdirectories (including ones created after startup) are watched.
    pub recursive: bool,

    /// Capacity of the raw event channel.
    pub event_buffer: usize,
}

impl WatchConfig {
    /// Create a config watching the given roots with default timings.
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
            quiescence_period: DEFAULT_QUIESCENCE_PERIOD,
            poll_interval: DEFAULT_POLL_INTERVAL,
            recursive: true,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }

    /// Add a root directory.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.roots.push(root.into());
        self
    }

    /// Set the quiescence period.
    pub fn with_quiescence_period(mut self, period: Duration) -> Self {
        self.quiescence_period = period;
        self
    }

    /// Set the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Only watch the top level of each root for live changes.
    pub fn non_recursive(mut self) -> Self {
        self.recursive = false;
        self
    }

    /// Set the raw event channel capacity.
    pub fn with_event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity;
        self
    }

    /// Check the config for values the watcher cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.roots.is_empty() {
            return Err(WatcherError::Config(
                "at least one root directory is required".to_string(),
            ));
        }
        if self.quiescence_period.is_zero() {
            return Err(WatcherError::Config(
                "quiescence period must be non-zero".to_string(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(WatcherError::Config(
                "poll interval must be non-zero".to_string(),
            ));
        }
        if self.event_buffer == 0 {
            return Err(WatcherError::Config(
                "event buffer must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self::new(Vec::<PathBuf>::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    #[test]
    fn test_watch_config_defaults() {
        let config = WatchConfig::new(["/data"]);

        assert_eq!(config.roots, vec![PathBuf::from("/data")]);
        assert_eq!(config.quiescence_period, Duration::from_secs(15));
        assert_eq!(config.poll_interval, Duration::from_secs(15));
        assert!(config.recursive);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_watch_config_builder() {
        let config = WatchConfig::new(["/a"])
            .with_root("/b")
            .with_quiescence_period(Duration::from_millis(200))
            .with_poll_interval(Duration::from_millis(50))
            .non_recursive();

        assert_eq!(config.roots.len(), 2);
        assert_eq!(config.roots[1], Path::new("/b"));
        assert_eq!(config.quiescence_period, Duration::from_millis(200));
        assert!(!config.recursive);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(WatchConfig::default().validate().is_err());
        assert!(
            WatchConfig::new(["/a"])
                .with_quiescence_period(Duration::ZERO)
                .validate()
                .is_err()
        );
        assert!(
            WatchConfig::new(["/a"])
                .with_poll_interval(Duration::ZERO)
                .validate()
                .is_err()
        );
    }
}
