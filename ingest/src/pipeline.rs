//! Per-file ingest: filter, dedup, convert, record.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use dngwatch_settle_watcher::{StableFile, StableFileReceiver};

use crate::converter::Converter;
use crate::error::Result;
use crate::filter::ExtensionFilter;
use crate::index::IndexStore;

/// What happened to a stable file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IngestOutcome {
    /// Extension not in the allow-list.
    Unsupported,

    /// Already converted earlier.
    AlreadyIndexed,

    /// Converted and recorded.
    Converted { dest: PathBuf },
}

/// Counters from a finished ingest loop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStats {
    pub converted: usize,
    pub already_indexed: usize,
    pub unsupported: usize,
    pub failed: usize,
}

impl IngestStats {
    fn record(&mut self, outcome: &IngestOutcome) {
        match outcome {
            IngestOutcome::Unsupported => self.unsupported += 1,
            IngestOutcome::AlreadyIndexed => self.already_indexed += 1,
            IngestOutcome::Converted { .. } => self.converted += 1,
        }
    }
}

/// Turns stable raw files into converted files, once per source path.
#[derive(Debug)]
pub struct Ingestor {
    filter: ExtensionFilter,
    index: IndexStore,
    converter: Converter,
    dest_dir: PathBuf,
    output_extension: Option<String>,
}

impl Ingestor {
    /// Create an ingestor writing into `dest_dir`.
    pub fn new(
        filter: ExtensionFilter,
        index: IndexStore,
        converter: Converter,
        dest_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            filter,
            index,
            converter,
            dest_dir: dest_dir.into(),
            output_extension: None,
        }
    }

    /// Give converted files this extension instead of the source's.
    pub fn with_output_extension(mut self, ext: Option<String>) -> Self {
        self.output_extension = ext.filter(|e| !e.trim().is_empty());
        self
    }

    /// The dedup index.
    pub fn index(&self) -> &IndexStore {
        &self.index
    }

    /// Where `source` is converted to.
    pub fn dest_path(&self, source: &Path) -> PathBuf {
        let file_name = source.file_name().map(PathBuf::from).unwrap_or_default();
        let file_name = match &self.output_extension {
            Some(ext) => file_name.with_extension(ext.trim_start_matches('.')),
            None => file_name,
        };
        self.dest_dir.join(file_name)
    }

    /// Ingest one stable file.
    ///
    /// The file is recorded in the index only after a successful conversion,
    /// so a failed file is retried the next time it settles.
    pub async fn handle(&self, stable: &StableFile) -> Result<IngestOutcome> {
        let source = stable.path.as_path();
        let label = stable.file_name();

        if !self.filter.allows(source) {
            info!("{label} | File extension not supported");
            return Ok(IngestOutcome::Unsupported);
        }

        if let Some(entry) = self.index.find_by_name(source)? {
            info!("{label} | Skipped, already converted at {}", entry.created_at);
            return Ok(IngestOutcome::AlreadyIndexed);
        }

        let dest = self.dest_path(source);
        self.converter.convert(source, &dest).await?;
        let entry = self.index.insert(source)?;
        debug!("{label} | Indexed as #{}", entry.id);

        Ok(IngestOutcome::Converted { dest })
    }

    /// Handle notifications until cancelled or the subscription closes.
    pub async fn run(self, mut rx: StableFileReceiver, cancel: CancellationToken) -> IngestStats {
        let mut stats = IngestStats::default();

        loop {
            let stable = tokio::select! {
                _ = cancel.cancelled() => break,
                stable = rx.recv() => match stable {
                    Some(stable) => stable,
                    None => break,
                },
            };

            info!("File changed: {}", stable.path.display());
            match self.handle(&stable).await {
                Ok(outcome) => stats.record(&outcome),
                Err(e) => {
                    error!("{} | {e}", stable.file_name());
                    stats.failed += 1;
                }
            }
        }

        info!(
            "Ingest stopped: {} converted, {} skipped, {} unsupported, {} failed",
            stats.converted, stats.already_indexed, stats.unsupported, stats.failed
        );
        stats
    }
}
