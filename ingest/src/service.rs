//! Wires the settle watcher to the ingest pipeline.

use std::future::Future;

use tracing::{info, warn};

use dngwatch_settle_watcher::SettleWatcher;

use crate::config::IngestConfig;
use crate::converter::Converter;
use crate::error::{IngestError, Result};
use crate::filter::ExtensionFilter;
use crate::index::IndexStore;
use crate::pipeline::{IngestStats, Ingestor};

/// Run the service until `shutdown` resolves.
///
/// Startup failures (bad config, unreadable index or source directory) are
/// returned before any file is processed.
pub async fn run<F>(config: IngestConfig, shutdown: F) -> Result<IngestStats>
where
    F: Future<Output = ()>,
{
    config.validate()?;

    let filter = ExtensionFilter::new(&config.extensions);
    if filter.is_empty() {
        warn!("No file extensions configured; every file will be skipped");
    }

    tokio::fs::create_dir_all(&config.dest_dir).await?;
    let index = IndexStore::open(&config.index_path())?;
    let ingestor = Ingestor::new(
        filter,
        index,
        Converter::new(config.converter.clone()),
        &config.dest_dir,
    )
    .with_output_extension(config.output_extension.clone());

    let watcher = SettleWatcher::new(config.watch.clone())?;
    let rx = watcher.subscribe();
    watcher.start().await?;

    let cancel = watcher.cancellation_token();
    let ingest = tokio::spawn(ingestor.run(rx, cancel.child_token()));

    shutdown.await;
    info!("Shutting down");
    watcher.stop().await?;

    ingest
        .await
        .map_err(|e| IngestError::TaskFailed(e.to_string()))
}
