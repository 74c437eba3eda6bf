use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use dngwatch_ingest::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = Cli::parse().into_config();
    tracing::info!(
        "Watching {:?}, converting into {}",
        config.source_dirs(),
        config.dest_dir.display()
    );

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    let stats = dngwatch_ingest::service::run(config, shutdown)
        .await
        .context("dngwatch failed")?;
    tracing::info!("Converted {} file(s)", stats.converted);
    Ok(())
}
