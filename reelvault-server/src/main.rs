//! Reelvault daemon entry point.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use reelvault_core::indexer::fs_watch;
use reelvault_core::indexer::pipeline::MediaPipeline;
use reelvault_core::resolver::MetadataResolver;
use reelvault_core::thumbnails::ThumbnailGenerator;
use reelvault_core::tmdb::TmdbClient;
use reelvault_core::transcode::{TranscodeOptions, TranscodePipeline};
use reelvault_core::{Indexer, IndexerOptions, MediaVault, MemoryCatalog, Prober};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "reelvault", about = "Media ingestion and cataloging daemon")]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, default_value = "reelvault.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = reelvault_config::load_or_default(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;
    info!(config = %cli.config.display(), "configuration loaded");

    if config.tmdb.api_key.is_empty() {
        warn!("no TMDB API key configured; metadata lookups will fail");
    }

    let vault = MediaVault::new(&config.storage.data_dir);
    vault
        .ensure_layout()
        .await
        .context("creating storage layout")?;

    let catalog = Arc::new(MemoryCatalog::new());
    let tmdb = TmdbClient::new(&config.tmdb.api_key);
    let resolver = MetadataResolver::new(tmdb, vault.clone());

    let thumbnails = config
        .thumbnails
        .enabled
        .then(|| ThumbnailGenerator::new("ffmpeg", config.thumbnails.interval_secs));

    let pipeline = MediaPipeline::new(
        Prober::default(),
        TranscodePipeline::new(TranscodeOptions {
            ffmpeg_path: "ffmpeg".to_string(),
            hardware_accel: config.transcode.hardware_accel,
            quality_levels: config.transcode.quality_levels.clone(),
        }),
        thumbnails,
        resolver,
        vault.clone(),
        catalog.clone(),
    );

    let indexer = Indexer::spawn(
        Arc::new(pipeline),
        catalog,
        IndexerOptions {
            debounce: Duration::from_secs(10),
            retry_failed: config.watch.retry_failed,
            remove_after_indexing: config.watch.remove_after_indexing,
        },
    );

    let _watch_guard = if config.watch.enabled {
        let dir = &config.watch.directory;
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("creating watch directory {}", dir.display()))?;
        Some(
            fs_watch::watch_directory(dir, indexer.clone())
                .await
                .context("starting filesystem watcher")?,
        )
    } else {
        info!("filesystem watching disabled");
        None
    };

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    info!("shutting down");
    Ok(())
}
