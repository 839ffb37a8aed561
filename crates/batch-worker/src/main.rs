//! Batch worker for the anime post factory.
//!
//! Takes one batch command (series, episode range, resolutions, dual-audio
//! flag), acquires and merges the episodes, uploads the results, and records
//! one pending post per resolution in the durable queue.

use anyhow::{Context, Result};
use clap::Parser;
use jikan_meta::JikanClient;
use shared::{Config, Database, PostQueue, TaskRegistry, WorkPaths};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::info;

mod acquire;
mod episode;
mod media;
mod notify;
mod orchestrator;
mod request;
mod resolve;
mod upload;

#[cfg(test)]
mod testing;

use acquire::ScriptAcquirer;
use media::Ffmpeg;
use notify::LogNotifier;
use orchestrator::BatchOrchestrator;
use upload::ArchiveUploader;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Requester identity (single-flight key)
    #[arg(long, default_value_t = 0)]
    requester: i64,

    /// Batch command, e.g. '-a "Show" -e 1-5 -r all -dual'
    command: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Initialize logging; -v overrides the configured level
    let log_level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        config
            .logging
            .default_level
            .parse()
            .unwrap_or(tracing::Level::INFO)
    };

    shared::logging::init(shared::LogConfig {
        log_dir: config.log_dir().to_string_lossy().to_string(),
        component: "batch-worker".to_string(),
        default_level: log_level,
        console: config.logging.console,
        file: config.logging.file,
        json_format: config.logging.json_format,
    })?;

    info!("Batch worker starting");
    info!(config_file = %args.config.display(), "Loaded configuration");

    // Malformed commands are rejected before any task registration
    let request = request::parse_command(&args.command)
        .map_err(|e| anyhow::anyhow!("Rejected batch command: {}", e))?;

    info!(
        series = %request.series,
        episodes = request.episodes.len(),
        resolutions = ?request.resolutions,
        dual_audio = request.dual_audio,
        "Parsed batch request"
    );

    // Working tree
    let paths = WorkPaths::new(config.data_dir());
    paths
        .create_dirs()
        .context("Failed to create data directories")?;

    // Durable post queue
    let db_path = config.database_path();
    info!(db_path = %db_path.display(), "Opening database");
    let database = Database::open(&db_path).context("Failed to open database")?;
    let queue = Arc::new(Mutex::new(PostQueue::new(database)));

    // Collaborators
    let metadata = JikanClient::new(
        config.jikan.base_url.clone(),
        Duration::from_secs(config.jikan.timeout_seconds),
    )
    .context("Failed to create metadata client")?;

    let orchestrator = BatchOrchestrator::new(
        TaskRegistry::new(),
        Arc::clone(&queue),
        Arc::new(metadata),
        Arc::new(ScriptAcquirer::new(
            &config.downloader.script,
            paths.downloads_dir(),
        )),
        Arc::new(Ffmpeg),
        Arc::new(ArchiveUploader::new(config.archive_dir())),
        Arc::new(LogNotifier),
        paths,
        Duration::from_secs(config.downloader.cooldown_seconds),
    );

    orchestrator.run(&request, args.requester).await?;

    let pending = queue.lock().unwrap().len()?;
    info!(pending, "Batch worker finished");

    Ok(())
}
