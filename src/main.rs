//! immich-tzfix-rs: fix capture dates and time zones of Immich assets.
//!
//! Capture times are read from local files (or, with `--no-files`, taken from
//! the server itself and relabelled into `--timezone`), every matching Immich
//! asset is compared against them, and assets that disagree are updated.

#![warn(clippy::all)]

mod cli;
mod config;
mod immich;
mod local;
mod reconcile;
mod timestamp;
mod types;

use std::fs::File;
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use config::Config;
use immich::{ImmichApi, ImmichClient};
use local::ExifMetadataReader;
use reconcile::{Mode, ReconcileConfig};
use timestamp::Timestamp;

/// Install the stderr logger, plus a debug-level file logger with `--log-file`.
///
/// `RUST_LOG` overrides the `-v` level for the stderr layer.
fn init_logging(config: &Config) -> anyhow::Result<()> {
    let filter = format!("{}={}", env!("CARGO_CRATE_NAME"), config.log_level.as_str());
    let stderr = fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)));

    let file = config
        .log_file
        .as_ref()
        .map(|path| {
            let sink = File::create(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            let directive = format!("{}=debug", env!("CARGO_CRATE_NAME"));
            anyhow::Ok(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(sink))
                    .with_filter(EnvFilter::new(directive)),
            )
        })
        .transpose()?;

    tracing_subscriber::registry()
        .with(stderr)
        .with(file)
        .init();
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = cli::Cli::parse();

    let config = match Config::from_cli(cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return Ok(ExitCode::FAILURE);
        }
    };
    init_logging(&config)?;
    tracing::debug!(?config, "Starting immich-tzfix-rs");

    run(config).await
}

async fn run(config: Config) -> anyhow::Result<ExitCode> {
    let mode = if config.no_files {
        Mode::ResetOnly
    } else {
        let reference = Timestamp::now(config.timezone);
        let files = local::expand_paths(&config.paths);
        let records = local::build_local_records(&files, &reference, &ExifMetadataReader)?;
        if records.is_empty() {
            tracing::warn!("No valid files processed; nothing to do.");
            return Ok(ExitCode::FAILURE);
        }
        tracing::info!(
            "Processed {} path(s), {} file(s) with capture times, {} distinct names.",
            files.len(),
            records.files_read(),
            records.len()
        );
        Mode::LocalFiles(records)
    };

    let client = ImmichClient::new(&config.url, &config.api_key)?;

    let tag_ids = if config.tags.is_empty() {
        Vec::new()
    } else {
        let catalog = client
            .get_all_tags()
            .await
            .context("Failed to list tags on Immich server")?;
        match immich::tags::resolve_tag_ids(&config.tags, &catalog) {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!("{}", e);
                return Ok(ExitCode::FAILURE);
            }
        }
    };

    let criteria = immich::search::build_criteria(&config.search_filters(), tag_ids);
    tracing::debug!(?criteria, "Searching assets");

    let reconcile_config = ReconcileConfig {
        mode,
        timezone: config.timezone,
        try_prefix: config.try_prefix.clone(),
        dry_run: config.dry_run,
    };
    if config.dry_run {
        tracing::info!("[DRY RUN] No assets will be updated");
    }

    let summary = reconcile::reconcile_all(&client, criteria, &reconcile_config).await?;
    summary.log(config.dry_run);
    Ok(ExitCode::SUCCESS)
}
