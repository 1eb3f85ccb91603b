//! CLI entry point for the bilidown tool.

use std::io::{self, IsTerminal};

use anyhow::{Context, Result};
use bilidown_core::{AppError, BatchReport, Downloader};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

mod app_config;
mod cli;
mod progress;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let download = args.command.download_args();
    let mode = args.command.mode();

    let file_config = app_config::load_file_config(args.config.as_deref())?;
    let config = app_config::build_config(
        download,
        file_config.as_ref(),
        std::env::var(app_config::COOKIE_ENV).ok(),
    )?;
    debug!(
        max_attempts = config.max_attempts,
        concurrency = config.concurrency,
        failure_policy = ?config.failure_policy,
        cookie_set = config.cookie.is_some(),
        "Configuration resolved"
    );

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let downloader = Downloader::new(&config)
        .context("Failed to initialize downloader")?
        .with_events(event_tx);

    info!(reference = %download.bvid, %mode, list = download.list, "Resolving");
    let items = downloader.resolve(&download.bvid, download.list).await?;
    info!(items = items.len(), "Resolved");
    for item in &items {
        debug!(cid = %item.stream_id, title = %item.title, "Queued item");
    }

    let total_streams = (items.len() * mode.kinds().len()) as u64;
    let show_progress = !args.quiet && io::stderr().is_terminal();
    let progress = progress::spawn_progress_ui(show_progress, total_streams, event_rx);

    let result = downloader.download(items, &download.save, mode).await;
    // Dropping the downloader closes the event channel and ends the progress task.
    drop(downloader);
    if let Err(e) = progress.await {
        warn!(error = %e, "Progress task panicked");
    }

    match result {
        Ok(report) => {
            log_report(&report);
            println!(
                "Download Finish All! Time consuming: {:.2} seconds",
                report.elapsed_seconds()
            );
            Ok(())
        }
        Err(error) => {
            if let AppError::Batch(batch_error) = &error
                && let Some(report) = batch_error.report()
            {
                log_report(report);
                for failure in &report.failures {
                    warn!(
                        item = failure.index + 1,
                        title = %failure.item.title,
                        error = %failure.error,
                        "Item failed"
                    );
                }
                for merge_failure in &report.merge_failures {
                    warn!(error = %merge_failure, "Merge failed");
                }
            }
            Err(error.into())
        }
    }
}

fn log_report(report: &BatchReport) {
    info!(
        items = report.items,
        streams = report.outcomes.len(),
        merged = report.merged.len(),
        failed = report.failures.len(),
        bytes = report.bytes_written(),
        elapsed_secs = report.elapsed_seconds(),
        "Download complete"
    );
}
