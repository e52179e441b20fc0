#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod args;
mod commands;

use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use args::Args;
use clap::Parser;
use fieldnote_client::{ApiClient, HttpClient};
use fieldnote_config::ConfigStore;
use fieldnote_telemetry::Logger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize telemetry
    fieldnote_telemetry::init(&args.log_filter, args.log_format)?;

    // Load configuration
    let store = Arc::new(ConfigStore::open(&args.config));
    let config = store
        .get()
        .with_context(|| format!("failed to load {}", args.config.display()))?;

    let logger = Logger::new(config.log.capacity);

    tracing::debug!(
        config_path = %args.config.display(),
        auth_mode = %config.auth_mode,
        strategy = %config.upload.strategy,
        "starting fieldnote"
    );

    let api = ApiClient::new(HttpClient::new(store, logger.clone())?);
    let result = commands::run(args.command, api).await;

    if args.dump_log {
        dump_log(&logger)?;
    }

    result
}

/// Write the structured log buffer to stderr as JSON lines
fn dump_log(logger: &Logger) -> anyhow::Result<()> {
    let mut stderr = std::io::stderr().lock();
    for entry in logger.snapshot() {
        serde_json::to_writer(&mut stderr, &entry)?;
        writeln!(stderr)?;
    }
    Ok(())
}
