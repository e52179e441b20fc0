#![allow(clippy::must_use_candidate)]

//! Telemetry for fieldnote
//!
//! Two sinks: the bounded in-process [`Logger`] that records every request
//! and response, and the `tracing` subscriber it mirrors into

mod logger;

pub use logger::{Level, LogEntry, Logger, SubscriptionId};

/// Output format for the `tracing` console sink
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Initialize the `tracing` subscriber
///
/// Installs an `EnvFilter` built from `log_filter` (falling back to `info`)
/// and a `fmt` layer writing to stderr so command output on stdout stays
/// machine-readable.
///
/// # Errors
///
/// Returns an error if a global subscriber has already been installed
pub fn init(log_filter: &str, format: LogFormat) -> anyhow::Result<()> {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_new(log_filter).unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Text => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()
                .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;
        }
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()
                .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;
        }
    }

    Ok(())
}
