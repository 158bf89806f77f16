use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

/// Log output flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable text
    #[default]
    Pretty,
    /// One JSON object per event, including the current span
    Json,
}

/// Initialize structured logging. `RUST_LOG` takes precedence over `level`.
pub fn init_telemetry(format: LogFormat, level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()?,
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()?,
    }

    tracing::debug!(?format, "Telemetry initialized");
    Ok(())
}

/// Generate a correlation ID for linking the events of one run
pub fn generate_run_id() -> String {
    Uuid::new_v4().to_string()
}

/// Span wrapping one bot command
pub fn create_run_span(command: &str, run_id: &str, dry_run: bool) -> tracing::Span {
    tracing::info_span!(
        "pullwarden_run",
        command = command,
        run.id = run_id,
        dry_run = dry_run
    )
}
