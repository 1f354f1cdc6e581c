//! `tracing` subscriber setup.
//!
//! Installs one global subscriber: an `EnvFilter` plus either a pretty or a
//! JSON fmt layer. JSON lines carry the span fields (`correlation_id`,
//! `address`, ...) so they can be shipped to a log aggregator as-is.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{TelemetryConfig, TelemetryError};

/// Handle proving the global subscriber was installed by this crate.
#[derive(Debug)]
pub struct LoggingHandle {
    service_name: String,
}

impl LoggingHandle {
    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over `config.log_level` when set. Fails if a
/// global subscriber is already installed.
pub fn init_logging(config: &TelemetryConfig) -> Result<LoggingHandle, TelemetryError> {
    let env_filter = build_filter(&config.log_level)?;

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = match (config.console_output, config.json_logs) {
        (false, _) => registry.try_init(),
        (true, true) => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .try_init(),
        (true, false) => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .try_init(),
    };
    installed.map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;

    tracing::info!(
        service = %config.service_name,
        json_logs = config.json_logs,
        "Logging initialized"
    );

    Ok(LoggingHandle {
        service_name: config.service_name.clone(),
    })
}

fn build_filter(log_level: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .map_err(|e| TelemetryError::Config(format!("invalid log filter {log_level:?}: {e}")))
}
