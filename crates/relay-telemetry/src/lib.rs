//! # Relay Telemetry
//!
//! Process-wide observability for the relay workspace.
//!
//! ## Components
//!
//! - **Logging**: one global `tracing` subscriber with an `EnvFilter` and a
//!   pretty or JSON fmt layer
//! - **Metrics**: Prometheus counters and histograms for request outcomes,
//!   stale responses and responder failures
//!
//! ## Usage
//!
//! ```rust,ignore
//! use relay_telemetry::{init_telemetry, TelemetryConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let _guard = init_telemetry(TelemetryConfig::from_env())?;
//!
//!     // Application code here
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RELAY_SERVICE_NAME` | `relay` | Service name in log lines |
//! | `RELAY_LOG_LEVEL` / `RUST_LOG` | `info` | Log filter |
//! | `RELAY_CONSOLE_OUTPUT` | `true` | Write logs to the console |
//! | `RELAY_JSON_LOGS` | `false` (`true` in containers) | JSON log format |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::LoggingHandle;
pub use metrics::{
    encode_metrics, record_outcome, register_metrics, MetricsHandle, REQUESTS_SENT,
    REQUEST_DURATION, REQUEST_OUTCOMES, RESPONDER_FAILURES, STALE_RESPONSES,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and metrics.
///
/// Returns a guard that must be held for the lifetime of the application.
/// When dropped, it logs shutdown and flushes stdout/stderr.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    // Metrics first so nothing recorded during startup is missed by exports
    let metrics = register_metrics()?;
    let logging = logging::init_logging(&config)?;

    Ok(TelemetryGuard {
        logging,
        _metrics: metrics,
    })
}

/// Guard that keeps telemetry active. Drop to flush and shut down.
#[derive(Debug)]
pub struct TelemetryGuard {
    logging: LoggingHandle,
    _metrics: MetricsHandle,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.logging.service_name(), "Shutting down telemetry...");
        use std::io::Write;
        let _ = std::io::stdout().flush();
        let _ = std::io::stderr().flush();
    }
}

/// Convenience macro for recording a metric increment.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}
