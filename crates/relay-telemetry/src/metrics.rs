//! Prometheus metrics for the request/response layer.
//!
//! All metrics follow the naming convention: `relay_<metric>_<unit>`
//!
//! Metrics live in a crate-private registry. Recording works before
//! [`register_metrics`] is called; registration only makes them visible to
//! [`encode_metrics`].

use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, Encoder, Histogram, HistogramOpts, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

use crate::TelemetryError;

/// Outcome label values for [`REQUEST_OUTCOMES`].
pub mod outcome {
    pub const SUCCESS: &str = "success";
    pub const TRANSPORT_ERROR: &str = "transport_error";
    pub const TIMEOUT: &str = "timeout";
    pub const CANCELLED: &str = "cancelled";
}

lazy_static! {
    /// Registry backing [`encode_metrics`]
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // REQUEST CLIENT
    // =========================================================================

    /// Requests handed to the transport
    pub static ref REQUESTS_SENT: Counter = Counter::new(
        "relay_requests_sent_total",
        "Total requests sent to a service address"
    ).expect("metric creation failed");

    /// Terminal outcome of every request call
    pub static ref REQUEST_OUTCOMES: CounterVec = CounterVec::new(
        Opts::new("relay_request_outcomes_total", "Request outcomes"),
        &["outcome"]  // success/transport_error/timeout/cancelled
    ).expect("metric creation failed");

    /// Responses whose correlation id had no live pending request
    pub static ref STALE_RESPONSES: Counter = Counter::new(
        "relay_stale_responses_total",
        "Responses discarded because no request was waiting for them"
    ).expect("metric creation failed");

    /// Time from send to terminal outcome
    pub static ref REQUEST_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "relay_request_duration_seconds",
            "Time from request send to its outcome"
        ).buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0])
    ).expect("metric creation failed");

    // =========================================================================
    // RESPONDER
    // =========================================================================

    /// Requests the responder could not answer
    pub static ref RESPONDER_FAILURES: Counter = Counter::new(
        "relay_responder_failures_total",
        "Requests whose processing failed and were handed to the failure channel"
    ).expect("metric creation failed");
}

/// Outcome of the one registration attempt, replayed on every later call.
static REGISTRATION: OnceLock<Result<(), String>> = OnceLock::new();

/// Handle returned by [`register_metrics`].
#[derive(Debug, Clone, Copy)]
pub struct MetricsHandle {
    _private: (),
}

/// Register all metrics with [`REGISTRY`].
///
/// Registration is attempted once. Every call, the first included, returns
/// that attempt's outcome.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    registered_once(&REGISTRATION, || register_all(&REGISTRY))
}

fn registered_once(
    outcome: &OnceLock<Result<(), String>>,
    register: impl FnOnce() -> Result<(), prometheus::Error>,
) -> Result<MetricsHandle, TelemetryError> {
    outcome
        .get_or_init(|| register().map_err(|e| e.to_string()))
        .clone()
        .map(|()| MetricsHandle { _private: () })
        .map_err(TelemetryError::MetricsInit)
}

fn register_all(registry: &Registry) -> Result<(), prometheus::Error> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(REQUESTS_SENT.clone()),
        Box::new(REQUEST_OUTCOMES.clone()),
        Box::new(STALE_RESPONSES.clone()),
        Box::new(REQUEST_DURATION.clone()),
        Box::new(RESPONDER_FAILURES.clone()),
    ];

    for metric in metrics {
        registry.register(metric)?;
    }
    Ok(())
}

/// Encode all registered metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Record one terminal request outcome.
pub fn record_outcome(outcome: &str, elapsed_secs: f64) {
    REQUEST_OUTCOMES.with_label_values(&[outcome]).inc();
    REQUEST_DURATION.observe(elapsed_secs);
}
