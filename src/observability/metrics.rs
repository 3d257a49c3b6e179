//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (requests, latency, storage errors)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `gateway_requests_total` (counter): responses by status and outcome
//! - `gateway_request_duration_seconds` (histogram): time to response headers
//! - `gateway_storage_errors_total` (counter): backend failures by stage
//! - `gateway_stream_failures_total` (counter): bodies cut short after headers
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record a finished request.
pub fn record_request(status: u16, outcome: &'static str, start_time: Instant) {
    metrics::counter!(
        "gateway_requests_total",
        "status" => status.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!("gateway_request_duration_seconds")
        .record(start_time.elapsed().as_secs_f64());
}

/// Record a storage failure that happened before headers were sent.
pub fn record_storage_error(stage: &'static str) {
    metrics::counter!("gateway_storage_errors_total", "stage" => stage).increment(1);
}

/// Record a body stream that failed after headers were sent.
pub fn record_stream_failure() {
    metrics::counter!("gateway_stream_failures_total").increment(1);
}
