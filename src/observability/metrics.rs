//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by endpoint, status
//! - `proxy_request_duration_seconds` (histogram): latency by endpoint
//! - `proxy_upstream_failures_total` (counter): local failures by endpoint, kind
//!
//! Recording is a no-op until `init_metrics` installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one answered request.
pub fn record_request(endpoint: &'static str, status: u16, start: Instant) {
    metrics::counter!(
        "proxy_requests_total",
        "endpoint" => endpoint,
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("proxy_request_duration_seconds", "endpoint" => endpoint)
        .record(start.elapsed().as_secs_f64());
}

/// Record a request that failed before an upstream status was received.
fn record_failure(endpoint: &'static str, kind: &'static str) {
    metrics::counter!(
        "proxy_upstream_failures_total",
        "endpoint" => endpoint,
        "kind" => kind
    )
    .increment(1);
}

/// Record a request answered locally, without an upstream status line.
pub fn record_local_failure(endpoint: &'static str, kind: &'static str, status: u16, start: Instant) {
    record_failure(endpoint, kind);
    record_request(endpoint, status, start);
}
