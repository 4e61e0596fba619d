//! Metrics collection and exposition.
//!
//! # Metrics
//! - `connector_requests_total` (counter): logical requests by service, outcome
//! - `connector_request_duration_seconds` (histogram): call latency, backoff included
//! - `connector_retries_total` (counter): retried attempts by service
//! - `connector_service_up` (gauge): 1=healthy, 0=unhealthy, per last probe
//! - `connector_status_transitions_total` (counter): status events by service, status
//!
//! Recording is a no-op until a recorder is installed, so library users
//! and tests pay nothing unless the daemon enables the exporter.

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(service_id: &str, success: bool, elapsed: Duration) {
    let outcome = if success { "success" } else { "failure" };
    counter!("connector_requests_total", "service" => service_id.to_string(), "outcome" => outcome)
        .increment(1);
    histogram!("connector_request_duration_seconds", "service" => service_id.to_string())
        .record(elapsed.as_secs_f64());
}

pub fn record_retry(service_id: &str) {
    counter!("connector_retries_total", "service" => service_id.to_string()).increment(1);
}

pub fn record_service_health(service_id: &str, healthy: bool) {
    gauge!("connector_service_up", "service" => service_id.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_status_transition(service_id: &str, status: &'static str) {
    counter!(
        "connector_status_transitions_total",
        "service" => service_id.to_string(),
        "status" => status
    )
    .increment(1);
}
