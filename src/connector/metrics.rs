//! Per-connector request counters.

use std::time::Duration;

use serde::Serialize;

/// Running totals for business traffic through one connector.
///
/// Health probes never touch these counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConnectorMetrics {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    /// Running mean over every logical request, in milliseconds.
    pub average_response_time_ms: f64,
    /// Completion time of the last request, ms since the Unix epoch.
    pub last_request_ms: Option<u64>,
    /// `failed_requests / total_requests`, 0 when idle.
    pub error_rate: f64,
}

impl ConnectorMetrics {
    /// Fold one logical request into the totals.
    pub fn record(&mut self, success: bool, response_time: Duration, at_ms: u64) {
        self.total_requests += 1;
        if success {
            self.successful_requests += 1;
        } else {
            self.failed_requests += 1;
        }

        let sample = response_time.as_secs_f64() * 1000.0;
        let n = self.total_requests as f64;
        self.average_response_time_ms += (sample - self.average_response_time_ms) / n;

        self.last_request_ms = Some(at_ms);
        self.error_rate = self.failed_requests as f64 / n;
    }
}
