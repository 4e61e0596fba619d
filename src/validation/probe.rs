//! Scripted probe sequence against a live service.

use std::time::Instant;

use dashmap::DashMap;
use reqwest::StatusCode;
use serde::Serialize;

use crate::config::ConnectorConfig;
use crate::connector::response::now_millis;
use crate::connector::Connector;
use crate::validation::rules::{validate_connector_config, validate_service_config, ServiceDescriptor, ValidationResult};

pub const CONFIG_VALIDATION: &str = "config-validation";
pub const ENDPOINT_AVAILABILITY: &str = "endpoint-availability";
pub const RESPONSE_TIME: &str = "response-time";
pub const AUTH_VALIDATION: &str = "auth-validation";

/// One probe row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectorTestResult {
    pub test_name: &'static str,
    pub passed: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
    pub timestamp_ms: u64,
}

impl ConnectorTestResult {
    fn new(test_name: &'static str, started: Instant, outcome: Result<(), String>) -> Self {
        Self {
            test_name,
            passed: outcome.is_ok(),
            error: outcome.err(),
            duration_ms: started.elapsed().as_millis() as u64,
            timestamp_ms: now_millis(),
        }
    }
}

/// Diagnostic harness, independent of any registry state.
///
/// Keeps the latest probe run per service identifier.
#[derive(Debug, Default)]
pub struct ConnectorValidator {
    results: DashMap<String, Vec<ConnectorTestResult>>,
}

impl ConnectorValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate_connector_config(&self, config: &ConnectorConfig) -> ValidationResult {
        validate_connector_config(config)
    }

    pub fn validate_service_config(&self, descriptor: &ServiceDescriptor) -> ValidationResult {
        validate_service_config(descriptor)
    }

    /// Run every probe in order, each regardless of the others' outcome.
    ///
    /// The run replaces any earlier results stored for `service_id`.
    pub async fn test_connector(&self, service_id: &str, config: &ConnectorConfig) -> Vec<ConnectorTestResult> {
        let mut results = Vec::with_capacity(4);
        let connector = Connector::new(config.clone());

        let started = Instant::now();
        let validation = validate_connector_config(config);
        let outcome = if validation.is_valid {
            Ok(())
        } else {
            Err(validation.errors.join("; "))
        };
        results.push(ConnectorTestResult::new(CONFIG_VALIDATION, started, outcome));

        let started = Instant::now();
        let health = connector.health_check().await;
        let outcome = match health.error {
            None if health.success => Ok(()),
            error => Err(error.unwrap_or_else(|| "health endpoint unavailable".to_string())),
        };
        results.push(ConnectorTestResult::new(ENDPOINT_AVAILABILITY, started, outcome));

        let started = Instant::now();
        let timing = connector.probe(&config.health_check.endpoint, config.timeout()).await;
        let outcome = if !timing.success {
            Err(timing.error.unwrap_or_else(|| "no response".to_string()))
        } else if timing.response_time_ms > config.timeout_ms {
            Err(format!(
                "round trip took {} ms, over the {} ms request timeout",
                timing.response_time_ms, config.timeout_ms
            ))
        } else {
            Ok(())
        };
        results.push(ConnectorTestResult::new(RESPONSE_TIME, started, outcome));

        if let Some(auth) = &config.auth {
            let started = Instant::now();
            let probe = connector.probe(&config.health_check.endpoint, config.timeout()).await;
            let status = StatusCode::from_u16(probe.status_code).ok();
            let outcome = match status {
                None => Err(probe.error.unwrap_or_else(|| "transport error".to_string())),
                Some(StatusCode::UNAUTHORIZED) | Some(StatusCode::FORBIDDEN) => Err(format!(
                    "{} credentials rejected with status {}",
                    auth.kind(),
                    probe.status_code
                )),
                Some(_) => Ok(()),
            };
            results.push(ConnectorTestResult::new(AUTH_VALIDATION, started, outcome));
        }

        let failed = results.iter().filter(|r| !r.passed).count();
        if failed == 0 {
            tracing::info!(service_id = %service_id, tests = results.len(), "Connector probes passed");
        } else {
            tracing::warn!(service_id = %service_id, tests = results.len(), failed, "Connector probes failed");
        }

        self.results.insert(service_id.to_string(), results.clone());
        results
    }

    /// Results of the latest run for `service_id`, empty if never run.
    pub fn get_test_results(&self, service_id: &str) -> Vec<ConnectorTestResult> {
        self.results
            .get(service_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    pub fn clear_test_results(&self, service_id: &str) {
        self.results.remove(service_id);
    }
}
