//! Configuration schema definitions.
//!
//! This module defines the configuration structure for the hub and for
//! every connector it manages. All types derive Serde traits for
//! deserialization from config files.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the connector hub daemon.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HubConfig {
    /// Admin API settings.
    pub admin: AdminConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,

    /// Service policies registered at startup.
    pub services: Vec<ServicePolicy>,
}

/// Per-service connector configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ConnectorConfig {
    /// Unique service identifier.
    pub service_id: String,

    /// Absolute base URL every endpoint is appended to.
    pub base_url: String,

    /// Default per-attempt request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Retries after the first attempt (total attempts = retries + 1).
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Static headers sent with every request.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Optional authentication scheme.
    #[serde(default)]
    pub auth: Option<AuthSpec>,

    /// Health probe settings.
    #[serde(default)]
    pub health_check: HealthCheckSpec,

    /// Optional client-side rate limit.
    #[serde(default)]
    pub rate_limit: Option<RateLimitSpec>,
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_retries() -> u32 {
    3
}

impl ConnectorConfig {
    /// Create a config with defaults for everything but identity and address.
    pub fn new(service_id: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            service_id: service_id.into(),
            base_url: base_url.into(),
            timeout_ms: default_timeout_ms(),
            retries: default_retries(),
            headers: BTreeMap::new(),
            auth: None,
            health_check: HealthCheckSpec::default(),
            rate_limit: None,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Authentication scheme injected into every request.
///
/// Each variant carries exactly the fields it needs, so a bearer spec
/// without a token cannot be deserialized at all.
#[derive(Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthSpec {
    Bearer { token: String },
    ApiKey { key: String },
    Basic { username: String, password: String },
    #[serde(rename = "oauth")]
    OAuth { token: String },
}

impl AuthSpec {
    /// Short scheme name used in logs and validation messages.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthSpec::Bearer { .. } => "bearer",
            AuthSpec::ApiKey { .. } => "api_key",
            AuthSpec::Basic { .. } => "basic",
            AuthSpec::OAuth { .. } => "oauth",
        }
    }
}

// Secrets stay out of logs.
impl std::fmt::Debug for AuthSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthSpec::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            other => f
                .debug_struct(other.kind())
                .field("secret", &"<redacted>")
                .finish(),
        }
    }
}

/// Health probe configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckSpec {
    /// Path probed with GET, relative to the base URL.
    pub endpoint: String,

    /// Probe interval in milliseconds.
    pub interval_ms: u64,

    /// Probe timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for HealthCheckSpec {
    fn default() -> Self {
        Self {
            endpoint: "/health".to_string(),
            interval_ms: 30_000,
            timeout_ms: 5_000,
        }
    }
}

impl HealthCheckSpec {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Client-side rate limit: at most `requests` attempts per `window_ms`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RateLimitSpec {
    pub requests: u32,
    pub window_ms: u64,
}

/// Operational policy wrapped around a connector configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServicePolicy {
    /// Connector configuration; its `service_id` keys the policy.
    pub connector: ConnectorConfig,

    /// Connect as soon as the policy is registered.
    #[serde(default = "default_true")]
    pub auto_connect: bool,

    /// Run supervised reconnect when a periodic probe fails.
    #[serde(default = "default_true")]
    pub retry_on_failure: bool,

    /// Reconnect attempts before the service is declared in error.
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    /// Overrides `connector.health_check.interval_ms` when set.
    #[serde(default)]
    pub health_check_interval_ms: Option<u64>,
}

fn default_true() -> bool {
    true
}

fn default_max_reconnect_attempts() -> u32 {
    3
}

impl ServicePolicy {
    pub fn new(connector: ConnectorConfig) -> Self {
        Self {
            connector,
            auto_connect: true,
            retry_on_failure: true,
            max_reconnect_attempts: default_max_reconnect_attempts(),
            health_check_interval_ms: None,
        }
    }

    pub fn service_id(&self) -> &str {
        &self.connector.service_id
    }

    /// Effective periodic health check interval.
    pub fn health_check_interval(&self) -> Duration {
        Duration::from_millis(
            self.health_check_interval_ms
                .unwrap_or(self.connector.health_check.interval_ms),
        )
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log filter used when RUST_LOG is unset.
    pub log_level: String,

    /// Emit JSON log lines instead of the human format.
    pub json_logs: bool,

    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "connector_hub=info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
