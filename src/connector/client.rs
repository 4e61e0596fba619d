//! Resilient HTTP client for a single remote service.
//!
//! # Responsibilities
//! - Resolve endpoints against the configured base URL
//! - Inject identity, static, per-call and auth headers
//! - Retry failed attempts with exponential backoff
//! - Report every outcome as a `ConnectorResponse`
//! - Keep request metrics, one sample per logical call

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use arc_swap::{ArcSwap, ArcSwapOption};
use futures_util::future::join_all;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::ConnectorConfig;
use crate::connector::auth::auth_header;
use crate::connector::metrics::ConnectorMetrics;
use crate::connector::response::{now_millis, BatchRequest, ConnectorResponse, HttpMethod, RequestOptions};
use crate::observability::metrics;
use crate::resilience::{check_status, AttemptError, RateLimiter, RetrySchedule, DEFAULT_BACKOFF_BASE};

const REQUEST_ID_HEADER: &str = "x-request-id";
const SERVICE_ID_HEADER: &str = "x-service-id";

/// Result of the attempt loop: the final outcome and how many attempts it took.
struct AttemptOutcome {
    result: Result<(StatusCode, Vec<u8>), AttemptError>,
    attempts: u32,
}

/// Client wrapper owning one service's configuration and metrics.
pub struct Connector {
    config: ArcSwap<ConnectorConfig>,
    client: Client,
    metrics: Mutex<ConnectorMetrics>,
    rate_limiter: ArcSwapOption<RateLimiter>,
    backoff_base: Duration,
}

impl Connector {
    /// Create a connector with the default one-second backoff base.
    pub fn new(config: ConnectorConfig) -> Self {
        Self::with_backoff_base(config, DEFAULT_BACKOFF_BASE)
    }

    /// Create a connector whose retry delays are `2^attempt * base`.
    pub fn with_backoff_base(config: ConnectorConfig, backoff_base: Duration) -> Self {
        let client = Client::builder()
            .user_agent(concat!("connector-hub/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to default HTTP client");
                Client::new()
            });

        let rate_limiter = config.rate_limit.as_ref().map(|spec| Arc::new(RateLimiter::new(spec)));

        Self {
            config: ArcSwap::from_pointee(config),
            client,
            metrics: Mutex::new(ConnectorMetrics::default()),
            rate_limiter: ArcSwapOption::new(rate_limiter),
            backoff_base,
        }
    }

    pub fn service_id(&self) -> String {
        self.config.load().service_id.clone()
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> Arc<ConnectorConfig> {
        self.config.load_full()
    }

    /// Replace the configuration. Metrics are kept; the service identifier cannot change.
    pub fn update_config(&self, mut config: ConnectorConfig) {
        let current = self.config.load_full();
        if config.service_id != current.service_id {
            tracing::warn!(
                service_id = %current.service_id,
                requested = %config.service_id,
                "Ignoring service identifier change on config update"
            );
            config.service_id = current.service_id.clone();
        }
        if config.rate_limit != current.rate_limit {
            self.rate_limiter
                .store(config.rate_limit.as_ref().map(|spec| Arc::new(RateLimiter::new(spec))));
        }
        self.config.store(Arc::new(config));
    }

    /// Issue a request against `endpoint`, relative to the base URL.
    ///
    /// Never fails: exhausted retries, timeouts and decode errors come back
    /// as a response with `success = false`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> ConnectorResponse<T> {
        let started = Instant::now();
        let config = self.config.load_full();
        let url = join_url(&config.base_url, endpoint);
        let timeout = options.timeout.unwrap_or_else(|| config.timeout());
        let headers = build_headers(&config, &options);

        let outcome = self
            .execute_with_retries(&config, &url, options.method, options.body.as_ref(), &headers, timeout)
            .await;

        let (success, data, error, status_code) = match outcome.result {
            Ok((status, bytes)) => match decode::<T>(&bytes) {
                Ok(data) => (true, data, None, status.as_u16()),
                Err(e) => (
                    false,
                    None,
                    Some(format!("invalid response body: {e}")),
                    status.as_u16(),
                ),
            },
            Err(err) => {
                tracing::warn!(
                    service_id = %config.service_id,
                    url = %url,
                    attempts = outcome.attempts,
                    error = %err,
                    "Request failed"
                );
                (false, None, Some(err.to_string()), err.status_code())
            }
        };

        let elapsed = started.elapsed();
        let timestamp_ms = now_millis();
        self.metrics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(success, elapsed, timestamp_ms);
        metrics::record_request(&config.service_id, success, elapsed);

        ConnectorResponse {
            success,
            data,
            error,
            status_code,
            response_time_ms: elapsed.as_millis() as u64,
            timestamp_ms,
            attempts: outcome.attempts,
        }
    }

    /// Probe the configured health endpoint with the probe timeout.
    ///
    /// Single attempt, body ignored, request metrics untouched.
    pub async fn health_check(&self) -> ConnectorResponse<()> {
        let config = self.config.load_full();
        let endpoint = config.health_check.endpoint.clone();
        self.probe(&endpoint, config.health_check.timeout()).await
    }

    /// One unretried GET to `endpoint`; does not count toward request metrics.
    pub async fn probe(&self, endpoint: &str, timeout: Duration) -> ConnectorResponse<()> {
        let started = Instant::now();
        let config = self.config.load_full();
        let url = join_url(&config.base_url, endpoint);
        let headers = build_headers(&config, &RequestOptions::get());

        let result = self.send_once(&url, HttpMethod::Get, None, &headers, timeout).await;
        let elapsed = started.elapsed();

        let (success, error, status_code) = match result {
            Ok((status, _)) => (true, None, status.as_u16()),
            Err(err) => {
                tracing::debug!(service_id = %config.service_id, url = %url, error = %err, "Probe failed");
                (false, Some(err.to_string()), err.status_code())
            }
        };

        ConnectorResponse {
            success,
            data: None,
            error,
            status_code,
            response_time_ms: elapsed.as_millis() as u64,
            timestamp_ms: now_millis(),
            attempts: 1,
        }
    }

    /// Run every request concurrently; results keep submission order.
    ///
    /// Each entry retries independently and a failure cancels nothing.
    pub async fn batch_request<T: DeserializeOwned>(
        &self,
        requests: Vec<BatchRequest>,
    ) -> Vec<ConnectorResponse<T>> {
        join_all(
            requests
                .into_iter()
                .map(|req| async move { self.request::<T>(&req.endpoint, req.options).await }),
        )
        .await
    }

    pub fn get_metrics(&self) -> ConnectorMetrics {
        self.metrics.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn reset_metrics(&self) {
        *self.metrics.lock().unwrap_or_else(PoisonError::into_inner) = ConnectorMetrics::default();
    }

    async fn execute_with_retries(
        &self,
        config: &ConnectorConfig,
        url: &str,
        method: HttpMethod,
        body: Option<&Value>,
        headers: &HeaderMap,
        timeout: Duration,
    ) -> AttemptOutcome {
        let mut schedule = RetrySchedule::new(config.retries, timeout, self.backoff_base);

        loop {
            if let Some(limiter) = self.rate_limiter.load_full() {
                limiter.acquire().await;
            }

            let deadline = schedule.start_attempt(Instant::now());
            let remaining = deadline.saturating_duration_since(Instant::now());
            let result = self.send_once(url, method, body, headers, remaining).await;

            let err = match result {
                Ok(ok) => {
                    return AttemptOutcome {
                        result: Ok(ok),
                        attempts: schedule.attempt(),
                    }
                }
                Err(err) => err,
            };

            match schedule.next_delay() {
                Some(delay) => {
                    tracing::warn!(
                        service_id = %config.service_id,
                        url = %url,
                        attempt = schedule.attempt(),
                        wait_ms = delay.as_millis() as u64,
                        error = %err,
                        "Attempt failed, retrying with backoff"
                    );
                    metrics::record_retry(&config.service_id);
                    tokio::time::sleep(delay).await;
                }
                None => {
                    return AttemptOutcome {
                        result: Err(err),
                        attempts: schedule.attempt(),
                    }
                }
            }
        }
    }

    async fn send_once(
        &self,
        url: &str,
        method: HttpMethod,
        body: Option<&Value>,
        headers: &HeaderMap,
        timeout: Duration,
    ) -> Result<(StatusCode, Vec<u8>), AttemptError> {
        let mut builder = self
            .client
            .request(method.into(), url)
            .headers(headers.clone())
            .timeout(timeout);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AttemptError::from_transport(&e, timeout))?;

        let status = response.status();
        check_status(status)?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AttemptError::from_transport(&e, timeout))?;
        Ok((status, bytes.to_vec()))
    }
}

impl std::fmt::Debug for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let config = self.config.load();
        f.debug_struct("Connector")
            .field("service_id", &config.service_id)
            .field("base_url", &config.base_url)
            .field("retries", &config.retries)
            .finish()
    }
}

/// Append `endpoint` to `base`, avoiding a doubled slash.
fn join_url(base: &str, endpoint: &str) -> String {
    match (base.ends_with('/'), endpoint.starts_with('/')) {
        (true, true) => format!("{}{}", base, &endpoint[1..]),
        (false, false) if !endpoint.is_empty() => format!("{}/{}", base, endpoint),
        _ => format!("{}{}", base, endpoint),
    }
}

/// Headers for one call, later entries overriding earlier ones:
/// identity, configured static headers, per-call headers, auth.
fn build_headers(config: &ConnectorConfig, options: &RequestOptions) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Ok(value) = HeaderValue::from_str(&uuid::Uuid::new_v4().to_string()) {
        headers.insert(REQUEST_ID_HEADER, value);
    }
    insert_header(&mut headers, SERVICE_ID_HEADER, &config.service_id);

    for (name, value) in config.headers.iter().chain(options.headers.iter()) {
        insert_header(&mut headers, name, value);
    }

    if let Some(auth) = &config.auth {
        let (name, value) = auth_header(auth);
        match HeaderValue::from_str(&value) {
            Ok(mut value) => {
                value.set_sensitive(true);
                headers.insert(name, value);
            }
            Err(_) => tracing::warn!(
                service_id = %config.service_id,
                scheme = auth.kind(),
                "Credential is not a valid header value, sending without auth"
            ),
        }
    }

    headers
}

fn insert_header(headers: &mut HeaderMap, name: &str, value: &str) {
    match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
        (Ok(name), Ok(value)) => {
            headers.insert(name, value);
        }
        _ => tracing::warn!(header = %name, "Skipping invalid header"),
    }
}

/// Empty bodies decode to `None`; anything else must be valid JSON for `T`.
fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<Option<T>, serde_json::Error> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(bytes).map(Some)
}
