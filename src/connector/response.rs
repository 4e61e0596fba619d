//! Request options and the response envelope.

use std::collections::BTreeMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// HTTP method of a connector request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Patch => reqwest::Method::PATCH,
        }
    }
}

/// Per-call options for [`Connector::request`](super::Connector::request).
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: HttpMethod,
    /// JSON body, serialized as-is.
    pub body: Option<Value>,
    /// Extra headers, applied after the configured static headers.
    pub headers: BTreeMap<String, String>,
    /// Overrides the configured request timeout for this call.
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post(body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            body: Some(body),
            ..Self::default()
        }
    }

    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// One entry of a batch.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub endpoint: String,
    pub options: RequestOptions,
}

impl BatchRequest {
    pub fn new(endpoint: impl Into<String>, options: RequestOptions) -> Self {
        Self {
            endpoint: endpoint.into(),
            options,
        }
    }
}

/// Outcome of a logical request, successful or not.
///
/// Ordinary remote failures are reported here with `success = false`
/// rather than as an error.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectorResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    /// HTTP status of the last attempt; 0 if no response arrived.
    pub status_code: u16,
    /// Wall time of the whole call, backoff included.
    pub response_time_ms: u64,
    /// Completion time, milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    /// Network attempts made.
    pub attempts: u32,
}

impl<T> ConnectorResponse<T> {
    /// The payload, if the call succeeded and carried one.
    pub fn into_data(self) -> Option<T> {
        if self.success { self.data } else { None }
    }
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
