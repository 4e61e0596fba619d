//! Static validation rules.
//!
//! Validation is a pure function of its input and reports every problem
//! in one pass. Errors block a connect, warnings flag risk, suggestions
//! are advisory and never affect `is_valid`.

use std::collections::HashSet;

use reqwest::header::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::{AuthSpec, ConnectorConfig};

/// Timeout above which a warning is raised.
const SLOW_TIMEOUT_MS: u64 = 30_000;
/// Retry count above which a warning is raised.
const MANY_RETRIES: u32 = 10;
/// Highest accepted service priority.
const MAX_PRIORITY: u32 = 100;

/// Outcome of a validation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
}

impl ValidationResult {
    fn from_parts(errors: Vec<String>, warnings: Vec<String>, suggestions: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
            warnings,
            suggestions,
        }
    }
}

/// Check a connector configuration for structural problems.
pub fn validate_connector_config(config: &ConnectorConfig) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut suggestions = Vec::new();

    if config.service_id.trim().is_empty() {
        errors.push("service_id is required".to_string());
    }

    let base_url = check_base_url(&config.base_url, &mut errors);

    if config.timeout_ms == 0 {
        errors.push("timeout must be greater than 0".to_string());
    } else if config.timeout_ms > SLOW_TIMEOUT_MS {
        warnings.push(format!(
            "timeout of {} ms exceeds {} ms; callers may block for a long time",
            config.timeout_ms, SLOW_TIMEOUT_MS
        ));
    }

    if config.retries > MANY_RETRIES {
        warnings.push(format!(
            "{} retries is more than {}; a dead service will hold requests for minutes",
            config.retries, MANY_RETRIES
        ));
    } else if config.retries == 0 {
        suggestions.push("retries is 0; transient failures will not be retried".to_string());
    }

    let health = &config.health_check;
    if health.endpoint.trim().is_empty() {
        errors.push("health_check.endpoint is required".to_string());
    } else if !health.endpoint.starts_with('/') {
        warnings.push(format!(
            "health_check.endpoint '{}' does not start with '/'",
            health.endpoint
        ));
    }
    if health.timeout_ms == 0 {
        errors.push("health_check.timeout must be greater than 0".to_string());
    }
    if health.interval_ms == 0 {
        errors.push("health_check.interval must be greater than 0".to_string());
    }
    if health.timeout_ms > 0 && health.interval_ms > 0 && health.timeout_ms >= health.interval_ms {
        warnings.push("health_check.timeout is not shorter than health_check.interval".to_string());
    }

    for (name, value) in &config.headers {
        if HeaderName::from_bytes(name.as_bytes()).is_err() || HeaderValue::from_str(value).is_err() {
            errors.push(format!("header '{}' is not a valid HTTP header", name));
        }
    }
    let has_service_type = config
        .headers
        .keys()
        .any(|name| name.eq_ignore_ascii_case("x-service-type"));
    if !has_service_type {
        suggestions.push(
            "add an X-Service-Type header so upstream request logs can be traced back to this service"
                .to_string(),
        );
    }

    if let Some(auth) = &config.auth {
        check_auth(auth, &mut errors);
        if base_url.as_ref().is_some_and(|url| url.scheme() == "http" && !is_loopback(url)) {
            warnings.push("credentials are sent over plain HTTP".to_string());
        }
    }

    match &config.rate_limit {
        Some(limit) => {
            if limit.requests == 0 {
                errors.push("rate_limit.requests must be greater than 0".to_string());
            }
            if limit.window_ms == 0 {
                errors.push("rate_limit.window must be greater than 0".to_string());
            }
        }
        None => suggestions.push("no rate_limit configured; bursts reach the service unthrottled".to_string()),
    }

    ValidationResult::from_parts(errors, warnings, suggestions)
}

fn check_base_url(raw: &str, errors: &mut Vec<String>) -> Option<Url> {
    if raw.trim().is_empty() {
        errors.push("base_url is required".to_string());
        return None;
    }
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => Some(url),
        Ok(url) => {
            errors.push(format!(
                "base_url '{}' must be an absolute http(s) URL, got scheme '{}'",
                raw,
                url.scheme()
            ));
            None
        }
        Err(e) => {
            errors.push(format!("base_url '{}' is not a valid absolute URL: {}", raw, e));
            None
        }
    }
}

fn check_auth(auth: &AuthSpec, errors: &mut Vec<String>) {
    let missing: Vec<&str> = match auth {
        AuthSpec::Bearer { token } | AuthSpec::OAuth { token } if token.trim().is_empty() => vec!["token"],
        AuthSpec::ApiKey { key } if key.trim().is_empty() => vec!["key"],
        AuthSpec::Basic { username, password } => {
            let mut missing = Vec::new();
            if username.is_empty() {
                missing.push("username");
            }
            if password.is_empty() {
                missing.push("password");
            }
            missing
        }
        _ => Vec::new(),
    };
    for field in missing {
        errors.push(format!("auth ({}) requires a non-empty {}", auth.kind(), field));
    }
}

fn is_loopback(url: &Url) -> bool {
    matches!(url.host_str(), Some("localhost") | Some("127.0.0.1") | Some("[::1]"))
}

/// Descriptor of a platform service as registered alongside its connector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceDescriptor {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub version: String,
    pub category: String,
    pub priority: u32,
    pub author: Option<String>,
    pub dependencies: Vec<String>,
    pub tools: Vec<String>,
}

/// Check a service descriptor.
pub fn validate_service_config(descriptor: &ServiceDescriptor) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut suggestions = Vec::new();

    if descriptor.id.trim().is_empty() {
        errors.push("id is required".to_string());
    } else if !is_kebab_case(&descriptor.id) {
        errors.push(format!(
            "id '{}' must be lowercase letters, digits and single hyphens",
            descriptor.id
        ));
    }

    if descriptor.name.trim().is_empty() {
        errors.push("name is required".to_string());
    }

    if !is_semver(&descriptor.version) {
        warnings.push(format!(
            "version '{}' is not in major.minor.patch form",
            descriptor.version
        ));
    }

    if descriptor.priority > MAX_PRIORITY {
        errors.push(format!(
            "priority {} is out of range 0..={}",
            descriptor.priority, MAX_PRIORITY
        ));
    }

    if descriptor.category.trim().is_empty() {
        warnings.push("category is empty; the service will be listed as uncategorised".to_string());
    }

    let mut seen = HashSet::new();
    for dependency in &descriptor.dependencies {
        if dependency == &descriptor.id {
            errors.push("a service cannot depend on itself".to_string());
        } else if !seen.insert(dependency.as_str()) {
            warnings.push(format!("dependency '{}' is listed more than once", dependency));
        }
    }

    let mut tools = HashSet::new();
    for tool in &descriptor.tools {
        if !tools.insert(tool.as_str()) {
            warnings.push(format!("tool '{}' is declared more than once", tool));
        }
    }

    if descriptor.description.as_deref().map_or(true, |d| d.trim().is_empty()) {
        suggestions.push("add a description so the service is discoverable".to_string());
    }
    if descriptor.author.as_deref().map_or(true, |a| a.trim().is_empty()) {
        suggestions.push("add an author for ownership".to_string());
    }

    ValidationResult::from_parts(errors, warnings, suggestions)
}

fn is_kebab_case(id: &str) -> bool {
    !id.starts_with('-')
        && !id.ends_with('-')
        && !id.contains("--")
        && id.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

fn is_semver(version: &str) -> bool {
    let parts: Vec<&str> = version.split('.').collect();
    parts.len() == 3 && parts.iter().all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HealthCheckSpec, RateLimitSpec};

    fn good_config() -> ConnectorConfig {
        let mut config = ConnectorConfig::new("x", "https://ok.test");
        config.retries = 2;
        config.headers.insert("X-Service-Type".into(), "x".into());
        config.rate_limit = Some(RateLimitSpec { requests: 10, window_ms: 1000 });
        config
    }

    #[test]
    fn test_valid_config() {
        let result = validate_connector_config(&good_config());
        assert!(result.is_valid, "{:?}", result.errors);
        assert!(result.errors.is_empty());
        assert!(result.warnings.is_empty());
        assert!(result.suggestions.is_empty());
    }

    #[test]
    fn test_reports_every_error() {
        let mut config = good_config();
        config.base_url = String::new();
        config.health_check.endpoint = String::new();

        let result = validate_connector_config(&config);
        assert!(!result.is_valid);
        assert!(result.errors.len() >= 2, "{:?}", result.errors);
        assert!(result.errors.iter().any(|e| e.contains("base_url")));
        assert!(result.errors.iter().any(|e| e.contains("health_check.endpoint")));
    }

    #[test]
    fn test_relative_base_url_rejected() {
        let mut config = good_config();
        config.base_url = "/api/files".into();
        let result = validate_connector_config(&config);
        assert!(!result.is_valid);

        config.base_url = "ftp://files.test".into();
        let result = validate_connector_config(&config);
        assert!(result.errors.iter().any(|e| e.contains("scheme 'ftp'")));
    }

    #[test]
    fn test_zero_durations_are_errors() {
        let mut config = good_config();
        config.timeout_ms = 0;
        config.health_check = HealthCheckSpec {
            endpoint: "/health".into(),
            interval_ms: 0,
            timeout_ms: 0,
        };
        config.rate_limit = Some(RateLimitSpec { requests: 0, window_ms: 0 });

        let result = validate_connector_config(&config);
        assert_eq!(result.errors.len(), 5, "{:?}", result.errors);
    }

    #[test]
    fn test_warnings_do_not_invalidate() {
        let mut config = good_config();
        config.timeout_ms = 60_000;
        config.retries = 11;
        config.health_check.timeout_ms = config.health_check.interval_ms;

        let result = validate_connector_config(&config);
        assert!(result.is_valid);
        assert_eq!(result.warnings.len(), 3, "{:?}", result.warnings);
    }

    #[test]
    fn test_suggestions_do_not_invalidate() {
        let mut config = good_config();
        config.headers.clear();
        config.rate_limit = None;
        config.retries = 0;

        let result = validate_connector_config(&config);
        assert!(result.is_valid);
        assert_eq!(result.suggestions.len(), 3);
        assert!(result.suggestions.iter().any(|s| s.contains("X-Service-Type")));
    }

    #[test]
    fn test_auth_fields_required() {
        let mut config = good_config();
        config.auth = Some(AuthSpec::Basic { username: String::new(), password: String::new() });
        let result = validate_connector_config(&config);
        assert_eq!(result.errors.len(), 2, "{:?}", result.errors);

        config.auth = Some(AuthSpec::Bearer { token: " ".into() });
        let result = validate_connector_config(&config);
        assert!(result.errors.iter().any(|e| e.contains("bearer")));

        config.auth = Some(AuthSpec::ApiKey { key: "k".into() });
        assert!(validate_connector_config(&config).is_valid);
    }

    #[test]
    fn test_plain_http_auth_warning() {
        let mut config = good_config();
        config.base_url = "http://remote.test".into();
        config.auth = Some(AuthSpec::OAuth { token: "t".into() });
        let result = validate_connector_config(&config);
        assert!(result.warnings.iter().any(|w| w.contains("plain HTTP")));

        config.base_url = "http://127.0.0.1:8080".into();
        let result = validate_connector_config(&config);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_invalid_header_rejected() {
        let mut config = good_config();
        config.headers.insert("bad header".into(), "v".into());
        let result = validate_connector_config(&config);
        assert!(result.errors.iter().any(|e| e.contains("bad header")));
    }

    fn descriptor() -> ServiceDescriptor {
        ServiceDescriptor {
            id: "file-manager".into(),
            name: "File Manager".into(),
            description: Some("Uploads and downloads".into()),
            version: "1.0.0".into(),
            category: "utility".into(),
            priority: 10,
            author: Some("platform".into()),
            dependencies: vec!["settings".into()],
            tools: vec!["upload".into()],
        }
    }

    #[test]
    fn test_valid_descriptor() {
        let result = validate_service_config(&descriptor());
        assert!(result.is_valid);
        assert!(result.warnings.is_empty());
        assert!(result.suggestions.is_empty());
    }

    #[test]
    fn test_descriptor_errors() {
        let mut d = descriptor();
        d.id = "File_Manager".into();
        d.name = String::new();
        d.priority = 500;
        let result = validate_service_config(&d);
        assert_eq!(result.errors.len(), 3, "{:?}", result.errors);

        let mut d = descriptor();
        d.dependencies = vec!["file-manager".into()];
        assert!(!validate_service_config(&d).is_valid);
    }

    #[test]
    fn test_descriptor_warnings_and_suggestions() {
        let mut d = descriptor();
        d.version = "1.0".into();
        d.dependencies = vec!["settings".into(), "settings".into()];
        d.description = None;
        d.author = None;
        let result = validate_service_config(&d);
        assert!(result.is_valid);
        assert_eq!(result.warnings.len(), 2);
        assert_eq!(result.suggestions.len(), 2);
    }
}
