//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::{AuthSpec, HubConfig};
use crate::validation::validate_connector_config;

/// Prefix marking a secret that is read from the environment.
const ENV_PREFIX: &str = "env:";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load, resolve and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<HubConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content)
}

/// Load and resolve configuration without semantic validation.
///
/// Used by tooling that reports validation results itself.
pub fn read_config(path: &Path) -> Result<HubConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_unchecked(&content)
}

fn parse_unchecked(content: &str) -> Result<HubConfig, ConfigError> {
    let mut config: HubConfig = toml::from_str(content).map_err(ConfigError::Parse)?;

    for policy in &mut config.services {
        if let Some(auth) = policy.connector.auth.as_mut() {
            resolve_auth_env(auth);
        }
    }
    Ok(config)
}

/// Parse configuration text, resolve `env:` secrets and validate every service.
pub fn parse_config(content: &str) -> Result<HubConfig, ConfigError> {
    let config = parse_unchecked(content)?;

    let mut errors = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for policy in &config.services {
        let id = policy.service_id();
        if !seen.insert(id.to_string()) {
            errors.push(format!("{}: duplicate service identifier", id));
        }
        let result = validate_connector_config(&policy.connector);
        errors.extend(result.errors.into_iter().map(|e| format!("{}: {}", id, e)));
    }

    if errors.is_empty() {
        Ok(config)
    } else {
        Err(ConfigError::Validation(errors))
    }
}

/// Replace `env:NAME` secrets with the value of `NAME`.
///
/// A missing variable resolves to an empty string, which the validator
/// then reports as a missing credential.
fn resolve_auth_env(auth: &mut AuthSpec) {
    let secrets: Vec<&mut String> = match auth {
        AuthSpec::Bearer { token } | AuthSpec::OAuth { token } => vec![token],
        AuthSpec::ApiKey { key } => vec![key],
        AuthSpec::Basic { username, password } => vec![username, password],
    };

    for secret in secrets {
        if let Some(name) = secret.strip_prefix(ENV_PREFIX) {
            let value = std::env::var(name).unwrap_or_else(|_| {
                tracing::warn!(variable = %name, "Credential variable is not set");
                String::new()
            });
            *secret = value;
        }
    }
}
