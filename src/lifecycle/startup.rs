//! Startup orchestration and config reload.
//!
//! # Responsibilities
//! - Register every configured service with the registry
//! - Reconcile the registry against a reloaded configuration
//!
//! # Design Decisions
//! - Services connect concurrently; one slow probe does not hold up the rest
//! - A failed connect is not fatal; the daemon runs with what is reachable
//! - Reload only touches services whose policy actually changed

use futures_util::future::join_all;

use crate::config::HubConfig;
use crate::registry::ConnectorRegistry;

/// What a reload changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReloadSummary {
    pub added: Vec<String>,
    pub updated: Vec<String>,
    pub removed: Vec<String>,
}

impl ReloadSummary {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

/// Register all services from `config`. Returns how many came up connected.
pub async fn register_services(registry: &ConnectorRegistry, config: &HubConfig) -> usize {
    let connects = config
        .services
        .iter()
        .cloned()
        .map(|policy| registry.add_connector(policy));
    let connected = join_all(connects).await.into_iter().filter(|ok| *ok).count();

    tracing::info!(
        services = config.services.len(),
        connected,
        "Services registered"
    );
    connected
}

/// Bring the registry in line with a freshly loaded configuration.
///
/// Removed services are disconnected and forgotten. New or changed
/// services are re-registered, which reconnects them when `auto_connect`
/// is set. A live connector whose policy no longer auto-connects keeps
/// running with the updated configuration.
pub async fn apply_reload(registry: &ConnectorRegistry, config: &HubConfig) -> ReloadSummary {
    let mut summary = ReloadSummary::default();

    for service_id in registry.service_ids() {
        if !config.services.iter().any(|p| p.service_id() == service_id) {
            registry.remove_connector(&service_id).await;
            summary.removed.push(service_id);
        }
    }

    for policy in &config.services {
        let service_id = policy.service_id().to_string();
        match registry.get_policy(&service_id) {
            Some(current) if current == *policy => continue,
            Some(_) => summary.updated.push(service_id.clone()),
            None => summary.added.push(service_id.clone()),
        }

        if !policy.auto_connect {
            if let Some(connector) = registry.get_connector(&service_id) {
                connector.update_config(policy.connector.clone());
            }
        }
        registry.add_connector(policy.clone()).await;
    }

    if summary.is_empty() {
        tracing::debug!("Config reload: no service changes");
    } else {
        tracing::info!(
            added = ?summary.added,
            updated = ?summary.updated,
            removed = ?summary.removed,
            "Config reload applied"
        );
    }
    summary
}
