//! Connector registry: lifecycle, health supervision and routing.
//!
//! # Data Flow
//! ```text
//! add_connector(policy)
//!     → policies[id] = policy
//!     → auto_connect? connect_service(id)
//!          → validate → Connecting → probe
//!          → ok:   connectors[id], Connected, monitor spawned, "connected"
//!          → fail: Error, "error"
//!
//! monitor tick → probe
//!     → fail + retry_on_failure → reconnect_service(id) on its own task
//!          → Reconnecting, "reconnecting"
//!          → probe, sleep 2^n * base, probe, ...
//!          → Connected + "connected" | Error + "error", monitor stopped
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::config::ServicePolicy;
use crate::connector::response::now_millis;
use crate::connector::{Connector, ConnectorMetrics, ConnectorResponse, RequestOptions};
use crate::observability::metrics;
use crate::registry::events::{Listeners, ServiceStatus, Subscription};
use crate::registry::health::HealthMonitor;
use crate::registry::state::{ServiceRecord, ServiceState};
use crate::registry::RegistryError;
use crate::resilience::backoff::{calculate_backoff, DEFAULT_BACKOFF_BASE};
use crate::validation::validate_connector_config;

/// Registry tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct RegistryOptions {
    /// Base of the `2^attempt * base` delay used by connectors and reconnects.
    pub backoff_base: Duration,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            backoff_base: DEFAULT_BACKOFF_BASE,
        }
    }
}

/// Point-in-time view of one registered service.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceSnapshot {
    pub service_id: String,
    pub is_connected: bool,
    pub state: ServiceState,
    pub healthy: bool,
    pub metrics: Option<ConnectorMetrics>,
    pub last_health_check_ms: Option<u64>,
}

pub(crate) struct RegistryInner {
    policies: DashMap<String, ServicePolicy>,
    connectors: DashMap<String, Arc<Connector>>,
    records: DashMap<String, ServiceRecord>,
    monitors: DashMap<String, JoinHandle<()>>,
    reconnects: DashMap<String, JoinHandle<()>>,
    listeners: Listeners,
    options: RegistryOptions,
}

impl Drop for RegistryInner {
    fn drop(&mut self) {
        for entry in self.monitors.iter() {
            entry.value().abort();
        }
        for entry in self.reconnects.iter() {
            entry.value().abort();
        }
    }
}

/// Shared registry of connectors. Cloning hands out another handle to the same registry.
#[derive(Clone)]
pub struct ConnectorRegistry {
    inner: Arc<RegistryInner>,
}

impl Default for ConnectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::with_options(RegistryOptions::default())
    }

    pub fn with_options(options: RegistryOptions) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                policies: DashMap::new(),
                connectors: DashMap::new(),
                records: DashMap::new(),
                monitors: DashMap::new(),
                reconnects: DashMap::new(),
                listeners: Listeners::default(),
                options,
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<RegistryInner>) -> Self {
        Self { inner }
    }

    /// Register (or overwrite) a policy; connects immediately when `auto_connect` is set.
    ///
    /// Returns whether the service ended up connected.
    pub async fn add_connector(&self, policy: ServicePolicy) -> bool {
        let service_id = policy.service_id().to_string();
        let auto_connect = policy.auto_connect;

        let replaced = self.inner.policies.insert(service_id.clone(), policy).is_some();
        tracing::info!(service_id = %service_id, replaced, auto_connect, "Service registered");

        if auto_connect {
            self.connect_service(&service_id).await
        } else {
            false
        }
    }

    /// Drop a service entirely: disconnect it and forget its policy.
    pub async fn remove_connector(&self, service_id: &str) -> bool {
        self.disconnect_service(service_id).await;
        let removed = self.inner.policies.remove(service_id).is_some();
        self.inner.records.remove(service_id);
        if removed {
            tracing::info!(service_id = %service_id, "Service removed");
        }
        removed
    }

    /// Validate, probe and, on success, publish the service's connector.
    ///
    /// An already-live connector is reused with the stored configuration.
    pub async fn connect_service(&self, service_id: &str) -> bool {
        let Some(policy) = self.get_policy(service_id) else {
            tracing::warn!(service_id = %service_id, "Connect requested for unknown service");
            return false;
        };

        self.force_state(service_id, ServiceState::Connecting);

        let validation = validate_connector_config(&policy.connector);
        if !validation.is_valid {
            tracing::error!(
                service_id = %service_id,
                errors = ?validation.errors,
                "Refusing to connect service with invalid configuration"
            );
            self.fail_connect(service_id);
            return false;
        }

        let connector = match self.get_connector(service_id) {
            Some(existing) => {
                existing.update_config(policy.connector.clone());
                existing
            }
            None => Arc::new(Connector::with_backoff_base(
                policy.connector.clone(),
                self.inner.options.backoff_base,
            )),
        };

        let probe = connector.health_check().await;
        self.record_probe(service_id, probe.success);

        if !probe.success {
            tracing::warn!(
                service_id = %service_id,
                error = probe.error.as_deref().unwrap_or("unknown"),
                "Initial health check failed"
            );
            self.fail_connect(service_id);
            return false;
        }

        if !self.transition(service_id, ServiceState::Connected) {
            tracing::debug!(service_id = %service_id, "Connect superseded while probing");
            return false;
        }

        self.inner.connectors.insert(service_id.to_string(), connector);
        self.start_health_check(service_id, policy.health_check_interval());
        tracing::info!(service_id = %service_id, "Service connected");
        self.emit(service_id, ServiceStatus::Connected);
        true
    }

    fn fail_connect(&self, service_id: &str) {
        if self.transition(service_id, ServiceState::Error) {
            self.stop_health_check(service_id);
            self.inner.connectors.remove(service_id);
            self.emit(service_id, ServiceStatus::Error);
        }
    }

    /// Stop monitoring and drop the live connector. The policy stays registered.
    ///
    /// Returns false when the service was already disconnected.
    pub async fn disconnect_service(&self, service_id: &str) -> bool {
        self.stop_health_check(service_id);
        if let Some((_, handle)) = self.inner.reconnects.remove(service_id) {
            handle.abort();
        }

        let had_connector = self.inner.connectors.remove(service_id).is_some();
        let previous = self.force_state(service_id, ServiceState::Disconnected);

        if !had_connector && previous == ServiceState::Disconnected {
            return false;
        }

        tracing::info!(service_id = %service_id, "Service disconnected");
        self.emit(service_id, ServiceStatus::Disconnected);
        true
    }

    /// Supervised reconnect: probe up to `max_reconnect_attempts` times with
    /// exponential backoff between attempts.
    ///
    /// Only a connected service can enter reconnect. When the attempts are
    /// spent the service moves to Error and its monitor stops.
    pub async fn reconnect_service(&self, service_id: &str) -> bool {
        let Some(policy) = self.get_policy(service_id) else {
            return false;
        };
        let Some(connector) = self.get_connector(service_id) else {
            tracing::warn!(service_id = %service_id, "Reconnect requested for service without a connector");
            return false;
        };
        if !self.transition(service_id, ServiceState::Reconnecting) {
            return false;
        }

        tracing::info!(
            service_id = %service_id,
            max_attempts = policy.max_reconnect_attempts,
            "Reconnecting service"
        );
        self.emit(service_id, ServiceStatus::Reconnecting);

        let max_attempts = policy.max_reconnect_attempts;
        for attempt in 1..=max_attempts {
            if self.service_state(service_id) != ServiceState::Reconnecting {
                tracing::debug!(service_id = %service_id, "Reconnect abandoned");
                return false;
            }

            let probe = connector.health_check().await;
            self.record_probe(service_id, probe.success);

            if probe.success {
                if !self.transition(service_id, ServiceState::Connected) {
                    return false;
                }
                tracing::info!(service_id = %service_id, attempt, "Service reconnected");
                self.emit(service_id, ServiceStatus::Connected);
                return true;
            }

            tracing::warn!(
                service_id = %service_id,
                attempt,
                max_attempts,
                error = probe.error.as_deref().unwrap_or("unknown"),
                "Reconnect attempt failed"
            );

            if attempt < max_attempts {
                tokio::time::sleep(calculate_backoff(attempt, self.inner.options.backoff_base)).await;
            }
        }

        if self.transition(service_id, ServiceState::Error) {
            tracing::error!(service_id = %service_id, max_attempts, "Reconnect attempts exhausted");
            self.stop_health_check(service_id);
            self.emit(service_id, ServiceStatus::Error);
        }
        false
    }

    /// One periodic probe. Returns whether the monitor should keep running.
    pub(crate) async fn run_health_check(&self, service_id: &str) -> bool {
        let Some(connector) = self.get_connector(service_id) else {
            return false;
        };

        match self.service_state(service_id) {
            ServiceState::Reconnecting => {
                tracing::debug!(service_id = %service_id, "Reconnect in progress, skipping health check");
                return true;
            }
            ServiceState::Error | ServiceState::Disconnected => return false,
            ServiceState::Connecting | ServiceState::Connected => {}
        }

        let probe = connector.health_check().await;
        self.record_probe(service_id, probe.success);
        if probe.success {
            return true;
        }

        let retry = self
            .get_policy(service_id)
            .map(|policy| policy.retry_on_failure)
            .unwrap_or(false);

        if retry {
            tracing::warn!(
                service_id = %service_id,
                error = probe.error.as_deref().unwrap_or("unknown"),
                "Health check failed, starting reconnect"
            );
            let registry = self.clone();
            let id = service_id.to_string();
            let handle = tokio::spawn(async move {
                registry.reconnect_service(&id).await;
            });
            if let Some(previous) = self.inner.reconnects.insert(service_id.to_string(), handle) {
                previous.abort();
            }
        } else {
            tracing::warn!(
                service_id = %service_id,
                error = probe.error.as_deref().unwrap_or("unknown"),
                "Health check failed, reconnect disabled by policy"
            );
        }
        true
    }

    /// Listen for status events. Listeners run synchronously, in subscription order.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&str, ServiceStatus) + Send + Sync + 'static,
    {
        self.inner.listeners.subscribe(callback)
    }

    /// Route a request through the live connector for `service_id`.
    ///
    /// Transport failures stay inside the returned envelope; only a missing
    /// connector is an `Err`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        service_id: &str,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<ConnectorResponse<T>, RegistryError> {
        let connector = self.get_connector(service_id).ok_or_else(|| {
            if self.inner.policies.contains_key(service_id) {
                RegistryError::NotConnected(service_id.to_string())
            } else {
                RegistryError::UnknownService(service_id.to_string())
            }
        })?;
        Ok(connector.request(endpoint, options).await)
    }

    pub fn get_connector(&self, service_id: &str) -> Option<Arc<Connector>> {
        self.inner
            .connectors
            .get(service_id)
            .map(|entry| entry.value().clone())
    }

    /// All live connectors, keyed by service identifier.
    pub fn get_all_connectors(&self) -> BTreeMap<String, Arc<Connector>> {
        self.inner
            .connectors
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    pub fn get_policy(&self, service_id: &str) -> Option<ServicePolicy> {
        self.inner
            .policies
            .get(service_id)
            .map(|entry| entry.value().clone())
    }

    /// Identifiers of every registered policy, sorted.
    pub fn service_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.inner.policies.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn service_state(&self, service_id: &str) -> ServiceState {
        self.inner
            .records
            .get(service_id)
            .map(|record| record.state)
            .unwrap_or_default()
    }

    /// One snapshot per registered service, sorted by identifier.
    pub fn get_services_status(&self) -> Vec<ServiceSnapshot> {
        self.service_ids()
            .into_iter()
            .map(|service_id| {
                let record = self
                    .inner
                    .records
                    .get(&service_id)
                    .map(|record| *record)
                    .unwrap_or_default();
                let connector = self.get_connector(&service_id);
                ServiceSnapshot {
                    is_connected: connector.is_some()
                        && record.state == ServiceState::Connected
                        && record.healthy,
                    state: record.state,
                    healthy: record.healthy,
                    metrics: connector.map(|c| c.get_metrics()),
                    last_health_check_ms: record.last_probe_ms,
                    service_id,
                }
            })
            .collect()
    }

    /// Cancel every monitor and reconnect and drop all live connectors.
    ///
    /// Policies stay registered; no status events are emitted.
    pub fn stop_all_connectors(&self) {
        let monitors: Vec<String> = self.inner.monitors.iter().map(|e| e.key().clone()).collect();
        for service_id in &monitors {
            self.stop_health_check(service_id);
        }
        let reconnects: Vec<String> = self.inner.reconnects.iter().map(|e| e.key().clone()).collect();
        for service_id in &reconnects {
            if let Some((_, handle)) = self.inner.reconnects.remove(service_id) {
                handle.abort();
            }
        }

        let stopped = self.inner.connectors.len();
        self.inner.connectors.clear();
        for mut record in self.inner.records.iter_mut() {
            record.state = ServiceState::Disconnected;
        }
        tracing::info!(stopped, "All connectors stopped");
    }

    fn start_health_check(&self, service_id: &str, interval: Duration) {
        if interval.is_zero() {
            tracing::warn!(service_id = %service_id, "Health check interval is zero, monitoring disabled");
            self.stop_health_check(service_id);
            return;
        }

        let monitor = HealthMonitor::new(Arc::downgrade(&self.inner), service_id.to_string(), interval);
        let handle = tokio::spawn(monitor.run());
        if let Some(previous) = self.inner.monitors.insert(service_id.to_string(), handle) {
            previous.abort();
        }
    }

    fn stop_health_check(&self, service_id: &str) {
        if let Some((_, handle)) = self.inner.monitors.remove(service_id) {
            handle.abort();
        }
    }

    /// Apply `next` if the state machine allows it.
    fn transition(&self, service_id: &str, next: ServiceState) -> bool {
        let mut record = self.inner.records.entry(service_id.to_string()).or_default();
        if !record.state.can_transition_to(next) {
            tracing::debug!(
                service_id = %service_id,
                from = record.state.as_str(),
                to = next.as_str(),
                "Ignoring state transition"
            );
            return false;
        }
        record.state = next;
        true
    }

    /// Set the state unconditionally, returning the previous one.
    fn force_state(&self, service_id: &str, next: ServiceState) -> ServiceState {
        let mut record = self.inner.records.entry(service_id.to_string()).or_default();
        std::mem::replace(&mut record.state, next)
    }

    fn record_probe(&self, service_id: &str, healthy: bool) {
        {
            let mut record = self.inner.records.entry(service_id.to_string()).or_default();
            record.healthy = healthy;
            record.last_probe_ms = Some(now_millis());
        }
        metrics::record_service_health(service_id, healthy);
    }

    fn emit(&self, service_id: &str, status: ServiceStatus) {
        metrics::record_status_transition(service_id, status.as_str());
        self.inner.listeners.notify(service_id, status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectorConfig;
    use std::sync::Mutex;

    fn unreachable_policy(id: &str) -> ServicePolicy {
        // Port 9 (discard) on loopback refuses connections quickly.
        let mut connector = ConnectorConfig::new(id, "http://127.0.0.1:9");
        connector.health_check.timeout_ms = 200;
        ServicePolicy::new(connector)
    }

    #[tokio::test]
    async fn test_add_without_auto_connect_registers_only() {
        let registry = ConnectorRegistry::new();
        let mut policy = unreachable_policy("svc");
        policy.auto_connect = false;

        assert!(!registry.add_connector(policy).await);
        assert_eq!(registry.service_ids(), vec!["svc".to_string()]);
        assert!(registry.get_connector("svc").is_none());
        assert_eq!(registry.service_state("svc"), ServiceState::Disconnected);
    }

    #[tokio::test]
    async fn test_invalid_config_emits_error() {
        let registry = ConnectorRegistry::new();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        registry.subscribe(move |id, status| sink.lock().unwrap().push((id.to_string(), status)));

        let policy = ServicePolicy::new(ConnectorConfig::new("bad", "not a url"));
        assert!(!registry.add_connector(policy).await);

        assert_eq!(registry.service_state("bad"), ServiceState::Error);
        assert_eq!(*events.lock().unwrap(), vec![("bad".to_string(), ServiceStatus::Error)]);
    }

    #[tokio::test]
    async fn test_failed_probe_leaves_service_unregistered() {
        let registry = ConnectorRegistry::new();
        assert!(!registry.add_connector(unreachable_policy("down")).await);

        assert!(registry.get_connector("down").is_none());
        assert_eq!(registry.service_state("down"), ServiceState::Error);
        let snapshot = registry.get_services_status();
        assert_eq!(snapshot.len(), 1);
        assert!(!snapshot[0].is_connected);
        assert!(snapshot[0].last_health_check_ms.is_some());
    }

    #[tokio::test]
    async fn test_request_errors() {
        let registry = ConnectorRegistry::new();
        let result = registry
            .request::<serde_json::Value>("missing", "/x", RequestOptions::default())
            .await;
        assert!(matches!(result, Err(RegistryError::UnknownService(id)) if id == "missing"));

        let mut policy = unreachable_policy("idle");
        policy.auto_connect = false;
        registry.add_connector(policy).await;
        let result = registry
            .request::<serde_json::Value>("idle", "/x", RequestOptions::default())
            .await;
        assert!(matches!(result, Err(RegistryError::NotConnected(id)) if id == "idle"));
    }

    #[tokio::test]
    async fn test_disconnect_unknown_is_noop() {
        let registry = ConnectorRegistry::new();
        assert!(!registry.disconnect_service("ghost").await);
        assert!(!registry.reconnect_service("ghost").await);
    }
}
