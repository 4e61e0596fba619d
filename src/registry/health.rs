//! Periodic health checking.
//!
//! # Responsibilities
//! - Probe one connected service on its policy interval
//! - Hand unhealthy services to the supervised reconnect
//!
//! # Design Decisions
//! - One task per service, owned by the registry and aborted on stop
//! - Holds a weak registry handle; the task ends once the registry is gone
//! - The first probe happens one interval after connect, not immediately

use std::sync::Weak;
use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};

use crate::registry::manager::{ConnectorRegistry, RegistryInner};

pub(crate) struct HealthMonitor {
    registry: Weak<RegistryInner>,
    service_id: String,
    interval: Duration,
}

impl HealthMonitor {
    pub(crate) fn new(registry: Weak<RegistryInner>, service_id: String, interval: Duration) -> Self {
        Self {
            registry,
            service_id,
            interval,
        }
    }

    pub(crate) async fn run(self) {
        tracing::debug!(
            service_id = %self.service_id,
            interval_ms = self.interval.as_millis() as u64,
            "Health monitor starting"
        );

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let Some(inner) = self.registry.upgrade() else {
                break;
            };
            let keep_running = ConnectorRegistry::from_inner(inner)
                .run_health_check(&self.service_id)
                .await;
            if !keep_running {
                break;
            }
        }

        tracing::debug!(service_id = %self.service_id, "Health monitor exiting");
    }
}
