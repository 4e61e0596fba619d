//! Resilient connector framework.
//!
//! A [`Connector`] wraps one remote service with retries, timeouts, auth
//! and metrics. The [`ConnectorRegistry`] owns connectors for many
//! services, supervises their health and reconnects them. The
//! [`ConnectorValidator`] checks configurations and runs live probes.

pub mod admin;
pub mod config;
pub mod connector;
pub mod lifecycle;
pub mod observability;
pub mod registry;
pub mod resilience;
pub mod validation;

pub use config::{ConnectorConfig, HubConfig, ServicePolicy};
pub use connector::{Connector, ConnectorResponse, RequestOptions};
pub use lifecycle::Shutdown;
pub use registry::{ConnectorRegistry, RegistryError, ServiceStatus};
pub use validation::ConnectorValidator;
