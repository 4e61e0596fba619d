//! Service registry subsystem.
//!
//! # Responsibilities
//! - Keep one policy and at most one live connector per service
//! - Drive each service through its connection state machine
//! - Periodic health checks with supervised reconnect
//! - Publish status events to subscribers
//! - Route requests to the right connector
//!
//! # Data Flow
//! ```text
//! policy → manager.rs ─ connect ─→ Connector (live map)
//!              │                        ↑
//!              ├─ health.rs ── tick ────┘ probe → reconnect
//!              ├─ state.rs   (ServiceState per service)
//!              └─ events.rs  (listeners ← connected/disconnected/error/reconnecting)
//! ```
//!
//! # Design Decisions
//! - The registry is a cheap `Clone` handle over shared state; there is no global instance
//! - Maps are concurrent (DashMap); no lock is held across an await
//! - A reconnect runs on its own task so the health timer keeps its cadence

pub mod events;
pub(crate) mod health;
pub mod manager;
pub mod state;

use thiserror::Error;

pub use events::{ServiceStatus, StatusListener, Subscription};
pub use manager::{ConnectorRegistry, RegistryOptions, ServiceSnapshot};
pub use state::ServiceState;

/// Failure to route a call through the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("service {0} is not registered")]
    UnknownService(String),

    #[error("service {0} is not connected")]
    NotConnected(String),
}
