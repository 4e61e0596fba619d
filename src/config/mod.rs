//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse, resolve env: secrets, validate every service)
//!     → HubConfig { services: [ServicePolicy] }
//!     → lifecycle::startup registers each policy with the registry
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads and validates
//!     → policies re-added (overwrite, never duplicate)
//!     → services missing from the new file are disconnected
//! ```
//!
//! # Design Decisions
//! - Durations are plain milliseconds, matching the service descriptors
//! - Auth is a closed tagged enum; a variant cannot exist without its fields
//! - Validation collects every problem instead of stopping at the first

pub mod loader;
pub mod schema;
pub mod watcher;

pub use schema::AdminConfig;
pub use schema::AuthSpec;
pub use schema::ConnectorConfig;
pub use schema::HealthCheckSpec;
pub use schema::HubConfig;
pub use schema::ObservabilityConfig;
pub use schema::RateLimitSpec;
pub use schema::ServicePolicy;
