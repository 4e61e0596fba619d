//! Configuration validation and connector diagnostics.
//!
//! # Responsibilities
//! - Semantic validation of connector configs and service descriptors
//! - Value ranges (timeouts > 0, rate limits > 0), URL shape, credentials
//! - Scripted live probes for operators
//!
//! # Design Decisions
//! - Returns all problems, not just the first
//! - Errors, warnings and suggestions are kept apart; only errors block
//! - Probe runs are independent steps; one failing never skips the rest

pub mod probe;
pub mod rules;

pub use probe::{ConnectorTestResult, ConnectorValidator};
pub use rules::{validate_connector_config, validate_service_config, ServiceDescriptor, ValidationResult};
