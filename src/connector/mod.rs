//! Per-service connector.
//!
//! # Data Flow
//! ```text
//! Connector::request(endpoint, options)
//!     → headers: identity → static config → per-call → auth.rs
//!     → resilience (rate limit, retry schedule, backoff)
//!     → reqwest, one attempt at a time
//!     → response.rs ConnectorResponse<T> (never an Err)
//!     → metrics.rs updated once per logical call
//! ```
//!
//! # Design Decisions
//! - Configuration lives behind `ArcSwap` so updates never block requests
//! - Health probes bypass retries and request metrics
//! - Batches run concurrently and keep submission order

pub mod auth;
pub mod client;
pub mod metrics;
pub mod response;

pub use client::Connector;
pub use metrics::ConnectorMetrics;
pub use response::{BatchRequest, ConnectorResponse, HttpMethod, RequestOptions};
