//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! connector / registry / validation produce:
//!     → logging.rs (structured tracing events, service_id on every line)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (human or JSON)
//!     → Prometheus scrape endpoint (optional)
//! ```

pub mod logging;
pub mod metrics;
