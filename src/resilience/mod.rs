//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Connector::request:
//!     → rate_limit.rs (wait for a token if the service is throttled)
//!     → backoff.rs RetrySchedule::start_attempt (per-attempt deadline)
//!     → send; retries.rs classifies the outcome
//!     → on failure: RetrySchedule::next_delay → sleep → next attempt
//!     → budget spent: last AttemptError is surfaced unchanged
//! ```
//!
//! # Design Decisions
//! - Every external call has a deadline; a timeout is a failed attempt
//! - Backoff is exact `2^attempt * base`, no jitter
//! - The schedule is a plain value, the loop that sleeps lives in the connector

pub mod backoff;
pub mod rate_limit;
pub mod retries;

pub use backoff::{calculate_backoff, RetrySchedule, DEFAULT_BACKOFF_BASE, MAX_ATTEMPT_TIMEOUT};
pub use rate_limit::RateLimiter;
pub use retries::{check_status, AttemptError};
