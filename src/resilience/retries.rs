//! Retry classification.
//!
//! # Responsibilities
//! - Turn one failed attempt into a typed, displayable error
//! - Accept only 2xx statuses
//!
//! # Design Decisions
//! - Every failure kind is retried until the attempt budget runs out
//! - A 2xx response is never retried, even if its body fails to decode
//! - Timeouts keep their own message so they can be told apart in logs

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// Why a single attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptError {
    /// The attempt did not complete before its deadline.
    #[error("request timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    /// Connection refused, reset, DNS failure, and similar.
    #[error("network error: {0}")]
    Network(String),

    /// The service answered with a non-success status.
    #[error("HTTP {status}: {reason}")]
    Status { status: u16, reason: String },
}

impl AttemptError {
    /// Status code to report; 0 when no response arrived.
    pub fn status_code(&self) -> u16 {
        match self {
            AttemptError::Status { status, .. } => *status,
            _ => 0,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, AttemptError::Timeout { .. })
    }

    /// Classify a transport error returned by the HTTP client.
    pub fn from_transport(error: &reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            AttemptError::Timeout { timeout_ms: timeout.as_millis() as u64 }
        } else {
            AttemptError::Network(error.to_string())
        }
    }
}

/// Accept 2xx statuses, turn everything else into an [`AttemptError`].
pub fn check_status(status: StatusCode) -> Result<(), AttemptError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(AttemptError::Status {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
        })
    }
}
