//! Per-service connection state machine.
//!
//! # State Transitions
//! ```text
//! Disconnected ─┐
//! Error ────────┼─ connect_service ─→ Connecting ─→ Connected | Error
//! (any) ────────┘
//! Connected ─ failed probe, retry enabled ─→ Reconnecting
//! Reconnecting ─→ Connected (probe ok) | Error (attempts spent)
//! (any) ─ disconnect_service ─→ Disconnected
//! ```
//!
//! Error and Disconnected are only left through an explicit connect.

use serde::Serialize;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    #[default]
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
    Reconnecting = 3,
    Error = 4,
}

impl ServiceState {
    /// Whether the registry may move from `self` to `next`.
    pub fn can_transition_to(self, next: ServiceState) -> bool {
        use ServiceState::*;
        matches!(
            (self, next),
            (_, Disconnected)
                | (_, Connecting)
                | (Connecting, Connected)
                | (Connecting, Error)
                | (Connected, Reconnecting)
                | (Reconnecting, Connected)
                | (Reconnecting, Error)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceState::Disconnected => "disconnected",
            ServiceState::Connecting => "connecting",
            ServiceState::Connected => "connected",
            ServiceState::Reconnecting => "reconnecting",
            ServiceState::Error => "error",
        }
    }
}

/// What the registry knows about one service besides its connector.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceRecord {
    pub state: ServiceState,
    /// Outcome of the most recent probe.
    pub healthy: bool,
    /// Time of the most recent probe, ms since the Unix epoch.
    pub last_probe_ms: Option<u64>,
}
