//! Status event fan-out.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use serde::Serialize;

/// Status transition published to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Connected,
    Disconnected,
    Error,
    Reconnecting,
}

impl ServiceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ServiceStatus::Connected => "connected",
            ServiceStatus::Disconnected => "disconnected",
            ServiceStatus::Error => "error",
            ServiceStatus::Reconnecting => "reconnecting",
        }
    }
}

impl std::fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type StatusListener = Arc<dyn Fn(&str, ServiceStatus) + Send + Sync>;

#[derive(Default)]
struct ListenerSet {
    next_id: u64,
    entries: Vec<(u64, StatusListener)>,
}

/// Ordered set of status listeners.
///
/// Dispatch works on a snapshot, so listeners may subscribe or
/// unsubscribe from inside a callback.
#[derive(Default, Clone)]
pub struct Listeners {
    set: Arc<Mutex<ListenerSet>>,
}

impl Listeners {
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&str, ServiceStatus) + Send + Sync + 'static,
    {
        let mut set = self.set.lock().unwrap_or_else(PoisonError::into_inner);
        let id = set.next_id;
        set.next_id += 1;
        set.entries.push((id, Arc::new(callback)));
        Subscription {
            id,
            set: Arc::downgrade(&self.set),
        }
    }

    /// Call every listener in subscription order.
    ///
    /// A panicking listener is logged and skipped; the rest still run.
    pub fn notify(&self, service_id: &str, status: ServiceStatus) {
        let snapshot: Vec<StatusListener> = {
            let set = self.set.lock().unwrap_or_else(PoisonError::into_inner);
            set.entries.iter().map(|(_, listener)| listener.clone()).collect()
        };

        for listener in snapshot {
            if catch_unwind(AssertUnwindSafe(|| listener(service_id, status))).is_err() {
                tracing::error!(service_id = %service_id, status = %status, "Status listener panicked");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.set.lock().unwrap_or_else(PoisonError::into_inner).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle returned by `subscribe`; the listener stays until `unsubscribe`.
#[derive(Debug, Clone)]
pub struct Subscription {
    id: u64,
    set: Weak<Mutex<ListenerSet>>,
}

impl Subscription {
    /// Remove the listener. Returns false if it was already gone.
    pub fn unsubscribe(&self) -> bool {
        let Some(set) = self.set.upgrade() else {
            return false;
        };
        let mut set = set.lock().unwrap_or_else(PoisonError::into_inner);
        let before = set.entries.len();
        set.entries.retain(|(id, _)| *id != self.id);
        set.entries.len() != before
    }
}
