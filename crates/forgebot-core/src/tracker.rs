//! In-flight dedup set keyed by message id.
//!
//! A message id may be in flight at most once. Release must happen on every
//! exit path of a handler (success, gate rejection after acquire, build
//! failure, panic unwinding through the task), so acquisition hands out an
//! RAII guard instead of relying on an explicit release call.

use std::sync::Arc;

use dashmap::DashSet;

/// Tracks which message ids are currently being processed.
#[derive(Debug, Default, Clone)]
pub struct RequestTracker {
    in_flight: Arc<DashSet<String>>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically marks the message id as in flight. Returns `None` without
    /// any state change when it already is; otherwise the returned guard
    /// keeps the entry alive until dropped.
    pub fn acquire(&self, message_id: &str) -> Option<InFlightGuard> {
        if self.in_flight.insert(message_id.to_string()) {
            Some(InFlightGuard {
                set: Arc::clone(&self.in_flight),
                id: message_id.to_string(),
            })
        } else {
            None
        }
    }

    pub fn is_in_flight(&self, message_id: &str) -> bool {
        self.in_flight.contains(message_id)
    }
}

/// Removes its message id from the in-flight set on drop.
#[derive(Debug)]
pub struct InFlightGuard {
    set: Arc<DashSet<String>>,
    id: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set.remove(&self.id);
    }
}
