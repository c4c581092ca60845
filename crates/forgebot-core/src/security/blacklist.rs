//! Permanent deny-set of identities.

use dashmap::DashMap;
use tracing::warn;

/// Identities blocked for the lifetime of the process. There is no unblock
/// operation; removal only happens via restart.
#[derive(Debug, Default)]
pub struct Blacklist {
    entries: DashMap<String, String>,
}

impl Blacklist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_blocked(&self, identity: &str) -> bool {
        self.entries.contains_key(identity)
    }

    /// Idempotent insert; the reason is logged on first insertion only.
    pub fn block(&self, identity: &str, reason: &str) {
        if self
            .entries
            .insert(identity.to_string(), reason.to_string())
            .is_none()
        {
            warn!(identity, reason, "identity blacklisted");
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
