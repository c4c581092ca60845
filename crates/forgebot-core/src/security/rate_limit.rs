//! Per-identity sliding-window rate limiter.

use chrono::Utc;
use dashmap::DashMap;

use crate::config::HOUR_MS;

/// Outcome of a rate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    /// At or above the ceiling. `current` is the number of accepted requests
    /// still inside the window.
    Limited { current: usize },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed)
    }
}

/// Sliding one-hour window of accepted-request timestamps per identity.
///
/// A rejected attempt never consumes window capacity: the window is filtered
/// to the trailing hour and persisted back on every check, but "now" is only
/// appended when the request is allowed. A sustained over-ceiling stream
/// therefore cannot grow the window further.
#[derive(Debug)]
pub struct RateLimiter {
    windows: DashMap<String, Vec<i64>>,
    ceiling: usize,
    window_ms: i64,
}

impl RateLimiter {
    pub fn new(ceiling: usize) -> Self {
        Self {
            windows: DashMap::new(),
            ceiling,
            window_ms: HOUR_MS,
        }
    }

    pub fn check(&self, identity: &str) -> RateDecision {
        self.check_at(identity, Utc::now().timestamp_millis())
    }

    // The entry guard is held for the whole filter-compare-append sequence,
    // making the check atomic per identity.
    fn check_at(&self, identity: &str, now_ms: i64) -> RateDecision {
        let mut window = self.windows.entry(identity.to_string()).or_default();
        window.retain(|&ts| now_ms - ts < self.window_ms);
        if window.len() >= self.ceiling {
            return RateDecision::Limited {
                current: window.len(),
            };
        }
        window.push(now_ms);
        RateDecision::Allowed
    }
}
