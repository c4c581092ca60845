//! Per-identity build-failure tracking and escalation.
//!
//! Every build-phase failure is appended to a global log and to the
//! identity's one-hour sliding window. Once the windowed count reaches the
//! threshold the orchestrator converts the identity into a permanent
//! blacklist entry. Admission rejections (rate limit, blacklist, invalid
//! input) never reach this counter — it measures build failures only.

use std::sync::Mutex;

use chrono::Utc;
use dashmap::DashMap;

use crate::config::{DAY_MS, HOUR_MS};

/// One recorded build failure.
#[derive(Debug, Clone)]
pub struct ErrorRecord {
    pub identity: String,
    pub message: String,
    pub timestamp_ms: i64,
}

/// Rolling failure counter feeding the blacklist.
#[derive(Debug)]
pub struct ErrorEscalator {
    log: Mutex<Vec<ErrorRecord>>,
    windows: DashMap<String, Vec<i64>>,
    threshold: usize,
    window_ms: i64,
    retention_ms: i64,
}

impl ErrorEscalator {
    pub fn new(threshold: usize) -> Self {
        Self {
            log: Mutex::new(Vec::new()),
            windows: DashMap::new(),
            threshold,
            window_ms: HOUR_MS,
            retention_ms: DAY_MS,
        }
    }

    /// Appends the failure to the log and the identity's window; returns the
    /// windowed failure count after the append.
    pub fn record_failure(&self, identity: &str, message: &str) -> usize {
        self.record_failure_at(identity, message, Utc::now().timestamp_millis())
    }

    fn record_failure_at(&self, identity: &str, message: &str, now_ms: i64) -> usize {
        if let Ok(mut log) = self.log.lock() {
            log.push(ErrorRecord {
                identity: identity.to_string(),
                message: message.to_string(),
                timestamp_ms: now_ms,
            });
        }
        let mut window = self.windows.entry(identity.to_string()).or_default();
        window.retain(|&ts| now_ms - ts < self.window_ms);
        window.push(now_ms);
        window.len()
    }

    /// True once the identity's windowed failure count has reached the
    /// threshold.
    pub fn should_block(&self, identity: &str) -> bool {
        self.should_block_at(identity, Utc::now().timestamp_millis())
    }

    fn should_block_at(&self, identity: &str, now_ms: i64) -> bool {
        self.failure_count_at(identity, now_ms) >= self.threshold
    }

    pub fn failure_count(&self, identity: &str) -> usize {
        self.failure_count_at(identity, Utc::now().timestamp_millis())
    }

    fn failure_count_at(&self, identity: &str, now_ms: i64) -> usize {
        match self.windows.get_mut(identity) {
            Some(mut window) => {
                window.retain(|&ts| now_ms - ts < self.window_ms);
                window.len()
            }
            None => 0,
        }
    }

    /// Failures recorded within the trailing `horizon_ms`.
    pub fn recent_records(&self, horizon_ms: i64) -> Vec<ErrorRecord> {
        let cutoff = Utc::now().timestamp_millis() - horizon_ms;
        self.log
            .lock()
            .map(|log| {
                log.iter()
                    .filter(|r| r.timestamp_ms > cutoff)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Drops log entries and window entries older than the 24-hour retention
    /// horizon; an identity's window is removed entirely once empty. Run
    /// periodically by the maintenance task.
    pub fn purge_old(&self) {
        self.purge_old_at(Utc::now().timestamp_millis());
    }

    fn purge_old_at(&self, now_ms: i64) {
        let cutoff = now_ms - self.retention_ms;
        if let Ok(mut log) = self.log.lock() {
            log.retain(|r| r.timestamp_ms > cutoff);
        }
        self.windows.retain(|_, window| {
            window.retain(|&ts| ts > cutoff);
            !window.is_empty()
        });
    }

    pub fn log_len(&self) -> usize {
        self.log.lock().map(|log| log.len()).unwrap_or(0)
    }

    pub fn tracked_identities(&self) -> usize {
        self.windows.len()
    }
}
