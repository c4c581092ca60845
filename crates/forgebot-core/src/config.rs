//! Bot configuration loaded from the environment.
//!
//! | Env | Default | Description |
//! |-----|---------|-------------|
//! | FORGEBOT_RELAYS | (required) | Comma-separated relay websocket URLs. |
//! | FORGEBOT_SECRET_KEY | (required) | Hex signing key for outbound replies. |
//! | FORGEBOT_PROJECT_ROOT | ./generated-projects | Base directory for allocated project dirs. |
//! | FORGEBOT_BUILDER_CMD | forge-gen | External builder command invoked per admitted idea. |
//! | FORGEBOT_MAX_REQUESTS_PER_HOUR | 10 | Rate-limit ceiling per identity. |
//! | FORGEBOT_ERROR_THRESHOLD | 5 | Build failures within an hour before blacklisting. |
//! | FORGEBOT_PURGE_INTERVAL_SECS | 3600 | Cadence of the escalation-log purge task. |
//! | FORGEBOT_BUILD_TIMEOUT_MS | 300000 | Hard wall-clock kill for the builder. |
//! | FORGEBOT_MAX_OUTPUT_BYTES | 10485760 | Cap on captured builder output. |

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_MAX_REQUESTS_PER_HOUR: usize = 10;
const DEFAULT_ERROR_THRESHOLD: usize = 5;
const DEFAULT_PURGE_INTERVAL_SECS: u64 = 3600;
const DEFAULT_BUILD_TIMEOUT_MS: u64 = 300_000;
const DEFAULT_MAX_OUTPUT_BYTES: u64 = 10 * 1024 * 1024;

/// One hour, the horizon for both the rate and the failure windows.
pub(crate) const HOUR_MS: i64 = 3_600_000;
/// Escalation log retention before the purge task drops records.
pub(crate) const DAY_MS: i64 = 24 * HOUR_MS;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("FORGEBOT_RELAYS must contain at least one relay URL")]
    NoRelays,
}

/// Thresholds for the admission gates and the escalation counter.
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// Accepted requests allowed per identity per trailing hour.
    pub max_requests_per_hour: usize,
    /// Build failures per trailing hour that trigger blacklisting.
    pub error_threshold: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_requests_per_hour: DEFAULT_MAX_REQUESTS_PER_HOUR,
            error_threshold: DEFAULT_ERROR_THRESHOLD,
        }
    }
}

/// Bounded execution environment handed to the build adapter.
#[derive(Debug, Clone)]
pub struct ExecutionEnv {
    /// Hard wall-clock timeout; the invocation is killed after this.
    pub timeout_ms: u64,
    /// Reject captured output beyond this size.
    pub max_output_bytes: u64,
    /// Extra environment variables visible to the invoked process.
    pub env_vars: Vec<(String, String)>,
}

impl Default for ExecutionEnv {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_BUILD_TIMEOUT_MS,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            env_vars: vec![("SAFE_MODE".into(), "true".into())],
        }
    }
}

/// Full bot configuration. Library consumers can build one by hand; the
/// daemon loads it with [`BotConfig::from_env`].
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub relays: Vec<String>,
    pub secret_key: String,
    pub project_root: PathBuf,
    pub builder_cmd: String,
    pub purge_interval: Duration,
    pub security: SecurityConfig,
    pub execution: ExecutionEnv,
}

impl BotConfig {
    /// Load from environment. Unset or unparsable numeric vars fall back to
    /// the defaults documented in the module header.
    pub fn from_env() -> Result<Self, ConfigError> {
        let relays: Vec<String> = std::env::var("FORGEBOT_RELAYS")
            .map_err(|_| ConfigError::Missing("FORGEBOT_RELAYS"))?
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if relays.is_empty() {
            return Err(ConfigError::NoRelays);
        }
        let secret_key = std::env::var("FORGEBOT_SECRET_KEY")
            .map_err(|_| ConfigError::Missing("FORGEBOT_SECRET_KEY"))?;

        Ok(Self {
            relays,
            secret_key,
            project_root: std::env::var("FORGEBOT_PROJECT_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./generated-projects")),
            builder_cmd: std::env::var("FORGEBOT_BUILDER_CMD")
                .unwrap_or_else(|_| "forge-gen".to_string()),
            purge_interval: Duration::from_secs(
                env_u64("FORGEBOT_PURGE_INTERVAL_SECS", DEFAULT_PURGE_INTERVAL_SECS).max(60),
            ),
            security: SecurityConfig {
                max_requests_per_hour: env_u64(
                    "FORGEBOT_MAX_REQUESTS_PER_HOUR",
                    DEFAULT_MAX_REQUESTS_PER_HOUR as u64,
                ) as usize,
                error_threshold: env_u64(
                    "FORGEBOT_ERROR_THRESHOLD",
                    DEFAULT_ERROR_THRESHOLD as u64,
                ) as usize,
            },
            execution: ExecutionEnv {
                timeout_ms: env_u64("FORGEBOT_BUILD_TIMEOUT_MS", DEFAULT_BUILD_TIMEOUT_MS),
                max_output_bytes: env_u64("FORGEBOT_MAX_OUTPUT_BYTES", DEFAULT_MAX_OUTPUT_BYTES),
                env_vars: ExecutionEnv::default().env_vars,
            },
        })
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let sec = SecurityConfig::default();
        assert_eq!(sec.max_requests_per_hour, 10);
        assert_eq!(sec.error_threshold, 5);

        let exec = ExecutionEnv::default();
        assert_eq!(exec.timeout_ms, 300_000);
        assert_eq!(exec.max_output_bytes, 10 * 1024 * 1024);
        assert!(exec.env_vars.iter().any(|(k, v)| k == "SAFE_MODE" && v == "true"));
    }
}
