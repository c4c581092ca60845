//! forgebot-core: the request admission and escalation pipeline.
//!
//! An inbound relay message flows through intent extraction, in-flight dedup,
//! the blacklist / rate-limit / validation gates, and — if admitted — is
//! dispatched to the external build adapter. Build failures feed the
//! escalation counter, which converts repeat offenders into permanent
//! blacklist entries. Everything the network can see is either silence or
//! the two success replies; rejection and failure details stay in the logs.

mod config;
mod error;
mod escalation;
mod intent;
mod maintenance;
mod message;
mod orchestrator;
mod publisher;
pub mod security;
mod tracker;
mod traits;

pub use config::{BotConfig, ConfigError, ExecutionEnv, SecurityConfig};
pub use error::{AllocateError, BuildError, PublishError};
pub use escalation::{ErrorEscalator, ErrorRecord};
pub use intent::IntentMatcher;
pub use maintenance::{spawn_purge_loop, MaintenanceHandle};
pub use message::{InboundMessage, ReplyDraft};
pub use orchestrator::Orchestrator;
pub use publisher::ResponsePublisher;
pub use security::{
    validate_path, Blacklist, IdeaRejection, InputValidator, RateDecision, RateLimiter,
};
pub use tracker::{InFlightGuard, RequestTracker};
pub use traits::{BuildAdapter, ProjectAllocator, ReplySink};
