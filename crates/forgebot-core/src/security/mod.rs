//! The admission security gates: input validation, rate limiting, and the
//! process-lifetime blacklist.
//!
//! All three are owned by the orchestrator; nothing else mutates them. Each
//! check-then-mutate sequence is confined to a single per-identity map entry
//! so concurrent handler invocations cannot interleave inside a gate.

mod blacklist;
mod rate_limit;
mod validator;

pub use blacklist::Blacklist;
pub use rate_limit::{RateDecision, RateLimiter};
pub use validator::{validate_path, IdeaRejection, InputValidator};
