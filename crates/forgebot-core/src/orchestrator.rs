//! Per-message orchestration.
//!
//! State machine per inbound message:
//! Received → Matched → Admitted → Dispatched → {Succeeded | Failed} → Released.
//!
//! The admission gates run in a fixed order: in-flight dedup, blacklist,
//! rate limit, input validation. Any gate failure drops the message
//! silently — an internal log line only, no reply, and no escalation-counter
//! increment (the counter measures build failures, not admission
//! rejections). Only the orchestrator mutates the shared gate state.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{ExecutionEnv, SecurityConfig};
use crate::error::{AllocateError, BuildError};
use crate::escalation::ErrorEscalator;
use crate::intent::IntentMatcher;
use crate::message::InboundMessage;
use crate::publisher::ResponsePublisher;
use crate::security::{validate_path, Blacklist, InputValidator, RateDecision, RateLimiter};
use crate::tracker::RequestTracker;
use crate::traits::{BuildAdapter, ProjectAllocator, ReplySink};

const BLACKLIST_REASON: &str = "too many errors";

#[derive(Debug, Error)]
enum DispatchError {
    #[error(transparent)]
    Allocate(#[from] AllocateError),
    #[error(transparent)]
    Build(#[from] BuildError),
}

/// Composes the gates around one inbound message, invokes the external
/// build adapter, and drives the reply.
pub struct Orchestrator {
    intents: IntentMatcher,
    tracker: RequestTracker,
    blacklist: Blacklist,
    rate_limiter: RateLimiter,
    validator: InputValidator,
    escalator: Arc<ErrorEscalator>,
    publisher: ResponsePublisher,
    allocator: Arc<dyn ProjectAllocator>,
    builder: Arc<dyn BuildAdapter>,
    execution: ExecutionEnv,
}

impl Orchestrator {
    pub fn new(
        security: SecurityConfig,
        execution: ExecutionEnv,
        escalator: Arc<ErrorEscalator>,
        sink: Arc<dyn ReplySink>,
        allocator: Arc<dyn ProjectAllocator>,
        builder: Arc<dyn BuildAdapter>,
    ) -> Self {
        Self {
            intents: IntentMatcher::new(),
            tracker: RequestTracker::new(),
            blacklist: Blacklist::new(),
            rate_limiter: RateLimiter::new(security.max_requests_per_hour),
            validator: InputValidator::new(),
            escalator,
            publisher: ResponsePublisher::new(sink),
            allocator,
            builder,
            execution,
        }
    }

    /// Handles one inbound message end to end. Multiple invocations may run
    /// concurrently; the dedup guard ensures at most one dispatched phase
    /// per message id.
    pub async fn handle_message(&self, message: InboundMessage) {
        // Received → Matched: not a build request is not an event at all.
        let Some(raw_idea) = self.intents.extract(&message.body) else {
            return;
        };

        // Matched → Admitted, gate 1: in-flight dedup. The guard releases
        // the id on every exit path below, including panics.
        let Some(_in_flight) = self.tracker.acquire(&message.id) else {
            debug!(message_id = %message.id, "duplicate delivery while in flight, dropped");
            return;
        };

        if self.blacklist.is_blocked(&message.author) {
            info!(author = %message.author, "dropped request from blacklisted identity");
            return;
        }

        if let RateDecision::Limited { current } = self.rate_limiter.check(&message.author) {
            info!(
                author = %message.author,
                current,
                "rate limit exceeded, request dropped"
            );
            return;
        }

        let idea = match self.validator.validate_idea(&raw_idea) {
            Ok(idea) => idea,
            Err(rejection) if rejection.is_security_alert() => {
                warn!(
                    author = %message.author,
                    reason = %rejection,
                    security_alert = true,
                    "dangerous build request rejected"
                );
                return;
            }
            Err(rejection) => {
                info!(author = %message.author, reason = %rejection, "invalid build request dropped");
                return;
            }
        };

        info!(
            message_id = %message.id,
            author = %message.author,
            idea = %idea,
            "build request admitted"
        );

        // Admitted → Dispatched → {Succeeded | Failed}.
        match self.dispatch(&message, &idea).await {
            Ok(()) => {
                info!(message_id = %message.id, idea = %idea, "build completed");
            }
            Err(error) => {
                let failures = self.escalator.record_failure(&message.author, &error.to_string());
                if self.escalator.should_block(&message.author) {
                    self.blacklist.block(&message.author, BLACKLIST_REASON);
                }
                // Failure details are never disclosed to the requester.
                warn!(
                    message_id = %message.id,
                    author = %message.author,
                    %error,
                    failures,
                    "build failed"
                );
            }
        }
        // Released: the in-flight guard drops here.
    }

    async fn dispatch(&self, message: &InboundMessage, idea: &str) -> Result<(), DispatchError> {
        self.publisher.acknowledge(message, idea).await;

        let project_dir = self.allocator.allocate(idea).await?;
        // The allocator is external; never trust its output blindly.
        if !validate_path(&project_dir) {
            return Err(AllocateError::UnsafePath(project_dir).into());
        }

        let summary = self
            .builder
            .generate(idea, &project_dir, &self.execution)
            .await?;

        self.publisher.completed(message, idea, &project_dir, &summary).await;
        Ok(())
    }
}
