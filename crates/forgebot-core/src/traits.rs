//! Collaborator seams consumed by the orchestrator.
//!
//! The pipeline treats the build tool, the project-path allocator, and the
//! reply channel as opaque async collaborators. Concrete implementations
//! live in forgebot-relay (transport) and the daemon add-on (builder CLI,
//! workspace allocator); tests substitute mocks.

use std::path::{Path, PathBuf};

use crate::config::ExecutionEnv;
use crate::error::{AllocateError, BuildError, PublishError};
use crate::message::ReplyDraft;

/// Signs and publishes a threaded reply. Best-effort: the caller logs
/// failures and moves on.
#[async_trait::async_trait]
pub trait ReplySink: Send + Sync {
    async fn publish(&self, reply: ReplyDraft) -> Result<(), PublishError>;
}

/// The external, slow, untrusted build tool. Given a sanitized idea and an
/// already-validated project directory, produces a human-readable summary
/// of what was built.
#[async_trait::async_trait]
pub trait BuildAdapter: Send + Sync {
    async fn generate(
        &self,
        idea: &str,
        project_dir: &Path,
        env: &ExecutionEnv,
    ) -> Result<String, BuildError>;
}

/// Allocates a project directory for an accepted idea. The returned path is
/// guaranteed to exist, but the orchestrator still re-checks it with
/// [`crate::security::validate_path`] before handing it to the builder.
#[async_trait::async_trait]
pub trait ProjectAllocator: Send + Sync {
    async fn allocate(&self, idea: &str) -> Result<PathBuf, AllocateError>;
}
