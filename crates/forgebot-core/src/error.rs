//! Error taxonomy for the collaborator seams.
//!
//! Admission rejections are not errors (they are silent drops, see the
//! security module); these types cover the dispatch phase: path allocation,
//! the external build invocation, and best-effort reply publishing.

use std::path::PathBuf;

use thiserror::Error;

/// Failure of the external build adapter. Never disclosed to the requester;
/// recorded against the identity by the escalation counter.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to spawn builder: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("builder io: {0}")]
    Io(#[source] std::io::Error),
    #[error("builder timed out after {0} ms")]
    Timeout(u64),
    #[error("builder exited with status {status}: {stderr}")]
    Failed { status: i32, stderr: String },
    #[error("builder output exceeded {0} bytes")]
    OutputTooLarge(u64),
}

/// Failure to publish a reply. Best-effort: logged and swallowed, never
/// rolls back the underlying build result.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("transport: {0}")]
    Transport(String),
}

/// Failure of the project-path allocator collaborator.
#[derive(Debug, Error)]
pub enum AllocateError {
    #[error("allocating project directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("allocated path failed the safety check: {0}")]
    UnsafePath(PathBuf),
}
