//! Message types exchanged with the transport collaborator.

use serde::{Deserialize, Serialize};

/// A public message delivered by the relay subscription.
///
/// The transport layer is responsible for protocol decoding and signature
/// checks; the pipeline only ever sees this projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Network-wide unique message identifier. Dedup key.
    pub id: String,
    /// Opaque public identifier of the sender. The only per-user key the
    /// pipeline stores.
    pub author: String,
    /// Free-text body the intent patterns are matched against.
    pub body: String,
    /// Unix timestamp (seconds) the message was created at.
    pub created_at: i64,
}

/// A threaded reply to be signed and published by the transport collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyDraft {
    /// Reply text body.
    pub body: String,
    /// Id of the message being replied to.
    pub ref_message: String,
    /// Author of the message being replied to.
    pub ref_author: String,
}
