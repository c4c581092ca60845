//! Wire event model.
//!
//! Events are flat JSON objects; the id is the sha256 of a canonical
//! serialization over `[0, pubkey, created_at, kind, tags, content]`, so any
//! party can recompute and check it. Inbound events are verified (id and
//! signature) before they reach the pipeline. Threading uses two tags on
//! replies: `["e", <message id>]` and `["p", <author>]`.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use forgebot_core::{InboundMessage, ReplyDraft};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Kind of plain public text notes — the only kind the bot subscribes to.
pub const KIND_TEXT_NOTE: u16 = 1;

/// A signed event as it travels over the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireEvent {
    pub id: String,
    pub pubkey: String,
    pub created_at: i64,
    pub kind: u16,
    pub tags: Vec<Vec<String>>,
    pub content: String,
    pub sig: String,
}

impl WireEvent {
    /// Recomputes the event id and checks the signature against the embedded
    /// pubkey. Dedup and per-identity gates key on `id` and `pubkey`, so an
    /// event that fails either check must never reach the pipeline.
    pub fn verify(&self) -> bool {
        let draft = EventDraft {
            kind: self.kind,
            created_at: self.created_at,
            tags: self.tags.clone(),
            content: self.content.clone(),
        };
        if compute_event_id(&self.pubkey, &draft) != self.id {
            return false;
        }
        let Ok(key_bytes) = hex::decode(&self.pubkey) else {
            return false;
        };
        let Ok(key_bytes) = <[u8; 32]>::try_from(key_bytes) else {
            return false;
        };
        let Ok(key) = VerifyingKey::from_bytes(&key_bytes) else {
            return false;
        };
        let Ok(sig_bytes) = hex::decode(&self.sig) else {
            return false;
        };
        let Ok(sig_bytes) = <[u8; 64]>::try_from(sig_bytes) else {
            return false;
        };
        key.verify(self.id.as_bytes(), &Signature::from_bytes(&sig_bytes))
            .is_ok()
    }

    /// Projection handed to the core pipeline.
    pub fn to_inbound(&self) -> InboundMessage {
        InboundMessage {
            id: self.id.clone(),
            author: self.pubkey.clone(),
            body: self.content.clone(),
            created_at: self.created_at,
        }
    }
}

/// An event that has not been signed yet.
#[derive(Debug, Clone)]
pub struct EventDraft {
    pub kind: u16,
    pub created_at: i64,
    pub tags: Vec<Vec<String>>,
    pub content: String,
}

impl EventDraft {
    /// A threaded reply referencing the original message id and author.
    pub fn reply(reply: &ReplyDraft, created_at: i64) -> Self {
        Self {
            kind: KIND_TEXT_NOTE,
            created_at,
            tags: vec![
                vec!["e".to_string(), reply.ref_message.clone()],
                vec!["p".to_string(), reply.ref_author.clone()],
            ],
            content: reply.body.clone(),
        }
    }
}

/// Canonical event id: sha256 over the fixed-shape JSON array, hex-encoded.
pub fn compute_event_id(pubkey: &str, draft: &EventDraft) -> String {
    let canonical = serde_json::json!([
        0,
        pubkey,
        draft.created_at,
        draft.kind,
        draft.tags,
        draft.content
    ]);
    // A fixed array of strings and integers always serializes.
    let serialized = serde_json::to_string(&canonical).expect("canonical event serializes");
    hex::encode(Sha256::digest(serialized.as_bytes()))
}
