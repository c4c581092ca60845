//! forgebot-relay: the messaging-network transport collaborator.
//!
//! Implements the event source/sink the core pipeline consumes: a wire
//! event model, reply signing, and a websocket relay pool with a
//! cancellable subscription stream and best-effort publishing. The core
//! never sees any of this — it only receives `InboundMessage` values and
//! hands back `ReplyDraft`s through the `ReplySink` trait.

mod event;
mod pool;
mod signer;

pub use event::{compute_event_id, EventDraft, WireEvent, KIND_TEXT_NOTE};
pub use pool::{RelayPool, SubscriptionHandle};
pub use signer::{EventSigner, SignerError};
