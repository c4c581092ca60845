//! Reply-event signing.

use ed25519_dalek::{Signer as _, SigningKey};
use thiserror::Error;

use crate::event::{compute_event_id, EventDraft, WireEvent};

#[derive(Debug, Error)]
pub enum SignerError {
    #[error("secret key must be 64 hex characters (32 bytes)")]
    InvalidKey,
}

/// Holds the bot's signing key and turns drafts into signed wire events.
pub struct EventSigner {
    key: SigningKey,
    public_hex: String,
}

impl EventSigner {
    /// Accepts the raw hex secret key from configuration.
    pub fn from_hex(secret: &str) -> Result<Self, SignerError> {
        let bytes = hex::decode(secret.trim()).map_err(|_| SignerError::InvalidKey)?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| SignerError::InvalidKey)?;
        let key = SigningKey::from_bytes(&bytes);
        let public_hex = hex::encode(key.verifying_key().to_bytes());
        Ok(Self { key, public_hex })
    }

    /// Hex public key the bot publishes under.
    pub fn public_key(&self) -> &str {
        &self.public_hex
    }

    /// Computes the event id and signs it.
    pub fn sign(&self, draft: EventDraft) -> WireEvent {
        let id = compute_event_id(&self.public_hex, &draft);
        let sig = self.key.sign(id.as_bytes());
        WireEvent {
            id,
            pubkey: self.public_hex.clone(),
            created_at: draft.created_at,
            kind: draft.kind,
            tags: draft.tags,
            content: draft.content,
            sig: hex::encode(sig.to_bytes()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signature, Verifier, VerifyingKey};
    use forgebot_core::ReplyDraft;

    const TEST_SECRET: &str =
        "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60";

    #[test]
    fn rejects_malformed_secrets() {
        assert!(EventSigner::from_hex("not hex").is_err());
        assert!(EventSigner::from_hex("abcd").is_err());
    }

    #[test]
    fn signed_events_verify_against_the_public_key() {
        let signer = EventSigner::from_hex(TEST_SECRET).unwrap();
        let event = signer.sign(EventDraft::reply(
            &ReplyDraft {
                body: "done".into(),
                ref_message: "ev1".into(),
                ref_author: "npub_alice".into(),
            },
            1_700_000_000,
        ));

        assert_eq!(event.pubkey, signer.public_key());

        let key_bytes: [u8; 32] = hex::decode(&event.pubkey).unwrap().try_into().unwrap();
        let verifying = VerifyingKey::from_bytes(&key_bytes).unwrap();
        let sig_bytes: [u8; 64] = hex::decode(&event.sig).unwrap().try_into().unwrap();
        let signature = Signature::from_bytes(&sig_bytes);
        assert!(verifying.verify(event.id.as_bytes(), &signature).is_ok());
    }
}
