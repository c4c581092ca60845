//! Relay pool: subscription stream and best-effort publishing.
//!
//! One reader task per configured relay feeds a single mpsc channel the
//! orchestrator consumes item-by-item. Closing the `SubscriptionHandle`
//! unsubscribes from every endpoint. Publishing connects per event and
//! succeeds if at least one relay accepted the frame — delivery is
//! best-effort by contract.

use std::time::Duration;

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use uuid::Uuid;

use forgebot_core::{InboundMessage, PublishError, ReplyDraft, ReplySink};

use crate::event::{EventDraft, WireEvent, KIND_TEXT_NOTE};
use crate::signer::EventSigner;

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

const CHANNEL_CAPACITY: usize = 64;
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Closes the subscription on every relay when asked to.
#[derive(Debug)]
pub struct SubscriptionHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl SubscriptionHandle {
    /// Signals all reader tasks to disconnect and waits for them.
    pub async fn close(mut self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks.drain(..) {
            let _ = task.await;
        }
    }
}

/// A pool of relay endpoints sharing one signer.
pub struct RelayPool {
    relays: Vec<String>,
    signer: EventSigner,
}

impl RelayPool {
    pub fn new(relays: Vec<String>, signer: EventSigner) -> Self {
        Self { relays, signer }
    }

    /// Subscribes to text notes created at or after `since` on every relay.
    /// Returns the merged inbound stream and the handle that cancels it.
    pub fn subscribe(&self, since: i64) -> (mpsc::Receiver<InboundMessage>, SubscriptionHandle) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (shutdown, _) = watch::channel(false);
        let tasks = self
            .relays
            .iter()
            .map(|url| {
                tokio::spawn(relay_loop(
                    url.clone(),
                    since,
                    tx.clone(),
                    shutdown.subscribe(),
                ))
            })
            .collect();
        (rx, SubscriptionHandle { shutdown, tasks })
    }

    /// Signs the reply and offers it to every relay. Ok if any accepted.
    pub async fn publish(&self, reply: ReplyDraft) -> Result<(), PublishError> {
        let event = self
            .signer
            .sign(EventDraft::reply(&reply, Utc::now().timestamp()));
        let frame = serde_json::json!(["EVENT", event]).to_string();

        let mut delivered = 0usize;
        for url in &self.relays {
            match send_frame(url, &frame).await {
                Ok(()) => delivered += 1,
                Err(error) => warn!(relay = %url, %error, "publish failed"),
            }
        }
        if delivered == 0 {
            return Err(PublishError::Transport(
                "no relay accepted the event".to_string(),
            ));
        }
        debug!(delivered, relays = self.relays.len(), "reply published");
        Ok(())
    }
}

#[async_trait::async_trait]
impl ReplySink for RelayPool {
    async fn publish(&self, reply: ReplyDraft) -> Result<(), PublishError> {
        RelayPool::publish(self, reply).await
    }
}

async fn send_frame(url: &str, frame: &str) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    let (mut ws, _) = connect_async(url).await?;
    ws.send(Message::Text(frame.to_string())).await?;
    let _ = ws.close(None).await;
    Ok(())
}

/// Connect-subscribe-read loop for one relay, with exponential backoff on
/// connection loss, until shutdown is signalled.
async fn relay_loop(
    url: String,
    since: i64,
    tx: mpsc::Sender<InboundMessage>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut backoff = INITIAL_BACKOFF;
    loop {
        if *shutdown.borrow() {
            return;
        }
        match connect_async(url.as_str()).await {
            Ok((ws, _)) => {
                info!(relay = %url, "connected");
                backoff = INITIAL_BACKOFF;
                if let Err(error) = run_subscription(ws, since, &tx, &mut shutdown).await {
                    warn!(relay = %url, %error, "subscription dropped");
                }
                if *shutdown.borrow() {
                    return;
                }
            }
            Err(error) => {
                warn!(relay = %url, %error, "connect failed");
            }
        }
        tokio::select! {
            _ = tokio::time::sleep(backoff) => {}
            changed = shutdown.changed() => {
                // A dropped sender means the handle is gone: stop too,
                // otherwise this arm resolves instantly on every iteration.
                if changed.is_err() || *shutdown.borrow() {
                    return;
                }
            }
        }
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}

async fn run_subscription(
    mut ws: Ws,
    since: i64,
    tx: &mpsc::Sender<InboundMessage>,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    let sub_id = Uuid::new_v4().to_string();
    let req = serde_json::json!(["REQ", sub_id, { "kinds": [KIND_TEXT_NOTE], "since": since }]);
    ws.send(Message::Text(req.to_string())).await?;

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    let _ = ws.close(None).await;
                    return Ok(());
                }
            }
            frame = ws.next() => {
                match frame {
                    None => return Ok(()),
                    Some(Err(error)) => return Err(error),
                    Some(Ok(Message::Ping(payload))) => {
                        ws.send(Message::Pong(payload)).await?;
                    }
                    Some(Ok(Message::Text(text))) => {
                        if let Some(message) = decode_event_frame(&text) {
                            if tx.send(message).await.is_err() {
                                // Receiver gone; nothing left to feed.
                                let _ = ws.close(None).await;
                                return Ok(());
                            }
                        }
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }
}

/// Decodes an `["EVENT", <sub id>, {..}]` frame into an inbound message.
/// Anything else (notices, end-of-stored-events, other kinds, malformed
/// JSON, events whose id or signature does not verify) is ignored.
fn decode_event_frame(text: &str) -> Option<InboundMessage> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    let frame = value.as_array()?;
    if frame.first()?.as_str()? != "EVENT" {
        return None;
    }
    let event: WireEvent = serde_json::from_value(frame.get(2)?.clone()).ok()?;
    if event.kind != KIND_TEXT_NOTE {
        return None;
    }
    // The gates attribute by pubkey; a forged pubkey must not get that far.
    if !event.verify() {
        debug!(event_id = %event.id, "dropped event that failed verification");
        return None;
    }
    Some(event.to_inbound())
}
