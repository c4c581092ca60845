//! Threaded reply formatting and best-effort publishing.
//!
//! The only user-visible outputs of the whole pipeline are the two replies
//! formatted here: the start acknowledgement and the completion summary.
//! Publish failures are logged and swallowed; a lost reply never rolls back
//! a build.

use std::path::Path;
use std::sync::Arc;

use tracing::warn;

use crate::message::{InboundMessage, ReplyDraft};
use crate::traits::ReplySink;

/// Formats and emits threaded replies through the transport collaborator.
pub struct ResponsePublisher {
    sink: Arc<dyn ReplySink>,
}

impl ResponsePublisher {
    pub fn new(sink: Arc<dyn ReplySink>) -> Self {
        Self { sink }
    }

    /// Published right after admission, before the build starts.
    pub async fn acknowledge(&self, origin: &InboundMessage, idea: &str) {
        self.send(origin, format!("プロジェクト「{idea}」を作成開始します！"))
            .await;
    }

    /// Published on adapter success, referencing the original message.
    pub async fn completed(
        &self,
        origin: &InboundMessage,
        idea: &str,
        project_dir: &Path,
        summary: &str,
    ) {
        self.send(
            origin,
            format!(
                "プロジェクト「{idea}」の作成が完了しました！\n\nパス: {}\n\n{summary}",
                project_dir.display()
            ),
        )
        .await;
    }

    async fn send(&self, origin: &InboundMessage, body: String) {
        let reply = ReplyDraft {
            body,
            ref_message: origin.id.clone(),
            ref_author: origin.author.clone(),
        };
        if let Err(error) = self.sink.publish(reply).await {
            warn!(message_id = %origin.id, %error, "failed to publish reply");
        }
    }
}
