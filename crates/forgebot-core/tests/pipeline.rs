//! End-to-end admission and dispatch scenarios with mock collaborators.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use forgebot_core::{
    AllocateError, BuildAdapter, BuildError, ErrorEscalator, ExecutionEnv, InboundMessage,
    Orchestrator, ProjectAllocator, PublishError, ReplyDraft, ReplySink, SecurityConfig,
};
use tokio::sync::Mutex;

#[derive(Default)]
struct RecordingSink {
    published: Mutex<Vec<ReplyDraft>>,
}

#[async_trait::async_trait]
impl ReplySink for RecordingSink {
    async fn publish(&self, reply: ReplyDraft) -> Result<(), PublishError> {
        self.published.lock().await.push(reply);
        Ok(())
    }
}

struct FixedAllocator {
    base: PathBuf,
    calls: AtomicUsize,
}

impl FixedAllocator {
    fn new(base: &str) -> Self {
        Self {
            base: PathBuf::from(base),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl ProjectAllocator for FixedAllocator {
    async fn allocate(&self, _idea: &str) -> Result<PathBuf, AllocateError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.base.join(format!("project_{n}")))
    }
}

struct ScriptedBuilder {
    calls: AtomicUsize,
    delay: Option<Duration>,
    fail: bool,
}

impl ScriptedBuilder {
    fn succeeding() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay: None,
            fail: false,
        }
    }

    fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay: None,
            fail: true,
        }
    }

    fn slow(delay: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay: Some(delay),
            fail: false,
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl BuildAdapter for ScriptedBuilder {
    async fn generate(
        &self,
        idea: &str,
        _project_dir: &Path,
        _env: &ExecutionEnv,
    ) -> Result<String, BuildError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            Err(BuildError::Failed {
                status: 1,
                stderr: "synthetic failure".into(),
            })
        } else {
            Ok(format!("built: {idea}"))
        }
    }
}

struct Harness {
    orchestrator: Arc<Orchestrator>,
    sink: Arc<RecordingSink>,
    builder: Arc<ScriptedBuilder>,
}

fn harness(builder: ScriptedBuilder) -> Harness {
    let sink = Arc::new(RecordingSink::default());
    let builder = Arc::new(builder);
    let orchestrator = Arc::new(Orchestrator::new(
        SecurityConfig::default(),
        ExecutionEnv::default(),
        Arc::new(ErrorEscalator::new(SecurityConfig::default().error_threshold)),
        Arc::clone(&sink) as Arc<dyn ReplySink>,
        Arc::new(FixedAllocator::new("/srv/forgebot-projects")),
        Arc::clone(&builder) as Arc<dyn BuildAdapter>,
    ));
    Harness {
        orchestrator,
        sink,
        builder,
    }
}

fn message(id: &str, author: &str, body: &str) -> InboundMessage {
    InboundMessage {
        id: id.into(),
        author: author.into(),
        body: body.into(),
        created_at: 1_700_000_000,
    }
}

#[tokio::test]
async fn clean_idea_is_admitted_dispatched_and_answered() {
    let h = harness(ScriptedBuilder::succeeding());
    h.orchestrator
        .handle_message(message("ev1", "alice", "todoアプリ作りたい"))
        .await;

    assert_eq!(h.builder.call_count(), 1);
    let published = h.sink.published.lock().await;
    assert_eq!(published.len(), 2, "acknowledgement and completion");
    assert!(published[0].body.contains("作成開始"));
    assert!(published[1].body.contains("完了"));
    assert!(published[1].body.contains("built: todoアプリ"));
    for reply in published.iter() {
        assert_eq!(reply.ref_message, "ev1");
        assert_eq!(reply.ref_author, "alice");
    }
}

#[tokio::test]
async fn non_request_messages_are_ignored_silently() {
    let h = harness(ScriptedBuilder::succeeding());
    h.orchestrator
        .handle_message(message("ev1", "alice", "just saying hello"))
        .await;

    assert_eq!(h.builder.call_count(), 0);
    assert!(h.sink.published.lock().await.is_empty());
}

#[tokio::test]
async fn too_short_idea_is_rejected_before_dispatch() {
    let h = harness(ScriptedBuilder::succeeding());
    h.orchestrator
        .handle_message(message("ev1", "alice", "a作りたい"))
        .await;

    assert_eq!(h.builder.call_count(), 0);
    assert!(h.sink.published.lock().await.is_empty());
}

#[tokio::test]
async fn dangerous_idea_never_reaches_the_builder() {
    let h = harness(ScriptedBuilder::succeeding());
    h.orchestrator
        .handle_message(message("ev1", "mallory", "sudo rm -rf / を実装して"))
        .await;

    assert_eq!(h.builder.call_count(), 0);
    assert!(h.sink.published.lock().await.is_empty());
}

#[tokio::test]
async fn duplicate_delivery_during_dispatch_is_dropped() {
    let h = harness(ScriptedBuilder::slow(Duration::from_millis(100)));

    let first = {
        let orch = Arc::clone(&h.orchestrator);
        tokio::spawn(async move {
            orch.handle_message(message("ev_dup", "alice", "電卓を作って"))
                .await;
        })
    };
    // Let the first delivery reach the (slow) build phase.
    tokio::time::sleep(Duration::from_millis(20)).await;
    h.orchestrator
        .handle_message(message("ev_dup", "alice", "電卓を作って"))
        .await;
    first.await.unwrap();

    assert_eq!(h.builder.call_count(), 1, "only one dispatched phase");
    assert_eq!(h.sink.published.lock().await.len(), 2);
}

#[tokio::test]
async fn eleventh_request_in_an_hour_is_rate_limited() {
    let h = harness(ScriptedBuilder::succeeding());
    for i in 0..11 {
        h.orchestrator
            .handle_message(message(&format!("ev{i}"), "alice", "todoアプリ作りたい"))
            .await;
    }

    assert_eq!(h.builder.call_count(), 10, "11th never reaches the builder");
    // 10 admitted requests produce an ack and a completion each.
    assert_eq!(h.sink.published.lock().await.len(), 20);
}

#[tokio::test]
async fn repeated_build_failures_escalate_to_blacklist() {
    let h = harness(ScriptedBuilder::failing());
    for i in 0..5 {
        h.orchestrator
            .handle_message(message(&format!("ev{i}"), "mallory", "todoアプリ作りたい"))
            .await;
    }
    assert_eq!(h.builder.call_count(), 5);

    // The sixth request is dropped at the blacklist gate.
    h.orchestrator
        .handle_message(message("ev6", "mallory", "todoアプリ作りたい"))
        .await;
    assert_eq!(h.builder.call_count(), 5);

    // Five acknowledgements were published before the failures; failures
    // themselves produce no reply, and the blacklisted request none at all.
    assert_eq!(h.sink.published.lock().await.len(), 5);

    // Other identities are unaffected.
    h.orchestrator
        .handle_message(message("ev7", "alice", "todoアプリ作りたい"))
        .await;
    assert_eq!(h.builder.call_count(), 6);
}
