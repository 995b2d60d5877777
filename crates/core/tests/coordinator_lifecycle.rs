//! Coordinator integration tests.
//!
//! These tests run several topics concurrently against a shared mock client:
//! - Every topic reaches a terminal report
//! - A crashing topic is isolated from its siblings
//! - Refresh callbacks and start staggering

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tempfile::TempDir;

use nlmflow_core::{
    config::{ArtifactKind, PipelineConfig},
    coordinator::{Coordinator, TopicReport},
    pipeline::AbortReason,
    state::StateStore,
    status::StatusBoard,
    testing::{fixtures, MockCommandClient, RecordedCommand},
    CommandClient,
};

struct TestHarness {
    client: Arc<MockCommandClient>,
    coordinator: Coordinator,
    temp_dir: TempDir,
}

impl TestHarness {
    async fn new(mut config: PipelineConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        config.output_dir = temp_dir.path().join("output");
        config.state_path = temp_dir.path().join("state.json");

        let client = Arc::new(MockCommandClient::new());
        client
            .respond(&["create", "notebook"], fixtures::creation_output())
            .await;
        client
            .respond(&["get", "notebook"], fixtures::notebook_listing())
            .await;
        client
            .respond(&["research", "status"], "Status: completed")
            .await;

        let state = Arc::new(StateStore::open(config.state_path.clone()));
        let board = Arc::new(StatusBoard::for_config(&config));
        let coordinator = Coordinator::new(
            Arc::new(config),
            Arc::clone(&client) as Arc<dyn CommandClient>,
            state,
            board,
        );

        Self {
            client,
            coordinator,
            temp_dir,
        }
    }

    /// Recorded calls whose arguments start with `prefix`, in call order.
    async fn recorded(&self, prefix: &[&str]) -> Vec<RecordedCommand> {
        self.client
            .calls()
            .await
            .into_iter()
            .filter(|call| {
                call.request.args.len() >= prefix.len()
                    && prefix.iter().zip(&call.request.args).all(|(p, a)| *p == a.as_str())
            })
            .collect()
    }

    fn state(&self) -> StateStore {
        StateStore::open(self.temp_dir.path().join("state.json"))
    }
}

fn topics(keys: &[&str]) -> PipelineConfig {
    fixtures::fast_config(keys.iter().map(|k| fixtures::topic(k)).collect())
}

#[tokio::test]
async fn test_all_topics_finish() {
    let harness = TestHarness::new(topics(&["a", "b", "c"])).await;

    let summary = harness.coordinator.run().await;

    assert!(summary.all_finished());
    assert_eq!(summary.topics.len(), 3);
    let keys: Vec<_> = summary.topics.iter().map(|t| t.key.as_str()).collect();
    assert_eq!(keys, vec!["a", "b", "c"]);

    let state = harness.state();
    for key in ["a", "b", "c"] {
        assert_eq!(state.notebook_id(key).as_deref(), Some(fixtures::NOTEBOOK_ID));
        assert_eq!(harness.coordinator.board().row(key).unwrap().message, "Finished");
    }
    assert_eq!(harness.client.calls_matching(&["create", "notebook"]).await.len(), 3);
}

#[tokio::test]
async fn test_aborted_topic_is_reported() {
    let mut config = topics(&["ok"]);
    config.topics.push(fixtures::research_topic("bad", "q"));
    let harness = TestHarness::new(config).await;
    harness
        .client
        .respond(&["research", "status"], "Status: failed")
        .await;

    let summary = harness.coordinator.run().await;

    assert_eq!(summary.report("ok"), Some(&TopicReport::Finished));
    assert_eq!(
        summary.report("bad"),
        Some(&TopicReport::Aborted(AbortReason::ResearchFailed))
    );
    assert_eq!(summary.aborted_count(), 1);
}

#[tokio::test]
async fn test_local_fault_is_isolated() {
    let mut config = topics(&["good", "bad"]);
    config.topics[1].artifacts = Some(fixtures::artifacts(&[ArtifactKind::Audio]));
    let harness = TestHarness::new(config).await;
    harness
        .client
        .respond(
            &["studio", "status"],
            fixtures::studio_status(&[("audio", "completed", "a1")]),
        )
        .await;
    // A file where the download directory should go
    let output = harness.temp_dir.path().join("output");
    std::fs::create_dir_all(&output).unwrap();
    std::fs::write(output.join("audios"), b"not a directory").unwrap();

    let summary = harness.coordinator.run().await;

    assert_eq!(summary.report("good"), Some(&TopicReport::Finished));
    assert!(matches!(summary.report("bad"), Some(TopicReport::Crashed(_))));
    let message = harness.coordinator.board().row("bad").unwrap().message;
    assert!(message.starts_with("Crash: "), "unexpected message: {}", message);
    // Progress before the fault is kept
    assert!(harness
        .state()
        .is_stage_done("bad", nlmflow_core::StageToken::Artifact(ArtifactKind::Audio)));
}

#[tokio::test]
async fn test_panicking_topic_is_isolated() {
    let harness = TestHarness::new(topics(&["calm", "boom"])).await;
    harness
        .client
        .respond_with(&["create", "notebook", "Topic boom"], |_| {
            panic!("client exploded")
        })
        .await;

    let summary = harness.coordinator.run().await;

    assert_eq!(summary.report("calm"), Some(&TopicReport::Finished));
    assert!(matches!(summary.report("boom"), Some(TopicReport::Crashed(_))));
    assert_eq!(summary.crashed_count(), 1);
    assert!(harness
        .coordinator
        .board()
        .row("boom")
        .unwrap()
        .message
        .starts_with("Crash: "));
}

#[tokio::test]
async fn test_refresh_callback_runs() {
    let harness = TestHarness::new(topics(&["a", "b"])).await;
    let refreshes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&refreshes);
    let coordinator = harness
        .coordinator
        .with_refresh_callback(Arc::new(move |board: &StatusBoard| {
            assert_eq!(board.snapshot().len(), 2);
            counter.fetch_add(1, Ordering::SeqCst);
        }));

    let summary = coordinator.run().await;

    assert!(summary.all_finished());
    // At least the final refresh
    assert!(refreshes.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn test_starts_are_staggered_by_submission_order() {
    let mut config = topics(&["first", "second", "third"]);
    config.timing.stagger_ms = 40;
    let harness = TestHarness::new(config).await;

    let started = Utc::now();
    let summary = harness.coordinator.run().await;

    assert!(summary.all_finished());
    let creates = harness.recorded(&["create", "notebook"]).await;
    let titles: Vec<&str> = creates.iter().map(|call| call.request.args[2].as_str()).collect();
    assert_eq!(titles, vec!["Topic first", "Topic second", "Topic third"]);

    for (index, call) in creates.iter().enumerate() {
        let offset = (call.timestamp - started).num_milliseconds();
        assert!(
            offset >= 40 * index as i64,
            "topic {} started after {}ms",
            index,
            offset
        );
    }
}

#[tokio::test]
async fn test_staggered_topic_does_not_hold_a_pool_slot() {
    let mut config = topics(&["slow", "quick"]);
    config.max_concurrent_topics = 1;
    config.timing.stagger_ms = 150;
    let harness = TestHarness::new(config).await;
    harness
        .client
        .respond_with(&["create", "notebook", "Topic slow"], |_| {
            std::thread::sleep(std::time::Duration::from_millis(200));
            fixtures::creation_output()
        })
        .await;

    let started = Utc::now();
    let summary = harness.coordinator.run().await;

    assert!(summary.all_finished());
    let quick = harness.recorded(&["create", "notebook", "Topic quick"]).await;
    let offset = (quick[0].timestamp - started).num_milliseconds();
    // The offset elapsed while "slow" held the only slot
    assert!(offset >= 150, "quick started after {}ms", offset);
    assert!(offset < 300, "quick started after {}ms", offset);
}

#[tokio::test]
async fn test_bounded_pool_runs_every_topic() {
    let mut config = topics(&["a", "b", "c", "d"]);
    config.max_concurrent_topics = 1;
    let harness = TestHarness::new(config).await;
    assert_eq!(harness.coordinator.pool_size(), 1);

    let summary = harness.coordinator.run().await;

    assert!(summary.all_finished());
    assert_eq!(summary.finished_count(), 4);
}

#[tokio::test]
async fn test_pool_defaults_to_topic_count() {
    let harness = TestHarness::new(topics(&["a", "b", "c"])).await;
    assert_eq!(harness.coordinator.pool_size(), 3);
}
