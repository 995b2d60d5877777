//! Execution coordinator implementation.

use std::sync::Arc;

use tokio::sync::{broadcast, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::client::CommandClient;
use crate::config::PipelineConfig;
use crate::pipeline::{TopicOutcome, TopicPipeline};
use crate::state::StateStore;
use crate::status::{StatusBoard, StatusSink};

use super::types::{RefreshCallback, RunSummary, TopicReport, TopicSummary};

/// Runs every configured topic concurrently and collects their outcomes.
///
/// Started topics are never cancelled. A topic that fails or panics is
/// reported on the board and in the summary without touching its siblings.
pub struct Coordinator {
    config: Arc<PipelineConfig>,
    client: Arc<dyn CommandClient>,
    state: Arc<StateStore>,
    board: Arc<StatusBoard>,
    on_refresh: Option<RefreshCallback>,
}

impl Coordinator {
    pub fn new(
        config: Arc<PipelineConfig>,
        client: Arc<dyn CommandClient>,
        state: Arc<StateStore>,
        board: Arc<StatusBoard>,
    ) -> Self {
        Self {
            config,
            client,
            state,
            board,
            on_refresh: None,
        }
    }

    /// Invoke `callback` on every refresh tick.
    pub fn with_refresh_callback(mut self, callback: RefreshCallback) -> Self {
        self.on_refresh = Some(callback);
        self
    }

    pub fn board(&self) -> &Arc<StatusBoard> {
        &self.board
    }

    /// Topics allowed to run at once.
    pub fn pool_size(&self) -> usize {
        match self.config.max_concurrent_topics {
            0 => self.config.topics.len().max(1),
            n => n,
        }
    }

    /// Runs all topics to completion.
    pub async fn run(&self) -> RunSummary {
        let pool_size = self.pool_size();
        info!(
            "Running {} topic(s) with {} worker slot(s)",
            self.config.topics.len(),
            pool_size
        );

        let (shutdown_tx, _) = broadcast::channel(1);
        let refresher = self.spawn_refresher(shutdown_tx.subscribe());

        let semaphore = Arc::new(Semaphore::new(pool_size));
        let mut handles = Vec::with_capacity(self.config.topics.len());
        for (index, topic) in self.config.topics.iter().cloned().enumerate() {
            let key = topic.key.clone();
            let pipeline = TopicPipeline::new(
                topic,
                index,
                Arc::clone(&self.config),
                Arc::clone(&self.client),
                Arc::clone(&self.state),
                Arc::clone(&self.board) as Arc<dyn StatusSink>,
            );
            let semaphore = Arc::clone(&semaphore);

            let handle = tokio::spawn(async move {
                // Offset before taking a slot so a waiting topic holds none
                pipeline.stagger().await;
                // The semaphore is never closed
                let _permit = semaphore.acquire_owned().await.ok();
                pipeline.run().await
            });
            handles.push((key, handle));
        }

        let mut summary = RunSummary::default();
        for (key, handle) in handles {
            let report = match handle.await {
                Ok(Ok(TopicOutcome::Finished)) => TopicReport::Finished,
                Ok(Ok(TopicOutcome::Aborted(reason))) => TopicReport::Aborted(reason),
                Ok(Err(e)) => self.crashed(&key, e.to_string()),
                Err(e) => self.crashed(&key, e.to_string()),
            };
            summary.topics.push(TopicSummary { key, report });
        }

        let _ = shutdown_tx.send(());
        if let Some(refresher) = refresher {
            let _ = refresher.await;
        }
        if let Some(callback) = &self.on_refresh {
            callback(&self.board);
        }

        info!(
            "Run complete: {} finished, {} aborted, {} crashed",
            summary.finished_count(),
            summary.aborted_count(),
            summary.crashed_count()
        );
        summary
    }

    fn crashed(&self, key: &str, message: String) -> TopicReport {
        error!("Topic {} crashed: {}", key, message);
        self.board.message(key, &format!("Crash: {}", message));
        TopicReport::Crashed(message)
    }

    /// Spawn the timer-driven refresh task, if a callback is set.
    fn spawn_refresher(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Option<JoinHandle<()>> {
        let callback = self.on_refresh.clone()?;
        let board = Arc::clone(&self.board);
        let period = self.config.timing.refresh_interval();

        Some(tokio::spawn(async move {
            debug!("Status refresh started");
            let mut ticker = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    _ = ticker.tick() => callback(&board),
                }
            }
            debug!("Status refresh stopped");
        }))
    }
}
