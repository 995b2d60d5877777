//! Per-topic stage machine.
//!
//! One [`TopicPipeline`] drives a single topic from workspace resolution to
//! downloads. Every completed sub-step is written to the [`StateStore`] before
//! the next one starts, so a re-run skips whatever is already recorded.

use std::sync::Arc;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::client::{CommandClient, CommandRequest};
use crate::config::{ArtifactKind, ArtifactSpec, PipelineConfig, Topic};
use crate::extract::{extract_notebook_id, extract_task_id, parse_latest_artifacts, safe_filename, ArtifactStatus};
use crate::state::{StageToken, StateStore};
use crate::status::{Slot, StatusSink, Symbol};

use super::commands;
use super::types::{AbortReason, PipelineError, PipelineStage, TopicOutcome};

/// Drives one topic through its stages.
pub struct TopicPipeline {
    topic: Topic,
    /// Submission order, used for the start offset.
    index: usize,
    config: Arc<PipelineConfig>,
    client: Arc<dyn CommandClient>,
    state: Arc<StateStore>,
    sink: Arc<dyn StatusSink>,
    /// Resolved workspace id. Empty until resolution succeeds.
    notebook_id: String,
}

impl TopicPipeline {
    pub fn new(
        topic: Topic,
        index: usize,
        config: Arc<PipelineConfig>,
        client: Arc<dyn CommandClient>,
        state: Arc<StateStore>,
        sink: Arc<dyn StatusSink>,
    ) -> Self {
        Self {
            topic,
            index,
            config,
            client,
            state,
            sink,
            notebook_id: String::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.topic.key
    }

    /// Runs every stage in order until the topic finishes or aborts.
    ///
    /// Aborts are returned as [`TopicOutcome::Aborted`]; errors are reserved
    /// for local faults such as an unwritable state file. The start offset is
    /// not applied here; callers run [`TopicPipeline::stagger`] first.
    pub async fn run(mut self) -> Result<TopicOutcome, PipelineError> {
        self.seed_status();

        let mut stage = PipelineStage::WorkspaceResolution;
        loop {
            debug!("Topic {} entering {}", self.topic.key, stage);
            stage = match stage {
                PipelineStage::WorkspaceResolution => self.resolve_workspace().await?,
                PipelineStage::SourceIngestion => self.ingest_sources().await?,
                PipelineStage::ChatConfiguration => self.configure_chat().await,
                PipelineStage::ResearchPhase => self.research().await?,
                PipelineStage::ArtifactPhase => self.generate_artifacts().await?,
                PipelineStage::DownloadPhase => self.download().await?,
                PipelineStage::Finished => {
                    info!("Topic {} finished", self.topic.key);
                    self.sink.message(&self.topic.key, "Finished");
                    return Ok(TopicOutcome::Finished);
                }
                PipelineStage::Aborted(reason) => {
                    warn!("Topic {} aborted: {}", self.topic.key, reason);
                    self.sink.message(&self.topic.key, reason.message());
                    return Ok(TopicOutcome::Aborted(reason));
                }
            };
        }
    }

    async fn call(&self, request: CommandRequest) -> String {
        self.client
            .execute(request.with_log_key(self.topic.key.as_str()))
            .await
    }

    fn specs(&self) -> &[ArtifactSpec] {
        self.config.effective_artifacts(&self.topic)
    }

    fn kinds(&self) -> Vec<ArtifactKind> {
        self.specs().iter().map(|spec| spec.kind).collect()
    }

    fn update(&self, slot: Slot, symbol: Symbol, message: &str) {
        self.sink.update(&self.topic.key, slot, symbol, Some(message));
    }

    fn update_artifacts(&self, symbol: Symbol, message: &str) {
        for kind in self.kinds() {
            self.update(Slot::Artifact(kind), symbol, message);
        }
    }

    /// Reflects already recorded progress before any work starts.
    fn seed_status(&self) {
        let key = self.topic.key.as_str();
        if self.topic.notebook_id().is_some() || self.state.notebook_id(key).is_some() {
            self.update(Slot::Notebook, Symbol::Pending, "Found ID");
        }
        if self.state.is_research_done(key) {
            self.sink.update(key, Slot::Research, Symbol::Done, None);
        }
        for kind in self.kinds() {
            if self.state.is_stage_done(key, StageToken::Artifact(kind)) {
                self.sink.update(key, Slot::Artifact(kind), Symbol::Done, None);
            }
        }
    }

    /// Sleeps `index × stagger_ms` so starts follow submission order.
    pub async fn stagger(&self) {
        let delay = self.config.timing.stagger_delay(self.index);
        if delay.is_zero() {
            return;
        }
        self.sink.message(
            &self.topic.key,
            &format!("Staggering ({}s)...", delay.as_secs()),
        );
        sleep(delay).await;
    }

    async fn resolve_workspace(&mut self) -> Result<PipelineStage, PipelineError> {
        let key = self.topic.key.clone();
        let mut notebook_id = self
            .topic
            .notebook_id()
            .map(str::to_string)
            .or_else(|| self.state.notebook_id(&key));

        if let Some(id) = notebook_id.as_deref() {
            let output = self.call(commands::verify_notebook(id)).await;
            if commands::notebook_missing(&output) {
                warn!("Workspace {} of topic {} is invalid, clearing its progress", id, key);
                self.update(Slot::Notebook, Symbol::NotDone, "Invalid/Missing");
                self.state.clear_topic(&key)?;
                self.update(Slot::Research, Symbol::NotDone, "Cleared");
                self.update_artifacts(Symbol::NotDone, "Cleared");
                notebook_id = None;
            }
        }

        if self.config.research_force && self.state.is_research_done(&key) {
            info!("Force restart of topic {}, keeping its workspace", key);
            self.sink.message(&key, "Force-clearing state...");
            self.state.reset_topic_progress(&key)?;
            self.update(Slot::Research, Symbol::Pending, "Restarting...");
            self.update_artifacts(Symbol::NotDone, "Restarting");
        }

        match notebook_id {
            Some(id) => {
                // A configured id is recorded once it verifies.
                if self.state.notebook_id(&key).as_deref() != Some(id.as_str()) {
                    self.state.set_notebook_id(&key, &id)?;
                }
                self.update(Slot::Notebook, Symbol::Done, "Verified.");
                self.notebook_id = id;
            }
            None => {
                self.update(Slot::Notebook, Symbol::Pending, "Creating...");
                let output = self.call(commands::create_notebook(&self.topic.title)).await;
                let Some(id) = extract_notebook_id(&output) else {
                    self.update(Slot::Notebook, Symbol::NotDone, "Failed creation.");
                    return Ok(PipelineStage::Aborted(AbortReason::WorkspaceCreationFailed));
                };
                self.state.set_notebook_id(&key, &id)?;
                info!("Created workspace {} for topic {}", id, key);
                self.update(Slot::Notebook, Symbol::Done, "Created.");
                self.notebook_id = id;
            }
        }

        Ok(PipelineStage::SourceIngestion)
    }

    async fn ingest_sources(&self) -> Result<PipelineStage, PipelineError> {
        let key = self.topic.key.as_str();
        if self.topic.sources.is_empty() {
            return Ok(PipelineStage::ChatConfiguration);
        }
        if self.state.is_stage_done(key, StageToken::SourcesProcessed) {
            self.sink.message(key, "Sources already processed ✓");
            return Ok(PipelineStage::ChatConfiguration);
        }

        self.sink.message(key, "Adding sources...");
        for source in &self.topic.sources {
            self.call(commands::add_source(&self.notebook_id, source)).await;
        }

        self.sink.message(key, "Waiting for sources to process...");
        if !self.wait_for_sources().await {
            return Ok(PipelineStage::Aborted(AbortReason::SourcesNotProcessed));
        }

        self.state.set_stage_done(key, StageToken::SourcesProcessed)?;
        info!("Sources of topic {} processed", key);
        self.sink.message(key, "Sources processed ✓");
        Ok(PipelineStage::ChatConfiguration)
    }

    /// Polls the workspace until its listing mentions sources.
    ///
    /// On the first positive answer waits one more interval so processing can settle.
    async fn wait_for_sources(&self) -> bool {
        let timing = &self.config.timing;
        for attempt in 1..=timing.source_poll_attempts {
            let output = self.call(commands::verify_notebook(&self.notebook_id)).await;
            if commands::sources_present(&output) {
                sleep(timing.source_poll_interval()).await;
                return true;
            }
            debug!(
                "Sources of topic {} not visible yet ({}/{})",
                self.topic.key, attempt, timing.source_poll_attempts
            );
            sleep(timing.source_poll_interval()).await;
        }
        warn!(
            "Sources of topic {} not visible after {} checks",
            self.topic.key, timing.source_poll_attempts
        );
        false
    }

    /// Re-issued on every run.
    async fn configure_chat(&self) -> PipelineStage {
        if let Some(chat) = &self.topic.chat {
            self.sink.message(&self.topic.key, "Configuring chat...");
            self.call(commands::configure_chat(&self.notebook_id, chat)).await;
        }
        PipelineStage::ResearchPhase
    }

    async fn research(&self) -> Result<PipelineStage, PipelineError> {
        let key = self.topic.key.as_str();
        let Some(query) = self.topic.query() else {
            self.state.set_research_done(key)?;
            self.update(Slot::Research, Symbol::Done, "Sources only.");
            return Ok(PipelineStage::ArtifactPhase);
        };

        let force = self.config.research_force;
        if self.state.is_research_done(key) && !force {
            return Ok(PipelineStage::ArtifactPhase);
        }

        let mode = self.config.research_mode;
        self.update(Slot::Research, Symbol::Pending, "Reviewing...");
        let status = self.call(commands::research_status(&self.notebook_id)).await;
        if force || commands::research_needs_start(&status) {
            info!("Starting {} research for topic {}", mode.as_str(), key);
            self.update(Slot::Research, Symbol::Pending, "Starting...");
            self.call(commands::start_research(
                &self.notebook_id,
                query,
                mode,
                self.config.research_source,
                force,
            ))
            .await;
        }

        self.update(Slot::Research, Symbol::Polling, "Polling...");
        let timing = &self.config.timing;
        let attempts = timing.research_attempts(mode);
        for attempt in 1..=attempts {
            let status = self.call(commands::poll_research_status(&self.notebook_id)).await;

            if commands::research_completed(&status) {
                let task_id = extract_task_id(&status);
                debug!("Research of topic {} completed (task {:?})", key, task_id);
                self.sink.message(key, "Importing research...");
                self.call(commands::import_research(&self.notebook_id, task_id.as_deref()))
                    .await;

                self.sink.message(key, "Waiting for sources to process...");
                if !self.wait_for_sources().await {
                    let reason = AbortReason::ImportTimeout;
                    self.update(Slot::Research, Symbol::NotDone, reason.message());
                    return Ok(PipelineStage::Aborted(reason));
                }

                self.state.set_research_done(key)?;
                info!("Research of topic {} imported", key);
                self.update(Slot::Research, Symbol::Done, "Imported.");
                return Ok(PipelineStage::ArtifactPhase);
            }

            if commands::research_failed(&status) {
                let reason = AbortReason::ResearchFailed;
                self.update(Slot::Research, Symbol::NotDone, reason.message());
                return Ok(PipelineStage::Aborted(reason));
            }

            debug!("Research of topic {} still running ({}/{})", key, attempt, attempts);
            sleep(timing.research_poll_interval()).await;
        }

        let reason = AbortReason::ResearchTimeout;
        self.update(Slot::Research, Symbol::NotDone, reason.message());
        Ok(PipelineStage::Aborted(reason))
    }

    async fn generate_artifacts(&self) -> Result<PipelineStage, PipelineError> {
        let key = self.topic.key.as_str();
        if self.topic.query().is_some() && !self.state.is_research_done(key) {
            return Ok(PipelineStage::Aborted(AbortReason::ResearchIncomplete));
        }

        let needed: Vec<&ArtifactSpec> = self
            .specs()
            .iter()
            .filter(|spec| !self.state.is_stage_done(key, StageToken::Artifact(spec.kind)))
            .collect();
        if needed.is_empty() {
            return Ok(PipelineStage::DownloadPhase);
        }

        self.sink.message(key, "Triggering artifacts...");
        let timing = &self.config.timing;
        for spec in &needed {
            self.update(Slot::Artifact(spec.kind), Symbol::Pending, "Creating...");
            self.call(commands::create_artifact(
                &self.notebook_id,
                spec,
                self.config.focus_prompt.as_deref(),
                &self.config.language,
            ))
            .await;
            sleep(timing.artifact_submit_pause()).await;
        }

        self.sink.message(key, "Polling artifacts...");
        let mut waiting = needed;
        for attempt in 1..=timing.artifact_poll_attempts {
            let output = self.call(commands::studio_status(&self.notebook_id)).await;
            let latest = parse_latest_artifacts(&output);

            let mut still_waiting = Vec::with_capacity(waiting.len());
            for spec in waiting {
                let record = latest.get(spec.kind.as_str());
                if !self.settle_artifact(spec, record).await? {
                    still_waiting.push(spec);
                }
            }
            waiting = still_waiting;

            if waiting.is_empty() {
                return Ok(PipelineStage::DownloadPhase);
            }
            debug!(
                "Topic {} waiting on {} artifact(s) ({}/{})",
                key,
                waiting.len(),
                attempt,
                timing.artifact_poll_attempts
            );
            sleep(timing.artifact_poll_interval()).await;
        }

        let kinds: Vec<&str> = waiting.iter().map(|spec| spec.kind.as_str()).collect();
        warn!(
            "Topic {} stopped waiting on artifacts: {}",
            key,
            kinds.join(", ")
        );
        Ok(PipelineStage::DownloadPhase)
    }

    /// Acts on the latest record of one artifact. Returns whether the kind is settled.
    ///
    /// A completed artifact gets its revision (once), then its rename (once),
    /// then is marked done. Applying a revision keeps it waiting one more round.
    async fn settle_artifact(
        &self,
        spec: &ArtifactSpec,
        record: Option<&ArtifactStatus>,
    ) -> Result<bool, PipelineError> {
        let key = self.topic.key.as_str();
        let kind = spec.kind;
        let slot = Slot::Artifact(kind);

        let Some(record) = record else {
            return Ok(false);
        };

        if record.is_failed() {
            warn!("Artifact {} of topic {} failed", kind, key);
            self.update(slot, Symbol::NotDone, "Failed.");
            return Ok(true);
        }
        if !record.is_completed() {
            self.update(slot, Symbol::Polling, "Wait...");
            return Ok(false);
        }

        let needs_revision = kind.supports_revision()
            && !spec.revision_instructions.is_empty()
            && !self.state.is_stage_done(key, StageToken::Revised(kind));
        let rename = spec
            .rename
            .as_deref()
            .filter(|title| !title.is_empty())
            .filter(|_| !self.state.is_stage_done(key, StageToken::Renamed(kind)));
        let artifact_id = record.artifact_id.as_str();

        if artifact_id.is_empty() && (needs_revision || rename.is_some()) {
            warn!(
                "Artifact {} of topic {} has no id, skipping revision and rename",
                kind, key
            );
        } else {
            if needs_revision {
                self.update(slot, Symbol::Pending, "Revising...");
                self.call(commands::revise_slides(artifact_id, &spec.revision_instructions))
                    .await;
                self.state.set_stage_done(key, StageToken::Revised(kind))?;
                return Ok(false);
            }
            if let Some(title) = rename {
                self.update(slot, Symbol::Pending, "Renaming...");
                self.call(commands::rename_artifact(&self.notebook_id, artifact_id, title))
                    .await;
                self.state.set_stage_done(key, StageToken::Renamed(kind))?;
            }
        }

        self.state.set_stage_done(key, StageToken::Artifact(kind))?;
        info!("Artifact {} of topic {} done", kind, key);
        self.update(slot, Symbol::Done, "Done.");
        Ok(true)
    }

    /// Downloads every kind not yet on disk. Only a file that exists afterwards counts.
    async fn download(&self) -> Result<PipelineStage, PipelineError> {
        let key = self.topic.key.as_str();
        let specs = self.specs();
        if !self.config.download || specs.is_empty() {
            return Ok(PipelineStage::Finished);
        }

        self.sink.message(key, "Downloading...");
        let filename = safe_filename(key);
        for spec in specs {
            let kind = spec.kind;
            if self.state.is_download_done(key, kind) {
                continue;
            }

            let dir = self.config.output_dir.join(kind.output_subdir());
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|source| PipelineError::Io {
                    path: dir.clone(),
                    source,
                })?;
            let path = dir.join(format!("{}{}", filename, kind.file_extension()));

            self.call(commands::download_artifact(&self.notebook_id, kind, &path))
                .await;

            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                self.state.set_download_done(key, kind)?;
                debug!("Downloaded {} of topic {} to {}", kind, key, path.display());
            } else {
                warn!(
                    "Download of {} for topic {} left no file at {}",
                    kind,
                    key,
                    path.display()
                );
            }
        }

        Ok(PipelineStage::Finished)
    }
}
