//! Types for the per-topic pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::state::StateError;

/// Errors that escape a topic pipeline.
///
/// Expected failures of the external service end the topic with
/// [`TopicOutcome::Aborted`] instead; these are local faults.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Progress could not be persisted.
    #[error("state error: {0}")]
    State(#[from] StateError),

    /// Local filesystem error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Stages of a topic, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "stage", content = "reason")]
pub enum PipelineStage {
    WorkspaceResolution,
    SourceIngestion,
    ChatConfiguration,
    ResearchPhase,
    ArtifactPhase,
    DownloadPhase,
    Finished,
    Aborted(AbortReason),
}

impl PipelineStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStage::Finished | PipelineStage::Aborted(_))
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStage::WorkspaceResolution => f.write_str("workspace_resolution"),
            PipelineStage::SourceIngestion => f.write_str("source_ingestion"),
            PipelineStage::ChatConfiguration => f.write_str("chat_configuration"),
            PipelineStage::ResearchPhase => f.write_str("research"),
            PipelineStage::ArtifactPhase => f.write_str("artifacts"),
            PipelineStage::DownloadPhase => f.write_str("download"),
            PipelineStage::Finished => f.write_str("finished"),
            PipelineStage::Aborted(reason) => write!(f, "aborted ({})", reason),
        }
    }
}

/// Why a topic stopped before finishing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    /// Creation output carried no workspace identifier.
    WorkspaceCreationFailed,
    /// Declared sources never showed up in the workspace.
    SourcesNotProcessed,
    /// The service reported research as failed.
    ResearchFailed,
    /// Research never completed within its poll budget.
    ResearchTimeout,
    /// Imported research sources never showed up in the workspace.
    ImportTimeout,
    /// Artifacts need research that is not done.
    ResearchIncomplete,
}

impl AbortReason {
    /// Whether the abort came from an exhausted poll budget.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            AbortReason::SourcesNotProcessed | AbortReason::ResearchTimeout | AbortReason::ImportTimeout
        )
    }

    /// Short text shown in the status table.
    pub fn message(&self) -> &'static str {
        match self {
            AbortReason::WorkspaceCreationFailed => "Failed creation.",
            AbortReason::SourcesNotProcessed => "Error: Sources failed to process",
            AbortReason::ResearchFailed => "Failed.",
            AbortReason::ResearchTimeout => "Timeout.",
            AbortReason::ImportTimeout => "Source processing timeout.",
            AbortReason::ResearchIncomplete => "Skipping artifacts: Research not complete",
        }
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AbortReason::WorkspaceCreationFailed => "workspace_creation_failed",
            AbortReason::SourcesNotProcessed => "sources_not_processed",
            AbortReason::ResearchFailed => "research_failed",
            AbortReason::ResearchTimeout => "research_timeout",
            AbortReason::ImportTimeout => "import_timeout",
            AbortReason::ResearchIncomplete => "research_incomplete",
        };
        f.write_str(name)
    }
}

/// Terminal result of one topic run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "reason")]
pub enum TopicOutcome {
    Finished,
    Aborted(AbortReason),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_designation() {
        assert!(AbortReason::ResearchTimeout.is_timeout());
        assert!(AbortReason::ImportTimeout.is_timeout());
        assert!(AbortReason::SourcesNotProcessed.is_timeout());
        assert!(!AbortReason::ResearchFailed.is_timeout());
        assert!(!AbortReason::WorkspaceCreationFailed.is_timeout());
    }

    #[test]
    fn test_terminal_stages() {
        assert!(PipelineStage::Finished.is_terminal());
        assert!(PipelineStage::Aborted(AbortReason::ResearchFailed).is_terminal());
        assert!(!PipelineStage::DownloadPhase.is_terminal());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            PipelineStage::Aborted(AbortReason::ResearchTimeout).to_string(),
            "aborted (research_timeout)"
        );
        assert_eq!(PipelineStage::ResearchPhase.to_string(), "research");
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_string(&TopicOutcome::Aborted(AbortReason::ImportTimeout)).unwrap();
        assert_eq!(json, r#"{"outcome":"aborted","reason":"import_timeout"}"#);
    }

    #[test]
    fn test_error_display() {
        let err = PipelineError::Io {
            path: PathBuf::from("/out/audios"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.to_string(), "I/O error at /out/audios: denied");
    }
}
