//! Persistent progress records.
//!
//! On disk the state is a single JSON document:
//!
//! ```json
//! {
//!   "notebooks": {"<key>": "<workspace id>"},
//!   "research_done": ["<key>"],
//!   "artifacts_done": {"<key>": ["<stage token>"]},
//!   "downloads_done": {"<key>": ["<artifact kind>"]}
//! }
//! ```
//!
//! Each top-level entry is owned by one typed record; the records are flattened
//! into [`PersistentState`] so the layout above stays stable.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::config::ArtifactKind;

const REVISED_SUFFIX: &str = "_revised";
const RENAMED_SUFFIX: &str = "_renamed";
const SOURCES_PROCESSED: &str = "sources_processed";

/// Marker for one completed sub-step of a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageToken {
    /// The artifact of this kind finished generating.
    Artifact(ArtifactKind),
    /// Revision instructions were applied to this kind.
    Revised(ArtifactKind),
    /// The rename was applied to this kind.
    Renamed(ArtifactKind),
    /// Declared sources were ingested and processed.
    SourcesProcessed,
}

impl fmt::Display for StageToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageToken::Artifact(kind) => write!(f, "{}", kind),
            StageToken::Revised(kind) => write!(f, "{}{}", kind, REVISED_SUFFIX),
            StageToken::Renamed(kind) => write!(f, "{}{}", kind, RENAMED_SUFFIX),
            StageToken::SourcesProcessed => f.write_str(SOURCES_PROCESSED),
        }
    }
}

impl FromStr for StageToken {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == SOURCES_PROCESSED {
            return Ok(StageToken::SourcesProcessed);
        }
        if let Some(kind) = s.strip_suffix(REVISED_SUFFIX) {
            return kind.parse().map(StageToken::Revised);
        }
        if let Some(kind) = s.strip_suffix(RENAMED_SUFFIX) {
            return kind.parse().map(StageToken::Renamed);
        }
        s.parse().map(StageToken::Artifact)
    }
}

/// Workspace id per topic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceState {
    #[serde(default)]
    pub notebooks: BTreeMap<String, String>,
}

/// Topics whose research is complete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchState {
    #[serde(default)]
    pub research_done: BTreeSet<String>,
}

/// Completed stage tokens per topic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactState {
    #[serde(default)]
    pub artifacts_done: BTreeMap<String, BTreeSet<String>>,
}

/// Downloaded artifact kinds per topic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadState {
    #[serde(default)]
    pub downloads_done: BTreeMap<String, BTreeSet<String>>,
}

/// Whole progress ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistentState {
    #[serde(flatten)]
    pub workspaces: WorkspaceState,
    #[serde(flatten)]
    pub research: ResearchState,
    #[serde(flatten)]
    pub artifacts: ArtifactState,
    #[serde(flatten)]
    pub downloads: DownloadState,
}

impl PersistentState {
    pub fn notebook_id(&self, key: &str) -> Option<&str> {
        self.workspaces.notebooks.get(key).map(String::as_str)
    }

    pub fn is_research_done(&self, key: &str) -> bool {
        self.research.research_done.contains(key)
    }

    pub fn is_stage_done(&self, key: &str, token: StageToken) -> bool {
        self.artifacts
            .artifacts_done
            .get(key)
            .is_some_and(|tokens| tokens.contains(&token.to_string()))
    }

    pub fn is_download_done(&self, key: &str, kind: ArtifactKind) -> bool {
        self.downloads
            .downloads_done
            .get(key)
            .is_some_and(|kinds| kinds.contains(kind.as_str()))
    }

    /// Stage tokens recorded for a topic, skipping any that are not recognised.
    pub fn stage_tokens(&self, key: &str) -> Vec<StageToken> {
        self.artifacts
            .artifacts_done
            .get(key)
            .map(|tokens| tokens.iter().filter_map(|t| t.parse().ok()).collect())
            .unwrap_or_default()
    }

    pub(crate) fn set_notebook_id(&mut self, key: &str, id: &str) -> bool {
        let previous = self
            .workspaces
            .notebooks
            .insert(key.to_string(), id.to_string());
        previous.as_deref() != Some(id)
    }

    pub(crate) fn set_research_done(&mut self, key: &str) -> bool {
        self.research.research_done.insert(key.to_string())
    }

    pub(crate) fn set_stage_done(&mut self, key: &str, token: StageToken) -> bool {
        self.artifacts
            .artifacts_done
            .entry(key.to_string())
            .or_default()
            .insert(token.to_string())
    }

    pub(crate) fn set_download_done(&mut self, key: &str, kind: ArtifactKind) -> bool {
        self.downloads
            .downloads_done
            .entry(key.to_string())
            .or_default()
            .insert(kind.as_str().to_string())
    }

    /// Drops every entry of a topic, workspace id included.
    pub(crate) fn clear_topic(&mut self, key: &str) {
        self.workspaces.notebooks.remove(key);
        self.reset_topic_progress(key);
    }

    /// Drops research, artifact and download progress but keeps the workspace id.
    pub(crate) fn reset_topic_progress(&mut self, key: &str) {
        self.research.research_done.remove(key);
        self.artifacts.artifacts_done.remove(key);
        self.downloads.downloads_done.remove(key);
    }
}
