//! Persistent state store.
//!
//! The store is the single source of truth for resumability: a topic skips
//! every sub-step the store records as complete. Progress only grows, except
//! for two explicit resets:
//!
//! - [`StateStore::clear_topic`] when the recorded workspace no longer exists
//! - [`StateStore::reset_topic_progress`] when research is forced to restart

mod store;
mod types;

pub use store::StateStore;
pub use types::{
    ArtifactState, DownloadState, PersistentState, ResearchState, StageToken, WorkspaceState,
};

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while persisting state.
#[derive(Debug, Error)]
pub enum StateError {
    /// Reading or writing the state file failed.
    #[error("state file I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The state could not be serialized.
    #[error("failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
}
