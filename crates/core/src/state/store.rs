//! JSON-file backed progress store.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, warn};

use super::types::{PersistentState, StageToken};
use super::StateError;
use crate::config::ArtifactKind;

/// Durable per-topic progress ledger.
///
/// Every mutation takes the single store lock, applies the change in memory and
/// writes the full snapshot to disk before the lock is released.
pub struct StateStore {
    path: Option<PathBuf>,
    state: Mutex<PersistentState>,
}

impl StateStore {
    /// Opens the store at `path`. A missing or unparsable file starts an empty ledger.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = Self::load(&path);
        Self {
            path: Some(path),
            state: Mutex::new(state),
        }
    }

    /// Create a store that never touches the disk (useful for testing).
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: Mutex::new(PersistentState::default()),
        }
    }

    fn load(path: &Path) -> PersistentState {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                debug!("No state loaded from {:?}: {}", path, e);
                return PersistentState::default();
            }
        };
        match serde_json::from_str(&content) {
            Ok(state) => state,
            Err(e) => {
                warn!("Ignoring unparsable state file {:?}: {}", path, e);
                PersistentState::default()
            }
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> MutexGuard<'_, PersistentState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Applies `change` and persists the snapshot while still holding the lock.
    fn mutate<F>(&self, change: F) -> Result<(), StateError>
    where
        F: FnOnce(&mut PersistentState),
    {
        let mut state = self.lock();
        change(&mut state);
        self.persist(&state)
    }

    fn persist(&self, state: &PersistentState) -> Result<(), StateError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StateError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let json = serde_json::to_string_pretty(state)?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, json).map_err(|source| StateError::Io {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, path).map_err(|source| StateError::Io {
            path: path.clone(),
            source,
        })
    }

    /// Copy of the whole ledger.
    pub fn snapshot(&self) -> PersistentState {
        self.lock().clone()
    }

    pub fn notebook_id(&self, key: &str) -> Option<String> {
        self.lock().notebook_id(key).map(str::to_string)
    }

    pub fn set_notebook_id(&self, key: &str, id: &str) -> Result<(), StateError> {
        self.mutate(|state| {
            state.set_notebook_id(key, id);
        })
    }

    pub fn is_research_done(&self, key: &str) -> bool {
        self.lock().is_research_done(key)
    }

    pub fn set_research_done(&self, key: &str) -> Result<(), StateError> {
        self.mutate(|state| {
            state.set_research_done(key);
        })
    }

    pub fn is_stage_done(&self, key: &str, token: StageToken) -> bool {
        self.lock().is_stage_done(key, token)
    }

    pub fn set_stage_done(&self, key: &str, token: StageToken) -> Result<(), StateError> {
        self.mutate(|state| {
            state.set_stage_done(key, token);
        })
    }

    pub fn is_download_done(&self, key: &str, kind: ArtifactKind) -> bool {
        self.lock().is_download_done(key, kind)
    }

    pub fn set_download_done(&self, key: &str, kind: ArtifactKind) -> Result<(), StateError> {
        self.mutate(|state| {
            state.set_download_done(key, kind);
        })
    }

    /// Forgets everything about a topic (its workspace no longer exists).
    pub fn clear_topic(&self, key: &str) -> Result<(), StateError> {
        self.mutate(|state| state.clear_topic(key))
    }

    /// Forgets research, artifact and download progress, keeping the workspace id.
    pub fn reset_topic_progress(&self, key: &str) -> Result<(), StateError> {
        self.mutate(|state| state.reset_topic_progress(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::open(dir.path().join("state.json"));
        assert_eq!(store.snapshot(), PersistentState::default());
    }

    #[test]
    fn test_unparsable_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = StateStore::open(&path);
        assert_eq!(store.snapshot(), PersistentState::default());
    }

    #[test]
    fn test_every_mutation_is_persisted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("state.json");
        let store = StateStore::open(&path);

        store.set_notebook_id("k", "nb-1").unwrap();
        store.set_research_done("k").unwrap();
        store
            .set_stage_done("k", StageToken::Revised(ArtifactKind::SlideDeck))
            .unwrap();
        store.set_download_done("k", ArtifactKind::Report).unwrap();

        let reopened = StateStore::open(&path);
        assert_eq!(reopened.notebook_id("k").as_deref(), Some("nb-1"));
        assert!(reopened.is_research_done("k"));
        assert!(reopened.is_stage_done("k", StageToken::Revised(ArtifactKind::SlideDeck)));
        assert!(!reopened.is_stage_done("k", StageToken::Artifact(ArtifactKind::SlideDeck)));
        assert!(reopened.is_download_done("k", ArtifactKind::Report));
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_reads_existing_layout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(
            &path,
            r#"{
                "notebooks": {"a": "id-a"},
                "research_done": ["a"],
                "artifacts_done": {"a": ["quiz", "sources_processed"]},
                "downloads_done": {"a": ["quiz"]}
            }"#,
        )
        .unwrap();

        let store = StateStore::open(&path);
        assert!(store.is_stage_done("a", StageToken::SourcesProcessed));
        assert!(store.is_download_done("a", ArtifactKind::Quiz));
        assert!(!store.is_download_done("a", ArtifactKind::Audio));
    }

    #[test]
    fn test_clear_topic_leaves_other_topics() {
        let store = StateStore::in_memory();
        store.set_notebook_id("a", "id-a").unwrap();
        store.set_notebook_id("b", "id-b").unwrap();
        store.set_research_done("a").unwrap();
        store.set_research_done("b").unwrap();

        store.clear_topic("a").unwrap();
        assert_eq!(store.notebook_id("a"), None);
        assert!(!store.is_research_done("a"));
        assert_eq!(store.notebook_id("b").as_deref(), Some("id-b"));
        assert!(store.is_research_done("b"));
    }

    #[test]
    fn test_reset_keeps_workspace() {
        let store = StateStore::in_memory();
        store.set_notebook_id("a", "id-a").unwrap();
        store.set_research_done("a").unwrap();
        store
            .set_stage_done("a", StageToken::Artifact(ArtifactKind::Audio))
            .unwrap();
        store.set_download_done("a", ArtifactKind::Audio).unwrap();

        store.reset_topic_progress("a").unwrap();
        assert_eq!(store.notebook_id("a").as_deref(), Some("id-a"));
        assert!(!store.is_research_done("a"));
        assert!(!store.is_stage_done("a", StageToken::Artifact(ArtifactKind::Audio)));
        assert!(!store.is_download_done("a", ArtifactKind::Audio));
    }

    #[test]
    fn test_persist_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let store = StateStore::open(blocker.join("state.json"));

        let err = store.set_research_done("k").unwrap_err();
        assert!(matches!(err, StateError::Io { .. }));
    }

    #[test]
    fn test_concurrent_writers_do_not_lose_updates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        let store = std::sync::Arc::new(StateStore::open(&path));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = std::sync::Arc::clone(&store);
                std::thread::spawn(move || {
                    let key = format!("topic-{}", i);
                    store.set_notebook_id(&key, "id").unwrap();
                    store.set_research_done(&key).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let reopened = StateStore::open(&path);
        for i in 0..8 {
            assert!(reopened.is_research_done(&format!("topic-{}", i)));
        }
    }
}
