//! Testing utilities and mock implementations.
//!
//! [`MockCommandClient`] stands in for the external client so whole pipeline
//! runs can be exercised without the real service.
//!
//! # Example
//!
//! ```rust,ignore
//! use nlmflow_core::testing::{fixtures, MockCommandClient};
//!
//! let client = MockCommandClient::new();
//! client.respond(&["create", "notebook"], fixtures::creation_output()).await;
//! let config = fixtures::fast_config(vec![fixtures::topic("rust")]);
//! ```

mod mock_client;

pub use mock_client::{MockCommandClient, RecordedCommand};

/// Test fixtures and helper functions.
pub mod fixtures {
    use serde_json::json;

    use crate::client::ClientConfig;
    use crate::config::{ArtifactKind, ArtifactSpec, PipelineConfig, Source, SourceKind, Topic};
    use crate::pipeline::TimingConfig;

    /// Workspace id used by the canned creation output.
    pub const NOTEBOOK_ID: &str = "3fa85f64-5717-4562-b3fc-2c963f66afa6";

    /// What the client prints after creating a workspace.
    pub fn creation_output() -> String {
        format!("Created notebook {}", NOTEBOOK_ID)
    }

    /// A workspace listing that mentions its sources.
    pub fn notebook_listing() -> String {
        format!("Notebook {}\nTitle: Test\nSources: 3 sources", NOTEBOOK_ID)
    }

    /// Configuration with 1ms delays, no cool-down and no command log.
    pub fn fast_config(topics: Vec<Topic>) -> PipelineConfig {
        let mut config = PipelineConfig::with_topics(topics);
        config.timing = TimingConfig::uniform(1);
        config.client = ClientConfig {
            cooldown_ms: 0,
            log_dir: None,
            ..ClientConfig::default()
        };
        config
    }

    /// A sources-only topic titled after its key.
    pub fn topic(key: &str) -> Topic {
        Topic::new(key, format!("Topic {}", key))
    }

    /// A topic that runs research for `query`.
    pub fn research_topic(key: &str, query: &str) -> Topic {
        let mut topic = topic(key);
        topic.query = Some(query.to_string());
        topic
    }

    /// A topic with one URL source.
    pub fn topic_with_source(key: &str, url: &str) -> Topic {
        let mut topic = topic(key);
        topic.sources = vec![Source::new(SourceKind::Url, url)];
        topic
    }

    pub fn artifacts(kinds: &[ArtifactKind]) -> Vec<ArtifactSpec> {
        kinds.iter().copied().map(ArtifactSpec::new).collect()
    }

    /// Batch status payload from `(kind, status, artifact_id)` records.
    pub fn studio_status(records: &[(&str, &str, &str)]) -> String {
        let records: Vec<_> = records
            .iter()
            .map(|(kind, status, id)| json!({"type": kind, "status": status, "artifact_id": id}))
            .collect();
        serde_json::Value::Array(records).to_string()
    }
}
