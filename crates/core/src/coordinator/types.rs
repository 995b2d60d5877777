//! Types for the execution coordinator.

use serde::Serialize;
use std::sync::Arc;

use crate::pipeline::AbortReason;
use crate::status::StatusBoard;

/// Called with the board on every refresh tick and once after all topics end.
pub type RefreshCallback = Arc<dyn Fn(&StatusBoard) + Send + Sync>;

/// How one topic ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "result", content = "detail")]
pub enum TopicReport {
    Finished,
    Aborted(AbortReason),
    /// The worker failed with a local fault or panicked.
    Crashed(String),
}

/// Result of one topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicSummary {
    pub key: String,
    pub report: TopicReport,
}

/// Result of a whole run, in topic order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub topics: Vec<TopicSummary>,
}

impl RunSummary {
    pub fn report(&self, key: &str) -> Option<&TopicReport> {
        self.topics.iter().find(|t| t.key == key).map(|t| &t.report)
    }

    pub fn finished_count(&self) -> usize {
        self.count(|r| matches!(r, TopicReport::Finished))
    }

    pub fn aborted_count(&self) -> usize {
        self.count(|r| matches!(r, TopicReport::Aborted(_)))
    }

    pub fn crashed_count(&self) -> usize {
        self.count(|r| matches!(r, TopicReport::Crashed(_)))
    }

    /// Whether every topic finished.
    pub fn all_finished(&self) -> bool {
        self.finished_count() == self.topics.len()
    }

    fn count(&self, predicate: impl Fn(&TopicReport) -> bool) -> usize {
        self.topics.iter().filter(|t| predicate(&t.report)).count()
    }
}
