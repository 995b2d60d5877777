//! Mock command client for testing.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::client::{CommandClient, CommandRequest};

/// A recorded invocation for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedCommand {
    /// The request that was made.
    pub request: CommandRequest,
    /// When the request was made.
    pub timestamp: chrono::DateTime<Utc>,
}

type Responder = Arc<dyn Fn(&CommandRequest) -> String + Send + Sync>;

enum Reply {
    Fixed(String),
    /// Replies in order; the last one repeats.
    Sequence(VecDeque<String>),
    Dynamic(Responder),
}

struct Rule {
    prefix: Vec<String>,
    reply: Reply,
}

impl Rule {
    fn matches(&self, request: &CommandRequest) -> bool {
        let prefix: Vec<&str> = self.prefix.iter().map(String::as_str).collect();
        request.starts_with(&prefix)
    }

    fn reply(&mut self, request: &CommandRequest) -> String {
        match &mut self.reply {
            Reply::Fixed(output) => output.clone(),
            Reply::Sequence(outputs) => {
                if outputs.len() > 1 {
                    outputs.pop_front().unwrap_or_default()
                } else {
                    outputs.front().cloned().unwrap_or_default()
                }
            }
            Reply::Dynamic(responder) => responder(request),
        }
    }
}

/// Mock implementation of the CommandClient trait.
///
/// Replies come from rules keyed by an argument prefix; the longest matching
/// prefix wins and unmatched requests get an empty reply, like a failed call.
/// Every request is recorded.
///
/// # Example
///
/// ```rust,ignore
/// let client = MockCommandClient::new();
/// client.respond(&["create", "notebook"], "Created notebook 3fa85f64-...").await;
/// client.respond_sequence(&["research", "status"], ["Status: in_progress", "Status: completed"]).await;
///
/// // ... run a pipeline ...
///
/// assert_eq!(client.calls_matching(&["research", "import"]).await.len(), 1);
/// ```
#[derive(Default)]
pub struct MockCommandClient {
    rules: Arc<RwLock<Vec<Rule>>>,
    calls: Arc<RwLock<Vec<RecordedCommand>>>,
}

impl MockCommandClient {
    /// Create a new mock client with no rules.
    pub fn new() -> Self {
        Self::default()
    }

    async fn add_rule(&self, prefix: &[&str], reply: Reply) {
        let prefix: Vec<String> = prefix.iter().map(|s| s.to_string()).collect();
        let mut rules = self.rules.write().await;
        rules.retain(|rule| rule.prefix != prefix);
        rules.push(Rule { prefix, reply });
    }

    /// Always reply `output` to requests starting with `prefix`.
    pub async fn respond(&self, prefix: &[&str], output: impl Into<String>) {
        self.add_rule(prefix, Reply::Fixed(output.into())).await;
    }

    /// Reply with `outputs` in order, repeating the last one.
    pub async fn respond_sequence<I, S>(&self, prefix: &[&str], outputs: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let outputs = outputs.into_iter().map(Into::into).collect();
        self.add_rule(prefix, Reply::Sequence(outputs)).await;
    }

    /// Compute the reply from the request.
    pub async fn respond_with<F>(&self, prefix: &[&str], responder: F)
    where
        F: Fn(&CommandRequest) -> String + Send + Sync + 'static,
    {
        self.add_rule(prefix, Reply::Dynamic(Arc::new(responder))).await;
    }

    /// Get all recorded calls.
    pub async fn calls(&self) -> Vec<RecordedCommand> {
        self.calls.read().await.clone()
    }

    /// Requests whose arguments start with `prefix`.
    pub async fn calls_matching(&self, prefix: &[&str]) -> Vec<CommandRequest> {
        self.calls
            .read()
            .await
            .iter()
            .filter(|call| call.request.starts_with(prefix))
            .map(|call| call.request.clone())
            .collect()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    /// Clear recorded calls.
    pub async fn clear_recorded(&self) {
        self.calls.write().await.clear();
    }
}

#[async_trait]
impl CommandClient for MockCommandClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn execute(&self, request: CommandRequest) -> String {
        self.calls.write().await.push(RecordedCommand {
            request: request.clone(),
            timestamp: Utc::now(),
        });

        let mut rules = self.rules.write().await;
        rules
            .iter_mut()
            .filter(|rule| rule.matches(&request))
            .max_by_key(|rule| rule.prefix.len())
            .map(|rule| rule.reply(&request))
            .unwrap_or_default()
    }
}
