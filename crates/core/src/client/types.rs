//! Types for the command client.

use std::time::Duration;

/// Timeout applied when an action does not ask for a specific one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// One invocation of the external client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    /// Action arguments, without the program and base arguments.
    pub args: Vec<String>,
    /// Wall-clock limit for the call.
    pub timeout: Duration,
    /// Topic key whose command log receives this call.
    pub log_key: Option<String>,
}

impl CommandRequest {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            timeout: DEFAULT_TIMEOUT,
            log_key: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_log_key(mut self, key: impl Into<String>) -> Self {
        self.log_key = Some(key.into());
        self
    }

    /// Whether the arguments start with the given words.
    pub fn starts_with(&self, prefix: &[&str]) -> bool {
        self.args.len() >= prefix.len() && self.args.iter().zip(prefix).all(|(a, p)| a == p)
    }
}

/// What happened to a launched process.
#[derive(Debug)]
pub(crate) enum CommandOutcome {
    /// The process ran to completion.
    Exited {
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },
    /// The process outlived its timeout and was killed.
    TimedOut,
    /// The process could not be launched or awaited.
    Failed(std::io::Error),
}

impl CommandOutcome {
    /// Text handed back to callers. Transport failures collapse to an empty string.
    pub(crate) fn into_text(self) -> String {
        match self {
            CommandOutcome::Exited {
                code,
                stdout,
                stderr,
            } => {
                if code != Some(0) && stdout.is_empty() {
                    stderr
                } else {
                    stdout
                }
            }
            CommandOutcome::TimedOut | CommandOutcome::Failed(_) => String::new(),
        }
    }
}
