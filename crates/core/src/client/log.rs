//! Append-only per-topic command log.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::types::CommandOutcome;
use crate::extract::safe_filename;

/// Command log of a single topic, stored as `<dir>/<sanitized key>.log`.
#[derive(Debug, Clone)]
pub struct CommandLog {
    path: PathBuf,
}

impl CommandLog {
    pub fn for_topic(dir: &Path, key: &str) -> Self {
        Self {
            path: dir.join(format!("{}.log", safe_filename(key))),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records the command line about to run.
    pub async fn record_start(&self, command_line: &str) {
        let timestamp = chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.6f");
        self.append(&format!("\n[{}] RUNNING: {}\n", timestamp, command_line))
            .await;
    }

    /// Records how the command ended.
    pub(crate) async fn record_outcome(&self, outcome: &CommandOutcome, timeout: Duration) {
        let entry = match outcome {
            CommandOutcome::Exited {
                code,
                stdout,
                stderr,
            } => {
                let code = code.map_or_else(|| "signal".to_string(), |c| c.to_string());
                let mut entry = format!("EXIT CODE: {}\n", code);
                if !stdout.is_empty() {
                    entry.push_str(&format!("STDOUT:\n{}\n", stdout));
                }
                if !stderr.is_empty() {
                    entry.push_str(&format!("STDERR:\n{}\n", stderr));
                }
                entry
            }
            CommandOutcome::TimedOut => {
                format!("TIMEOUT EXPIRED after {} seconds\n", timeout.as_secs())
            }
            CommandOutcome::Failed(e) => format!("EXCEPTION: {}\n", e),
        };
        self.append(&entry).await;
    }

    async fn append(&self, text: &str) {
        if let Err(e) = self.try_append(text).await {
            debug!("Failed to write command log {:?}: {}", self.path, e);
        }
    }

    async fn try_append(&self, text: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(text.as_bytes()).await?;
        file.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_log_path_uses_sanitized_key() {
        let log = CommandLog::for_topic(Path::new("/var/logs"), "My Topic!");
        assert_eq!(log.path(), Path::new("/var/logs/my_topic_.log"));
    }

    #[tokio::test]
    async fn test_records_are_appended() {
        let dir = TempDir::new().unwrap();
        let log = CommandLog::for_topic(&dir.path().join("nested"), "k");

        log.record_start("uv run nlm get notebook abc").await;
        log.record_outcome(
            &CommandOutcome::Exited {
                code: Some(0),
                stdout: "Notebook: 2 sources".to_string(),
                stderr: String::new(),
            },
            Duration::from_secs(30),
        )
        .await;
        log.record_start("uv run nlm research status abc").await;
        log.record_outcome(&CommandOutcome::TimedOut, Duration::from_secs(60))
            .await;

        let content = std::fs::read_to_string(log.path()).unwrap();
        assert!(content.contains("] RUNNING: uv run nlm get notebook abc\n"));
        assert!(content.contains("EXIT CODE: 0\nSTDOUT:\nNotebook: 2 sources\n"));
        assert!(!content.contains("STDERR:"));
        assert!(content.contains("TIMEOUT EXPIRED after 60 seconds"));
        assert_eq!(content.matches("RUNNING:").count(), 2);
    }

    #[tokio::test]
    async fn test_exception_entry() {
        let dir = TempDir::new().unwrap();
        let log = CommandLog::for_topic(dir.path(), "k");
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such program");
        log.record_outcome(&CommandOutcome::Failed(io), Duration::from_secs(1))
            .await;
        let content = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(content, "EXCEPTION: no such program\n");
    }
}
