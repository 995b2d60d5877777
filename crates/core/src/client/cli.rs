//! Process-backed command client.

use async_trait::async_trait;
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::config::ClientConfig;
use super::log::CommandLog;
use super::traits::CommandClient;
use super::types::{CommandOutcome, CommandRequest};

/// Runs actions by launching the configured command-line client.
pub struct CliClient {
    config: ClientConfig,
}

impl CliClient {
    /// Creates a new client with the given configuration.
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Creates a client with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ClientConfig::default())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Full command line for an action, as written to the command log.
    pub fn command_line(&self, args: &[String]) -> String {
        std::iter::once(self.config.program.as_str())
            .chain(self.config.base_args.iter().map(String::as_str))
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Runs an action attached to the terminal (used for the login flow).
    pub async fn run_interactive(&self, args: &[String]) -> std::io::Result<ExitStatus> {
        Command::new(&self.config.program)
            .args(&self.config.base_args)
            .args(args)
            .status()
            .await
    }

    async fn spawn(&self, request: &CommandRequest) -> CommandOutcome {
        let mut command = Command::new(&self.config.program);
        command
            .args(&self.config.base_args)
            .args(&request.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        match timeout(request.timeout, command.output()).await {
            Ok(Ok(output)) => CommandOutcome::Exited {
                code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            },
            Ok(Err(e)) => CommandOutcome::Failed(e),
            Err(_) => CommandOutcome::TimedOut,
        }
    }
}

#[async_trait]
impl CommandClient for CliClient {
    fn name(&self) -> &str {
        "cli"
    }

    async fn execute(&self, request: CommandRequest) -> String {
        let log = match (&self.config.log_dir, &request.log_key) {
            (Some(dir), Some(key)) => Some(CommandLog::for_topic(dir, key)),
            _ => None,
        };
        let command_line = self.command_line(&request.args);

        if let Some(log) = &log {
            log.record_start(&command_line).await;
        }
        debug!("Running: {}", command_line);

        let outcome = self.spawn(&request).await;
        match &outcome {
            CommandOutcome::Exited { code, .. } => {
                debug!("Exited with {:?}: {}", code, command_line)
            }
            CommandOutcome::TimedOut => warn!(
                "Command timed out after {}s: {}",
                request.timeout.as_secs(),
                command_line
            ),
            CommandOutcome::Failed(e) => warn!("Command failed to run: {}: {}", command_line, e),
        }

        if let Some(log) = &log {
            log.record_outcome(&outcome, request.timeout).await;
        }

        tokio::time::sleep(self.config.cooldown()).await;
        outcome.into_text()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    fn shell_client(cooldown_ms: u64) -> CliClient {
        CliClient::new(ClientConfig {
            program: "sh".to_string(),
            base_args: vec!["-c".to_string()],
            cooldown_ms,
            log_dir: None,
            login_args: vec![],
        })
    }

    fn script(body: &str) -> CommandRequest {
        CommandRequest::new([body]).with_timeout(Duration::from_secs(10))
    }

    #[tokio::test]
    async fn test_returns_trimmed_stdout() {
        let client = shell_client(0);
        let out = client.execute(script("echo '  hello world  '")).await;
        assert_eq!(out, "hello world");
    }

    #[tokio::test]
    async fn test_failure_with_empty_stdout_returns_stderr() {
        let client = shell_client(0);
        let out = client
            .execute(script("echo 'Error: notebook not found' >&2; exit 3"))
            .await;
        assert_eq!(out, "Error: notebook not found");
    }

    #[tokio::test]
    async fn test_success_does_not_return_stderr() {
        let client = shell_client(0);
        let out = client.execute(script("echo noise >&2")).await;
        assert_eq!(out, "");
    }

    #[tokio::test]
    async fn test_timeout_returns_empty() {
        let client = shell_client(0);
        let started = Instant::now();
        let out = client
            .execute(CommandRequest::new(["sleep 5; echo late"]).with_timeout(Duration::from_millis(100)))
            .await;
        assert_eq!(out, "");
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_missing_program_returns_empty() {
        let client = CliClient::new(ClientConfig {
            program: "nlmflow-definitely-not-installed".to_string(),
            base_args: vec![],
            cooldown_ms: 0,
            log_dir: None,
            login_args: vec![],
        });
        let out = client.execute(CommandRequest::new(["get", "notebook"])).await;
        assert_eq!(out, "");
    }

    #[tokio::test]
    async fn test_cooldown_follows_success_and_failure() {
        let client = shell_client(150);

        let started = Instant::now();
        client.execute(script("echo ok")).await;
        assert!(started.elapsed() >= Duration::from_millis(150));

        let started = Instant::now();
        client.execute(script("exit 1")).await;
        assert!(started.elapsed() >= Duration::from_millis(150));

        let started = Instant::now();
        client
            .execute(CommandRequest::new(["sleep 5"]).with_timeout(Duration::from_millis(20)))
            .await;
        assert!(started.elapsed() >= Duration::from_millis(150));
    }

    #[tokio::test]
    async fn test_writes_command_log_when_keyed() {
        let dir = TempDir::new().unwrap();
        let client = CliClient::new(ClientConfig {
            program: "sh".to_string(),
            base_args: vec!["-c".to_string()],
            cooldown_ms: 0,
            log_dir: Some(dir.path().to_path_buf()),
            login_args: vec![],
        });

        client
            .execute(script("echo out; echo err >&2; exit 4").with_log_key("Topic One"))
            .await;
        client.execute(script("echo unlogged")).await;

        let content = std::fs::read_to_string(dir.path().join("topic_one.log")).unwrap();
        assert!(content.contains("RUNNING: sh -c echo out; echo err >&2; exit 4"));
        assert!(content.contains("EXIT CODE: 4"));
        assert!(content.contains("STDOUT:\nout\n"));
        assert!(content.contains("STDERR:\nerr\n"));
        assert!(!content.contains("unlogged"));
    }

    #[test]
    fn test_command_line_includes_base_args() {
        let client = CliClient::with_defaults();
        let line = client.command_line(&["get".to_string(), "notebook".to_string()]);
        assert_eq!(line, "uv run nlm get notebook");
    }
}
