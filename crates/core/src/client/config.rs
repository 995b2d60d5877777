//! Command client configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the external command-line client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Executable to launch.
    #[serde(default = "default_program")]
    pub program: String,

    /// Arguments placed before every action (e.g. `run nlm` for `uv run nlm`).
    #[serde(default = "default_base_args")]
    pub base_args: Vec<String>,

    /// Pause after every call, successful or not (milliseconds).
    #[serde(default = "default_cooldown")]
    pub cooldown_ms: u64,

    /// Directory for per-topic command logs. `None` disables logging.
    #[serde(default = "default_log_dir")]
    pub log_dir: Option<PathBuf>,

    /// Arguments of the interactive login action.
    #[serde(default = "default_login_args")]
    pub login_args: Vec<String>,
}

fn default_program() -> String {
    "uv".to_string()
}

fn default_base_args() -> Vec<String> {
    vec!["run".to_string(), "nlm".to_string()]
}

fn default_cooldown() -> u64 {
    5000 // 5 seconds
}

fn default_log_dir() -> Option<PathBuf> {
    Some(PathBuf::from("logs"))
}

fn default_login_args() -> Vec<String> {
    vec!["login".to_string()]
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            base_args: default_base_args(),
            cooldown_ms: default_cooldown(),
            log_dir: default_log_dir(),
            login_args: default_login_args(),
        }
    }
}

impl ClientConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.program, "uv");
        assert_eq!(config.base_args, vec!["run", "nlm"]);
        assert_eq!(config.cooldown(), Duration::from_secs(5));
        assert_eq!(config.log_dir, Some(PathBuf::from("logs")));
        assert_eq!(config.login_args, vec!["login"]);
    }

    #[test]
    fn test_deserialize_custom_program() {
        let toml = r#"
            program = "nlm"
            base_args = []
            cooldown_ms = 250
        "#;
        let config: ClientConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.program, "nlm");
        assert!(config.base_args.is_empty());
        assert_eq!(config.cooldown_ms, 250);
    }

    #[test]
    fn test_null_log_dir_disables_logging() {
        let config: ClientConfig = serde_json::from_str(r#"{"log_dir": null}"#).unwrap();
        assert!(config.log_dir.is_none());
    }
}
