//! Pipeline timing configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::ResearchMode;

/// Delays and poll budgets used by the per-topic pipeline.
///
/// Phase timeouts are poll budgets: `attempts × interval` plus whatever time
/// the individual commands take.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Start offset per submission index (milliseconds).
    #[serde(default = "default_stagger")]
    pub stagger_ms: u64,

    /// Interval between workspace checks while sources process (milliseconds).
    #[serde(default = "default_source_interval")]
    pub source_poll_interval_ms: u64,

    /// Workspace checks before source processing is considered failed.
    #[serde(default = "default_source_attempts")]
    pub source_poll_attempts: u32,

    /// Interval between research status checks (milliseconds).
    #[serde(default = "default_research_interval")]
    pub research_poll_interval_ms: u64,

    /// Research status checks in fast mode.
    #[serde(default = "default_research_fast_attempts")]
    pub research_fast_attempts: u32,

    /// Research status checks in deep mode.
    #[serde(default = "default_research_deep_attempts")]
    pub research_deep_attempts: u32,

    /// Pause after each artifact creation request (milliseconds).
    #[serde(default = "default_submit_pause")]
    pub artifact_submit_pause_ms: u64,

    /// Interval between batch-status snapshots (milliseconds).
    #[serde(default = "default_artifact_interval")]
    pub artifact_poll_interval_ms: u64,

    /// Batch-status snapshots before the artifact loop stops waiting.
    #[serde(default = "default_artifact_attempts")]
    pub artifact_poll_attempts: u32,

    /// How often the status table is refreshed (milliseconds).
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_ms: u64,
}

fn default_stagger() -> u64 {
    2000 // 2 seconds
}

fn default_source_interval() -> u64 {
    5000 // 5 seconds
}

fn default_source_attempts() -> u32 {
    60
}

fn default_research_interval() -> u64 {
    20000 // 20 seconds
}

fn default_research_fast_attempts() -> u32 {
    40
}

fn default_research_deep_attempts() -> u32 {
    80
}

fn default_submit_pause() -> u64 {
    2000 // 2 seconds
}

fn default_artifact_interval() -> u64 {
    30000 // 30 seconds
}

fn default_artifact_attempts() -> u32 {
    30
}

fn default_refresh_interval() -> u64 {
    500
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            stagger_ms: default_stagger(),
            source_poll_interval_ms: default_source_interval(),
            source_poll_attempts: default_source_attempts(),
            research_poll_interval_ms: default_research_interval(),
            research_fast_attempts: default_research_fast_attempts(),
            research_deep_attempts: default_research_deep_attempts(),
            artifact_submit_pause_ms: default_submit_pause(),
            artifact_poll_interval_ms: default_artifact_interval(),
            artifact_poll_attempts: default_artifact_attempts(),
            refresh_interval_ms: default_refresh_interval(),
        }
    }
}

impl TimingConfig {
    /// Timing with every delay set to `interval_ms`, keeping the default attempt budgets.
    pub fn uniform(interval_ms: u64) -> Self {
        Self {
            stagger_ms: interval_ms,
            source_poll_interval_ms: interval_ms,
            research_poll_interval_ms: interval_ms,
            artifact_submit_pause_ms: interval_ms,
            artifact_poll_interval_ms: interval_ms,
            refresh_interval_ms: interval_ms.max(1),
            ..Default::default()
        }
    }

    pub fn stagger_delay(&self, index: usize) -> Duration {
        Duration::from_millis(self.stagger_ms.saturating_mul(index as u64))
    }

    pub fn source_poll_interval(&self) -> Duration {
        Duration::from_millis(self.source_poll_interval_ms)
    }

    pub fn research_poll_interval(&self) -> Duration {
        Duration::from_millis(self.research_poll_interval_ms)
    }

    /// Research status checks allowed for the given mode.
    pub fn research_attempts(&self, mode: ResearchMode) -> u32 {
        match mode {
            ResearchMode::Fast => self.research_fast_attempts,
            ResearchMode::Deep => self.research_deep_attempts,
        }
    }

    pub fn artifact_submit_pause(&self) -> Duration {
        Duration::from_millis(self.artifact_submit_pause_ms)
    }

    pub fn artifact_poll_interval(&self) -> Duration {
        Duration::from_millis(self.artifact_poll_interval_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TimingConfig::default();
        assert_eq!(config.stagger_ms, 2000);
        assert_eq!(config.source_poll_interval_ms, 5000);
        assert_eq!(config.source_poll_attempts, 60);
        assert_eq!(config.research_poll_interval_ms, 20000);
        assert_eq!(config.artifact_poll_interval_ms, 30000);
        assert_eq!(config.artifact_poll_attempts, 30);
    }

    #[test]
    fn test_research_attempts_by_mode() {
        let config = TimingConfig::default();
        assert_eq!(config.research_attempts(ResearchMode::Fast), 40);
        assert_eq!(config.research_attempts(ResearchMode::Deep), 80);
    }

    #[test]
    fn test_stagger_is_proportional_to_index() {
        let config = TimingConfig::default();
        assert_eq!(config.stagger_delay(0), Duration::ZERO);
        assert_eq!(config.stagger_delay(3), Duration::from_secs(6));
    }

    #[test]
    fn test_deserialize_partial() {
        let toml = r#"
            stagger_ms = 0
            artifact_poll_attempts = 5
        "#;
        let config: TimingConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.stagger_ms, 0);
        assert_eq!(config.artifact_poll_attempts, 5);
        assert_eq!(config.research_deep_attempts, 80);
    }

    #[test]
    fn test_uniform_keeps_budgets() {
        let config = TimingConfig::uniform(1);
        assert_eq!(config.artifact_poll_interval(), Duration::from_millis(1));
        assert_eq!(config.source_poll_attempts, 60);
    }
}
