use std::collections::HashSet;

use super::{
    types::{ArtifactSpec, ChatGoal, PipelineConfig},
    ConfigError,
};

/// Validate configuration
/// Currently validates:
/// - At least one topic, with unique non-empty keys and non-empty titles
/// - Custom chat goals carry a prompt
/// - Sources have a value
/// - Revision instructions only target kinds that can be revised
/// - Poll loops have at least one attempt
pub fn validate_config(config: &PipelineConfig) -> Result<(), ConfigError> {
    if config.topics.is_empty() {
        return Err(ConfigError::ValidationError(
            "at least one topic is required".to_string(),
        ));
    }

    let mut keys = HashSet::new();
    for topic in &config.topics {
        if topic.key.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "topic key cannot be empty".to_string(),
            ));
        }
        if !keys.insert(topic.key.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate topic key: {}",
                topic.key
            )));
        }
        if topic.title.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "topic {} has an empty title",
                topic.key
            )));
        }
        if let Some(chat) = &topic.chat {
            let has_prompt = chat.prompt.as_deref().is_some_and(|p| !p.trim().is_empty());
            if chat.goal == ChatGoal::Custom && !has_prompt {
                return Err(ConfigError::ValidationError(format!(
                    "topic {}: chat goal 'custom' requires a prompt",
                    topic.key
                )));
            }
        }
        if let Some(source) = topic.sources.iter().find(|s| s.value.trim().is_empty()) {
            return Err(ConfigError::ValidationError(format!(
                "topic {}: {:?} source has an empty value",
                topic.key, source.kind
            )));
        }
        if let Some(artifacts) = &topic.artifacts {
            validate_artifacts(artifacts, &format!("topic {}", topic.key))?;
        }
    }

    validate_artifacts(&config.artifacts, "artifacts")?;

    let timing = &config.timing;
    if timing.source_poll_attempts == 0
        || timing.research_fast_attempts == 0
        || timing.research_deep_attempts == 0
        || timing.artifact_poll_attempts == 0
    {
        return Err(ConfigError::ValidationError(
            "timing poll attempts must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

fn validate_artifacts(artifacts: &[ArtifactSpec], context: &str) -> Result<(), ConfigError> {
    let mut kinds = HashSet::new();
    for spec in artifacts {
        if !kinds.insert(spec.kind) {
            return Err(ConfigError::ValidationError(format!(
                "{}: artifact {} listed more than once",
                context, spec.kind
            )));
        }
        if !spec.revision_instructions.is_empty() && !spec.kind.supports_revision() {
            return Err(ConfigError::ValidationError(format!(
                "{}: artifact {} does not support revision instructions",
                context, spec.kind
            )));
        }
    }
    Ok(())
}
