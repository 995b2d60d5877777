//! Text extraction helpers.
//!
//! The external client prints free text. These pure functions pull out the
//! pieces the pipeline needs: workspace identifiers, research task tokens,
//! and batch artifact status records.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
        .expect("identifier pattern is valid")
});

static TASK_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)task[_\s]*(?:id)?[:\s]*([0-9a-f-]+)\b").expect("task pattern is valid")
});

/// Returns the first 8-4-4-4-12 hexadecimal identifier in `output`.
pub fn extract_notebook_id(output: &str) -> Option<String> {
    IDENTIFIER.find(output).map(|m| m.as_str().to_string())
}

/// Returns the research task token in `output`.
///
/// Looks for a `task`, `task id`, `task_id:` style marker first and falls back
/// to the first identifier-shaped token.
pub fn extract_task_id(output: &str) -> Option<String> {
    TASK_MARKER
        .captures(output)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|token| !token.is_empty())
        .or_else(|| extract_notebook_id(output))
}

/// One record of the batch artifact status payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactStatus {
    /// Artifact kind as reported by the service (e.g. `slide_deck`).
    #[serde(rename = "type")]
    pub kind: String,
    /// Non-string values read as empty.
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub artifact_id: String,
    /// Remaining fields, kept verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ArtifactStatus {
    pub fn is_completed(&self) -> bool {
        self.status == "completed"
    }

    pub fn is_failed(&self) -> bool {
        self.status == "failed"
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_str().unwrap_or_default().to_string())
}

/// Reduces a batch status payload to the last record of each kind.
///
/// Empty output is an empty list. Output that is not a JSON list, or that
/// holds a record without a string `type`, yields an empty map. Other fields
/// are read loosely so one odd record does not hide its siblings.
pub fn parse_latest_artifacts(output: &str) -> HashMap<String, ArtifactStatus> {
    let payload = if output.trim().is_empty() { "[]" } else { output };
    let records = match serde_json::from_str::<Vec<serde_json::Value>>(payload) {
        Ok(records) => records,
        Err(e) => {
            debug!("Unparsable artifact status payload: {}", e);
            return HashMap::new();
        }
    };

    let mut latest = HashMap::new();
    for record in records {
        match serde_json::from_value::<ArtifactStatus>(record) {
            Ok(status) => {
                latest.insert(status.kind.clone(), status);
            }
            Err(e) => {
                debug!("Artifact status record without a type: {}", e);
                return HashMap::new();
            }
        }
    }
    latest
}

/// Replaces every non-alphanumeric character with `_` and lower-cases the result.
pub fn safe_filename(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect::<String>()
        .to_lowercase()
}
