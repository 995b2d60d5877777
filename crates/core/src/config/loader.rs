use figment::{
    providers::{Env, Format, Json, Toml},
    Figment,
};
use std::path::Path;

use super::{types::PipelineConfig, ConfigError};

/// Prefix of environment variables that override file values.
/// Nested keys are separated by a double underscore, e.g. `NLMFLOW_TIMING__STAGGER_MS`.
const ENV_PREFIX: &str = "NLMFLOW_";

/// On-disk configuration format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    /// Picks the format from the file extension; anything but `.toml` is read as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Json,
        }
    }
}

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<PipelineConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let figment = match ConfigFormat::from_path(path) {
        ConfigFormat::Json => Figment::new().merge(Json::file(path)),
        ConfigFormat::Toml => Figment::new().merge(Toml::file(path)),
    };

    figment
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load configuration from a string (useful for testing)
pub fn load_config_from_str(input: &str, format: ConfigFormat) -> Result<PipelineConfig, ConfigError> {
    match format {
        ConfigFormat::Json => {
            serde_json::from_str(input).map_err(|e| ConfigError::ParseError(e.to_string()))
        }
        ConfigFormat::Toml => toml::from_str(input).map_err(|e| ConfigError::ParseError(e.to_string())),
    }
}
