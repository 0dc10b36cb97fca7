//! TOML-based configuration for the optimizer CLI.
//!
//! Supports a config file (`joinopt.toml`) with environment variable
//! expansion, following the same `${VAR}` convention as the rest of this
//! crate's ambient tooling.
//!
//! ```toml
//! [model]
//! buffer_capacity = 256
//! forest_library = "${JOINOPT_FOREST_LIB}"
//!
//! [logging]
//! level = "info"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("missing environment variable: {0}")]
    MissingEnvVar(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Settings {
    pub model: ModelSettings,
    pub logging: LoggingSettings,
}

/// Settings for the `Model` batching buffers.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Number of concurrent prediction rows to allocate. The DP driver only
    /// ever needs one row at a time (per-prediction usage
    /// pattern"); a larger capacity is only useful for `predict_many`
    /// benchmarking.
    pub buffer_capacity: usize,

    /// Path to a dynamically linked forest evaluator, expanded for `${VAR}`
    /// references. Unused unless the crate is built with `forest-ffi`.
    pub forest_library: Option<String>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        ModelSettings {
            buffer_capacity: 1,
            forest_library: None,
        }
    }
}

/// Logging configuration, consumed by the CLI's `tracing-subscriber` setup.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file, falling back to defaults if the
    /// path doesn't exist.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Settings::default());
        }
        let raw = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&raw)?;
        Ok(settings)
    }

    pub fn resolved_forest_library(&self) -> Result<Option<PathBuf>, SettingsError> {
        match &self.model.forest_library {
            Some(raw) => Ok(Some(PathBuf::from(expand_env_vars(raw)?))),
            None => Ok(None),
        }
    }
}

/// Expand `${VAR}` references in `input` against the process environment.
pub fn expand_env_vars(input: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let Some(end) = rest[start..].find('}') else {
            result.push_str(&rest[start..]);
            rest = "";
            break;
        };
        let var_name = &rest[start + 2..start + end];
        let value = env::var(var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.to_string()))?;
        result.push_str(&value);
        rest = &rest[start + end + 1..];
    }
    result.push_str(rest);
    Ok(result)
}
