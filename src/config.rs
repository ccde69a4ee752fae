//! Configuration management
//!
//! The config file is TOML carrying the five recognized options as quoted
//! dotted keys, matching the option names the emitter was historically
//! configured with:
//!
//! ```toml
//! "bootstrap.servers" = "localhost:9092"
//! "app.name" = "demo"
//! "log.topic" = "sol-logs"
//! "sources.topic" = "sol-sources"
//! "commands.topic" = "sol-commands"
//! ```
//!
//! The process-default path is taken from the `SOL_CONFIG` environment
//! variable. Every option has a typed default; a partial file is valid.

use crate::constants::{
    CONFIG_ENV_VAR, DEFAULT_APP_NAME, DEFAULT_COMMANDS_TOPIC, DEFAULT_LOG_TOPIC,
    DEFAULT_SOURCES_TOPIC,
};
use crate::error::{Result, SolError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Client configuration
///
/// All fields default individually, so a file may set any subset.
/// `validate()` runs after parsing: stream names must be non-empty and
/// pairwise distinct (the pipeline and listener would otherwise read
/// their own output).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolConfig {
    /// Sink endpoint (empty = not configured; only the Kafka sink reads this)
    #[serde(rename = "bootstrap.servers")]
    pub bootstrap_servers: String,

    /// Name of the owning application, embedded in every registration
    #[serde(rename = "app.name")]
    pub app_name: String,

    /// Stream receiving emitted events
    #[serde(rename = "log.topic")]
    pub log_topic: String,

    /// Compacted stream receiving registrations
    #[serde(rename = "sources.topic")]
    pub sources_topic: String,

    /// Stream carrying enable/disable commands
    #[serde(rename = "commands.topic")]
    pub commands_topic: String,
}

impl Default for SolConfig {
    fn default() -> Self {
        Self {
            bootstrap_servers: String::new(),
            app_name: DEFAULT_APP_NAME.to_string(),
            log_topic: DEFAULT_LOG_TOPIC.to_string(),
            sources_topic: DEFAULT_SOURCES_TOPIC.to_string(),
            commands_topic: DEFAULT_COMMANDS_TOPIC.to_string(),
        }
    }
}

impl SolConfig {
    /// Check field-level constraints that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.app_name.is_empty() {
            return Err(SolError::ConfigValidation {
                field: "app.name",
                reason: "must not be empty".into(),
            });
        }
        for (field, topic) in [
            ("log.topic", &self.log_topic),
            ("sources.topic", &self.sources_topic),
            ("commands.topic", &self.commands_topic),
        ] {
            if topic.is_empty() {
                return Err(SolError::ConfigValidation {
                    field,
                    reason: "must not be empty".into(),
                });
            }
        }
        if self.log_topic == self.sources_topic
            || self.log_topic == self.commands_topic
            || self.sources_topic == self.commands_topic
        {
            return Err(SolError::ConfigValidation {
                field: "topics",
                reason: format!(
                    "log/sources/commands streams must be distinct (got '{}', '{}', '{}')",
                    self.log_topic, self.sources_topic, self.commands_topic
                ),
            });
        }
        Ok(())
    }
}

/// Config file path from the `SOL_CONFIG` environment variable, if set
pub fn config_path() -> Option<PathBuf> {
    std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from)
}

/// Load and validate config from a file
pub fn load_file(path: &Path) -> Result<SolConfig> {
    let content = fs::read_to_string(path).map_err(|e| SolError::ConfigRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let config: SolConfig = toml::from_str(&content).map_err(|e| SolError::ConfigParse {
        path: path.to_path_buf(),
        source: e,
    })?;
    config.validate()?;
    Ok(config)
}

// ============================================================================
// Tests
// ============================================================================
