//! Agent configuration loaded from `.shellgraph.toml`.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::io::collect::CollectLimits;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".shellgraph.toml";

/// Agent configuration (TOML).
///
/// Every field is optional in the file; missing ones take the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentConfig {
    /// Upper bound on node dispatches per run.
    pub max_steps: u32,

    /// How many model-suggested alternatives may be tried after a failure.
    pub max_alternatives: u32,

    /// Wall-clock limit for a single shell command.
    pub command_timeout_secs: u64,

    /// Truncate captured stdout/stderr beyond this many bytes per stream.
    pub output_limit_bytes: usize,

    pub model: ModelConfig,
    pub shell: ShellConfig,
    pub collection: CollectionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ModelConfig {
    /// OpenAI-compatible chat completions endpoint.
    pub api_url: String,
    pub model: String,
    pub max_tokens: u32,
    /// Environment variable holding the bearer token.
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 1000,
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ShellConfig {
    /// Program and leading args; the command text is appended as the last arg.
    pub command: Vec<String>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            command: vec!["bash".to_string(), "-c".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CollectionConfig {
    pub file_count_limit: usize,
    pub file_size_limit_bytes: u64,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            file_count_limit: 500,
            file_size_limit_bytes: 100 * 1024,
        }
    }
}

impl CollectionConfig {
    pub fn limits(&self) -> CollectLimits {
        CollectLimits {
            file_count_limit: self.file_count_limit,
            file_size_limit_bytes: self.file_size_limit_bytes,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: 32,
            max_alternatives: 3,
            command_timeout_secs: 120,
            output_limit_bytes: 100_000,
            model: ModelConfig::default(),
            shell: ShellConfig::default(),
            collection: CollectionConfig::default(),
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));
        if self.max_steps == 0 {
            return invalid("max_steps must be > 0");
        }
        if self.command_timeout_secs == 0 {
            return invalid("command_timeout_secs must be > 0");
        }
        if self.output_limit_bytes == 0 {
            return invalid("output_limit_bytes must be > 0");
        }
        if self.model.timeout_secs == 0 {
            return invalid("model.timeout_secs must be > 0");
        }
        if self.model.api_url.trim().is_empty() || self.model.model.trim().is_empty() {
            return invalid("model.api_url and model.model must be non-empty");
        }
        if self.model.api_key_env.trim().is_empty() {
            return invalid("model.api_key_env must be non-empty");
        }
        if self.shell.command.first().is_none_or(|program| program.trim().is_empty()) {
            return invalid("shell.command must be a non-empty array");
        }
        if self.collection.file_count_limit == 0 {
            return invalid("collection.file_count_limit must be > 0");
        }
        Ok(())
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `AgentConfig::default()`.
pub fn load_config(path: &Path) -> Result<AgentConfig> {
    if !path.exists() {
        return Ok(AgentConfig::default());
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: AgentConfig = toml::from_str(&contents)
        .map_err(|err| ConfigError::Invalid(err.to_string()))
        .with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}
