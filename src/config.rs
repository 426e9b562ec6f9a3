//! Configuration management for transcriptor.
//!
//! Handles loading, saving, and providing defaults for the tool
//! configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration struct.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: ModelConfig,
    pub runtime: RuntimeConfig,
    pub logging: LoggingConfig,
}

/// Configuration for the speech recognition model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Whisper model size to use ("tiny", "base", "small", "medium", "large").
    pub model: String,
    /// Language hint as an ISO code. `None` lets the engine auto-detect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Configuration for the runtime the recognition engine executes in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Interpreter used when no environment root is given.
    pub interpreter: PathBuf,
    /// Isolated environment root whose interpreter is used instead of the
    /// default. When set, its interpreter binary must exist.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env_root: Option<PathBuf>,
    /// Override for the model weights cache directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub models_dir: Option<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: LogLevel,
}

/// Log verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Convert to a tracing filter directive string for this crate.
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "transcriptor=error",
            LogLevel::Warn => "transcriptor=warn",
            LogLevel::Info => "transcriptor=info",
            LogLevel::Debug => "transcriptor=debug",
            LogLevel::Trace => "transcriptor=trace",
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: "base".to_string(),
            language: None,
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            interpreter: PathBuf::from(if cfg!(windows) { "python" } else { "python3" }),
            env_root: None,
            models_dir: None,
        }
    }
}

impl Config {
    /// Returns the default config directory path.
    /// `~/.config/transcriptor/` (or `$XDG_CONFIG_HOME/transcriptor/`)
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .context("Could not determine config directory (HOME not set?)")
            .map(|p| p.join("transcriptor"))
    }

    /// Returns the default config file path.
    /// `~/.config/transcriptor/config.toml`
    pub fn config_path() -> Result<PathBuf> {
        Self::config_dir().map(|p| p.join("config.toml"))
    }

    /// Returns the default data directory path.
    /// `~/.local/share/transcriptor/` (or `$XDG_DATA_HOME/transcriptor/`)
    pub fn data_dir() -> Result<PathBuf> {
        dirs::data_dir()
            .context("Could not determine data directory (HOME not set?)")
            .map(|p| p.join("transcriptor"))
    }

    /// Returns the default models directory path.
    /// `~/.local/share/transcriptor/models/`
    pub fn models_dir() -> Result<PathBuf> {
        Self::data_dir().map(|p| p.join("models"))
    }

    /// Load configuration from the default path.
    /// Returns defaults if the file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    /// Returns defaults if the file doesn't exist.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file as TOML")
    }

    /// Save configuration to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        self.save_to(&path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
