//! Configuration loading, validation, and management for Conductor.
//!
//! Loads configuration from `~/.conductor/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.conductor/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model name forwarded to the provider
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per provider response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Provider round-trips allowed per `input()` call
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// System message seeded into every new conversation
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Per-tool execution limit; unset means no limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_timeout_secs: Option<u64>,

    /// Provider call limit; unset means no limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_timeout_secs: Option<u64>,

    /// Interactive breakpoint settings
    #[serde(default)]
    pub debug: DebugConfig,

    /// Trace rendering settings
    #[serde(default)]
    pub trace: TraceConfig,

    /// Behavior log sink settings
    #[serde(default)]
    pub behavior_log: BehaviorLogConfig,
}

fn default_model() -> String {
    "default".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_iterations() -> u32 {
    10
}
fn default_system_prompt() -> String {
    "You are a helpful assistant. Use the available tools when they help answer the request."
        .into()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DebugConfig {
    /// Pause before breakpoint-flagged tools
    #[serde(default)]
    pub enabled: bool,

    /// Extra tool names to pause on, in addition to tools flagged in code
    #[serde(default)]
    pub breakpoints: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceConfig {
    /// Characters kept in argument/result previews
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,

    /// Render every tool call field by field
    #[serde(default)]
    pub verbose: bool,
}

fn default_preview_chars() -> usize {
    80
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            preview_chars: default_preview_chars(),
            verbose: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BehaviorLogConfig {
    #[serde(default)]
    pub enabled: bool,

    /// JSON file the events are written to; defaults to
    /// `~/.conductor/behavior.json`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl BehaviorLogConfig {
    /// The file the behavior log should write to.
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| AppConfig::config_dir().join("behavior.json"))
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.conductor/config.toml),
    /// then apply environment overrides:
    /// - `CONDUCTOR_MODEL`
    /// - `CONDUCTOR_MAX_ITERATIONS`
    /// - `CONDUCTOR_DEBUG` (`1`/`true` enables breakpoints)
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup, then re-validate.
    pub fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(model) = lookup("CONDUCTOR_MODEL") {
            self.model = model;
        }

        if let Some(raw) = lookup("CONDUCTOR_MAX_ITERATIONS") {
            self.max_iterations = raw.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "CONDUCTOR_MAX_ITERATIONS must be a positive integer, got '{raw}'"
                ))
            })?;
        }

        if let Some(raw) = lookup("CONDUCTOR_DEBUG") {
            self.debug.enabled = matches!(raw.trim(), "1" | "true" | "yes" | "on");
        }

        self.validate()
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".conductor")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.temperature < 0.0 || self.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "max_iterations must be at least 1".into(),
            ));
        }

        if self.trace.preview_chars < 8 {
            return Err(ConfigError::ValidationError(
                "trace.preview_chars must be at least 8".into(),
            ));
        }

        if self.tool_timeout_secs == Some(0) || self.provider_timeout_secs == Some(0) {
            return Err(ConfigError::ValidationError(
                "timeouts must be positive when set".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: None,
            max_iterations: default_max_iterations(),
            system_prompt: default_system_prompt(),
            tool_timeout_secs: None,
            provider_timeout_secs: None,
            debug: DebugConfig::default(),
            trace: TraceConfig::default(),
            behavior_log: BehaviorLogConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
