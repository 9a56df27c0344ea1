//! Configuration loading for gloop.
//!
//! Loads `~/.gloop/config.toml` with environment variable overrides.
//! A missing file means defaults; a malformed file is an error.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.gloop/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct GloopConfig {
    /// API key for the chat endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Chat completions base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Optional provider-routing hint (OpenRouter upstream pin)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_routing: Option<String>,

    /// Tool calls between automatic context prunes (0 disables)
    #[serde(default = "default_prune_threshold")]
    pub prune_threshold: u32,
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_model() -> String {
    "moonshotai/kimi-k2".into()
}
fn default_prune_threshold() -> u32 {
    50
}

impl Default for GloopConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            default_model: default_model(),
            provider_routing: None,
            prune_threshold: default_prune_threshold(),
        }
    }
}

impl std::fmt::Debug for GloopConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GloopConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("default_model", &self.default_model)
            .field("provider_routing", &self.provider_routing)
            .field("prune_threshold", &self.prune_threshold)
            .finish()
    }
}

impl GloopConfig {
    /// Load from the default path with environment overrides applied.
    ///
    /// Env overrides: `GLOOP_API_KEY` / `OPENROUTER_API_KEY` /
    /// `OPENAI_API_KEY` for the key, `GLOOP_MODEL`, `GLOOP_BASE_URL`.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::config_dir().join("config.toml"))?;

        if config.api_key.is_none() {
            config.api_key = std::env::var("GLOOP_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENROUTER_API_KEY").ok())
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }
        if let Ok(model) = std::env::var("GLOOP_MODEL") {
            config.default_model = model;
        }
        if let Ok(base_url) = std::env::var("GLOOP_BASE_URL") {
            config.base_url = base_url;
        }

        Ok(config)
    }

    /// Load from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// `~/.gloop`
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".gloop")
    }

    /// `~/.gloop/memory.md`
    pub fn memory_path() -> PathBuf {
        Self::config_dir().join("memory.md")
    }

    /// `~/.gloop/tools`
    pub fn tools_dir() -> PathBuf {
        Self::config_dir().join("tools")
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
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
}
