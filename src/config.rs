use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default address of a local Ollama server.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Environment variable overriding the service endpoint.
pub const ENDPOINT_ENV: &str = "OLLAMA_API_URL";

/// Environment variable overriding the default model.
pub const MODEL_ENV: &str = "OLLAMA_CHAT_MODEL";

/// Client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the inference service
    pub endpoint: String,

    /// Model to select on startup instead of the first discovered one
    pub default_model: Option<String>,

    /// Timeout for model listing
    pub discovery_timeout_secs: u64,

    /// Timeout for a chat round trip; first use may load model weights
    pub chat_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            default_model: None,
            discovery_timeout_secs: 10,
            chat_timeout_secs: 300,
        }
    }
}

impl Config {
    /// Directory holding the config file (`~/.ollama-chat`)
    pub fn home_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        Ok(home.join(".ollama-chat"))
    }

    /// Load from `~/.ollama-chat/config.toml`, then apply environment overrides.
    ///
    /// Not validated here; callers validate after applying their own overrides.
    pub fn load() -> Result<Self> {
        let config_path = Self::home_dir()?.join("config.toml");
        Self::load_layered(&config_path, |key| std::env::var(key).ok())
    }

    /// File at `path`, then environment overrides through `lookup`
    pub fn load_layered<F>(path: &Path, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::load_from(path)?;
        config.apply_env(lookup);
        Ok(config)
    }

    /// Read a config file; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Apply environment overrides through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup(ENDPOINT_ENV).filter(|v| !v.trim().is_empty()) {
            self.endpoint = endpoint;
        }
        if let Some(model) = lookup(MODEL_ENV).filter(|v| !v.trim().is_empty()) {
            self.default_model = Some(model);
        }
    }

    /// Apply explicit overrides, typically from command-line flags
    pub fn with_overrides(mut self, endpoint: Option<String>, model: Option<String>) -> Self {
        if let Some(endpoint) = endpoint {
            self.endpoint = endpoint;
        }
        if model.is_some() {
            self.default_model = model;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            bail!("Endpoint must not be empty");
        }
        if self.discovery_timeout_secs == 0 || self.chat_timeout_secs == 0 {
            bail!("Timeouts must be at least one second");
        }
        Ok(())
    }

    /// Endpoint without a trailing slash, ready for path joining
    pub fn base_url(&self) -> &str {
        self.endpoint.trim_end_matches('/')
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_secs(self.discovery_timeout_secs)
    }

    pub fn chat_timeout(&self) -> Duration {
        Duration::from_secs(self.chat_timeout_secs)
    }
}
