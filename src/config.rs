//! Configuration for mission-desk

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Client configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the mission API, without a trailing `/api`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Bearer token sent with every request
    #[serde(default)]
    pub access_token: String,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ServerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Default config path
    pub fn default_path() -> Result<PathBuf> {
        // Check environment variable first
        if let Ok(env_path) = std::env::var("MISSION_DESK_CONFIG") {
            return Ok(PathBuf::from(env_path));
        }

        let local = PathBuf::from("mission-desk.toml");
        if local.exists() {
            return Ok(local);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("mission-desk");

        Ok(config_dir.join("config.toml"))
    }

    /// Load config from default path, falling back to defaults
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content).context("Failed to parse config file")
    }

    /// Save config to specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        let with_comments = format!(
            "# mission-desk configuration\n\
             # MISSION_DESK_TOKEN overrides auth.access_token\n\n\
             {}",
            content
        );

        std::fs::write(path, with_comments).context("Failed to write config file")?;

        Ok(())
    }

    /// Applies environment overrides on top of the file values
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(token) = std::env::var("MISSION_DESK_TOKEN")
            && !token.trim().is_empty()
        {
            self.auth.access_token = token;
        }
        self
    }

    pub fn token(&self) -> Option<&str> {
        let token = self.auth.access_token.trim();
        (!token.is_empty()).then_some(token)
    }
}
