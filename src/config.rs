//! Optional TOML configuration with environment overrides.
//!
//! Default location is `<config dir>/saber-fetch/config.toml`. A missing file
//! means defaults; a malformed one stops the run.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::InputError;
use crate::search::DEFAULT_SEARCH_URL;
use crate::transport::RetryPolicy;

pub const DEFAULT_USER_AGENT: &str = concat!("saber-fetch/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub search_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub retries: u32,
    pub retry_backoff_ms: u64,
    pub workers: usize,
    pub spotify: SpotifyCredentials,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotifyCredentials {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            search_url: DEFAULT_SEARCH_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 30,
            retries: 2,
            retry_backoff_ms: 500,
            workers: 4,
            spotify: SpotifyCredentials::default(),
        }
    }
}

impl Config {
    /// `<config dir>/saber-fetch/config.toml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("saber-fetch").join("config.toml"))
    }

    /// Load from `path` (or the default location) and apply environment
    /// overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, InputError> {
        let mut config = match path.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Config::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, InputError> {
        let invalid = |message: String| InputError::Config {
            path: path.to_path_buf(),
            message,
        };
        let content = fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        toml::from_str(&content).map_err(|e| invalid(e.to_string()))
    }

    /// `SPOTIFY_CLIENT_ID` / `SPOTIFY_CLIENT_SECRET` win over the file.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(id) = lookup("SPOTIFY_CLIENT_ID").filter(|v| !v.is_empty()) {
            self.spotify.client_id = Some(id);
        }
        if let Some(secret) = lookup("SPOTIFY_CLIENT_SECRET").filter(|v| !v.is_empty()) {
            self.spotify.client_secret = Some(secret);
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retries: self.retries,
            backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }
}
