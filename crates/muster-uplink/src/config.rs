//! Uplink configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

use crate::{Result, DEFAULT_BACKEND_URL, DEFAULT_FEED_URL};
use muster_core::ConsoleError;

/// Backend URL override honored by [`ConsoleConfig::apply_env`]
pub const ENV_BACKEND_URL: &str = "MUSTER_BACKEND_URL";

/// Feed URL override honored by [`ConsoleConfig::apply_env`]
pub const ENV_FEED_URL: &str = "MUSTER_FEED_URL";

/// Main console configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Backend origin for planning requests
    pub backend_url: String,

    /// Push feed endpoint
    pub feed_url: String,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Base delay between feed reconnect attempts in seconds
    pub reconnect_delay_secs: u64,

    /// Interval between backend status probes in seconds
    pub status_poll_secs: u64,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            feed_url: DEFAULT_FEED_URL.to_string(),
            request_timeout_secs: 30,
            reconnect_delay_secs: 3,
            status_poll_secs: 5,
        }
    }
}

impl ConsoleConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the backend origin
    pub fn with_backend_url(mut self, url: impl Into<String>) -> Self {
        self.backend_url = url.into();
        self
    }

    /// Set the push feed endpoint
    pub fn with_feed_url(mut self, url: impl Into<String>) -> Self {
        self.feed_url = url.into();
        self
    }

    /// Set the per-request timeout
    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    /// The conventional config location, `$HOME/.muster/config.toml`
    pub fn default_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".muster").join("config.toml")
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)
            .map_err(|err| ConsoleError::Serialization(err.to_string()))?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|err| ConsoleError::Serialization(err.to_string()))?;
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Load from the conventional location, falling back to defaults when the
    /// file does not exist
    pub fn load_or_default() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            debug!("Loading config from {}", path.display());
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply environment overrides on top of the loaded values
    pub fn apply_env(mut self) -> Self {
        if let Ok(url) = std::env::var(ENV_BACKEND_URL) {
            debug!("Backend URL overridden from {}", ENV_BACKEND_URL);
            self.backend_url = url;
        }
        if let Ok(url) = std::env::var(ENV_FEED_URL) {
            debug!("Feed URL overridden from {}", ENV_FEED_URL);
            self.feed_url = url;
        }
        self
    }

    /// Check that both endpoints parse and carry usable schemes
    pub fn validate(&self) -> Result<()> {
        let backend = Url::parse(&self.backend_url)
            .map_err(|err| ConsoleError::Validation(format!("backend_url: {}", err)))?;
        if !matches!(backend.scheme(), "http" | "https") {
            return Err(ConsoleError::Validation(format!(
                "backend_url must be http or https, got {}",
                backend.scheme()
            )));
        }
        let feed = Url::parse(&self.feed_url)
            .map_err(|err| ConsoleError::Validation(format!("feed_url: {}", err)))?;
        if !matches!(feed.scheme(), "ws" | "wss") {
            return Err(ConsoleError::Validation(format!(
                "feed_url must be ws or wss, got {}",
                feed.scheme()
            )));
        }
        Ok(())
    }
}
