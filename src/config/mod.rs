//! Configuration management for chronodose
//!
//! Settings are layered: defaults, then a TOML file or `CHRONODOSE_*`
//! environment variables, then command-line overrides applied by the binary.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::booker::orchestrator::MAX_WORKERS;
use crate::booker::DEFAULT_VISIT_MOTIVE;
use crate::client::headers::DEFAULT_USER_AGENT;
use crate::client::DEFAULT_BASE_URL;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Account credentials
    pub account: AccountConfig,

    /// Polling and booking behaviour
    pub booking: BookingConfig,

    /// Remote service endpoint
    pub service: ServiceConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Account credentials
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountConfig")
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

/// Polling and booking behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingConfig {
    /// Number of concurrent workers (1..=16)
    pub workers: usize,

    /// Delay before each settings fetch, in seconds
    pub poll_interval_secs: u64,

    /// Per-request timeout, in seconds
    pub request_timeout_secs: u64,

    /// Exact name of the visit motive to book
    pub visit_motive: String,

    /// File listing the locations to poll, one URL per line
    pub locations_file: PathBuf,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            poll_interval_secs: 1,
            request_timeout_secs: 5,
            visit_motive: DEFAULT_VISIT_MOTIVE.to_string(),
            locations_file: PathBuf::from("locations.txt"),
        }
    }
}

/// Remote service endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub base_url: String,
    pub user_agent: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from a variable lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(username) = lookup("CHRONODOSE_USERNAME") {
            config.account.username = username;
        }
        if let Some(password) = lookup("CHRONODOSE_PASSWORD") {
            config.account.password = password;
        }

        if let Some(workers) = lookup("CHRONODOSE_WORKERS") {
            config.booking.workers = workers
                .parse()
                .with_context(|| format!("Invalid CHRONODOSE_WORKERS: {workers}"))?;
        }
        if let Some(secs) = lookup("CHRONODOSE_POLL_INTERVAL") {
            config.booking.poll_interval_secs = secs
                .parse()
                .with_context(|| format!("Invalid CHRONODOSE_POLL_INTERVAL: {secs}"))?;
        }
        if let Some(secs) = lookup("CHRONODOSE_REQUEST_TIMEOUT") {
            config.booking.request_timeout_secs = secs
                .parse()
                .with_context(|| format!("Invalid CHRONODOSE_REQUEST_TIMEOUT: {secs}"))?;
        }
        if let Some(motive) = lookup("CHRONODOSE_VISIT_MOTIVE") {
            config.booking.visit_motive = motive;
        }
        if let Some(path) = lookup("CHRONODOSE_LOCATIONS_FILE") {
            config.booking.locations_file = PathBuf::from(path);
        }

        if let Some(base_url) = lookup("CHRONODOSE_BASE_URL") {
            config.service.base_url = base_url;
        }
        if let Some(user_agent) = lookup("CHRONODOSE_USER_AGENT") {
            config.service.user_agent = user_agent;
        }

        if let Some(level) = lookup("CHRONODOSE_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Some(format) = lookup("CHRONODOSE_LOG_FORMAT") {
            config.logging.format = format;
        }

        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.account.username.trim().is_empty() {
            anyhow::bail!("username must not be empty");
        }

        if self.account.password.is_empty() {
            anyhow::bail!("password must not be empty");
        }

        if !(1..=MAX_WORKERS).contains(&self.booking.workers) {
            anyhow::bail!(
                "workers must be between 1 and {MAX_WORKERS}, got {}",
                self.booking.workers
            );
        }

        if self.booking.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than 0");
        }

        if self.booking.visit_motive.trim().is_empty() {
            anyhow::bail!("visit_motive must not be empty");
        }

        if self.service.base_url.trim().is_empty() {
            anyhow::bail!("base_url must not be empty");
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            anyhow::bail!("log format must be 'text' or 'json'");
        }

        Ok(())
    }

    /// Get pacing interval as Duration
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.booking.poll_interval_secs)
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.booking.request_timeout_secs)
    }
}
