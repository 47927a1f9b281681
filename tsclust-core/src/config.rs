//! TOML configuration for the quote source and acquisition policy.
//!
//! ```toml
//! [alpha_vantage]
//! api_key = "demo"
//! output_size = "full"
//!
//! [acquisition]
//! max_retries = 5
//! retry_delay_secs = 10
//! ```
//!
//! Every key is optional. The API key may also come from the
//! `ALPHAVANTAGE_API_KEY` environment variable, which wins over the file.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Environment variable consulted for the API key.
pub const API_KEY_ENV: &str = "ALPHAVANTAGE_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("parse config TOML: {0}")]
    Parse(String),

    #[error("serialize config: {0}")]
    Serialize(String),

    #[error("no API key: set [alpha_vantage] api_key or {}", API_KEY_ENV)]
    MissingApiKey,
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub alpha_vantage: AlphaVantageConfig,
    pub acquisition: AcquisitionConfig,
}

impl Config {
    /// Load a configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Overlay the API key from the environment, if set and non-empty.
    pub fn with_env(mut self) -> Self {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.alpha_vantage.api_key = key;
            }
        }
        self
    }
}

/// Alpha Vantage connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlphaVantageConfig {
    pub api_key: String,
    pub base_url: String,
    pub output_size: OutputSize,
    pub timeout_secs: u64,
}

impl AlphaVantageConfig {
    /// Fails when no API key has been configured.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        Ok(())
    }
}

impl Default for AlphaVantageConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://www.alphavantage.co/query".into(),
            output_size: OutputSize::Compact,
            timeout_secs: 30,
        }
    }
}

/// How much history the daily endpoint returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputSize {
    /// Latest 100 trading days.
    #[default]
    Compact,
    /// Full available history.
    Full,
}

impl OutputSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputSize::Compact => "compact",
            OutputSize::Full => "full",
        }
    }
}

/// Retry policy for bulk acquisition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Retry rounds over the skipped tickers after the first pass.
    pub max_retries: usize,
    /// Sleep after each failed fetch.
    pub retry_delay_secs: u64,
}

impl AcquisitionConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            retry_delay_secs: 10,
        }
    }
}
