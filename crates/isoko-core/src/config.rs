//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/isoko/config.toml)
//! 3. Environment variables (ISOKO_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Environment variable prefix
const ENV_PREFIX: &str = "ISOKO";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application id scoping all collection paths in the store
    #[serde(default = "default_app_id")]
    pub app_id: String,

    /// Remote document store endpoint (optional; the embedding
    /// application constructs the store client from it)
    #[serde(default)]
    pub store_url: Option<String>,

    /// Price-suggestion endpoint
    #[serde(default = "default_price_api_url")]
    pub price_api_url: String,

    /// API key for the price-suggestion call
    #[serde(default)]
    pub price_api_key: Option<String>,

    /// Attempts per remote write before surfacing failure
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,

    /// First retry delay in milliseconds; doubles each attempt
    #[serde(default = "default_retry_initial_delay_ms")]
    pub retry_initial_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_id: default_app_id(),
            store_url: None,
            price_api_url: default_price_api_url(),
            price_api_key: None,
            retry_max_attempts: default_retry_max_attempts(),
            retry_initial_delay_ms: default_retry_initial_delay_ms(),
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (ISOKO_APP_ID, ISOKO_STORE_URL, ...)
    /// 2. Config file (~/.config/isoko/config.toml or ISOKO_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(format!("{}_APP_ID", ENV_PREFIX)) {
            if !val.is_empty() {
                self.app_id = val;
            }
        }

        if let Ok(val) = std::env::var(format!("{}_STORE_URL", ENV_PREFIX)) {
            self.store_url = if val.is_empty() { None } else { Some(val) };
        }

        if let Ok(val) = std::env::var(format!("{}_PRICE_API_URL", ENV_PREFIX)) {
            if !val.is_empty() {
                self.price_api_url = val;
            }
        }

        if let Ok(val) = std::env::var(format!("{}_PRICE_API_KEY", ENV_PREFIX)) {
            self.price_api_key = if val.is_empty() { None } else { Some(val) };
        }

        if let Ok(val) = std::env::var(format!("{}_RETRY_MAX_ATTEMPTS", ENV_PREFIX)) {
            if let Ok(n) = val.parse() {
                self.retry_max_attempts = n;
            }
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_file_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with ISOKO_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("isoko")
            .join("config.toml")
    }

    /// The retry policy configured for remote writes
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_max_attempts,
            Duration::from_millis(self.retry_initial_delay_ms),
        )
    }
}

fn default_app_id() -> String {
    "default-app-id".to_string()
}

fn default_price_api_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        .to_string()
}

fn default_retry_max_attempts() -> u32 {
    5
}

fn default_retry_initial_delay_ms() -> u64 {
    1000
}
