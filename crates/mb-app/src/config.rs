//! Application configuration.

use crate::error::{AppError, AppResult};
use mb_refresh::RefreshConfig;
use mb_universalis::{RetryPolicy, UpstreamConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config file used when neither `--config` nor `MB_CONFIG` is given.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "MB_CONFIG";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub upstream: UpstreamConfig,
}

impl AppConfig {
    /// Resolve and load configuration.
    ///
    /// Path precedence: `cli_path` > `MB_CONFIG` > [`DEFAULT_CONFIG_PATH`].
    /// An explicitly named file must exist; a missing default file falls
    /// back to built-in defaults.
    pub fn load(cli_path: Option<String>) -> AppResult<Self> {
        let explicit = cli_path.or_else(|| std::env::var(CONFIG_ENV_VAR).ok());

        let config = match explicit {
            Some(path) => Self::from_file(&path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(DEFAULT_CONFIG_PATH)?
            }
            None => {
                tracing::warn!(path = DEFAULT_CONFIG_PATH, "Config file not found, using defaults");
                Self::default()
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config {path}: {e}")))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    pub fn validate(&self) -> AppResult<()> {
        self.refresh
            .validate()
            .map_err(|e| AppError::Config(e.to_string()))?;

        if self.retry.max_attempts == 0 {
            return Err(AppError::Config("retry.max_attempts must be > 0".to_string()));
        }
        if self.upstream.base_url.trim().is_empty() {
            return Err(AppError::Config("upstream.base_url must be set".to_string()));
        }
        Ok(())
    }
}
