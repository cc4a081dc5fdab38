//! Configuration for the journal.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::access::Session;
use crate::api::{ApiConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
use crate::core::dates::{SharedClock, SystemClock};
use crate::model::UserRole;
use crate::store::DEFAULT_POSTS_LIMIT;

/// Main configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the persisted journal state
    pub data_path: PathBuf,

    /// Remote posts API
    pub api: ApiSettings,

    /// Number of posts fetched per list request
    pub posts_limit: usize,

    /// IANA timezone used to decide what "today" is; local time when unset
    pub timezone: Option<String>,

    /// Role of the local session
    pub role: UserRole,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("edu-journal");

        Self {
            data_path: data_dir,
            api: ApiSettings::default(),
            posts_limit: DEFAULT_POSTS_LIMIT,
            timezone: None,
            role: UserRole::Teacher,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("edu-journal")
            .join("config.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.data_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }

    /// Clock anchored to the configured timezone.
    pub fn clock(&self) -> Result<SharedClock, ConfigError> {
        let clock = match self.timezone.as_deref() {
            Some(name) => SystemClock::from_name(name).map_err(ConfigError::InvalidTimezone)?,
            None => SystemClock::local(),
        };
        Ok(std::sync::Arc::new(clock))
    }

    /// Session role, overridable through `EDU_JOURNAL_ROLE`.
    pub fn session(&self) -> Session {
        Session::from_env_or(self.role)
    }
}

/// Remote posts API settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ApiSettings {
    pub fn to_api_config(&self) -> ApiConfig {
        ApiConfig::new(&self.base_url, Duration::from_secs(self.timeout_secs))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Serialize error: {0}")]
    SerializeError(String),
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),
}
