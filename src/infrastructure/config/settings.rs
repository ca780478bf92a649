//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all settings.
//! Configuration is loaded from a TOML file; `WAGERBOOK_DATABASE_URL`
//! overrides the database location.
//!
//! # Example
//!
//! ```no_run
//! use wagerbook::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("wagerbook.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::database::{DatabaseConfig, DATABASE_URL_ENV};
use super::ledger::{AccountsConfig, EngineConfig, EventsConfig};
use super::logging::LoggingConfig;
use crate::application::EngineSettings;
use crate::error::{ConfigError, Result};

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Lock timeouts and drift policy.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Signup and monthly bonus amounts.
    #[serde(default)]
    pub accounts: AccountsConfig,

    /// Event bus settings.
    #[serde(default)]
    pub events: EventsConfig,

    /// SQLite connection settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging and tracing configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Parse configuration from TOML content.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML content is malformed or validation fails.
    pub fn parse_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the TOML content is
    /// malformed, or validation fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Load from `path` if it exists, otherwise start from defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file is unreadable or invalid.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            return Self::load(path);
        }
        let mut config = Self::default();
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Initialize tracing from the `[logging]` section.
    pub fn init_logging(&self) {
        self.logging.init();
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
            if !url.trim().is_empty() {
                self.database.url = url;
            }
        }
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<()> {
        if self.engine.lock_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "lock_timeout_ms",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.engine.settlement_lock_timeout_ms < self.engine.lock_timeout_ms {
            return Err(ConfigError::InvalidValue {
                field: "settlement_lock_timeout_ms",
                reason: "must be >= lock_timeout_ms".to_string(),
            }
            .into());
        }
        if self.accounts.signup_bonus < 0 {
            return Err(ConfigError::InvalidValue {
                field: "signup_bonus",
                reason: "must be 0 or greater".to_string(),
            }
            .into());
        }
        if self.accounts.monthly_bonus <= 0 {
            return Err(ConfigError::InvalidValue {
                field: "monthly_bonus",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.events.backlog_warning == 0 {
            return Err(ConfigError::InvalidValue {
                field: "backlog_warning",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "url" }.into());
        }
        if self.database.pool_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "pool_size",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

impl From<&Config> for EngineSettings {
    fn from(config: &Config) -> Self {
        Self {
            lock_timeout: config.engine.lock_timeout(),
            settlement_lock_timeout: config.engine.settlement_lock_timeout(),
            drift: config.engine.probability_drift,
            signup_bonus: config.accounts.signup_bonus,
            monthly_bonus: config.accounts.monthly_bonus,
        }
    }
}
