//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/phytostress/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/phytostress/` (~/.config/phytostress/)
//! - Data: `$XDG_DATA_HOME/phytostress/` (~/.local/share/phytostress/)
//! - State/Logs: `$XDG_STATE_HOME/phytostress/` (~/.local/state/phytostress/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Largest rounding precision accepted from `[export] decimal_places`.
pub const MAX_DECIMAL_PLACES: u32 = 6;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Database location
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Export defaults
    #[serde(default)]
    pub export: ExportConfig,
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,

    /// Directory for log files, defaults to the XDG state directory
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
            directory: None,
        }
    }
}

impl LoggingConfig {
    /// Directory the rolling log files go to
    pub fn log_dir(&self) -> PathBuf {
        self.directory.clone().unwrap_or_else(Config::state_dir)
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

/// Database configuration
#[derive(Debug, Deserialize, Default)]
pub struct DatabaseConfig {
    /// Override for the SQLite file location
    pub path: Option<PathBuf>,
}

/// Export configuration
#[derive(Debug, Deserialize, Default)]
pub struct ExportConfig {
    /// Directory used for relative export paths
    pub directory: Option<PathBuf>,

    /// Rounding applied to every displayed aggregate, overriding the
    /// per-table default
    pub decimal_places: Option<u32>,
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if let Some(places) = self.export.decimal_places {
            if places > MAX_DECIMAL_PLACES {
                return Err(Error::Config(format!(
                    "export.decimal_places must be between 0 and {}",
                    MAX_DECIMAL_PLACES
                )));
            }
        }
        if self.logging.max_files == 0 {
            return Err(Error::Config(
                "logging.max_files must be at least 1".to_string(),
            ));
        }
        if self.logging.level.trim().is_empty() {
            return Err(Error::Config("logging.level must not be empty".to_string()));
        }
        Ok(())
    }

    /// Resolve the database file, honouring `[database] path`
    pub fn resolved_database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(Self::database_path)
    }

    /// Resolve an export target against `[export] directory`
    pub fn resolve_export_path(&self, target: &Path) -> PathBuf {
        match &self.export.directory {
            Some(dir) if target.is_relative() => dir.join(target),
            _ => target.to_path_buf(),
        }
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/phytostress/config.toml` (~/.config/phytostress/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("phytostress").join("config.toml")
    }

    /// Returns the data directory path (for SQLite database)
    ///
    /// `$XDG_DATA_HOME/phytostress/` (~/.local/share/phytostress/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("phytostress")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/phytostress/` (~/.local/state/phytostress/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("phytostress")
    }

    /// Returns the database file path
    ///
    /// `$XDG_DATA_HOME/phytostress/plant_stress.db`
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("plant_stress.db")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/phytostress/phytostress.log`
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("phytostress.log")
    }
}
