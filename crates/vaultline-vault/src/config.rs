//! Vault configuration.
//!
//! Loaded from TOML. Every section and field is optional and falls back to
//! its default. A file named by `VAULTLINE_CONFIG` takes precedence over
//! whatever configuration the caller would otherwise use.

use std::ffi::OsString;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Result, VaultError};

/// Environment variable naming an override configuration file.
pub const CONFIG_ENV: &str = "VAULTLINE_CONFIG";

/// Complete vault configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Deposit limits.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Event bus settings.
    #[serde(default)]
    pub events: EventsConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Deposit limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Smallest accepted deposit, in base units.
    #[serde(default = "default_min_deposit")]
    pub min_deposit: u64,
}

/// Event bus settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Per-subscriber buffer before lagging receivers drop events.
    #[serde(default = "default_event_capacity")]
    pub capacity: usize,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace" | "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_min_deposit() -> u64 {
    1
}

fn default_event_capacity() -> usize {
    1024
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            min_deposit: default_min_deposit(),
        }
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            capacity: default_event_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl VaultConfig {
    /// Resolve the configuration to run with: the file named by
    /// `VAULTLINE_CONFIG` if set, else `fallback`.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Config`] if the named file cannot be read or parsed
    pub fn resolve(fallback: Self) -> Result<Self> {
        Self::resolve_with(std::env::var_os(CONFIG_ENV), fallback)
    }

    fn resolve_with(path: Option<OsString>, fallback: Self) -> Result<Self> {
        match path {
            Some(path) if !path.is_empty() => {
                let path = Path::new(&path);
                tracing::info!(env = CONFIG_ENV, path = %path.display(), "config: loading override");
                Self::load_from(path)
            }
            _ => Ok(fallback),
        }
    }

    /// Load configuration from `path`.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Config`] if the file cannot be read or parsed
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| VaultError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Config`] if the TOML is malformed or fails validation
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: VaultConfig =
            toml::from_str(content).map_err(|e| VaultError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Config`] if a value is out of range
    pub fn validate(&self) -> Result<()> {
        if self.limits.min_deposit == 0 {
            return Err(VaultError::Config(
                "limits.min_deposit must be at least 1".to_string(),
            ));
        }
        if self.events.capacity == 0 {
            return Err(VaultError::Config(
                "events.capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
