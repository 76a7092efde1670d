//! # Depot Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     DEPOT_DB_PATH=/srv/depot/depot.db                                  │
//! │     DEPOT_MONTHLY_PRORATION=false                                      │
//! │     DEPOT_LOG_LEVEL=debug                                              │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/depot/depot.toml (Linux)                                 │
//! │     ~/Library/Application Support/com.depot.depot/depot.toml (macOS)   │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "/srv/depot/depot.db"
//! max_connections = 5
//!
//! [billing]
//! monthly_proration = true
//! reference_prefix = "EX"
//!
//! [logging]
//! level = "info"
//! ```
//!
//! The VAT rate and the billing-month length are not configurable.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::{BillingError, BillingResult};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const MAX_PREFIX_LEN: usize = 10;

// =============================================================================
// Sections
// =============================================================================

/// `[database]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Defaults to the platform data directory.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> PathBuf {
    directories::ProjectDirs::from("com", "depot", "depot")
        .map(|dirs| dirs.data_dir().join("depot.db"))
        .unwrap_or_else(|| PathBuf::from("depot.db"))
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// `[billing]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingSettings {
    /// Multiply storage fees by the billable month count for new documents.
    #[serde(default = "default_true")]
    pub monthly_proration: bool,

    /// Prefix of generated reference numbers (`EX-20240630-17`).
    #[serde(default = "default_reference_prefix")]
    pub reference_prefix: String,
}

fn default_true() -> bool {
    true
}

fn default_reference_prefix() -> String {
    "EX".to_string()
}

impl Default for BillingSettings {
    fn default() -> Self {
        BillingSettings {
            monthly_proration: true,
            reference_prefix: default_reference_prefix(),
        }
    }
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default filter when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            level: default_log_level(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete depot configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DepotConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub billing: BillingSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl DepotConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`depot.toml`)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> BillingResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading depot config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load depot config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file, creating the parent directory.
    pub fn save(&self, config_path: Option<PathBuf>) -> BillingResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| BillingError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| BillingError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| BillingError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Depot config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> BillingResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(BillingError::InvalidConfig("database.path must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(BillingError::InvalidConfig(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        let prefix = &self.billing.reference_prefix;
        if prefix.is_empty()
            || prefix.len() > MAX_PREFIX_LEN
            || !prefix.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(BillingError::InvalidConfig(format!(
                "billing.reference_prefix must be 1-{} letters or digits, got: '{}'",
                MAX_PREFIX_LEN, prefix
            )));
        }

        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(BillingError::InvalidConfig(format!(
                "logging.level must be one of {:?}, got: '{}'",
                LOG_LEVELS, self.logging.level
            )));
        }

        Ok(())
    }

    /// Applies `DEPOT_*` overrides from a variable lookup.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("DEPOT_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(value) = lookup("DEPOT_MONTHLY_PRORATION") {
            match value.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.billing.monthly_proration = true,
                "0" | "false" | "no" | "off" => self.billing.monthly_proration = false,
                _ => warn!(value = %value, "Unknown DEPOT_MONTHLY_PRORATION value"),
            }
        }

        if let Some(level) = lookup("DEPOT_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "depot", "depot")
            .map(|dirs| dirs.config_dir().join("depot.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = DepotConfig::default();
        assert!(config.billing.monthly_proration);
        assert_eq!(config.billing.reference_prefix, "EX");
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let vars = HashMap::from([
            ("DEPOT_DB_PATH", "/tmp/other.db"),
            ("DEPOT_MONTHLY_PRORATION", "off"),
            ("DEPOT_LOG_LEVEL", "debug"),
        ]);
        let mut config = DepotConfig::default();
        config.apply_overrides(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.database.path, PathBuf::from("/tmp/other.db"));
        assert!(!config.billing.monthly_proration);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_unknown_proration_value_is_ignored() {
        let mut config = DepotConfig::default();
        config.apply_overrides(|k| (k == "DEPOT_MONTHLY_PRORATION").then(|| "maybe".to_string()));
        assert!(config.billing.monthly_proration);
    }

    #[test]
    fn test_validation() {
        let mut config = DepotConfig::default();
        config.billing.reference_prefix = "EX-".to_string();
        assert!(config.validate().is_err());

        config.billing.reference_prefix = "GATE2".to_string();
        assert!(config.validate().is_ok());

        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());

        config.logging.level = "warn".to_string();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("depot.toml");

        let mut config = DepotConfig::default();
        config.database.path = dir.path().join("depot.db");
        config.billing.reference_prefix = "GATE".to_string();
        config.save(Some(path.clone())).unwrap();

        let loaded: DepotConfig = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: DepotConfig = toml::from_str("[billing]\nmonthly_proration = false\n").unwrap();
        assert!(!config.billing.monthly_proration);
        assert_eq!(config.billing.reference_prefix, "EX");
        assert_eq!(config.database.max_connections, 5);
    }
}
