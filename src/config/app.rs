//! Main application configuration
//!
//! This module defines the configuration structures for the skill-balancer
//! engine, including environment variable and TOML file loading and
//! validation.

use crate::balance::DEFAULT_MAX_ROSTER_SIZE;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub storage: StorageSettings,
    pub balance: BalanceSettings,
}

/// Service-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

/// Rating persistence settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Path of the JSON ratings file
    pub ratings_path: PathBuf,
    /// Write the ratings file with indentation
    pub pretty_print: bool,
}

/// Team balancing settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceSettings {
    /// Largest roster the exhaustive split search will accept
    pub max_roster_size: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "skill-balancer".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            ratings_path: PathBuf::from("data/elo_ratings.json"),
            pretty_print: true,
        }
    }
}

impl Default for BalanceSettings {
    fn default() -> Self {
        Self {
            max_roster_size: DEFAULT_MAX_ROSTER_SIZE,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file; environment variables override it
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path.display(), e))?;
        let mut config = Self::from_toml_str(&raw)?;
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Parse TOML; missing sections and keys take their defaults
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| anyhow!("Invalid configuration: {}", e))
    }

    fn apply_env(&mut self) -> Result<()> {
        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            self.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            self.service.log_level = log_level;
        }

        // Storage settings
        if let Ok(path) = env::var("RATINGS_PATH") {
            self.storage.ratings_path = PathBuf::from(path);
        }
        if let Ok(pretty) = env::var("PRETTY_PRINT") {
            self.storage.pretty_print = pretty
                .parse()
                .map_err(|_| anyhow!("Invalid PRETTY_PRINT value: {}", pretty))?;
        }

        // Balance settings
        if let Ok(max_size) = env::var("MAX_ROSTER_SIZE") {
            self.balance.max_roster_size = max_size
                .parse()
                .map_err(|_| anyhow!("Invalid MAX_ROSTER_SIZE value: {}", max_size))?;
        }

        Ok(())
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.name.is_empty() {
        return Err(anyhow!("Service name cannot be empty"));
    }

    // Validate storage settings
    if config.storage.ratings_path.as_os_str().is_empty() {
        return Err(anyhow!("Ratings path cannot be empty"));
    }

    // Validate balance settings
    if config.balance.max_roster_size == 0 {
        return Err(anyhow!("Max roster size must be greater than 0"));
    }

    Ok(())
}
