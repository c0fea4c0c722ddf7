//! Configuration parsing and validation.
//!
//! Kahn configuration is loaded from TOML files with serde defaults for
//! every field, so an empty file is a valid configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level Kahn configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Variable store and partitioning configuration.
    #[serde(default)]
    pub store: StoreConfig,

    /// Telemetry configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Variable store and partitioning configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Number of partitions hosting cells.
    #[serde(default = "default_partitions")]
    pub partitions: u32,

    /// Seed for the routing hash. Must be identical on every node that
    /// shares a variable space; changing it remaps every id.
    #[serde(default)]
    pub hash_seed: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            partitions: default_partitions(),
            hash_seed: 0,
        }
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level: trace, debug, info, warn, or error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_partitions() -> u32 {
    4
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).with_context(|| "failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.store.partitions == 0 {
            anyhow::bail!("store.partitions must be > 0");
        }
        if self.store.partitions > 4096 {
            anyhow::bail!(
                "store.partitions must be <= 4096, got {}",
                self.store.partitions
            );
        }

        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.telemetry.log_level.as_str()) {
            anyhow::bail!(
                "telemetry.log_level must be one of {:?}, got {:?}",
                LEVELS,
                self.telemetry.log_level
            );
        }

        Ok(())
    }
}
