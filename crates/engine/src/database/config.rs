//! Database configuration via `tessera.toml`
//!
//! A database opened on a directory reads `tessera.toml` from it, creating a
//! commented default on first open. To change settings, edit the file and
//! reopen. In-memory databases take a `TesseraConfig` directly.

use serde::{Deserialize, Serialize};
use std::path::Path;

use tessera_core::{Error, Limits, Result};

/// Config file name placed in the database data directory.
pub const CONFIG_FILE_NAME: &str = "tessera.toml";

/// Garbage collection settings, persisted under `[gc]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GcConfig {
    /// Run the background GC worker (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Milliseconds between sweeps (default: 1000)
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Data keys deleted per sweep; 0 means unbounded (default: 256)
    #[serde(default = "default_batch_limit")]
    pub batch_limit: usize,
    /// Also prune superseded versions below the oldest live snapshot (default: true)
    #[serde(default = "default_true")]
    pub prune_versions: bool,
}

fn default_true() -> bool {
    true
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_batch_limit() -> usize {
    256
}

fn default_scan_batch_size() -> usize {
    256
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: default_interval_ms(),
            batch_limit: default_batch_limit(),
            prune_versions: true,
        }
    }
}

/// Database configuration loaded from `tessera.toml`.
///
/// # Example
///
/// ```toml
/// scan_batch_size = 256
///
/// [limits]
/// max_key_bytes = 1024
///
/// [gc]
/// enabled = true
/// interval_ms = 1000
/// batch_limit = 256
/// prune_versions = true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TesseraConfig {
    /// Entries fetched per cursor batch (default: 256, must be > 0)
    #[serde(default = "default_scan_batch_size")]
    pub scan_batch_size: usize,
    /// Key size limits
    #[serde(default)]
    pub limits: Limits,
    /// Garbage collection settings
    #[serde(default)]
    pub gc: GcConfig,
}

impl Default for TesseraConfig {
    fn default() -> Self {
        Self {
            scan_batch_size: default_scan_batch_size(),
            limits: Limits::default(),
            gc: GcConfig::default(),
        }
    }
}

impl TesseraConfig {
    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for a zero batch size, key limit or interval.
    pub fn validate(&self) -> Result<()> {
        if self.scan_batch_size == 0 {
            return Err(Error::Config("scan_batch_size must be greater than 0".into()));
        }
        if self.limits.max_key_bytes == 0 {
            return Err(Error::Config("limits.max_key_bytes must be greater than 0".into()));
        }
        if self.gc.interval_ms == 0 {
            return Err(Error::Config("gc.interval_ms must be greater than 0".into()));
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Tessera database configuration
#
# Entries fetched per cursor batch when scanning a collection (default: 256)
scan_batch_size = 256

[limits]
# Maximum user key length in bytes (default: 1024)
max_key_bytes = 1024

[gc]
# Run the background garbage collector (default: true)
enabled = true
# Milliseconds between sweeps (default: 1000)
interval_ms = 1000
# Data keys deleted per sweep; 0 = unbounded (default: 256)
batch_limit = 256
# Prune superseded versions no live snapshot can see (default: true)
prune_versions = true
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: TesseraConfig = toml::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::Config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::Config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
