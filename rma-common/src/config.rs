//! Configuration loading and resolution
//!
//! Settings are resolved in priority order:
//! 1. Command-line argument or environment variable (clap handles both)
//! 2. TOML config file
//! 3. Compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default database URL when nothing else is configured
pub const DEFAULT_DATABASE_URL: &str = "sqlite://rma.db";

/// Default folder holding the `<line>_RMA_record.xlsx` / `<line>_buffer_stock.xlsx` exports
pub const DEFAULT_DATA_DIR: &str = "data";

/// Default HTTP bind address
pub const DEFAULT_BIND: &str = "127.0.0.1";

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5000;

/// Default log filter directive
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Bootstrap configuration loaded from TOML file
///
/// Every key is optional; missing keys fall back to compiled defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// sqlx database URL (e.g. `sqlite:///var/lib/rma/rma.db`)
    #[serde(default)]
    pub database_url: Option<String>,

    /// Folder containing the spreadsheet exports
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// HTTP bind address
    #[serde(default)]
    pub bind: Option<String>,

    /// HTTP port
    #[serde(default)]
    pub port: Option<u16>,

    /// Extra column renames per data-set kind
    #[serde(default)]
    pub fields: FieldOverrides,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Extra source-label → canonical-field renames, merged over the built-in maps
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct FieldOverrides {
    #[serde(default)]
    pub rma: BTreeMap<String, String>,
    #[serde(default)]
    pub stock: BTreeMap<String, String>,
}

/// Logging configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Log level for rma crates (trace, debug, info, warn, error); RUST_LOG overrides it
    #[serde(default)]
    pub level: Option<String>,
}

impl TomlConfig {
    /// Parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
            .map_err(|e| Error::Config(format!("Invalid config {}: {}", path.display(), e)))
    }

    /// Parse TOML text
    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// Locate and load the config file.
///
/// An explicit path must exist. Without one, the per-user default
/// (`<config_dir>/rma-batch/config.toml`) is used when present; a missing
/// default file is not an error.
///
/// Returns the parsed config and the path it came from, if any.
pub fn load_config(explicit: Option<&Path>) -> Result<(TomlConfig, Option<PathBuf>)> {
    if let Some(path) = explicit {
        return Ok((TomlConfig::load(path)?, Some(path.to_path_buf())));
    }

    match default_config_path() {
        Some(path) if path.exists() => Ok((TomlConfig::load(&path)?, Some(path))),
        _ => Ok((TomlConfig::default(), None)),
    }
}

/// Per-user config file location for the current platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("rma-batch").join("config.toml"))
}

/// Values supplied on the command line (or through their env fallbacks)
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub database_url: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub bind: Option<String>,
    pub port: Option<u16>,
}

/// Fully resolved settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub data_dir: PathBuf,
    pub bind: String,
    pub port: u16,
    pub fields: FieldOverrides,
    pub log_level: String,
}

impl Settings {
    /// Merge command-line overrides over the config file over compiled defaults
    pub fn resolve(overrides: Overrides, file: TomlConfig) -> Self {
        Self {
            database_url: overrides
                .database_url
                .or(file.database_url)
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            data_dir: overrides
                .data_dir
                .or(file.data_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            bind: overrides
                .bind
                .or(file.bind)
                .unwrap_or_else(|| DEFAULT_BIND.to_string()),
            port: overrides.port.or(file.port).unwrap_or(DEFAULT_PORT),
            fields: file.fields,
            log_level: file
                .logging
                .level
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        }
    }
}
