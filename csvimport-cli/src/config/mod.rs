//! Configuration file and per-run settings
//!
//! Settings are read from `~/.config/csvimport/config.toml` when present;
//! command-line flags override them. The merged values end up in an
//! immutable [`RunConfig`] that every import step receives by reference.

mod run;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::import::DEFAULT_DATE_FORMAT;

pub use run::{RunConfig, RunConfigBuilder};

/// Name of the application directory under the user config dir
const APP_DIR: &str = "csvimport";

/// Settings loaded from the config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model imported into when none is given
    pub default_model: Option<String>,
    /// Schema definition file
    pub schema_path: Option<PathBuf>,
    /// Store snapshot file
    pub store_path: Option<PathBuf>,
    /// Audit log file (one JSON object per run)
    pub audit_log_path: Option<PathBuf>,
    /// chrono format used to parse date cells
    pub date_format: String,
    /// Identity recorded in audit records
    pub import_user: String,
    /// Trigger recorded in audit records
    pub upload_method: String,
    /// Look up existing records before creating new ones
    pub deduplicate: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_model: None,
            schema_path: None,
            store_path: None,
            audit_log_path: None,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            import_user: "cron".to_string(),
            upload_method: "cronjob".to_string(),
            deduplicate: true,
        }
    }
}

impl Config {
    /// Application config directory (~/.config/csvimport/)
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }

    /// Default config file location
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load the default config file, or defaults if it does not exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load a config file, or defaults if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Schema file, defaulting to schema.toml in the config dir
    pub fn schema_path(&self) -> PathBuf {
        self.schema_path
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("schema.toml"))
    }

    /// Store snapshot, defaulting to store.json in the config dir
    pub fn store_path(&self) -> PathBuf {
        self.store_path
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("store.json"))
    }

    /// Audit log, defaulting to imports.jsonl in the config dir
    pub fn audit_log_path(&self) -> PathBuf {
        self.audit_log_path
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("imports.jsonl"))
    }
}
