//! Configuration resolution for Domino.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/domino/settings.json)
//! 3. Explicit config file (`--config`)
//! 4. Environment variables
//! 5. CLI arguments (highest priority, applied by the binary)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;

use crate::error::{Error, Result};
use crate::schedule::CommissionSchedule;

/// Complete Domino configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub engine: CommissionSchedule,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    pub database_path: Option<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_level: String,
    pub log_json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

/// Load configuration with hierarchical resolution.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let mut config = Config::default();

    if let Some(global_path) = global_config_path() {
        if global_path.exists() {
            let global = load_config_file(&global_path)?;
            merge_config(&mut config, global);
        }
    }

    if let Some(path) = explicit {
        let file = load_config_file(path)?;
        merge_config(&mut config, file);
    }

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;

    config.engine.validate()?;
    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("settings.json"))
}

/// Get the default database path.
pub fn database_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("domino.db"))
}

fn config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .ok()
            .map(|h| PathBuf::from(h).join(".domino"))
    }
    #[cfg(target_os = "macos")]
    {
        std::env::var("HOME")
            .ok()
            .map(|h| PathBuf::from(h).join("Library/Application Support/domino"))
    }
    #[cfg(target_os = "linux")]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".config")))
            .map(|p| p.join("domino"))
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        None
    }
}

fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

fn merge_config(base: &mut Config, overlay: Config) {
    base.engine = overlay.engine;

    if overlay.storage.database_path.is_some() {
        base.storage.database_path = overlay.storage.database_path;
    }

    base.logging = overlay.logging;
}

fn apply_env_overrides(
    config: &mut Config,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(val) = lookup("DOMINO_MIN_DEPOSIT") {
        config.engine.min_qualifying_deposit = parse_env_decimal("DOMINO_MIN_DEPOSIT", &val)?;
    }
    if let Some(val) = lookup("DOMINO_BASE_RATE") {
        config.engine.base_rate = parse_env_decimal("DOMINO_BASE_RATE", &val)?;
    }
    if let Some(val) = lookup("DOMINO_MAX_CHAIN_DEPTH") {
        config.engine.max_chain_depth = val.parse().map_err(|e| {
            Error::Config(format!("DOMINO_MAX_CHAIN_DEPTH={val:?}: {e}"))
        })?;
    }
    if let Some(val) = lookup("DOMINO_DB_PATH") {
        config.storage.database_path = Some(PathBuf::from(val));
    }
    if let Some(val) = lookup("DOMINO_LOG_LEVEL") {
        config.logging.log_level = val;
    }
    Ok(())
}

fn parse_env_decimal(key: &str, val: &str) -> Result<Decimal> {
    val.trim()
        .parse()
        .map_err(|e| Error::Config(format!("{key}={val:?}: {e}")))
}
