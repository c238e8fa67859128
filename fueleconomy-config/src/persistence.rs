//! Config persistence and path resolution for `Config`.
//!
//! Covers:
//! - `load` / `save` (YAML file I/O with atomic write)
//! - XDG-compliant path helpers (`config_path`, `config_dir`, `default_dataset_dir`)

use crate::config::Config;
use crate::error::ConfigError;
use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Per-user directory name under the platform config and data roots.
const APP_DIR_NAME: &str = "fueleconomy";

const CONFIG_FILE_NAME: &str = "config.yaml";

#[cfg(target_os = "windows")]
fn config_base_dir() -> Option<PathBuf> {
    dirs::config_dir()
}

#[cfg(not(target_os = "windows"))]
fn config_base_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .filter(|dir| dir.is_absolute())
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
}

impl Config {
    /// Load configuration from the default path, or fall back to defaults
    /// when no config file exists yet.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();
        log::info!("Config path: {:?}", config_path);

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            log::info!(
                "Config file not found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load and validate configuration from an explicit file.
    pub fn load_from(path: &Path) -> Result<Self> {
        log::info!("Loading config from {:?}", path);

        let contents = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        let config: Config =
            serde_yaml_ng::from_str(&contents).map_err(|e| ConfigError::parse(path, e))?;

        if let Err(e) = config.validate() {
            log::error!("Config validation failed for {:?}: {e}", path);
            return Err(e.into());
        }

        Ok(config)
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to an explicit file.
    ///
    /// The YAML is written next to the target and renamed over it, so a
    /// reader never sees a half-written file.
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::io(parent, e))?;
        }

        let yaml = serde_yaml_ng::to_string(self).map_err(ConfigError::Serialize)?;

        let temp_path = config_path.with_extension("yaml.tmp");
        fs::write(&temp_path, &yaml).map_err(|e| ConfigError::io(&temp_path, e))?;
        fs::rename(&temp_path, config_path).map_err(|e| ConfigError::io(config_path, e))?;
        log::info!("Saved config to {:?}", config_path);

        Ok(())
    }

    /// `config.yaml` inside [`Config::config_dir`].
    pub fn config_path() -> PathBuf {
        Self::config_dir().join(CONFIG_FILE_NAME)
    }

    /// Directory holding `config.yaml`.
    ///
    /// `$XDG_CONFIG_HOME/fueleconomy` when that is set to an absolute path,
    /// otherwise `~/.config/fueleconomy`. Windows uses the roaming app data
    /// directory. Falls back to the working directory without a home.
    pub fn config_dir() -> PathBuf {
        config_base_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME)
    }

    /// Where the dataset lives when `dataset_dir` is not configured.
    pub fn default_dataset_dir() -> PathBuf {
        match dirs::data_dir() {
            Some(data_dir) => data_dir.join(APP_DIR_NAME),
            None => Self::config_dir().join("data"),
        }
    }
}
