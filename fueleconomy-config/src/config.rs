//! The [`Config`] struct and its validation rules.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Settings for keeping the local vehicles dataset in sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// URL of the zipped vehicles table
    #[serde(default = "crate::defaults::dataset_url")]
    pub dataset_url: String,

    /// Directory holding `vehicles.csv` and its validator sidecars.
    /// When unset, [`Config::default_dataset_dir`] is used.
    #[serde(default)]
    pub dataset_dir: Option<PathBuf>,

    /// Value sent in the `User-Agent` header
    #[serde(default = "crate::defaults::user_agent")]
    pub user_agent: String,

    /// Global timeout for the whole conditional request, body included
    #[serde(default = "crate::defaults::http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Upper bound on the downloaded archive size
    #[serde(default = "crate::defaults::max_download_bytes")]
    pub max_download_bytes: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dataset_url: crate::defaults::dataset_url(),
            dataset_dir: None,
            user_agent: crate::defaults::user_agent(),
            http_timeout_secs: crate::defaults::http_timeout_secs(),
            max_download_bytes: crate::defaults::max_download_bytes(),
        }
    }
}

impl Config {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the directory the dataset is kept in
    pub fn with_dataset_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dataset_dir = Some(dir.into());
        self
    }

    /// Set the dataset URL
    pub fn with_dataset_url(mut self, url: impl Into<String>) -> Self {
        self.dataset_url = url.into();
        self
    }

    /// The directory the synchronizer writes into.
    pub fn effective_dataset_dir(&self) -> PathBuf {
        self.dataset_dir
            .clone()
            .unwrap_or_else(Self::default_dataset_dir)
    }

    /// Check field values that serde alone cannot enforce.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.dataset_url.trim();
        if url.is_empty() {
            return Err(ConfigError::Validation(
                "dataset_url must not be empty".to_string(),
            ));
        }
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(ConfigError::Validation(format!(
                "dataset_url '{url}' must use http or https"
            )));
        }
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::Validation(
                "user_agent must not be empty".to_string(),
            ));
        }
        if self.http_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "http_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.max_download_bytes == 0 {
            return Err(ConfigError::Validation(
                "max_download_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
