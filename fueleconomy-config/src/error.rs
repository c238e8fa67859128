//! Failures reading, writing, or checking `config.yaml`.

use std::fmt;
use std::path::{Path, PathBuf};

/// Why a configuration file could not be used.
///
/// File-level variants name the file involved so a message points the user
/// straight at it. `Config::load_from` and `Config::save_to` wrap these in
/// `anyhow::Error`; recover them with `downcast_ref::<ConfigError>()`.
#[derive(Debug)]
pub enum ConfigError {
    /// The file or its directory could not be read or written.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file is not YAML that maps onto `Config`.
    Parse {
        path: PathBuf,
        source: serde_yaml_ng::Error,
    },

    /// The settings could not be rendered as YAML.
    Serialize(serde_yaml_ng::Error),

    /// A setting has a value the synchronizer cannot work with.
    Validation(String),
}

impl ConfigError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn parse(path: &Path, source: serde_yaml_ng::Error) -> Self {
        ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        }
    }

    /// The file this error is about, when there is one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigError::Io { path, .. } | ConfigError::Parse { path, .. } => Some(path),
            ConfigError::Serialize(_) | ConfigError::Validation(_) => None,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "cannot access {}: {source}", path.display())
            }
            ConfigError::Parse { path, source } => {
                write!(f, "{} is not a valid fueleconomy config: {source}", path.display())
            }
            ConfigError::Serialize(source) => write!(f, "cannot encode settings: {source}"),
            ConfigError::Validation(msg) => write!(f, "invalid setting: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse { source, .. } | ConfigError::Serialize(source) => Some(source),
            ConfigError::Validation(_) => None,
        }
    }
}
