//! Typed error types for fueleconomy-sync.
//!
//! Every failure a sync attempt can hit maps to one [`SyncError`] variant, and
//! every variant maps to one coarse [`SyncErrorKind`] so callers can decide
//! whether to retry without matching on details.

use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a [`SyncError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncErrorKind {
    /// Network or transport failure; the remote could not be read completely.
    Unreachable,
    /// The remote answered with something other than 200 or 304.
    Unexpected,
    /// The payload did not contain a usable dataset table.
    MalformedArchive,
    /// Staging, extraction or rename failed on the local filesystem.
    IoFailure,
    /// A validator sidecar could not be read or written.
    ValidatorIoFailure,
    /// The caller cancelled the attempt before the dataset was replaced.
    Cancelled,
}

/// Errors produced by a sync attempt.
///
/// Any error returned from [`crate::SyncEngine::sync`] means the live dataset
/// and its validator sidecars are exactly as they were before the call.
#[derive(Debug, Error)]
pub enum SyncError {
    // -----------------------------------------------------------------------
    // Remote
    // -----------------------------------------------------------------------
    /// The request could not be sent, or the body could not be read.
    #[error("Failed to reach '{url}': {reason}")]
    Unreachable {
        /// URL that was requested.
        url: String,
        /// Transport error description.
        reason: String,
    },

    /// The server answered with a status other than 200 or 304.
    #[error("Unexpected HTTP status {status} from '{url}'")]
    Unexpected {
        /// URL that was requested.
        url: String,
        /// Status code received.
        status: u16,
    },

    /// The body ended before the declared `Content-Length`.
    #[error("Download truncated: expected {expected} bytes, received {received}")]
    Truncated {
        /// Declared body length.
        expected: u64,
        /// Bytes actually received.
        received: u64,
    },

    /// The configured dataset URL is not acceptable.
    #[error("Invalid dataset URL: {0}")]
    InvalidUrl(String),

    /// A sync setting other than the URL is unusable.
    #[error("Invalid sync settings: {0}")]
    InvalidConfig(#[source] fueleconomy_config::ConfigError),

    // -----------------------------------------------------------------------
    // Payload
    // -----------------------------------------------------------------------
    /// The archive could not be opened, or no single entry could be chosen.
    #[error("Malformed archive: {0}")]
    MalformedArchive(String),

    /// The chosen entry is not a usable vehicles table.
    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    // -----------------------------------------------------------------------
    // Local filesystem
    // -----------------------------------------------------------------------
    /// A staging write, extraction or rename failed.
    #[error("{context}: {source}")]
    Io {
        /// What was being attempted.
        context: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A validator sidecar could not be read or written.
    #[error("Validator file '{}' failed: {source}", .path.display())]
    ValidatorIo {
        /// Sidecar path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The attempt was cancelled before the dataset was replaced.
    #[error("Sync cancelled")]
    Cancelled,
}

impl SyncError {
    /// Coarse classification used for retry decisions.
    pub fn kind(&self) -> SyncErrorKind {
        match self {
            SyncError::Unreachable { .. } | SyncError::Truncated { .. } => {
                SyncErrorKind::Unreachable
            }
            SyncError::Unexpected { .. }
            | SyncError::InvalidUrl(_)
            | SyncError::InvalidConfig(_) => SyncErrorKind::Unexpected,
            SyncError::MalformedArchive(_) | SyncError::InvalidDataset(_) => {
                SyncErrorKind::MalformedArchive
            }
            SyncError::Io { .. } => SyncErrorKind::IoFailure,
            SyncError::ValidatorIo { .. } => SyncErrorKind::ValidatorIoFailure,
            SyncError::Cancelled => SyncErrorKind::Cancelled,
        }
    }

    /// Wrap an I/O error with a description of the step that failed.
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        SyncError::Io {
            context: context.into(),
            source,
        }
    }
}

impl From<zip::result::ZipError> for SyncError {
    fn from(e: zip::result::ZipError) -> Self {
        match e {
            zip::result::ZipError::Io(source) => SyncError::io("Failed to read archive", source),
            other => SyncError::MalformedArchive(other.to_string()),
        }
    }
}
