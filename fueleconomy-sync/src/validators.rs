//! Validator sidecar persistence.
//!
//! The `ETag` and `Last-Modified` values that describe the live dataset are
//! kept verbatim in two small files next to it. Reading is best effort: any
//! problem degrades to "no validator", which only costs a redundant download.

use crate::error::SyncError;
use std::fs;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// File name of the ETag sidecar.
pub const ETAG_FILE_NAME: &str = "vehicles.etag";

/// File name of the Last-Modified sidecar.
pub const LAST_MODIFIED_FILE_NAME: &str = "vehicles.last_modified";

/// Upper bound on how much of a sidecar is read.
const MAX_SIDECAR_BYTES: u64 = 2048;

/// Cache-validation tokens for one dataset version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationTokens {
    /// Opaque version tag (`ETag`), compared for exact equality only.
    pub etag: Option<String>,
    /// `Last-Modified` header value, stored as received.
    pub last_modified: Option<String>,
}

impl ValidationTokens {
    /// No prior state; the dataset must be treated as stale.
    pub fn is_empty(&self) -> bool {
        self.etag.is_none() && self.last_modified.is_none()
    }
}

/// Which sidecar a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sidecar {
    /// `vehicles.etag`
    ETag,
    /// `vehicles.last_modified`
    LastModified,
}

impl Sidecar {
    /// File name inside the dataset directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            Sidecar::ETag => ETAG_FILE_NAME,
            Sidecar::LastModified => LAST_MODIFIED_FILE_NAME,
        }
    }
}

/// File-backed store for the validators of the dataset in one directory.
#[derive(Debug, Clone)]
pub struct ValidatorStore {
    dir: PathBuf,
}

impl ValidatorStore {
    /// Store for the dataset kept in `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory the sidecars live in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path of one sidecar.
    pub fn path(&self, sidecar: Sidecar) -> PathBuf {
        self.dir.join(sidecar.file_name())
    }

    /// Read both validators. Never fails: unreadable sidecars count as absent.
    pub fn load(&self) -> ValidationTokens {
        ValidationTokens {
            etag: self.read_or_absent(Sidecar::ETag),
            last_modified: self.read_or_absent(Sidecar::LastModified),
        }
    }

    fn read_or_absent(&self, sidecar: Sidecar) -> Option<String> {
        match self.read_sidecar(sidecar) {
            Ok(Some(value)) => {
                log::info!("{}: {}", sidecar.file_name(), value);
                Some(value)
            }
            Ok(None) => None,
            Err(e) => {
                log::warn!("Problem reading validator, assuming stale: {e}");
                None
            }
        }
    }

    /// Read one sidecar.
    ///
    /// `Ok(None)` means the sidecar is missing or blank. Unreadable content,
    /// including non-UTF-8 bytes, is an error.
    pub fn read_sidecar(&self, sidecar: Sidecar) -> Result<Option<String>, SyncError> {
        let path = self.path(sidecar);
        let file = match fs::File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("No validator at {}", path.display());
                return Ok(None);
            }
            Err(source) => return Err(SyncError::ValidatorIo { path, source }),
        };

        let mut content = String::new();
        if let Err(source) = file.take(MAX_SIDECAR_BYTES).read_to_string(&mut content) {
            return Err(SyncError::ValidatorIo { path, source });
        }

        let trimmed = content.trim();
        if trimmed.is_empty() {
            Ok(None)
        } else {
            Ok(Some(trimmed.to_string()))
        }
    }

    /// Persist `tokens` as the validators of the live dataset.
    ///
    /// Call only after the dataset they describe is in place. A `None` field
    /// removes that sidecar so a stale value cannot outlive its dataset.
    pub fn save(&self, tokens: &ValidationTokens) -> Result<(), SyncError> {
        self.write_sidecar(Sidecar::ETag, tokens.etag.as_deref())?;
        self.write_sidecar(Sidecar::LastModified, tokens.last_modified.as_deref())?;
        Ok(())
    }

    fn write_sidecar(&self, sidecar: Sidecar, value: Option<&str>) -> Result<(), SyncError> {
        let path = self.path(sidecar);

        let Some(value) = value else {
            return match fs::remove_file(&path) {
                Ok(()) => {
                    log::info!("Removed stale validator {}", path.display());
                    Ok(())
                }
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(source) => Err(SyncError::ValidatorIo { path, source }),
            };
        };

        // Write to a private temp file first, then rename so the sidecar is never half-written
        let written = NamedTempFile::new_in(&self.dir)
            .and_then(|mut temp| temp.write_all(value.as_bytes()).map(|()| temp))
            .and_then(|temp| temp.persist(&path).map_err(|e| e.error));
        if let Err(source) = written {
            return Err(SyncError::ValidatorIo { path, source });
        }

        log::info!("Wrote validator {} to {}", value, path.display());
        Ok(())
    }
}
