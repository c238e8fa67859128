//! Dataset synchronization: conditional fetch, staging, atomic swap.
//!
//! One call to [`SyncEngine::sync`] runs the whole protocol against a target
//! directory:
//! 1. load the stored validators ([`crate::validators`])
//! 2. issue a conditional request ([`crate::http`])
//! 3. on 200, stream the archive into a private staging directory inside
//!    the target directory, then extract and validate the table ([`crate::archive`])
//! 4. rename the table over `vehicles.csv`
//! 5. store the new validators, then remove the staging directory
//!
//! Nothing visible at the canonical paths changes before step 4, and the
//! validators are never newer than the data they describe.

use crate::archive::{DATASET_FILE_NAME, compute_file_hash, extract_dataset, validate_dataset};
use crate::cancel::CancelToken;
use crate::error::SyncError;
use crate::http::{ConditionalRequest, DatasetSource, HttpSource, RemoteResponse};
use crate::validators::{ValidationTokens, ValidatorStore};
use fueleconomy_config::Config;
use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

/// Name prefix of the per-attempt staging directories.
pub const STAGING_PREFIX: &str = ".vehicles-sync-";

/// Download buffer size; cancellation is polled once per chunk.
const CHUNK_SIZE: usize = 64 * 1024;

/// Staged archive file name inside the staging directory.
const DOWNLOAD_FILE_NAME: &str = "download.zip";

/// Subdirectory of the staging directory the table is extracted into.
const EXTRACT_DIR_NAME: &str = "extracted";

/// Details of a dataset replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Canonical path of the dataset that was replaced
    pub dataset_path: PathBuf,
    /// Validators now stored for the dataset
    pub tokens: ValidationTokens,
    /// Size of the downloaded archive
    pub downloaded_bytes: u64,
    /// Size of the installed table
    pub dataset_bytes: u64,
    /// SHA256 of the installed table
    pub sha256: String,
}

/// Result of a sync attempt that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The server reported the cached dataset as current.
    Unchanged,
    /// A new dataset was installed.
    Updated(SyncReport),
}

impl SyncOutcome {
    /// Whether the live dataset changed.
    pub fn changed(&self) -> bool {
        matches!(self, SyncOutcome::Updated(_))
    }
}

/// Keeps a local copy of the dataset in step with its source.
pub struct SyncEngine<S = HttpSource> {
    source: S,
}

impl SyncEngine<HttpSource> {
    /// Engine fetching over HTTP as configured.
    pub fn from_config(config: &Config) -> Result<Self, SyncError> {
        Ok(Self::new(HttpSource::new(config)?))
    }
}

impl<S: DatasetSource> SyncEngine<S> {
    /// Engine fetching from `source`.
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// The source this engine fetches from.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Bring the dataset in `target_dir` up to date.
    ///
    /// Returns [`SyncOutcome::Unchanged`] when the server answers "not
    /// modified". On any error the dataset and its validators are left
    /// exactly as they were.
    pub fn sync(&self, target_dir: &Path) -> Result<SyncOutcome, SyncError> {
        self.sync_with_cancel(target_dir, &CancelToken::new())
    }

    /// [`Self::sync`], abandoning the attempt once `cancel` is triggered.
    ///
    /// Cancellation is honoured up to the moment the new dataset is renamed
    /// into place and takes the same cleanup path as any other failure.
    pub fn sync_with_cancel(
        &self,
        target_dir: &Path,
        cancel: &CancelToken,
    ) -> Result<SyncOutcome, SyncError> {
        cancel.check()?;

        fs::create_dir_all(target_dir)
            .map_err(|e| SyncError::io(format!("Failed to create {}", target_dir.display()), e))?;

        let store = ValidatorStore::new(target_dir);
        let tokens = store.load();
        if tokens.is_empty() {
            log::info!("No validators in {}, treating dataset as stale", target_dir.display());
        }

        let request = ConditionalRequest::from_tokens(&tokens);
        let (new_tokens, content_length, mut body) = match self.source.fetch(&request)? {
            RemoteResponse::NotModified => {
                log::info!(
                    "Dataset in {} is current (etag={:?}, last_modified={:?})",
                    target_dir.display(),
                    tokens.etag,
                    tokens.last_modified
                );
                return Ok(SyncOutcome::Unchanged);
            }
            RemoteResponse::Modified {
                tokens,
                content_length,
                body,
            } => (tokens, content_length, body),
        };
        log::info!("Response says {} has new data", self.source.location());

        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(target_dir)
            .map_err(|e| {
                SyncError::io(
                    format!("Failed to create staging directory in {}", target_dir.display()),
                    e,
                )
            })?;
        log::debug!("Staging in {}", staging.path().display());

        let outcome = self
            .stage_and_swap(staging.path(), target_dir, content_length, &mut body, cancel)
            .map(|mut report| {
                // The new dataset is live; validators follow it, never precede it.
                if let Err(e) = store.save(&new_tokens) {
                    log::error!(
                        "Dataset replaced but validators not saved; next sync will re-download: {e}"
                    );
                }
                report.tokens = new_tokens;
                SyncOutcome::Updated(report)
            });

        drop(body);
        let staging_path = staging.path().to_path_buf();
        match staging.close() {
            Ok(()) => log::debug!("Erased {}", staging_path.display()),
            Err(e) => log::warn!("Failed to erase {}: {}", staging_path.display(), e),
        }

        if let Ok(SyncOutcome::Updated(report)) = &outcome {
            log::info!(
                "Installed {} ({} bytes, sha256 {})",
                report.dataset_path.display(),
                report.dataset_bytes,
                report.sha256
            );
        }
        outcome
    }

    /// Download, extract, validate and publish. The rename is the last step;
    /// every failure before it leaves the canonical paths untouched.
    fn stage_and_swap(
        &self,
        staging_dir: &Path,
        target_dir: &Path,
        content_length: Option<u64>,
        body: &mut dyn Read,
        cancel: &CancelToken,
    ) -> Result<SyncReport, SyncError> {
        let download_path = staging_dir.join(DOWNLOAD_FILE_NAME);
        let downloaded_bytes = self.download(body, &download_path, content_length, cancel)?;
        log::info!("Downloaded {} bytes to {}", downloaded_bytes, download_path.display());

        cancel.check()?;
        let extracted_path = staging_dir.join(EXTRACT_DIR_NAME).join(DATASET_FILE_NAME);
        let dataset_bytes = extract_dataset(&download_path, &extracted_path)?;
        validate_dataset(&extracted_path)?;
        let sha256 = compute_file_hash(&extracted_path)?;

        cancel.check()?;
        let dataset_path = target_dir.join(DATASET_FILE_NAME);
        fs::rename(&extracted_path, &dataset_path).map_err(|e| {
            SyncError::io(
                format!(
                    "Failed to move {} to {}",
                    extracted_path.display(),
                    dataset_path.display()
                ),
                e,
            )
        })?;
        sync_dir(target_dir);

        Ok(SyncReport {
            dataset_path,
            tokens: ValidationTokens::default(),
            downloaded_bytes,
            dataset_bytes,
            sha256,
        })
    }

    /// Stream `body` into `dest` until end-of-stream.
    fn download(
        &self,
        body: &mut dyn Read,
        dest: &Path,
        content_length: Option<u64>,
        cancel: &CancelToken,
    ) -> Result<u64, SyncError> {
        let mut file = File::create(dest)
            .map_err(|e| SyncError::io(format!("Failed to create {}", dest.display()), e))?;
        let mut buffer = vec![0u8; CHUNK_SIZE];
        let mut received: u64 = 0;

        loop {
            cancel.check()?;
            let read = match body.read(&mut buffer) {
                Ok(0) => break,
                Ok(read) => read,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(SyncError::Unreachable {
                        url: self.source.location().to_string(),
                        reason: format!("body read failed after {} bytes: {}", received, e),
                    });
                }
            };
            file.write_all(&buffer[..read])
                .map_err(|e| SyncError::io(format!("Failed to write {}", dest.display()), e))?;
            received += read as u64;
        }

        if let Some(expected) = content_length {
            if received < expected {
                return Err(SyncError::Truncated { expected, received });
            }
            if received > expected {
                log::warn!(
                    "Received {} bytes but Content-Length was {}",
                    received,
                    expected
                );
            }
        }

        file.sync_all()
            .map_err(|e| SyncError::io(format!("Failed to sync {}", dest.display()), e))?;
        Ok(received)
    }
}

/// Flush the directory entry of a rename to disk. Failure is logged only.
fn sync_dir(dir: &Path) {
    #[cfg(unix)]
    {
        if let Err(e) = File::open(dir).and_then(|d| d.sync_all()) {
            log::warn!("Failed to sync directory {}: {}", dir.display(), e);
        }
    }
    #[cfg(not(unix))]
    {
        let _ = dir;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_changed() {
        assert!(!SyncOutcome::Unchanged.changed());
        let report = SyncReport {
            dataset_path: PathBuf::from("vehicles.csv"),
            tokens: ValidationTokens::default(),
            downloaded_bytes: 10,
            dataset_bytes: 20,
            sha256: String::new(),
        };
        assert!(SyncOutcome::Updated(report).changed());
    }

    #[test]
    fn test_from_config_rejects_bad_url() {
        let config = Config::new().with_dataset_url("file:///tmp/vehicles.csv.zip");
        assert!(matches!(
            SyncEngine::from_config(&config),
            Err(SyncError::InvalidUrl(_))
        ));
    }
}
