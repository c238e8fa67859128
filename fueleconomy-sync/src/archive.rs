//! Dataset entry selection and extraction from the downloaded zip.

use crate::error::SyncError;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, Read, Seek};
use std::path::Path;
use zip::ZipArchive;

/// Canonical name of the dataset table, inside the archive and on disk.
pub const DATASET_FILE_NAME: &str = "vehicles.csv";

/// Columns the table must name in its header row.
pub const REQUIRED_COLUMNS: &[&str] = &[
    "make",
    "model",
    "year",
    "UCity",
    "UHighway",
    "co2TailpipeGpm",
];

/// Pick the archive entry that holds the dataset and return its index.
///
/// Only file entries count. A lone file is accepted whatever its name;
/// otherwise the first file whose final path component is
/// [`DATASET_FILE_NAME`] wins. Anything else is ambiguous.
pub fn select_entry<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<usize, SyncError> {
    let mut files = Vec::new();
    for i in 0..archive.len() {
        let entry = archive.by_index(i)?;
        if !entry.is_dir() {
            files.push((i, entry.name().to_string()));
        }
    }

    if let [(index, name)] = files.as_slice() {
        log::debug!("Archive has a single entry '{}'", name);
        return Ok(*index);
    }

    files
        .iter()
        .find(|(_, name)| entry_file_name(name) == DATASET_FILE_NAME)
        .map(|(index, _)| *index)
        .ok_or_else(|| {
            let names: Vec<&str> = files.iter().map(|(_, name)| name.as_str()).collect();
            SyncError::MalformedArchive(format!(
                "expected one entry or an entry named '{}', found {:?}",
                DATASET_FILE_NAME, names
            ))
        })
}

fn entry_file_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

/// Extract the dataset entry of the zip at `archive_path` into `dest`.
///
/// `dest` is created fresh and synced to disk before returning. Returns the
/// number of bytes written.
pub fn extract_dataset(archive_path: &Path, dest: &Path) -> Result<u64, SyncError> {
    let file = File::open(archive_path)
        .map_err(|e| SyncError::io(format!("Failed to open {}", archive_path.display()), e))?;
    let mut archive = ZipArchive::new(file)?;

    let index = select_entry(&mut archive)?;
    let mut entry = archive.by_index(index)?;
    log::info!(
        "Extracting '{}' ({} bytes) to {}",
        entry.name(),
        entry.size(),
        dest.display()
    );

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| SyncError::io(format!("Failed to create {}", parent.display()), e))?;
    }

    let mut outfile = File::create(dest)
        .map_err(|e| SyncError::io(format!("Failed to create {}", dest.display()), e))?;
    let written = io::copy(&mut entry, &mut outfile).map_err(|e| match e.kind() {
        // Corrupt compressed data or a CRC mismatch surfaces as InvalidData
        io::ErrorKind::InvalidData => {
            SyncError::MalformedArchive(format!("Failed to decompress '{}': {}", entry.name(), e))
        }
        _ => SyncError::io(format!("Failed to write {}", dest.display()), e),
    })?;
    outfile
        .sync_all()
        .map_err(|e| SyncError::io(format!("Failed to sync {}", dest.display()), e))?;

    Ok(written)
}

/// Check that `path` holds a non-empty table with the required header columns.
pub fn validate_dataset(path: &Path) -> Result<(), SyncError> {
    let file = File::open(path)
        .map_err(|e| SyncError::io(format!("Failed to open {}", path.display()), e))?;

    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(file);
    let headers = reader
        .headers()
        .map_err(|e| SyncError::InvalidDataset(format!("unreadable header row: {e}")))?;

    if headers.is_empty() || headers.iter().all(str::is_empty) {
        return Err(SyncError::InvalidDataset("table is empty".to_string()));
    }

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|column| !headers.iter().any(|header| header.trim() == *column))
        .collect();
    if !missing.is_empty() {
        return Err(SyncError::InvalidDataset(format!(
            "header row is missing columns {:?}",
            missing
        )));
    }

    Ok(())
}

/// Compute the SHA256 hash of a file as lowercase hex.
pub fn compute_file_hash(path: &Path) -> Result<String, SyncError> {
    let mut file = File::open(path)
        .map_err(|e| SyncError::io(format!("Failed to open {}", path.display()), e))?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|e| SyncError::io(format!("Failed to read {}", path.display()), e))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}
