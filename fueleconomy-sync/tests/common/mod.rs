//! Shared integration test helpers for fueleconomy-sync.
//!
//! Provides an in-memory [`FakeServer`] implementing `DatasetSource` with
//! real conditional-request semantics, plus fixture builders for vehicles
//! tables and zip archives.
//!
//! Include this module at the top of each test file that needs it:
//!
//! ```ignore
//! mod common;
//! use common::{FakeServer, vehicles_csv, zip_bytes};
//! ```

#![allow(dead_code)]

use fueleconomy_sync::{
    CancelToken, ConditionalRequest, DatasetSource, RemoteResponse, STAGING_PREFIX, SyncError,
    ValidationTokens, normalize_last_modified,
};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;
use zip::write::SimpleFileOptions;

pub const URL: &str = "https://fake.example.org/feg/epadata/vehicles.csv.zip";

pub const HEADER: &str = "make,model,year,UCity,UHighway,co2TailpipeGpm";

/// Build a vehicles table with the required header and the given rows.
pub fn vehicles_csv(rows: &[(&str, &str, u32)]) -> String {
    let mut table = format!("{HEADER}\n");
    for (i, (make, model, year)) in rows.iter().enumerate() {
        table.push_str(&format!(
            "{make},{model},{year},{}.5,{}.0,{}.25\n",
            20 + i,
            30 + i,
            300 + i
        ));
    }
    table
}

/// Zip the given `(name, content)` entries in order.
pub fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .expect("start zip entry");
        writer.write_all(content.as_bytes()).expect("write zip entry");
    }
    writer.finish().expect("finish zip").into_inner()
}

/// How the fake server answers the next requests.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Honour preconditions like a real server.
    Normal,
    /// Always answer with this status.
    Status(u16),
    /// Fail before any response arrives.
    Unreachable,
    /// Declare more bytes than the body carries.
    Truncate { missing: u64 },
    /// Deliver this many bytes, then fail the connection.
    FailAfter(usize),
    /// Trigger the token while the body is being read.
    CancelDuringBody(CancelToken),
}

#[derive(Debug, Clone)]
struct Published {
    etag: Option<String>,
    last_modified: Option<String>,
    archive: Vec<u8>,
}

/// In-memory stand-in for the dataset host.
pub struct FakeServer {
    published: Mutex<Published>,
    behavior: Mutex<Behavior>,
    requests: Mutex<Vec<ConditionalRequest>>,
}

impl FakeServer {
    pub fn new(etag: Option<&str>, last_modified: Option<&str>, archive: Vec<u8>) -> Self {
        Self {
            published: Mutex::new(Published {
                etag: etag.map(str::to_string),
                last_modified: last_modified.map(str::to_string),
                archive,
            }),
            behavior: Mutex::new(Behavior::Normal),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Server publishing a single-entry archive holding `table`.
    pub fn with_table(etag: &str, last_modified: &str, table: &str) -> Self {
        Self::new(
            Some(etag),
            Some(last_modified),
            zip_bytes(&[("vehicles.csv", table)]),
        )
    }

    /// Publish a new dataset version.
    pub fn publish(&self, etag: Option<&str>, last_modified: Option<&str>, archive: Vec<u8>) {
        *self.published.lock().unwrap() = Published {
            etag: etag.map(str::to_string),
            last_modified: last_modified.map(str::to_string),
            archive,
        };
    }

    pub fn set_behavior(&self, behavior: Behavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn requests(&self) -> Vec<ConditionalRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> ConditionalRequest {
        self.requests().pop().expect("no request was made")
    }

    fn is_not_modified(published: &Published, request: &ConditionalRequest) -> bool {
        // If-None-Match takes precedence over If-Modified-Since
        if let Some(etag) = &request.etag {
            return published.etag.as_deref() == Some(etag.as_str());
        }
        match (&request.last_modified, &published.last_modified) {
            (Some(since), Some(current)) => {
                let since = normalize_last_modified(since);
                since.is_some() && since == normalize_last_modified(&current.as_str().into())
            }
            _ => false,
        }
    }
}

impl DatasetSource for FakeServer {
    fn location(&self) -> &str {
        URL
    }

    fn fetch(&self, request: &ConditionalRequest) -> Result<RemoteResponse, SyncError> {
        self.requests.lock().unwrap().push(request.clone());
        let published = self.published.lock().unwrap().clone();
        let behavior = self.behavior.lock().unwrap().clone();

        let declared = published.archive.len() as u64;
        let tokens = ValidationTokens {
            etag: published.etag.clone(),
            last_modified: published.last_modified.clone(),
        };

        let (content_length, body): (u64, Box<dyn Read>) = match behavior {
            Behavior::Status(status) => {
                return Err(SyncError::Unexpected {
                    url: URL.to_string(),
                    status,
                });
            }
            Behavior::Unreachable => {
                return Err(SyncError::Unreachable {
                    url: URL.to_string(),
                    reason: "connection refused".to_string(),
                });
            }
            Behavior::Normal if Self::is_not_modified(&published, request) => {
                return Ok(RemoteResponse::NotModified);
            }
            Behavior::Normal => (declared, Box::new(Cursor::new(published.archive))),
            Behavior::Truncate { missing } => {
                (declared + missing, Box::new(Cursor::new(published.archive)))
            }
            Behavior::FailAfter(limit) => (
                declared,
                Box::new(FailingReader {
                    inner: Cursor::new(published.archive),
                    remaining: limit,
                }),
            ),
            Behavior::CancelDuringBody(token) => (
                declared,
                Box::new(CancellingReader {
                    inner: Cursor::new(published.archive),
                    token,
                }),
            ),
        };

        Ok(RemoteResponse::Modified {
            tokens,
            content_length: Some(content_length),
            body,
        })
    }
}

/// Yields at most `remaining` bytes, then a connection error.
struct FailingReader {
    inner: Cursor<Vec<u8>>,
    remaining: usize,
}

impl Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            ));
        }
        let want = buf.len().min(self.remaining);
        let read = self.inner.read(&mut buf[..want])?;
        self.remaining -= read;
        Ok(read)
    }
}

/// Hands out a few bytes per read and cancels the token on the first one.
struct CancellingReader {
    inner: Cursor<Vec<u8>>,
    token: CancelToken,
}

impl Read for CancellingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.token.cancel();
        let want = buf.len().min(16);
        self.inner.read(&mut buf[..want])
    }
}

/// Staging directories left behind in `dir`.
pub fn staging_dirs(dir: &Path) -> Vec<PathBuf> {
    fs::read_dir(dir)
        .expect("read target dir")
        .map(|entry| entry.expect("dir entry").path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(STAGING_PREFIX))
        })
        .collect()
}

/// Every file in `dir` with its content and modification time.
pub fn snapshot(dir: &Path) -> BTreeMap<String, (Vec<u8>, SystemTime)> {
    fs::read_dir(dir)
        .expect("read target dir")
        .map(|entry| entry.expect("dir entry").path())
        .filter(|path| path.is_file())
        .map(|path| {
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            let content = fs::read(&path).expect("read file");
            let modified = fs::metadata(&path).and_then(|m| m.modified()).expect("mtime");
            (name, (content, modified))
        })
        .collect()
}

/// Seed `dir` with a live dataset and its validators.
pub fn seed(dir: &Path, table: &str, etag: Option<&str>, last_modified: Option<&str>) {
    fs::create_dir_all(dir).expect("create target dir");
    fs::write(dir.join("vehicles.csv"), table).expect("write dataset");
    if let Some(etag) = etag {
        fs::write(dir.join("vehicles.etag"), etag).expect("write etag");
    }
    if let Some(last_modified) = last_modified {
        fs::write(dir.join("vehicles.last_modified"), last_modified).expect("write last_modified");
    }
}

/// Number of data rows (header excluded) in the live dataset.
pub fn data_rows(dir: &Path) -> usize {
    let table = fs::read_to_string(dir.join("vehicles.csv")).expect("read dataset");
    table.lines().skip(1).filter(|line| !line.is_empty()).count()
}
