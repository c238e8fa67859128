//! Conditional download and atomic replacement of the EPA vehicles dataset.
//!
//! Provides:
//! - `validators`: `ETag` / `Last-Modified` sidecar persistence (`ValidatorStore`)
//! - `timestamp`: `If-Modified-Since` normalization over several time representations
//! - `http`: conditional fetch (`DatasetSource`, `HttpSource`)
//! - `archive`: dataset entry selection, extraction and header validation
//! - `sync_engine`: staging, atomic swap, and validator update ordering
//! - `cancel`: cooperative cancellation of a running sync

pub mod archive;
pub mod cancel;
pub mod error;
pub mod http;
pub mod sync_engine;
pub mod timestamp;
pub mod validators;

pub use archive::DATASET_FILE_NAME;
pub use cancel::CancelToken;
pub use error::{SyncError, SyncErrorKind};
pub use http::{ConditionalRequest, DatasetSource, HttpSource, RemoteResponse};
pub use sync_engine::{STAGING_PREFIX, SyncEngine, SyncOutcome, SyncReport};
pub use timestamp::{LastModified, normalize_last_modified};
pub use validators::{ValidationTokens, ValidatorStore};
