//! Default value functions for configuration.
//!
//! Each function backs a `#[serde(default = "crate::defaults::...")]`
//! attribute on a `Config` field.

/// EPA bulk download of the complete vehicles table.
pub const DATASET_URL: &str = "https://www.fueleconomy.gov/feg/epadata/vehicles.csv.zip";

pub fn dataset_url() -> String {
    DATASET_URL.to_string()
}

pub fn user_agent() -> String {
    format!("fueleconomy/{}", env!("CARGO_PKG_VERSION"))
}

pub fn http_timeout_secs() -> u64 {
    120
}

/// The zipped table is a few megabytes; leave generous headroom.
pub fn max_download_bytes() -> u64 {
    64 * 1024 * 1024
}
