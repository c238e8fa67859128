//! Local cache of the EPA fuel economy dataset.
//!
//! [`ensure_latest`] brings the cached `vehicles.csv` up to date with a
//! conditional download; [`FuelEconomyTable`] answers lookups against it.
//!
//! ```no_run
//! use fueleconomy::{Config, FuelEconomyTable, ensure_latest};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load()?;
//! ensure_latest(&config)?;
//! let table = FuelEconomyTable::load(&config.effective_dataset_dir())?;
//! let fit = table.lookup("Honda", "Fit", 2015)?;
//! println!("{:?} mpg city", fit.city_mpg());
//! # Ok(())
//! # }
//! ```

pub mod lookup;

pub use fueleconomy_config::{Config, ConfigError};
pub use fueleconomy_sync::{
    CancelToken, DATASET_FILE_NAME, SyncEngine, SyncError, SyncErrorKind, SyncOutcome, SyncReport,
    ValidationTokens, ValidatorStore,
};
pub use lookup::{FuelEconomyTable, LookupError, VehicleRecord};

use std::fs::File;
use std::path::Path;

/// Application version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Sync the dataset directory named by `config` with the configured URL.
pub fn ensure_latest(config: &Config) -> Result<SyncOutcome, SyncError> {
    let target_dir = config.effective_dataset_dir();
    log::info!("Checking {} for updates", target_dir.display());
    SyncEngine::from_config(config)?.sync(&target_dir)
}

/// Open the live dataset in `dir` for reading.
pub fn open_dataset(dir: &Path) -> std::io::Result<File> {
    let path = dir.join(DATASET_FILE_NAME);
    if path.exists() {
        log::info!("Opening dataset {}", path.display());
    } else {
        log::warn!("Opening missing dataset {}", path.display());
    }
    File::open(path)
}
