//! Point lookups by make, model and year against the vehicles table.

use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Header names of the fields the accessors on [`VehicleRecord`] read.
pub mod columns {
    pub const MAKE: &str = "make";
    pub const MODEL: &str = "model";
    pub const YEAR: &str = "year";
    pub const CITY_MPG: &str = "UCity";
    pub const HIGHWAY_MPG: &str = "UHighway";
    pub const CO2_GRAMS_PER_MILE: &str = "co2TailpipeGpm";
}

/// Errors from loading or querying a [`FuelEconomyTable`].
#[derive(Debug, Error)]
pub enum LookupError {
    /// The dataset file could not be opened.
    #[error("Failed to open dataset: {0}")]
    Io(#[from] std::io::Error),

    /// The table is not well-formed CSV.
    #[error("Failed to parse dataset: {0}")]
    Csv(#[from] csv::Error),

    /// The header row lacks a column the key is built from.
    #[error("Dataset header has no '{0}' column")]
    MissingColumn(&'static str),

    /// No row has this make, model and year.
    #[error("No vehicle matches '{key}'")]
    KeyNotFound {
        /// The composite key that was looked up.
        key: String,
    },
}

/// Composite key a row is stored under.
pub fn lookup_key(make: &str, model: &str, year: impl fmt::Display) -> String {
    format!("{make}_{model}_{year}")
}

/// One row of the table, addressable by column name.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleRecord {
    columns: Arc<HashMap<String, usize>>,
    values: csv::StringRecord,
}

impl VehicleRecord {
    /// Raw value of `field`, if the table has that column.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.columns
            .get(field)
            .and_then(|&index| self.values.get(index))
    }

    pub fn make(&self) -> &str {
        self.get(columns::MAKE).unwrap_or_default()
    }

    pub fn model(&self) -> &str {
        self.get(columns::MODEL).unwrap_or_default()
    }

    /// Model year, when it parses as a number.
    pub fn year(&self) -> Option<u16> {
        self.get(columns::YEAR)?.trim().parse().ok()
    }

    /// Unadjusted city fuel economy in miles per gallon.
    pub fn city_mpg(&self) -> Option<f64> {
        self.number(columns::CITY_MPG)
    }

    /// Unadjusted highway fuel economy in miles per gallon.
    pub fn highway_mpg(&self) -> Option<f64> {
        self.number(columns::HIGHWAY_MPG)
    }

    /// Tailpipe CO2 in grams per mile.
    pub fn co2_grams_per_mile(&self) -> Option<f64> {
        self.number(columns::CO2_GRAMS_PER_MILE)
    }

    fn number(&self, field: &str) -> Option<f64> {
        self.get(field)?.trim().parse().ok()
    }
}

/// In-memory index of the vehicles table keyed by `make_model_year`.
///
/// Build it once with [`FuelEconomyTable::load`] and pass it by reference.
#[derive(Debug, Default)]
pub struct FuelEconomyTable {
    rows: HashMap<String, VehicleRecord>,
}

impl FuelEconomyTable {
    /// Read a table whose first record is the header row.
    ///
    /// Rows sharing a key replace earlier ones.
    pub fn from_reader(reader: impl Read) -> Result<Self, LookupError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let column_index: HashMap<String, usize> = csv_reader
            .headers()?
            .iter()
            .enumerate()
            .map(|(index, name)| (name.trim().to_string(), index))
            .collect();
        let key_columns = [columns::MAKE, columns::MODEL, columns::YEAR];
        let [make_at, model_at, year_at] = key_columns.map(|name| column_index.get(name).copied());
        let (Some(make_at), Some(model_at), Some(year_at)) = (make_at, model_at, year_at) else {
            let missing = key_columns
                .into_iter()
                .find(|name| !column_index.contains_key(*name))
                .unwrap_or(columns::MAKE);
            return Err(LookupError::MissingColumn(missing));
        };
        let column_index = Arc::new(column_index);

        let mut rows = HashMap::new();
        for result in csv_reader.into_records() {
            let values = result?;
            let field = |index: usize| values.get(index).unwrap_or_default();
            let key = lookup_key(field(make_at), field(model_at), field(year_at));
            log::trace!("{key}: {values:?}");
            rows.insert(
                key,
                VehicleRecord {
                    columns: Arc::clone(&column_index),
                    values,
                },
            );
        }

        log::info!("Loaded {} vehicles", rows.len());
        Ok(Self { rows })
    }

    /// Load the live dataset kept in `dir`.
    pub fn load(dir: &Path) -> Result<Self, LookupError> {
        Self::from_reader(crate::open_dataset(dir)?)
    }

    /// Find the row for `make`, `model` and `year`.
    pub fn lookup(
        &self,
        make: &str,
        model: &str,
        year: impl fmt::Display,
    ) -> Result<&VehicleRecord, LookupError> {
        let key = lookup_key(make, model, year);
        self.rows.get(&key).ok_or(LookupError::KeyNotFound { key })
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &VehicleRecord> {
        self.rows.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
barrels08,co2TailpipeGpm,make,model,UCity,UHighway,year
9.69,261.38,Honda,Fit,41.8,51.4,2015
8.02,217.0,Toyota,Prius,66.6,65.8,2016
";

    fn table() -> FuelEconomyTable {
        FuelEconomyTable::from_reader(TABLE.as_bytes()).unwrap()
    }

    #[test]
    fn test_lookup_by_make_model_year() {
        let table = table();
        let fit = table.lookup("Honda", "Fit", 2015).unwrap();

        assert_eq!(fit.make(), "Honda");
        assert_eq!(fit.model(), "Fit");
        assert_eq!(fit.year(), Some(2015));
        assert_eq!(fit.city_mpg(), Some(41.8));
        assert_eq!(fit.highway_mpg(), Some(51.4));
        assert_eq!(fit.co2_grams_per_mile(), Some(261.38));
        assert_eq!(fit.get("barrels08"), Some("9.69"));
        assert_eq!(fit.get("nonexistent"), None);
    }

    #[test]
    fn test_year_accepts_string() {
        let table = table();
        assert!(table.lookup("Toyota", "Prius", "2016").is_ok());
    }

    #[test]
    fn test_missing_key() {
        let err = table().lookup("Honda", "Civic", 2015).unwrap_err();
        match err {
            LookupError::KeyNotFound { key } => assert_eq!(key, "Honda_Civic_2015"),
            other => panic!("expected KeyNotFound, got {other}"),
        }
    }

    #[test]
    fn test_key_is_case_sensitive() {
        assert!(table().lookup("honda", "fit", 2015).is_err());
    }

    #[test]
    fn test_later_duplicate_wins() {
        let table = FuelEconomyTable::from_reader(
            "make,model,year,UCity\nFord,Focus,2017,30\nFord,Focus,2017,31\n".as_bytes(),
        )
        .unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup("Ford", "Focus", 2017).unwrap().city_mpg(), Some(31.0));
    }

    #[test]
    fn test_missing_key_column() {
        let err = FuelEconomyTable::from_reader("make,year\nFord,2017\n".as_bytes()).unwrap_err();
        assert!(matches!(err, LookupError::MissingColumn("model")), "{err}");
    }

    #[test]
    fn test_unparseable_numbers_are_none() {
        let table = FuelEconomyTable::from_reader(
            "make,model,year,UCity,co2TailpipeGpm\nTesla,Model S,2020,,n/a\n".as_bytes(),
        )
        .unwrap();
        let record = table.lookup("Tesla", "Model S", 2020).unwrap();
        assert_eq!(record.city_mpg(), None);
        assert_eq!(record.co2_grams_per_mile(), None);
        assert_eq!(record.highway_mpg(), None);
    }

    #[test]
    fn test_header_only_table_is_empty() {
        let table = FuelEconomyTable::from_reader("make,model,year\n".as_bytes()).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_lookup_key() {
        assert_eq!(lookup_key("Ford", "F150 Pickup 2WD", 1984), "Ford_F150 Pickup 2WD_1984");
    }
}
