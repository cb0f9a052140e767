//! Dataset side of the clinic finder.
//!
//! Loads the static clinic table (CSV with at least `NAME`, `LAT` and `LONG`
//! columns) into an immutable [`ClinicDataset`], reporting every row that had
//! to be excluded instead of dropping it silently.
use tracing::warn;

pub mod dataset;
#[cfg(feature = "download_data")]
pub mod fetch;
pub mod record;
pub mod source;
pub mod test_data;

/// Environment variable naming the clinic CSV (file path or http(s) URL).
pub const CLINICS_CSV_ENV: &str = "CLINICS_CSV";
pub const CLINICS_CSV_DEFAULT: &str = "./clinics.csv";

pub const NAME_COLUMN: &str = "NAME";
pub const LAT_COLUMN: &str = "LAT";
pub const LONG_COLUMN: &str = "LONG";

mod error {
    use polars::prelude::PolarsError;
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum DataError {
        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),
        #[error("Polars error: {0}")]
        Polars(#[from] PolarsError),
        #[cfg(feature = "download_data")]
        #[error("HTTP error: {0}")]
        Http(#[from] reqwest::Error),
        #[error("Required column '{0}' not found in the clinic data header")]
        MissingColumn(String),
        #[error("Clinic data source is empty")]
        EmptySource,
    }

    pub type Result<T> = std::result::Result<T, DataError>;
}

pub use dataset::{ClinicDataset, LoadReport, RowParseWarning, RowSkipReason};
pub use error::{DataError, Result};
pub use record::{ClinicRecord, Coordinate};
pub use source::DataSource;
pub use test_data::{TestDataConfig, create_test_data};

/// Resolve the dataset location from `CLINICS_CSV`, falling back to `./clinics.csv`.
pub fn data_source_from_env() -> DataSource {
    match std::env::var(CLINICS_CSV_ENV) {
        Ok(value) if !value.trim().is_empty() => DataSource::parse(value.trim()),
        Ok(_) => {
            warn!("{CLINICS_CSV_ENV} is set but empty, using {CLINICS_CSV_DEFAULT}");
            DataSource::parse(CLINICS_CSV_DEFAULT)
        }
        Err(_) => DataSource::parse(CLINICS_CSV_DEFAULT),
    }
}
