//! Parsing the clinic table into an immutable [`ClinicDataset`].
//!
//! The CSV is read with every column as a string; `LAT` and `LONG` are then
//! stripped and cast to `f64` with a non-strict cast so that one malformed
//! row only costs that row. Rows with more fields than the header and bytes
//! that are not UTF-8 are likewise contained to their row. Each excluded row
//! is reported as a [`RowParseWarning`] in the [`LoadReport`].
use std::fmt;
use std::io::Cursor;

use ahash::AHashMap;
use chrono::{DateTime, Utc};
use itertools::Itertools;
use polars::chunked_array::cast::CastOptions;
use polars::prelude::*;
use tracing::{debug, info, info_span, instrument, warn};

use crate::{
    DataError, LAT_COLUMN, LONG_COLUMN, NAME_COLUMN, Result,
    record::{ClinicRecord, Coordinate, is_valid_latitude, is_valid_longitude},
    source::DataSource,
};

const PARSED_LAT: &str = "__parsed_lat";
const PARSED_LONG: &str = "__parsed_long";

/// Why a data row was excluded from the dataset.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowSkipReason {
    MissingCoordinate { column: String },
    NotNumeric { column: String, value: String },
    OutOfRange { column: String, value: String },
    /// The row has values past the header's last column.
    ExtraFields { expected: usize, found: usize },
}

impl fmt::Display for RowSkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCoordinate { column } => write!(f, "missing {column}"),
            Self::NotNumeric { column, value } => {
                write!(f, "{column} value '{value}' is not a number")
            }
            Self::OutOfRange { column, value } => {
                write!(f, "{column} value '{value}' is out of range")
            }
            Self::ExtraFields { expected, found } => {
                write!(f, "{found} fields where the header has {expected}")
            }
        }
    }
}

/// A single row excluded during load. `row` is the 1-based index among
/// non-empty data rows (the header is not counted).
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowParseWarning {
    pub row: usize,
    pub reason: RowSkipReason,
}

impl fmt::Display for RowParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}: {}", self.row, self.reason)
    }
}

/// Outcome of a dataset load.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub source: String,
    pub total_rows: usize,
    pub loaded_rows: usize,
    pub warnings: Vec<RowParseWarning>,
    pub loaded_at: DateTime<Utc>,
}

impl LoadReport {
    pub fn skipped_rows(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// The immutable collection of clinics. A record's identity is its position
/// in [`ClinicDataset::all`].
#[derive(Debug, Clone, Default)]
pub struct ClinicDataset {
    records: Vec<ClinicRecord>,
}

impl ClinicDataset {
    /// Read `source` and parse it. Row-level problems are reported, not fatal;
    /// an unreadable source or a header without `NAME`/`LAT`/`LONG` is.
    #[instrument(name = "Load clinic dataset", skip_all, fields(source = %source), level = "info")]
    pub async fn load(source: &DataSource) -> Result<(Self, LoadReport)> {
        let bytes = source.read_bytes().await?;
        Self::from_csv_bytes(bytes, source.to_string())
    }

    /// Parse CSV bytes already in memory.
    pub fn from_csv_bytes(bytes: Vec<u8>, source: impl Into<String>) -> Result<(Self, LoadReport)> {
        let source = source.into();
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(DataError::EmptySource);
        }

        let t_load = std::time::Instant::now();
        let ragged = ragged_rows(&bytes);
        let df = {
            let _span = info_span!("Parse clinic CSV").entered();
            read_string_frame(bytes)?
        };
        let (records, total_rows, warnings) = records_from_frame(df, &ragged)?;

        for warning in &warnings {
            warn!(source = %source, %warning, "Skipping clinic row");
        }

        let report = LoadReport {
            source,
            total_rows,
            loaded_rows: records.len(),
            warnings,
            loaded_at: Utc::now(),
        };
        info!(
            total_rows = report.total_rows,
            loaded_rows = report.loaded_rows,
            skipped_rows = report.skipped_rows(),
            elapsed = ?t_load.elapsed(),
            "Clinic dataset loaded"
        );

        Ok((Self { records }, report))
    }

    pub fn from_records(records: Vec<ClinicRecord>) -> Self {
        Self { records }
    }

    pub fn all(&self) -> &[ClinicRecord] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&ClinicRecord> {
        self.records.get(index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn read_string_frame(bytes: Vec<u8>) -> Result<DataFrame> {
    // Zero-length inference makes every column a String. Ragged rows are
    // truncated here and reported from `ragged_rows`.
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .map_parse_options(|opts| {
            opts.with_truncate_ragged_lines(true)
                .with_encoding(CsvEncoding::LossyUtf8)
        })
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()?;

    let columns = df
        .get_column_names()
        .iter()
        .map(|name| name.as_str())
        .collect::<Vec<_>>();
    for required in [NAME_COLUMN, LAT_COLUMN, LONG_COLUMN] {
        if !columns.contains(&required) {
            return Err(DataError::MissingColumn(required.to_string()));
        }
    }
    debug!(columns = %columns.iter().join(","), rows = df.height(), "Read clinic CSV");
    Ok(df)
}

fn parsed_coordinate_expr(column: &str, alias: &str) -> Expr {
    col(column)
        .str()
        .strip_chars(lit(NULL))
        .cast_with_options(DataType::Float64, CastOptions::NonStrict)
        .alias(alias)
}

/// Data rows carrying values past the header's last column, keyed by the
/// same 1-based row number the load loop assigns, with their field count.
///
/// Records whose header columns are all blank are not numbered, matching
/// the loop, which skips them.
fn ragged_rows(bytes: &[u8]) -> AHashMap<usize, usize> {
    let mut ragged = AHashMap::new();
    let mut expected: Option<usize> = None;
    let mut row = 0;
    let mut fields = 1;
    let mut content = false;
    let mut content_beyond = false;
    let mut in_quotes = false;

    for &byte in bytes.iter().chain(std::iter::once(&b'\n')) {
        match byte {
            b'"' => in_quotes = !in_quotes,
            b',' if !in_quotes => fields += 1,
            b'\n' if !in_quotes => {
                match expected {
                    None if content => expected = Some(fields),
                    Some(_) if content => {
                        row += 1;
                        if content_beyond {
                            ragged.insert(row, fields);
                        }
                    }
                    _ => {}
                }
                fields = 1;
                content = false;
                content_beyond = false;
            }
            b if b.is_ascii_whitespace() => {}
            _ => {
                if expected.is_none_or(|width| fields <= width) {
                    content = true;
                } else {
                    content_beyond = true;
                }
            }
        }
    }
    ragged
}

fn records_from_frame(
    df: DataFrame,
    ragged: &AHashMap<usize, usize>,
) -> Result<(Vec<ClinicRecord>, usize, Vec<RowParseWarning>)> {
    let width = df.width();
    let extra_columns = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .filter(|name| ![NAME_COLUMN, LAT_COLUMN, LONG_COLUMN].contains(&name.as_str()))
        .collect::<Vec<_>>();

    let df = df
        .lazy()
        .with_columns([
            parsed_coordinate_expr(LAT_COLUMN, PARSED_LAT),
            parsed_coordinate_expr(LONG_COLUMN, PARSED_LONG),
        ])
        .collect()?;

    let names = df.column(NAME_COLUMN)?.str()?;
    let raw_lats = df.column(LAT_COLUMN)?.str()?;
    let raw_longs = df.column(LONG_COLUMN)?.str()?;
    let lats = df.column(PARSED_LAT)?.f64()?;
    let longs = df.column(PARSED_LONG)?.f64()?;
    let extras = extra_columns
        .iter()
        .map(|name| Ok((name.as_str(), df.column(name)?.str()?)))
        .collect::<Result<Vec<_>>>()?;

    let mut records = Vec::with_capacity(df.height());
    let mut warnings = Vec::new();
    let mut total_rows = 0;

    for idx in 0..df.height() {
        let name = non_blank(names.get(idx));
        let raw_lat = non_blank(raw_lats.get(idx));
        let raw_long = non_blank(raw_longs.get(idx));
        let raw_fields = extras
            .iter()
            .filter_map(|(column, values)| {
                non_blank(values.get(idx)).map(|v| ((*column).to_string(), v.to_string()))
            })
            .collect::<AHashMap<_, _>>();

        if name.is_none() && raw_lat.is_none() && raw_long.is_none() && raw_fields.is_empty() {
            continue;
        }
        total_rows += 1;

        if let Some(&found) = ragged.get(&total_rows) {
            warnings.push(RowParseWarning {
                row: total_rows,
                reason: RowSkipReason::ExtraFields {
                    expected: width,
                    found,
                },
            });
            continue;
        }

        let coordinate = parse_coordinate(raw_lat, lats.get(idx), raw_long, longs.get(idx));
        match coordinate {
            Ok(coordinate) => {
                records.push(ClinicRecord::new(name.unwrap_or_default(), coordinate, raw_fields));
            }
            Err(reason) => warnings.push(RowParseWarning {
                row: total_rows,
                reason,
            }),
        }
    }

    Ok((records, total_rows, warnings))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_coordinate(
    raw_lat: Option<&str>,
    lat: Option<f64>,
    raw_long: Option<&str>,
    long: Option<f64>,
) -> std::result::Result<Coordinate, RowSkipReason> {
    let latitude = check_component(LAT_COLUMN, raw_lat, lat, is_valid_latitude)?;
    let longitude = check_component(LONG_COLUMN, raw_long, long, is_valid_longitude)?;
    Ok(Coordinate::new(latitude, longitude))
}

fn check_component(
    column: &str,
    raw: Option<&str>,
    parsed: Option<f64>,
    in_range: fn(f64) -> bool,
) -> std::result::Result<f64, RowSkipReason> {
    let Some(raw) = raw else {
        return Err(RowSkipReason::MissingCoordinate {
            column: column.to_string(),
        });
    };
    match parsed {
        None => Err(RowSkipReason::NotNumeric {
            column: column.to_string(),
            value: raw.to_string(),
        }),
        Some(value) if !in_range(value) => Err(RowSkipReason::OutOfRange {
            column: column.to_string(),
            value: raw.to_string(),
        }),
        Some(value) => Ok(value),
    }
}
