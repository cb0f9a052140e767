use std::fmt;

use ahash::AHashMap;

/// A point on the Earth's surface in decimal degrees.
///
/// The constructor does not range-check; use [`Coordinate::is_valid`] or
/// [`Coordinate::try_new`] when the input is untrusted.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Build a coordinate, returning `None` when either component is
    /// non-finite or outside `[-90, 90]` / `[-180, 180]`.
    pub fn try_new(latitude: f64, longitude: f64) -> Option<Self> {
        let coordinate = Self::new(latitude, longitude);
        coordinate.is_valid().then_some(coordinate)
    }

    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    pub const fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn is_valid(&self) -> bool {
        is_valid_latitude(self.latitude) && is_valid_longitude(self.longitude)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

pub(crate) fn is_valid_latitude(value: f64) -> bool {
    value.is_finite() && (-90.0..=90.0).contains(&value)
}

pub(crate) fn is_valid_longitude(value: f64) -> bool {
    value.is_finite() && (-180.0..=180.0).contains(&value)
}

/// One clinic row from the dataset.
///
/// Columns other than `NAME`, `LAT` and `LONG` are kept verbatim in
/// `raw_fields`, keyed by header name.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ClinicRecord {
    name: String,
    coordinate: Coordinate,
    raw_fields: AHashMap<String, String>,
}

impl ClinicRecord {
    pub fn new(
        name: impl Into<String>,
        coordinate: Coordinate,
        raw_fields: AHashMap<String, String>,
    ) -> Self {
        Self {
            name: name.into(),
            coordinate,
            raw_fields,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn coordinate(&self) -> Coordinate {
        self.coordinate
    }

    pub const fn raw_fields(&self) -> &AHashMap<String, String> {
        &self.raw_fields
    }

    pub fn field(&self, column: &str) -> Option<&str> {
        self.raw_fields.get(column).map(String::as_str)
    }
}

impl fmt::Display for ClinicRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.coordinate)
    }
}
