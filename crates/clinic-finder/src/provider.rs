//! Contracts for the external place-search provider.
//!
//! Both lookups are asynchronous and may fail; failures are never fatal to
//! the pipeline and are shown to the user as "no results".
use std::fmt;
use std::future::Future;

use clinic_finder_data::Coordinate;
use thiserror::Error;

use crate::{session::SessionToken, viewport::Viewport};

/// One autocomplete suggestion.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prediction {
    pub id: String,
    pub description: String,
}

impl Prediction {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
        }
    }
}

/// Place attributes a details lookup can return. Each requested field is
/// billed, so callers ask for the smallest set they render.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DetailsField {
    DisplayName,
    FormattedAddress,
    Location,
    Viewport,
}

impl DetailsField {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DisplayName => "displayName",
            Self::FormattedAddress => "formattedAddress",
            Self::Location => "location",
            Self::Viewport => "viewport",
        }
    }
}

impl fmt::Display for DetailsField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What ranking and the result view need from a selected place.
pub const MINIMAL_DETAILS_FIELDS: [DetailsField; 3] = [
    DetailsField::DisplayName,
    DetailsField::FormattedAddress,
    DetailsField::Location,
];

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceDetails {
    pub coordinate: Coordinate,
    pub display_name: String,
    pub formatted_address: Option<String>,
    pub viewport: Option<Viewport>,
}

impl PlaceDetails {
    pub fn new(display_name: impl Into<String>, coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            display_name: display_name.into(),
            formatted_address: None,
            viewport: None,
        }
    }

    pub fn with_formatted_address(mut self, address: impl Into<String>) -> Self {
        self.formatted_address = Some(address.into());
        self
    }

    /// The area the provider recommends showing for this place.
    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = Some(viewport);
        self
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Provider returned status {0}")]
    Status(String),
    #[error("Provider request failed: {0}")]
    Transport(String),
    #[error("Place has no usable location")]
    NoCoordinate,
}

/// Autocomplete lookups.
pub trait PredictionProvider {
    /// Suggestions for `text`, restricted to `region_codes` when non-empty.
    fn predict(
        &self,
        text: &str,
        token: SessionToken,
        region_codes: &[String],
    ) -> impl Future<Output = Result<Vec<Prediction>, ProviderError>>;
}

/// Place details lookups for a selected prediction.
pub trait DetailsProvider {
    fn details(
        &self,
        place_id: &str,
        token: SessionToken,
        fields: &[DetailsField],
    ) -> impl Future<Output = Result<PlaceDetails, ProviderError>>;
}
