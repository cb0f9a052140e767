//! Clinic Finder - nearest clinic lookup
//!
//! Turns a free-text location typed by a user into the five nearest clinics
//! from a static dataset. Typing is debounced, the text is resolved to a
//! coordinate through an external place-search provider, and the dataset is
//! ranked by great-circle distance from that coordinate.
//!
//! # Quick Start
//!
//! Ranking on its own needs only a dataset:
//!
//! ```rust
//! use clinic_finder::{RankingEngine, data::{ClinicDataset, Coordinate}};
//!
//! let csv = "NAME,LAT,LONG\nX,45.0,9.0\nY,46.0,9.0\n";
//! let (dataset, report) = ClinicDataset::from_csv_bytes(csv.as_bytes().to_vec(), "inline")?;
//! assert!(report.is_clean());
//!
//! let ranked = RankingEngine::new().nearest(Coordinate::new(45.0, 9.0), &dataset, 1);
//! assert_eq!(ranked[0].record.name(), "X");
//! assert_eq!(ranked[0].distance_km, 0.0);
//! # Ok::<(), clinic_finder::data::DataError>(())
//! ```
//!
//! The full interactive flow is driven by [`ClinicFinder::run`], which takes
//! user input events and a [`RenderSink`] and talks to any type implementing
//! [`PredictionProvider`] and [`DetailsProvider`].
//!
//! # Features
//!
//! - **Haversine ranking**: top-K by distance with dataset order breaking ties
//! - **Debounced lookups**: one provider call per burst of keystrokes
//! - **Session tokens**: stale provider results can never overwrite newer ones
//! - **Reported data problems**: every skipped CSV row is listed with a reason
use once_cell::sync::OnceCell;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

mod config;
mod core;
pub mod debounce;
pub mod distance;
pub mod error;
pub mod provider;
pub mod ranking;
mod render;
pub mod session;
mod viewport;

pub use crate::core::{ClinicFinder, UiEvent};

pub use clinic_finder_data as data;
pub use config::{FinderConfig, FinderConfigBuilder};
pub use debounce::{DebounceConfig, PendingQuery, QueryDebouncer, SubmitOutcome};
pub use distance::{DistanceMetric, Haversine, haversine_km};
pub use provider::{
    DetailsField, DetailsProvider, PlaceDetails, Prediction, PredictionProvider, ProviderError,
};
pub use ranking::{RankedRecord, RankingEngine};
pub use render::RenderSink;
pub use session::{
    LookupTicket, NoResultsReason, SearchSession, SessionState, SessionToken, SessionUpdate,
};
pub use viewport::Viewport;

static LOGGER_INIT: OnceCell<()> = OnceCell::new();

/// Initialize logging for the clinic finder.
///
/// Installs a `tracing` fmt subscriber honouring `RUST_LOG`, falling back to
/// `level`. Safe to call more than once; only the first call installs.
///
/// # Examples
///
/// ```rust
/// use clinic_finder::init_logging;
/// use tracing::Level;
///
/// init_logging(Level::INFO)?;
/// # Ok::<(), clinic_finder::error::ClinicFinderError>(())
/// ```
pub fn init_logging(level: impl Into<LevelFilter>) -> Result<&'static (), error::ClinicFinderError> {
    LOGGER_INIT.get_or_try_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level.into().to_string()))?
            .add_directive("polars=warn".parse()?)
            .add_directive("reqwest=warn".parse()?)
            .add_directive("hyper_util=warn".parse()?);

        // A subscriber installed elsewhere is not an error for us.
        let _ = tracing_subscriber::fmt::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .try_init();
        Ok(())
    })
}
