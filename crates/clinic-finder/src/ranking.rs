//! Top-K nearest clinics for a query coordinate.
use std::cmp::Ordering;

use clinic_finder_data::{ClinicDataset, ClinicRecord, Coordinate};
use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::{
    distance::{DistanceMetric, Haversine},
    provider::PlaceDetails,
    viewport::Viewport,
};

/// Number of results returned when no limit is configured.
pub const DEFAULT_LIMIT: usize = 5;

/// A clinic together with its distance from the query.
///
/// `index` is the record's position in the dataset and is stable across
/// queries, so it can key UI elements.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct RankedRecord {
    pub index: usize,
    pub record: ClinicRecord,
    pub distance_km: f64,
}

/// Ranks dataset records by distance from a query point.
#[derive(Debug, Clone, Default)]
pub struct RankingEngine<M = Haversine> {
    metric: M,
}

impl RankingEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<M: DistanceMetric> RankingEngine<M> {
    pub const fn with_metric(metric: M) -> Self {
        Self { metric }
    }

    /// The `k` records closest to `query`, ascending by distance.
    ///
    /// Equal distances keep dataset order. Returns fewer than `k` records
    /// when the dataset is smaller, and nothing for `k == 0` or an empty
    /// dataset. The dataset is only read.
    #[instrument(name = "Rank nearest clinics", skip(self, dataset), fields(records = dataset.len()), level = "debug")]
    pub fn nearest(&self, query: Coordinate, dataset: &ClinicDataset, k: usize) -> Vec<RankedRecord> {
        if k == 0 || dataset.is_empty() {
            return Vec::new();
        }

        let mut scored = dataset
            .all()
            .par_iter()
            .enumerate()
            .map(|(index, record)| (index, self.metric.distance(record.coordinate(), query)))
            .collect::<Vec<_>>();

        // `sort_by` is stable, so ties stay in dataset order.
        scored.sort_by(|a, b| compare_distance(a.1, b.1));
        scored.truncate(k);

        debug!(
            returned = scored.len(),
            nearest_km = scored.first().map(|(_, d)| *d),
            "Ranking complete"
        );

        scored
            .into_iter()
            .map(|(index, distance_km)| RankedRecord {
                index,
                record: dataset.all()[index].clone(),
                distance_km,
            })
            .collect()
    }
}

/// NaN sorts after every number; `-0.0` and `0.0` compare equal.
fn compare_distance(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b)
        .unwrap_or_else(|| a.is_nan().cmp(&b.is_nan()))
}

/// Box around the selected place and every ranked record. Starts from the
/// place's own viewport when the provider returned one.
pub fn results_viewport(place: &PlaceDetails, ranked: &[RankedRecord]) -> Option<Viewport> {
    let corners = place
        .viewport
        .into_iter()
        .flat_map(|v| [v.south_west, v.north_east]);
    Viewport::enclosing(
        corners
            .chain(std::iter::once(place.coordinate))
            .chain(ranked.iter().map(|r| r.record.coordinate())),
    )
}
