//! The clinic finder pipeline.
//!
//! [`ClinicFinder`] owns every piece of mutable state the lookup flow needs:
//! the loaded dataset, the query debouncer and the search session. Nothing
//! is global, so tests and servers can build as many independent finders as
//! they like.
//!
//! # Control flow
//!
//! keystroke → [`QueryDebouncer`] → prediction lookup → user selects a
//! prediction → details lookup → [`RankingEngine`] → [`RenderSink`].
//!
//! ```rust,ignore
//! use clinic_finder::{ClinicFinder, FinderConfig, UiEvent, data::DataSource};
//!
//! let mut finder = ClinicFinder::new(provider, FinderConfig::default());
//! finder.load_dataset(&DataSource::parse("./clinics.csv")).await?;
//!
//! let (tx, rx) = tokio::sync::mpsc::channel(16);
//! tx.send(UiEvent::Input("Roma".into())).await?;
//! finder.run(rx, &mut sink).await;
//! ```
use std::sync::Arc;

use clinic_finder_data::{ClinicDataset, Coordinate, DataSource, LoadReport};
use futures::{
    FutureExt, StreamExt,
    future::LocalBoxFuture,
    stream::FuturesUnordered,
};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::{
    config::FinderConfig,
    debounce::{QueryDebouncer, SubmitOutcome},
    error::{ClinicFinderError, Result},
    provider::{DetailsProvider, PlaceDetails, Prediction, PredictionProvider, ProviderError},
    ranking::{RankedRecord, RankingEngine, results_viewport},
    render::RenderSink,
    session::{DetailsRequest, LookupTicket, NoResultsReason, SearchSession, SessionUpdate},
};

/// Input from the user interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// The text box now contains this text.
    Input(String),
    /// The user picked the prediction with this id.
    Select(String),
}

enum ProviderResponse {
    Predictions {
        ticket: LookupTicket,
        result: std::result::Result<Vec<Prediction>, ProviderError>,
    },
    Details {
        ticket: LookupTicket,
        result: std::result::Result<PlaceDetails, ProviderError>,
    },
}

type InFlight = FuturesUnordered<LocalBoxFuture<'static, ProviderResponse>>;

pub struct ClinicFinder<P> {
    provider: Arc<P>,
    config: FinderConfig,
    engine: RankingEngine,
    dataset: Option<Arc<ClinicDataset>>,
    debouncer: QueryDebouncer,
    session: SearchSession,
}

impl<P> ClinicFinder<P>
where
    P: PredictionProvider + DetailsProvider + 'static,
{
    /// Create a finder with no dataset. Ranking fails with
    /// [`ClinicFinderError::NotReady`] until one is loaded.
    pub fn new(provider: P, config: FinderConfig) -> Self {
        let debouncer = QueryDebouncer::new(config.debounce);
        Self {
            provider: Arc::new(provider),
            config,
            engine: RankingEngine::new(),
            dataset: None,
            debouncer,
            session: SearchSession::new(),
        }
    }

    /// Use an already loaded dataset.
    pub fn with_dataset(mut self, dataset: ClinicDataset) -> Self {
        self.dataset = Some(Arc::new(dataset));
        self
    }

    /// Load the clinic dataset. A source that cannot be read or parsed as a
    /// whole is returned as an error and leaves the finder not ready;
    /// per-row problems are listed in the report.
    #[instrument(name = "Initialize ClinicFinder dataset", skip(self), level = "info")]
    pub async fn load_dataset(&mut self, source: &DataSource) -> Result<LoadReport> {
        let (dataset, report) = ClinicDataset::load(source).await?;
        if !report.is_clean() {
            warn!(
                skipped_rows = report.skipped_rows(),
                "Some clinic rows were excluded"
            );
        }
        self.dataset = Some(Arc::new(dataset));
        Ok(report)
    }

    pub const fn is_ready(&self) -> bool {
        self.dataset.is_some()
    }

    pub fn dataset(&self) -> Result<&ClinicDataset> {
        self.dataset.as_deref().ok_or(ClinicFinderError::NotReady)
    }

    /// A shared handle to the dataset for concurrent readers.
    pub fn shared_dataset(&self) -> Result<Arc<ClinicDataset>> {
        self.dataset.clone().ok_or(ClinicFinderError::NotReady)
    }

    pub const fn config(&self) -> &FinderConfig {
        &self.config
    }

    pub const fn session(&self) -> &SearchSession {
        &self.session
    }

    pub const fn debouncer(&self) -> &QueryDebouncer {
        &self.debouncer
    }

    /// The configured number of clinics nearest to `query`.
    pub fn nearest(&self, query: Coordinate) -> Result<Vec<RankedRecord>> {
        self.nearest_k(query, self.config.limit)
    }

    pub fn nearest_k(&self, query: Coordinate, k: usize) -> Result<Vec<RankedRecord>> {
        let dataset = self.dataset()?;
        Ok(self.engine.nearest(query, dataset, k))
    }

    /// Drive the lookup flow until `events` closes.
    ///
    /// Runs on the calling task. Provider calls overlap freely; whichever
    /// order they complete in, only the answer to the latest query or
    /// selection of the current session reaches `sink`.
    pub async fn run<S: RenderSink>(&mut self, mut events: mpsc::Receiver<UiEvent>, sink: &mut S) {
        info!("Clinic finder event loop started");
        let mut in_flight: InFlight = FuturesUnordered::new();

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event, &mut in_flight, sink),
                    None => break,
                },
                text = self.debouncer.fired() => {
                    let ticket = self.session.current_ticket();
                    debug!(%ticket, text = %text, "Dispatching prediction lookup");
                    in_flight.push(self.predict_call(text, ticket));
                }
                Some(response) = in_flight.next(), if !in_flight.is_empty() => {
                    self.handle_response(response, sink);
                }
            }
        }

        info!(
            abandoned_lookups = in_flight.len(),
            stale_results_ignored = self.session.stale_results_ignored(),
            "Clinic finder event loop stopped"
        );
    }

    fn handle_event<S: RenderSink>(&mut self, event: UiEvent, in_flight: &mut InFlight, sink: &mut S) {
        match event {
            UiEvent::Input(text) => match self.debouncer.submit(&text) {
                // Any edit retires lookups answering the previous text.
                SubmitOutcome::Scheduled { .. } => {
                    self.session.supersede();
                }
                SubmitOutcome::TooShort => {
                    self.session.supersede();
                    self.session.dismiss_predictions();
                    sink.clear_predictions();
                    sink.clear_results();
                }
                SubmitOutcome::Empty => {
                    self.session.clear();
                    sink.clear_predictions();
                    sink.clear_results();
                }
            },
            UiEvent::Select(place_id) => match self.session.select(&place_id) {
                Some(request) => {
                    debug!(ticket = %request.ticket, place_id = %place_id, "Dispatching details lookup");
                    sink.clear_predictions();
                    sink.clear_results();
                    in_flight.push(self.details_call(request));
                }
                None => debug!(place_id = %place_id, "Ignoring selection of a prediction not on display"),
            },
        }
    }

    fn handle_response<S: RenderSink>(&mut self, response: ProviderResponse, sink: &mut S) {
        match response {
            ProviderResponse::Predictions { ticket, result } => {
                match self.session.apply_predictions(ticket, result) {
                    SessionUpdate::Applied(predictions) => sink.show_predictions(&predictions),
                    SessionUpdate::NoResults(reason) => {
                        sink.clear_predictions();
                        sink.show_no_results(&reason);
                    }
                    SessionUpdate::Stale => {}
                }
            }
            ProviderResponse::Details { ticket, result } => {
                let result = result.and_then(|place| {
                    if place.coordinate.is_valid() {
                        Ok(place)
                    } else {
                        Err(ProviderError::NoCoordinate)
                    }
                });
                match self.session.apply_details(ticket, result) {
                    SessionUpdate::Applied(place) => self.show_nearest(&place, sink),
                    SessionUpdate::NoResults(reason) => sink.show_no_results(&reason),
                    SessionUpdate::Stale => {}
                }
            }
        }
    }

    fn show_nearest<S: RenderSink>(&self, place: &PlaceDetails, sink: &mut S) {
        match self.nearest(place.coordinate) {
            Ok(ranked) => {
                info!(
                    place = %place.display_name,
                    results = ranked.len(),
                    "Nearest clinics ranked"
                );
                let viewport = results_viewport(place, &ranked);
                sink.show_results(place, &ranked, viewport);
            }
            Err(e) => {
                warn!(error = %e, "Cannot rank clinics");
                sink.show_no_results(&NoResultsReason::NotReady);
            }
        }
    }

    fn predict_call(&self, text: String, ticket: LookupTicket) -> LocalBoxFuture<'static, ProviderResponse> {
        let provider = Arc::clone(&self.provider);
        let region_codes = self.config.region_codes.clone();
        async move {
            let result = provider.predict(&text, ticket.token, &region_codes).await;
            ProviderResponse::Predictions { ticket, result }
        }
        .boxed_local()
    }

    fn details_call(&self, request: DetailsRequest) -> LocalBoxFuture<'static, ProviderResponse> {
        let provider = Arc::clone(&self.provider);
        let fields = self.config.details_fields.clone();
        async move {
            let result = provider
                .details(&request.place_id, request.ticket.token, &fields)
                .await;
            ProviderResponse::Details {
                ticket: request.ticket,
                result,
            }
        }
        .boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use clinic_finder_data::{ClinicRecord, TestDataConfig, create_test_data};

    use super::*;

    struct NoProvider;

    impl PredictionProvider for NoProvider {
        async fn predict(
            &self,
            _text: &str,
            _token: crate::session::SessionToken,
            _region_codes: &[String],
        ) -> std::result::Result<Vec<Prediction>, ProviderError> {
            Err(ProviderError::Transport("offline".to_string()))
        }
    }

    impl DetailsProvider for NoProvider {
        async fn details(
            &self,
            _place_id: &str,
            _token: crate::session::SessionToken,
            _fields: &[crate::provider::DetailsField],
        ) -> std::result::Result<PlaceDetails, ProviderError> {
            Err(ProviderError::Transport("offline".to_string()))
        }
    }

    #[test]
    fn test_ranking_before_load_is_not_ready() {
        let finder = ClinicFinder::new(NoProvider, FinderConfig::default());

        assert!(!finder.is_ready());
        assert!(matches!(
            finder.nearest(Coordinate::new(45.0, 9.0)),
            Err(ClinicFinderError::NotReady)
        ));
        assert!(matches!(finder.dataset(), Err(ClinicFinderError::NotReady)));
    }

    #[test]
    fn test_nearest_uses_configured_limit() {
        let records = (0..10)
            .map(|i| {
                ClinicRecord::new(
                    format!("Clinic {i}"),
                    Coordinate::new(45.0 + f64::from(i) * 0.01, 9.0),
                    Default::default(),
                )
            })
            .collect();
        let config = FinderConfig::builder().limit(3).build();
        let finder =
            ClinicFinder::new(NoProvider, config).with_dataset(ClinicDataset::from_records(records));

        let ranked = finder.nearest(Coordinate::new(45.0, 9.0)).unwrap();

        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].record.name(), "Clinic 0");
        assert_eq!(finder.nearest_k(Coordinate::new(45.0, 9.0), 7).unwrap().len(), 7);
    }

    #[tokio::test]
    async fn test_load_dataset_from_file() {
        let file = create_test_data(&TestDataConfig::sample()).unwrap();
        let mut finder = ClinicFinder::new(NoProvider, FinderConfig::default());

        let report = finder
            .load_dataset(&DataSource::File(file.path().to_path_buf()))
            .await
            .unwrap();

        assert!(finder.is_ready());
        assert_eq!(report.skipped_rows(), 2);
        assert_eq!(finder.dataset().unwrap().len(), report.loaded_rows);
    }

    #[tokio::test]
    async fn test_failed_load_stays_not_ready() {
        let mut finder = ClinicFinder::new(NoProvider, FinderConfig::default());

        let result = finder
            .load_dataset(&DataSource::Inline("NAME,LATITUDE,LONG\nX,1,2\n".to_string()))
            .await;

        assert!(matches!(result, Err(ClinicFinderError::Data(_))));
        assert!(!finder.is_ready());
    }
}
