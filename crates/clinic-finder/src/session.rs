//! Session tokens and the prediction/selection state machine.
//!
//! A [`SearchSession`] owns the one valid [`SessionToken`] and a query
//! generation. Every provider call is tagged with a [`LookupTicket`] holding
//! both, and its result is applied only if the ticket is still current when
//! it arrives. The token is replaced after a successful details lookup and
//! when the input is cleared; the generation moves on every keystroke and
//! every selection, so an answer to an older query or an earlier selection
//! can never overwrite a newer one.
use std::fmt;

use tracing::{debug, info, warn};

use crate::provider::{PlaceDetails, Prediction, ProviderError};

/// Opaque correlator for one autocomplete-then-details sequence.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionToken(u64);

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{:08x}", self.0)
    }
}

/// Identifies one dispatched lookup: the session it belongs to and the
/// query generation it answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LookupTicket {
    pub token: SessionToken,
    pub generation: u64,
}

impl fmt::Display for LookupTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.token, self.generation)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    AwaitingSelection { predictions: Vec<Prediction> },
}

impl SessionState {
    pub fn predictions(&self) -> &[Prediction] {
        match self {
            Self::Idle => &[],
            Self::AwaitingSelection { predictions } => predictions,
        }
    }
}

/// Why the user sees an empty result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoResultsReason {
    NoPredictions,
    Provider(ProviderError),
    NotReady,
}

impl fmt::Display for NoResultsReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoPredictions => f.write_str("No places match this query"),
            Self::Provider(e) => write!(f, "No results for this query: {e}"),
            Self::NotReady => f.write_str("Clinic data is not loaded yet"),
        }
    }
}

/// Effect of applying an asynchronous result to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate<T> {
    Applied(T),
    NoResults(NoResultsReason),
    /// The result carried a retired ticket and was dropped.
    Stale,
}

/// A details lookup the caller should dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailsRequest {
    pub ticket: LookupTicket,
    pub place_id: String,
}

#[derive(Debug)]
pub struct SearchSession {
    current: SessionToken,
    generation: u64,
    state: SessionState,
    stale_results_ignored: u64,
}

impl Default for SearchSession {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchSession {
    pub const fn new() -> Self {
        Self {
            current: SessionToken(1),
            generation: 0,
            state: SessionState::Idle,
            stale_results_ignored: 0,
        }
    }

    pub const fn current_token(&self) -> SessionToken {
        self.current
    }

    /// The ticket a lookup dispatched now should carry.
    pub const fn current_ticket(&self) -> LookupTicket {
        LookupTicket {
            token: self.current,
            generation: self.generation,
        }
    }

    pub fn is_current(&self, ticket: LookupTicket) -> bool {
        self.current_ticket() == ticket
    }

    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    /// Results dropped because their ticket had been retired.
    pub const fn stale_results_ignored(&self) -> u64 {
        self.stale_results_ignored
    }

    /// The input changed: every lookup already in flight now answers an old
    /// question. The token is kept, so the session continues.
    pub fn supersede(&mut self) -> LookupTicket {
        self.generation = self.generation.wrapping_add(1);
        self.current_ticket()
    }

    fn renew(&mut self) -> SessionToken {
        let retired = self.current;
        self.current = SessionToken(retired.0.wrapping_add(1));
        self.generation = self.generation.wrapping_add(1);
        debug!(%retired, current = %self.current, "Session token renewed");
        self.current
    }

    fn ignore_stale(&mut self, ticket: LookupTicket, kind: &str) {
        self.stale_results_ignored += 1;
        debug!(
            %ticket,
            current = %self.current_ticket(),
            kind,
            total = self.stale_results_ignored,
            "Stale result ignored"
        );
    }

    /// Apply a prediction lookup dispatched with `ticket`.
    pub fn apply_predictions(
        &mut self,
        ticket: LookupTicket,
        result: Result<Vec<Prediction>, ProviderError>,
    ) -> SessionUpdate<Vec<Prediction>> {
        if !self.is_current(ticket) {
            self.ignore_stale(ticket, "predictions");
            return SessionUpdate::Stale;
        }
        match result {
            Ok(predictions) if !predictions.is_empty() => {
                self.state = SessionState::AwaitingSelection {
                    predictions: predictions.clone(),
                };
                SessionUpdate::Applied(predictions)
            }
            Ok(_) => {
                self.state = SessionState::Idle;
                SessionUpdate::NoResults(NoResultsReason::NoPredictions)
            }
            Err(e) => {
                warn!(%ticket, error = %e, "Prediction lookup failed");
                self.state = SessionState::Idle;
                SessionUpdate::NoResults(NoResultsReason::Provider(e))
            }
        }
    }

    /// Start a details lookup for a displayed prediction. Returns `None` when
    /// no prediction with `place_id` is on display. A new selection retires
    /// any details lookup still in flight for an earlier one.
    pub fn select(&mut self, place_id: &str) -> Option<DetailsRequest> {
        if !self.state.predictions().iter().any(|p| p.id == place_id) {
            return None;
        }
        Some(DetailsRequest {
            ticket: self.supersede(),
            place_id: place_id.to_string(),
        })
    }

    /// Apply a details lookup dispatched with `ticket`. Success retires the
    /// token; failure leaves the session as it was so the user can retry.
    pub fn apply_details(
        &mut self,
        ticket: LookupTicket,
        result: Result<PlaceDetails, ProviderError>,
    ) -> SessionUpdate<PlaceDetails> {
        if !self.is_current(ticket) {
            self.ignore_stale(ticket, "details");
            return SessionUpdate::Stale;
        }
        match result {
            Ok(details) => {
                info!(%ticket, place = %details.display_name, "Place selected");
                self.renew();
                self.state = SessionState::Idle;
                SessionUpdate::Applied(details)
            }
            Err(e) => {
                warn!(%ticket, error = %e, "Details lookup failed");
                SessionUpdate::NoResults(NoResultsReason::Provider(e))
            }
        }
    }

    /// Hide the prediction list without ending the session.
    pub fn dismiss_predictions(&mut self) {
        self.state = SessionState::Idle;
    }

    /// The input was cleared: retire the token and drop the predictions.
    pub fn clear(&mut self) -> SessionToken {
        self.state = SessionState::Idle;
        self.renew()
    }
}

#[cfg(test)]
mod tests {
    use clinic_finder_data::Coordinate;

    use super::*;

    fn predictions() -> Vec<Prediction> {
        vec![
            Prediction::new("roma-1", "Roma, RM, Italia"),
            Prediction::new("roma-2", "Romano di Lombardia, BG, Italia"),
        ]
    }

    fn place() -> PlaceDetails {
        PlaceDetails::new("Roma", Coordinate::new(41.9028, 12.4964))
    }

    /// A session showing `predictions()` for a submitted query.
    fn awaiting_selection() -> SearchSession {
        let mut session = SearchSession::new();
        let ticket = session.supersede();
        session.apply_predictions(ticket, Ok(predictions()));
        session
    }

    #[test]
    fn test_predictions_move_to_awaiting_selection() {
        let mut session = SearchSession::new();
        let ticket = session.supersede();

        let update = session.apply_predictions(ticket, Ok(predictions()));

        assert_eq!(update, SessionUpdate::Applied(predictions()));
        assert_eq!(session.state().predictions().len(), 2);
        assert_eq!(session.current_ticket(), ticket);
    }

    #[test]
    fn test_empty_predictions_stay_idle() {
        let mut session = SearchSession::new();
        let ticket = session.current_ticket();

        let update = session.apply_predictions(ticket, Ok(Vec::new()));

        assert_eq!(update, SessionUpdate::NoResults(NoResultsReason::NoPredictions));
        assert_eq!(session.state(), &SessionState::Idle);
    }

    #[test]
    fn test_provider_error_is_no_results_and_keeps_token() {
        let mut session = SearchSession::new();
        let ticket = session.current_ticket();
        let error = ProviderError::Status("UNKNOWN_ERROR".to_string());

        let update = session.apply_predictions(ticket, Err(error.clone()));

        assert_eq!(update, SessionUpdate::NoResults(NoResultsReason::Provider(error)));
        assert!(session.is_current(ticket));
    }

    #[test]
    fn test_successful_details_renews_token() {
        let mut session = awaiting_selection();
        let token = session.current_token();

        let request = session.select("roma-1").unwrap();
        assert_eq!(request.ticket.token, token);

        let update = session.apply_details(request.ticket, Ok(place()));

        assert_eq!(update, SessionUpdate::Applied(place()));
        assert_ne!(session.current_token(), token);
        assert_eq!(session.state(), &SessionState::Idle);
    }

    #[test]
    fn test_failed_details_keeps_selection_open() {
        let mut session = awaiting_selection();
        let token = session.current_token();
        let request = session.select("roma-2").unwrap();

        let update = session.apply_details(request.ticket, Err(ProviderError::NoCoordinate));

        assert!(matches!(update, SessionUpdate::NoResults(NoResultsReason::Provider(_))));
        assert_eq!(session.current_token(), token);
        assert!(session.select("roma-2").is_some());
    }

    #[test]
    fn test_details_under_retired_token_is_discarded() {
        let mut session = awaiting_selection();
        let token_a = session.current_token();
        let request = session.select("roma-1").unwrap();

        // The user clears the input before details arrive.
        let token_b = session.clear();
        assert_ne!(token_a, token_b);
        let state_before = session.state().clone();

        let update = session.apply_details(request.ticket, Ok(place()));

        assert_eq!(update, SessionUpdate::Stale);
        assert_eq!(session.state(), &state_before);
        assert_eq!(session.current_token(), token_b);
        assert_eq!(session.stale_results_ignored(), 1);
    }

    #[test]
    fn test_predictions_under_retired_token_are_discarded() {
        let mut session = SearchSession::new();
        let old = session.supersede();
        session.clear();
        let current = session.supersede();
        session.apply_predictions(current, Ok(vec![Prediction::new("milano", "Milano")]));

        let update = session.apply_predictions(old, Ok(predictions()));

        assert_eq!(update, SessionUpdate::Stale);
        assert_eq!(session.state().predictions()[0].id, "milano");
        assert_eq!(session.stale_results_ignored(), 1);
    }

    #[test]
    fn test_predictions_for_superseded_query_are_discarded() {
        let mut session = SearchSession::new();
        let rom = session.supersede();
        let roma = session.supersede();
        assert_eq!(rom.token, roma.token);

        session.apply_predictions(roma, Ok(vec![Prediction::new("roma", "Roma")]));
        let update = session.apply_predictions(rom, Ok(predictions()));

        assert_eq!(update, SessionUpdate::Stale);
        assert_eq!(session.state().predictions()[0].id, "roma");
        assert_eq!(session.stale_results_ignored(), 1);
    }

    #[test]
    fn test_details_after_new_input_are_discarded() {
        let mut session = awaiting_selection();
        let request = session.select("roma-1").unwrap();
        let token = session.current_token();

        // The user starts typing another query while details load.
        let milano = session.supersede();
        session.apply_predictions(milano, Ok(vec![Prediction::new("milano", "Milano")]));

        let update = session.apply_details(request.ticket, Ok(place()));

        assert_eq!(update, SessionUpdate::Stale);
        assert_eq!(session.current_token(), token);
        assert!(session.select("milano").is_some());
    }

    #[test]
    fn test_only_latest_selection_applies() {
        let mut session = awaiting_selection();
        let first = session.select("roma-1").unwrap();
        let second = session.select("roma-2").unwrap();

        assert_eq!(session.apply_details(first.ticket, Ok(place())), SessionUpdate::Stale);
        assert!(matches!(
            session.apply_details(second.ticket, Ok(place())),
            SessionUpdate::Applied(_)
        ));
    }

    #[test]
    fn test_select_unknown_or_idle_is_none() {
        let mut session = SearchSession::new();
        assert!(session.select("roma-1").is_none());

        let ticket = session.current_ticket();
        session.apply_predictions(ticket, Ok(predictions()));
        assert!(session.select("paris").is_none());
        // A rejected selection does not retire anything.
        assert!(session.is_current(ticket));

        session.dismiss_predictions();
        assert!(session.select("roma-1").is_none());
        assert!(session.is_current(ticket));
    }

    #[test]
    fn test_tokens_are_unique_across_renewals() {
        let mut session = SearchSession::new();
        let mut seen = vec![session.current_token()];
        for _ in 0..10 {
            let token = session.clear();
            assert!(!seen.contains(&token));
            seen.push(token);
        }
    }
}
