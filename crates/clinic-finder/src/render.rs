use crate::{
    provider::{PlaceDetails, Prediction},
    ranking::RankedRecord,
    session::NoResultsReason,
    viewport::Viewport,
};

/// Receives what the user should see. Markers, list items and map fitting
/// are up to the implementation.
pub trait RenderSink {
    fn show_predictions(&mut self, predictions: &[Prediction]);

    fn clear_predictions(&mut self);

    /// `ranked` is ordered nearest first; `viewport` encloses the selected
    /// place and every ranked clinic.
    fn show_results(&mut self, place: &PlaceDetails, ranked: &[RankedRecord], viewport: Option<Viewport>);

    fn clear_results(&mut self);

    fn show_no_results(&mut self, reason: &NoResultsReason);
}
