use std::time::Duration;

use itertools::Itertools;

use crate::{
    debounce::DebounceConfig,
    error::ClinicFinderError,
    provider::{DetailsField, MINIMAL_DETAILS_FIELDS},
    ranking::DEFAULT_LIMIT,
};

/// Settings for the whole lookup-and-rank pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinderConfig {
    /// Number of nearest clinics to return.
    pub limit: usize,
    pub debounce: DebounceConfig,
    /// Region codes the prediction provider restricts suggestions to. Empty means worldwide.
    pub region_codes: Vec<String>,
    /// Fields requested from the details provider. Always contains `Location`.
    pub details_fields: Vec<DetailsField>,
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            debounce: DebounceConfig::default(),
            region_codes: Vec::new(),
            details_fields: MINIMAL_DETAILS_FIELDS.to_vec(),
        }
    }
}

impl FinderConfig {
    pub fn builder() -> FinderConfigBuilder {
        FinderConfigBuilder::new()
    }
}

/// Builder for creating pipeline configurations with ergonomic defaults
#[derive(Debug, Clone, Default)]
pub struct FinderConfigBuilder {
    config: FinderConfig,
}

impl FinderConfigBuilder {
    /// Create a new builder with sensible defaults
    pub fn new() -> Self {
        Self {
            config: FinderConfig::default(),
        }
    }

    /// Shorter quiet period for fast typists on a fast connection
    pub fn responsive() -> Self {
        Self::new().quiet_period(Duration::from_millis(150))
    }

    /// No minimum query length: every non-empty input is looked up
    pub fn unfiltered() -> Self {
        Self::new().min_query_len(0)
    }

    /// Set the maximum number of clinics to return
    pub fn limit(mut self, limit: usize) -> Self {
        self.config.limit = limit;
        self
    }

    pub fn quiet_period(mut self, quiet_period: Duration) -> Self {
        self.config.debounce.quiet_period = quiet_period;
        self
    }

    /// Minimum characters before a query is looked up (0 disables)
    pub fn min_query_len(mut self, min: usize) -> Self {
        self.config.debounce.min_query_len = min;
        self
    }

    /// Restrict predictions to these two-letter region codes
    pub fn region_codes<I, S>(mut self, codes: I) -> Result<Self, ClinicFinderError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let codes = codes
            .into_iter()
            .map(|c| c.as_ref().trim().to_ascii_lowercase())
            .collect::<Vec<_>>();
        let invalid = codes
            .iter()
            .filter(|c| c.len() != 2 || !c.chars().all(|ch| ch.is_ascii_alphabetic()))
            .collect::<Vec<_>>();
        if !invalid.is_empty() {
            return Err(ClinicFinderError::ConfigError(format!(
                "Region codes must be two ASCII letters, got: {}",
                invalid.iter().join(", ")
            )));
        }
        self.config.region_codes = codes.into_iter().unique().collect();
        Ok(self)
    }

    /// Fields to request for a selected place. `Location` is always added.
    pub fn details_fields(mut self, fields: &[DetailsField]) -> Self {
        self.config.details_fields = fields
            .iter()
            .copied()
            .chain(std::iter::once(DetailsField::Location))
            .sorted()
            .dedup()
            .collect();
        self
    }

    /// Build the final configuration
    pub fn build(self) -> FinderConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debounce::{DEFAULT_MIN_QUERY_LEN, DEFAULT_QUIET_PERIOD};

    #[test]
    fn test_default_builder() {
        let config = FinderConfigBuilder::new().build();
        assert_eq!(config.limit, 5);
        assert_eq!(config.debounce.quiet_period, DEFAULT_QUIET_PERIOD);
        assert_eq!(config.debounce.min_query_len, DEFAULT_MIN_QUERY_LEN);
        assert!(config.region_codes.is_empty());
        assert_eq!(config.details_fields, MINIMAL_DETAILS_FIELDS.to_vec());
    }

    #[test]
    fn test_presets() {
        let responsive = FinderConfigBuilder::responsive().build();
        assert_eq!(responsive.debounce.quiet_period, Duration::from_millis(150));
        assert_eq!(responsive.debounce.min_query_len, 3);

        let unfiltered = FinderConfigBuilder::unfiltered().build();
        assert_eq!(unfiltered.debounce.min_query_len, 0);
        assert_eq!(unfiltered.debounce.quiet_period, DEFAULT_QUIET_PERIOD);
    }

    #[test]
    fn test_method_chaining() {
        let config = FinderConfig::builder()
            .limit(10)
            .quiet_period(Duration::from_millis(500))
            .min_query_len(4)
            .region_codes(["IT", "sm", "it"])
            .unwrap()
            .build();

        assert_eq!(config.limit, 10);
        assert_eq!(config.debounce.quiet_period, Duration::from_millis(500));
        assert_eq!(config.debounce.min_query_len, 4);
        assert_eq!(config.region_codes, ["it", "sm"]);
    }

    #[test]
    fn test_region_code_validation() {
        let result = FinderConfigBuilder::new().region_codes(["it", "ITA", "1x"]);

        match result {
            Err(ClinicFinderError::ConfigError(msg)) => {
                assert!(msg.contains("ita"));
                assert!(msg.contains("1x"));
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn test_details_fields_always_include_location() {
        let config = FinderConfigBuilder::new()
            .details_fields(&[DetailsField::DisplayName, DetailsField::DisplayName])
            .build();

        assert_eq!(
            config.details_fields,
            [DetailsField::DisplayName, DetailsField::Location]
        );
    }

    #[test]
    fn test_override_presets() {
        let config = FinderConfigBuilder::unfiltered().limit(1).min_query_len(2).build();

        assert_eq!(config.limit, 1);
        assert_eq!(config.debounce.min_query_len, 2);
    }
}
