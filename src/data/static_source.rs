//! In-memory observation source.
//!
//! Backs the "manual values" configuration mode and the unit tests. Lookups are
//! pure: no IO, no failure modes besides an empty answer.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::data::{ObservationSource, SourceError};
use crate::domain::Observation;

#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    series: HashMap<String, Vec<Observation>>,
}

impl StaticSource {
    pub fn new(series: HashMap<String, Vec<Observation>>) -> Self {
        Self { series }
    }

    /// Add (or extend) a series.
    pub fn with_series(mut self, key: &str, observations: Vec<Observation>) -> Self {
        self.series
            .entry(key.to_string())
            .or_default()
            .extend(observations);
        self
    }
}

impl ObservationSource for StaticSource {
    fn observations(
        &self,
        key: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Observation>, SourceError> {
        // Unknown keys have no observations; the resolver's registry decides
        // which keys are legitimate.
        let Some(all) = self.series.get(key) else {
            return Ok(Vec::new());
        };
        Ok(all
            .iter()
            .filter(|o| o.date >= start && o.date <= end)
            .copied()
            .collect())
    }

    fn name(&self) -> &str {
        "manual"
    }
}
