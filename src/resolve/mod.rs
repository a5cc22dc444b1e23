//! Nearest-date snapshot resolution.
//!
//! A lookup turns `(series, target date)` into either the observation that
//! best represents that date or `Absent`. The search itself is a pure function
//! over an `ObservationIndex` (date-sorted, sentinel-free), so it can be tested
//! without any data source:
//!
//! - `OnOrBefore`: latest point with `date <= target`, at most `max_days` back
//! - `Nearest`: smallest `|date - target|` within `max_days`; ties take the
//!   earlier date
//!
//! Both are a single `partition_point` over the index.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::data::{ObservationSource, SourceError};
use crate::domain::{LookupPolicy, Observation, Series};

/// A usable observation picked for a target date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResolvedValue {
    /// Date of the observation actually used.
    pub date: NaiveDate,
    pub value: f64,
}

/// Outcome of a successful lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    Found(ResolvedValue),
    /// No valid observation inside the policy window. A normal outcome.
    Absent,
}

impl Resolution {
    pub fn value(&self) -> Option<f64> {
        match self {
            Resolution::Found(v) => Some(v.value),
            Resolution::Absent => None,
        }
    }

    pub fn observed_on(&self) -> Option<NaiveDate> {
        match self {
            Resolution::Found(v) => Some(v.date),
            Resolution::Absent => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    #[error("unknown series '{0}'")]
    UnknownSeries(String),
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Date-sorted observations with invalid values removed.
///
/// Duplicate dates keep the last occurrence in input order.
#[derive(Debug, Clone, Default)]
pub struct ObservationIndex {
    points: Vec<ResolvedValue>,
}

impl ObservationIndex {
    pub fn new(observations: impl IntoIterator<Item = Observation>) -> Self {
        let mut points: Vec<ResolvedValue> = observations
            .into_iter()
            .filter_map(|o| o.valid_value().map(|value| ResolvedValue { date: o.date, value }))
            .collect();
        // Stable sort keeps input order within a date, so the dedup below can
        // take the last duplicate.
        points.sort_by_key(|p| p.date);

        let mut deduped: Vec<ResolvedValue> = Vec::with_capacity(points.len());
        for p in points {
            match deduped.last_mut() {
                Some(last) if last.date == p.date => *last = p,
                _ => deduped.push(p),
            }
        }
        Self { points: deduped }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Apply `policy` at `target`.
    pub fn lookup(&self, target: NaiveDate, policy: LookupPolicy) -> Option<ResolvedValue> {
        let max_days = i64::from(policy.max_days());
        let split = self.points.partition_point(|p| p.date <= target);

        let before = split
            .checked_sub(1)
            .map(|i| self.points[i])
            .filter(|p| (target - p.date).num_days() <= max_days);

        match policy {
            LookupPolicy::OnOrBefore { .. } => before,
            LookupPolicy::Nearest { .. } => {
                let after = self
                    .points
                    .get(split)
                    .copied()
                    .filter(|p| (p.date - target).num_days() <= max_days);
                match (before, after) {
                    (Some(b), Some(a)) => {
                        // Strictly closer wins; equal distance keeps the earlier date.
                        if (a.date - target) < (target - b.date) {
                            Some(a)
                        } else {
                            Some(b)
                        }
                    }
                    (b, a) => b.or(a),
                }
            }
        }
    }
}

/// Pure lookup over raw observations.
pub fn nearest_observation(
    observations: &[Observation],
    target: NaiveDate,
    policy: LookupPolicy,
) -> Resolution {
    match ObservationIndex::new(observations.iter().copied()).lookup(target, policy) {
        Some(v) => Resolution::Found(v),
        None => Resolution::Absent,
    }
}

/// Resolves `(series label, target date)` against a source.
///
/// The series registry and lookup policy are fixed at construction, so every
/// cell in a table is resolved the same way.
pub struct SnapshotResolver<S> {
    source: S,
    registry: HashMap<String, String>,
    policy: LookupPolicy,
}

impl<S: ObservationSource> SnapshotResolver<S> {
    pub fn new(source: S, series: &[Series], policy: LookupPolicy) -> Self {
        let registry = series
            .iter()
            .map(|s| (s.label.clone(), s.key.clone()))
            .collect();
        Self {
            source,
            registry,
            policy,
        }
    }

    pub fn policy(&self) -> LookupPolicy {
        self.policy
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    pub fn is_registered(&self, label: &str) -> bool {
        self.registry.contains_key(label)
    }

    /// Resolve one cell. Issues a single range query covering the policy window.
    pub fn resolve(&self, label: &str, target: NaiveDate) -> Result<Resolution, ResolveError> {
        let key = self
            .registry
            .get(label)
            .ok_or_else(|| ResolveError::UnknownSeries(label.to_string()))?;

        let (start, end) = self.policy.window(target);
        let observations = self.source.observations(key, start, end)?;
        let index = ObservationIndex::new(observations);
        let resolution = match index.lookup(target, self.policy) {
            Some(v) => Resolution::Found(v),
            None => Resolution::Absent,
        };

        debug!(
            series = label,
            key = key.as_str(),
            %target,
            candidates = index.len(),
            observed_on = ?resolution.observed_on(),
            "resolved cell"
        );
        Ok(resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::StaticSource;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, day).unwrap()
    }

    fn found(r: Resolution) -> ResolvedValue {
        match r {
            Resolution::Found(v) => v,
            Resolution::Absent => panic!("expected a value"),
        }
    }

    const BEFORE: LookupPolicy = LookupPolicy::OnOrBefore { max_days: 7 };
    const NEAREST: LookupPolicy = LookupPolicy::Nearest { max_days: 7 };

    #[test]
    fn exact_match_is_returned_unchanged() {
        let obs = vec![
            Observation::new(d(3, 20), 1.95),
            Observation::new(d(3, 21), 1.92),
            Observation::new(d(3, 24), 1.90),
        ];
        for policy in [BEFORE, NEAREST] {
            let v = found(nearest_observation(&obs, d(3, 21), policy));
            assert_eq!(v.date, d(3, 21));
            assert_eq!(v.value, 1.92);
        }
    }

    #[test]
    fn on_or_before_never_looks_ahead() {
        // Target is a Saturday; Monday is closer than Thursday but in the future.
        let obs = vec![Observation::new(d(3, 20), 1.95), Observation::new(d(3, 24), 1.90)];
        let target = d(3, 23);

        let v = found(nearest_observation(&obs, target, BEFORE));
        assert_eq!(v.date, d(3, 20));

        let v = found(nearest_observation(&obs, target, NEAREST));
        assert_eq!(v.date, d(3, 24));
    }

    #[test]
    fn nearest_tie_prefers_earlier_date() {
        let obs = vec![Observation::new(d(3, 20), 1.95), Observation::new(d(3, 22), 1.88)];
        let v = found(nearest_observation(&obs, d(3, 21), NEAREST));
        assert_eq!(v.date, d(3, 20));
        assert_eq!(v.value, 1.95);
    }

    #[test]
    fn nearest_uses_future_point_when_nothing_before() {
        let obs = vec![Observation::new(d(1, 2), 2.01)];
        let v = found(nearest_observation(&obs, d(1, 1), NEAREST));
        assert_eq!(v.date, d(1, 2));
        assert_eq!(nearest_observation(&obs, d(1, 1), BEFORE), Resolution::Absent);
    }

    #[test]
    fn outside_window_is_absent_not_zero() {
        let obs = vec![Observation::new(d(3, 1), 0.0)];
        let tight = LookupPolicy::OnOrBefore { max_days: 3 };
        assert_eq!(nearest_observation(&obs, d(3, 21), tight), Resolution::Absent);
        assert_eq!(nearest_observation(&obs, d(3, 21), tight).value(), None);

        // A real zero yield inside the window is a value, not "missing".
        assert_eq!(nearest_observation(&obs, d(3, 2), tight).value(), Some(0.0));
    }

    #[test]
    fn window_edge_is_inclusive() {
        let obs = vec![Observation::new(d(3, 14), 1.61)];
        let v = found(nearest_observation(&obs, d(3, 21), BEFORE));
        assert_eq!(v.date, d(3, 14));
        assert_eq!(
            nearest_observation(&obs, d(3, 22), BEFORE),
            Resolution::Absent
        );
    }

    #[test]
    fn malformed_values_are_skipped() {
        let obs = vec![
            Observation::new(d(3, 19), 1.97),
            Observation::missing(d(3, 20)),
            Observation::new(d(3, 21), f64::NAN),
        ];
        let v = found(nearest_observation(&obs, d(3, 21), BEFORE));
        assert_eq!(v.date, d(3, 19));
    }

    #[test]
    fn unsorted_input_and_duplicates() {
        let obs = vec![
            Observation::new(d(3, 21), 1.50),
            Observation::new(d(3, 14), 1.61),
            Observation::new(d(3, 21), 1.49),
        ];
        let index = ObservationIndex::new(obs);
        assert_eq!(index.len(), 2);
        let v = index.lookup(d(3, 21), BEFORE).unwrap();
        assert_eq!(v.value, 1.49);
    }

    #[test]
    fn empty_index_is_absent() {
        assert!(ObservationIndex::default().is_empty());
        assert_eq!(nearest_observation(&[], d(3, 21), NEAREST), Resolution::Absent);
    }

    #[test]
    fn resolver_rejects_unregistered_series() {
        let series = vec![Series {
            label: "5 Yr".to_string(),
            key: "DFII5".to_string(),
            years: 5.0,
        }];
        let resolver = SnapshotResolver::new(StaticSource::default(), &series, BEFORE);
        assert!(resolver.is_registered("5 Yr"));
        let err = resolver.resolve("7 Yr", d(3, 21)).unwrap_err();
        assert_eq!(err, ResolveError::UnknownSeries("7 Yr".to_string()));
    }

    #[test]
    fn resolver_queries_through_the_source() {
        let series = vec![Series {
            label: "5 Yr".to_string(),
            key: "DFII5".to_string(),
            years: 5.0,
        }];
        let source = StaticSource::default().with_series(
            "DFII5",
            vec![Observation::new(d(3, 14), 1.61), Observation::new(d(3, 21), 1.49)],
        );
        let resolver = SnapshotResolver::new(source, &series, BEFORE);
        let r = resolver.resolve("5 Yr", d(3, 23)).unwrap();
        assert_eq!(r.value(), Some(1.49));
        assert_eq!(r.observed_on(), Some(d(3, 21)));
    }
}
