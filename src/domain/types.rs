//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - deserialized straight from the TOML configuration
//! - used in-memory while resolving and assembling tables
//! - exported to JSON/CSV

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// One row of the table: a maturity label bound to a data-provider key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    /// Row label, e.g. `"10 Yr"`.
    pub label: String,
    /// Source key, e.g. the FRED series id `"DFII10"`.
    pub key: String,
    /// Maturity in years, used as the chart x coordinate.
    pub years: f64,
}

/// A single point from a time series.
///
/// `value` is `None` when the source published nothing usable for that day
/// (holiday, sentinel such as `"."`, non-numeric text).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

impl Observation {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self {
            date,
            value: Some(value),
        }
    }

    pub fn missing(date: NaiveDate) -> Self {
        Self { date, value: None }
    }

    /// The value if it is usable for a lookup.
    pub fn valid_value(&self) -> Option<f64> {
        self.value.filter(|v| v.is_finite())
    }
}

/// How a target date is computed from the run's as-of date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum DateRule {
    /// A literal calendar date.
    Fixed { date: NaiveDate },
    /// January 1 of the as-of year.
    StartOfYear,
    /// `days` calendar days before the as-of date.
    DaysAgo { days: u32 },
    /// Most recent `weekday` on or before the as-of date, moved back
    /// `weeks_back` whole weeks.
    Weekday {
        weekday: Weekday,
        #[serde(default)]
        weeks_back: u32,
    },
    /// The as-of date itself.
    Latest,
}

impl DateRule {
    /// Resolve the rule against `as_of`. Independent of data availability.
    pub fn resolve(&self, as_of: NaiveDate) -> NaiveDate {
        match *self {
            DateRule::Fixed { date } => date,
            DateRule::StartOfYear => NaiveDate::from_ymd_opt(as_of.year(), 1, 1).unwrap_or(as_of),
            DateRule::DaysAgo { days } => days_before(as_of, i64::from(days)),
            DateRule::Weekday { weekday, weeks_back } => {
                let today = as_of.weekday().num_days_from_monday();
                let wanted = weekday.num_days_from_monday();
                let back = (today + 7 - wanted) % 7;
                days_before(as_of, i64::from(back) + 7 * i64::from(weeks_back))
            }
            DateRule::Latest => as_of,
        }
    }
}

/// `date - days`, clamped to the earliest representable date.
pub fn days_before(date: NaiveDate, days: i64) -> NaiveDate {
    date.checked_sub_signed(Duration::days(days)).unwrap_or(NaiveDate::MIN)
}

/// `date + days`, clamped to the latest representable date.
pub fn days_after(date: NaiveDate, days: i64) -> NaiveDate {
    date.checked_add_signed(Duration::days(days)).unwrap_or(NaiveDate::MAX)
}

/// A configured column: label plus date rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDate {
    pub label: String,
    #[serde(flatten)]
    pub rule: DateRule,
}

impl TargetDate {
    pub fn resolve(&self, as_of: NaiveDate) -> ResolvedTarget {
        ResolvedTarget {
            label: self.label.clone(),
            date: self.rule.resolve(as_of),
        }
    }
}

/// A target date after applying its rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTarget {
    pub label: String,
    pub date: NaiveDate,
}

/// A derived column: `round(minuend - subtrahend, 2)` per row.
///
/// For a change column the minuend is the newer date (`latest - previous`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedColumn {
    pub label: String,
    pub minuend: String,
    pub subtrahend: String,
}

/// Directional policy for resolving a target date to an observation.
///
/// Exactly one policy is applied to every cell in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LookupPolicy {
    /// Latest valid observation in `[target - max_days, target]`. No lookahead.
    OnOrBefore { max_days: u32 },
    /// Closest valid observation within `max_days` either side; ties go to
    /// the earlier date.
    Nearest { max_days: u32 },
}

impl Default for LookupPolicy {
    fn default() -> Self {
        LookupPolicy::OnOrBefore { max_days: 7 }
    }
}

impl LookupPolicy {
    pub fn from_kind(kind: PolicyKind, max_days: u32) -> Self {
        match kind {
            PolicyKind::OnOrBefore => LookupPolicy::OnOrBefore { max_days },
            PolicyKind::Nearest => LookupPolicy::Nearest { max_days },
        }
    }

    pub fn kind(self) -> PolicyKind {
        match self {
            LookupPolicy::OnOrBefore { .. } => PolicyKind::OnOrBefore,
            LookupPolicy::Nearest { .. } => PolicyKind::Nearest,
        }
    }

    pub fn max_days(self) -> u32 {
        match self {
            LookupPolicy::OnOrBefore { max_days } | LookupPolicy::Nearest { max_days } => max_days,
        }
    }

    /// Inclusive date range a source must cover for a lookup at `target`.
    pub fn window(self, target: NaiveDate) -> (NaiveDate, NaiveDate) {
        let span = i64::from(self.max_days());
        match self {
            LookupPolicy::OnOrBefore { .. } => (days_before(target, span), target),
            LookupPolicy::Nearest { .. } => (days_before(target, span), days_after(target, span)),
        }
    }

    /// Same policy kind, other window.
    pub fn with_max_days(self, max_days: u32) -> Self {
        LookupPolicy::from_kind(self.kind(), max_days)
    }

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> String {
        match self {
            LookupPolicy::OnOrBefore { max_days } => format!("on-or-before ({max_days}d)"),
            LookupPolicy::Nearest { max_days } => format!("nearest (±{max_days}d)"),
        }
    }
}

/// CLI-facing policy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyKind {
    OnOrBefore,
    Nearest,
}

impl PolicyKind {
    pub fn toggle(self) -> Self {
        match self {
            PolicyKind::OnOrBefore => PolicyKind::Nearest,
            PolicyKind::Nearest => PolicyKind::OnOrBefore,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn date_rules_resolve_against_as_of() {
        // 2025-03-26 is a Wednesday.
        let as_of = d(2025, 3, 26);
        assert_eq!(DateRule::StartOfYear.resolve(as_of), d(2025, 1, 1));
        assert_eq!(DateRule::Latest.resolve(as_of), as_of);
        assert_eq!(DateRule::DaysAgo { days: 30 }.resolve(as_of), d(2025, 2, 24));
        assert_eq!(
            DateRule::Fixed { date: d(2024, 12, 31) }.resolve(as_of),
            d(2024, 12, 31)
        );
        assert_eq!(
            DateRule::Weekday { weekday: Weekday::Fri, weeks_back: 0 }.resolve(as_of),
            d(2025, 3, 21)
        );
        assert_eq!(
            DateRule::Weekday { weekday: Weekday::Fri, weeks_back: 1 }.resolve(as_of),
            d(2025, 3, 14)
        );
    }

    #[test]
    fn weekday_rule_includes_the_as_of_day() {
        let friday = d(2025, 3, 21);
        let rule = DateRule::Weekday { weekday: Weekday::Fri, weeks_back: 0 };
        assert_eq!(rule.resolve(friday), friday);
    }

    #[test]
    fn policy_windows() {
        let t = d(2025, 3, 21);
        assert_eq!(
            LookupPolicy::OnOrBefore { max_days: 3 }.window(t),
            (d(2025, 3, 18), t)
        );
        assert_eq!(
            LookupPolicy::Nearest { max_days: 3 }.window(t),
            (d(2025, 3, 18), d(2025, 3, 24))
        );
    }

    #[test]
    fn huge_offsets_clamp_to_the_date_range() {
        let t = d(2025, 1, 1);
        assert_eq!(DateRule::DaysAgo { days: u32::MAX }.resolve(t), NaiveDate::MIN);
        assert_eq!(
            DateRule::Weekday { weekday: Weekday::Fri, weeks_back: u32::MAX }.resolve(t),
            NaiveDate::MIN
        );
        assert_eq!(
            LookupPolicy::OnOrBefore { max_days: 4_000_000_000 }.window(t),
            (NaiveDate::MIN, t)
        );
        assert_eq!(
            LookupPolicy::Nearest { max_days: u32::MAX }.window(t),
            (NaiveDate::MIN, NaiveDate::MAX)
        );
        assert_eq!(days_after(t, 1), d(2025, 1, 2));
    }

    #[test]
    fn sentinel_observation_is_not_valid() {
        let t = d(2025, 1, 1);
        assert_eq!(Observation::missing(t).valid_value(), None);
        assert_eq!(Observation::new(t, f64::NAN).valid_value(), None);
        assert_eq!(Observation::new(t, 0.0).valid_value(), Some(0.0));
    }
}
