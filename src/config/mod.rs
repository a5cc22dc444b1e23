//! Dashboard configuration.
//!
//! Everything that defines a run lives in a TOML file rather than in code:
//! the series table, target date rules, derived columns, lookup policy and
//! the data source. Credentials never appear here; the FRED key comes from
//! the environment (`FRED_API_KEY`, optionally via `.env`).
//!
//! When no path is given, the bundled `config/default.toml` is used.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::{DerivedColumn, LookupPolicy, Observation, Series, TargetDate};
use crate::table::{LayoutError, validate_layout};

/// The bundled live-data configuration.
pub const DEFAULT_CONFIG: &str = include_str!("../../config/default.toml");

const DEFAULT_TITLE: &str = "Real Yields on US Treasury Securities";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read '{path}': {reason}")]
    Read { path: String, reason: String },
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error("series '{0}' has an empty source key")]
    EmptyKey(String),
    #[error("series '{label}' has invalid maturity {years}")]
    InvalidMaturity { label: String, years: f64 },
    #[error("invalid date '{date}' in manual values for {key}")]
    InvalidDate { key: String, date: String },
    #[error("non-finite manual value on {date} for {key}")]
    InvalidValue { key: String, date: String },
    #[error("timeout_secs must be > 0")]
    InvalidTimeout,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub policy: LookupPolicy,
    #[serde(default)]
    pub series: Vec<Series>,
    #[serde(default)]
    pub targets: Vec<TargetDate>,
    #[serde(default)]
    pub derived: Vec<DerivedColumn>,
    pub source: SourceConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Live FRED lookups.
    Fred {
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
        #[serde(default)]
        parallel: bool,
    },
    /// Literal values keyed by source key, then `"YYYY-MM-DD" = value`.
    Static {
        #[serde(default)]
        observations: BTreeMap<String, BTreeMap<String, f64>>,
    },
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl DashboardConfig {
    /// Load from `path`, or the bundled default when `None`. Always validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let text = match path {
            Some(path) => std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?,
            None => DEFAULT_CONFIG.to_string(),
        };
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let config: DashboardConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let labels: Vec<&str> = self.targets.iter().map(|t| t.label.as_str()).collect();
        validate_layout(&self.series, &labels, &self.derived)?;

        for s in &self.series {
            if s.key.trim().is_empty() {
                return Err(ConfigError::EmptyKey(s.label.clone()));
            }
            if !(s.years.is_finite() && s.years > 0.0) {
                return Err(ConfigError::InvalidMaturity {
                    label: s.label.clone(),
                    years: s.years,
                });
            }
        }

        match &self.source {
            SourceConfig::Fred { timeout_secs, .. } if *timeout_secs == 0 => {
                Err(ConfigError::InvalidTimeout)
            }
            SourceConfig::Fred { .. } => Ok(()),
            SourceConfig::Static { .. } => self.source.manual_observations().map(|_| ()),
        }
    }
}

impl SourceConfig {
    /// Parsed literal values for `kind = "static"`; empty for live sources.
    pub fn manual_observations(&self) -> Result<HashMap<String, Vec<Observation>>, ConfigError> {
        let SourceConfig::Static { observations } = self else {
            return Ok(HashMap::new());
        };

        let mut out = HashMap::with_capacity(observations.len());
        for (key, points) in observations {
            let mut series = Vec::with_capacity(points.len());
            for (raw_date, &value) in points {
                let date = NaiveDate::parse_from_str(raw_date.trim(), "%Y-%m-%d").map_err(|_| {
                    ConfigError::InvalidDate {
                        key: key.clone(),
                        date: raw_date.clone(),
                    }
                })?;
                if !value.is_finite() {
                    return Err(ConfigError::InvalidValue {
                        key: key.clone(),
                        date: raw_date.clone(),
                    });
                }
                series.push(Observation::new(date, value));
            }
            out.insert(key.clone(), series);
        }
        Ok(out)
    }

    pub fn parallel(&self) -> bool {
        matches!(self, SourceConfig::Fred { parallel: true, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    use crate::domain::DateRule;

    const MANUAL: &str = include_str!("../../config/manual.toml");

    #[test]
    fn bundled_default_parses() {
        let config = DashboardConfig::load(None).unwrap();
        let labels: Vec<&str> = config.series.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["5 Yr", "7 Yr", "10 Yr", "20 Yr", "30 Yr"]);
        assert_eq!(config.series[2].key, "DFII10");
        assert_eq!(config.policy, LookupPolicy::OnOrBefore { max_days: 7 });
        assert!(matches!(config.source, SourceConfig::Fred { timeout_secs: 10, .. }));

        assert_eq!(config.targets[0].rule, DateRule::StartOfYear);
        assert_eq!(
            config.targets[1].rule,
            DateRule::Weekday { weekday: Weekday::Fri, weeks_back: 1 }
        );

        // Weekly change is latest minus previous.
        let change = &config.derived[0];
        assert_eq!(change.minuend, config.targets[2].label);
        assert_eq!(change.subtrahend, config.targets[1].label);
    }

    #[test]
    fn bundled_manual_parses() {
        let config = DashboardConfig::parse(MANUAL).unwrap();
        let obs = config.source.manual_observations().unwrap();
        let five = &obs["DFII5"];
        assert_eq!(five.len(), 3);
        assert!(five.iter().any(|o| o.value == Some(1.49)));
        assert_eq!(config.targets.len(), 3);
    }

    #[test]
    fn empty_series_is_rejected() {
        let text = r#"
            [source]
            kind = "fred"

            [[targets]]
            label = "Today"
            rule = "latest"
        "#;
        let err = DashboardConfig::parse(text).unwrap_err();
        assert!(matches!(err, ConfigError::Layout(LayoutError::NoSeries)));
    }

    #[test]
    fn derived_operand_must_exist() {
        let text = r#"
            [source]
            kind = "fred"

            [[series]]
            label = "5 Yr"
            key = "DFII5"
            years = 5

            [[targets]]
            label = "Today"
            rule = "latest"

            [[derived]]
            label = "Change"
            minuend = "Today"
            subtrahend = "Yesterday"
        "#;
        let err = DashboardConfig::parse(text).unwrap_err();
        assert!(matches!(err, ConfigError::Layout(LayoutError::UnknownOperand { .. })));
    }

    #[test]
    fn bad_manual_date_is_rejected() {
        let text = r#"
            [source]
            kind = "static"

            [source.observations.DFII5]
            "01/01/2025" = 2.0

            [[series]]
            label = "5 Yr"
            key = "DFII5"
            years = 5

            [[targets]]
            label = "A"
            rule = "fixed"
            date = "2025-01-01"
        "#;
        let err = DashboardConfig::parse(text).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDate { .. }));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let text = r#"
            [source]
            kind = "fred"
            timeout_secs = 0

            [[series]]
            label = "5 Yr"
            key = "DFII5"
            years = 5

            [[targets]]
            label = "A"
            rule = "days_ago"
            days = 7
        "#;
        assert!(matches!(
            DashboardConfig::parse(text).unwrap_err(),
            ConfigError::InvalidTimeout
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = DashboardConfig::load(Some(Path::new("does/not/exist.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
