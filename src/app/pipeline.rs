//! Shared "table pipeline" logic used by both CLI and TUI front-ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! config -> target dates -> source -> per-cell resolution -> derived columns
//!
//! The CLI and the TUI can then focus on presentation (printing vs widgets).

use std::time::Duration;

use chrono::{Local, NaiveDate};
use tracing::info;

use crate::config::{DashboardConfig, SourceConfig};
use crate::data::{FredClient, ObservationSource, StaticSource};
use crate::domain::{LookupPolicy, ResolvedTarget};
use crate::error::AppError;
use crate::resolve::SnapshotResolver;
use crate::table::{YieldTable, assemble};

/// Per-run settings layered over the configuration file.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    /// Anchor for relative date rules.
    pub as_of: NaiveDate,
    pub policy: LookupPolicy,
    pub parallel: bool,
}

impl RunSettings {
    /// Settings straight from the configuration, anchored at today.
    pub fn from_config(config: &DashboardConfig) -> Self {
        Self {
            as_of: Local::now().date_naive(),
            policy: config.policy,
            parallel: config.source.parallel(),
        }
    }
}

/// All computed outputs of a single table build.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub title: String,
    pub as_of: NaiveDate,
    pub policy: LookupPolicy,
    pub source: String,
    pub targets: Vec<ResolvedTarget>,
    pub table: YieldTable,
}

/// Build the observation source described by the configuration.
pub fn build_source(source: &SourceConfig) -> Result<Box<dyn ObservationSource>, AppError> {
    match source {
        SourceConfig::Fred { timeout_secs, .. } => {
            let client = FredClient::from_env(Duration::from_secs(*timeout_secs))?;
            Ok(Box::new(client))
        }
        SourceConfig::Static { .. } => {
            let observations = source.manual_observations()?;
            Ok(Box::new(StaticSource::new(observations)))
        }
    }
}

/// Resolve target dates, build the source and assemble the table.
pub fn run_table(config: &DashboardConfig, settings: &RunSettings) -> Result<RunOutput, AppError> {
    let source = build_source(&config.source)?;
    run_table_with_source(config, settings, source)
}

/// Same as `run_table`, with a caller-provided source.
///
/// The TUI keeps one source alive across refreshes; tests inject fakes.
pub fn run_table_with_source<S: ObservationSource>(
    config: &DashboardConfig,
    settings: &RunSettings,
    source: S,
) -> Result<RunOutput, AppError> {
    let targets: Vec<ResolvedTarget> = config
        .targets
        .iter()
        .map(|t| t.resolve(settings.as_of))
        .collect();

    info!(
        as_of = %settings.as_of,
        policy = %settings.policy.display_name(),
        source = source.name(),
        "building table"
    );

    let source_name = source.name().to_string();
    let resolver = SnapshotResolver::new(source, &config.series, settings.policy);
    let table = assemble(
        &resolver,
        &config.series,
        &targets,
        &config.derived,
        settings.parallel,
    )?;

    Ok(RunOutput {
        title: config.title.clone(),
        as_of: settings.as_of,
        policy: settings.policy,
        source: source_name,
        targets,
        table,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_config_reproduces_the_literal_table() {
        let config = DashboardConfig::parse(include_str!("../../config/manual.toml")).unwrap();
        let settings = RunSettings {
            as_of: NaiveDate::from_ymd_opt(2025, 3, 24).unwrap(),
            policy: config.policy,
            parallel: false,
        };

        let run = run_table(&config, &settings).unwrap();
        let t = &run.table;

        assert_eq!(run.source, "manual");
        assert_eq!(t.value("5 Yr", "01/01/2025"), Some(2.00));
        assert_eq!(t.value("30 Yr", "03/14/2025"), Some(2.38));
        let change = t.value("10 Yr", "Weekly Change").unwrap();
        assert!((change - (-0.09)).abs() < 1e-12);
        assert!(t.diagnostics.is_empty());
    }

    #[test]
    fn relative_targets_follow_as_of() {
        let mut config = DashboardConfig::parse(include_str!("../../config/manual.toml")).unwrap();
        config.targets[2].rule = crate::domain::DateRule::Latest;
        let settings = RunSettings {
            as_of: NaiveDate::from_ymd_opt(2025, 3, 23).unwrap(),
            policy: LookupPolicy::OnOrBefore { max_days: 7 },
            parallel: false,
        };

        let run = run_table_with_source(
            &config,
            &settings,
            build_source(&config.source).unwrap(),
        )
        .unwrap();

        // Sunday resolves back to Friday's value.
        assert_eq!(run.targets[2].date, settings.as_of);
        assert_eq!(run.table.value("20 Yr", "03/21/2025"), Some(2.21));
        assert_eq!(run.policy, settings.policy);
    }
}
