//! Yield table assembly.
//!
//! Rows are series (in declared order), observed columns are target dates (in
//! declared order) and derived columns follow. Each cell is resolved once;
//! a failed lookup only blanks its own cell and leaves a `Diagnostic`.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::data::ObservationSource;
use crate::domain::{DerivedColumn, ResolvedTarget, Series};
use crate::resolve::{Resolution, ResolveError, SnapshotResolver};

/// Structural problems that prevent building any table at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("no series configured")]
    NoSeries,
    #[error("no target dates configured")]
    NoTargets,
    #[error("duplicate series label '{0}'")]
    DuplicateSeries(String),
    #[error("duplicate column label '{0}'")]
    DuplicateColumn(String),
    #[error("derived column '{column}' refers to unknown target column '{operand}'")]
    UnknownOperand { column: String, operand: String },
}

/// Check rows/columns before any lookup runs.
pub fn validate_layout(
    series: &[Series],
    target_labels: &[&str],
    derived: &[DerivedColumn],
) -> Result<(), LayoutError> {
    if series.is_empty() {
        return Err(LayoutError::NoSeries);
    }
    if target_labels.is_empty() {
        return Err(LayoutError::NoTargets);
    }
    for (i, s) in series.iter().enumerate() {
        if series[..i].iter().any(|o| o.label == s.label) {
            return Err(LayoutError::DuplicateSeries(s.label.clone()));
        }
    }

    let mut seen: Vec<&str> = Vec::with_capacity(target_labels.len() + derived.len());
    for label in target_labels.iter().copied().chain(derived.iter().map(|c| c.label.as_str())) {
        if seen.contains(&label) {
            return Err(LayoutError::DuplicateColumn(label.to_string()));
        }
        seen.push(label);
    }

    for col in derived {
        for operand in [&col.minuend, &col.subtrahend] {
            if !target_labels.contains(&operand.as_str()) {
                return Err(LayoutError::UnknownOperand {
                    column: col.label.clone(),
                    operand: operand.clone(),
                });
            }
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnKind {
    Observed { date: NaiveDate },
    Derived { minuend: String, subtrahend: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub label: String,
    #[serde(flatten)]
    pub kind: ColumnKind,
    /// One entry per row, aligned with `YieldTable::rows`.
    pub values: Vec<Option<f64>>,
    /// For observed columns: the date of the observation each value came from.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub observed_on: Vec<Option<NaiveDate>>,
}

impl Column {
    pub fn is_derived(&self) -> bool {
        matches!(self.kind, ColumnKind::Derived { .. })
    }

    pub fn target_date(&self) -> Option<NaiveDate> {
        match self.kind {
            ColumnKind::Observed { date } => Some(date),
            ColumnKind::Derived { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    UnknownSeries,
    SourceUnavailable,
}

impl From<&ResolveError> for DiagnosticKind {
    fn from(err: &ResolveError) -> Self {
        match err {
            ResolveError::UnknownSeries(_) => DiagnosticKind::UnknownSeries,
            ResolveError::Source(_) => DiagnosticKind::SourceUnavailable,
        }
    }
}

/// A per-row or per-cell failure surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub series: String,
    /// `None` when the whole row failed.
    pub target: Option<String>,
    pub kind: DiagnosticKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YieldTable {
    pub rows: Vec<String>,
    /// Maturity (years) per row, for charting.
    pub years: Vec<f64>,
    pub columns: Vec<Column>,
    pub diagnostics: Vec<Diagnostic>,
}

impl YieldTable {
    pub fn column(&self, label: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.label == label)
    }

    pub fn row_index(&self, label: &str) -> Option<usize> {
        self.rows.iter().position(|r| r == label)
    }

    /// Cell value; `None` for absent cells and unknown labels alike.
    pub fn value(&self, row: &str, column: &str) -> Option<f64> {
        let i = self.row_index(row)?;
        self.column(column)?.values.get(i).copied().flatten()
    }

    pub fn observed_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| !c.is_derived())
    }

    pub fn derived_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.is_derived())
    }
}

/// Round half away from zero to two decimals.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// `round(a - b, 2)`, absent if either side is absent.
pub fn diff(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    Some(round2(a? - b?))
}

/// Build a table by resolving every `(series, target)` cell.
///
/// With `parallel`, cells are resolved on the rayon pool; output order and
/// per-cell failure isolation are unchanged.
pub fn assemble<S: ObservationSource>(
    resolver: &SnapshotResolver<S>,
    series: &[Series],
    targets: &[ResolvedTarget],
    derived: &[DerivedColumn],
    parallel: bool,
) -> Result<YieldTable, LayoutError> {
    let labels: Vec<&str> = targets.iter().map(|t| t.label.as_str()).collect();
    validate_layout(series, &labels, derived)?;

    let mut diagnostics = Vec::new();

    // Rows the resolver doesn't know are reported once and left blank.
    let mut known_rows = Vec::with_capacity(series.len());
    for (row, s) in series.iter().enumerate() {
        if resolver.is_registered(&s.label) {
            known_rows.push(row);
        } else {
            let err = ResolveError::UnknownSeries(s.label.clone());
            warn!(series = s.label.as_str(), "{err}");
            diagnostics.push(Diagnostic {
                series: s.label.clone(),
                target: None,
                kind: DiagnosticKind::from(&err),
                message: err.to_string(),
            });
        }
    }

    let cells: Vec<(usize, usize)> = known_rows
        .iter()
        .flat_map(|&row| (0..targets.len()).map(move |col| (row, col)))
        .collect();

    let lookup = |&(row, col): &(usize, usize)| {
        (row, col, resolver.resolve(&series[row].label, targets[col].date))
    };
    let results: Vec<(usize, usize, Result<Resolution, ResolveError>)> = if parallel {
        cells.par_iter().map(lookup).collect()
    } else {
        cells.iter().map(lookup).collect()
    };

    let mut columns: Vec<Column> = targets
        .iter()
        .map(|t| Column {
            label: t.label.clone(),
            kind: ColumnKind::Observed { date: t.date },
            values: vec![None; series.len()],
            observed_on: vec![None; series.len()],
        })
        .collect();

    for (row, col, result) in results {
        match result {
            Ok(resolution) => {
                columns[col].values[row] = resolution.value();
                columns[col].observed_on[row] = resolution.observed_on();
            }
            Err(err) => {
                let kind = DiagnosticKind::from(&err);
                let message = err.to_string();
                warn!(
                    series = series[row].label.as_str(),
                    target = targets[col].label.as_str(),
                    "lookup failed: {message}"
                );
                diagnostics.push(Diagnostic {
                    series: series[row].label.clone(),
                    target: Some(targets[col].label.clone()),
                    kind,
                    message,
                });
            }
        }
    }

    for spec in derived {
        let values = {
            // Operands were validated above.
            let find = |label: &str| columns.iter().position(|c| c.label == label);
            match (find(&spec.minuend), find(&spec.subtrahend)) {
                (Some(a), Some(b)) => columns[a]
                    .values
                    .iter()
                    .zip(&columns[b].values)
                    .map(|(x, y)| diff(*x, *y))
                    .collect(),
                _ => vec![None; series.len()],
            }
        };
        columns.push(Column {
            label: spec.label.clone(),
            kind: ColumnKind::Derived {
                minuend: spec.minuend.clone(),
                subtrahend: spec.subtrahend.clone(),
            },
            values,
            observed_on: Vec::new(),
        });
    }

    info!(
        rows = series.len(),
        columns = columns.len(),
        diagnostics = diagnostics.len(),
        source = resolver.source_name(),
        "assembled yield table"
    );

    Ok(YieldTable {
        rows: series.iter().map(|s| s.label.clone()).collect(),
        years: series.iter().map(|s| s.years).collect(),
        columns,
        diagnostics,
    })
}
