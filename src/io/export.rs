//! Export a built yield table to CSV or JSON.
//!
//! Exports are meant to be easy to consume in spreadsheets or downstream
//! scripts: one row per maturity, one column per table column, blank (CSV) or
//! `null` (JSON) for absent cells. Values are written unrounded.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;

use crate::app::pipeline::RunOutput;
use crate::domain::LookupPolicy;
use crate::error::AppError;
use crate::table::YieldTable;

/// Write the table as CSV.
pub fn write_table_csv(path: &Path, table: &YieldTable) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::runtime(format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_csv(file, table)
}

fn write_csv<W: Write>(out: W, table: &YieldTable) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(out);

    let mut header = vec!["maturity".to_string(), "years".to_string()];
    header.extend(table.columns.iter().map(|c| c.label.clone()));
    writer
        .write_record(&header)
        .map_err(|e| AppError::runtime(format!("Failed to write export CSV header: {e}")))?;

    for (row, label) in table.rows.iter().enumerate() {
        let mut record = vec![label.clone(), table.years[row].to_string()];
        record.extend(table.columns.iter().map(|c| {
            c.values
                .get(row)
                .copied()
                .flatten()
                .map(|v| v.to_string())
                .unwrap_or_default()
        }));
        writer
            .write_record(&record)
            .map_err(|e| AppError::runtime(format!("Failed to write export CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::runtime(format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct TableFile<'a> {
    tool: &'static str,
    title: &'a str,
    as_of: NaiveDate,
    policy: LookupPolicy,
    source: &'a str,
    table: &'a YieldTable,
}

/// Write the run (metadata + table + diagnostics) as pretty JSON.
pub fn write_table_json(path: &Path, run: &RunOutput) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::runtime(format!("Failed to create export JSON '{}': {e}", path.display())))?;
    write_json(file, run)
}

/// The JSON document as a string (used by `ry table --json`).
pub fn table_json_string(run: &RunOutput) -> Result<String, AppError> {
    let mut buf = Vec::new();
    write_json(&mut buf, run)?;
    String::from_utf8(buf).map_err(|e| AppError::runtime(format!("Invalid UTF-8 in JSON output: {e}")))
}

fn write_json<W: Write>(out: W, run: &RunOutput) -> Result<(), AppError> {
    let doc = TableFile {
        tool: "ry",
        title: &run.title,
        as_of: run.as_of,
        policy: run.policy,
        source: &run.source,
        table: &run.table,
    };
    serde_json::to_writer_pretty(out, &doc)
        .map_err(|e| AppError::runtime(format!("Failed to write export JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Column, ColumnKind};

    fn run() -> RunOutput {
        let a = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        RunOutput {
            title: "Real Yields".to_string(),
            as_of: a,
            policy: LookupPolicy::OnOrBefore { max_days: 7 },
            source: "manual".to_string(),
            targets: Vec::new(),
            table: YieldTable {
                rows: vec!["5 Yr".to_string(), "10 Yr".to_string()],
                years: vec![5.0, 10.0],
                columns: vec![Column {
                    label: "A".to_string(),
                    kind: ColumnKind::Observed { date: a },
                    values: vec![Some(2.0), None],
                    observed_on: vec![Some(a), None],
                }],
                diagnostics: Vec::new(),
            },
        }
    }

    #[test]
    fn csv_leaves_absent_cells_blank() {
        let mut buf = Vec::new();
        write_csv(&mut buf, &run().table).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "maturity,years,A\n5 Yr,5,2\n10 Yr,10,\n");
    }

    #[test]
    fn json_exposes_columns_in_order_with_nulls() {
        let text = table_json_string(&run()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["policy"]["kind"], "on_or_before");
        assert_eq!(value["table"]["rows"][1], "10 Yr");
        let col = &value["table"]["columns"][0];
        assert_eq!(col["label"], "A");
        assert_eq!(col["kind"], "observed");
        assert_eq!(col["date"], "2025-01-01");
        assert_eq!(col["values"][0], 2.0);
        assert!(col["values"][1].is_null());
    }
}
