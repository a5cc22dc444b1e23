//! ASCII plotting of yield curves for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - one marker glyph per observed column (`o`, `s`, `^`, `x`, `+`, ...)
//! - `.` connecting consecutive maturities of the same column
//! - absent cells are skipped (the line bridges over them)

use crate::table::YieldTable;

const MARKERS: [char; 6] = ['o', 's', '^', 'x', '+', '#'];

/// Render every observed column of `table` as a curve over maturity.
pub fn render_ascii_plot(table: &YieldTable, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let curves: Vec<(char, String, Vec<(f64, f64)>)> = table
        .observed_columns()
        .enumerate()
        .map(|(i, col)| {
            let points: Vec<(f64, f64)> = table
                .years
                .iter()
                .zip(&col.values)
                .filter_map(|(&x, v)| v.map(|y| (x, y)))
                .collect();
            let legend = match col.target_date() {
                Some(date) => format!("{} ({date})", col.label),
                None => col.label.clone(),
            };
            (MARKERS[i % MARKERS.len()], legend, points)
        })
        .collect();

    let (x_min, x_max) = pad_degenerate(axis_range(table.years.iter().copied()).unwrap_or((0.0, 30.0)));
    let (y_min, y_max) = axis_range(curves.iter().flat_map(|(_, _, pts)| pts.iter().map(|p| p.1)))
        .map(|r| pad_range(pad_degenerate(r), 0.05))
        .unwrap_or((0.0, 1.0));

    let mut grid = vec![vec![' '; width]; height];

    // Lines first so markers overlay them.
    for (_, _, points) in &curves {
        let mut prev = None;
        for &(x, y) in points {
            let cell = (map_x(x, x_min, x_max, width), map_y(y, y_min, y_max, height));
            if let Some((x0, y0)) = prev {
                draw_line(&mut grid, x0, y0, cell.0, cell.1, '.');
            }
            prev = Some(cell);
        }
    }
    for (marker, _, points) in &curves {
        for &(x, y) in points {
            grid[map_y(y, y_min, y_max, height)][map_x(x, x_min, x_max, width)] = *marker;
        }
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: maturity=[{x_min:.0}, {x_max:.0}] years | real yield=[{y_min:.2}, {y_max:.2}]%\n"
    ));
    for row in grid {
        let line: String = row.into_iter().collect();
        out.push_str(line.trim_end());
        out.push('\n');
    }
    for (marker, legend, _) in &curves {
        out.push_str(&format!("{marker} {legend}\n"));
    }

    out
}

fn axis_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values.filter(|v| v.is_finite()) {
        min = min.min(v);
        max = max.max(v);
    }
    if min.is_finite() && max.is_finite() { Some((min, max)) } else { None }
}

/// Widen a zero-width range so the mapping stays defined.
fn pad_degenerate((min, max): (f64, f64)) -> (f64, f64) {
    if (max - min).abs() < 1e-12 {
        (min - 1.0, max + 1.0)
    } else {
        (min, max)
    }
}

fn pad_range((min, max): (f64, f64), frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Integer line drawing (Bresenham-ish). Only fills blank cells.
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::table::{Column, ColumnKind};

    fn table(values: Vec<Option<f64>>) -> YieldTable {
        let date = NaiveDate::from_ymd_opt(2025, 3, 21).unwrap();
        YieldTable {
            rows: vec!["5 Yr".to_string(), "10 Yr".to_string()],
            years: vec![5.0, 10.0],
            columns: vec![
                Column {
                    label: "This Week".to_string(),
                    kind: ColumnKind::Observed { date },
                    observed_on: vec![Some(date); values.len()],
                    values,
                },
                Column {
                    label: "Change".to_string(),
                    kind: ColumnKind::Derived {
                        minuend: "This Week".to_string(),
                        subtrahend: "This Week".to_string(),
                    },
                    values: vec![Some(0.0), Some(0.0)],
                    observed_on: Vec::new(),
                },
            ],
            diagnostics: Vec::new(),
        }
    }

    #[test]
    fn markers_land_on_expected_cells() {
        let txt = render_ascii_plot(&table(vec![Some(2.0), Some(3.0)]), 10, 5);
        let lines: Vec<&str> = txt.lines().collect();

        assert_eq!(lines[0], "Plot: maturity=[5, 10] years | real yield=[1.95, 3.05]%");
        // Highest yield (10 Yr) top-right, lowest (5 Yr) bottom-left.
        assert_eq!(lines[1].chars().nth(9), Some('o'));
        assert_eq!(lines[5].chars().next(), Some('o'));
        assert!(lines[3].contains('.'));
        // Derived columns are not plotted.
        assert_eq!(lines[6], "o This Week (2025-03-21)");
        assert_eq!(lines.len(), 7);
    }

    #[test]
    fn absent_cells_are_skipped() {
        let txt = render_ascii_plot(&table(vec![Some(2.0), None]), 10, 5);
        let markers = txt.lines().skip(1).take(5).flat_map(|l| l.chars()).filter(|&c| c == 'o').count();
        assert_eq!(markers, 1);
        assert!(!txt.lines().skip(1).take(5).any(|l| l.contains('.')));
    }
}
