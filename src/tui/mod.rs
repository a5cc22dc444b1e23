//! Ratatui-based terminal UI.
//!
//! The TUI renders the real yield curves for every target date, an optional
//! data table, and a status line that surfaces per-cell lookup failures.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use plotters::style::RGBColor;
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
};

use crate::app::pipeline::{RunOutput, RunSettings, build_source, run_table_with_source};
use crate::config::DashboardConfig;
use crate::data::ObservationSource;
use crate::domain::{LookupPolicy, days_after, days_before};
use crate::error::AppError;
use crate::report::{fmt_change, fmt_value};
use crate::table::YieldTable;

mod plotters_chart;

use plotters_chart::{ChartCurve, ChartNote, YieldPlottersChart};

/// Line colours per target date, in column order.
const PALETTE: [RGBColor; 5] = [
    RGBColor(135, 206, 235), // sky blue
    RGBColor(255, 165, 0),   // orange
    RGBColor(0, 255, 0),     // lime
    RGBColor(255, 0, 255),   // magenta
    RGBColor(255, 255, 0),   // yellow
];

/// Start the TUI.
pub fn run(config: DashboardConfig, settings: RunSettings) -> Result<(), AppError> {
    // Build the source (and fail on a missing API key) before touching the terminal.
    let source = build_source(&config.source)?;
    let mut app = App::new(config, settings, source);
    app.refresh();

    let _guard = TerminalGuard::new()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal =
        Terminal::new(backend).map_err(|e| AppError::runtime(format!("Failed to initialize terminal: {e}")))?;

    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::runtime(format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::runtime(format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

struct App {
    config: DashboardConfig,
    settings: RunSettings,
    source: Box<dyn ObservationSource>,
    show_table: bool,
    status: String,
    run: Option<RunOutput>,
}

impl App {
    fn new(config: DashboardConfig, settings: RunSettings, source: Box<dyn ObservationSource>) -> Self {
        Self {
            config,
            settings,
            source,
            show_table: true,
            status: String::new(),
            run: None,
        }
    }

    /// Re-resolve every cell from scratch.
    fn refresh(&mut self) {
        match run_table_with_source(&self.config, &self.settings, self.source.as_ref()) {
            Ok(run) => {
                self.status = status_for(&run.table);
                self.run = Some(run);
            }
            Err(err) => {
                self.status = format!("Refresh failed: {err}");
            }
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::runtime(format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::runtime(format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::runtime(format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the app should exit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Char('r') => self.refresh(),
            KeyCode::Char('t') => {
                self.show_table = !self.show_table;
            }
            KeyCode::Char('p') => {
                let policy = self.settings.policy;
                self.settings.policy = LookupPolicy::from_kind(policy.kind().toggle(), policy.max_days());
                self.refresh();
            }
            KeyCode::Left => self.shift_as_of(-7),
            KeyCode::Right => self.shift_as_of(7),
            _ => {}
        }
        false
    }

    fn shift_as_of(&mut self, days: i64) {
        self.settings.as_of = if days < 0 {
            days_before(self.settings.as_of, -days)
        } else {
            days_after(self.settings.as_of, days)
        };
        self.refresh();
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let lines = vec![
            Line::from(vec![
                Span::styled("ry", Style::default().fg(Color::Cyan)),
                Span::raw(format!(" - {}", self.config.title)),
            ]),
            Line::from(Span::styled(
                format!(
                    "as-of: {} | policy: {} | source: {}",
                    self.settings.as_of,
                    self.settings.policy.display_name(),
                    self.source.name(),
                ),
                Style::default().fg(Color::Gray),
            )),
        ];

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let Some(run) = &self.run else {
            let msg = Paragraph::new("Waiting for data...")
                .style(Style::default().fg(Color::Yellow))
                .block(Block::default().borders(Borders::ALL));
            frame.render_widget(msg, area);
            return;
        };

        if self.show_table {
            // Header + rule + rows + borders.
            let table_height = run.table.rows.len() as u16 + 4;
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(table_height)])
                .split(area);
            draw_chart(frame, chunks[0], &run.table);
            draw_table(frame, chunks[1], &run.table);
        } else {
            draw_chart(frame, area, &run.table);
        }
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "←/→ shift week  r refresh  p policy  t table  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

fn status_for(table: &YieldTable) -> String {
    match table.diagnostics.first() {
        None => "Loaded.".to_string(),
        Some(first) => format!(
            "{} lookup(s) failed; first: {} ({})",
            table.diagnostics.len(),
            first.message,
            first.series
        ),
    }
}

fn draw_chart(frame: &mut ratatui::Frame<'_>, area: Rect, table: &YieldTable) {
    let block = Block::default()
        .title("Real Yield Curve")
        .borders(Borders::ALL)
        .style(Style::default().bg(Color::Black));
    let inner = block.inner(area);
    frame.render_widget(block, area);
    frame.render_widget(Clear, inner);

    let series = chart_series(table);
    let (chart_rect, insets) = chart_layout(inner);
    let widget = YieldPlottersChart {
        curves: &series.curves,
        notes: &series.notes,
        x_bounds: series.x_bounds,
        y_bounds: series.y_bounds,
        x_label: "maturity (yrs)",
        y_label: "real yield (%)",
        fmt_x: fmt_axis_x,
        fmt_y: fmt_axis_y,
    };

    frame.render_widget(widget, chart_rect);
    if let Some(insets) = insets {
        draw_axis_ticks(frame, inner, chart_rect, insets, series.x_bounds, series.y_bounds);
    }
}

fn draw_table(frame: &mut ratatui::Frame<'_>, area: Rect, table: &YieldTable) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let header = Row::new(
        std::iter::once(Cell::from("Maturity")).chain(table.columns.iter().map(|c| Cell::from(c.label.clone()))),
    )
    .style(bold);

    let rows = table.rows.iter().enumerate().map(|(i, label)| {
        let cells = table.columns.iter().map(move |c| {
            let value = c.values.get(i).copied().flatten();
            if c.is_derived() {
                let color = match value {
                    Some(v) if v > 0.0 => Color::Green,
                    Some(v) if v < 0.0 => Color::Red,
                    _ => Color::Gray,
                };
                Cell::from(Span::styled(fmt_change(value), Style::default().fg(color)))
            } else {
                Cell::from(fmt_value(value))
            }
        });
        Row::new(std::iter::once(Cell::from(label.clone())).chain(cells))
    });

    let widths: Vec<Constraint> = std::iter::once(Constraint::Length(10))
        .chain(
            table
                .columns
                .iter()
                .map(|c| Constraint::Length(c.label.chars().count().max(10) as u16)),
        )
        .collect();

    let widget = Table::new(rows, widths)
        .header(header)
        .block(Block::default().title("Data").borders(Borders::ALL));
    frame.render_widget(widget, area);
}

struct ChartSeries {
    curves: Vec<ChartCurve>,
    notes: Vec<ChartNote>,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
}

/// Build chart series, change annotations and bounds from a table.
fn chart_series(table: &YieldTable) -> ChartSeries {
    let curves: Vec<ChartCurve> = table
        .observed_columns()
        .enumerate()
        .map(|(i, col)| ChartCurve {
            label: col.label.clone(),
            color: PALETTE[i % PALETTE.len()],
            points: table
                .years
                .iter()
                .zip(&col.values)
                .filter_map(|(&x, v)| v.map(|y| (x, y)))
                .collect(),
        })
        .collect();

    let (mut x_min, mut x_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for &x in &table.years {
        x_min = x_min.min(x);
        x_max = x_max.max(x);
    }
    if !x_min.is_finite() || !x_max.is_finite() || x_max <= x_min {
        x_min = 0.0;
        x_max = 30.0;
    }
    let x_pad = (x_max - x_min) * 0.03;
    let x_bounds = [x_min - x_pad, x_max + x_pad];

    let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for &(_, y) in curves.iter().flat_map(|c| c.points.iter()) {
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }
    if !y_min.is_finite() || !y_max.is_finite() || y_max <= y_min {
        y_min = if y_min.is_finite() { y_min - 0.5 } else { 0.0 };
        y_max = y_min + 1.0;
    }
    let pad = ((y_max - y_min).abs() * 0.1).max(1e-12);
    let y_bounds = [y_min - pad, y_max + pad];

    // Annotate the first change column above its minuend's points.
    let mut notes = Vec::new();
    if let Some(change) = table.derived_columns().next() {
        if let crate::table::ColumnKind::Derived { minuend, .. } = &change.kind {
            if let Some(base) = table.column(minuend) {
                for (row, &x) in table.years.iter().enumerate() {
                    let (Some(delta), Some(y)) = (
                        change.values.get(row).copied().flatten(),
                        base.values.get(row).copied().flatten(),
                    ) else {
                        continue;
                    };
                    notes.push(ChartNote {
                        x,
                        y: y + pad * 0.5,
                        text: fmt_change(Some(delta)),
                    });
                }
            }
        }
    }

    ChartSeries {
        curves,
        notes,
        x_bounds,
        y_bounds,
    }
}

fn fmt_axis_x(v: f64) -> String {
    format!("{v:.0}")
}

fn fmt_axis_y(v: f64) -> String {
    format!("{v:.2}")
}

#[derive(Debug, Clone, Copy)]
struct AxisInsets {
    left: u16,
    right: u16,
    top: u16,
    bottom: u16,
}

fn chart_layout(inner: Rect) -> (Rect, Option<AxisInsets>) {
    let insets = AxisInsets {
        left: 8,
        right: 2,
        top: 1,
        bottom: 2,
    };

    if inner.width <= insets.left + insets.right + 10 || inner.height <= insets.top + insets.bottom + 5 {
        return (inner, None);
    }

    let rect = Rect {
        x: inner.x + insets.left,
        y: inner.y + insets.top,
        width: inner.width - insets.left - insets.right,
        height: inner.height - insets.top - insets.bottom,
    };

    (rect, Some(insets))
}

fn draw_axis_ticks(
    frame: &mut ratatui::Frame<'_>,
    inner: Rect,
    chart: Rect,
    insets: AxisInsets,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
) {
    let ticks = 5usize;
    let style = Style::default().fg(Color::Gray);

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let x_val = x_bounds[0] + u * (x_bounds[1] - x_bounds[0]);
        let x = chart.x + ((chart.width - 1) as f64 * u).round() as u16;
        let label = fmt_axis_x(x_val);
        let label_len = label.len() as u16;
        let start = x.saturating_sub((label.len() / 2) as u16);
        let y = chart.y + chart.height;
        if y >= inner.y + inner.height - 1 {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let y_val = y_bounds[0] + u * (y_bounds[1] - y_bounds[0]);
        let y = chart.y + (chart.height - 1) - ((chart.height - 1) as f64 * u).round() as u16;
        let label = fmt_axis_y(y_val);
        let label_len = label.len() as u16;
        let x = inner.x + insets.left.saturating_sub(1);
        let start = x.saturating_sub(label.len() as u16);
        if start < inner.x {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    let x_label = Paragraph::new("maturity (yrs)")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Gray));
    let x_rect = Rect {
        x: chart.x,
        y: chart.y + chart.height + 1,
        width: chart.width,
        height: 1,
    };
    if x_rect.y < inner.y + inner.height {
        frame.render_widget(x_label, x_rect);
    }

    let y_label = Paragraph::new("yield %").style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD));
    let y_rect = Rect {
        x: inner.x,
        y: inner.y,
        width: insets.left.saturating_sub(1),
        height: 1,
    };
    frame.render_widget(y_label, y_rect);
}
