//! Plotters-powered yield curve chart widget for Ratatui.
//!
//! We render Plotters output into the Ratatui buffer using
//! `plotters-ratatui-backend`: one coloured line per target date, a legend,
//! and signed change annotations above the newest curve.

use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// One target-date curve.
pub struct ChartCurve {
    pub label: String,
    pub color: RGBColor,
    /// `(maturity years, real yield %)`, absent cells already dropped.
    pub points: Vec<(f64, f64)>,
}

/// A text label anchored at a data coordinate.
pub struct ChartNote {
    pub x: f64,
    pub y: f64,
    pub text: String,
}

/// A lightweight, render-only chart description.
///
/// All series and bounds are computed outside the render call, which keeps
/// `render()` focused on drawing.
pub struct YieldPlottersChart<'a> {
    pub curves: &'a [ChartCurve],
    pub notes: &'a [ChartNote],
    /// X bounds (maturity in years).
    pub x_bounds: [f64; 2],
    /// Y bounds (real yield, percent).
    pub y_bounds: [f64; 2],
    pub x_label: &'a str,
    pub y_label: &'a str,
    pub fmt_x: fn(f64) -> String,
    pub fmt_y: fn(f64) -> String,
}

impl<'a> Widget for YieldPlottersChart<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // When the available area is too small, Plotters may fail to build a chart.
        // In that case, we render a small hint rather than panicking.
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let [x0, x1] = self.x_bounds;
        let [y0, y1] = self.y_bounds;
        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
            return;
        }

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                // Terminal cells are low-res, so keep label areas compact.
                .set_label_area_size(LabelAreaPosition::Left, 6)
                .set_label_area_size(LabelAreaPosition::Bottom, 3)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            // Horizontal grid only; the x axis holds just a handful of maturities.
            chart
                .configure_mesh()
                .disable_x_mesh()
                .x_desc(self.x_label)
                .y_desc(self.y_label)
                .x_labels(6)
                .y_labels(5)
                .x_label_formatter(&|v| (self.fmt_x)(*v))
                .y_label_formatter(&|v| (self.fmt_y)(*v))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .light_line_style(&RGBColor(60, 60, 60))
                .bold_line_style(&RGBColor(90, 90, 90))
                .draw()?;

            for curve in self.curves {
                let color = curve.color;
                chart
                    .draw_series(LineSeries::new(curve.points.iter().copied(), &color))?
                    .label(curve.label.as_str())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 8, y)], &color));

                // A `Pixel` per point marks the actual observations; circle
                // markers render far too large through the ratatui backend.
                chart.draw_series(curve.points.iter().map(|&(x, y)| Pixel::new((x, y), WHITE)))?;
            }

            chart.draw_series(self.notes.iter().map(|n| {
                Text::new(
                    n.text.clone(),
                    (n.x, n.y),
                    ("sans-serif", 10).into_font().color(&WHITE),
                )
            }))?;

            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::LowerRight)
                .background_style(&BLACK)
                .border_style(&WHITE)
                .label_font(("sans-serif", 10).into_font().color(&WHITE))
                .draw()?;

            Ok(())
        });

        widget.render(area, buf);
    }
}
