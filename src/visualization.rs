/// Visualization module: one stacked-bar subplot per category.
///
/// Layout is a pure function of the category count and the chart settings
/// (`layout`), so figure geometry can be checked without a drawing backend.
/// `render` then draws into an in-memory RGB buffer with plotters:
/// - a bold figure title pinned 10px below the top edge
/// - per category, a bar per year: sighting rate at the bottom, its
///   complement stacked on top, and an `observed/total` annotation
/// - a footnote pinned 10px above the bottom edge
use std::ops::Range;

use image::RgbImage;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use tracing::info;

use crate::aggregation::YearlyStats;
use crate::config::{ChartConfig, MARGIN_BAND_PX};
use crate::error::SurveyError;

// ── Layout constants ────────────────────────────────────────────────────────

pub const TITLE_OFFSET_PX: f64 = 10.0;
pub const FOOTNOTE_OFFSET_PX: f64 = 10.0;
pub const LEFT_FRACTION: f64 = 0.10;
pub const RIGHT_FRACTION: f64 = 0.95;
/// Vertical gap between subplots, relative to one subplot's axes height.
pub const SUBPLOT_GAP: f64 = 0.4;
/// Height of the bar annotations in data units.
pub const ANNOTATION_Y: f64 = 0.1;

const YEAR_AXIS_PAD: f64 = 0.3;
const Y_LABEL_AREA_PX: i32 = 60;
const X_LABEL_AREA_PX: i32 = 24;
const CAPTION_GAP_PX: i32 = 6;

const FONT: &str = "sans-serif";
const TITLE_FONT_PX: f64 = 20.0;
const CAPTION_FONT_PX: f64 = 16.0;
const LABEL_FONT_PX: f64 = 13.0;
const ANNOTATION_FONT_PX: f64 = 16.0;
const FOOTNOTE_FONT_PX: f64 = 13.0;

pub const Y_AXIS_LABEL: &str = "% seen";
pub const FOOTNOTE: &str =
    "***The numbers in the bar chart represent the number of successful sightings per year.";

// ── Layout ──────────────────────────────────────────────────────────────────

/// Pixel rectangle of one subplot's plotting area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxesBox {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl AxesBox {
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }
}

/// Figure geometry for a given number of subplots.
///
/// Fractions follow the usual figure convention: measured from the left and
/// bottom edges, in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutPlan {
    pub width_px: u32,
    pub height_px: u32,
    pub subplot_count: usize,
    pub title_y: f64,
    pub footnote_y: f64,
    pub left: f64,
    pub right: f64,
    pub bottom: f64,
    pub top: f64,
    pub hspace: f64,
    /// One per subplot, top to bottom.
    pub axes: Vec<AxesBox>,
}

impl LayoutPlan {
    /// Pixel row of the title's top edge.
    pub fn title_offset_px(&self) -> i32 {
        ((1.0 - self.title_y) * self.height_px as f64).round() as i32
    }

    /// Pixel row of the footnote's bottom edge.
    pub fn footnote_baseline_px(&self) -> i32 {
        ((1.0 - self.footnote_y) * self.height_px as f64).round() as i32
    }
}

/// Scale the figure linearly with the category count; a category never
/// shrinks the space given to the others.
pub fn layout(category_count: usize, chart: &ChartConfig) -> LayoutPlan {
    let rows = category_count.max(1);
    let width = chart.subplot_width_px as f64;
    let height = chart.subplot_height_px as f64 * rows as f64;

    let bottom = MARGIN_BAND_PX / height;
    let top = 1.0 - MARGIN_BAND_PX / height;

    let stack_px = (top - bottom) * height;
    let axes_px = stack_px / (rows as f64 + SUBPLOT_GAP * (rows as f64 - 1.0));
    let step_px = axes_px * (1.0 + SUBPLOT_GAP);
    let first_top = (1.0 - top) * height;

    let left_px = (LEFT_FRACTION * width).round() as i32;
    let right_px = (RIGHT_FRACTION * width).round() as i32;
    let axes = (0..category_count)
        .map(|i| {
            let y0 = first_top + i as f64 * step_px;
            AxesBox {
                left: left_px,
                top: y0.round() as i32,
                right: right_px,
                bottom: (y0 + axes_px).round() as i32,
            }
        })
        .collect();

    LayoutPlan {
        width_px: chart.subplot_width_px,
        height_px: height.round() as u32,
        subplot_count: category_count,
        title_y: 1.0 - TITLE_OFFSET_PX / height,
        footnote_y: FOOTNOTE_OFFSET_PX / height,
        left: LEFT_FRACTION,
        right: RIGHT_FRACTION,
        bottom,
        top,
        hspace: SUBPLOT_GAP,
        axes,
    }
}

/// x-axis span: every year, half a bar plus a margin on each side.
pub fn year_axis(first: i32, last: i32, bar_width: f64) -> Range<f64> {
    let pad = bar_width / 2.0 + YEAR_AXIS_PAD;
    (f64::from(first) - pad)..(f64::from(last) + pad)
}

/// Tick labels only on whole years.
fn year_tick_label(value: &f64) -> String {
    if value.fract().abs() < 1e-9 {
        format!("{}", value.round() as i64)
    } else {
        String::new()
    }
}

// ── Rendering ───────────────────────────────────────────────────────────────

/// A fully drawn figure, ready to be persisted.
#[derive(Debug, Clone)]
pub struct RenderedFigure {
    image: RgbImage,
    plan: LayoutPlan,
}

impl RenderedFigure {
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn plan(&self) -> &LayoutPlan {
        &self.plan
    }
}

fn render_error<E: std::fmt::Display>(err: E) -> SurveyError {
    SurveyError::Render(err.to_string())
}

/// Draw the whole figure.
///
/// Output depends only on the inputs; rendering twice yields identical pixels.
pub fn render(
    stats: &YearlyStats,
    sheet_label: &str,
    title: &str,
    chart: &ChartConfig,
) -> Result<RenderedFigure, SurveyError> {
    let (first, last) = stats
        .year_span()
        .ok_or_else(|| SurveyError::Render("no survey years to plot".into()))?;

    let plan = layout(stats.categories().len(), chart);
    let (w, h) = (plan.width_px, plan.height_px);
    let mut buffer = vec![0u8; w as usize * h as usize * 3];

    {
        let root = BitMapBackend::with_buffer(&mut buffer, (w, h)).into_drawing_area();
        root.fill(&WHITE).map_err(render_error)?;

        let heading = format!("{sheet_label}: {title}");
        let heading_style = (FONT, TITLE_FONT_PX)
            .into_font()
            .style(FontStyle::Bold)
            .color(&BLACK)
            .pos(Pos::new(HPos::Center, VPos::Top));
        root.draw_text(&heading, &heading_style, (w as i32 / 2, plan.title_offset_px()))
            .map_err(render_error)?;

        let x_range = year_axis(first, last, chart.bar_width);
        let ticks = (last - first + 1) as usize;
        for (idx, (category, axes)) in stats.categories().iter().zip(&plan.axes).enumerate() {
            info!(category = %category, "plotting");
            draw_subplot(&root, stats, idx, axes, &x_range, ticks, chart)?;
        }

        let footnote_style = (FONT, FOOTNOTE_FONT_PX)
            .into_font()
            .color(&BLACK)
            .pos(Pos::new(HPos::Center, VPos::Bottom));
        root.draw_text(
            FOOTNOTE,
            &footnote_style,
            (w as i32 / 2, plan.footnote_baseline_px()),
        )
        .map_err(render_error)?;

        root.present().map_err(render_error)?;
    }

    let image = RgbImage::from_raw(w, h, buffer)
        .ok_or_else(|| SurveyError::Render("pixel buffer does not match figure size".into()))?;
    Ok(RenderedFigure { image, plan })
}

fn draw_subplot(
    root: &DrawingArea<BitMapBackend<'_>, Shift>,
    stats: &YearlyStats,
    idx: usize,
    axes: &AxesBox,
    x_range: &Range<f64>,
    ticks: usize,
    config: &ChartConfig,
) -> Result<(), SurveyError> {
    let category = &stats.categories()[idx];

    let caption_style = (FONT, CAPTION_FONT_PX)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Bottom));
    root.draw_text(
        category,
        &caption_style,
        ((axes.left + axes.right) / 2, axes.top - CAPTION_GAP_PX),
    )
    .map_err(render_error)?;

    // Label areas sit outside the axes box so the plotting area matches it.
    let y_label = Y_LABEL_AREA_PX.min(axes.left);
    let area = root.clone().shrink(
        (axes.left - y_label, axes.top),
        (axes.width() + y_label, axes.height() + X_LABEL_AREA_PX),
    );

    let mut chart = ChartBuilder::on(&area)
        .x_label_area_size(X_LABEL_AREA_PX)
        .y_label_area_size(y_label)
        .build_cartesian_2d(x_range.clone(), 0f64..1f64)
        .map_err(render_error)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_labels(ticks)
        .x_label_formatter(&year_tick_label)
        .y_labels(6)
        .y_label_formatter(&|v: &f64| format!("{v:.1}"))
        .y_desc(Y_AXIS_LABEL)
        .label_style((FONT, LABEL_FONT_PX).into_font())
        .draw()
        .map_err(render_error)?;

    let half = config.bar_width / 2.0;

    chart
        .draw_series(stats.years().iter().map(|s| {
            let x = f64::from(s.year);
            Rectangle::new(
                [(x - half, 0.0), (x + half, s.rate(idx))],
                config.sighting_color.filled(),
            )
        }))
        .map_err(render_error)?;

    chart
        .draw_series(stats.years().iter().map(|s| {
            let x = f64::from(s.year);
            Rectangle::new(
                [(x - half, s.rate(idx)), (x + half, s.rate(idx) + s.rate_inverse(idx))],
                config.no_sighting_color.filled(),
            )
        }))
        .map_err(render_error)?;

    let annotation_style = (FONT, ANNOTATION_FONT_PX)
        .into_font()
        .style(FontStyle::Bold)
        .color(&config.bar_text_color)
        .pos(Pos::new(HPos::Center, VPos::Bottom));
    chart
        .draw_series(stats.years().iter().map(|s| {
            Text::new(
                format!("{}/{}", s.observed(idx), s.count),
                (f64::from(s.year), ANNOTATION_Y),
                annotation_style.clone(),
            )
        }))
        .map_err(render_error)?;

    Ok(())
}
