//! Static Chart Renderer
//! Draws the report charts to SVG or PNG files with plotters.
//!
//! Charts:
//! 1. Stressor shares: bar chart, one bar per stressor
//! 2. Cumulative change: lollipops per year, added above the axis and
//!    lost below it
//! 3. Region change: diverging horizontal bars of percent change

use crate::config::ChartFormat;
use crate::stats::{RegionChange, StressorShare, YearTotals};
use log::{debug, warn};
use plotters::coord::Shift;
use plotters::prelude::*;
use serde::Serialize;
use std::ops::Range;
use std::path::{Path, PathBuf};
use thiserror::Error;

type DrawResult = Result<(), Box<dyn std::error::Error>>;

const FONT: &str = "sans-serif";

// Colors
const GAIN: RGBColor = RGBColor(112, 173, 71); // Green
const LOSS: RGBColor = RGBColor(237, 125, 49); // Orange-red
const AXIS: RGBColor = RGBColor(90, 90, 90);

pub const PALETTE: [RGBColor; 7] = [
    RGBColor(91, 155, 213),  // Blue
    RGBColor(237, 125, 49),  // Orange
    RGBColor(165, 165, 165), // Grey
    RGBColor(255, 192, 0),   // Gold
    RGBColor(68, 114, 196),  // Dark blue
    RGBColor(112, 173, 71),  // Green
    RGBColor(155, 89, 182),  // Purple
];

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to draw {path}: {message}")]
    Draw { path: PathBuf, message: String },
}

/// A chart written to disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedChart {
    pub title: String,
    pub path: PathBuf,
}

/// Views the renderer draws.
pub struct ChartViews<'a> {
    pub stressor_shares: &'a [StressorShare],
    pub yearly: &'a [YearTotals],
    pub region_changes: &'a [RegionChange],
}

enum Chart<'a> {
    StressorShares(&'a [StressorShare]),
    Cumulative(&'a [YearTotals]),
    RegionChanges(&'a [RegionChange]),
}

impl Chart<'_> {
    fn file_stem(&self) -> &'static str {
        match self {
            Chart::StressorShares(_) => "stressor_share",
            Chart::Cumulative(_) => "cumulative_change",
            Chart::RegionChanges(_) => "region_change",
        }
    }

    fn title(&self) -> &'static str {
        match self {
            Chart::StressorShares(_) => "Share of stressed colonies by stressor",
            Chart::Cumulative(_) => "Cumulative colonies added and lost",
            Chart::RegionChanges(_) => "Net colony change by region",
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Chart::StressorShares(v) => v.is_empty(),
            Chart::Cumulative(v) => v.is_empty(),
            Chart::RegionChanges(v) => v.is_empty(),
        }
    }
}

pub struct ChartRenderer {
    format: ChartFormat,
    width: u32,
    height: u32,
}

impl ChartRenderer {
    pub fn new(format: ChartFormat, width: u32, height: u32) -> Self {
        Self {
            format,
            width,
            height,
        }
    }

    /// Render every chart with data into `dir`.
    pub fn render_all(
        &self,
        dir: &Path,
        views: &ChartViews<'_>,
    ) -> Result<Vec<RenderedChart>, RenderError> {
        let charts = [
            Chart::StressorShares(views.stressor_shares),
            Chart::Cumulative(views.yearly),
            Chart::RegionChanges(views.region_changes),
        ];

        let mut rendered = Vec::new();
        for chart in &charts {
            if chart.is_empty() {
                warn!("Skipping chart `{}`: no data", chart.title());
                continue;
            }
            let path = dir.join(format!("{}.{}", chart.file_stem(), self.format.extension()));
            self.render(chart, &path)?;
            debug!("Rendered {}", path.display());
            rendered.push(RenderedChart {
                title: chart.title().to_string(),
                path,
            });
        }
        Ok(rendered)
    }

    fn render(&self, chart: &Chart<'_>, path: &Path) -> Result<(), RenderError> {
        let size = (self.width, self.height);
        let result = match self.format {
            ChartFormat::Svg => draw(SVGBackend::new(path, size).into_drawing_area(), chart),
            ChartFormat::Png => draw(BitMapBackend::new(path, size).into_drawing_area(), chart),
        };
        result.map_err(|e| RenderError::Draw {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

fn draw<DB: DrawingBackend>(root: DrawingArea<DB, Shift>, chart: &Chart<'_>) -> DrawResult
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    match chart {
        Chart::StressorShares(shares) => draw_stressor_bars(&root, chart.title(), shares)?,
        Chart::Cumulative(years) => draw_cumulative_lollipops(&root, chart.title(), years)?,
        Chart::RegionChanges(changes) => draw_region_divergence(&root, chart.title(), changes)?,
    }
    root.present()?;
    Ok(())
}

fn draw_stressor_bars<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    title: &str,
    shares: &[StressorShare],
) -> DrawResult
where
    DB::ErrorType: 'static,
{
    let labels: Vec<String> = shares.iter().map(|s| s.stressor.to_string()).collect();
    let y_max = padded_max(shares.iter().map(|s| s.share_percent));

    let mut chart = ChartBuilder::on(root)
        .caption(title, (FONT, 26))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d((0..shares.len()).into_segmented(), 0.0..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(shares.len())
        .x_label_formatter(&|v| segment_label(v, &labels))
        .y_desc("Share of stressed colonies (%)")
        .label_style((FONT, 14))
        .draw()?;

    chart.draw_series(shares.iter().enumerate().map(|(i, s)| {
        let mut bar = Rectangle::new(
            [
                (SegmentValue::Exact(i), 0.0),
                (SegmentValue::Exact(i + 1), s.share_percent),
            ],
            PALETTE[i % PALETTE.len()].filled(),
        );
        bar.set_margin(0, 0, 10, 10);
        bar
    }))?;

    Ok(())
}

fn draw_cumulative_lollipops<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    title: &str,
    years: &[YearTotals],
) -> DrawResult
where
    DB::ErrorType: 'static,
{
    let labels: Vec<String> = years.iter().map(|y| y.year.to_string()).collect();
    let top = padded_max(years.iter().map(|y| y.cumulative_added));
    let bottom = -padded_max(years.iter().map(|y| y.cumulative_lost));

    let mut chart = ChartBuilder::on(root)
        .caption(title, (FONT, 26))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(90)
        .build_cartesian_2d((0..years.len()).into_segmented(), bottom..top)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(years.len())
        .x_label_formatter(&|v| segment_label(v, &labels))
        .y_label_formatter(&|v| format!("{:.0}", v.abs()))
        .y_desc("Colonies")
        .label_style((FONT, 14))
        .draw()?;

    chart.draw_series(std::iter::once(PathElement::new(
        vec![
            (SegmentValue::Exact(0), 0.0),
            (SegmentValue::Last, 0.0),
        ],
        AXIS.stroke_width(1),
    )))?;

    for (values, color, label) in [
        (
            years.iter().map(|y| y.cumulative_added).collect::<Vec<_>>(),
            GAIN,
            "Cumulative added",
        ),
        (
            years.iter().map(|y| -y.cumulative_lost).collect::<Vec<_>>(),
            LOSS,
            "Cumulative lost",
        ),
    ] {
        chart.draw_series(values.iter().enumerate().map(|(i, &v)| {
            PathElement::new(
                vec![(SegmentValue::CenterOf(i), 0.0), (SegmentValue::CenterOf(i), v)],
                color.stroke_width(2),
            )
        }))?;
        chart
            .draw_series(
                values
                    .iter()
                    .enumerate()
                    .map(|(i, &v)| Circle::new((SegmentValue::CenterOf(i), v), 6, color.filled())),
            )?
            .label(label)
            .legend(move |(x, y)| Circle::new((x, y), 5, color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font((FONT, 14))
        .draw()?;

    Ok(())
}

fn draw_region_divergence<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    title: &str,
    changes: &[RegionChange],
) -> DrawResult
where
    DB::ErrorType: 'static,
{
    let labels: Vec<String> = changes.iter().map(|c| c.region.clone()).collect();
    let x_range = symmetric_range(changes.iter().map(|c| c.percent_change));

    let mut chart = ChartBuilder::on(root)
        .caption(title, (FONT, 26))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(130)
        .build_cartesian_2d(x_range, (0..changes.len()).into_segmented())?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(changes.len())
        .y_label_formatter(&|v| segment_label(v, &labels))
        .x_desc("(added - lost) / total colonies (%)")
        .label_style((FONT, 14))
        .draw()?;

    chart.draw_series(changes.iter().enumerate().map(|(i, c)| {
        let mut bar = Rectangle::new(
            [
                (0.0, SegmentValue::Exact(i)),
                (c.percent_change, SegmentValue::Exact(i + 1)),
            ],
            change_color(c.percent_change).filled(),
        );
        bar.set_margin(3, 3, 0, 0);
        bar
    }))?;

    Ok(())
}

/// Label of a segment's center, blank elsewhere.
fn segment_label(value: &SegmentValue<usize>, labels: &[String]) -> String {
    match value {
        SegmentValue::CenterOf(i) => labels.get(*i).cloned().unwrap_or_default(),
        _ => String::new(),
    }
}

/// Largest value plus 10% headroom; 1.0 when nothing is positive.
pub fn padded_max(values: impl Iterator<Item = f64>) -> f64 {
    let max = values.filter(|v| v.is_finite()).fold(0.0_f64, f64::max);
    if max > 0.0 {
        max * 1.1
    } else {
        1.0
    }
}

/// Axis range centered on zero that covers every value.
pub fn symmetric_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let extent = padded_max(values.map(f64::abs));
    -extent..extent
}

/// Gains and losses get different colors in the diverging chart.
pub fn change_color(value: f64) -> RGBColor {
    if value >= 0.0 {
        GAIN
    } else {
        LOSS
    }
}
