//! PNG rendering for per-well plots.
//!
//! Each artifact shows the observed scatter, the fitted 5PL curve, and a
//! vertical marker at Tm spanning the window extrema. One file per well,
//! named by well identifier.
//!
//! Rendering is label-free: with no tick or axis text the bitmap backend
//! needs no system font stack, which keeps the dependency footprint identical
//! across platforms.

use std::fs;
use std::path::{Path, PathBuf};

use plotters::prelude::*;

use crate::error::AppError;
use crate::models::five_pl;

use super::{PlotSink, WellPlot};

const CURVE_SAMPLES: usize = 200;

/// Production sink: writes `<well>.png` files into a directory.
pub struct PngPlotSink {
    dir: PathBuf,
    width: u32,
    height: u32,
}

impl PngPlotSink {
    pub fn new(dir: PathBuf) -> Result<Self, AppError> {
        fs::create_dir_all(&dir).map_err(|e| {
            AppError::new(4, format!("Failed to create plot directory '{}': {e}", dir.display()))
        })?;
        Ok(Self {
            dir,
            width: 800,
            height: 600,
        })
    }
}

impl PlotSink for PngPlotSink {
    fn plot_well(&self, plot: &WellPlot<'_>) -> Result<(), AppError> {
        let path = self.dir.join(format!("{}.png", sanitize_file_stem(plot.well)));
        render_png(&path, plot, self.width, self.height)
    }
}

/// Render one well's plot to a PNG file.
pub fn render_png(path: &Path, plot: &WellPlot<'_>, width: u32, height: u32) -> Result<(), AppError> {
    let (x0, x1, y0, y1) = plot_bounds(plot).ok_or_else(|| {
        AppError::new(4, format!("Cannot plot well '{}': degenerate axis bounds.", plot.well))
    })?;

    let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| AppError::new(4, format!("Failed to render '{}': {e}", path.display())))?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .build_cartesian_2d(x0..x1, y0..y1)
        .map_err(|e| AppError::new(4, format!("Failed to render '{}': {e}", path.display())))?;

    // Fitted curve, sampled across the full gradient.
    let step = (x1 - x0) / (CURVE_SAMPLES as f64 - 1.0);
    let curve = (0..CURVE_SAMPLES).map(|i| {
        let t = x0 + step * i as f64;
        (t, five_pl(t, plot.window.min_fluor, plot.window.max_fluor, &plot.params))
    });
    chart
        .draw_series(LineSeries::new(curve, &BLACK))
        .map_err(|e| AppError::new(4, format!("Failed to render '{}': {e}", path.display())))?;

    // Vertical Tm marker between the window extrema.
    if let Some(tm) = plot.tm {
        let marker = RGBColor(128, 128, 128);
        chart
            .draw_series(LineSeries::new(
                [(tm, plot.window.min_fluor), (tm, plot.window.max_fluor)],
                &marker,
            ))
            .map_err(|e| AppError::new(4, format!("Failed to render '{}': {e}", path.display())))?;
    }

    // Observed readings on top.
    chart
        .draw_series(
            plot.temperature
                .iter()
                .zip(plot.fluorescence.iter())
                .map(|(&x, &y)| Circle::new((x, y), 3, BLUE.filled())),
        )
        .map_err(|e| AppError::new(4, format!("Failed to render '{}': {e}", path.display())))?;

    root.present()
        .map_err(|e| AppError::new(4, format!("Failed to write '{}': {e}", path.display())))?;

    Ok(())
}

fn plot_bounds(plot: &WellPlot<'_>) -> Option<(f64, f64, f64, f64)> {
    let x0 = *plot.temperature.first()?;
    let x1 = *plot.temperature.last()?;

    let mut y0 = f64::INFINITY;
    let mut y1 = f64::NEG_INFINITY;
    for &v in plot.fluorescence {
        y0 = y0.min(v);
        y1 = y1.max(v);
    }

    if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
        return None;
    }

    // Pad the y-range so plateau points do not sit on the frame.
    let pad = (y1 - y0) * 0.05;
    Some((x0, x1, y0 - pad, y1 + pad))
}

/// Well identifiers come from CSV headers and may contain characters that are
/// unsafe in file names.
fn sanitize_file_stem(well: &str) -> String {
    well.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
