//! Per-well plot artifacts.
//!
//! The pipeline never renders anything itself: it hands a [`WellPlot`] to a
//! [`PlotSink`] once per successfully fitted well (never for failed wells)
//! and expects nothing back. The PNG renderer in [`png`] is the production
//! sink; tests substitute a recording sink.

pub mod png;

pub use png::*;

use crate::domain::{FitParams, TransitionWindow};
use crate::error::AppError;

/// Everything the renderer needs for one well.
#[derive(Debug, Clone)]
pub struct WellPlot<'a> {
    pub well: &'a str,
    /// Full temperature gradient.
    pub temperature: &'a [f64],
    /// The trace the fit was computed against (normalized when the run
    /// normalizes).
    pub fluorescence: &'a [f64],
    pub params: FitParams,
    /// Supplies the fixed plateaus for curve evaluation and the extent of the
    /// Tm marker.
    pub window: TransitionWindow,
    /// Marker position; absent when Tm is undefined for the fitted
    /// parameters.
    pub tm: Option<f64>,
}

/// Sink for per-well plot requests.
pub trait PlotSink {
    fn plot_well(&self, plot: &WellPlot<'_>) -> Result<(), AppError>;
}
