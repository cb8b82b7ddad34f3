//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - exported to JSON/CSV
//! - reloaded later for comparisons across runs

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// What the batch reports per well.
///
/// The three historical script variants (Tm-only, Tm-with-parameters,
/// isothermal) are one pipeline here, parameterized by this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// One `Tm` column per well.
    Tm,
    /// `infl`, `hill`, `assym` and `Tm` columns per well.
    TmWithParams,
    /// Percent unfolded at a fixed query temperature per well.
    IsothermalFraction,
}

impl OutputMode {
    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            OutputMode::Tm => "Tm",
            OutputMode::TmWithParams => "Tm + parameters",
            OutputMode::IsothermalFraction => "isothermal fraction",
        }
    }

    pub fn is_isothermal(self) -> bool {
        matches!(self, OutputMode::IsothermalFraction)
    }
}

/// One well's raw fluorescence trace, aligned with the plate's temperatures.
#[derive(Debug, Clone)]
pub struct WellTrace {
    pub id: String,
    pub fluorescence: Vec<f64>,
}

/// A full plate: one shared temperature gradient plus N well traces.
///
/// Invariants (enforced at ingest): at least 3 readings, strictly increasing
/// temperatures, every trace the same length as the gradient.
#[derive(Debug, Clone)]
pub struct Plate {
    pub temperatures: Vec<f64>,
    pub wells: Vec<WellTrace>,
}

impl Plate {
    pub fn n_readings(&self) -> usize {
        self.temperatures.len()
    }

    pub fn n_wells(&self) -> usize {
        self.wells.len()
    }
}

/// The index range of a trace believed to contain the unfolding transition,
/// plus the fluorescence extrema at those indices.
///
/// This is an explicit value threaded from the detector into the fitter and
/// the plot renderer; nothing holds it as shared state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TransitionWindow {
    pub min_ind: usize,
    pub max_ind: usize,
    pub min_fluor: f64,
    pub max_fluor: f64,
}

impl TransitionWindow {
    /// Number of trace points inside the window (inclusive bounds).
    pub fn point_count(&self) -> usize {
        if self.max_ind < self.min_ind {
            return 0;
        }
        self.max_ind - self.min_ind + 1
    }

    /// A window too small to fit three parameters over.
    ///
    /// A monotonic or flat trace collapses the window onto a single index;
    /// that is a valid detector output and must fail here, not panic later.
    pub fn is_degenerate(&self) -> bool {
        self.min_ind >= self.max_ind || self.point_count() < 3
    }

    pub fn fluor_range(&self) -> f64 {
        self.max_fluor - self.min_fluor
    }
}

/// The three fitted parameters of the 5PL model.
///
/// The plateau levels `L`/`U` are not fitted; they are held fixed at the
/// window extrema, so only the shape parameters remain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitParams {
    /// Inflection temperature `I`.
    pub inflection: f64,
    /// Hill (steepness) coefficient `H`.
    pub hill: f64,
    /// Asymmetry coefficient `A`.
    pub asymmetry: f64,
}

/// A converged, quality-gated fit for a single well.
#[derive(Debug, Clone, Serialize)]
pub struct WellFit {
    pub params: FitParams,
    /// The window the fit was restricted to (also supplies the fixed `L`/`U`).
    pub window: TransitionWindow,
    /// Diagonal of the parameter covariance estimate, in parameter order
    /// (inflection, hill, asymmetry). Guaranteed positive by the quality gate.
    pub covariance_diag: [f64; 3],
    pub sse: f64,
    pub rmse: f64,
    /// Number of observations inside the window.
    pub n: usize,
}

/// Why a well produced no fit.
///
/// These are recovered locally: the well's row carries the missing sentinel
/// and the batch continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FitFailure {
    /// The detector collapsed the window (`min_ind >= max_ind` or fewer than
    /// 3 points).
    DegenerateWindow,
    /// Zero fluorescence range: normalization would divide by zero.
    DegenerateNormalization,
    /// No optimizer start converged within the iteration cap.
    NonConvergence,
    /// Converged, but the covariance gate rejected the solution.
    UnreliableFit,
}

impl FitFailure {
    pub fn display_name(self) -> &'static str {
        match self {
            FitFailure::DegenerateWindow => "degenerate window",
            FitFailure::DegenerateNormalization => "degenerate normalization",
            FitFailure::NonConvergence => "no convergence",
            FitFailure::UnreliableFit => "unreliable fit",
        }
    }
}

impl std::fmt::Display for FitFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One output row. Rows are accumulated in input well order.
#[derive(Debug, Clone)]
pub struct WellRecord {
    pub well: String,
    pub fit: Result<WellFit, FitFailure>,
    /// Melting midpoint. `None` when the fit failed, or when Tm is undefined
    /// for the fitted parameters (non-positive asymmetry, zero hill).
    pub tm: Option<f64>,
    /// Percent unfolded at the isothermal query temperature (isothermal mode
    /// only).
    pub unfolded: Option<f64>,
}

impl WellRecord {
    pub fn is_fitted(&self) -> bool {
        self.fit.is_ok()
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct MeltConfig {
    pub csv_path: PathBuf,
    pub mode: OutputMode,
    /// Rescale each trace to 0-100 using its transition extrema before
    /// fitting.
    pub normalize: bool,
    /// Query temperature for isothermal mode.
    pub iso_temperature: Option<f64>,
    /// Optimizer iteration cap per fit attempt.
    pub max_iterations: usize,
    pub plot_dir: Option<PathBuf>,
    pub export_results: Option<PathBuf>,
    pub export_fits: Option<PathBuf>,
    pub debug_bundle: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_point_count_and_degeneracy() {
        let w = TransitionWindow {
            min_ind: 2,
            max_ind: 8,
            min_fluor: 1.0,
            max_fluor: 9.0,
        };
        assert_eq!(w.point_count(), 7);
        assert!(!w.is_degenerate());

        let collapsed = TransitionWindow {
            min_ind: 3,
            max_ind: 3,
            min_fluor: 5.0,
            max_fluor: 5.0,
        };
        assert_eq!(collapsed.point_count(), 1);
        assert!(collapsed.is_degenerate());

        let two_points = TransitionWindow {
            min_ind: 3,
            max_ind: 4,
            min_fluor: 5.0,
            max_fluor: 6.0,
        };
        assert!(two_points.is_degenerate());
    }
}
