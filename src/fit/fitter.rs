//! Bounded 5PL fitting for a single well.
//!
//! Given a trace, its transition window, and the window extrema held fixed as
//! the model plateaus, we:
//!
//! - build a deterministic grid of optimizer starting points
//! - run box-constrained Levenberg-Marquardt from each start (parallel)
//! - keep the lowest-SSE converged candidate (ties break by grid index, so
//!   parallelism never changes the result)
//! - gate the winner on its parameter covariance estimate
//!
//! Every failure path maps to a single typed [`FitFailure`] so the batch can
//! branch on the reason instead of catching a generic error.

use nalgebra::DMatrix;
use rayon::prelude::*;

use crate::domain::{FitFailure, FitParams, TransitionWindow, WellFit};
use crate::math::{LmFit, LmOptions, covariance_diagonal, levenberg_marquardt};
use crate::models::{five_pl, jacobian_row};

/// Box limit for the hill coefficient.
pub const HILL_LIMIT: f64 = 3.0;
/// Box limit for the asymmetry coefficient.
pub const ASYMMETRY_LIMIT: f64 = 3.0;

const HILL_SEEDS: [f64; 4] = [-2.0, -0.5, 0.5, 2.0];
const ASYMMETRY_SEEDS: [f64; 3] = [0.5, 1.0, 2.0];

/// Fitting options that affect how each well is calibrated.
#[derive(Debug, Clone)]
pub struct FitOptions {
    /// Optimizer iteration cap per start.
    pub max_iterations: usize,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self { max_iterations: 200 }
    }
}

/// Fit the 5PL shape parameters over the transition window.
///
/// `temperature` and `fluorescence` are the full trace; fitting is restricted
/// to `[min_ind, max_ind]` inclusive, with the window extrema as the fixed
/// model plateaus. The inflection is bounded by the window's temperature
/// range, hill and asymmetry by `[-3, 3]`.
pub fn fit_well(
    temperature: &[f64],
    fluorescence: &[f64],
    window: &TransitionWindow,
    opts: &FitOptions,
) -> Result<WellFit, FitFailure> {
    if window.is_degenerate()
        || window.max_ind >= temperature.len()
        || temperature.len() != fluorescence.len()
    {
        return Err(FitFailure::DegenerateWindow);
    }

    let t = &temperature[window.min_ind..=window.max_ind];
    let f = &fluorescence[window.min_ind..=window.max_ind];
    let n = t.len();

    let (t_lo, t_hi) = (t[0], t[n - 1]);
    if !(t_lo < t_hi) {
        return Err(FitFailure::DegenerateWindow);
    }

    let lower = [t_lo, -HILL_LIMIT, -ASYMMETRY_LIMIT];
    let upper = [t_hi, HILL_LIMIT, ASYMMETRY_LIMIT];
    let (plateau_lo, plateau_hi) = (window.min_fluor, window.max_fluor);

    let seeds = seed_grid(t, f);
    let lm_opts = LmOptions {
        max_iterations: opts.max_iterations,
        ..LmOptions::default()
    };

    let model = |params: &[f64], x: f64| {
        five_pl(x, plateau_lo, plateau_hi, &params_from_slice(params))
    };
    let jac = |params: &[f64], x: f64, row: &mut [f64]| {
        jacobian_row(x, plateau_lo, plateau_hi, &params_from_slice(params), row);
    };

    // Evaluate each starting point independently (parallel).
    let candidates: Vec<(usize, LmFit)> = seeds
        .par_iter()
        .enumerate()
        .filter_map(|(idx, seed)| {
            levenberg_marquardt(seed, &lower, &upper, t, f, model, jac, &lm_opts)
                .map(|fit| (idx, fit))
        })
        .collect();

    // Deterministic selection: pick the minimum SSE; break ties by grid index.
    let mut best: Option<&(usize, LmFit)> = None;
    for c in &candidates {
        best = match best {
            None => Some(c),
            Some(b) if c.1.sse < b.1.sse || (c.1.sse == b.1.sse && c.0 < b.0) => Some(c),
            Some(b) => Some(b),
        };
    }
    let Some((_, winner)) = best else {
        return Err(FitFailure::NonConvergence);
    };

    let params = params_from_slice(&winner.params);
    if !(params.inflection.is_finite() && params.hill.is_finite() && params.asymmetry.is_finite()) {
        return Err(FitFailure::NonConvergence);
    }

    // Quality gate: a non-positive variance estimate means the solution sits
    // on a bound or the Jacobian is rank-deficient; either way the fit is not
    // trustworthy even though the optimizer returned numbers.
    let mut jacobian = DMatrix::<f64>::zeros(n, 3);
    let mut row = [0.0; 3];
    for (i, &x) in t.iter().enumerate() {
        jacobian_row(x, plateau_lo, plateau_hi, &params, &mut row);
        for j in 0..3 {
            jacobian[(i, j)] = row[j];
        }
    }
    let Some(diag) = covariance_diagonal(&jacobian, winner.sse) else {
        return Err(FitFailure::UnreliableFit);
    };
    if diag.iter().any(|v| !(*v > 0.0)) {
        return Err(FitFailure::UnreliableFit);
    }

    Ok(WellFit {
        params,
        window: *window,
        covariance_diag: [diag[0], diag[1], diag[2]],
        sse: winner.sse,
        rmse: (winner.sse / n as f64).sqrt(),
        n,
    })
}

fn params_from_slice(params: &[f64]) -> FitParams {
    FitParams {
        inflection: params[0],
        hill: params[1],
        asymmetry: params[2],
    }
}

/// Deterministic grid of optimizer starting points.
///
/// Inflection starts at the steepest in-window rise and at the window
/// midpoint; hill and asymmetry sweep coarse grids covering both curve
/// directions and both asymmetry flanks.
fn seed_grid(t: &[f64], f: &[f64]) -> Vec<[f64; 3]> {
    let n = t.len();
    let mut steepest = 0;
    let mut steepest_rise = f[1] - f[0];
    for i in 1..n - 1 {
        let rise = f[i + 1] - f[i];
        if rise > steepest_rise {
            steepest_rise = rise;
            steepest = i;
        }
    }

    let midpoint = (t[0] + t[n - 1]) / 2.0;
    let inflections = [t[steepest], midpoint];

    let mut seeds = Vec::with_capacity(inflections.len() * HILL_SEEDS.len() * ASYMMETRY_SEEDS.len());
    for &inflection in &inflections {
        for &hill in &HILL_SEEDS {
            for &asymmetry in &ASYMMETRY_SEEDS {
                seeds.push([inflection, hill, asymmetry]);
            }
        }
    }
    seeds
}
