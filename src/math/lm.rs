//! Box-constrained Levenberg-Marquardt for small dense problems.
//!
//! The fitter repeatedly solves nonlinear least-squares problems of the form:
//!
//! ```text
//! minimize Σ (y_i - f(x_i; θ))^2   subject to  lo_j <= θ_j <= hi_j
//! ```
//!
//! Implementation choices:
//! - Damped normal equations `(JᵀJ + λ diag(JᵀJ)) δ = Jᵀ r`, with the step
//!   clamped back into the box. This keeps every iterate feasible.
//! - Inner solves use SVD with a small ladder of tolerances, the same way the
//!   OLS-style solves elsewhere in this family of tools handle near-singular
//!   systems.
//! - Everything is deterministic: same inputs and options, same result.
//!
//! The parameter dimension here is tiny (3), so SVD cost is irrelevant next
//! to residual evaluation.

use nalgebra::{DMatrix, DVector};

/// Options controlling a single optimizer run.
#[derive(Debug, Clone)]
pub struct LmOptions {
    /// Hard iteration cap. Exceeding it is a non-convergence outcome for the
    /// attempt, never a hang.
    pub max_iterations: usize,
    /// Initial damping factor.
    pub lambda_init: f64,
    /// Damping multiplier after a rejected step.
    pub lambda_up: f64,
    /// Damping multiplier after an accepted step.
    pub lambda_down: f64,
    /// Relative SSE improvement below which the run is declared converged.
    pub ftol: f64,
    /// Step infinity-norm below which the run is declared converged.
    pub xtol: f64,
}

impl Default for LmOptions {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            lambda_init: 1e-3,
            lambda_up: 10.0,
            lambda_down: 0.1,
            ftol: 1e-12,
            xtol: 1e-12,
        }
    }
}

/// A converged optimizer run.
#[derive(Debug, Clone)]
pub struct LmFit {
    pub params: Vec<f64>,
    pub sse: f64,
    pub iterations: usize,
}

/// Run box-constrained Levenberg-Marquardt.
///
/// - `model(θ, x)` evaluates the model at one abscissa.
/// - `jacobian(θ, x, row)` fills `row` with `∂f/∂θ_j` at that abscissa.
///
/// Returns `None` when the run does not converge: non-finite residuals at the
/// start, a damping blow-up with no acceptable step, or the iteration cap.
pub fn levenberg_marquardt<M, J>(
    initial: &[f64],
    lower: &[f64],
    upper: &[f64],
    xs: &[f64],
    observed: &[f64],
    model: M,
    jacobian: J,
    opts: &LmOptions,
) -> Option<LmFit>
where
    M: Fn(&[f64], f64) -> f64,
    J: Fn(&[f64], f64, &mut [f64]),
{
    let p = initial.len();
    let n = xs.len();
    if n < p || observed.len() != n || lower.len() != p || upper.len() != p {
        return None;
    }
    if lower.iter().zip(upper.iter()).any(|(lo, hi)| !(lo <= hi)) {
        return None;
    }

    let mut params: Vec<f64> = initial
        .iter()
        .zip(lower.iter().zip(upper.iter()))
        .map(|(&v, (&lo, &hi))| v.clamp(lo, hi))
        .collect();

    let mut residual = residual_vector(&params, xs, observed, &model)?;
    let mut sse = residual.norm_squared();
    let mut lambda = opts.lambda_init;

    const LAMBDA_MAX: f64 = 1e12;

    for iteration in 1..=opts.max_iterations {
        if sse <= f64::EPSILON * n as f64 {
            return Some(LmFit {
                params,
                sse,
                iterations: iteration,
            });
        }

        let jac = jacobian_matrix(&params, xs, p, &jacobian)?;
        let jtj = jac.transpose() * &jac;
        let gradient = jac.transpose() * &residual;

        // Inner loop: escalate damping until a step is accepted or the
        // damping factor blows up.
        loop {
            let mut damped = jtj.clone();
            for j in 0..p {
                damped[(j, j)] += lambda * jtj[(j, j)].max(1e-12);
            }

            let Some(delta) = solve_damped(&damped, &gradient) else {
                lambda *= opts.lambda_up;
                if lambda > LAMBDA_MAX {
                    return None;
                }
                continue;
            };

            let trial: Vec<f64> = params
                .iter()
                .enumerate()
                .map(|(j, &v)| (v + delta[j]).clamp(lower[j], upper[j]))
                .collect();
            let step = trial
                .iter()
                .zip(params.iter())
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f64::max);

            let trial_residual = residual_vector(&trial, xs, observed, &model);
            let trial_sse = trial_residual.as_ref().map(|r| r.norm_squared());

            match (trial_residual, trial_sse) {
                (Some(r), Some(s)) if s <= sse => {
                    let improvement = (sse - s) / sse.max(f64::MIN_POSITIVE);
                    params = trial;
                    residual = r;
                    sse = s;
                    lambda = (lambda * opts.lambda_down).max(1e-12);

                    if improvement < opts.ftol || step < opts.xtol {
                        return Some(LmFit {
                            params,
                            sse,
                            iterations: iteration,
                        });
                    }
                    break;
                }
                _ => {
                    lambda *= opts.lambda_up;
                    if lambda > LAMBDA_MAX {
                        return None;
                    }
                }
            }
        }
    }

    None
}

/// Diagonal of the parameter covariance estimate at a solution.
///
/// `cov = s² (JᵀJ)⁻¹` with `s² = SSE / (n - p)`. With zero degrees of freedom
/// (`n == p`) the residual variance scale is undefined and the diagonal is
/// reported as `+inf`, matching the reference optimizer's convention. Returns
/// `None` when `JᵀJ` is rank-deficient; the caller treats that as an
/// unreliable fit.
pub fn covariance_diagonal(jacobian: &DMatrix<f64>, sse: f64) -> Option<Vec<f64>> {
    let n = jacobian.nrows();
    let p = jacobian.ncols();
    if n < p || p == 0 || !sse.is_finite() || sse < 0.0 {
        return None;
    }
    if n == p {
        return Some(vec![f64::INFINITY; p]);
    }

    let jtj = jacobian.transpose() * jacobian;
    let svd = jtj.svd(true, true);

    let sv_max = svd.singular_values.iter().copied().fold(0.0, f64::max);
    let sv_min = svd
        .singular_values
        .iter()
        .copied()
        .fold(f64::INFINITY, f64::min);
    if !sv_max.is_finite() || sv_max <= 0.0 {
        return None;
    }
    // Reciprocal-condition cutoff: treat anything this ill-conditioned as
    // rank-deficient rather than inverting into garbage.
    const RCOND: f64 = 1e-12;
    if sv_min < sv_max * RCOND {
        return None;
    }

    let inverse = svd.pseudo_inverse(sv_max * RCOND).ok()?;
    let s2 = sse / (n - p) as f64;

    let diag: Vec<f64> = (0..p).map(|j| s2 * inverse[(j, j)]).collect();
    if diag.iter().any(|v| !v.is_finite()) {
        return None;
    }
    Some(diag)
}

fn residual_vector<M>(params: &[f64], xs: &[f64], observed: &[f64], model: &M) -> Option<DVector<f64>>
where
    M: Fn(&[f64], f64) -> f64,
{
    let mut out = DVector::<f64>::zeros(xs.len());
    for (i, (&x, &y)) in xs.iter().zip(observed.iter()).enumerate() {
        let value = y - model(params, x);
        if !value.is_finite() {
            return None;
        }
        out[i] = value;
    }
    Some(out)
}

fn jacobian_matrix<J>(params: &[f64], xs: &[f64], p: usize, jacobian: &J) -> Option<DMatrix<f64>>
where
    J: Fn(&[f64], f64, &mut [f64]),
{
    let mut out = DMatrix::<f64>::zeros(xs.len(), p);
    let mut row = vec![0.0; p];
    for (i, &x) in xs.iter().enumerate() {
        jacobian(params, x, &mut row);
        for j in 0..p {
            if !row[j].is_finite() {
                return None;
            }
            out[(i, j)] = row[j];
        }
    }
    Some(out)
}

/// Solve the damped normal equations using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
fn solve_damped(a: &DMatrix<f64>, g: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = a.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(delta) = svd.solve(g, tol) {
            if delta.iter().all(|v| v.is_finite()) {
                return Some(delta);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_model(params: &[f64], x: f64) -> f64 {
        params[0] + params[1] * x
    }

    fn line_jacobian(_params: &[f64], x: f64, row: &mut [f64]) {
        row[0] = 1.0;
        row[1] = x;
    }

    #[test]
    fn recovers_line_from_noiseless_data() {
        let xs = [0.0, 1.0, 2.0, 3.0, 4.0];
        let observed: Vec<f64> = xs.iter().map(|&x| 2.0 + 3.0 * x).collect();

        let fit = levenberg_marquardt(
            &[0.0, 0.0],
            &[-100.0, -100.0],
            &[100.0, 100.0],
            &xs,
            &observed,
            line_model,
            line_jacobian,
            &LmOptions::default(),
        )
        .unwrap();

        assert!((fit.params[0] - 2.0).abs() < 1e-6);
        assert!((fit.params[1] - 3.0).abs() < 1e-6);
        assert!(fit.sse < 1e-10);
    }

    #[test]
    fn respects_box_bounds() {
        let xs = [0.0, 1.0, 2.0, 3.0, 4.0];
        let observed: Vec<f64> = xs.iter().map(|&x| 2.0 + 3.0 * x).collect();

        // Slope capped at 2: the optimum must sit on the bound.
        let fit = levenberg_marquardt(
            &[0.0, 0.0],
            &[-100.0, -2.0],
            &[100.0, 2.0],
            &xs,
            &observed,
            line_model,
            line_jacobian,
            &LmOptions::default(),
        )
        .unwrap();

        assert!(fit.params[1] <= 2.0 + 1e-12);
    }

    #[test]
    fn rejects_non_finite_start() {
        let xs = [1.0, 2.0, 3.0];
        let observed = [1.0, 2.0, 3.0];
        let out = levenberg_marquardt(
            &[f64::NAN, 0.0],
            &[-1.0, -1.0],
            &[1.0, 1.0],
            &xs,
            &observed,
            |p, x| p[0] + p[1] * x,
            line_jacobian,
            &LmOptions::default(),
        );
        // NaN initial clamps to NaN -> non-finite residuals -> no fit.
        assert!(out.is_none());
    }

    #[test]
    fn covariance_positive_for_well_posed_system() {
        let jac = DMatrix::from_row_slice(4, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0, 1.0, 3.0]);
        let diag = covariance_diagonal(&jac, 0.5).unwrap();
        assert_eq!(diag.len(), 2);
        assert!(diag.iter().all(|&v| v > 0.0));
    }

    #[test]
    fn covariance_rejects_rank_deficient_jacobian() {
        // Second column is a multiple of the first.
        let jac = DMatrix::from_row_slice(4, 2, &[1.0, 2.0, 1.0, 2.0, 1.0, 2.0, 1.0, 2.0]);
        assert!(covariance_diagonal(&jac, 0.5).is_none());
    }

    #[test]
    fn covariance_is_infinite_with_zero_degrees_of_freedom() {
        let jac = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 1.0]);
        let diag = covariance_diagonal(&jac, 0.1).unwrap();
        assert!(diag.iter().all(|v| v.is_infinite()));
    }
}
