//! Transition-window detection and trace normalization.
//!
//! The detector brackets the sigmoidal unfolding region: the steepest single
//! reading-to-reading rise approximates the inflection, the minimum before it
//! and the maximum after it bound the transition and discard flat
//! baseline/plateau noise outside it.
//!
//! Both functions are pure and deterministic; ties in the scans resolve to
//! the first occurrence.

use crate::domain::{FitFailure, TransitionWindow};

/// Locate the transition window of a fluorescence trace.
///
/// `d*` is the index of the largest first difference; the window minimum is
/// the smallest reading in `F[0..=d*]` and the window maximum the largest in
/// `F[d*..]`. On a monotonic-decreasing or flat trace both scans collapse
/// onto `d*` itself, which downstream code rejects as degenerate.
pub fn detect_transition(fluorescence: &[f64]) -> TransitionWindow {
    let n = fluorescence.len();
    if n < 2 {
        let value = fluorescence.first().copied().unwrap_or(f64::NAN);
        return TransitionWindow {
            min_ind: 0,
            max_ind: 0,
            min_fluor: value,
            max_fluor: value,
        };
    }

    let mut steepest = 0;
    let mut steepest_rise = fluorescence[1] - fluorescence[0];
    for i in 1..n - 1 {
        let rise = fluorescence[i + 1] - fluorescence[i];
        if rise > steepest_rise {
            steepest_rise = rise;
            steepest = i;
        }
    }

    let mut min_ind = 0;
    for i in 1..=steepest {
        if fluorescence[i] < fluorescence[min_ind] {
            min_ind = i;
        }
    }

    let mut max_ind = steepest;
    for i in steepest + 1..n {
        if fluorescence[i] > fluorescence[max_ind] {
            max_ind = i;
        }
    }

    TransitionWindow {
        min_ind,
        max_ind,
        min_fluor: fluorescence[min_ind],
        max_fluor: fluorescence[max_ind],
    }
}

/// Rescale a full trace to 0-100 using the window extrema.
///
/// Applied to every reading, not only those inside the window; the window is
/// re-detected on the rescaled trace before fitting.
pub fn normalize_trace(fluorescence: &[f64], window: &TransitionWindow) -> Result<Vec<f64>, FitFailure> {
    let range = window.fluor_range();
    if !range.is_finite() || range <= 0.0 {
        return Err(FitFailure::DegenerateNormalization);
    }
    Ok(fluorescence
        .iter()
        .map(|&value| (value - window.min_fluor) / range * 100.0)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brackets_a_single_clear_step() {
        let trace = [5.0, 5.0, 5.0, 5.0, 50.0, 95.0, 96.0, 96.0, 96.0];
        let window = detect_transition(&trace);

        // Largest jump is 3 -> 4 (45 units); the suffix maximum is the first
        // 96 at index 6.
        assert!(window.min_ind < window.max_ind);
        assert_eq!(window.max_ind, 6);
        assert_eq!(window.min_fluor, 5.0);
        assert_eq!(window.max_fluor, 96.0);
        assert!(!window.is_degenerate());
    }

    #[test]
    fn rising_traces_keep_min_before_max() {
        let trace: Vec<f64> = (0..40)
            .map(|i| {
                let t = i as f64;
                10.0 + 80.0 / (1.0 + (-0.5 * (t - 20.0)).exp())
            })
            .collect();
        let window = detect_transition(&trace);
        assert!(window.min_ind < window.max_ind);
        assert!(window.min_fluor <= window.max_fluor);
    }

    #[test]
    fn constant_trace_collapses_to_a_degenerate_window() {
        let trace = [10.0, 10.0, 10.0, 10.0, 10.0];
        let window = detect_transition(&trace);
        assert_eq!(window.min_ind, window.max_ind);
        assert!(window.is_degenerate());
    }

    #[test]
    fn decreasing_trace_collapses_to_a_degenerate_window() {
        let trace = [90.0, 70.0, 50.0, 30.0, 10.0];
        let window = detect_transition(&trace);
        // All first differences are negative; the "steepest rise" is the
        // least-negative one and both scans collapse around it.
        assert!(window.is_degenerate());
    }

    #[test]
    fn normalization_rescales_to_percent() {
        let trace = [5.0, 5.0, 50.0, 95.0, 95.0];
        let window = detect_transition(&trace);
        let normalized = normalize_trace(&trace, &window).unwrap();

        assert!((normalized[0] - 0.0).abs() < 1e-12);
        assert!((normalized[2] - 50.0).abs() < 1e-12);
        assert!((normalized[4] - 100.0).abs() < 1e-12);
    }

    #[test]
    fn normalization_is_idempotent_on_a_percent_scale_trace() {
        let trace = [0.0, 10.0, 55.0, 90.0, 100.0];
        let window = detect_transition(&trace);
        assert_eq!(window.min_fluor, 0.0);
        assert_eq!(window.max_fluor, 100.0);

        let normalized = normalize_trace(&trace, &window).unwrap();
        for (a, b) in normalized.iter().zip(trace.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn zero_range_window_fails_normalization() {
        let trace = [10.0, 10.0, 10.0, 10.0];
        let window = detect_transition(&trace);
        assert_eq!(
            normalize_trace(&trace, &window),
            Err(FitFailure::DegenerateNormalization)
        );
    }
}
