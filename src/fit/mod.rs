//! Per-well curve fitting.
//!
//! Responsibilities:
//!
//! - locate the unfolding transition window in a trace (`window`)
//! - optionally rescale a trace from its window extrema (`window`)
//! - fit the 5PL shape parameters over the window with bounds and a
//!   covariance quality gate (`fitter`)

pub mod fitter;
pub mod window;

pub use fitter::*;
pub use window::*;
