//! Mathematical utilities: box-constrained Levenberg-Marquardt and
//! covariance estimation.

pub mod lm;

pub use lm::*;
