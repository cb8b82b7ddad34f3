//! The 5-parameter logistic denaturation model.
//!
//! Implemented as small, pure functions so that fitting/search code can stay
//! generic.

pub mod logistic;

pub use logistic::*;
