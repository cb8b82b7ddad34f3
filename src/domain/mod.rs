//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - plate input types (`Plate`, `WellTrace`)
//! - the transition window located by the detector (`TransitionWindow`)
//! - fit outputs (`FitParams`, `WellFit`, `FitFailure`, `WellRecord`)
//! - run configuration (`MeltConfig`, `OutputMode`)

pub mod types;

pub use types::*;
