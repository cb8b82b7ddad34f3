//! Input/output helpers.
//!
//! - plate CSV ingest + validation (`ingest`)
//! - result table exports (`export`)
//! - fit diagnostics JSON (`fits`)

pub mod export;
pub mod fits;
pub mod ingest;

pub use export::*;
pub use fits::*;
pub use ingest::*;
