//! Fit diagnostics JSON export.
//!
//! The fits JSON is the "portable" representation of a run:
//! - the configuration that produced it (mode, normalize flag, query
//!   temperature)
//! - per-well fitted parameters, covariance diagonal, and quality numbers,
//!   or the failure kind for wells that produced no fit

use std::fs::File;
use std::path::Path;

use serde::Serialize;

use crate::domain::{FitFailure, MeltConfig, OutputMode, WellFit, WellRecord};
use crate::error::AppError;

#[derive(Debug, Clone, Serialize)]
pub struct FitsFile {
    pub tool: String,
    pub mode: OutputMode,
    pub normalize: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iso_temperature: Option<f64>,
    pub wells: Vec<WellEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WellEntry {
    pub well: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fit: Option<WellFit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FitFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unfolded: Option<f64>,
}

/// Assemble the serializable run record.
pub fn build_fits_file(records: &[WellRecord], config: &MeltConfig) -> FitsFile {
    let wells = records
        .iter()
        .map(|record| WellEntry {
            well: record.well.clone(),
            fit: record.fit.as_ref().ok().cloned(),
            failure: record.fit.as_ref().err().copied(),
            tm: record.tm,
            unfolded: record.unfolded,
        })
        .collect();

    FitsFile {
        tool: "melt".to_string(),
        mode: config.mode,
        normalize: config.normalize,
        iso_temperature: config.iso_temperature,
        wells,
    }
}

/// Write the fits JSON file.
pub fn write_fits_json(
    path: &Path,
    records: &[WellRecord],
    config: &MeltConfig,
) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::new(4, format!("Failed to create fits JSON '{}': {e}", path.display()))
    })?;

    serde_json::to_writer_pretty(file, &build_fits_file(records, config))
        .map_err(|e| AppError::new(4, format!("Failed to write fits JSON: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn failed_wells_serialize_the_failure_kind() {
        let records = vec![WellRecord {
            well: "B07".to_string(),
            fit: Err(FitFailure::NonConvergence),
            tm: None,
            unfolded: None,
        }];
        let config = MeltConfig {
            csv_path: PathBuf::from("plate.csv"),
            mode: OutputMode::Tm,
            normalize: true,
            iso_temperature: None,
            max_iterations: 200,
            plot_dir: None,
            export_results: None,
            export_fits: None,
            debug_bundle: false,
        };

        let json = serde_json::to_string(&build_fits_file(&records, &config)).unwrap();
        assert!(json.contains("\"failure\":\"non_convergence\""));
        assert!(json.contains("\"normalize\":true"));
        assert!(!json.contains("iso_temperature"));
    }
}
