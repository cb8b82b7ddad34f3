//! Debug bundle writer for inspecting a full run.
//!
//! Produces a single markdown file under `debug/` with the run configuration
//! and one table row per well (window, parameters, Tm or failure reason).

use std::fs::{self, create_dir_all};
use std::path::PathBuf;

use chrono::Local;

use crate::domain::{MeltConfig, WellRecord};
use crate::error::AppError;
use crate::io::ingest::PlateStats;

pub fn write_debug_bundle(
    stats: &PlateStats,
    records: &[WellRecord],
    config: &MeltConfig,
) -> Result<PathBuf, AppError> {
    let dir = PathBuf::from("debug");
    create_dir_all(&dir).map_err(|e| AppError::new(4, format!("Failed to create debug dir: {e}")))?;

    let ts = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("melt_debug_{ts}.md"));

    let mut out = String::new();
    out.push_str("# melt debug bundle\n");
    out.push_str(&format!("- generated: {}\n", Local::now().to_rfc3339()));
    out.push_str(&format!("- input: {}\n", config.csv_path.display()));
    out.push_str(&format!("- mode: {}\n", config.mode.display_name()));
    out.push_str(&format!("- normalize: {}\n", config.normalize));
    if let Some(t0) = config.iso_temperature {
        out.push_str(&format!("- iso_temperature: {t0}\n"));
    }
    out.push_str(&format!("- max_iterations: {}\n", config.max_iterations));
    out.push_str(&format!(
        "- plate: {} wells x {} readings, T=[{:.2}, {:.2}]\n",
        stats.n_wells, stats.n_readings, stats.temp_min, stats.temp_max
    ));

    out.push_str("\n## Wells\n");
    out.push_str("| well | window | min_fluor | max_fluor | infl | hill | assym | rmse | Tm | status |\n");
    out.push_str("| - | - | - | - | - | - | - | - | - | - |\n");

    for record in records {
        match &record.fit {
            Ok(fit) => {
                out.push_str(&format!(
                    "| {} | [{}, {}] | {:.3} | {:.3} | {:.4} | {:.4} | {:.4} | {:.4} | {} | ok |\n",
                    record.well,
                    fit.window.min_ind,
                    fit.window.max_ind,
                    fit.window.min_fluor,
                    fit.window.max_fluor,
                    fit.params.inflection,
                    fit.params.hill,
                    fit.params.asymmetry,
                    fit.rmse,
                    fmt_opt(record.tm),
                ));
            }
            Err(failure) => {
                out.push_str(&format!(
                    "| {} | - | - | - | - | - | - | - | - | {} |\n",
                    record.well, failure
                ));
            }
        }
    }

    fs::write(&path, out).map_err(|e| AppError::new(4, format!("Failed to write debug file: {e}")))?;
    Ok(path)
}

fn fmt_opt(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.3}"),
        _ => "-".to_string(),
    }
}
