//! Result table and plate CSV writers.
//!
//! The exports are meant to be easy to consume in spreadsheets or downstream
//! scripts. Failed wells keep their row with a `NaN` sentinel; a missing
//! well is never silently dropped from the table.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::{MeltConfig, OutputMode, Plate, WellRecord};
use crate::error::AppError;

/// Write the per-well result table to a CSV file.
pub fn write_results_csv(
    path: &Path,
    records: &[WellRecord],
    config: &MeltConfig,
) -> Result<(), AppError> {
    let mut file = File::create(path).map_err(|e| {
        AppError::new(4, format!("Failed to create results CSV '{}': {e}", path.display()))
    })?;

    writeln!(file, "{}", results_header(config))
        .map_err(|e| AppError::new(4, format!("Failed to write results CSV header: {e}")))?;

    for record in records {
        writeln!(file, "{}", results_row(record, config.mode))
            .map_err(|e| AppError::new(4, format!("Failed to write results CSV row: {e}")))?;
    }

    Ok(())
}

/// CSV header for the configured output mode.
pub fn results_header(config: &MeltConfig) -> String {
    match config.mode {
        OutputMode::Tm => "Well,Tm".to_string(),
        OutputMode::TmWithParams => "Well,infl,hill,assym,Tm".to_string(),
        OutputMode::IsothermalFraction => {
            format!("Well,%Unfolded@{}", config.iso_temperature.unwrap_or(f64::NAN))
        }
    }
}

/// One CSV row for a well, with `NaN` sentinels for anything missing.
pub fn results_row(record: &WellRecord, mode: OutputMode) -> String {
    match mode {
        OutputMode::Tm => format!("{},{}", record.well, fmt_value(record.tm)),
        OutputMode::TmWithParams => {
            let (infl, hill, assym) = match &record.fit {
                Ok(fit) => (
                    Some(fit.params.inflection),
                    Some(fit.params.hill),
                    Some(fit.params.asymmetry),
                ),
                Err(_) => (None, None, None),
            };
            format!(
                "{},{},{},{},{}",
                record.well,
                fmt_value(infl),
                fmt_value(hill),
                fmt_value(assym),
                fmt_value(record.tm)
            )
        }
        OutputMode::IsothermalFraction => {
            format!("{},{}", record.well, fmt_value(record.unfolded))
        }
    }
}

/// Write a plate (temperature gradient + well traces) to CSV.
///
/// The inverse of ingest; used by the synthetic sample generator.
pub fn write_plate_csv(path: &Path, plate: &Plate) -> Result<(), AppError> {
    let mut file = File::create(path).map_err(|e| {
        AppError::new(4, format!("Failed to create plate CSV '{}': {e}", path.display()))
    })?;

    let mut header = String::from("Temperature");
    for well in &plate.wells {
        header.push(',');
        header.push_str(&well.id);
    }
    writeln!(file, "{header}")
        .map_err(|e| AppError::new(4, format!("Failed to write plate CSV header: {e}")))?;

    for (i, &temperature) in plate.temperatures.iter().enumerate() {
        let mut row = format!("{temperature:.3}");
        for well in &plate.wells {
            row.push_str(&format!(",{:.4}", well.fluorescence[i]));
        }
        writeln!(file, "{row}")
            .map_err(|e| AppError::new(4, format!("Failed to write plate CSV row: {e}")))?;
    }

    Ok(())
}

fn fmt_value(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.4}"),
        _ => "NaN".to_string(),
    }
}
