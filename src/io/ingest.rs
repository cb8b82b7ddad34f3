//! Plate CSV ingest and validation.
//!
//! The expected layout is the common instrument-export shape: first column
//! the temperature gradient, one column per well after it, first row the
//! column headers (well identifiers).
//!
//! Design goals:
//! - **Strict schema**: every cell must be a finite number (clear errors +
//!   exit code 2). The numeric core assumes clean numeric sequences; ingest
//!   is where that is enforced.
//! - **Deterministic behavior**: no hidden coercions, no skipped rows.
//! - **Separation of concerns**: no fitting logic here.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::domain::{Plate, WellTrace};
use crate::error::AppError;

/// Summary stats about the plate actually used for fitting.
#[derive(Debug, Clone)]
pub struct PlateStats {
    pub n_wells: usize,
    pub n_readings: usize,
    pub temp_min: f64,
    pub temp_max: f64,
}

/// Ingest output: the plate plus its summary stats.
#[derive(Debug, Clone)]
pub struct IngestedPlate {
    pub plate: Plate,
    pub stats: PlateStats,
}

/// Load and validate a plate CSV from disk.
pub fn load_plate(path: &Path) -> Result<IngestedPlate, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display()))
    })?;
    read_plate(file)
}

/// Read and validate a plate CSV from any reader.
pub fn read_plate<R: Read>(reader: R) -> Result<IngestedPlate, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();

    if headers.len() < 2 {
        return Err(AppError::new(
            2,
            "Plate CSV needs a temperature column plus at least one well column.",
        ));
    }

    let well_ids = parse_well_ids(&headers)?;
    let n_wells = well_ids.len();

    let mut temperatures: Vec<f64> = Vec::new();
    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); n_wells];

    for (idx, result) in reader.records().enumerate() {
        // +2 because records() starts after the header row and CSV line
        // numbers are 1-based.
        let line = idx + 2;

        let record = result.map_err(|e| AppError::new(2, format!("CSV parse error: {e}")))?;
        if record.len() != n_wells + 1 {
            return Err(AppError::new(
                2,
                format!(
                    "Line {line}: expected {} fields, found {}.",
                    n_wells + 1,
                    record.len()
                ),
            ));
        }

        temperatures.push(parse_finite(record.get(0), line, "temperature")?);
        for (w, column) in columns.iter_mut().enumerate() {
            column.push(parse_finite(record.get(w + 1), line, &well_ids[w])?);
        }
    }

    if temperatures.len() < 3 {
        return Err(AppError::new(
            3,
            format!(
                "Plate has {} readings; fitting needs at least 3.",
                temperatures.len()
            ),
        ));
    }

    for i in 1..temperatures.len() {
        if temperatures[i] <= temperatures[i - 1] {
            return Err(AppError::new(
                3,
                format!(
                    "Temperature must be strictly increasing; line {} has {} after {}.",
                    i + 2,
                    temperatures[i],
                    temperatures[i - 1]
                ),
            ));
        }
    }

    let stats = PlateStats {
        n_wells,
        n_readings: temperatures.len(),
        temp_min: temperatures[0],
        temp_max: temperatures[temperatures.len() - 1],
    };

    let wells = well_ids
        .into_iter()
        .zip(columns)
        .map(|(id, fluorescence)| WellTrace { id, fluorescence })
        .collect();

    Ok(IngestedPlate {
        plate: Plate {
            temperatures,
            wells,
        },
        stats,
    })
}

fn parse_well_ids(headers: &StringRecord) -> Result<Vec<String>, AppError> {
    let mut ids = Vec::with_capacity(headers.len().saturating_sub(1));
    for (idx, name) in headers.iter().enumerate().skip(1) {
        let id = normalize_header_name(name);
        if id.is_empty() {
            return Err(AppError::new(2, format!("Well column {idx} has an empty header.")));
        }
        if ids.contains(&id) {
            return Err(AppError::new(2, format!("Duplicate well identifier '{id}'.")));
        }
        ids.push(id);
    }
    Ok(ids)
}

fn normalize_header_name(name: &str) -> String {
    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on a
    // header cell. If we don't strip it, the well identifier (and any file it
    // names) silently carries an invisible character.
    name.trim().trim_start_matches('\u{feff}').to_string()
}

fn parse_finite(cell: Option<&str>, line: usize, column: &str) -> Result<f64, AppError> {
    let raw = cell.map(str::trim).unwrap_or("");
    let value = raw
        .parse::<f64>()
        .map_err(|_| AppError::new(2, format!("Line {line}, column '{column}': invalid number '{raw}'.")))?;
    if !value.is_finite() {
        return Err(AppError::new(
            2,
            format!("Line {line}, column '{column}': non-finite value '{raw}'."),
        ));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_a_small_plate() {
        let csv = "\
Temperature,A01,A02
25.0,10.0,12.0
26.0,11.0,13.0
27.0,30.0,40.0
28.0,90.0,95.0
";
        let ingested = read_plate(csv.as_bytes()).unwrap();
        assert_eq!(ingested.stats.n_wells, 2);
        assert_eq!(ingested.stats.n_readings, 4);
        assert_eq!(ingested.plate.wells[0].id, "A01");
        assert_eq!(ingested.plate.wells[1].fluorescence[3], 95.0);
        assert_eq!(ingested.plate.temperatures, vec![25.0, 26.0, 27.0, 28.0]);
    }

    #[test]
    fn strips_bom_from_headers() {
        let csv = "\u{feff}Temperature,A01\n25,1\n26,2\n27,3\n";
        let ingested = read_plate(csv.as_bytes()).unwrap();
        assert_eq!(ingested.plate.wells[0].id, "A01");
    }

    #[test]
    fn rejects_non_numeric_cells_with_line_numbers() {
        let csv = "Temperature,A01\n25,1\n26,oops\n27,3\n";
        let err = read_plate(csv.as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("Line 3"));
        assert!(err.to_string().contains("A01"));
    }

    #[test]
    fn rejects_non_increasing_temperature() {
        let csv = "Temperature,A01\n25,1\n25,2\n27,3\n";
        let err = read_plate(csv.as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn rejects_short_plates() {
        let csv = "Temperature,A01\n25,1\n26,2\n";
        let err = read_plate(csv.as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn rejects_duplicate_well_ids() {
        let csv = "Temperature,A01,A01\n25,1,1\n26,2,2\n27,3,3\n";
        let err = read_plate(csv.as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn rejects_ragged_rows() {
        let csv = "Temperature,A01,A02\n25,1,2\n26,3\n27,4,5\n";
        let err = read_plate(csv.as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
