//! Reporting utilities: formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized (important for future snapshot tests)

use crate::domain::{FitFailure, MeltConfig, OutputMode, WellRecord};
use crate::io::ingest::PlateStats;

/// Format the run summary (input, mode, plate stats).
pub fn format_run_summary(stats: &PlateStats, config: &MeltConfig) -> String {
    let mut out = String::new();

    out.push_str("=== melt - 5PL Melt Curve Fit ===\n");
    out.push_str(&format!("Input: {}\n", config.csv_path.display()));
    out.push_str(&format!("Mode: {}", config.mode.display_name()));
    if let (OutputMode::IsothermalFraction, Some(t0)) = (config.mode, config.iso_temperature) {
        out.push_str(&format!(" (T0 = {t0})"));
    }
    out.push('\n');
    out.push_str(&format!(
        "Normalize: {}\n",
        if config.normalize { "on" } else { "off" }
    ));
    out.push_str(&format!(
        "Plate: {} wells x {} readings | T=[{:.2}, {:.2}]\n",
        stats.n_wells, stats.n_readings, stats.temp_min, stats.temp_max
    ));

    out
}

/// Format the per-well result table plus the fitted/failed tally.
pub fn format_results(records: &[WellRecord], config: &MeltConfig) -> String {
    let mut out = String::new();

    match config.mode {
        OutputMode::Tm => {
            out.push_str(&format!("{:<16} {:>10}\n", "Well", "Tm"));
            out.push_str(&format!("{:-<16} {:-<10}\n", "", ""));
            for r in records {
                out.push_str(&format!("{:<16} {:>10}\n", truncate(&r.well, 16), fmt_value(r.tm)));
            }
        }
        OutputMode::TmWithParams => {
            out.push_str(&format!(
                "{:<16} {:>10} {:>10} {:>10} {:>10}\n",
                "Well", "infl", "hill", "assym", "Tm"
            ));
            out.push_str(&format!(
                "{:-<16} {:-<10} {:-<10} {:-<10} {:-<10}\n",
                "", "", "", "", ""
            ));
            for r in records {
                let (infl, hill, assym) = match &r.fit {
                    Ok(fit) => (
                        Some(fit.params.inflection),
                        Some(fit.params.hill),
                        Some(fit.params.asymmetry),
                    ),
                    Err(_) => (None, None, None),
                };
                out.push_str(&format!(
                    "{:<16} {:>10} {:>10} {:>10} {:>10}\n",
                    truncate(&r.well, 16),
                    fmt_value(infl),
                    fmt_value(hill),
                    fmt_value(assym),
                    fmt_value(r.tm)
                ));
            }
        }
        OutputMode::IsothermalFraction => {
            let label = format!("%Unfolded@{}", config.iso_temperature.unwrap_or(f64::NAN));
            out.push_str(&format!("{:<16} {:>14}\n", "Well", label));
            out.push_str(&format!("{:-<16} {:-<14}\n", "", ""));
            for r in records {
                out.push_str(&format!(
                    "{:<16} {:>14}\n",
                    truncate(&r.well, 16),
                    fmt_value(r.unfolded)
                ));
            }
        }
    }

    out.push('\n');
    out.push_str(&format_tally(records, config.mode));
    out
}

fn format_tally(records: &[WellRecord], mode: OutputMode) -> String {
    let n = records.len();
    let fitted = records.iter().filter(|r| r.is_fitted()).count();

    let mut out = format!("Fitted {fitted}/{n} wells.\n");

    for kind in [
        FitFailure::DegenerateWindow,
        FitFailure::DegenerateNormalization,
        FitFailure::NonConvergence,
        FitFailure::UnreliableFit,
    ] {
        let count = records
            .iter()
            .filter(|r| r.fit.as_ref().err() == Some(&kind))
            .count();
        if count > 0 {
            out.push_str(&format!("- {count} {}\n", kind.display_name()));
        }
    }

    if !mode.is_isothermal() {
        let undefined = records
            .iter()
            .filter(|r| r.is_fitted() && r.tm.is_none())
            .count();
        if undefined > 0 {
            out.push_str(&format!(
                "- {undefined} fitted well(s) with undefined Tm (non-positive asymmetry)\n"
            ));
        }
    }

    out
}

fn fmt_value(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.2}"),
        _ => "NaN".to_string(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FitParams, TransitionWindow, WellFit};
    use std::path::PathBuf;

    fn config(mode: OutputMode) -> MeltConfig {
        MeltConfig {
            csv_path: PathBuf::from("plate.csv"),
            mode,
            normalize: false,
            iso_temperature: Some(45.0),
            max_iterations: 200,
            plot_dir: None,
            export_results: None,
            export_fits: None,
            debug_bundle: false,
        }
    }

    fn records() -> Vec<WellRecord> {
        vec![
            WellRecord {
                well: "A01".to_string(),
                fit: Ok(WellFit {
                    params: FitParams {
                        inflection: 55.0,
                        hill: 1.2,
                        asymmetry: 1.0,
                    },
                    window: TransitionWindow {
                        min_ind: 0,
                        max_ind: 20,
                        min_fluor: 3.0,
                        max_fluor: 97.0,
                    },
                    covariance_diag: [0.1, 0.1, 0.1],
                    sse: 2.0,
                    rmse: 0.3,
                    n: 21,
                }),
                tm: Some(55.0),
                unfolded: Some(82.5),
            },
            WellRecord {
                well: "A02".to_string(),
                fit: Err(FitFailure::DegenerateWindow),
                tm: None,
                unfolded: None,
            },
        ]
    }

    #[test]
    fn tm_table_keeps_failed_rows_with_sentinel() {
        let out = format_results(&records(), &config(OutputMode::Tm));
        assert!(out.contains("A01"));
        assert!(out.contains("55.00"));
        assert!(out.contains("A02"));
        assert!(out.contains("NaN"));
        assert!(out.contains("Fitted 1/2 wells."));
        assert!(out.contains("1 degenerate window"));
    }

    #[test]
    fn isothermal_table_reports_percent_unfolded() {
        let out = format_results(&records(), &config(OutputMode::IsothermalFraction));
        assert!(out.contains("%Unfolded@45"));
        assert!(out.contains("82.50"));
    }
}
