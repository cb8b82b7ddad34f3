//! Shared batch pipeline used by the `fit` and `iso` front-ends.
//!
//! For each well, in input order: optionally normalize, detect the transition
//! window, fit the 5PL shape parameters, derive Tm (and/or the isothermal
//! fraction), and hand successful fits to the plot sink. Each well is
//! processed to completion before the next begins, and a well's failure never
//! affects any other well: its row simply carries the missing sentinel.
//!
//! The only cross-well state is the shared temperature gradient, which is
//! read-only.

use log::{debug, warn};

use crate::domain::{MeltConfig, OutputMode, Plate, WellRecord, WellTrace};
use crate::error::AppError;
use crate::fit::{FitOptions, detect_transition, fit_well, normalize_trace};
use crate::models::{fraction_unfolded, melting_temperature};
use crate::plot::{PlotSink, WellPlot};

/// All computed outputs of a single batch run.
#[derive(Debug, Clone)]
pub struct BatchOutput {
    /// One record per well, in input order.
    pub records: Vec<WellRecord>,
    pub n_fitted: usize,
    pub n_failed: usize,
}

/// Execute the full per-well pipeline over a plate.
///
/// An invalid isothermal query temperature rejects the whole request before
/// any well is processed; everything else is recovered per well.
pub fn run_batch(
    plate: &Plate,
    config: &MeltConfig,
    plots: Option<&dyn PlotSink>,
) -> Result<BatchOutput, AppError> {
    let iso_temperature = match config.mode {
        OutputMode::IsothermalFraction => Some(validate_iso_temperature(config)?),
        _ => None,
    };

    let fit_opts = FitOptions {
        max_iterations: config.max_iterations,
    };

    let mut records = Vec::with_capacity(plate.wells.len());
    for well in &plate.wells {
        records.push(process_well(plate, well, config, iso_temperature, &fit_opts, plots)?);
    }

    let n_fitted = records.iter().filter(|r| r.is_fitted()).count();
    let n_failed = records.len() - n_fitted;

    Ok(BatchOutput {
        records,
        n_fitted,
        n_failed,
    })
}

fn validate_iso_temperature(config: &MeltConfig) -> Result<f64, AppError> {
    let t0 = config
        .iso_temperature
        .ok_or_else(|| AppError::new(2, "Isothermal mode requires a query temperature."))?;
    if !t0.is_finite() {
        return Err(AppError::new(2, format!("Invalid isothermal query temperature: {t0}")));
    }
    Ok(t0)
}

fn process_well(
    plate: &Plate,
    well: &WellTrace,
    config: &MeltConfig,
    iso_temperature: Option<f64>,
    fit_opts: &FitOptions,
    plots: Option<&dyn PlotSink>,
) -> Result<WellRecord, AppError> {
    // With normalization on, the raw-trace window supplies the rescale
    // extrema; the window handed to the fitter is then re-detected on the
    // trace the fitter actually sees.
    let trace: Vec<f64> = if config.normalize {
        let raw_window = detect_transition(&well.fluorescence);
        match normalize_trace(&well.fluorescence, &raw_window) {
            Ok(normalized) => normalized,
            Err(failure) => {
                warn!("well {}: {failure}", well.id);
                return Ok(WellRecord {
                    well: well.id.clone(),
                    fit: Err(failure),
                    tm: None,
                    unfolded: None,
                });
            }
        }
    } else {
        well.fluorescence.clone()
    };

    let window = detect_transition(&trace);

    let fit = match fit_well(&plate.temperatures, &trace, &window, fit_opts) {
        Ok(fit) => fit,
        Err(failure) => {
            warn!("well {}: {failure}", well.id);
            return Ok(WellRecord {
                well: well.id.clone(),
                fit: Err(failure),
                tm: None,
                unfolded: None,
            });
        }
    };

    let tm = melting_temperature(&fit.params);
    if tm.is_none() && !config.mode.is_isothermal() {
        warn!(
            "well {}: Tm undefined for fitted asymmetry {:.4}",
            well.id, fit.params.asymmetry
        );
    }
    let unfolded = iso_temperature.map(|t0| fraction_unfolded(&fit.params, t0));

    debug!(
        "well {}: window=[{}, {}] infl={:.3} hill={:.3} assym={:.3} rmse={:.4}",
        well.id, fit.window.min_ind, fit.window.max_ind, fit.params.inflection, fit.params.hill,
        fit.params.asymmetry, fit.rmse
    );

    if let Some(sink) = plots {
        sink.plot_well(&WellPlot {
            well: &well.id,
            temperature: &plate.temperatures,
            fluorescence: &trace,
            params: fit.params,
            window: fit.window,
            tm,
        })?;
    }

    Ok(WellRecord {
        well: well.id.clone(),
        fit: Ok(fit),
        tm,
        unfolded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FitFailure, FitParams};
    use crate::models::five_pl;
    use std::cell::RefCell;
    use std::path::PathBuf;

    /// Test sink that records which wells requested a plot.
    struct RecordingSink {
        wells: RefCell<Vec<String>>,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self {
                wells: RefCell::new(Vec::new()),
            }
        }
    }

    impl PlotSink for RecordingSink {
        fn plot_well(&self, plot: &WellPlot<'_>) -> Result<(), AppError> {
            self.wells.borrow_mut().push(plot.well.to_string());
            Ok(())
        }
    }

    fn melt_trace(temperatures: &[f64], inflection: f64) -> Vec<f64> {
        let params = FitParams {
            inflection,
            hill: 1.0,
            asymmetry: 1.0,
        };
        temperatures
            .iter()
            .map(|&t| five_pl(t, 5.0, 95.0, &params))
            .collect()
    }

    fn test_plate() -> Plate {
        let temperatures: Vec<f64> = (0..81).map(|i| 40.0 + 0.5 * i as f64).collect();
        let wells = vec![
            WellTrace {
                id: "A01".to_string(),
                fluorescence: melt_trace(&temperatures, 55.0),
            },
            WellTrace {
                id: "A02".to_string(),
                fluorescence: melt_trace(&temperatures, 58.0),
            },
            WellTrace {
                id: "A03".to_string(),
                fluorescence: vec![10.0; temperatures.len()],
            },
            WellTrace {
                id: "A04".to_string(),
                fluorescence: melt_trace(&temperatures, 62.0),
            },
            WellTrace {
                id: "A05".to_string(),
                fluorescence: melt_trace(&temperatures, 65.0),
            },
        ];
        Plate {
            temperatures,
            wells,
        }
    }

    fn config(mode: OutputMode, normalize: bool, iso_temperature: Option<f64>) -> MeltConfig {
        MeltConfig {
            csv_path: PathBuf::from("plate.csv"),
            mode,
            normalize,
            iso_temperature,
            max_iterations: 200,
            plot_dir: None,
            export_results: None,
            export_fits: None,
            debug_bundle: false,
        }
    }

    #[test]
    fn failed_well_is_isolated_and_never_plotted() {
        let plate = test_plate();
        let sink = RecordingSink::new();

        let batch = run_batch(&plate, &config(OutputMode::Tm, false, None), Some(&sink)).unwrap();

        // Exactly one row per well, in input order.
        let order: Vec<&str> = batch.records.iter().map(|r| r.well.as_str()).collect();
        assert_eq!(order, ["A01", "A02", "A03", "A04", "A05"]);

        assert_eq!(batch.n_fitted, 4);
        assert_eq!(batch.n_failed, 1);

        let flat = &batch.records[2];
        assert_eq!(flat.fit.as_ref().unwrap_err(), &FitFailure::DegenerateWindow);
        assert!(flat.tm.is_none());

        // The flat well must not request a plot artifact.
        assert_eq!(*sink.wells.borrow(), ["A01", "A02", "A04", "A05"]);
    }

    #[test]
    fn recovered_midpoints_match_the_generating_curves() {
        let plate = test_plate();
        let batch = run_batch(&plate, &config(OutputMode::Tm, false, None), None).unwrap();

        for (record, expected) in batch
            .records
            .iter()
            .zip([Some(55.0), Some(58.0), None, Some(62.0), Some(65.0)])
        {
            match expected {
                Some(tm) => {
                    let got = record.tm.unwrap();
                    assert!((got - tm).abs() < 0.1, "{}: tm={got}, expected {tm}", record.well);
                }
                None => assert!(record.tm.is_none()),
            }
        }
    }

    #[test]
    fn normalization_preserves_midpoints_and_flags_flat_wells() {
        let plate = test_plate();
        let batch = run_batch(&plate, &config(OutputMode::Tm, true, None), None).unwrap();

        // Normalization is an affine rescale, so midpoints are unchanged.
        let a01 = batch.records[0].tm.unwrap();
        assert!((a01 - 55.0).abs() < 0.1, "tm={a01}");

        // The flat well now fails at the normalization step instead.
        let flat = &batch.records[2];
        assert_eq!(
            flat.fit.as_ref().unwrap_err(),
            &FitFailure::DegenerateNormalization
        );
    }

    #[test]
    fn isothermal_fractions_approach_the_plateaus() {
        let plate = test_plate();

        let below = run_batch(
            &plate,
            &config(OutputMode::IsothermalFraction, false, Some(40.0)),
            None,
        )
        .unwrap();
        let above = run_batch(
            &plate,
            &config(OutputMode::IsothermalFraction, false, Some(80.0)),
            None,
        )
        .unwrap();

        let low = below.records[0].unfolded.unwrap();
        let high = above.records[0].unfolded.unwrap();

        assert!((0.0..2.0).contains(&low), "low={low}");
        assert!((98.0..=100.0).contains(&high), "high={high}");

        // Failed wells report no fraction either.
        assert!(below.records[2].unfolded.is_none());
    }

    #[test]
    fn invalid_isothermal_temperature_rejects_the_whole_request() {
        let plate = test_plate();
        let err = run_batch(
            &plate,
            &config(OutputMode::IsothermalFraction, false, Some(f64::NAN)),
            None,
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), 2);

        let err = run_batch(
            &plate,
            &config(OutputMode::IsothermalFraction, false, None),
            None,
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
