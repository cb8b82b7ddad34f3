//! Synthetic plate generation.
//!
//! `melt sample` produces a seeded plate of 5PL melt curves with Gaussian
//! noise, plus a configurable number of flat wells (buffer-only/empty wells)
//! so the failure-isolation path can be exercised without instrument data.
//! Deterministic given the seed.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{FitParams, Plate, WellTrace};
use crate::error::AppError;
use crate::models::five_pl;

#[derive(Debug, Clone)]
pub struct SampleOptions {
    pub wells: usize,
    pub readings: usize,
    pub temp_start: f64,
    pub temp_step: f64,
    /// Gaussian noise standard deviation in fluorescence units.
    pub noise: f64,
    /// Number of flat wells appended after the melt-curve wells.
    pub flat_wells: usize,
    pub seed: u64,
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self {
            wells: 24,
            readings: 141,
            temp_start: 25.0,
            temp_step: 0.5,
            noise: 1.5,
            flat_wells: 2,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SamplePlate {
    pub plate: Plate,
    /// Ground-truth parameters per well; `None` for flat wells.
    pub truths: Vec<Option<FitParams>>,
}

/// Generate a synthetic plate.
pub fn generate_plate(opts: &SampleOptions) -> Result<SamplePlate, AppError> {
    if opts.wells == 0 {
        return Err(AppError::new(2, "Sample well count must be > 0."));
    }
    if opts.readings < 3 {
        return Err(AppError::new(2, "Sample plates need at least 3 readings."));
    }
    if !(opts.temp_step.is_finite() && opts.temp_step > 0.0 && opts.temp_start.is_finite()) {
        return Err(AppError::new(2, "Invalid temperature gradient settings."));
    }
    if !(opts.noise.is_finite() && opts.noise >= 0.0) {
        return Err(AppError::new(2, "Sample noise must be finite and >= 0."));
    }
    if opts.flat_wells > opts.wells {
        return Err(AppError::new(2, "More flat wells requested than wells."));
    }

    let mut rng = StdRng::seed_from_u64(opts.seed);
    let noise_dist = if opts.noise > 0.0 {
        Some(
            Normal::new(0.0, opts.noise)
                .map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?,
        )
    } else {
        None
    };

    let temperatures: Vec<f64> = (0..opts.readings)
        .map(|i| opts.temp_start + opts.temp_step * i as f64)
        .collect();
    let t_min = temperatures[0];
    let t_max = temperatures[opts.readings - 1];
    let span = t_max - t_min;

    let melt_wells = opts.wells - opts.flat_wells;
    let mut wells = Vec::with_capacity(opts.wells);
    let mut truths = Vec::with_capacity(opts.wells);

    for i in 0..opts.wells {
        let id = well_id(i);

        if i < melt_wells {
            // Keep inflections inside the middle of the gradient so every
            // generated transition is fully bracketed by the scan.
            let params = FitParams {
                inflection: rng.gen_range(t_min + 0.25 * span..=t_min + 0.75 * span),
                hill: rng.gen_range(0.6..=1.8),
                asymmetry: rng.gen_range(0.8..=1.3),
            };
            let baseline = rng.gen_range(2.0..=12.0);
            let plateau = rng.gen_range(80.0..=120.0);

            let fluorescence = temperatures
                .iter()
                .map(|&t| {
                    let mut v = five_pl(t, baseline, plateau, &params);
                    if let Some(dist) = &noise_dist {
                        v += dist.sample(&mut rng);
                    }
                    v
                })
                .collect();

            wells.push(WellTrace { id, fluorescence });
            truths.push(Some(params));
        } else {
            let baseline = rng.gen_range(2.0..=12.0);
            let fluorescence = temperatures
                .iter()
                .map(|_| {
                    let mut v = baseline;
                    if let Some(dist) = &noise_dist {
                        v += 0.1 * dist.sample(&mut rng);
                    }
                    v
                })
                .collect();

            wells.push(WellTrace { id, fluorescence });
            truths.push(None);
        }
    }

    Ok(SamplePlate {
        plate: Plate {
            temperatures,
            wells,
        },
        truths,
    })
}

/// Plate-style well names: A01..A12, B01..B12, ...
fn well_id(index: usize) -> String {
    let row = (b'A' + (index / 12) as u8 % 26) as char;
    let col = index % 12 + 1;
    format!("{row}{col:02}")
}
