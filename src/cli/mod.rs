//! Command-line parsing for the melt-curve fitter.
//!
//! The goal of this module is to keep **argument parsing** and **command
//! dispatch** separate from the modeling/math code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "melt", version, about = "Thermal shift assay Tm extraction (5PL fits)")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit every well and report melting temperatures.
    Fit(FitArgs),
    /// Report percent unfolded at a fixed temperature for every well.
    Iso(IsoArgs),
    /// Generate a synthetic plate CSV for demos and smoke tests.
    Sample(SampleArgs),
}

/// Options for `melt fit`.
#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    /// Plate CSV: temperature column first, one column per well.
    pub csv: PathBuf,

    /// Rescale each trace to 0-100 from its transition extrema before fitting.
    #[arg(long)]
    pub normalize: bool,

    /// Include fitted parameters (infl/hill/assym) in the output table.
    #[arg(long)]
    pub params: bool,

    /// Optimizer iteration cap per fit attempt.
    #[arg(long, default_value_t = 200)]
    pub max_iter: usize,

    /// Write the result table to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Write full fit diagnostics (params, covariance, failures) to JSON.
    #[arg(long = "export-fits")]
    pub export_fits: Option<PathBuf>,

    /// Write one PNG per successfully fitted well into this directory.
    #[arg(long = "plot-dir")]
    pub plot_dir: Option<PathBuf>,

    /// Write a markdown debug bundle for this run.
    #[arg(long = "debug-bundle")]
    pub debug_bundle: bool,
}

/// Options for `melt iso`.
#[derive(Debug, Parser, Clone)]
pub struct IsoArgs {
    /// Plate CSV: temperature column first, one column per well.
    pub csv: PathBuf,

    /// Query temperature (same unit as the plate's temperature column).
    #[arg(long = "at")]
    pub temperature: f64,

    /// Rescale each trace to 0-100 from its transition extrema before fitting.
    #[arg(long)]
    pub normalize: bool,

    /// Optimizer iteration cap per fit attempt.
    #[arg(long, default_value_t = 200)]
    pub max_iter: usize,

    /// Write the result table to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Write full fit diagnostics (params, covariance, failures) to JSON.
    #[arg(long = "export-fits")]
    pub export_fits: Option<PathBuf>,

    /// Write one PNG per successfully fitted well into this directory.
    #[arg(long = "plot-dir")]
    pub plot_dir: Option<PathBuf>,

    /// Write a markdown debug bundle for this run.
    #[arg(long = "debug-bundle")]
    pub debug_bundle: bool,
}

/// Options for `melt sample`.
#[derive(Debug, Parser)]
pub struct SampleArgs {
    /// Output CSV path.
    #[arg(short, long, default_value = "plate.csv")]
    pub out: PathBuf,

    /// Number of wells (including flat wells).
    #[arg(long, default_value_t = 24)]
    pub wells: usize,

    /// Number of temperature readings.
    #[arg(long, default_value_t = 141)]
    pub readings: usize,

    /// First temperature of the gradient.
    #[arg(long, default_value_t = 25.0)]
    pub temp_start: f64,

    /// Gradient step between readings.
    #[arg(long, default_value_t = 0.5)]
    pub temp_step: f64,

    /// Gaussian noise standard deviation (fluorescence units).
    #[arg(long, default_value_t = 1.5)]
    pub noise: f64,

    /// Number of deliberately flat (empty) wells appended to the plate.
    #[arg(long, default_value_t = 2)]
    pub flat_wells: usize,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}
