//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - loads the plate
//! - runs the per-well fit pipeline
//! - prints reports
//! - writes optional exports, plots, and debug bundles

use clap::Parser;

use crate::cli::{Command, FitArgs, IsoArgs, SampleArgs};
use crate::data::{SampleOptions, generate_plate};
use crate::domain::{MeltConfig, OutputMode};
use crate::error::AppError;
use crate::plot::{PlotSink, PngPlotSink};

pub mod pipeline;

/// Entry point for the `melt` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Fit(args) => run_batch_command(fit_config_from_args(&args)),
        Command::Iso(args) => run_batch_command(iso_config_from_args(&args)),
        Command::Sample(args) => handle_sample(args),
    }
}

fn run_batch_command(config: MeltConfig) -> Result<(), AppError> {
    let ingested = crate::io::ingest::load_plate(&config.csv_path)?;

    let png_sink = match &config.plot_dir {
        Some(dir) => Some(PngPlotSink::new(dir.clone())?),
        None => None,
    };
    let sink: Option<&dyn PlotSink> = png_sink.as_ref().map(|s| s as &dyn PlotSink);

    let batch = pipeline::run_batch(&ingested.plate, &config, sink)?;

    println!("{}", crate::report::format_run_summary(&ingested.stats, &config));
    println!("{}", crate::report::format_results(&batch.records, &config));

    if let Some(path) = &config.export_results {
        crate::io::export::write_results_csv(path, &batch.records, &config)?;
    }
    if let Some(path) = &config.export_fits {
        crate::io::fits::write_fits_json(path, &batch.records, &config)?;
    }
    if config.debug_bundle {
        let path = crate::debug::write_debug_bundle(&ingested.stats, &batch.records, &config)?;
        println!("Debug bundle: {}", path.display());
    }

    Ok(())
}

fn handle_sample(args: SampleArgs) -> Result<(), AppError> {
    let opts = SampleOptions {
        wells: args.wells,
        readings: args.readings,
        temp_start: args.temp_start,
        temp_step: args.temp_step,
        noise: args.noise,
        flat_wells: args.flat_wells,
        seed: args.seed,
    };

    let sample = generate_plate(&opts)?;
    crate::io::export::write_plate_csv(&args.out, &sample.plate)?;

    println!(
        "Wrote {} wells x {} readings to {}",
        sample.plate.n_wells(),
        sample.plate.n_readings(),
        args.out.display()
    );
    Ok(())
}

pub fn fit_config_from_args(args: &FitArgs) -> MeltConfig {
    MeltConfig {
        csv_path: args.csv.clone(),
        mode: if args.params {
            OutputMode::TmWithParams
        } else {
            OutputMode::Tm
        },
        normalize: args.normalize,
        iso_temperature: None,
        max_iterations: args.max_iter,
        plot_dir: args.plot_dir.clone(),
        export_results: args.export.clone(),
        export_fits: args.export_fits.clone(),
        debug_bundle: args.debug_bundle,
    }
}

pub fn iso_config_from_args(args: &IsoArgs) -> MeltConfig {
    MeltConfig {
        csv_path: args.csv.clone(),
        mode: OutputMode::IsothermalFraction,
        normalize: args.normalize,
        iso_temperature: Some(args.temperature),
        max_iterations: args.max_iter,
        plot_dir: args.plot_dir.clone(),
        export_results: args.export.clone(),
        export_fits: args.export_fits.clone(),
        debug_bundle: args.debug_bundle,
    }
}
