//! Skyplate CLI - batch plate solving from the command line.
//!
//! Takes astronomical images as input, determines each field's sky position
//! with the installed astrometry.net engine, extracts the visible stars with
//! SExtractor, and writes a report per image (or one aggregate report).
//!
//! # Usage
//!
//! ```bash
//! # Solve one image, report written next to it
//! skyplate m42.fits
//!
//! # Solve a directory with hints, one aggregate TOML report
//! skyplate ./captures/ --ra 83.8 --dec -5.4 -L 1 -H 2 -u app -f toml -o night.toml
//!
//! # Re-run a batch, keeping finished reports
//! skyplate ./captures/ --skip-solved
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use skyplate_core::{Config, ReportFormat, ScaleUnit};

mod engine;
mod logging;
mod run;

/// Skyplate - batch plate solver producing sky-position reports.
#[derive(Parser, Debug)]
#[command(name = "skyplate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Images or directories of images to solve
    #[arg(required = true, value_name = "IMAGE")]
    pub images: Vec<PathBuf>,

    /// Add a catalog index directory (repeatable)
    #[arg(short = 'I', short_alias = 'd', long = "index-dir", value_name = "DIR")]
    pub index_dir: Vec<PathBuf>,

    /// Report destination: a file path, "stdout" or "stderr"; omitted means
    /// one report file derived per image
    #[arg(short, long, value_name = "PATH")]
    pub out: Option<String>,

    /// Truncate existing report artifacts instead of appending
    #[arg(short = 'O', long)]
    pub overwrite: bool,

    /// Skip images whose report artifact already exists
    #[arg(short = 'K', short_alias = 'J', long, visible_alias = "continue")]
    pub skip_solved: bool,

    /// Search-position right ascension in degrees
    #[arg(long, value_name = "DEG", requires = "dec")]
    pub ra: Option<f64>,

    /// Search-position declination in degrees
    #[arg(long, value_name = "DEG", requires = "ra")]
    pub dec: Option<f64>,

    /// Lower bound of the field scale search band
    #[arg(short = 'L', long, value_name = "VAL", requires = "scale_high")]
    pub scale_low: Option<f64>,

    /// Upper bound of the field scale search band
    #[arg(short = 'H', long, value_name = "VAL", requires = "scale_low")]
    pub scale_high: Option<f64>,

    /// Unit for the scale bounds: degwidth, arcminwidth, arcsecperpix, focalmm
    #[arg(short = 'u', long, value_name = "UNIT")]
    pub scale_units: Option<ScaleUnit>,

    /// Report encoding: table, toml or yaml
    #[arg(short = 'f', long, value_name = "FMT")]
    pub format: Option<ReportFormat>,

    /// Enable verbose (debug) logging
    #[arg(short, long, conflicts_with = "silent")]
    pub verbose: bool,

    /// Errors only: no progress bar, no summary
    #[arg(short, long)]
    pub silent: bool,

    /// Output logs in JSON format
    #[arg(long)]
    pub json_logs: bool,

    /// Use this config file instead of the platform default
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Stop the batch after the first image that fails
    #[arg(long)]
    pub stop_on_failure: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln.
    let config = match &cli.config {
        Some(path) => Config::load_from(path)
            .map_err(|e| anyhow::anyhow!("cannot load config {}: {e}", path.display()))?,
        None => match Config::load() {
            Ok(config) => config,
            Err(e) => {
                eprintln!(
                    "Warning: Failed to load config: {e}\n  \
                     Using default configuration."
                );
                Config::default()
            }
        },
    };
    logging::init_from_config(&config, cli.verbose, cli.silent, cli.json_logs);

    tracing::debug!("skyplate v{}", skyplate_core::VERSION);

    run::execute(cli, config).await
}
