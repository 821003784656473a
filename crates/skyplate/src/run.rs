//! Batch run execution.
//!
//! Merges CLI flags with config-file settings (CLI wins per field), wires
//! the engine adapters into the pipeline, and drives the batch with a
//! progress bar and an end-of-run summary.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context};
use skyplate_core::{
    catalog, default_index_folder_paths, expand_inputs, BatchDriver, BatchOptions, BatchStats,
    CatalogPathSet, Config, ImagePipeline, OutputMode, OutputSink, ReportFormat, ScaleBounds,
    ScaleUnit, INDEX_ENV_VAR,
};
use tracing::warn;

use crate::engine::{FileLoader, SextractorExtractor, SolveFieldSolver};
use crate::Cli;

/// Run the batch described by the merged CLI and config settings.
///
/// The returned exit code is the processed-image count, clamped to the OS
/// exit-code domain.
pub async fn execute(cli: Cli, config: Config) -> anyhow::Result<ExitCode> {
    let images = expand_inputs(&cli.images);
    if images.is_empty() {
        bail!("no images to process in the given inputs");
    }

    let catalogs = resolve_catalogs(&cli, &config);
    if catalogs.is_empty() {
        warn!("no catalog index directories found, solves will likely fail");
    }

    let position_deg = merge_position(&cli, &config);
    let scale = merge_scale(&cli, &config)?;
    let format = merge_format(&cli, &config)?;

    let mode = OutputMode::from_out_arg(cli.out.as_deref());
    let streaming = matches!(mode, OutputMode::Stream(_));
    let sink = OutputSink::new(mode, format, cli.overwrite || config.output.overwrite);

    let pipeline = ImagePipeline::new(
        Box::new(FileLoader::new()),
        Box::new(SolveFieldSolver::from_config(&config)),
        Box::new(SextractorExtractor::from_config(&config)),
    );
    let options = BatchOptions {
        catalogs,
        position_deg,
        scale,
        skip_solved: cli.skip_solved || config.output.skip_solved,
        stop_on_failure: cli.stop_on_failure || config.batch.stop_on_failure,
    };
    let mut driver = BatchDriver::new(pipeline, sink, options);

    // The bar draws on stderr: suppress it when silent, for a single image,
    // or when reports go to a standard stream it would fight with.
    let show_bar = !cli.silent && images.len() > 1 && !streaming;
    let progress = show_bar.then(|| create_progress_bar(images.len() as u64));
    let start = std::time::Instant::now();

    let stats = driver
        .run_with_progress(&images, |_, _, _| {
            if let Some(bar) = &progress {
                bar.inc(1);
                let elapsed = start.elapsed().as_secs_f64();
                if elapsed > 0.0 {
                    bar.set_message(format!("{:.1} img/sec", bar.position() as f64 / elapsed));
                }
            }
        })
        .await;

    if let Some(bar) = &progress {
        bar.finish_and_clear();
    }
    if !cli.silent {
        print_summary(&stats);
    }

    Ok(ExitCode::from(stats.exit_code()))
}

/// Merge catalog directories: platform defaults (unless disabled), config
/// dirs, CLI dirs, then the environment-named dir last.
fn resolve_catalogs(cli: &Cli, config: &Config) -> CatalogPathSet {
    let mut defaults = if config.catalog.use_defaults {
        default_index_folder_paths()
    } else {
        Vec::new()
    };
    defaults.extend(config.catalog_dirs());
    let env_dir = std::env::var_os(INDEX_ENV_VAR).map(PathBuf::from);
    catalog::resolve(&defaults, &cli.index_dir, env_dir.as_deref())
}

/// CLI position wins as a pair; otherwise the config pair applies.
fn merge_position(cli: &Cli, config: &Config) -> Option<(f64, f64)> {
    match (cli.ra, cli.dec) {
        (Some(ra), Some(dec)) => Some((ra, dec)),
        _ => match (config.search.ra_deg, config.search.dec_deg) {
            (Some(ra), Some(dec)) => Some((ra, dec)),
            _ => None,
        },
    }
}

/// CLI scale bounds win as a pair; otherwise the config pair applies. The
/// unit is resolved independently so a bare `-L/-H` can reuse a configured
/// unit.
fn merge_scale(cli: &Cli, config: &Config) -> anyhow::Result<Option<ScaleBounds>> {
    let unit = match cli.scale_units {
        Some(unit) => unit,
        None => config
            .search
            .scale_units
            .parse::<ScaleUnit>()
            .map_err(anyhow::Error::msg)
            .context("config search.scale_units")?,
    };
    let pair = match (cli.scale_low, cli.scale_high) {
        (Some(low), Some(high)) => Some((low, high)),
        _ => match (config.search.scale_low, config.search.scale_high) {
            (Some(low), Some(high)) => Some((low, high)),
            _ => None,
        },
    };
    match pair {
        Some((low, high)) => {
            if !(low > 0.0 && high >= low) {
                bail!("invalid scale bounds: low {low} must be positive and not above high {high}");
            }
            Ok(Some(ScaleBounds { low, high, unit }))
        }
        None => Ok(None),
    }
}

fn merge_format(cli: &Cli, config: &Config) -> anyhow::Result<ReportFormat> {
    match cli.format {
        Some(format) => Ok(format),
        None => config
            .output
            .format
            .parse::<ReportFormat>()
            .map_err(anyhow::Error::msg)
            .context("config output.format"),
    }
}

/// Create a progress bar for batch processing.
fn create_progress_bar(total: u64) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
            )
            .unwrap()
            .progress_chars("##-"),
    );
    pb.set_message("starting...");
    pb
}

/// Print a formatted summary table after the batch.
fn print_summary(stats: &BatchStats) {
    let total = stats.processed + stats.failed + stats.skipped;

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Solved:       {:>8}", stats.processed);
    if stats.failed > 0 {
        eprintln!("    Failed:       {:>8}", stats.failed);
    }
    if stats.skipped > 0 {
        eprintln!("    Skipped:      {:>8}", stats.skipped);
    }
    if stats.extract_failed > 0 {
        eprintln!("    No star list: {:>8}", stats.extract_failed);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Total:        {:>8}", total);
    eprintln!("    Duration:     {:>7.1}s", stats.total_seconds);
    if let Some(mean) = stats.mean_seconds() {
        eprintln!("    Mean solve:   {:>7.1}s", mean);
    }
    eprintln!("  ====================================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("skyplate").chain(args.iter().copied()))
    }

    #[test]
    fn cli_scale_pair_beats_config_pair() {
        let cli = cli(&["a.fits", "-L", "10", "-H", "20", "-u", "aw"]);
        let mut config = Config::default();
        config.search.scale_low = Some(0.5);
        config.search.scale_high = Some(2.0);

        let bounds = merge_scale(&cli, &config).unwrap().unwrap();
        assert_eq!(bounds.low, 10.0);
        assert_eq!(bounds.high, 20.0);
        assert_eq!(bounds.unit, ScaleUnit::ArcminWidth);
    }

    #[test]
    fn config_scale_fills_in_when_cli_is_silent() {
        let mut config = Config::default();
        config.search.scale_low = Some(0.5);
        config.search.scale_high = Some(2.0);
        config.search.scale_units = "arcsecperpix".into();

        let bounds = merge_scale(&cli(&["a.fits"]), &config).unwrap().unwrap();
        assert_eq!(bounds.low, 0.5);
        assert_eq!(bounds.high, 2.0);
        assert_eq!(bounds.unit, ScaleUnit::ArcsecPerPix);

        assert!(merge_scale(&cli(&["a.fits"]), &Config::default())
            .unwrap()
            .is_none());
    }

    #[test]
    fn inverted_cli_bounds_are_rejected() {
        let cli = cli(&["a.fits", "-L", "5", "-H", "1"]);
        assert!(merge_scale(&cli, &Config::default()).is_err());
    }

    #[test]
    fn position_falls_back_to_config_pair() {
        let mut config = Config::default();
        config.search.ra_deg = Some(83.8);
        config.search.dec_deg = Some(-5.4);

        assert_eq!(
            merge_position(&cli(&["a.fits"]), &config),
            Some((83.8, -5.4))
        );
        assert_eq!(
            merge_position(&cli(&["a.fits", "--ra", "10", "--dec", "20"]), &config),
            Some((10.0, 20.0))
        );
        assert_eq!(merge_position(&cli(&["a.fits"]), &Config::default()), None);
    }

    #[test]
    fn format_falls_back_to_config() {
        assert_eq!(
            merge_format(&cli(&["a.fits"]), &Config::default()).unwrap(),
            ReportFormat::Table
        );
        assert_eq!(
            merge_format(&cli(&["a.fits", "-f", "yaml"]), &Config::default()).unwrap(),
            ReportFormat::Yaml
        );

        let mut config = Config::default();
        config.output.format = "toml".into();
        assert_eq!(
            merge_format(&cli(&["a.fits"]), &config).unwrap(),
            ReportFormat::Toml
        );
    }
}
