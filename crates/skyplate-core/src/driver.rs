//! Batch driver: runs the per-image pipeline over a whole input list.
//!
//! Processing is sequential and follows the input order. Counters live in an
//! explicit [`BatchStats`] value returned to the caller; one image's failure
//! never disturbs the next image unless `stop_on_failure` asks for exactly
//! that.

use std::path::PathBuf;
use std::time::Instant;

use tracing::{info, warn};

use crate::catalog::CatalogPathSet;
use crate::constraints::ScaleBounds;
use crate::output::OutputSink;
use crate::pipeline::{ImageOutcome, ImagePipeline, RunContext};
use crate::types::BatchStats;

/// Run-wide options for one batch.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Catalog index directories, in search order
    pub catalogs: CatalogPathSet,
    /// Position override from the command line, RA and Dec both in degrees
    pub position_deg: Option<(f64, f64)>,
    /// Scale override from the command line
    pub scale: Option<ScaleBounds>,
    /// Pass over images whose report artifact already exists
    pub skip_solved: bool,
    /// Cease iteration after the first failed image
    pub stop_on_failure: bool,
}

/// Sequential batch runner over an [`ImagePipeline`] and an [`OutputSink`].
pub struct BatchDriver {
    pipeline: ImagePipeline,
    sink: OutputSink,
    options: BatchOptions,
}

impl BatchDriver {
    pub fn new(pipeline: ImagePipeline, sink: OutputSink, options: BatchOptions) -> Self {
        Self {
            pipeline,
            sink,
            options,
        }
    }

    /// Run the batch over `images`, in order.
    pub async fn run(&mut self, images: &[PathBuf]) -> BatchStats {
        self.run_with_progress(images, |_, _, _| {}).await
    }

    /// Run the batch, invoking `progress(index, total, outcome)` after each
    /// image finishes.
    pub async fn run_with_progress<F>(&mut self, images: &[PathBuf], mut progress: F) -> BatchStats
    where
        F: FnMut(usize, usize, &ImageOutcome),
    {
        let start = Instant::now();
        let mut stats = BatchStats::default();
        let ctx = RunContext {
            catalogs: &self.options.catalogs,
            cli_position_deg: self.options.position_deg,
            cli_scale: self.options.scale,
            skip_solved: self.options.skip_solved,
        };
        let total = images.len();
        info!(total, "starting batch");

        for (index, image) in images.iter().enumerate() {
            let outcome = self.pipeline.run(image, &ctx, &mut self.sink).await;
            match outcome {
                ImageOutcome::Reported { .. } => stats.processed += 1,
                // A post-solve extraction failure still counts the solve.
                ImageOutcome::ExtractFailed => {
                    stats.processed += 1;
                    stats.extract_failed += 1;
                }
                ImageOutcome::Skipped => stats.skipped += 1,
                ImageOutcome::LoadFailed | ImageOutcome::SolveFailed => stats.failed += 1,
            }
            progress(index, total, &outcome);

            if self.options.stop_on_failure && outcome.is_failure() {
                warn!(image = %image.display(), "stopping batch after failed image");
                break;
            }
        }

        stats.total_seconds = start.elapsed().as_secs_f64();
        info!(
            processed = stats.processed,
            failed = stats.failed,
            skipped = stats.skipped,
            elapsed = ?start.elapsed(),
            "batch finished"
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{derived_report_path, OutputMode, ReportFormat};
    use crate::testutil::{stub_pipeline, StubExtractor, StubLoader, StubSolver};
    use tempfile::TempDir;

    fn per_image_sink() -> OutputSink {
        OutputSink::new(OutputMode::PerImage, ReportFormat::Table, false)
    }

    fn images_in(dir: &TempDir, names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(|n| dir.path().join(n)).collect()
    }

    #[tokio::test]
    async fn all_successes_count_as_processed() {
        let dir = TempDir::new().unwrap();
        let images = images_in(&dir, &["a.fits", "b.fits", "c.fits"]);
        let mut driver = BatchDriver::new(
            stub_pipeline(),
            per_image_sink(),
            BatchOptions::default(),
        );
        let stats = driver.run(&images).await;
        assert_eq!(stats.processed, 3);
        assert_eq!(stats.failed, 0);
        assert_eq!(stats.skipped, 0);
        assert_eq!(stats.exit_code(), 3);
    }

    #[tokio::test]
    async fn failure_of_one_image_leaves_the_next_unaffected() {
        let dir = TempDir::new().unwrap();
        let images = images_in(&dir, &["bad.fits", "good.fits"]);
        let pipeline = ImagePipeline::new(
            Box::new(StubLoader::new()),
            Box::new(StubSolver::failing_on("bad.fits")),
            Box::new(StubExtractor::new(2)),
        );
        let mut driver =
            BatchDriver::new(pipeline, per_image_sink(), BatchOptions::default());
        let stats = driver.run(&images).await;

        assert_eq!(stats.processed, 1);
        assert_eq!(stats.failed, 1);
        // The healthy image produced its full report.
        let report =
            std::fs::read_to_string(derived_report_path(&images[1], ReportFormat::Table))
                .unwrap();
        assert!(report.contains("Stars found: 2"));
        assert!(!derived_report_path(&images[0], ReportFormat::Table).exists());
    }

    #[tokio::test]
    async fn extract_failure_counts_as_processed() {
        let dir = TempDir::new().unwrap();
        let images = images_in(&dir, &["dense.fits", "clean.fits"]);
        let pipeline = ImagePipeline::new(
            Box::new(StubLoader::new()),
            Box::new(StubSolver::new()),
            Box::new(StubExtractor::failing_on("dense.fits")),
        );
        let mut driver =
            BatchDriver::new(pipeline, per_image_sink(), BatchOptions::default());
        let stats = driver.run(&images).await;

        assert_eq!(stats.processed, 2);
        assert_eq!(stats.extract_failed, 1);
        assert_eq!(stats.failed, 0);
    }

    #[tokio::test]
    async fn skip_solved_leaves_artifact_bytes_untouched() {
        let dir = TempDir::new().unwrap();
        let images = images_in(&dir, &["done.fits", "new.fits"]);
        let existing = derived_report_path(&images[0], ReportFormat::Table);
        std::fs::write(&existing, "earlier run\n").unwrap();

        let options = BatchOptions {
            skip_solved: true,
            ..Default::default()
        };
        let mut driver = BatchDriver::new(stub_pipeline(), per_image_sink(), options);
        let stats = driver.run(&images).await;

        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.processed, 1);
        assert_eq!(
            std::fs::read_to_string(&existing).unwrap(),
            "earlier run\n"
        );
    }

    #[tokio::test]
    async fn two_image_batch_with_load_failure_exits_one() {
        let dir = TempDir::new().unwrap();
        let images = images_in(&dir, &["first.fits", "second.fits"]);
        let pipeline = ImagePipeline::new(
            Box::new(StubLoader::failing_on("second.fits")),
            Box::new(StubSolver::new()),
            Box::new(StubExtractor::new(3)),
        );
        let mut driver =
            BatchDriver::new(pipeline, per_image_sink(), BatchOptions::default());
        let stats = driver.run(&images).await;

        assert_eq!(stats.processed, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.exit_code(), 1);
        let report =
            std::fs::read_to_string(derived_report_path(&images[0], ReportFormat::Table))
                .unwrap();
        assert!(report.contains("Field center"));
        assert!(report.contains("Stars found: 3"));
    }

    #[tokio::test]
    async fn stop_on_failure_ceases_iteration() {
        let dir = TempDir::new().unwrap();
        let images = images_in(&dir, &["bad.fits", "never.fits"]);
        let pipeline = ImagePipeline::new(
            Box::new(StubLoader::failing_on("bad.fits")),
            Box::new(StubSolver::new()),
            Box::new(StubExtractor::new(3)),
        );
        let options = BatchOptions {
            stop_on_failure: true,
            ..Default::default()
        };
        let mut driver = BatchDriver::new(pipeline, per_image_sink(), options);

        let mut seen = Vec::new();
        let stats = driver
            .run_with_progress(&images, |index, _, _| seen.push(index))
            .await;

        // The second image was never attempted.
        assert_eq!(seen, vec![0]);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.processed, 0);
        assert!(!derived_report_path(&images[1], ReportFormat::Table).exists());
    }

    #[tokio::test]
    async fn progress_reports_every_image_in_order() {
        let dir = TempDir::new().unwrap();
        let images = images_in(&dir, &["a.fits", "b.fits"]);
        let mut driver = BatchDriver::new(
            stub_pipeline(),
            per_image_sink(),
            BatchOptions::default(),
        );

        let mut calls = Vec::new();
        driver
            .run_with_progress(&images, |index, total, outcome| {
                calls.push((index, total, outcome.solved()));
            })
            .await;
        assert_eq!(calls, vec![(0, 2, true), (1, 2, true)]);
    }

    #[tokio::test]
    async fn aggregate_batch_collects_both_images() {
        let dir = TempDir::new().unwrap();
        let images = images_in(&dir, &["a.fits", "b.fits"]);
        let out = dir.path().join("all.txt");
        let sink = OutputSink::new(
            OutputMode::Aggregate(out.clone()),
            ReportFormat::Table,
            false,
        );
        let mut driver = BatchDriver::new(stub_pipeline(), sink, BatchOptions::default());
        let stats = driver.run(&images).await;

        assert_eq!(stats.processed, 2);
        let content = std::fs::read_to_string(&out).unwrap();
        assert_eq!(content.matches("Field center").count(), 2);
        assert_eq!(content.matches("Stars found: 3").count(), 2);
    }
}
