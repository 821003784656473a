//! Per-image stage machine: load, solve, report, extract, annotate.
//!
//! One image moves through the stages in a fixed order and ends in exactly
//! one outcome. A stage failure is terminal for the image, never for the
//! batch. The solve report is written before extraction starts, so a solved
//! image keeps its solution on record even when extraction dies afterwards.

use std::path::Path;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::catalog::CatalogPathSet;
use crate::constraints::{self, ScaleBounds};
use crate::coords::TanProjection;
use crate::engine::{ExtractProfile, ImageLoader, Solver, StarExtractor};
use crate::output::OutputSink;

/// How one image's trip through the pipeline ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOutcome {
    /// Solved, extracted and fully reported
    Reported { stars_found: usize },
    /// Passed over before loading because its report already existed
    Skipped,
    /// The loader could not read or decode the file
    LoadFailed,
    /// The solver gave up or errored
    SolveFailed,
    /// Solved and reported, but extraction failed afterwards
    ExtractFailed,
}

impl ImageOutcome {
    /// Whether a solution was produced (and its report written).
    pub fn solved(&self) -> bool {
        matches!(
            self,
            ImageOutcome::Reported { .. } | ImageOutcome::ExtractFailed
        )
    }

    /// Whether the image ended in a failed stage.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            ImageOutcome::LoadFailed | ImageOutcome::SolveFailed | ImageOutcome::ExtractFailed
        )
    }
}

/// Run-wide inputs shared by every image of a batch.
#[derive(Debug, Clone, Copy)]
pub struct RunContext<'a> {
    /// Catalog index directories, in search order
    pub catalogs: &'a CatalogPathSet,
    /// Position override from the command line, RA and Dec both in degrees
    pub cli_position_deg: Option<(f64, f64)>,
    /// Scale override from the command line
    pub cli_scale: Option<ScaleBounds>,
    /// Pass over images whose report artifact already exists
    pub skip_solved: bool,
}

impl<'a> RunContext<'a> {
    /// A context with no overrides and skipping disabled.
    pub fn new(catalogs: &'a CatalogPathSet) -> Self {
        Self {
            catalogs,
            cli_position_deg: None,
            cli_scale: None,
            skip_solved: false,
        }
    }
}

/// Drives a single image through the full stage sequence.
///
/// The engines are trait objects so the CLI can wire real external tools
/// while tests wire stubs.
pub struct ImagePipeline {
    loader: Box<dyn ImageLoader>,
    solver: Box<dyn Solver>,
    extractor: Box<dyn StarExtractor>,
}

impl ImagePipeline {
    pub fn new(
        loader: Box<dyn ImageLoader>,
        solver: Box<dyn Solver>,
        extractor: Box<dyn StarExtractor>,
    ) -> Self {
        Self {
            loader,
            solver,
            extractor,
        }
    }

    /// Process one image end to end, writing its report through `sink`.
    ///
    /// Report-write problems are logged and do not fail the image; the
    /// solution itself is sound and the sink has already fallen back to
    /// stdout where it could.
    pub async fn run(
        &self,
        path: &Path,
        ctx: &RunContext<'_>,
        sink: &mut OutputSink,
    ) -> ImageOutcome {
        let start = Instant::now();

        // The check runs before any load work so already-solved images
        // cost nothing.
        if ctx.skip_solved && sink.artifact_exists(path) {
            info!(image = %path.display(), "report already exists, skipping");
            return ImageOutcome::Skipped;
        }

        let image = match self.loader.load(path).await {
            Ok(image) => image,
            Err(err) => {
                warn!(image = %path.display(), error = %err, "load failed");
                return ImageOutcome::LoadFailed;
            }
        };
        debug!(
            image = %image.file_name(),
            width = image.width,
            height = image.height,
            loader = self.loader.name(),
            "loaded"
        );

        // CLI overrides win per field; header hints fill the gaps.
        let constraints = constraints::compose(ctx.cli_position_deg, ctx.cli_scale, &image.hints);
        if let Some(pos) = &constraints.position {
            debug!(
                ra_hours = pos.ra_hours,
                dec_deg = pos.dec_deg,
                "search position constraint"
            );
        }

        let solve_start = Instant::now();
        let solution = match self
            .solver
            .solve(&image, ctx.catalogs, &constraints)
            .await
        {
            Ok(solution) => solution,
            Err(err) => {
                warn!(image = %path.display(), error = %err, "solve failed");
                return ImageOutcome::SolveFailed;
            }
        };
        info!(
            image = %image.file_name(),
            ra = solution.ra,
            dec = solution.dec,
            solver = self.solver.name(),
            elapsed = ?solve_start.elapsed(),
            "solved"
        );

        if let Err(err) = sink.write_solve_report(path, Utc::now(), &solution) {
            warn!(image = %path.display(), error = %err, "could not write solve report");
        }

        let mut stars = match self
            .extractor
            .extract(&image, ExtractProfile::AllStars)
            .await
        {
            Ok(stars) => stars,
            Err(err) => {
                warn!(image = %path.display(), error = %err, "extraction failed");
                if let Err(err) = sink.finalize_image() {
                    warn!(image = %path.display(), error = %err, "could not finish report");
                }
                return ImageOutcome::ExtractFailed;
            }
        };

        // Annotate pixel detections with sky positions through the solution.
        let projection = TanProjection::from_solution(&solution, image.width, image.height);
        for star in &mut stars {
            star.sky = Some(projection.pixel_to_sky(star.x, star.y));
        }

        if let Err(err) = sink.append_star_report(&stars) {
            warn!(image = %path.display(), error = %err, "could not write star report");
        }
        if let Err(err) = sink.finalize_image() {
            warn!(image = %path.display(), error = %err, "could not finish report");
        }

        debug!(
            image = %image.file_name(),
            stars = stars.len(),
            elapsed = ?start.elapsed(),
            "reported"
        );
        ImageOutcome::Reported {
            stars_found: stars.len(),
        }
    }
}
