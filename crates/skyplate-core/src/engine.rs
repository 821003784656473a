//! Engine contracts: the collaborators the pipeline consumes.
//!
//! Solving, extraction and decoding are external capabilities. The pipeline
//! drives them through these traits and never looks inside: each call blocks
//! (as an awaited future) until the engine reports a definite success or
//! failure. Implementations live in the CLI crate or in test stubs.

use crate::catalog::CatalogPathSet;
use crate::constraints::SearchConstraints;
use crate::error::PipelineResult;
use crate::types::{ImageData, Solution, StarDetection};
use async_trait::async_trait;
use std::path::Path;

/// Extraction tuning preset handed to a [`StarExtractor`].
///
/// Mirrors the classic profile ladder: `AllStars` favors completeness over
/// speed and is what the pipeline requests after a confirmed solve; the
/// size-banded presets trade completeness for throughput on focused use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExtractProfile {
    /// Exhaustive extraction, small minimum radius, no dimness cut
    #[default]
    AllStars,
    /// Small-sized stars only, tight size cap and saturation limit
    SmallStars,
    /// Mid-sized stars, dimmest fraction removed
    MidStars,
    /// Large stars only, aggressive dimness cut
    BigStars,
}

impl ExtractProfile {
    /// Profile name for engine configuration and log lines.
    pub fn name(&self) -> &'static str {
        match self {
            ExtractProfile::AllStars => "AllStars",
            ExtractProfile::SmallStars => "SmallSizedStars",
            ExtractProfile::MidStars => "MidSizedStars",
            ExtractProfile::BigStars => "BigSizedStars",
        }
    }
}

/// Decodes an image file into a pixel buffer plus embedded hints.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (the pipeline holds `Box<dyn ImageLoader>` et al. for dynamic dispatch).
#[async_trait]
pub trait ImageLoader: Send + Sync {
    /// Loader name for logging (e.g., "image-file", "stub").
    fn name(&self) -> &str;

    /// Decode the file at `path` into grayscale samples and header hints.
    async fn load(&self, path: &Path) -> PipelineResult<ImageData>;
}

/// Plate-solves a loaded image against catalog indexes.
#[async_trait]
pub trait Solver: Send + Sync {
    /// Solver name for logging (e.g., "solve-field", "stub").
    fn name(&self) -> &str;

    /// Solve for the image's sky position.
    ///
    /// `constraints` may be empty, which means an unconstrained full-sky,
    /// wide-scale search. Catalog directories are searched in order.
    async fn solve(
        &self,
        image: &ImageData,
        catalogs: &CatalogPathSet,
        constraints: &SearchConstraints,
    ) -> PipelineResult<Solution>;
}

/// Measures point sources in a loaded image.
#[async_trait]
pub trait StarExtractor: Send + Sync {
    /// Extractor name for logging (e.g., "sextractor", "stub").
    fn name(&self) -> &str;

    /// Extract stars in pixel coordinates, ordered by the engine's own
    /// ranking (typically brightness).
    async fn extract(
        &self,
        image: &ImageData,
        profile: ExtractProfile,
    ) -> PipelineResult<Vec<StarDetection>>;
}
