//! Shared engine stubs and fixtures for pipeline and driver tests.
//!
//! The stubs fail by file name, so a test can mix healthy and broken images
//! in one batch and watch the counters.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::catalog::CatalogPathSet;
use crate::constraints::{ImageHints, SearchConstraints};
use crate::engine::{ExtractProfile, ImageLoader, Solver, StarExtractor};
use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::ImagePipeline;
use crate::types::{ImageData, Parity, Solution, StarDetection};

pub(crate) fn orion_solution() -> Solution {
    Solution {
        ra: 83.822,
        dec: -5.391,
        field_width: 42.5,
        field_height: 28.3,
        pixscale: 1.25,
        orientation: 12.7,
        parity: Parity::Normal,
        ra_error: None,
        dec_error: None,
    }
}

pub(crate) fn sample_stars(count: usize) -> Vec<StarDetection> {
    (0..count)
        .map(|i| StarDetection {
            x: 100.0 + 10.0 * i as f64,
            y: 80.0 + 5.0 * i as f64,
            mag: -8.0 + 0.5 * i as f64,
            flux: 15_000.0 - 1_000.0 * i as f64,
            peak: 4096.0,
            hfr: 2.1,
            sky: None,
        })
        .collect()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Loader stub: synthesizes a small frame, failing for listed file names.
pub(crate) struct StubLoader {
    fail: HashSet<String>,
    hints: ImageHints,
}

impl StubLoader {
    pub(crate) fn new() -> Self {
        Self {
            fail: HashSet::new(),
            hints: ImageHints::default(),
        }
    }

    pub(crate) fn with_hints(hints: ImageHints) -> Self {
        Self {
            fail: HashSet::new(),
            hints,
        }
    }

    pub(crate) fn failing_on(name: &str) -> Self {
        let mut stub = Self::new();
        stub.fail.insert(name.to_string());
        stub
    }
}

#[async_trait]
impl ImageLoader for StubLoader {
    fn name(&self) -> &str {
        "stub"
    }

    async fn load(&self, path: &Path) -> PipelineResult<ImageData> {
        if self.fail.contains(&file_name(path)) {
            return Err(PipelineError::Load {
                path: path.to_path_buf(),
                message: "synthetic load failure".into(),
            });
        }
        Ok(ImageData {
            path: path.to_path_buf(),
            width: 100,
            height: 80,
            pixels: vec![0.0; 100 * 80],
            hints: self.hints,
        })
    }
}

/// Solver stub: returns a fixed solution and records the constraints it saw.
pub(crate) struct StubSolver {
    fail: HashSet<String>,
    solution: Solution,
    pub(crate) seen: Arc<Mutex<Vec<SearchConstraints>>>,
}

impl StubSolver {
    pub(crate) fn new() -> Self {
        Self {
            fail: HashSet::new(),
            solution: orion_solution(),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn failing_on(name: &str) -> Self {
        let mut stub = Self::new();
        stub.fail.insert(name.to_string());
        stub
    }
}

#[async_trait]
impl Solver for StubSolver {
    fn name(&self) -> &str {
        "stub"
    }

    async fn solve(
        &self,
        image: &ImageData,
        _catalogs: &CatalogPathSet,
        constraints: &SearchConstraints,
    ) -> PipelineResult<Solution> {
        self.seen.lock().unwrap().push(*constraints);
        if self.fail.contains(&image.file_name()) {
            return Err(PipelineError::Solve {
                path: image.path.clone(),
                message: "synthetic solve failure".into(),
            });
        }
        Ok(self.solution.clone())
    }
}

/// Extractor stub: returns a fixed star list, failing for listed names.
pub(crate) struct StubExtractor {
    fail: HashSet<String>,
    stars: Vec<StarDetection>,
}

impl StubExtractor {
    pub(crate) fn new(count: usize) -> Self {
        Self {
            fail: HashSet::new(),
            stars: sample_stars(count),
        }
    }

    pub(crate) fn failing_on(name: &str) -> Self {
        let mut stub = Self::new(3);
        stub.fail.insert(name.to_string());
        stub
    }
}

#[async_trait]
impl StarExtractor for StubExtractor {
    fn name(&self) -> &str {
        "stub"
    }

    async fn extract(
        &self,
        image: &ImageData,
        _profile: ExtractProfile,
    ) -> PipelineResult<Vec<StarDetection>> {
        if self.fail.contains(&image.file_name()) {
            return Err(PipelineError::Extract {
                path: image.path.clone(),
                message: "synthetic extract failure".into(),
            });
        }
        Ok(self.stars.clone())
    }
}

/// Pipeline over all-success stubs, three stars per image.
pub(crate) fn stub_pipeline() -> ImagePipeline {
    ImagePipeline::new(
        Box::new(StubLoader::new()),
        Box::new(StubSolver::new()),
        Box::new(StubExtractor::new(3)),
    )
}
