//! Skyplate Core - Embeddable batch plate-solving library.
//!
//! Skyplate drives astronomical images through plate solving and star
//! extraction, producing per-image reports: the solved field center, size,
//! scale, rotation and parity, followed by the extracted stars annotated
//! with sky coordinates.
//!
//! # Architecture
//!
//! A sequential pipeline with pluggable engines behind traits:
//!
//! ```text
//! Image → Load → Compose Constraints → Solve → Report → Extract → Annotate → Report
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use skyplate_core::{BatchDriver, BatchOptions, ImagePipeline, OutputMode, OutputSink, ReportFormat};
//!
//! #[tokio::main]
//! async fn main() {
//!     let pipeline = ImagePipeline::new(loader, solver, extractor);
//!     let sink = OutputSink::new(OutputMode::PerImage, ReportFormat::Table, false);
//!     let mut driver = BatchDriver::new(pipeline, sink, BatchOptions::default());
//!
//!     let stats = driver.run(&images).await;
//!     std::process::exit(stats.exit_code().into());
//! }
//! ```

// Module declarations
pub mod catalog;
pub mod config;
pub mod constraints;
pub mod coords;
pub mod driver;
pub mod engine;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod types;

#[cfg(test)]
mod testutil;

// Re-exports for convenient access
pub use catalog::{default_index_folder_paths, CatalogPathSet, INDEX_ENV_VAR};
pub use config::Config;
pub use constraints::{ImageHints, ScaleBounds, ScaleUnit, SearchConstraints, SearchPosition};
pub use driver::{BatchDriver, BatchOptions};
pub use engine::{ExtractProfile, ImageLoader, Solver, StarExtractor};
pub use error::{ConfigError, PipelineError, PipelineResult, Result, SkyplateError};
pub use output::{OutputMode, OutputSink, ReportFormat};
pub use pipeline::{expand_inputs, ImageOutcome, ImagePipeline, RunContext};
pub use types::{BatchStats, ImageData, Parity, SkyPoint, Solution, StarDetection};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
