//! Engine adapters: the real implementations behind the core's engine traits.
//!
//! The loader decodes files in-process; solving and extraction shell out to
//! the installed astrometry.net and SExtractor binaries.

mod loader;
mod sextractor;
mod solvefield;

pub use loader::FileLoader;
pub use sextractor::SextractorExtractor;
pub use solvefield::SolveFieldSolver;

/// Last few lines of engine output, joined for an error message.
pub(crate) fn tail(text: &str) -> String {
    let lines: Vec<&str> = text.lines().rev().take(3).collect();
    lines.into_iter().rev().collect::<Vec<_>>().join(" | ")
}
