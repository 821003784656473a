//! Input discovery: expand positional arguments into the image list.
//!
//! Explicit file arguments are taken as given (the caller asked for exactly
//! that file); directory arguments expand recursively to the supported image
//! formats, sorted by path for deterministic batch order. Paths that do not
//! exist are dropped with a warning, matching the treatment of missing
//! catalog directories.

use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Extensions considered images when expanding a directory.
const SUPPORTED_EXTENSIONS: &[&str] = &[
    "fits", "fit", "fts", "jpg", "jpeg", "png", "tif", "tiff", "bmp",
];

/// Expand command-line inputs into an ordered image list.
///
/// Order is significant: the batch processes images in the order they
/// appear here, which follows the order of the arguments.
pub fn expand_inputs(args: &[PathBuf]) -> Vec<PathBuf> {
    let mut images = Vec::new();
    for arg in args {
        if arg.is_dir() {
            images.extend(discover_dir(arg));
        } else if arg.is_file() {
            images.push(arg.clone());
        } else {
            warn!(path = %arg.display(), "input path does not exist, dropping");
        }
    }
    images
}

/// Recursively find supported image files under a directory.
fn discover_dir(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file() && is_supported(e.path()))
        .map(|e| e.path().to_path_buf())
        .collect();

    // Sort by path for deterministic ordering
    files.sort();
    files
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext_lower = ext.to_lowercase();
            SUPPORTED_EXTENSIONS.iter().any(|fmt| *fmt == ext_lower)
        })
        .unwrap_or(false)
}
