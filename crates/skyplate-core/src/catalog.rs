//! Catalog index directory resolution.
//!
//! The solver searches star-pattern index files across an ordered list of
//! directories. The list is merged from three sources: platform defaults,
//! CLI-supplied directories, and the `ASTROMETRY_INDEX_FILES` environment
//! variable. Missing directories are dropped silently because catalogs are
//! optional contributions, and search order is preserved because it affects
//! match preference among equally-scoring indexes.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use tracing::debug;

/// Environment variable naming one extra catalog directory, appended last.
pub const INDEX_ENV_VAR: &str = "ASTROMETRY_INDEX_FILES";

/// Ordered, existence-filtered, de-duplicated catalog directory list.
///
/// Read-only after resolution; the driver shares it by reference across all
/// images in a batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogPathSet {
    paths: Vec<PathBuf>,
}

impl CatalogPathSet {
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PathBuf> {
        self.paths.iter()
    }
}

/// Merge catalog directories in precedence order: defaults, then CLI paths
/// in the order given, then the environment-supplied path.
///
/// Directories that do not exist are dropped with a debug log. Duplicates
/// collapse on their canonicalized form, keeping the first occurrence, so
/// `/a/b` and `/a/b/` (or a symlink to either) count once. Idempotent for
/// unchanged inputs and filesystem state.
pub fn resolve(
    defaults: &[PathBuf],
    cli_dirs: &[PathBuf],
    env_dir: Option<&Path>,
) -> CatalogPathSet {
    let mut seen = HashSet::new();
    let mut paths = Vec::new();

    let candidates = defaults
        .iter()
        .chain(cli_dirs.iter())
        .map(PathBuf::as_path)
        .chain(env_dir);

    for path in candidates {
        if !path.exists() {
            debug!(path = %path.display(), "catalog directory does not exist, dropping");
            continue;
        }
        // Dedupe on the canonical form but keep the spelling we were given.
        let key = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        if seen.insert(key) {
            paths.push(path.to_path_buf());
        }
    }

    debug!(count = paths.len(), "resolved catalog directories");
    CatalogPathSet { paths }
}

/// Platform-default index directories, existence-filtered.
///
/// macOS: the Astrometry application-support folder and the Homebrew share
/// path. Linux: the distribution share path and the per-user KStars data
/// directory. Windows: the ANSVR cygwin data paths.
pub fn default_index_folder_paths() -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = Vec::new();

    #[cfg(target_os = "macos")]
    {
        if let Some(base) = BaseDirs::new() {
            paths.push(base.home_dir().join("Library/Application Support/Astrometry"));
        }
        paths.push(PathBuf::from("/usr/local/share/astrometry"));
    }

    #[cfg(target_os = "linux")]
    {
        paths.push(PathBuf::from("/usr/share/astrometry"));
        if let Some(base) = BaseDirs::new() {
            paths.push(base.home_dir().join(".local/share/kstars/astrometry"));
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(base) = BaseDirs::new() {
            paths.push(
                base.home_dir()
                    .join("AppData/Local/cygwin_ansvr/usr/share/astrometry/data"),
            );
        }
        paths.push(PathBuf::from("C:/cygwin/usr/share/astrometry/data"));
    }

    paths.retain(|p| p.exists());
    paths
}
