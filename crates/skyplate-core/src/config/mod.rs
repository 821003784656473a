//! Configuration management for skyplate.
//!
//! Configuration is loaded from a platform config directory with sensible
//! defaults; every section tolerates being absent from the file. CLI flags
//! override config values at the call site.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for skyplate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Catalog index directory settings
    pub catalog: CatalogConfig,

    /// Default search constraints
    pub search: SearchConfig,

    /// Solve stage settings
    pub solve: SolveConfig,

    /// Extract stage settings
    pub extract: ExtractConfig,

    /// External engine binaries
    pub engines: EnginesConfig,

    /// Report output settings
    pub output: OutputConfig,

    /// Batch iteration settings
    pub batch: BatchConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.skyplate.skyplate/config.toml
    /// - Linux: ~/.config/skyplate/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\skyplate\config\config.toml
    ///
    /// Falls back to ~/.skyplate/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "skyplate", "skyplate")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".skyplate").join("config.toml")
            })
    }

    /// Extra catalog directories from config, with ~ expansion applied.
    pub fn catalog_dirs(&self) -> Vec<PathBuf> {
        self.catalog
            .dirs
            .iter()
            .map(|d| PathBuf::from(shellexpand::tilde(d).into_owned()))
            .collect()
    }

    /// Scratch directory for engine adapters, with ~ expansion applied.
    pub fn temp_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.engines.temp_dir).into_owned())
    }

    /// Path to the solve-field binary, with ~ expansion applied.
    pub fn solve_field_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.engines.solve_field_path).into_owned())
    }

    /// Path to the SExtractor binary, with ~ expansion applied.
    pub fn sextractor_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.engines.sextractor_path).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.catalog.use_defaults);
        assert_eq!(config.solve.timeout_ms, 600_000);
        assert_eq!(config.search.radius_deg, 15.0);
        assert_eq!(config.output.format, "table");
        assert!(!config.output.overwrite);
        assert!(!config.batch.stop_on_failure);
    }

    #[test]
    fn test_load_from_partial_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[output]\nformat = \"toml\"\noverwrite = true\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.output.format, "toml");
        assert!(config.output.overwrite);
        // Untouched sections fall back to defaults.
        assert_eq!(config.solve.downsample, 2);
    }

    #[test]
    fn test_load_from_rejects_bad_toml() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "not toml at all [[[").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_catalog_dirs_expand_tilde() {
        let mut config = Config::default();
        config.catalog.dirs = vec!["~/astrometry".to_string()];
        let dirs = config.catalog_dirs();
        assert_eq!(dirs.len(), 1);
        assert!(!dirs[0].to_string_lossy().starts_with('~'));
    }
}
