//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};

/// Catalog index directory settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Include the platform-default index directories
    pub use_defaults: bool,

    /// Extra index directories, searched after the defaults (~ expanded)
    pub dirs: Vec<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            use_defaults: true,
            dirs: Vec::new(),
        }
    }
}

/// Default search constraints, overridable per run from the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Search-position RA in degrees; requires `dec_deg`
    pub ra_deg: Option<f64>,

    /// Search-position Dec in degrees; requires `ra_deg`
    pub dec_deg: Option<f64>,

    /// Lower scale bound; requires `scale_high`
    pub scale_low: Option<f64>,

    /// Upper scale bound; requires `scale_low`
    pub scale_high: Option<f64>,

    /// Unit for the scale bounds: degwidth, arcminwidth, arcsecperpix, focalmm
    pub scale_units: String,

    /// Radius in degrees around the search position
    pub radius_deg: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            ra_deg: None,
            dec_deg: None,
            scale_low: None,
            scale_high: None,
            scale_units: "degwidth".to_string(),
            radius_deg: 15.0,
        }
    }
}

/// Solve stage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolveConfig {
    /// Solve timeout in milliseconds
    pub timeout_ms: u64,

    /// Downsample factor applied by the solver
    pub downsample: u32,
}

impl Default for SolveConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 600_000,
            downsample: 2,
        }
    }
}

/// Extract stage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Extraction timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self { timeout_ms: 60_000 }
    }
}

/// External engine binaries and scratch space.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnginesConfig {
    /// Path to astrometry.net's solve-field binary
    pub solve_field_path: String,

    /// Path to the SExtractor binary
    pub sextractor_path: String,

    /// Scratch directory for generated engine config and catalogs
    pub temp_dir: String,
}

impl Default for EnginesConfig {
    fn default() -> Self {
        Self {
            solve_field_path: "/usr/bin/solve-field".to_string(),
            sextractor_path: "/usr/bin/sextractor".to_string(),
            temp_dir: std::env::temp_dir().to_string_lossy().into_owned(),
        }
    }
}

/// Report output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Report encoding: "table", "toml" or "yaml"
    pub format: String,

    /// Truncate existing report artifacts instead of appending
    pub overwrite: bool,

    /// Skip images whose report artifact already exists
    pub skip_solved: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "table".to_string(),
            overwrite: false,
            skip_solved: false,
        }
    }
}

/// Batch iteration settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BatchConfig {
    /// Stop iterating after the first image that fails any stage
    pub stop_on_failure: bool,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
