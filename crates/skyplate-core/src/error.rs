//! Error types for the skyplate batch solving pipeline.
//!
//! Errors are organized by stage to provide clear, actionable error messages
//! that include relevant context (image paths, stage names, specific issues).
//! Per-image failures are never batch-fatal: the driver records them and
//! continues with the next image.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for skyplate operations.
#[derive(Error, Debug)]
pub enum SkyplateError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML report serialization errors
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// YAML report serialization errors
    #[error("YAML serialize error: {0}")]
    YamlSer(#[from] serde_yml::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Per-image pipeline errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Image loading or decoding failed
    #[error("Load failed for {path}: {message}")]
    Load { path: PathBuf, message: String },

    /// Plate solve did not converge or the engine reported failure
    #[error("Solve failed for {path}: {message}")]
    Solve { path: PathBuf, message: String },

    /// Star extraction failed
    #[error("Extract failed for {path}: {message}")]
    Extract { path: PathBuf, message: String },

    /// An engine exceeded its allotted time
    #[error("Timeout in {stage} stage for {path} after {timeout_ms}ms")]
    Timeout {
        path: PathBuf,
        stage: String,
        timeout_ms: u64,
    },

    /// File disappeared between discovery and load
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
}

impl PipelineError {
    /// Stage label used in diagnostics and summary lines.
    pub fn stage(&self) -> &str {
        match self {
            PipelineError::Load { .. } | PipelineError::FileNotFound(_) => "load",
            PipelineError::Solve { .. } => "solve",
            PipelineError::Extract { .. } => "extract",
            PipelineError::Timeout { stage, .. } => stage.as_str(),
        }
    }
}

/// Convenience type alias for skyplate results.
pub type Result<T> = std::result::Result<T, SkyplateError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_error_carries_image_identity() {
        let err = PipelineError::Solve {
            path: PathBuf::from("/images/m42.fits"),
            message: "no quads matched".into(),
        };
        let text = err.to_string();
        assert!(text.contains("m42.fits"));
        assert!(text.contains("no quads matched"));
    }

    #[test]
    fn stage_names_match_variants() {
        let load = PipelineError::Load {
            path: PathBuf::from("a"),
            message: String::new(),
        };
        let solve = PipelineError::Solve {
            path: PathBuf::from("a"),
            message: String::new(),
        };
        let extract = PipelineError::Extract {
            path: PathBuf::from("a"),
            message: String::new(),
        };
        let timeout = PipelineError::Timeout {
            path: PathBuf::from("a"),
            stage: "solve".into(),
            timeout_ms: 1000,
        };
        assert_eq!(load.stage(), "load");
        assert_eq!(solve.stage(), "solve");
        assert_eq!(extract.stage(), "extract");
        assert_eq!(timeout.stage(), "solve");
    }
}
