//! Core data types for the skyplate batch solving pipeline.
//!
//! These types represent the data flowing through the pipeline: loaded image
//! buffers with their header hints, the astrometric solution for a field, and
//! the stars extracted from it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Image parity reported by a plate solve.
///
/// `Normal` means east is counter-clockwise from north on the image,
/// `Flipped` means the image is mirrored. Report lines render these with the
/// conventional short forms "pos" and "neg".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    Normal,
    Flipped,
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parity::Normal => write!(f, "pos"),
            Parity::Flipped => write!(f, "neg"),
        }
    }
}

/// The astrometric solution for one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    /// Field center right ascension in degrees (0..360)
    pub ra: f64,

    /// Field center declination in degrees (-90..90)
    pub dec: f64,

    /// Field width in arcminutes
    pub field_width: f64,

    /// Field height in arcminutes
    pub field_height: f64,

    /// Plate scale in arcseconds per pixel
    pub pixscale: f64,

    /// Rotation of "up" in degrees east of north
    pub orientation: f64,

    /// Mirror parity of the field
    pub parity: Parity,

    /// Estimated RA uncertainty in arcseconds, when the engine reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ra_error: Option<f64>,

    /// Estimated Dec uncertainty in arcseconds, when the engine reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dec_error: Option<f64>,
}

/// A position on the celestial sphere, both coordinates in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkyPoint {
    /// Right ascension in degrees (0..360)
    pub ra: f64,

    /// Declination in degrees (-90..90)
    pub dec: f64,
}

/// A single extracted star.
///
/// Pixel coordinates come from the extraction engine; the `sky` position is
/// annotated afterwards by projecting through the image's solution, so it is
/// only present for images that solved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarDetection {
    /// Centroid x position in pixels
    pub x: f64,

    /// Centroid y position in pixels
    pub y: f64,

    /// Instrumental magnitude
    pub mag: f64,

    /// Total flux in ADU
    pub flux: f64,

    /// Peak pixel value in ADU
    pub peak: f64,

    /// Half-flux radius in pixels
    pub hfr: f64,

    /// Sky position projected through the plate solution
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sky: Option<SkyPoint>,
}

/// A decoded image ready for solving and extraction.
#[derive(Debug, Clone)]
pub struct ImageData {
    /// Path the image was loaded from
    pub path: PathBuf,

    /// Image width in pixels
    pub width: u32,

    /// Image height in pixels
    pub height: u32,

    /// Grayscale samples, row-major, in the source data's value range
    pub pixels: Vec<f32>,

    /// Position/scale hints recovered from the image's headers
    pub hints: crate::constraints::ImageHints,
}

impl ImageData {
    /// File name portion of the source path, lossy for non-UTF-8 names.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }
}

/// Counters and timing for one batch run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchStats {
    /// Images that produced a solution
    pub processed: usize,

    /// Images that failed before producing a solution
    pub failed: usize,

    /// Images skipped because their report already existed
    pub skipped: usize,

    /// Images whose extraction failed after a successful solve.
    /// These still count as processed.
    pub extract_failed: usize,

    /// Wall-clock duration of the whole run in seconds
    pub total_seconds: f64,
}

impl BatchStats {
    /// Mean seconds per solved image; only meaningful past a single solve.
    pub fn mean_seconds(&self) -> Option<f64> {
        if self.processed > 1 {
            Some(self.total_seconds / self.processed as f64)
        } else {
            None
        }
    }

    /// Process exit status: the number of solved images, clamped to fit.
    pub fn exit_code(&self) -> u8 {
        self.processed.min(255) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_solution() -> Solution {
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

    #[test]
    fn parity_display_uses_short_forms() {
        assert_eq!(Parity::Normal.to_string(), "pos");
        assert_eq!(Parity::Flipped.to_string(), "neg");
    }

    #[test]
    fn parity_serializes_lowercase() {
        let json = serde_json::to_string(&Parity::Flipped).unwrap();
        assert_eq!(json, "\"flipped\"");
    }

    #[test]
    fn solution_skips_absent_errors() {
        let json = serde_json::to_string(&sample_solution()).unwrap();
        assert!(!json.contains("ra_error"));
        assert!(!json.contains("dec_error"));
    }

    #[test]
    fn star_without_sky_omits_field() {
        let star = StarDetection {
            x: 101.5,
            y: 212.25,
            mag: -8.2,
            flux: 15000.0,
            peak: 4096.0,
            hfr: 2.1,
            sky: None,
        };
        let json = serde_json::to_string(&star).unwrap();
        assert!(!json.contains("sky"));
    }

    #[test]
    fn stats_mean_requires_multiple_solves() {
        let mut stats = BatchStats {
            processed: 1,
            total_seconds: 10.0,
            ..Default::default()
        };
        assert_eq!(stats.mean_seconds(), None);
        stats.processed = 4;
        assert_eq!(stats.mean_seconds(), Some(2.5));
    }

    #[test]
    fn exit_code_clamps_to_u8() {
        let stats = BatchStats {
            processed: 300,
            ..Default::default()
        };
        assert_eq!(stats.exit_code(), 255);
        let small = BatchStats {
            processed: 7,
            ..Default::default()
        };
        assert_eq!(small.exit_code(), 7);
    }
}
