//! SExtractor adapter.
//!
//! Runs the installed `sextractor` binary against the image and parses its
//! ASCII catalog back into star detections. The measurement parameter file
//! and convolution filter are generated per run in a scratch directory;
//! non-FITS inputs are converted first because the engine only reads FITS.

use async_trait::async_trait;
use skyplate_core::{ExtractProfile, ImageData, PipelineError, PipelineResult, StarExtractor,
    StarDetection};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::debug;

use super::loader::{fits_bytes, is_fits};
use super::tail;

/// Measured columns, in output order.
const PARAM_CONTENT: &str = "X_IMAGE\nY_IMAGE\nMAG_AUTO\nFLUX_AUTO\nFLUX_MAX\nFLUX_RADIUS\n";

/// 3x3 gaussian detection filter (FWHM 2 pixels).
const CONV_CONTENT: &str = "CONV NORM\n1 2 1\n2 4 2\n1 2 1\n";

/// Shells out to the installed SExtractor binary.
pub struct SextractorExtractor {
    binary: PathBuf,
    temp_dir: PathBuf,
    timeout_ms: u64,
}

impl SextractorExtractor {
    pub fn from_config(config: &skyplate_core::Config) -> Self {
        Self {
            binary: config.sextractor_path(),
            temp_dir: config.temp_dir(),
            timeout_ms: config.extract.timeout_ms,
        }
    }

    fn build_command(
        &self,
        input: &Path,
        catalog_path: &Path,
        param_path: &Path,
        conv_path: &Path,
        profile: ExtractProfile,
    ) -> Command {
        let (thresh, minarea) = detection_params(profile);
        let mut cmd = Command::new(&self.binary);
        cmd.arg(input)
            .arg("-CATALOG_NAME")
            .arg(catalog_path)
            .arg("-CATALOG_TYPE")
            .arg("ASCII_HEAD")
            .arg("-PARAMETERS_NAME")
            .arg(param_path)
            .arg("-FILTER")
            .arg("Y")
            .arg("-FILTER_NAME")
            .arg(conv_path)
            .arg("-MAG_ZEROPOINT")
            .arg("20")
            .arg("-DETECT_THRESH")
            .arg(thresh.to_string())
            .arg("-DETECT_MINAREA")
            .arg(minarea.to_string());
        cmd
    }
}

/// Detection threshold (sigma) and minimum area (pixels) per profile.
///
/// `AllStars` digs deepest; the size-banded profiles raise a detection floor
/// instead, trading completeness for speed.
fn detection_params(profile: ExtractProfile) -> (f64, u32) {
    match profile {
        ExtractProfile::AllStars => (1.5, 5),
        ExtractProfile::SmallStars => (2.0, 3),
        ExtractProfile::MidStars => (3.0, 5),
        ExtractProfile::BigStars => (5.0, 10),
    }
}

#[async_trait]
impl StarExtractor for SextractorExtractor {
    fn name(&self) -> &str {
        "sextractor"
    }

    async fn extract(
        &self,
        image: &ImageData,
        profile: ExtractProfile,
    ) -> PipelineResult<Vec<StarDetection>> {
        let extract_err = |message: String| PipelineError::Extract {
            path: image.path.clone(),
            message,
        };

        let work = TempDir::new_in(&self.temp_dir)
            .map_err(|e| extract_err(format!("cannot create work directory: {e}")))?;
        let input = if is_fits(&image.path) {
            image.path.clone()
        } else {
            let converted = work.path().join("input.fits");
            tokio::fs::write(&converted, fits_bytes(image))
                .await
                .map_err(|e| extract_err(format!("cannot convert input to FITS: {e}")))?;
            converted
        };

        let catalog_path = work.path().join("stars.cat");
        let param_path = work.path().join("stars.param");
        let conv_path = work.path().join("default.conv");
        tokio::fs::write(&param_path, PARAM_CONTENT)
            .await
            .map_err(|e| extract_err(format!("cannot write parameter file: {e}")))?;
        tokio::fs::write(&conv_path, CONV_CONTENT)
            .await
            .map_err(|e| extract_err(format!("cannot write filter file: {e}")))?;

        let mut cmd = self.build_command(&input, &catalog_path, &param_path, &conv_path, profile);
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        debug!(
            binary = %self.binary.display(),
            image = %image.path.display(),
            profile = profile.name(),
            "spawning sextractor"
        );

        let output = match tokio::time::timeout(
            Duration::from_millis(self.timeout_ms),
            cmd.output(),
        )
        .await
        {
            Ok(result) => result.map_err(|e| {
                extract_err(format!("cannot run {}: {e}", self.binary.display()))
            })?,
            Err(_) => {
                return Err(PipelineError::Timeout {
                    path: image.path.clone(),
                    stage: "extract".into(),
                    timeout_ms: self.timeout_ms,
                })
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(extract_err(format!(
                "sextractor exited with {}: {}",
                output.status,
                tail(&stderr)
            )));
        }

        let text = tokio::fs::read_to_string(&catalog_path)
            .await
            .map_err(|e| extract_err(format!("no catalog produced: {e}")))?;
        Ok(parse_catalog(&text))
    }
}

/// Parse an `ASCII_HEAD` catalog: `#` header lines describe the columns,
/// data rows follow [`PARAM_CONTENT`] order. Stars come back brightest
/// first (flux descending).
fn parse_catalog(text: &str) -> Vec<StarDetection> {
    let mut stars = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let values: Vec<f64> = line
            .split_whitespace()
            .filter_map(|t| t.parse().ok())
            .collect();
        if values.len() < 6 {
            debug!(line, "skipping malformed catalog row");
            continue;
        }
        stars.push(StarDetection {
            x: values[0],
            y: values[1],
            mag: values[2],
            flux: values[3],
            peak: values[4],
            hfr: values[5],
            sky: None,
        });
    }
    stars.sort_by(|a, b| b.flux.partial_cmp(&a.flux).unwrap_or(std::cmp::Ordering::Equal));
    stars
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = "\
#   1 X_IMAGE                Object position along x                          [pixel]
#   2 Y_IMAGE                Object position along y                          [pixel]
#   3 MAG_AUTO               Kron-like elliptical aperture magnitude          [mag]
#   4 FLUX_AUTO              Flux within a Kron-like elliptical aperture      [count]
#   5 FLUX_MAX               Peak flux above background                       [count]
#   6 FLUX_RADIUS            Fraction-of-light radii                          [pixel]
    100.500    200.250  -7.1203    6881.9     881.20   1.902
   1024.337    512.890  -9.8815   88122.4    5120.77   2.731
";

    fn extractor() -> SextractorExtractor {
        SextractorExtractor {
            binary: PathBuf::from("/usr/bin/sextractor"),
            temp_dir: std::env::temp_dir(),
            timeout_ms: 60_000,
        }
    }

    #[test]
    fn catalog_rows_become_stars_brightest_first() {
        let stars = parse_catalog(CATALOG);
        assert_eq!(stars.len(), 2);
        // The brighter star was second in the file.
        assert!((stars[0].x - 1024.337).abs() < 1e-9);
        assert!((stars[0].y - 512.890).abs() < 1e-9);
        assert!((stars[0].mag - -9.8815).abs() < 1e-9);
        assert!((stars[0].flux - 88122.4).abs() < 1e-9);
        assert!((stars[0].peak - 5120.77).abs() < 1e-9);
        assert!((stars[0].hfr - 2.731).abs() < 1e-9);
        assert!(stars[0].sky.is_none());
        assert!(stars[1].flux < stars[0].flux);
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let stars = parse_catalog("# header\n1 2 3\nnot numbers at all\n1 2 3 4 5 6\n");
        assert_eq!(stars.len(), 1);
    }

    #[test]
    fn empty_catalog_is_zero_stars() {
        assert!(parse_catalog("# only headers\n").is_empty());
    }

    #[test]
    fn parameter_file_lists_columns_in_parse_order() {
        let columns: Vec<&str> = PARAM_CONTENT.lines().collect();
        assert_eq!(
            columns,
            ["X_IMAGE", "Y_IMAGE", "MAG_AUTO", "FLUX_AUTO", "FLUX_MAX", "FLUX_RADIUS"]
        );
    }

    #[test]
    fn profiles_map_to_detection_params() {
        assert_eq!(detection_params(ExtractProfile::AllStars), (1.5, 5));
        assert_eq!(detection_params(ExtractProfile::SmallStars), (2.0, 3));
        assert_eq!(detection_params(ExtractProfile::MidStars), (3.0, 5));
        assert_eq!(detection_params(ExtractProfile::BigStars), (5.0, 10));
    }

    #[test]
    fn command_carries_catalog_and_filter_settings() {
        let cmd = extractor().build_command(
            Path::new("/images/m42.fits"),
            Path::new("/tmp/work/stars.cat"),
            Path::new("/tmp/work/stars.param"),
            Path::new("/tmp/work/default.conv"),
            ExtractProfile::AllStars,
        );
        let args: Vec<String> = cmd
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(args[0], "/images/m42.fits");
        let expect_pair = |flag: &str, value: &str| {
            let at = args.iter().position(|a| a == flag).unwrap();
            assert_eq!(args[at + 1], value, "value for {flag}");
        };
        expect_pair("-CATALOG_TYPE", "ASCII_HEAD");
        expect_pair("-CATALOG_NAME", "/tmp/work/stars.cat");
        expect_pair("-PARAMETERS_NAME", "/tmp/work/stars.param");
        expect_pair("-FILTER", "Y");
        expect_pair("-FILTER_NAME", "/tmp/work/default.conv");
        expect_pair("-DETECT_THRESH", "1.5");
        expect_pair("-DETECT_MINAREA", "5");
    }
}
