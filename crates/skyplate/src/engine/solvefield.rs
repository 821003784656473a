//! astrometry.net `solve-field` adapter.
//!
//! Each solve runs in its own scratch directory under the configured temp
//! dir: a generated `astrometry.cfg` names the catalog directories, the
//! engine writes its artifacts there, and the whole directory is removed
//! when the solve returns. Constraints map directly onto `solve-field`
//! flags; the solution is recovered from the engine's stdout.

use async_trait::async_trait;
use skyplate_core::{
    CatalogPathSet, Config, ImageData, Parity, PipelineError, PipelineResult, SearchConstraints,
    Solution, Solver,
};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::debug;

use super::tail;

/// Shells out to the installed `solve-field` binary.
pub struct SolveFieldSolver {
    binary: PathBuf,
    temp_dir: PathBuf,
    downsample: u32,
    timeout_ms: u64,
    radius_deg: f64,
}

impl SolveFieldSolver {
    pub fn from_config(config: &Config) -> Self {
        Self {
            binary: config.solve_field_path(),
            temp_dir: config.temp_dir(),
            downsample: config.solve.downsample,
            timeout_ms: config.solve.timeout_ms,
            radius_deg: config.search.radius_deg,
        }
    }

    fn build_command(
        &self,
        image_path: &Path,
        cfg_path: &Path,
        work_dir: &Path,
        constraints: &SearchConstraints,
    ) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("--overwrite")
            .arg("--no-plots")
            .arg("--config")
            .arg(cfg_path)
            .arg("--dir")
            .arg(work_dir)
            .arg("--out")
            .arg("solved");

        if let Some(scale) = &constraints.scale {
            cmd.arg("--scale-low")
                .arg(scale.low.to_string())
                .arg("--scale-high")
                .arg(scale.high.to_string())
                .arg("--scale-units")
                .arg(scale.unit.token());
        }
        if let Some(pos) = &constraints.position {
            cmd.arg("--ra")
                .arg(pos.ra_degrees().to_string())
                .arg("--dec")
                .arg(pos.dec_deg.to_string())
                .arg("--radius")
                .arg(self.radius_deg.to_string());
        }
        if self.downsample > 1 {
            cmd.arg("--downsample").arg(self.downsample.to_string());
        }
        cmd.arg("--cpulimit")
            .arg(self.cpu_limit_s().to_string())
            .arg(image_path);
        cmd
    }

    fn cpu_limit_s(&self) -> u64 {
        (self.timeout_ms / 1000).max(1)
    }
}

#[async_trait]
impl Solver for SolveFieldSolver {
    fn name(&self) -> &str {
        "solve-field"
    }

    async fn solve(
        &self,
        image: &ImageData,
        catalogs: &CatalogPathSet,
        constraints: &SearchConstraints,
    ) -> PipelineResult<Solution> {
        let solve_err = |message: String| PipelineError::Solve {
            path: image.path.clone(),
            message,
        };

        let work = TempDir::new_in(&self.temp_dir)
            .map_err(|e| solve_err(format!("cannot create work directory: {e}")))?;
        let cfg_path = work.path().join("astrometry.cfg");
        tokio::fs::write(&cfg_path, engine_config(catalogs, self.cpu_limit_s()))
            .await
            .map_err(|e| solve_err(format!("cannot write engine config: {e}")))?;

        let mut cmd = self.build_command(&image.path, &cfg_path, work.path(), constraints);
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        // If the timeout fires the output future is dropped and the child
        // reaped, so a wedged engine cannot outlive its image.
        cmd.kill_on_drop(true);

        debug!(
            binary = %self.binary.display(),
            image = %image.path.display(),
            "spawning solve-field"
        );

        let output = match tokio::time::timeout(
            Duration::from_millis(self.timeout_ms),
            cmd.output(),
        )
        .await
        {
            Ok(result) => result.map_err(|e| {
                solve_err(format!("cannot run {}: {e}", self.binary.display()))
            })?,
            Err(_) => {
                return Err(PipelineError::Timeout {
                    path: image.path.clone(),
                    stage: "solve".into(),
                    timeout_ms: self.timeout_ms,
                })
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(solve_err(format!(
                "solve-field exited with {}: {}",
                output.status,
                tail(&stderr)
            )));
        }
        if !work.path().join("solved.solved").exists() {
            return Err(solve_err(format!("field did not solve: {}", tail(&stdout))));
        }

        parse_solve_output(&stdout, image.width)
            .ok_or_else(|| solve_err(format!("cannot parse engine output: {}", tail(&stdout))))
    }
}

/// Render the `astrometry.cfg` handed to the engine, naming each catalog
/// directory in search order.
fn engine_config(catalogs: &CatalogPathSet, cpu_limit_s: u64) -> String {
    let mut cfg = String::new();
    cfg.push_str(&format!("cpulimit {cpu_limit_s}\n"));
    cfg.push_str("inparallel\n");
    cfg.push_str("autoindex\n");
    for dir in catalogs.iter() {
        cfg.push_str(&format!("add_path {}\n", dir.display()));
    }
    cfg
}

/// Recover the solution from `solve-field` stdout.
///
/// The lines of interest:
///
/// ```text
/// Field center: (RA,Dec) = (83.822088, -5.391111) deg.
/// Field size: 42.4667 x 28.2667 arcminutes
/// Field rotation angle: up is 12.71 degrees E of N
/// Field parity: pos
/// ```
///
/// Pixel scale is taken from the engine's own "pixel scale" line when
/// present, otherwise derived from field width over image width.
fn parse_solve_output(stdout: &str, image_width: u32) -> Option<Solution> {
    let (ra, dec) = parse_center(stdout)?;
    let (field_width, field_height) = parse_size_arcmin(stdout)?;
    let orientation = parse_rotation(stdout).unwrap_or(0.0);
    let parity = parse_parity(stdout);
    let pixscale = parse_pixscale(stdout)
        .unwrap_or_else(|| field_width * 60.0 / f64::from(image_width.max(1)));

    Some(Solution {
        ra,
        dec,
        field_width,
        field_height,
        pixscale,
        orientation,
        parity,
        ra_error: None,
        dec_error: None,
    })
}

fn parse_center(stdout: &str) -> Option<(f64, f64)> {
    let line = stdout
        .lines()
        .find(|l| l.contains("Field center: (RA,Dec)"))?;
    let open = line.rfind('(')?;
    let close = line.rfind(')')?;
    let mut parts = line.get(open + 1..close)?.split(',');
    let ra = parts.next()?.trim().parse().ok()?;
    let dec = parts.next()?.trim().parse().ok()?;
    Some((ra, dec))
}

fn parse_size_arcmin(stdout: &str) -> Option<(f64, f64)> {
    let rest = stdout.lines().find_map(|l| l.split("Field size:").nth(1))?;
    let mut tokens = rest.split_whitespace();
    let w: f64 = tokens.next()?.parse().ok()?;
    if tokens.next()? != "x" {
        return None;
    }
    let h: f64 = tokens.next()?.parse().ok()?;
    // The engine picks its own display unit; normalize to arcminutes.
    let factor = match tokens.next()? {
        "degrees" => 60.0,
        "arcminutes" => 1.0,
        "arcseconds" => 1.0 / 60.0,
        _ => return None,
    };
    Some((w * factor, h * factor))
}

fn parse_rotation(stdout: &str) -> Option<f64> {
    let rest = stdout
        .lines()
        .find_map(|l| l.split("Field rotation angle: up is").nth(1))?;
    rest.split_whitespace().next()?.parse().ok()
}

fn parse_parity(stdout: &str) -> Parity {
    match stdout.lines().find_map(|l| l.split("Field parity:").nth(1)) {
        Some(rest) if rest.trim().starts_with("neg") => Parity::Flipped,
        _ => Parity::Normal,
    }
}

fn parse_pixscale(stdout: &str) -> Option<f64> {
    let rest = stdout.lines().find_map(|l| l.split("pixel scale").nth(1))?;
    rest.split_whitespace().next()?.parse().ok()
}
