//! Report encoders for the three output formats.
//!
//! Every format carries the same logical content in the same order: a solve
//! section (image identity, timestamp, field center, size, scale, rotation,
//! parity) and a star section (count plus one row per star). The table format
//! reproduces the classic solver demo's stdout report line for line, so the
//! output stays a drop-in replacement for scripts that scrape it.

use crate::coords::{dec_to_dms, ra_to_hms};
use crate::error::Result;
use crate::types::{Parity, Solution, StarDetection};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;
use std::str::FromStr;

/// Report encoding selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// Tabular text, byte-compatible with the classic demo report
    Table,
    /// One `[[image]]` array-of-tables element per image
    Toml,
    /// One `---` document per image
    Yaml,
}

impl ReportFormat {
    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "table" | "txt" | "text" => Some(Self::Table),
            "toml" => Some(Self::Toml),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }

    /// Suffix appended to an image name to derive its report file name.
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Table => ".txt",
            Self::Toml => ".toml",
            Self::Yaml => ".yaml",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Toml => "toml",
            Self::Yaml => "yaml",
        }
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown report format '{s}' (expected table, toml or yaml)"))
    }
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Separator used by the table format, same width as the classic report.
const TABLE_RULE: &str =
    "+++++++++++++++++++++++++++++++++++++++++++++++++++++++++++";

#[derive(Serialize)]
struct SolveEntry<'a> {
    name: &'a str,
    date_processed: String,
    ra_deg: f64,
    dec_deg: f64,
    width_arcmin: f64,
    height_arcmin: f64,
    rotation_deg: f64,
    parity: Parity,
    pixel_scale: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    ra_error_arcsec: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dec_error_arcsec: Option<f64>,
}

impl<'a> SolveEntry<'a> {
    fn new(name: &'a str, date: DateTime<Utc>, solution: &Solution) -> Self {
        Self {
            name,
            date_processed: date.to_rfc3339_opts(SecondsFormat::Secs, true),
            ra_deg: solution.ra,
            dec_deg: solution.dec,
            width_arcmin: solution.field_width,
            height_arcmin: solution.field_height,
            rotation_deg: solution.orientation,
            parity: solution.parity,
            pixel_scale: solution.pixscale,
            ra_error_arcsec: solution.ra_error,
            dec_error_arcsec: solution.dec_error,
        }
    }
}

#[derive(Serialize)]
struct TomlImageDoc<'a> {
    image: Vec<SolveEntry<'a>>,
}

#[derive(Serialize)]
struct StarRow {
    index: usize,
    x_px: f64,
    y_px: f64,
    ra: String,
    dec: String,
    mag: f64,
    peak: f64,
    hfr: f64,
}

impl StarRow {
    fn new(index: usize, star: &StarDetection) -> Self {
        let (ra, dec) = match star.sky {
            Some(sky) => (ra_to_hms(sky.ra), dec_to_dms(sky.dec)),
            None => ("--".to_string(), "--".to_string()),
        };
        Self {
            index,
            x_px: star.x,
            y_px: star.y,
            ra,
            dec,
            mag: star.mag,
            peak: star.peak,
            hfr: star.hfr,
        }
    }
}

#[derive(Serialize)]
struct YamlStarsEntry {
    stars_found: usize,
    stars: Vec<StarRow>,
}

/// Render the solve section of a report.
///
/// `image` is the image identity as given on the command line.
pub fn render_solve(
    format: ReportFormat,
    image: &Path,
    date: DateTime<Utc>,
    solution: &Solution,
) -> Result<String> {
    let name = image.to_string_lossy();
    match format {
        ReportFormat::Table => {
            let mut out = String::new();
            // Writes to String cannot fail.
            writeln!(out, "Image: {name}").ok();
            writeln!(
                out,
                "Date processed: {}",
                date.to_rfc3339_opts(SecondsFormat::Secs, true)
            )
            .ok();
            writeln!(out, "{TABLE_RULE}").ok();
            writeln!(
                out,
                "Field center: (RA,Dec) = ({:.6}, {:.6}) deg.",
                solution.ra, solution.dec
            )
            .ok();
            writeln!(
                out,
                "Field size: {:.6} x {:.6} arcminutes",
                solution.field_width, solution.field_height
            )
            .ok();
            writeln!(out, "Pixel Scale: {:.6}\"", solution.pixscale).ok();
            writeln!(
                out,
                "Field rotation angle: up is {:.6} degrees E of N",
                solution.orientation
            )
            .ok();
            writeln!(out, "Field parity: {}", solution.parity).ok();
            Ok(out)
        }
        ReportFormat::Toml => {
            let doc = TomlImageDoc {
                image: vec![SolveEntry::new(&name, date, solution)],
            };
            Ok(toml::to_string(&doc)?)
        }
        ReportFormat::Yaml => {
            let entry = SolveEntry::new(&name, date, solution);
            Ok(format!("---\n{}", serde_yml::to_string(&entry)?))
        }
    }
}

/// Render the star section of a report, appended after the solve section.
pub fn render_stars(format: ReportFormat, stars: &[StarDetection]) -> Result<String> {
    match format {
        ReportFormat::Table => {
            let mut out = String::new();
            writeln!(out, "{TABLE_RULE}").ok();
            writeln!(out, "Stars found: {}", stars.len()).ok();
            for (i, star) in stars.iter().enumerate() {
                let row = StarRow::new(i, star);
                // Trailing space before the newline is part of the classic line.
                writeln!(
                    out,
                    "Star #{}: ({:.6} x, {:.6} y), (ra: {},dec: {}), mag: {:.6}, peak: {:.6}, hfr: {:.6} ",
                    row.index, row.x_px, row.y_px, row.ra, row.dec, row.mag, row.peak, row.hfr
                )
                .ok();
            }
            Ok(out)
        }
        ReportFormat::Toml => {
            // Continues the preceding [[image]] element: a bare key first,
            // then nested array-of-tables rows.
            let mut out = format!("stars_found = {}\n", stars.len());
            for (i, star) in stars.iter().enumerate() {
                out.push_str("\n[[image.stars]]\n");
                out.push_str(&toml::to_string(&StarRow::new(i, star))?);
            }
            Ok(out)
        }
        ReportFormat::Yaml => {
            // Continues the image's mapping document; no new `---`.
            let entry = YamlStarsEntry {
                stars_found: stars.len(),
                stars: stars
                    .iter()
                    .enumerate()
                    .map(|(i, s)| StarRow::new(i, s))
                    .collect(),
            };
            Ok(serde_yml::to_string(&entry)?)
        }
    }
}
