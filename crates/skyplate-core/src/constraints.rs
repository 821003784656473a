//! Solver search constraints and the rules for composing them.
//!
//! Constraints narrow the solver's search: an optional sky position and an
//! optional angular-scale band. They come from two places with a fixed
//! precedence: explicit CLI values always win, image-embedded header hints
//! fill in only where the CLI said nothing.
//!
//! Internal convention: RA inside a [`SearchPosition`] is in HOURS. The
//! conversion from CLI degrees happens in exactly one place, [`compose`],
//! and engines that want degrees convert back through
//! [`SearchPosition::ra_degrees`]. Keeping one convention with explicit
//! boundary conversions avoids the silent hours/degrees mixups this kind of
//! code is prone to.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unit of measure for a scale band, matching astrometry.net's
/// `--scale-units` vocabulary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleUnit {
    /// Field width in degrees
    #[default]
    DegWidth,
    /// Field width in arcminutes
    ArcminWidth,
    /// Plate scale in arcseconds per pixel
    ArcsecPerPix,
    /// Focal length in millimeters (35mm-equivalent field)
    FocalMm,
}

impl ScaleUnit {
    /// Canonical token, as accepted by `solve-field --scale-units`.
    pub fn token(&self) -> &'static str {
        match self {
            ScaleUnit::DegWidth => "degwidth",
            ScaleUnit::ArcminWidth => "arcminwidth",
            ScaleUnit::ArcsecPerPix => "arcsecperpix",
            ScaleUnit::FocalMm => "focalmm",
        }
    }

    /// Human-readable unit description for log lines.
    pub fn description(&self) -> &'static str {
        match self {
            ScaleUnit::DegWidth => "degrees wide",
            ScaleUnit::ArcminWidth => "arcminutes wide",
            ScaleUnit::ArcsecPerPix => "arcsec per pixel",
            ScaleUnit::FocalMm => "focal mm",
        }
    }
}

impl fmt::Display for ScaleUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for ScaleUnit {
    type Err = String;

    /// Accepts the short and long forms: `dw`/`degw`/`degwidth`,
    /// `aw`/`amw`/`arcminwidth`, `app`/`arcsecperpix`, `focalmm`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dw" | "degw" | "degwidth" => Ok(ScaleUnit::DegWidth),
            "aw" | "amw" | "arcminwidth" => Ok(ScaleUnit::ArcminWidth),
            "app" | "arcsecperpix" => Ok(ScaleUnit::ArcsecPerPix),
            "focalmm" => Ok(ScaleUnit::FocalMm),
            other => Err(format!(
                "unknown scale unit '{other}' (expected degwidth, arcminwidth, arcsecperpix or focalmm)"
            )),
        }
    }
}

/// A sky position to search around. RA in hours, Dec in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchPosition {
    /// Right ascension in hours (0..24)
    pub ra_hours: f64,

    /// Declination in degrees (-90..90)
    pub dec_deg: f64,
}

impl SearchPosition {
    /// Build from a position given with RA in degrees, converting to hours.
    pub fn from_degrees(ra_deg: f64, dec_deg: f64) -> Self {
        Self {
            ra_hours: ra_deg / 15.0,
            dec_deg,
        }
    }

    /// RA converted back to degrees for engines that want it that way.
    pub fn ra_degrees(&self) -> f64 {
        self.ra_hours * 15.0
    }
}

/// An inclusive angular-scale band with its unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleBounds {
    pub low: f64,
    pub high: f64,
    pub unit: ScaleUnit,
}

/// Position/scale hints recovered from an image's own headers.
///
/// FITS keywords `OBJCTRA`/`OBJCTDEC` populate the position; `SCALE` or the
/// `FOCALLEN`/`PIXSIZE1` pair populate the scale band. Non-FITS formats carry
/// no hints. The value is immutable once attached to a loaded image, and the
/// composer is its only consumer.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ImageHints {
    pub position: Option<SearchPosition>,
    pub scale: Option<ScaleBounds>,
}

impl ImageHints {
    pub fn is_empty(&self) -> bool {
        self.position.is_none() && self.scale.is_none()
    }

    /// Plate scale in arcseconds per pixel from telescope optics
    /// (206.265 arcsec/rad per mm of focal length, pixel size in um).
    pub fn scale_from_optics(focal_mm: f64, pixel_size_um: f64) -> Option<f64> {
        if focal_mm > 0.0 && pixel_size_um > 0.0 {
            Some(206.265 * pixel_size_um / focal_mm)
        } else {
            None
        }
    }

    /// A band around a known plate scale, used when headers give a single
    /// scale value rather than explicit bounds.
    pub fn band_around(arcsec_per_pixel: f64) -> ScaleBounds {
        ScaleBounds {
            low: 0.9 * arcsec_per_pixel,
            high: 1.1 * arcsec_per_pixel,
            unit: ScaleUnit::ArcsecPerPix,
        }
    }
}

/// The composed, solver-ready constraint set.
///
/// Empty constraints mean an unconstrained search: full sky, wide scale.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SearchConstraints {
    pub position: Option<SearchPosition>,
    pub scale: Option<ScaleBounds>,
}

impl SearchConstraints {
    pub fn is_empty(&self) -> bool {
        self.position.is_none() && self.scale.is_none()
    }
}

/// Merge CLI overrides with image-embedded hints.
///
/// Per field, an explicit CLI value wins outright; the hint is adopted
/// unchanged only when the CLI said nothing; absent both, the field stays
/// empty. `cli_position_deg` is `(ra_deg, dec_deg)` as parsed from argv, and
/// the degrees-to-hours conversion for RA happens here.
pub fn compose(
    cli_position_deg: Option<(f64, f64)>,
    cli_scale: Option<ScaleBounds>,
    hints: &ImageHints,
) -> SearchConstraints {
    let position = match cli_position_deg {
        Some((ra_deg, dec_deg)) => Some(SearchPosition::from_degrees(ra_deg, dec_deg)),
        None => hints.position,
    };
    let scale = cli_scale.or(hints.scale);
    SearchConstraints { position, scale }
}
