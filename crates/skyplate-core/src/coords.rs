//! Sky-coordinate helpers.
//!
//! Sexagesimal rendering for report output, and the tangent-plane (TAN)
//! projection used to annotate extracted stars with sky positions from a
//! plate solution. This is WCS glue, not solver mathematics.

use crate::types::{Parity, SkyPoint, Solution};

/// Format a right ascension in degrees as `HH:MM:SS.SSS`.
///
/// The value is wrapped into [0, 360) first, so small negative inputs and
/// inputs past a full turn render as their canonical hour angle.
pub fn ra_to_hms(ra_deg: f64) -> String {
    let hours = ra_deg.rem_euclid(360.0) / 15.0;
    // Work in integer milliseconds of time to get carry-free rounding.
    let total_ms = (hours * 3_600_000.0).round() as i64;
    let total_ms = total_ms.rem_euclid(24 * 3_600_000);
    let h = total_ms / 3_600_000;
    let m = (total_ms / 60_000) % 60;
    let ms = total_ms % 60_000;
    format!("{:02}:{:02}:{:02}.{:03}", h, m, ms / 1000, ms % 1000)
}

/// Format a declination in degrees as `+DD:MM:SS.SS` / `-DD:MM:SS.SS`.
///
/// The sign is always emitted. Values are expected in [-90, 90]; rounding
/// carries through minutes and degrees rather than printing `60` in a field.
pub fn dec_to_dms(dec_deg: f64) -> String {
    let sign = if dec_deg < 0.0 { '-' } else { '+' };
    // Integer centiseconds of arc for carry-free rounding.
    let total_cs = (dec_deg.abs() * 360_000.0).round() as i64;
    let d = total_cs / 360_000;
    let m = (total_cs / 6_000) % 60;
    let cs = total_cs % 6_000;
    format!("{}{:02}:{:02}:{:02}.{:02}", sign, d, m, cs / 100, cs % 100)
}

/// Tangent-plane projection anchored at a plate solution's field center.
///
/// Converts pixel coordinates to sky coordinates using the solved scale,
/// rotation and parity. The reference pixel is the image center, matching
/// where the solver reports the field center.
#[derive(Debug, Clone)]
pub struct TanProjection {
    ra0_rad: f64,
    dec0_rad: f64,
    /// Radians of sky per pixel
    scale_rad: f64,
    sin_rot: f64,
    cos_rot: f64,
    /// -1.0 for normal parity (east left of north), +1.0 for flipped
    parity_sign: f64,
    ref_x: f64,
    ref_y: f64,
}

impl TanProjection {
    /// Build a projection from a solution and the solved image's dimensions.
    pub fn from_solution(solution: &Solution, width: u32, height: u32) -> Self {
        let rot = solution.orientation.to_radians();
        Self {
            ra0_rad: solution.ra.to_radians(),
            dec0_rad: solution.dec.to_radians(),
            scale_rad: (solution.pixscale / 3600.0).to_radians(),
            sin_rot: rot.sin(),
            cos_rot: rot.cos(),
            parity_sign: match solution.parity {
                Parity::Normal => -1.0,
                Parity::Flipped => 1.0,
            },
            ref_x: f64::from(width) / 2.0,
            ref_y: f64::from(height) / 2.0,
        }
    }

    /// Project a pixel position to the sky, inverse gnomonic.
    pub fn pixel_to_sky(&self, x: f64, y: f64) -> SkyPoint {
        // Pixel offsets on the tangent plane, image "up" positive.
        let x_t = (x - self.ref_x) * self.scale_rad;
        let y_t = (self.ref_y - y) * self.scale_rad;

        // Rotate into standard coordinates: xi east, eta north. Image up
        // points `orientation` degrees east of north; parity mirrors x.
        let xi = self.parity_sign * x_t * self.cos_rot + y_t * self.sin_rot;
        let eta = -self.parity_sign * x_t * self.sin_rot + y_t * self.cos_rot;

        let (sin_dec0, cos_dec0) = self.dec0_rad.sin_cos();
        let d = cos_dec0 - eta * sin_dec0;
        let ra = self.ra0_rad + xi.atan2(d);
        let dec = (sin_dec0 + eta * cos_dec0).atan2((xi * xi + d * d).sqrt());

        SkyPoint {
            ra: ra.to_degrees().rem_euclid(360.0),
            dec: dec.to_degrees(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solution_at(ra: f64, dec: f64, orientation: f64, parity: Parity) -> Solution {
        Solution {
            ra,
            dec,
            field_width: 60.0,
            field_height: 40.0,
            pixscale: 2.0,
            orientation,
            parity,
            ra_error: None,
            dec_error: None,
        }
    }

    #[test]
    fn ra_hms_known_values() {
        assert_eq!(ra_to_hms(0.0), "00:00:00.000");
        assert_eq!(ra_to_hms(180.0), "12:00:00.000");
        assert_eq!(ra_to_hms(56.75), "03:47:00.000");
    }

    #[test]
    fn ra_hms_wraps_and_carries() {
        assert_eq!(ra_to_hms(360.0), "00:00:00.000");
        assert_eq!(ra_to_hms(-15.0), "23:00:00.000");
        // Rounds up into the next day and wraps back to zero.
        assert_eq!(ra_to_hms(359.9999999), "00:00:00.000");
    }

    #[test]
    fn dec_dms_known_values() {
        assert_eq!(dec_to_dms(0.0), "+00:00:00.00");
        assert_eq!(dec_to_dms(-5.391), "-05:23:27.60");
        assert_eq!(dec_to_dms(24.1), "+24:06:00.00");
        assert_eq!(dec_to_dms(-90.0), "-90:00:00.00");
    }

    #[test]
    fn dec_dms_carries_through_fields() {
        assert_eq!(dec_to_dms(89.9999999), "+90:00:00.00");
    }

    #[test]
    fn projection_center_maps_to_center() {
        let sol = solution_at(180.0, 30.0, 0.0, Parity::Normal);
        let proj = TanProjection::from_solution(&sol, 1000, 800);
        let sky = proj.pixel_to_sky(500.0, 400.0);
        assert!((sky.ra - 180.0).abs() < 1e-9);
        assert!((sky.dec - 30.0).abs() < 1e-9);
    }

    #[test]
    fn projection_up_is_north_at_zero_rotation() {
        let sol = solution_at(180.0, 30.0, 0.0, Parity::Normal);
        let proj = TanProjection::from_solution(&sol, 1000, 800);
        // 10 pixels up at 2"/px is 20" north.
        let sky = proj.pixel_to_sky(500.0, 390.0);
        assert!((sky.ra - 180.0).abs() < 1e-6);
        let delta_arcsec = (sky.dec - 30.0) * 3600.0;
        assert!((delta_arcsec - 20.0).abs() < 0.01);
    }

    #[test]
    fn projection_right_is_west_for_normal_parity() {
        let sol = solution_at(180.0, 0.0, 0.0, Parity::Normal);
        let proj = TanProjection::from_solution(&sol, 1000, 800);
        let sky = proj.pixel_to_sky(510.0, 400.0);
        assert!(sky.ra < 180.0);
    }

    #[test]
    fn projection_right_is_east_for_flipped_parity() {
        let sol = solution_at(180.0, 0.0, 0.0, Parity::Flipped);
        let proj = TanProjection::from_solution(&sol, 1000, 800);
        let sky = proj.pixel_to_sky(510.0, 400.0);
        assert!(sky.ra > 180.0);
    }
}
