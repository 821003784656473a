//! Configuration validation with range checks.

use crate::constraints::ScaleUnit;
use crate::error::ConfigError;
use crate::output::ReportFormat;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.solve.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "solve.timeout_ms must be > 0".into(),
            ));
        }
        if self.solve.downsample == 0 {
            return Err(ConfigError::ValidationError(
                "solve.downsample must be > 0".into(),
            ));
        }
        if self.extract.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "extract.timeout_ms must be > 0".into(),
            ));
        }
        if self.search.radius_deg <= 0.0 || self.search.radius_deg > 180.0 {
            return Err(ConfigError::ValidationError(
                "search.radius_deg must be in (0, 180]".into(),
            ));
        }
        if self.search.ra_deg.is_some() != self.search.dec_deg.is_some() {
            return Err(ConfigError::ValidationError(
                "search.ra_deg and search.dec_deg must be set together".into(),
            ));
        }
        if let Some(ra) = self.search.ra_deg {
            if !(0.0..360.0).contains(&ra) {
                return Err(ConfigError::ValidationError(
                    "search.ra_deg must be in [0, 360)".into(),
                ));
            }
        }
        if let Some(dec) = self.search.dec_deg {
            if !(-90.0..=90.0).contains(&dec) {
                return Err(ConfigError::ValidationError(
                    "search.dec_deg must be in [-90, 90]".into(),
                ));
            }
        }
        if self.search.scale_low.is_some() != self.search.scale_high.is_some() {
            return Err(ConfigError::ValidationError(
                "search.scale_low and search.scale_high must be set together".into(),
            ));
        }
        if let (Some(low), Some(high)) = (self.search.scale_low, self.search.scale_high) {
            if low <= 0.0 {
                return Err(ConfigError::ValidationError(
                    "search.scale_low must be > 0".into(),
                ));
            }
            if low > high {
                return Err(ConfigError::ValidationError(
                    "search.scale_low must not exceed search.scale_high".into(),
                ));
            }
        }
        if self.search.scale_units.parse::<ScaleUnit>().is_err() {
            return Err(ConfigError::ValidationError(format!(
                "search.scale_units '{}' is not a known unit",
                self.search.scale_units
            )));
        }
        if self.output.format.parse::<ReportFormat>().is_err() {
            return Err(ConfigError::ValidationError(format!(
                "output.format '{}' is not one of table, toml, yaml",
                self.output.format
            )));
        }
        Ok(())
    }
}
