//! Measurement engine configuration.
//!
//! Every fallback and tuning constant the engine relies on lives here and is
//! passed explicitly into geometry, hit testing, lifecycle and rendering calls.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Tunables for the measurement engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasureConfig {
    /// Pixels per world unit used when the map supplies a non-positive value.
    pub default_pixels_per_unit: f64,
    /// Lifetime of a non-permanent shared measurement, in milliseconds.
    pub ttl_ms: u64,
    /// Cone half-angle used for rendering and labels when no width is given.
    pub cone_half_angle_deg: f64,
    /// Cone half-angle used for hit testing when no width is given.
    pub hit_cone_half_angle_deg: f64,
    /// Interaction buffer around shapes, in screen pixels.
    pub hit_tolerance_px: f64,
    /// Lowest zoom accepted at the call boundary.
    pub min_zoom: f64,
    /// Upscale applied to circle skins to hide their transparent padding.
    pub circle_skin_scale: f64,
    /// Label font size at zoom 1.
    pub label_font_size: f64,
    /// Radius of anchor/endpoint markers at zoom 1.
    pub marker_radius: f64,
    /// Shortest drag (local pixels) accepted for calibration.
    pub calibration_min_drag_px: f64,
}

impl Default for MeasureConfig {
    fn default() -> Self {
        Self {
            default_pixels_per_unit: 50.0,
            ttl_ms: 6_000,
            cone_half_angle_deg: 15.0,
            hit_cone_half_angle_deg: 26.5,
            hit_tolerance_px: 15.0,
            min_zoom: 0.01,
            circle_skin_scale: 1.35,
            label_font_size: 14.0,
            marker_radius: 5.0,
            calibration_min_drag_px: 10.0,
        }
    }
}

impl MeasureConfig {
    /// Parse a configuration from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        log::debug!("Loaded measurement config from {}", path.display());
        Self::from_json(&json)
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> ConfigResult<()> {
        let positive = [
            ("default_pixels_per_unit", self.default_pixels_per_unit),
            ("hit_tolerance_px", self.hit_tolerance_px),
            ("min_zoom", self.min_zoom),
            ("circle_skin_scale", self.circle_skin_scale),
            ("label_font_size", self.label_font_size),
            ("marker_radius", self.marker_radius),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be a positive number, got {value}"),
                });
            }
        }

        let angles = [
            ("cone_half_angle_deg", self.cone_half_angle_deg),
            ("hit_cone_half_angle_deg", self.hit_cone_half_angle_deg),
        ];
        for (field, value) in angles {
            if !(value > 0.0 && value < 90.0) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("must lie strictly between 0 and 90 degrees, got {value}"),
                });
            }
        }

        if !(self.calibration_min_drag_px.is_finite() && self.calibration_min_drag_px >= 0.0) {
            return Err(ConfigError::Invalid {
                field: "calibration_min_drag_px",
                reason: format!("must be zero or positive, got {}", self.calibration_min_drag_px),
            });
        }
        Ok(())
    }

    /// Default render-time cone half-angle in radians.
    pub fn cone_half_angle(&self) -> f64 {
        self.cone_half_angle_deg.to_radians()
    }

    /// Default hit-test cone half-angle in radians.
    pub fn hit_cone_half_angle(&self) -> f64 {
        self.hit_cone_half_angle_deg.to_radians()
    }
}
