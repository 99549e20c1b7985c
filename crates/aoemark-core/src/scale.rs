//! Pixel to world-unit conversion.
//!
//! Three independent factors separate a drawing-surface pixel from a world
//! unit: the view zoom, the base image-to-container scale, and the map's
//! pixels-per-unit calibration.

use crate::config::MeasureConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Convert a pixel distance into world units.
///
/// Non-positive `base_scale` falls back to `1` and non-positive
/// `pixels_per_unit` falls back to `config.default_pixels_per_unit`.
/// `zoom` is used as given; clamp it with [`ScaleContext::new`] first.
pub fn world_distance(
    pixel_distance: f64,
    zoom: f64,
    base_scale: f64,
    pixels_per_unit: f64,
    config: &MeasureConfig,
) -> f64 {
    let base_scale = positive_or(base_scale, 1.0);
    let pixels_per_unit = positive_or(pixels_per_unit, config.default_pixels_per_unit);
    pixel_distance / (pixels_per_unit * base_scale * zoom)
}

fn positive_or(value: f64, fallback: f64) -> f64 {
    if value > 0.0 { value } else { fallback }
}

/// Resolved scale factors for one frame.
///
/// Built through [`ScaleContext::new`], which applies the fallbacks and
/// clamps the zoom so geometry never divides by zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleContext {
    /// View zoom (1.0 = image pixels at base scale).
    pub zoom: f64,
    /// Image-to-container scale.
    pub base_scale: f64,
    /// Image pixels per world unit.
    pub pixels_per_unit: f64,
}

impl ScaleContext {
    /// Resolve a scale context, applying fallbacks and the zoom floor.
    pub fn new(zoom: f64, base_scale: f64, pixels_per_unit: f64, config: &MeasureConfig) -> Self {
        // NaN fails the comparison and is clamped too.
        let zoom = if zoom >= config.min_zoom { zoom } else { config.min_zoom };
        Self {
            zoom,
            base_scale: positive_or(base_scale, 1.0),
            pixels_per_unit: positive_or(pixels_per_unit, config.default_pixels_per_unit),
        }
    }

    /// Scale context for map-local pixel space (zoom and base scale of 1).
    pub fn local(pixels_per_unit: f64, config: &MeasureConfig) -> Self {
        Self::new(1.0, 1.0, pixels_per_unit, config)
    }

    /// Surface pixels per map-local pixel.
    pub fn surface_scale(&self) -> f64 {
        self.zoom * self.base_scale
    }

    /// Surface pixels per world unit.
    pub fn unit_pixels(&self) -> f64 {
        self.pixels_per_unit * self.surface_scale()
    }

    /// Convert a surface pixel distance into world units.
    pub fn world_distance(&self, pixel_distance: f64) -> f64 {
        pixel_distance / self.unit_pixels()
    }

    /// Convert a world distance into surface pixels.
    pub fn pixel_distance(&self, world_distance: f64) -> f64 {
        world_distance * self.unit_pixels()
    }

    /// Convert a surface pixel distance into map-local pixels.
    pub fn local_pixels(&self, surface_distance: f64) -> f64 {
        surface_distance / self.surface_scale()
    }
}

/// Calibration errors.
#[derive(Debug, Error, PartialEq)]
pub enum CalibrationError {
    #[error("Calibration drag too short: {pixels:.1} px (minimum {minimum:.1} px)")]
    DragTooShort { pixels: f64, minimum: f64 },
    #[error("Calibration distance must be a positive number, got {0}")]
    InvalidDistance(f64),
}

/// Derive a new pixels-per-unit value from a calibration drag.
///
/// `local_pixel_distance` is the drag length in map-local pixels and
/// `real_distance` the length the user says it represents, in world units.
pub fn calibrate(
    local_pixel_distance: f64,
    real_distance: f64,
    config: &MeasureConfig,
) -> Result<f64, CalibrationError> {
    if !(real_distance.is_finite() && real_distance > 0.0) {
        return Err(CalibrationError::InvalidDistance(real_distance));
    }
    if !(local_pixel_distance >= config.calibration_min_drag_px) {
        return Err(CalibrationError::DragTooShort {
            pixels: local_pixel_distance,
            minimum: config.calibration_min_drag_px,
        });
    }
    let pixels_per_unit = local_pixel_distance / real_distance;
    log::info!("Calibrated map scale: {pixels_per_unit:.3} px per unit");
    Ok(pixels_per_unit)
}
