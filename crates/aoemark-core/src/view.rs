//! Pan/zoom view over a map image.
//!
//! Records live in map-local pixels. The view maps them to screen space via
//! `translate(offset) * scale(zoom * base_scale)`, where `base_scale` fits the
//! image to its container.

use crate::config::MeasureConfig;
use crate::scale::ScaleContext;
use kurbo::{Affine, Point, Size, Vec2};
use serde::{Deserialize, Serialize};

/// View transform of a map surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapView {
    /// Current translation offset (pan), in screen pixels.
    pub offset: Vec2,
    /// User zoom level.
    pub zoom: f64,
    /// Scale fitting the image into its container.
    pub base_scale: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for MapView {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            zoom: 1.0,
            base_scale: 1.0,
            min_zoom: 0.1,
            max_zoom: 10.0,
        }
    }
}

impl MapView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total surface scale.
    pub fn scale(&self) -> f64 {
        self.zoom * self.base_scale
    }

    /// Map-local to screen transform.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset) * Affine::scale(self.scale())
    }

    /// Screen to map-local transform.
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.scale()) * Affine::translate(-self.offset)
    }

    pub fn screen_to_local(&self, screen_point: Point) -> Point {
        self.inverse_transform() * screen_point
    }

    pub fn local_to_screen(&self, local_point: Point) -> Point {
        self.transform() * local_point
    }

    /// Pan by a delta in screen coordinates.
    pub fn pan(&mut self, delta: Vec2) {
        self.offset += delta;
    }

    /// Zoom keeping the given screen point fixed.
    pub fn zoom_at(&mut self, screen_point: Point, factor: f64) {
        let new_zoom = (self.zoom * factor).clamp(self.min_zoom, self.max_zoom);
        if !new_zoom.is_finite() || (new_zoom - self.zoom).abs() < f64::EPSILON {
            return;
        }

        let anchor = self.screen_to_local(screen_point);
        self.zoom = new_zoom;
        let moved = self.local_to_screen(anchor);
        self.offset += screen_point - moved;
    }

    /// Set the fit scale; non-positive or non-finite values fall back to 1.
    pub fn set_base_scale(&mut self, base_scale: f64) {
        self.base_scale = if base_scale.is_finite() && base_scale > 0.0 {
            base_scale
        } else {
            log::warn!("Ignoring invalid base scale {}, using 1.0", base_scale);
            1.0
        };
    }

    /// Fit an image inside its container, centred, and reset the user zoom.
    pub fn fit_image(&mut self, image: Size, container: Size) {
        if image.width <= 0.0 || image.height <= 0.0 {
            self.set_base_scale(1.0);
            self.offset = Vec2::ZERO;
            self.zoom = 1.0;
            return;
        }
        let fit = (container.width / image.width).min(container.height / image.height);
        self.set_base_scale(fit);
        self.zoom = 1.0;
        self.offset = Vec2::new(
            (container.width - image.width * self.base_scale) / 2.0,
            (container.height - image.height * self.base_scale) / 2.0,
        );
    }

    /// Scale for measuring in screen space.
    pub fn scale_context(&self, pixels_per_unit: f64, config: &MeasureConfig) -> ScaleContext {
        ScaleContext::new(self.zoom, self.base_scale, pixels_per_unit, config)
    }
}
