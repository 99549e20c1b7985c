//! Point-in-measurement queries for click and hover interaction.

use crate::config::MeasureConfig;
use crate::geometry;
use crate::measurement::SharedMeasurement;
use crate::scale::ScaleContext;
use crate::shapes::{ShapeKind, Template};
use kurbo::Point;

/// Interaction buffer in map-local pixels.
///
/// A fixed screen-pixel buffer divided by the current surface scale.
pub fn hit_tolerance(scale: &ScaleContext, config: &MeasureConfig) -> f64 {
    config.hit_tolerance_px / scale.surface_scale()
}

/// Map-local template of a record, as used for hit testing.
///
/// Cones use the record's width when present and the hit-test default
/// half-angle otherwise.
pub fn hit_template(measurement: &SharedMeasurement, scale: &ScaleContext, config: &MeasureConfig) -> Template {
    let kind = measurement.kind();
    let half_angle = match (kind, measurement.effective_cone_width()) {
        (ShapeKind::Cone, Some(width)) => {
            let length = geometry::distance(measurement.start, measurement.end) / scale.pixels_per_unit;
            geometry::half_angle_from_width(width, length)
        }
        _ => config.hit_cone_half_angle(),
    };
    Template::from_points(kind, measurement.start, measurement.end, half_angle)
}

/// Whether `point` (map-local pixels) hits `measurement`.
pub fn contains(point: Point, measurement: &SharedMeasurement, scale: &ScaleContext, config: &MeasureConfig) -> bool {
    hit_template(measurement, scale, config).contains(point, hit_tolerance(scale, config))
}
