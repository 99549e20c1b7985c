//! Distance, angle, cone spread and area primitives.

use kurbo::Point;
use std::f64::consts::PI;

/// Euclidean distance between two points.
pub fn distance(a: Point, b: Point) -> f64 {
    a.distance(b)
}

/// Bearing from `from` to `to` in radians (screen orientation, y down).
pub fn angle(from: Point, to: Point) -> f64 {
    (to - from).atan2()
}

/// Signed difference `a - b` wrapped into `[-PI, PI]`.
pub fn angle_delta(a: f64, b: f64) -> f64 {
    let mut delta = (a - b) % (2.0 * PI);
    if delta > PI {
        delta -= 2.0 * PI;
    } else if delta < -PI {
        delta += 2.0 * PI;
    }
    delta
}

/// A cone width is only meaningful when strictly positive.
pub fn effective_cone_width(width: Option<f64>) -> Option<f64> {
    width.filter(|w| *w > 0.0)
}

/// Half-angle of a cone whose far edge spans `width` at distance `length`.
pub fn half_angle_from_width(width: f64, length: f64) -> f64 {
    (width / (2.0 * length)).atan()
}

/// Width of a cone's far edge at distance `length`.
pub fn width_from_half_angle(length: f64, half_angle: f64) -> f64 {
    2.0 * length * half_angle.tan()
}

/// Opening of a cone, in world units and radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConeSpread {
    /// Half of the opening angle, in radians.
    pub half_angle: f64,
    /// Width of the far edge, in world units.
    pub width: f64,
}

/// Resolve a cone's spread from its world length and an optional width.
///
/// An explicit positive width drives the angle. Otherwise the default
/// half-angle is used and the width is back-computed from it.
pub fn cone_spread(length: f64, width: Option<f64>, default_half_angle: f64) -> ConeSpread {
    match effective_cone_width(width) {
        Some(width) => ConeSpread {
            half_angle: half_angle_from_width(width, length),
            width,
        },
        None => ConeSpread {
            half_angle: default_half_angle,
            width: width_from_half_angle(length, default_half_angle),
        },
    }
}

pub fn circle_area(radius: f64) -> f64 {
    PI * radius * radius
}

/// Full side of a cube whose drag distance is its half-side.
pub fn cube_side(half_side: f64) -> f64 {
    2.0 * half_side
}

pub fn cube_area(half_side: f64) -> f64 {
    let side = cube_side(half_side);
    side * side
}

/// Triangular approximation of a cone's footprint.
pub fn cone_area(length: f64, width: f64) -> f64 {
    length * width / 2.0
}
