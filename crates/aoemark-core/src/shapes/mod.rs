//! Area-of-effect templates.
//!
//! A template is the resolved geometry of a measurement in one coordinate
//! space. Surface-space templates drive rendering, map-local templates drive
//! hit testing.

mod circle;
mod cone;
mod cube;
mod line;

pub use circle::CircleTemplate;
pub use cone::ConeTemplate;
pub use cube::CubeTemplate;
pub use line::LineTemplate;

use kurbo::{BezPath, Point, Rect};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of measurement shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    /// Ruler between two endpoints.
    #[default]
    Line,
    /// Cone from an apex towards a heading.
    Cone,
    /// Circle (sphere) around a center.
    Circle,
    /// Square centered on an anchor.
    Cube,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 4] = [
        ShapeKind::Line,
        ShapeKind::Cone,
        ShapeKind::Circle,
        ShapeKind::Cube,
    ];

    /// Lowercase name, as used on the wire.
    pub fn name(self) -> &'static str {
        match self {
            ShapeKind::Line => "line",
            ShapeKind::Cone => "cone",
            ShapeKind::Circle => "circle",
            ShapeKind::Cube => "cube",
        }
    }

    /// Whether this kind reports an area.
    pub fn has_area(self) -> bool {
        !matches!(self, ShapeKind::Line)
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Distance from a point to a line segment (a→b).
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = b - a;
    let pv = point - a;
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    point.distance(a + seg * t)
}

/// Common behaviour of all templates.
pub trait TemplateTrait {
    /// The shape kind.
    fn kind(&self) -> ShapeKind;

    /// Bounding box in the template's coordinate space.
    fn bounds(&self) -> Rect;

    /// Closed outline used for fills, strokes and clipping.
    fn outline(&self) -> BezPath;

    /// Points that receive a marker dot.
    fn anchors(&self) -> Vec<Point>;

    /// Whether `point` lies on or inside the template.
    ///
    /// `tolerance` widens thin shapes; area shapes test their exact boundary.
    fn contains(&self, point: Point, tolerance: f64) -> bool;
}

/// Enum wrapper over all templates.
#[derive(Debug, Clone, PartialEq)]
pub enum Template {
    Line(LineTemplate),
    Cone(ConeTemplate),
    Circle(CircleTemplate),
    Cube(CubeTemplate),
}

impl Template {
    /// Build a template from a generator segment.
    ///
    /// `cone_half_angle` is only read for cones.
    pub fn from_points(kind: ShapeKind, start: Point, end: Point, cone_half_angle: f64) -> Self {
        match kind {
            ShapeKind::Line => Template::Line(LineTemplate::new(start, end)),
            ShapeKind::Cone => Template::Cone(ConeTemplate::new(start, end, cone_half_angle)),
            ShapeKind::Circle => Template::Circle(CircleTemplate::from_drag(start, end)),
            ShapeKind::Cube => Template::Cube(CubeTemplate::from_drag(start, end)),
        }
    }

    fn inner(&self) -> &dyn TemplateTrait {
        match self {
            Template::Line(t) => t,
            Template::Cone(t) => t,
            Template::Circle(t) => t,
            Template::Cube(t) => t,
        }
    }

    pub fn kind(&self) -> ShapeKind {
        self.inner().kind()
    }

    pub fn bounds(&self) -> Rect {
        self.inner().bounds()
    }

    pub fn outline(&self) -> BezPath {
        self.inner().outline()
    }

    pub fn anchors(&self) -> Vec<Point> {
        self.inner().anchors()
    }

    pub fn contains(&self, point: Point, tolerance: f64) -> bool {
        self.inner().contains(point, tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serde_names() {
        for kind in ShapeKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.name()));
            let back: ShapeKind = serde_json::from_str(&json).unwrap();
            assert_eq!(back, kind);
        }
    }

    #[test]
    fn test_point_to_segment_dist() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(100.0, 0.0);
        assert!((point_to_segment_dist(Point::new(50.0, 10.0), a, b) - 10.0).abs() < 1e-12);
        // Beyond the end the distance is to the endpoint.
        assert!((point_to_segment_dist(Point::new(103.0, 4.0), a, b) - 5.0).abs() < 1e-12);
        // Degenerate segment.
        assert!((point_to_segment_dist(Point::new(3.0, 4.0), a, a) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_from_points_dispatch() {
        let start = Point::new(10.0, 10.0);
        let end = Point::new(20.0, 10.0);
        for kind in ShapeKind::ALL {
            let template = Template::from_points(kind, start, end, 0.25);
            assert_eq!(template.kind(), kind);
            assert!(template.contains(start, 0.0));
        }
    }

    #[test]
    fn test_only_line_lacks_area() {
        assert!(!ShapeKind::Line.has_area());
        assert!(ShapeKind::Cone.has_area());
        assert!(ShapeKind::Circle.has_area());
        assert!(ShapeKind::Cube.has_area());
    }
}
