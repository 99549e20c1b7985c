//! Ruler template.

use super::{ShapeKind, TemplateTrait, point_to_segment_dist};
use kurbo::{BezPath, Point, Rect};

/// A straight ruler between two endpoints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineTemplate {
    pub start: Point,
    pub end: Point,
}

impl LineTemplate {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    /// Length in the template's coordinate space.
    pub fn length(&self) -> f64 {
        self.start.distance(self.end)
    }
}

impl TemplateTrait for LineTemplate {
    fn kind(&self) -> ShapeKind {
        ShapeKind::Line
    }

    fn bounds(&self) -> Rect {
        Rect::from_points(self.start, self.end)
    }

    fn outline(&self) -> BezPath {
        let mut path = BezPath::new();
        path.move_to(self.start);
        path.line_to(self.end);
        path
    }

    fn anchors(&self) -> Vec<Point> {
        vec![self.start, self.end]
    }

    fn contains(&self, point: Point, tolerance: f64) -> bool {
        point_to_segment_dist(point, self.start, self.end) <= tolerance
    }
}
