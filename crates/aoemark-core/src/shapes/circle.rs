//! Circle (sphere) template.

use super::{ShapeKind, TemplateTrait};
use kurbo::{BezPath, Circle, Point, Rect, Shape as KurboShape};

/// A circle around a center; the drag distance is its radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleTemplate {
    pub center: Point,
    /// Where the drag ended, on the rim.
    pub rim: Point,
    pub radius: f64,
}

impl CircleTemplate {
    pub fn from_drag(center: Point, rim: Point) -> Self {
        Self {
            center,
            rim,
            radius: center.distance(rim),
        }
    }

    pub fn as_kurbo(&self) -> Circle {
        Circle::new(self.center, self.radius)
    }
}

impl TemplateTrait for CircleTemplate {
    fn kind(&self) -> ShapeKind {
        ShapeKind::Circle
    }

    fn bounds(&self) -> Rect {
        self.as_kurbo().bounding_box()
    }

    fn outline(&self) -> BezPath {
        self.as_kurbo().to_path(0.1)
    }

    fn anchors(&self) -> Vec<Point> {
        vec![self.center, self.rim]
    }

    fn contains(&self, point: Point, _tolerance: f64) -> bool {
        point.distance(self.center) <= self.radius
    }
}
