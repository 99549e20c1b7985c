//! Cube (square) template.

use super::{ShapeKind, TemplateTrait};
use kurbo::{BezPath, Point, Rect, Shape as KurboShape};

/// A square centered on its anchor.
///
/// The drag distance is the half-side, not a corner-to-corner extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubeTemplate {
    pub center: Point,
    /// Where the drag ended.
    pub handle: Point,
    pub half_side: f64,
}

impl CubeTemplate {
    pub fn from_drag(center: Point, handle: Point) -> Self {
        Self {
            center,
            handle,
            half_side: center.distance(handle),
        }
    }

    pub fn side(&self) -> f64 {
        2.0 * self.half_side
    }

    pub fn square(&self) -> Rect {
        Rect::new(
            self.center.x - self.half_side,
            self.center.y - self.half_side,
            self.center.x + self.half_side,
            self.center.y + self.half_side,
        )
    }
}

impl TemplateTrait for CubeTemplate {
    fn kind(&self) -> ShapeKind {
        ShapeKind::Cube
    }

    fn bounds(&self) -> Rect {
        self.square()
    }

    fn outline(&self) -> BezPath {
        self.square().to_path(0.1)
    }

    fn anchors(&self) -> Vec<Point> {
        vec![self.center, self.handle]
    }

    fn contains(&self, point: Point, _tolerance: f64) -> bool {
        (point.x - self.center.x).abs() <= self.half_side
            && (point.y - self.center.y).abs() <= self.half_side
    }
}
