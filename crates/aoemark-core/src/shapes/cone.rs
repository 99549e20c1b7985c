//! Cone template.

use super::{ShapeKind, TemplateTrait};
use crate::geometry::{angle, angle_delta};
use kurbo::{Arc, BezPath, Point, Rect, Vec2};

/// A circular sector from an apex towards a heading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConeTemplate {
    pub apex: Point,
    /// Drag end; defines heading and length.
    pub tip: Point,
    /// Half of the opening angle, in radians.
    pub half_angle: f64,
}

impl ConeTemplate {
    pub fn new(apex: Point, tip: Point, half_angle: f64) -> Self {
        Self {
            apex,
            tip,
            half_angle,
        }
    }

    /// Distance from the apex to the far arc.
    pub fn radius(&self) -> f64 {
        self.apex.distance(self.tip)
    }

    /// Heading from apex to tip, in radians.
    pub fn heading(&self) -> f64 {
        angle(self.apex, self.tip)
    }

    /// Endpoints of the two straight edges (left, right).
    pub fn edge_points(&self) -> (Point, Point) {
        let heading = self.heading();
        let radius = self.radius();
        (
            self.apex + Vec2::from_angle(heading - self.half_angle) * radius,
            self.apex + Vec2::from_angle(heading + self.half_angle) * radius,
        )
    }

    fn far_arc(&self) -> Arc {
        let radius = self.radius();
        Arc {
            center: self.apex,
            radii: Vec2::new(radius, radius),
            start_angle: self.heading() - self.half_angle,
            sweep_angle: 2.0 * self.half_angle,
            x_rotation: 0.0,
        }
    }
}

impl TemplateTrait for ConeTemplate {
    fn kind(&self) -> ShapeKind {
        ShapeKind::Cone
    }

    fn bounds(&self) -> Rect {
        let (left, right) = self.edge_points();
        let mut bounds = Rect::from_points(self.apex, left).union_pt(right).union_pt(self.tip);
        // Include the arc's extreme points that fall inside the sweep.
        let radius = self.radius();
        for axis in [0.0, 0.5, 1.0, 1.5] {
            let theta = axis * std::f64::consts::PI;
            if angle_delta(theta, self.heading()).abs() <= self.half_angle {
                bounds = bounds.union_pt(self.apex + Vec2::from_angle(theta) * radius);
            }
        }
        bounds
    }

    fn outline(&self) -> BezPath {
        let (left, _) = self.edge_points();
        let mut path = BezPath::new();
        path.move_to(self.apex);
        path.line_to(left);
        path.extend(self.far_arc().append_iter(0.1));
        path.close_path();
        path
    }

    fn anchors(&self) -> Vec<Point> {
        vec![self.apex]
    }

    fn contains(&self, point: Point, _tolerance: f64) -> bool {
        let dist = point.distance(self.apex);
        if dist > self.radius() {
            return false;
        }
        if dist < f64::EPSILON {
            return true;
        }
        angle_delta(angle(self.apex, point), self.heading()).abs() <= self.half_angle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cone() -> ConeTemplate {
        ConeTemplate::new(Point::new(0.0, 0.0), Point::new(100.0, 0.0), 26.5f64.to_radians())
    }

    #[test]
    fn test_heading_and_radius() {
        let cone = ConeTemplate::new(Point::new(0.0, 0.0), Point::new(0.0, 50.0), 0.2);
        assert!((cone.radius() - 50.0).abs() < 1e-12);
        assert!((cone.heading() - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_contains_inside_sector() {
        let cone = cone();
        assert!(cone.contains(Point::new(50.0, 0.0), 0.0));
        assert!(cone.contains(Point::new(80.0, 30.0), 0.0));
        assert!(cone.contains(Point::new(0.0, 0.0), 0.0));
    }

    #[test]
    fn test_rejects_outside_angle_or_range() {
        let cone = cone();
        // Bearing 45° is outside a 26.5° half-angle.
        assert!(!cone.contains(Point::new(30.0, 30.0), 0.0));
        // Behind the apex.
        assert!(!cone.contains(Point::new(-10.0, 0.0), 0.0));
        // Past the far arc.
        assert!(!cone.contains(Point::new(101.0, 0.0), 0.0));
    }

    #[test]
    fn test_heading_across_wraparound() {
        // Heading pointing left sits on the ±PI seam.
        let cone = ConeTemplate::new(Point::new(0.0, 0.0), Point::new(-100.0, 0.0), 0.3);
        assert!(cone.contains(Point::new(-50.0, 5.0), 0.0));
        assert!(cone.contains(Point::new(-50.0, -5.0), 0.0));
    }

    #[test]
    fn test_edge_points_symmetric() {
        let (left, right) = cone().edge_points();
        assert!((left.x - right.x).abs() < 1e-9);
        assert!((left.y + right.y).abs() < 1e-9);
        assert!(left.y < 0.0);
    }

    #[test]
    fn test_bounds_cover_tip() {
        let bounds = cone().bounds();
        assert!((bounds.x1 - 100.0).abs() < 1e-9);
        assert!(bounds.x0 <= 0.0);
    }
}
