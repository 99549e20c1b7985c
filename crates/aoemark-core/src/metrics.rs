//! World-space quantities of a measurement.

use crate::config::MeasureConfig;
use crate::geometry::{self, ConeSpread};
use crate::label::{LabelContent, format_label};
use crate::scale::ScaleContext;
use crate::shapes::{ShapeKind, Template};
use kurbo::Point;

/// Everything needed to measure one shape.
#[derive(Debug, Clone, Copy)]
pub struct ShapeRequest<'a> {
    pub kind: ShapeKind,
    /// Generator start, in the space described by `scale`.
    pub start: Point,
    /// Generator end, in the space described by `scale`.
    pub end: Point,
    pub scale: ScaleContext,
    pub unit_name: &'a str,
    /// Whether the map scale is being calibrated.
    pub calibrating: bool,
    /// Requested cone width in world units; ignored unless positive.
    pub cone_width: Option<f64>,
}

impl<'a> ShapeRequest<'a> {
    pub fn new(kind: ShapeKind, start: Point, end: Point, scale: ScaleContext, unit_name: &'a str) -> Self {
        Self {
            kind,
            start,
            end,
            scale,
            unit_name,
            calibrating: false,
            cone_width: None,
        }
    }

    pub fn with_calibrating(mut self, calibrating: bool) -> Self {
        self.calibrating = calibrating;
        self
    }

    pub fn with_cone_width(mut self, cone_width: Option<f64>) -> Self {
        self.cone_width = cone_width;
        self
    }

    /// Template in the request's coordinate space, using the render-time cone default.
    pub fn template(&self, config: &MeasureConfig) -> Template {
        let half_angle = match self.kind {
            ShapeKind::Cone => self.cone_spread(config).half_angle,
            _ => config.cone_half_angle(),
        };
        Template::from_points(self.kind, self.start, self.end, half_angle)
    }

    fn cone_spread(&self, config: &MeasureConfig) -> ConeSpread {
        let length = self.scale.world_distance(geometry::distance(self.start, self.end));
        geometry::cone_spread(length, self.cone_width, config.cone_half_angle())
    }
}

/// Measured quantities of a shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeMetrics {
    pub kind: ShapeKind,
    /// Generator length in the request's pixel space.
    pub pixel_length: f64,
    /// Generator length in world units (radius, half-side or length).
    pub world_length: f64,
    /// Headline value of the label: side for cubes, `world_length` otherwise.
    pub value: f64,
    /// Covered area in square world units; `None` for lines.
    pub area: Option<f64>,
    /// Resolved opening for cones.
    pub cone: Option<ConeSpread>,
    /// Display text.
    pub label: String,
}

/// Measure a shape.
pub fn compute_shape(request: &ShapeRequest<'_>, config: &MeasureConfig) -> ShapeMetrics {
    let pixel_length = geometry::distance(request.start, request.end);
    let world_length = request.scale.world_distance(pixel_length);

    let (value, area, cone) = match request.kind {
        ShapeKind::Line => (world_length, None, None),
        ShapeKind::Circle => (world_length, Some(geometry::circle_area(world_length)), None),
        ShapeKind::Cube => (
            geometry::cube_side(world_length),
            Some(geometry::cube_area(world_length)),
            None,
        ),
        ShapeKind::Cone => {
            let spread = request.cone_spread(config);
            (
                world_length,
                Some(geometry::cone_area(world_length, spread.width)),
                Some(spread),
            )
        }
    };

    let content = if request.calibrating {
        LabelContent::Calibration {
            pixels: request.scale.local_pixels(pixel_length),
        }
    } else if let (Some(spread), Some(area)) = (cone, area) {
        LabelContent::Cone {
            length: world_length,
            width: spread.width,
            area,
        }
    } else {
        LabelContent::Distance { value, area }
    };

    ShapeMetrics {
        kind: request.kind,
        pixel_length,
        world_length,
        value,
        area,
        cone,
        label: format_label(&content, request.unit_name),
    }
}
