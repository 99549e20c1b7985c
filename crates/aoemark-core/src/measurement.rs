//! Shared measurement records.

use crate::geometry::effective_cone_width;
use crate::lifecycle::now_ms;
use crate::shapes::ShapeKind;
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for shared measurements.
pub type MeasurementId = Uuid;

/// Default outline colour of new measurements.
pub const DEFAULT_COLOR: &str = "#FFD700";

/// Default world unit name.
pub const DEFAULT_UNIT: &str = "m";

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

fn default_unit() -> String {
    DEFAULT_UNIT.to_string()
}

/// Errors from programmatic placement.
#[derive(Debug, Error, PartialEq)]
pub enum PlacementError {
    #[error("Cone length must be a positive number, got {0}")]
    InvalidLength(f64),
    #[error("Cone width must be a positive number, got {0}")]
    InvalidWidth(f64),
}

/// A measurement shared with every client viewing the same map.
///
/// `start` and `end` are stored in map-local pixel space. A record is never
/// edited in place on the wire: changes are published as a new record with
/// the same id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedMeasurement {
    pub(crate) id: MeasurementId,
    #[serde(rename = "type")]
    pub(crate) kind: ShapeKind,
    pub start: Point,
    pub end: Point,
    /// Client that created the record.
    pub owner_id: String,
    /// Map or layer the record belongs to.
    #[serde(default)]
    pub city_id: Option<String>,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_unit")]
    pub unit_name: String,
    /// Requested cone width in world units.
    #[serde(default)]
    pub cone_width: Option<f64>,
    /// Name of a decorative skin.
    #[serde(default)]
    pub skin: Option<String>,
    /// Creation time in milliseconds since the Unix epoch.
    pub timestamp: u64,
    #[serde(default)]
    pub permanent: bool,
}

impl SharedMeasurement {
    /// Create a new record stamped with the current time.
    pub fn new(kind: ShapeKind, start: Point, end: Point, owner_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            start,
            end,
            owner_id: owner_id.into(),
            city_id: None,
            color: default_color(),
            unit_name: default_unit(),
            cone_width: None,
            skin: None,
            timestamp: now_ms(),
            permanent: false,
        }
    }

    /// Place a cone from typed dimensions instead of a drag.
    ///
    /// `heading` is in radians; `length` and `width` are in world units.
    pub fn cone_from_dimensions(
        apex: Point,
        heading: f64,
        length: f64,
        width: f64,
        pixels_per_unit: f64,
        owner_id: impl Into<String>,
    ) -> Result<Self, PlacementError> {
        if !(length.is_finite() && length > 0.0) {
            return Err(PlacementError::InvalidLength(length));
        }
        if !(width.is_finite() && width > 0.0) {
            return Err(PlacementError::InvalidWidth(width));
        }
        let end = apex + Vec2::from_angle(heading) * (length * pixels_per_unit);
        Ok(Self::new(ShapeKind::Cone, apex, end, owner_id).with_cone_width(Some(width)))
    }

    pub fn id(&self) -> MeasurementId {
        self.id
    }

    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    pub fn with_city(mut self, city_id: Option<String>) -> Self {
        self.city_id = city_id;
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn with_unit(mut self, unit_name: impl Into<String>) -> Self {
        self.unit_name = unit_name.into();
        self
    }

    pub fn with_cone_width(mut self, cone_width: Option<f64>) -> Self {
        self.cone_width = cone_width;
        self
    }

    pub fn with_skin(mut self, skin: Option<String>) -> Self {
        self.skin = skin;
        self
    }

    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_permanent(mut self, permanent: bool) -> Self {
        self.permanent = permanent;
        self
    }

    /// Cone width that should drive geometry: only for cones, only when positive.
    pub fn effective_cone_width(&self) -> Option<f64> {
        match self.kind {
            ShapeKind::Cone => effective_cone_width(self.cone_width),
            _ => None,
        }
    }

    /// Zero-length generator; callers should not publish these.
    pub fn is_degenerate(&self) -> bool {
        self.start.distance(self.end) < f64::EPSILON
    }

    /// Replacement record with `permanent` flipped and a fresh timestamp.
    pub fn toggled_permanent(&self, now: u64) -> Self {
        let mut next = self.clone();
        next.permanent = !self.permanent;
        next.timestamp = now;
        next
    }

    /// Whether the record belongs to the given map scope.
    pub fn in_scope(&self, city_id: Option<&str>) -> bool {
        self.city_id.as_deref() == city_id
    }
}
