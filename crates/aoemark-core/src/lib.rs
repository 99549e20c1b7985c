//! aoemark core library
//!
//! Platform-agnostic geometry, measurement and sharing logic for area-of-effect
//! templates drawn over a tabletop map.

pub mod channel;
pub mod config;
pub mod geometry;
pub mod hit;
pub mod label;
pub mod lifecycle;
pub mod measurement;
pub mod metrics;
pub mod scale;
pub mod session;
pub mod shapes;
pub mod store;
pub mod sync;
pub mod view;

pub use channel::{BroadcastChannel, ChangeCallback, LocalBroadcast, RoomChange, Subscription};
pub use config::{ConfigError, MeasureConfig};
pub use geometry::ConeSpread;
pub use lifecycle::{AnnotationState, now_ms};
pub use measurement::{MeasurementId, PlacementError, SharedMeasurement};
pub use metrics::{ShapeMetrics, ShapeRequest, compute_shape};
pub use scale::{CalibrationError, ScaleContext, calibrate, world_distance};
pub use session::MeasurementSync;
pub use shapes::{ShapeKind, Template, TemplateTrait};
pub use store::{MeasurementStore, UpsertOutcome};
pub use sync::{ClientMessage, ConnectionState, ServerMessage, SyncError, SyncEvent, WsEvent};
#[cfg(not(target_arch = "wasm32"))]
pub use sync::NativeWebSocket;
pub use view::MapView;
