//! aoemark render library
//!
//! Drawing-surface abstraction, skins and the measurement renderer.
//! Backends implement [`DrawSurface`]; [`RecordingSurface`] records commands.

mod renderer;
pub mod skin;
pub mod surface;

pub use renderer::{
    CIRCLE_FILL, CONE_FILL, CUBE_FILL, GOLD, LABEL_BACKGROUND, LABEL_SECONDARY, RenderRequest, RenderResult,
    RendererError, draw_label, parse_color, render_live, render_measurement, render_start_point, render_stored,
};
pub use skin::{FrameSequence, FrameSource, Skin, SkinError, SkinImage, SkinLibrary};
pub use surface::{DrawCommand, DrawSurface, Font, RecordingSurface, Shadow, TextAlign, TextBaseline};
