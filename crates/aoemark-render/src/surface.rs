//! Abstract 2D drawing surface.

use crate::skin::SkinImage;
use kurbo::{Affine, BezPath, Point, Rect, Stroke, Vec2};
use peniko::Color;

/// Horizontal text anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

/// Vertical text anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextBaseline {
    Top,
    #[default]
    Middle,
    Alphabetic,
    Bottom,
}

/// Font used for labels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Font {
    pub size: f64,
    pub bold: bool,
}

impl Font {
    pub fn bold(size: f64) -> Self {
        Self { size, bold: true }
    }
}

/// Drop shadow applied to subsequent fills.
#[derive(Debug, Clone, Copy)]
pub struct Shadow {
    pub color: Color,
    pub blur: f64,
    pub offset: Vec2,
}

/// Drawing operations the measurement renderer needs.
///
/// Implementations wrap a concrete backend (canvas, scene graph, raster).
/// State changes (transform, clip, shadow) are scoped by `save`/`restore`.
pub trait DrawSurface {
    fn save(&mut self);

    fn restore(&mut self);

    /// Post-multiply the current transform.
    fn transform(&mut self, affine: Affine);

    /// Intersect the clip region with `path`.
    fn clip(&mut self, path: &BezPath);

    fn fill(&mut self, path: &BezPath, color: Color);

    fn stroke(&mut self, path: &BezPath, style: &Stroke, color: Color);

    /// Blit an image scaled into `dest`.
    fn draw_image(&mut self, image: &SkinImage, dest: Rect);

    /// Advance width of `text`.
    fn measure_text(&self, text: &str, font: &Font) -> f64;

    fn fill_text(
        &mut self,
        text: &str,
        at: Point,
        font: &Font,
        align: TextAlign,
        baseline: TextBaseline,
        color: Color,
    );

    fn set_shadow(&mut self, shadow: Option<Shadow>);
}

/// A recorded drawing operation.
#[derive(Debug, Clone)]
pub enum DrawCommand {
    Save,
    Restore,
    Transform(Affine),
    Clip(BezPath),
    Fill {
        path: BezPath,
        color: Color,
    },
    Stroke {
        path: BezPath,
        width: f64,
        dashes: Vec<f64>,
        color: Color,
    },
    Image {
        width: u32,
        height: u32,
        dest: Rect,
    },
    Text {
        text: String,
        at: Point,
        font: Font,
        align: TextAlign,
        baseline: TextBaseline,
        color: Color,
    },
    Shadow(Option<Shadow>),
}

/// Surface that records commands instead of drawing.
///
/// Used for tests and for replaying onto a backend later.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    commands: Vec<DrawCommand>,
    depth: usize,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Current `save` nesting depth.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Recorded text, in draw order.
    pub fn texts(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|cmd| match cmd {
                DrawCommand::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl DrawSurface for RecordingSurface {
    fn save(&mut self) {
        self.depth += 1;
        self.commands.push(DrawCommand::Save);
    }

    fn restore(&mut self) {
        if self.depth == 0 {
            log::warn!("restore() without matching save()");
            return;
        }
        self.depth -= 1;
        self.commands.push(DrawCommand::Restore);
    }

    fn transform(&mut self, affine: Affine) {
        self.commands.push(DrawCommand::Transform(affine));
    }

    fn clip(&mut self, path: &BezPath) {
        self.commands.push(DrawCommand::Clip(path.clone()));
    }

    fn fill(&mut self, path: &BezPath, color: Color) {
        self.commands.push(DrawCommand::Fill {
            path: path.clone(),
            color,
        });
    }

    fn stroke(&mut self, path: &BezPath, style: &Stroke, color: Color) {
        self.commands.push(DrawCommand::Stroke {
            path: path.clone(),
            width: style.width,
            dashes: style.dash_pattern.iter().copied().collect(),
            color,
        });
    }

    fn draw_image(&mut self, image: &SkinImage, dest: Rect) {
        self.commands.push(DrawCommand::Image {
            width: image.width(),
            height: image.height(),
            dest,
        });
    }

    fn measure_text(&self, text: &str, font: &Font) -> f64 {
        // Approximate average glyph advance.
        0.6 * font.size * text.chars().count() as f64
    }

    fn fill_text(
        &mut self,
        text: &str,
        at: Point,
        font: &Font,
        align: TextAlign,
        baseline: TextBaseline,
        color: Color,
    ) {
        self.commands.push(DrawCommand::Text {
            text: text.to_string(),
            at,
            font: *font,
            align,
            baseline,
            color,
        });
    }

    fn set_shadow(&mut self, shadow: Option<Shadow>) {
        self.commands.push(DrawCommand::Shadow(shadow));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_tracks_depth() {
        let mut surface = RecordingSurface::new();
        surface.save();
        surface.save();
        assert_eq!(surface.depth(), 2);
        surface.restore();
        surface.restore();
        surface.restore();
        assert_eq!(surface.depth(), 0);
        assert_eq!(surface.commands().len(), 4);
    }

    #[test]
    fn test_stroke_records_dashes() {
        let mut surface = RecordingSurface::new();
        let mut path = BezPath::new();
        path.move_to((0.0, 0.0));
        path.line_to((10.0, 0.0));
        let style = Stroke::new(3.0).with_dashes(0.0, [15.0, 10.0]);
        surface.stroke(&path, &style, Color::WHITE);
        match &surface.commands()[0] {
            DrawCommand::Stroke { width, dashes, .. } => {
                assert!((width - 3.0).abs() < f64::EPSILON);
                assert_eq!(dashes, &vec![15.0, 10.0]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_measure_text_scales_with_font() {
        let surface = RecordingSurface::new();
        let small = surface.measure_text("abcd", &Font::bold(10.0));
        let large = surface.measure_text("abcd", &Font::bold(20.0));
        assert!((large - 2.0 * small).abs() < 1e-12);
    }
}
