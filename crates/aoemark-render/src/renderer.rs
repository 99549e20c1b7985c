//! Measurement renderer.

use crate::skin::{Skin, SkinImage, SkinLibrary};
use crate::surface::{DrawSurface, Font, Shadow, TextAlign, TextBaseline};
use aoemark_core::shapes::{ShapeKind, Template};
use aoemark_core::{
    MapView, MeasureConfig, MeasurementStore, SharedMeasurement, ShapeMetrics, ShapeRequest, compute_shape,
};
use kurbo::{Affine, BezPath, Circle, Point, Rect, RoundedRect, Shape as _, Size, Stroke, Vec2};
use peniko::Color;
use std::f64::consts::FRAC_PI_2;
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Invalid colour: {0}")]
    InvalidColor(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Outline, markers and label text.
pub const GOLD: Color = Color::from_rgba8(255, 215, 0, 255);
pub const CONE_FILL: Color = Color::from_rgba8(255, 140, 0, 64);
pub const CIRCLE_FILL: Color = Color::from_rgba8(0, 140, 255, 51);
pub const CUBE_FILL: Color = Color::from_rgba8(255, 0, 0, 51);
pub const LABEL_BACKGROUND: Color = Color::from_rgba8(0, 0, 0, 204);
/// Continuation lines of a label.
pub const LABEL_SECONDARY: Color = Color::from_rgba8(255, 215, 0, 191);
const SHADOW_COLOR: Color = Color::from_rgba8(0, 0, 0, 128);

const OUTLINE_WIDTH: f64 = 2.0;
const RULER_WIDTH: f64 = 3.0;
const RULER_DASH: [f64; 2] = [15.0, 10.0];
const GUIDE_DASH: [f64; 2] = [10.0, 5.0];
const LABEL_PADDING: f64 = 6.0;
const LABEL_RAISE: f64 = 15.0;
const LABEL_CORNER: f64 = 4.0;
const LINE_HEIGHT: f64 = 1.2;
const START_DOT_RADIUS: f64 = 7.0;
const HINT_FONT_SIZE: f64 = 12.0;
const TOLERANCE: f64 = 0.1;

/// Parse a CSS colour string such as `#FFD700`.
pub fn parse_color(value: &str) -> RenderResult<Color> {
    peniko::color::parse_color(value)
        .map(|color| color.to_alpha_color::<peniko::color::Srgb>())
        .map_err(|_| RendererError::InvalidColor(value.to_string()))
}

/// One shape to draw.
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    /// Geometry, in surface space.
    pub shape: ShapeRequest<'a>,
    pub skin: Option<&'a Skin>,
    /// Outline, marker and guide colour.
    pub outline: Color,
    /// Clock for animated skins.
    pub now_ms: u64,
}

impl<'a> RenderRequest<'a> {
    pub fn new(shape: ShapeRequest<'a>) -> Self {
        Self {
            shape,
            skin: None,
            outline: GOLD,
            now_ms: 0,
        }
    }

    pub fn with_skin(mut self, skin: Option<&'a Skin>, now_ms: u64) -> Self {
        self.skin = skin;
        self.now_ms = now_ms;
        self
    }

    pub fn with_outline(mut self, outline: Color) -> Self {
        self.outline = outline;
        self
    }

    /// Skin frame to draw, when the skin is ready.
    fn skin_frame(&self) -> Option<&'a SkinImage> {
        self.skin.filter(|skin| skin.is_ready())?.frame(self.now_ms)
    }
}

fn area_fill(kind: ShapeKind) -> Option<Color> {
    match kind {
        ShapeKind::Line => None,
        ShapeKind::Cone => Some(CONE_FILL),
        ShapeKind::Circle => Some(CIRCLE_FILL),
        ShapeKind::Cube => Some(CUBE_FILL),
    }
}

fn segment(start: Point, end: Point) -> BezPath {
    let mut path = BezPath::new();
    path.move_to(start);
    path.line_to(end);
    path
}

/// Draw one measurement and return what was measured.
pub fn render_measurement(
    surface: &mut impl DrawSurface,
    request: &RenderRequest<'_>,
    config: &MeasureConfig,
) -> ShapeMetrics {
    let shape = &request.shape;
    let metrics = compute_shape(shape, config);
    let template = shape.template(config);
    let zoom = shape.scale.zoom;

    match area_fill(shape.kind) {
        None => {
            let ruler = Stroke::new(RULER_WIDTH * zoom).with_dashes(0.0, RULER_DASH);
            surface.stroke(&segment(shape.start, shape.end), &ruler, request.outline);
        }
        Some(fill) => {
            let outline = template.outline();
            match request.skin_frame() {
                Some(image) => draw_skin(surface, &template, &outline, image, config),
                None => surface.fill(&outline, fill),
            }
            surface.stroke(&outline, &Stroke::new(OUTLINE_WIDTH * zoom), request.outline);
            let guide = Stroke::new(OUTLINE_WIDTH * zoom).with_dashes(0.0, GUIDE_DASH);
            surface.stroke(&segment(shape.start, shape.end), &guide, request.outline);
        }
    }

    let marker_radius = config.marker_radius * zoom;
    for anchor in template.anchors() {
        surface.fill(&Circle::new(anchor, marker_radius).to_path(TOLERANCE), request.outline);
    }

    draw_label(surface, &metrics.label, shape.end, zoom, config);
    metrics
}

/// Blit a skin clipped to the shape outline.
fn draw_skin(
    surface: &mut impl DrawSurface,
    template: &Template,
    outline: &BezPath,
    image: &SkinImage,
    config: &MeasureConfig,
) {
    surface.save();
    surface.clip(outline);
    match template {
        Template::Cone(cone) => {
            let radius = cone.radius();
            let half_extent = radius * cone.half_angle.min(FRAC_PI_2).sin();
            surface.transform(Affine::translate(cone.apex.to_vec2()) * Affine::rotate(cone.heading()));
            surface.draw_image(image, Rect::new(0.0, -half_extent, radius, half_extent));
        }
        Template::Circle(circle) => {
            let side = 2.0 * circle.radius * config.circle_skin_scale;
            surface.draw_image(image, Rect::from_center_size(circle.center, Size::new(side, side)));
        }
        Template::Cube(cube) => surface.draw_image(image, cube.square()),
        Template::Line(_) => {}
    }
    surface.restore();
}

/// Draw a multi-line label centred above `anchor`.
pub fn draw_label(
    surface: &mut impl DrawSurface,
    text: &str,
    anchor: Point,
    zoom: f64,
    config: &MeasureConfig,
) {
    let lines: Vec<&str> = text.split('\n').collect();
    let font = Font::bold(config.label_font_size * zoom);
    let max_width = lines
        .iter()
        .map(|line| surface.measure_text(line, &font))
        .fold(0.0, f64::max);
    let line_height = font.size * LINE_HEIGHT;
    let total_height = line_height * lines.len() as f64;
    let padding = LABEL_PADDING * zoom;
    let center = Point::new(anchor.x, anchor.y - LABEL_RAISE * zoom);

    let background = RoundedRect::new(
        center.x - max_width / 2.0 - padding,
        center.y - total_height / 2.0 - padding,
        center.x + max_width / 2.0 + padding,
        center.y + total_height / 2.0 + padding,
        LABEL_CORNER * zoom,
    );

    surface.save();
    surface.set_shadow(Some(Shadow {
        color: SHADOW_COLOR,
        blur: 4.0 * zoom,
        offset: Vec2::new(0.0, 2.0 * zoom),
    }));
    surface.fill(&background.to_path(TOLERANCE), LABEL_BACKGROUND);
    surface.set_shadow(None);

    let middle = (lines.len() as f64 - 1.0) / 2.0;
    for (index, line) in lines.iter().enumerate() {
        let y = center.y + (index as f64 - middle) * line_height;
        let color = if index == 0 { GOLD } else { LABEL_SECONDARY };
        surface.fill_text(line, Point::new(center.x, y), &font, TextAlign::Center, TextBaseline::Middle, color);
    }
    surface.restore();
}

/// Draw the pending start point before the end point is placed.
pub fn render_start_point(surface: &mut impl DrawSurface, start: Point, zoom: f64, kind: ShapeKind) {
    surface.fill(&Circle::new(start, START_DOT_RADIUS * zoom).to_path(TOLERANCE), GOLD);

    let text = format!("Click to set {kind} endpoint");
    let font = Font::bold(HINT_FONT_SIZE * zoom);
    let width = surface.measure_text(&text, &font);
    let padding = LABEL_PADDING * zoom;
    let background = Rect::new(
        start.x - width / 2.0 - padding,
        start.y - 35.0 * zoom,
        start.x + width / 2.0 + padding,
        start.y - 10.0 * zoom,
    );
    surface.fill(&background.to_path(TOLERANCE), LABEL_BACKGROUND);
    surface.fill_text(
        &text,
        Point::new(start.x, start.y - 22.0 * zoom),
        &font,
        TextAlign::Center,
        TextBaseline::Middle,
        GOLD,
    );
}

/// Draw a stored record through the current view.
///
/// Returns `None` when the record has expired.
pub fn render_stored(
    surface: &mut impl DrawSurface,
    measurement: &SharedMeasurement,
    view: &MapView,
    pixels_per_unit: f64,
    skins: &SkinLibrary,
    now_ms: u64,
    config: &MeasureConfig,
) -> Option<ShapeMetrics> {
    if measurement.is_expired(now_ms, config.ttl_ms) {
        return None;
    }
    let scale = view.scale_context(pixels_per_unit, config);
    let shape = ShapeRequest::new(
        measurement.kind(),
        view.local_to_screen(measurement.start),
        view.local_to_screen(measurement.end),
        scale,
        &measurement.unit_name,
    )
    .with_cone_width(measurement.cone_width);

    let outline = parse_color(&measurement.color).unwrap_or_else(|e| {
        log::warn!("{}; drawing {} in gold", e, measurement.id());
        GOLD
    });
    let request = RenderRequest::new(shape)
        .with_outline(outline)
        .with_skin(skins.resolve(measurement), now_ms);
    Some(render_measurement(surface, &request, config))
}

/// Draw every live record of a map scope in store order. Returns the count drawn.
#[allow(clippy::too_many_arguments)]
pub fn render_live(
    surface: &mut impl DrawSurface,
    store: &MeasurementStore,
    view: &MapView,
    pixels_per_unit: f64,
    skins: &SkinLibrary,
    now_ms: u64,
    city_id: Option<&str>,
    config: &MeasureConfig,
) -> usize {
    store
        .live(now_ms, city_id, config)
        .filter_map(|m| render_stored(surface, m, view, pixels_per_unit, skins, now_ms, config))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skin::FrameSequence;
    use crate::surface::{DrawCommand, RecordingSurface};
    use aoemark_core::ScaleContext;

    fn scale() -> ScaleContext {
        ScaleContext::new(1.0, 1.0, 50.0, &MeasureConfig::default())
    }

    fn request(kind: ShapeKind, end: Point) -> RenderRequest<'static> {
        RenderRequest::new(ShapeRequest::new(kind, Point::ZERO, end, scale(), "m"))
    }

    fn fills(surface: &RecordingSurface) -> Vec<Color> {
        surface
            .commands()
            .iter()
            .filter_map(|cmd| match cmd {
                DrawCommand::Fill { color, .. } => Some(*color),
                _ => None,
            })
            .collect()
    }

    fn same(a: Color, b: Color) -> bool {
        a.to_rgba8() == b.to_rgba8()
    }

    #[test]
    fn test_cone_draw_order() {
        let config = MeasureConfig::default();
        let mut surface = RecordingSurface::new();
        let metrics = render_measurement(&mut surface, &request(ShapeKind::Cone, Point::new(100.0, 0.0)), &config);
        assert!((metrics.world_length - 2.0).abs() < 1e-12);

        let cmds = surface.commands();
        assert!(matches!(&cmds[0], DrawCommand::Fill { color, .. } if same(*color, CONE_FILL)));
        match &cmds[1] {
            DrawCommand::Stroke { width, dashes, color, .. } => {
                assert!((width - 2.0).abs() < f64::EPSILON);
                assert!(dashes.is_empty());
                assert!(same(*color, GOLD));
            }
            other => panic!("expected outline, got {other:?}"),
        }
        assert!(matches!(&cmds[2], DrawCommand::Stroke { dashes, .. } if dashes == &vec![10.0, 5.0]));
        // One marker at the apex.
        assert!(matches!(&cmds[3], DrawCommand::Fill { color, .. } if same(*color, GOLD)));
        assert_eq!(surface.texts(), vec!["L: 2.0 W: 1.1 m", "Aire: 1.1 m²"]);
        assert_eq!(surface.depth(), 0);
    }

    #[test]
    fn test_line_is_dashed_ruler() {
        let config = MeasureConfig::default();
        let mut surface = RecordingSurface::new();
        render_measurement(&mut surface, &request(ShapeKind::Line, Point::new(100.0, 0.0)), &config);
        match &surface.commands()[0] {
            DrawCommand::Stroke { width, dashes, .. } => {
                assert!((width - 3.0).abs() < f64::EPSILON);
                assert_eq!(dashes, &vec![15.0, 10.0]);
            }
            other => panic!("expected ruler stroke, got {other:?}"),
        }
        // Two markers then the label background; no tinted fill.
        let fills = fills(&surface);
        assert_eq!(fills.len(), 3);
        assert!(same(fills[0], GOLD) && same(fills[1], GOLD));
        assert_eq!(surface.texts(), vec!["2.0 m"]);
        // Label sits over the end point.
        let at = surface
            .commands()
            .iter()
            .find_map(|cmd| match cmd {
                DrawCommand::Text { at, .. } => Some(*at),
                _ => None,
            })
            .unwrap();
        assert!((at.x - 100.0).abs() < 1e-9);
        assert!((at.y + 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_ready_skin_replaces_fill() {
        let config = MeasureConfig::default();
        let skin = Skin::Still(SkinImage::new(2, 2, vec![255; 16]).unwrap());
        let mut surface = RecordingSurface::new();
        let req = request(ShapeKind::Circle, Point::new(40.0, 0.0)).with_skin(Some(&skin), 0);
        render_measurement(&mut surface, &req, &config);

        assert!(!fills(&surface).iter().any(|c| same(*c, CIRCLE_FILL)));
        let cmds = surface.commands();
        assert!(matches!(cmds[0], DrawCommand::Save));
        assert!(matches!(cmds[1], DrawCommand::Clip(_)));
        match &cmds[2] {
            DrawCommand::Image { dest, .. } => {
                assert!((dest.width() - 108.0).abs() < 1e-9);
                assert!((dest.center().x).abs() < 1e-9);
            }
            other => panic!("expected image, got {other:?}"),
        }
        assert!(matches!(cmds[3], DrawCommand::Restore));
    }

    #[test]
    fn test_cone_skin_rotated_to_heading() {
        let config = MeasureConfig::default();
        let skin = Skin::Still(SkinImage::new(1, 1, vec![0; 4]).unwrap());
        let mut surface = RecordingSurface::new();
        let req = request(ShapeKind::Cone, Point::new(0.0, 100.0)).with_skin(Some(&skin), 0);
        render_measurement(&mut surface, &req, &config);
        let transform = surface
            .commands()
            .iter()
            .find_map(|cmd| match cmd {
                DrawCommand::Transform(affine) => Some(*affine),
                _ => None,
            })
            .unwrap();
        let tip = transform * Point::new(100.0, 0.0);
        assert!(tip.x.abs() < 1e-9);
        assert!((tip.y - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_unready_skin_falls_back_to_fill() {
        let config = MeasureConfig::default();
        let skin = Skin::Animated(Box::new(FrameSequence::new()));
        let mut surface = RecordingSurface::new();
        let req = request(ShapeKind::Cube, Point::new(25.0, 0.0)).with_skin(Some(&skin), 0);
        render_measurement(&mut surface, &req, &config);
        assert!(matches!(&surface.commands()[0], DrawCommand::Fill { color, .. } if same(*color, CUBE_FILL)));
        assert_eq!(surface.texts(), vec!["1.0 m", "Aire: 1.0 m²"]);
    }

    #[test]
    fn test_label_first_line_brighter() {
        let config = MeasureConfig::default();
        let mut surface = RecordingSurface::new();
        draw_label(&mut surface, "a\nb", Point::new(10.0, 100.0), 2.0, &config);
        let texts: Vec<(Point, Color)> = surface
            .commands()
            .iter()
            .filter_map(|cmd| match cmd {
                DrawCommand::Text { at, color, .. } => Some((*at, *color)),
                _ => None,
            })
            .collect();
        assert!(same(texts[0].1, GOLD));
        assert!(same(texts[1].1, LABEL_SECONDARY));
        // 28 px font, 1.2 line height, centred 30 px above the anchor.
        assert!((texts[0].0.y - (70.0 - 16.8)).abs() < 1e-9);
        assert!((texts[1].0.y - (70.0 + 16.8)).abs() < 1e-9);
        assert!(surface.commands().iter().any(|cmd| matches!(cmd, DrawCommand::Shadow(Some(_)))));
    }

    #[test]
    fn test_start_point_hint() {
        let mut surface = RecordingSurface::new();
        render_start_point(&mut surface, Point::new(50.0, 50.0), 1.0, ShapeKind::Cone);
        assert_eq!(surface.texts(), vec!["Click to set cone endpoint"]);
        assert_eq!(fills(&surface).len(), 2);
    }

    #[test]
    fn test_render_stored_through_view() {
        let config = MeasureConfig::default();
        let mut view = MapView::new();
        view.zoom = 2.0;
        let skins = SkinLibrary::new();
        let m = SharedMeasurement::new(ShapeKind::Line, Point::ZERO, Point::new(100.0, 0.0), "p")
            .with_color("not-a-colour")
            .with_timestamp(1_000);

        let mut surface = RecordingSurface::new();
        let metrics = render_stored(&mut surface, &m, &view, 50.0, &skins, 2_000, &config).unwrap();
        // World length is independent of the view.
        assert!((metrics.world_length - 2.0).abs() < 1e-12);
        assert!(render_stored(&mut surface, &m, &view, 50.0, &skins, 60_000, &config).is_none());
    }

    #[test]
    fn test_render_live_counts() {
        let config = MeasureConfig::default();
        let mut store = MeasurementStore::new();
        store.upsert(SharedMeasurement::new(ShapeKind::Circle, Point::ZERO, Point::new(5.0, 0.0), "p").with_timestamp(0));
        store.upsert(
            SharedMeasurement::new(ShapeKind::Cube, Point::ZERO, Point::new(5.0, 0.0), "p")
                .with_timestamp(0)
                .with_permanent(true),
        );
        let mut surface = RecordingSurface::new();
        let drawn = render_live(&mut surface, &store, &MapView::new(), 50.0, &SkinLibrary::new(), 10_000, None, &config);
        assert_eq!(drawn, 1);
    }

    #[test]
    fn test_parse_color() {
        assert!(same(parse_color("#FFD700").unwrap(), GOLD));
        assert!(matches!(parse_color("nope"), Err(RendererError::InvalidColor(_))));
    }
}
