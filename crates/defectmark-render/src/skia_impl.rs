//! CPU raster renderer built on tiny-skia.

use crate::label;
use crate::renderer::{FrameState, FrameStats, RenderContext, RenderResult, Renderer, RendererError};
use defectmark_core::annotation::{Annotation, AnnotationKind};
use defectmark_core::loader::LoadedImage;
use defectmark_core::shapes::{Geometry, ShapeGeometry};
use defectmark_core::tools::ShapeDraft;
use defectmark_core::{EngineConfig, HexColor, Session, Viewport};
use image::RgbaImage;
use kurbo::{BezPath, PathEl, Point};
use tiny_skia::{
    ColorU8, FillRule, FilterQuality, IntSize, Paint, PathBuilder, Pixmap, PixmapPaint, Rect,
    Stroke, StrokeDash, Transform,
};

const STROKE_WIDTH: f32 = 2.0;
const SELECTED_STROKE_WIDTH: f32 = 3.0;
const LOADING_TEXT: &str = "Loading...";

#[derive(Debug, Clone, PartialEq, Eq)]
struct CacheKey {
    source: String,
    generation: u64,
}

impl CacheKey {
    fn of(image: &LoadedImage) -> Self {
        Self {
            source: image.source.clone(),
            generation: image.generation,
        }
    }

    fn matches(&self, image: &LoadedImage) -> bool {
        self.generation == image.generation && self.source == image.source
    }
}

/// Renders sessions into an owned pixmap.
#[derive(Default)]
pub struct SkiaRenderer {
    pixmap: Option<Pixmap>,
    /// Premultiplied copy of the committed image, keyed by source and load generation.
    image_cache: Option<(CacheKey, Pixmap)>,
}

impl SkiaRenderer {
    /// Create a new renderer.
    pub fn new() -> Self {
        Self::default()
    }

    /// The last rendered frame.
    pub fn pixmap(&self) -> Option<&Pixmap> {
        self.pixmap.as_ref()
    }

    /// Generation of the cached image pixmap, if any.
    pub fn cached_generation(&self) -> Option<u64> {
        self.image_cache.as_ref().map(|(key, _)| key.generation)
    }

    /// The last rendered frame as straight-alpha RGBA.
    pub fn to_rgba_image(&self) -> Option<RgbaImage> {
        let pixmap = self.pixmap.as_ref()?;
        let mut data = Vec::with_capacity(pixmap.data().len());
        for px in pixmap.pixels() {
            let c = px.demultiply();
            data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }
        RgbaImage::from_raw(pixmap.width(), pixmap.height(), data)
    }

    fn take_surface(&mut self, ctx: &RenderContext) -> RenderResult<Pixmap> {
        let size = ctx.viewport_size;
        let invalid = || RendererError::InvalidSurface {
            width: size.width,
            height: size.height,
        };
        if !(size.width >= 1.0 && size.height >= 1.0) {
            return Err(invalid());
        }
        let (width, height) = (size.width.round() as u32, size.height.round() as u32);
        match self.pixmap.take() {
            Some(pixmap) if pixmap.width() == width && pixmap.height() == height => Ok(pixmap),
            _ => Pixmap::new(width, height).ok_or_else(invalid),
        }
    }

    /// Premultiplied pixmap for an image, rebuilt when the source or generation changes.
    fn image_pixmap(&mut self, image: &LoadedImage) -> Option<&Pixmap> {
        let stale = self
            .image_cache
            .as_ref()
            .is_none_or(|(key, _)| !key.matches(image));
        if stale {
            match image_to_pixmap(&image.image) {
                Some(pixmap) => self.image_cache = Some((CacheKey::of(image), pixmap)),
                None => {
                    log::warn!("Cannot rasterize image {} ({}x{})", image.source, image.width(), image.height());
                    self.image_cache = None;
                }
            }
        }
        self.image_cache.as_ref().map(|(_, pixmap)| pixmap)
    }

    fn draw_frame(&mut self, pixmap: &mut Pixmap, ctx: &RenderContext) -> FrameStats {
        let session = ctx.session;
        let config = session.config();
        let mut stats = FrameStats::default();

        let Some(image) = session.image() else {
            draw_loading(pixmap, ctx, config);
            return stats;
        };
        stats.state = FrameState::Drawn;

        let viewport = session.viewport();
        if let Some(image_pixmap) = self.image_pixmap(image) {
            let paint = PixmapPaint {
                quality: FilterQuality::Bilinear,
                ..PixmapPaint::default()
            };
            let s = viewport.scale as f32;
            let transform = Transform::from_row(s, 0.0, 0.0, s, viewport.offset.x as f32, viewport.offset.y as f32);
            pixmap.draw_pixmap(0, 0, image_pixmap.as_ref(), &paint, transform, None);
        }
        if let Some(caption) = &image.caption {
            let center = viewport.to_view(Point::new(
                f64::from(image.width()) / 2.0,
                f64::from(image.height()) / 2.0,
            ));
            let w = label::measure(caption, config.label_scale);
            let h = label::line_height(config.label_scale);
            let color = session.catalog().fallback();
            label::draw_text(
                pixmap,
                caption,
                center.x - w / 2.0,
                center.y - h / 2.0,
                config.label_scale,
                skia_color(color),
            );
        }

        let display = session.display();
        if display.show_annotations {
            // Owned snapshot; the store is never borrowed across drawing.
            for annotation in session.store().snapshot() {
                let drawn = draw_annotation(pixmap, session, viewport, &annotation);
                if drawn {
                    stats.annotations_drawn += 1;
                } else {
                    stats.degenerate_skipped += 1;
                }
                if display.show_labels {
                    let anchor = Geometry::of(&annotation)
                        .with_marker_radius(config.marker_radius)
                        .to_drawable(viewport)
                        .anchor;
                    draw_label(pixmap, ctx, &annotation, anchor);
                    stats.labels_drawn += 1;
                }
            }
        }

        if let Some(draft) = session.preview() {
            let color = session.catalog().color_for(session.active_defect_type_id());
            draw_draft(pixmap, viewport, &draft, color);
        }

        stats
    }
}

impl Renderer for SkiaRenderer {
    fn render(&mut self, ctx: &RenderContext) -> RenderResult<FrameStats> {
        let mut pixmap = self.take_surface(ctx)?;
        pixmap.fill(peniko_to_skia(self.background_color(ctx)));
        let stats = self.draw_frame(&mut pixmap, ctx);
        self.pixmap = Some(pixmap);
        Ok(stats)
    }
}

/// Fill and stroke one annotation. Returns false if it was degenerate.
fn draw_annotation(pixmap: &mut Pixmap, session: &Session, viewport: &Viewport, annotation: &Annotation) -> bool {
    let config = session.config();
    let geometry = Geometry::of(annotation).with_marker_radius(config.marker_radius);
    let drawable = geometry.to_drawable(viewport);
    let Some(path) = drawable.path.as_ref().and_then(to_skia_path) else {
        log::warn!(
            "Skipping degenerate {} annotation {} ({} points)",
            annotation.kind,
            annotation.id,
            annotation.points.len()
        );
        return false;
    };

    let color = session.catalog().color_for(&annotation.defect_type_id);
    let mut fill = Paint::default();
    fill.set_color(skia_color(color.with_alpha(config.fill_alpha)));
    fill.anti_alias = true;
    pixmap.fill_path(&path, &fill, FillRule::Winding, Transform::identity(), None);

    let mut stroke_paint = Paint::default();
    stroke_paint.set_color(skia_color(color));
    stroke_paint.anti_alias = true;
    let stroke = Stroke {
        width: if session.store().is_selected(&annotation.id) {
            SELECTED_STROKE_WIDTH
        } else {
            STROKE_WIDTH
        },
        ..Stroke::default()
    };
    pixmap.stroke_path(&path, &stroke_paint, &stroke, Transform::identity(), None);
    true
}

/// Label box sits `label_offset` above the anchor, filled with the defect color.
fn draw_label(pixmap: &mut Pixmap, ctx: &RenderContext, annotation: &Annotation, anchor: Point) {
    let session = ctx.session;
    let config = session.config();
    let text = annotation.display_label();
    let text_width = label::measure(&text, config.label_scale);
    let text_height = label::line_height(config.label_scale);
    let pad = config.label_padding;

    let bottom = anchor.y - config.label_offset;
    let top = bottom - text_height - pad;
    let color = session.catalog().color_for(&annotation.defect_type_id);
    if let Some(rect) = Rect::from_xywh(
        anchor.x as f32,
        top as f32,
        (text_width + pad) as f32,
        (text_height + pad) as f32,
    ) {
        let mut paint = Paint::default();
        paint.set_color(skia_color(color.with_alpha(255)));
        pixmap.fill_rect(rect, &paint, Transform::identity(), None);
    }
    label::draw_text(
        pixmap,
        &text,
        anchor.x + pad / 2.0,
        top + pad / 2.0,
        config.label_scale,
        peniko_to_skia(ctx.text_color),
    );
}

/// Dashed outline of the shape being drawn. Polygon drafts stay open.
fn draw_draft(pixmap: &mut Pixmap, viewport: &Viewport, draft: &ShapeDraft, color: HexColor) {
    let path = match draft.kind {
        AnnotationKind::Polygon => {
            let mut path = BezPath::new();
            for (i, p) in draft.points.iter().enumerate() {
                let v = viewport.to_view(*p);
                if i == 0 {
                    path.move_to(v);
                } else {
                    path.line_to(v);
                }
            }
            Some(path)
        }
        kind => Geometry::from_points(kind, &draft.points).to_drawable(viewport).path,
    };
    let Some(path) = path.as_ref().and_then(to_skia_path) else {
        return;
    };

    let mut paint = Paint::default();
    paint.set_color(skia_color(color));
    paint.anti_alias = true;
    let stroke = Stroke {
        width: STROKE_WIDTH,
        dash: StrokeDash::new(vec![6.0, 4.0], 0.0),
        ..Stroke::default()
    };
    pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
}

fn draw_loading(pixmap: &mut Pixmap, ctx: &RenderContext, config: &EngineConfig) {
    pixmap.fill(peniko_to_skia(ctx.loading_color));
    let w = label::measure(LOADING_TEXT, config.label_scale);
    let h = label::line_height(config.label_scale);
    label::draw_text(
        pixmap,
        LOADING_TEXT,
        (f64::from(pixmap.width()) - w) / 2.0,
        (f64::from(pixmap.height()) - h) / 2.0,
        config.label_scale,
        peniko_to_skia(ctx.text_color),
    );
}

/// Convert a kurbo path to a tiny-skia path.
fn to_skia_path(path: &BezPath) -> Option<tiny_skia::Path> {
    let mut pb = PathBuilder::new();
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => pb.move_to(p.x as f32, p.y as f32),
            PathEl::LineTo(p) => pb.line_to(p.x as f32, p.y as f32),
            PathEl::QuadTo(p1, p2) => pb.quad_to(p1.x as f32, p1.y as f32, p2.x as f32, p2.y as f32),
            PathEl::CurveTo(p1, p2, p3) => pb.cubic_to(
                p1.x as f32,
                p1.y as f32,
                p2.x as f32,
                p2.y as f32,
                p3.x as f32,
                p3.y as f32,
            ),
            PathEl::ClosePath => pb.close(),
        }
    }
    pb.finish()
}

fn image_to_pixmap(image: &RgbaImage) -> Option<Pixmap> {
    let size = IntSize::from_wh(image.width(), image.height())?;
    let mut data = Vec::with_capacity(image.as_raw().len());
    for px in image.pixels() {
        let [r, g, b, a] = px.0;
        let c = ColorU8::from_rgba(r, g, b, a).premultiply();
        data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    Pixmap::from_vec(data, size)
}

fn skia_color(c: HexColor) -> tiny_skia::Color {
    tiny_skia::Color::from_rgba8(c.r, c.g, c.b, c.a)
}

fn peniko_to_skia(color: peniko::Color) -> tiny_skia::Color {
    let rgba = color.to_rgba8();
    tiny_skia::Color::from_rgba8(rgba.r, rgba.g, rgba.b, rgba.a)
}
