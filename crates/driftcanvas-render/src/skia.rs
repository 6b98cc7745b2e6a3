//! CPU renderer built on tiny-skia.

use crate::raster::{pixmap_from_rgba, skia_rect, solid_paint, stroke_path, to_skia_path, to_transform};
use crate::renderer::{RenderContext, RenderResult, Renderer, RendererError};
use crate::text::{FixedAdvance, TextMeasure, wrap_text};
use ab_glyph::{Font, FontArc, ScaleFont, point};
use driftcanvas_core::crop::CropSession;
use driftcanvas_core::geometry::{CropHandle, handle_rect};
use driftcanvas_core::scene::{CanvasImage, CanvasNote, ObjectId, Scene, SerializableColor};
use image::RgbaImage;
use kurbo::{Affine, Point, Rect, RoundedRect, Shape as _};
use peniko::Color;
use std::collections::HashMap;
use tiny_skia::{FillRule, FilterQuality, Pixmap, PixmapPaint, PremultipliedColorU8, Stroke, Transform};

/// Note text size in world units.
const NOTE_FONT_SIZE: f32 = 16.0;
/// Inner padding of note text in world units.
const NOTE_PADDING: f64 = 12.0;
const NOTE_RADIUS: f64 = 8.0;
/// Shadow offset below notes, world units.
const NOTE_SHADOW_OFFSET: f64 = 3.0;
/// Outline width in screen pixels.
const OUTLINE_WIDTH: f64 = 2.0;

const TEXT_COLOR: SerializableColor = SerializableColor::new(31, 41, 55, 255);
const SHADOW_COLOR: SerializableColor = SerializableColor::new(0, 0, 0, 38);
const CROP_DIM_COLOR: SerializableColor = SerializableColor::new(0, 0, 0, 128);
const CROP_LINE_COLOR: SerializableColor = SerializableColor::new(255, 255, 255, 230);
const CROP_GUIDE_COLOR: SerializableColor = SerializableColor::new(255, 255, 255, 110);

struct CachedImage {
    revision: u64,
    pixmap: Pixmap,
}

/// Renders the canvas into an RGBA pixmap.
pub struct SkiaRenderer {
    frame: Option<Pixmap>,
    /// Offscreen surface for freehand paths, so erase strokes only clear strokes.
    strokes: Option<Pixmap>,
    /// Premultiplied image pixels keyed by object id.
    image_cache: HashMap<ObjectId, CachedImage>,
    font: Option<FontArc>,
}

impl Default for SkiaRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl SkiaRenderer {
    /// Create a renderer without a font. Note text is laid out but not drawn.
    pub fn new() -> Self {
        Self {
            frame: None,
            strokes: None,
            image_cache: HashMap::new(),
            font: None,
        }
    }

    /// Use `font` for note text.
    pub fn with_font(mut self, font: FontArc) -> Self {
        self.font = Some(font);
        self
    }

    /// Load a TrueType/OpenType font for note text.
    pub fn with_font_data(self, data: Vec<u8>) -> RenderResult<Self> {
        let font = FontArc::try_from_vec(data).map_err(|e| RendererError::Font(e.to_string()))?;
        Ok(self.with_font(font))
    }

    /// The last rendered frame.
    pub fn frame(&self) -> Option<&Pixmap> {
        self.frame.as_ref()
    }

    /// The last rendered frame as straight-alpha RGBA.
    pub fn to_image(&self) -> Option<RgbaImage> {
        self.frame.as_ref().map(crate::raster::rgba_from_pixmap)
    }

    /// The last rendered frame as PNG bytes.
    pub fn encode_png(&self) -> RenderResult<Vec<u8>> {
        let frame = self
            .frame
            .as_ref()
            .ok_or(RendererError::InvalidSurface { width: 0, height: 0 })?;
        frame.encode_png().map_err(|e| RendererError::Encode(e.to_string()))
    }

    /// Number of images with cached pixels.
    pub fn cached_images(&self) -> usize {
        self.image_cache.len()
    }

    fn surface(slot: &mut Option<Pixmap>, width: u32, height: u32) -> RenderResult<&mut Pixmap> {
        let reuse = slot.as_ref().is_some_and(|p| p.width() == width && p.height() == height);
        if !reuse {
            *slot = Some(Pixmap::new(width, height).ok_or(RendererError::InvalidSurface { width, height })?);
        }
        slot.as_mut().ok_or(RendererError::InvalidSurface { width, height })
    }

    fn sync_image_cache(&mut self, scene: &Scene) -> RenderResult<()> {
        self.image_cache
            .retain(|id, _| scene.images.iter().any(|image| image.id() == *id));
        for image in &scene.images {
            let fresh = self
                .image_cache
                .get(&image.id())
                .is_some_and(|cached| cached.revision == image.revision());
            if !fresh {
                let pixmap = pixmap_from_rgba(&image.pixels)?;
                self.image_cache.insert(
                    image.id(),
                    CachedImage {
                        revision: image.revision(),
                        pixmap,
                    },
                );
            }
        }
        Ok(())
    }
}

impl Renderer for SkiaRenderer {
    fn build_scene(&mut self, ctx: &RenderContext) -> RenderResult<()> {
        let (width, height) = ctx.surface_size();
        let canvas = ctx.canvas;
        let scene = canvas.scene();
        self.sync_image_cache(scene)?;

        let zoom = canvas.camera.zoom;
        let view = Affine::scale(ctx.scale_factor) * canvas.camera.transform();
        let transform = to_transform(view);
        // World length of one physical pixel.
        let pixel = 1.0 / (zoom * ctx.scale_factor);

        let frame = Self::surface(&mut self.frame, width, height)?;
        let background = color_of(ctx.background_color);
        frame.fill(tiny_skia::Color::from_rgba8(background.r, background.g, background.b, background.a));

        for image in &scene.images {
            if let Some(cached) = self.image_cache.get(&image.id()) {
                draw_image(frame, image, &cached.pixmap, view);
            }
        }

        draw_selection_outlines(frame, ctx, scene, transform, pixel);

        if let Some((crop, image)) = canvas
            .crop
            .as_ref()
            .and_then(|crop| Some((crop, scene.image(crop.image_id)?)))
        {
            let handle_px = canvas.config.handle_size_px * ctx.scale_factor;
            draw_crop_overlay(frame, image, crop, view, handle_px, pixel);
        }

        for note in &scene.notes {
            draw_note(frame, note, view, pixel);
            if ctx.editing_note != Some(note.id()) {
                match &self.font {
                    Some(font) => draw_note_text(frame, note, font, view, zoom * ctx.scale_factor),
                    None => log::trace!("no font loaded, skipping text of note {}", note.id()),
                }
            }
        }

        let strokes = Self::surface(&mut self.strokes, width, height)?;
        strokes.fill(tiny_skia::Color::TRANSPARENT);
        for path in &scene.paths {
            stroke_path(strokes, path, path.effective_color(), transform);
        }

        let (Some(frame), Some(strokes)) = (self.frame.as_mut(), self.strokes.as_ref()) else {
            return Err(RendererError::InvalidSurface { width, height });
        };
        frame.draw_pixmap(0, 0, strokes.as_ref(), &PixmapPaint::default(), Transform::identity(), None);

        if let Some(rect) = ctx.selection_rect {
            draw_marquee(frame, rect, ctx.selection_color, transform, pixel);
        }
        Ok(())
    }
}

fn color_of(color: Color) -> SerializableColor {
    color.into()
}

fn outline_stroke(pixel: f64) -> Stroke {
    Stroke {
        width: (OUTLINE_WIDTH * pixel) as f32,
        ..Stroke::default()
    }
}

fn fill_rect(pixmap: &mut Pixmap, rect: Rect, color: SerializableColor, transform: Transform) {
    if rect.width() <= 0.0 || rect.height() <= 0.0 {
        return;
    }
    if let Some(rect) = skia_rect(rect) {
        pixmap.fill_rect(rect, &solid_paint(color), transform, None);
    }
}

fn stroke_rect(pixmap: &mut Pixmap, rect: Rect, color: SerializableColor, stroke: &Stroke, transform: Transform) {
    if let Some(path) = skia_rect(rect).map(tiny_skia::PathBuilder::from_rect) {
        pixmap.stroke_path(&path, &solid_paint(color), stroke, transform, None);
    }
}

fn draw_image(frame: &mut Pixmap, image: &CanvasImage, pixels: &Pixmap, view: Affine) {
    if pixels.width() == 0 || pixels.height() == 0 {
        return;
    }
    let placement = view
        * Affine::translate(image.position.to_vec2())
        * Affine::scale_non_uniform(
            image.width / f64::from(pixels.width()),
            image.height / f64::from(pixels.height()),
        );
    let paint = PixmapPaint {
        quality: FilterQuality::Bilinear,
        ..PixmapPaint::default()
    };
    frame.draw_pixmap(0, 0, pixels.as_ref(), &paint, to_transform(placement), None);
}

fn draw_selection_outlines(frame: &mut Pixmap, ctx: &RenderContext, scene: &Scene, transform: Transform, pixel: f64) {
    let selection = &ctx.canvas.selection;
    let pad = ctx.canvas.config.selection_padding;
    let stroke = outline_stroke(pixel);
    let selected = color_of(ctx.selection_color);
    let reference = color_of(ctx.reference_color);

    for image in &scene.images {
        let color = if selection.images().contains(&image.id()) {
            selected
        } else if selection.is_reference(image.id()) {
            reference
        } else {
            continue;
        };
        stroke_rect(frame, image.bounds().inflate(pad, pad), color, &stroke, transform);
    }
    for note in &scene.notes {
        if selection.notes().contains(&note.id()) {
            stroke_rect(frame, note.bounds().inflate(pad, pad), selected, &stroke, transform);
        }
    }
}

/// The parts of `image` outside `crop`, as top, bottom, left and right bands.
pub fn crop_dim_rects(image: Rect, crop: Rect) -> [Rect; 4] {
    [
        Rect::new(image.x0, image.y0, image.x1, crop.y0),
        Rect::new(image.x0, crop.y1, image.x1, image.y1),
        Rect::new(image.x0, crop.y0, crop.x0, crop.y1),
        Rect::new(crop.x1, crop.y0, image.x1, crop.y1),
    ]
}

fn draw_crop_overlay(
    frame: &mut Pixmap,
    image: &CanvasImage,
    crop: &CropSession,
    view: Affine,
    handle_px: f64,
    pixel: f64,
) {
    let transform = to_transform(view);
    let crop_world = crop.rect + image.position.to_vec2();

    for band in crop_dim_rects(image.bounds(), crop_world) {
        fill_rect(frame, band, CROP_DIM_COLOR, transform);
    }

    stroke_rect(frame, crop_world, CROP_LINE_COLOR, &outline_stroke(pixel), transform);

    let guide = Stroke {
        width: pixel as f32,
        ..Stroke::default()
    };
    for i in 1..3 {
        let t = f64::from(i) / 3.0;
        let x = crop_world.x0 + crop_world.width() * t;
        let y = crop_world.y0 + crop_world.height() * t;
        let mut vertical = kurbo::BezPath::new();
        vertical.move_to((x, crop_world.y0));
        vertical.line_to((x, crop_world.y1));
        let mut horizontal = kurbo::BezPath::new();
        horizontal.move_to((crop_world.x0, y));
        horizontal.line_to((crop_world.x1, y));
        for line in [vertical, horizontal] {
            if let Some(path) = to_skia_path(&line) {
                frame.stroke_path(&path, &solid_paint(CROP_GUIDE_COLOR), &guide, transform, None);
            }
        }
    }

    // Handles keep a fixed screen size.
    let border = Stroke {
        width: 1.0,
        ..Stroke::default()
    };
    for handle in CropHandle::RESIZE {
        let center = view * handle.position(crop_world);
        let rect = handle_rect(center, handle_px);
        fill_rect(frame, rect, SerializableColor::white(), Transform::identity());
        stroke_rect(frame, rect, SerializableColor::new(55, 65, 81, 255), &border, Transform::identity());
    }
}

fn draw_note(frame: &mut Pixmap, note: &CanvasNote, view: Affine, pixel: f64) {
    let transform = to_transform(view);
    let body = RoundedRect::from_rect(note.bounds(), NOTE_RADIUS).to_path(0.1);
    let shadow = Affine::translate((0.0, NOTE_SHADOW_OFFSET)) * body.clone();

    if let Some(path) = to_skia_path(&shadow) {
        frame.fill_path(&path, &solid_paint(SHADOW_COLOR), FillRule::Winding, transform, None);
    }
    if let Some(path) = to_skia_path(&body) {
        frame.fill_path(&path, &solid_paint(note.background), FillRule::Winding, transform, None);
        let edge = Stroke {
            width: pixel as f32,
            ..Stroke::default()
        };
        frame.stroke_path(&path, &solid_paint(SerializableColor::new(0, 0, 0, 30)), &edge, transform, None);
    }
}

/// Lines of `note` wrapped to its inner width, in world units.
pub fn note_lines(note: &CanvasNote, measure: &impl TextMeasure) -> Vec<String> {
    let max_width = (note.width - 2.0 * NOTE_PADDING).max(0.0) as f32;
    wrap_text(&note.text, max_width, NOTE_FONT_SIZE, measure)
}

/// Lines of `note` that fit its height with the fallback metrics.
pub fn visible_note_lines(note: &CanvasNote) -> Vec<String> {
    let measure = FixedAdvance::default();
    let line_height = f64::from(measure.line_height(NOTE_FONT_SIZE));
    let capacity = ((note.height - 2.0 * NOTE_PADDING) / line_height).floor().max(0.0) as usize;
    let mut lines = note_lines(note, &measure);
    lines.truncate(capacity);
    lines
}

fn draw_note_text(frame: &mut Pixmap, note: &CanvasNote, font: &FontArc, view: Affine, px_per_unit: f64) {
    if note.text.is_empty() {
        return;
    }
    let clip = view.transform_rect_bbox(note.bounds());
    let px_size = (f64::from(NOTE_FONT_SIZE) * px_per_unit) as f32;
    if px_size < 1.0 {
        return;
    }

    let line_height = f64::from(font.line_height(NOTE_FONT_SIZE));
    let ascent = f64::from(font.ascent(NOTE_FONT_SIZE));
    let origin = note.position + kurbo::Vec2::new(NOTE_PADDING, NOTE_PADDING);

    for (index, line) in note_lines(note, font).iter().enumerate() {
        let baseline = origin.y + ascent + line_height * index as f64;
        if baseline - ascent > note.bounds().y1 {
            break;
        }
        let start = view * Point::new(origin.x, baseline);
        let mut caret = start.x as f32;
        let scaled = font.as_scaled(px_size);
        let mut last = None;
        for ch in line.chars() {
            let id = font.glyph_id(ch);
            if let Some(prev) = last {
                caret += scaled.kern(prev, id);
            }
            let glyph = id.with_scale_and_position(px_size, point(caret, start.y as f32));
            caret += scaled.h_advance(id);
            last = Some(id);

            let Some(outlined) = font.outline_glyph(glyph) else {
                continue;
            };
            let bounds = outlined.px_bounds();
            outlined.draw(|x, y, coverage| {
                let px = bounds.min.x as i32 + x as i32;
                let py = bounds.min.y as i32 + y as i32;
                blend_coverage(frame, px, py, TEXT_COLOR, coverage, clip);
            });
        }
    }
}

/// Source-over one pixel of `color` at `coverage`, skipping pixels outside
/// `clip` or the surface.
fn blend_coverage(pixmap: &mut Pixmap, x: i32, y: i32, color: SerializableColor, coverage: f32, clip: Rect) {
    let (fx, fy) = (f64::from(x) + 0.5, f64::from(y) + 0.5);
    if fx < clip.x0 || fx > clip.x1 || fy < clip.y0 || fy > clip.y1 {
        return;
    }
    let width = pixmap.width() as i32;
    if x < 0 || y < 0 || x >= width || y >= pixmap.height() as i32 {
        return;
    }
    let Some(dst) = pixmap.pixels_mut().get_mut((y * width + x) as usize) else {
        return;
    };

    let src_a = f32::from(color.a) / 255.0 * coverage.clamp(0.0, 1.0);
    let keep = 1.0 - src_a;
    let channel = |src: u8, dst: u8| (f32::from(src) * src_a + f32::from(dst) * keep).round() as u8;
    let a = (255.0 * src_a + f32::from(dst.alpha()) * keep).round() as u8;
    let r = channel(color.r, dst.red()).min(a);
    let g = channel(color.g, dst.green()).min(a);
    let b = channel(color.b, dst.blue()).min(a);
    if let Some(blended) = PremultipliedColorU8::from_rgba(r, g, b, a) {
        *dst = blended;
    }
}

fn draw_marquee(frame: &mut Pixmap, rect: Rect, color: Color, transform: Transform, pixel: f64) {
    let outline = color_of(color);
    let fill = SerializableColor::new(outline.r, outline.g, outline.b, 25);
    fill_rect(frame, rect, fill, transform);
    stroke_rect(frame, rect, outline, &outline_stroke(pixel / 2.0), transform);
}
