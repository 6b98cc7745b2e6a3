//! Offscreen rasterization used to build generation inputs: inpaint masks,
//! annotated copies and multi-image composites.
//!
//! All functions take paths already mapped into the output's pixel space.

use crate::renderer::{RenderResult, RendererError};
use driftcanvas_core::scene::{Path, PathTool, SerializableColor};
use image::{Rgba, RgbaImage};
use kurbo::{Affine, BezPath, PathEl, Rect};
use tiny_skia::{
    BlendMode, ColorU8, FillRule, LineCap, LineJoin, Paint, PathBuilder, Pixmap, PixmapPaint, Stroke, Transform,
};

/// Convert a kurbo affine to a tiny-skia transform.
pub fn to_transform(affine: Affine) -> Transform {
    let [a, b, c, d, e, f] = affine.as_coeffs();
    Transform::from_row(a as f32, b as f32, c as f32, d as f32, e as f32, f as f32)
}

/// Convert a kurbo path to a tiny-skia path. Returns `None` for empty paths.
pub fn to_skia_path(path: &BezPath) -> Option<tiny_skia::Path> {
    let mut builder = PathBuilder::new();
    for element in path.elements() {
        match *element {
            PathEl::MoveTo(p) => builder.move_to(p.x as f32, p.y as f32),
            PathEl::LineTo(p) => builder.line_to(p.x as f32, p.y as f32),
            PathEl::QuadTo(p1, p2) => builder.quad_to(p1.x as f32, p1.y as f32, p2.x as f32, p2.y as f32),
            PathEl::CurveTo(p1, p2, p3) => builder.cubic_to(
                p1.x as f32,
                p1.y as f32,
                p2.x as f32,
                p2.y as f32,
                p3.x as f32,
                p3.y as f32,
            ),
            PathEl::ClosePath => builder.close(),
        }
    }
    builder.finish()
}

pub(crate) fn skia_rect(rect: Rect) -> Option<tiny_skia::Rect> {
    tiny_skia::Rect::from_ltrb(rect.x0 as f32, rect.y0 as f32, rect.x1 as f32, rect.y1 as f32)
}

pub(crate) fn solid_paint(color: SerializableColor) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color.r, color.g, color.b, color.a);
    paint.anti_alias = true;
    paint
}

/// Premultiply `image` into a new pixmap.
pub fn pixmap_from_rgba(image: &RgbaImage) -> RenderResult<Pixmap> {
    let (width, height) = image.dimensions();
    let mut pixmap = Pixmap::new(width, height).ok_or(RendererError::InvalidSurface { width, height })?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Ok(pixmap)
}

/// Demultiply `pixmap` into straight-alpha RGBA.
pub fn rgba_from_pixmap(pixmap: &Pixmap) -> RgbaImage {
    let mut image = RgbaImage::new(pixmap.width(), pixmap.height());
    for (dst, src) in image.pixels_mut().zip(pixmap.pixels()) {
        let color = src.demultiply();
        *dst = Rgba([color.red(), color.green(), color.blue(), color.alpha()]);
    }
    image
}

/// Stroke `path` onto `pixmap`. Erase strokes punch through with
/// destination-out; everything else draws source-over in `color`.
pub(crate) fn stroke_path(pixmap: &mut Pixmap, path: &Path, color: SerializableColor, transform: Transform) {
    let mut paint = solid_paint(color);
    if path.tool.is_erase() {
        paint.blend_mode = BlendMode::DestinationOut;
    }

    // A single click leaves one point; draw it as a dot.
    if let [point] = path.points.as_slice() {
        let radius = (path.width / 2.0).max(0.5) as f32;
        if let Some(dot) = PathBuilder::from_circle(point.x as f32, point.y as f32, radius) {
            pixmap.fill_path(&dot, &paint, FillRule::Winding, transform, None);
        }
        return;
    }

    let Some(skia_path) = to_skia_path(&path.to_bez_path()) else {
        return;
    };
    let stroke = Stroke {
        width: path.width as f32,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Stroke::default()
    };
    pixmap.stroke_path(&skia_path, &paint, &stroke, transform, None);
}

/// White-on-black inpaint mask of `width`×`height`.
///
/// Inpaint and plain brush strokes paint white; erase strokes remove what
/// earlier strokes painted. Annotation strokes are ignored.
pub fn build_mask(width: u32, height: u32, paths: &[Path]) -> RenderResult<RgbaImage> {
    let mut strokes = Pixmap::new(width, height).ok_or(RendererError::InvalidSurface { width, height })?;
    for path in paths {
        match path.tool {
            PathTool::Inpaint | PathTool::Brush | PathTool::Erase => {
                stroke_path(&mut strokes, path, SerializableColor::white(), Transform::identity());
            }
            PathTool::Annotate => {}
        }
    }

    let mut mask = Pixmap::new(width, height).ok_or(RendererError::InvalidSurface { width, height })?;
    mask.fill(tiny_skia::Color::BLACK);
    mask.draw_pixmap(0, 0, strokes.as_ref(), &PixmapPaint::default(), Transform::identity(), None);
    Ok(rgba_from_pixmap(&mask))
}

/// Whether a mask marks any pixel for regeneration.
pub fn mask_has_coverage(mask: &RgbaImage) -> bool {
    mask.pixels().any(|p| p.0[0] > 0)
}

/// Copy of `source` with annotation strokes drawn on top in their own colors.
///
/// Erase strokes remove earlier strokes only, never the source pixels.
pub fn build_annotation(source: &RgbaImage, paths: &[Path]) -> RenderResult<RgbaImage> {
    let (width, height) = source.dimensions();
    let mut strokes = Pixmap::new(width, height).ok_or(RendererError::InvalidSurface { width, height })?;
    for path in paths {
        match path.tool {
            PathTool::Annotate | PathTool::Brush | PathTool::Erase => {
                stroke_path(&mut strokes, path, path.effective_color(), Transform::identity());
            }
            PathTool::Inpaint => {}
        }
    }

    let mut out = pixmap_from_rgba(source)?;
    out.draw_pixmap(0, 0, strokes.as_ref(), &PixmapPaint::default(), Transform::identity(), None);
    Ok(rgba_from_pixmap(&out))
}

/// One image placed into a composite.
#[derive(Debug, Clone, Copy)]
pub struct Layer<'a> {
    pub pixels: &'a RgbaImage,
    /// Destination in world space.
    pub dest: Rect,
}

/// Rasterize `layers` (bottom first) into one image covering `bounds`.
///
/// `scale` converts world units to output pixels. Areas no layer covers stay
/// transparent.
pub fn composite(bounds: Rect, layers: &[Layer<'_>], scale: f64) -> RenderResult<RgbaImage> {
    let width = (bounds.width() * scale).round().max(1.0) as u32;
    let height = (bounds.height() * scale).round().max(1.0) as u32;
    let mut out = Pixmap::new(width, height).ok_or(RendererError::InvalidSurface { width, height })?;
    let paint = PixmapPaint {
        quality: tiny_skia::FilterQuality::Bilinear,
        ..PixmapPaint::default()
    };

    for layer in layers {
        let (w, h) = layer.pixels.dimensions();
        if w == 0 || h == 0 {
            continue;
        }
        let pixmap = pixmap_from_rgba(layer.pixels)?;
        let placement = Affine::scale(scale)
            * Affine::translate(layer.dest.origin() - bounds.origin())
            * Affine::scale_non_uniform(layer.dest.width() / f64::from(w), layer.dest.height() / f64::from(h));
        out.draw_pixmap(0, 0, pixmap.as_ref(), &paint, to_transform(placement), None);
    }
    Ok(rgba_from_pixmap(&out))
}
