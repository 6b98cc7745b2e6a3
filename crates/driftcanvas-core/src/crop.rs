//! Crop sessions: an editable rectangle over one image.
//!
//! The crop rectangle lives in the image's local display space (origin at the
//! image's top-left corner). Crop state is transient and never enters history;
//! only a confirmed crop produces a scene change.

use crate::error::CanvasResult;
use crate::geometry::{Corner, CropHandle, Edge};
use crate::scene::{CanvasImage, DecodedImage, ImageFile, ObjectId, encode_png};
use image::imageops;
use kurbo::{Point, Rect, Size, Vec2};
use std::sync::Arc;

/// Smallest crop side, in display units.
pub const MIN_CROP_SIZE: f64 = 1.0;

/// Active drag on a crop handle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropDrag {
    pub handle: CropHandle,
    /// World-space pointer position at drag start.
    pub anchor: Point,
    /// Crop rectangle at drag start.
    pub start: Rect,
}

/// Crop editing state for one image.
#[derive(Debug, Clone, PartialEq)]
pub struct CropSession {
    pub image_id: ObjectId,
    /// Crop rectangle in local display space.
    pub rect: Rect,
    /// Display size of the image being cropped.
    pub bounds: Size,
    pub drag: Option<CropDrag>,
}

impl CropSession {
    /// Start cropping `image` with the full image selected.
    pub fn new(image: &CanvasImage) -> Self {
        let bounds = Size::new(image.width, image.height);
        Self {
            image_id: image.id(),
            rect: bounds.to_rect(),
            bounds,
            drag: None,
        }
    }

    /// Begin dragging `handle` with the pointer at world point `anchor`.
    pub fn begin_drag(&mut self, handle: CropHandle, anchor: Point) {
        self.drag = Some(CropDrag {
            handle,
            anchor,
            start: self.rect,
        });
    }

    /// Update the active drag for a pointer at world point `current`.
    pub fn update_drag(&mut self, current: Point) {
        if let Some(drag) = self.drag {
            self.rect = apply_handle(drag.start, drag.handle, current - drag.anchor, self.bounds);
        }
    }

    pub fn end_drag(&mut self) {
        self.drag = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }
}

/// Apply a world-space `delta` to `start` according to `handle`, then flip
/// negative extents and clamp to `bounds`.
pub fn apply_handle(start: Rect, handle: CropHandle, delta: Vec2, bounds: Size) -> Rect {
    if handle == CropHandle::Move {
        let width = start.width().min(bounds.width);
        let height = start.height().min(bounds.height);
        let x = (start.x0 + delta.x).clamp(0.0, bounds.width - width);
        let y = (start.y0 + delta.y).clamp(0.0, bounds.height - height);
        return Rect::new(x, y, x + width, y + height);
    }

    let (mut x0, mut y0, mut x1, mut y1) = (start.x0, start.y0, start.x1, start.y1);
    let (left, top, right, bottom) = match handle {
        CropHandle::Corner(Corner::TopLeft) => (true, true, false, false),
        CropHandle::Corner(Corner::TopRight) => (false, true, true, false),
        CropHandle::Corner(Corner::BottomLeft) => (true, false, false, true),
        CropHandle::Corner(Corner::BottomRight) => (false, false, true, true),
        CropHandle::Edge(Edge::Top) => (false, true, false, false),
        CropHandle::Edge(Edge::Right) => (false, false, true, false),
        CropHandle::Edge(Edge::Bottom) => (false, false, false, true),
        CropHandle::Edge(Edge::Left) => (true, false, false, false),
        CropHandle::Move => (false, false, false, false),
    };
    if left {
        x0 += delta.x;
    }
    if right {
        x1 += delta.x;
    }
    if top {
        y0 += delta.y;
    }
    if bottom {
        y1 += delta.y;
    }

    // Rect::new does not normalize; abs() flips a handle dragged past its opposite side.
    clamp_rect(Rect::new(x0, y0, x1, y1).abs(), bounds)
}

/// Clamp `rect` inside `(0, 0)..bounds` with strictly positive extents.
pub fn clamp_rect(rect: Rect, bounds: Size) -> Rect {
    let min_w = MIN_CROP_SIZE.min(bounds.width);
    let min_h = MIN_CROP_SIZE.min(bounds.height);

    let x0 = rect.x0.clamp(0.0, bounds.width - min_w);
    let y0 = rect.y0.clamp(0.0, bounds.height - min_h);
    let x1 = rect.x1.clamp(x0 + min_w, bounds.width);
    let y1 = rect.y1.clamp(y0 + min_h, bounds.height);
    Rect::new(x0, y0, x1, y1)
}

/// Produce the cropped replacement for `image`.
///
/// The crop is taken from the natural-resolution pixels, re-encoded as PNG,
/// and positioned at the crop's world origin. Id and z-position are kept by
/// the caller replacing the image in place.
pub fn crop_image(image: &CanvasImage, crop: Rect) -> CanvasResult<CanvasImage> {
    let crop = clamp_rect(crop, Size::new(image.width, image.height));
    let ratio = image.pixel_ratio();

    let px = (crop.x0 * ratio.x).round().max(0.0) as u32;
    let py = (crop.y0 * ratio.y).round().max(0.0) as u32;
    let px = px.min(image.natural_width.saturating_sub(1));
    let py = py.min(image.natural_height.saturating_sub(1));
    let pw = ((crop.width() * ratio.x).round() as u32).clamp(1, image.natural_width - px);
    let ph = ((crop.height() * ratio.y).round() as u32).clamp(1, image.natural_height - py);

    let pixels = imageops::crop_imm(&*image.pixels, px, py, pw, ph).to_image();
    let bytes = encode_png(&pixels)?;
    let name = match image.file.name.rsplit_once('.') {
        Some((stem, _)) => format!("{stem}.png"),
        None => format!("{}.png", image.file.name),
    };
    log::debug!("crop {}: {pw}x{ph} px at ({px}, {py})", image.id());

    let decoded = DecodedImage {
        pixels: Arc::new(pixels),
        file: ImageFile::new(bytes, "image/png", name),
    };
    Ok(image
        .with_content(decoded)
        .with_size(crop.width(), crop.height())
        .moved_to(image.position + crop.origin().to_vec2()))
}
