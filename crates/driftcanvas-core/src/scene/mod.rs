//! Scene graph: images, notes and freehand paths.
//!
//! A [`Scene`] is a plain value. Every operation here returns a new scene and
//! leaves its input untouched; callers feed the result through the history
//! commit path.

mod color;
mod image;
mod note;
mod path;

pub use color::SerializableColor;
pub use image::{CanvasImage, DecodedImage, ImageFile, ImageFormat, decode_image, encode_png};
pub use note::CanvasNote;
pub use path::{Path, PathTool};

use kurbo::{Point, Rect, Size, Vec2};
use std::collections::{HashMap, HashSet};

/// Identity of an image or note.
pub type ObjectId = uuid::Uuid;

/// Direction for a one-step z-order change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZOrder {
    /// Towards the top (drawn later).
    Forward,
    /// Towards the bottom (drawn earlier).
    Backward,
}

/// The editable scene. `images` order is z-order (last on top).
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub images: Vec<CanvasImage>,
    pub notes: Vec<CanvasNote>,
    pub paths: Vec<Path>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty() && self.notes.is_empty() && self.paths.is_empty()
    }

    pub fn image(&self, id: ObjectId) -> Option<&CanvasImage> {
        self.images.iter().find(|image| image.id == id)
    }

    pub fn note(&self, id: ObjectId) -> Option<&CanvasNote> {
        self.notes.iter().find(|note| note.id == id)
    }

    pub fn contains_image(&self, id: ObjectId) -> bool {
        self.image(id).is_some()
    }

    pub fn contains_note(&self, id: ObjectId) -> bool {
        self.note(id).is_some()
    }

    /// Bounding box of all images and notes.
    pub fn bounds(&self) -> Option<Rect> {
        self.images
            .iter()
            .map(CanvasImage::bounds)
            .chain(self.notes.iter().map(CanvasNote::bounds))
            .reduce(|acc, r| acc.union(r))
    }

    /// Where the next uploaded image goes: the origin for an empty canvas,
    /// otherwise right of the right-most image (plus `gap`) at its y.
    pub fn next_upload_position(&self, gap: f64) -> Point {
        self.images
            .iter()
            .max_by(|a, b| a.bounds().x1.total_cmp(&b.bounds().x1))
            .map(|rightmost| Point::new(rightmost.bounds().x1 + gap, rightmost.position.y))
            .unwrap_or(Point::ZERO)
    }

    /// Ids of images whose rectangle intersects `rect`, in z-order.
    pub fn images_in_rect(&self, rect: Rect) -> Vec<ObjectId> {
        self.images
            .iter()
            .filter(|image| crate::geometry::rects_overlap(image.bounds(), rect))
            .map(CanvasImage::id)
            .collect()
    }

    /// Ids of notes whose rectangle intersects `rect`.
    pub fn notes_in_rect(&self, rect: Rect) -> Vec<ObjectId> {
        self.notes
            .iter()
            .filter(|note| crate::geometry::rects_overlap(note.bounds(), rect))
            .map(CanvasNote::id)
            .collect()
    }

    /// Scene with `images` appended on top.
    pub fn with_images(&self, images: impl IntoIterator<Item = CanvasImage>) -> Self {
        let mut next = self.clone();
        next.images.extend(images);
        next
    }

    /// Scene with `note` appended.
    pub fn with_note(&self, note: CanvasNote) -> Self {
        let mut next = self.clone();
        next.notes.push(note);
        next
    }

    /// Scene with `path` appended. Empty paths are dropped.
    pub fn with_path(&self, path: Path) -> Self {
        let mut next = self.clone();
        if !path.is_empty() {
            next.paths.push(path);
        }
        next
    }

    /// Scene with the given paths replacing the current ones.
    pub fn with_paths(&self, paths: Vec<Path>) -> Self {
        Self {
            paths: paths.into_iter().filter(|p| !p.is_empty()).collect(),
            ..self.clone()
        }
    }

    /// Scene without any images or notes whose id is in `ids`.
    pub fn without(&self, ids: &HashSet<ObjectId>) -> Self {
        Self {
            images: self
                .images
                .iter()
                .filter(|image| !ids.contains(&image.id))
                .cloned()
                .collect(),
            notes: self
                .notes
                .iter()
                .filter(|note| !ids.contains(&note.id))
                .cloned()
                .collect(),
            paths: self.paths.clone(),
        }
    }

    /// Swap one image with its neighbour. No-op at either end or for unknown ids.
    pub fn reorder_image(&self, id: ObjectId, direction: ZOrder) -> Self {
        let mut next = self.clone();
        let Some(pos) = next.images.iter().position(|image| image.id == id) else {
            return next;
        };
        match direction {
            ZOrder::Forward if pos + 1 < next.images.len() => next.images.swap(pos, pos + 1),
            ZOrder::Backward if pos > 0 => next.images.swap(pos, pos - 1),
            _ => {}
        }
        next
    }

    /// Move every object listed in `origins` to its recorded origin plus `delta`.
    pub fn with_objects_moved(&self, origins: &HashMap<ObjectId, Point>, delta: Vec2) -> Self {
        Self {
            images: self
                .images
                .iter()
                .map(|image| match origins.get(&image.id) {
                    Some(origin) => image.moved_to(*origin + delta),
                    None => image.clone(),
                })
                .collect(),
            notes: self
                .notes
                .iter()
                .map(|note| match origins.get(&note.id) {
                    Some(origin) => note.moved_to(*origin + delta),
                    None => note.clone(),
                })
                .collect(),
            paths: self.paths.clone(),
        }
    }

    /// Translate a set of objects by `delta`.
    pub fn translated(&self, ids: &HashSet<ObjectId>, delta: Vec2) -> Self {
        Self {
            images: self
                .images
                .iter()
                .map(|image| {
                    if ids.contains(&image.id) {
                        image.translated(delta)
                    } else {
                        image.clone()
                    }
                })
                .collect(),
            notes: self
                .notes
                .iter()
                .map(|note| {
                    if ids.contains(&note.id) {
                        note.translated(delta)
                    } else {
                        note.clone()
                    }
                })
                .collect(),
            paths: self.paths.clone(),
        }
    }

    /// Resize one note, floored at `min`.
    pub fn resize_note(&self, id: ObjectId, size: Size, min: Size) -> Self {
        self.map_note(id, |note| note.resized(size, min))
    }

    /// Replace one note's text.
    pub fn with_note_text(&self, id: ObjectId, text: &str) -> Self {
        self.map_note(id, |note| note.with_text(text))
    }

    /// Replace one note's background.
    pub fn with_note_background(&self, id: ObjectId, background: SerializableColor) -> Self {
        self.map_note(id, |note| CanvasNote {
            background,
            ..note.clone()
        })
    }

    /// Replace the image carrying `image.id()` in place, keeping its z-position.
    pub fn replace_image(&self, image: CanvasImage) -> Self {
        Self {
            images: self
                .images
                .iter()
                .map(|existing| {
                    if existing.id == image.id {
                        image.clone()
                    } else {
                        existing.clone()
                    }
                })
                .collect(),
            ..self.clone()
        }
    }

    fn map_note(&self, id: ObjectId, f: impl Fn(&CanvasNote) -> CanvasNote) -> Self {
        Self {
            notes: self
                .notes
                .iter()
                .map(|note| if note.id == id { f(note) } else { note.clone() })
                .collect(),
            ..self.clone()
        }
    }
}
