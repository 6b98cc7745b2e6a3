//! Sticky text notes.

use super::{ObjectId, SerializableColor};
use kurbo::{Point, Rect, Size, Vec2};
use uuid::Uuid;

/// A sticky note placed on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasNote {
    pub(crate) id: ObjectId,
    /// Top-left corner in world space.
    pub position: Point,
    pub width: f64,
    pub height: f64,
    pub text: String,
    pub background: SerializableColor,
}

impl CanvasNote {
    /// Create an empty note of `size` centered on `center`.
    pub fn centered_at(center: Point, size: Size, background: SerializableColor) -> Self {
        Self {
            id: Uuid::new_v4(),
            position: Point::new(center.x - size.width / 2.0, center.y - size.height / 2.0),
            width: size.width,
            height: size.height,
            text: String::new(),
            background,
        }
    }

    /// Create a note with a known id and rectangle.
    pub fn with_id(id: ObjectId, rect: Rect, text: String, background: SerializableColor) -> Self {
        Self {
            id,
            position: Point::new(rect.x0, rect.y0),
            width: rect.width(),
            height: rect.height(),
            text,
            background,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// World-space bounds.
    pub fn bounds(&self) -> Rect {
        Rect::new(
            self.position.x,
            self.position.y,
            self.position.x + self.width,
            self.position.y + self.height,
        )
    }

    /// Copy with a new position.
    pub fn moved_to(&self, position: Point) -> Self {
        Self {
            position,
            ..self.clone()
        }
    }

    /// Copy translated by `delta`.
    pub fn translated(&self, delta: Vec2) -> Self {
        self.moved_to(self.position + delta)
    }

    /// Copy resized to `size`, floored at `min`.
    pub fn resized(&self, size: Size, min: Size) -> Self {
        Self {
            width: size.width.max(min.width),
            height: size.height.max(min.height),
            ..self.clone()
        }
    }

    /// Copy with new text.
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_creation() {
        let note = CanvasNote::centered_at(
            Point::new(100.0, 100.0),
            Size::new(200.0, 160.0),
            SerializableColor::white(),
        );
        assert!((note.position.x - 0.0).abs() < f64::EPSILON);
        assert!((note.position.y - 20.0).abs() < f64::EPSILON);
        assert!(note.text.is_empty());
    }

    #[test]
    fn test_resize_floors_at_minimum() {
        let note = CanvasNote::centered_at(Point::ZERO, Size::new(200.0, 160.0), SerializableColor::white());
        let resized = note.resized(Size::new(10.0, 500.0), Size::new(80.0, 60.0));
        assert!((resized.width - 80.0).abs() < f64::EPSILON);
        assert!((resized.height - 500.0).abs() < f64::EPSILON);
        assert_eq!(resized.id(), note.id());
    }
}
