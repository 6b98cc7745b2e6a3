//! Hit-testing and handle geometry.

use crate::scene::{CanvasImage, CanvasNote};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

pub use crate::camera::to_world;

/// Corner positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Edge positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Edge {
    Top,
    Right,
    Bottom,
    Left,
}

/// What a pointer-down inside a crop session grabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CropHandle {
    /// Interior: moves the whole crop rectangle.
    Move,
    Corner(Corner),
    Edge(Edge),
}

impl CropHandle {
    /// All eight resize handles, in drawing order.
    pub const RESIZE: [CropHandle; 8] = [
        CropHandle::Corner(Corner::TopLeft),
        CropHandle::Edge(Edge::Top),
        CropHandle::Corner(Corner::TopRight),
        CropHandle::Edge(Edge::Right),
        CropHandle::Corner(Corner::BottomRight),
        CropHandle::Edge(Edge::Bottom),
        CropHandle::Corner(Corner::BottomLeft),
        CropHandle::Edge(Edge::Left),
    ];

    /// Position of this handle on `rect`. `Move` maps to the center.
    pub fn position(self, rect: Rect) -> Point {
        let center = rect.center();
        match self {
            CropHandle::Move => center,
            CropHandle::Corner(Corner::TopLeft) => Point::new(rect.x0, rect.y0),
            CropHandle::Corner(Corner::TopRight) => Point::new(rect.x1, rect.y0),
            CropHandle::Corner(Corner::BottomLeft) => Point::new(rect.x0, rect.y1),
            CropHandle::Corner(Corner::BottomRight) => Point::new(rect.x1, rect.y1),
            CropHandle::Edge(Edge::Top) => Point::new(center.x, rect.y0),
            CropHandle::Edge(Edge::Right) => Point::new(rect.x1, center.y),
            CropHandle::Edge(Edge::Bottom) => Point::new(center.x, rect.y1),
            CropHandle::Edge(Edge::Left) => Point::new(rect.x0, center.y),
        }
    }
}

/// Inclusive point-in-rectangle test.
pub fn rect_contains(rect: Rect, point: Point) -> bool {
    point.x >= rect.x0 && point.x <= rect.x1 && point.y >= rect.y0 && point.y <= rect.y1
}

/// Separating-axis overlap test for axis-aligned rectangles. Touching edges
/// do not count as overlap.
pub fn rects_overlap(a: Rect, b: Rect) -> bool {
    a.x0 < b.x1 && a.x1 > b.x0 && a.y0 < b.y1 && a.y1 > b.y0
}

/// Topmost image under `point` (last in z-order wins).
pub fn topmost_image_at(point: Point, images: &[CanvasImage]) -> Option<&CanvasImage> {
    images
        .iter()
        .rev()
        .find(|image| rect_contains(image.bounds(), point))
}

/// Topmost note under `point`.
pub fn topmost_note_at(point: Point, notes: &[CanvasNote]) -> Option<&CanvasNote> {
    notes
        .iter()
        .rev()
        .find(|note| rect_contains(note.bounds(), point))
}

/// Square of side `size` centered on `center`.
pub fn handle_rect(center: Point, size: f64) -> Rect {
    Rect::from_center_size(center, (size, size))
}

/// Which crop handle (if any) `point` hits.
///
/// `point` is in world space, `crop` is in the image's local space with
/// `image_origin` as its world origin. `handle_size_px` is a screen size and
/// is divided by `scale`. Resize handles win over the interior.
pub fn crop_handle_at(
    point: Point,
    image_origin: Point,
    crop: Rect,
    scale: f64,
    handle_size_px: f64,
) -> Option<CropHandle> {
    let world_crop = crop + image_origin.to_vec2();
    let size = handle_size_px / scale;

    CropHandle::RESIZE
        .into_iter()
        .find(|handle| rect_contains(handle_rect(handle.position(world_crop), size), point))
        .or_else(|| rect_contains(world_crop, point).then_some(CropHandle::Move))
}

/// Whether `point` hits the bottom-right resize handle of `note`.
pub fn note_resize_handle_hit(note: &CanvasNote, point: Point, scale: f64, handle_size_px: f64) -> bool {
    let bounds = note.bounds();
    let corner = Point::new(bounds.x1, bounds.y1);
    rect_contains(handle_rect(corner, handle_size_px / scale), point)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::tests::{image_at, note_at};

    #[test]
    fn test_topmost_image_wins() {
        let images = vec![image_at(0.0, 0.0, 100, 100), image_at(50.0, 50.0, 100, 100)];
        let hit = topmost_image_at(Point::new(75.0, 75.0), &images).unwrap();
        assert_eq!(hit.id(), images[1].id());

        let hit = topmost_image_at(Point::new(10.0, 10.0), &images).unwrap();
        assert_eq!(hit.id(), images[0].id());

        assert!(topmost_image_at(Point::new(500.0, 500.0), &images).is_none());
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let images = vec![image_at(0.0, 0.0, 100, 100)];
        assert!(topmost_image_at(Point::new(100.0, 100.0), &images).is_some());
        assert!(topmost_image_at(Point::new(0.0, 0.0), &images).is_some());

        let notes = vec![note_at(0.0, 0.0)];
        assert!(topmost_note_at(Point::new(100.0, 80.0), &notes).is_some());
    }

    #[test]
    fn test_rects_overlap() {
        let a = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert!(rects_overlap(a, Rect::new(50.0, 50.0, 150.0, 150.0)));
        assert!(!rects_overlap(a, Rect::new(100.0, 0.0, 200.0, 100.0)));
        assert!(!rects_overlap(a, Rect::new(0.0, 120.0, 100.0, 200.0)));
    }

    #[test]
    fn test_crop_handles_take_priority() {
        let origin = Point::new(100.0, 100.0);
        let crop = Rect::new(0.0, 0.0, 200.0, 100.0);

        let hit = crop_handle_at(Point::new(102.0, 101.0), origin, crop, 1.0, 10.0);
        assert_eq!(hit, Some(CropHandle::Corner(Corner::TopLeft)));

        let hit = crop_handle_at(Point::new(300.0, 150.0), origin, crop, 1.0, 10.0);
        assert_eq!(hit, Some(CropHandle::Edge(Edge::Right)));

        let hit = crop_handle_at(Point::new(150.0, 130.0), origin, crop, 1.0, 10.0);
        assert_eq!(hit, Some(CropHandle::Move));

        assert_eq!(crop_handle_at(Point::new(0.0, 0.0), origin, crop, 1.0, 10.0), None);
    }

    #[test]
    fn test_crop_handle_size_scales_with_zoom() {
        let crop = Rect::new(0.0, 0.0, 200.0, 100.0);
        // 10px handle at zoom 0.5 spans 20 world units.
        let hit = crop_handle_at(Point::new(-8.0, -8.0), Point::ZERO, crop, 0.5, 10.0);
        assert_eq!(hit, Some(CropHandle::Corner(Corner::TopLeft)));
        let hit = crop_handle_at(Point::new(-8.0, -8.0), Point::ZERO, crop, 2.0, 10.0);
        assert_eq!(hit, None);
    }

    #[test]
    fn test_note_resize_handle() {
        let note = note_at(0.0, 0.0);
        assert!(note_resize_handle_hit(&note, Point::new(99.0, 79.0), 1.0, 14.0));
        assert!(!note_resize_handle_hit(&note, Point::new(50.0, 40.0), 1.0, 14.0));
    }
}
