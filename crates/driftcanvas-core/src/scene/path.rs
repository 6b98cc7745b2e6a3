//! Freehand strokes drawn over the canvas.

use super::SerializableColor;
use kurbo::{BezPath, Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Composite behavior of a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathTool {
    /// Plain additive stroke.
    Brush,
    /// Removes earlier strokes where it passes.
    Erase,
    /// Drawn onto a copy of the source image to cue an edit.
    Annotate,
    /// Painted into a white-on-black inpaint mask.
    Inpaint,
}

impl PathTool {
    /// Whether this stroke removes rather than adds.
    pub fn is_erase(self) -> bool {
        matches!(self, PathTool::Erase)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PathTool::Brush => "brush",
            PathTool::Erase => "erase",
            PathTool::Annotate => "annotate",
            PathTool::Inpaint => "inpaint",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "brush" => Some(PathTool::Brush),
            "erase" | "eraser" => Some(PathTool::Erase),
            "annotate" => Some(PathTool::Annotate),
            "inpaint" => Some(PathTool::Inpaint),
            _ => None,
        }
    }
}

/// A freehand stroke in world space.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    /// Points in drawing order.
    pub points: Vec<Point>,
    pub color: SerializableColor,
    /// Stroke width in world units.
    pub width: f64,
    pub tool: PathTool,
}

impl Path {
    /// Start a stroke at `start`. Erase strokes are always fully opaque.
    pub fn begin(start: Point, color: SerializableColor, width: f64, tool: PathTool) -> Self {
        let color = if tool.is_erase() { color.opaque() } else { color };
        Self {
            points: vec![start],
            color,
            width,
            tool,
        }
    }

    pub fn add_point(&mut self, point: Point) {
        self.points.push(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Color used when compositing; erase strokes ignore declared alpha.
    pub fn effective_color(&self) -> SerializableColor {
        if self.tool.is_erase() {
            self.color.opaque()
        } else {
            self.color
        }
    }

    /// Copy with every point moved by `delta` and scaled by `scale`
    /// (`p' = (p + delta) * scale`). Width scales by the mean of both axes.
    pub fn mapped(&self, delta: Vec2, scale: Vec2) -> Self {
        Self {
            points: self
                .points
                .iter()
                .map(|p| Point::new((p.x + delta.x) * scale.x, (p.y + delta.y) * scale.y))
                .collect(),
            width: self.width * (scale.x + scale.y) / 2.0,
            ..self.clone()
        }
    }

    /// Bounds of the points, without stroke width.
    pub fn bounds(&self) -> Rect {
        let Some(first) = self.points.first() else {
            return Rect::ZERO;
        };
        self.points
            .iter()
            .skip(1)
            .fold(Rect::from_points(*first, *first), |acc, p| acc.union_pt(*p))
    }

    /// Polyline through the points.
    pub fn to_bez_path(&self) -> BezPath {
        let mut path = BezPath::new();
        let Some(first) = self.points.first() else {
            return path;
        };
        path.move_to(*first);
        for point in self.points.iter().skip(1) {
            path.line_to(*point);
        }
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_erase_is_opaque() {
        let path = Path::begin(
            Point::ZERO,
            SerializableColor::new(10, 10, 10, 40),
            4.0,
            PathTool::Erase,
        );
        assert_eq!(path.color.a, 255);
        assert_eq!(path.effective_color().a, 255);
    }

    #[test]
    fn test_bounds() {
        let mut path = Path::begin(Point::new(0.0, 0.0), SerializableColor::black(), 2.0, PathTool::Brush);
        path.add_point(Point::new(100.0, 50.0));
        path.add_point(Point::new(50.0, 100.0));
        let bounds = path.bounds();
        assert!((bounds.x1 - 100.0).abs() < f64::EPSILON);
        assert!((bounds.y1 - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_mapped_into_local_space() {
        let mut path = Path::begin(Point::new(110.0, 220.0), SerializableColor::black(), 4.0, PathTool::Inpaint);
        path.add_point(Point::new(120.0, 230.0));
        let local = path.mapped(Vec2::new(-100.0, -200.0), Vec2::new(2.0, 2.0));
        assert_eq!(local.points[0], Point::new(20.0, 40.0));
        assert_eq!(local.points[1], Point::new(40.0, 60.0));
        assert!((local.width - 8.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_tool_parse() {
        assert_eq!(PathTool::parse("INPAINT"), Some(PathTool::Inpaint));
        assert_eq!(PathTool::parse("eraser"), Some(PathTool::Erase));
        assert_eq!(PathTool::parse("smudge"), None);
    }
}
