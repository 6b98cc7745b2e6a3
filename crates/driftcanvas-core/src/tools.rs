//! Tools, edit modes and brush settings.

use crate::scene::{PathTool, SerializableColor};
use serde::{Deserialize, Serialize};

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ToolKind {
    #[default]
    Selection,
    /// Selection that pans when the press misses every object.
    FreeSelection,
    Pan,
    Brush,
    Erase,
    Note,
}

impl ToolKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ToolKind::Selection => "selection",
            ToolKind::FreeSelection => "freeSelection",
            ToolKind::Pan => "pan",
            ToolKind::Brush => "brush",
            ToolKind::Erase => "erase",
            ToolKind::Note => "note",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "selection" | "select" => Some(ToolKind::Selection),
            "freeSelection" => Some(ToolKind::FreeSelection),
            "pan" | "hand" => Some(ToolKind::Pan),
            "brush" => Some(ToolKind::Brush),
            "erase" | "eraser" => Some(ToolKind::Erase),
            "note" => Some(ToolKind::Note),
            _ => None,
        }
    }
}

/// What strokes drawn over the selected image are for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EditMode {
    /// Plain canvas; brush strokes are not allowed.
    #[default]
    None,
    /// Strokes are drawn onto a copy of the image as visual cues.
    Annotate,
    /// Strokes form a white-on-black regeneration mask.
    Inpaint,
}

impl EditMode {
    pub fn as_str(self) -> &'static str {
        match self {
            EditMode::None => "none",
            EditMode::Annotate => "annotate",
            EditMode::Inpaint => "inpaint",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "none" | "" => Some(EditMode::None),
            "annotate" | "annotation" => Some(EditMode::Annotate),
            "inpaint" | "mask" => Some(EditMode::Inpaint),
            _ => None,
        }
    }
}

/// How closely the provider should stick to the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    #[default]
    Strict,
    Creative,
}

impl Strictness {
    pub fn as_str(self) -> &'static str {
        match self {
            Strictness::Strict => "strict",
            Strictness::Creative => "creative",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "strict" => Some(Strictness::Strict),
            "creative" => Some(Strictness::Creative),
            _ => None,
        }
    }
}

/// Brush parameters for new strokes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BrushSettings {
    /// Stroke width in screen pixels at the time of drawing.
    pub size: f64,
    pub color: SerializableColor,
}

impl Default for BrushSettings {
    fn default() -> Self {
        Self {
            size: 20.0,
            color: SerializableColor::new(255, 59, 48, 255),
        }
    }
}

/// Stroke kind for a press with `tool` in `mode`, or `None` if the tool does
/// not draw there. Erase always erases; brush depends on the edit mode.
pub fn resolve_stroke_tool(tool: ToolKind, mode: EditMode) -> Option<PathTool> {
    match (tool, mode) {
        (ToolKind::Erase, _) => Some(PathTool::Erase),
        (ToolKind::Brush, EditMode::Annotate) => Some(PathTool::Annotate),
        (ToolKind::Brush, EditMode::Inpaint) => Some(PathTool::Inpaint),
        (ToolKind::Brush, EditMode::None) => None,
        (
            ToolKind::Selection | ToolKind::FreeSelection | ToolKind::Pan | ToolKind::Note,
            _,
        ) => None,
    }
}
