//! Keyboard shortcut registry and dispatch.

use crate::canvas::Canvas;
use crate::input::KeyPress;
use crate::scene::ZOrder;
use crate::tools::ToolKind;

/// Something a shortcut does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShortcutAction {
    SelectTool(ToolKind),
    DeleteSelection,
    ZoomToFit,
    ZoomIn,
    ZoomOut,
    BringForward,
    SendBackward,
    Undo,
    Redo,
    /// Submit a generation request. Handled by the host.
    Submit,
    /// Exit crop, leave note editing, or cancel the current gesture.
    Cancel,
}

/// A keyboard shortcut definition.
#[derive(Debug, Clone)]
pub struct Shortcut {
    pub key: &'static str,
    /// Platform modifier (Ctrl, or Cmd on macOS).
    pub ctrl: bool,
    pub shift: bool,
    pub action: ShortcutAction,
    pub description: &'static str,
}

impl Shortcut {
    pub const fn new(
        key: &'static str,
        ctrl: bool,
        shift: bool,
        action: ShortcutAction,
        description: &'static str,
    ) -> Self {
        Self {
            key,
            ctrl,
            shift,
            action,
            description,
        }
    }

    /// Format the shortcut for display (e.g., "Ctrl+Z").
    pub fn format(&self) -> String {
        let mut parts = Vec::new();
        if self.ctrl {
            parts.push("Ctrl");
        }
        if self.shift {
            parts.push("Shift");
        }
        parts.push(self.key);
        parts.join("+")
    }

    /// Whether `press` triggers this shortcut. Shift only matters for
    /// chords with the platform modifier, so `+` works with or without it.
    pub fn matches(&self, press: &KeyPress) -> bool {
        if !self.key.eq_ignore_ascii_case(&press.key) {
            return false;
        }
        if self.ctrl != press.modifiers.platform() {
            return false;
        }
        !self.ctrl || self.shift == press.modifiers.shift
    }
}

/// Registry of all keyboard shortcuts.
pub struct ShortcutRegistry;

impl ShortcutRegistry {
    /// Get all registered shortcuts.
    pub fn all() -> Vec<Shortcut> {
        use ShortcutAction::*;
        vec![
            Shortcut::new("v", false, false, SelectTool(ToolKind::Selection), "Selection tool"),
            Shortcut::new("f", false, false, SelectTool(ToolKind::FreeSelection), "Free selection tool"),
            Shortcut::new("h", false, false, SelectTool(ToolKind::Pan), "Pan tool"),
            Shortcut::new("b", false, false, SelectTool(ToolKind::Brush), "Brush tool"),
            Shortcut::new("e", false, false, SelectTool(ToolKind::Erase), "Eraser tool"),
            Shortcut::new("n", false, false, SelectTool(ToolKind::Note), "Note tool"),
            Shortcut::new("Delete", false, false, DeleteSelection, "Delete selection"),
            Shortcut::new("Backspace", false, false, DeleteSelection, "Delete selection"),
            Shortcut::new(".", false, false, ZoomToFit, "Zoom to fit"),
            Shortcut::new("+", false, false, ZoomIn, "Zoom in"),
            Shortcut::new("=", false, false, ZoomIn, "Zoom in"),
            Shortcut::new("-", false, false, ZoomOut, "Zoom out"),
            Shortcut::new("]", false, false, BringForward, "Bring image forward"),
            Shortcut::new("[", false, false, SendBackward, "Send image backward"),
            Shortcut::new("Z", true, false, Undo, "Undo"),
            Shortcut::new("Z", true, true, Redo, "Redo"),
            Shortcut::new("Y", true, false, Redo, "Redo"),
            Shortcut::new("Enter", true, false, Submit, "Generate"),
            Shortcut::new("Escape", false, false, Cancel, "Cancel current action"),
        ]
    }

    /// Find the action bound to `press`.
    pub fn lookup(press: &KeyPress) -> Option<ShortcutAction> {
        Self::all()
            .into_iter()
            .find(|shortcut| shortcut.matches(press))
            .map(|shortcut| shortcut.action)
    }
}

impl Canvas {
    /// Handle a key press from the host.
    ///
    /// Returns the action that fired, if any. `Submit` is not executed here
    /// and must be handled by the caller. While a note is being edited only
    /// Escape is handled; every other key belongs to the text field.
    pub fn handle_key(&mut self, press: &KeyPress) -> Option<ShortcutAction> {
        let action = ShortcutRegistry::lookup(press)?;
        if self.editing_note.is_some() && action != ShortcutAction::Cancel {
            return None;
        }
        self.apply_shortcut(action);
        Some(action)
    }

    /// Execute a shortcut action. Returns whether anything changed.
    pub fn apply_shortcut(&mut self, action: ShortcutAction) -> bool {
        match action {
            ShortcutAction::SelectTool(tool) => {
                self.set_tool(tool);
                true
            }
            ShortcutAction::DeleteSelection => self.delete_selected(),
            ShortcutAction::ZoomToFit => {
                self.zoom_to_fit();
                true
            }
            ShortcutAction::ZoomIn => {
                self.zoom_in();
                true
            }
            ShortcutAction::ZoomOut => {
                self.zoom_out();
                true
            }
            ShortcutAction::BringForward => self.reorder_selected(ZOrder::Forward),
            ShortcutAction::SendBackward => self.reorder_selected(ZOrder::Backward),
            ShortcutAction::Undo => self.undo(),
            ShortcutAction::Redo => self.redo(),
            ShortcutAction::Submit => false,
            ShortcutAction::Cancel => {
                if self.crop.is_some() {
                    self.cancel_gesture();
                    self.cancel_crop();
                } else if self.editing_note.is_some() {
                    self.end_note_edit();
                } else {
                    self.cancel_gesture();
                }
                true
            }
        }
    }
}
