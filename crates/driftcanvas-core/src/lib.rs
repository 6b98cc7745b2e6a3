//! DriftCanvas Core Library
//!
//! Platform-agnostic scene graph, history, hit-testing and interaction logic
//! for the DriftCanvas infinite image canvas.

pub mod camera;
pub mod canvas;
pub mod config;
pub mod crop;
pub mod error;
pub mod geometry;
pub mod history;
pub mod input;
pub mod interaction;
pub mod scene;
pub mod selection;
pub mod shortcuts;
pub mod snapshot;
pub mod tools;

pub use camera::Camera;
pub use canvas::{Canvas, CanvasDocument, IncomingFile};
pub use config::{CanvasConfig, GenerationSettings};
pub use crop::CropSession;
pub use error::{CanvasError, CanvasResult, ErrorSlot, ValidationError};
pub use geometry::{Corner, CropHandle, Edge};
pub use history::History;
pub use input::{KeyPress, Modifiers, MouseButton, PointerEvent};
pub use interaction::{Cursor, Gesture};
pub use scene::{CanvasImage, CanvasNote, ObjectId, Path, PathTool, Scene, SerializableColor, ZOrder};
pub use selection::Selection;
pub use shortcuts::{ShortcutAction, ShortcutRegistry};
pub use tools::{BrushSettings, EditMode, Strictness, ToolKind};
