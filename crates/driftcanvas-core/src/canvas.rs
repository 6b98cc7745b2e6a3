//! Canvas document and runtime state.

use crate::camera::Camera;
use crate::config::{CanvasConfig, GenerationSettings};
use crate::crop::{CropSession, crop_image};
use crate::error::{CanvasError, CanvasResult, ErrorSlot, ValidationError};
use crate::history::History;
use crate::interaction::InteractionState;
use crate::scene::{
    CanvasImage, CanvasNote, DecodedImage, ObjectId, Scene, SerializableColor, ZOrder, decode_image,
};
use crate::selection::Selection;
use crate::tools::{BrushSettings, EditMode, ToolKind};
use kurbo::{Point, Size, Vec2};
use std::sync::Arc;

/// The committed scene history plus an optional live overlay.
///
/// The overlay shadows the committed scene while a gesture is in progress.
/// `commit` folds it into history; `discard_live` drops it.
#[derive(Debug, Clone, Default)]
pub struct CanvasDocument {
    history: History,
    live: Option<Scene>,
}

impl CanvasDocument {
    pub fn new(capacity: usize) -> Self {
        Self {
            history: History::new(Scene::default(), capacity),
            live: None,
        }
    }

    /// The scene to display and edit: the live overlay if present, otherwise
    /// the committed scene.
    pub fn scene(&self) -> &Scene {
        self.live.as_ref().unwrap_or_else(|| self.history.current())
    }

    /// The committed scene, ignoring any live overlay.
    pub fn committed(&self) -> &Scene {
        self.history.current()
    }

    pub fn live(&self) -> Option<&Scene> {
        self.live.as_ref()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Show `scene` without committing it.
    pub fn set_live(&mut self, scene: Scene) {
        self.live = Some(scene);
    }

    /// Drop the live overlay. Returns whether there was one.
    pub fn discard_live(&mut self) -> bool {
        self.live.take().is_some()
    }

    /// Push the live overlay into history. Returns whether history grew.
    pub fn commit(&mut self) -> bool {
        match self.live.take() {
            Some(scene) => self.history.push(scene),
            None => false,
        }
    }

    /// Commit `scene` directly, dropping any live overlay.
    pub fn push(&mut self, scene: Scene) -> bool {
        self.live = None;
        self.history.push(scene)
    }

    pub fn undo(&mut self) -> bool {
        self.live = None;
        self.history.undo()
    }

    pub fn redo(&mut self) -> bool {
        self.live = None;
        self.history.redo()
    }

    /// Replace the whole history with `scene`.
    pub fn reset(&mut self, scene: Scene) {
        self.live = None;
        self.history.reset(scene);
    }
}

/// An image file handed to the canvas by the host (upload, drop, paste).
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub bytes: Arc<[u8]>,
    pub name: String,
    pub mime: Option<String>,
}

impl IncomingFile {
    pub fn new(bytes: impl Into<Arc<[u8]>>, name: impl Into<String>, mime: Option<String>) -> Self {
        Self {
            bytes: bytes.into(),
            name: name.into(),
            mime,
        }
    }

    fn decode(&self) -> CanvasResult<DecodedImage> {
        decode_image(&self.bytes, &self.name, self.mime.as_deref())
    }
}

/// Runtime canvas state (not persisted).
#[derive(Debug, Clone)]
pub struct Canvas {
    /// Scene history and live overlay.
    pub document: CanvasDocument,
    pub camera: Camera,
    pub selection: Selection,
    pub tool: ToolKind,
    pub edit_mode: EditMode,
    pub brush: BrushSettings,
    /// Active crop session, if any. Never part of history.
    pub crop: Option<CropSession>,
    /// User-visible error slot.
    pub errors: ErrorSlot,
    pub config: CanvasConfig,
    pub settings: GenerationSettings,
    pub viewport_size: Size,
    pub(crate) editing_note: Option<ObjectId>,
    pub(crate) interaction: InteractionState,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

impl Canvas {
    /// Create a canvas with the default configuration.
    pub fn new() -> Self {
        Self::with_config(CanvasConfig::default())
    }

    pub fn with_config(config: CanvasConfig) -> Self {
        Self {
            document: CanvasDocument::new(config.history_capacity),
            camera: Camera::with_limits(config.min_zoom, config.max_zoom),
            selection: Selection::new(),
            tool: ToolKind::default(),
            edit_mode: EditMode::default(),
            brush: BrushSettings::default(),
            crop: None,
            errors: ErrorSlot::default(),
            config,
            settings: GenerationSettings::default(),
            viewport_size: Size::new(800.0, 600.0),
            editing_note: None,
            interaction: InteractionState::default(),
        }
    }

    /// The scene to display (live overlay or committed).
    pub fn scene(&self) -> &Scene {
        self.document.scene()
    }

    pub fn set_viewport_size(&mut self, width: f64, height: f64) {
        self.viewport_size = Size::new(width, height);
    }

    /// Record a user-visible error.
    pub fn report(&mut self, error: impl Into<CanvasError>) {
        self.errors.report(error.into());
    }

    pub fn set_tool(&mut self, tool: ToolKind) {
        if self.tool != tool {
            log::debug!("tool: {:?} -> {:?}", self.tool, tool);
        }
        self.tool = tool;
    }

    /// Switch the edit mode. Changing modes clears all strokes.
    pub fn set_edit_mode(&mut self, mode: EditMode) {
        if self.edit_mode == mode {
            return;
        }
        self.edit_mode = mode;
        self.clear_strokes();
    }

    /// Remove every stroke. Returns whether history changed.
    pub fn clear_strokes(&mut self) -> bool {
        let next = self.document.committed().with_paths(Vec::new());
        self.document.push(next)
    }

    /// Commit a new scene and drop selection ids it no longer contains.
    pub fn commit_scene(&mut self, scene: Scene) -> bool {
        let changed = self.document.push(scene);
        self.selection.retain_existing(self.document.committed());
        changed
    }

    /// Place decoded images left to right after the right-most image,
    /// replacing any strokes. The last placed image becomes the selection.
    pub fn add_images(&mut self, decoded: Vec<DecodedImage>) -> Vec<ObjectId> {
        if decoded.is_empty() {
            return Vec::new();
        }
        let gap = self.config.placement_gap;
        let mut scene = self.document.committed().with_paths(Vec::new());
        let mut ids = Vec::with_capacity(decoded.len());
        for image in decoded {
            let placed = CanvasImage::new(scene.next_upload_position(gap), image);
            ids.push(placed.id());
            scene = scene.with_images([placed]);
        }
        self.commit_scene(scene);
        if let Some(last) = ids.last() {
            self.selection.select_image(*last);
        }
        log::info!("added {} image(s)", ids.len());
        ids
    }

    /// Decode and place uploaded files. Files that fail to decode are
    /// reported and skipped.
    pub fn upload_files(&mut self, files: &[IncomingFile]) -> Vec<ObjectId> {
        let decoded = self.decode_all(files);
        self.add_images(decoded)
    }

    /// Decode dropped files and center them on the drop point, staggering
    /// each further file. Strokes are cleared.
    pub fn drop_files(&mut self, files: &[IncomingFile], screen: Point) -> Vec<ObjectId> {
        let decoded = self.decode_all(files);
        if decoded.is_empty() {
            return Vec::new();
        }
        let center = self.camera.screen_to_world(screen);
        let stagger = self.config.drop_stagger;
        let images: Vec<CanvasImage> = decoded
            .into_iter()
            .enumerate()
            .map(|(i, image)| {
                let offset = Vec2::new(
                    f64::from(image.width()) / 2.0,
                    f64::from(image.height()) / 2.0,
                );
                let step = stagger * i as f64;
                CanvasImage::new(center - offset + Vec2::new(step, step), image)
            })
            .collect();
        let ids: Vec<ObjectId> = images.iter().map(CanvasImage::id).collect();
        let next = self.document.committed().with_paths(Vec::new()).with_images(images);
        self.commit_scene(next);
        log::info!("dropped {} image(s)", ids.len());
        ids
    }

    fn decode_all(&mut self, files: &[IncomingFile]) -> Vec<DecodedImage> {
        let mut decoded = Vec::with_capacity(files.len());
        for file in files {
            match file.decode() {
                Ok(image) => decoded.push(image),
                Err(err) => self.report(err),
            }
        }
        decoded
    }

    /// Delete every selected image and note.
    pub fn delete_selected(&mut self) -> bool {
        let ids = self.selection.ids();
        if ids.is_empty() {
            return false;
        }
        let next = self.document.committed().without(&ids);
        if self.crop.as_ref().is_some_and(|c| ids.contains(&c.image_id)) {
            self.crop = None;
        }
        if self.editing_note.is_some_and(|id| ids.contains(&id)) {
            self.editing_note = None;
        }
        self.selection.clear();
        self.commit_scene(next)
    }

    /// Move the primary image one step in z-order.
    pub fn reorder_selected(&mut self, direction: ZOrder) -> bool {
        let Some(id) = self.selection.primary_image() else {
            return false;
        };
        let next = self.document.committed().reorder_image(id, direction);
        self.commit_scene(next)
    }

    /// Start cropping the primary image.
    pub fn begin_crop(&mut self) -> CanvasResult<()> {
        let image = self
            .selection
            .primary_image()
            .and_then(|id| self.document.committed().image(id))
            .ok_or(ValidationError::NoImageSelected)?;
        self.crop = Some(CropSession::new(image));
        Ok(())
    }

    /// Replace the cropped image with its cropped pixels.
    pub fn confirm_crop(&mut self) -> CanvasResult<()> {
        let session = self.crop.take().ok_or(ValidationError::NoCropSession)?;
        let Some(image) = self.document.committed().image(session.image_id) else {
            return Err(ValidationError::NoImageSelected.into());
        };
        let cropped = crop_image(image, session.rect)?;
        let next = self.document.committed().replace_image(cropped);
        self.commit_scene(next);
        Ok(())
    }

    pub fn cancel_crop(&mut self) {
        self.crop = None;
    }

    /// The note currently in text-edit focus.
    pub fn editing_note(&self) -> Option<ObjectId> {
        self.editing_note
    }

    /// Give text-edit focus to a note.
    pub fn begin_note_edit(&mut self, id: ObjectId) -> bool {
        if !self.document.committed().contains_note(id) {
            return false;
        }
        self.end_note_edit();
        self.selection.select_note(id);
        self.editing_note = Some(id);
        true
    }

    /// Replace the edited note's text in the live overlay.
    pub fn set_note_text(&mut self, text: &str) {
        if let Some(id) = self.editing_note {
            let next = self.document.committed().with_note_text(id, text);
            self.document.set_live(next);
        }
    }

    /// Leave text-edit focus, committing any text change.
    pub fn end_note_edit(&mut self) -> bool {
        if self.editing_note.take().is_none() {
            return false;
        }
        self.document.commit()
    }

    /// Create a note of the default size centered at `world` and focus it.
    pub fn create_note(&mut self, world: Point) -> ObjectId {
        let background = SerializableColor::from_hex(&self.config.note_default_color)
            .unwrap_or_else(SerializableColor::white);
        let note = CanvasNote::centered_at(world, self.config.note_default_size, background);
        let id = note.id();
        let next = self.document.committed().with_note(note);
        self.commit_scene(next);
        self.begin_note_edit(id);
        id
    }

    /// Change the background of every selected note.
    pub fn set_selected_notes_background(&mut self, color: SerializableColor) -> bool {
        let ids = self.selection.notes().to_vec();
        if ids.is_empty() {
            return false;
        }
        let next = ids.into_iter().fold(self.document.committed().clone(), |scene, id| {
            scene.with_note_background(id, color)
        });
        self.commit_scene(next)
    }

    pub fn undo(&mut self) -> bool {
        self.before_history_jump();
        let moved = self.document.undo();
        self.after_history_jump();
        moved
    }

    pub fn redo(&mut self) -> bool {
        self.before_history_jump();
        let moved = self.document.redo();
        self.after_history_jump();
        moved
    }

    fn before_history_jump(&mut self) {
        self.interaction.cancel();
        self.editing_note = None;
        self.document.discard_live();
    }

    fn after_history_jump(&mut self) {
        let scene = self.document.committed();
        self.selection.retain_existing(scene);
        if self.crop.as_ref().is_some_and(|c| !scene.contains_image(c.image_id)) {
            self.crop = None;
        }
    }

    /// Zoom by `factor` around the viewport center.
    pub fn zoom_by(&mut self, factor: f64) {
        let center = Point::new(self.viewport_size.width / 2.0, self.viewport_size.height / 2.0);
        self.camera.zoom_at(center, factor);
    }

    pub fn zoom_in(&mut self) {
        self.zoom_by(self.config.zoom_step);
    }

    pub fn zoom_out(&mut self) {
        self.zoom_by(1.0 / self.config.zoom_step);
    }

    /// Fit every image and note into the viewport.
    pub fn zoom_to_fit(&mut self) {
        match self.scene().bounds() {
            Some(bounds) => {
                self.camera
                    .fit_to_bounds(bounds, self.viewport_size, self.config.fit_padding_px)
            }
            None => self.camera.reset(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::scene::{Path, PathTool, encode_png};
    use crate::scene::tests::{image_at, note_at};
    use image::{Rgba, RgbaImage};

    pub(crate) fn png_file(width: u32, height: u32, name: &str) -> IncomingFile {
        let pixels = RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 255]));
        IncomingFile::new(encode_png(&pixels).unwrap(), name, Some("image/png".to_string()))
    }

    #[test]
    fn test_live_overlay_shadows_committed() {
        let mut document = CanvasDocument::default();
        let live = Scene::new().with_note(note_at(0.0, 0.0));
        document.set_live(live);
        assert_eq!(document.scene().notes.len(), 1);
        assert!(document.committed().notes.is_empty());

        assert!(document.commit());
        assert!(document.live().is_none());
        assert_eq!(document.committed().notes.len(), 1);
        assert!(!document.commit());
    }

    #[test]
    fn test_upload_placement() {
        let mut canvas = Canvas::new();
        let first = canvas.upload_files(&[png_file(800, 600, "a.png")]);
        let second = canvas.upload_files(&[png_file(800, 600, "b.png")]);

        let scene = canvas.scene();
        assert_eq!(scene.image(first[0]).unwrap().position, Point::ZERO);
        assert_eq!(scene.image(second[0]).unwrap().position, Point::new(820.0, 0.0));
        assert_eq!(canvas.selection.primary_image(), Some(second[0]));
    }

    #[test]
    fn test_bad_file_does_not_abort_drop() {
        let mut canvas = Canvas::new();
        let files = [
            png_file(10, 10, "ok.png"),
            IncomingFile::new(b"garbage".to_vec(), "bad.png", None),
            png_file(10, 10, "ok2.png"),
        ];
        let ids = canvas.drop_files(&files, Point::new(100.0, 100.0));
        assert_eq!(ids.len(), 2);
        assert!(matches!(canvas.errors.current(), Some(CanvasError::Decode { name, .. }) if name == "bad.png"));

        let scene = canvas.scene();
        assert_eq!(scene.image(ids[0]).unwrap().position, Point::new(95.0, 95.0));
        assert_eq!(scene.image(ids[1]).unwrap().position, Point::new(125.0, 125.0));
    }

    #[test]
    fn test_upload_clears_strokes() {
        let mut canvas = Canvas::new();
        let path = Path::begin(Point::ZERO, SerializableColor::black(), 2.0, PathTool::Annotate);
        let scene = canvas.document.committed().with_path(path);
        canvas.document.push(scene);
        canvas.upload_files(&[png_file(4, 4, "a.png")]);
        assert!(canvas.scene().paths.is_empty());
    }

    #[test]
    fn test_edit_mode_switch_clears_strokes_through_history() {
        let mut canvas = Canvas::new();
        let path = Path::begin(Point::ZERO, SerializableColor::black(), 2.0, PathTool::Inpaint);
        canvas.document.push(Scene::new().with_path(path));
        canvas.edit_mode = EditMode::Inpaint;

        canvas.set_edit_mode(EditMode::Annotate);
        assert!(canvas.scene().paths.is_empty());
        assert!(canvas.undo());
        assert_eq!(canvas.scene().paths.len(), 1);
    }

    #[test]
    fn test_delete_and_undo_restores() {
        let mut canvas = Canvas::new();
        let image = image_at(0.0, 0.0, 10, 10);
        let id = image.id();
        canvas.document.push(Scene::new().with_images([image]));
        canvas.selection.select_image(id);

        assert!(canvas.delete_selected());
        assert!(canvas.scene().images.is_empty());
        assert!(canvas.selection.is_empty());

        assert!(canvas.undo());
        assert!(canvas.scene().contains_image(id));
        assert!(canvas.redo());
        assert!(canvas.scene().images.is_empty());
    }

    #[test]
    fn test_undo_drops_stale_selection() {
        let mut canvas = Canvas::new();
        let ids = canvas.upload_files(&[png_file(4, 4, "a.png")]);
        assert_eq!(canvas.selection.primary_image(), Some(ids[0]));
        canvas.undo();
        assert!(canvas.selection.is_empty());
    }

    #[test]
    fn test_note_edit_commits_once() {
        let mut canvas = Canvas::new();
        let id = canvas.create_note(Point::new(100.0, 100.0));
        assert_eq!(canvas.editing_note(), Some(id));
        let len = canvas.document.history().len();

        canvas.set_note_text("h");
        canvas.set_note_text("hello");
        assert_eq!(canvas.document.history().len(), len);
        assert_eq!(canvas.scene().note(id).unwrap().text, "hello");

        assert!(canvas.end_note_edit());
        assert_eq!(canvas.document.history().len(), len + 1);
        assert_eq!(canvas.document.committed().note(id).unwrap().text, "hello");
    }

    #[test]
    fn test_crop_requires_selection_and_replaces_in_place() {
        let mut canvas = Canvas::new();
        assert_eq!(
            canvas.begin_crop(),
            Err(CanvasError::Validation(ValidationError::NoImageSelected))
        );
        assert_eq!(
            canvas.confirm_crop(),
            Err(CanvasError::Validation(ValidationError::NoCropSession))
        );

        let ids = canvas.upload_files(&[png_file(100, 100, "a.png"), png_file(10, 10, "b.png")]);
        canvas.selection.select_image(ids[0]);
        canvas.begin_crop().unwrap();
        if let Some(session) = canvas.crop.as_mut() {
            session.rect = kurbo::Rect::new(10.0, 10.0, 60.0, 40.0);
        }
        canvas.confirm_crop().unwrap();

        let scene = canvas.scene();
        assert_eq!(scene.images[0].id(), ids[0]);
        assert_eq!(scene.images[0].natural_width, 50);
        assert_eq!(scene.images[0].position, Point::new(10.0, 10.0));
        assert!(canvas.crop.is_none());
    }

    #[test]
    fn test_zoom_to_fit_empty_resets() {
        let mut canvas = Canvas::new();
        canvas.camera.zoom = 3.0;
        canvas.zoom_to_fit();
        assert!((canvas.camera.zoom - 1.0).abs() < f64::EPSILON);
    }
}
