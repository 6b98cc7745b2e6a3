//! Pointer interaction state machine.
//!
//! Pointer-down classifies the press into a [`Gesture`]; pointer-move updates
//! the live overlay from positions recorded at gesture start; pointer-up
//! commits. Middle-button panning is tracked separately so it never
//! interferes with a left-button gesture.

use crate::canvas::Canvas;
use crate::error::ValidationError;
use crate::geometry::{
    Corner, CropHandle, Edge, crop_handle_at, note_resize_handle_hit, topmost_image_at,
    topmost_note_at,
};
use crate::input::{ClickTracker, Modifiers, MouseButton, PointerEvent};
use crate::scene::{ObjectId, Path};
use crate::tools::{ToolKind, resolve_stroke_tool};
use kurbo::{Point, Rect, Size, Vec2};
use std::collections::HashMap;
use std::time::Instant;

/// Cursor the host should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cursor {
    #[default]
    Default,
    Grab,
    Grabbing,
    Move,
    Crosshair,
    Text,
    ResizeNwse,
    ResizeNesw,
    ResizeNs,
    ResizeEw,
}

impl Cursor {
    fn for_crop_handle(handle: CropHandle) -> Self {
        match handle {
            CropHandle::Move => Cursor::Move,
            CropHandle::Corner(Corner::TopLeft | Corner::BottomRight) => Cursor::ResizeNwse,
            CropHandle::Corner(Corner::TopRight | Corner::BottomLeft) => Cursor::ResizeNesw,
            CropHandle::Edge(Edge::Top | Edge::Bottom) => Cursor::ResizeNs,
            CropHandle::Edge(Edge::Left | Edge::Right) => Cursor::ResizeEw,
        }
    }
}

/// The left-button gesture in progress. Screen positions are in pixels.
#[derive(Debug, Clone, Default)]
pub enum Gesture {
    #[default]
    Idle,
    /// Camera offset follows `pointer - anchor`.
    Panning { anchor: Vec2 },
    MarqueeSelecting { start: Point, current: Point },
    /// Dragged objects and their positions at drag start.
    DraggingObjects {
        anchor: Point,
        origins: HashMap<ObjectId, Point>,
    },
    ResizingNote {
        id: ObjectId,
        anchor: Point,
        start: Size,
    },
    /// Drag state lives in the crop session.
    CroppingActive,
    Drawing { path: Path },
}

impl Gesture {
    pub fn is_idle(&self) -> bool {
        matches!(self, Gesture::Idle)
    }
}

/// Per-canvas pointer state.
#[derive(Debug, Clone, Default)]
pub struct InteractionState {
    gesture: Gesture,
    middle_pan: Option<Vec2>,
    clicks: ClickTracker,
    cursor: Cursor,
}

impl InteractionState {
    /// Drop the current gesture without committing.
    pub fn cancel(&mut self) {
        self.gesture = Gesture::Idle;
    }
}

impl Canvas {
    pub fn gesture(&self) -> &Gesture {
        &self.interaction.gesture
    }

    pub fn cursor(&self) -> Cursor {
        self.interaction.cursor
    }

    /// Whether a middle-button pan is in progress.
    pub fn is_middle_panning(&self) -> bool {
        self.interaction.middle_pan.is_some()
    }

    /// World-space marquee rectangle while marquee selecting.
    pub fn marquee_rect(&self) -> Option<Rect> {
        match self.interaction.gesture {
            Gesture::MarqueeSelecting { start, current } => Some(Rect::from_points(
                self.camera.screen_to_world(start),
                self.camera.screen_to_world(current),
            )),
            _ => None,
        }
    }

    /// Dispatch a raw pointer event.
    pub fn handle_pointer_event(&mut self, event: PointerEvent, now: Instant) {
        match event {
            PointerEvent::Down {
                position,
                button,
                modifiers,
            } => self.pointer_down(position, button, modifiers, now),
            PointerEvent::Move { position } => self.pointer_move(position),
            PointerEvent::Up { position, button } => self.pointer_up(position, button),
            PointerEvent::Scroll { position, delta } => self.scroll(position, delta),
        }
    }

    pub fn pointer_down(&mut self, screen: Point, button: MouseButton, modifiers: Modifiers, now: Instant) {
        match button {
            MouseButton::Middle => {
                self.interaction.middle_pan = Some(screen.to_vec2() - self.camera.offset);
                self.interaction.cursor = Cursor::Grabbing;
                return;
            }
            MouseButton::Right => return,
            MouseButton::Left => {}
        }
        if !self.interaction.gesture.is_idle() {
            return;
        }

        let world = self.camera.screen_to_world(screen);

        if self.crop.is_some() {
            self.press_crop(world);
            return;
        }

        if self.interaction.clicks.register(screen, now) && self.double_click(world) {
            return;
        }

        if let Some(editing) = self.editing_note {
            let on_edited = topmost_note_at(world, &self.document.scene().notes)
                .is_some_and(|note| note.id() == editing);
            if on_edited {
                return;
            }
            self.end_note_edit();
        }

        match self.tool {
            ToolKind::Note => {
                self.create_note(world);
            }
            ToolKind::Selection | ToolKind::FreeSelection => self.press_select(screen, world, modifiers),
            ToolKind::Pan => self.start_pan(screen),
            ToolKind::Brush | ToolKind::Erase => self.start_stroke(world),
        }
        log::debug!("gesture start: {:?}", std::mem::discriminant(&self.interaction.gesture));
    }

    pub fn pointer_move(&mut self, screen: Point) {
        if let Some(anchor) = self.interaction.middle_pan {
            self.camera.offset = screen.to_vec2() - anchor;
        }

        let world = self.camera.screen_to_world(screen);
        let zoom = self.camera.zoom;
        match &mut self.interaction.gesture {
            Gesture::Idle => {}
            Gesture::Panning { anchor } => {
                self.camera.offset = screen.to_vec2() - *anchor;
            }
            Gesture::MarqueeSelecting { current, .. } => *current = screen,
            Gesture::DraggingObjects { anchor, origins } => {
                let delta = (screen - *anchor) / zoom;
                let next = self.document.committed().with_objects_moved(origins, delta);
                self.document.set_live(next);
            }
            Gesture::ResizingNote { id, anchor, start } => {
                let delta = (screen - *anchor) / zoom;
                let size = Size::new(start.width + delta.x, start.height + delta.y);
                let next = self
                    .document
                    .committed()
                    .resize_note(*id, size, self.config.note_min_size);
                self.document.set_live(next);
            }
            Gesture::CroppingActive => {
                if let Some(session) = self.crop.as_mut() {
                    session.update_drag(world);
                }
            }
            Gesture::Drawing { path } => {
                path.add_point(world);
                let next = self.document.committed().with_path(path.clone());
                self.document.set_live(next);
            }
        }

        self.interaction.cursor = self.cursor_at(world);
    }

    pub fn pointer_up(&mut self, screen: Point, button: MouseButton) {
        match button {
            MouseButton::Middle => {
                self.interaction.middle_pan = None;
                let world = self.camera.screen_to_world(screen);
                self.interaction.cursor = self.cursor_at(world);
                return;
            }
            MouseButton::Right => return,
            MouseButton::Left => {}
        }

        match std::mem::take(&mut self.interaction.gesture) {
            Gesture::Idle | Gesture::Panning { .. } => {}
            Gesture::MarqueeSelecting { start, .. } => self.finish_marquee(start, screen),
            Gesture::DraggingObjects { .. } | Gesture::ResizingNote { .. } | Gesture::Drawing { .. } => {
                if self.document.commit() {
                    log::debug!("gesture committed");
                }
            }
            Gesture::CroppingActive => {
                if let Some(session) = self.crop.as_mut() {
                    session.end_drag();
                }
            }
        }

        let world = self.camera.screen_to_world(screen);
        self.interaction.cursor = self.cursor_at(world);
    }

    /// Wheel zoom around the pointer.
    pub fn scroll(&mut self, screen: Point, delta: Vec2) {
        if delta.y == 0.0 {
            return;
        }
        let factor = if delta.y < 0.0 {
            self.config.zoom_step
        } else {
            1.0 / self.config.zoom_step
        };
        self.camera.zoom_at(screen, factor);
    }

    /// Open text editing on the note under `world`. Returns whether one was hit.
    pub fn double_click(&mut self, world: Point) -> bool {
        let hit = topmost_note_at(world, &self.document.committed().notes).map(|note| note.id());
        match hit {
            Some(id) => self.begin_note_edit(id),
            None => false,
        }
    }

    /// Abort the current gesture, discarding its live changes.
    pub fn cancel_gesture(&mut self) {
        if let Gesture::CroppingActive = self.interaction.gesture {
            if let Some(session) = self.crop.as_mut() {
                if let Some(drag) = session.drag {
                    session.rect = drag.start;
                }
                session.end_drag();
            }
        }
        if !self.interaction.gesture.is_idle() {
            self.document.discard_live();
        }
        self.interaction.cancel();
    }

    fn press_crop(&mut self, world: Point) {
        let zoom = self.camera.zoom;
        let handle_px = self.config.handle_size_px;
        let Some(session) = self.crop.as_mut() else {
            return;
        };
        let Some(image) = self.document.committed().image(session.image_id) else {
            self.crop = None;
            return;
        };
        if let Some(handle) = crop_handle_at(world, image.position, session.rect, zoom, handle_px) {
            session.begin_drag(handle, world);
            self.interaction.gesture = Gesture::CroppingActive;
        }
    }

    fn press_select(&mut self, screen: Point, world: Point, modifiers: Modifiers) {
        let scene = self.document.committed();

        if let Some(note) = self.selection.single_note().and_then(|id| scene.note(id)) {
            if note_resize_handle_hit(note, world, self.camera.zoom, self.config.note_handle_size_px) {
                self.interaction.gesture = Gesture::ResizingNote {
                    id: note.id(),
                    anchor: screen,
                    start: Size::new(note.width, note.height),
                };
                return;
            }
        }

        let hit_note = topmost_note_at(world, &scene.notes).map(|note| note.id());
        let hit_image = topmost_image_at(world, &scene.images).map(|image| image.id());

        match (hit_note, hit_image) {
            (Some(id), _) => {
                if modifiers.multi_select() {
                    self.selection.toggle_note(id);
                    return;
                }
                if !self.selection.contains(id) {
                    self.selection.select_note(id);
                }
                self.begin_drag(screen);
            }
            (None, Some(id)) => {
                if modifiers.multi_select() {
                    self.selection.toggle_image(id);
                    return;
                }
                if modifiers.reference() && self.selection.primary_image().is_some_and(|p| p != id) {
                    self.selection.toggle_reference(id, self.config.max_reference_images);
                    return;
                }
                if !self.selection.contains(id) {
                    self.selection.select_image(id);
                }
                self.begin_drag(screen);
            }
            (None, None) => {
                if modifiers.multi_select() {
                    self.interaction.gesture = Gesture::MarqueeSelecting {
                        start: screen,
                        current: screen,
                    };
                    return;
                }
                self.selection.clear();
                if self.tool == ToolKind::FreeSelection {
                    self.start_pan(screen);
                }
            }
        }
    }

    fn begin_drag(&mut self, screen: Point) {
        let scene = self.document.committed();
        let origins: HashMap<ObjectId, Point> = self
            .selection
            .images()
            .iter()
            .filter_map(|id| scene.image(*id).map(|image| (*id, image.position)))
            .chain(
                self.selection
                    .notes()
                    .iter()
                    .filter_map(|id| scene.note(*id).map(|note| (*id, note.position))),
            )
            .collect();
        self.interaction.gesture = Gesture::DraggingObjects {
            anchor: screen,
            origins,
        };
    }

    fn start_pan(&mut self, screen: Point) {
        self.interaction.gesture = Gesture::Panning {
            anchor: screen.to_vec2() - self.camera.offset,
        };
    }

    fn start_stroke(&mut self, world: Point) {
        let Some(tool) = resolve_stroke_tool(self.tool, self.edit_mode) else {
            self.report(ValidationError::WrongToolForMode);
            return;
        };
        // Width is stored in world units so the stroke looks the same at any zoom.
        let width = self.brush.size / self.camera.zoom;
        let path = Path::begin(world, self.brush.color, width, tool);
        let next = self.document.committed().with_path(path.clone());
        self.document.set_live(next);
        self.interaction.gesture = Gesture::Drawing { path };
    }

    fn finish_marquee(&mut self, start: Point, end: Point) {
        let extent = end - start;
        let threshold = self.config.marquee_threshold_px;
        if extent.x.abs() <= threshold && extent.y.abs() <= threshold {
            return;
        }
        let rect = Rect::from_points(
            self.camera.screen_to_world(start),
            self.camera.screen_to_world(end),
        );
        let scene = self.document.committed();
        let images = scene.images_in_rect(rect);
        let notes = scene.notes_in_rect(rect);
        log::debug!("marquee selected {} image(s), {} note(s)", images.len(), notes.len());
        self.selection.set_marquee(images, notes);
    }

    fn cursor_at(&self, world: Point) -> Cursor {
        if self.interaction.middle_pan.is_some() {
            return Cursor::Grabbing;
        }
        match &self.interaction.gesture {
            Gesture::Panning { .. } | Gesture::DraggingObjects { .. } => return Cursor::Grabbing,
            Gesture::ResizingNote { .. } => return Cursor::ResizeNwse,
            Gesture::MarqueeSelecting { .. } | Gesture::Drawing { .. } => return Cursor::Crosshair,
            Gesture::CroppingActive => {
                let handle = self.crop.as_ref().and_then(|s| s.drag).map(|d| d.handle);
                return handle.map(Cursor::for_crop_handle).unwrap_or_default();
            }
            Gesture::Idle => {}
        }

        let scene = self.document.scene();
        if let Some(session) = &self.crop {
            return scene
                .image(session.image_id)
                .and_then(|image| {
                    crop_handle_at(
                        world,
                        image.position,
                        session.rect,
                        self.camera.zoom,
                        self.config.handle_size_px,
                    )
                })
                .map(Cursor::for_crop_handle)
                .unwrap_or_default();
        }

        match self.tool {
            ToolKind::Pan => Cursor::Grab,
            ToolKind::Brush | ToolKind::Erase => Cursor::Crosshair,
            ToolKind::Note => Cursor::Text,
            ToolKind::Selection | ToolKind::FreeSelection => {
                let on_handle = self
                    .selection
                    .single_note()
                    .and_then(|id| scene.note(id))
                    .is_some_and(|note| {
                        note_resize_handle_hit(note, world, self.camera.zoom, self.config.note_handle_size_px)
                    });
                if on_handle {
                    Cursor::ResizeNwse
                } else if topmost_note_at(world, &scene.notes).is_some()
                    || topmost_image_at(world, &scene.images).is_some()
                {
                    Cursor::Move
                } else if self.tool == ToolKind::FreeSelection {
                    Cursor::Grab
                } else {
                    Cursor::Default
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::tests::png_file;
    use crate::scene::tests::{image_at, note_at};
    use crate::scene::{PathTool, Scene};
    use crate::tools::EditMode;

    fn press(canvas: &mut Canvas, x: f64, y: f64, modifiers: Modifiers) {
        canvas.pointer_down(Point::new(x, y), MouseButton::Left, modifiers, Instant::now());
    }

    fn drag(canvas: &mut Canvas, from: (f64, f64), to: (f64, f64), modifiers: Modifiers) {
        press(canvas, from.0, from.1, modifiers);
        canvas.pointer_move(Point::new(to.0, to.1));
        canvas.pointer_up(Point::new(to.0, to.1), MouseButton::Left);
    }

    fn canvas_with(scene: Scene) -> Canvas {
        let mut canvas = Canvas::new();
        canvas.document.push(scene);
        canvas
    }

    #[test]
    fn test_drag_is_independent_of_move_count() {
        let image = image_at(0.0, 0.0, 100, 100);
        let id = image.id();
        let mut canvas = canvas_with(Scene::new().with_images([image]));
        canvas.camera.zoom = 2.0;

        press(&mut canvas, 20.0, 20.0, Modifiers::NONE);
        for step in 1..=17 {
            canvas.pointer_move(Point::new(20.0 + step as f64 * 3.7, 20.0 - step as f64));
        }
        canvas.pointer_move(Point::new(80.0, 0.0));
        canvas.pointer_up(Point::new(80.0, 0.0), MouseButton::Left);

        let position = canvas.scene().image(id).unwrap().position;
        assert!((position.x - 30.0).abs() < 1e-9);
        assert!((position.y + 10.0).abs() < 1e-9);
        assert!(canvas.document.live().is_none());
        assert_eq!(canvas.document.history().len(), 3);
    }

    #[test]
    fn test_live_overlay_only_during_drag() {
        let image = image_at(0.0, 0.0, 100, 100);
        let id = image.id();
        let mut canvas = canvas_with(Scene::new().with_images([image]));
        let len = canvas.document.history().len();

        press(&mut canvas, 10.0, 10.0, Modifiers::NONE);
        canvas.pointer_move(Point::new(60.0, 10.0));
        assert_eq!(canvas.document.history().len(), len);
        assert_eq!(canvas.scene().image(id).unwrap().position, Point::new(50.0, 0.0));
        assert_eq!(canvas.document.committed().image(id).unwrap().position, Point::ZERO);

        canvas.pointer_up(Point::new(60.0, 10.0), MouseButton::Left);
        assert_eq!(canvas.document.history().len(), len + 1);
    }

    #[test]
    fn test_group_drag_moves_whole_selection() {
        let (a, b) = (image_at(0.0, 0.0, 50, 50), image_at(100.0, 0.0, 50, 50));
        let (id_a, id_b) = (a.id(), b.id());
        let mut canvas = canvas_with(Scene::new().with_images([a, b]));
        canvas.selection.select_image(id_a);
        canvas.selection.toggle_image(id_b);

        drag(&mut canvas, (110.0, 10.0), (120.0, 30.0), Modifiers::NONE);
        assert_eq!(canvas.scene().image(id_a).unwrap().position, Point::new(10.0, 20.0));
        assert_eq!(canvas.scene().image(id_b).unwrap().position, Point::new(110.0, 20.0));
    }

    #[test]
    fn test_clicking_unselected_object_replaces_selection() {
        let (a, b) = (image_at(0.0, 0.0, 50, 50), image_at(100.0, 0.0, 50, 50));
        let (id_a, id_b) = (a.id(), b.id());
        let mut canvas = canvas_with(Scene::new().with_images([a, b]));
        canvas.selection.select_image(id_a);

        drag(&mut canvas, (110.0, 10.0), (120.0, 10.0), Modifiers::NONE);
        assert_eq!(canvas.selection.images(), &[id_b]);
        assert_eq!(canvas.scene().image(id_a).unwrap().position, Point::ZERO);
    }

    #[test]
    fn test_multi_select_toggle_does_not_drag() {
        let image = image_at(0.0, 0.0, 50, 50);
        let id = image.id();
        let mut canvas = canvas_with(Scene::new().with_images([image]));

        press(&mut canvas, 10.0, 10.0, Modifiers::SHIFT);
        assert!(canvas.gesture().is_idle());
        assert_eq!(canvas.selection.images(), &[id]);
        press(&mut canvas, 10.0, 10.0, Modifiers::SHIFT);
        assert!(canvas.selection.is_empty());
    }

    #[test]
    fn test_reference_modifier_toggles_reference() {
        let (a, b) = (image_at(0.0, 0.0, 50, 50), image_at(100.0, 0.0, 50, 50));
        let (id_a, id_b) = (a.id(), b.id());
        let mut canvas = canvas_with(Scene::new().with_images([a, b]));
        canvas.selection.select_image(id_a);

        press(&mut canvas, 110.0, 10.0, Modifiers::ALT);
        canvas.pointer_up(Point::new(110.0, 10.0), MouseButton::Left);
        assert_eq!(canvas.selection.primary_image(), Some(id_a));
        assert_eq!(canvas.selection.references(), &[id_b]);
    }

    #[test]
    fn test_notes_win_over_images() {
        let image = image_at(0.0, 0.0, 200, 200);
        let note = note_at(50.0, 50.0);
        let note_id = note.id();
        let mut canvas = canvas_with(Scene::new().with_images([image]).with_note(note));

        press(&mut canvas, 60.0, 60.0, Modifiers::NONE);
        assert_eq!(canvas.selection.notes(), &[note_id]);
        assert!(canvas.selection.images().is_empty());
    }

    #[test]
    fn test_marquee_selects_images_and_notes() {
        let (a, b, far) = (
            image_at(0.0, 0.0, 50, 50),
            image_at(100.0, 0.0, 50, 50),
            image_at(1000.0, 1000.0, 50, 50),
        );
        let note = note_at(0.0, 100.0);
        let (id_a, id_b, id_far, note_id) = (a.id(), b.id(), far.id(), note.id());
        let mut canvas = canvas_with(Scene::new().with_images([a, b, far]).with_note(note));
        canvas.selection.select_image(id_far);

        drag(&mut canvas, (-10.0, -10.0), (300.0, 300.0), Modifiers::SHIFT);
        assert_eq!(canvas.selection.images(), &[id_a, id_b]);
        assert_eq!(canvas.selection.notes(), &[note_id]);
    }

    #[test]
    fn test_tiny_marquee_is_ignored() {
        let image = image_at(0.0, 0.0, 50, 50);
        let id = image.id();
        let mut canvas = canvas_with(Scene::new().with_images([image]));
        canvas.selection.select_image(id);
        drag(&mut canvas, (-20.0, -20.0), (-17.0, -16.0), Modifiers::SHIFT);
        assert_eq!(canvas.selection.images(), &[id]);
    }

    #[test]
    fn test_click_on_empty_clears_and_free_selection_pans() {
        let image = image_at(0.0, 0.0, 50, 50);
        let id = image.id();
        let mut canvas = canvas_with(Scene::new().with_images([image]));
        canvas.selection.select_image(id);
        canvas.set_tool(ToolKind::FreeSelection);

        drag(&mut canvas, (500.0, 500.0), (520.0, 490.0), Modifiers::NONE);
        assert!(canvas.selection.is_empty());
        assert_eq!(canvas.camera.offset, Vec2::new(20.0, -10.0));
    }

    #[test]
    fn test_middle_pan_survives_left_drag() {
        let image = image_at(0.0, 0.0, 100, 100);
        let id = image.id();
        let mut canvas = canvas_with(Scene::new().with_images([image]));

        press(&mut canvas, 10.0, 10.0, Modifiers::NONE);
        canvas.pointer_down(Point::new(300.0, 300.0), MouseButton::Middle, Modifiers::NONE, Instant::now());
        canvas.pointer_up(Point::new(300.0, 300.0), MouseButton::Middle);
        assert!(matches!(canvas.gesture(), Gesture::DraggingObjects { .. }));

        canvas.pointer_move(Point::new(30.0, 10.0));
        canvas.pointer_up(Point::new(30.0, 10.0), MouseButton::Left);
        assert_eq!(canvas.scene().image(id).unwrap().position, Point::new(20.0, 0.0));

        canvas.pointer_down(Point::new(0.0, 0.0), MouseButton::Middle, Modifiers::NONE, Instant::now());
        canvas.pointer_move(Point::new(40.0, 25.0));
        canvas.pointer_up(Point::new(40.0, 25.0), MouseButton::Middle);
        assert_eq!(canvas.camera.offset, Vec2::new(40.0, 25.0));
        assert!(!canvas.is_middle_panning());
    }

    #[test]
    fn test_annotate_stroke_then_clear() {
        let mut canvas = Canvas::new();
        let ids = canvas.upload_files(&[png_file(100, 100, "a.png")]);
        canvas.set_edit_mode(EditMode::Annotate);
        canvas.set_tool(ToolKind::Brush);
        canvas.camera.zoom = 2.0;

        drag(&mut canvas, (10.0, 10.0), (50.0, 50.0), Modifiers::NONE);
        let paths = &canvas.scene().paths;
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].tool, PathTool::Annotate);
        assert_eq!(paths[0].len(), 2);
        assert!((paths[0].width - canvas.brush.size / 2.0).abs() < f64::EPSILON);

        assert!(canvas.clear_strokes());
        assert!(canvas.scene().paths.is_empty());
        assert_eq!(canvas.scene().images.len(), 1);
        assert!(canvas.scene().contains_image(ids[0]));
    }

    #[test]
    fn test_brush_outside_edit_mode_reports() {
        let mut canvas = Canvas::new();
        canvas.set_tool(ToolKind::Brush);
        press(&mut canvas, 10.0, 10.0, Modifiers::NONE);
        assert!(canvas.gesture().is_idle());
        assert_eq!(
            canvas.errors.current(),
            Some(&ValidationError::WrongToolForMode.into())
        );

        canvas.set_tool(ToolKind::Erase);
        drag(&mut canvas, (10.0, 10.0), (20.0, 20.0), Modifiers::NONE);
        assert_eq!(canvas.scene().paths[0].tool, PathTool::Erase);
    }

    #[test]
    fn test_note_tool_creates_and_edits() {
        let mut canvas = Canvas::new();
        canvas.set_tool(ToolKind::Note);
        press(&mut canvas, 300.0, 300.0, Modifiers::NONE);

        let note = canvas.scene().notes[0].clone();
        assert_eq!(note.position, Point::new(200.0, 220.0));
        assert_eq!(canvas.editing_note(), Some(note.id()));
        assert_eq!(canvas.selection.notes(), &[note.id()]);
        assert!(canvas.gesture().is_idle());
    }

    #[test]
    fn test_note_resize_floors_at_minimum() {
        let note = note_at(0.0, 0.0);
        let id = note.id();
        let mut canvas = canvas_with(Scene::new().with_note(note));
        canvas.selection.select_note(id);

        drag(&mut canvas, (100.0, 80.0), (0.0, 0.0), Modifiers::NONE);
        let resized = canvas.scene().note(id).unwrap();
        assert!((resized.width - 80.0).abs() < f64::EPSILON);
        assert!((resized.height - 60.0).abs() < f64::EPSILON);
        assert_eq!(resized.position, Point::ZERO);
    }

    #[test]
    fn test_double_click_opens_note_edit() {
        let note = note_at(0.0, 0.0);
        let id = note.id();
        let mut canvas = canvas_with(Scene::new().with_note(note));
        let t0 = Instant::now();

        canvas.pointer_down(Point::new(20.0, 20.0), MouseButton::Left, Modifiers::NONE, t0);
        canvas.pointer_up(Point::new(20.0, 20.0), MouseButton::Left);
        assert_eq!(canvas.editing_note(), None);

        canvas.pointer_down(
            Point::new(21.0, 20.0),
            MouseButton::Left,
            Modifiers::NONE,
            t0 + std::time::Duration::from_millis(100),
        );
        assert_eq!(canvas.editing_note(), Some(id));
        assert!(canvas.gesture().is_idle());
    }

    #[test]
    fn test_crop_session_suppresses_other_tools() {
        let mut canvas = Canvas::new();
        let ids = canvas.upload_files(&[png_file(200, 100, "a.png")]);
        canvas.begin_crop().unwrap();
        let len = canvas.document.history().len();

        drag(&mut canvas, (200.0, 100.0), (150.0, 60.0), Modifiers::NONE);
        let session = canvas.crop.as_ref().unwrap();
        assert_eq!(session.rect, Rect::new(0.0, 0.0, 150.0, 60.0));
        assert_eq!(canvas.document.history().len(), len);
        assert_eq!(canvas.scene().image(ids[0]).unwrap().position, Point::ZERO);

        // Outside the crop: nothing happens.
        drag(&mut canvas, (500.0, 500.0), (520.0, 520.0), Modifiers::NONE);
        assert_eq!(canvas.camera.offset, Vec2::ZERO);
    }

    #[test]
    fn test_cancel_gesture_discards_live() {
        let image = image_at(0.0, 0.0, 100, 100);
        let id = image.id();
        let mut canvas = canvas_with(Scene::new().with_images([image]));
        press(&mut canvas, 10.0, 10.0, Modifiers::NONE);
        canvas.pointer_move(Point::new(60.0, 60.0));
        canvas.cancel_gesture();
        canvas.pointer_up(Point::new(60.0, 60.0), MouseButton::Left);
        assert_eq!(canvas.scene().image(id).unwrap().position, Point::ZERO);
    }

    #[test]
    fn test_hover_cursor() {
        let image = image_at(0.0, 0.0, 100, 100);
        let mut canvas = canvas_with(Scene::new().with_images([image]));
        canvas.pointer_move(Point::new(50.0, 50.0));
        assert_eq!(canvas.cursor(), Cursor::Move);
        canvas.pointer_move(Point::new(500.0, 500.0));
        assert_eq!(canvas.cursor(), Cursor::Default);
        canvas.set_tool(ToolKind::Pan);
        canvas.pointer_move(Point::new(500.0, 501.0));
        assert_eq!(canvas.cursor(), Cursor::Grab);
    }

    #[test]
    fn test_undo_cancels_gesture() {
        let image = image_at(0.0, 0.0, 100, 100);
        let mut canvas = canvas_with(Scene::new().with_images([image]));
        press(&mut canvas, 10.0, 10.0, Modifiers::NONE);
        canvas.pointer_move(Point::new(40.0, 10.0));
        assert!(canvas.undo());
        assert!(canvas.gesture().is_idle());
        assert!(canvas.document.live().is_none());
        assert!(canvas.scene().images.is_empty());
    }
}
