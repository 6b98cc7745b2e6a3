//! Bounded undo/redo history over full scene snapshots.

use crate::scene::{ObjectId, PathTool, Scene};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Default maximum number of snapshots kept.
pub const DEFAULT_CAPACITY: usize = 30;

/// Cheap structural fingerprint of a scene used to skip no-op pushes.
///
/// Geometry is rounded to whole world units. Images also carry their content
/// revision so an in-place pixel replacement is never mistaken for a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SceneSignature {
    images: Vec<(ObjectId, [i64; 4], u64)>,
    notes: Vec<(ObjectId, [i64; 4], usize, u64)>,
    paths: Vec<(usize, PathTool)>,
}

fn rounded(x: f64, y: f64, w: f64, h: f64) -> [i64; 4] {
    [x.round() as i64, y.round() as i64, w.round() as i64, h.round() as i64]
}

impl SceneSignature {
    pub fn of(scene: &Scene) -> Self {
        Self {
            images: scene
                .images
                .iter()
                .map(|image| {
                    let geometry = rounded(image.position.x, image.position.y, image.width, image.height);
                    (image.id(), geometry, image.revision())
                })
                .collect(),
            notes: scene
                .notes
                .iter()
                .map(|note| {
                    let geometry = rounded(note.position.x, note.position.y, note.width, note.height);
                    let mut hasher = DefaultHasher::new();
                    note.text.hash(&mut hasher);
                    note.background.to_hex().hash(&mut hasher);
                    (note.id(), geometry, note.text.len(), hasher.finish())
                })
                .collect(),
            paths: scene.paths.iter().map(|path| (path.len(), path.tool)).collect(),
        }
    }
}

/// Undo/redo history: a list of snapshots plus the index of the current one.
///
/// The index always points at a valid entry; the list is never empty.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<Scene>,
    index: usize,
    capacity: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(Scene::default(), DEFAULT_CAPACITY)
    }
}

impl History {
    /// History holding a single `initial` entry.
    pub fn new(initial: Scene, capacity: usize) -> Self {
        Self {
            entries: vec![initial],
            index: 0,
            capacity: capacity.max(1),
        }
    }

    /// The committed scene.
    pub fn current(&self) -> &Scene {
        &self.entries[self.index]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.entries.len()
    }

    /// Append `scene` as the new current entry.
    ///
    /// Returns `false` (and changes nothing) when `scene` has the same
    /// signature as the current entry. Otherwise drops any redo future,
    /// appends, and trims the oldest entries beyond capacity.
    pub fn push(&mut self, scene: Scene) -> bool {
        if SceneSignature::of(&scene) == SceneSignature::of(self.current()) {
            log::debug!("history push skipped: unchanged scene");
            return false;
        }

        self.entries.truncate(self.index + 1);
        self.entries.push(scene);
        self.index = self.entries.len() - 1;

        if self.entries.len() > self.capacity {
            let overflow = self.entries.len() - self.capacity;
            self.entries.drain(..overflow);
            self.index -= overflow;
        }

        log::debug!("history push: {} of {}", self.index + 1, self.entries.len());
        true
    }

    /// Step back one entry. Returns whether the index moved.
    pub fn undo(&mut self) -> bool {
        if !self.can_undo() {
            return false;
        }
        self.index -= 1;
        true
    }

    /// Step forward one entry. Returns whether the index moved.
    pub fn redo(&mut self) -> bool {
        if !self.can_redo() {
            return false;
        }
        self.index += 1;
        true
    }

    /// Replace the whole history with a single entry.
    pub fn reset(&mut self, scene: Scene) {
        self.entries = vec![scene];
        self.index = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::tests::{image_at, note_at, solid};
    use kurbo::{Point, Vec2};
    use std::collections::HashSet;

    fn scenes(n: usize) -> Vec<Scene> {
        (0..n)
            .map(|i| Scene::new().with_images([image_at(i as f64 * 10.0, 0.0, 4, 4)]))
            .collect()
    }

    #[test]
    fn test_undo_redo_inverse() {
        let mut history = History::default();
        let before = history.current().clone();
        let after = before.with_note(note_at(0.0, 0.0));

        assert!(history.push(after.clone()));
        assert!(history.undo());
        assert_eq!(SceneSignature::of(history.current()), SceneSignature::of(&before));
        assert!(history.redo());
        assert_eq!(SceneSignature::of(history.current()), SceneSignature::of(&after));
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let capacity = 5;
        let mut history = History::new(Scene::new(), capacity);
        let pushed = scenes(capacity + 5);
        for scene in &pushed {
            assert!(history.push(scene.clone()));
        }
        assert_eq!(history.len(), capacity);
        assert_eq!(history.index(), capacity - 1);

        while history.undo() {}
        // The oldest reachable entry is the sixth pushed scene.
        assert_eq!(
            SceneSignature::of(history.current()),
            SceneSignature::of(&pushed[5])
        );
    }

    #[test]
    fn test_duplicate_push_is_noop() {
        let mut history = History::default();
        let scene = Scene::new().with_note(note_at(0.0, 0.0));
        assert!(history.push(scene.clone()));
        assert!(!history.push(scene.clone()));
        assert_eq!(history.len(), 2);

        // Sub-unit jitter rounds to the same signature.
        let id = scene.notes[0].id();
        let nudged = scene.translated(&HashSet::from([id]), Vec2::new(0.2, 0.0));
        assert!(!history.push(nudged));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_push_truncates_redo_future() {
        let mut history = History::default();
        let [a, b, c]: [Scene; 3] = scenes(3).try_into().unwrap();
        history.push(a);
        history.push(b);
        history.undo();
        assert!(history.can_redo());
        history.push(c.clone());
        assert!(!history.can_redo());
        assert_eq!(SceneSignature::of(history.current()), SceneSignature::of(&c));
    }

    #[test]
    fn test_pixel_replacement_is_not_deduplicated() {
        let mut history = History::default();
        let scene = Scene::new().with_images([image_at(0.0, 0.0, 4, 4)]);
        history.push(scene.clone());
        let replaced = scene.images[0].with_content(solid(4, 4));
        assert!(history.push(scene.replace_image(replaced)));
    }

    #[test]
    fn test_undo_redo_bounds() {
        let mut history = History::default();
        assert!(!history.undo());
        assert!(!history.redo());
        history.reset(Scene::new().with_note(note_at(1.0, 1.0)));
        assert_eq!(history.len(), 1);
        assert_eq!(history.index(), 0);
        assert_eq!(history.current().notes[0].position, Point::new(1.0, 1.0));
    }
}
