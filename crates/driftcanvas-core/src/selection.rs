//! Selection state: selected images, selected notes and reference images.
//!
//! Image and note selection are exclusive for click selection. A marquee may
//! select both kinds at once.

use crate::scene::{ObjectId, Scene};
use std::collections::HashSet;

/// Current selection. The first id of each list is the primary one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    images: Vec<ObjectId>,
    notes: Vec<ObjectId>,
    references: Vec<ObjectId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn images(&self) -> &[ObjectId] {
        &self.images
    }

    pub fn notes(&self) -> &[ObjectId] {
        &self.notes
    }

    pub fn references(&self) -> &[ObjectId] {
        &self.references
    }

    /// The generation subject and crop target.
    pub fn primary_image(&self) -> Option<ObjectId> {
        self.images.first().copied()
    }

    pub fn primary_note(&self) -> Option<ObjectId> {
        self.notes.first().copied()
    }

    /// The note id if exactly one note (and nothing else) is selected.
    pub fn single_note(&self) -> Option<ObjectId> {
        (self.notes.len() == 1 && self.images.is_empty()).then(|| self.notes[0])
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty() && self.notes.is_empty()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.images.contains(&id) || self.notes.contains(&id)
    }

    pub fn is_reference(&self, id: ObjectId) -> bool {
        self.references.contains(&id)
    }

    /// Every selected image and note id.
    pub fn ids(&self) -> HashSet<ObjectId> {
        self.images.iter().chain(self.notes.iter()).copied().collect()
    }

    /// Replace the selection with one image.
    pub fn select_image(&mut self, id: ObjectId) {
        self.notes.clear();
        self.images = vec![id];
        self.references.retain(|r| *r != id);
    }

    /// Replace the selection with one note. Clears images and references.
    pub fn select_note(&mut self, id: ObjectId) {
        self.images.clear();
        self.references.clear();
        self.notes = vec![id];
    }

    /// Toggle an image in the multi-selection. Clears any note selection.
    pub fn toggle_image(&mut self, id: ObjectId) {
        self.notes.clear();
        if let Some(pos) = self.images.iter().position(|i| *i == id) {
            self.images.remove(pos);
        } else {
            self.images.push(id);
            self.references.retain(|r| *r != id);
        }
        if self.images.is_empty() {
            self.references.clear();
        }
    }

    /// Toggle a note in the multi-selection. Clears images and references.
    pub fn toggle_note(&mut self, id: ObjectId) {
        self.images.clear();
        self.references.clear();
        if let Some(pos) = self.notes.iter().position(|n| *n == id) {
            self.notes.remove(pos);
        } else {
            self.notes.push(id);
        }
    }

    /// Toggle `id` in the reference set. Only applies while a primary image
    /// exists and `id` is not that primary; adding is refused once `max`
    /// references are held. Returns whether the set changed.
    pub fn toggle_reference(&mut self, id: ObjectId, max: usize) -> bool {
        match self.primary_image() {
            Some(primary) if primary != id => {}
            _ => return false,
        }
        if let Some(pos) = self.references.iter().position(|r| *r == id) {
            self.references.remove(pos);
            return true;
        }
        if self.references.len() >= max {
            return false;
        }
        self.images.retain(|i| *i != id);
        self.references.push(id);
        true
    }

    /// Replace the selection with the result of a marquee.
    pub fn set_marquee(&mut self, images: Vec<ObjectId>, notes: Vec<ObjectId>) {
        self.images = images;
        self.notes = notes;
        self.references.clear();
    }

    /// Restore a selection wholesale (snapshot import). Images and notes may
    /// coexist, as after a marquee; references need a primary image.
    pub fn restore(&mut self, images: Vec<ObjectId>, notes: Vec<ObjectId>, mut references: Vec<ObjectId>) {
        references.retain(|id| !images.contains(id));
        if images.is_empty() {
            references.clear();
        }
        self.images = images;
        self.notes = notes;
        self.references = references;
    }

    pub fn clear(&mut self) {
        self.images.clear();
        self.notes.clear();
        self.references.clear();
    }

    /// Drop ids that no longer exist in `scene`.
    pub fn retain_existing(&mut self, scene: &Scene) {
        self.images.retain(|id| scene.contains_image(*id));
        self.notes.retain(|id| scene.contains_note(*id));
        self.references.retain(|id| scene.contains_image(*id));
        if self.images.is_empty() {
            self.references.clear();
        }
    }
}
