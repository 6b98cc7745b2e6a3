//! Pointer and keyboard input types, plus double-click detection.

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub const SHIFT: Self = Self {
        shift: true,
        ..Self::NONE
    };

    pub const ALT: Self = Self {
        alt: true,
        ..Self::NONE
    };

    pub const CTRL: Self = Self {
        ctrl: true,
        ..Self::NONE
    };

    /// Ctrl on Linux/Windows, Cmd on macOS.
    pub fn platform(&self) -> bool {
        self.ctrl || self.meta
    }

    /// Modifier that toggles membership in a multi-selection.
    pub fn multi_select(&self) -> bool {
        self.shift
    }

    /// Modifier that toggles the reference-image set.
    pub fn reference(&self) -> bool {
        self.alt
    }
}

/// Pointer event in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down {
        position: Point,
        button: MouseButton,
        modifiers: Modifiers,
    },
    Up {
        position: Point,
        button: MouseButton,
    },
    Move {
        position: Point,
    },
    Scroll {
        position: Point,
        delta: Vec2,
    },
}

/// A key press. `key` is the logical key name (`"a"`, `"Escape"`, `"Delete"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPress {
    pub key: String,
    pub modifiers: Modifiers,
}

impl KeyPress {
    pub fn new(key: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            key: key.into(),
            modifiers,
        }
    }
}

const DOUBLE_CLICK_TIME: Duration = Duration::from_millis(500);
const DOUBLE_CLICK_DISTANCE: f64 = 5.0;

/// Detects double clicks from successive left-button presses.
#[derive(Debug, Clone, Default)]
pub struct ClickTracker {
    last_click: Option<(Instant, Point)>,
}

impl ClickTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a left-button press at `position`. Returns `true` if it
    /// completes a double click.
    pub fn register(&mut self, position: Point, now: Instant) -> bool {
        if let Some((last_time, last_pos)) = self.last_click {
            let elapsed = now.saturating_duration_since(last_time);
            if elapsed < DOUBLE_CLICK_TIME && position.distance(last_pos) < DOUBLE_CLICK_DISTANCE {
                // Reset so a triple click is not a second double click
                self.last_click = None;
                return true;
            }
        }
        self.last_click = Some((now, position));
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_click_within_window() {
        let mut tracker = ClickTracker::new();
        let t0 = Instant::now();
        assert!(!tracker.register(Point::new(10.0, 10.0), t0));
        assert!(tracker.register(Point::new(12.0, 11.0), t0 + Duration::from_millis(200)));
        // Third click starts a new sequence.
        assert!(!tracker.register(Point::new(12.0, 11.0), t0 + Duration::from_millis(300)));
    }

    #[test]
    fn test_slow_or_far_clicks_are_single() {
        let mut tracker = ClickTracker::new();
        let t0 = Instant::now();
        tracker.register(Point::ZERO, t0);
        assert!(!tracker.register(Point::ZERO, t0 + Duration::from_millis(600)));
        assert!(!tracker.register(Point::new(20.0, 0.0), t0 + Duration::from_millis(700)));
    }

    #[test]
    fn test_modifier_roles() {
        assert!(Modifiers::SHIFT.multi_select());
        assert!(Modifiers::ALT.reference());
        assert!(Modifiers::CTRL.platform());
        assert!(!Modifiers::NONE.platform());
    }
}
