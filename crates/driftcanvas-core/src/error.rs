//! Error taxonomy and the user-visible error slot.

use thiserror::Error;

/// Input problems caught before any mutation happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Select an image first")]
    NoImageSelected,
    #[error("Enter a prompt first")]
    EmptyPrompt,
    #[error("This tool is not available in the current mode")]
    WrongToolForMode,
    #[error("Paint over the region to regenerate first")]
    EmptyMask,
    #[error("No crop in progress")]
    NoCropSession,
}

/// All errors the canvas can surface to the user.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CanvasError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Could not read image {name}: {reason}")]
    Decode { name: String, reason: String },
    #[error("Could not encode image: {0}")]
    Encode(String),
    #[error("Generation failed: {0}")]
    Provider(String),
    #[error("Import failed: {0}")]
    Import(String),
}

/// Result type for canvas operations.
pub type CanvasResult<T> = Result<T, CanvasError>;

/// Holds the most recent user-visible error. Last error wins.
#[derive(Debug, Clone, Default)]
pub struct ErrorSlot {
    current: Option<CanvasError>,
}

impl ErrorSlot {
    /// Record an error, replacing any previous one.
    pub fn report(&mut self, error: CanvasError) {
        log::warn!("{error}");
        self.current = Some(error);
    }

    /// The error currently shown, if any.
    pub fn current(&self) -> Option<&CanvasError> {
        self.current.as_ref()
    }

    /// Message for display.
    pub fn message(&self) -> Option<String> {
        self.current.as_ref().map(ToString::to_string)
    }

    /// Clear the slot (user dismissed the message).
    pub fn dismiss(&mut self) {
        self.current = None;
    }
}
