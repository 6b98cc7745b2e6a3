//! Renderer trait abstraction.

use driftcanvas_core::canvas::Canvas;
use driftcanvas_core::scene::ObjectId;
use kurbo::{Rect, Size};
use peniko::Color;
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Invalid surface size {width}x{height}")]
    InvalidSurface { width: u32, height: u32 },
    #[error("Font load failed: {0}")]
    Font(String),
    #[error("Encode failed: {0}")]
    Encode(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Context for a single render frame.
pub struct RenderContext<'a> {
    /// The canvas to render.
    pub canvas: &'a Canvas,
    /// Viewport size in logical pixels.
    pub viewport_size: Size,
    /// Device pixel ratio (for HiDPI).
    pub scale_factor: f64,
    /// Background color.
    pub background_color: Color,
    /// Outline color of selected objects.
    pub selection_color: Color,
    /// Outline color of reference images.
    pub reference_color: Color,
    /// Selection rectangle (marquee) in world coordinates.
    pub selection_rect: Option<Rect>,
    /// Note whose text is being edited by the host; its text is not drawn.
    pub editing_note: Option<ObjectId>,
}

impl<'a> RenderContext<'a> {
    /// Create a new render context. Marquee and editing state are taken from
    /// the canvas.
    pub fn new(canvas: &'a Canvas, viewport_size: Size) -> Self {
        Self {
            canvas,
            viewport_size,
            scale_factor: 1.0,
            background_color: Color::from_rgba8(245, 245, 244, 255),
            selection_color: Color::from_rgba8(59, 130, 246, 255), // Blue
            reference_color: Color::from_rgba8(249, 115, 22, 255), // Orange
            selection_rect: canvas.marquee_rect(),
            editing_note: canvas.editing_note(),
        }
    }

    /// Set the scale factor for HiDPI.
    pub fn with_scale_factor(mut self, scale_factor: f64) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    /// Set the background color.
    pub fn with_background(mut self, color: Color) -> Self {
        self.background_color = color;
        self
    }

    /// Set the outline colors for selected and reference objects.
    pub fn with_selection_colors(mut self, selected: Color, reference: Color) -> Self {
        self.selection_color = selected;
        self.reference_color = reference;
        self
    }

    /// Override the selection rectangle.
    pub fn with_selection_rect(mut self, rect: Option<Rect>) -> Self {
        self.selection_rect = rect;
        self
    }

    /// Surface size in physical pixels.
    pub fn surface_size(&self) -> (u32, u32) {
        let width = (self.viewport_size.width * self.scale_factor).round().max(0.0) as u32;
        let height = (self.viewport_size.height * self.scale_factor).round().max(0.0) as u32;
        (width, height)
    }
}

/// Trait for rendering backends.
pub trait Renderer: Send {
    /// Draw one frame.
    fn build_scene(&mut self, ctx: &RenderContext) -> RenderResult<()>;

    /// Get the background color (for clearing).
    fn background_color(&self, ctx: &RenderContext) -> Color {
        ctx.background_color
    }
}
