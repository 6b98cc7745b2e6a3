//! DriftCanvas Render Library
//!
//! Renderer abstraction and a CPU implementation built on tiny-skia, plus the
//! offscreen rasterization (masks, annotations, composites) used when
//! preparing generation requests.

pub mod raster;
mod renderer;
mod skia;
pub mod text;

pub use raster::{Layer, build_annotation, build_mask, composite, mask_has_coverage};
pub use renderer::{RenderContext, RenderResult, Renderer, RendererError};
pub use skia::{SkiaRenderer, crop_dim_rects, note_lines, visible_note_lines};
pub use text::{FixedAdvance, TextMeasure, wrap_text};
