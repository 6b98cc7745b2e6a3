//! Building provider requests from the canvas state.
//!
//! A request carries a single source raster. When a reference image overlaps
//! the primary image, the primary and all references are flattened into one
//! composite and sent without references. Strokes are mapped into the source
//! raster's pixel space before the mask or annotation is built.

use driftcanvas_core::canvas::Canvas;
use driftcanvas_core::error::{CanvasError, CanvasResult, ValidationError};
use driftcanvas_core::geometry::rects_overlap;
use driftcanvas_core::scene::{CanvasImage, ObjectId, Path, PathTool, encode_png};
use driftcanvas_core::tools::{EditMode, Strictness};
use driftcanvas_render::raster::{Layer, build_annotation, build_mask, composite, mask_has_coverage};
use image::RgbaImage;
use kurbo::{Point, Vec2};
use serde::Serialize;
use std::sync::Arc;

/// What the provider is asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RequestKind {
    /// Edit the source image following the prompt.
    Edit,
    /// Remove the background of the source image. The result replaces it.
    RemoveBackground,
}

/// How the edit region is communicated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EditRegion {
    /// No region; the whole image is fair game.
    Whole,
    /// White-on-black mask marks the region to regenerate.
    Mask,
    /// Strokes drawn onto a copy of the source cue the edit.
    Annotation,
}

/// One raster sent to the provider.
#[derive(Debug, Clone)]
pub struct InputImage {
    pub pixels: Arc<RgbaImage>,
    /// PNG encoding of `pixels`.
    pub png: Vec<u8>,
    pub name: String,
}

impl InputImage {
    fn encode(pixels: Arc<RgbaImage>, name: impl Into<String>) -> CanvasResult<Self> {
        let png = encode_png(&pixels)?;
        Ok(Self {
            pixels,
            png,
            name: name.into(),
        })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

/// Parameters sent alongside the images.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestParameters {
    pub kind: RequestKind,
    /// Prompt with the strictness instruction prepended.
    pub prompt: String,
    pub edit_region: EditRegion,
    pub strictness: Strictness,
    pub api_provider: String,
    pub model_id: String,
    pub image_size: String,
    pub aspect_ratio: String,
    pub num_images: u32,
}

/// A fully prepared generation request.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Image the results belong to.
    pub source_id: ObjectId,
    pub parameters: RequestParameters,
    pub source: InputImage,
    pub mask_or_annotation: Option<InputImage>,
    pub references: Vec<InputImage>,
    /// Whether overlapping references were flattened into `source`.
    pub composited: bool,
}

impl GenerationRequest {
    /// Parameters as JSON, for providers with a JSON API.
    pub fn parameters_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.parameters)
    }
}

/// Instruction prepended to the user's prompt.
pub fn instruction_prefix(strictness: Strictness) -> &'static str {
    match strictness {
        Strictness::Strict => {
            "Change only what the instruction asks for and keep everything else in the image exactly as it is."
        }
        Strictness::Creative => "Use the instruction as a starting point; creative changes to the image are welcome.",
    }
}

/// Full prompt text for `prompt` under `strictness`.
pub fn compose_prompt(prompt: &str, strictness: Strictness) -> String {
    format!("{} {}", instruction_prefix(strictness), prompt.trim())
}

/// Source raster and the mapping from world space into its pixels.
struct SourceRaster {
    pixels: Arc<RgbaImage>,
    /// World-space origin of the raster.
    origin: Point,
    /// Pixels per world unit.
    scale: Vec2,
    composited: bool,
}

fn render_error(err: impl std::fmt::Display) -> CanvasError {
    CanvasError::Encode(err.to_string())
}

/// Build the source raster for `primary`, flattening overlapping references.
fn source_raster(primary: &CanvasImage, references: &[&CanvasImage], z_order: &[ObjectId]) -> CanvasResult<SourceRaster> {
    let overlaps = references
        .iter()
        .any(|reference| rects_overlap(primary.bounds(), reference.bounds()));
    if !overlaps {
        return Ok(SourceRaster {
            pixels: primary.pixels.clone(),
            origin: primary.position,
            scale: primary.pixel_ratio(),
            composited: false,
        });
    }

    let mut members: Vec<&CanvasImage> = references.to_vec();
    members.push(primary);
    members.sort_by_key(|image| z_order.iter().position(|id| *id == image.id()));

    let bounds = members
        .iter()
        .map(|image| image.bounds())
        .fold(primary.bounds(), |acc, rect| acc.union(rect));
    // Keep the primary at its natural resolution.
    let scale = primary.pixel_ratio().x;
    let layers: Vec<Layer<'_>> = members
        .iter()
        .map(|image| Layer {
            pixels: &image.pixels,
            dest: image.bounds(),
        })
        .collect();
    let pixels = composite(bounds, &layers, scale).map_err(render_error)?;
    log::debug!(
        "flattened {} overlapping reference(s) into a {}x{} composite",
        references.len(),
        pixels.width(),
        pixels.height()
    );
    Ok(SourceRaster {
        pixels: Arc::new(pixels),
        origin: bounds.origin(),
        scale: Vec2::new(scale, scale),
        composited: true,
    })
}

/// Prepare a request of `kind` from the canvas selection, paths and settings.
///
/// Fails with a validation error when no image is selected, the prompt is
/// empty for an edit, or inpainting has nothing painted.
pub fn build_request(canvas: &Canvas, kind: RequestKind) -> CanvasResult<GenerationRequest> {
    let scene = canvas.document.committed();
    let primary = canvas
        .selection
        .primary_image()
        .and_then(|id| scene.image(id))
        .ok_or(ValidationError::NoImageSelected)?;

    let settings = &canvas.settings;
    if kind == RequestKind::Edit && settings.prompt.trim().is_empty() {
        return Err(ValidationError::EmptyPrompt.into());
    }

    let references: Vec<&CanvasImage> = match kind {
        RequestKind::Edit => canvas
            .selection
            .references()
            .iter()
            .filter(|id| **id != primary.id())
            .filter_map(|id| scene.image(*id))
            .collect(),
        RequestKind::RemoveBackground => Vec::new(),
    };
    let z_order: Vec<ObjectId> = scene.images.iter().map(|image| image.id()).collect();
    let raster = source_raster(primary, &references, &z_order)?;

    let local_paths: Vec<Path> = scene
        .paths
        .iter()
        .map(|path| path.mapped(-raster.origin.to_vec2(), raster.scale))
        .collect();

    let (edit_region, mask_or_annotation) = match (kind, canvas.edit_mode) {
        (RequestKind::RemoveBackground, _) | (_, EditMode::None) => (EditRegion::Whole, None),
        (RequestKind::Edit, EditMode::Inpaint) => {
            let mask = build_mask(raster.pixels.width(), raster.pixels.height(), &local_paths)
                .map_err(render_error)?;
            if !mask_has_coverage(&mask) {
                return Err(ValidationError::EmptyMask.into());
            }
            (EditRegion::Mask, Some(InputImage::encode(Arc::new(mask), "mask.png")?))
        }
        (RequestKind::Edit, EditMode::Annotate) => {
            if local_paths.iter().any(|path| path.tool == PathTool::Annotate) {
                let annotated = build_annotation(&raster.pixels, &local_paths).map_err(render_error)?;
                (
                    EditRegion::Annotation,
                    Some(InputImage::encode(Arc::new(annotated), "annotation.png")?),
                )
            } else {
                (EditRegion::Whole, None)
            }
        }
    };

    let source_name = if raster.composited {
        "composite.png".to_string()
    } else {
        primary.file.name.clone()
    };
    let source = InputImage::encode(raster.pixels.clone(), source_name)?;
    let references = if raster.composited {
        Vec::new()
    } else {
        references
            .iter()
            .map(|image| InputImage::encode(image.pixels.clone(), image.file.name.clone()))
            .collect::<CanvasResult<Vec<_>>>()?
    };

    let prompt = match kind {
        RequestKind::Edit => compose_prompt(&settings.prompt, settings.strictness),
        RequestKind::RemoveBackground => "Remove the background and keep the subject.".to_string(),
    };

    Ok(GenerationRequest {
        source_id: primary.id(),
        parameters: RequestParameters {
            kind,
            prompt,
            edit_region,
            strictness: settings.strictness,
            api_provider: settings.api_provider.clone(),
            model_id: settings.model_id.clone(),
            image_size: settings.image_size_selection.clone(),
            aspect_ratio: settings.aspect_ratio_selection.clone(),
            num_images: settings.num_images.max(1),
        },
        source,
        mask_or_annotation,
        references,
        composited: raster.composited,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use driftcanvas_core::scene::{DecodedImage, ImageFile, Scene, SerializableColor};
    use image::Rgba;

    pub(crate) fn solid_image(x: f64, y: f64, w: u32, h: u32, rgba: [u8; 4]) -> CanvasImage {
        let decoded = DecodedImage {
            pixels: Arc::new(RgbaImage::from_pixel(w, h, Rgba(rgba))),
            file: ImageFile::new(Vec::new(), "image/png", "solid.png"),
        };
        CanvasImage::new(Point::new(x, y), decoded)
    }

    /// Canvas with a red primary at the origin and a green reference at `reference_at`.
    pub(crate) fn canvas_with_reference(reference_at: Point) -> (Canvas, ObjectId, ObjectId) {
        let primary = solid_image(0.0, 0.0, 100, 100, [255, 0, 0, 255]);
        let reference = solid_image(reference_at.x, reference_at.y, 50, 50, [0, 255, 0, 255]);
        let (primary_id, reference_id) = (primary.id(), reference.id());

        let mut canvas = Canvas::new();
        canvas.document.push(Scene::new().with_images([primary, reference]));
        canvas.selection.select_image(primary_id);
        assert!(canvas.selection.toggle_reference(reference_id, 4));
        canvas.settings.prompt = "add a hat".to_string();
        (canvas, primary_id, reference_id)
    }

    fn stroke(tool: PathTool, from: Point, to: Point) -> Path {
        let mut path = Path::begin(from, SerializableColor::new(255, 0, 0, 255), 10.0, tool);
        path.add_point(to);
        path
    }

    #[test]
    fn test_requires_selected_image() {
        let canvas = Canvas::new();
        let err = build_request(&canvas, RequestKind::Edit).unwrap_err();
        assert_eq!(err, CanvasError::Validation(ValidationError::NoImageSelected));
    }

    #[test]
    fn test_requires_prompt_for_edit_only() {
        let (mut canvas, _, _) = canvas_with_reference(Point::new(300.0, 0.0));
        canvas.settings.prompt = "   ".to_string();
        let err = build_request(&canvas, RequestKind::Edit).unwrap_err();
        assert_eq!(err, CanvasError::Validation(ValidationError::EmptyPrompt));
        assert!(build_request(&canvas, RequestKind::RemoveBackground).is_ok());
    }

    #[test]
    fn test_separate_reference_when_apart() {
        let (canvas, primary_id, _) = canvas_with_reference(Point::new(300.0, 0.0));
        let request = build_request(&canvas, RequestKind::Edit).unwrap();
        assert!(!request.composited);
        assert_eq!(request.source_id, primary_id);
        assert_eq!(request.references.len(), 1);
        assert_eq!((request.source.width(), request.source.height()), (100, 100));
    }

    #[test]
    fn test_overlapping_reference_is_flattened() {
        let (canvas, _, _) = canvas_with_reference(Point::new(80.0, 20.0));
        let request = build_request(&canvas, RequestKind::Edit).unwrap();
        assert!(request.composited);
        assert!(request.references.is_empty());
        assert_eq!((request.source.width(), request.source.height()), (130, 100));
        // Reference drawn above the primary where they overlap.
        assert_eq!(request.source.pixels.get_pixel(90, 40).0, [0, 255, 0, 255]);
        assert_eq!(request.source.pixels.get_pixel(10, 40).0, [255, 0, 0, 255]);
    }

    #[test]
    fn test_touching_reference_is_not_flattened() {
        let (canvas, _, _) = canvas_with_reference(Point::new(100.0, 0.0));
        let request = build_request(&canvas, RequestKind::Edit).unwrap();
        assert!(!request.composited);
    }

    #[test]
    fn test_inpaint_needs_mask() {
        let (mut canvas, _, _) = canvas_with_reference(Point::new(300.0, 0.0));
        canvas.set_edit_mode(EditMode::Inpaint);
        let err = build_request(&canvas, RequestKind::Edit).unwrap_err();
        assert_eq!(err, CanvasError::Validation(ValidationError::EmptyMask));

        let scene = canvas
            .document
            .committed()
            .with_path(stroke(PathTool::Inpaint, Point::new(10.0, 50.0), Point::new(90.0, 50.0)));
        canvas.document.push(scene);
        let request = build_request(&canvas, RequestKind::Edit).unwrap();
        assert_eq!(request.parameters.edit_region, EditRegion::Mask);
        let mask = request.mask_or_annotation.unwrap();
        assert_eq!(mask.pixels.get_pixel(50, 50).0, [255, 255, 255, 255]);
        assert_eq!(mask.pixels.get_pixel(50, 10).0, [0, 0, 0, 255]);
    }

    #[test]
    fn test_paths_map_into_display_scaled_pixels() {
        // 100x100 pixels shown at 50x50, placed at (200, 200).
        let primary = solid_image(200.0, 200.0, 100, 100, [0, 0, 255, 255]).with_size(50.0, 50.0);
        let id = primary.id();
        let mut canvas = Canvas::new();
        canvas.document.push(
            Scene::new()
                .with_images([primary])
                .with_path(stroke(PathTool::Annotate, Point::new(200.0, 225.0), Point::new(250.0, 225.0))),
        );
        canvas.edit_mode = EditMode::Annotate;
        canvas.selection.select_image(id);
        canvas.settings.prompt = "circle this".to_string();

        let request = build_request(&canvas, RequestKind::Edit).unwrap();
        assert_eq!(request.parameters.edit_region, EditRegion::Annotation);
        let annotated = request.mask_or_annotation.unwrap();
        assert_eq!(annotated.pixels.get_pixel(50, 50).0, [255, 0, 0, 255]);
        assert_eq!(annotated.pixels.get_pixel(50, 10).0, [0, 0, 255, 255]);
    }

    #[test]
    fn test_strictness_only_changes_prompt() {
        let (mut canvas, _, _) = canvas_with_reference(Point::new(300.0, 0.0));
        let strict = build_request(&canvas, RequestKind::Edit).unwrap();
        canvas.settings.strictness = Strictness::Creative;
        let creative = build_request(&canvas, RequestKind::Edit).unwrap();

        assert_ne!(strict.parameters.prompt, creative.parameters.prompt);
        assert!(strict.parameters.prompt.ends_with("add a hat"));
        assert_eq!(strict.source.png, creative.source.png);

        let json = creative.parameters_json().unwrap();
        assert!(json.contains("\"strictness\":\"creative\""));
        assert!(json.contains("\"editRegion\":\"whole\""));
    }
}
