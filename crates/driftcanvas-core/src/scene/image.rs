//! Placed raster images.

use super::ObjectId;
use crate::error::{CanvasError, CanvasResult};
use image::{ImageFormat as CodecFormat, RgbaImage};
use kurbo::{Point, Rect, Vec2};
use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Image format of an image's file payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    WebP,
    Gif,
    Bmp,
}

impl ImageFormat {
    /// MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::WebP => "image/webp",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Bmp => "image/bmp",
        }
    }

    /// Detect format from a MIME type.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/png" => Some(ImageFormat::Png),
            "image/jpeg" | "image/jpg" => Some(ImageFormat::Jpeg),
            "image/webp" => Some(ImageFormat::WebP),
            "image/gif" => Some(ImageFormat::Gif),
            "image/bmp" => Some(ImageFormat::Bmp),
            _ => None,
        }
    }

    /// Detect format from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(ImageFormat::Png),
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "webp" => Some(ImageFormat::WebP),
            "gif" => Some(ImageFormat::Gif),
            "bmp" => Some(ImageFormat::Bmp),
            _ => None,
        }
    }

    /// Detect format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 4 {
            return None;
        }
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Some(ImageFormat::Png);
        }
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(ImageFormat::Jpeg);
        }
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return Some(ImageFormat::WebP);
        }
        if data.starts_with(b"GIF8") {
            return Some(ImageFormat::Gif);
        }
        if data.starts_with(b"BM") {
            return Some(ImageFormat::Bmp);
        }
        None
    }

    fn codec(self) -> CodecFormat {
        match self {
            ImageFormat::Png => CodecFormat::Png,
            ImageFormat::Jpeg => CodecFormat::Jpeg,
            ImageFormat::WebP => CodecFormat::WebP,
            ImageFormat::Gif => CodecFormat::Gif,
            ImageFormat::Bmp => CodecFormat::Bmp,
        }
    }
}

/// The original file an image was created from, kept for export/download.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFile {
    pub bytes: Arc<[u8]>,
    pub mime: String,
    pub name: String,
}

impl ImageFile {
    pub fn new(bytes: impl Into<Arc<[u8]>>, mime: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime: mime.into(),
            name: name.into(),
        }
    }
}

/// Decoded pixels plus the file they came from.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub pixels: Arc<RgbaImage>,
    pub file: ImageFile,
}

impl DecodedImage {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

/// Decode image bytes. The format is sniffed from the bytes first, then the
/// declared MIME type, then the file extension.
pub fn decode_image(bytes: &[u8], name: &str, mime: Option<&str>) -> CanvasResult<DecodedImage> {
    let decode_error = |reason: String| CanvasError::Decode {
        name: name.to_string(),
        reason,
    };

    let format = ImageFormat::from_magic_bytes(bytes)
        .or_else(|| mime.and_then(ImageFormat::from_mime))
        .or_else(|| {
            name.rsplit_once('.')
                .and_then(|(_, ext)| ImageFormat::from_extension(ext))
        })
        .ok_or_else(|| decode_error("unrecognized image format".to_string()))?;

    let decoded = image::load_from_memory_with_format(bytes, format.codec())
        .map_err(|e| decode_error(e.to_string()))?;
    let pixels = decoded.to_rgba8();
    if pixels.width() == 0 || pixels.height() == 0 {
        return Err(decode_error("image has no pixels".to_string()));
    }

    Ok(DecodedImage {
        pixels: Arc::new(pixels),
        file: ImageFile::new(bytes.to_vec(), format.mime_type(), name),
    })
}

/// Encode pixels as PNG bytes.
pub fn encode_png(pixels: &RgbaImage) -> CanvasResult<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    pixels
        .write_to(&mut out, CodecFormat::Png)
        .map_err(|e| CanvasError::Encode(e.to_string()))?;
    Ok(out.into_inner())
}

/// Source of content revisions. Two images with the same id but different
/// pixels never share a revision.
fn next_revision() -> u64 {
    static REVISION: AtomicU64 = AtomicU64::new(1);
    REVISION.fetch_add(1, Ordering::Relaxed)
}

/// An image placed on the canvas.
#[derive(Debug, Clone)]
pub struct CanvasImage {
    pub(crate) id: ObjectId,
    /// Top-left corner in world space.
    pub position: Point,
    /// Display width in world units.
    pub width: f64,
    /// Display height in world units.
    pub height: f64,
    /// Source pixel width.
    pub natural_width: u32,
    /// Source pixel height.
    pub natural_height: u32,
    /// Decoded pixels.
    pub pixels: Arc<RgbaImage>,
    /// File payload for export/download.
    pub file: ImageFile,
    revision: u64,
}

impl CanvasImage {
    /// Create an image at its natural size.
    pub fn new(position: Point, decoded: DecodedImage) -> Self {
        Self::with_id(Uuid::new_v4(), position, decoded)
    }

    /// Create an image with a known id.
    pub fn with_id(id: ObjectId, position: Point, decoded: DecodedImage) -> Self {
        let natural_width = decoded.width();
        let natural_height = decoded.height();
        Self {
            id,
            position,
            width: f64::from(natural_width),
            height: f64::from(natural_height),
            natural_width,
            natural_height,
            pixels: decoded.pixels,
            file: decoded.file,
            revision: next_revision(),
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Content revision, bumped whenever pixels are replaced.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Set the display size.
    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Scale the display size by `factor`.
    pub fn scaled(self, factor: f64) -> Self {
        let (w, h) = (self.width * factor, self.height * factor);
        self.with_size(w, h)
    }

    /// Copy with a new position.
    pub fn moved_to(&self, position: Point) -> Self {
        Self {
            position,
            ..self.clone()
        }
    }

    /// Copy translated by `delta`.
    pub fn translated(&self, delta: Vec2) -> Self {
        self.moved_to(self.position + delta)
    }

    /// Copy carrying new pixels and file while keeping id and placement.
    pub fn with_content(&self, decoded: DecodedImage) -> Self {
        Self {
            natural_width: decoded.width(),
            natural_height: decoded.height(),
            pixels: decoded.pixels,
            file: decoded.file,
            revision: next_revision(),
            ..self.clone()
        }
    }

    /// World-space bounds.
    pub fn bounds(&self) -> Rect {
        Rect::new(
            self.position.x,
            self.position.y,
            self.position.x + self.width,
            self.position.y + self.height,
        )
    }

    /// Natural pixels per display unit, horizontally and vertically.
    pub fn pixel_ratio(&self) -> Vec2 {
        Vec2::new(
            f64::from(self.natural_width) / self.width.max(f64::EPSILON),
            f64::from(self.natural_height) / self.height.max(f64::EPSILON),
        )
    }
}
