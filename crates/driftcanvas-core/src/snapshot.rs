//! Scene snapshot export and import (JSON, schema version 1).
//!
//! Import is tolerant per entry: missing or malformed fields fall back to
//! defaults and bad ids are replaced. Only a structurally invalid document
//! (no `state` object, non-array collections) fails as a whole, and in that
//! case the canvas is left untouched.

use crate::canvas::Canvas;
use crate::error::{CanvasError, CanvasResult};
use crate::scene::{
    CanvasImage, CanvasNote, ObjectId, Path, PathTool, Scene, SerializableColor, decode_image,
};
use crate::tools::{EditMode, Strictness, ToolKind};
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, SecondsFormat, Utc};
use kurbo::{Point, Rect};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Schema version written by [`Canvas::export_snapshot`].
pub const SNAPSHOT_VERSION: u64 = 1;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotDocument {
    version: u64,
    created_at: String,
    state: SnapshotState,
}

#[derive(Serialize)]
struct SnapshotState {
    images: Vec<ImageEntry>,
    notes: Vec<NoteEntry>,
    paths: Vec<PathEntry>,
    meta: SnapshotMeta,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageEntry {
    id: String,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    file_name: String,
    file_type: String,
    data_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NoteEntry {
    id: String,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    text: String,
    background_color: String,
}

#[derive(Serialize)]
struct PointEntry {
    x: f64,
    y: f64,
}

#[derive(Serialize)]
struct PathEntry {
    points: Vec<PointEntry>,
    color: String,
    size: f64,
    tool: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotMeta {
    app_mode: &'static str,
    tool: &'static str,
    brush_size: f64,
    brush_color: String,
    prompt: String,
    inpaint_mode: &'static str,
    api_provider: String,
    model_id: String,
    image_size_selection: String,
    aspect_ratio_selection: String,
    num_images: u32,
    selected_image_ids: Vec<String>,
    selected_note_ids: Vec<String>,
    reference_image_ids: Vec<String>,
}

/// Build a `data:` URL for `bytes`.
pub fn to_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Split a base64 `data:` URL into its MIME type and decoded bytes.
pub fn parse_data_url(url: &str) -> Option<(String, Vec<u8>)> {
    let rest = url.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime = header.strip_suffix(";base64")?;
    let bytes = STANDARD.decode(payload.trim()).ok()?;
    Some((mime.to_string(), bytes))
}

/// Format `time` as an RFC 3339 UTC timestamp with millisecond precision.
pub fn format_timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn id_strings(ids: &[ObjectId]) -> Vec<String> {
    ids.iter().map(ToString::to_string).collect()
}

impl Canvas {
    /// Export the committed scene plus editor state as a JSON snapshot.
    pub fn export_snapshot(&self) -> CanvasResult<String> {
        self.export_snapshot_at(Utc::now())
    }

    /// Export with an explicit creation time.
    pub fn export_snapshot_at(&self, created_at: DateTime<Utc>) -> CanvasResult<String> {
        let scene = self.document.committed();
        let document = SnapshotDocument {
            version: SNAPSHOT_VERSION,
            created_at: format_timestamp(created_at),
            state: SnapshotState {
                images: scene
                    .images
                    .iter()
                    .map(|image| ImageEntry {
                        id: image.id().to_string(),
                        x: image.position.x,
                        y: image.position.y,
                        width: image.width,
                        height: image.height,
                        file_name: image.file.name.clone(),
                        file_type: image.file.mime.clone(),
                        data_url: to_data_url(&image.file.mime, &image.file.bytes),
                    })
                    .collect(),
                notes: scene
                    .notes
                    .iter()
                    .map(|note| NoteEntry {
                        id: note.id().to_string(),
                        x: note.position.x,
                        y: note.position.y,
                        width: note.width,
                        height: note.height,
                        text: note.text.clone(),
                        background_color: note.background.to_hex(),
                    })
                    .collect(),
                paths: scene
                    .paths
                    .iter()
                    .map(|path| PathEntry {
                        points: path.points.iter().map(|p| PointEntry { x: p.x, y: p.y }).collect(),
                        color: path.color.to_hex(),
                        size: path.width,
                        tool: path.tool.as_str(),
                    })
                    .collect(),
                meta: SnapshotMeta {
                    app_mode: self.edit_mode.as_str(),
                    tool: self.tool.as_str(),
                    brush_size: self.brush.size,
                    brush_color: self.brush.color.to_hex(),
                    prompt: self.settings.prompt.clone(),
                    inpaint_mode: self.settings.strictness.as_str(),
                    api_provider: self.settings.api_provider.clone(),
                    model_id: self.settings.model_id.clone(),
                    image_size_selection: self.settings.image_size_selection.clone(),
                    aspect_ratio_selection: self.settings.aspect_ratio_selection.clone(),
                    num_images: self.settings.num_images,
                    selected_image_ids: id_strings(self.selection.images()),
                    selected_note_ids: id_strings(self.selection.notes()),
                    reference_image_ids: id_strings(self.selection.references()),
                },
            },
        };
        let json = serde_json::to_string_pretty(&document)
            .map_err(|e| CanvasError::Encode(format!("could not serialize snapshot: {e}")))?;
        log::info!(
            "exported snapshot: {} image(s), {} note(s), {} path(s)",
            scene.images.len(),
            scene.notes.len(),
            scene.paths.len()
        );
        Ok(json)
    }

    /// Replace the canvas content with a snapshot.
    ///
    /// On success history is reset to a single entry. On failure the error is
    /// reported and nothing changes.
    pub fn import_snapshot(&mut self, json: &str) -> CanvasResult<()> {
        match self.parse_snapshot(json) {
            Ok(imported) => {
                self.apply_import(imported);
                Ok(())
            }
            Err(err) => {
                self.report(err.clone());
                Err(err)
            }
        }
    }

    fn parse_snapshot(&self, json: &str) -> CanvasResult<ImportedSnapshot> {
        let data: Value = serde_json::from_str(json)
            .map_err(|e| CanvasError::Import(format!("invalid JSON: {e}")))?;
        let state = data
            .get("state")
            .and_then(Value::as_object)
            .ok_or_else(|| CanvasError::Import("missing 'state' object".to_string()))?;
        if let Some(version) = data.get("version").and_then(Value::as_u64) {
            if version != SNAPSHOT_VERSION {
                log::warn!("snapshot version {version}, expected {SNAPSHOT_VERSION}");
            }
        }

        let images = array_field(state, "images")?;
        let notes = array_field(state, "notes")?;
        let paths = array_field(state, "paths")?;

        let mut ids = IdAllocator::default();
        let mut scene = Scene::new();

        for (index, entry) in images.iter().enumerate() {
            match self.image_from_entry(entry, &mut ids) {
                Some(image) => scene.images.push(image),
                None => log::warn!("skipping image entry {index}: no decodable data"),
            }
        }
        for entry in notes {
            scene.notes.push(self.note_from_entry(entry, &mut ids));
        }
        for entry in paths {
            if let Some(path) = self.path_from_entry(entry) {
                scene.paths.push(path);
            }
        }

        let meta = state.get("meta").and_then(Value::as_object).cloned();
        Ok(ImportedSnapshot {
            scene,
            id_map: ids.mapped,
            meta,
        })
    }

    fn image_from_entry(&self, entry: &Value, ids: &mut IdAllocator) -> Option<CanvasImage> {
        let (data_mime, bytes) = entry
            .get("dataUrl")
            .and_then(Value::as_str)
            .and_then(parse_data_url)?;
        let name = entry
            .get("fileName")
            .and_then(Value::as_str)
            .unwrap_or("image.png");
        let mime = entry.get("fileType").and_then(Value::as_str).unwrap_or(data_mime.as_str());
        let decoded = match decode_image(&bytes, name, Some(mime)) {
            Ok(decoded) => decoded,
            Err(err) => {
                log::warn!("{err}");
                return None;
            }
        };

        let id = ids.allocate(entry.get("id"));
        let position = Point::new(number(entry, "x").unwrap_or(0.0), number(entry, "y").unwrap_or(0.0));
        let width = positive(entry, "width").unwrap_or(f64::from(decoded.width()));
        let height = positive(entry, "height").unwrap_or(f64::from(decoded.height()));
        Some(CanvasImage::with_id(id, position, decoded).with_size(width, height))
    }

    fn note_from_entry(&self, entry: &Value, ids: &mut IdAllocator) -> CanvasNote {
        let id = ids.allocate(entry.get("id"));
        let x = number(entry, "x").unwrap_or(0.0);
        let y = number(entry, "y").unwrap_or(0.0);
        let default_size = self.config.note_default_size;
        let width = positive(entry, "width").unwrap_or(default_size.width);
        let height = positive(entry, "height").unwrap_or(default_size.height);
        let text = entry.get("text").and_then(Value::as_str).unwrap_or_default();
        let background = entry
            .get("backgroundColor")
            .and_then(Value::as_str)
            .and_then(SerializableColor::from_hex)
            .or_else(|| SerializableColor::from_hex(&self.config.note_default_color))
            .unwrap_or_else(SerializableColor::white);
        CanvasNote::with_id(id, Rect::new(x, y, x + width, y + height), text.to_string(), background)
    }

    fn path_from_entry(&self, entry: &Value) -> Option<Path> {
        let points: Vec<Point> = entry
            .get("points")
            .and_then(Value::as_array)?
            .iter()
            .filter_map(|p| Some(Point::new(number(p, "x")?, number(p, "y")?)))
            .collect();
        let (first, rest) = points.split_first()?;
        let color = entry
            .get("color")
            .and_then(Value::as_str)
            .and_then(SerializableColor::from_hex)
            .unwrap_or_else(SerializableColor::black);
        let width = positive(entry, "size").unwrap_or(self.brush.size);
        let tool = entry
            .get("tool")
            .and_then(Value::as_str)
            .and_then(PathTool::parse)
            .unwrap_or(PathTool::Brush);
        let mut path = Path::begin(*first, color, width, tool);
        for point in rest {
            path.add_point(*point);
        }
        Some(path)
    }

    fn apply_import(&mut self, imported: ImportedSnapshot) {
        self.cancel_gesture();
        self.crop = None;
        self.editing_note = None;
        self.selection.clear();
        log::info!(
            "imported snapshot: {} image(s), {} note(s), {} path(s)",
            imported.scene.images.len(),
            imported.scene.notes.len(),
            imported.scene.paths.len()
        );
        self.document.reset(imported.scene);

        if let Some(meta) = imported.meta {
            self.apply_meta(&meta, &imported.id_map);
        }
    }

    /// Restore editor state from `meta`. Invalid fields are skipped one by one.
    fn apply_meta(&mut self, meta: &Map<String, Value>, id_map: &HashMap<String, ObjectId>) {
        let text = |key: &str| meta.get(key).and_then(Value::as_str);

        if let Some(mode) = text("appMode").and_then(EditMode::parse) {
            self.edit_mode = mode;
        }
        if let Some(tool) = text("tool").and_then(ToolKind::parse) {
            self.tool = tool;
        }
        if let Some(size) = meta.get("brushSize").and_then(Value::as_f64).filter(|s| *s > 0.0) {
            self.brush.size = size;
        }
        if let Some(color) = text("brushColor").and_then(SerializableColor::from_hex) {
            self.brush.color = color;
        }
        if let Some(prompt) = text("prompt") {
            self.settings.prompt = prompt.to_string();
        }
        if let Some(strictness) = text("inpaintMode").and_then(Strictness::parse) {
            self.settings.strictness = strictness;
        }
        if let Some(provider) = text("apiProvider") {
            self.settings.api_provider = provider.to_string();
        }
        if let Some(model) = text("modelId") {
            self.settings.model_id = model.to_string();
        }
        if let Some(size) = text("imageSizeSelection") {
            self.settings.image_size_selection = size.to_string();
        }
        if let Some(ratio) = text("aspectRatioSelection") {
            self.settings.aspect_ratio_selection = ratio.to_string();
        }
        if let Some(n) = meta.get("numImages").and_then(Value::as_u64).filter(|n| *n > 0) {
            self.settings.num_images = u32::try_from(n).unwrap_or(u32::MAX);
        }

        let ids = |key: &str| -> Vec<ObjectId> {
            meta.get(key)
                .and_then(Value::as_array)
                .map(|ids| {
                    ids.iter()
                        .filter_map(Value::as_str)
                        .filter_map(|id| id_map.get(id).copied())
                        .collect()
                })
                .unwrap_or_default()
        };
        self.selection.restore(
            ids("selectedImageIds"),
            ids("selectedNoteIds"),
            ids("referenceImageIds"),
        );
        self.selection.retain_existing(self.document.committed());
    }
}

struct ImportedSnapshot {
    scene: Scene,
    /// Snapshot id string to the id it was imported as.
    id_map: HashMap<String, ObjectId>,
    meta: Option<Map<String, Value>>,
}

/// Keeps valid unique ids and replaces absent, malformed or duplicate ones.
#[derive(Default)]
struct IdAllocator {
    used: HashSet<ObjectId>,
    mapped: HashMap<String, ObjectId>,
}

impl IdAllocator {
    fn allocate(&mut self, raw: Option<&Value>) -> ObjectId {
        let raw = raw.and_then(Value::as_str);
        let parsed = raw
            .and_then(|s| Uuid::parse_str(s).ok())
            .filter(|id| !self.used.contains(id));
        let id = parsed.unwrap_or_else(Uuid::new_v4);
        self.used.insert(id);
        if let Some(raw) = raw {
            self.mapped.entry(raw.to_string()).or_insert(id);
        }
        id
    }
}

fn array_field<'a>(state: &'a Map<String, Value>, key: &str) -> CanvasResult<&'a [Value]> {
    match state.get(key) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(CanvasError::Import(format!("'{key}' must be an array"))),
    }
}

fn number(entry: &Value, key: &str) -> Option<f64> {
    entry.get(key).and_then(Value::as_f64).filter(|v| v.is_finite())
}

fn positive(entry: &Value, key: &str) -> Option<f64> {
    number(entry, key).filter(|v| *v > 0.0)
}
