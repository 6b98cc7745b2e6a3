//! Tunable constants for the canvas, loadable from JSON.

use crate::tools::Strictness;
use kurbo::Size;
use serde::{Deserialize, Serialize};

/// Canvas configuration. Every field has a default so partial JSON works.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CanvasConfig {
    /// Maximum number of history snapshots.
    pub history_capacity: usize,
    /// Horizontal gap between an uploaded image and its left neighbour.
    pub placement_gap: f64,
    /// Offset between files dropped together.
    pub drop_stagger: f64,
    /// Size of a freshly created note.
    pub note_default_size: Size,
    /// Minimum note size while resizing.
    pub note_min_size: Size,
    /// Background of a freshly created note.
    pub note_default_color: String,
    /// Crop handle size in screen pixels.
    pub handle_size_px: f64,
    /// Note resize handle size in screen pixels.
    pub note_handle_size_px: f64,
    /// Marquee boxes smaller than this (screen pixels) count as clicks.
    pub marquee_threshold_px: f64,
    /// World-space outset of selection outlines.
    pub selection_padding: f64,
    /// Maximum size of the reference image set.
    pub max_reference_images: usize,
    /// Multiplicative zoom step for `+`/`-`.
    pub zoom_step: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Screen padding kept around content on zoom-to-fit.
    pub fit_padding_px: f64,
    /// Delay before a completed generation job is dismissed.
    pub job_dismiss_delay_ms: u64,
    /// Vertical gap between stacked generation results.
    pub result_gap: f64,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            history_capacity: 30,
            placement_gap: 20.0,
            drop_stagger: 30.0,
            note_default_size: Size::new(200.0, 160.0),
            note_min_size: Size::new(80.0, 60.0),
            note_default_color: "#fef08a".to_string(),
            handle_size_px: 10.0,
            note_handle_size_px: 14.0,
            marquee_threshold_px: 5.0,
            selection_padding: 4.0,
            max_reference_images: 4,
            zoom_step: 1.2,
            min_zoom: 0.05,
            max_zoom: 20.0,
            fit_padding_px: 50.0,
            job_dismiss_delay_ms: 3000,
            result_gap: 20.0,
        }
    }
}

impl CanvasConfig {
    /// Parse a configuration, filling missing fields with defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Prompt and provider choices for the next generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GenerationSettings {
    pub prompt: String,
    pub strictness: Strictness,
    pub api_provider: String,
    pub model_id: String,
    pub image_size_selection: String,
    pub aspect_ratio_selection: String,
    /// Number of results to request.
    pub num_images: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            strictness: Strictness::default(),
            api_provider: String::new(),
            model_id: String::new(),
            image_size_selection: "auto".to_string(),
            aspect_ratio_selection: "auto".to_string(),
            num_images: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = CanvasConfig::from_json(r#"{ "historyCapacity": 10 }"#).unwrap();
        assert_eq!(config.history_capacity, 10);
        assert!((config.placement_gap - 20.0).abs() < f64::EPSILON);
        assert_eq!(config.max_reference_images, 4);
    }

    #[test]
    fn test_generation_settings_defaults() {
        let settings: GenerationSettings = serde_json::from_str(r#"{ "prompt": "sky" }"#).unwrap();
        assert_eq!(settings.prompt, "sky");
        assert_eq!(settings.num_images, 1);
        assert_eq!(settings.strictness, Strictness::Strict);
    }

    #[test]
    fn test_invalid_json_is_rejected() {
        assert!(CanvasConfig::from_json("{ historyCapacity: }").is_err());
    }
}
