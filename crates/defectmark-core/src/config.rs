//! Engine configuration.
//!
//! Every field has a default, so a partial JSON document only needs to name
//! the values it overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {message}")]
    Io { path: String, message: String },
    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config value {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Largest accepted integer scale for the label font.
pub const MAX_LABEL_SCALE: u32 = 16;

/// Tunables for the annotation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Lower bound for the viewport scale.
    pub min_scale: f64,
    /// Upper bound for the viewport scale.
    pub max_scale: f64,
    /// Factor applied by a single zoom step.
    pub zoom_step: f64,
    /// Point marker radius in view pixels (not scaled by zoom).
    pub marker_radius: f64,
    /// Pointer travel (view pixels) below which a press/release is a click.
    pub click_slop: f64,
    /// Distance (view pixels) from the first polygon vertex that closes it.
    pub polygon_close_radius: f64,
    /// Quiet period before a resize/zoom burst triggers a render.
    pub resize_debounce_ms: u64,
    /// Size of the image substituted when a load fails.
    pub placeholder_width: u32,
    pub placeholder_height: u32,
    /// Fill of the substituted image.
    pub placeholder_color: String,
    /// Color used for annotations whose defect type is not in the catalog.
    pub fallback_color: String,
    /// Alpha (0-255) applied to the defect color for shape fills.
    pub fill_alpha: u8,
    /// Gap in view pixels between a shape's anchor and its label.
    pub label_offset: f64,
    /// Horizontal padding added to the measured label width.
    pub label_padding: f64,
    /// Integer scale applied to the 8x8 label font.
    pub label_scale: u32,
    /// Recorded as `createdBy` on annotations authored in this session.
    pub operator: String,
    /// Default log level for hosts that do not set `RUST_LOG`.
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.1,
            max_scale: 5.0,
            zoom_step: 1.2,
            marker_radius: 8.0,
            click_slop: 3.0,
            polygon_close_radius: 10.0,
            resize_debounce_ms: 50,
            placeholder_width: 800,
            placeholder_height: 600,
            placeholder_color: "#e5e7eb".to_string(),
            fallback_color: "#6b7280".to_string(),
            fill_alpha: 64,
            label_offset: 8.0,
            label_padding: 4.0,
            label_scale: 2,
            operator: "operator".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a configuration from JSON.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that values are usable by the viewport, tools and renderer.
    pub fn validate(&self) -> ConfigResult<()> {
        let invalid = |field: &'static str, reason: String| Err(ConfigError::Invalid { field, reason });

        for (field, value) in [("min_scale", self.min_scale), ("max_scale", self.max_scale)] {
            if !(value.is_finite() && value > 0.0) {
                return invalid(field, format!("{value} is not a positive number"));
            }
        }
        if self.min_scale > self.max_scale {
            return invalid(
                "min_scale",
                format!("{} is greater than max_scale {}", self.min_scale, self.max_scale),
            );
        }
        if !(self.zoom_step.is_finite() && self.zoom_step > 1.0) {
            return invalid("zoom_step", format!("{} must be greater than 1", self.zoom_step));
        }
        for (field, value) in [
            ("marker_radius", self.marker_radius),
            ("click_slop", self.click_slop),
            ("polygon_close_radius", self.polygon_close_radius),
            ("label_offset", self.label_offset),
            ("label_padding", self.label_padding),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return invalid(field, format!("{value} is not a non-negative number"));
            }
        }
        if !(1..=MAX_LABEL_SCALE).contains(&self.label_scale) {
            return invalid(
                "label_scale",
                format!("{} is outside 1..={MAX_LABEL_SCALE}", self.label_scale),
            );
        }
        Ok(())
    }

    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json(&json)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// The configured log level as a `log` filter, defaulting to `Info`.
    pub fn level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }
}
