use std::fs;
use std::path::Path;

use egui::Color32;
use log::info;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::filter::DEFAULT_TOUCH_TOLERANCE;
use crate::style::{DEFAULT_STROKE_WIDTH, LineCap, StrokeStyle};

/// Construction-time settings for a drawing surface.
///
/// Resolved once and never changed afterwards; a surface that needs
/// different colors is a new surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)] // missing fields fall back to the defaults below
pub struct PaintConfig {
    pub ink_color: Color32,
    pub background_color: Color32,
    pub stroke_width: f32,
    /// How the two open ends of every segment are finished
    pub line_cap: LineCap,
    /// Motion below this many pixels on both axes is treated as noise
    pub touch_tolerance: f32,
    pub anti_alias: bool,
    pub dither: bool,
}

impl Default for PaintConfig {
    fn default() -> Self {
        Self {
            ink_color: Color32::from_rgb(0xFF, 0xEB, 0x3B),
            background_color: Color32::from_rgb(0xFF, 0x55, 0x00),
            stroke_width: DEFAULT_STROKE_WIDTH,
            line_cap: LineCap::Round,
            touch_tolerance: DEFAULT_TOUCH_TOLERANCE,
            anti_alias: true,
            dither: true,
        }
    }
}

impl PaintConfig {
    /// Parse a config from JSON text and validate it
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        info!("Loaded paint config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.stroke_width.is_finite() || self.stroke_width <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "stroke_width must be positive, got {}",
                self.stroke_width
            )));
        }
        if !self.touch_tolerance.is_finite() || self.touch_tolerance < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "touch_tolerance must be non-negative, got {}",
                self.touch_tolerance
            )));
        }
        Ok(())
    }

    /// The ink style this config describes
    pub fn stroke_style(&self) -> StrokeStyle {
        StrokeStyle::new(self.ink_color)
            .with_width(self.stroke_width)
            .with_cap(self.line_cap)
            .with_anti_alias(self.anti_alias)
            .with_dither(self.dither)
    }
}
