use egui::Color32;
use serde::{Deserialize, Serialize};

/// Width of the ink line, in surface pixels
pub const DEFAULT_STROKE_WIDTH: f32 = 12.0;

/// Shape drawn at the open ends of a stroked segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LineCap {
    /// Ends exactly at the endpoint
    Butt,
    #[default]
    Round,
    /// Extends past the endpoint by half the stroke width
    Square,
}

/// Shape drawn where two flattened pieces of a segment meet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[non_exhaustive]
pub enum LineJoin {
    #[default]
    Round,
}

/// Immutable description of how ink is laid down.
///
/// A controller builds one of these from its [`crate::PaintConfig`] and never
/// changes it afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    pub color: Color32,
    pub width: f32,
    pub cap: LineCap,
    pub join: LineJoin,
    /// Smooth edges with a one pixel coverage ramp
    pub anti_alias: bool,
    /// Ordered dithering when quantizing blended channels
    pub dither: bool,
}

impl StrokeStyle {
    pub fn new(color: Color32) -> Self {
        Self {
            color,
            width: DEFAULT_STROKE_WIDTH,
            cap: LineCap::Round,
            join: LineJoin::Round,
            anti_alias: true,
            dither: true,
        }
    }

    pub fn with_width(mut self, width: f32) -> Self {
        self.width = width;
        self
    }

    pub fn with_cap(mut self, cap: LineCap) -> Self {
        self.cap = cap;
        self
    }

    pub fn with_anti_alias(mut self, anti_alias: bool) -> Self {
        self.anti_alias = anti_alias;
        self
    }

    pub fn with_dither(mut self, dither: bool) -> Self {
        self.dither = dither;
        self
    }

    pub fn half_width(&self) -> f32 {
        self.width / 2.0
    }
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self::new(Color32::BLACK)
    }
}
