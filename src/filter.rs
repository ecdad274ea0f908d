use egui::Pos2;

/// Minimum motion, in pixels, before a finger movement counts as drawing
pub const DEFAULT_TOUCH_TOLERANCE: f32 = 8.0;

/// Returns true if `new` moved far enough from `reference` to be drawn.
///
/// Each axis is checked on its own: a move is accepted as soon as either
/// `|dx|` or `|dy|` reaches `tolerance`. This is not a radius check, so a
/// diagonal move can travel further than `tolerance` and still be rejected.
pub fn accept(new: Pos2, reference: Pos2, tolerance: f32) -> bool {
    let dx = (new.x - reference.x).abs();
    let dy = (new.y - reference.y).abs();
    dx >= tolerance || dy >= tolerance
}

/// Jitter filter bound to a fixed tolerance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeFilter {
    tolerance: f32,
}

impl StrokeFilter {
    pub fn new(tolerance: f32) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> f32 {
        self.tolerance
    }

    pub fn accepts(&self, new: Pos2, reference: Pos2) -> bool {
        accept(new, reference, self.tolerance)
    }
}

impl Default for StrokeFilter {
    fn default() -> Self {
        Self::new(DEFAULT_TOUCH_TOLERANCE)
    }
}
