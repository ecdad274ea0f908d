use egui::{Pos2, pos2};

/// One quadratic Bézier piece of a stroke.
///
/// Raw touch samples end up as control points; the curve passes through the
/// midpoints between consecutive samples, which keeps the path free of
/// polyline corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadSegment {
    pub start: Pos2,
    pub control: Pos2,
    pub end: Pos2,
}

impl QuadSegment {
    pub fn new(start: Pos2, control: Pos2, end: Pos2) -> Self {
        Self {
            start,
            control,
            end,
        }
    }

    pub fn points(&self) -> [Pos2; 3] {
        [self.start, self.control, self.end]
    }

    /// Evaluate the curve at `t` in `[0, 1]`
    pub fn sample(&self, t: f32) -> Pos2 {
        let u = 1.0 - t;
        let a = u * u;
        let b = 2.0 * u * t;
        let c = t * t;
        pos2(
            a * self.start.x + b * self.control.x + c * self.end.x,
            a * self.start.y + b * self.control.y + c * self.end.y,
        )
    }
}

fn midpoint(a: Pos2, b: Pos2) -> Pos2 {
    pos2((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
}

/// The in-progress curve for a single touch gesture.
///
/// Lives from touch-start to touch-end and is then dropped. Only the pixels
/// it produced are kept.
#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    // Last point the curve actually reaches
    anchor: Pos2,
    // Last accepted raw sample, the next segment's control point
    reference: Pos2,
    segments: Vec<QuadSegment>,
}

impl Stroke {
    /// Start a curve consisting of the single point `start`
    pub fn begin(start: Pos2) -> Self {
        Self {
            anchor: start,
            reference: start,
            segments: Vec::new(),
        }
    }

    pub fn anchor(&self) -> Pos2 {
        self.anchor
    }

    pub fn reference(&self) -> Pos2 {
        self.reference
    }

    pub fn segments(&self) -> &[QuadSegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Extend the curve toward `point` and return the segment just committed.
    ///
    /// The new segment starts at the current anchor, bends toward the previous
    /// sample and ends halfway between that sample and `point`.
    pub fn extend(&mut self, point: Pos2) -> QuadSegment {
        let end = midpoint(self.reference, point);
        let segment = QuadSegment::new(self.anchor, self.reference, end);

        self.segments.push(segment);
        self.anchor = end;
        self.reference = point;

        segment
    }
}
