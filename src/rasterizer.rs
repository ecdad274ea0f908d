use egui::epaint::QuadraticBezierShape;
use egui::{Color32, Pos2, Rect, pos2};
use image::Rgba;
use log::trace;

use crate::curve::QuadSegment;
use crate::style::{LineCap, StrokeStyle};
use crate::surface::{PixelRect, SurfaceBuffer};

/// Maximum deviation, in pixels, between a curve and its flattened polyline
const FLATTEN_TOLERANCE: f32 = 0.1;

// 4x4 ordered dither matrix
const BAYER_4X4: [[u8; 4]; 4] = [[0, 8, 2, 10], [12, 4, 14, 6], [3, 11, 1, 9], [15, 7, 13, 5]];

/// Draws curve segments into a [`SurfaceBuffer`] with a fixed style
#[derive(Debug, Clone, Copy)]
pub struct StrokeRasterizer {
    style: StrokeStyle,
}

impl StrokeRasterizer {
    pub fn new(style: StrokeStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &StrokeStyle {
        &self.style
    }

    pub fn draw(&self, segment: &QuadSegment, target: &mut SurfaceBuffer) -> Option<PixelRect> {
        draw(segment, &self.style, target)
    }
}

/// Render one quadratic segment into `target`.
///
/// Only adds ink: pixels are blended over what is already there and never
/// reset. Parts of the segment outside the buffer are clipped. Returns the
/// rectangle of pixels that changed, or `None` if nothing was touched.
pub fn draw(segment: &QuadSegment, style: &StrokeStyle, target: &mut SurfaceBuffer) -> Option<PixelRect> {
    let points = flatten(segment);
    if points.is_empty() || points.iter().any(|p| !p.is_finite()) {
        return None;
    }

    let mask = coverage_mask(&points, style, target.bounds())?;

    let ink = style.color.to_srgba_unmultiplied();
    let pixels = target.pixels_mut();
    let mut dirty: Option<PixelRect> = None;

    // Each pixel is blended once, with the best coverage any edge gave it
    for &index in &mask.touched {
        let (x, y) = mask.position(index);
        let offset = if style.dither { dither_offset(x, y) } else { 0.0 };
        blend(pixels.get_pixel_mut(x, y), ink, mask.values[index], offset);

        let pixel = PixelRect::new(x, y, x + 1, y + 1);
        dirty = Some(dirty.map_or(pixel, |r| r.union(pixel)));
    }

    trace!(
        "Rasterized segment {:?}: {} edges, {} pixels scanned, dirty {:?}",
        segment,
        points.len().saturating_sub(1),
        mask.visited,
        dirty
    );
    dirty
}

/// Coverage of one segment over its clipped bounding box, before blending
struct CoverageMask {
    area: PixelRect,
    values: Vec<f32>,
    /// Indices into `values` that received any coverage, in first-hit order
    touched: Vec<usize>,
    /// Pixels evaluated while building the mask
    visited: usize,
}

impl CoverageMask {
    fn new(area: PixelRect) -> Self {
        Self {
            area,
            values: vec![0.0; area.area()],
            touched: Vec::new(),
            visited: 0,
        }
    }

    fn index(&self, x: u32, y: u32) -> usize {
        (y - self.area.min_y) as usize * self.area.width() as usize + (x - self.area.min_x) as usize
    }

    fn position(&self, index: usize) -> (u32, u32) {
        let width = self.area.width() as usize;
        (
            self.area.min_x + (index % width) as u32,
            self.area.min_y + (index / width) as u32,
        )
    }

    /// Keep the larger of the stored and the new coverage
    fn record(&mut self, x: u32, y: u32, coverage: f32) {
        let index = self.index(x, y);
        let slot = &mut self.values[index];
        if coverage > *slot {
            if *slot <= 0.0 {
                self.touched.push(index);
            }
            *slot = coverage;
        }
    }

    fn scan(&mut self, area: PixelRect, anti_alias: bool, distance: impl Fn(Pos2) -> f32) {
        for y in area.min_y..area.max_y {
            for x in area.min_x..area.max_x {
                self.visited += 1;
                let center = pos2(x as f32 + 0.5, y as f32 + 0.5);
                let value = coverage(distance(center), anti_alias);
                if value > 0.0 {
                    self.record(x, y, value);
                }
            }
        }
    }
}

/// Build the coverage mask of a flattened stroke, clipped to `clip`.
///
/// Every edge only scans its own padded bounding box. Interior vertices get
/// round joins; the cap style applies at the two open ends.
fn coverage_mask(points: &[Pos2], style: &StrokeStyle, clip: PixelRect) -> Option<CoverageMask> {
    let half_width = style.half_width();
    // Square caps reach out diagonally from the endpoints
    let padding = half_width * std::f32::consts::SQRT_2 + 1.0;

    let area = clip_bounds(calculate_bounds(points, padding), clip)?;
    let mut mask = CoverageMask::new(area);

    if let [dot] = points {
        mask.scan(area, style.anti_alias, |p| cap_dot_distance(p, *dot, half_width, style.cap));
        return Some(mask);
    }

    let last = points.len() - 2;
    for (i, edge) in points.windows(2).enumerate() {
        let Some(edge_area) = clip_bounds(calculate_bounds(edge, padding), area) else {
            continue;
        };
        mask.scan(edge_area, style.anti_alias, |p| {
            edge_distance(p, edge[0], edge[1], half_width, i == 0, i == last, style.cap)
        });
    }

    Some(mask)
}

/// Pixels of `clip` overlapping `bounds`, or `None` when they are disjoint
fn clip_bounds(bounds: Rect, clip: PixelRect) -> Option<PixelRect> {
    let x0 = (bounds.min.x.floor().max(0.0) as u32).clamp(clip.min_x, clip.max_x);
    let y0 = (bounds.min.y.floor().max(0.0) as u32).clamp(clip.min_y, clip.max_y);
    let x1 = (bounds.max.x.ceil().max(0.0) as u32).clamp(clip.min_x, clip.max_x);
    let y1 = (bounds.max.y.ceil().max(0.0) as u32).clamp(clip.min_y, clip.max_y);
    (x0 < x1 && y0 < y1).then(|| PixelRect::new(x0, y0, x1, y1))
}

/// Signed distance to coverage in `[0, 1]`
fn coverage(distance: f32, anti_alias: bool) -> f32 {
    if anti_alias {
        (0.5 - distance).clamp(0.0, 1.0)
    } else if distance <= 0.0 {
        1.0
    } else {
        0.0
    }
}

/// Approximate the segment by a polyline from `start` to `end`.
///
/// A degenerate segment whose points all coincide flattens to one point.
fn flatten(segment: &QuadSegment) -> Vec<Pos2> {
    let shape = QuadraticBezierShape::from_points_stroke(
        segment.points(),
        false,
        Color32::TRANSPARENT,
        egui::Stroke::NONE,
    );
    shape.flatten(Some(FLATTEN_TOLERANCE))
}

/// Calculate the bounding box for a set of points
fn calculate_bounds(points: &[Pos2], padding: f32) -> Rect {
    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;

    for point in points {
        min_x = min_x.min(point.x);
        min_y = min_y.min(point.y);
        max_x = max_x.max(point.x);
        max_y = max_y.max(point.y);
    }

    Rect::from_min_max(
        pos2(min_x - padding, min_y - padding),
        pos2(max_x + padding, max_y + padding),
    )
}

fn cap_dot_distance(point: Pos2, center: Pos2, half_width: f32, cap: LineCap) -> f32 {
    match cap {
        LineCap::Round => point.distance(center) - half_width,
        LineCap::Square => (point.x - center.x).abs().max((point.y - center.y).abs()) - half_width,
        // A zero-length butt-capped line has no area
        LineCap::Butt => f32::INFINITY,
    }
}

/// Signed distance from `point` to one stroked edge, negative inside the ink
fn edge_distance(
    point: Pos2,
    start: Pos2,
    end: Pos2,
    half_width: f32,
    open_start: bool,
    open_end: bool,
    cap: LineCap,
) -> f32 {
    let line_vec = end - start;
    let line_len = line_vec.length();
    if line_len == 0.0 {
        if open_start && open_end {
            return cap_dot_distance(point, start, half_width, cap);
        }
        return point.distance(start) - half_width;
    }

    if cap != LineCap::Round {
        let extension = if cap == LineCap::Square { half_width } else { 0.0 };
        let dir = line_vec / line_len;
        let point_vec = point - start;
        let along = point_vec.x * dir.x + point_vec.y * dir.y;
        let across = (point_vec.x * dir.y - point_vec.y * dir.x).abs();

        if open_start && along < 0.0 {
            return (across - half_width).max(-along - extension);
        }
        if open_end && along > line_len {
            return (across - half_width).max(along - line_len - extension);
        }
    }

    distance_to_line_segment(point, start, end) - half_width
}

/// Calculate distance from a point to a line segment
fn distance_to_line_segment(point: Pos2, line_start: Pos2, line_end: Pos2) -> f32 {
    let line_vec = line_end - line_start;
    let point_vec = point - line_start;

    let line_len = line_vec.length();
    if line_len == 0.0 {
        return point_vec.length();
    }

    let t = ((point_vec.x * line_vec.x + point_vec.y * line_vec.y) / line_len).clamp(0.0, line_len);
    let projection = line_start + (line_vec * t / line_len);
    (point - projection).length()
}

/// Threshold offset in `(-0.5, 0.5)` for the pixel at `(x, y)`.
///
/// Never moves an exact integer channel value, so fully covered opaque ink
/// stays exactly the ink color.
fn dither_offset(x: u32, y: u32) -> f32 {
    let level = BAYER_4X4[(y % 4) as usize][(x % 4) as usize];
    (level as f32 + 0.5) / 16.0 - 0.5
}

fn quantize(value: f32, offset: f32) -> u8 {
    (value + offset).round().clamp(0.0, 255.0) as u8
}

/// Source-over blend of straight-alpha `ink` scaled by `coverage` onto `dst`
fn blend(dst: &mut Rgba<u8>, ink: [u8; 4], coverage: f32, offset: f32) {
    let src_a = ink[3] as f32 / 255.0 * coverage;
    if src_a <= 0.0 {
        return;
    }
    let dst_a = dst[3] as f32 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);

    for i in 0..3 {
        let value = (ink[i] as f32 * src_a + dst[i] as f32 * dst_a * (1.0 - src_a)) / out_a;
        dst[i] = quantize(value, offset);
    }
    dst[3] = quantize(out_a * 255.0, offset);
}

#[cfg(test)]
mod tests {
    use super::*;

    const BACKGROUND: Color32 = Color32::WHITE;
    const INK: Color32 = Color32::from_rgb(10, 20, 200);

    fn canvas() -> SurfaceBuffer {
        SurfaceBuffer::new(64, 48, BACKGROUND).unwrap()
    }

    // A straight horizontal segment along y = 20 from x = 20 to x = 40
    fn horizontal() -> QuadSegment {
        QuadSegment::new(pos2(20.0, 20.0), pos2(30.0, 20.0), pos2(40.0, 20.0))
    }

    #[test]
    fn test_straight_segment_honors_width() {
        let mut surface = canvas();
        let style = StrokeStyle::new(INK);
        let dirty = draw(&horizontal(), &style, &mut surface);
        assert!(dirty.is_some());

        // Pixel centers 5.5 px from the line are inside the 12 px stroke
        assert_eq!(surface.pixel(30, 20), Some(INK));
        assert_eq!(surface.pixel(30, 25), Some(INK));
        assert_eq!(surface.pixel(30, 14), Some(INK));
        // 6.5 px away is outside
        assert_eq!(surface.pixel(30, 26), Some(BACKGROUND));
        assert_eq!(surface.pixel(30, 13), Some(BACKGROUND));
        assert_eq!(surface.pixel(5, 40), Some(BACKGROUND));
    }

    #[test]
    fn test_round_cap_extends_past_endpoint() {
        let mut surface = canvas();
        draw(&horizontal(), &StrokeStyle::new(INK), &mut surface);
        // Center at x = 16.5, 3.5 px before the start
        assert_eq!(surface.pixel(16, 19), Some(INK));
        assert_eq!(surface.pixel(43, 20), Some(INK));
    }

    #[test]
    fn test_butt_cap_stops_at_endpoint() {
        let mut surface = canvas();
        let style = StrokeStyle::new(INK).with_cap(LineCap::Butt);
        draw(&horizontal(), &style, &mut surface);
        assert_eq!(surface.pixel(16, 19), Some(BACKGROUND));
        assert_eq!(surface.pixel(43, 20), Some(BACKGROUND));
        assert_eq!(surface.pixel(25, 20), Some(INK));
    }

    #[test]
    fn test_square_cap_covers_corner() {
        let mut surface = canvas();
        let style = StrokeStyle::new(INK).with_cap(LineCap::Square);
        draw(&horizontal(), &style, &mut surface);
        // (15.5, 15.5) is outside a round cap but inside the square one
        assert_eq!(surface.pixel(15, 15), Some(INK));
    }

    #[test]
    fn test_curved_segment_passes_through_midpoint() {
        let mut surface = canvas();
        let segment = QuadSegment::new(pos2(10.0, 40.0), pos2(30.0, 0.0), pos2(50.0, 40.0));
        draw(&segment, &StrokeStyle::new(INK), &mut surface);

        let mid = segment.sample(0.5);
        assert_eq!(surface.pixel(mid.x as u32, mid.y as u32), Some(INK));
        // The control point itself is far off the curve
        assert_eq!(surface.pixel(30, 1), Some(BACKGROUND));
    }

    #[test]
    fn test_drawing_is_append_only() {
        let mut surface = canvas();
        let red = StrokeStyle::new(Color32::RED);
        let blue = StrokeStyle::new(Color32::BLUE);

        draw(&horizontal(), &red, &mut surface);
        let other = QuadSegment::new(pos2(20.0, 40.0), pos2(30.0, 40.0), pos2(40.0, 40.0));
        draw(&other, &blue, &mut surface);

        assert_eq!(surface.pixel(30, 20), Some(Color32::RED));
        assert_eq!(surface.pixel(30, 40), Some(Color32::BLUE));
    }

    #[test]
    fn test_off_buffer_segment_is_clipped() {
        let mut surface = canvas();
        let before = surface.present().clone();
        let segment = QuadSegment::new(pos2(-500.0, -500.0), pos2(-400.0, -300.0), pos2(-200.0, -450.0));
        assert_eq!(draw(&segment, &StrokeStyle::new(INK), &mut surface), None);
        assert_eq!(surface.present().as_raw(), before.as_raw());
    }

    #[test]
    fn test_partially_visible_segment_is_clipped() {
        let mut surface = canvas();
        let segment = QuadSegment::new(pos2(-30.0, 10.0), pos2(0.0, 10.0), pos2(30.0, 10.0));
        let dirty = draw(&segment, &StrokeStyle::new(INK), &mut surface).unwrap();
        assert_eq!(dirty.min_x, 0);
        // Round cap reaches 6 px past the end at x = 30
        assert!(dirty.max_x <= 37);
        assert_eq!(surface.pixel(0, 10), Some(INK));
    }

    #[test]
    fn test_dirty_rect_covers_exactly_the_changed_pixels() {
        let mut surface = canvas();
        let before = surface.present().clone();
        let dirty = draw(&horizontal(), &StrokeStyle::new(INK), &mut surface).unwrap();

        for y in 0..surface.height() {
            for x in 0..surface.width() {
                if before.get_pixel(x, y) != surface.present().get_pixel(x, y) {
                    assert!(dirty.contains(x, y), "{},{} changed outside {:?}", x, y, dirty);
                }
            }
        }
        // Round caps put ink 3.5 px before the start and after the end
        assert!(dirty.min_x <= 16 && dirty.max_x >= 44);
        assert!(dirty.min_y >= 13 && dirty.max_y <= 28);
    }

    #[test]
    fn test_long_segment_scans_only_near_its_edges() {
        // A swipe across a phone-sized canvas
        let clip = PixelRect::new(0, 0, 1080, 1920);
        let segment = QuadSegment::new(pos2(0.0, 0.0), pos2(1000.0, 100.0), pos2(1000.0, 1800.0));
        let style = StrokeStyle::new(INK);

        let mask = coverage_mask(&flatten(&segment), &style, clip).unwrap();
        assert!(
            mask.visited < mask.area.area() / 4,
            "scanned {} of {} pixels",
            mask.visited,
            mask.area.area()
        );
        assert!(!mask.touched.is_empty());

        let mut surface = SurfaceBuffer::new(1080, 1920, BACKGROUND).unwrap();
        let dirty = draw(&segment, &style, &mut surface).unwrap();
        let mid = segment.sample(0.5);
        assert_eq!(surface.pixel(mid.x as u32, mid.y as u32), Some(INK));
        assert_eq!(surface.pixel(100, 1500), Some(BACKGROUND));
        assert!(dirty.max_y >= 1800);
    }

    #[test]
    fn test_overlapping_edges_blend_once() {
        let mut surface = canvas();
        let style = StrokeStyle::new(Color32::from_rgba_unmultiplied(0, 0, 0, 128)).with_dither(false);
        // Tight turn: the edges around the apex overlap heavily
        let segment = QuadSegment::new(pos2(10.0, 30.0), pos2(30.0, 10.0), pos2(50.0, 30.0));
        draw(&segment, &style, &mut surface);

        let single = {
            let mut dst = Rgba(BACKGROUND.to_srgba_unmultiplied());
            blend(&mut dst, style.color.to_srgba_unmultiplied(), 1.0, 0.0);
            Color32::from_rgba_unmultiplied(dst[0], dst[1], dst[2], dst[3])
        };
        let apex = segment.sample(0.5);
        assert_eq!(surface.pixel(apex.x as u32, apex.y as u32), Some(single));
    }

    #[test]
    fn test_degenerate_segment_draws_dot() {
        let mut surface = canvas();
        let p = pos2(32.0, 24.0);
        let dirty = draw(&QuadSegment::new(p, p, p), &StrokeStyle::new(INK), &mut surface);
        assert!(dirty.is_some());
        assert_eq!(surface.pixel(32, 24), Some(INK));
        assert_eq!(surface.pixel(32, 31), Some(BACKGROUND));
    }

    #[test]
    fn test_aliased_stroke_has_no_partial_pixels() {
        let mut surface = canvas();
        let style = StrokeStyle::new(INK).with_anti_alias(false).with_dither(false);
        let segment = QuadSegment::new(pos2(5.0, 5.0), pos2(40.0, 10.0), pos2(55.0, 40.0));
        draw(&segment, &style, &mut surface);

        for y in 0..surface.height() {
            for x in 0..surface.width() {
                let c = surface.pixel(x, y).unwrap();
                assert!(c == INK || c == BACKGROUND, "partial pixel {:?} at {},{}", c, x, y);
            }
        }
    }

    #[test]
    fn test_anti_aliased_edge_is_blended() {
        let mut surface = canvas();
        let style = StrokeStyle::new(Color32::BLACK).with_dither(false);
        // Line along y = 20.5 so pixel row 26 has its center exactly on the edge
        let segment = QuadSegment::new(pos2(20.0, 20.0), pos2(30.0, 20.0), pos2(40.0, 20.0));
        let moved = QuadSegment::new(
            segment.start + egui::vec2(0.0, 0.5),
            segment.control + egui::vec2(0.0, 0.5),
            segment.end + egui::vec2(0.0, 0.5),
        );
        draw(&moved, &style, &mut surface);

        let edge = surface.pixel(30, 26).unwrap();
        assert!(edge.r() > 100 && edge.r() < 155, "edge was {:?}", edge);
    }

    #[test]
    fn test_dither_offsets_stay_inside_half_step() {
        for y in 0..4 {
            for x in 0..4 {
                let offset = dither_offset(x, y);
                assert!(offset > -0.5 && offset < 0.5);
                assert_eq!(quantize(200.0, offset), 200);
            }
        }
    }

    #[test]
    fn test_translucent_ink_blends_with_background() {
        let mut dst = Rgba([255, 255, 255, 255]);
        blend(&mut dst, [0, 0, 0, 128], 1.0, 0.0);
        assert!(dst[0] > 120 && dst[0] < 135);
        assert_eq!(dst[3], 255);
    }
}
