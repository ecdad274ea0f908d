use std::path::Path;

use egui::{Color32, ColorImage};
use image::{GenericImageView, ImageFormat, RgbaImage};
use log::{debug, info};

use crate::error::{SurfaceError, SurfaceResult};

/// Largest canvas side accepted, matching common GPU texture limits.
///
/// Anything bigger fails with [`SurfaceError::Allocation`] up front; with
/// memory overcommit a fallible reservation alone would not catch it.
pub const MAX_CANVAS_SIDE: u32 = 16384;

/// Pixel-aligned rectangle in canvas coordinates, `max` exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl PixelRect {
    pub fn new(min_x: u32, min_y: u32, max_x: u32, max_y: u32) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn width(&self) -> u32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y
    }

    pub fn area(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.min_x && x < self.max_x && y >= self.min_y && y < self.max_y
    }

    pub fn union(self, other: Self) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }
}

/// The retained raster canvas that ink is drawn into.
///
/// Pixels are stored as straight (non-premultiplied) RGBA8. The buffer only
/// ever changes through drawing, [`SurfaceBuffer::clear`] and
/// [`SurfaceBuffer::resize`]; the last two wipe all ink back to the
/// background color.
#[derive(Clone)]
pub struct SurfaceBuffer {
    pixels: RgbaImage,
    background: Color32,
}

impl std::fmt::Debug for SurfaceBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceBuffer")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("background", &self.background)
            .finish()
    }
}

/// Allocate a `width` x `height` image filled with `background`.
///
/// Sides above [`MAX_CANVAS_SIDE`] are refused before touching memory, and
/// the reservation itself is fallible, so an oversized request comes back as
/// [`SurfaceError::Allocation`] instead of aborting the process.
fn allocate(width: u32, height: u32, background: Color32) -> SurfaceResult<RgbaImage> {
    let failed = || SurfaceError::Allocation { width, height };
    if width > MAX_CANVAS_SIDE || height > MAX_CANVAS_SIDE {
        return Err(failed());
    }

    let len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(failed)?;

    let mut raw: Vec<u8> = Vec::new();
    raw.try_reserve_exact(len).map_err(|_| failed())?;

    let fill = background.to_srgba_unmultiplied();
    raw.extend(fill.iter().copied().cycle().take(len));

    RgbaImage::from_raw(width, height, raw).ok_or_else(failed)
}

impl SurfaceBuffer {
    /// Creates a new canvas of the given size, cleared to `background`
    pub fn new(width: u32, height: u32, background: Color32) -> SurfaceResult<Self> {
        let pixels = allocate(width, height, background)?;
        info!("🖼️ Allocated {}x{} canvas", width, height);
        Ok(Self { pixels, background })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn background(&self) -> Color32 {
        self.background
    }

    /// Replace the buffer with a freshly cleared one of the new size.
    ///
    /// All ink is lost, even when the size did not change. If the new buffer
    /// cannot be allocated (including either side above [`MAX_CANVAS_SIDE`])
    /// the current one is left untouched.
    pub fn resize(&mut self, width: u32, height: u32) -> SurfaceResult<()> {
        let pixels = allocate(width, height, self.background)?;
        debug!(
            "Canvas resized {}x{} -> {}x{}",
            self.width(),
            self.height(),
            width,
            height
        );
        self.pixels = pixels;
        Ok(())
    }

    /// Wipe all ink without reallocating
    pub fn clear(&mut self) {
        let fill = image::Rgba(self.background.to_srgba_unmultiplied());
        for pixel in self.pixels.pixels_mut() {
            *pixel = fill;
        }
    }

    /// Read-only view of the pixels for compositing
    pub fn present(&self) -> &RgbaImage {
        &self.pixels
    }

    pub(crate) fn pixels_mut(&mut self) -> &mut RgbaImage {
        &mut self.pixels
    }

    /// Color at `(x, y)`, or `None` outside the buffer
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color32> {
        self.pixels
            .get_pixel_checked(x, y)
            .map(|p| Color32::from_rgba_unmultiplied(p[0], p[1], p[2], p[3]))
    }

    /// Copy the canvas into an egui image for uploading as a texture
    pub fn to_color_image(&self) -> ColorImage {
        ColorImage::from_rgba_unmultiplied(
            [self.width() as usize, self.height() as usize],
            self.pixels.as_raw(),
        )
    }

    /// The whole canvas as a rectangle
    pub fn bounds(&self) -> PixelRect {
        PixelRect::new(0, 0, self.width(), self.height())
    }

    /// Copy part of the canvas into an egui image, for partial texture updates.
    ///
    /// `rect` is clipped to the canvas.
    pub fn region_color_image(&self, rect: PixelRect) -> ColorImage {
        let max_x = rect.max_x.min(self.width());
        let max_y = rect.max_y.min(self.height());
        let min_x = rect.min_x.min(max_x);
        let min_y = rect.min_y.min(max_y);
        let region = self
            .pixels
            .view(min_x, min_y, max_x - min_x, max_y - min_y)
            .to_image();
        ColorImage::from_rgba_unmultiplied(
            [region.width() as usize, region.height() as usize],
            region.as_raw(),
        )
    }

    /// Write the current canvas to a PNG file
    pub fn save_png(&self, path: impl AsRef<Path>) -> SurfaceResult<()> {
        let path = path.as_ref();
        self.pixels.save_with_format(path, ImageFormat::Png)?;
        info!("💾 Saved canvas to {}", path.display());
        Ok(())
    }
}
