//! The touch state machine that turns gestures into ink.
//!
//! [`InputController`] owns everything a drawing surface needs: the jitter
//! filter, the in-progress [`Stroke`], the rasterizer and the retained
//! [`SurfaceBuffer`]. Hosts talk to it through [`TouchSurface`] and get
//! "please redraw" notifications through a [`RepaintSignal`].
//!
//! Events are handled synchronously, one at a time:
//!
//! - `Start` begins a fresh stroke at the touch position.
//! - `Move` is filtered; accepted moves extend the curve, draw the new
//!   segment and request a repaint.
//! - `End` drops the stroke. Ink already drawn stays in the buffer.
//!
//! Pixels changed since the host last looked are accumulated as damage, so
//! the host only has to re-upload that part of the canvas.

use egui::{Pos2, pos2};
use image::RgbaImage;
use log::{debug, error, info};

use crate::config::PaintConfig;
use crate::curve::Stroke;
use crate::error::SurfaceResult;
use crate::filter::StrokeFilter;
use crate::input::{TouchAction, TouchEvent};
use crate::rasterizer::StrokeRasterizer;
use crate::surface::{PixelRect, SurfaceBuffer};

/// Fire-and-forget request for the host to redraw
pub trait RepaintSignal {
    fn request_repaint(&self);
}

impl RepaintSignal for egui::Context {
    fn request_repaint(&self) {
        egui::Context::request_repaint(self);
    }
}

/// For headless use where nobody is watching
impl RepaintSignal for () {
    fn request_repaint(&self) {}
}

/// What a host needs from a drawing surface
pub trait TouchSurface {
    /// Handle one touch sample. Always consumes the event.
    fn on_touch(&mut self, event: TouchEvent) -> bool;

    /// The display area changed size (or became known for the first time)
    fn on_resize(&mut self, width: u32, height: u32) -> SurfaceResult<()>;

    /// Pixels to composite, if a buffer exists yet
    fn render(&self) -> Option<&RgbaImage>;
}

/// Where the controller is in the touch lifecycle
#[derive(Debug, Clone, PartialEq, Default)]
pub enum GestureState {
    #[default]
    Idle,
    Drawing(Stroke),
}

pub struct InputController<R: RepaintSignal = ()> {
    config: PaintConfig,
    filter: StrokeFilter,
    rasterizer: StrokeRasterizer,
    surface: Option<SurfaceBuffer>,
    state: GestureState,
    // Last accepted sample; the implicit start of a move with no touch-start
    last_reference: Pos2,
    segments_drawn: u64,
    // Pixels changed since the last `take_damage`
    damage: Option<PixelRect>,
    repaint: R,
}

impl<R: RepaintSignal> std::fmt::Debug for InputController<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputController")
            .field("config", &self.config)
            .field("surface", &self.surface)
            .field("state", &self.state)
            .field("last_reference", &self.last_reference)
            .field("segments_drawn", &self.segments_drawn)
            .field("damage", &self.damage)
            .finish()
    }
}

impl<R: RepaintSignal> InputController<R> {
    /// Creates a controller with no buffer; the first resize allocates one
    pub fn new(config: PaintConfig, repaint: R) -> Self {
        Self {
            filter: StrokeFilter::new(config.touch_tolerance),
            rasterizer: StrokeRasterizer::new(config.stroke_style()),
            surface: None,
            state: GestureState::Idle,
            last_reference: pos2(0.0, 0.0),
            segments_drawn: 0,
            damage: None,
            repaint,
            config,
        }
    }

    pub fn config(&self) -> &PaintConfig {
        &self.config
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self.state, GestureState::Drawing(_))
    }

    /// The stroke of the gesture in progress
    pub fn stroke(&self) -> Option<&Stroke> {
        match &self.state {
            GestureState::Drawing(stroke) => Some(stroke),
            GestureState::Idle => None,
        }
    }

    pub fn surface(&self) -> Option<&SurfaceBuffer> {
        self.surface.as_ref()
    }

    pub fn repaint(&self) -> &R {
        &self.repaint
    }

    /// Number of segments rasterized since this controller was created
    pub fn segments_drawn(&self) -> u64 {
        self.segments_drawn
    }

    /// Pixels changed since the previous call, clearing the record.
    ///
    /// `None` means the host's copy of the canvas is still current.
    pub fn take_damage(&mut self) -> Option<PixelRect> {
        self.damage.take()
    }

    fn add_damage(&mut self, rect: PixelRect) {
        self.damage = Some(self.damage.map_or(rect, |d| d.union(rect)));
    }

    /// Wipe all ink back to the background color, keeping the buffer size
    pub fn clear(&mut self) {
        if let Some(surface) = self.surface.as_mut() {
            surface.clear();
            self.damage = Some(surface.bounds());
            info!("🧽 Canvas cleared");
            self.repaint.request_repaint();
        }
    }

    fn touch_start(&mut self, position: Pos2) {
        self.state = GestureState::Drawing(Stroke::begin(position));
        self.last_reference = position;
    }

    fn touch_move(&mut self, position: Pos2) {
        if !self.is_drawing() {
            debug!(
                "Move without touch-start, starting at {:?}",
                self.last_reference
            );
            self.state = GestureState::Drawing(Stroke::begin(self.last_reference));
        }
        let GestureState::Drawing(stroke) = &mut self.state else {
            return;
        };

        if !self.filter.accepts(position, stroke.reference()) {
            return;
        }

        let segment = stroke.extend(position);
        self.last_reference = position;

        if let Some(surface) = self.surface.as_mut() {
            let dirty = self.rasterizer.draw(&segment, surface);
            self.segments_drawn += 1;
            if let Some(rect) = dirty {
                self.add_damage(rect);
            }
        }
        self.repaint.request_repaint();
    }

    fn touch_end(&mut self) {
        if let GestureState::Drawing(stroke) = std::mem::take(&mut self.state) {
            debug!("Stroke finished with {} segments", stroke.segments().len());
        }
    }
}

impl<R: RepaintSignal> TouchSurface for InputController<R> {
    fn on_touch(&mut self, event: TouchEvent) -> bool {
        match event.action {
            TouchAction::Start => self.touch_start(event.position),
            TouchAction::Move => self.touch_move(event.position),
            TouchAction::End => self.touch_end(),
        }
        true
    }

    /// Reallocate the buffer for the new size, losing all ink.
    ///
    /// A zero-sized area leaves the controller without a buffer. If
    /// allocation fails the old buffer is dropped as well and the error is
    /// returned; drawing resumes after the next successful resize.
    fn on_resize(&mut self, width: u32, height: u32) -> SurfaceResult<()> {
        if width == 0 || height == 0 {
            debug!("Canvas area is empty ({}x{}), dropping buffer", width, height);
            self.surface = None;
            self.damage = None;
            return Ok(());
        }

        let result = if let Some(surface) = self.surface.as_mut() {
            surface.resize(width, height)
        } else {
            SurfaceBuffer::new(width, height, self.config.background_color)
                .map(|surface| self.surface = Some(surface))
        };

        if let Err(err) = result {
            error!("Canvas resize failed: {}", err);
            self.surface = None;
            self.damage = None;
            return Err(err);
        }

        // A fresh buffer replaces everything the host has
        self.damage = self.surface.as_ref().map(SurfaceBuffer::bounds);

        self.repaint.request_repaint();
        Ok(())
    }

    fn render(&self) -> Option<&RgbaImage> {
        self.surface.as_ref().map(SurfaceBuffer::present)
    }
}
