#![warn(clippy::all, rust_2018_idioms)]

pub mod app;
pub mod config;
pub mod controller;
pub mod curve;
pub mod error;
pub mod filter;
pub mod input;
pub mod rasterizer;
pub mod style;
pub mod surface;

pub use app::PaintApp;
pub use config::PaintConfig;
pub use controller::{GestureState, InputController, RepaintSignal, TouchSurface};
pub use curve::{QuadSegment, Stroke};
pub use error::{ConfigError, SurfaceError};
pub use filter::StrokeFilter;
pub use input::{PointerTranslator, TouchAction, TouchEvent};
pub use rasterizer::StrokeRasterizer;
pub use style::{LineCap, LineJoin, StrokeStyle};
pub use surface::{MAX_CANVAS_SIDE, PixelRect, SurfaceBuffer};
