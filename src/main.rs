#![warn(clippy::all, rust_2018_idioms)]

use minipaint::{PaintApp, PaintConfig};

fn main() -> eframe::Result {
    env_logger::init(); // Log to stderr (if you run with `RUST_LOG=debug`).

    let config = match std::env::args().nth(1) {
        Some(path) => PaintConfig::load(&path).unwrap_or_else(|err| {
            log::warn!("Using default config: {}", err);
            PaintConfig::default()
        }),
        None => PaintConfig::default(),
    };

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([480.0, 800.0])
            .with_min_inner_size([200.0, 200.0]),
        ..Default::default()
    };
    eframe::run_native(
        "MiniPaint",
        native_options,
        Box::new(|cc| Ok(Box::new(PaintApp::new(cc, config)))),
    )
}
