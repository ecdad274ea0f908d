use egui::{Color32, Rect, TextureHandle, TextureOptions, pos2};
use log::{error, info, trace};

use crate::config::PaintConfig;
use crate::controller::{InputController, TouchSurface};
use crate::input::PointerTranslator;

/// Where "Save PNG" writes the canvas
const SNAPSHOT_PATH: &str = "minipaint.png";

/// eframe host: feeds pointer input and canvas size changes into an
/// [`InputController`] and shows its buffer as a texture.
pub struct PaintApp {
    controller: InputController<egui::Context>,
    input: PointerTranslator,
    texture: Option<TextureHandle>,
    canvas_size: [u32; 2],
}

impl PaintApp {
    /// Called once before the first frame.
    pub fn new(cc: &eframe::CreationContext<'_>, config: PaintConfig) -> Self {
        Self {
            controller: InputController::new(config, cc.egui_ctx.clone()),
            input: PointerTranslator::new(Rect::NOTHING),
            texture: None,
            canvas_size: [0, 0],
        }
    }

    fn resize_canvas(&mut self, rect: Rect) {
        let size = [rect.width().round() as u32, rect.height().round() as u32];
        if size == self.canvas_size {
            return;
        }
        self.canvas_size = size;
        if let Err(err) = self.controller.on_resize(size[0], size[1]) {
            error!("Could not allocate canvas: {}", err);
        }
    }

    /// Bring the texture up to date, sending only the pixels that changed
    fn upload_texture(&mut self, ctx: &egui::Context) {
        let damage = self.controller.take_damage();
        let Some(surface) = self.controller.surface() else {
            self.texture = None;
            return;
        };

        let full_size = [surface.width() as usize, surface.height() as usize];
        if let Some(texture) = self.texture.as_mut().filter(|t| t.size() == full_size) {
            if let Some(rect) = damage {
                trace!("Uploading {}x{} of the canvas", rect.width(), rect.height());
                let region = surface.region_color_image(rect);
                texture.set_partial(
                    [rect.min_x as usize, rect.min_y as usize],
                    region,
                    TextureOptions::NEAREST,
                );
            }
            return;
        }

        let image = surface.to_color_image();
        self.texture = Some(ctx.load_texture("canvas", image, TextureOptions::NEAREST));
    }

    fn save_snapshot(&self) {
        match self.controller.surface() {
            Some(surface) => {
                if let Err(err) = surface.save_png(SNAPSHOT_PATH) {
                    error!("{}", err);
                }
            }
            None => info!("Nothing to save yet"),
        }
    }
}

impl eframe::App for PaintApp {
    /// Called each time the UI needs repainting, which may be many times per second.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("MiniPaint");
                if ui.button("Clear").clicked() {
                    self.controller.clear();
                }
                if ui.button("Save PNG").clicked() {
                    self.save_snapshot();
                }
            });
        });

        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                let (response, painter) = ui.allocate_painter(ui.available_size(), egui::Sense::drag());
                let rect = response.rect;

                self.resize_canvas(rect);
                self.input.set_canvas_rect(rect);
                for event in self.input.process_input(ctx) {
                    self.controller.on_touch(event);
                }

                self.upload_texture(ctx);
                if let Some(texture) = &self.texture {
                    let uv = Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0));
                    painter.image(texture.id(), rect, uv, Color32::WHITE);
                }
            });
    }
}
