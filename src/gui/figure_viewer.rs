//! Figure Viewer Window
//! Pages through rendered figures one at a time. Runs until the window is
//! closed.

use crate::charts::Figure;
use egui::{Color32, RichText, ScrollArea, TextureHandle, TextureOptions};

/// Viewer window state.
pub struct FigureViewer {
    figures: Vec<Figure>,
    textures: Vec<Option<TextureHandle>>,
    current: usize,
}

impl FigureViewer {
    pub fn new(figures: Vec<Figure>) -> Self {
        let textures = figures.iter().map(|_| None).collect();
        Self {
            figures,
            textures,
            current: 0,
        }
    }

    /// Open the window and block until it is closed.
    pub fn run(figures: Vec<Figure>) -> anyhow::Result<()> {
        if figures.is_empty() {
            log::info!("No figures to display");
            return Ok(());
        }

        let (width, height) = figures
            .iter()
            .fold((0u32, 0u32), |(w, h), f| (w.max(f.width), h.max(f.height)));

        let options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size([width as f32 + 40.0, height as f32 + 90.0])
                .with_min_inner_size([640.0, 420.0])
                .with_title("COVID-19 Explorer"),
            ..Default::default()
        };

        let viewer = FigureViewer::new(figures);
        eframe::run_native(
            "COVID-19 Explorer",
            options,
            Box::new(|_cc| Ok(Box::new(viewer))),
        )
        .map_err(|e| anyhow::anyhow!("Viewer window failed: {e}"))
    }

    #[allow(dead_code)]
    pub fn current(&self) -> usize {
        self.current
    }

    pub fn next(&mut self) {
        if self.current + 1 < self.figures.len() {
            self.current += 1;
        }
    }

    pub fn previous(&mut self) {
        self.current = self.current.saturating_sub(1);
    }

    fn texture(&mut self, ctx: &egui::Context) -> Option<TextureHandle> {
        let figure = self.figures.get(self.current)?;
        let slot = self.textures.get_mut(self.current)?;

        if slot.is_none() {
            let image = egui::ColorImage::from_rgb(
                [figure.width as usize, figure.height as usize],
                &figure.pixels,
            );
            *slot = Some(ctx.load_texture(figure.slug(), image, TextureOptions::LINEAR));
        }

        slot.clone()
    }
}

impl eframe::App for FigureViewer {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if ctx.input(|i| i.key_pressed(egui::Key::ArrowRight)) {
            self.next();
        }
        if ctx.input(|i| i.key_pressed(egui::Key::ArrowLeft)) {
            self.previous();
        }

        let total = self.figures.len();
        let title = self
            .figures
            .get(self.current)
            .map(|f| f.title.clone())
            .unwrap_or_default();

        egui::TopBottomPanel::top("figure_nav").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui
                    .add_enabled(self.current > 0, egui::Button::new("◀ Previous"))
                    .clicked()
                {
                    self.previous();
                }
                if ui
                    .add_enabled(self.current + 1 < total, egui::Button::new("Next ▶"))
                    .clicked()
                {
                    self.next();
                }
                ui.add_space(12.0);
                ui.label(
                    RichText::new(format!("{} / {}", self.current + 1, total))
                        .color(Color32::GRAY),
                );
                ui.add_space(12.0);
                ui.label(RichText::new(&title).size(16.0).strong());
            });
        });

        let texture = self.texture(ctx);
        egui::CentralPanel::default().show(ctx, |ui| match texture {
            Some(texture) => {
                ScrollArea::both().auto_shrink([false, false]).show(ui, |ui| {
                    ui.add(egui::Image::from_texture(&texture).shrink_to_fit());
                });
            }
            None => {
                ui.centered_and_justified(|ui| {
                    ui.label(RichText::new("No Data").size(20.0));
                });
            }
        });
    }
}
