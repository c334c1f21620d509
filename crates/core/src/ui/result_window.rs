//! Floating result window.
//!
//! Shows the captured image next to the recognized text, with a button to
//! copy the text to the clipboard. Presentation only: recognition is done
//! by the time this window opens.

use crate::error::{AppError, Result};
use crate::ocr::RecognizedLine;
use eframe::egui;
use image::DynamicImage;

const MAX_IMAGE_HEIGHT: f32 = 240.0;

/// Opens the result window and blocks until the user closes it.
pub fn show(text: &str, image: &DynamicImage, lines: &[RecognizedLine]) -> Result<()> {
    let buffer = image.to_rgba8();
    let size = [image.width() as usize, image.height() as usize];
    let pixels = buffer.as_flat_samples();
    let color_image = egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice());

    let mean_confidence = if lines.is_empty() {
        None
    } else {
        Some(lines.iter().map(|l| l.confidence).sum::<f32>() / lines.len() as f32)
    };

    let app = ResultWindow {
        text: text.to_string(),
        color_image: Some(color_image),
        texture: None,
        line_count: lines.len(),
        mean_confidence,
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([520.0, 480.0])
            .with_min_inner_size([320.0, 240.0])
            .with_always_on_top(),
        ..Default::default()
    };

    eframe::run_native(
        "textshot",
        options,
        Box::new(move |_cc| Ok(Box::new(app) as Box<dyn eframe::App>)),
    )
    .map_err(|e| AppError::ui(format!("Failed to run result window: {e}")))
}

struct ResultWindow {
    text: String,
    color_image: Option<egui::ColorImage>,
    texture: Option<egui::TextureHandle>,
    line_count: usize,
    mean_confidence: Option<f32>,
}

impl eframe::App for ResultWindow {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.set_visuals(egui::Visuals::dark());

        if self.texture.is_none() {
            if let Some(color_image) = self.color_image.take() {
                self.texture =
                    Some(ctx.load_texture("capture", color_image, egui::TextureOptions::LINEAR));
            }
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(texture) = &self.texture {
                let texture_size = texture.size_vec2();
                let scale = (ui.available_width() / texture_size.x)
                    .min(MAX_IMAGE_HEIGHT / texture_size.y)
                    .min(1.0);
                ui.image((texture.id(), texture_size * scale));
                ui.separator();
            }

            if self.text.is_empty() {
                ui.label(
                    egui::RichText::new("No text recognized in the selection.")
                        .color(egui::Color32::LIGHT_GRAY),
                );
            } else {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    ui.add(egui::Label::new(&self.text).selectable(true));
                });
            }

            ui.separator();
            ui.horizontal(|ui| {
                if ui.button("Copy").clicked() {
                    if let Ok(mut clipboard) = arboard::Clipboard::new() {
                        let _ = clipboard.set_text(&self.text);
                    }
                }
                if ui.button("Close").clicked() {
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
                if let Some(confidence) = self.mean_confidence {
                    ui.label(
                        egui::RichText::new(format!(
                            "{} lines, {:.0}% confidence",
                            self.line_count,
                            confidence * 100.0
                        ))
                        .small()
                        .color(egui::Color32::GRAY),
                    );
                }
            });
        });

        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
    }
}
