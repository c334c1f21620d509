//! Fullscreen selection overlay.
//!
//! Presents the frozen snapshot as a topmost, undecorated, fullscreen
//! window and feeds pointer and key input into the selection gesture. The
//! overlay itself holds no selection logic: it is the event transport in
//! front of [`SelectionGesture`], and it closes as soon as the gesture
//! reaches a terminal state.

use super::rendering::{draw_hint_banner, draw_selection_border, draw_selection_mask};
use crate::error::{AppError, Result};
use crate::gesture::{PointerEvent, SelectionGesture, SelectionState};
use crate::geometry::{LogicalPoint, LogicalRect};
use crate::session::{OverlaySurface, SelectionOutcome};
use crate::snapshot::Snapshot;
use eframe::egui;
use std::sync::{Arc, Mutex};

/// [`OverlaySurface`] implementation over an eframe fullscreen window.
///
/// Each call to [`OverlaySurface::run`] opens the overlay, blocks the main
/// context until the user commits or cancels, and tears the window down
/// before returning.
pub struct EguiOverlay;

impl OverlaySurface for EguiOverlay {
    fn run(&mut self, snapshot: &Snapshot) -> Result<SelectionOutcome> {
        // Convert the snapshot up front; uploading the texture is cheap,
        // the RGBA conversion is not and must not happen inside the frame
        // loop.
        let buffer = snapshot.image.to_rgba8();
        let size = [
            snapshot.image.width() as usize,
            snapshot.image.height() as usize,
        ];
        let pixels = buffer.as_flat_samples();
        let color_image = egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice());

        let outcome = Arc::new(Mutex::new(None));
        let shared = outcome.clone();

        let options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_fullscreen(true)
                .with_decorations(false)
                .with_always_on_top(),
            ..Default::default()
        };

        eframe::run_native(
            "textshot selection",
            options,
            Box::new(move |_cc| {
                Ok(Box::new(OverlayApp::new(color_image, shared)) as Box<dyn eframe::App>)
            }),
        )
        .map_err(|e| AppError::ui(format!("Failed to run selection overlay: {e}")))?;

        // A window closed without a terminal gesture state (e.g. via the
        // window manager) counts as cancellation.
        let outcome = outcome
            .lock()
            .map_err(|_| AppError::ui("Failed to read selection outcome"))?
            .unwrap_or(SelectionOutcome::Cancelled);
        Ok(outcome)
    }
}

/// The eframe application backing one overlay run.
struct OverlayApp {
    color_image: Option<egui::ColorImage>,
    texture: Option<egui::TextureHandle>,
    gesture: SelectionGesture,
    outcome: Arc<Mutex<Option<SelectionOutcome>>>,
}

impl OverlayApp {
    fn new(color_image: egui::ColorImage, outcome: Arc<Mutex<Option<SelectionOutcome>>>) -> Self {
        Self {
            color_image: Some(color_image),
            texture: None,
            gesture: SelectionGesture::new(),
            outcome,
        }
    }

    /// Maps egui drag interaction onto gesture pointer events.
    fn feed_pointer_events(&mut self, response: &egui::Response) {
        let position = response
            .interact_pointer_pos()
            .map(|pos| LogicalPoint::new(pos.x, pos.y));

        if response.drag_started() {
            if let Some(p) = position {
                self.gesture.on_event(PointerEvent::Down(p));
            }
        } else if response.dragged() {
            if let Some(p) = position {
                self.gesture.on_event(PointerEvent::Move(p));
            }
        } else if response.drag_stopped() {
            if let Some(p) = position {
                self.gesture.on_event(PointerEvent::Up(p));
            }
        }
    }

    fn publish_and_close(&self, ctx: &egui::Context, outcome: SelectionOutcome) {
        if let Ok(mut slot) = self.outcome.lock() {
            *slot = Some(outcome);
        }
        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
    }
}

impl eframe::App for OverlayApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.set_visuals(egui::Visuals::dark());

        // Upload texture on first frame using the pre-converted data.
        if self.texture.is_none() {
            if let Some(color_image) = self.color_image.take() {
                self.texture =
                    Some(ctx.load_texture("snapshot", color_image, egui::TextureOptions::LINEAR));
            }
        }

        let panel_frame = egui::Frame::default()
            .inner_margin(egui::Margin::same(0))
            .outer_margin(egui::Margin::same(0));

        egui::CentralPanel::default()
            .frame(panel_frame)
            .show(ctx, |ui| {
                let screen_rect = ui.max_rect();

                // The frozen snapshot as background, so the selection works
                // on a still image instead of racing live screen content.
                if let Some(texture) = &self.texture {
                    ui.painter().image(
                        texture.id(),
                        screen_rect,
                        egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                        egui::Color32::WHITE,
                    );
                }

                let response = ui.interact(screen_rect, ui.id(), egui::Sense::drag());
                self.feed_pointer_events(&response);

                if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
                    self.gesture.on_event(PointerEvent::Cancel);
                }

                match self.gesture.preview_rect() {
                    Some(rect) => {
                        let selection = to_egui_rect(rect);
                        draw_selection_mask(ui.painter(), screen_rect, selection, 150);
                        draw_selection_border(
                            ui.painter(),
                            selection,
                            2.0,
                            egui::Color32::WHITE,
                        );
                    }
                    None => draw_hint_banner(ui.painter(), screen_rect),
                }
            });

        match *self.gesture.state() {
            SelectionState::Committed { rect } => {
                self.publish_and_close(ctx, SelectionOutcome::Committed(rect));
            }
            SelectionState::Cancelled => {
                self.publish_and_close(ctx, SelectionOutcome::Cancelled);
            }
            _ => {}
        }
    }
}

fn to_egui_rect(rect: LogicalRect) -> egui::Rect {
    egui::Rect::from_min_size(
        egui::pos2(rect.x, rect.y),
        egui::vec2(rect.width, rect.height),
    )
}
