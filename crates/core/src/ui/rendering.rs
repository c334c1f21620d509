//! Overlay drawing helpers.
//!
//! Reusable painting functions for the selection overlay: the dark mask
//! with a clear cutout over the live selection, the selection border, and
//! the idle hint banner.

use eframe::egui;

/// Draws the dark mask with a transparent "cutout" for the selection area.
///
/// The selected region stays clear while the rest of the screen is dimmed,
/// which reads as "this part will be captured".
///
/// # Arguments
/// * `painter` - The egui painter to draw with
/// * `screen_rect` - The full screen rectangle
/// * `selection_rect` - The selected area to keep clear
/// * `alpha` - Darkness level (0-255, higher = darker)
pub fn draw_selection_mask(
    painter: &egui::Painter,
    screen_rect: egui::Rect,
    selection_rect: egui::Rect,
    alpha: u8,
) {
    let color = egui::Color32::from_black_alpha(alpha);

    // Top region (above selection)
    painter.rect_filled(
        egui::Rect::from_min_max(
            screen_rect.min,
            egui::pos2(screen_rect.max.x, selection_rect.min.y),
        ),
        0.0,
        color,
    );

    // Bottom region (below selection)
    painter.rect_filled(
        egui::Rect::from_min_max(
            egui::pos2(screen_rect.min.x, selection_rect.max.y),
            screen_rect.max,
        ),
        0.0,
        color,
    );

    // Left region (left of selection, between top and bottom)
    painter.rect_filled(
        egui::Rect::from_min_max(
            egui::pos2(screen_rect.min.x, selection_rect.min.y),
            egui::pos2(selection_rect.min.x, selection_rect.max.y),
        ),
        0.0,
        color,
    );

    // Right region (right of selection, between top and bottom)
    painter.rect_filled(
        egui::Rect::from_min_max(
            egui::pos2(selection_rect.max.x, selection_rect.min.y),
            egui::pos2(screen_rect.max.x, selection_rect.max.y),
        ),
        0.0,
        color,
    );
}

/// Draws a border around the selection rectangle.
pub fn draw_selection_border(
    painter: &egui::Painter,
    selection_rect: egui::Rect,
    stroke_width: f32,
    color: egui::Color32,
) {
    painter.rect_stroke(
        selection_rect,
        0.0,
        egui::Stroke::new(stroke_width, color),
        egui::StrokeKind::Middle,
    );
}

/// Dim-out plus usage hint shown while no drag is in progress.
pub fn draw_hint_banner(painter: &egui::Painter, screen_rect: egui::Rect) {
    painter.rect_filled(screen_rect, 0.0, egui::Color32::from_black_alpha(90));
    painter.text(
        egui::pos2(screen_rect.center().x, screen_rect.min.y + 48.0),
        egui::Align2::CENTER_CENTER,
        "Drag to select text to grab, Esc to cancel",
        egui::FontId::proportional(18.0),
        egui::Color32::from_gray(230),
    );
}
