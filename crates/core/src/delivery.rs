//! Delivery of recognized text to its final destination.
//!
//! The capture pipeline hands off `(text, image)` and does not care what
//! happens next; [`DeliverySink`] is that boundary. Shipped sinks: the
//! clipboard, and the floating result window.

use crate::error::{AppError, Result};
use crate::ocr::RecognizedLine;
use image::DynamicImage;

/// Receives the outcome of a successful capture.
pub trait DeliverySink {
    fn deliver(
        &mut self,
        text: &str,
        image: &DynamicImage,
        lines: &[RecognizedLine],
    ) -> Result<()>;
}

/// Writes recognized text to the system clipboard.
pub struct ClipboardSink;

impl DeliverySink for ClipboardSink {
    fn deliver(
        &mut self,
        text: &str,
        _image: &DynamicImage,
        _lines: &[RecognizedLine],
    ) -> Result<()> {
        let mut clipboard = arboard::Clipboard::new()
            .map_err(|e| AppError::ui(format!("Could not access clipboard: {e}")))?;
        clipboard
            .set_text(text)
            .map_err(|e| AppError::ui(format!("Failed to copy to clipboard: {e}")))?;
        log::info!("copied {} characters to clipboard", text.len());
        Ok(())
    }
}

/// Shows the floating result window with the captured image and text.
pub struct WindowSink;

impl DeliverySink for WindowSink {
    fn deliver(
        &mut self,
        text: &str,
        image: &DynamicImage,
        lines: &[RecognizedLine],
    ) -> Result<()> {
        crate::ui::result_window::show(text, image, lines)
    }
}
