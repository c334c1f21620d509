//! Image cropping and encoding utilities.
//!
//! The crop step is the last stop of the selection pipeline: by the time a
//! rectangle arrives here it must already be in pixel space and clamped to
//! the image bounds (see [`crate::geometry`]). This module only guards
//! against the one condition clamping can still produce (an empty
//! rectangle) and hands pixels to the recognition engine as PNG.

use crate::error::{AppError, Result};
use crate::geometry::PixelRect;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

/// Image operations for the capture workflow.
pub struct ImageProcessor;

impl ImageProcessor {
    /// Crops a snapshot to a pixel-space rectangle.
    ///
    /// The rectangle is clamped to the image bounds once more before the
    /// crop, so a caller bug can produce a smaller crop but never an
    /// out-of-bounds read.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::EmptySelection`] if the rectangle has no area
    /// after clamping.
    pub fn crop(original: &DynamicImage, region: PixelRect) -> Result<DynamicImage> {
        let region = region.clamped_to(original.width(), original.height());

        if region.is_empty() {
            return Err(AppError::EmptySelection);
        }

        Ok(original.crop_imm(region.x, region.y, region.width, region.height))
    }

    /// Encodes an image as PNG bytes.
    ///
    /// PNG is lossless; recognition quality on small text suffers visibly
    /// from JPEG artifacts.
    pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
        let mut buffer: Vec<u8> = Vec::new();
        let mut cursor = Cursor::new(&mut buffer);

        image
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(|e| AppError::image(format!("Failed to encode image: {e}")))?;

        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    fn blank(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::new(width, height))
    }

    #[test]
    fn crop_valid_region() {
        let cropped =
            ImageProcessor::crop(&blank(100, 100), PixelRect::new(10, 20, 50, 40)).unwrap();
        assert_eq!((cropped.width(), cropped.height()), (50, 40));
    }

    #[test]
    fn crop_clamps_overhanging_region() {
        let cropped =
            ImageProcessor::crop(&blank(100, 100), PixelRect::new(80, 80, 50, 50)).unwrap();
        assert_eq!((cropped.width(), cropped.height()), (20, 20));
    }

    #[test]
    fn crop_empty_region_fails() {
        let result = ImageProcessor::crop(&blank(100, 100), PixelRect::new(10, 10, 0, 40));
        assert!(matches!(result, Err(AppError::EmptySelection)));
    }

    #[test]
    fn crop_region_outside_bounds_fails_as_empty() {
        let result = ImageProcessor::crop(&blank(100, 100), PixelRect::new(300, 300, 40, 40));
        assert!(matches!(result, Err(AppError::EmptySelection)));
    }

    #[test]
    fn encode_png_produces_png_magic() {
        let bytes = ImageProcessor::encode_png(&blank(8, 8)).unwrap();
        assert_eq!(&bytes[..4], &[0x89, 0x50, 0x4E, 0x47]);
    }
}
