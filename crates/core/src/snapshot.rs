//! Screen snapshot and capture-permission providers.
//!
//! Both OS services are modeled as traits so the capture pipeline can be
//! exercised against fakes: [`SnapshotProvider`] hands out full-screen
//! snapshots and region grabs, [`PermissionProvider`] answers the
//! screen-recording permission question. The production implementations
//! wrap the `screenshots` crate.
//!
//! # Example
//!
//! ```ignore
//! use textshot_core::snapshot::{ScreenCapturer, SnapshotProvider};
//!
//! let capturer = ScreenCapturer::new()?;
//! for screen in capturer.list_screens() {
//!     println!("{}", screen);
//! }
//! let snapshot = capturer.capture_full_screen(0)?;
//! ```

use crate::error::{AppError, Result};
use crate::geometry::{LogicalSize, PixelRect, Scale};
use image::DynamicImage;
use screenshots::Screen;

/// A full-screen capture together with the logical geometry it came from.
///
/// The image holds device pixels; `logical_size` is the point size of the
/// display at capture time. The two differ on HiDPI displays, and their
/// ratio is exactly the [`Scale`] the selection transform needs.
pub struct Snapshot {
    pub image: DynamicImage,
    pub logical_size: LogicalSize,
}

impl Snapshot {
    /// Per-axis logical-to-pixel scale of this snapshot.
    pub fn scale(&self) -> Scale {
        Scale::between(self.logical_size, self.image.width(), self.image.height())
    }

    pub fn pixel_bounds(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }
}

/// Source of screen snapshots. Treated as a fallible black box.
pub trait SnapshotProvider {
    /// Captures the given display at full resolution.
    fn capture_full_screen(&self, display: usize) -> Result<Snapshot>;

    /// Captures a pixel-space region of the given display directly.
    fn capture_region(&self, display: usize, region: PixelRect) -> Result<DynamicImage>;
}

/// Answers and requests the OS screen-recording permission.
pub trait PermissionProvider {
    fn has_capture_permission(&self) -> bool;

    /// Fire-and-forget: asks the OS to put up its permission prompt.
    /// The grant (if any) lands asynchronously; callers never wait on it.
    fn request_capture_permission(&self);
}

/// Screen capturer over the `screenshots` crate.
///
/// Detects available screens once at construction; each capture call is an
/// independent OS round trip.
pub struct ScreenCapturer {
    screens: Vec<Screen>,
}

impl ScreenCapturer {
    /// Initializes the capturer by detecting available screens.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::SnapshotFailed`] if screen enumeration fails
    /// (e.g. no display server available) or no screens are detected.
    pub fn new() -> Result<Self> {
        let screens = Screen::all()
            .map_err(|e| AppError::snapshot(format!("Failed to enumerate screens: {e}")))?;

        if screens.is_empty() {
            return Err(AppError::snapshot("No screens detected"));
        }

        Ok(Self { screens })
    }

    /// Lists available screens with their dimensions and scale factors.
    pub fn list_screens(&self) -> Vec<String> {
        self.screens
            .iter()
            .enumerate()
            .map(|(i, s)| {
                format!(
                    "Monitor {}: {}x{} (scale: {})",
                    i, s.display_info.width, s.display_info.height, s.display_info.scale_factor
                )
            })
            .collect()
    }

    pub fn screen_count(&self) -> usize {
        self.screens.len()
    }

    fn screen(&self, display: usize) -> Result<&Screen> {
        self.screens
            .get(display)
            .ok_or(AppError::ScreenNotFound(display))
    }
}

impl SnapshotProvider for ScreenCapturer {
    fn capture_full_screen(&self, display: usize) -> Result<Snapshot> {
        let screen = self.screen(display)?;

        let captured = screen
            .capture()
            .map_err(|e| AppError::snapshot(format!("Failed to capture screen: {e}")))?;

        let width = captured.width();
        let height = captured.height();
        let rgba_data = captured.into_raw();

        let img_buffer = image::ImageBuffer::from_raw(width, height, rgba_data)
            .ok_or_else(|| AppError::snapshot("Failed to create image buffer"))?;

        Ok(Snapshot {
            image: DynamicImage::ImageRgba8(img_buffer),
            logical_size: LogicalSize::new(
                screen.display_info.width as f32,
                screen.display_info.height as f32,
            ),
        })
    }

    fn capture_region(&self, display: usize, region: PixelRect) -> Result<DynamicImage> {
        let screen = self.screen(display)?;

        let captured = screen
            .capture_area(
                region.x as i32,
                region.y as i32,
                region.width,
                region.height,
            )
            .map_err(|e| AppError::snapshot(format!("Failed to capture region: {e}")))?;

        let width = captured.width();
        let height = captured.height();
        let rgba_data = captured.into_raw();

        let img_buffer = image::ImageBuffer::from_raw(width, height, rgba_data)
            .ok_or_else(|| AppError::snapshot("Failed to create image buffer"))?;

        Ok(DynamicImage::ImageRgba8(img_buffer))
    }
}

/// OS permission provider.
///
/// macOS gates screen capture behind the Screen Recording privacy setting;
/// a tiny probe capture answers the question and, as a side effect of the
/// first attempt, makes the OS queue its own permission prompt. Other
/// platforms have no equivalent gate.
pub struct OsPermissions;

impl PermissionProvider for OsPermissions {
    fn has_capture_permission(&self) -> bool {
        #[cfg(target_os = "macos")]
        {
            probe_capture()
        }
        #[cfg(not(target_os = "macos"))]
        {
            true
        }
    }

    fn request_capture_permission(&self) {
        #[cfg(target_os = "macos")]
        {
            let _ = probe_capture();
        }
    }
}

#[cfg(target_os = "macos")]
fn probe_capture() -> bool {
    Screen::all()
        .ok()
        .and_then(|screens| {
            screens
                .first()
                .map(|screen| screen.capture_area(0, 0, 1, 1).is_ok())
        })
        .unwrap_or(false)
}

/// Deep link into the OS privacy pane for screen recording, if one exists.
pub fn privacy_settings_url() -> Option<&'static str> {
    if cfg!(target_os = "macos") {
        Some("x-apple.systempreferences:com.apple.preference.security?Privacy_ScreenCapture")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    #[test]
    fn snapshot_scale_reflects_hidpi_buffer() {
        let snapshot = Snapshot {
            image: DynamicImage::ImageRgba8(RgbaImage::new(3840, 2160)),
            logical_size: LogicalSize::new(1920.0, 1080.0),
        };
        assert_eq!(snapshot.scale(), Scale { x: 2.0, y: 2.0 });
        assert_eq!(snapshot.pixel_bounds(), (3840, 2160));
    }

    #[test]
    fn snapshot_scale_is_identity_for_lodpi() {
        let snapshot = Snapshot {
            image: DynamicImage::ImageRgba8(RgbaImage::new(1280, 800)),
            logical_size: LogicalSize::new(1280.0, 800.0),
        };
        assert_eq!(snapshot.scale(), Scale::identity());
    }
}
