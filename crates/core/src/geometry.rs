//! Coordinate frames and the transforms between them.
//!
//! Two frames exist in the capture pipeline and they are deliberately
//! different Rust types:
//!
//! - **Logical space** ([`LogicalPoint`], [`LogicalRect`]): pointer
//!   coordinates as reported by the UI input system during a drag.
//!   DPI-independent, `f32`, top-left origin.
//! - **Pixel space** ([`PixelRect`]): coordinates of the captured image
//!   buffer, in device pixels, `u32`, top-left origin.
//!
//! On HiDPI displays the captured buffer is larger than the logical screen
//! (e.g. 3840x2160 pixels for a 1920x1080 point display), so every rectangle
//! crossing from gesture handling into cropping must go through
//! [`LogicalRect::to_pixel`] with a [`Scale`] computed from the actual
//! snapshot. There is no implicit conversion between the two frames.

/// A point in logical (gesture) space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogicalPoint {
    pub x: f32,
    pub y: f32,
}

impl LogicalPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A size in logical space, e.g. the point dimensions of the display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogicalSize {
    pub width: f32,
    pub height: f32,
}

impl LogicalSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// An axis-aligned rectangle in logical space.
///
/// Width and height are always non-negative; use [`LogicalRect::from_corners`]
/// to build one from two arbitrary drag endpoints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogicalRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl LogicalRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds a normalized rectangle from two opposite corners.
    ///
    /// Users can drag in any direction, so either corner may be the
    /// top-left one. The result has `origin = (min, min)` and
    /// `size = (|dx|, |dy|)` regardless of drag direction.
    pub fn from_corners(a: LogicalPoint, b: LogicalPoint) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    /// Transforms this rectangle into pixel space.
    ///
    /// Each axis is scaled independently. A negative origin (possible when
    /// a drag started off the left/top edge of the interaction surface) is
    /// clamped to zero before the integer conversion; bounds clamping on
    /// the far edges is the job of [`PixelRect::clamped_to`], which needs
    /// the image dimensions.
    pub fn to_pixel(&self, scale: Scale) -> PixelRect {
        let x = (self.x * scale.x).max(0.0).round() as u32;
        let y = (self.y * scale.y).max(0.0).round() as u32;
        let width = (self.width * scale.x).round() as u32;
        let height = (self.height * scale.y).round() as u32;
        PixelRect {
            x,
            y,
            width,
            height,
        }
    }
}

/// An axis-aligned rectangle in image pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Clamps this rectangle to lie fully inside `bounds_width x bounds_height`.
    ///
    /// The origin is clamped into the image, then the extent is shrunk so
    /// that `origin + size <= bounds`. A rectangle entirely outside the
    /// image collapses to zero size, which the crop step rejects as an
    /// empty selection.
    pub fn clamped_to(&self, bounds_width: u32, bounds_height: u32) -> PixelRect {
        let x = self.x.min(bounds_width);
        let y = self.y.min(bounds_height);
        PixelRect {
            x,
            y,
            width: self.width.min(bounds_width.saturating_sub(x)),
            height: self.height.min(bounds_height.saturating_sub(y)),
        }
    }

    /// Transforms this rectangle back into logical space with the inverse scale.
    ///
    /// Used by the result window to relate recognized-line bounding boxes
    /// back to on-screen positions.
    pub fn to_logical(&self, scale: Scale) -> LogicalRect {
        LogicalRect {
            x: self.x as f32 / scale.x,
            y: self.y as f32 / scale.y,
            width: self.width as f32 / scale.x,
            height: self.height as f32 / scale.y,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Per-axis scale factors mapping logical space onto pixel space.
///
/// The factors are computed independently per axis from the observed sizes,
/// which keeps the transform correct even when the logical screen and the
/// captured buffer disagree on aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scale {
    pub x: f32,
    pub y: f32,
}

impl Scale {
    /// Derives scale factors from a logical screen size and the pixel
    /// dimensions of the buffer captured from it.
    pub fn between(logical: LogicalSize, pixel_width: u32, pixel_height: u32) -> Self {
        Self {
            x: pixel_width as f32 / logical.width,
            y: pixel_height as f32 / logical.height,
        }
    }

    /// Identity scale (logical units are device pixels).
    pub fn identity() -> Self {
        Self { x: 1.0, y: 1.0 }
    }
}
