//! Error types for the textshot-core library.
//!
//! This module provides granular error variants for different failure modes,
//! enabling precise error handling and user-friendly error messages.
//!
//! Note that user cancellation and below-threshold drags are *not* errors:
//! they are ordinary session outcomes (see [`crate::session::CaptureOutcome`]).

use thiserror::Error;

/// Errors that can occur within the textshot-core library.
///
/// Each variant represents a specific failure mode with contextual information
/// to help diagnose and handle errors appropriately.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors (missing keys, invalid values).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Screen-recording permission has not been granted by the OS.
    ///
    /// Recoverable: the user can grant permission in the system privacy
    /// settings and trigger another capture manually.
    #[error("Screen capture permission denied")]
    PermissionDenied,

    /// The OS refused a global hotkey registration (conflict, invalid key).
    ///
    /// Non-fatal: capture stays reachable through the menu/CLI trigger.
    #[error("Hotkey registration failed: {0}")]
    HotkeyRegistration(String),

    /// Taking the full-screen snapshot failed.
    #[error("Screen snapshot failed: {0}")]
    SnapshotFailed(String),

    /// Requested screen/monitor index was not found.
    #[error("Screen not found: index {0}")]
    ScreenNotFound(usize),

    /// Image processing (cropping, encoding) failed.
    #[error("Image processing failed: {0}")]
    ImageProcessing(String),

    /// The crop rectangle is empty after transform and clamping.
    #[error("Selection area is empty or invalid")]
    EmptySelection,

    /// The text-recognition engine failed or produced unreadable output.
    #[error("Text recognition failed: {0}")]
    Recognition(String),

    /// No usable recognition engine binary was found on this system.
    #[error("Recognition engine not found: {0}")]
    EngineNotFound(String),

    /// UI-related errors (rendering, window management).
    #[error("UI error: {0}")]
    Ui(String),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a snapshot error with the given message.
    pub fn snapshot(msg: impl Into<String>) -> Self {
        Self::SnapshotFailed(msg.into())
    }

    /// Creates an image processing error with the given message.
    pub fn image(msg: impl Into<String>) -> Self {
        Self::ImageProcessing(msg.into())
    }

    /// Creates a recognition error with the given message.
    pub fn recognition(msg: impl Into<String>) -> Self {
        Self::Recognition(msg.into())
    }

    /// Creates a hotkey registration error with the given message.
    pub fn hotkey(msg: impl Into<String>) -> Self {
        Self::HotkeyRegistration(msg.into())
    }

    /// Creates a UI error with the given message.
    pub fn ui(msg: impl Into<String>) -> Self {
        Self::Ui(msg.into())
    }
}

/// A convenient alias for Result with [`AppError`].
pub type Result<T> = std::result::Result<T, AppError>;
