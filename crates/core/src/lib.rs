//! Textshot Core Library
//!
//! This library provides the core functionality for the textshot screen
//! text grabber: select a rectangular region of the screen with a drag
//! gesture, crop the pixels underneath, run them through a text-recognition
//! engine, and deliver the result to the clipboard or a floating window.
//!
//! # Overview
//!
//! The capture pipeline is built from small, separately testable pieces:
//!
//! - **Geometry**: typed coordinate frames and transforms via [`geometry`]
//! - **Selection**: the drag-gesture state machine via [`gesture`]
//! - **Capture**: snapshot and permission providers via [`snapshot`]
//! - **Sessions**: the capture coordinator and session model via [`session`]
//! - **Triggering**: hotkeys via [`hotkey`], orchestration via [`trigger`]
//! - **Recognition**: the engine boundary via [`ocr`]
//! - **Delivery**: clipboard and window sinks via [`delivery`]
//!
//! # Quick Start
//!
//! The simplest way to use the library is through the [`TextShot`] facade:
//!
//! ```ignore
//! use textshot_core::TextShot;
//!
//! let app = TextShot::new()?;
//!
//! // List available monitors
//! for monitor in app.list_monitors()? {
//!     println!("{}", monitor);
//! }
//!
//! // Wire up a ready-to-run capture orchestrator
//! let mut orchestrator = app.build_orchestrator(0, tokio::runtime::Handle::current())?;
//! orchestrator.trigger_capture()?;
//! ```

pub mod config;
pub mod delivery;
pub mod error;
pub mod gesture;
pub mod geometry;
pub mod hotkey;
pub mod image_processing;
pub mod ocr;
pub mod session;
pub mod settings;
pub mod snapshot;
pub mod trigger;
pub mod ui;

// Re-export primary types for convenience
pub use config::Config;
pub use error::{AppError, Result};
pub use session::{CaptureCoordinator, CaptureSession};
pub use settings::{DeliveryMode, Settings};
pub use trigger::CaptureOrchestrator;

use crate::delivery::{ClipboardSink, DeliverySink, WindowSink};
use crate::ocr::{RecognitionEngine, TesseractEngine};
use crate::session::NoopFocus;
use crate::snapshot::{OsPermissions, ScreenCapturer};
use crate::ui::EguiOverlay;
use std::sync::Arc;
use std::sync::mpsc::channel;
use tokio::runtime::Handle;

/// The fully wired orchestrator type used by the shipped binaries.
pub type DefaultOrchestrator =
    CaptureOrchestrator<ScreenCapturer, OsPermissions, NoopFocus, EguiOverlay>;

/// Main entry point for the textshot application.
///
/// This struct provides a facade over the various subsystems, handling
/// configuration loading and the wiring of production collaborators. It's
/// the recommended way to use the library for most use cases.
pub struct TextShot {
    config: Config,
    settings: Settings,
}

impl TextShot {
    /// Creates a new instance with environment configuration and persisted
    /// user settings.
    pub fn new() -> Result<Self> {
        let config = Config::load()?;
        let settings = Settings::load();
        Ok(Self { config, settings })
    }

    /// Creates an instance with custom configuration.
    ///
    /// Use this to override environment-based configuration, such as the
    /// recognition engine binary.
    pub fn with_config(config: Config) -> Result<Self> {
        let settings = Settings::load();
        Ok(Self { config, settings })
    }

    /// Lists available monitors with their dimensions.
    pub fn list_monitors(&self) -> Result<Vec<String>> {
        Ok(ScreenCapturer::new()?.list_screens())
    }

    /// Returns a reference to the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns a mutable reference to the configuration.
    ///
    /// Allows overriding settings like the language hints after
    /// initialization, e.g. from command-line flags.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Returns a reference to the persisted user settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Returns a mutable reference to the user settings.
    ///
    /// Callers are responsible for persisting changes via
    /// [`Settings::save`].
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Language hints for the recognition engine.
    ///
    /// The environment override wins over persisted settings; an empty
    /// result means auto-detect.
    pub fn language_hints(&self) -> Vec<String> {
        self.config
            .language_override
            .clone()
            .unwrap_or_else(|| self.settings.languages.clone())
    }

    /// Builds the recognition engine from configuration.
    pub fn build_engine(&self) -> Result<Arc<dyn RecognitionEngine>> {
        let engine = match &self.config.engine_binary {
            Some(binary) => TesseractEngine::with_binary(binary.clone()),
            None => TesseractEngine::locate()?,
        };
        Ok(Arc::new(engine))
    }

    /// Builds the delivery sink matching the configured mode.
    pub fn build_sink(&self) -> Box<dyn DeliverySink> {
        match self.settings.delivery {
            DeliveryMode::Clipboard => Box::new(ClipboardSink),
            DeliveryMode::Window => Box::new(WindowSink),
        }
    }

    /// Wires a ready-to-run capture orchestrator over the production
    /// collaborators: real screens, real permissions, the egui overlay.
    pub fn build_orchestrator(&self, display: usize, runtime: Handle) -> Result<DefaultOrchestrator> {
        let (events_tx, events_rx) = channel();

        let coordinator = CaptureCoordinator::new(
            ScreenCapturer::new()?,
            OsPermissions,
            NoopFocus,
            EguiOverlay,
            self.build_engine()?,
            runtime,
            events_tx,
        )
        .with_display(display)
        .with_permission_prompted(self.settings.permission_prompted);

        Ok(CaptureOrchestrator::new(
            coordinator,
            events_rx,
            self.build_sink(),
            self.language_hints(),
        ))
    }

    /// Copies the orchestrator's permission-prompt flag back into settings
    /// and persists them.
    pub fn persist_permission_flag(&mut self, orchestrator: &DefaultOrchestrator) -> Result<()> {
        if self.settings.permission_prompted != orchestrator.permission_prompted() {
            self.settings.permission_prompted = orchestrator.permission_prompted();
            self.settings.save()?;
        }
        Ok(())
    }
}

/// Initializes the library by loading environment variables.
///
/// Call this once at application startup before using any other functions.
/// This loads `.env` files if present and sets up the environment.
pub fn init() {
    let _ = dotenvy::dotenv();
}
