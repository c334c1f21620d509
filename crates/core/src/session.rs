//! Capture sessions and the coordinator that drives them.
//!
//! A [`CaptureSession`] is one end-to-end capture attempt: it exclusively
//! owns the full-screen snapshot and the handle to any in-flight background
//! work, and it is the only piece of cross-task mutable state in the
//! pipeline. The [`CaptureCoordinator`] runs the session algorithm:
//!
//! 1. record the foreground app for later restoration,
//! 2. gate on the screen-recording permission,
//! 3. snapshot the active display,
//! 4. present the selection overlay and wait for the gesture outcome,
//! 5. transform the committed rectangle to pixel space and clamp it,
//! 6. tear the overlay down, wait a bounded settle delay, restore focus,
//! 7. spawn the cancellable crop + recognition task.
//!
//! Heavy work never runs on the calling context: crop and recognition are a
//! Tokio task whose handle the session owns, reporting back over a channel.
//! Every result message carries the id of the session that spawned it, so a
//! late result from a cancelled session is detected and discarded instead of
//! leaking into a newer one.

use crate::error::{AppError, Result};
use crate::geometry::{LogicalRect, PixelRect};
use crate::image_processing::ImageProcessor;
use crate::ocr::{RecognitionEngine, RecognizedLine};
use crate::snapshot::{PermissionProvider, Snapshot, SnapshotProvider};
use image::DynamicImage;
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Delay between the overlay window going away and focus restoration.
///
/// The compositor needs a moment to flush the hide; restoring focus (and
/// anything that repaints) too early can race with the overlay's final
/// frame still on screen.
pub const OVERLAY_SETTLE: Duration = Duration::from_millis(100);

/// Opaque handle to the application that was frontmost when a capture
/// session started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForegroundApp(pub String);

/// Saves and restores the frontmost application around a capture session.
pub trait FocusProvider {
    fn current_app(&self) -> Option<ForegroundApp>;
    fn restore(&self, app: &ForegroundApp);
}

/// Focus provider for platforms where the window system hands focus back on
/// its own once the overlay closes.
pub struct NoopFocus;

impl FocusProvider for NoopFocus {
    fn current_app(&self) -> Option<ForegroundApp> {
        None
    }

    fn restore(&self, _app: &ForegroundApp) {}
}

/// Terminal result of the selection overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectionOutcome {
    Committed(LogicalRect),
    Cancelled,
}

/// The fullscreen selection surface.
///
/// `run` presents the frozen snapshot, feeds pointer and key input to the
/// selection gesture, and returns once the gesture reaches a terminal
/// state. The overlay window must be gone by the time `run` returns.
pub trait OverlaySurface {
    fn run(&mut self, snapshot: &Snapshot) -> Result<SelectionOutcome>;
}

/// Handle to the in-flight crop + recognition work of one session.
///
/// Owned exclusively by the session that spawned it; cancelling the session
/// aborts the task, and a result that still slips out is dropped by the
/// session-id check on the receiving side.
pub struct PendingTask {
    session_id: u64,
    handle: JoinHandle<()>,
}

impl PendingTask {
    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// One user-initiated capture attempt.
///
/// At most one session is live at a time; the trigger orchestrator enforces
/// that by tearing down the previous session before creating the next.
pub struct CaptureSession {
    pub id: u64,
    pub previous_app: Option<ForegroundApp>,
    snapshot: Option<Snapshot>,
    pending: Option<PendingTask>,
}

impl CaptureSession {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            previous_app: None,
            snapshot: None,
            pending: None,
        }
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    pub fn take_snapshot(&mut self) -> Option<Snapshot> {
        self.snapshot.take()
    }

    pub fn pending(&self) -> Option<&PendingTask> {
        self.pending.as_ref()
    }

    /// Cancels in-flight work and drops the snapshot.
    ///
    /// Safe to call on any session state; used both for normal completion
    /// and for preemption by a newer session.
    pub fn teardown(&mut self) {
        if let Some(pending) = self.pending.take() {
            log::debug!("cancelling pending task of session {}", self.id);
            pending.cancel();
        }
        self.snapshot = None;
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Messages from the background crop + recognition task.
///
/// Stamped with the originating session id; receivers must drop messages
/// whose id does not match the live session.
pub enum SessionEvent {
    Recognized {
        session_id: u64,
        image: DynamicImage,
        region: PixelRect,
        lines: Vec<RecognizedLine>,
    },
    Failed {
        session_id: u64,
        error: AppError,
    },
}

/// Immediate result of starting a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// A selection was committed; crop + recognition are in flight and the
    /// result will arrive as a [`SessionEvent`].
    Pending,
    /// The user cancelled, or the attempt ended without a selection.
    Cancelled,
}

/// Orchestrates one capture session from trigger to background handoff.
pub struct CaptureCoordinator<S, P, F, O> {
    snapshots: S,
    permissions: P,
    focus: F,
    overlay: O,
    engine: Arc<dyn RecognitionEngine>,
    runtime: Handle,
    events: Sender<SessionEvent>,
    display: usize,
    overlay_settle: Duration,
    permission_prompted: bool,
}

impl<S, P, F, O> CaptureCoordinator<S, P, F, O>
where
    S: SnapshotProvider,
    P: PermissionProvider,
    F: FocusProvider,
    O: OverlaySurface,
{
    pub fn new(
        snapshots: S,
        permissions: P,
        focus: F,
        overlay: O,
        engine: Arc<dyn RecognitionEngine>,
        runtime: Handle,
        events: Sender<SessionEvent>,
    ) -> Self {
        Self {
            snapshots,
            permissions,
            focus,
            overlay,
            engine,
            runtime,
            events,
            display: 0,
            overlay_settle: OVERLAY_SETTLE,
            permission_prompted: false,
        }
    }

    pub fn with_display(mut self, display: usize) -> Self {
        self.display = display;
        self
    }

    pub fn with_overlay_settle(mut self, settle: Duration) -> Self {
        self.overlay_settle = settle;
        self
    }

    /// Seeds the "permission prompt already shown" flag from persisted
    /// settings.
    pub fn with_permission_prompted(mut self, prompted: bool) -> Self {
        self.permission_prompted = prompted;
        self
    }

    /// Whether the one silent permission request has been consumed; the
    /// caller persists this across runs.
    pub fn permission_prompted(&self) -> bool {
        self.permission_prompted
    }

    /// Runs one capture attempt inside the given session.
    ///
    /// Returns `Pending` when a selection was committed and background work
    /// is in flight, `Cancelled` for user cancellation and for the silent
    /// first-run permission request. Snapshot and overlay resources are
    /// released on every path except the handoff of the snapshot into the
    /// background task.
    pub fn start_capture(
        &mut self,
        session: &mut CaptureSession,
        language_hints: &[String],
    ) -> Result<CaptureOutcome> {
        let result = self.drive(session, language_hints);

        if !matches!(result, Ok(CaptureOutcome::Pending)) {
            session.teardown();
        }
        if let Some(app) = session.previous_app.take() {
            self.focus.restore(&app);
        }
        result
    }

    fn drive(
        &mut self,
        session: &mut CaptureSession,
        language_hints: &[String],
    ) -> Result<CaptureOutcome> {
        session.previous_app = self.focus.current_app();

        if !self.permissions.has_capture_permission() {
            self.permissions.request_capture_permission();
            if !self.permission_prompted {
                // The very first denied attempt stays quiet: the OS prompt
                // has just been queued and a second dialog on top of it
                // would greet the user with two interruptions at once.
                self.permission_prompted = true;
                log::info!("screen capture permission missing; requested without dialog");
                return Ok(CaptureOutcome::Cancelled);
            }
            return Err(AppError::PermissionDenied);
        }

        session.snapshot = Some(self.snapshots.capture_full_screen(self.display)?);
        let outcome = match session.snapshot.as_ref() {
            Some(snapshot) => self.overlay.run(snapshot)?,
            None => return Err(AppError::snapshot("snapshot missing after capture")),
        };

        // The overlay window is gone once run() returns; give the
        // compositor a moment to flush the hide before focus moves and the
        // screen repaints underneath.
        if !self.overlay_settle.is_zero() {
            std::thread::sleep(self.overlay_settle);
        }

        let rect = match outcome {
            SelectionOutcome::Committed(rect) => rect,
            SelectionOutcome::Cancelled => {
                log::debug!("session {} cancelled from overlay", session.id);
                return Ok(CaptureOutcome::Cancelled);
            }
        };

        let snapshot = session
            .take_snapshot()
            .ok_or_else(|| AppError::snapshot("snapshot missing after selection"))?;
        let (bounds_w, bounds_h) = snapshot.pixel_bounds();
        let region = rect.to_pixel(snapshot.scale()).clamped_to(bounds_w, bounds_h);
        log::debug!(
            "session {} committed {rect:?} -> pixel region {region:?}",
            session.id
        );

        session.pending = Some(self.spawn_recognition(
            session.id,
            snapshot,
            region,
            language_hints.to_vec(),
        ));
        Ok(CaptureOutcome::Pending)
    }

    /// Spawns crop + recognition off the main context.
    ///
    /// The task owns the snapshot from here on; aborting the handle drops
    /// it without ever touching session state.
    fn spawn_recognition(
        &self,
        session_id: u64,
        snapshot: Snapshot,
        region: PixelRect,
        language_hints: Vec<String>,
    ) -> PendingTask {
        let engine = self.engine.clone();
        let events = self.events.clone();

        let handle = self.runtime.spawn(async move {
            let result = async {
                let cropped = ImageProcessor::crop(&snapshot.image, region)?;
                let lines = engine.recognize(&cropped, &language_hints).await?;
                Ok::<_, AppError>((cropped, lines))
            }
            .await;

            let event = match result {
                Ok((image, lines)) => SessionEvent::Recognized {
                    session_id,
                    image,
                    region,
                    lines,
                },
                Err(error) => SessionEvent::Failed { session_id, error },
            };
            // The receiver may already be gone at shutdown.
            let _ = events.send(event);
        });

        PendingTask { session_id, handle }
    }
}
