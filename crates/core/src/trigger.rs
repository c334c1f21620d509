//! The capture trigger orchestrator.
//!
//! [`CaptureOrchestrator`] is the single owner of the live
//! [`CaptureSession`]. Hotkey callbacks, menu items and CLI invocations all
//! funnel into [`CaptureOrchestrator::trigger_capture`]; results from the
//! background task come back through [`CaptureOrchestrator::pump`], which
//! runs on the main context and is the only place session state is mutated
//! after a capture starts.
//!
//! Triggering while a session is live preempts it: the prior session's
//! pending work is cancelled and its snapshot released before the new
//! session begins. Sessions are ordered, never interleaved; a cancelled
//! task's result that still arrives is recognized by its stale session id
//! and dropped.

use crate::delivery::DeliverySink;
use crate::error::{AppError, Result};
use crate::ocr::joined_text;
use crate::session::{
    CaptureCoordinator, CaptureOutcome, CaptureSession, FocusProvider, OverlaySurface,
    SessionEvent,
};
use crate::snapshot::{PermissionProvider, SnapshotProvider};
use std::sync::mpsc::Receiver;

pub struct CaptureOrchestrator<S, P, F, O> {
    coordinator: CaptureCoordinator<S, P, F, O>,
    events: Receiver<SessionEvent>,
    sink: Box<dyn DeliverySink>,
    language_hints: Vec<String>,
    session: Option<CaptureSession>,
    next_session_id: u64,
}

impl<S, P, F, O> CaptureOrchestrator<S, P, F, O>
where
    S: SnapshotProvider,
    P: PermissionProvider,
    F: FocusProvider,
    O: OverlaySurface,
{
    pub fn new(
        coordinator: CaptureCoordinator<S, P, F, O>,
        events: Receiver<SessionEvent>,
        sink: Box<dyn DeliverySink>,
        language_hints: Vec<String>,
    ) -> Self {
        Self {
            coordinator,
            events,
            sink,
            language_hints,
            session: None,
            next_session_id: 1,
        }
    }

    /// Starts a capture, preempting any session still in flight.
    ///
    /// Returns `Pending` when selection committed and background work is in
    /// flight (watch [`CaptureOrchestrator::pump`] for the result), and
    /// `Cancelled` when the attempt ended without a selection.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::PermissionDenied`] when the permission gate
    /// wants the caller to put up its explanatory dialog. Every other
    /// failure ends the attempt silently (logged, no dialog) and the
    /// orchestrator returns to idle.
    pub fn trigger_capture(&mut self) -> Result<CaptureOutcome> {
        self.teardown_active();

        let id = self.next_session_id;
        self.next_session_id += 1;
        let mut session = CaptureSession::new(id);
        log::info!("starting capture session {id}");

        match self
            .coordinator
            .start_capture(&mut session, &self.language_hints)
        {
            Ok(CaptureOutcome::Pending) => {
                self.session = Some(session);
                Ok(CaptureOutcome::Pending)
            }
            Ok(CaptureOutcome::Cancelled) => {
                log::info!("capture session {id} cancelled");
                Ok(CaptureOutcome::Cancelled)
            }
            Err(AppError::PermissionDenied) => Err(AppError::PermissionDenied),
            Err(e) => {
                // Transient failures end the attempt without interrupting
                // the user; the next trigger starts from a clean slate.
                log::warn!("capture session {id} failed: {e}");
                Ok(CaptureOutcome::Cancelled)
            }
        }
    }

    /// Drains background-task results; call regularly on the main context.
    ///
    /// Returns the number of events processed. Events stamped with a
    /// session id other than the live session's are stale results of
    /// preempted sessions racing their cancellation, and are discarded.
    pub fn pump(&mut self) -> usize {
        let mut processed = 0;

        while let Ok(event) = self.events.try_recv() {
            processed += 1;
            let live_id = self.session.as_ref().map(|s| s.id);

            match event {
                SessionEvent::Recognized {
                    session_id,
                    image,
                    region,
                    lines,
                } => {
                    if live_id != Some(session_id) {
                        log::debug!("discarding stale result from session {session_id}");
                        continue;
                    }
                    let text = joined_text(&lines);
                    log::info!(
                        "session {session_id}: recognized {} lines in {region:?}",
                        lines.len()
                    );
                    if let Err(e) = self.sink.deliver(&text, &image, &lines) {
                        log::warn!("delivery failed: {e}");
                    }
                    self.finish_session();
                }
                SessionEvent::Failed { session_id, error } => {
                    if live_id != Some(session_id) {
                        log::debug!("discarding stale failure from session {session_id}");
                        continue;
                    }
                    match error {
                        AppError::EmptySelection => {
                            log::info!("session {session_id}: selection was empty")
                        }
                        e => log::warn!("session {session_id} failed: {e}"),
                    }
                    self.finish_session();
                }
            }
        }
        processed
    }

    /// Id of the session currently in flight, if any.
    pub fn live_session_id(&self) -> Option<u64> {
        self.session.as_ref().map(|s| s.id)
    }

    /// Whether the one-time silent permission request has been consumed;
    /// persisted by the caller across runs.
    pub fn permission_prompted(&self) -> bool {
        self.coordinator.permission_prompted()
    }

    /// Cancels the live session, if any: abort pending work, release the
    /// snapshot. Runs synchronously before a new session may begin.
    pub fn teardown_active(&mut self) {
        if let Some(mut session) = self.session.take() {
            log::info!("preempting capture session {}", session.id);
            session.teardown();
        }
    }

    fn finish_session(&mut self) {
        self.session = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{LogicalRect, PixelRect};
    use crate::ocr::{RecognitionEngine, RecognizedLine};
    use crate::session::{ForegroundApp, NoopFocus, SelectionOutcome};
    use crate::snapshot::Snapshot;
    use image::{DynamicImage, RgbaImage};
    use std::collections::VecDeque;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc::{Sender, channel};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::runtime::Handle;

    struct FakeSnapshots;

    impl SnapshotProvider for FakeSnapshots {
        fn capture_full_screen(&self, _display: usize) -> crate::error::Result<Snapshot> {
            Ok(Snapshot {
                image: DynamicImage::ImageRgba8(RgbaImage::new(200, 100)),
                logical_size: crate::geometry::LogicalSize::new(100.0, 50.0),
            })
        }

        fn capture_region(
            &self,
            _display: usize,
            _region: PixelRect,
        ) -> crate::error::Result<DynamicImage> {
            unimplemented!()
        }
    }

    struct AlwaysGranted;

    impl PermissionProvider for AlwaysGranted {
        fn has_capture_permission(&self) -> bool {
            true
        }

        fn request_capture_permission(&self) {}
    }

    struct QueuedOverlay {
        outcomes: VecDeque<SelectionOutcome>,
    }

    impl OverlaySurface for QueuedOverlay {
        fn run(&mut self, _snapshot: &Snapshot) -> crate::error::Result<SelectionOutcome> {
            Ok(self
                .outcomes
                .pop_front()
                .unwrap_or(SelectionOutcome::Cancelled))
        }
    }

    /// Sets a flag when dropped; proves an aborted task future was dropped.
    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    /// Engine whose recognition future never resolves on its own.
    struct StalledEngine {
        dropped: Arc<AtomicBool>,
    }

    impl RecognitionEngine for StalledEngine {
        fn recognize<'a>(
            &'a self,
            _image: &'a DynamicImage,
            _language_hints: &'a [String],
        ) -> Pin<Box<dyn Future<Output = crate::error::Result<Vec<RecognizedLine>>> + Send + 'a>>
        {
            let guard = DropFlag(self.dropped.clone());
            Box::pin(async move {
                let _guard = guard;
                std::future::pending::<()>().await;
                unreachable!()
            })
        }
    }

    struct InstantEngine;

    impl RecognitionEngine for InstantEngine {
        fn recognize<'a>(
            &'a self,
            _image: &'a DynamicImage,
            _language_hints: &'a [String],
        ) -> Pin<Box<dyn Future<Output = crate::error::Result<Vec<RecognizedLine>>> + Send + 'a>>
        {
            Box::pin(async {
                Ok(vec![RecognizedLine {
                    text: "ok".into(),
                    bounding_box: PixelRect::new(0, 0, 4, 4),
                    confidence: 1.0,
                }])
            })
        }
    }

    struct RecordingSink {
        delivered: Arc<Mutex<Vec<String>>>,
    }

    impl DeliverySink for RecordingSink {
        fn deliver(
            &mut self,
            text: &str,
            _image: &DynamicImage,
            _lines: &[RecognizedLine],
        ) -> crate::error::Result<()> {
            self.delivered.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    #[allow(clippy::type_complexity)]
    fn orchestrator(
        engine: Arc<dyn RecognitionEngine>,
        outcomes: Vec<SelectionOutcome>,
    ) -> (
        CaptureOrchestrator<FakeSnapshots, AlwaysGranted, NoopFocus, QueuedOverlay>,
        Arc<Mutex<Vec<String>>>,
        Sender<SessionEvent>,
    ) {
        let (tx, rx) = channel();
        let delivered = Arc::new(Mutex::new(Vec::new()));

        let coordinator = CaptureCoordinator::new(
            FakeSnapshots,
            AlwaysGranted,
            NoopFocus,
            QueuedOverlay {
                outcomes: outcomes.into(),
            },
            engine,
            Handle::current(),
            tx.clone(),
        )
        .with_overlay_settle(Duration::ZERO);

        let orchestrator = CaptureOrchestrator::new(
            coordinator,
            rx,
            Box::new(RecordingSink {
                delivered: delivered.clone(),
            }),
            Vec::new(),
        );
        (orchestrator, delivered, tx)
    }

    fn commit() -> SelectionOutcome {
        SelectionOutcome::Committed(LogicalRect::new(10.0, 10.0, 40.0, 20.0))
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached within timeout");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn trigger_then_pump_delivers_recognized_text() {
        let (mut orchestrator, delivered, _tx) =
            orchestrator(Arc::new(InstantEngine), vec![commit()]);

        orchestrator.trigger_capture().unwrap();
        assert_eq!(orchestrator.live_session_id(), Some(1));

        wait_until(|| {
            orchestrator.pump();
            !delivered.lock().unwrap().is_empty()
        })
        .await;

        assert_eq!(delivered.lock().unwrap().as_slice(), &["ok".to_string()]);
        assert_eq!(orchestrator.live_session_id(), None, "session ended");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn new_trigger_preempts_and_aborts_prior_pending_task() {
        let dropped = Arc::new(AtomicBool::new(false));
        let engine = Arc::new(StalledEngine {
            dropped: dropped.clone(),
        });
        let (mut orchestrator, delivered, _tx) = orchestrator(engine, vec![commit(), commit()]);

        orchestrator.trigger_capture().unwrap();
        assert_eq!(orchestrator.live_session_id(), Some(1));
        assert!(!dropped.load(Ordering::SeqCst));

        // Preempt: session 1's stalled task must be aborted before session
        // 2 exists.
        orchestrator.trigger_capture().unwrap();
        assert_eq!(orchestrator.live_session_id(), Some(2));
        wait_until(|| dropped.load(Ordering::SeqCst)).await;
        assert!(delivered.lock().unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stale_result_is_discarded_not_delivered() {
        let engine = Arc::new(StalledEngine {
            dropped: Arc::new(AtomicBool::new(false)),
        });
        let (mut orchestrator, delivered, tx) = orchestrator(engine, vec![commit(), commit()]);

        orchestrator.trigger_capture().unwrap();
        orchestrator.trigger_capture().unwrap();
        assert_eq!(orchestrator.live_session_id(), Some(2));

        // Session 1's result arrives after its cancellation: stale, dropped.
        tx.send(SessionEvent::Recognized {
            session_id: 1,
            image: DynamicImage::ImageRgba8(RgbaImage::new(4, 4)),
            region: PixelRect::new(0, 0, 4, 4),
            lines: vec![RecognizedLine {
                text: "stale".into(),
                bounding_box: PixelRect::new(0, 0, 4, 4),
                confidence: 0.5,
            }],
        })
        .unwrap();
        assert_eq!(orchestrator.pump(), 1);
        assert!(delivered.lock().unwrap().is_empty());
        assert_eq!(
            orchestrator.live_session_id(),
            Some(2),
            "stale result must not end the live session"
        );

        // The live session's own result still lands.
        tx.send(SessionEvent::Recognized {
            session_id: 2,
            image: DynamicImage::ImageRgba8(RgbaImage::new(4, 4)),
            region: PixelRect::new(0, 0, 4, 4),
            lines: vec![RecognizedLine {
                text: "fresh".into(),
                bounding_box: PixelRect::new(0, 0, 4, 4),
                confidence: 0.9,
            }],
        })
        .unwrap();
        orchestrator.pump();
        assert_eq!(delivered.lock().unwrap().as_slice(), &["fresh".to_string()]);
        assert_eq!(orchestrator.live_session_id(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_session_ends_silently() {
        let dropped = Arc::new(AtomicBool::new(false));
        let engine = Arc::new(StalledEngine {
            dropped: dropped.clone(),
        });
        let (mut orchestrator, delivered, tx) = orchestrator(engine, vec![commit()]);

        orchestrator.trigger_capture().unwrap();
        tx.send(SessionEvent::Failed {
            session_id: 1,
            error: crate::error::AppError::EmptySelection,
        })
        .unwrap();
        orchestrator.pump();

        assert_eq!(orchestrator.live_session_id(), None);
        assert!(delivered.lock().unwrap().is_empty());
        // Dropping the finished session aborts its still-stalled task.
        wait_until(|| dropped.load(Ordering::SeqCst)).await;
    }

    #[test]
    fn foreground_app_is_an_opaque_value() {
        let app = ForegroundApp("com.example.editor".into());
        assert_eq!(app, app.clone());
    }
}
