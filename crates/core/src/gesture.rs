//! The region-selection state machine.
//!
//! [`SelectionGesture`] converts a stream of pointer events into either a
//! committed rectangle or a cancellation. It is a pure function of its event
//! stream: it holds no OS resources, knows nothing about windows or
//! rendering, and is driven by whatever surface receives the raw input
//! (the egui overlay in production, plain event lists in tests).

use crate::geometry::{LogicalPoint, LogicalRect};

/// Minimum extent (per axis, in logical units) a drag must exceed before a
/// pointer-up commits it. Anything smaller is treated as an accidental
/// click and the gesture resets to await another drag.
pub const MIN_COMMIT_EXTENT: f32 = 5.0;

/// Pointer and cancellation events driving the gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down(LogicalPoint),
    Move(LogicalPoint),
    Up(LogicalPoint),
    /// Explicit cancellation (Escape key, window-level cancel).
    Cancel,
}

/// Current state of the selection gesture.
///
/// `Committed` and `Cancelled` are terminal: once reached, further events
/// are ignored and the state never changes again.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectionState {
    /// No drag in progress; awaiting a pointer-down.
    NotStarted,
    /// A drag is in progress between `start` and the latest pointer position.
    Selecting {
        start: LogicalPoint,
        current: LogicalPoint,
    },
    /// The user committed a region of meaningful size.
    Committed { rect: LogicalRect },
    /// The user cancelled the selection.
    Cancelled,
}

impl SelectionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Committed { .. } | Self::Cancelled)
    }
}

/// Single-threaded selection state machine.
#[derive(Debug)]
pub struct SelectionGesture {
    state: SelectionState,
}

impl SelectionGesture {
    pub fn new() -> Self {
        Self {
            state: SelectionState::NotStarted,
        }
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    /// The rectangle the user is currently dragging out, if any.
    ///
    /// Used by the overlay to draw the live selection mask; `None` while no
    /// drag is in progress.
    pub fn preview_rect(&self) -> Option<LogicalRect> {
        match self.state {
            SelectionState::Selecting { start, current } => {
                Some(LogicalRect::from_corners(start, current))
            }
            SelectionState::Committed { rect } => Some(rect),
            _ => None,
        }
    }

    /// Feeds one event into the machine and returns the resulting state.
    ///
    /// Transitions not covered here leave the state untouched: a stray
    /// move/up with no drag in progress is ignored, and terminal states
    /// absorb everything.
    pub fn on_event(&mut self, event: PointerEvent) -> &SelectionState {
        if self.state.is_terminal() {
            return &self.state;
        }

        match (self.state, event) {
            (_, PointerEvent::Cancel) => {
                self.state = SelectionState::Cancelled;
            }
            (SelectionState::NotStarted, PointerEvent::Down(p)) => {
                self.state = SelectionState::Selecting {
                    start: p,
                    current: p,
                };
            }
            (SelectionState::Selecting { start, .. }, PointerEvent::Move(p)) => {
                self.state = SelectionState::Selecting { start, current: p };
            }
            (SelectionState::Selecting { start, .. }, PointerEvent::Up(p)) => {
                let rect = LogicalRect::from_corners(start, p);
                if is_committable(rect) {
                    self.state = SelectionState::Committed { rect };
                } else {
                    // Accidental click or sliver drag: back to waiting.
                    self.state = SelectionState::NotStarted;
                }
            }
            _ => {}
        }

        &self.state
    }
}

impl Default for SelectionGesture {
    fn default() -> Self {
        Self::new()
    }
}

/// A drag commits only when it exceeds the minimum extent on *both* axes.
fn is_committable(rect: LogicalRect) -> bool {
    rect.width > MIN_COMMIT_EXTENT && rect.height > MIN_COMMIT_EXTENT
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f32, y: f32) -> LogicalPoint {
        LogicalPoint::new(x, y)
    }

    fn drive(events: &[PointerEvent]) -> SelectionGesture {
        let mut gesture = SelectionGesture::new();
        for &event in events {
            gesture.on_event(event);
        }
        gesture
    }

    #[test]
    fn drag_commits_normalized_rect() {
        let gesture = drive(&[
            PointerEvent::Down(p(100.0, 100.0)),
            PointerEvent::Move(p(180.0, 150.0)),
            PointerEvent::Up(p(300.0, 250.0)),
        ]);
        assert_eq!(
            *gesture.state(),
            SelectionState::Committed {
                rect: LogicalRect::new(100.0, 100.0, 200.0, 150.0)
            }
        );
    }

    #[test]
    fn intermediate_moves_do_not_affect_committed_rect() {
        // Wild detours between down and up are irrelevant; only the
        // endpoints matter.
        let gesture = drive(&[
            PointerEvent::Down(p(50.0, 50.0)),
            PointerEvent::Move(p(900.0, 10.0)),
            PointerEvent::Move(p(0.0, 700.0)),
            PointerEvent::Move(p(400.0, 400.0)),
            PointerEvent::Up(p(150.0, 120.0)),
        ]);
        assert_eq!(
            *gesture.state(),
            SelectionState::Committed {
                rect: LogicalRect::from_corners(p(50.0, 50.0), p(150.0, 120.0))
            }
        );
    }

    #[test]
    fn reverse_drag_commits_same_rect_as_forward_drag() {
        let forward = drive(&[
            PointerEvent::Down(p(10.0, 20.0)),
            PointerEvent::Up(p(110.0, 220.0)),
        ]);
        let reverse = drive(&[
            PointerEvent::Down(p(110.0, 220.0)),
            PointerEvent::Up(p(10.0, 20.0)),
        ]);
        assert_eq!(*forward.state(), *reverse.state());
    }

    #[test]
    fn tiny_drag_returns_to_not_started() {
        // 5 units on either axis is below the commit threshold.
        let cases: &[(LogicalPoint, LogicalPoint)] = &[
            (p(100.0, 100.0), p(103.0, 103.0)),
            (p(100.0, 100.0), p(105.0, 200.0)),
            (p(100.0, 100.0), p(200.0, 104.0)),
        ];
        for &(down, up) in cases {
            let gesture = drive(&[PointerEvent::Down(down), PointerEvent::Up(up)]);
            assert_eq!(
                *gesture.state(),
                SelectionState::NotStarted,
                "drag {down:?} -> {up:?} should not commit"
            );
        }
    }

    #[test]
    fn gesture_restarts_after_rejected_drag() {
        let mut gesture = drive(&[
            PointerEvent::Down(p(10.0, 10.0)),
            PointerEvent::Up(p(12.0, 12.0)),
        ]);
        assert_eq!(*gesture.state(), SelectionState::NotStarted);

        gesture.on_event(PointerEvent::Down(p(10.0, 10.0)));
        gesture.on_event(PointerEvent::Up(p(60.0, 60.0)));
        assert!(matches!(
            gesture.state(),
            SelectionState::Committed { .. }
        ));
    }

    #[test]
    fn cancel_is_terminal_from_any_state() {
        let from_idle = drive(&[PointerEvent::Cancel]);
        assert_eq!(*from_idle.state(), SelectionState::Cancelled);

        let mut mid_drag = drive(&[
            PointerEvent::Down(p(0.0, 0.0)),
            PointerEvent::Move(p(50.0, 50.0)),
            PointerEvent::Cancel,
        ]);
        assert_eq!(*mid_drag.state(), SelectionState::Cancelled);

        // Terminal state absorbs further input.
        mid_drag.on_event(PointerEvent::Down(p(5.0, 5.0)));
        mid_drag.on_event(PointerEvent::Up(p(500.0, 500.0)));
        assert_eq!(*mid_drag.state(), SelectionState::Cancelled);
    }

    #[test]
    fn committed_state_ignores_further_input() {
        let mut gesture = drive(&[
            PointerEvent::Down(p(0.0, 0.0)),
            PointerEvent::Up(p(100.0, 100.0)),
        ]);
        let committed = *gesture.state();

        gesture.on_event(PointerEvent::Down(p(300.0, 300.0)));
        gesture.on_event(PointerEvent::Cancel);
        assert_eq!(*gesture.state(), committed);
    }

    #[test]
    fn stray_move_and_up_before_down_are_ignored() {
        let gesture = drive(&[
            PointerEvent::Move(p(10.0, 10.0)),
            PointerEvent::Up(p(20.0, 20.0)),
        ]);
        assert_eq!(*gesture.state(), SelectionState::NotStarted);
    }
}
