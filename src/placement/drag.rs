//! Pointer drag tracking

use super::geometry::{Frame, Point};
use crate::state::PositionRecord;

/// Pointer travel below which a press counts as a click
pub const DRAG_THRESHOLD: f64 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq)]
enum DragState {
    Idle,
    /// Pointer is down but has not moved past the threshold yet
    Pressed { pointer: Point, origin: Point },
    Dragging { pointer: Point, origin: Point },
}

/// What a pointer release amounted to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragOutcome {
    /// Released without crossing the threshold
    Click,
    /// Released after a drag; the position to persist
    Moved(PositionRecord),
    /// No press was in progress
    Ignored,
}

#[derive(Debug, Clone)]
pub struct DragController {
    state: DragState,
}

impl DragController {
    pub fn new() -> Self {
        Self {
            state: DragState::Idle,
        }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    /// Start tracking a press. Presses on interactive controls never drag.
    pub fn pointer_down(&mut self, pointer: Point, widget_at: Point, on_control: bool) -> bool {
        if on_control {
            self.state = DragState::Idle;
            return false;
        }
        self.state = DragState::Pressed {
            pointer,
            origin: widget_at,
        };
        true
    }

    /// Follow the pointer; returns the new widget position once dragging
    pub fn pointer_move(&mut self, pointer: Point, frame: &Frame) -> Option<Point> {
        let (start, origin) = match self.state {
            DragState::Idle => return None,
            DragState::Pressed { pointer: start, origin } => {
                if pointer.distance_to(start) < DRAG_THRESHOLD {
                    return None;
                }
                self.state = DragState::Dragging {
                    pointer: start,
                    origin,
                };
                (start, origin)
            }
            DragState::Dragging { pointer: start, origin } => (start, origin),
        };
        Some(frame.clamp(Point::new(
            origin.x + pointer.x - start.x,
            origin.y + pointer.y - start.y,
        )))
    }

    /// Finish the gesture, snapping a drag to the nearest corner
    pub fn pointer_up(&mut self, pointer: Point, frame: &Frame) -> DragOutcome {
        let outcome = match self.state {
            DragState::Idle => DragOutcome::Ignored,
            DragState::Pressed { .. } => DragOutcome::Click,
            DragState::Dragging { pointer: start, origin } => {
                let at = frame.clamp(Point::new(
                    origin.x + pointer.x - start.x,
                    origin.y + pointer.y - start.y,
                ));
                DragOutcome::Moved(frame.snap(at))
            }
        };
        self.state = DragState::Idle;
        outcome
    }

    /// Abandon an in-progress gesture
    pub fn cancel(&mut self) {
        self.state = DragState::Idle;
    }
}

impl Default for DragController {
    fn default() -> Self {
        Self::new()
    }
}
