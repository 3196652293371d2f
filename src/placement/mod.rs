//! Widget placement
//!
//! Drag-to-reposition with corner snapping. The position slot is shared by
//! every timer key, and is independent of the timer logic.

pub mod drag;
pub mod geometry;

pub use drag::{DragController, DragOutcome, DRAG_THRESHOLD};
pub use geometry::{Frame, Point, Size, VIEWPORT_PADDING};

use std::sync::Arc;

use tracing::debug;

use crate::{
    state::{Corner, PositionRecord},
    storage::{position_slot, Storage},
};

/// Default widget extent
pub const DEFAULT_WIDGET_SIZE: Size = Size::new(300.0, 80.0);

/// Viewport assumed until the client reports one
pub const DEFAULT_VIEWPORT: Size = Size::new(1280.0, 800.0);

/// Result of feeding a pointer event to the placement manager
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerResult {
    None,
    Click,
    Moved(Point),
    Snapped(Point),
}

/// Tracks where one tab's widget is and persists drags
pub struct Placement {
    storage: Arc<dyn Storage>,
    slot: String,
    frame: Frame,
    record: Option<PositionRecord>,
    position: Point,
    drag: DragController,
}

impl Placement {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        let frame = Frame::new(DEFAULT_WIDGET_SIZE, DEFAULT_VIEWPORT);
        let slot = position_slot();
        let record = storage
            .get(&slot)
            .and_then(|raw| PositionRecord::from_stored(&raw));
        let position = Self::effective(&frame, record.as_ref());
        Self {
            storage,
            slot,
            frame,
            record,
            position,
            drag: DragController::new(),
        }
    }

    fn effective(frame: &Frame, record: Option<&PositionRecord>) -> Point {
        match record {
            Some(record) => frame.resolve(record),
            None => frame.anchor(Corner::BottomRight),
        }
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn record(&self) -> Option<&PositionRecord> {
        self.record.as_ref()
    }

    pub fn slot(&self) -> &str {
        &self.slot
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Viewport or widget size changed: recompute from the stored anchor
    pub fn resize(&mut self, viewport: Size, widget: Option<Size>) -> Point {
        self.frame.viewport = viewport;
        if let Some(widget) = widget {
            self.frame.widget = widget;
        }
        self.drag.cancel();
        self.position = Self::effective(&self.frame, self.record.as_ref());
        self.position
    }

    /// Another tab moved the widget
    pub fn reload(&mut self) {
        if self.drag.is_dragging() {
            return;
        }
        self.record = self
            .storage
            .get(&self.slot)
            .and_then(|raw| PositionRecord::from_stored(&raw));
        self.position = Self::effective(&self.frame, self.record.as_ref());
    }

    pub fn pointer_down(&mut self, pointer: Point, on_control: bool) -> PointerResult {
        self.drag.pointer_down(pointer, self.position, on_control);
        PointerResult::None
    }

    pub fn pointer_move(&mut self, pointer: Point) -> PointerResult {
        match self.drag.pointer_move(pointer, &self.frame) {
            Some(at) => {
                self.position = at;
                PointerResult::Moved(at)
            }
            None => PointerResult::None,
        }
    }

    pub fn pointer_up(&mut self, pointer: Point) -> PointerResult {
        match self.drag.pointer_up(pointer, &self.frame) {
            DragOutcome::Click => PointerResult::Click,
            DragOutcome::Ignored => PointerResult::None,
            DragOutcome::Moved(record) => {
                self.record = Some(record);
                self.position = self.frame.resolve(&record);
                match record.to_stored() {
                    Ok(raw) => {
                        if let Err(e) = self.storage.set(&self.slot, &raw) {
                            debug!("Widget position not persisted: {}", e);
                        }
                    }
                    Err(e) => debug!("Failed to serialize widget position: {}", e),
                }
                PointerResult::Snapped(self.position)
            }
        }
    }
}
