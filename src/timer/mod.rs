//! Timer core
//!
//! The drift-corrected clock, the per-key state store, the cross-tab lease
//! and the countdown/overtime state machine built on top of them.

pub mod clock;
pub mod lease;
pub mod machine;
pub mod pacing;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock, POLL_INTERVAL};
pub use lease::LeaseCoordinator;
pub use machine::{
    Phase, PointerKind, ResetGesture, TimerNotification, TimerSnapshot, TimerWidget,
    WidgetContext,
};
pub use pacing::{PaceStatus, PacingReport, SessionStats};
pub use store::TimerStore;

#[cfg(test)]
mod tests;
