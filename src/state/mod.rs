//! State management module
//!
//! Persisted records shared between tabs, and the server-wide state that
//! hosts every open tab.

pub mod app_state;
pub mod coerce;
pub mod lease_record;
pub mod position_record;
pub mod timer_state;

// Re-export main types
pub use app_state::AppState;
pub use lease_record::LeaseRecord;
pub use position_record::{Corner, PositionRecord};
pub use timer_state::{TimerState, TimerView, MAX_SECONDS, MIN_DEFAULT_SECONDS};
