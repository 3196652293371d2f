//! Session Timer - A tab-safe countdown/overtime timer service
//!
//! Every open tab mounts a timer widget keyed by its training session. Tabs
//! sharing a key coordinate through a lease in shared storage so that only
//! one of them mutates the timer at a time.

pub mod api;
pub mod config;
pub mod error;
pub mod placement;
pub mod services;
pub mod state;
pub mod storage;
pub mod tasks;
pub mod timer;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use config::{Config, WidgetConfig};
pub use error::TimerError;
pub use state::AppState;
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use timer::{SystemClock, TimerWidget};
pub use utils::signals::shutdown_signal;
