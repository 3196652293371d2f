//! External side-effect services
//!
//! Alarm output devices and the host site's session endpoint.

pub mod alert;
pub mod session;

// Re-export main types
pub use alert::{AlarmOutcome, AlertSystem, AudioBackend, AudioUnlock, Haptics};
pub use session::{EndSessionOutcome, SessionClient};
