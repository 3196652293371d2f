//! Shared key/value storage
//!
//! Every tab reads and writes timer state through a [`Storage`] slot. A
//! backend broadcasts a [`StorageEvent`] after each successful write so that
//! other tabs can re-check their lease without waiting for the next poll.

pub mod file;
pub mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use thiserror::Error;
use tokio::sync::broadcast;

/// Capacity of the change notification channel
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

const SLOT_PREFIX: &str = "session-timer:v1";

/// Errors raised by storage backends
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage quota exceeded ({used} of {limit} bytes)")]
    QuotaExceeded { used: usize, limit: usize },
    #[error("storage is unavailable")]
    Unavailable,
}

/// Notification that a slot was written or removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub slot: String,
}

/// A persistent string slot store shared by every tab
pub trait Storage: Send + Sync {
    /// Read a slot; missing or unreadable slots are `None`
    fn get(&self, slot: &str) -> Option<String>;

    /// Write a slot and notify subscribers
    fn set(&self, slot: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a slot and notify subscribers
    fn remove(&self, slot: &str) -> Result<(), StorageError>;

    /// Subscribe to change notifications
    fn subscribe(&self) -> broadcast::Receiver<StorageEvent>;
}

/// Slot holding the timer state for a logical key
pub fn state_slot(key: &str) -> String {
    format!("{SLOT_PREFIX}:state:{key}")
}

/// Slot holding the lease record for a logical key
pub fn lease_slot(key: &str) -> String {
    format!("{SLOT_PREFIX}:lease:{key}")
}

/// Slot holding the widget position shared by all keys
pub fn position_slot() -> String {
    format!("{SLOT_PREFIX}:position")
}
