//! In-process storage backend

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    },
};
use tokio::sync::broadcast;
use tracing::debug;

use super::{Storage, StorageError, StorageEvent, EVENT_CHANNEL_CAPACITY};

/// Storage kept in memory, optionally bounded by a byte quota
#[derive(Debug)]
pub struct MemoryStorage {
    slots: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
    unavailable: AtomicBool,
    events_tx: broadcast::Sender<StorageEvent>,
}

impl MemoryStorage {
    /// Create an unbounded store
    pub fn new() -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            slots: Mutex::new(HashMap::new()),
            quota_bytes: None,
            unavailable: AtomicBool::new(false),
            events_tx,
        }
    }

    /// Create a store that rejects writes once `quota_bytes` would be exceeded
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            quota_bytes: Some(quota_bytes),
            ..Self::new()
        }
    }

    /// Simulate a store that refuses every operation (private browsing)
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StorageError::Unavailable)
        } else {
            Ok(())
        }
    }

    fn notify(&self, slot: &str) {
        // No receivers is fine: nobody else is listening yet.
        let _ = self.events_tx.send(StorageEvent {
            slot: slot.to_string(),
        });
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, slot: &str) -> Option<String> {
        if self.check_available().is_err() {
            return None;
        }
        self.slots.lock().ok()?.get(slot).cloned()
    }

    fn set(&self, slot: &str, value: &str) -> Result<(), StorageError> {
        self.check_available()?;
        {
            let mut slots = self.slots.lock().map_err(|_| StorageError::Unavailable)?;
            if let Some(limit) = self.quota_bytes {
                let used: usize = slots
                    .iter()
                    .filter(|(name, _)| name.as_str() != slot)
                    .map(|(name, value)| name.len() + value.len())
                    .sum::<usize>()
                    + slot.len()
                    + value.len();
                if used > limit {
                    debug!("Rejecting write to {}: quota exceeded", slot);
                    return Err(StorageError::QuotaExceeded { used, limit });
                }
            }
            slots.insert(slot.to_string(), value.to_string());
        }
        self.notify(slot);
        Ok(())
    }

    fn remove(&self, slot: &str) -> Result<(), StorageError> {
        self.check_available()?;
        let removed = self
            .slots
            .lock()
            .map_err(|_| StorageError::Unavailable)?
            .remove(slot)
            .is_some();
        if removed {
            self.notify(slot);
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.events_tx.subscribe()
    }
}
