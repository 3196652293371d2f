//! Timer state store for one logical key

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::{
    state::{timer_state::clamp_default_seconds, TimerState},
    storage::{state_slot, Storage},
};

/// Loads and persists the [`TimerState`] of a logical key
#[derive(Clone)]
pub struct TimerStore {
    storage: Arc<dyn Storage>,
    key: String,
    slot: String,
}

impl TimerStore {
    pub fn new(storage: Arc<dyn Storage>, key: impl Into<String>) -> Self {
        let key = key.into();
        let slot = state_slot(&key);
        Self { storage, key, slot }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn slot(&self) -> &str {
        &self.slot
    }

    /// Read and validate the stored state; malformed records count as absent
    pub fn load(&self, fallback_default: i64) -> Option<TimerState> {
        let raw = self.storage.get(&self.slot)?;
        let state = TimerState::from_stored(&raw, fallback_default);
        if state.is_none() {
            debug!("Discarding unreadable timer state for {}", self.key);
        }
        state
    }

    /// Load the stored state or build a fresh one; the flag is `true` when fresh
    pub fn load_or_init(&self, default_seconds: i64) -> (TimerState, bool) {
        match self.load(default_seconds) {
            Some(state) => (state, false),
            None => (TimerState::new(default_seconds), true),
        }
    }

    /// Write the state, stamping `saved_at`. Failures are logged and ignored:
    /// the in-memory state stays authoritative for this tab.
    pub fn persist(&self, state: &mut TimerState, now: DateTime<Utc>) {
        state.saved_at = Some(now);
        let raw = match state.to_stored() {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Failed to serialize timer state for {}: {}", self.key, e);
                return;
            }
        };
        if let Err(e) = self.storage.set(&self.slot, &raw) {
            debug!("Timer state for {} not persisted: {}", self.key, e);
        }
    }
}

/// Apply a reconfigured target duration.
///
/// Only takes effect while the timer is stopped. The remaining time snaps
/// to the new target only if no time has been consumed yet. Returns whether
/// the state changed.
pub fn reconcile(state: &mut TimerState, target_seconds: i64) -> bool {
    if state.is_running {
        return false;
    }
    let target = clamp_default_seconds(target_seconds);
    if state.default_seconds == target {
        return false;
    }
    let previous = state.default_seconds;
    state.default_seconds = target;
    if !state.overtime && state.remaining_seconds == previous {
        state.remaining_seconds = target;
    }
    true
}
