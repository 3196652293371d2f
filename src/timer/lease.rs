//! Cross-tab lease coordinator
//!
//! Approximates single-writer access to a timer key without a central
//! arbiter: the running tab keeps a heartbeat lease in shared storage and
//! every other tab treats a live foreign lease as read-only. Stale leases
//! are simply taken over, so the last active tab wins.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::{
    error::TimerError,
    state::{lease_record::HEARTBEAT_INTERVAL, LeaseRecord, TimerState},
    storage::{lease_slot, Storage},
};

/// Lease handling for one tab and one timer key
#[derive(Clone)]
pub struct LeaseCoordinator {
    storage: Arc<dyn Storage>,
    slot: String,
    owner_id: String,
    last_heartbeat: Option<DateTime<Utc>>,
}

impl LeaseCoordinator {
    pub fn new(storage: Arc<dyn Storage>, key: &str, owner_id: impl Into<String>) -> Self {
        Self {
            storage,
            slot: lease_slot(key),
            owner_id: owner_id.into(),
            last_heartbeat: None,
        }
    }

    pub fn slot(&self) -> &str {
        &self.slot
    }

    /// Current lease record, if any
    pub fn read(&self) -> Option<LeaseRecord> {
        LeaseRecord::from_stored(&self.storage.get(&self.slot)?)
    }

    /// A live lease held by another tab
    pub fn foreign_live_lease(&self, now: DateTime<Utc>) -> Option<LeaseRecord> {
        self.read()
            .filter(|lease| !lease.is_owned_by(&self.owner_id) && lease.is_live(now))
    }

    /// Whether this tab currently holds a live lease
    pub fn holds_live_lease(&self, now: DateTime<Utc>) -> bool {
        self.read()
            .is_some_and(|lease| lease.is_owned_by(&self.owner_id) && lease.is_live(now))
    }

    /// Reject the action when another tab holds a live lease
    pub fn check(&self, now: DateTime<Utc>) -> Result<(), TimerError> {
        match self.foreign_live_lease(now) {
            Some(lease) => Err(TimerError::ReadOnly {
                owner: lease.owner_id,
            }),
            None => Ok(()),
        }
    }

    /// Claim the key for a running timer, taking over a stale lease
    pub fn acquire(&mut self, state: &TimerState, now: DateTime<Utc>) -> Result<(), TimerError> {
        if let Some(previous) = self.read() {
            if !previous.is_owned_by(&self.owner_id) {
                if previous.is_live(now) {
                    return Err(TimerError::ReadOnly {
                        owner: previous.owner_id,
                    });
                }
                info!(
                    "Taking over stale lease on {} from {}",
                    self.slot, previous.owner_id
                );
            }
        }
        self.write(state, now);
        Ok(())
    }

    /// Refresh the lease if a heartbeat is due. Returns whether one was written.
    pub fn heartbeat(&mut self, state: &TimerState, now: DateTime<Utc>) -> bool {
        let due = match self.last_heartbeat {
            Some(last) => now - last >= HEARTBEAT_INTERVAL || now < last,
            None => true,
        };
        if due {
            self.write(state, now);
        }
        due
    }

    /// Clear the lease, but only if this tab owns it
    pub fn release(&mut self) {
        self.last_heartbeat = None;
        let Some(lease) = self.read() else {
            return;
        };
        if !lease.is_owned_by(&self.owner_id) {
            debug!("Not releasing {}: owned by {}", self.slot, lease.owner_id);
            return;
        }
        if let Err(e) = self.storage.remove(&self.slot) {
            debug!("Failed to clear lease {}: {}", self.slot, e);
        }
    }

    fn write(&mut self, state: &TimerState, now: DateTime<Utc>) {
        let record = LeaseRecord {
            owner_id: self.owner_id.clone(),
            deadline_at: state.deadline_at,
            overtime_start_at: state.overtime_start_at,
            updated_at: now,
        };
        self.last_heartbeat = Some(now);
        let raw = match record.to_stored() {
            Ok(raw) => raw,
            Err(e) => {
                debug!("Failed to serialize lease: {}", e);
                return;
            }
        };
        if let Err(e) = self.storage.set(&self.slot, &raw) {
            debug!("Lease {} not persisted: {}", self.slot, e);
        }
    }
}
