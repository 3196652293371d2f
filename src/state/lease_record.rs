//! Lease record granting one tab write access to a timer key

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::coerce;

/// A lease is live while it was refreshed less than this long ago
pub const LEASE_TTL: Duration = Duration::seconds(15);

/// How often the owner refreshes its lease while running
pub const HEARTBEAT_INTERVAL: Duration = Duration::seconds(5);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaseRecord {
    pub owner_id: String,
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub deadline_at: Option<DateTime<Utc>>,
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub overtime_start_at: Option<DateTime<Utc>>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

impl LeaseRecord {
    /// Read a stored lease; records without an owner or timestamp are ignored
    pub fn from_stored(raw: &str) -> Option<Self> {
        let obj = coerce::parse_object(raw)?;
        let owner_id = coerce::string(&obj, "ownerId")?.trim();
        if owner_id.is_empty() {
            return None;
        }
        Some(Self {
            owner_id: owner_id.to_string(),
            deadline_at: coerce::timestamp(&obj, "deadlineAt"),
            overtime_start_at: coerce::timestamp(&obj, "overtimeStartAt"),
            updated_at: coerce::timestamp(&obj, "updatedAt")?,
        })
    }

    pub fn to_stored(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Liveness, not possession, decides exclusivity
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now - self.updated_at < LEASE_TTL
    }

    pub fn is_owned_by(&self, owner_id: &str) -> bool {
        self.owner_id == owner_id
    }
}
