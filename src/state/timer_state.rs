//! Persisted timer state for one logical key

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::coerce;

/// Upper bound on any duration the timer tracks (4 hours)
pub const MAX_SECONDS: i64 = 4 * 60 * 60;

/// Smallest configurable target duration
pub const MIN_DEFAULT_SECONDS: i64 = 60;

/// Presentation mode of the widget
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerView {
    #[default]
    Compact,
    Expanded,
}

impl TimerView {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "compact" => Some(Self::Compact),
            "expanded" => Some(Self::Expanded),
            _ => None,
        }
    }
}

/// Timer state shared across tabs through storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    /// Seconds left; negative only while in overtime
    pub remaining_seconds: i64,
    pub is_running: bool,
    /// Absolute deadline, set only while running a countdown
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub deadline_at: Option<DateTime<Utc>>,
    /// Configured target duration
    pub default_seconds: i64,
    pub alarm_enabled: bool,
    pub minimized: bool,
    pub view: TimerView,
    pub overtime: bool,
    /// Start of the overtime count-up, set only while running in overtime
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub overtime_start_at: Option<DateTime<Utc>>,
    /// When this record was last written (provenance only)
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub saved_at: Option<DateTime<Utc>>,
}

/// Clamp a configured duration to the accepted range
pub fn clamp_default_seconds(seconds: i64) -> i64 {
    seconds.clamp(MIN_DEFAULT_SECONDS, MAX_SECONDS)
}

impl TimerState {
    /// Fresh idle state for a target duration
    pub fn new(default_seconds: i64) -> Self {
        let default_seconds = clamp_default_seconds(default_seconds);
        Self {
            remaining_seconds: default_seconds,
            is_running: false,
            deadline_at: None,
            default_seconds,
            alarm_enabled: true,
            minimized: false,
            view: TimerView::Compact,
            overtime: false,
            overtime_start_at: None,
            saved_at: None,
        }
    }

    /// Rebuild a state from its stored JSON.
    ///
    /// Returns `None` for anything that is not a JSON object. Individual
    /// fields that are missing or out of range fall back to safe values, and
    /// a running flag whose timestamps are inconsistent is dropped.
    pub fn from_stored(raw: &str, fallback_default: i64) -> Option<Self> {
        let obj = coerce::parse_object(raw)?;

        let default_seconds = coerce::int(&obj, "defaultSeconds")
            .filter(|s| (MIN_DEFAULT_SECONDS..=MAX_SECONDS).contains(s))
            .unwrap_or_else(|| clamp_default_seconds(fallback_default));

        let overtime = coerce::boolean(&obj, "overtime").unwrap_or(false);
        let remaining_seconds = match coerce::int(&obj, "remainingSeconds") {
            Some(s) if overtime => s.clamp(-MAX_SECONDS, 0),
            Some(s) => s.clamp(0, MAX_SECONDS),
            None if overtime => 0,
            None => default_seconds,
        };

        let mut state = Self {
            remaining_seconds,
            is_running: coerce::boolean(&obj, "isRunning").unwrap_or(false),
            deadline_at: coerce::timestamp(&obj, "deadlineAt"),
            default_seconds,
            alarm_enabled: coerce::boolean(&obj, "alarmEnabled").unwrap_or(true),
            minimized: coerce::boolean(&obj, "minimized").unwrap_or(false),
            view: coerce::string(&obj, "view")
                .and_then(TimerView::parse)
                .unwrap_or_default(),
            overtime,
            overtime_start_at: coerce::timestamp(&obj, "overtimeStartAt"),
            saved_at: coerce::timestamp(&obj, "savedAt"),
        };
        state.normalize();
        Some(state)
    }

    /// Enforce the running invariant and drop timestamps that do not apply
    pub fn normalize(&mut self) {
        if self.overtime {
            self.deadline_at = None;
        } else {
            self.overtime_start_at = None;
        }
        if !self.is_running {
            self.deadline_at = None;
            self.overtime_start_at = None;
        }
        if self.is_running && !self.is_consistent() {
            self.is_running = false;
            self.deadline_at = None;
            self.overtime_start_at = None;
        }
    }

    /// `is_running ⇒ (overtime ⇒ overtime_start_at) ∧ (¬overtime ⇒ deadline_at)`
    pub fn is_consistent(&self) -> bool {
        if !self.is_running {
            return true;
        }
        if self.overtime {
            self.overtime_start_at.is_some()
        } else {
            self.deadline_at.is_some()
        }
    }

    /// Serialize for storage
    pub fn to_stored(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
