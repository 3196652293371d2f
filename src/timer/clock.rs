//! Drift-corrected clock
//!
//! Remaining time is always derived from an absolute deadline, never from a
//! count of elapsed ticks, so a poll that fires late (background tab, device
//! sleep) still reports the correct value.

use std::{
    fmt,
    sync::atomic::{AtomicI64, Ordering},
    time::Duration as StdDuration,
};

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::state::{TimerState, MAX_SECONDS};

/// UI refresh cadence; never the source of truth
pub const POLL_INTERVAL: StdDuration = StdDuration::from_millis(250);

/// Source of wall-clock time
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// The real wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    /// Start at a fixed, arbitrary instant
    pub fn at_epoch_ms(ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(ms),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now_ms.fetch_add(by.num_milliseconds(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let ms = self.now_ms.load(Ordering::SeqCst);
        Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
    }
}

/// `max(0, round((deadline - now) / 1s))`, halves rounding up
pub fn remaining_until(deadline: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let ms = (deadline - now).num_milliseconds();
    (ms + 500).div_euclid(1000).max(0)
}

/// `max(0, floor((now - start) / 1s))`
pub fn overtime_elapsed(start: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - start).num_milliseconds().div_euclid(1000).max(0)
}

/// Current remaining seconds for a state; negative while in overtime, never
/// below `-MAX_SECONDS`
pub fn remaining_seconds(state: &TimerState, now: DateTime<Utc>) -> i64 {
    if !state.is_running {
        return state.remaining_seconds;
    }
    if state.overtime {
        return match state.overtime_start_at {
            Some(start) => -overtime_elapsed(start, now).min(MAX_SECONDS),
            None => state.remaining_seconds,
        };
    }
    match state.deadline_at {
        Some(deadline) => remaining_until(deadline, now),
        None => state.remaining_seconds,
    }
}

/// Render seconds as `MM:SS` or `H:MM:SS`, with a sign for negative values
pub fn format_clock(seconds: i64) -> String {
    let sign = if seconds < 0 { "-" } else { "" };
    let total = seconds.unsigned_abs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    if hours > 0 {
        format!("{sign}{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{sign}{minutes:02}:{secs:02}")
    }
}
