//! Pacing estimator
//!
//! Compares the actual remaining time against the time that should remain
//! given how many mandatory items are done.

use serde::{Deserialize, Serialize};

/// Difference (in seconds) inside which the session counts as on pace
pub const PACE_TOLERANCE_SECONDS: i64 = 300;

/// Mandatory item progress supplied by the host page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub total: u32,
    pub done: u32,
    /// Externally computed expectation, used instead of `total`/`done` for
    /// the ideal remaining time when both are present
    pub expected_total: Option<u32>,
    pub expected_done: Option<u32>,
}

impl SessionStats {
    pub fn remaining_items(&self) -> u32 {
        self.total.saturating_sub(self.done)
    }

    /// `(total, done)` pair the ideal remaining time is derived from
    fn reference(&self) -> Option<(u32, u32)> {
        let (total, done) = match (self.expected_total, self.expected_done) {
            (Some(total), Some(done)) if total > 0 => (total, done),
            _ => (self.total, self.done),
        };
        (total > 0).then(|| (total, done.min(total)))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaceStatus {
    Ahead,
    Behind,
    OnPace,
    /// Not enough data to judge
    #[default]
    Neutral,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PacingReport {
    pub status: PaceStatus,
    pub expected_remaining_seconds: Option<i64>,
    /// Actual minus expected; positive means time in hand
    pub diff_seconds: Option<i64>,
    pub remaining_items: u32,
}

/// Classify a session's pace
pub fn estimate(
    default_seconds: i64,
    actual_remaining_seconds: i64,
    stats: Option<&SessionStats>,
) -> PacingReport {
    let Some(stats) = stats else {
        return PacingReport::default();
    };
    let remaining_items = stats.remaining_items();
    let Some((ref_total, ref_done)) = stats.reference() else {
        return PacingReport {
            remaining_items,
            ..PacingReport::default()
        };
    };

    let expected =
        default_seconds * i64::from(ref_total - ref_done) / i64::from(ref_total);
    let diff = actual_remaining_seconds - expected;
    let status = if diff > PACE_TOLERANCE_SECONDS {
        PaceStatus::Ahead
    } else if diff < -PACE_TOLERANCE_SECONDS {
        PaceStatus::Behind
    } else {
        PaceStatus::OnPace
    };

    PacingReport {
        status,
        expected_remaining_seconds: Some(expected),
        diff_seconds: Some(diff),
        remaining_items,
    }
}
