//! Errors surfaced to the user by timer actions

use thiserror::Error;

use crate::timer::machine::Phase;

/// Why a timer action was rejected. None of these are fatal; each leaves
/// the tab in a visible, recoverable state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimerError {
    #[error("this timer is running in another tab ({owner}); it is read-only here")]
    ReadOnly { owner: String },

    #[error("cannot {action} while the timer is {phase}")]
    InvalidTransition { action: &'static str, phase: Phase },

    #[error("hold the reset button to reset a running timer")]
    HoldRequired,

    #[error("no linked session to end")]
    NoSession,
}

impl TimerError {
    /// Stable identifier for API clients
    pub fn code(&self) -> &'static str {
        match self {
            Self::ReadOnly { .. } => "read_only",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::HoldRequired => "hold_required",
            Self::NoSession => "no_session",
        }
    }
}
