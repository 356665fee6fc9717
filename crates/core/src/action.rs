//! Outbound actions for the runner to perform.

use netdata_types::EntryKey;
use std::fmt;
use std::time::Duration;

/// Identifies a timer owned by a state machine.
///
/// Setting a timer whose id is already armed replaces the old deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerId {
    /// Re-evaluation of one published entry.
    Evaluation(EntryKey),
}

impl TimerId {
    /// The event to deliver when this timer fires.
    pub fn into_event(self) -> crate::Event {
        match self {
            TimerId::Evaluation(key) => crate::Event::EvaluationTimer { key },
        }
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerId::Evaluation(key) => write!(f, "evaluation({})", key),
        }
    }
}

/// Actions a state machine asks the runner to perform.
///
/// The runner handles the actual clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Arm (or re-arm) a timer to fire after `duration`.
    SetTimer { id: TimerId, duration: Duration },

    /// Disarm a timer. Cancelling an unarmed timer is a no-op.
    CancelTimer { id: TimerId },
}

impl Action {
    /// Get a human-readable name for this action type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Action::SetTimer { .. } => "SetTimer",
            Action::CancelTimer { .. } => "CancelTimer",
        }
    }

    /// The timer this action refers to.
    pub fn timer_id(&self) -> TimerId {
        match self {
            Action::SetTimer { id, .. } | Action::CancelTimer { id } => *id,
        }
    }
}
