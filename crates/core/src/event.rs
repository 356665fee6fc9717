//! Inbound events delivered to the publisher by the runner.

use netdata_types::EntryKey;

/// Events the runner feeds into [`StateMachine::handle`](crate::StateMachine::handle).
///
/// Client requests (publish/unpublish) are not events: they are direct
/// method calls so that callers get their result synchronously.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The globally visible Network Data changed (any node added or
    /// removed entries). Delivered once per propagated change.
    NetworkDataChanged,

    /// The evaluation timer of one entry expired.
    EvaluationTimer { key: EntryKey },
}

impl Event {
    /// Get a human-readable name for this event type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Event::NetworkDataChanged => "NetworkDataChanged",
            Event::EvaluationTimer { .. } => "EvaluationTimer",
        }
    }

    /// Check if this event is a timer expiry.
    pub fn is_timer(&self) -> bool {
        matches!(self, Event::EvaluationTimer { .. })
    }
}
