//! Published entry bookkeeping.

use netdata_types::{EntryKey, NetworkDataRecord};
use std::fmt;
use std::time::Duration;

/// Publication state of a local entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryState {
    /// Not requested in the Network Data.
    Idle,
    /// Add request outstanding (sub-state of `Idle`).
    AddPending,
    /// Present in the Network Data.
    Added,
    /// Remove request outstanding (sub-state of `Added`).
    RemovePending,
}

impl EntryState {
    pub fn is_added(self) -> bool {
        self == EntryState::Added
    }

    /// Whether a request to the Network Data view is in flight.
    pub fn is_pending(self) -> bool {
        matches!(self, EntryState::AddPending | EntryState::RemovePending)
    }
}

impl fmt::Display for EntryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntryState::Idle => "idle",
            EntryState::AddPending => "add-pending",
            EntryState::Added => "added",
            EntryState::RemovePending => "remove-pending",
        };
        f.write_str(s)
    }
}

/// A candidate entry the local node wants published.
#[derive(Debug, Clone)]
pub(crate) struct Entry {
    pub(crate) record: NetworkDataRecord,
    pub(crate) state: EntryState,
    /// Deadline of the armed evaluation timer, if any.
    pub(crate) next_evaluation: Option<Duration>,
}

impl Entry {
    pub(crate) fn new(record: NetworkDataRecord) -> Self {
        Self {
            record,
            state: EntryState::Idle,
            next_evaluation: None,
        }
    }

    pub(crate) fn key(&self) -> EntryKey {
        self.record.key()
    }
}
