//! Deterministically ordered simulation event queue.

use netdata_core::TimerId;
use netdata_types::{NetworkDataRecord, NetworkDataSnapshot};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::NodeIndex;

/// Processing order of events scheduled for the same instant.
///
/// Registrations reach the leader before it propagates, and propagated
/// Network Data is seen before timers fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventPriority {
    Registration = 0,
    Propagation = 1,
    Timer = 2,
}

/// Key for ordering events in the queue.
///
/// Ordered by time, then priority, then node, then insertion sequence, so
/// two runs with the same seed process events in the same order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventKey {
    pub time: Duration,
    pub priority: EventPriority,
    pub node: NodeIndex,
    pub sequence: u64,
}

/// Something that happens at a node (or at the leader on a node's behalf).
#[derive(Debug, Clone)]
pub(crate) enum SimEvent {
    /// The node's local entry set reaches the leader.
    Register { records: Vec<NetworkDataRecord> },

    /// A leader snapshot reaches the node. Older generations than the
    /// node has already seen are ignored.
    Propagate {
        generation: u64,
        snapshot: NetworkDataSnapshot,
    },

    /// A publisher timer fires.
    Timer { id: TimerId },
}

#[derive(Debug, Default)]
pub(crate) struct EventQueue {
    events: BTreeMap<EventKey, SimEvent>,
    sequence: u64,
}

impl EventQueue {
    pub(crate) fn push(
        &mut self,
        time: Duration,
        priority: EventPriority,
        node: NodeIndex,
        event: SimEvent,
    ) -> EventKey {
        let key = EventKey {
            time,
            priority,
            node,
            sequence: self.sequence,
        };
        self.sequence += 1;
        self.events.insert(key, event);
        key
    }

    pub(crate) fn remove(&mut self, key: &EventKey) -> Option<SimEvent> {
        self.events.remove(key)
    }

    /// Pop the earliest event if it is due no later than `end`.
    pub(crate) fn pop_until(&mut self, end: Duration) -> Option<(EventKey, SimEvent)> {
        let (key, _) = self.events.first_key_value()?;
        if key.time > end {
            return None;
        }
        self.events.pop_first()
    }

    /// Drop every event addressed to `node`.
    pub(crate) fn remove_node(&mut self, node: NodeIndex) {
        self.events.retain(|key, _| key.node != node);
    }

    pub(crate) fn len(&self) -> usize {
        self.events.len()
    }
}
