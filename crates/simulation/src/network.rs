//! Simulated Network Data: per-node views and the leader's copy.

use netdata_core::{NetworkDataError, NetworkDataView};
use netdata_types::{
    EntryKey, Ip6Prefix, NetworkDataEntry, NetworkDataRecord, NetworkDataSnapshot, Rloc16,
};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for the simulated mesh.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Number of nodes, each running one publisher.
    pub num_nodes: u32,

    /// Delay between a node changing its local entries and the leader
    /// learning about it.
    pub registration_delay: Duration,

    /// Base delay for a leader change to reach every node.
    pub propagation_delay: Duration,

    /// Extra random per-node propagation delay, in `[0, propagation_jitter]`.
    pub propagation_jitter: Duration,

    /// Maximum number of entries the leader's Network Data can hold.
    pub leader_capacity: usize,

    /// Mesh-local prefix of the network.
    pub mesh_local_prefix: Option<Ip6Prefix>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            num_nodes: 5,
            registration_delay: Duration::from_millis(50),
            propagation_delay: Duration::from_millis(100),
            propagation_jitter: Duration::from_millis(50),
            leader_capacity: 64,
            mesh_local_prefix: "fdde:ad00:beef::/64".parse().ok(),
        }
    }
}

impl NetworkConfig {
    pub fn with_num_nodes(mut self, num_nodes: u32) -> Self {
        self.num_nodes = num_nodes;
        self
    }

    pub fn with_registration_delay(mut self, delay: Duration) -> Self {
        self.registration_delay = delay;
        self
    }

    pub fn with_propagation(mut self, delay: Duration, jitter: Duration) -> Self {
        self.propagation_delay = delay;
        self.propagation_jitter = jitter;
        self
    }

    pub fn with_leader_capacity(mut self, capacity: usize) -> Self {
        self.leader_capacity = capacity;
        self
    }
}

/// One node's view of the Network Data.
///
/// Local changes are visible immediately in [`snapshot`](NetworkDataView::snapshot)
/// and are marked dirty until the runner registers them with the leader.
/// Entries of other nodes come only from the last propagated leader snapshot.
#[derive(Debug, Clone)]
pub struct SimNetworkData {
    rloc16: Rloc16,
    mesh_local_prefix: Option<Ip6Prefix>,
    capacity: usize,
    local: Vec<NetworkDataRecord>,
    propagated: NetworkDataSnapshot,
    generation: u64,
    dirty: bool,
    refused_adds: u64,
}

impl SimNetworkData {
    pub fn new(rloc16: Rloc16, config: &NetworkConfig) -> Self {
        Self {
            rloc16,
            mesh_local_prefix: config.mesh_local_prefix,
            capacity: config.leader_capacity,
            local: Vec::new(),
            propagated: NetworkDataSnapshot::default(),
            generation: 0,
            dirty: false,
            refused_adds: 0,
        }
    }

    /// Records currently added by this node.
    pub fn local_records(&self) -> &[NetworkDataRecord] {
        &self.local
    }

    /// The last leader snapshot this node received.
    pub fn propagated(&self) -> &NetworkDataSnapshot {
        &self.propagated
    }

    /// Adds refused because the leader's Network Data looked full.
    pub fn refused_adds(&self) -> u64 {
        self.refused_adds
    }

    /// Install a leader snapshot. Returns false for a stale generation.
    pub(crate) fn apply_propagation(&mut self, generation: u64, snapshot: NetworkDataSnapshot) -> bool {
        if generation < self.generation {
            debug!(
                rloc16 = %self.rloc16,
                generation,
                current = self.generation,
                "Ignoring stale network data"
            );
            return false;
        }
        self.generation = generation;
        self.propagated = snapshot;
        true
    }

    /// Forget local records the leader refused to hold. Returns false if
    /// none of them were still local.
    pub(crate) fn reject_local(&mut self, rejected: &[NetworkDataRecord]) -> bool {
        let before = self.local.len();
        self.local.retain(|record| !rejected.contains(record));
        if self.local.len() == before {
            return false;
        }
        debug!(
            rloc16 = %self.rloc16,
            rejected = before - self.local.len(),
            "Leader refused local entries"
        );
        true
    }

    /// Clear and report the dirty flag.
    pub(crate) fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    fn remote_count(&self) -> usize {
        self.propagated
            .iter()
            .filter(|entry| entry.owner != self.rloc16)
            .count()
    }
}

impl NetworkDataView for SimNetworkData {
    fn local_rloc16(&self) -> Rloc16 {
        self.rloc16
    }

    fn snapshot(&self) -> NetworkDataSnapshot {
        self.propagated
            .iter()
            .filter(|entry| entry.owner != self.rloc16)
            .copied()
            .chain(
                self.local
                    .iter()
                    .map(|record| NetworkDataEntry::new(self.rloc16, *record)),
            )
            .collect()
    }

    fn add_local_entry(&mut self, record: &NetworkDataRecord) -> Result<(), NetworkDataError> {
        let key = record.key();
        if let Some(existing) = self.local.iter_mut().find(|r| r.key() == key) {
            *existing = *record;
            self.dirty = true;
            return Ok(());
        }
        if self.remote_count() + self.local.len() >= self.capacity {
            self.refused_adds += 1;
            return Err(NetworkDataError::NoBufs);
        }
        self.local.push(*record);
        self.dirty = true;
        Ok(())
    }

    fn remove_local_entry(&mut self, key: &EntryKey) -> Result<(), NetworkDataError> {
        let index = self
            .local
            .iter()
            .position(|record| record.key() == *key)
            .ok_or(NetworkDataError::NotFound)?;
        self.local.remove(index);
        self.dirty = true;
        Ok(())
    }

    fn mesh_local_prefix(&self) -> Option<Ip6Prefix> {
        self.mesh_local_prefix
    }
}

/// The leader's authoritative copy of the Network Data.
#[derive(Debug, Clone)]
pub struct Leader {
    capacity: usize,
    entries: BTreeMap<Rloc16, Vec<NetworkDataRecord>>,
    generation: u64,
}

impl Leader {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: BTreeMap::new(),
            generation: 0,
        }
    }

    /// Replace `owner`'s entries with `records`.
    ///
    /// Records that do not fit within the capacity are dropped and returned.
    pub fn register(
        &mut self,
        owner: Rloc16,
        mut records: Vec<NetworkDataRecord>,
    ) -> Vec<NetworkDataRecord> {
        let others: usize = self
            .entries
            .iter()
            .filter(|(rloc16, _)| **rloc16 != owner)
            .map(|(_, records)| records.len())
            .sum();
        let room = self.capacity.saturating_sub(others);
        let dropped = records.split_off(room.min(records.len()));
        if !dropped.is_empty() {
            warn!(
                %owner,
                dropped = dropped.len(),
                capacity = self.capacity,
                "Leader network data full"
            );
        }

        if records.is_empty() {
            self.entries.remove(&owner);
        } else {
            self.entries.insert(owner, records);
        }
        self.generation += 1;
        dropped
    }

    /// Drop every entry of `owner`. Returns false if it had none.
    pub fn remove_owner(&mut self, owner: Rloc16) -> bool {
        if self.entries.remove(&owner).is_none() {
            return false;
        }
        self.generation += 1;
        true
    }

    /// Incremented on every change.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn snapshot(&self) -> NetworkDataSnapshot {
        self.entries
            .iter()
            .flat_map(|(owner, records)| {
                records
                    .iter()
                    .map(|record| NetworkDataEntry::new(*owner, *record))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
