//! Test helpers for the Network Data publisher.
//!
//! Provides record fixtures, an in-memory [`MockNetworkData`] view with
//! failure injection, and an [`EventLog`] that records callback
//! invocations.

use netdata_core::{NetworkDataError, NetworkDataView};
use netdata_types::{
    EntryKey, ExternalRouteConfig, Ip6Prefix, NetworkDataEntry, NetworkDataRecord,
    NetworkDataSnapshot, OnMeshPrefixConfig, PublisherEvent, Rloc16,
};
use parking_lot::Mutex;
use std::sync::Arc;

// ═══════════════════════════════════════════════════════════════════════════
// Fixtures
// ═══════════════════════════════════════════════════════════════════════════

/// Parse a prefix literal such as `"2001:db8::/64"`.
///
/// # Panics
///
/// Panics on a malformed literal.
pub fn prefix(s: &str) -> Ip6Prefix {
    s.parse()
        .unwrap_or_else(|e| panic!("bad prefix fixture {s:?}: {e}"))
}

/// A stable SLAAC on-mesh prefix (`paos`) with medium preference.
pub fn on_mesh_prefix(s: &str) -> OnMeshPrefixConfig {
    OnMeshPrefixConfig::new(prefix(s))
        .with_flags("paos")
        .unwrap_or_else(|e| panic!("bad flags fixture: {e}"))
}

/// A stable external route with medium preference.
pub fn external_route(s: &str) -> ExternalRouteConfig {
    ExternalRouteConfig::new(prefix(s))
}

pub fn on_mesh_record(s: &str) -> NetworkDataRecord {
    NetworkDataRecord::OnMeshPrefix(on_mesh_prefix(s))
}

pub fn route_record(s: &str) -> NetworkDataRecord {
    NetworkDataRecord::ExternalRoute(external_route(s))
}

// ═══════════════════════════════════════════════════════════════════════════
// MockNetworkData
// ═══════════════════════════════════════════════════════════════════════════

/// In-memory Network Data as seen by one node.
///
/// Local adds and removes take effect immediately and show up in the next
/// snapshot under the node's current RLOC16. Entries of other nodes are
/// placed directly by the test.
#[derive(Debug, Clone)]
pub struct MockNetworkData {
    rloc16: Rloc16,
    remote: Vec<NetworkDataEntry>,
    local: Vec<NetworkDataRecord>,
    mesh_local_prefix: Option<Ip6Prefix>,
    failing_adds: usize,
    failing_removes: usize,
    add_requests: usize,
    remove_requests: usize,
}

impl MockNetworkData {
    pub fn new(rloc16: Rloc16) -> Self {
        Self {
            rloc16,
            remote: Vec::new(),
            local: Vec::new(),
            mesh_local_prefix: None,
            failing_adds: 0,
            failing_removes: 0,
            add_requests: 0,
            remove_requests: 0,
        }
    }

    pub fn with_mesh_local_prefix(mut self, prefix: Ip6Prefix) -> Self {
        self.mesh_local_prefix = Some(prefix);
        self
    }

    /// Add an entry owned by another node.
    pub fn add_remote(&mut self, owner: Rloc16, record: NetworkDataRecord) {
        self.remote.push(NetworkDataEntry::new(owner, record));
    }

    /// Drop every entry owned by `owner`.
    pub fn remove_remote(&mut self, owner: Rloc16) {
        self.remote.retain(|entry| entry.owner != owner);
    }

    pub fn clear_remote(&mut self) {
        self.remote.clear();
    }

    /// Simulate re-attachment under a new RLOC16.
    pub fn set_rloc16(&mut self, rloc16: Rloc16) {
        self.rloc16 = rloc16;
    }

    /// Drop a local entry without a remove request, as a full leader would.
    pub fn drop_local(&mut self, key: &EntryKey) {
        self.local.retain(|existing| existing.key() != *key);
    }

    /// Make the next `count` add requests fail with `NoBufs`.
    pub fn fail_next_adds(&mut self, count: usize) {
        self.failing_adds = count;
    }

    /// Make the next `count` remove requests fail with `InvalidState`.
    pub fn fail_next_removes(&mut self, count: usize) {
        self.failing_removes = count;
    }

    /// Records currently added by the local node.
    pub fn local_records(&self) -> &[NetworkDataRecord] {
        &self.local
    }

    /// Add requests received, failed ones included.
    pub fn add_requests(&self) -> usize {
        self.add_requests
    }

    /// Remove requests received, failed ones included.
    pub fn remove_requests(&self) -> usize {
        self.remove_requests
    }
}

impl NetworkDataView for MockNetworkData {
    fn local_rloc16(&self) -> Rloc16 {
        self.rloc16
    }

    fn snapshot(&self) -> NetworkDataSnapshot {
        self.remote
            .iter()
            .copied()
            .chain(
                self.local
                    .iter()
                    .map(|record| NetworkDataEntry::new(self.rloc16, *record)),
            )
            .collect()
    }

    fn add_local_entry(&mut self, record: &NetworkDataRecord) -> Result<(), NetworkDataError> {
        self.add_requests += 1;
        if self.failing_adds > 0 {
            self.failing_adds -= 1;
            return Err(NetworkDataError::NoBufs);
        }
        let key = record.key();
        self.local.retain(|existing| existing.key() != key);
        self.local.push(*record);
        Ok(())
    }

    fn remove_local_entry(&mut self, key: &EntryKey) -> Result<(), NetworkDataError> {
        self.remove_requests += 1;
        if self.failing_removes > 0 {
            self.failing_removes -= 1;
            return Err(NetworkDataError::InvalidState);
        }
        let before = self.local.len();
        self.local.retain(|existing| existing.key() != *key);
        if self.local.len() == before {
            return Err(NetworkDataError::NotFound);
        }
        Ok(())
    }

    fn mesh_local_prefix(&self) -> Option<Ip6Prefix> {
        self.mesh_local_prefix
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// EventLog
// ═══════════════════════════════════════════════════════════════════════════

/// Shared record of callback invocations, in order.
#[derive(Debug)]
pub struct EventLog<T> {
    events: Arc<Mutex<Vec<T>>>,
}

impl<T> Clone for EventLog<T> {
    fn clone(&self) -> Self {
        Self {
            events: Arc::clone(&self.events),
        }
    }
}

impl<T> Default for EventLog<T> {
    fn default() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<T: Clone> EventLog<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<T> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventLog<(PublisherEvent, Ip6Prefix)> {
    /// A prefix callback appending to this log.
    pub fn prefix_callback(&self) -> Box<dyn FnMut(PublisherEvent, &Ip6Prefix) + Send> {
        let events = Arc::clone(&self.events);
        Box::new(move |event, prefix| events.lock().push((event, *prefix)))
    }
}

impl EventLog<PublisherEvent> {
    /// A DNS/SRP service callback appending to this log.
    pub fn dns_srp_callback(&self) -> Box<dyn FnMut(PublisherEvent) + Send> {
        let events = Arc::clone(&self.events);
        Box::new(move |event| events.lock().push(event))
    }
}
