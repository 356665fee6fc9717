//! The Network Data view: the publisher's only window onto the network.

use netdata_types::{EntryKey, Ip6Prefix, NetworkDataRecord, NetworkDataSnapshot, Rloc16};
use thiserror::Error;

/// Failures of a local add/remove request.
///
/// These never reach publisher clients; the publisher retries them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NetworkDataError {
    /// No room left in the local or leader Network Data.
    #[error("network data is full")]
    NoBufs,
    /// The entry to remove is not in the local Network Data.
    #[error("entry not found in local network data")]
    NotFound,
    /// The node cannot change its Network Data right now (e.g. detached).
    #[error("network data unavailable in current state")]
    InvalidState,
}

/// Read access to the global Network Data plus add/remove requests for
/// the entries this node contributes.
///
/// Change notifications are not part of this trait: the runner that owns
/// the view delivers [`Event::NetworkDataChanged`](crate::Event::NetworkDataChanged)
/// to the publisher whenever the globally visible data changes.
pub trait NetworkDataView {
    /// The local node's current RLOC16.
    fn local_rloc16(&self) -> Rloc16;

    /// All nodes' currently published entries.
    fn snapshot(&self) -> NetworkDataSnapshot;

    /// Add a record to the local Network Data for registration with the leader.
    fn add_local_entry(&mut self, record: &NetworkDataRecord) -> Result<(), NetworkDataError>;

    /// Remove the local record with the given key.
    fn remove_local_entry(&mut self, key: &EntryKey) -> Result<(), NetworkDataError>;

    /// The mesh-local prefix, which may never be published as a route or
    /// on-mesh prefix. `None` when unknown.
    fn mesh_local_prefix(&self) -> Option<Ip6Prefix> {
        None
    }
}
