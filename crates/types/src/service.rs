//! DNS/SRP service entries.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv6Addr;

/// A DNS/SRP service endpoint advertised in the Network Data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DnsSrpServiceEntry {
    /// Anycast service identified by its sequence number.
    Anycast { sequence_number: u8 },
    /// Unicast service with an explicit address, carried in service data.
    Unicast { address: Ipv6Addr, port: u16 },
    /// Unicast service at the publishing node's mesh-local EID.
    UnicastMeshLocalEid { port: u16 },
}

/// Equivalence class used when counting DNS/SRP entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DnsSrpCategory {
    /// Anycast entries are equivalent only with the same sequence number.
    Anycast(u8),
    /// All unicast entries are equivalent, whichever form they take.
    Unicast,
}

impl DnsSrpServiceEntry {
    pub fn category(&self) -> DnsSrpCategory {
        match self {
            DnsSrpServiceEntry::Anycast { sequence_number } => {
                DnsSrpCategory::Anycast(*sequence_number)
            }
            DnsSrpServiceEntry::Unicast { .. } | DnsSrpServiceEntry::UnicastMeshLocalEid { .. } => {
                DnsSrpCategory::Unicast
            }
        }
    }

    pub fn is_equivalent(&self, other: &DnsSrpServiceEntry) -> bool {
        self.category() == other.category()
    }
}

impl fmt::Display for DnsSrpServiceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DnsSrpServiceEntry::Anycast { sequence_number } => {
                write!(f, "anycast seq:{}", sequence_number)
            }
            DnsSrpServiceEntry::Unicast { address, port } => {
                write!(f, "unicast [{}]:{}", address, port)
            }
            DnsSrpServiceEntry::UnicastMeshLocalEid { port } => {
                write!(f, "unicast ml-eid port:{}", port)
            }
        }
    }
}
