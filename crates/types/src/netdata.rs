//! Network Data records as seen by every node.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::{DnsSrpServiceEntry, ExternalRouteConfig, Ip6Prefix, OnMeshPrefixConfig, Rloc16};

/// Identity of a locally published entry.
///
/// Prefix entries are keyed by prefix alone: one prefix is never tracked as
/// both an on-mesh prefix and an external route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntryKey {
    Prefix(Ip6Prefix),
    DnsSrpService,
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKey::Prefix(prefix) => write!(f, "prefix {}", prefix),
            EntryKey::DnsSrpService => f.write_str("dns/srp service"),
        }
    }
}

/// One record a node contributes to the Network Data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NetworkDataRecord {
    OnMeshPrefix(OnMeshPrefixConfig),
    ExternalRoute(ExternalRouteConfig),
    DnsSrpService(DnsSrpServiceEntry),
}

impl NetworkDataRecord {
    pub fn key(&self) -> EntryKey {
        match self {
            NetworkDataRecord::OnMeshPrefix(config) => EntryKey::Prefix(config.prefix),
            NetworkDataRecord::ExternalRoute(config) => EntryKey::Prefix(config.prefix),
            NetworkDataRecord::DnsSrpService(_) => EntryKey::DnsSrpService,
        }
    }

    /// Whether the record is part of the stable Network Data.
    ///
    /// Service entries are always published as stable.
    pub fn is_stable(&self) -> bool {
        match self {
            NetworkDataRecord::OnMeshPrefix(config) => config.stable,
            NetworkDataRecord::ExternalRoute(config) => config.stable,
            NetworkDataRecord::DnsSrpService(_) => true,
        }
    }

    /// Whether `other` advertises the same thing as `self`.
    ///
    /// Records of different kinds are never equivalent.
    pub fn is_equivalent(&self, other: &NetworkDataRecord) -> bool {
        match (self, other) {
            (NetworkDataRecord::OnMeshPrefix(a), NetworkDataRecord::OnMeshPrefix(b)) => {
                a.is_equivalent(b)
            }
            (NetworkDataRecord::ExternalRoute(a), NetworkDataRecord::ExternalRoute(b)) => {
                a.is_equivalent(b)
            }
            (NetworkDataRecord::DnsSrpService(a), NetworkDataRecord::DnsSrpService(b)) => {
                a.is_equivalent(b)
            }
            _ => false,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            NetworkDataRecord::OnMeshPrefix(_) => "on-mesh prefix",
            NetworkDataRecord::ExternalRoute(_) => "external route",
            NetworkDataRecord::DnsSrpService(_) => "dns/srp service",
        }
    }
}

impl fmt::Display for NetworkDataRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkDataRecord::OnMeshPrefix(config) => write!(f, "on-mesh {}", config),
            NetworkDataRecord::ExternalRoute(config) => write!(f, "route {}", config),
            NetworkDataRecord::DnsSrpService(entry) => write!(f, "dnssrp {}", entry),
        }
    }
}

/// A record together with the node that contributed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetworkDataEntry {
    pub owner: Rloc16,
    pub record: NetworkDataRecord,
}

impl NetworkDataEntry {
    pub fn new(owner: Rloc16, record: NetworkDataRecord) -> Self {
        Self { owner, record }
    }
}

/// Immutable copy of the Network Data at one instant.
///
/// Cloning is cheap; an evaluation reads one snapshot throughout so that
/// counting and ranking always agree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkDataSnapshot {
    entries: Arc<[NetworkDataEntry]>,
}

impl NetworkDataSnapshot {
    pub fn new(entries: Vec<NetworkDataEntry>) -> Self {
        Self {
            entries: entries.into(),
        }
    }

    pub fn entries(&self) -> &[NetworkDataEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &NetworkDataEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries contributed by `owner`.
    pub fn owned_by(&self, owner: Rloc16) -> impl Iterator<Item = &NetworkDataEntry> {
        self.entries.iter().filter(move |e| e.owner == owner)
    }
}

impl FromIterator<NetworkDataEntry> for NetworkDataSnapshot {
    fn from_iter<I: IntoIterator<Item = NetworkDataEntry>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
