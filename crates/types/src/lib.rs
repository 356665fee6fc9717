//! Value types for the Thread Network Data publisher.
//!
//! Everything here is plain data: prefixes, node identifiers, the
//! configurations border routers publish, and the records that make up a
//! Network Data snapshot.

mod border_router;
mod identifiers;
mod netdata;
mod prefix;
mod service;

pub use border_router::{ConfigError, ExternalRouteConfig, OnMeshPrefixConfig};
pub use identifiers::{PublisherEvent, Rloc16, RoutePreference};
pub use netdata::{EntryKey, NetworkDataEntry, NetworkDataRecord, NetworkDataSnapshot};
pub use prefix::Ip6Prefix;
pub use service::{DnsSrpCategory, DnsSrpServiceEntry};

use thiserror::Error;

/// Errors parsing textual representations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid IPv6 prefix: {0}")]
    Prefix(String),
    #[error("invalid route preference: {0}")]
    Preference(String),
    #[error("unknown prefix flag: {0}")]
    Flag(char),
}
