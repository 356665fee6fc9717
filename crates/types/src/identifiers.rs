//! Domain-specific identifier types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ParseError;

/// Routing locator (RLOC16): a node's 16-bit short network address.
///
/// The upper 6 bits carry the router id and the lower 9 bits the child id.
/// A router's own RLOC16 has a child id of zero.
///
/// RLOC16 is used as the owner of Network Data entries and as the
/// deterministic tie-break key when too many equivalent entries exist.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Rloc16(pub u16);

impl Rloc16 {
    const ROUTER_ID_OFFSET: u16 = 10;
    const CHILD_ID_MASK: u16 = 0x01ff;

    /// Build the RLOC16 of a router from its router id.
    pub fn from_router_id(router_id: u8) -> Self {
        Rloc16(u16::from(router_id) << Self::ROUTER_ID_OFFSET)
    }

    /// Router id part.
    pub fn router_id(self) -> u8 {
        (self.0 >> Self::ROUTER_ID_OFFSET) as u8
    }

    /// Child id part (zero for routers).
    pub fn child_id(self) -> u16 {
        self.0 & Self::CHILD_ID_MASK
    }

    /// Whether this RLOC16 identifies a router rather than a child.
    pub fn is_router(self) -> bool {
        self.child_id() == 0
    }
}

impl fmt::Display for Rloc16 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}", self.0)
    }
}

/// Route preference advertised with a prefix or route.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RoutePreference {
    Low,
    #[default]
    Medium,
    High,
}

impl RoutePreference {
    /// Signed two-bit encoding used on the wire (-1, 0, 1).
    pub fn as_i8(self) -> i8 {
        match self {
            RoutePreference::Low => -1,
            RoutePreference::Medium => 0,
            RoutePreference::High => 1,
        }
    }

    /// Decode from the signed encoding. Any other value is rejected.
    pub fn from_i8(value: i8) -> Option<Self> {
        match value {
            -1 => Some(RoutePreference::Low),
            0 => Some(RoutePreference::Medium),
            1 => Some(RoutePreference::High),
            _ => None,
        }
    }
}

impl fmt::Display for RoutePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RoutePreference::Low => "low",
            RoutePreference::Medium => "med",
            RoutePreference::High => "high",
        };
        f.write_str(s)
    }
}

impl FromStr for RoutePreference {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(RoutePreference::Low),
            "med" | "medium" => Ok(RoutePreference::Medium),
            "high" => Ok(RoutePreference::High),
            other => Err(ParseError::Preference(other.to_string())),
        }
    }
}

/// Events reported to publisher observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PublisherEvent {
    /// Published entry was added to the Network Data.
    EntryAdded,
    /// Published entry was removed from the Network Data.
    EntryRemoved,
}

impl fmt::Display for PublisherEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublisherEvent::EntryAdded => f.write_str("added"),
            PublisherEvent::EntryRemoved => f.write_str("removed"),
        }
    }
}
