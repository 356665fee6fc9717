//! IPv6 network prefix.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv6Addr;
use std::str::FromStr;

use crate::ParseError;

/// An IPv6 prefix (address + length in bits).
///
/// Bits past `length` are always zero, so two prefixes that cover the same
/// address range compare equal regardless of how they were written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ip6Prefix {
    address: Ipv6Addr,
    length: u8,
}

impl Ip6Prefix {
    /// Maximum prefix length.
    pub const MAX_LENGTH: u8 = 128;

    /// Prefix lengths accepted for NAT64 prefixes (RFC 6052).
    const NAT64_LENGTHS: [u8; 6] = [32, 40, 48, 56, 64, 96];

    /// Create a prefix, masking host bits.
    ///
    /// Returns `None` if `length` exceeds 128.
    pub fn new(address: Ipv6Addr, length: u8) -> Option<Self> {
        if length > Self::MAX_LENGTH {
            return None;
        }
        Some(Self {
            address: mask(address, length),
            length,
        })
    }

    /// Network address (host bits cleared).
    pub fn address(&self) -> Ipv6Addr {
        self.address
    }

    /// Prefix length in bits.
    pub fn length(&self) -> u8 {
        self.length
    }

    /// fe80::/10
    pub fn is_link_local(&self) -> bool {
        self.length >= 10 && (self.address.segments()[0] & 0xffc0) == 0xfe80
    }

    /// ff00::/8
    pub fn is_multicast(&self) -> bool {
        self.length >= 8 && self.address.octets()[0] == 0xff
    }

    /// Whether the length is one RFC 6052 allows for a NAT64 prefix.
    pub fn is_valid_nat64(&self) -> bool {
        Self::NAT64_LENGTHS.contains(&self.length)
    }

    /// Whether `address` lies inside this prefix.
    pub fn contains(&self, address: &Ipv6Addr) -> bool {
        mask(*address, self.length) == self.address
    }
}

fn mask(address: Ipv6Addr, length: u8) -> Ipv6Addr {
    let bits = u128::from(address);
    let masked = match length {
        0 => 0,
        l if l >= Ip6Prefix::MAX_LENGTH => bits,
        l => bits & (!0u128 << (Ip6Prefix::MAX_LENGTH - l)),
    };
    Ipv6Addr::from(masked)
}

impl fmt::Display for Ip6Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.length)
    }
}

impl FromStr for Ip6Prefix {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, len) = s
            .split_once('/')
            .ok_or_else(|| ParseError::Prefix(s.to_string()))?;
        let address: Ipv6Addr = addr.parse().map_err(|_| ParseError::Prefix(s.to_string()))?;
        let length: u8 = len.parse().map_err(|_| ParseError::Prefix(s.to_string()))?;
        Ip6Prefix::new(address, length).ok_or_else(|| ParseError::Prefix(s.to_string()))
    }
}

impl TryFrom<String> for Ip6Prefix {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Ip6Prefix> for String {
    fn from(prefix: Ip6Prefix) -> Self {
        prefix.to_string()
    }
}
