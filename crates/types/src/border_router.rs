//! Border router configurations: on-mesh prefixes and external routes.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::{Ip6Prefix, ParseError, RoutePreference};

/// Why a prefix or route configuration was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("entry is not stable")]
    NotStable,
    #[error("prefix is link-local")]
    LinkLocal,
    #[error("prefix is multicast")]
    Multicast,
    #[error("prefix length is zero")]
    ZeroLength,
    #[error("SLAAC requires a /64 prefix")]
    SlaacLength,
    #[error("domain prefix requires a /64 prefix")]
    DomainPrefixLength,
    #[error("SLAAC and DHCP flags are mutually exclusive")]
    SlaacWithDhcp,
    #[error("invalid NAT64 prefix length")]
    Nat64Length,
    #[error("prefix is the mesh-local prefix")]
    MeshLocal,
}

/// On-mesh prefix configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OnMeshPrefixConfig {
    pub prefix: Ip6Prefix,
    #[serde(default)]
    pub preference: RoutePreference,
    #[serde(default)]
    pub preferred: bool,
    #[serde(default)]
    pub slaac: bool,
    #[serde(default)]
    pub dhcp: bool,
    #[serde(default)]
    pub configure: bool,
    #[serde(default)]
    pub default_route: bool,
    #[serde(default)]
    pub on_mesh: bool,
    #[serde(default)]
    pub stable: bool,
    #[serde(default)]
    pub nd_dns: bool,
    #[serde(default)]
    pub domain_prefix: bool,
}

impl OnMeshPrefixConfig {
    /// A config with every flag cleared and medium preference.
    pub fn new(prefix: Ip6Prefix) -> Self {
        Self {
            prefix,
            preference: RoutePreference::Medium,
            preferred: false,
            slaac: false,
            dhcp: false,
            configure: false,
            default_route: false,
            on_mesh: false,
            stable: false,
            nd_dns: false,
            domain_prefix: false,
        }
    }

    /// Set flags from the `padcrosnD` letter notation.
    ///
    /// `p` preferred, `a` SLAAC, `d` DHCP, `c` configure, `r` default
    /// route, `o` on-mesh, `s` stable, `n` ND DNS, `D` domain prefix.
    pub fn with_flags(mut self, letters: &str) -> Result<Self, ParseError> {
        for c in letters.chars() {
            match c {
                'p' => self.preferred = true,
                'a' => self.slaac = true,
                'd' => self.dhcp = true,
                'c' => self.configure = true,
                'r' => self.default_route = true,
                'o' => self.on_mesh = true,
                's' => self.stable = true,
                'n' => self.nd_dns = true,
                'D' => self.domain_prefix = true,
                other => return Err(ParseError::Flag(other)),
            }
        }
        Ok(self)
    }

    pub fn with_preference(mut self, preference: RoutePreference) -> Self {
        self.preference = preference;
        self
    }

    /// Whether another on-mesh prefix entry advertises the same thing.
    ///
    /// Preference and the stable flag do not take part: preference only
    /// ranks contributors, and only stable entries are compared at all.
    pub fn is_equivalent(&self, other: &OnMeshPrefixConfig) -> bool {
        self.prefix == other.prefix && self.flag_letters(false) == other.flag_letters(false)
    }

    /// Check the configuration may be published.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prefix.length() == 0 {
            return Err(ConfigError::ZeroLength);
        }
        if self.prefix.is_link_local() {
            return Err(ConfigError::LinkLocal);
        }
        if self.prefix.is_multicast() {
            return Err(ConfigError::Multicast);
        }
        if self.slaac && self.prefix.length() != 64 {
            return Err(ConfigError::SlaacLength);
        }
        if self.domain_prefix && self.prefix.length() != 64 {
            return Err(ConfigError::DomainPrefixLength);
        }
        if self.slaac && self.dhcp {
            return Err(ConfigError::SlaacWithDhcp);
        }
        if !self.stable {
            return Err(ConfigError::NotStable);
        }
        Ok(())
    }

    fn flag_letters(&self, include_stable: bool) -> String {
        [
            (self.preferred, 'p'),
            (self.slaac, 'a'),
            (self.dhcp, 'd'),
            (self.configure, 'c'),
            (self.default_route, 'r'),
            (self.on_mesh, 'o'),
            (self.stable && include_stable, 's'),
            (self.nd_dns, 'n'),
            (self.domain_prefix, 'D'),
        ]
        .iter()
        .filter(|(set, _)| *set)
        .map(|(_, c)| *c)
        .collect()
    }
}

impl fmt::Display for OnMeshPrefixConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.prefix, self.flag_letters(true), self.preference)
    }
}

/// External route configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalRouteConfig {
    pub prefix: Ip6Prefix,
    #[serde(default)]
    pub preference: RoutePreference,
    #[serde(default)]
    pub stable: bool,
    #[serde(default)]
    pub nat64: bool,
}

impl ExternalRouteConfig {
    /// A stable, medium-preference route.
    pub fn new(prefix: Ip6Prefix) -> Self {
        Self {
            prefix,
            preference: RoutePreference::Medium,
            stable: true,
            nat64: false,
        }
    }

    pub fn with_preference(mut self, preference: RoutePreference) -> Self {
        self.preference = preference;
        self
    }

    pub fn with_nat64(mut self, nat64: bool) -> Self {
        self.nat64 = nat64;
        self
    }

    pub fn with_stable(mut self, stable: bool) -> Self {
        self.stable = stable;
        self
    }

    /// Whether another external route advertises the same thing.
    pub fn is_equivalent(&self, other: &ExternalRouteConfig) -> bool {
        self.prefix == other.prefix && self.nat64 == other.nat64
    }

    /// Check the configuration may be published.
    ///
    /// `::/0` is a valid external route (default route).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prefix.is_link_local() {
            return Err(ConfigError::LinkLocal);
        }
        if self.prefix.is_multicast() {
            return Err(ConfigError::Multicast);
        }
        if self.nat64 && !self.prefix.is_valid_nat64() {
            return Err(ConfigError::Nat64Length);
        }
        if !self.stable {
            return Err(ConfigError::NotStable);
        }
        Ok(())
    }
}

impl fmt::Display for ExternalRouteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.prefix)?;
        if self.stable {
            f.write_str("s")?;
        }
        if self.nat64 {
            f.write_str("n")?;
        }
        write!(f, " {}", self.preference)
    }
}
