//! Scenario configuration for the simulator.
//!
//! A scenario is loaded from TOML. Durations are written in humantime
//! notation (`"250ms"`, `"30s"`, `"2m"`).
//!
//! ```toml
//! seed = 42
//! nodes = 8
//! duration = "60s"
//!
//! [publisher]
//! desired_prefixes = 2
//!
//! [[publish]]
//! kind = "on_mesh_prefix"
//! prefix = "2001:db8:1::/64"
//!
//! [[fail]]
//! node = 0
//! at = "30s"
//! ```

use netdata_publisher::PublisherConfig;
use netdata_simulation::{NetworkConfig, NodeIndex, SimulationConfig, MAX_NODES};
use netdata_types::{
    DnsSrpServiceEntry, ExternalRouteConfig, Ip6Prefix, NetworkDataRecord, OnMeshPrefixConfig,
    RoutePreference,
};
use serde::{Deserialize, Deserializer};
use std::net::Ipv6Addr;
use std::path::Path;
use std::time::Duration;

use crate::SimulatorError;

const BUILTIN_SCENARIO: &str = r#"
[[publish]]
kind = "on_mesh_prefix"
prefix = "2001:db8:1::/64"

[[publish]]
kind = "external_route"
prefix = "fd00:abcd::/48"

[[publish]]
kind = "dns_srp_anycast"
sequence_number = 1
"#;

fn humantime_duration<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let s = String::deserialize(deserializer)?;
    humantime::parse_duration(&s).map_err(serde::de::Error::custom)
}

fn optional_humantime_duration<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Duration>, D::Error> {
    humantime_duration(deserializer).map(Some)
}

/// A complete simulation scenario.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Random seed for deterministic simulation.
    pub seed: u64,

    /// Number of nodes in the mesh.
    pub nodes: u32,

    /// Simulated time to run for.
    #[serde(deserialize_with = "humantime_duration")]
    pub duration: Duration,

    /// Interval between convergence samples.
    #[serde(deserialize_with = "humantime_duration")]
    pub sample_interval: Duration,

    pub network: NetworkSection,
    pub publisher: PublisherSection,

    /// Entries to publish.
    pub publish: Vec<PublishStep>,

    /// Nodes to fail.
    pub fail: Vec<FailStep>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            seed: 12345,
            nodes: 5,
            duration: Duration::from_secs(60),
            sample_interval: Duration::from_secs(1),
            network: NetworkSection::default(),
            publisher: PublisherSection::default(),
            publish: Vec::new(),
            fail: Vec::new(),
        }
    }
}

impl ScenarioConfig {
    /// Load a scenario from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, SimulatorError> {
        let content = std::fs::read_to_string(path).map_err(|source| SimulatorError::Io {
            path: path.display().to_string(),
            source,
        })?;
        content.parse()
    }

    /// The built-in scenario: every node publishes one on-mesh prefix, one
    /// external route and an anycast DNS/SRP service.
    pub fn builtin() -> Result<Self, SimulatorError> {
        BUILTIN_SCENARIO.parse()
    }

    pub fn with_nodes(mut self, nodes: u32) -> Self {
        self.nodes = nodes;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Set the desired copy count of every prefix kind.
    pub fn with_desired_prefixes(mut self, desired: usize) -> Self {
        self.publisher.desired_prefixes = Some(desired);
        self
    }

    /// Fail `node` at `at`.
    pub fn with_failure(mut self, node: NodeIndex, at: Duration) -> Self {
        self.fail.push(FailStep { node, at });
        self
    }

    /// Check the scenario for values the runner cannot honor.
    pub fn validate(&self) -> Result<(), SimulatorError> {
        if self.nodes == 0 || self.nodes > MAX_NODES {
            return Err(SimulatorError::InvalidScenario(format!(
                "nodes must be in 1..={MAX_NODES}, got {}",
                self.nodes
            )));
        }
        if self.sample_interval.is_zero() {
            return Err(SimulatorError::InvalidScenario(
                "sample_interval must be non-zero".to_string(),
            ));
        }
        for step in &self.publish {
            if let Some(node) = step.nodes.iter().flatten().find(|n| **n >= self.nodes) {
                return Err(SimulatorError::InvalidScenario(format!(
                    "publish step names node {node}, but there are only {} nodes",
                    self.nodes
                )));
            }
            step.entry.to_record()?;
        }
        if let Some(step) = self.fail.iter().find(|step| step.node >= self.nodes) {
            return Err(SimulatorError::InvalidScenario(format!(
                "fail step names node {}, but there are only {} nodes",
                step.node, self.nodes
            )));
        }
        Ok(())
    }

    /// Convert to the underlying simulation configuration.
    pub fn to_simulation_config(&self) -> SimulationConfig {
        SimulationConfig::default()
            .with_seed(self.seed)
            .with_network(self.network.to_network_config(self.nodes))
            .with_publisher(self.publisher.to_publisher_config())
    }
}

impl std::str::FromStr for ScenarioConfig {
    type Err = SimulatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(s)?)
    }
}

/// `[network]` overrides. Unset values keep the simulation defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkSection {
    #[serde(deserialize_with = "optional_humantime_duration")]
    pub registration_delay: Option<Duration>,
    #[serde(deserialize_with = "optional_humantime_duration")]
    pub propagation_delay: Option<Duration>,
    #[serde(deserialize_with = "optional_humantime_duration")]
    pub propagation_jitter: Option<Duration>,
    pub leader_capacity: Option<usize>,
}

impl NetworkSection {
    fn to_network_config(&self, nodes: u32) -> NetworkConfig {
        let defaults = NetworkConfig::default();
        NetworkConfig::default()
            .with_num_nodes(nodes)
            .with_registration_delay(self.registration_delay.unwrap_or(defaults.registration_delay))
            .with_propagation(
                self.propagation_delay.unwrap_or(defaults.propagation_delay),
                self.propagation_jitter.unwrap_or(defaults.propagation_jitter),
            )
            .with_leader_capacity(self.leader_capacity.unwrap_or(defaults.leader_capacity))
    }
}

/// `[publisher]` overrides. Unset values keep the publisher defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PublisherSection {
    pub max_prefix_entries: Option<usize>,
    pub desired_prefixes: Option<usize>,
    pub desired_dns_srp: Option<usize>,
    #[serde(deserialize_with = "optional_humantime_duration")]
    pub max_change_reaction_delay: Option<Duration>,
}

impl PublisherSection {
    fn to_publisher_config(&self) -> PublisherConfig {
        let mut config = PublisherConfig::default();
        if let Some(max) = self.max_prefix_entries {
            config = config.with_max_prefix_entries(max);
        }
        if let Some(desired) = self.desired_prefixes {
            config = config.with_desired_prefixes(desired);
        }
        if let Some(desired) = self.desired_dns_srp {
            config = config.with_desired_dns_srp(desired);
        }
        if let Some(delay) = self.max_change_reaction_delay {
            config = config.with_change_reaction_delay(delay);
        }
        config
    }
}

/// One `[[publish]]` step.
#[derive(Debug, Clone, Deserialize)]
pub struct PublishStep {
    /// When to publish.
    #[serde(default, deserialize_with = "humantime_duration")]
    pub at: Duration,

    /// Publishing nodes; every node when absent.
    #[serde(default)]
    pub nodes: Option<Vec<NodeIndex>>,

    #[serde(flatten)]
    pub entry: EntrySpec,
}

fn default_flags() -> String {
    "paos".to_string()
}

/// Entry published by a step.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntrySpec {
    OnMeshPrefix {
        prefix: Ip6Prefix,
        #[serde(default = "default_flags")]
        flags: String,
        #[serde(default)]
        preference: RoutePreference,
    },
    ExternalRoute {
        prefix: Ip6Prefix,
        #[serde(default)]
        preference: RoutePreference,
        #[serde(default)]
        nat64: bool,
    },
    DnsSrpAnycast {
        sequence_number: u8,
    },
    DnsSrpUnicast {
        address: Ipv6Addr,
        port: u16,
    },
}

impl EntrySpec {
    /// The record this step publishes.
    pub fn to_record(&self) -> Result<NetworkDataRecord, SimulatorError> {
        let record = match self {
            EntrySpec::OnMeshPrefix {
                prefix,
                flags,
                preference,
            } => NetworkDataRecord::OnMeshPrefix(
                OnMeshPrefixConfig::new(*prefix)
                    .with_flags(flags)?
                    .with_preference(*preference),
            ),
            EntrySpec::ExternalRoute {
                prefix,
                preference,
                nat64,
            } => NetworkDataRecord::ExternalRoute(
                ExternalRouteConfig::new(*prefix)
                    .with_preference(*preference)
                    .with_nat64(*nat64),
            ),
            EntrySpec::DnsSrpAnycast { sequence_number } => {
                NetworkDataRecord::DnsSrpService(DnsSrpServiceEntry::Anycast {
                    sequence_number: *sequence_number,
                })
            }
            EntrySpec::DnsSrpUnicast { address, port } => {
                NetworkDataRecord::DnsSrpService(DnsSrpServiceEntry::Unicast {
                    address: *address,
                    port: *port,
                })
            }
        };
        Ok(record)
    }
}

/// One `[[fail]]` step.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FailStep {
    pub node: NodeIndex,
    #[serde(deserialize_with = "humantime_duration")]
    pub at: Duration,
}
