//! Publisher configuration.

use netdata_types::{DnsSrpCategory, NetworkDataRecord};
use std::time::Duration;

/// Configuration for the publisher.
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Number of prefix entry slots, shared by on-mesh prefixes and
    /// external routes. The DNS/SRP entry has its own slot.
    pub max_prefix_entries: usize,

    /// Live copies of an on-mesh prefix the network should hold.
    pub desired_on_mesh_prefixes: usize,

    /// Live copies of an external route the network should hold.
    pub desired_external_routes: usize,

    /// Live copies of an anycast DNS/SRP entry (same sequence number).
    pub desired_dns_srp_anycast: usize,

    /// Live copies of a unicast DNS/SRP entry (any address).
    pub desired_dns_srp_unicast: usize,

    /// Lower bound of the jittered delay before an entry is re-evaluated.
    pub min_reevaluation_delay: Duration,

    /// Upper bound of the jittered delay before an entry is re-evaluated.
    pub max_reevaluation_delay: Duration,

    /// Lower bound of the backoff after a failed Network Data request.
    pub min_retry_delay: Duration,

    /// Upper bound of the backoff after a failed Network Data request.
    ///
    /// Kept below `min_reevaluation_delay` so failures are retried sooner
    /// than the normal evaluation cadence.
    pub max_retry_delay: Duration,

    /// Upper bound of the random delay before reacting to a Network Data
    /// change, so nodes seeing the same change do not all act at once.
    /// Zero evaluates every entry in-line with the notification.
    ///
    /// The first evaluation of a newly published entry never waits.
    pub max_change_reaction_delay: Duration,

    /// Seed for the jitter generator.
    pub seed: u64,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            max_prefix_entries: 4,
            desired_on_mesh_prefixes: 2,
            desired_external_routes: 2,
            desired_dns_srp_anycast: 1,
            desired_dns_srp_unicast: 1,
            min_reevaluation_delay: Duration::from_secs(1),
            max_reevaluation_delay: Duration::from_secs(15),
            min_retry_delay: Duration::from_millis(250),
            max_retry_delay: Duration::from_secs(1),
            max_change_reaction_delay: Duration::from_secs(3),
            seed: 0x5eed,
        }
    }
}

impl PublisherConfig {
    /// Set the number of prefix entry slots.
    pub fn with_max_prefix_entries(mut self, max: usize) -> Self {
        self.max_prefix_entries = max;
        self
    }

    /// Set the desired count for both prefix kinds.
    pub fn with_desired_prefixes(mut self, desired: usize) -> Self {
        self.desired_on_mesh_prefixes = desired;
        self.desired_external_routes = desired;
        self
    }

    /// Set the desired count for both DNS/SRP categories.
    pub fn with_desired_dns_srp(mut self, desired: usize) -> Self {
        self.desired_dns_srp_anycast = desired;
        self.desired_dns_srp_unicast = desired;
        self
    }

    /// Set the re-evaluation jitter window.
    pub fn with_reevaluation_window(mut self, min: Duration, max: Duration) -> Self {
        self.min_reevaluation_delay = min;
        self.max_reevaluation_delay = max;
        self
    }

    /// Set the retry backoff window.
    pub fn with_retry_window(mut self, min: Duration, max: Duration) -> Self {
        self.min_retry_delay = min;
        self.max_retry_delay = max;
        self
    }

    /// Set the maximum delay before reacting to a Network Data change.
    pub fn with_change_reaction_delay(mut self, max: Duration) -> Self {
        self.max_change_reaction_delay = max;
        self
    }

    /// Set the jitter seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Desired number of live copies for a record's kind.
    pub fn desired_count(&self, record: &NetworkDataRecord) -> usize {
        match record {
            NetworkDataRecord::OnMeshPrefix(_) => self.desired_on_mesh_prefixes,
            NetworkDataRecord::ExternalRoute(_) => self.desired_external_routes,
            NetworkDataRecord::DnsSrpService(entry) => match entry.category() {
                DnsSrpCategory::Anycast(_) => self.desired_dns_srp_anycast,
                DnsSrpCategory::Unicast => self.desired_dns_srp_unicast,
            },
        }
    }
}
