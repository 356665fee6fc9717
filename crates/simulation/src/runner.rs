//! Simulation runner.

use netdata_core::{Action, Event, StateMachine, TimerId};
use netdata_publisher::{Publisher, PublisherConfig, PublisherError};
use netdata_types::{
    DnsSrpServiceEntry, EntryKey, ExternalRouteConfig, Ip6Prefix, NetworkDataRecord,
    NetworkDataSnapshot, OnMeshPrefixConfig, Rloc16,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, trace};

use crate::event_queue::{EventKey, EventPriority, EventQueue, SimEvent};
use crate::network::{Leader, NetworkConfig, SimNetworkData};
use crate::{NodeIndex, MAX_NODES};

/// Configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub network: NetworkConfig,

    /// Publisher configuration shared by every node. Each node's jitter
    /// seed is derived from `seed` and its index.
    pub publisher: PublisherConfig,

    /// Random seed for deterministic simulation.
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            publisher: PublisherConfig::default(),
            seed: 12345,
        }
    }
}

impl SimulationConfig {
    pub fn with_network(mut self, network: NetworkConfig) -> Self {
        self.network = network;
        self
    }

    pub fn with_publisher(mut self, publisher: PublisherConfig) -> Self {
        self.publisher = publisher;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Errors from runner-level requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SimulationError {
    #[error("unknown node {0}")]
    UnknownNode(NodeIndex),

    #[error("node {0} has failed")]
    NodeFailed(NodeIndex),

    #[error("{0} nodes requested, at most {MAX_NODES} fit in the router id space")]
    TooManyNodes(u32),

    #[error(transparent)]
    Publisher(#[from] PublisherError),
}

/// Counters collected while the simulation runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulationStats {
    /// Events popped from the queue and processed.
    pub events_processed: u64,
    /// Publisher evaluation timers that fired.
    pub timers_fired: u64,
    /// Local entry sets registered with the leader.
    pub registrations: u64,
    /// Leader snapshots delivered to nodes.
    pub propagations: u64,
    /// Records the leader dropped for lack of room.
    pub leader_rejections: u64,
    /// Local adds refused by node views for lack of room.
    pub refused_adds: u64,
}

struct SimNode {
    publisher: Publisher<SimNetworkData>,
    failed: bool,
}

/// Deterministic multi-node simulation.
///
/// Every node runs its own [`Publisher`] over a [`SimNetworkData`] view.
/// Local changes are registered with a single [`Leader`], which propagates
/// each change back to every live node with a per-node jittered delay.
pub struct SimulationRunner {
    config: SimulationConfig,
    nodes: Vec<SimNode>,
    leader: Leader,
    queue: EventQueue,
    /// Queue position of each armed publisher timer.
    timers: HashMap<(NodeIndex, TimerId), EventKey>,
    rng: ChaCha8Rng,
    now: Duration,
    stats: SimulationStats,
}

impl SimulationRunner {
    /// Build the nodes and the leader. Fails if there are more nodes than
    /// distinct router ids.
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        if config.network.num_nodes > MAX_NODES {
            return Err(SimulationError::TooManyNodes(config.network.num_nodes));
        }

        let nodes = (0..config.network.num_nodes)
            .map(|index| {
                let view = SimNetworkData::new(Self::rloc16_for(index), &config.network);
                let publisher_config = config
                    .publisher
                    .clone()
                    .with_seed(config.seed.wrapping_add(u64::from(index) + 1));
                SimNode {
                    publisher: Publisher::new(publisher_config, view),
                    failed: false,
                }
            })
            .collect();

        info!(
            nodes = config.network.num_nodes,
            seed = config.seed,
            "Created simulation"
        );

        Ok(Self {
            leader: Leader::new(config.network.leader_capacity),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            nodes,
            queue: EventQueue::default(),
            timers: HashMap::new(),
            now: Duration::ZERO,
            stats: SimulationStats::default(),
            config,
        })
    }

    /// RLOC16 of the router at `index`. Only meaningful below
    /// [`MAX_NODES`].
    pub fn rloc16_for(index: NodeIndex) -> Rloc16 {
        Rloc16::from_router_id((index + 1) as u8)
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn num_nodes(&self) -> u32 {
        self.nodes.len() as u32
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn node(&self, index: NodeIndex) -> Option<&Publisher<SimNetworkData>> {
        self.nodes.get(index as usize).map(|node| &node.publisher)
    }

    pub fn is_failed(&self, index: NodeIndex) -> bool {
        self.nodes
            .get(index as usize)
            .is_some_and(|node| node.failed)
    }

    pub fn stats(&self) -> SimulationStats {
        SimulationStats {
            refused_adds: self
                .nodes
                .iter()
                .map(|node| node.publisher.view().refused_adds())
                .sum(),
            ..self.stats
        }
    }

    /// The leader's current Network Data.
    pub fn leader_entries(&self) -> NetworkDataSnapshot {
        self.leader.snapshot()
    }

    /// Owners of leader entries with the given key, in RLOC16 order.
    pub fn contributors(&self, key: &EntryKey) -> Vec<Rloc16> {
        self.leader
            .snapshot()
            .iter()
            .filter(|entry| entry.record.key() == *key)
            .map(|entry| entry.owner)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Number of distinct nodes whose leader entries carry `key`.
    pub fn count_contributors(&self, key: &EntryKey) -> usize {
        self.contributors(key).len()
    }

    /// Owners of leader entries a publisher of `record` would count as
    /// duplicates, in RLOC16 order.
    ///
    /// Unlike [`contributors`](Self::contributors), DNS/SRP entries of
    /// different categories are told apart.
    pub fn equivalent_contributors(&self, record: &NetworkDataRecord) -> Vec<Rloc16> {
        self.leader
            .snapshot()
            .iter()
            .filter(|entry| record.is_equivalent(&entry.record))
            .map(|entry| entry.owner)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Client requests
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn publish_on_mesh_prefix(
        &mut self,
        index: NodeIndex,
        config: OnMeshPrefixConfig,
    ) -> Result<(), SimulationError> {
        self.with_node(index, |publisher| publisher.publish_on_mesh_prefix(config))
    }

    pub fn publish_external_route(
        &mut self,
        index: NodeIndex,
        config: ExternalRouteConfig,
    ) -> Result<(), SimulationError> {
        self.with_node(index, |publisher| publisher.publish_external_route(config))
    }

    pub fn publish_dns_srp_service(
        &mut self,
        index: NodeIndex,
        service: DnsSrpServiceEntry,
    ) -> Result<(), SimulationError> {
        self.with_node(index, |publisher| {
            Ok(publisher.publish_dns_srp_service(service))
        })
    }

    pub fn unpublish_prefix(
        &mut self,
        index: NodeIndex,
        prefix: Ip6Prefix,
    ) -> Result<(), SimulationError> {
        self.with_node(index, |publisher| publisher.unpublish_prefix(&prefix))
    }

    pub fn unpublish_dns_srp_service(&mut self, index: NodeIndex) -> Result<(), SimulationError> {
        self.with_node(index, |publisher| {
            Ok(publisher.unpublish_dns_srp_service())
        })
    }

    /// Run a request against one node's publisher and execute its actions.
    fn with_node<F>(&mut self, index: NodeIndex, request: F) -> Result<(), SimulationError>
    where
        F: FnOnce(&mut Publisher<SimNetworkData>) -> Result<Vec<Action>, PublisherError>,
    {
        let now = self.now;
        let node = self
            .nodes
            .get_mut(index as usize)
            .ok_or(SimulationError::UnknownNode(index))?;
        if node.failed {
            return Err(SimulationError::NodeFailed(index));
        }
        node.publisher.set_time(now);
        let actions = request(&mut node.publisher)?;
        self.process_actions(index, actions);
        Ok(())
    }

    /// Stop a node. The leader drops its entries at once and propagates.
    pub fn fail_node(&mut self, index: NodeIndex) -> Result<(), SimulationError> {
        let node = self
            .nodes
            .get_mut(index as usize)
            .ok_or(SimulationError::UnknownNode(index))?;
        if node.failed {
            return Ok(());
        }
        node.failed = true;

        info!(node = index, rloc16 = %Self::rloc16_for(index), "Node failed");
        self.queue.remove_node(index);
        self.timers.retain(|(node, _), _| *node != index);
        if self.leader.remove_owner(Self::rloc16_for(index)) {
            self.propagate();
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Event loop
    // ═══════════════════════════════════════════════════════════════════════════

    /// Process every event due no later than `end`, then advance to `end`.
    pub fn run_until(&mut self, end: Duration) {
        while let Some((key, event)) = self.queue.pop_until(end) {
            self.now = key.time;
            self.stats.events_processed += 1;
            self.process_event(key, event);
        }
        self.now = self.now.max(end);
    }

    pub fn run_for(&mut self, duration: Duration) {
        self.run_until(self.now + duration);
    }

    fn process_event(&mut self, key: EventKey, event: SimEvent) {
        let index = key.node;
        trace!(node = index, time = ?key.time, ?event, "Processing event");

        match event {
            SimEvent::Register { records } => {
                self.stats.registrations += 1;
                let dropped = self.leader.register(Self::rloc16_for(index), records);
                self.stats.leader_rejections += dropped.len() as u64;
                self.propagate();

                let rejected = self
                    .nodes
                    .get_mut(index as usize)
                    .is_some_and(|node| node.publisher.view_mut().reject_local(&dropped));
                if rejected {
                    self.deliver(index, Event::NetworkDataChanged);
                }
            }
            SimEvent::Propagate {
                generation,
                snapshot,
            } => {
                let Some(node) = self.nodes.get_mut(index as usize) else {
                    return;
                };
                if node.failed {
                    return;
                }
                self.stats.propagations += 1;
                if node.publisher.view_mut().apply_propagation(generation, snapshot) {
                    self.deliver(index, Event::NetworkDataChanged);
                }
            }
            SimEvent::Timer { id } => {
                self.timers.remove(&(index, id));
                self.stats.timers_fired += 1;
                self.deliver(index, id.into_event());
            }
        }
    }

    fn deliver(&mut self, index: NodeIndex, event: Event) {
        let now = self.now;
        let Some(node) = self.nodes.get_mut(index as usize) else {
            return;
        };
        if node.failed {
            return;
        }
        node.publisher.set_time(now);
        let actions = node.publisher.handle(event);
        self.process_actions(index, actions);
    }

    fn process_actions(&mut self, index: NodeIndex, actions: Vec<Action>) {
        for action in actions {
            match action {
                Action::SetTimer { id, duration } => {
                    if let Some(old) = self.timers.remove(&(index, id)) {
                        self.queue.remove(&old);
                    }
                    let key = self.queue.push(
                        self.now + duration,
                        EventPriority::Timer,
                        index,
                        SimEvent::Timer { id },
                    );
                    self.timers.insert((index, id), key);
                }
                Action::CancelTimer { id } => {
                    if let Some(old) = self.timers.remove(&(index, id)) {
                        self.queue.remove(&old);
                    }
                }
            }
        }
        self.schedule_registration(index);
    }

    /// Send the node's local entry set to the leader if it changed.
    fn schedule_registration(&mut self, index: NodeIndex) {
        let Some(node) = self.nodes.get_mut(index as usize) else {
            return;
        };
        let view = node.publisher.view_mut();
        if !view.take_dirty() {
            return;
        }
        let records = view.local_records().to_vec();
        debug!(node = index, entries = records.len(), "Scheduling registration");
        self.queue.push(
            self.now + self.config.network.registration_delay,
            EventPriority::Registration,
            index,
            SimEvent::Register { records },
        );
    }

    /// Send the leader's current snapshot to every live node.
    fn propagate(&mut self) {
        let generation = self.leader.generation();
        let snapshot = self.leader.snapshot();
        let base = self.now + self.config.network.propagation_delay;
        let jitter_ms = self.config.network.propagation_jitter.as_millis() as u64;

        for (index, node) in self.nodes.iter().enumerate() {
            if node.failed {
                continue;
            }
            let jitter = Duration::from_millis(self.rng.gen_range(0..=jitter_ms));
            self.queue.push(
                base + jitter,
                EventPriority::Propagation,
                index as NodeIndex,
                SimEvent::Propagate {
                    generation,
                    snapshot: snapshot.clone(),
                },
            );
        }
    }
}
