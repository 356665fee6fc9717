//! Deterministic multi-node simulation of Network Data publishers.
//!
//! Given the same seed, a run produces identical results every time.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  SimulationRunner                       │
//! │                                                         │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     Event Queue (BTreeMap<EventKey, SimEvent>)     │ │
//! │  │     Ordered by: time, priority, node, sequence     │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │                             │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │  nodes: Vec<Publisher<SimNetworkData>>             │ │
//! │  │  local changes ──register──▶ Leader                │ │
//! │  │  Leader ──propagate (+jitter)──▶ every live node   │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │                             │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     Actions → schedule timer events                │ │
//! │  └────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────┘
//! ```

mod event_queue;
mod network;
mod runner;

pub use event_queue::{EventKey, EventPriority};
pub use network::{Leader, NetworkConfig, SimNetworkData};
pub use runner::{SimulationConfig, SimulationError, SimulationRunner, SimulationStats};

/// Index of a simulated node.
///
/// Node `i` attaches as router `i + 1`, so its RLOC16 is `0x0400 * (i + 1)`.
pub type NodeIndex = u32;

/// Most nodes a simulation can hold: router ids `1..=62`.
pub const MAX_NODES: u32 = 62;
