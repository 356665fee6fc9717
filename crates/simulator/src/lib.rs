//! Network Data publisher simulator.
//!
//! Drives a [`SimulationRunner`](netdata_simulation::SimulationRunner) through
//! a scenario (publish steps and node failures), samples how many nodes
//! contribute each published entry, and reports when each entry converged to
//! its desired copy count.
//!
//! # Example
//!
//! ```ignore
//! use netdata_simulator::{ScenarioConfig, Simulator};
//! use std::time::Duration;
//!
//! let scenario = ScenarioConfig::builtin()?
//!     .with_nodes(8)
//!     .with_failure(0, Duration::from_secs(30));
//!
//! let report = Simulator::new(scenario)?.run()?;
//! report.print();
//! ```

pub mod config;
pub mod report;
pub mod runner;

pub use config::{EntrySpec, FailStep, PublishStep, ScenarioConfig};
pub use report::{EntryReport, Sample, SimulationReport};
pub use runner::Simulator;

use netdata_simulation::SimulationError;
use netdata_types::ParseError;
use thiserror::Error;

/// Errors from loading or running a scenario.
#[derive(Debug, Error)]
pub enum SimulatorError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse scenario: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid entry: {0}")]
    Entry(#[from] ParseError),

    #[error("invalid scenario: {0}")]
    InvalidScenario(String),

    #[error(transparent)]
    Simulation(#[from] SimulationError),
}
