//! Network Data publisher.
//!
//! Lets every node of a mesh independently decide whether its own on-mesh
//! prefixes, external routes and DNS/SRP service entry should currently be
//! present in the shared Network Data, so that each equivalent entry ends up
//! published by roughly a desired number of nodes.
//!
//! # Architecture
//!
//! The publisher processes events synchronously:
//!
//! - client `publish_*` → admit the entry and evaluate it immediately
//! - `Event::NetworkDataChanged` → re-evaluate every entry (optionally after a
//!   short jittered delay)
//! - `Event::EvaluationTimer` → re-evaluate one entry
//!
//! Every evaluation re-arms the entry's timer. Timers are returned as
//! `Action`s for the runner to execute; the Network Data itself is reached
//! through a [`NetworkDataView`](netdata_core::NetworkDataView).

mod callbacks;
mod config;
mod entry;
mod error;
pub mod evaluator;
mod pool;
mod state;

pub use callbacks::{DnsSrpServiceCallback, PrefixCallback};
pub use config::PublisherConfig;
pub use entry::EntryState;
pub use error::PublisherError;
pub use evaluator::{count_duplicates, Evaluation};
pub use state::Publisher;
