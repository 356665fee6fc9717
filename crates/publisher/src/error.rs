//! Errors returned to publisher clients.

use netdata_types::ConfigError;
use thiserror::Error;

/// Errors from publish/unpublish requests.
///
/// These are returned synchronously and never retried by the publisher.
/// Failures of the underlying Network Data are not errors at this level;
/// they are retried internally and only show up as delayed callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PublisherError {
    /// The entry failed validation (bad prefix, contradictory flags, not stable).
    #[error("invalid arguments: {0}")]
    InvalidArgs(#[from] ConfigError),

    /// An entry with the same prefix is already being published.
    #[error("an entry with the same prefix is already published")]
    Already,

    /// No published entry matches the request.
    #[error("entry not found")]
    NotFound,

    /// All prefix entry slots are in use.
    #[error("no free prefix entry slot")]
    NoBufs,
}
