//! Core traits for state machines.

use crate::{Action, Event};
use std::time::Duration;

/// A state machine that processes events.
///
/// All publisher logic is implemented as state machines that are:
///
/// - **Synchronous**: No async, no `.await`
/// - **Deterministic**: Same state + event + seed = same actions
/// - **Pure-ish**: Mutates self; the only outside effects go through the
///   [`NetworkDataView`](crate::NetworkDataView) the machine owns
///
/// # Example
///
/// ```ignore
/// impl<V: NetworkDataView> StateMachine for Publisher<V> {
///     fn handle(&mut self, event: Event) -> Vec<Action> {
///         match event {
///             Event::NetworkDataChanged => self.on_network_data_changed(),
///             Event::EvaluationTimer { key } => self.on_evaluation_timer(key),
///         }
///     }
///
///     fn set_time(&mut self, now: Duration) {
///         self.now = now;
///     }
/// }
/// ```
pub trait StateMachine {
    /// Process an event, returning actions to perform.
    ///
    /// # Guarantees
    ///
    /// - **Synchronous**: This method never blocks or awaits
    /// - **Deterministic**: Given the same state and event, always returns the same actions
    /// - **Run to completion**: No other event is processed until this returns
    ///
    /// # Returns
    ///
    /// A list of actions for the runner to execute, currently timer
    /// management only.
    fn handle(&mut self, event: Event) -> Vec<Action>;

    /// Set the current time.
    ///
    /// Called by the runner before each `handle()` call and before any
    /// client operation, to provide the current simulation or wall-clock time.
    fn set_time(&mut self, now: Duration);

    /// Get the current time.
    ///
    /// Returns the time that was last set via `set_time()`.
    fn now(&self) -> Duration;
}
