//! Core types for the Network Data publisher.
//!
//! The publisher is a synchronous state machine: the runner feeds it
//! [`Event`]s and client calls, and executes the [`Action`]s it returns.
//! The Network Data itself sits behind the [`NetworkDataView`] trait.

mod action;
mod event;
mod traits;
mod view;

pub use action::{Action, TimerId};
pub use event::Event;
pub use traits::StateMachine;
pub use view::{NetworkDataError, NetworkDataView};
