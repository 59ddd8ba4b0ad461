//! Cancellable events and the ordered-subscriber dispatch contract.
//!
//! External observers register interest in a named event type and receive the event
//! object itself - they may read it, mutate its payload, and flip its allow/deny flag.
//! See [`EventHandler`] for the notification rule and [`CancellableEvent`] for the
//! uniform event shape.

mod args;
mod dispatch;

pub use args::{GatePryingEvent, GrenadeExplodingEvent, RadioDrainEvent};
pub use dispatch::{CancellableEvent, EventHandler, Verdict};
