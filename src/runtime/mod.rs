//! The explicitly owned runtime context and the stream evaluator.
//!
//! A [`Runtime`] bundles everything the injected call sites reach back into: the wrapper
//! identity cache, one [`EventHandler`] per event type, and the shared scratch pools
//! instrumented methods rent collections from. It is constructed and owned by the
//! embedding extension - there is no ambient global state - so two runtimes in one
//! process (or one per test) never interfere.
//!
//! # Key Types
//! - [`Runtime`] - wrapper cache + event registry + scratch pools
//! - [`Evaluator`] / [`HostCalls`] - executes patched streams against a symbol binding
//! - [`Value`] / [`Frame`] - the evaluation state those bindings manipulate

use std::collections::HashSet;

use crate::events::{EventHandler, GatePryingEvent, GrenadeExplodingEvent, RadioDrainEvent};
use crate::host::Pool;
use crate::wrappers::WrapperCache;

mod eval;

pub use eval::{Evaluator, Frame, HostCalls, Value};

/// The context injected call sites dispatch through.
///
/// Field access is direct: the runtime is a plain bundle of independently synchronized
/// parts, and wrapping each in an accessor would add nothing.
#[derive(Debug, Default)]
pub struct Runtime {
    /// Identity cache handing out the one wrapper per live host object
    pub wrappers: WrapperCache,
    /// Subscribers to grenade detonations
    pub grenade_exploding: EventHandler<GrenadeExplodingEvent>,
    /// Subscribers to gate-prying attempts
    pub gate_prying: EventHandler<GatePryingEvent>,
    /// Subscribers to radio battery drain ticks
    pub radio_drain: EventHandler<RadioDrainEvent>,
    /// Shared pool of scratch sets rented by instrumented methods
    pub scratch_sets: Pool<HashSet<u16>>,
}

impl Runtime {
    /// Create a runtime with the standard wrapper shapes and empty registries.
    #[must_use]
    pub fn new() -> Self {
        Runtime::default()
    }
}
