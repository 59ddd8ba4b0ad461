//! The shipped instrumentation point catalog.
//!
//! Each point here pairs one host method with one event type and exercises a different
//! slice of the patch machinery: [`GrenadeExplosion`] releases pooled resources on the
//! veto path and replaces a collection after the continue label, [`GatePrying`] moves
//! displaced branch labels and veto-skips to a tail label, and [`RadioDrain`] reads a
//! mutated payload back into the method's locals.

mod gate;
mod grenade;
mod radio;

pub use gate::GatePrying;
pub use grenade::{trim_targets, GrenadeExplosion};
pub use radio::RadioDrain;

use crate::patch::InstrumentationPoint;

/// The full shipped catalog, in load order.
#[must_use]
pub fn standard_points() -> Vec<Box<dyn InstrumentationPoint>> {
    vec![
        Box::new(GrenadeExplosion),
        Box::new(GatePrying),
        Box::new(RadioDrain),
    ]
}
