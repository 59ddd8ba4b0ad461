//! Concrete event types carried across the instrumentation boundary.
//!
//! Each event is constructed once per triggering occurrence, from host-side arguments in
//! a fixed order matching exactly one constructor signature, then dispatched, read by
//! subscribers, read once more by the injected continuation check, and discarded.
//! Payload fields marked "mutable" may be altered by subscribers before the flag is
//! checked; the patched method reads the mutated value back after the continue label.

use crate::events::{CancellableEvent, Verdict};
use crate::wrappers::WrapperRc;

/// A grenade projectile is about to apply its explosion to nearby targets.
///
/// Constructed from `(grenade wrapper, position, affected targets)`. The target list is
/// a mutable payload: subscribers may remove entries, and the patched method replaces
/// its own collider collection with a trimmed one derived from this list.
#[derive(Debug)]
pub struct GrenadeExplodingEvent {
    /// The exploding grenade
    pub grenade: WrapperRc,
    /// World position of the detonation
    pub position: [f32; 3],
    /// Serials of the targets the explosion will affect; mutable payload
    pub targets: Vec<u16>,
    verdict: Verdict,
}

impl GrenadeExplodingEvent {
    /// Construct from the host-side argument list of the explosion method.
    #[must_use]
    pub fn new(grenade: WrapperRc, position: [f32; 3], targets: Vec<u16>) -> Self {
        GrenadeExplodingEvent {
            grenade,
            position,
            targets,
            verdict: Verdict::allow(),
        }
    }
}

impl CancellableEvent for GrenadeExplodingEvent {
    fn is_allowed(&self) -> bool {
        self.verdict.is_allowed()
    }

    fn set_allowed(&mut self, allowed: bool) {
        self.verdict.set_allowed(allowed);
    }

    fn deny_with(&mut self, reason: String) {
        self.verdict.deny_with(reason);
    }

    fn denial_reason(&self) -> Option<&str> {
        self.verdict.reason()
    }
}

/// An actor is about to start prying open a gate.
///
/// Constructed from `(actor serial, door id)`; no mutable payload, purely vetoable.
#[derive(Debug)]
pub struct GatePryingEvent {
    /// Serial of the actor prying the gate
    pub actor: u16,
    /// Host id of the gate being pried
    pub door: u64,
    verdict: Verdict,
}

impl GatePryingEvent {
    /// Construct from the host-side argument list of the pry-gate method.
    #[must_use]
    pub fn new(actor: u16, door: u64) -> Self {
        GatePryingEvent {
            actor,
            door,
            verdict: Verdict::allow(),
        }
    }
}

impl CancellableEvent for GatePryingEvent {
    fn is_allowed(&self) -> bool {
        self.verdict.is_allowed()
    }

    fn set_allowed(&mut self, allowed: bool) {
        self.verdict.set_allowed(allowed);
    }

    fn deny_with(&mut self, reason: String) {
        self.verdict.deny_with(reason);
    }

    fn denial_reason(&self) -> Option<&str> {
        self.verdict.reason()
    }
}

/// A radio is about to drain battery charge.
///
/// `drain` is a mutable payload: the patched method uses the post-dispatch value in
/// place of the host's original per-tick drain.
#[derive(Debug)]
pub struct RadioDrainEvent {
    /// The radio whose battery is draining
    pub radio: WrapperRc,
    /// Battery drain for this tick, in charge units; mutable payload
    pub drain: i32,
    verdict: Verdict,
}

impl RadioDrainEvent {
    /// Construct from the host-side argument list of the battery-update method.
    #[must_use]
    pub fn new(radio: WrapperRc, drain: i32) -> Self {
        RadioDrainEvent {
            radio,
            drain,
            verdict: Verdict::allow(),
        }
    }
}

impl CancellableEvent for RadioDrainEvent {
    fn is_allowed(&self) -> bool {
        self.verdict.is_allowed()
    }

    fn set_allowed(&mut self, allowed: bool) {
        self.verdict.set_allowed(allowed);
    }

    fn deny_with(&mut self, reason: String) {
        self.verdict.deny_with(reason);
    }

    fn denial_reason(&self) -> Option<&str> {
        self.verdict.reason()
    }
}
