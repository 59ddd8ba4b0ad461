//! Instrumentation of the grenade detonation method.
//!
//! The target method computes the detonation position, rents two scratch sets from the
//! shared pool (detected hubs and already-hit hubs), gathers the affected colliders and
//! stores them in a local, then applies damage and returns both sets. The splice goes in
//! right after the collider store: construct [`GrenadeExplodingEvent`] from the grenade,
//! position and collider list, dispatch, and check the flag. On deny, both pre-acquired
//! sets go back to the pool before the early return - leaving them rented would leak
//! them on every vetoed detonation. On allow, the collider local is replaced with the
//! list trimmed down to the targets subscribers left in the event payload.
//!
//! [`GrenadeExplodingEvent`]: crate::events::GrenadeExplodingEvent

use crate::il::{FieldRef, InstructionStream, LabelMaker, MethodRef, Opcode};
use crate::patch::{AnchorPattern, CallSiteBuilder, InstrumentationPoint, PatchPlan};
use crate::Result;

/// Keep only the colliders whose serial survived in the event's target list,
/// preserving collider order.
#[must_use]
pub fn trim_targets(allowed: &[u16], colliders: &[u16]) -> Vec<u16> {
    colliders
        .iter()
        .copied()
        .filter(|serial| allowed.contains(serial))
        .collect()
}

/// Patches the detonation method of explosive grenade projectiles.
#[derive(Debug, Default)]
pub struct GrenadeExplosion;

impl GrenadeExplosion {
    /// Local slot holding the detonation position.
    pub const POSITION_SLOT: u16 = 1;
    /// Local slot of the first pooled scratch set (detected hubs).
    pub const DETECTED_SLOT: u16 = 2;
    /// Local slot of the second pooled scratch set (already-hit hubs).
    pub const HIT_SLOT: u16 = 3;
    /// Local slot the affected collider list is stored into; the anchor follows it.
    pub const COLLIDERS_SLOT: u16 = 5;
    /// Local slot the injected code parks the event in for the flag check and read-back.
    pub const EVENT_SLOT: u16 = 6;

    const SCRATCH_POOL: &'static str = "HashSetPool::Shared";
    const SCRATCH_PUT: &'static str = "HashSetPool::put";
}

impl InstrumentationPoint for GrenadeExplosion {
    fn name(&self) -> &str {
        "grenade-explosion"
    }

    fn target(&self) -> &str {
        "ExplosionGrenade::Explode"
    }

    fn anchor(&self) -> AnchorPattern {
        AnchorPattern::slot(Opcode::StLoc, Self::COLLIDERS_SLOT).with_offset(1)
    }

    fn build_plan(
        &self,
        _stream: &InstructionStream,
        anchor: usize,
        labels: &mut LabelMaker,
    ) -> Result<PatchPlan> {
        let site = CallSiteBuilder::new(labels);
        let resume = site.continue_label();

        let instructions = site
            .ld_arg(0)
            .ld_loc(Self::POSITION_SLOT)
            .ld_loc(Self::COLLIDERS_SLOT)
            .new_obj(MethodRef::new("GrenadeExplodingEvent::new"))
            .dup()
            .st_loc(Self::EVENT_SLOT)
            .call(MethodRef::new("Handlers::on_grenade_exploding"))
            .ld_loc(Self::EVENT_SLOT)
            .call_virt(MethodRef::new("GrenadeExplodingEvent::is_allowed"))
            .br_true(resume)
            .release_pooled(
                FieldRef::new(Self::SCRATCH_POOL),
                Self::DETECTED_SLOT,
                MethodRef::new(Self::SCRATCH_PUT),
            )
            .release_pooled(
                FieldRef::new(Self::SCRATCH_POOL),
                Self::HIT_SLOT,
                MethodRef::new(Self::SCRATCH_PUT),
            )
            .ret()
            .mark_continue()
            .ld_loc(Self::EVENT_SLOT)
            .ld_loc(Self::COLLIDERS_SLOT)
            .call(MethodRef::new("GrenadeExplosion::trim_targets"))
            .st_loc(Self::COLLIDERS_SLOT)
            .build()?;

        Ok(PatchPlan::new(anchor, instructions))
    }
}
