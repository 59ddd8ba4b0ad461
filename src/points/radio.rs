//! Instrumentation of the radio battery-drain tick.
//!
//! The target method computes this tick's drain into a local and then applies it. The
//! splice sits between the two: the event carries the computed drain as a mutable
//! payload, and after the continue label the local is overwritten with whatever value
//! subscribers left in the event - so a subscriber can halve the drain, zero it, or
//! leave it alone. Denial skips the tick entirely.

use crate::il::{InstructionStream, LabelMaker, MethodRef, Opcode};
use crate::patch::{AnchorPattern, CallSiteBuilder, InstrumentationPoint, PatchPlan};
use crate::Result;

/// Patches the per-tick battery drain of transmitting radios.
#[derive(Debug, Default)]
pub struct RadioDrain;

impl RadioDrain {
    /// Local slot the computed drain is stored into; the anchor follows it.
    pub const DRAIN_SLOT: u16 = 1;
    /// Local slot the injected code parks the event in.
    pub const EVENT_SLOT: u16 = 2;
}

impl InstrumentationPoint for RadioDrain {
    fn name(&self) -> &str {
        "radio-drain"
    }

    fn target(&self) -> &str {
        "RadioItem::Update"
    }

    fn anchor(&self) -> AnchorPattern {
        AnchorPattern::slot(Opcode::StLoc, Self::DRAIN_SLOT).with_offset(1)
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
            .ld_loc(Self::DRAIN_SLOT)
            .new_obj(MethodRef::new("RadioDrainEvent::new"))
            .dup()
            .st_loc(Self::EVENT_SLOT)
            .call(MethodRef::new("Handlers::on_radio_drain"))
            .ld_loc(Self::EVENT_SLOT)
            .call_virt(MethodRef::new("RadioDrainEvent::is_allowed"))
            .br_true(resume)
            .ret()
            .mark_continue()
            .ld_loc(Self::EVENT_SLOT)
            .call_virt(MethodRef::new("RadioDrainEvent::drain"))
            .st_loc(Self::DRAIN_SLOT)
            .build()?;

        Ok(PatchPlan::new(anchor, instructions))
    }
}
