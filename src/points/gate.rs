//! Instrumentation of the gate-prying interaction.
//!
//! The target method reads the door's `TargetState` field a couple of instructions into
//! the state-toggle block; the anchor backs up two instructions from that read to land
//! on the block's entry, which is also a branch target - the original null check jumps
//! straight to it. The displaced labels move onto the injected sequence so that branch
//! now runs through the event first. Denial branches to a tail label attached to the
//! method's final instruction, skipping the toggle entirely; there is nothing to clean
//! up on this path and no payload to read back.

use crate::il::{FieldRef, InstructionStream, LabelMaker, MethodRef, Opcode};
use crate::patch::{AnchorPattern, CallSiteBuilder, InstrumentationPoint, PatchPlan};
use crate::Result;

/// Patches the pry-gate interaction on pryable doors.
#[derive(Debug, Default)]
pub struct GatePrying;

impl InstrumentationPoint for GatePrying {
    fn name(&self) -> &str {
        "gate-prying"
    }

    fn target(&self) -> &str {
        "PryableDoor::TryPryGate"
    }

    fn anchor(&self) -> AnchorPattern {
        AnchorPattern::field(Opcode::LdFld, FieldRef::new("DoorVariant::TargetState"))
            .with_offset(-2)
    }

    fn build_plan(
        &self,
        _stream: &InstructionStream,
        anchor: usize,
        labels: &mut LabelMaker,
    ) -> Result<PatchPlan> {
        let tail = labels.define();
        let instructions = CallSiteBuilder::new(labels)
            .ld_arg(1)
            .ld_arg(0)
            .new_obj(MethodRef::new("GatePryingEvent::new"))
            .dup()
            .call(MethodRef::new("Handlers::on_gate_prying"))
            .call_virt(MethodRef::new("GatePryingEvent::is_allowed"))
            .br_false(tail)
            .build()?;

        Ok(PatchPlan::new(anchor, instructions)
            .moving_anchor_labels()
            .with_tail_label(tail))
    }
}
