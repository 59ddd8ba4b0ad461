//! Fluent builder for the standard injected call-site sequence.
//!
//! Every instrumentation point injects a variation of the same shape: load the host-side
//! arguments, construct the event object, duplicate the reference so it can be both
//! dispatched and inspected later, invoke the dispatcher, read back the allow flag, and
//! branch to the continue label when allowed - otherwise run an early-return sequence
//! that first returns any pooled scratch resources the original method had already
//! rented before the anchor. After the continue label, a point may replace a value the
//! original logic was about to use with one derived from the event's mutated payload.
//!
//! [`CallSiteBuilder`] assembles that sequence instruction by instruction. Labels marked
//! with [`CallSiteBuilder::mark_continue`] (or [`CallSiteBuilder::mark`]) attach to the
//! *next* emitted instruction; a mark left pending at [`CallSiteBuilder::build`] time
//! would dangle and is refused.

use crate::il::{FieldRef, Instruction, Label, LabelMaker, MethodRef, Opcode, Operand};
use crate::Result;

/// Builder for one injected instruction sequence.
///
/// # Examples
///
/// The veto-skip shape (construct, dispatch, branch over the rest of the method when
/// denied):
///
/// ```rust
/// use hookscope::il::{LabelMaker, MethodRef};
/// use hookscope::patch::CallSiteBuilder;
///
/// let mut labels = LabelMaker::new();
/// let site = CallSiteBuilder::new(&mut labels);
/// let skip = site.continue_label();
///
/// let instructions = site
///     .ld_arg(0)
///     .new_obj(MethodRef::new("GatePryingEvent::new"))
///     .dup()
///     .call(MethodRef::new("Handlers::on_gate_prying"))
///     .call_virt(MethodRef::new("GatePryingEvent::is_allowed"))
///     .br_false(skip)
///     .build()?;
/// assert_eq!(instructions.len(), 6);
/// # Ok::<(), hookscope::Error>(())
/// ```
#[derive(Debug)]
pub struct CallSiteBuilder {
    instructions: Vec<Instruction>,
    pending_labels: Vec<Label>,
    continue_label: Label,
}

impl CallSiteBuilder {
    /// Create a builder, allocating its continue label from `labels`.
    #[must_use]
    pub fn new(labels: &mut LabelMaker) -> Self {
        CallSiteBuilder {
            instructions: Vec::new(),
            pending_labels: Vec::new(),
            continue_label: labels.define(),
        }
    }

    /// The label marking "continue original logic"; branch here when allowed.
    #[must_use]
    pub fn continue_label(&self) -> Label {
        self.continue_label
    }

    fn emit(mut self, opcode: Opcode, operand: Operand) -> Self {
        let mut instruction = Instruction::with_operand(opcode, operand);
        instruction.labels = std::mem::take(&mut self.pending_labels);
        self.instructions.push(instruction);
        self
    }

    /// Attach `label` to the next emitted instruction.
    #[must_use]
    pub fn mark(mut self, label: Label) -> Self {
        self.pending_labels.push(label);
        self
    }

    /// Attach the continue label to the next emitted instruction.
    #[must_use]
    pub fn mark_continue(self) -> Self {
        let label = self.continue_label;
        self.mark(label)
    }

    /// Load argument slot `slot`.
    #[must_use]
    pub fn ld_arg(self, slot: u16) -> Self {
        self.emit(Opcode::LdArg, Operand::Slot(slot))
    }

    /// Load local slot `slot`.
    #[must_use]
    pub fn ld_loc(self, slot: u16) -> Self {
        self.emit(Opcode::LdLoc, Operand::Slot(slot))
    }

    /// Store into local slot `slot`.
    #[must_use]
    pub fn st_loc(self, slot: u16) -> Self {
        self.emit(Opcode::StLoc, Operand::Slot(slot))
    }

    /// Load an instance field of the value on top of the stack.
    #[must_use]
    pub fn ld_fld(self, field: FieldRef) -> Self {
        self.emit(Opcode::LdFld, Operand::Field(field))
    }

    /// Load a static field, e.g. a shared pool.
    #[must_use]
    pub fn ld_sfld(self, field: FieldRef) -> Self {
        self.emit(Opcode::LdSFld, Operand::Field(field))
    }

    /// Load an integer constant.
    #[must_use]
    pub fn ldc_i4(self, value: i32) -> Self {
        self.emit(Opcode::LdcI4, Operand::Int(value))
    }

    /// Duplicate the top stack value.
    #[must_use]
    pub fn dup(self) -> Self {
        self.emit(Opcode::Dup, Operand::None)
    }

    /// Construct an event object through `ctor`, consuming the loaded arguments.
    #[must_use]
    pub fn new_obj(self, ctor: MethodRef) -> Self {
        self.emit(Opcode::NewObj, Operand::Method(ctor))
    }

    /// Call a static method, e.g. the dispatcher or a pure helper.
    #[must_use]
    pub fn call(self, method: MethodRef) -> Self {
        self.emit(Opcode::Call, Operand::Method(method))
    }

    /// Call a virtual method or property accessor on the top stack value.
    #[must_use]
    pub fn call_virt(self, method: MethodRef) -> Self {
        self.emit(Opcode::CallVirt, Operand::Method(method))
    }

    /// Branch to `target` when the popped value is non-zero.
    #[must_use]
    pub fn br_true(self, target: Label) -> Self {
        self.emit(Opcode::BrTrue, Operand::Target(target))
    }

    /// Branch to `target` when the popped value is zero.
    #[must_use]
    pub fn br_false(self, target: Label) -> Self {
        self.emit(Opcode::BrFalse, Operand::Target(target))
    }

    /// Return from the method.
    #[must_use]
    pub fn ret(self) -> Self {
        self.emit(Opcode::Ret, Operand::None)
    }

    /// Return a pooled scratch collection the original method rented before the anchor:
    /// load the shared pool, load the rented collection from `slot`, call `put`.
    ///
    /// Which rentals need this is part of each instrumentation point's own contract
    /// with its target method, not a generic rule.
    #[must_use]
    pub fn release_pooled(self, pool: FieldRef, slot: u16, put: MethodRef) -> Self {
        self.ld_sfld(pool).ld_loc(slot).call_virt(put)
    }

    /// Finish the sequence.
    ///
    /// # Errors
    /// [`crate::Error::LabelResolution`] when a marked label was never attached to an
    /// instruction - it would dangle in the patched stream.
    pub fn build(self) -> Result<Vec<Instruction>> {
        if let Some(pending) = self.pending_labels.first() {
            return Err(label_error!(
                "label {pending} marked but no instruction follows it"
            ));
        }
        Ok(self.instructions)
    }
}
