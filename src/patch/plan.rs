//! The immutable description of edits to apply to one instruction stream.
//!
//! A [`PatchPlan`] is built once per instrumentation point at load time, applied once to
//! the pristine stream, and discarded. Application is deterministic: the same plan
//! applied to two fresh copies of the same stream produces identical results. The plan
//! owns the full label bookkeeping of the splice: labels transferred off the displaced
//! anchor instruction, labels introduced by the insertions, and the optional tail label
//! attached to the method's final instruction; the applied stream is validated before it
//! is returned.

use crate::il::{Instruction, InstructionStream, Label};
use crate::Result;

/// Immutable edit script for one stream: anchor, removal, insertions, label transfers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchPlan {
    anchor: usize,
    removed: usize,
    insertions: Vec<Instruction>,
    move_anchor_labels: bool,
    tail_label: Option<Label>,
}

impl PatchPlan {
    /// Create a plan that splices `insertions` in before the instruction at `anchor`.
    #[must_use]
    pub fn new(anchor: usize, insertions: Vec<Instruction>) -> Self {
        PatchPlan {
            anchor,
            removed: 0,
            insertions,
            move_anchor_labels: false,
            tail_label: None,
        }
    }

    /// Also remove `count` original instructions at the anchor before inserting.
    #[must_use]
    pub fn removing(mut self, count: usize) -> Self {
        self.removed = count;
        self
    }

    /// Transfer the labels of the displaced anchor instruction onto the first inserted
    /// instruction, so inbound branches keep landing at the splice point.
    #[must_use]
    pub fn moving_anchor_labels(mut self) -> Self {
        self.move_anchor_labels = true;
        self
    }

    /// Attach `label` to the final instruction of the patched stream - the target of a
    /// veto-skip branch that jumps over the rest of the method.
    #[must_use]
    pub fn with_tail_label(mut self, label: Label) -> Self {
        self.tail_label = Some(label);
        self
    }

    /// The anchor index this plan splices at.
    #[must_use]
    pub fn anchor(&self) -> usize {
        self.anchor
    }

    /// Number of instructions this plan inserts.
    #[must_use]
    pub fn insertion_len(&self) -> usize {
        self.insertions.len()
    }

    /// Apply the plan to an exclusively owned, pristine stream, yielding the validated
    /// patched stream.
    ///
    /// # Errors
    /// - [`crate::Error::OutOfBounds`] when the anchor or removal range does not fit
    ///   the stream
    /// - [`crate::Error::LabelResolution`] when the result would carry a dangling or
    ///   ambiguous label - the stream must be discarded, never installed
    pub fn apply(&self, mut stream: InstructionStream) -> Result<InstructionStream> {
        if self.removed > 0 {
            let removed = stream.remove_range(self.anchor, self.removed)?;
            // Labels on removed instructions are dropped here; if a branch still
            // references one, validation below refuses the stream.
            drop(removed);
        }

        let mut insertions = self.insertions.clone();
        if self.move_anchor_labels {
            let displaced = stream.take_labels(self.anchor)?;
            let first = insertions
                .first_mut()
                .ok_or_else(|| label_error!("label transfer requires at least one insertion"))?;
            first.labels.splice(0..0, displaced);
        }

        stream.insert_range(self.anchor, insertions)?;

        if let Some(tail) = self.tail_label {
            if stream.is_empty() {
                return Err(label_error!("tail label {tail} on an empty stream"));
            }
            stream.attach_labels(stream.len() - 1, [tail])?;
        }

        stream.validate()?;
        Ok(stream)
    }
}
