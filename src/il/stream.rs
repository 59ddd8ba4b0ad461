//! Ordered, mutable instruction sequence with label-safe structural edits.
//!
//! An [`InstructionStream`] is the editable form of one method body. It is owned
//! exclusively by a single in-progress patch operation - nothing here is shared or
//! internally synchronized. Edits are index-based; inserting or removing instructions
//! shifts everything after the edit point, which is safe because branches are expressed
//! through labels rather than offsets.
//!
//! The one invariant the editor cannot maintain by itself is label attachment: removing
//! or displacing an instruction that carries labels orphans every branch that targets
//! them. Callers (the patch script engine) must explicitly transfer such labels with
//! [`InstructionStream::take_labels`] before the stream is considered valid, and
//! [`InstructionStream::validate`] refuses any stream where a referenced label is not
//! attached to exactly one instruction.

use std::collections::HashMap;
use std::fmt;
use std::ops::Index;

use crate::il::{Instruction, Label};
use crate::Result;

/// An ordered sequence of [`Instruction`] values, owned by one patch operation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InstructionStream {
    instructions: Vec<Instruction>,
}

impl InstructionStream {
    /// Create an empty stream.
    #[must_use]
    pub fn new() -> Self {
        InstructionStream {
            instructions: Vec::new(),
        }
    }

    /// Create a stream from existing instructions, e.g. a host method body.
    #[must_use]
    pub fn from_instructions(instructions: Vec<Instruction>) -> Self {
        InstructionStream { instructions }
    }

    /// Number of instructions in the stream.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Whether the stream contains no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Borrow the instruction at `index`, if in bounds.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    /// Iterate over the instructions in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Instruction> {
        self.instructions.iter()
    }

    /// Index of the first instruction satisfying `predicate`.
    pub fn find(&self, predicate: impl FnMut(&Instruction) -> bool) -> Option<usize> {
        self.instructions.iter().position(predicate)
    }

    /// Index of the first instruction at or after `start` satisfying `predicate`.
    pub fn find_from(
        &self,
        start: usize,
        mut predicate: impl FnMut(&Instruction) -> bool,
    ) -> Option<usize> {
        self.instructions
            .iter()
            .skip(start)
            .position(&mut predicate)
            .map(|relative| start + relative)
    }

    /// Insert `instructions` before the instruction currently at `index`.
    ///
    /// `index == len()` appends. Everything at and after `index` shifts right.
    ///
    /// # Errors
    /// [`crate::Error::OutOfBounds`] when `index` is past the end of the stream.
    pub fn insert_range(
        &mut self,
        index: usize,
        instructions: impl IntoIterator<Item = Instruction>,
    ) -> Result<()> {
        if index > self.instructions.len() {
            return Err(crate::Error::OutOfBounds);
        }
        self.instructions.splice(index..index, instructions);
        Ok(())
    }

    /// Remove `count` instructions starting at `index`, returning them.
    ///
    /// Removed instructions keep their attached labels; if any of those labels is still
    /// referenced by a branch, the caller must reattach it before validation.
    ///
    /// # Errors
    /// [`crate::Error::OutOfBounds`] when the range extends past the end of the stream.
    pub fn remove_range(&mut self, index: usize, count: usize) -> Result<Vec<Instruction>> {
        let end = index
            .checked_add(count)
            .ok_or(crate::Error::OutOfBounds)?;
        if end > self.instructions.len() {
            return Err(crate::Error::OutOfBounds);
        }
        Ok(self.instructions.drain(index..end).collect())
    }

    /// Detach and return all labels from the instruction at `index`.
    ///
    /// This is the displacement half of inserting *before* a branch target: the labels
    /// come off the original instruction so the caller can attach them to the first
    /// inserted instruction, keeping inbound branches pointing at the splice point.
    ///
    /// # Errors
    /// [`crate::Error::OutOfBounds`] when `index` is past the end of the stream.
    pub fn take_labels(&mut self, index: usize) -> Result<Vec<Label>> {
        let instruction = self
            .instructions
            .get_mut(index)
            .ok_or(crate::Error::OutOfBounds)?;
        Ok(std::mem::take(&mut instruction.labels))
    }

    /// Attach `labels` to the instruction at `index`.
    ///
    /// # Errors
    /// [`crate::Error::OutOfBounds`] when `index` is past the end of the stream.
    pub fn attach_labels(
        &mut self,
        index: usize,
        labels: impl IntoIterator<Item = Label>,
    ) -> Result<()> {
        let instruction = self
            .instructions
            .get_mut(index)
            .ok_or(crate::Error::OutOfBounds)?;
        instruction.labels.extend(labels);
        Ok(())
    }

    /// Largest label id present in the stream, attached or referenced.
    ///
    /// Used to seed a [`crate::il::LabelMaker`] so introduced labels never collide with
    /// original ones.
    #[must_use]
    pub fn max_label(&self) -> Option<Label> {
        self.instructions
            .iter()
            .flat_map(|instruction| {
                instruction
                    .labels
                    .iter()
                    .chain(instruction.branch_targets())
            })
            .max()
            .copied()
    }

    /// A [`crate::il::LabelMaker`] seeded past every label in this stream.
    #[must_use]
    pub fn label_maker(&self) -> crate::il::LabelMaker {
        crate::il::LabelMaker::starting_at(self.max_label().map_or(0, |label| label.0 + 1))
    }

    /// Check that every label referenced by a branch resolves to exactly one instruction.
    ///
    /// A stream that fails validation must never be installed into the host: a dangling
    /// label is a branch to nowhere, a doubly-attached label an ambiguous target. Both
    /// are authoring bugs in the patch script that produced the stream.
    ///
    /// # Errors
    /// [`crate::Error::LabelResolution`] describing the offending label.
    pub fn validate(&self) -> Result<()> {
        let mut attachments: HashMap<Label, usize> = HashMap::new();
        for instruction in &self.instructions {
            for label in &instruction.labels {
                *attachments.entry(*label).or_insert(0) += 1;
            }
        }

        for (index, instruction) in self.instructions.iter().enumerate() {
            for target in instruction.branch_targets() {
                match attachments.get(target) {
                    None | Some(0) => {
                        return Err(label_error!(
                            "branch at index {index} targets dangling label {target}"
                        ));
                    }
                    Some(1) => {}
                    Some(count) => {
                        return Err(label_error!(
                            "branch at index {index} targets label {target} attached to {count} instructions"
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// Consume the stream, returning the underlying instructions.
    #[must_use]
    pub fn into_instructions(self) -> Vec<Instruction> {
        self.instructions
    }
}

impl Index<usize> for InstructionStream {
    type Output = Instruction;

    fn index(&self, index: usize) -> &Instruction {
        &self.instructions[index]
    }
}

impl<'a> IntoIterator for &'a InstructionStream {
    type Item = &'a Instruction;
    type IntoIter = std::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.iter()
    }
}

impl FromIterator<Instruction> for InstructionStream {
    fn from_iter<T: IntoIterator<Item = Instruction>>(iter: T) -> Self {
        InstructionStream {
            instructions: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for InstructionStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, instruction) in self.instructions.iter().enumerate() {
            writeln!(f, "{index:4}: {instruction}")?;
        }
        Ok(())
    }
}
