//! Pure anchor-location logic: structural pattern search over an instruction stream.
//!
//! An instrumentation point is authored against a specific compiled shape of its target
//! method; the anchor pattern is the fingerprint of that shape. Locating is a plain
//! first-match scan plus a fixed signed offset (negative offsets anchor on an
//! instruction *preceding* the match). When the shape changed upstream and nothing
//! matches, location fails deterministically with [`crate::Error::AnchorNotFound`] -
//! reported at load time, fatal only to the one instrumentation point.

use std::fmt;

use crate::il::{FieldRef, InstructionStream, MethodRef, Opcode, Operand};
use crate::Result;

/// Predicate over an instruction's operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperandMatch {
    /// Any operand matches
    Any,
    /// Operand must equal the given value exactly
    Exact(Operand),
    /// Operand must be the given field reference
    Field(FieldRef),
    /// Operand must be the given method reference
    Method(MethodRef),
    /// Operand must be the given integer immediate
    Int(i32),
    /// Operand must be the given argument/local slot
    Slot(u16),
}

impl OperandMatch {
    fn matches(&self, operand: &Operand) -> bool {
        match self {
            OperandMatch::Any => true,
            OperandMatch::Exact(expected) => operand == expected,
            OperandMatch::Field(field) => matches!(operand, Operand::Field(f) if f == field),
            OperandMatch::Method(method) => matches!(operand, Operand::Method(m) if m == method),
            OperandMatch::Int(value) => matches!(operand, Operand::Int(v) if v == value),
            OperandMatch::Slot(slot) => matches!(operand, Operand::Slot(s) if s == slot),
        }
    }
}

impl fmt::Display for OperandMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperandMatch::Any => f.write_str("*"),
            OperandMatch::Exact(operand) => write!(f, "{operand}"),
            OperandMatch::Field(field) => write!(f, "{field}"),
            OperandMatch::Method(method) => write!(f, "{method}"),
            OperandMatch::Int(value) => write!(f, "{value}"),
            OperandMatch::Slot(slot) => write!(f, "slot {slot}"),
        }
    }
}

/// The structural pattern one instrumentation point anchors on: an opcode tag, an
/// operand predicate, and a fixed offset applied after the match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorPattern {
    opcode: Opcode,
    operand: OperandMatch,
    offset: isize,
}

impl AnchorPattern {
    /// Match on opcode alone.
    #[must_use]
    pub fn opcode(opcode: Opcode) -> Self {
        AnchorPattern {
            opcode,
            operand: OperandMatch::Any,
            offset: 0,
        }
    }

    /// Match on opcode plus operand predicate.
    #[must_use]
    pub fn new(opcode: Opcode, operand: OperandMatch) -> Self {
        AnchorPattern {
            opcode,
            operand,
            offset: 0,
        }
    }

    /// Match a field-loading instruction.
    #[must_use]
    pub fn field(opcode: Opcode, field: FieldRef) -> Self {
        Self::new(opcode, OperandMatch::Field(field))
    }

    /// Match a slot-addressed instruction.
    #[must_use]
    pub fn slot(opcode: Opcode, slot: u16) -> Self {
        Self::new(opcode, OperandMatch::Slot(slot))
    }

    /// Apply a fixed offset after the match; negative anchors on a preceding
    /// instruction.
    #[must_use]
    pub fn with_offset(mut self, offset: isize) -> Self {
        self.offset = offset;
        self
    }

    /// Locate the anchor in `stream`: the first instruction matching opcode and operand
    /// predicate, plus the offset.
    ///
    /// # Errors
    /// [`crate::Error::AnchorNotFound`] when nothing matches, or when the offset lands
    /// outside the stream. `method` only names the target in the error.
    pub fn locate(&self, stream: &InstructionStream, method: &str) -> Result<usize> {
        let not_found = || crate::Error::AnchorNotFound {
            method: method.to_string(),
            pattern: self.to_string(),
        };

        let matched = stream
            .find(|instruction| {
                instruction.opcode == self.opcode && self.operand.matches(&instruction.operand)
            })
            .ok_or_else(not_found)?;

        let anchored = matched
            .checked_add_signed(self.offset)
            .filter(|index| *index <= stream.len())
            .ok_or_else(not_found)?;

        Ok(anchored)
    }
}

impl fmt::Display for AnchorPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.opcode, self.operand)?;
        if self.offset != 0 {
            write!(f, " @ {:+}", self.offset)?;
        }
        Ok(())
    }
}
