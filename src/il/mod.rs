//! Instruction model and stream editor for host method bodies.
//!
//! The host exposes each compiled method as an ordered instruction sequence. This module
//! reframes that sequence as editable data: tagged [`Instruction`] values with explicit
//! [`Label`] objects for branch targets, held in an [`InstructionStream`] that supports
//! index-based find, ranged insertion and removal, and explicit label transfer.
//!
//! # Key Types
//! - [`Instruction`] - one opcode tag, operand and attached labels
//! - [`Operand`] - the operand variants (immediates, member refs, branch targets)
//! - [`InstructionStream`] - the mutable, exclusively-owned sequence editor
//! - [`LabelMaker`] - allocator for fresh branch labels
//!
//! # Example
//! ```rust
//! use hookscope::il::{Instruction, InstructionStream, Opcode, Operand};
//!
//! let mut stream = InstructionStream::from_instructions(vec![
//!     Instruction::with_operand(Opcode::LdArg, Operand::Slot(0)),
//!     Instruction::new(Opcode::Ret),
//! ]);
//! let index = stream.find(|i| i.opcode == Opcode::Ret).unwrap();
//! stream.insert_range(index, vec![Instruction::new(Opcode::Nop)])?;
//! assert_eq!(stream.len(), 3);
//! # Ok::<(), hookscope::Error>(())
//! ```

mod instruction;
mod stream;

pub use instruction::{
    FieldRef, Instruction, Label, LabelMaker, MethodRef, Opcode, Operand, TypeRef,
};
pub use stream::InstructionStream;
