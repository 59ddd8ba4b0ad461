//! Value-typed model of a single host instruction.
//!
//! An [`Instruction`] is an opcode tag plus an operand variant, together with the set of
//! branch labels currently attached to it. Labels are opaque ids: a branch instruction
//! carries the label in its operand, and the label is *attached* to exactly one other
//! instruction in the same stream. Member references ([`FieldRef`], [`MethodRef`],
//! [`TypeRef`]) are interned symbolic names resolved by the host at run time; the patch
//! layer treats them as opaque tokens.

use std::fmt;
use std::sync::Arc;

use strum::Display;

/// An opaque branch-target id, attached to exactly one instruction per stream.
///
/// Labels are allocated through a [`LabelMaker`] and have no meaning outside the stream
/// they were created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub(crate) u32);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Allocator for fresh [`Label`] ids, the analogue of the host's label generator.
///
/// A maker is seeded past any label already present in the stream being patched so that
/// introduced labels can never collide with original ones.
#[derive(Debug, Default)]
pub struct LabelMaker {
    next: u32,
}

impl LabelMaker {
    /// Create a maker that starts allocating at id 0.
    #[must_use]
    pub fn new() -> Self {
        LabelMaker { next: 0 }
    }

    /// Create a maker whose first allocation is `first`.
    #[must_use]
    pub fn starting_at(first: u32) -> Self {
        LabelMaker { next: first }
    }

    /// Allocate a fresh, unused label.
    pub fn define(&mut self) -> Label {
        let label = Label(self.next);
        self.next += 1;
        label
    }
}

macro_rules! symbol_ref {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(Arc<str>);

        impl $name {
            /// Create a reference from its symbolic name.
            pub fn new(name: impl AsRef<str>) -> Self {
                $name(Arc::from(name.as_ref()))
            }

            /// The symbolic name this reference resolves through.
            #[must_use]
            pub fn name(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

symbol_ref! {
    /// Symbolic reference to a host field, e.g. `"DoorVariant::TargetState"`.
    FieldRef
}

symbol_ref! {
    /// Symbolic reference to a host method, constructor or property accessor.
    MethodRef
}

symbol_ref! {
    /// Symbolic reference to a host type.
    TypeRef
}

/// Opcode tags for the instruction shapes the host compiler produces in the methods this
/// library targets.
///
/// This is deliberately not a complete instruction set; anchors and patch scripts only
/// ever deal with these shapes, and the evaluator rejects anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Opcode {
    /// No operation
    Nop,
    /// Duplicate the top stack value
    Dup,
    /// Discard the top stack value
    Pop,
    /// Load an argument slot
    LdArg,
    /// Load a local slot
    LdLoc,
    /// Store into a local slot
    StLoc,
    /// Load an instance field of the top stack value
    LdFld,
    /// Load a static field
    LdSFld,
    /// Load an integer constant
    LdcI4,
    /// Call a static method
    Call,
    /// Call a virtual method or property accessor on the top stack value
    CallVirt,
    /// Construct an object, pushing the new reference
    NewObj,
    /// Unconditional branch
    Br,
    /// Branch when the popped value is non-zero
    BrTrue,
    /// Branch when the popped value is zero
    BrFalse,
    /// Multi-way branch on the popped value
    Switch,
    /// Return from the method
    Ret,
}

/// The operand variants an instruction can carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// No operand
    None,
    /// Integer immediate
    Int(i32),
    /// Argument or local slot index
    Slot(u16),
    /// Field reference
    Field(FieldRef),
    /// Method, constructor or accessor reference
    Method(MethodRef),
    /// Type reference
    Type(TypeRef),
    /// Single branch target
    Target(Label),
    /// Branch target table (switch)
    Targets(Box<[Label]>),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::None => Ok(()),
            Operand::Int(value) => write!(f, "{value}"),
            Operand::Slot(slot) => write!(f, "slot {slot}"),
            Operand::Field(field) => write!(f, "{field}"),
            Operand::Method(method) => write!(f, "{method}"),
            Operand::Type(ty) => write!(f, "{ty}"),
            Operand::Target(label) => write!(f, "{label}"),
            Operand::Targets(labels) => {
                let rendered: Vec<String> = labels.iter().map(Label::to_string).collect();
                write!(f, "[{}]", rendered.join(", "))
            }
        }
    }
}

/// One instruction: an opcode tag, its operand, and the labels attached to it as branch
/// targets.
///
/// Instructions are plain values; cloning one clones its attached labels, which matters
/// when building a [`crate::patch::PatchPlan`] - a label must end up attached to exactly
/// one instruction of the final stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// The opcode tag
    pub opcode: Opcode,
    /// The operand carried by this instruction
    pub operand: Operand,
    /// Labels attached to this instruction; branches elsewhere in the stream resolve here
    pub labels: Vec<Label>,
}

impl Instruction {
    /// Create an instruction with no operand.
    #[must_use]
    pub fn new(opcode: Opcode) -> Self {
        Instruction {
            opcode,
            operand: Operand::None,
            labels: Vec::new(),
        }
    }

    /// Create an instruction with an operand.
    #[must_use]
    pub fn with_operand(opcode: Opcode, operand: Operand) -> Self {
        Instruction {
            opcode,
            operand,
            labels: Vec::new(),
        }
    }

    /// Attach a label to this instruction, making it a branch target.
    #[must_use]
    pub fn with_label(mut self, label: Label) -> Self {
        self.labels.push(label);
        self
    }

    /// Attach a set of labels to this instruction.
    #[must_use]
    pub fn with_labels(mut self, labels: impl IntoIterator<Item = Label>) -> Self {
        self.labels.extend(labels);
        self
    }

    /// Whether this instruction transfers control through a label operand.
    #[must_use]
    pub fn is_branch(&self) -> bool {
        matches!(
            self.opcode,
            Opcode::Br | Opcode::BrTrue | Opcode::BrFalse | Opcode::Switch
        )
    }

    /// The labels this instruction branches to, empty for non-branches.
    #[must_use]
    pub fn branch_targets(&self) -> &[Label] {
        match &self.operand {
            Operand::Target(label) => std::slice::from_ref(label),
            Operand::Targets(labels) => labels,
            _ => &[],
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for label in &self.labels {
            write!(f, "{label}: ")?;
        }
        write!(f, "{}", self.opcode)?;
        if self.operand != Operand::None {
            write!(f, " {}", self.operand)?;
        }
        Ok(())
    }
}
