//! Minimal stack evaluator for the supported instruction subset.
//!
//! The evaluator exists so patched streams can actually be *run*: tests drive the allow
//! and deny paths of an instrumented method end to end and assert on the observable
//! effects (dispatched events, pooled-resource accounting, replaced payloads). It is
//! deliberately not a general virtual machine - it executes exactly the opcode shapes
//! the stream model can express, resolves member references through a caller-supplied
//! [`HostCalls`] binding, and fails loudly on anything else.
//!
//! Branches resolve through the same label model the editor validates: before execution
//! the evaluator indexes every attached label, so a stream that passed
//! [`crate::il::InstructionStream::validate`] always resolves.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::il::{FieldRef, InstructionStream, Label, MethodRef, Opcode, Operand};
use crate::Result;

/// A value on the evaluation stack, in an argument slot or in a local slot.
#[derive(Clone, Default)]
pub enum Value {
    /// The null reference; also the initial content of every local slot
    #[default]
    Null,
    /// A 32-bit integer; branch conditions and allow flags are integers
    Int(i32),
    /// A shared reference to a host- or event-side object
    Obj(Arc<dyn Any + Send + Sync>),
}

impl Value {
    /// Wrap `value` as a shared object reference.
    #[must_use]
    pub fn object<T: Any + Send + Sync>(value: T) -> Self {
        Value::Obj(Arc::new(value))
    }

    /// Whether this is the null reference.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The integer content of this value.
    ///
    /// # Errors
    /// [`crate::Error::Eval`] when the value is not an integer.
    pub fn as_int(&self) -> Result<i32> {
        match self {
            Value::Int(value) => Ok(*value),
            other => Err(crate::Error::Eval(format!(
                "expected an integer, found {other:?}"
            ))),
        }
    }

    /// Downcast an object reference to its concrete type.
    #[must_use]
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        match self {
            Value::Obj(obj) => Arc::clone(obj).downcast::<T>().ok(),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Int(value) => write!(f, "int {value}"),
            Value::Obj(_) => f.write_str("obj"),
        }
    }
}

/// One activation: argument slots, local slots and the evaluation stack.
///
/// [`HostCalls`] implementations receive the frame during member invocation and pop
/// their own arguments; a well-formed binding leaves the stack balanced the way the
/// host method it stands in for would.
#[derive(Debug, Default)]
pub struct Frame {
    args: Vec<Value>,
    locals: Vec<Value>,
    stack: Vec<Value>,
}

impl Frame {
    fn new(args: Vec<Value>, locals: usize) -> Self {
        Frame {
            args,
            locals: vec![Value::Null; locals],
            stack: Vec::new(),
        }
    }

    /// Push a value onto the evaluation stack.
    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    /// Pop the top value off the evaluation stack.
    ///
    /// # Errors
    /// [`crate::Error::StackUnderflow`] when the stack is empty.
    pub fn pop(&mut self) -> Result<Value> {
        self.stack.pop().ok_or(crate::Error::StackUnderflow)
    }

    /// Current evaluation stack depth.
    #[must_use]
    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// The value currently in local slot `slot`.
    #[must_use]
    pub fn local(&self, slot: u16) -> Option<&Value> {
        self.locals.get(usize::from(slot))
    }

    fn load_arg(&self, slot: u16) -> Result<Value> {
        self.args
            .get(usize::from(slot))
            .cloned()
            .ok_or_else(|| crate::Error::Eval(format!("argument slot {slot} out of range")))
    }

    fn load_local(&self, slot: u16) -> Result<Value> {
        self.locals
            .get(usize::from(slot))
            .cloned()
            .ok_or_else(|| crate::Error::Eval(format!("local slot {slot} out of range")))
    }

    fn store_local(&mut self, slot: u16, value: Value) -> Result<()> {
        let local = self
            .locals
            .get_mut(usize::from(slot))
            .ok_or_else(|| crate::Error::Eval(format!("local slot {slot} out of range")))?;
        *local = value;
        Ok(())
    }
}

/// Binding from symbolic member references to runtime behavior.
///
/// The evaluator is host-agnostic; everything a `Call`, `CallVirt`, `NewObj`, `LdFld` or
/// `LdSFld` means is decided here. `invoke` receives the frame and pops the arguments
/// the named member consumes, pushing its result if it has one.
pub trait HostCalls {
    /// Invoke the named method, constructor or property accessor.
    ///
    /// # Errors
    /// [`crate::Error::Eval`] for unknown symbols or argument shape mismatches.
    fn invoke(&self, method: &MethodRef, frame: &mut Frame) -> Result<()>;

    /// Read the named instance field of `receiver`.
    ///
    /// # Errors
    /// [`crate::Error::Eval`] for unknown symbols or a receiver of the wrong shape.
    fn load_field(&self, field: &FieldRef, receiver: Value) -> Result<Value>;

    /// Read the named static field.
    ///
    /// # Errors
    /// [`crate::Error::Eval`] for unknown symbols.
    fn load_static(&self, field: &FieldRef) -> Result<Value>;
}

/// Default bound on executed instructions per run.
const DEFAULT_STEP_LIMIT: usize = 100_000;

/// Executes one instruction stream against a [`HostCalls`] binding.
#[derive(Debug)]
pub struct Evaluator<'a, H> {
    host: &'a H,
    step_limit: usize,
}

impl<'a, H: HostCalls> Evaluator<'a, H> {
    /// Create an evaluator over the given host binding.
    #[must_use]
    pub fn new(host: &'a H) -> Self {
        Evaluator {
            host,
            step_limit: DEFAULT_STEP_LIMIT,
        }
    }

    /// Override the executed-instruction bound.
    #[must_use]
    pub fn with_step_limit(mut self, limit: usize) -> Self {
        self.step_limit = limit;
        self
    }

    /// Run `stream` to its `Ret` (or to the end of the stream), returning the final
    /// frame for inspection.
    ///
    /// `locals` is the number of local slots the method declares; all start null.
    ///
    /// # Errors
    /// - [`crate::Error::UnsupportedInstruction`] for an opcode/operand shape outside
    ///   the supported subset
    /// - [`crate::Error::StackUnderflow`] when an instruction pops an empty stack
    /// - [`crate::Error::Eval`] for unresolved symbols, bad branch conditions, or a run
    ///   exceeding the step limit
    pub fn run(
        &self,
        stream: &InstructionStream,
        args: Vec<Value>,
        locals: usize,
    ) -> Result<Frame> {
        let targets = index_labels(stream);
        let mut frame = Frame::new(args, locals);
        let mut pc = 0usize;
        let mut steps = 0usize;

        while pc < stream.len() {
            steps += 1;
            if steps > self.step_limit {
                return Err(crate::Error::Eval(format!(
                    "step limit of {} exceeded",
                    self.step_limit
                )));
            }

            let instruction = &stream[pc];
            match (instruction.opcode, &instruction.operand) {
                (Opcode::Nop, Operand::None) => {}
                (Opcode::Dup, Operand::None) => {
                    let top = frame.pop()?;
                    frame.push(top.clone());
                    frame.push(top);
                }
                (Opcode::Pop, Operand::None) => {
                    frame.pop()?;
                }
                (Opcode::LdArg, Operand::Slot(slot)) => {
                    let value = frame.load_arg(*slot)?;
                    frame.push(value);
                }
                (Opcode::LdLoc, Operand::Slot(slot)) => {
                    let value = frame.load_local(*slot)?;
                    frame.push(value);
                }
                (Opcode::StLoc, Operand::Slot(slot)) => {
                    let value = frame.pop()?;
                    frame.store_local(*slot, value)?;
                }
                (Opcode::LdFld, Operand::Field(field)) => {
                    let receiver = frame.pop()?;
                    let value = self.host.load_field(field, receiver)?;
                    frame.push(value);
                }
                (Opcode::LdSFld, Operand::Field(field)) => {
                    let value = self.host.load_static(field)?;
                    frame.push(value);
                }
                (Opcode::LdcI4, Operand::Int(value)) => {
                    frame.push(Value::Int(*value));
                }
                (Opcode::Call | Opcode::CallVirt | Opcode::NewObj, Operand::Method(method)) => {
                    self.host.invoke(method, &mut frame)?;
                }
                (Opcode::Br, Operand::Target(label)) => {
                    pc = resolve(&targets, *label)?;
                    continue;
                }
                (Opcode::BrTrue, Operand::Target(label)) => {
                    if frame.pop()?.as_int()? != 0 {
                        pc = resolve(&targets, *label)?;
                        continue;
                    }
                }
                (Opcode::BrFalse, Operand::Target(label)) => {
                    if frame.pop()?.as_int()? == 0 {
                        pc = resolve(&targets, *label)?;
                        continue;
                    }
                }
                (Opcode::Switch, Operand::Targets(labels)) => {
                    let selector = frame.pop()?.as_int()?;
                    if let Some(label) = usize::try_from(selector)
                        .ok()
                        .and_then(|index| labels.get(index))
                    {
                        pc = resolve(&targets, *label)?;
                        continue;
                    }
                }
                (Opcode::Ret, Operand::None) => return Ok(frame),
                _ => {
                    return Err(crate::Error::UnsupportedInstruction(
                        instruction.to_string(),
                    ));
                }
            }
            pc += 1;
        }

        Ok(frame)
    }
}

fn index_labels(stream: &InstructionStream) -> HashMap<Label, usize> {
    let mut targets = HashMap::new();
    for (index, instruction) in stream.iter().enumerate() {
        for label in &instruction.labels {
            targets.insert(*label, index);
        }
    }
    targets
}

fn resolve(targets: &HashMap<Label, usize>, label: Label) -> Result<usize> {
    targets
        .get(&label)
        .copied()
        .ok_or_else(|| crate::Error::Eval(format!("branch to unattached label {label}")))
}
