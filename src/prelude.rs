//! # hookscope Prelude
//!
//! Convenient re-exports of the types most embedding code touches: the error surface,
//! the patch pipeline, the host boundary, wrappers, events and the runtime context.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all hookscope operations
pub use crate::Error;

/// The result type used throughout hookscope
pub use crate::Result;

// ================================================================================================
// Instruction Model
// ================================================================================================

/// Instruction stream model and label machinery
pub use crate::il::{
    FieldRef, Instruction, InstructionStream, Label, LabelMaker, MethodRef, Opcode, Operand,
    TypeRef,
};

// ================================================================================================
// Patch Pipeline
// ================================================================================================

/// Anchor patterns, plans, scripts and the engine
pub use crate::patch::{
    AnchorPattern, CallSiteBuilder, InstrumentationPoint, OperandMatch, PatchEngine, PatchPlan,
    PatchState, PatchSummary, PointOutcome,
};

// ================================================================================================
// Host Boundary
// ================================================================================================

/// Host object handles, the method table and scratch pools
pub use crate::host::{HostHandle, HostKind, HostObject, HostTraits, MethodTable, Pool};

// ================================================================================================
// Wrappers and Events
// ================================================================================================

/// The wrapper identity cache and its types
pub use crate::wrappers::{ShapeTable, Wrapper, WrapperCache, WrapperKind, WrapperRc};

/// Cancellable events and the dispatch contract
pub use crate::events::{
    CancellableEvent, EventHandler, GatePryingEvent, GrenadeExplodingEvent, RadioDrainEvent,
};

// ================================================================================================
// Runtime and Point Catalog
// ================================================================================================

/// The owned runtime context and stream evaluator
pub use crate::runtime::{Evaluator, Frame, HostCalls, Runtime, Value};

/// The shipped instrumentation points
pub use crate::points::{standard_points, GatePrying, GrenadeExplosion, RadioDrain};
