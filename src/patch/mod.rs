//! Anchor location, patch planning and load-time application.
//!
//! This is the write side of the instrumentation pipeline: for each instrumentation
//! point, the [`AnchorPattern`] finds the splice point inside the target method's
//! stream, the point's script (usually assembled with [`CallSiteBuilder`]) becomes an
//! immutable [`PatchPlan`], and the [`PatchEngine`] applies the plan to the exclusively
//! checked-out stream and installs the validated result - or skips the point, logged,
//! leaving the host method unmodified.
//!
//! # Key Types
//! - [`AnchorPattern`] - opcode + operand predicate + fixed offset
//! - [`PatchPlan`] - immutable edit script, applied once, deterministic
//! - [`CallSiteBuilder`] - fluent assembly of the injected call-site sequence
//! - [`InstrumentationPoint`] / [`PatchEngine`] - per-point application with the
//!   `Unpatched -> AnchorLocated -> PlanBuilt -> Applied | Failed` lifecycle

mod anchor;
mod engine;
mod plan;
mod script;

pub use anchor::{AnchorPattern, OperandMatch};
pub use engine::{InstrumentationPoint, PatchEngine, PatchState, PatchSummary, PointOutcome};
pub use plan::PatchPlan;
pub use script::CallSiteBuilder;
