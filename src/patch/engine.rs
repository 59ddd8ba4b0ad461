//! Per-point patch application with isolation, logging and the load-time state machine.
//!
//! Each instrumentation point moves through `Unpatched -> AnchorLocated -> PlanBuilt ->
//! Applied | Failed`, with `Applied` and `Failed` terminal - there is no retry. A failed
//! point is skipped and logged; its target method keeps running unmodified, and no other
//! point is affected, because every patch operation checks its stream out of the method
//! table and owns it exclusively until it installs or restores.
//!
//! Points targeting distinct methods are independent, so the engine applies them in
//! parallel.

use std::fmt;

use rayon::prelude::*;

use crate::host::MethodTable;
use crate::il::{InstructionStream, LabelMaker};
use crate::patch::{AnchorPattern, PatchPlan};
use crate::{Error, Result};

/// One (target method, anchor, inserted behavior) triple.
///
/// Implementations declare their anchor pattern and build a [`PatchPlan`] from the
/// located anchor; the engine owns checkout, state tracking, application and
/// installation.
pub trait InstrumentationPoint: Send + Sync {
    /// Name of this instrumentation point, for reporting.
    fn name(&self) -> &str;

    /// Name of the host method this point patches.
    fn target(&self) -> &str;

    /// The structural pattern this point anchors on.
    fn anchor(&self) -> AnchorPattern;

    /// Build the edit script for the located anchor.
    ///
    /// `labels` is seeded past every label already present in `stream`; all labels the
    /// plan introduces must come from it.
    ///
    /// # Errors
    /// Any error fails this point only.
    fn build_plan(
        &self,
        stream: &InstructionStream,
        anchor: usize,
        labels: &mut LabelMaker,
    ) -> Result<PatchPlan>;
}

/// Load-time lifecycle of one instrumentation point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchState {
    /// Initial state; stream not yet examined
    Unpatched,
    /// Anchor located in the target stream
    AnchorLocated,
    /// Plan built against the located anchor
    PlanBuilt,
    /// Patched stream validated and installed; terminal
    Applied,
    /// Skipped after an error; terminal, the host method runs unmodified
    Failed,
}

impl fmt::Display for PatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PatchState::Unpatched => "unpatched",
            PatchState::AnchorLocated => "anchor-located",
            PatchState::PlanBuilt => "plan-built",
            PatchState::Applied => "applied",
            PatchState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Outcome of one instrumentation point's application.
#[derive(Debug)]
pub struct PointOutcome {
    /// The point's name
    pub point: String,
    /// The target method's name
    pub target: String,
    /// Terminal state: [`PatchState::Applied`] or [`PatchState::Failed`]
    pub state: PatchState,
    /// The error that failed the point, when it failed
    pub error: Option<Error>,
}

/// Aggregated result of applying a set of instrumentation points.
#[derive(Debug, Default)]
pub struct PatchSummary {
    outcomes: Vec<PointOutcome>,
}

impl PatchSummary {
    /// All per-point outcomes, in point registration order.
    #[must_use]
    pub fn outcomes(&self) -> &[PointOutcome] {
        &self.outcomes
    }

    /// Names of the points that applied.
    pub fn applied(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.state == PatchState::Applied)
            .map(|outcome| outcome.point.as_str())
    }

    /// The points that failed, with their errors.
    pub fn failed(&self) -> impl Iterator<Item = &PointOutcome> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.state == PatchState::Failed)
    }

    /// Whether every point applied.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.outcomes
            .iter()
            .all(|outcome| outcome.state == PatchState::Applied)
    }
}

/// Applies a catalog of instrumentation points to a host method table.
#[derive(Default)]
pub struct PatchEngine {
    points: Vec<Box<dyn InstrumentationPoint>>,
}

impl PatchEngine {
    /// Create an engine with no points.
    #[must_use]
    pub fn new() -> Self {
        PatchEngine { points: Vec::new() }
    }

    /// Create an engine from a point catalog.
    #[must_use]
    pub fn with_points(points: Vec<Box<dyn InstrumentationPoint>>) -> Self {
        PatchEngine { points }
    }

    /// Register one instrumentation point.
    pub fn register(&mut self, point: Box<dyn InstrumentationPoint>) {
        self.points.push(point);
    }

    /// Number of registered points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether no points are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Apply every registered point to `methods`, in parallel, isolating failures.
    pub fn apply_all(&self, methods: &MethodTable) -> PatchSummary {
        let outcomes = self
            .points
            .par_iter()
            .map(|point| Self::apply_point(point.as_ref(), methods))
            .collect();
        PatchSummary { outcomes }
    }

    fn apply_point(point: &dyn InstrumentationPoint, methods: &MethodTable) -> PointOutcome {
        let target = point.target();
        let mut state = PatchState::Unpatched;

        let result = (|| -> Result<()> {
            let body = methods.checkout(target)?;
            let original = body.stream.clone();

            let run = (|| -> Result<InstructionStream> {
                let anchor = point.anchor().locate(&original, target)?;
                state = PatchState::AnchorLocated;

                let mut labels = original.label_maker();
                let plan = point.build_plan(&original, anchor, &mut labels)?;
                state = PatchState::PlanBuilt;

                plan.apply(body.stream)
            })();

            match run {
                Ok(patched) => {
                    methods.install(target, patched);
                    Ok(())
                }
                Err(error) => {
                    // The original stream goes back untouched; only this point failed.
                    methods.restore(
                        target,
                        crate::host::MethodBody {
                            stream: original,
                            patched: false,
                        },
                    );
                    Err(error)
                }
            }
        })();

        match result {
            Ok(()) => {
                log::debug!("instrumentation point '{}' applied to '{target}'", point.name());
                PointOutcome {
                    point: point.name().to_string(),
                    target: target.to_string(),
                    state: PatchState::Applied,
                    error: None,
                }
            }
            Err(error) => {
                log::warn!(
                    "instrumentation point '{}' skipped ({state}): {error}",
                    point.name()
                );
                PointOutcome {
                    point: point.name().to_string(),
                    target: target.to_string(),
                    state: PatchState::Failed,
                    error: Some(error),
                }
            }
        }
    }
}

impl fmt::Debug for PatchEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatchEngine")
            .field("points", &self.points.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::il::{Instruction, Opcode, Operand};
    use crate::patch::OperandMatch;

    struct NopBefore {
        name: &'static str,
        target: &'static str,
        pattern: AnchorPattern,
    }

    impl InstrumentationPoint for NopBefore {
        fn name(&self) -> &str {
            self.name
        }
        fn target(&self) -> &str {
            self.target
        }
        fn anchor(&self) -> AnchorPattern {
            self.pattern.clone()
        }
        fn build_plan(
            &self,
            _stream: &InstructionStream,
            anchor: usize,
            _labels: &mut LabelMaker,
        ) -> Result<PatchPlan> {
            Ok(PatchPlan::new(anchor, vec![Instruction::new(Opcode::Nop)]))
        }
    }

    fn table_with(names: &[&str]) -> MethodTable {
        let table = MethodTable::new();
        for name in names {
            table.register(
                *name,
                InstructionStream::from_instructions(vec![
                    Instruction::with_operand(Opcode::LdArg, Operand::Slot(0)),
                    Instruction::new(Opcode::Ret),
                ]),
            );
        }
        table
    }

    #[test]
    fn failing_point_is_isolated_from_succeeding_ones() {
        let table = table_with(&["Alpha", "Beta"]);
        let engine = PatchEngine::with_points(vec![
            Box::new(NopBefore {
                name: "good",
                target: "Alpha",
                pattern: AnchorPattern::opcode(Opcode::Ret),
            }),
            Box::new(NopBefore {
                name: "stale-shape",
                target: "Beta",
                pattern: AnchorPattern::new(Opcode::LdFld, OperandMatch::Any),
            }),
        ]);

        let summary = engine.apply_all(&table);
        assert!(!summary.is_complete());
        assert_eq!(summary.applied().collect::<Vec<_>>(), vec!["good"]);

        let failed: Vec<_> = summary.failed().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].point, "stale-shape");
        assert!(matches!(
            failed[0].error,
            Some(Error::AnchorNotFound { .. })
        ));

        // Alpha got its patch; Beta is untouched and still patchable.
        assert!(table.is_patched("Alpha"));
        assert!(!table.is_patched("Beta"));
        assert_eq!(table.stream_of("Beta").unwrap().len(), 2);
    }

    #[test]
    fn applied_points_are_terminal() {
        let table = table_with(&["Alpha"]);
        let point = || {
            Box::new(NopBefore {
                name: "again",
                target: "Alpha",
                pattern: AnchorPattern::opcode(Opcode::Ret),
            }) as Box<dyn InstrumentationPoint>
        };

        let engine = PatchEngine::with_points(vec![point()]);
        assert!(engine.apply_all(&table).is_complete());

        // A second engine run must refuse to stack a patch on the patched stream.
        let engine = PatchEngine::with_points(vec![point()]);
        let summary = engine.apply_all(&table);
        let failed: Vec<_> = summary.failed().collect();
        assert_eq!(failed.len(), 1);
        assert!(matches!(failed[0].error, Some(Error::AlreadyPatched(_))));
    }

    #[test]
    fn unknown_target_fails_only_that_point() {
        let table = table_with(&["Alpha"]);
        let engine = PatchEngine::with_points(vec![Box::new(NopBefore {
            name: "ghost",
            target: "Missing",
            pattern: AnchorPattern::opcode(Opcode::Ret),
        })]);
        let summary = engine.apply_all(&table);
        assert_eq!(summary.failed().count(), 1);
        assert!(!table.is_patched("Alpha"));
    }
}
