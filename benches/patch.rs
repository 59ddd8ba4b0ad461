//! Benchmarks for the load-time patch pipeline.
//!
//! Measures the two hot halves of applying one instrumentation point:
//! - anchor location over method bodies of increasing size
//! - plan application (splice + label bookkeeping + validation)

extern crate hookscope;

use criterion::{criterion_group, criterion_main, Criterion};
use hookscope::il::{
    FieldRef, Instruction, InstructionStream, LabelMaker, MethodRef, Opcode, Operand,
};
use hookscope::patch::{AnchorPattern, CallSiteBuilder, PatchPlan};
use std::hint::black_box;

/// A method body of `filler` instructions with the anchor shape buried at the end.
fn body_with_anchor(filler: usize) -> InstructionStream {
    let mut instructions = Vec::with_capacity(filler + 4);
    for slot in 0..filler {
        instructions.push(Instruction::with_operand(
            Opcode::LdArg,
            Operand::Slot((slot % 4) as u16),
        ));
        instructions.push(Instruction::new(Opcode::Pop));
    }
    instructions.push(Instruction::with_operand(
        Opcode::LdFld,
        Operand::Field(FieldRef::new("DoorVariant::TargetState")),
    ));
    instructions.push(Instruction::new(Opcode::Pop));
    instructions.push(Instruction::new(Opcode::Ret));
    InstructionStream::from_instructions(instructions)
}

fn veto_skip_plan(anchor: usize, labels: &mut LabelMaker) -> PatchPlan {
    let tail = labels.define();
    let instructions = CallSiteBuilder::new(labels)
        .ld_arg(1)
        .ld_arg(0)
        .new_obj(MethodRef::new("GatePryingEvent::new"))
        .dup()
        .call(MethodRef::new("Handlers::on_gate_prying"))
        .call_virt(MethodRef::new("GatePryingEvent::is_allowed"))
        .br_false(tail)
        .build()
        .unwrap();
    PatchPlan::new(anchor, instructions).with_tail_label(tail)
}

/// Benchmark anchor location in a short method (tens of instructions).
fn bench_locate_short(c: &mut Criterion) {
    let stream = body_with_anchor(16);
    let pattern = AnchorPattern::field(Opcode::LdFld, FieldRef::new("DoorVariant::TargetState"));

    c.bench_function("anchor_locate_short", |b| {
        b.iter(|| {
            let index = pattern.locate(black_box(&stream), "bench").unwrap();
            black_box(index)
        });
    });
}

/// Benchmark anchor location in a long method (thousands of instructions).
fn bench_locate_long(c: &mut Criterion) {
    let stream = body_with_anchor(2048);
    let pattern = AnchorPattern::field(Opcode::LdFld, FieldRef::new("DoorVariant::TargetState"));

    c.bench_function("anchor_locate_long", |b| {
        b.iter(|| {
            let index = pattern.locate(black_box(&stream), "bench").unwrap();
            black_box(index)
        });
    });
}

/// Benchmark applying a veto-skip plan to a pristine short body.
fn bench_apply_short(c: &mut Criterion) {
    let stream = body_with_anchor(16);
    let pattern = AnchorPattern::field(Opcode::LdFld, FieldRef::new("DoorVariant::TargetState"));
    let anchor = pattern.locate(&stream, "bench").unwrap();
    let mut labels = stream.label_maker();
    let plan = veto_skip_plan(anchor, &mut labels);

    c.bench_function("plan_apply_short", |b| {
        b.iter(|| {
            let patched = plan.apply(black_box(stream.clone())).unwrap();
            black_box(patched)
        });
    });
}

/// Benchmark applying the same plan to a long body, dominated by splice shifting and
/// validation.
fn bench_apply_long(c: &mut Criterion) {
    let stream = body_with_anchor(2048);
    let pattern = AnchorPattern::field(Opcode::LdFld, FieldRef::new("DoorVariant::TargetState"));
    let anchor = pattern.locate(&stream, "bench").unwrap();
    let mut labels = stream.label_maker();
    let plan = veto_skip_plan(anchor, &mut labels);

    c.bench_function("plan_apply_long", |b| {
        b.iter(|| {
            let patched = plan.apply(black_box(stream.clone())).unwrap();
            black_box(patched)
        });
    });
}

criterion_group!(
    benches,
    bench_locate_short,
    bench_locate_long,
    bench_apply_short,
    bench_apply_long,
);
criterion_main!(benches);
