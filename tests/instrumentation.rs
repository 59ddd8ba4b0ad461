//! End-to-end instrumentation tests: register crafted method bodies, apply the shipped
//! point catalog, then *execute* the patched streams through the evaluator with a symbol
//! binding over a [`Runtime`] - driving the allow path, the deny path with
//! pooled-resource accounting, and payload mutation read-back.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use hookscope::points::trim_targets;
use hookscope::prelude::*;

const GRENADE_TARGET: &str = "ExplosionGrenade::Explode";
const GATE_TARGET: &str = "PryableDoor::TryPryGate";
const RADIO_TARGET: &str = "RadioItem::Update";

/// Host-side world state the symbol binding exposes to evaluated streams.
struct World {
    runtime: Arc<Runtime>,
    grenade: HostHandle,
    radio: HostHandle,
    colliders: Vec<u16>,
    /// Serials damage was applied to by the grenade method
    applied: Mutex<Vec<u16>>,
    /// Gate state toggles performed
    toggled: Mutex<u32>,
    /// Battery drains the radio method consumed
    consumed: Mutex<Vec<i32>>,
}

impl World {
    fn new(runtime: Arc<Runtime>) -> Self {
        World {
            runtime,
            grenade: HostObject::new(
                100,
                HostKind::Projectile,
                HostTraits::USABLE | HostTraits::THROWABLE | HostTraits::EXPLOSIVE,
            ),
            radio: HostObject::new(
                101,
                HostKind::Item,
                HostTraits::USABLE | HostTraits::TRANSMITTER,
            ),
            colliders: vec![1, 2, 3],
            applied: Mutex::new(Vec::new()),
            toggled: Mutex::new(0),
            consumed: Mutex::new(Vec::new()),
        }
    }

    fn event<E: Send + 'static>(frame: &mut Frame) -> Result<Arc<Mutex<E>>> {
        frame
            .pop()?
            .downcast::<Mutex<E>>()
            .ok_or_else(|| Error::Eval("event of unexpected type".into()))
    }

    fn collection(frame: &mut Frame) -> Result<Arc<Mutex<Vec<u16>>>> {
        frame
            .pop()?
            .downcast::<Mutex<Vec<u16>>>()
            .ok_or_else(|| Error::Eval("collection of unexpected type".into()))
    }

    fn handle(frame: &mut Frame) -> Result<Arc<HostHandle>> {
        frame
            .pop()?
            .downcast::<HostHandle>()
            .ok_or_else(|| Error::Eval("host handle of unexpected type".into()))
    }
}

impl HostCalls for World {
    fn invoke(&self, method: &MethodRef, frame: &mut Frame) -> Result<()> {
        match method.name() {
            // Shared scratch pool
            "HashSetPool::get" => {
                frame.pop()?; // pool token
                frame.push(Value::object(Mutex::new(self.runtime.scratch_sets.get())));
                Ok(())
            }
            "HashSetPool::put" => {
                let set = frame
                    .pop()?
                    .downcast::<Mutex<HashSet<u16>>>()
                    .ok_or_else(|| Error::Eval("pooled set of unexpected type".into()))?;
                frame.pop()?; // pool token
                self.runtime
                    .scratch_sets
                    .put(std::mem::take(&mut *set.lock().unwrap()));
                Ok(())
            }

            // Grenade detonation
            "Physics::overlap" => {
                frame.push(Value::object(Mutex::new(self.colliders.clone())));
                Ok(())
            }
            "Explosion::apply" => {
                let colliders = Self::collection(frame)?;
                self.applied
                    .lock()
                    .unwrap()
                    .extend(colliders.lock().unwrap().iter().copied());
                Ok(())
            }
            "GrenadeExplodingEvent::new" => {
                let targets = Self::collection(frame)?.lock().unwrap().clone();
                let position = frame
                    .pop()?
                    .downcast::<[f32; 3]>()
                    .ok_or_else(|| Error::Eval("position of unexpected type".into()))?;
                let grenade = Self::handle(frame)?;
                let wrapper = self
                    .runtime
                    .wrappers
                    .get_or_create(&grenade)
                    .ok_or_else(|| Error::Eval("empty grenade reference".into()))?;
                frame.push(Value::object(Mutex::new(GrenadeExplodingEvent::new(
                    wrapper, *position, targets,
                ))));
                Ok(())
            }
            "Handlers::on_grenade_exploding" => {
                let event = Self::event::<GrenadeExplodingEvent>(frame)?;
                self.runtime
                    .grenade_exploding
                    .dispatch(&mut event.lock().unwrap());
                Ok(())
            }
            "GrenadeExplodingEvent::is_allowed" => {
                let event = Self::event::<GrenadeExplodingEvent>(frame)?;
                let allowed = event.lock().unwrap().is_allowed();
                frame.push(Value::Int(i32::from(allowed)));
                Ok(())
            }
            "GrenadeExplosion::trim_targets" => {
                let colliders = Self::collection(frame)?;
                let event = Self::event::<GrenadeExplodingEvent>(frame)?;
                let allowed = event.lock().unwrap().targets.clone();
                let trimmed = trim_targets(&allowed, &colliders.lock().unwrap());
                frame.push(Value::object(Mutex::new(trimmed)));
                Ok(())
            }

            // Gate prying
            "Actor::can_interact" => {
                frame.pop()?;
                frame.push(Value::Int(1));
                Ok(())
            }
            "GatePryingEvent::new" => {
                let door = frame.pop()?.as_int()?;
                let actor = frame.pop()?.as_int()?;
                frame.push(Value::object(Mutex::new(GatePryingEvent::new(
                    actor as u16,
                    door as u64,
                ))));
                Ok(())
            }
            "Handlers::on_gate_prying" => {
                let event = Self::event::<GatePryingEvent>(frame)?;
                self.runtime.gate_prying.dispatch(&mut event.lock().unwrap());
                Ok(())
            }
            "GatePryingEvent::is_allowed" => {
                let event = Self::event::<GatePryingEvent>(frame)?;
                let allowed = event.lock().unwrap().is_allowed();
                frame.push(Value::Int(i32::from(allowed)));
                Ok(())
            }
            "Door::toggle" => {
                frame.pop()?; // target state
                frame.pop()?; // door
                *self.toggled.lock().unwrap() += 1;
                Ok(())
            }

            // Radio battery
            "RadioDrainEvent::new" => {
                let drain = frame.pop()?.as_int()?;
                let radio = Self::handle(frame)?;
                let wrapper = self
                    .runtime
                    .wrappers
                    .get_or_create(&radio)
                    .ok_or_else(|| Error::Eval("empty radio reference".into()))?;
                frame.push(Value::object(Mutex::new(RadioDrainEvent::new(
                    wrapper, drain,
                ))));
                Ok(())
            }
            "Handlers::on_radio_drain" => {
                let event = Self::event::<RadioDrainEvent>(frame)?;
                self.runtime.radio_drain.dispatch(&mut event.lock().unwrap());
                Ok(())
            }
            "RadioDrainEvent::is_allowed" => {
                let event = Self::event::<RadioDrainEvent>(frame)?;
                let allowed = event.lock().unwrap().is_allowed();
                frame.push(Value::Int(i32::from(allowed)));
                Ok(())
            }
            "RadioDrainEvent::drain" => {
                let event = Self::event::<RadioDrainEvent>(frame)?;
                let drain = event.lock().unwrap().drain;
                frame.push(Value::Int(drain));
                Ok(())
            }
            "Radio::consume" => {
                let drain = frame.pop()?.as_int()?;
                frame.pop()?; // radio
                self.consumed.lock().unwrap().push(drain);
                Ok(())
            }

            other => Err(Error::Eval(format!("unbound method {other}"))),
        }
    }

    fn load_field(&self, field: &FieldRef, _receiver: Value) -> Result<Value> {
        match field.name() {
            "Grenade::Position" => Ok(Value::object([0.0f32, 1.0, 0.0])),
            "DoorVariant::TargetState" => Ok(Value::Int(0)),
            "Radio::TickDrain" => Ok(Value::Int(4)),
            other => Err(Error::Eval(format!("unbound field {other}"))),
        }
    }

    fn load_static(&self, field: &FieldRef) -> Result<Value> {
        match field.name() {
            "HashSetPool::Shared" => Ok(Value::object(())),
            other => Err(Error::Eval(format!("unbound static {other}"))),
        }
    }
}

/// The grenade method as the host compiles it: store position, rent two scratch sets,
/// gather colliders into local 5, apply damage, return both sets.
fn explode_body() -> InstructionStream {
    InstructionStream::from_instructions(vec![
        Instruction::with_operand(Opcode::LdArg, Operand::Slot(0)),
        Instruction::with_operand(
            Opcode::LdFld,
            Operand::Field(FieldRef::new("Grenade::Position")),
        ),
        Instruction::with_operand(Opcode::StLoc, Operand::Slot(1)),
        Instruction::with_operand(
            Opcode::LdSFld,
            Operand::Field(FieldRef::new("HashSetPool::Shared")),
        ),
        Instruction::with_operand(
            Opcode::CallVirt,
            Operand::Method(MethodRef::new("HashSetPool::get")),
        ),
        Instruction::with_operand(Opcode::StLoc, Operand::Slot(2)),
        Instruction::with_operand(
            Opcode::LdSFld,
            Operand::Field(FieldRef::new("HashSetPool::Shared")),
        ),
        Instruction::with_operand(
            Opcode::CallVirt,
            Operand::Method(MethodRef::new("HashSetPool::get")),
        ),
        Instruction::with_operand(Opcode::StLoc, Operand::Slot(3)),
        Instruction::with_operand(
            Opcode::Call,
            Operand::Method(MethodRef::new("Physics::overlap")),
        ),
        Instruction::with_operand(Opcode::StLoc, Operand::Slot(5)),
        Instruction::with_operand(Opcode::LdLoc, Operand::Slot(5)),
        Instruction::with_operand(
            Opcode::Call,
            Operand::Method(MethodRef::new("Explosion::apply")),
        ),
        Instruction::with_operand(
            Opcode::LdSFld,
            Operand::Field(FieldRef::new("HashSetPool::Shared")),
        ),
        Instruction::with_operand(Opcode::LdLoc, Operand::Slot(2)),
        Instruction::with_operand(
            Opcode::CallVirt,
            Operand::Method(MethodRef::new("HashSetPool::put")),
        ),
        Instruction::with_operand(
            Opcode::LdSFld,
            Operand::Field(FieldRef::new("HashSetPool::Shared")),
        ),
        Instruction::with_operand(Opcode::LdLoc, Operand::Slot(3)),
        Instruction::with_operand(
            Opcode::CallVirt,
            Operand::Method(MethodRef::new("HashSetPool::put")),
        ),
        Instruction::new(Opcode::Ret),
    ])
}

/// The pry method: a capability check branching over an early return, then the
/// state-toggle block whose entry is the branch target.
fn pry_body() -> InstructionStream {
    let mut labels = LabelMaker::new();
    let toggle = labels.define();
    InstructionStream::from_instructions(vec![
        Instruction::with_operand(Opcode::LdArg, Operand::Slot(1)),
        Instruction::with_operand(
            Opcode::Call,
            Operand::Method(MethodRef::new("Actor::can_interact")),
        ),
        Instruction::with_operand(Opcode::BrTrue, Operand::Target(toggle)),
        Instruction::new(Opcode::Ret),
        Instruction::with_operand(Opcode::LdArg, Operand::Slot(0)).with_label(toggle),
        Instruction::with_operand(Opcode::LdArg, Operand::Slot(0)),
        Instruction::with_operand(
            Opcode::LdFld,
            Operand::Field(FieldRef::new("DoorVariant::TargetState")),
        ),
        Instruction::with_operand(
            Opcode::Call,
            Operand::Method(MethodRef::new("Door::toggle")),
        ),
        Instruction::new(Opcode::Ret),
    ])
}

/// The radio tick: compute the drain into local 1, then consume it.
fn update_body() -> InstructionStream {
    InstructionStream::from_instructions(vec![
        Instruction::with_operand(Opcode::LdArg, Operand::Slot(0)),
        Instruction::with_operand(
            Opcode::LdFld,
            Operand::Field(FieldRef::new("Radio::TickDrain")),
        ),
        Instruction::with_operand(Opcode::StLoc, Operand::Slot(1)),
        Instruction::with_operand(Opcode::LdArg, Operand::Slot(0)),
        Instruction::with_operand(Opcode::LdLoc, Operand::Slot(1)),
        Instruction::with_operand(
            Opcode::Call,
            Operand::Method(MethodRef::new("Radio::consume")),
        ),
        Instruction::new(Opcode::Ret),
    ])
}

fn patched_world() -> (Arc<Runtime>, World, MethodTable) {
    let runtime = Arc::new(Runtime::new());
    let world = World::new(Arc::clone(&runtime));

    let methods = MethodTable::new();
    methods.register(GRENADE_TARGET, explode_body());
    methods.register(GATE_TARGET, pry_body());
    methods.register(RADIO_TARGET, update_body());

    let engine = PatchEngine::with_points(standard_points());
    let summary = engine.apply_all(&methods);
    assert!(summary.is_complete(), "catalog must apply cleanly");

    (runtime, world, methods)
}

#[test]
fn grenade_allow_path_trims_targets_and_balances_pools() {
    let (runtime, world, methods) = patched_world();
    for _ in 0..4 {
        runtime.scratch_sets.put(HashSet::new());
    }
    assert_eq!(runtime.scratch_sets.size(), 4);

    // Subscribers drop serial 3 from the blast but leave the event allowed.
    runtime
        .grenade_exploding
        .subscribe(|event| event.targets.retain(|serial| *serial != 3));

    let stream = methods.stream_of(GRENADE_TARGET).unwrap();
    let args = vec![Value::object(Arc::clone(&world.grenade))];
    let frame = Evaluator::new(&world).run(&stream, args, 7).unwrap();
    assert_eq!(frame.stack_depth(), 0);

    assert_eq!(*world.applied.lock().unwrap(), vec![1, 2]);
    // Both rented sets went back through the original epilogue.
    assert_eq!(runtime.scratch_sets.size(), 4);

    // The injected construction resolved the grenade through the identity cache.
    let wrapper = runtime.wrappers.get(&world.grenade).unwrap();
    assert_eq!(wrapper.kind(), WrapperKind::FragGrenade);
}

#[test]
fn grenade_deny_path_returns_both_pooled_sets_exactly_once() {
    let (runtime, world, methods) = patched_world();
    for _ in 0..4 {
        runtime.scratch_sets.put(HashSet::new());
    }

    runtime
        .grenade_exploding
        .subscribe(|event| event.deny_with("shielded zone".into()));

    let stream = methods.stream_of(GRENADE_TARGET).unwrap();
    let args = vec![Value::object(Arc::clone(&world.grenade))];
    Evaluator::new(&world).run(&stream, args, 7).unwrap();

    // No damage applied, and the early return released exactly the two rentals:
    // a double release would overshoot the seeded size.
    assert!(world.applied.lock().unwrap().is_empty());
    assert_eq!(runtime.scratch_sets.size(), 4);
}

#[test]
fn gate_veto_skips_the_toggle() {
    let (runtime, world, methods) = patched_world();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);
    runtime.gate_prying.subscribe(move |event| {
        log.lock().unwrap().push((event.actor, event.door));
        if event.actor == 9 {
            event.set_allowed(false);
        }
    });

    let stream = methods.stream_of(GATE_TARGET).unwrap();

    // Vetoed actor: the capability branch runs through the injection, then skips.
    Evaluator::new(&world)
        .run(&stream, vec![Value::Int(10), Value::Int(9)], 0)
        .unwrap();
    assert_eq!(*world.toggled.lock().unwrap(), 0);

    // Permitted actor toggles the gate.
    Evaluator::new(&world)
        .run(&stream, vec![Value::Int(10), Value::Int(5)], 0)
        .unwrap();
    assert_eq!(*world.toggled.lock().unwrap(), 1);

    assert_eq!(*seen.lock().unwrap(), vec![(9, 10), (5, 10)]);
}

#[test]
fn radio_drain_mutation_is_read_back() {
    let (runtime, world, methods) = patched_world();
    runtime.radio_drain.subscribe(|event| event.drain = 1);

    let stream = methods.stream_of(RADIO_TARGET).unwrap();
    let args = vec![Value::object(Arc::clone(&world.radio))];
    Evaluator::new(&world).run(&stream, args, 3).unwrap();

    // The host computed 4; subscribers dialed it down to 1.
    assert_eq!(*world.consumed.lock().unwrap(), vec![1]);
}

#[test]
fn radio_drain_denial_skips_the_tick() {
    let (runtime, world, methods) = patched_world();
    runtime
        .radio_drain
        .subscribe(|event| event.set_allowed(false));

    let stream = methods.stream_of(RADIO_TARGET).unwrap();
    let args = vec![Value::object(Arc::clone(&world.radio))];
    Evaluator::new(&world).run(&stream, args, 3).unwrap();
    assert!(world.consumed.lock().unwrap().is_empty());
}

#[test]
fn stale_point_is_skipped_and_its_method_runs_unmodified() {
    let runtime = Arc::new(Runtime::new());
    let world = World::new(Arc::clone(&runtime));

    let methods = MethodTable::new();
    methods.register(GRENADE_TARGET, explode_body());
    // A gate method compiled without the TargetState read: the anchor is stale.
    methods.register(
        GATE_TARGET,
        InstructionStream::from_instructions(vec![
            Instruction::with_operand(Opcode::LdArg, Operand::Slot(0)),
            Instruction::new(Opcode::Pop),
            Instruction::new(Opcode::Ret),
        ]),
    );
    methods.register(RADIO_TARGET, update_body());

    let engine = PatchEngine::with_points(standard_points());
    let summary = engine.apply_all(&methods);

    assert!(!summary.is_complete());
    let failed: Vec<&str> = summary.failed().map(|o| o.point.as_str()).collect();
    assert_eq!(failed, vec!["gate-prying"]);
    assert!(summary.applied().count() == 2);

    // The stale method still runs, unmodified and event-free.
    assert!(!methods.is_patched(GATE_TARGET));
    let stream = methods.stream_of(GATE_TARGET).unwrap();
    Evaluator::new(&world)
        .run(&stream, vec![Value::Int(10), Value::Int(9)], 0)
        .unwrap();
    assert_eq!(*world.toggled.lock().unwrap(), 0);
}
