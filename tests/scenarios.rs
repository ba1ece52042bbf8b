//! End-to-end allocation scenarios.
//!
//! Each test builds a small instruction list through the public API, runs the
//! allocator against a deliberately tiny register file and checks the exact
//! outcome: which variables share a location, what spills and how many rounds
//! it took.

use regcolor::{
    ir::{ClassSet, Code, DataClass, Instr, Location, RegId, Variable, VirtualVar},
    regalloc::{Allocation, RegisterAllocator},
    target::{GenericTarget, Target},
    AllocatorConfig, Result,
};

fn int(id: u32) -> Variable {
    VirtualVar::new(id, DataClass::Int64).into()
}

fn allocate(code: &mut Code, registers: u16) -> Result<Allocation> {
    RegisterAllocator::new(GenericTarget::integer(registers), AllocatorConfig::default())
        .allocate_code(code)
}

#[test]
fn two_colors_suffice_for_a_chain() -> Result<()> {
    // a and c are never live at the same time, b overlaps both.
    let (a, b, c) = (int(0), int(1), int(2));
    let mut code = Code::new();
    code.push(Instr::op("const", [a], []));
    code.push(Instr::op("const", [b], []));
    code.push(Instr::op("use", [], [a]));
    code.push(Instr::op("const", [c], []));
    code.push(Instr::op("use", [], [b, c]));

    let allocation = allocate(&mut code, 2)?;
    assert_eq!(allocation.rounds(), 1);
    assert!(allocation.spilled().is_empty());
    assert_eq!(allocation.location(&a), allocation.location(&c));
    assert_ne!(allocation.location(&a), allocation.location(&b));
    assert!(allocation
        .location(&b)
        .is_some_and(|loc| loc.is_register()));
    Ok(())
}

#[test]
fn copy_is_coalesced_and_removed() -> Result<()> {
    let (x, y) = (int(0), int(1));
    let mut code = Code::new();
    code.push(Instr::op("const", [y], []));
    code.push(Instr::copy(x, y));
    code.push(Instr::op("ret", [], [x]));

    let allocation = allocate(&mut code, 2)?;
    assert_eq!(allocation.location(&x), allocation.location(&y));
    assert_eq!(allocation.move_stats().coalesced, 1);

    assert_eq!(allocation.apply(&mut code)?, 1);
    assert_eq!(code.len(), 2);
    assert!(code.iter().all(|(_, instr)| !instr.is_copy));
    Ok(())
}

#[test]
fn complete_graph_spills_and_retries() -> Result<()> {
    // a, b, c, d are pairwise live at i3; with two registers the two values
    // used furthest from their definitions go to the stack.
    let vars: Vec<Variable> = (0..4).map(int).collect();
    let mut code = Code::new();
    for var in &vars {
        code.push(Instr::op("const", [*var], []));
    }
    code.push(Instr::op("use", [], [vars[2], vars[3]]));
    code.push(Instr::op("use", [], [vars[0], vars[1]]));

    let mut allocator =
        RegisterAllocator::new(GenericTarget::integer(2), AllocatorConfig::default());
    let allocation = allocator.allocate_code(&mut code)?;

    assert_eq!(allocation.rounds(), 2);
    assert_eq!(
        allocation.spilled(),
        &[
            VirtualVar::new(0, DataClass::Int64),
            VirtualVar::new(1, DataClass::Int64)
        ]
    );
    assert!(allocation.location(&vars[0]).is_some_and(|l| l.is_stack()));
    assert!(allocation.location(&vars[1]).is_some_and(|l| l.is_stack()));
    assert_ne!(allocation.location(&vars[0]), allocation.location(&vars[1]));
    assert!(allocation.location(&vars[2]).is_some_and(|l| l.is_register()));
    assert!(allocation.location(&vars[3]).is_some_and(|l| l.is_register()));
    assert_eq!(allocation.stack_slots(), 2);
    assert_eq!(allocator.target().stack_slots(), 2);

    // Two stores after the definitions and two loads before the last use.
    assert_eq!(code.len(), 10);
    assert!(code
        .iter()
        .all(|(_, instr)| !instr.mentions(&vars[0]) && !instr.mentions(&vars[1])));
    Ok(())
}

#[test]
fn single_legal_register_is_used() -> Result<()> {
    let target = GenericTarget::new("mixed")
        .register("r0", ClassSet::GENERAL)
        .register("r1", ClassSet::GENERAL)
        .register("f0", ClassSet::FLOAT);
    let f = Variable::from(VirtualVar::new(0, DataClass::Float64));
    let i = int(1);
    let mut code = Code::new();
    code.push(Instr::op("fconst", [f], []));
    code.push(Instr::op("const", [i], []));
    code.push(Instr::op("cvt", [i], [f, i]));
    code.push(Instr::op("ret", [], [i]));

    let mut allocator = RegisterAllocator::new(target, AllocatorConfig::default());
    let allocation = allocator.allocate_code(&mut code)?;
    assert_eq!(allocation.location(&f), Some(Location::Register(RegId(2))));
    assert_eq!(allocator.target().register_name(RegId(2)), Some("f0"));
    assert!(matches!(
        allocation.location(&i),
        Some(Location::Register(RegId(0 | 1)))
    ));
    Ok(())
}

#[test]
fn target_locations_are_precolored() -> Result<()> {
    // A fixed register operand stays where it is and repels overlapping values.
    let r0 = Variable::Physical(Location::Register(RegId(0)));
    let a = int(0);
    let mut code = Code::new();
    code.push(Instr::op("const", [r0], []));
    code.push(Instr::op("const", [a], []));
    code.push(Instr::op("add", [r0], [r0, a]));
    code.push(Instr::op("ret", [], [r0]));

    let allocation = allocate(&mut code, 2)?;
    assert_eq!(allocation.location(&r0), Some(Location::Register(RegId(0))));
    assert_eq!(allocation.location(&a), Some(Location::Register(RegId(1))));
    Ok(())
}

#[test]
fn copy_into_fixed_register_is_coalesced() -> Result<()> {
    // A return value copied into r1 is computed in r1 directly.
    let r1 = Variable::Physical(Location::Register(RegId(1)));
    let a = int(0);
    let mut code = Code::new();
    code.push(Instr::op("const", [a], []));
    code.push(Instr::copy(r1, a));
    code.push(Instr::op("ret", [], [r1]));

    let allocation = allocate(&mut code, 2)?;
    assert_eq!(allocation.location(&a), Some(Location::Register(RegId(1))));
    assert_eq!(allocation.apply(&mut code)?, 1);
    Ok(())
}
