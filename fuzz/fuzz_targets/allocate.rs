#![no_main]

use libfuzzer_sys::fuzz_target;
use regcolor::prelude::*;

/// Sixteen variables; the last four are floats.
fn var(byte: u8) -> Variable {
    let id = byte & 0x0f;
    let class = if id < 12 {
        DataClass::Int64
    } else {
        DataClass::Float64
    };
    VirtualVar::new(u32::from(id), class).into()
}

fuzz_target!(|data: &[u8]| {
    let Some((&header, body)) = data.split_first() else {
        return;
    };

    let mut code = Code::new();
    let mut ids = Vec::new();
    for chunk in body.chunks_exact(3) {
        let (op, a, b) = (chunk[0], chunk[1], chunk[2]);
        let id = match op % 6 {
            0 => code.push(Instr::op("const", [var(a)], [])),
            1 => code.push(Instr::copy(var(a), var(b))),
            2 => code.push(Instr::op("add", [var(a)], [var(a), var(b)])),
            3 => code.push(Instr::op("use", [], [var(a), var(b)])),
            4 => code.push_terminator(Instr::op("br", [], [var(a)])),
            _ => {
                if let (Some(&from), Some(&to)) = (
                    ids.get(usize::from(a) % ids.len().max(1)),
                    ids.get(usize::from(b) % ids.len().max(1)),
                ) {
                    code.add_branch(from, to);
                }
                continue;
            }
        };
        ids.push(id);
    }

    let target = GenericTarget::new("fuzz")
        .register("r0", ClassSet::GENERAL)
        .register("r1", ClassSet::GENERAL)
        .register("f0", ClassSet::FLOAT)
        .register("f1", ClassSet::FLOAT);
    let target = (0..header % 4).fold(target, |t, i| {
        t.register(format!("r{}", i + 2), ClassSet::GENERAL)
    });

    let mut allocator = RegisterAllocator::new(target, AllocatorConfig::strict());
    if let Ok(allocation) = allocator.allocate_code(&mut code) {
        allocation.apply(&mut code).unwrap();
        assert!(code
            .iter()
            .all(|(_, instr)| instr.defs.iter().chain(&instr.uses).all(|v| !v.is_virtual())));
    }
});
