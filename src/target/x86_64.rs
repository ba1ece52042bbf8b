//! x86-64 target description.
//!
//! Integer, object and pointer values live in the fourteen general purpose
//! registers that are not reserved for the frame (`rsp` and `rbp`). Floating
//! point values live in `xmm0` to `xmm15`. Native integers are 64 bits wide.
//!
//! Stack slots are sized by the class they were created for. After allocation
//! [`X86_64Target::frame_layout`] turns every slot into an `rbp`-relative
//! memory operand, 8-byte aligned and growing downward below the locals area.

use crate::{
    ir::{ClassSet, DataClass, Instr, Location, RegId, Variable},
    target::Target,
    Error, Result,
};

const GENERAL: [&str; 14] = [
    "rax", "rbx", "rcx", "rdx", "rdi", "rsi", "r8", "r9", "r10", "r11", "r12", "r13", "r14",
    "r15",
];
const XMM_COUNT: u16 = 16;

/// Frame pointer, used as the base of every stack slot.
pub const RBP: RegId = RegId(30);
/// Stack pointer.
pub const RSP: RegId = RegId(31);

/// Mapping from stack slots to their final frame addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameLayout {
    slots: Vec<(Location, Location)>,
    spill_area: u32,
}

impl FrameLayout {
    /// Returns the `rbp`-relative operand for a stack slot.
    #[must_use]
    pub fn address_of(&self, slot: Location) -> Option<Location> {
        self.slots
            .iter()
            .find(|(from, _)| *from == slot)
            .map(|(_, to)| *to)
    }

    /// Returns the bytes reserved below `rbp`, locals included.
    #[must_use]
    pub const fn frame_size(&self) -> u32 {
        self.spill_area
    }

    /// Iterates over `(stack slot, frame address)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &(Location, Location)> {
        self.slots.iter()
    }
}

/// The x86-64 register file.
#[derive(Debug, Clone)]
pub struct X86_64Target {
    stack: Vec<Location>,
    value_type_size: u32,
}

impl Default for X86_64Target {
    fn default() -> Self {
        Self::new()
    }
}

impl X86_64Target {
    /// Creates the target with an empty stack pool.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stack: Vec::new(),
            value_type_size: 16,
        }
    }

    /// Sets the slot size used for value types which must live in memory.
    #[must_use]
    pub fn with_value_type_size(mut self, size: u32) -> Self {
        self.value_type_size = size;
        self
    }

    /// Returns the assembler name of a register.
    #[must_use]
    pub fn register_name(reg: RegId) -> Option<&'static str> {
        const XMM: [&str; 16] = [
            "xmm0", "xmm1", "xmm2", "xmm3", "xmm4", "xmm5", "xmm6", "xmm7", "xmm8", "xmm9",
            "xmm10", "xmm11", "xmm12", "xmm13", "xmm14", "xmm15",
        ];
        let index = usize::from(reg.0);
        match reg {
            RBP => Some("rbp"),
            RSP => Some("rsp"),
            _ if index < GENERAL.len() => Some(GENERAL[index]),
            _ => XMM.get(index - GENERAL.len()).copied(),
        }
    }

    /// Assigns every stack slot an address below the `locals` bytes already
    /// reserved for local variables.
    #[must_use]
    pub fn frame_layout(&self, locals: u32) -> FrameLayout {
        let mut offset = -i64::from(locals);
        let mut slots = Vec::with_capacity(self.stack.len());
        for slot in &self.stack {
            if let Location::Stack { size, .. } = slot {
                offset -= i64::from(size.next_multiple_of(8));
                let offset = i32::try_from(offset).unwrap_or(i32::MIN);
                slots.push((*slot, Location::ContentsOf { base: RBP, offset }));
            }
        }
        FrameLayout {
            slots,
            spill_area: u32::try_from(-offset).unwrap_or(u32::MAX),
        }
    }

    fn registers() -> impl Iterator<Item = (Location, ClassSet)> {
        let general = (0..GENERAL.len() as u16).map(|i| (RegId(i), ClassSet::GENERAL));
        let xmm = (0..XMM_COUNT).map(|i| (RegId(GENERAL.len() as u16 + i), ClassSet::FLOAT));
        general
            .chain(xmm)
            .map(|(reg, classes)| (Location::Register(reg), classes))
    }
}

impl Target for X86_64Target {
    fn name(&self) -> &str {
        "x86_64"
    }

    fn locations(&self) -> Vec<Location> {
        Self::registers()
            .map(|(loc, _)| loc)
            .chain(self.stack.iter().copied())
            .collect()
    }

    fn legal_locations(&self, class: DataClass, needs_memory: bool) -> Vec<Location> {
        if needs_memory {
            let wanted = self.size_of(class);
            return self
                .stack
                .iter()
                .filter(|loc| matches!(loc, Location::Stack { size, .. } if *size == wanted))
                .copied()
                .collect();
        }
        Self::registers()
            .filter(|(_, classes)| classes.holds(class))
            .map(|(loc, _)| loc)
            .collect()
    }

    fn stack_slots(&self) -> usize {
        self.stack.len()
    }

    fn reset_stack(&mut self, keep: usize) {
        self.stack.truncate(keep);
    }

    fn grow_stack(&mut self, class: DataClass) -> Result<Location> {
        let slot = u32::try_from(self.stack.len()).map_err(|_| Error::StackExhausted { class })?;
        let loc = Location::Stack {
            slot,
            size: self.size_of(class),
        };
        self.stack.push(loc);
        Ok(loc)
    }

    fn emit_move(&self, dst: Variable, src: Variable, class: DataClass) -> Vec<Instr> {
        let mut instr = Instr::copy(dst, src);
        instr.mnemonic = match class {
            DataClass::Float32 => "movss",
            DataClass::Float64 => "movsd",
            DataClass::Int32 => "mov32",
            _ => "mov",
        }
        .to_string();
        vec![instr]
    }

    fn size_of(&self, class: DataClass) -> u32 {
        match class {
            DataClass::Int32 | DataClass::Float32 => 4,
            DataClass::ValueType => self.value_type_size,
            DataClass::Int64
            | DataClass::NativeInt
            | DataClass::Float64
            | DataClass::Object
            | DataClass::Reference
            | DataClass::Any => 8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_classes() {
        let target = X86_64Target::new();
        assert_eq!(target.locations().len(), 30);

        let ints = target.legal_locations(DataClass::NativeInt, false);
        assert_eq!(ints.len(), 14);
        assert_eq!(ints[0], Location::Register(RegId(0)));

        let floats = target.legal_locations(DataClass::Float32, false);
        assert_eq!(floats.len(), 16);
        assert_eq!(floats[0], Location::Register(RegId(14)));

        assert!(target.legal_locations(DataClass::ValueType, false).is_empty());
        assert_eq!(target.legal_locations(DataClass::Any, false).len(), 30);
    }

    #[test]
    fn test_register_names() {
        assert_eq!(X86_64Target::register_name(RegId(0)), Some("rax"));
        assert_eq!(X86_64Target::register_name(RegId(13)), Some("r15"));
        assert_eq!(X86_64Target::register_name(RegId(14)), Some("xmm0"));
        assert_eq!(X86_64Target::register_name(RegId(29)), Some("xmm15"));
        assert_eq!(X86_64Target::register_name(RBP), Some("rbp"));
        assert_eq!(X86_64Target::register_name(RegId(40)), None);
    }

    #[test]
    fn test_sized_stack_slots() {
        let mut target = X86_64Target::new();
        let small = target.grow_stack(DataClass::Int32).unwrap();
        let wide = target.grow_stack(DataClass::Float64).unwrap();
        let vt = target.grow_stack(DataClass::ValueType).unwrap();

        assert_eq!(small, Location::Stack { slot: 0, size: 4 });
        assert_eq!(target.legal_locations(DataClass::Float32, true), vec![small]);
        assert_eq!(target.legal_locations(DataClass::Object, true), vec![wide]);
        assert_eq!(target.legal_locations(DataClass::ValueType, true), vec![vt]);
    }

    #[test]
    fn test_frame_layout() {
        let mut target = X86_64Target::new();
        let a = target.grow_stack(DataClass::Int32).unwrap();
        let b = target.grow_stack(DataClass::Int64).unwrap();
        let c = target.grow_stack(DataClass::ValueType).unwrap();

        let frame = target.frame_layout(16);
        assert_eq!(
            frame.address_of(a),
            Some(Location::ContentsOf {
                base: RBP,
                offset: -24
            })
        );
        assert_eq!(
            frame.address_of(b),
            Some(Location::ContentsOf {
                base: RBP,
                offset: -32
            })
        );
        assert_eq!(
            frame.address_of(c),
            Some(Location::ContentsOf {
                base: RBP,
                offset: -48
            })
        );
        assert_eq!(frame.frame_size(), 48);
        assert_eq!(frame.iter().count(), 3);
    }

    #[test]
    fn test_float_moves() {
        let target = X86_64Target::new();
        let xmm0 = Variable::Physical(Location::Register(RegId(14)));
        let slot = Variable::Physical(Location::Stack { slot: 0, size: 8 });
        let moves = target.emit_move(slot, xmm0, DataClass::Float64);
        assert_eq!(moves[0].mnemonic, "movsd");
        assert!(moves[0].is_copy);
    }
}
