//! Target descriptions.
//!
//! The allocator itself knows nothing about a particular machine. Everything it
//! needs is asked through the [`Target`] trait:
//!
//! - which physical locations exist for the current attempt (the registers
//!   followed by the current pool of stack slots)
//! - which of them may hold a value of a given [`DataClass`]
//! - how to reset and grow the stack-slot pool between attempts
//! - how to move a value between two locations, which is how spill loads and
//!   stores are synthesized
//!
//! Two implementations are provided: [`GenericTarget`], a configurable register
//! file used by tests and tools, and [`X86_64Target`].

mod generic;
mod x86_64;

pub use generic::GenericTarget;
pub use x86_64::{FrameLayout, X86_64Target, RBP, RSP};

use crate::{
    ir::{DataClass, Instr, Location, Variable},
    Result,
};

/// Description of the machine a register allocation is performed for.
///
/// A target owns its stack-slot pool, which is why allocation takes it by value
/// and [`allocate_all`](crate::regalloc::allocate_all) clones one per list.
///
/// # Contract
///
/// - [`Target::locations`] returns every location of the current attempt, each
///   exactly once, registers first. Its length is the number of colors `K`.
/// - [`Target::legal_locations`] returns a subset of [`Target::locations`]. For
///   a register candidate it returns the registers able to hold `class`, where
///   [`DataClass::Any`] is held by every register. For a variable that needs
///   memory it returns the stack slots of the class's size.
/// - [`Target::reset_stack`] keeps the first `keep` slots and drops the rest;
///   [`Target::grow_stack`] appends one slot and returns it.
pub trait Target {
    /// Returns a human-readable name for diagnostics.
    fn name(&self) -> &str;

    /// Returns every location available in the current attempt.
    fn locations(&self) -> Vec<Location>;

    /// Returns the locations a variable of `class` may be assigned to.
    fn legal_locations(&self, class: DataClass, needs_memory: bool) -> Vec<Location>;

    /// Returns the current number of stack slots.
    fn stack_slots(&self) -> usize;

    /// Truncates the stack-slot pool to its first `keep` slots.
    fn reset_stack(&mut self, keep: usize);

    /// Appends a stack slot sized for `class`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StackExhausted`](crate::Error::StackExhausted) if the
    /// target cannot address another slot.
    fn grow_stack(&mut self, class: DataClass) -> Result<Location>;

    /// Materializes `dst := src` for a value of `class`.
    fn emit_move(&self, dst: Variable, src: Variable, class: DataClass) -> Vec<Instr>;

    /// Returns the size in bytes of a value of `class`.
    fn size_of(&self, class: DataClass) -> u32;
}

impl<T: Target + ?Sized> Target for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn locations(&self) -> Vec<Location> {
        (**self).locations()
    }

    fn legal_locations(&self, class: DataClass, needs_memory: bool) -> Vec<Location> {
        (**self).legal_locations(class, needs_memory)
    }

    fn stack_slots(&self) -> usize {
        (**self).stack_slots()
    }

    fn reset_stack(&mut self, keep: usize) {
        (**self).reset_stack(keep);
    }

    fn grow_stack(&mut self, class: DataClass) -> Result<Location> {
        (**self).grow_stack(class)
    }

    fn emit_move(&self, dst: Variable, src: Variable, class: DataClass) -> Vec<Instr> {
        (**self).emit_move(dst, src, class)
    }

    fn size_of(&self, class: DataClass) -> u32 {
        (**self).size_of(class)
    }
}
