//! Machine instructions as seen by the register allocator.
//!
//! The allocator does not care what an instruction computes. It only needs the
//! operands it defines and uses, and whether it is a plain copy which can be
//! deleted once both sides end up in the same location.

use std::fmt;

use crate::ir::Variable;

/// Stable handle to an instruction inside a [`Code`](crate::ir::Code) arena.
///
/// Handles stay valid across insertions and removals of other instructions,
/// which is what allows spill code to be spliced in while liveness data still
/// refers to the original instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstrId(pub(crate) usize);

impl InstrId {
    /// Creates a handle from a raw arena index.
    #[must_use]
    #[inline]
    pub const fn new(index: usize) -> Self {
        InstrId(index)
    }

    /// Returns the raw arena index.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for InstrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "i{}", self.0)
    }
}

/// A single machine instruction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Instr {
    /// Target specific opcode name, only used for display
    pub mnemonic: String,
    /// Operands written by the instruction
    pub defs: Vec<Variable>,
    /// Operands read by the instruction
    pub uses: Vec<Variable>,
    /// `true` for a register-to-register copy with exactly one def and one use
    pub is_copy: bool,
}

impl Instr {
    /// Creates an ordinary instruction.
    pub fn op(
        mnemonic: impl Into<String>,
        defs: impl IntoIterator<Item = Variable>,
        uses: impl IntoIterator<Item = Variable>,
    ) -> Self {
        Instr {
            mnemonic: mnemonic.into(),
            defs: defs.into_iter().collect(),
            uses: uses.into_iter().collect(),
            is_copy: false,
        }
    }

    /// Creates a copy `dst := src`.
    pub fn copy(dst: impl Into<Variable>, src: impl Into<Variable>) -> Self {
        Instr {
            mnemonic: "mov".to_string(),
            defs: vec![dst.into()],
            uses: vec![src.into()],
            is_copy: true,
        }
    }

    /// Returns the `(dst, src)` pair of a well-formed copy.
    #[must_use]
    pub fn copy_operands(&self) -> Option<(Variable, Variable)> {
        match (self.is_copy, self.defs.as_slice(), self.uses.as_slice()) {
            (true, [dst], [src]) => Some((*dst, *src)),
            _ => None,
        }
    }

    /// Returns `true` if the instruction reads or writes `var`.
    #[must_use]
    pub fn mentions(&self, var: &Variable) -> bool {
        self.defs.contains(var) || self.uses.contains(var)
    }

    /// Replaces every occurrence of `from` by `to`, returning the number of
    /// operands changed.
    pub fn replace(&mut self, from: &Variable, to: Variable) -> usize {
        let mut changed = 0;
        for operand in self.defs.iter_mut().chain(self.uses.iter_mut()) {
            if operand == from {
                *operand = to;
                changed += 1;
            }
        }
        changed
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic)?;
        let mut first = true;
        for def in &self.defs {
            write!(f, "{} {def}", if first { "" } else { "," })?;
            first = false;
        }
        if !self.uses.is_empty() {
            write!(f, " <-")?;
            let mut first = true;
            for used in &self.uses {
                write!(f, "{} {used}", if first { "" } else { "," })?;
                first = false;
            }
        }
        Ok(())
    }
}
