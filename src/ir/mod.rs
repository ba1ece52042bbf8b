//! Instruction-level data model consumed by the register allocator.
//!
//! The allocator sits at the very end of the backend pipeline. Instruction
//! selection hands it a list of machine instructions whose operands are either
//! virtual variables or fixed physical locations, together with explicit
//! control-flow edges. This module defines that contract:
//!
//! - [`variable`] - [`Variable`], [`VirtualVar`], [`Location`] and the data classes
//!   which decide what a location may hold
//! - [`instr`] - [`Instr`], a machine instruction reduced to its defs and uses
//! - [`code`] - [`Code`], an editable instruction list into which spill code can
//!   be spliced

pub mod code;
pub mod instr;
pub mod variable;

pub use code::{Code, CodeIter};
pub use instr::{Instr, InstrId};
pub use variable::{ClassSet, DataClass, Location, RegId, Variable, VirtualVar};
