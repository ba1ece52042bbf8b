//! Shared helpers used across the crate.

mod bitset;
mod dot;

pub use bitset::{BitSet, BitSetIter};
pub use dot::escape_dot;
