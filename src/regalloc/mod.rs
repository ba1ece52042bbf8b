//! Iterated register coalescing.
//!
//! This module assigns every virtual variable of a [`Code`](crate::ir::Code)
//! listing a physical [`Location`](crate::ir::Location) following George and
//! Appel's iterated register coalescing, an extension of Chaitin and Briggs'
//! optimistic graph coloring.
//!
//! # Architecture
//!
//! One allocation attempt is a *round*:
//!
//! - **Build**: create one node per target location and per virtual
//!   variable, add class-constraint and interference edges, register copies
//!   as coalescing candidates
//! - **Engine**: simplify, coalesce, freeze and select potential
//!   spills until the graph is empty
//! - **Color**: pop the select stack and assign the lowest legal
//!   color not used by a neighbor
//! - **Spill**: if anything found no color, give it a stack slot,
//!   insert loads and stores through fresh temporaries and start a new round
//!
//! The per-round state lives in dedicated stores: the interference graph,
//! the move registry, the node worklists and the alias map. Rounds are driven by
//! [`RegisterAllocator`], which returns an [`Allocation`].
//!
//! # Determinism
//!
//! Every worklist hands out its lowest member first and spill ties go to the
//! lowest node, so the same input always yields the same allocation.

mod alias;
mod allocator;
mod build;
mod color;
mod engine;
mod graph;
mod moves;
mod spill;
mod validate;
mod worklist;

pub use allocator::{allocate_all, Allocation, RegisterAllocator};
pub use moves::MoveStats;

pub(crate) use graph::NodeId;
