//! Program analyses the register allocator depends on.
//!
//! - [`liveness`] - per-instruction live-out sets plus def/use maps, recomputed
//!   after every spill rewrite
//! - [`distance`] - control-flow distances used to rank spill candidates

pub mod distance;
pub mod liveness;

pub use distance::distances_from;
pub use liveness::Liveness;
