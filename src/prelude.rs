//! # regcolor Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the regcolor library. Import this module to get quick access to the essential
//! types for building instruction lists and allocating them.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all regcolor operations
pub use crate::Error;

/// The result type used throughout regcolor
pub use crate::Result;

/// Configuration for a register allocation
pub use crate::AllocatorConfig;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// The allocator, its result, and parallel allocation of independent lists
pub use crate::regalloc::{allocate_all, Allocation, RegisterAllocator};

// ================================================================================================
// Instruction Model
// ================================================================================================

/// Operands, their classes and the locations they are assigned to
pub use crate::ir::{ClassSet, DataClass, Location, RegId, Variable, VirtualVar};

/// Instructions and the editable instruction list
pub use crate::ir::{Code, Instr, InstrId};

// ================================================================================================
// Analysis
// ================================================================================================

/// Liveness consumed by the allocator
pub use crate::analysis::Liveness;

// ================================================================================================
// Targets
// ================================================================================================

/// The target description trait and the bundled targets
pub use crate::target::{GenericTarget, Target, X86_64Target};
