// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # regcolor
//!
//! [![Crates.io](https://img.shields.io/crates/v/regcolor.svg)](https://crates.io/crates/regcolor)
//! [![Documentation](https://docs.rs/regcolor/badge.svg)](https://docs.rs/regcolor)
//! [![License](https://img.shields.io/badge/license-Apache--2.0-blue.svg)](https://www.apache.org/licenses/LICENSE-2.0)
//!
//! A graph-coloring register allocator for compiler backends. `regcolor` maps the virtual
//! variables of a machine-level instruction list onto the registers and stack slots of a
//! target, using iterated register coalescing: Chaitin's interference graph, Briggs'
//! optimistic coloring, and George and Appel's conservative coalescing of copies.
//!
//! ## Features
//!
//! - **Iterated coalescing** - Copies are removed whenever Briggs' or George's test shows it is safe
//! - **Data classes** - Integer, float and memory-only values are kept in compatible locations
//! - **Spilling** - Uncolorable values get a stack slot, loads and stores are inserted automatically
//! - **Retargetable** - Every machine detail is asked through the [`target::Target`] trait
//! - **Deterministic** - The same input always produces the same allocation
//! - **Parallel** - Independent functions can be allocated concurrently
//!
//! ## Quick Start
//!
//! ```rust
//! use regcolor::prelude::*;
//!
//! let mut code = Code::new();
//! let a = Variable::from(code.fresh_var(DataClass::Int64));
//! let b = Variable::from(code.fresh_var(DataClass::Int64));
//! code.push(Instr::op("const", [a], []));
//! code.push(Instr::op("const", [b], []));
//! code.push(Instr::op("add", [a], [a, b]));
//! code.push(Instr::op("ret", [], [a]));
//!
//! let mut allocator = RegisterAllocator::new(X86_64Target::new(), AllocatorConfig::default());
//! let allocation = allocator.allocate_code(&mut code)?;
//! assert_ne!(allocation.location(&a), allocation.location(&b));
//!
//! allocation.apply(&mut code)?;
//! println!("{code}");
//! # Ok::<(), regcolor::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`ir`] - Variables, locations, instructions and the editable instruction list
//! - [`analysis`] - Liveness and control-flow distances the allocator consumes
//! - [`target`] - Machine descriptions: register files, stack slots, move synthesis
//! - [`regalloc`] - The allocator itself
//! - [`prelude`] - Convenient re-exports of commonly used types
//! - [`Error`] and [`Result`] - Error handling
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T>`]. Ordinary spilling is not an error. Errors are
//! reserved for inconsistent input (liveness that does not match the code, malformed copies),
//! broken target descriptions (a class without any legal location, an exhausted stack) and
//! allocations that fail to converge.
//!
//! ## Logging
//!
//! The allocator reports progress through the [`log`](https://docs.rs/log) facade: one `debug`
//! record per round and per spilled variable, `trace` records for individual simplify,
//! coalesce, freeze and spill decisions.
//!
//! ## Development and Testing
//!
//! ### Fuzzing
//!
//! ```bash
//! cargo +nightly fuzz run allocate
//! ```
//!
//! ### Testing
//!
//! ```bash
//! cargo test
//! cargo bench
//! ```

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit- and integration-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// This module provides a curated selection of the most frequently used types
/// from across the regcolor library, allowing for convenient glob imports.
///
/// # Example
///
/// ```rust
/// use regcolor::prelude::*;
///
/// let target = GenericTarget::integer(4);
/// let allocator = RegisterAllocator::new(target, AllocatorConfig::fast());
/// assert_eq!(allocator.target().locations().len(), 4);
/// ```
pub mod prelude;

/// Analyses over an instruction list.
///
/// The allocator needs two facts about the code it works on: which variables
/// are live after every instruction, and how far apart two instructions are
/// along control flow.
///
/// # Key Types
///
/// - [`analysis::Liveness`] - Per-instruction live-out sets plus def and use sites
/// - [`analysis::distances_from`] - Breadth-first control-flow distances
pub mod analysis;

/// Allocator configuration.
pub mod config;

/// The instruction-level data model shared by the allocator and its callers.
///
/// # Key Types
///
/// - [`ir::Variable`] - An operand, either a [`ir::VirtualVar`] or a physical [`ir::Location`]
/// - [`ir::DataClass`] - Which kind of location a virtual variable needs
/// - [`ir::Instr`] - One instruction with its defs and uses
/// - [`ir::Code`] - An editable instruction list with control-flow edges
pub mod ir;

/// Iterated register coalescing.
///
/// # Key Types
///
/// - [`regalloc::RegisterAllocator`] - Runs allocation rounds against one target
/// - [`regalloc::Allocation`] - The resulting location of every variable
/// - [`regalloc::allocate_all`] - Allocates independent instruction lists in parallel
///
/// # Examples
///
/// ```rust
/// use regcolor::prelude::*;
///
/// let mut code = Code::new();
/// let vars: Vec<Variable> = (0..3).map(|_| code.fresh_var(DataClass::Int32).into()).collect();
/// for var in &vars {
///     code.push(Instr::op("const", [*var], []));
/// }
/// code.push(Instr::op("add", [], [vars[1], vars[2]]));
/// code.push(Instr::op("ret", [], [vars[0]]));
///
/// // Three values live at once but only two registers: the one used last spills.
/// let mut allocator = RegisterAllocator::new(GenericTarget::integer(2), AllocatorConfig::default());
/// let allocation = allocator.allocate_code(&mut code)?;
/// assert_eq!(allocation.spilled().len(), 1);
/// assert_eq!(allocation.rounds(), 2);
/// # Ok::<(), regcolor::Error>(())
/// ```
pub mod regalloc;

/// Machine descriptions.
pub mod target;

/// Small shared data structures and helpers.
pub mod utils;

/// `regcolor` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
/// This is used consistently throughout the crate for all fallible operations.
pub type Result<T> = std::result::Result<T, Error>;

/// `regcolor` Error type
///
/// The main error type for all operations in this crate.
///
/// # Examples
///
/// ```rust
/// use regcolor::{prelude::*, Error};
///
/// let mut code = Code::new();
/// let f = Variable::from(code.fresh_var(DataClass::Float64));
/// code.push(Instr::op("fconst", [f], []));
/// code.push(Instr::op("ret", [], [f]));
///
/// // No register of this target can hold a float.
/// let mut allocator = RegisterAllocator::new(GenericTarget::integer(4), AllocatorConfig::default());
/// match allocator.allocate_code(&mut code) {
///     Err(Error::NoLegalLocation { class, .. }) => assert_eq!(class, DataClass::Float64),
///     other => panic!("unexpected: {other:?}"),
/// }
/// ```
pub use error::Error;

/// Configuration for a register allocation
pub use config::AllocatorConfig;
