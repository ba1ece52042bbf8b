//! The allocation driver and its result.
//!
//! [`RegisterAllocator`] repeats build, simplify, coalesce, freeze, select and
//! color until a round completes without actual spills. Spilled variables are
//! rewritten to go through the stack and the next round starts over on the
//! rewritten code. The stack slots handed out by earlier rounds stay reserved,
//! so spilled values never move once placed.
//!
//! # Examples
//!
//! ```rust
//! use regcolor::prelude::*;
//!
//! let mut code = Code::new();
//! let a = Variable::from(code.fresh_var(DataClass::Int32));
//! let b = Variable::from(code.fresh_var(DataClass::Int32));
//! code.push(Instr::op("const", [a], []));
//! code.push(Instr::copy(b, a));
//! code.push(Instr::op("ret", [], [b]));
//!
//! let mut allocator = RegisterAllocator::new(GenericTarget::integer(2), AllocatorConfig::default());
//! let allocation = allocator.allocate_code(&mut code)?;
//! assert_eq!(allocation.location(&a), allocation.location(&b));
//!
//! // The copy became `r0 := r0` and is dropped.
//! assert_eq!(allocation.apply(&mut code)?, 1);
//! # Ok::<(), regcolor::Error>(())
//! ```

use std::collections::HashMap;

use log::debug;
use rayon::prelude::*;

use crate::{
    analysis::Liveness,
    config::AllocatorConfig,
    ir::{Code, Location, Variable, VirtualVar},
    regalloc::{
        build::Round,
        graph::NodeId,
        moves::MoveStats,
        spill::{rewrite_program, SpillRanker},
    },
    target::Target,
    Error, Result,
};

/// Graph-coloring register allocator bound to one target.
///
/// The target is owned because its stack-slot pool is part of the allocation
/// state. After [`RegisterAllocator::allocate`] returns, the target's pool
/// holds exactly the slots the allocation uses.
#[derive(Debug, Clone)]
pub struct RegisterAllocator<T: Target> {
    target: T,
    config: AllocatorConfig,
}

impl<T: Target> RegisterAllocator<T> {
    /// Creates an allocator for `target`.
    pub fn new(target: T, config: AllocatorConfig) -> Self {
        Self { target, config }
    }

    /// Returns the target.
    pub fn target(&self) -> &T {
        &self.target
    }

    /// Returns the configuration.
    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    /// Consumes the allocator, returning the target with its final stack pool.
    pub fn into_target(self) -> T {
        self.target
    }

    /// Computes liveness and allocates `code`.
    ///
    /// # Errors
    ///
    /// See [`RegisterAllocator::allocate`].
    pub fn allocate_code(&mut self, code: &mut Code) -> Result<Allocation> {
        let liveness = Liveness::compute(code);
        self.allocate(code, liveness)
    }

    /// Allocates `code` using the given liveness for the first round.
    ///
    /// Spill code is inserted into `code` in place. Liveness for later rounds
    /// is recomputed from the rewritten code.
    ///
    /// # Errors
    ///
    /// - [`Error::NoLegalLocation`] if the target has no location for a class
    /// - [`Error::MissingDefinition`] / [`Error::UnreachableUse`] on liveness
    ///   inconsistent with the code
    /// - [`Error::StackExhausted`] if the target runs out of stack slots
    /// - [`Error::RegisterPressure`] if an instruction needs more registers
    ///   at once than the target has
    /// - [`Error::RoundLimit`] if no round succeeds within the configured limit
    /// - [`Error::Validation`] if validation is enabled and the result is unsound
    /// - [`Error::Malformed`] on operands or copies the allocator cannot handle
    pub fn allocate(&mut self, code: &mut Code, liveness: Liveness) -> Result<Allocation> {
        let mut liveness = liveness;
        let mut retained: Vec<(VirtualVar, Location)> = Vec::new();
        let mut temporaries = HashMap::new();

        for number in 1..=self.config.max_rounds {
            self.prepare_stack(retained.len(), &liveness)?;
            let mut round = Round::build(&self.target, code, &liveness, self.config.coalesce)?;

            let mut ranker = SpillRanker::new(code, &liveness, &temporaries);
            round.run(|r| ranker.choose(r))?;
            round.assign_colors();

            let spilled = round.spilled_nodes();
            let stats = round.moves.stats();
            debug!(
                "round {}: {} nodes, {} spilled, {} coalesced, {} constrained, {} frozen",
                number,
                round.nodes.len() - round.k,
                spilled.len(),
                stats.coalesced,
                stats.constrained,
                stats.frozen
            );

            if spilled.is_empty() {
                if self.config.validate {
                    round.validate(&liveness)?;
                }
                return Allocation::collect(
                    &round,
                    retained,
                    number,
                    self.target.stack_slots(),
                );
            }

            let mut vars = Vec::with_capacity(spilled.len());
            for node in spilled {
                let var = round
                    .nodes
                    .virtual_var(node)
                    .ok_or_else(|| malformed_error!("precolored {} was spilled", node))?;
                if var.needs_memory() {
                    return Err(Error::StackExhausted { class: var.class() });
                }
                vars.push(var);
            }

            // Spilling a spill temporary again recreates the same live range.
            if vars.iter().all(|var| temporaries.contains_key(var)) {
                if let Some((var, &instr)) = vars
                    .first()
                    .and_then(|var| temporaries.get(var).map(|site| (var, site)))
                {
                    debug!("round {}: only spill temporaries left to spill", number);
                    return Err(Error::RegisterPressure {
                        instr,
                        class: var.class(),
                    });
                }
            }

            self.target.reset_stack(retained.len());
            let slots = rewrite_program(
                code,
                &mut self.target,
                &liveness,
                &vars,
                &mut temporaries,
            )?;
            retained.extend(slots);
            liveness = Liveness::compute(code);
        }

        Err(Error::RoundLimit(self.config.max_rounds))
    }

    /// Renders the interference graph of a first round over `code` in
    /// Graphviz DOT format.
    ///
    /// # Errors
    ///
    /// Fails like the build phase of [`RegisterAllocator::allocate`].
    pub fn interference_dot(&mut self, code: &Code) -> Result<String> {
        let liveness = Liveness::compute(code);
        self.prepare_stack(0, &liveness)?;
        let round = Round::build(&self.target, code, &liveness, self.config.coalesce)?;
        Ok(round.graph.to_dot(|node| round.var(node).to_string()))
    }

    /// Keeps the retained spill slots and adds one slot per variable that
    /// must live in memory.
    fn prepare_stack(&mut self, retained: usize, liveness: &Liveness) -> Result<()> {
        self.target.reset_stack(retained);
        for var in liveness
            .virtual_variables()
            .into_iter()
            .filter(VirtualVar::needs_memory)
        {
            self.target.grow_stack(var.class())?;
        }
        Ok(())
    }
}

/// Allocates independent instruction lists in parallel.
///
/// Every list gets its own allocator and its own clone of `target`. Results are
/// returned in input order.
pub fn allocate_all<T>(
    codes: &mut [Code],
    target: &T,
    config: AllocatorConfig,
) -> Vec<Result<Allocation>>
where
    T: Target + Clone + Send + Sync,
{
    codes
        .par_iter_mut()
        .map(|code| RegisterAllocator::new(target.clone(), config).allocate_code(code))
        .collect()
}

/// The location of every variable after a successful allocation.
#[derive(Debug, Clone, Default)]
pub struct Allocation {
    locations: HashMap<VirtualVar, Location>,
    spilled: Vec<VirtualVar>,
    rounds: usize,
    stack_slots: usize,
    moves: MoveStats,
}

impl Allocation {
    fn collect(
        round: &Round,
        retained: Vec<(VirtualVar, Location)>,
        rounds: usize,
        stack_slots: usize,
    ) -> Result<Self> {
        let mut locations = HashMap::with_capacity(round.nodes.len() + retained.len());
        for (node, var) in round.nodes.virtual_nodes() {
            let location = round.color[node.0]
                .and_then(|color| round.var(NodeId(color)).as_physical())
                .ok_or_else(|| malformed_error!("{} left without a location", var))?;
            locations.insert(var, location);
        }

        let spilled = retained.iter().map(|(var, _)| *var).collect();
        locations.extend(retained);

        Ok(Self {
            locations,
            spilled,
            rounds,
            stack_slots,
            moves: round.moves.stats(),
        })
    }

    /// Returns the location of `var`. Physical variables are their own
    /// location.
    #[must_use]
    pub fn location(&self, var: &Variable) -> Option<Location> {
        match var {
            Variable::Virtual(v) => self.locations.get(v).copied(),
            Variable::Physical(loc) => Some(*loc),
        }
    }

    /// Returns `true` if `var` was spilled by a rewrite round.
    #[must_use]
    pub fn is_spilled(&self, var: &VirtualVar) -> bool {
        self.spilled.contains(var)
    }

    /// Returns the spilled variables in spill order.
    #[must_use]
    pub fn spilled(&self) -> &[VirtualVar] {
        &self.spilled
    }

    /// Returns the number of rounds needed.
    #[must_use]
    pub const fn rounds(&self) -> usize {
        self.rounds
    }

    /// Returns the number of stack slots used.
    #[must_use]
    pub const fn stack_slots(&self) -> usize {
        self.stack_slots
    }

    /// Returns the move classification of the final round.
    #[must_use]
    pub const fn move_stats(&self) -> MoveStats {
        self.moves
    }

    /// Returns the number of virtual variables with a location.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    /// Returns `true` if no virtual variable was allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Iterates over every virtual variable and its location, in no
    /// particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&VirtualVar, &Location)> {
        self.locations.iter()
    }

    /// Replaces every virtual operand in `code` by its location and removes
    /// copies whose source and destination ended up identical.
    ///
    /// Returns the number of copies removed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] if `code` mentions a virtual variable
    /// this allocation has no location for.
    pub fn apply(&self, code: &mut Code) -> Result<usize> {
        let mut redundant = Vec::new();
        for id in code.ids() {
            let Some(instr) = code.get_mut(id) else {
                continue;
            };
            for operand in instr.defs.iter_mut().chain(instr.uses.iter_mut()) {
                if let Variable::Virtual(var) = *operand {
                    let location = self
                        .locations
                        .get(&var)
                        .ok_or_else(|| malformed_error!("{} in {} has no location", var, id))?;
                    *operand = Variable::Physical(*location);
                }
            }
            if matches!(instr.copy_operands(), Some((dst, src)) if dst == src) {
                redundant.push(id);
            }
        }

        for &id in &redundant {
            code.remove(id);
        }
        Ok(redundant.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ir::{DataClass, Instr},
        target::GenericTarget,
        test::{copy_pair, disjoint_chain, four_live, int as virt},
    };

    fn allocator(registers: u16) -> RegisterAllocator<GenericTarget> {
        RegisterAllocator::new(GenericTarget::integer(registers), AllocatorConfig::default())
    }

    #[test]
    fn test_disjoint_values_share_a_register() {
        let mut code = disjoint_chain();
        let allocation = allocator(2).allocate_code(&mut code).unwrap();
        assert_eq!(allocation.rounds(), 1);
        assert_eq!(allocation.location(&virt(0)), allocation.location(&virt(2)));
        assert_ne!(allocation.location(&virt(0)), allocation.location(&virt(1)));
    }

    #[test]
    fn test_copy_is_removed() {
        let mut code = copy_pair();
        let allocation = allocator(2).allocate_code(&mut code).unwrap();
        assert_eq!(allocation.move_stats().coalesced, 1);
        assert_eq!(allocation.apply(&mut code).unwrap(), 1);
        assert_eq!(code.len(), 2);
    }

    #[test]
    fn test_spill_retry_converges() {
        let mut code = four_live();
        let mut allocator = allocator(2);
        let allocation = allocator.allocate_code(&mut code).unwrap();
        assert_eq!(allocation.rounds(), 2);
        assert_eq!(allocation.spilled().len(), 2);
        assert!(allocation.is_spilled(&VirtualVar::new(0, DataClass::Int64)));
        assert!(allocation.is_spilled(&VirtualVar::new(1, DataClass::Int64)));
        assert_eq!(allocator.target().stack_slots(), 2);
    }

    #[test]
    fn test_too_many_operands_fail_fast() {
        let mut code = Code::new();
        code.push(Instr::op("const", [virt(0)], []));
        code.push(Instr::op("const", [virt(1)], []));
        code.push(Instr::op("const", [virt(2)], []));
        let sum = code.push(Instr::op("use3", [], [virt(0), virt(1), virt(2)]));

        let err = allocator(2).allocate_code(&mut code).unwrap_err();
        assert!(matches!(
            err,
            Error::RegisterPressure { instr, class: DataClass::Int64 } if instr == sum
        ));
        // one store and one load per original variable
        assert!(code.len() <= 10);
    }

    #[test]
    fn test_three_operands_fit_three_registers() {
        let mut code = Code::new();
        code.push(Instr::op("const", [virt(0)], []));
        code.push(Instr::op("const", [virt(1)], []));
        code.push(Instr::op("const", [virt(2)], []));
        code.push(Instr::op("use3", [], [virt(0), virt(1), virt(2)]));

        let allocation = allocator(3).allocate_code(&mut code).unwrap();
        assert_eq!(allocation.rounds(), 1);
        assert!(allocation.spilled().is_empty());
    }

    #[test]
    fn test_single_round() {
        let mut code = Code::new();
        code.push(Instr::op("const", [virt(0)], []));
        code.push(Instr::op("ret", [], [virt(0)]));

        let allocation = allocator(1).allocate_code(&mut code).unwrap();
        assert_eq!(allocation.rounds(), 1);
        assert_eq!(allocation.len(), 1);
        assert!(allocation.spilled().is_empty());
        assert_eq!(
            allocation.location(&virt(0)),
            Some(Location::Register(crate::ir::RegId(0)))
        );
    }

    #[test]
    fn test_physical_maps_to_itself() {
        let allocation = Allocation::default();
        let loc = Location::Stack { slot: 3, size: 8 };
        assert_eq!(allocation.location(&Variable::Physical(loc)), Some(loc));
        assert_eq!(allocation.location(&virt(9)), None);
    }

    #[test]
    fn test_memory_variable_gets_a_slot() {
        let mut code = Code::new();
        let big = Variable::from(VirtualVar::in_memory(0, DataClass::ValueType));
        code.push(Instr::op("init", [big], []));
        code.push(Instr::op("ret", [], [big]));

        let mut allocator =
            RegisterAllocator::new(GenericTarget::integer(2), AllocatorConfig::default());
        let allocation = allocator.allocate_code(&mut code).unwrap();
        assert!(allocation.location(&big).is_some_and(|loc| loc.is_stack()));
        assert_eq!(allocation.stack_slots(), 1);
        assert_eq!(allocator.into_target().stack_slots(), 1);
    }

    #[test]
    fn test_stack_limit_is_reported() {
        let mut code = Code::new();
        let big = Variable::from(VirtualVar::in_memory(0, DataClass::ValueType));
        code.push(Instr::op("init", [big], []));
        code.push(Instr::op("ret", [], [big]));

        let target = GenericTarget::integer(2).with_stack_limit(0);
        let mut allocator = RegisterAllocator::new(target, AllocatorConfig::default());
        let err = allocator.allocate_code(&mut code).unwrap_err();
        assert!(matches!(err, Error::StackExhausted { .. }));
    }

    #[test]
    fn test_interference_dot() {
        let mut code = Code::new();
        code.push(Instr::op("const", [virt(0)], []));
        code.push(Instr::op("const", [virt(1)], []));
        code.push(Instr::op("sum", [], [virt(0), virt(1)]));

        let dot = allocator(2).interference_dot(&code).unwrap();
        assert!(dot.contains("label=\"v0\", shape=ellipse"));
        assert!(dot.contains("label=\"r1\", shape=box"));
        assert!(dot.contains("n2 -- n3;"));
    }
}
