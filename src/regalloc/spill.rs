//! Spill candidate selection and spill code insertion.
//!
//! # Choosing a candidate
//!
//! When only significant-degree nodes remain, one of them is pushed on the
//! select stack optimistically. The candidate is the variable whose nearest
//! use is furthest from its definition, measured in control-flow edges: such
//! a value occupies a register for a long stretch without being touched.
//! Temporaries introduced by earlier spill rewrites have tiny live ranges and
//! spilling them again gains nothing, so they are only picked when nothing
//! else is left. Ties go to the lowest node.
//!
//! # Rewriting
//!
//! Every actually spilled variable is given a stack slot. Each instruction
//! mentioning it gets a fresh temporary instead, loaded from the slot right
//! before the instruction and stored back right after it.

use std::{
    cmp::Reverse,
    collections::{BTreeSet, HashMap},
};

use log::{debug, trace};

use crate::{
    analysis::{distances_from, Liveness},
    ir::{Code, InstrId, Location, Variable, VirtualVar},
    regalloc::{build::Round, graph::NodeId, worklist::NodeState},
    target::Target,
    Error, Result,
};

/// Ranks spill candidates by def-to-use distance.
pub(crate) struct SpillRanker<'a> {
    code: &'a Code,
    liveness: &'a Liveness,
    temporaries: &'a HashMap<VirtualVar, InstrId>,
    /// Distance per variable id, stable within a round
    distances: HashMap<u32, usize>,
}

impl<'a> SpillRanker<'a> {
    pub(crate) fn new(
        code: &'a Code,
        liveness: &'a Liveness,
        temporaries: &'a HashMap<VirtualVar, InstrId>,
    ) -> Self {
        Self {
            code,
            liveness,
            temporaries,
            distances: HashMap::new(),
        }
    }

    /// Picks the node to push from the spill worklist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingDefinition`] or [`Error::UnreachableUse`] if
    /// the liveness data of a candidate is inconsistent with the code.
    pub(crate) fn choose(&mut self, round: &Round) -> Result<NodeId> {
        let mut best: Option<((bool, usize, Reverse<usize>), NodeId)> = None;
        for i in round.lists.members(NodeState::Spill).iter() {
            let node = NodeId(i);
            let Some(var) = round.nodes.virtual_var(node) else {
                continue;
            };

            let key = (
                !self.temporaries.contains_key(&var),
                self.distance(var)?,
                Reverse(i),
            );
            if best.as_ref().map_or(true, |(k, _)| key > *k) {
                best = Some((key, node));
            }
        }

        let (key, node) =
            best.ok_or_else(|| malformed_error!("spill worklist holds no virtual node"))?;
        trace!(
            "spill candidate {} ({}), distance {}",
            node,
            round.var(node),
            key.1
        );
        Ok(node)
    }

    /// Smallest number of edges from the first definition of `var` to any of
    /// its uses; unbounded for a variable that is never used.
    fn distance(&mut self, var: VirtualVar) -> Result<usize> {
        if let Some(&known) = self.distances.get(&var.id()) {
            return Ok(known);
        }

        let operand = Variable::Virtual(var);
        let def = self
            .liveness
            .defs_of(&operand)
            .next()
            .ok_or(Error::MissingDefinition { var })?;

        let reached = distances_from(self.code, def);
        let mut nearest = usize::MAX;
        for use_ in self.liveness.uses_of(&operand) {
            let steps = reached
                .get(&use_)
                .copied()
                .ok_or(Error::UnreachableUse { var, def, use_ })?;
            nearest = nearest.min(steps);
        }

        self.distances.insert(var.id(), nearest);
        Ok(nearest)
    }
}

/// Inserts loads and stores for every spilled variable.
///
/// Returns the stack slot given to each variable. Temporaries created here are
/// added to `temporaries` together with the instruction they serve.
///
/// # Errors
///
/// Returns [`Error::StackExhausted`] if the target cannot provide a slot.
pub(crate) fn rewrite_program<T: Target + ?Sized>(
    code: &mut Code,
    target: &mut T,
    liveness: &Liveness,
    spilled: &[VirtualVar],
    temporaries: &mut HashMap<VirtualVar, InstrId>,
) -> Result<Vec<(VirtualVar, Location)>> {
    let mut slots = Vec::with_capacity(spilled.len());
    for &var in spilled {
        let slot = target.grow_stack(var.class())?;
        let operand = Variable::Virtual(var);
        let sites: BTreeSet<InstrId> = liveness
            .defs_of(&operand)
            .chain(liveness.uses_of(&operand))
            .collect();

        for id in sites {
            let Some(instr) = code.get(id) else {
                continue;
            };
            let reads = instr.uses.contains(&operand);
            let writes = instr.defs.contains(&operand);

            let temp = code.fresh_var(var.class());
            code.replace_in(id, &operand, temp.into());
            temporaries.insert(temp, id);

            if reads {
                for load in target.emit_move(temp.into(), slot.into(), var.class()) {
                    code.insert_before(id, load)
                        .ok_or_else(|| malformed_error!("cannot insert a load before {}", id))?;
                }
            }
            if writes {
                let mut at = id;
                for store in target.emit_move(slot.into(), temp.into(), var.class()) {
                    at = code
                        .insert_after(at, store)
                        .ok_or_else(|| malformed_error!("cannot insert a store after {}", at))?;
                }
            }
        }

        debug!("spilled {} to {}", var, slot);
        slots.push((var, slot));
    }
    Ok(slots)
}
