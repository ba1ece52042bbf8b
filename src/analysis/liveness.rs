//! Per-instruction live variable analysis.
//!
//! A variable is *live* at a program point if there exists a path from that
//! point to a use of the variable that doesn't pass through a definition of
//! the variable. The register allocator needs the set of variables live after
//! every instruction plus, for every variable, the instructions defining and
//! using it.
//!
//! # Algorithm
//!
//! This is a backward data flow analysis over single instructions:
//!
//! - `OUT[i]` = ∪{IN[s] | s is a successor of i}
//! - `IN[i]` = USE[i] ∪ (OUT[i] - DEF[i])
//!
//! Instructions are visited in reverse program order until nothing changes,
//! which converges in a handful of sweeps for structured control flow.
//!
//! Memory-indirect operands are not tracked. They name memory, not a location
//! that a value could be allocated to.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::{
    ir::{Code, InstrId, Variable, VirtualVar},
    utils::BitSet,
};

/// Liveness facts for one instruction list.
///
/// Built either by [`Liveness::compute`] or by hand through
/// [`Liveness::set_live_out`], [`Liveness::record_def`] and
/// [`Liveness::record_use`] when a frontend already has the information.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Liveness {
    live_out: HashMap<InstrId, Vec<Variable>>,
    defs: BTreeMap<Variable, BTreeSet<InstrId>>,
    uses: BTreeMap<Variable, BTreeSet<InstrId>>,
}

impl Liveness {
    /// Creates empty liveness data.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the analysis over `code`.
    #[must_use]
    pub fn compute(code: &Code) -> Self {
        let order = code.ids();

        let vars: Vec<Variable> = code
            .iter()
            .flat_map(|(_, instr)| instr.defs.iter().chain(instr.uses.iter()))
            .filter(|var| tracked(var))
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let index: HashMap<Variable, usize> =
            vars.iter().enumerate().map(|(i, var)| (*var, i)).collect();

        let slots = code.capacity();
        let empty = BitSet::new(vars.len());
        let mut use_sets = vec![empty.clone(); slots];
        let mut def_sets = vec![empty.clone(); slots];
        let mut result = Liveness::new();

        for (id, instr) in code.iter() {
            for var in instr.uses.iter().filter(|var| tracked(var)) {
                use_sets[id.index()].insert(index[var]);
                result.record_use(*var, id);
            }
            for var in instr.defs.iter().filter(|var| tracked(var)) {
                def_sets[id.index()].insert(index[var]);
                result.record_def(*var, id);
            }
        }

        let mut live_in = vec![empty.clone(); slots];
        let mut live_out = vec![empty; slots];
        let mut changed = true;
        let mut sweeps = 0usize;
        while changed {
            changed = false;
            sweeps += 1;
            for &id in order.iter().rev() {
                let i = id.index();
                let mut out = BitSet::new(vars.len());
                for succ in code.successors(id) {
                    out.union_with(&live_in[succ.index()]);
                }

                let mut inn = out.clone();
                inn.difference_with(&def_sets[i]);
                inn.union_with(&use_sets[i]);

                if inn != live_in[i] {
                    live_in[i] = inn;
                    changed = true;
                }
                live_out[i] = out;
            }
        }
        log::trace!(
            "liveness: {} instructions, {} variables, {} sweeps",
            order.len(),
            vars.len(),
            sweeps
        );

        for id in order {
            let live = live_out[id.index()].iter().map(|i| vars[i]).collect();
            result.live_out.insert(id, live);
        }
        result
    }

    /// Replaces the live-out set of `id`.
    pub fn set_live_out(&mut self, id: InstrId, live: impl IntoIterator<Item = Variable>) {
        let mut live: Vec<Variable> = live.into_iter().filter(tracked).collect();
        live.sort_unstable();
        live.dedup();
        self.live_out.insert(id, live);
    }

    /// Records that `id` defines `var`.
    pub fn record_def(&mut self, var: Variable, id: InstrId) {
        self.defs.entry(var).or_default().insert(id);
    }

    /// Records that `id` uses `var`.
    pub fn record_use(&mut self, var: Variable, id: InstrId) {
        self.uses.entry(var).or_default().insert(id);
    }

    /// Returns the variables live after `id`, in ascending order.
    #[must_use]
    pub fn live_out(&self, id: InstrId) -> &[Variable] {
        self.live_out.get(&id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Returns `true` if `var` is live after `id`.
    #[must_use]
    pub fn is_live_out(&self, id: InstrId, var: &Variable) -> bool {
        self.live_out(id).binary_search(var).is_ok()
    }

    /// Returns the instructions defining `var`, in ascending handle order.
    pub fn defs_of(&self, var: &Variable) -> impl Iterator<Item = InstrId> + '_ {
        self.defs.get(var).into_iter().flatten().copied()
    }

    /// Returns the instructions using `var`, in ascending handle order.
    pub fn uses_of(&self, var: &Variable) -> impl Iterator<Item = InstrId> + '_ {
        self.uses.get(var).into_iter().flatten().copied()
    }

    /// Returns every variable that is defined or used somewhere, in ascending order.
    #[must_use]
    pub fn variables(&self) -> Vec<Variable> {
        self.defs
            .keys()
            .chain(self.uses.keys())
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Returns every virtual variable that is defined or used somewhere, ordered by id.
    #[must_use]
    pub fn virtual_variables(&self) -> Vec<VirtualVar> {
        self.variables()
            .iter()
            .filter_map(Variable::as_virtual)
            .collect()
    }
}

fn tracked(var: &Variable) -> bool {
    !matches!(var.as_physical(), Some(loc) if loc.is_memory_indirect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{DataClass, Instr, Location, RegId};

    fn v(id: u32) -> Variable {
        Variable::Virtual(VirtualVar::new(id, DataClass::Int64))
    }

    #[test]
    fn test_straight_line() {
        let mut code = Code::new();
        let i0 = code.push(Instr::op("const", [v(0)], []));
        let i1 = code.push(Instr::op("const", [v(1)], []));
        let i2 = code.push(Instr::op("add", [v(2)], [v(0), v(1)]));
        let i3 = code.push_terminator(Instr::op("ret", [], [v(2)]));

        let live = Liveness::compute(&code);
        assert_eq!(live.live_out(i0), &[v(0)]);
        assert_eq!(live.live_out(i1), &[v(0), v(1)]);
        assert_eq!(live.live_out(i2), &[v(2)]);
        assert!(live.live_out(i3).is_empty());

        assert_eq!(live.defs_of(&v(2)).collect::<Vec<_>>(), vec![i2]);
        assert_eq!(live.uses_of(&v(0)).collect::<Vec<_>>(), vec![i2]);
        assert_eq!(live.variables(), vec![v(0), v(1), v(2)]);
    }

    #[test]
    fn test_loop_keeps_value_live() {
        let mut code = Code::new();
        let init = code.push(Instr::op("const", [v(0)], []));
        let body = code.push(Instr::op("inc", [v(1)], [v(1)]));
        let branch = code.push(Instr::op("jnz", [], [v(1)]));
        let exit = code.push_terminator(Instr::op("ret", [], [v(0)]));
        code.add_branch(branch, body);

        let live = Liveness::compute(&code);
        assert!(live.is_live_out(init, &v(0)));
        assert!(live.is_live_out(body, &v(0)));
        assert!(live.is_live_out(branch, &v(1)));
        assert!(live.is_live_out(branch, &v(0)));
        assert!(!live.is_live_out(exit, &v(0)));
    }

    #[test]
    fn test_memory_operands_not_tracked() {
        let mut code = Code::new();
        let mem = Variable::Physical(Location::ContentsOf {
            base: RegId(5),
            offset: 8,
        });
        let reg = Variable::Physical(Location::Register(RegId(0)));
        let store = code.push(Instr::op("store", [mem], [v(0)]));
        code.push(Instr::op("use", [], [reg]));

        let live = Liveness::compute(&code);
        assert_eq!(live.live_out(store), &[reg]);
        assert_eq!(live.variables(), vec![v(0), reg]);
        assert_eq!(live.virtual_variables(), vec![VirtualVar::new(0, DataClass::Int64)]);
    }

    #[test]
    fn test_manual_construction() {
        let mut live = Liveness::new();
        let id = InstrId::new(3);
        live.set_live_out(id, [v(2), v(1), v(2)]);
        live.record_def(v(1), id);
        assert_eq!(live.live_out(id), &[v(1), v(2)]);
        assert_eq!(live.defs_of(&v(1)).collect::<Vec<_>>(), vec![id]);
        assert_eq!(live.uses_of(&v(1)).count(), 0);
    }
}
