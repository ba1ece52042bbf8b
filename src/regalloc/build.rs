//! Interference graph construction for one allocation round.
//!
//! A round starts from the target's current location list and the liveness
//! of the code. Every location becomes a precolored node whose index is its
//! color, every virtual variable known to liveness becomes a node after them.
//! Edges come from two sources:
//!
//! - class constraints, tying a virtual node to every location it may not use
//! - a single walk over the code in program order, where everything defined by
//!   an instruction interferes with everything live across it
//!
//! Copy instructions are special-cased as in Chaitin's original formulation:
//! the source of a copy does not interfere with its destination, which is what
//! later allows the two to be coalesced.

use std::collections::{hash_map::Entry, HashMap};

use log::debug;

use crate::{
    analysis::Liveness,
    ir::{Code, DataClass, InstrId, Location, Variable, VirtualVar},
    regalloc::{
        alias::AliasMap,
        graph::{InterferenceGraph, NodeId},
        moves::{Move, MoveRegistry},
        worklist::Worklists,
    },
    target::Target,
    utils::BitSet,
    Error, Result,
};

/// Mapping between graph nodes and the variables they stand for.
#[derive(Debug, Clone)]
pub(crate) struct NodeTable {
    vars: Vec<Variable>,
    index: HashMap<Variable, NodeId>,
    precolored: usize,
}

impl NodeTable {
    fn new(locations: &[Location], virtuals: &[VirtualVar]) -> Self {
        let mut vars = Vec::with_capacity(locations.len() + virtuals.len());
        let mut index = HashMap::with_capacity(vars.capacity());

        for location in locations {
            let var = Variable::Physical(*location);
            if let Entry::Vacant(entry) = index.entry(var) {
                entry.insert(NodeId(vars.len()));
                vars.push(var);
            }
        }
        let precolored = vars.len();

        for virt in virtuals {
            let var = Variable::Virtual(*virt);
            if let Entry::Vacant(entry) = index.entry(var) {
                entry.insert(NodeId(vars.len()));
                vars.push(var);
            }
        }

        Self {
            vars,
            index,
            precolored,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.vars.len()
    }

    pub(crate) fn precolored(&self) -> usize {
        self.precolored
    }

    pub(crate) fn get(&self, var: &Variable) -> Option<NodeId> {
        self.index.get(var).copied()
    }

    pub(crate) fn var(&self, node: NodeId) -> Variable {
        self.vars[node.0]
    }

    pub(crate) fn virtual_var(&self, node: NodeId) -> Option<VirtualVar> {
        self.vars[node.0].as_virtual()
    }

    /// Iterates over the virtual nodes in ascending node order.
    pub(crate) fn virtual_nodes(&self) -> impl Iterator<Item = (NodeId, VirtualVar)> + '_ {
        self.vars
            .iter()
            .enumerate()
            .skip(self.precolored)
            .filter_map(|(i, var)| var.as_virtual().map(|v| (NodeId(i), v)))
    }
}

/// All state of one build/simplify/select attempt.
#[derive(Debug, Clone)]
pub(crate) struct Round {
    /// Number of colors
    pub(crate) k: usize,
    pub(crate) nodes: NodeTable,
    pub(crate) graph: InterferenceGraph,
    pub(crate) moves: MoveRegistry,
    pub(crate) lists: Worklists,
    pub(crate) alias: AliasMap,
    /// Colors each node may take; narrowed when virtual nodes are combined
    pub(crate) legal: Vec<BitSet>,
    pub(crate) color: Vec<Option<usize>>,
}

impl Round {
    /// Builds the interference graph and move registry for the current code.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoLegalLocation`] if the target offers nothing for a
    /// variable's class, and [`Error::Malformed`] if the code mentions a
    /// virtual variable liveness does not know about or a copy is not a
    /// single-def single-use instruction.
    pub(crate) fn build<T: Target + ?Sized>(
        target: &T,
        code: &Code,
        liveness: &Liveness,
        coalesce: bool,
    ) -> Result<Self> {
        let locations = target.locations();
        let nodes = NodeTable::new(&locations, &liveness.virtual_variables());
        let k = nodes.precolored();

        let mut graph = InterferenceGraph::new(nodes.len(), k);
        let legal = class_constraints(target, &nodes, &mut graph)?;

        let mut moves = Vec::new();
        for (id, instr) in code.iter() {
            let mut live = operand_nodes(&nodes, id, liveness.live_out(id))?;
            let defs = operand_nodes(&nodes, id, &instr.defs)?;
            let uses = operand_nodes(&nodes, id, &instr.uses)?;

            if coalesce && instr.is_copy {
                let (dst, src) = instr.copy_operands().ok_or_else(|| {
                    malformed_error!(
                        "copy {} must have exactly one def and one use, found {} and {}",
                        id,
                        instr.defs.len(),
                        instr.uses.len()
                    )
                })?;
                live.retain(|node| !uses.contains(node));

                if let (Some(dst), Some(src)) = (nodes.get(&dst), nodes.get(&src)) {
                    if coalescable(&graph, &legal, dst, src) {
                        moves.push(Move { instr: id, dst, src });
                    }
                }
            }

            live.extend(defs.iter().copied());
            for &def in &defs {
                for &other in &live {
                    graph.add_edge(def, other);
                }
            }
        }

        debug!(
            "build: {} colors, {} virtual nodes, {} edges, {} moves",
            k,
            nodes.len() - k,
            graph.edge_count(),
            moves.len()
        );

        let mut color = vec![None; nodes.len()];
        for (i, slot) in color.iter_mut().enumerate().take(k) {
            *slot = Some(i);
        }

        Ok(Round {
            k,
            moves: MoveRegistry::new(nodes.len(), moves),
            lists: Worklists::new(nodes.len(), k),
            alias: AliasMap::new(nodes.len()),
            graph,
            legal,
            color,
            nodes,
        })
    }

    /// Returns the variable a node stands for.
    pub(crate) fn var(&self, node: NodeId) -> Variable {
        self.nodes.var(node)
    }
}

/// Computes the legal colors of every node and ties each virtual node to the
/// colors it may not take.
fn class_constraints<T: Target + ?Sized>(
    target: &T,
    nodes: &NodeTable,
    graph: &mut InterferenceGraph,
) -> Result<Vec<BitSet>> {
    let k = nodes.precolored();
    let mut legal = Vec::with_capacity(nodes.len());
    for i in 0..k {
        let mut own = BitSet::new(k);
        own.insert(i);
        legal.push(own);
    }

    let mut cache: HashMap<(DataClass, bool), BitSet> = HashMap::new();
    for (node, var) in nodes.virtual_nodes() {
        let key = (var.class(), var.needs_memory());
        let colors = cache
            .entry(key)
            .or_insert_with(|| {
                let mut colors = BitSet::new(k);
                for location in target.legal_locations(key.0, key.1) {
                    if let Some(color) = nodes.get(&Variable::Physical(location)) {
                        colors.insert(color.0);
                    }
                }
                colors
            })
            .clone();

        if colors.is_empty() {
            return Err(Error::NoLegalLocation {
                var,
                class: var.class(),
            });
        }
        for color in (0..k).filter(|c| !colors.contains(*c)) {
            graph.add_edge(node, NodeId(color));
        }
        legal.push(colors);
    }
    Ok(legal)
}

/// A move is only worth registering if its endpoints could ever share a color.
fn coalescable(graph: &InterferenceGraph, legal: &[BitSet], dst: NodeId, src: NodeId) -> bool {
    match (graph.is_precolored(dst), graph.is_precolored(src)) {
        (true, true) => false,
        (false, false) => !legal[dst.0].is_disjoint(&legal[src.0]),
        _ => true,
    }
}

/// Maps operands or live variables to nodes. Physical operands the target does not offer in
/// this round, including memory-indirect ones, are not allocatable and are
/// skipped.
fn operand_nodes(nodes: &NodeTable, id: InstrId, operands: &[Variable]) -> Result<Vec<NodeId>> {
    let mut out = Vec::with_capacity(operands.len());
    for var in operands {
        match nodes.get(var) {
            Some(node) => out.push(node),
            None if var.is_virtual() => {
                return Err(malformed_error!(
                    "{} mentions {} which liveness does not know",
                    id,
                    var
                ))
            }
            None => {}
        }
    }
    Ok(out)
}
