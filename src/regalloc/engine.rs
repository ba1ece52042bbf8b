//! The iterated register coalescing worklist engine.
//!
//! Once a round is built, every virtual node is classified and the engine
//! repeatedly applies the first transformation that has work:
//!
//! 1. simplify a low-degree node that takes part in no move
//! 2. coalesce a pending move (Briggs or George test)
//! 3. freeze a low-degree move-related node, giving up on its moves
//! 4. optimistically push a significant-degree node as a potential spill
//!
//! The loop ends when all four worklists are empty. Every removed node is then
//! on the select stack or coalesced into a representative.

use log::trace;

use crate::{
    regalloc::{
        build::Round,
        graph::NodeId,
        moves::{MoveId, MoveState},
        worklist::NodeState,
    },
    utils::BitSet,
    Result,
};

impl Round {
    /// Runs the worklist loop to completion.
    ///
    /// `choose_spill` is asked for a node from the spill worklist whenever
    /// nothing else can make progress.
    ///
    /// # Errors
    ///
    /// Propagates the error of `choose_spill`.
    pub(crate) fn run(
        &mut self,
        mut choose_spill: impl FnMut(&Round) -> Result<NodeId>,
    ) -> Result<()> {
        self.make_worklist();

        loop {
            if let Some(node) = self.lists.first(NodeState::Simplify) {
                self.simplify(node);
            } else if let Some(mv) = self.moves.next_worklist() {
                self.coalesce(mv);
            } else if let Some(node) = self.lists.first(NodeState::Freeze) {
                self.freeze(node);
            } else if !self.lists.is_empty(NodeState::Spill) {
                let node = choose_spill(self)?;
                self.select_spill(node);
            } else {
                break;
            }
        }
        Ok(())
    }

    fn make_worklist(&mut self) {
        let initial: Vec<usize> = self.lists.members(NodeState::Initial).iter().collect();
        for i in initial {
            let node = NodeId(i);
            let state = if self.graph.degree(node) >= self.k {
                NodeState::Spill
            } else if self.moves.is_move_related(node) {
                NodeState::Freeze
            } else {
                NodeState::Simplify
            };
            self.lists.transfer(node, state);
        }
    }

    /// Neighbors still in the graph.
    pub(crate) fn adjacent(&self, node: NodeId) -> Vec<NodeId> {
        self.graph
            .adj_list(node)
            .iter()
            .copied()
            .filter(|n| {
                !matches!(
                    self.lists.state(*n),
                    NodeState::Selected | NodeState::Coalesced
                )
            })
            .collect()
    }

    fn simplify(&mut self, node: NodeId) {
        trace!("simplify {} ({})", node, self.var(node));
        self.lists.transfer(node, NodeState::Selected);
        for m in self.adjacent(node) {
            self.decrement_degree(m);
        }
    }

    fn decrement_degree(&mut self, node: NodeId) {
        let old = self.graph.decrement_degree(node);
        if old != self.k {
            return;
        }

        let mut around = self.adjacent(node);
        around.push(node);
        for n in around {
            self.moves.enable_moves(n);
        }

        if self.lists.state(node) == NodeState::Spill {
            let state = if self.moves.is_move_related(node) {
                NodeState::Freeze
            } else {
                NodeState::Simplify
            };
            self.lists.transfer(node, state);
        }
    }

    fn coalesce(&mut self, id: MoveId) {
        let mv = self.moves.get(id);
        let x = self.alias.find(mv.dst);
        let y = self.alias.find(mv.src);
        let (u, v) = if self.graph.is_precolored(y) {
            (y, x)
        } else {
            (x, y)
        };

        if u == v {
            trace!("move {} is redundant", mv.instr);
            self.moves.set_state(id, MoveState::Coalesced);
            self.add_worklist(u);
        } else if self.graph.is_precolored(v) || self.graph.has_edge(u, v) {
            trace!("move {} is constrained ({} and {})", mv.instr, u, v);
            self.moves.set_state(id, MoveState::Constrained);
            self.add_worklist(u);
            self.add_worklist(v);
        } else if self.can_combine(u, v) {
            trace!("move {} coalesces {} into {}", mv.instr, v, u);
            self.moves.set_state(id, MoveState::Coalesced);
            self.combine(u, v);
            self.add_worklist(u);
        } else {
            self.moves.set_state(id, MoveState::Active);
        }
    }

    /// George's test against a precolored `u`, Briggs' test otherwise.
    fn can_combine(&self, u: NodeId, v: NodeId) -> bool {
        if self.graph.is_precolored(u) {
            self.adjacent(v).into_iter().all(|t| self.ok(t, u))
        } else {
            let mut union = self.adjacent(u);
            union.extend(self.adjacent(v));
            self.conservative(&union)
        }
    }

    fn add_worklist(&mut self, node: NodeId) {
        if !self.graph.is_precolored(node)
            && self.lists.state(node) == NodeState::Freeze
            && !self.moves.is_move_related(node)
            && self.graph.degree(node) < self.k
        {
            self.lists.transfer(node, NodeState::Simplify);
        }
    }

    fn ok(&self, t: NodeId, r: NodeId) -> bool {
        self.graph.degree(t) < self.k || self.graph.is_precolored(t) || self.graph.has_edge(t, r)
    }

    fn conservative(&self, nodes: &[NodeId]) -> bool {
        let mut seen = BitSet::new(self.graph.node_count());
        let mut significant = 0;
        for &n in nodes {
            if seen.insert(n.0) && self.graph.degree(n) >= self.k {
                significant += 1;
            }
        }
        significant < self.k
    }

    fn combine(&mut self, u: NodeId, v: NodeId) {
        self.lists.transfer(v, NodeState::Coalesced);
        self.alias.union(v, u);
        self.moves.merge_lists(u, v);
        self.moves.enable_moves(v);

        if !self.graph.is_precolored(u) {
            let from = self.legal[v.0].clone();
            self.legal[u.0].intersect_with(&from);
        }

        for t in self.adjacent(v) {
            self.graph.add_edge(t, u);
            self.decrement_degree(t);
        }

        if self.graph.degree(u) >= self.k && self.lists.state(u) == NodeState::Freeze {
            self.lists.transfer(u, NodeState::Spill);
        }
    }

    fn freeze(&mut self, node: NodeId) {
        trace!("freeze {} ({})", node, self.var(node));
        self.lists.transfer(node, NodeState::Simplify);
        self.freeze_moves(node);
    }

    fn freeze_moves(&mut self, u: NodeId) {
        let u = self.alias.find(u);
        for id in self.moves.node_moves(u) {
            let mv = self.moves.get(id);
            let x = self.alias.find(mv.dst);
            let y = self.alias.find(mv.src);
            let v = if y == u { x } else { y };

            self.moves.set_state(id, MoveState::Frozen);
            if self.lists.state(v) == NodeState::Freeze
                && !self.moves.is_move_related(v)
                && self.graph.degree(v) < self.k
            {
                self.lists.transfer(v, NodeState::Simplify);
            }
        }
    }

    fn select_spill(&mut self, node: NodeId) {
        trace!("potential spill {} ({})", node, self.var(node));
        self.lists.transfer(node, NodeState::Simplify);
        self.freeze_moves(node);
    }
}
