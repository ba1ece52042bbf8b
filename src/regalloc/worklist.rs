//! Node worklist partition.
//!
//! Every node carries exactly one [`NodeState`] tag. The states that the
//! engine picks nodes from, or iterates over, are mirrored in bit sets, so
//! moving a node between lists is O(1) and can never leave a stale duplicate
//! behind. Picking always yields the lowest index, which makes an allocation
//! fully deterministic for a given input.

use crate::{regalloc::NodeId, utils::BitSet};

/// The list a node currently belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum NodeState {
    /// A physical location; never moves
    Precolored,
    /// Not yet classified
    Initial,
    /// Low degree and not move-related
    Simplify,
    /// Low degree and move-related
    Freeze,
    /// Significant degree
    Spill,
    /// Found no color during assignment
    Spilled,
    /// Merged into another node
    Coalesced,
    /// Assigned a color
    Colored,
    /// Removed from the graph, waiting on the select stack
    Selected,
}

impl NodeState {
    const TRACKED: usize = 7;

    fn slot(self) -> Option<usize> {
        match self {
            NodeState::Precolored | NodeState::Selected => None,
            NodeState::Initial => Some(0),
            NodeState::Simplify => Some(1),
            NodeState::Freeze => Some(2),
            NodeState::Spill => Some(3),
            NodeState::Spilled => Some(4),
            NodeState::Coalesced => Some(5),
            NodeState::Colored => Some(6),
        }
    }
}

/// Node worklists plus the select stack.
#[derive(Debug, Clone)]
pub(crate) struct Worklists {
    state: Vec<NodeState>,
    sets: Vec<BitSet>,
    select: Vec<NodeId>,
}

impl Worklists {
    /// Creates the partition for `nodes` nodes. The first `precolored` nodes
    /// are precolored, all others start out [`NodeState::Initial`].
    #[must_use]
    pub(crate) fn new(nodes: usize, precolored: usize) -> Self {
        let mut sets = vec![BitSet::new(nodes); NodeState::TRACKED];
        let mut state = vec![NodeState::Precolored; nodes];
        for (i, s) in state.iter_mut().enumerate().skip(precolored) {
            *s = NodeState::Initial;
            sets[0].insert(i);
        }
        Self {
            state,
            sets,
            select: Vec::new(),
        }
    }

    /// Returns the state of `node`.
    #[must_use]
    #[inline]
    pub(crate) fn state(&self, node: NodeId) -> NodeState {
        self.state[node.0]
    }

    /// Moves `node` into `state`.
    ///
    /// Moving to [`NodeState::Selected`] also pushes the node on the select
    /// stack. Precolored nodes never move.
    pub(crate) fn transfer(&mut self, node: NodeId, state: NodeState) {
        let old = self.state[node.0];
        if old == NodeState::Precolored || old == state {
            return;
        }
        if let Some(slot) = old.slot() {
            self.sets[slot].remove(node.0);
        }
        if let Some(slot) = state.slot() {
            self.sets[slot].insert(node.0);
        }
        if state == NodeState::Selected {
            self.select.push(node);
        }
        self.state[node.0] = state;
    }

    /// Returns the members of a state, lowest index first.
    ///
    /// # Panics
    ///
    /// Panics for [`NodeState::Precolored`] and [`NodeState::Selected`], which
    /// are not kept as sets.
    #[must_use]
    pub(crate) fn members(&self, state: NodeState) -> &BitSet {
        match state.slot() {
            Some(slot) => &self.sets[slot],
            None => panic!("{state:?} is not tracked as a set"),
        }
    }

    /// Returns the lowest node in `state`.
    #[must_use]
    pub(crate) fn first(&self, state: NodeState) -> Option<NodeId> {
        state
            .slot()
            .and_then(|slot| self.sets[slot].first())
            .map(NodeId)
    }

    /// Returns `true` if no node is in `state`.
    #[must_use]
    pub(crate) fn is_empty(&self, state: NodeState) -> bool {
        self.first(state).is_none()
    }

    /// Pops the most recently selected node. It stays
    /// [`NodeState::Selected`] until it is colored or spilled.
    pub(crate) fn pop_select(&mut self) -> Option<NodeId> {
        self.select.pop()
    }

    /// Returns the select stack, bottom first.
    #[must_use]
    pub(crate) fn select_stack(&self) -> &[NodeId] {
        &self.select
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_partition() {
        let lists = Worklists::new(5, 2);
        assert_eq!(lists.state(NodeId(0)), NodeState::Precolored);
        assert_eq!(lists.state(NodeId(2)), NodeState::Initial);
        assert_eq!(lists.members(NodeState::Initial).count(), 3);
        assert!(lists.is_empty(NodeState::Simplify));
    }

    #[test]
    fn test_transfer_keeps_sets_disjoint() {
        let mut lists = Worklists::new(6, 1);
        lists.transfer(NodeId(4), NodeState::Spill);
        lists.transfer(NodeId(3), NodeState::Spill);
        assert_eq!(lists.first(NodeState::Spill), Some(NodeId(3)));

        lists.transfer(NodeId(3), NodeState::Simplify);
        assert_eq!(lists.first(NodeState::Spill), Some(NodeId(4)));
        assert_eq!(lists.first(NodeState::Simplify), Some(NodeId(3)));
        assert!(!lists.members(NodeState::Initial).contains(3));

        lists.transfer(NodeId(0), NodeState::Simplify);
        assert_eq!(lists.state(NodeId(0)), NodeState::Precolored);
    }

    #[test]
    fn test_select_stack_is_lifo() {
        let mut lists = Worklists::new(4, 0);
        lists.transfer(NodeId(2), NodeState::Selected);
        lists.transfer(NodeId(0), NodeState::Selected);
        assert_eq!(lists.select_stack(), &[NodeId(2), NodeId(0)]);

        assert_eq!(lists.pop_select(), Some(NodeId(0)));
        lists.transfer(NodeId(0), NodeState::Colored);
        assert_eq!(lists.pop_select(), Some(NodeId(2)));
        assert_eq!(lists.pop_select(), None);
        assert_eq!(lists.first(NodeState::Colored), Some(NodeId(0)));
    }
}
