//! Move registry.
//!
//! Every copy instruction whose operands are both graph nodes is a *move*. A
//! move is in exactly one of five states at any time:
//!
//! | State | Meaning |
//! |---|---|
//! | [`MoveState::Worklist`] | may be coalescable, not yet examined |
//! | [`MoveState::Active`] | examined, not yet coalescable, retried once degrees drop |
//! | [`MoveState::Coalesced`] | both operands merged |
//! | [`MoveState::Constrained`] | operands interfere, can never be merged |
//! | [`MoveState::Frozen`] | given up on so the operands can be simplified |
//!
//! A single tag per move keeps the five sets disjoint by construction. The
//! worklist and active sets are additionally kept as bit sets so the next move
//! to examine is always the lowest numbered one.

use crate::{ir::InstrId, regalloc::NodeId, utils::BitSet};

/// Index of a move in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct MoveId(pub(crate) usize);

/// One copy instruction considered for coalescing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Move {
    /// The copy instruction
    pub(crate) instr: InstrId,
    /// Node written by the copy
    pub(crate) dst: NodeId,
    /// Node read by the copy
    pub(crate) src: NodeId,
}

/// Classification of a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum MoveState {
    /// Pending examination
    Worklist,
    /// Deferred until a neighbor's degree drops
    Active,
    /// Operands merged
    Coalesced,
    /// Operands interfere
    Constrained,
    /// Abandoned
    Frozen,
}

/// Number of moves per final state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveStats {
    /// Moves removed by coalescing
    pub coalesced: usize,
    /// Moves whose operands interfere
    pub constrained: usize,
    /// Moves given up on
    pub frozen: usize,
}

/// The set of moves of one allocation round.
#[derive(Debug, Clone)]
pub(crate) struct MoveRegistry {
    moves: Vec<Move>,
    state: Vec<MoveState>,
    worklist: BitSet,
    active: BitSet,
    /// Moves each node takes part in, merged on coalescing
    move_list: Vec<Vec<MoveId>>,
}

impl MoveRegistry {
    /// Registers `moves` for a graph of `nodes` nodes. Every move starts on
    /// the worklist.
    #[must_use]
    pub(crate) fn new(nodes: usize, moves: Vec<Move>) -> Self {
        let mut move_list = vec![Vec::new(); nodes];
        let mut worklist = BitSet::new(moves.len());
        for (i, mv) in moves.iter().enumerate() {
            worklist.insert(i);
            move_list[mv.dst.0].push(MoveId(i));
            if mv.src != mv.dst {
                move_list[mv.src.0].push(MoveId(i));
            }
        }

        Self {
            state: vec![MoveState::Worklist; moves.len()],
            active: BitSet::new(moves.len()),
            moves,
            worklist,
            move_list,
        }
    }

    /// Returns a move.
    #[must_use]
    pub(crate) fn get(&self, id: MoveId) -> Move {
        self.moves[id.0]
    }

    /// Moves `id` into `state`.
    pub(crate) fn set_state(&mut self, id: MoveId, state: MoveState) {
        match self.state[id.0] {
            MoveState::Worklist => {
                self.worklist.remove(id.0);
            }
            MoveState::Active => {
                self.active.remove(id.0);
            }
            _ => {}
        }
        match state {
            MoveState::Worklist => {
                self.worklist.insert(id.0);
            }
            MoveState::Active => {
                self.active.insert(id.0);
            }
            _ => {}
        }
        self.state[id.0] = state;
    }

    /// Returns the lowest numbered move on the worklist.
    #[must_use]
    pub(crate) fn next_worklist(&self) -> Option<MoveId> {
        self.worklist.first().map(MoveId)
    }

    /// Returns the moves of `node` that are still on the worklist or active.
    #[must_use]
    pub(crate) fn node_moves(&self, node: NodeId) -> Vec<MoveId> {
        self.move_list[node.0]
            .iter()
            .copied()
            .filter(|m| matches!(self.state[m.0], MoveState::Worklist | MoveState::Active))
            .collect()
    }

    /// Returns `true` if `node` still takes part in a pending move.
    #[must_use]
    pub(crate) fn is_move_related(&self, node: NodeId) -> bool {
        self.move_list[node.0]
            .iter()
            .any(|m| matches!(self.state[m.0], MoveState::Worklist | MoveState::Active))
    }

    /// Appends the move list of `from` to that of `into`.
    pub(crate) fn merge_lists(&mut self, into: NodeId, from: NodeId) {
        let moved = self.move_list[from.0].clone();
        let list = &mut self.move_list[into.0];
        for m in moved {
            if !list.contains(&m) {
                list.push(m);
            }
        }
    }

    /// Returns every active move of `node` to the worklist.
    pub(crate) fn enable_moves(&mut self, node: NodeId) {
        for m in self.node_moves(node) {
            if self.state[m.0] == MoveState::Active {
                self.set_state(m, MoveState::Worklist);
            }
        }
    }

    /// Returns the number of moves in `state`.
    #[must_use]
    pub(crate) fn count(&self, state: MoveState) -> usize {
        self.state.iter().filter(|s| **s == state).count()
    }

    /// Returns the final classification counts.
    #[must_use]
    pub(crate) fn stats(&self) -> MoveStats {
        MoveStats {
            coalesced: self.count(MoveState::Coalesced),
            constrained: self.count(MoveState::Constrained),
            frozen: self.count(MoveState::Frozen),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> MoveRegistry {
        MoveRegistry::new(
            4,
            vec![
                Move {
                    instr: InstrId::new(0),
                    dst: NodeId(1),
                    src: NodeId(2),
                },
                Move {
                    instr: InstrId::new(5),
                    dst: NodeId(2),
                    src: NodeId(3),
                },
            ],
        )
    }

    #[test]
    fn test_initial_worklist() {
        let moves = registry();
        assert_eq!(moves.count(MoveState::Worklist), 2);
        assert_eq!(moves.next_worklist(), Some(MoveId(0)));
        assert!(moves.is_move_related(NodeId(2)));
        assert!(!moves.is_move_related(NodeId(0)));
        assert_eq!(moves.node_moves(NodeId(2)), vec![MoveId(0), MoveId(1)]);
    }

    #[test]
    fn test_states_are_exclusive() {
        let mut moves = registry();
        moves.set_state(MoveId(0), MoveState::Active);
        assert_eq!(moves.next_worklist(), Some(MoveId(1)));

        moves.set_state(MoveId(1), MoveState::Constrained);
        assert_eq!(moves.next_worklist(), None);
        assert!(moves.node_moves(NodeId(3)).is_empty());

        moves.enable_moves(NodeId(1));
        assert_eq!(moves.next_worklist(), Some(MoveId(0)));
        assert_eq!(moves.count(MoveState::Active), 0);

        moves.set_state(MoveId(0), MoveState::Frozen);
        assert!(!moves.is_move_related(NodeId(1)));
        assert_eq!(
            moves.stats(),
            MoveStats {
                coalesced: 0,
                constrained: 1,
                frozen: 1
            }
        );
    }

    #[test]
    fn test_merge_lists() {
        let mut moves = registry();
        moves.merge_lists(NodeId(1), NodeId(2));
        assert_eq!(moves.node_moves(NodeId(1)), vec![MoveId(0), MoveId(1)]);
        assert_eq!(moves.node_moves(NodeId(2)).len(), 2);

        moves.merge_lists(NodeId(1), NodeId(2));
        assert_eq!(moves.node_moves(NodeId(1)).len(), 2);
    }
}
