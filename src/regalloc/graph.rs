//! Interference graph store.
//!
//! Nodes are dense indices. The first `precolored` nodes stand for the target's
//! physical locations, node `i` carrying color `i`; the remaining nodes are
//! virtual variables. The graph keeps three views of the same edge set:
//!
//! - an adjacency set for constant-time edge tests, symmetric and free of
//!   self-loops
//! - adjacency lists for virtual nodes only, since precolored nodes are never
//!   simplified and so never need to enumerate their neighbors
//! - a degree counter per virtual node, decremented as neighbors are removed
//!   from the graph during simplification and coalescing
//!
//! Precolored nodes report an unbounded degree.

use std::{collections::HashSet, fmt, fmt::Write};

use crate::utils::escape_dot;

/// Index of a node in the interference graph.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct NodeId(pub(crate) usize);

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Interference graph over precolored and virtual nodes.
#[derive(Debug, Clone)]
pub(crate) struct InterferenceGraph {
    adj_set: HashSet<(usize, usize)>,
    adj_list: Vec<Vec<NodeId>>,
    degree: Vec<usize>,
    precolored: usize,
}

impl InterferenceGraph {
    /// Creates a graph with `nodes` nodes, the first `precolored` of which are
    /// precolored.
    #[must_use]
    pub(crate) fn new(nodes: usize, precolored: usize) -> Self {
        Self {
            adj_set: HashSet::new(),
            adj_list: vec![Vec::new(); nodes],
            degree: vec![0; nodes],
            precolored: precolored.min(nodes),
        }
    }

    /// Returns the number of nodes.
    #[must_use]
    pub(crate) fn node_count(&self) -> usize {
        self.degree.len()
    }

    /// Returns the number of distinct edges.
    #[must_use]
    pub(crate) fn edge_count(&self) -> usize {
        self.adj_set.len()
    }

    /// Returns `true` if `node` is precolored.
    #[must_use]
    #[inline]
    pub(crate) const fn is_precolored(&self, node: NodeId) -> bool {
        node.0 < self.precolored
    }

    /// Adds the undirected edge `{u, v}`.
    ///
    /// Self-loops and edges between two precolored nodes are ignored. Returns
    /// `true` if the edge is new.
    pub(crate) fn add_edge(&mut self, u: NodeId, v: NodeId) -> bool {
        if u == v || (self.is_precolored(u) && self.is_precolored(v)) {
            return false;
        }
        if !self.adj_set.insert(Self::key(u, v)) {
            return false;
        }
        for (a, b) in [(u, v), (v, u)] {
            if !self.is_precolored(a) {
                self.adj_list[a.0].push(b);
                self.degree[a.0] += 1;
            }
        }
        true
    }

    /// Returns `true` if `u` and `v` interfere.
    #[must_use]
    pub(crate) fn has_edge(&self, u: NodeId, v: NodeId) -> bool {
        self.adj_set.contains(&Self::key(u, v))
    }

    /// Returns every neighbor ever recorded for a virtual node, regardless of
    /// whether it has since been removed from the graph.
    #[must_use]
    pub(crate) fn adj_list(&self, node: NodeId) -> &[NodeId] {
        &self.adj_list[node.0]
    }

    /// Returns the current degree; `usize::MAX` for precolored nodes.
    #[must_use]
    pub(crate) fn degree(&self, node: NodeId) -> usize {
        if self.is_precolored(node) {
            usize::MAX
        } else {
            self.degree[node.0]
        }
    }

    /// Decrements the degree of a virtual node and returns its old value.
    ///
    /// Precolored nodes are left untouched.
    pub(crate) fn decrement_degree(&mut self, node: NodeId) -> usize {
        if self.is_precolored(node) {
            return usize::MAX;
        }
        let old = self.degree[node.0];
        self.degree[node.0] = old.saturating_sub(1);
        old
    }

    /// Iterates over every edge once, smaller node first, in unspecified order.
    pub(crate) fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.adj_set.iter().map(|&(a, b)| (NodeId(a), NodeId(b)))
    }

    /// Renders the graph in Graphviz DOT format.
    ///
    /// Precolored nodes are drawn as boxes. Edges are sorted so the output is
    /// stable across runs.
    pub(crate) fn to_dot(&self, mut label: impl FnMut(NodeId) -> String) -> String {
        let mut out = String::from("graph interference {\n");
        for i in 0..self.node_count() {
            let node = NodeId(i);
            let shape = if self.is_precolored(node) {
                "box"
            } else {
                "ellipse"
            };
            let _ = writeln!(
                out,
                "  n{i} [label=\"{}\", shape={shape}];",
                escape_dot(&label(node))
            );
        }

        let mut edges: Vec<_> = self.adj_set.iter().copied().collect();
        edges.sort_unstable();
        for (a, b) in edges {
            let _ = writeln!(out, "  n{a} -- n{b};");
        }
        out.push_str("}\n");
        out
    }

    fn key(u: NodeId, v: NodeId) -> (usize, usize) {
        if u.0 < v.0 {
            (u.0, v.0)
        } else {
            (v.0, u.0)
        }
    }
}
