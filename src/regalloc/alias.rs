//! Alias union-find for coalesced nodes.
//!
//! Coalescing `v` into `u` records `u` as the parent of `v`. Lookups follow
//! parent links to the representative and compress the path behind them, so
//! long coalescing chains stay cheap to resolve.

use crate::regalloc::NodeId;

/// Parent links over graph nodes; a root is its own parent.
#[derive(Debug, Clone)]
pub(crate) struct AliasMap {
    parent: Vec<usize>,
}

impl AliasMap {
    /// Creates a map in which every node is its own representative.
    #[must_use]
    pub(crate) fn new(nodes: usize) -> Self {
        Self {
            parent: (0..nodes).collect(),
        }
    }

    /// Returns the representative of `node`, compressing the path.
    pub(crate) fn find(&mut self, node: NodeId) -> NodeId {
        let mut root = node.0;
        while self.parent[root] != root {
            root = self.parent[root];
        }

        let mut cur = node.0;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        NodeId(root)
    }

    /// Returns the representative of `node` without modifying the map.
    #[must_use]
    pub(crate) fn resolve(&self, node: NodeId) -> NodeId {
        let mut root = node.0;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        NodeId(root)
    }

    /// Makes `into` the parent of `node`.
    ///
    /// `node` must currently be a representative.
    pub(crate) fn union(&mut self, node: NodeId, into: NodeId) {
        debug_assert_eq!(self.parent[node.0], node.0, "{node} is already coalesced");
        self.parent[node.0] = into.0;
    }
}
