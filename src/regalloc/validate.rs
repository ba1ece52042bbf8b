//! Final coloring checks.
//!
//! Run on the last round of an allocation, after every node found a color.
//! A failure here always means a bug in the allocator or an inconsistent
//! target description, never a property of the input program.

use crate::{
    analysis::Liveness,
    regalloc::{build::Round, graph::NodeId, worklist::NodeState},
    Error, Result,
};

impl Round {
    /// Checks soundness, class legality, precoloring and totality.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] describing the first violation found.
    pub(crate) fn validate(&self, liveness: &Liveness) -> Result<()> {
        for i in 0..self.k {
            if self.color[i] != Some(i) {
                return Err(Error::Validation(format!(
                    "precolored {} lost its color",
                    self.var(NodeId(i))
                )));
            }
        }

        for var in liveness.variables().into_iter().filter(|v| v.is_virtual()) {
            let colored = self
                .nodes
                .get(&var)
                .is_some_and(|node| self.color[node.0].is_some());
            if !colored {
                return Err(Error::Validation(format!("{var} has no location")));
            }
        }

        for (node, var) in self.nodes.virtual_nodes() {
            if let Some(color) = self.color[node.0] {
                if !self.legal[node.0].contains(color) {
                    return Err(Error::Validation(format!(
                        "{var} of class {} placed in illegal {}",
                        var.class(),
                        self.var(NodeId(color))
                    )));
                }
            }
        }

        for i in self.lists.members(NodeState::Coalesced).iter() {
            let node = NodeId(i);
            let rep = self.alias.resolve(node);
            if self.graph.has_edge(node, rep) {
                return Err(Error::Validation(format!(
                    "{} was coalesced into interfering {}",
                    self.var(node),
                    self.var(rep)
                )));
            }
        }

        let mut edges: Vec<_> = self.graph.edges().collect();
        edges.sort_unstable();
        for (a, b) in edges {
            let (ra, rb) = (self.alias.resolve(a), self.alias.resolve(b));
            if ra == rb {
                return Err(Error::Validation(format!(
                    "{} and {} interfere but share a representative",
                    self.var(a),
                    self.var(b)
                )));
            }
            if let (Some(ca), Some(cb)) = (self.color[a.0], self.color[b.0]) {
                if ca == cb {
                    return Err(Error::Validation(format!(
                        "{} and {} interfere but share {}",
                        self.var(a),
                        self.var(b),
                        self.var(NodeId(ca))
                    )));
                }
            }
        }
        Ok(())
    }
}
