//! Color assignment.
//!
//! Nodes are popped off the select stack in reverse removal order. A node may
//! take any of its legal colors not already used by a colored or precolored
//! neighbor; the lowest one wins. A node left without a color becomes an
//! actual spill. Coalesced nodes finally inherit the color of their
//! representative; if it spilled they are spilled with it.

use log::trace;

use crate::regalloc::{build::Round, graph::NodeId, worklist::NodeState};

impl Round {
    /// Colors every node on the select stack.
    pub(crate) fn assign_colors(&mut self) {
        while let Some(node) = self.lists.pop_select() {
            let mut ok = self.legal[node.0].clone();
            for &w in self.graph.adj_list(node) {
                let w = self.alias.resolve(w);
                if matches!(
                    self.lists.state(w),
                    NodeState::Colored | NodeState::Precolored
                ) {
                    if let Some(color) = self.color[w.0] {
                        ok.remove(color);
                    }
                }
            }

            match ok.first() {
                Some(color) => {
                    self.lists.transfer(node, NodeState::Colored);
                    self.color[node.0] = Some(color);
                }
                None => {
                    trace!("{} ({}) has no color left", node, self.var(node));
                    self.lists.transfer(node, NodeState::Spilled);
                }
            }
        }

        let coalesced: Vec<usize> = self.lists.members(NodeState::Coalesced).iter().collect();
        for i in coalesced {
            let rep = self.alias.resolve(NodeId(i));
            self.color[i] = self.color[rep.0];
        }
    }

    /// Returns the nodes which found no color, together with the nodes
    /// coalesced into them, lowest first.
    pub(crate) fn spilled_nodes(&self) -> Vec<NodeId> {
        let mut spilled: Vec<NodeId> = self
            .lists
            .members(NodeState::Spilled)
            .iter()
            .map(NodeId)
            .collect();
        spilled.extend(
            self.lists
                .members(NodeState::Coalesced)
                .iter()
                .map(NodeId)
                .filter(|&n| self.lists.state(self.alias.resolve(n)) == NodeState::Spilled),
        );
        spilled.sort_unstable();
        spilled
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        analysis::Liveness,
        ir::{ClassSet, Code, DataClass, Instr, Variable, VirtualVar},
        regalloc::{build::Round, worklist::NodeState},
        target::GenericTarget,
    };

    fn virt(id: u32, class: DataClass) -> Variable {
        VirtualVar::new(id, class).into()
    }

    fn colored(target: &GenericTarget, code: &Code) -> Round {
        let liveness = Liveness::compute(code);
        let mut round = Round::build(target, code, &liveness, true).unwrap();
        round
            .run(|r| {
                r.lists
                    .first(NodeState::Spill)
                    .ok_or_else(|| malformed_error!("no spill candidate"))
            })
            .unwrap();
        round.assign_colors();
        round
    }

    #[test]
    fn test_neighbors_get_distinct_colors() {
        let target = GenericTarget::integer(2);
        let mut code = Code::new();
        code.push(Instr::op("const", [virt(0, DataClass::Int32)], []));
        code.push(Instr::op("const", [virt(1, DataClass::Int32)], []));
        code.push(Instr::op(
            "sum",
            [],
            [virt(0, DataClass::Int32), virt(1, DataClass::Int32)],
        ));

        let round = colored(&target, &code);
        let a = round.nodes.get(&virt(0, DataClass::Int32)).unwrap();
        let b = round.nodes.get(&virt(1, DataClass::Int32)).unwrap();
        assert!(round.color[a.0].is_some());
        assert!(round.color[b.0].is_some());
        assert_ne!(round.color[a.0], round.color[b.0]);
        assert!(round.spilled_nodes().is_empty());
    }

    #[test]
    fn test_class_restricts_color() {
        let target = GenericTarget::new("mixed")
            .register("r0", ClassSet::GENERAL)
            .register("r1", ClassSet::GENERAL)
            .register("f0", ClassSet::FLOAT);
        let mut code = Code::new();
        let f = virt(0, DataClass::Float64);
        code.push(Instr::op("fconst", [f], []));
        code.push(Instr::op("ret", [], [f]));

        let round = colored(&target, &code);
        let node = round.nodes.get(&f).unwrap();
        assert_eq!(round.color[node.0], Some(2));
    }

    #[test]
    fn test_triangle_with_two_colors_spills() {
        let target = GenericTarget::integer(2);
        let mut code = Code::new();
        let vars: Vec<_> = (0..3).map(|i| virt(i, DataClass::Int64)).collect();
        for var in &vars {
            code.push(Instr::op("const", [*var], []));
        }
        code.push(Instr::op("sum", [], vars.clone()));

        let round = colored(&target, &code);
        assert_eq!(round.spilled_nodes().len(), 1);
    }

    #[test]
    fn test_coalesced_node_takes_alias_color() {
        let target = GenericTarget::integer(2);
        let mut code = Code::new();
        let (x, y) = (virt(0, DataClass::Int32), virt(1, DataClass::Int32));
        code.push(Instr::op("const", [y], []));
        code.push(Instr::copy(x, y));
        code.push(Instr::op("ret", [], [x]));

        let round = colored(&target, &code);
        let (nx, ny) = (round.nodes.get(&x).unwrap(), round.nodes.get(&y).unwrap());
        assert!(round.color[nx.0].is_some());
        assert_eq!(round.color[nx.0], round.color[ny.0]);
    }
}
