use crate::ir::{Code, Instr, InstrId, Variable};

/// Fluent builder for instruction lists.
///
/// Instructions fall through to the next one unless added with
/// [`CodeBuilder::terminator`]. Branches are added by position.
#[derive(Default)]
pub struct CodeBuilder {
    code: Code,
    ids: Vec<InstrId>,
    branches: Vec<(usize, usize)>,
}

impl CodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn op(
        mut self,
        mnemonic: &str,
        defs: impl IntoIterator<Item = Variable>,
        uses: impl IntoIterator<Item = Variable>,
    ) -> Self {
        let id = self.code.push(Instr::op(mnemonic, defs, uses));
        self.ids.push(id);
        self
    }

    /// Adds an instruction defining `var` and reading nothing.
    pub fn def(self, mnemonic: &str, var: Variable) -> Self {
        self.op(mnemonic, [var], [])
    }

    /// Adds an instruction reading `uses` and defining nothing.
    pub fn read(self, mnemonic: &str, uses: impl IntoIterator<Item = Variable>) -> Self {
        self.op(mnemonic, [], uses)
    }

    pub fn copy(mut self, dst: Variable, src: Variable) -> Self {
        let id = self.code.push(Instr::copy(dst, src));
        self.ids.push(id);
        self
    }

    pub fn terminator(mut self, mnemonic: &str, uses: impl IntoIterator<Item = Variable>) -> Self {
        let id = self.code.push_terminator(Instr::op(mnemonic, [], uses));
        self.ids.push(id);
        self
    }

    /// Adds a control-flow edge between the instructions at positions `from`
    /// and `to`, counted in insertion order.
    pub fn branch(mut self, from: usize, to: usize) -> Self {
        self.branches.push((from, to));
        self
    }

    pub fn build(mut self) -> Code {
        for (from, to) in self.branches {
            self.code.add_branch(self.ids[from], self.ids[to]);
        }
        self.code
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::int;

    #[test]
    fn test_builder_links_branches() {
        let code = CodeBuilder::new()
            .def("const", int(0))
            .terminator("jmp", [])
            .read("ret", [int(0)])
            .branch(1, 2)
            .build();

        let ids = code.ids();
        assert_eq!(ids.len(), 3);
        assert_eq!(code.successors(ids[0]), &[ids[1]]);
        assert_eq!(code.successors(ids[1]), &[ids[2]]);
        assert!(code.predecessors(ids[2]).contains(&ids[1]));
    }
}
