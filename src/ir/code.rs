//! Editable instruction list with explicit control flow.
//!
//! [`Code`] stores instructions in an arena and threads them into a doubly
//! linked list in program order. Control flow is kept separately as successor
//! and predecessor edges, so a branch can target any instruction and spill code
//! can be spliced in without invalidating existing [`InstrId`] handles.
//!
//! # Splicing
//!
//! - [`Code::insert_before`] places a new instruction in front of an existing one.
//!   Every edge that entered the old instruction now enters the new one, which
//!   falls through to the old one. A load placed this way executes on every path.
//! - [`Code::insert_after`] places a new instruction behind an existing one. The
//!   new instruction takes over all outgoing edges. A store placed this way
//!   executes on every path leaving the defining instruction.
//!
//! # Examples
//!
//! ```rust
//! use regcolor::ir::{Code, DataClass, Instr, Variable};
//!
//! let mut code = Code::new();
//! let a = Variable::from(code.fresh_var(DataClass::Int32));
//! let def = code.push(Instr::op("const", [a], []));
//! let ret = code.push(Instr::op("ret", [], [a]));
//! assert_eq!(code.successors(def), &[ret]);
//! ```

use std::fmt;

use crate::ir::{DataClass, Instr, InstrId, Variable, VirtualVar};

#[derive(Debug, Clone)]
struct Slot {
    instr: Instr,
    prev: Option<InstrId>,
    next: Option<InstrId>,
    succs: Vec<InstrId>,
    preds: Vec<InstrId>,
    /// No fall-through edge to the next pushed instruction
    terminator: bool,
    removed: bool,
}

/// An instruction list in program order plus its control-flow edges.
#[derive(Debug, Clone, Default)]
pub struct Code {
    slots: Vec<Slot>,
    head: Option<InstrId>,
    tail: Option<InstrId>,
    len: usize,
    /// Lowest virtual id not used by any instruction, `None` when unknown
    next_var: Option<u32>,
}

impl Code {
    /// Creates an empty instruction list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of live instructions.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the list holds no instructions.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the first instruction in program order.
    #[must_use]
    pub const fn entry(&self) -> Option<InstrId> {
        self.head
    }

    /// Returns the number of arena slots, including removed instructions.
    ///
    /// Every [`InstrId`] ever handed out is below this bound, which makes it
    /// suitable for sizing per-instruction tables.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Appends an instruction which falls through to the next one appended.
    pub fn push(&mut self, instr: Instr) -> InstrId {
        let id = self.alloc(instr);
        if let Some(tail) = self.tail {
            self.slots[tail.0].next = Some(id);
            self.slots[id.0].prev = Some(tail);
            if !self.slots[tail.0].terminator {
                self.link(tail, id);
            }
        } else {
            self.head = Some(id);
        }
        self.tail = Some(id);
        id
    }

    /// Appends an instruction which does not fall through, such as a return or
    /// an unconditional jump.
    pub fn push_terminator(&mut self, instr: Instr) -> InstrId {
        let id = self.push(instr);
        self.slots[id.0].terminator = true;
        id
    }

    /// Adds a control-flow edge `from -> to`.
    ///
    /// Returns `false` if either instruction does not exist or the edge was
    /// already present.
    pub fn add_branch(&mut self, from: InstrId, to: InstrId) -> bool {
        if !self.contains(from) || !self.contains(to) || self.slots[from.0].succs.contains(&to) {
            return false;
        }
        self.link(from, to);
        true
    }

    /// Inserts `instr` directly in front of `at`.
    ///
    /// Returns `None` if `at` does not exist.
    pub fn insert_before(&mut self, at: InstrId, instr: Instr) -> Option<InstrId> {
        if !self.contains(at) {
            return None;
        }

        let id = self.alloc(instr);
        let prev = self.slots[at.0].prev;
        self.slots[id.0].prev = prev;
        self.slots[id.0].next = Some(at);
        self.slots[at.0].prev = Some(id);
        match prev {
            Some(prev) => self.slots[prev.0].next = Some(id),
            None => self.head = Some(id),
        }

        let preds = std::mem::take(&mut self.slots[at.0].preds);
        for pred in &preds {
            for succ in &mut self.slots[pred.0].succs {
                if *succ == at {
                    *succ = id;
                }
            }
        }
        self.slots[id.0].preds = preds;
        self.link(id, at);
        Some(id)
    }

    /// Inserts `instr` directly behind `at`.
    ///
    /// Returns `None` if `at` does not exist.
    pub fn insert_after(&mut self, at: InstrId, instr: Instr) -> Option<InstrId> {
        if !self.contains(at) {
            return None;
        }

        let id = self.alloc(instr);
        let next = self.slots[at.0].next;
        self.slots[id.0].prev = Some(at);
        self.slots[id.0].next = next;
        self.slots[at.0].next = Some(id);
        match next {
            Some(next) => self.slots[next.0].prev = Some(id),
            None => self.tail = Some(id),
        }

        let succs = std::mem::take(&mut self.slots[at.0].succs);
        for succ in &succs {
            for pred in &mut self.slots[succ.0].preds {
                if *pred == at {
                    *pred = id;
                }
            }
        }
        self.slots[id.0].succs = succs;
        self.slots[id.0].terminator = std::mem::take(&mut self.slots[at.0].terminator);
        self.link(at, id);
        Some(id)
    }

    /// Removes an instruction, connecting each predecessor to each successor.
    ///
    /// Returns the removed instruction, or `None` if `id` does not exist.
    pub fn remove(&mut self, id: InstrId) -> Option<Instr> {
        if !self.contains(id) {
            return None;
        }

        let (prev, next) = (self.slots[id.0].prev, self.slots[id.0].next);
        match prev {
            Some(prev) => self.slots[prev.0].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.slots[next.0].prev = prev,
            None => self.tail = prev,
        }

        let preds = std::mem::take(&mut self.slots[id.0].preds);
        let succs = std::mem::take(&mut self.slots[id.0].succs);
        for pred in &preds {
            self.slots[pred.0].succs.retain(|s| *s != id);
        }
        for succ in &succs {
            self.slots[succ.0].preds.retain(|p| *p != id);
        }
        for &pred in preds.iter().filter(|p| **p != id) {
            for &succ in succs.iter().filter(|s| **s != id) {
                if !self.slots[pred.0].succs.contains(&succ) {
                    self.link(pred, succ);
                }
            }
        }

        let slot = &mut self.slots[id.0];
        slot.removed = true;
        slot.prev = None;
        slot.next = None;
        self.len -= 1;
        Some(std::mem::take(&mut slot.instr))
    }

    /// Returns `true` if `id` refers to an instruction that has not been removed.
    #[must_use]
    pub fn contains(&self, id: InstrId) -> bool {
        self.slots.get(id.0).is_some_and(|slot| !slot.removed)
    }

    /// Returns the instruction behind `id`.
    #[must_use]
    pub fn get(&self, id: InstrId) -> Option<&Instr> {
        self.slots
            .get(id.0)
            .filter(|slot| !slot.removed)
            .map(|slot| &slot.instr)
    }

    /// Returns the instruction behind `id` for modification.
    pub fn get_mut(&mut self, id: InstrId) -> Option<&mut Instr> {
        // Operands may change behind our back.
        self.next_var = None;
        self.slots
            .get_mut(id.0)
            .filter(|slot| !slot.removed)
            .map(|slot| &mut slot.instr)
    }

    /// Returns the control-flow successors of `id`.
    #[must_use]
    pub fn successors(&self, id: InstrId) -> &[InstrId] {
        self.slots
            .get(id.0)
            .filter(|slot| !slot.removed)
            .map(|slot| slot.succs.as_slice())
            .unwrap_or_default()
    }

    /// Returns the control-flow predecessors of `id`.
    #[must_use]
    pub fn predecessors(&self, id: InstrId) -> &[InstrId] {
        self.slots
            .get(id.0)
            .filter(|slot| !slot.removed)
            .map(|slot| slot.preds.as_slice())
            .unwrap_or_default()
    }

    /// Iterates over the instructions in program order.
    pub fn iter(&self) -> CodeIter<'_> {
        CodeIter {
            code: self,
            cursor: self.head,
        }
    }

    /// Returns the instruction handles in program order.
    #[must_use]
    pub fn ids(&self) -> Vec<InstrId> {
        self.iter().map(|(id, _)| id).collect()
    }

    /// Replaces every occurrence of `from` in instruction `id` by `to`.
    ///
    /// Returns the number of operands changed.
    pub fn replace_in(&mut self, id: InstrId, from: &Variable, to: Variable) -> usize {
        if let Variable::Virtual(var) = to {
            self.note_var(var);
        }
        match self.slots.get_mut(id.0).filter(|slot| !slot.removed) {
            Some(slot) => slot.instr.replace(from, to),
            None => 0,
        }
    }

    /// Returns the lowest virtual variable id not used by any instruction.
    pub fn next_var_id(&mut self) -> u32 {
        if let Some(next) = self.next_var {
            return next;
        }

        let next = self
            .iter()
            .flat_map(|(_, instr)| instr.defs.iter().chain(instr.uses.iter()))
            .filter_map(Variable::as_virtual)
            .map(|var| var.id() + 1)
            .max()
            .unwrap_or(0);
        self.next_var = Some(next);
        next
    }

    /// Creates a virtual variable whose id is not used anywhere in the list.
    pub fn fresh_var(&mut self, class: DataClass) -> VirtualVar {
        let id = self.next_var_id();
        self.next_var = Some(id + 1);
        VirtualVar::new(id, class)
    }

    fn alloc(&mut self, instr: Instr) -> InstrId {
        for var in instr.defs.iter().chain(instr.uses.iter()).filter_map(Variable::as_virtual) {
            self.note_var(var);
        }

        let id = InstrId(self.slots.len());
        self.slots.push(Slot {
            instr,
            prev: None,
            next: None,
            succs: Vec::new(),
            preds: Vec::new(),
            terminator: false,
            removed: false,
        });
        self.len += 1;
        id
    }

    fn link(&mut self, from: InstrId, to: InstrId) {
        self.slots[from.0].succs.push(to);
        self.slots[to.0].preds.push(from);
    }

    fn note_var(&mut self, var: VirtualVar) {
        if let Some(next) = self.next_var {
            self.next_var = Some(next.max(var.id() + 1));
        }
    }
}

/// Iterator over a [`Code`] list in program order.
pub struct CodeIter<'a> {
    code: &'a Code,
    cursor: Option<InstrId>,
}

impl<'a> Iterator for CodeIter<'a> {
    type Item = (InstrId, &'a Instr);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let slot = &self.code.slots[id.0];
        self.cursor = slot.next;
        Some((id, &slot.instr))
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (id, instr) in self.iter() {
            write!(f, "{:>5}: {instr}", id.to_string())?;
            let succs = self.successors(id);
            let falls_through = self.slots[id.0].next.is_some_and(|next| succs == [next]);
            if !falls_through && !succs.is_empty() {
                write!(f, "  ->")?;
                for succ in succs {
                    write!(f, " {succ}")?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(code: &mut Code) -> Variable {
        Variable::from(code.fresh_var(DataClass::Int64))
    }

    #[test]
    fn test_push_falls_through() {
        let mut code = Code::new();
        let a = code.push(Instr::op("nop", [], []));
        let b = code.push_terminator(Instr::op("jmp", [], []));
        let c = code.push(Instr::op("nop", [], []));

        assert_eq!(code.successors(a), &[b]);
        assert!(code.successors(b).is_empty());
        assert!(code.predecessors(c).is_empty());
        assert!(code.add_branch(b, a));
        assert!(!code.add_branch(b, a));
        assert_eq!(code.predecessors(a), &[b]);
        assert_eq!(code.ids(), vec![a, b, c]);
    }

    #[test]
    fn test_insert_before_redirects_predecessors() {
        let mut code = Code::new();
        let head = code.push(Instr::op("head", [], []));
        let body = code.push(Instr::op("body", [], []));
        let back = code.push_terminator(Instr::op("jmp", [], []));
        code.add_branch(back, body);

        let load = code.insert_before(body, Instr::op("load", [], [])).unwrap();
        assert_eq!(code.ids(), vec![head, load, body, back]);
        assert_eq!(code.successors(head), &[load]);
        assert_eq!(code.successors(back), &[load]);
        assert_eq!(code.successors(load), &[body]);
        assert_eq!(code.predecessors(body), &[load]);

        let first = code.insert_before(head, Instr::op("first", [], [])).unwrap();
        assert_eq!(code.entry(), Some(first));
    }

    #[test]
    fn test_insert_after_inherits_successors() {
        let mut code = Code::new();
        let def = code.push(Instr::op("def", [], []));
        let left = code.push_terminator(Instr::op("left", [], []));
        let right = code.push(Instr::op("right", [], []));
        code.add_branch(def, right);

        let store = code.insert_after(def, Instr::op("store", [], [])).unwrap();
        assert_eq!(code.successors(def), &[store]);
        assert_eq!(code.successors(store), &[left, right]);
        assert_eq!(code.predecessors(right), &[store]);
        assert_eq!(code.ids(), vec![def, store, left, right]);

        let last = code.insert_after(right, Instr::op("last", [], [])).unwrap();
        assert_eq!(code.ids().last(), Some(&last));
    }

    #[test]
    fn test_remove_bridges_edges() {
        let mut code = Code::new();
        let a = code.push(Instr::op("a", [], []));
        let b = code.push(Instr::op("b", [], []));
        let c = code.push(Instr::op("c", [], []));

        let removed = code.remove(b).unwrap();
        assert_eq!(removed.mnemonic, "b");
        assert_eq!(code.len(), 2);
        assert!(code.get(b).is_none());
        assert!(code.remove(b).is_none());
        assert_eq!(code.successors(a), &[c]);
        assert_eq!(code.predecessors(c), &[a]);
        assert_eq!(code.ids(), vec![a, c]);
    }

    #[test]
    fn test_fresh_var_avoids_existing_ids() {
        let mut code = Code::new();
        let high = Variable::Virtual(VirtualVar::new(41, DataClass::Int32));
        code.push(Instr::op("def", [high], []));
        assert_eq!(code.next_var_id(), 42);

        let t = var(&mut code);
        assert_eq!(t.as_virtual().map(|v| v.id()), Some(42));

        let id = code.push(Instr::op("use", [], [t]));
        code.get_mut(id)
            .unwrap()
            .uses
            .push(Variable::Virtual(VirtualVar::new(100, DataClass::Int32)));
        assert_eq!(code.next_var_id(), 101);
    }

    #[test]
    fn test_display_lists_branches() {
        let mut code = Code::new();
        let a = var(&mut code);
        let def = code.push(Instr::op("const", [a], []));
        let jmp = code.push_terminator(Instr::op("jmp", [], []));
        code.add_branch(jmp, def);

        let listing = code.to_string();
        assert!(listing.contains("i0: const v0"));
        assert!(listing.contains("i1: jmp  -> i0"));
    }
}
