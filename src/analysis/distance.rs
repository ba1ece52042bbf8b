//! Control-flow distances between instructions.
//!
//! Spill selection asks how far a variable's next use is from its definition.
//! Every edge in the instruction graph counts as one step, so a breadth-first
//! search from the definition yields the shortest distance to every reachable
//! instruction in a single pass.

use std::collections::{HashMap, VecDeque};

use crate::ir::{Code, InstrId};

/// Returns the minimum number of control-flow edges from `start` to every
/// instruction reachable from it. `start` itself is at distance zero.
///
/// # Examples
///
/// ```rust
/// use regcolor::{analysis::distances_from, ir::{Code, Instr}};
///
/// let mut code = Code::new();
/// let a = code.push(Instr::op("a", [], []));
/// let b = code.push(Instr::op("b", [], []));
/// let c = code.push(Instr::op("c", [], []));
/// code.add_branch(a, c);
///
/// let dist = distances_from(&code, a);
/// assert_eq!(dist[&b], 1);
/// assert_eq!(dist[&c], 1);
/// ```
#[must_use]
pub fn distances_from(code: &Code, start: InstrId) -> HashMap<InstrId, usize> {
    let mut dist = HashMap::new();
    if !code.contains(start) {
        return dist;
    }

    let mut queue = VecDeque::new();
    dist.insert(start, 0);
    queue.push_back(start);
    while let Some(node) = queue.pop_front() {
        let next = dist[&node] + 1;
        for &succ in code.successors(node) {
            if let std::collections::hash_map::Entry::Vacant(entry) = dist.entry(succ) {
                entry.insert(next);
                queue.push_back(succ);
            }
        }
    }
    dist
}
