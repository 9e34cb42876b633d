use std::collections::{BTreeSet, VecDeque};
use std::fmt;

use crate::transition::{Origin, Transition};

/// A state ID in the automaton
pub type StateId = usize;

/// A finite automaton with tagged transitions.
///
/// States are plain indices; transitions live in one arena and every state
/// keeps the indices of its outgoing transitions. The same type holds both
/// the Thompson automaton (with epsilon transitions) and the merged one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Automaton {
    transitions: Vec<Transition>,
    outgoing: Vec<Vec<usize>>,
    start: StateId,
    finals: BTreeSet<StateId>,
}

impl Automaton {
    /// Create a new empty automaton
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new state and return its ID
    pub fn add_state(&mut self) -> StateId {
        self.outgoing.push(Vec::new());
        self.outgoing.len() - 1
    }

    pub fn state_count(&self) -> usize {
        self.outgoing.len()
    }

    /// Add a transition between two existing states and return its index
    pub fn add_transition(&mut self, transition: Transition) -> usize {
        debug_assert!(transition.from < self.outgoing.len() && transition.to < self.outgoing.len());
        let idx = self.transitions.len();
        self.outgoing[transition.from].push(idx);
        self.transitions.push(transition);
        idx
    }

    pub fn start(&self) -> StateId {
        self.start
    }

    pub fn set_start(&mut self, state: StateId) {
        self.start = state;
    }

    /// Outgoing transitions of a state
    pub fn outgoing(&self, state: StateId) -> impl Iterator<Item = &Transition> + '_ {
        self.outgoing
            .get(state)
            .into_iter()
            .flatten()
            .map(move |&idx| &self.transitions[idx])
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub(crate) fn transitions_mut(&mut self) -> &mut [Transition] {
        &mut self.transitions
    }

    pub fn is_final(&self, state: StateId) -> bool {
        self.finals.contains(&state)
    }

    pub fn set_final(&mut self, state: StateId) {
        self.finals.insert(state);
    }

    pub fn finals(&self) -> &BTreeSet<StateId> {
        &self.finals
    }

    /// Check if any state in the set is accepting, following epsilon
    /// transitions
    pub fn is_final_group(&self, states: &BTreeSet<StateId>) -> bool {
        self.epsilon_closure(states).iter().any(|s| self.is_final(*s))
    }

    /// Get epsilon closure of a set of states
    pub fn epsilon_closure(&self, states: &BTreeSet<StateId>) -> BTreeSet<StateId> {
        let mut closure = states.clone();
        let mut stack: Vec<StateId> = states.iter().copied().collect();
        while let Some(state) = stack.pop() {
            for t in self.outgoing(state).filter(|t| t.is_eps()) {
                if closure.insert(t.to) {
                    stack.push(t.to);
                }
            }
        }
        closure
    }

    /// Subpatterns referenced by backreference transitions
    pub fn backreferences(&self) -> Vec<u32> {
        let mut refs: Vec<u32> = self.transitions.iter().filter_map(|t| t.leaf.backreference()).collect();
        refs.sort_unstable();
        refs.dedup();
        refs
    }

    pub fn has_backreference(&self) -> bool {
        self.transitions.iter().any(Transition::is_backreference)
    }

    /// Mark every transition (and its merged ones) as belonging to `origin`.
    pub fn set_origin(&mut self, origin: Origin) {
        for t in &mut self.transitions {
            t.origin = origin;
            for m in t.merged_before.iter_mut().chain(t.merged_after.iter_mut()) {
                m.origin = origin;
            }
        }
    }

    /// True if `to` can be reached from `from`, trivially so when equal.
    pub fn reaches(&self, from: StateId, to: StateId) -> bool {
        let mut seen = vec![false; self.state_count()];
        let mut queue = VecDeque::from([from]);
        while let Some(state) = queue.pop_front() {
            if state == to {
                return true;
            }
            if std::mem::replace(&mut seen[state], true) {
                continue;
            }
            queue.extend(self.outgoing(state).map(|t| t.to));
        }
        false
    }

    /// Emit a Graphviz DOT representation of the automaton.
    pub fn to_dot(&self, mut buffer: impl fmt::Write) -> fmt::Result {
        writeln!(buffer, "digraph automaton {{")?;
        writeln!(buffer, "\trankdir=LR;")?;
        writeln!(buffer, "\t{} [shape=box];", self.start)?;
        for f in &self.finals {
            writeln!(buffer, "\t{} [peripheries=2];", f)?;
        }
        for t in &self.transitions {
            let label = t.to_string().replace('\\', "\\\\").replace('"', "\\\"");
            writeln!(buffer, "\t{} -> {} [label=\"{}\"];", t.from, t.to, label)?;
        }
        writeln!(buffer, "}}")
    }
}

impl fmt::Display for Automaton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Start state: {}", self.start)?;
        writeln!(f, "Accepting states: {:?}", self.finals)?;
        writeln!(f, "States:")?;
        for (state, out) in self.outgoing.iter().enumerate() {
            if out.is_empty() {
                writeln!(f, "  {}: {}", state, if self.is_final(state) { "MATCH" } else { "-" })?;
                continue;
            }
            writeln!(f, "  {}:", state)?;
            for &idx in out {
                let t = &self.transitions[idx];
                writeln!(f, "    {} -> {}", t, t.to)?;
            }
        }
        Ok(())
    }
}
