use std::collections::BTreeSet;

use crate::leaf::{AssertionKind, Leaf};
use crate::nfa::{Automaton, StateId};
use crate::transition::Transition;
use crate::{Error, Result};

/// Runs a tagged automaton against input by tracking the set of live
/// states. Merged and standalone assertions are checked at the position
/// they sit at.
pub struct Matcher<'a> {
    fa: &'a Automaton,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub matched: bool,
    /// Char offset of the first matched char.
    pub start: usize,
    /// Char offset one past the last matched char.
    pub end: usize,
}

impl<'a> Matcher<'a> {
    /// Create a new matcher for the given automaton.
    ///
    /// Backreferences are not simulated; such automata are rejected.
    pub fn new(fa: &'a Automaton) -> Result<Self> {
        if let Some(&subpattern) = fa.backreferences().first() {
            return Err(Error::StructuralIncompatibility { subpattern });
        }
        Ok(Self { fa })
    }

    /// Check if the entire input matches
    pub fn is_match(&self, input: &str) -> bool {
        let chars: Vec<char> = input.chars().collect();
        let mut states = self.closure(&chars, 0, [self.fa.start()].into_iter().collect());
        for pos in 0..chars.len() {
            if states.is_empty() {
                return false;
            }
            states = self.step(&chars, pos, &states);
            states = self.closure(&chars, pos + 1, states);
        }
        states.iter().any(|&s| self.fa.is_final(s))
    }

    /// Find the leftmost match, extended as far as possible
    pub fn find(&self, input: &str) -> Option<MatchResult> {
        let chars: Vec<char> = input.chars().collect();
        (0..=chars.len()).find_map(|start| {
            self.match_at(&chars, start).map(|end| MatchResult { matched: true, start, end })
        })
    }

    /// Find all non-overlapping matches, left to right
    pub fn find_all(&self, input: &str) -> Vec<MatchResult> {
        let chars: Vec<char> = input.chars().collect();
        let mut matches = Vec::new();
        let mut start = 0;
        while start <= chars.len() {
            match self.match_at(&chars, start) {
                Some(end) => {
                    matches.push(MatchResult { matched: true, start, end });
                    // Move past this match
                    start = end.max(start + 1);
                }
                None => start += 1,
            }
        }
        matches
    }

    /// Longest match starting at `start`
    fn match_at(&self, chars: &[char], start: usize) -> Option<usize> {
        let mut states = self.closure(chars, start, [self.fa.start()].into_iter().collect());
        let mut best = None;
        let mut pos = start;
        loop {
            if states.iter().any(|&s| self.fa.is_final(s)) {
                best = Some(pos);
            }
            if pos == chars.len() || states.is_empty() {
                return best;
            }
            states = self.step(chars, pos, &states);
            pos += 1;
            states = self.closure(chars, pos, states);
        }
    }

    /// Follow zero-width transitions that hold at `pos`
    fn closure(&self, chars: &[char], pos: usize, states: BTreeSet<StateId>) -> BTreeSet<StateId> {
        let mut closure = states;
        let mut stack: Vec<StateId> = closure.iter().copied().collect();
        while let Some(state) = stack.pop() {
            for t in self.fa.outgoing(state).filter(|t| !t.consumes_chars) {
                let holds = match &t.leaf {
                    Leaf::Assertion(kind) => assertion_holds(*kind, chars, pos),
                    _ => true,
                };
                if holds
                    && merged_hold(&t.merged_before, chars, pos)
                    && merged_hold(&t.merged_after, chars, pos)
                    && closure.insert(t.to)
                {
                    stack.push(t.to);
                }
            }
        }
        closure
    }

    /// Consume `chars[pos]`
    fn step(&self, chars: &[char], pos: usize, states: &BTreeSet<StateId>) -> BTreeSet<StateId> {
        let ch = chars[pos];
        let mut next = BTreeSet::new();
        for &state in states {
            for t in self.fa.outgoing(state) {
                let matches = match &t.leaf {
                    Leaf::Charset(set) => set.contains(ch),
                    _ => false,
                };
                if matches && merged_hold(&t.merged_before, chars, pos) && merged_hold(&t.merged_after, chars, pos + 1) {
                    next.insert(t.to);
                }
            }
        }
        next
    }
}

fn merged_hold(merged: &[Transition], chars: &[char], pos: usize) -> bool {
    merged
        .iter()
        .filter_map(|t| t.leaf.assertion())
        .all(|kind| assertion_holds(kind, chars, pos))
}

fn is_word(ch: Option<&char>) -> bool {
    matches!(ch, Some(c) if c.is_alphanumeric() || *c == '_')
}

/// Evaluate an assertion between `chars[pos - 1]` and `chars[pos]`.
pub fn assertion_holds(kind: AssertionKind, chars: &[char], pos: usize) -> bool {
    let at_end = pos == chars.len();
    match kind {
        AssertionKind::StartOfString | AssertionKind::Circumflex => pos == 0,
        AssertionKind::EndOfString => at_end,
        AssertionKind::EndOfStringBeforeNewline | AssertionKind::Dollar => {
            at_end || (pos + 1 == chars.len() && chars[pos] == '\n')
        }
        AssertionKind::WordBoundary | AssertionKind::NonWordBoundary => {
            let before = pos.checked_sub(1).and_then(|i| chars.get(i));
            let boundary = is_word(before) != is_word(chars.get(pos));
            boundary == (kind == AssertionKind::WordBoundary)
        }
    }
}
