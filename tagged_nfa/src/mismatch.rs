//! Records describing where two automata diverge.

use std::fmt;

use crate::charset::Charset;
use crate::transition::TagKind;

pub use crate::transition::{MergedAssertion, Placement};

/// Which of the two compared automata a mismatch is attributed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchedAutomaton {
    First,
    Second,
}

impl MatchedAutomaton {
    /// 1 for the first automaton, 2 for the second.
    pub fn index(self) -> u8 {
        match self {
            MatchedAutomaton::First => 1,
            MatchedAutomaton::Second => 2,
        }
    }

    pub fn other(self) -> MatchedAutomaton {
        match self {
            MatchedAutomaton::First => MatchedAutomaton::Second,
            MatchedAutomaton::Second => MatchedAutomaton::First,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MismatchKind {
    Character,
    FinalState,
    Assertion,
    Subpattern,
}

/// One divergence found by the equivalence walk.
///
/// `matched_string` is a witness prefix: following it leads both automata
/// to the point of divergence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mismatch {
    /// Only `matched_automaton` can consume one of `characters` next.
    Character {
        matched_automaton: MatchedAutomaton,
        matched_string: String,
        characters: Charset,
    },
    /// Only `matched_automaton` accepts `matched_string`.
    FinalState {
        matched_automaton: MatchedAutomaton,
        matched_string: String,
    },
    /// The automata check different assertions on the same path.
    /// `first` and `second` hold the ones found only in that automaton.
    Assertion {
        matched_automaton: MatchedAutomaton,
        matched_string: String,
        first: Vec<MergedAssertion>,
        second: Vec<MergedAssertion>,
    },
    /// The automata open or close subpatterns at different points.
    /// `first` and `second` hold the diverging boundaries of each.
    Subpattern {
        matched_automaton: MatchedAutomaton,
        matched_string: String,
        first: Vec<(u32, TagKind)>,
        second: Vec<(u32, TagKind)>,
    },
}

impl Mismatch {
    pub fn kind(&self) -> MismatchKind {
        match self {
            Mismatch::Character { .. } => MismatchKind::Character,
            Mismatch::FinalState { .. } => MismatchKind::FinalState,
            Mismatch::Assertion { .. } => MismatchKind::Assertion,
            Mismatch::Subpattern { .. } => MismatchKind::Subpattern,
        }
    }

    pub fn matched_automaton(&self) -> MatchedAutomaton {
        match self {
            Mismatch::Character { matched_automaton, .. }
            | Mismatch::FinalState { matched_automaton, .. }
            | Mismatch::Assertion { matched_automaton, .. }
            | Mismatch::Subpattern { matched_automaton, .. } => *matched_automaton,
        }
    }

    pub fn matched_string(&self) -> &str {
        match self {
            Mismatch::Character { matched_string, .. }
            | Mismatch::FinalState { matched_string, .. }
            | Mismatch::Assertion { matched_string, .. }
            | Mismatch::Subpattern { matched_string, .. } => matched_string,
        }
    }

    /// Subpattern numbers involved in a subpattern mismatch.
    pub fn subpatterns(&self) -> Vec<u32> {
        match self {
            Mismatch::Subpattern { first, second, .. } => {
                let mut numbers: Vec<u32> = first.iter().chain(second.iter()).map(|&(n, _)| n).collect();
                numbers.sort_unstable();
                numbers.dedup();
                numbers
            }
            _ => Vec::new(),
        }
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    write!(f, "[")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    write!(f, "]")
}

struct Boundary((u32, TagKind));

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", (self.0).1, (self.0).0)
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = self.matched_automaton().index();
        match self {
            Mismatch::Character { matched_string, characters, .. } => write!(
                f,
                "character mismatch after {:?}: only automaton {} matches {}",
                matched_string, side, characters
            ),
            Mismatch::FinalState { matched_string, .. } => {
                write!(f, "final state mismatch: only automaton {} accepts {:?}", side, matched_string)
            }
            Mismatch::Assertion { matched_string, first, second, .. } => {
                write!(f, "assertion mismatch after {:?} (automaton {} matches more): ", matched_string, side)?;
                write_list(f, first)?;
                write!(f, " vs ")?;
                write_list(f, second)
            }
            Mismatch::Subpattern { matched_string, first, second, .. } => {
                write!(f, "subpattern mismatch after {:?} (automaton {}): ", matched_string, side)?;
                let first: Vec<Boundary> = first.iter().copied().map(Boundary).collect();
                let second: Vec<Boundary> = second.iter().copied().map(Boundary).collect();
                write_list(f, &first)?;
                write!(f, " vs ")?;
                write_list(f, &second)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaf::AssertionKind;

    #[test]
    fn accessors() {
        let m = Mismatch::Character {
            matched_automaton: MatchedAutomaton::First,
            matched_string: "a".to_string(),
            characters: Charset::from_char('c'),
        };
        assert_eq!(m.kind(), MismatchKind::Character);
        assert_eq!(m.matched_automaton().index(), 1);
        assert_eq!(m.matched_automaton().other(), MatchedAutomaton::Second);
        assert_eq!(m.matched_string(), "a");
        assert_eq!(m.to_string(), "character mismatch after \"a\": only automaton 1 matches c");
    }

    #[test]
    fn display_lists_details() {
        let m = Mismatch::Subpattern {
            matched_automaton: MatchedAutomaton::First,
            matched_string: "a".to_string(),
            first: vec![(1, TagKind::Close), (2, TagKind::Open)],
            second: vec![],
        };
        assert_eq!(m.subpatterns(), vec![1, 2]);
        assert_eq!(m.to_string(), "subpattern mismatch after \"a\" (automaton 1): [close 1, open 2] vs []");
        let m = Mismatch::Assertion {
            matched_automaton: MatchedAutomaton::Second,
            matched_string: String::new(),
            first: vec![MergedAssertion { kind: AssertionKind::Circumflex, placement: Placement::Before }],
            second: vec![],
        };
        assert_eq!(m.to_string(), "assertion mismatch after \"\" (automaton 2 matches more): [^ before] vs []");
    }
}
