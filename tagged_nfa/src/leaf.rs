//! The conditions a single transition can carry.

use std::fmt;

use crate::charset::Charset;
use crate::{Error, Result};

/// A zero-width assertion.
///
/// There is no multiline mode, so `^` holds at the same positions as `\A`
/// and `$` at the same positions as `\Z`. They are still kept apart
/// because a grader cares which one the author wrote.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AssertionKind {
    /// `\A`
    StartOfString,
    /// `^`
    Circumflex,
    /// `\z`
    EndOfString,
    /// `\Z`
    EndOfStringBeforeNewline,
    /// `$`
    Dollar,
    /// `\b`
    WordBoundary,
    /// `\B`
    NonWordBoundary,
}

impl AssertionKind {
    /// Every kind, in the order assertion partitions are explored.
    pub const ALL: [AssertionKind; 7] = [
        AssertionKind::StartOfString,
        AssertionKind::Circumflex,
        AssertionKind::EndOfString,
        AssertionKind::EndOfStringBeforeNewline,
        AssertionKind::Dollar,
        AssertionKind::WordBoundary,
        AssertionKind::NonWordBoundary,
    ];

    pub fn is_word_boundary(self) -> bool {
        matches!(self, AssertionKind::WordBoundary | AssertionKind::NonWordBoundary)
    }

    /// True for assertions that hold at the start of the subject.
    pub fn is_start(self) -> bool {
        matches!(self, AssertionKind::StartOfString | AssertionKind::Circumflex)
    }

    /// True for assertions that hold at (or just before a final newline at)
    /// the end of the subject.
    pub fn is_end(self) -> bool {
        matches!(
            self,
            AssertionKind::EndOfString | AssertionKind::EndOfStringBeforeNewline | AssertionKind::Dollar
        )
    }

    /// True if `self` holding at a position makes `other` redundant there:
    /// `\A` covers `^`, `\z` covers `\Z` and `$`, `\Z` covers `$`.
    pub fn supersedes(self, other: AssertionKind) -> bool {
        use AssertionKind::*;
        matches!(
            (self, other),
            (StartOfString, Circumflex)
                | (EndOfString, EndOfStringBeforeNewline)
                | (EndOfString, Dollar)
                | (EndOfStringBeforeNewline, Dollar)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AssertionKind::StartOfString => "\\A",
            AssertionKind::Circumflex => "^",
            AssertionKind::EndOfString => "\\z",
            AssertionKind::EndOfStringBeforeNewline => "\\Z",
            AssertionKind::Dollar => "$",
            AssertionKind::WordBoundary => "\\b",
            AssertionKind::NonWordBoundary => "\\B",
        }
    }
}

impl fmt::Display for AssertionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Repetition preference of the quantifier a transition was built under.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Greediness {
    Lazy,
    #[default]
    Greedy,
    Possessive,
}

/// Span of a node in the pattern, in chars, end exclusive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodePosition {
    pub start: usize,
    pub end: usize,
}

impl NodePosition {
    pub fn new(start: usize, end: usize) -> NodePosition {
        NodePosition { start, end }
    }
}

impl fmt::Display for NodePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// The condition on a transition.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Leaf {
    /// Consumes one character from the set.
    Charset(Charset),
    /// Consumes nothing; holds or fails at a position.
    Assertion(AssertionKind),
    /// Consumes whatever the numbered subpattern last captured.
    Backreference(u32),
    /// Consumes nothing and always holds.
    Empty,
}

impl Leaf {
    pub fn consumes_chars(&self) -> bool {
        matches!(self, Leaf::Charset(_) | Leaf::Backreference(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Leaf::Empty)
    }

    pub fn charset(&self) -> Option<&Charset> {
        match self {
            Leaf::Charset(cs) => Some(cs),
            _ => None,
        }
    }

    pub fn assertion(&self) -> Option<AssertionKind> {
        match self {
            Leaf::Assertion(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn backreference(&self) -> Option<u32> {
        match self {
            Leaf::Backreference(n) => Some(*n),
            _ => None,
        }
    }

    /// Same variant, and for assertions the same kind.
    pub fn same_type(&self, other: &Leaf) -> bool {
        match (self, other) {
            (Leaf::Assertion(a), Leaf::Assertion(b)) => a == b,
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }

    /// The condition under which both leaves hold at once.
    ///
    /// `Ok(None)` means the leaves never hold together. Backreferences
    /// cannot be decided here and fail with
    /// [`Error::StructuralIncompatibility`].
    pub fn intersect(&self, other: &Leaf) -> Result<Option<Leaf>> {
        if let Some(n) = self.backreference().or_else(|| other.backreference()) {
            return Err(Error::StructuralIncompatibility { subpattern: n });
        }
        Ok(match (self, other) {
            (Leaf::Charset(a), Leaf::Charset(b)) => {
                let both = a.intersect(b);
                if both.is_empty() {
                    None
                } else {
                    Some(Leaf::Charset(both))
                }
            }
            (Leaf::Assertion(a), Leaf::Assertion(b)) => {
                if a == b || a.supersedes(*b) {
                    Some(Leaf::Assertion(*a))
                } else if b.supersedes(*a) {
                    Some(Leaf::Assertion(*b))
                } else {
                    None
                }
            }
            (Leaf::Empty, Leaf::Empty) => Some(Leaf::Empty),
            _ => None,
        })
    }
}

impl fmt::Display for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Leaf::Charset(cs) => write!(f, "{}", cs),
            Leaf::Assertion(kind) => write!(f, "{}", kind),
            Leaf::Backreference(n) => write!(f, "\\{}", n),
            Leaf::Empty => write!(f, "ε"),
        }
    }
}
