//! Tagged finite automata for regular expressions, with structural
//! equivalence checking.
//!
//! The pipeline is:
//!
//! ```text
//! pattern ──parser──> Ast ──compiler──> Thompson NFA ──merge──> Automaton
//!                                                                   │
//!                 Automaton ──equivalence──> Comparison { mismatches }
//! ```
//!
//! Every transition of a compiled [`Automaton`] consumes a character (or
//! is a standalone zero-width assertion) and carries the subpattern
//! boundaries ([`Tag`]s) it crosses. Zero-width transitions are merged
//! into the neighbouring character transitions so that two automata can
//! be walked in lock step by [`Equivalence`], which reports *where* and
//! *how* they differ instead of a single boolean.

#[macro_use]
mod macros;

pub mod ast;
pub mod charset;
pub mod compiler;
pub mod equivalence;
pub mod group;
pub mod leaf;
pub mod matcher;
pub mod mismatch;
pub mod nfa;
pub mod parser;
pub mod transition;

pub use ast::{Ast, Node};
pub use charset::{divide_intervals, Charset, CodePointRange, PartitionPiece};
pub use compiler::Compiler;
pub use equivalence::{Comparison, Equivalence, Mode};
pub use group::{Division, GroupsPair, PathStep, StatesGroup};
pub use leaf::{AssertionKind, Greediness, Leaf, NodePosition};
pub use matcher::{MatchResult, Matcher};
pub use mismatch::{MatchedAutomaton, Mismatch, MismatchKind};
pub use nfa::{Automaton, StateId};
pub use parser::Parser;
pub use transition::{MergedAssertion, Origin, Placement, Tag, TagKind, Transition};

/// The result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while parsing, compiling or comparing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The pattern is not syntactically valid.
    Parse {
        /// Char offset in the pattern where the problem was found.
        position: usize,
        message: String,
    },
    /// The pattern uses a construct this crate does not model.
    UnsupportedFeature(String),
    /// A set of code point ranges is unsorted, overlapping or out of range.
    MalformedCharset(String),
    /// The pattern would produce an automaton above the configured limits.
    TooComplex(String),
    /// Two transitions cannot be intersected because one of them is a
    /// backreference. The automata are not comparable.
    StructuralIncompatibility {
        /// The subpattern referenced by the offending transition.
        subpattern: u32,
    },
    /// The equivalence walk hit its step budget before reaching a verdict.
    /// This is inconclusive, not "not equivalent".
    ExplorationBudgetExceeded {
        steps: usize,
    },
}

impl Error {
    pub(crate) fn parse(position: usize, message: impl Into<String>) -> Error {
        Error::Parse { position, message: message.into() }
    }

    /// Returns true when the error means "these automata cannot be
    /// compared" rather than a problem with either input on its own.
    pub fn is_not_comparable(&self) -> bool {
        matches!(self, Error::StructuralIncompatibility { .. })
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Parse { position, message } => {
                write!(f, "parse error at {}: {}", position, message)
            }
            Error::UnsupportedFeature(feature) => write!(f, "unsupported feature: {}", feature),
            Error::MalformedCharset(msg) => write!(f, "malformed charset: {}", msg),
            Error::TooComplex(msg) => write!(f, "regex pattern is too complex: {}", msg),
            Error::StructuralIncompatibility { subpattern } => write!(
                f,
                "automata not comparable: backreference to subpattern {} cannot be intersected",
                subpattern
            ),
            Error::ExplorationBudgetExceeded { steps } => {
                write!(f, "comparison inconclusive after {} steps", steps)
            }
        }
    }
}

impl std::error::Error for Error {}
