/*!
This crate compiles regular expressions into tagged finite automata and
compares two of them structurally.

A comparison does not stop at "equivalent or not". When two patterns
differ, the result lists *where* (a witness prefix) and *how* (an extra
character, a different final state, a missing assertion or a subpattern
boundary in another place) they diverge.

# Example

```
use regex_compare::{Comparer, Mismatch, MatchedAutomaton};

let comparer = Comparer::new();
let result = comparer.compare("a[bc]", "a[b]")?;
assert!(!result.is_equivalent());
match &result.mismatches()[0] {
    Mismatch::Character { matched_automaton, matched_string, characters } => {
        assert_eq!(*matched_automaton, MatchedAutomaton::First);
        assert_eq!(matched_string, "a");
        assert!(characters.contains('c'));
    }
    other => panic!("unexpected mismatch: {}", other),
}
# Ok::<(), regex_compare::Error>(())
```

# Backreferences

Automata with backreferences cannot be compared. Such a comparison fails
with [`Error::StructuralIncompatibility`], which is distinct from a
"not equivalent" verdict:

```
let err = regex_compare::compare(r"(a)\1", "aa").unwrap_err();
assert!(err.is_not_comparable());
```

# Crate features

* **logging** - Emits messages from the compiler and the equivalence walk
through the `log` crate.
*/

#![deny(missing_docs)]

pub use tagged_nfa::{
    AssertionKind, Automaton, Charset, CodePointRange, Comparison, Error, MatchedAutomaton, MergedAssertion,
    Mismatch, MismatchKind, Mode, Placement, TagKind,
};

use tagged_nfa::{compiler, equivalence, parser, Compiler, Equivalence, Origin, Parser};

#[cfg(doctest)]
doc_comment::doctest!("../README.md");

/// A convenience alias for results in this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Compiles and compares patterns with one fixed configuration.
#[derive(Clone, Debug, Default)]
pub struct Comparer {
    parser: parser::Config,
    compiler: compiler::Config,
    equivalence: equivalence::Config,
}

impl Comparer {
    /// A comparer with default settings: tags are compared, every
    /// mismatch is collected.
    pub fn new() -> Comparer {
        Comparer::default()
    }

    /// Start configuring a comparer.
    pub fn builder() -> ComparerBuilder {
        ComparerBuilder::new()
    }

    /// Parse and compile one pattern.
    pub fn compile(&self, pattern: &str) -> Result<Automaton> {
        let ast = Parser::with_config(pattern, self.parser.clone()).parse()?;
        Compiler::with_config(self.compiler.clone()).compile(&ast)
    }

    /// Compile both patterns and compare the automata.
    pub fn compare(&self, first: &str, second: &str) -> Result<Comparison> {
        let mut a = self.compile(first)?;
        let mut b = self.compile(second)?;
        a.set_origin(Origin::First);
        b.set_origin(Origin::Second);
        self.compare_automata(&a, &b)
    }

    /// Compare two already compiled automata.
    pub fn compare_automata(&self, first: &Automaton, second: &Automaton) -> Result<Comparison> {
        Equivalence::new(self.equivalence.clone()).check(first, second)
    }
}

/// Builds a [`Comparer`].
#[derive(Clone, Debug, Default)]
pub struct ComparerBuilder {
    comparer: Comparer,
}

impl ComparerBuilder {
    /// A builder with default settings.
    pub fn new() -> ComparerBuilder {
        ComparerBuilder::default()
    }

    /// Parse both patterns as if they started with `(?i)`.
    pub fn case_insensitive(&mut self, yes: bool) -> &mut ComparerBuilder {
        self.comparer.parser = self.comparer.parser.clone().case_insensitive(yes);
        self
    }

    /// Parse both patterns as if they started with `(?s)`.
    pub fn dot_matches_new_line(&mut self, yes: bool) -> &mut ComparerBuilder {
        self.comparer.parser = self.comparer.parser.clone().dot_matches_new_line(yes);
        self
    }

    /// Maximum group nesting accepted by the parser.
    pub fn nest_limit(&mut self, limit: u32) -> &mut ComparerBuilder {
        self.comparer.parser = self.comparer.parser.clone().nest_limit(limit);
        self
    }

    /// Maximum number of automaton states per pattern.
    pub fn size_limit(&mut self, limit: Option<usize>) -> &mut ComparerBuilder {
        self.comparer.compiler = self.comparer.compiler.clone().size_limit(limit);
        self
    }

    /// Maximum number of zero-width paths followed from one state while
    /// merging.
    pub fn path_limit(&mut self, limit: usize) -> &mut ComparerBuilder {
        self.comparer.compiler = self.comparer.compiler.clone().path_limit(limit);
        self
    }

    /// Compare subpattern boundaries, not only the matched language.
    pub fn with_tags(&mut self, yes: bool) -> &mut ComparerBuilder {
        self.comparer.equivalence = self.comparer.equivalence.clone().with_tags(yes);
        self
    }

    /// Stop at the first mismatch or collect them all.
    pub fn mode(&mut self, mode: Mode) -> &mut ComparerBuilder {
        self.comparer.equivalence = self.comparer.equivalence.clone().mode(mode);
        self
    }

    /// Give up after exploring this many state group pairs.
    pub fn max_steps(&mut self, limit: Option<usize>) -> &mut ComparerBuilder {
        self.comparer.equivalence = self.comparer.equivalence.clone().max_steps(limit);
        self
    }

    /// Build the comparer.
    pub fn build(&self) -> Comparer {
        self.comparer.clone()
    }
}

/// Compare two patterns with default settings.
pub fn compare(first: &str, second: &str) -> Result<Comparison> {
    Comparer::new().compare(first, second)
}
