use regex_compare::{
    AssertionKind, Comparer, Error, MatchedAutomaton, MergedAssertion, Mismatch, MismatchKind, Mode, Placement,
    TagKind,
};

use crate::{compile, init_logging, COMPARER, LANGUAGE};

#[test]
fn same_source_is_equivalent() -> anyhow::Result<()> {
    init_logging();
    let patterns = [
        "abc",
        "a|b|c",
        "(a|b)*abb",
        "x{2,4}y?",
        "^(?:foo|bar)+$",
        "\\bword\\b",
        "((a)|(b))*",
        "[[:alpha:]_][[:alnum:]_]*",
        "(?i)hello",
        "",
    ];
    for pattern in patterns {
        let result = COMPARER.compare(pattern, pattern)?;
        assert!(result.is_equivalent(), "{}: {:?}", pattern, result.mismatches());
        assert!(result.mismatches().is_empty());
        assert!(result.explored() > 0);
    }
    Ok(())
}

#[test]
fn extra_character_in_class() -> anyhow::Result<()> {
    init_logging();
    let result = COMPARER.compare("a[bc]", "a[b]")?;
    assert!(!result.is_equivalent());
    assert_eq!(result.mismatches().len(), 1);
    let m = &result.mismatches()[0];
    assert_eq!(m.kind(), MismatchKind::Character);
    assert_eq!(m.matched_automaton(), MatchedAutomaton::First);
    assert_eq!(m.matched_string(), "a");
    match m {
        Mismatch::Character { characters, .. } => {
            assert!(characters.contains('c'));
            assert!(!characters.contains('b'));
        }
        _ => unreachable!(),
    }

    // the same difference seen from the other side
    let result = COMPARER.compare("a[b]", "a[bc]")?;
    assert_eq!(result.mismatches()[0].matched_automaton(), MatchedAutomaton::Second);
    Ok(())
}

#[test]
fn subpattern_close_moves() -> anyhow::Result<()> {
    init_logging();
    let result = COMPARER.compare("(a)(b)", "(ab)")?;
    assert!(!result.is_equivalent());
    let m = result
        .mismatches()
        .iter()
        .find(|m| m.kind() == MismatchKind::Subpattern)
        .expect("a subpattern mismatch");
    assert_eq!(m.matched_string(), "a");
    assert!(m.subpatterns().contains(&1));
    match m {
        Mismatch::Subpattern { first, .. } => assert!(first.contains(&(1, TagKind::Close))),
        _ => unreachable!(),
    }

    // the languages are the same
    assert!(LANGUAGE.compare("(a)(b)", "(ab)")?.is_equivalent());
    Ok(())
}

#[test]
fn moved_subpattern_does_not_hide_the_language() -> anyhow::Result<()> {
    init_logging();
    let result = COMPARER.compare("(a)|ab", "a|ab")?;
    let kinds: Vec<MismatchKind> = result.mismatches().iter().map(|m| m.kind()).collect();
    assert_eq!(kinds, vec![MismatchKind::Subpattern], "{:?}", result.mismatches());
    assert_eq!(result.mismatches()[0].matched_string(), "a");
    assert_eq!(result.mismatches()[0].subpatterns(), vec![1]);

    let result = COMPARER.compare("(a)bc|ade", "abc|ade")?;
    assert!(!result.mismatches().iter().any(|m| m.kind() == MismatchKind::Character), "{:?}", result.mismatches());
    assert!(!result.mismatches().iter().any(|m| m.kind() == MismatchKind::FinalState));
    assert!(LANGUAGE.compare("(a)bc|ade", "abc|ade")?.is_equivalent());
    Ok(())
}

#[test]
fn anchored_alternatives_are_intersected() -> anyhow::Result<()> {
    init_logging();
    let result = COMPARER.compare("a|^a", "a")?;
    assert!(result.is_equivalent(), "{:?}", result.mismatches());
    // `$` in front of a letter can never hold
    assert!(COMPARER.compare("$a|b", "b")?.is_equivalent());
    let result = COMPARER.compare("^a", "a|^a")?;
    assert_eq!(result.mismatches().len(), 1);
    assert_eq!(result.mismatches()[0].kind(), MismatchKind::Assertion);
    assert_eq!(result.mismatches()[0].matched_automaton(), MatchedAutomaton::Second);
    Ok(())
}

#[test]
fn circumflex_is_an_assertion_mismatch() -> anyhow::Result<()> {
    init_logging();
    let result = COMPARER.compare("^abc", "abc")?;
    assert!(!result.is_equivalent());
    match &result.mismatches()[0] {
        Mismatch::Assertion { matched_automaton, matched_string, first, second } => {
            assert_eq!(*matched_automaton, MatchedAutomaton::Second);
            assert_eq!(matched_string, "a");
            assert_eq!(first, &vec![MergedAssertion { kind: AssertionKind::Circumflex, placement: Placement::Before }]);
            assert!(second.is_empty());
        }
        other => panic!("unexpected {}", other),
    }
    Ok(())
}

#[test]
fn redundant_anchors_do_not_matter() -> anyhow::Result<()> {
    init_logging();
    assert!(COMPARER.compare("\\A^abc", "\\Aabc")?.is_equivalent());
    assert!(COMPARER.compare("abc$\\z", "abc\\z")?.is_equivalent());
    assert!(!COMPARER.compare("abc$", "abc\\z")?.is_equivalent());
    Ok(())
}

#[test]
fn word_boundary_only_on_one_side() -> anyhow::Result<()> {
    init_logging();
    let result = COMPARER.compare("\\bcat", "cat")?;
    assert!(result.mismatches().iter().any(|m| m.kind() == MismatchKind::Assertion));
    Ok(())
}

#[test]
fn final_state_mismatch_points_at_prefix() -> anyhow::Result<()> {
    init_logging();
    let result = COMPARER.compare("ab*", "ab+")?;
    assert_eq!(result.mismatches().len(), 1);
    let m = &result.mismatches()[0];
    assert_eq!(m.kind(), MismatchKind::FinalState);
    assert_eq!(m.matched_automaton(), MatchedAutomaton::First);
    assert_eq!(m.matched_string(), "a");
    Ok(())
}

#[test]
fn backreference_is_not_comparable() {
    init_logging();
    for (a, b) in [("(a)\\1", "aa"), ("aa", "(a)\\1"), ("(a)\\g{1}", "(a)\\g{1}")] {
        match COMPARER.compare(a, b) {
            Err(Error::StructuralIncompatibility { subpattern }) => assert_eq!(subpattern, 1),
            other => panic!("{} vs {}: unexpected {:?}", a, b, other),
        }
    }
}

#[test]
fn exact_mode_reports_one() -> anyhow::Result<()> {
    init_logging();
    let exact = Comparer::builder().mode(Mode::ExactMatch).build();
    assert_eq!(exact.compare("a|b|c", "d|e|f")?.mismatches().len(), 1);
    assert!(COMPARER.compare("a|b|c", "d|e|f")?.mismatches().len() > 1);
    Ok(())
}

#[test]
fn budget_exhaustion_is_inconclusive() {
    init_logging();
    let tiny = Comparer::builder().max_steps(Some(1)).build();
    assert!(matches!(tiny.compare("abc", "abc"), Err(Error::ExplorationBudgetExceeded { steps: 1 })));
}

#[test]
fn parse_errors_surface() {
    assert!(matches!(COMPARER.compare("(a", "a"), Err(Error::Parse { .. })));
    assert!(matches!(COMPARER.compare("a", "(?<=a)b"), Err(Error::UnsupportedFeature(_))));
}

#[test]
fn builder_flags_reach_the_parser() -> anyhow::Result<()> {
    let ci = Comparer::builder().case_insensitive(true).build();
    assert!(ci.compare("abc", "[aA][bB][cC]")?.is_equivalent());
    assert!(!COMPARER.compare("abc", "[aA][bB][cC]")?.is_equivalent());
    let dotall = Comparer::builder().dot_matches_new_line(true).build();
    assert!(dotall.compare(".", "(?s).")?.is_equivalent());
    Ok(())
}

#[test]
fn comparing_compiled_automata() -> anyhow::Result<()> {
    let a = compile("(?:ab)*")?;
    let b = compile("(?:ab)*(?:ab)*")?;
    assert!(COMPARER.compare_automata(&a, &b)?.is_equivalent());
    let free = regex_compare::compare("x+", "xx*")?;
    assert!(free.is_equivalent());
    Ok(())
}
