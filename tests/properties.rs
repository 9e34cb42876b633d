use quickcheck::{quickcheck, Arbitrary, Gen, TestResult};
use regex_compare::{MatchedAutomaton, Mismatch};
use tagged_nfa::Matcher;

use crate::{init_logging, COMPARER, LANGUAGE};

/// A small pattern over the alphabet `{a, b}`.
#[derive(Clone, Debug)]
struct Pattern(String);

impl Arbitrary for Pattern {
    fn arbitrary(g: &mut Gen) -> Pattern {
        Pattern(generate(g, 3))
    }
}

fn generate(g: &mut Gen, depth: u32) -> String {
    let choices = if depth == 0 { 4 } else { 10 };
    match u8::arbitrary(g) % choices {
        0 => "a".to_string(),
        1 => "b".to_string(),
        2 => "[ab]".to_string(),
        3 => ".".to_string(),
        4 | 5 => format!("{}{}", generate(g, depth - 1), generate(g, depth - 1)),
        6 => format!("(?:{}|{})", generate(g, depth - 1), generate(g, depth - 1)),
        7 => format!("(?:{})*", generate(g, depth - 1)),
        8 => format!("(?:{})?", generate(g, depth - 1)),
        _ => format!("({})+", generate(g, depth - 1)),
    }
}

fn input(bits: &[bool]) -> String {
    bits.iter().take(8).map(|&b| if b { 'a' } else { 'b' }).collect()
}

fn is_match(pattern: &str, input: &str) -> bool {
    let fa = COMPARER.compile(pattern).expect("generated patterns compile");
    Matcher::new(&fa).expect("no backreferences").is_match(input)
}

#[test]
fn prop_self_comparison_is_clean() {
    init_logging();
    fn p(pattern: Pattern) -> bool {
        match COMPARER.compare(&pattern.0, &pattern.0) {
            Ok(c) => c.is_equivalent() && c.mismatches().is_empty(),
            Err(_) => false,
        }
    }
    quickcheck(p as fn(Pattern) -> bool);
}

#[test]
fn prop_comparison_is_deterministic() {
    init_logging();
    fn p(a: Pattern, b: Pattern) -> bool {
        let first = COMPARER.compare(&a.0, &b.0);
        let second = COMPARER.compare(&a.0, &b.0);
        first == second
    }
    quickcheck(p as fn(Pattern, Pattern) -> bool);
}

#[test]
fn prop_equivalent_patterns_match_alike() {
    init_logging();
    fn p(a: Pattern, b: Pattern, derived: bool, bits: Vec<bool>) -> TestResult {
        // `x|x{1}` always denotes the same language as `x`
        let b = if derived { format!("(?:{0})|(?:{0}){{1}}", a.0) } else { b.0 };
        let result = match LANGUAGE.compare(&a.0, &b) {
            Ok(result) => result,
            Err(_) => return TestResult::failed(),
        };
        if !result.is_equivalent() {
            return if derived { TestResult::failed() } else { TestResult::discard() };
        }
        let s = input(&bits);
        TestResult::from_bool(is_match(&a.0, &s) == is_match(&b, &s))
    }
    quickcheck(p as fn(Pattern, Pattern, bool, Vec<bool>) -> TestResult);
}

#[test]
fn prop_final_state_witness_is_accepted_by_one_side() {
    init_logging();
    fn p(a: Pattern, b: Pattern) -> bool {
        let result = match LANGUAGE.compare(&a.0, &b.0) {
            Ok(result) => result,
            Err(_) => return false,
        };
        result.mismatches().iter().all(|m| match m {
            Mismatch::FinalState { matched_automaton, matched_string } => {
                let (yes, no) = match matched_automaton {
                    MatchedAutomaton::First => (&a.0, &b.0),
                    MatchedAutomaton::Second => (&b.0, &a.0),
                };
                is_match(yes, matched_string) && !is_match(no, matched_string)
            }
            _ => true,
        })
    }
    quickcheck(p as fn(Pattern, Pattern) -> bool);
}
