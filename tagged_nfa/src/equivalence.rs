//! Structural equivalence of two tagged automata.
//!
//! Both automata are walked in lock step, breadth first, over pairs of
//! state groups. Each pair's outgoing transitions are divided into
//! partitions (see [`GroupsPair::divide_intervals`]).
//!
//! Two walks share the work-list. The language walk follows every state
//! each automaton reaches, so characters and final states are compared
//! exactly; assertions are compared by intersecting the transitions of
//! both sides. The tag walk follows groups crossing the same subpattern
//! boundaries and reports only where those boundaries differ. Pairs
//! already explored are remembered by their state sets, so cycles
//! terminate.

use std::collections::{BTreeSet, HashSet, VecDeque};

use crate::group::{Division, GroupsPair, PathStep, StatesGroup};
use crate::mismatch::{MatchedAutomaton, Mismatch};
use crate::nfa::{Automaton, StateId};
use crate::transition::{MergedAssertion, TagKind, Transition};
use crate::{Error, Result};

/// How many mismatches to collect.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    /// Stop at the first mismatch.
    ExactMatch,
    /// Walk everything and report every mismatch.
    #[default]
    FullDiff,
}

#[derive(Clone, Debug)]
pub struct Config {
    with_tags: bool,
    mode: Mode,
    max_steps: Option<usize>,
}

impl Default for Config {
    fn default() -> Config {
        Config { with_tags: true, mode: Mode::FullDiff, max_steps: Some(100_000) }
    }
}

impl Config {
    pub fn new() -> Config {
        Config::default()
    }

    /// Compare subpattern boundaries as well as the matched language.
    pub fn with_tags(mut self, yes: bool) -> Config {
        self.with_tags = yes;
        self
    }

    pub fn mode(mut self, mode: Mode) -> Config {
        self.mode = mode;
        self
    }

    /// Give up with [`Error::ExplorationBudgetExceeded`] after exploring
    /// this many pairs.
    pub fn max_steps(mut self, limit: Option<usize>) -> Config {
        self.max_steps = limit;
        self
    }

    pub fn get_with_tags(&self) -> bool {
        self.with_tags
    }

    pub fn get_mode(&self) -> Mode {
        self.mode
    }

    pub fn get_max_steps(&self) -> Option<usize> {
        self.max_steps
    }
}

/// The outcome of a completed check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Comparison {
    equivalent: bool,
    mismatches: Vec<Mismatch>,
    explored: usize,
}

impl Comparison {
    pub fn is_equivalent(&self) -> bool {
        self.equivalent
    }

    pub fn mismatches(&self) -> &[Mismatch] {
        &self.mismatches
    }

    pub fn into_mismatches(self) -> Vec<Mismatch> {
        self.mismatches
    }

    /// Number of group pairs explored.
    pub fn explored(&self) -> usize {
        self.explored
    }
}

#[derive(Clone, Debug, Default)]
pub struct Equivalence {
    config: Config,
}

impl Equivalence {
    pub fn new(config: Config) -> Equivalence {
        Equivalence { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Compare two automata.
    pub fn check(&self, first: &Automaton, second: &Automaton) -> Result<Comparison> {
        let mut mismatches = Vec::new();
        let explored = self.walk(first, second, &mut mismatches)?;
        Ok(Comparison { equivalent: mismatches.is_empty(), mismatches, explored })
    }

    /// Compare two automata, appending mismatches to `out`. Returns true if
    /// none were found.
    pub fn check_into(&self, first: &Automaton, second: &Automaton, out: &mut Vec<Mismatch>) -> Result<bool> {
        let before = out.len();
        self.walk(first, second, out)?;
        Ok(out.len() == before)
    }

    fn walk(&self, first: &Automaton, second: &Automaton, out: &mut Vec<Mismatch>) -> Result<usize> {
        for fa in [first, second] {
            if let Some(&subpattern) = fa.backreferences().first() {
                return Err(Error::StructuralIncompatibility { subpattern });
            }
        }

        let before = out.len();
        let start = GroupsPair::start(first, second);
        let mut visited: HashSet<(Walk, Vec<StateId>, Vec<StateId>)> = HashSet::new();
        let mut queue = VecDeque::new();
        let mut walks = vec![Walk::Language];
        if self.config.with_tags {
            walks.push(Walk::Tags);
        }
        for walk in walks {
            let (k1, k2) = start.key();
            visited.insert((walk, k1, k2));
            queue.push_back((walk, start.clone()));
        }
        let mut explored = 0;

        while let Some((walk, pair)) = queue.pop_front() {
            explored += 1;
            if let Some(max) = self.config.max_steps {
                if explored > max {
                    return Err(Error::ExplorationBudgetExceeded { steps: max });
                }
            }
            trace!("{:?}: {:?} / {:?} after {:?}", walk, pair.first.states, pair.second.states, pair.matched);

            if walk == Walk::Language {
                let (final1, final2) = (pair.first.is_final(first), pair.second.is_final(second));
                if final1 != final2 {
                    let side = if final1 { MatchedAutomaton::First } else { MatchedAutomaton::Second };
                    self.emit(out, Mismatch::FinalState { matched_automaton: side, matched_string: pair.matched.clone() });
                    if self.stop(out, before) {
                        return Ok(explored);
                    }
                }
            }

            for division in pair.divide_intervals(first, second, walk == Walk::Tags)? {
                let mismatch = match walk {
                    Walk::Language => inspect(&pair, &division)?,
                    Walk::Tags => inspect_tags(&division),
                };
                if let Some(mismatch) = mismatch {
                    self.emit(out, mismatch);
                    if self.stop(out, before) {
                        return Ok(explored);
                    }
                }
                let children: Vec<GroupsPair> = match walk {
                    Walk::Language => division.reached.into_iter().collect(),
                    Walk::Tags => division.pairs,
                };
                for child in children {
                    let (k1, k2) = child.key();
                    if visited.insert((walk, k1, k2)) {
                        queue.push_back((walk, child));
                    }
                }
            }
        }
        debug!("explored {} pairs, {} mismatches", explored, out.len() - before);
        Ok(explored)
    }

    fn emit(&self, out: &mut Vec<Mismatch>, mismatch: Mismatch) {
        debug!("{}", mismatch);
        out.push(mismatch);
    }

    fn stop(&self, out: &[Mismatch], before: usize) -> bool {
        self.config.mode == Mode::ExactMatch && out.len() > before
    }
}

/// Which comparison a queued pair belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Walk {
    /// All reached states; characters, final states and assertions.
    Language,
    /// Groups crossing equal tags; subpattern boundaries only.
    Tags,
}

/// The character or assertion mismatch a division shows, if any.
///
/// A side with nothing in the division gives a character or assertion
/// mismatch. Otherwise every transition must meet one on the other side
/// whose intersection checks nothing more than the transition itself;
/// one that does not accepts strings the other side rejects.
fn inspect(pair: &GroupsPair, division: &Division) -> Result<Option<Mismatch>> {
    let (ts1, ts2) = (&division.first, &division.second);
    if ts1.is_empty() && ts2.is_empty() {
        return Ok(None);
    }
    if division.is_one_sided() {
        let side = if ts2.is_empty() { MatchedAutomaton::First } else { MatchedAutomaton::Second };
        return Ok(match &division.step {
            PathStep::Character(set) => Some(Mismatch::Character {
                matched_automaton: side,
                matched_string: pair.matched.clone(),
                characters: set.clone(),
            }),
            PathStep::Assertion(_) => {
                let found = assertions(if ts2.is_empty() { ts1 } else { ts2 });
                let (first, second) = if ts2.is_empty() { (found, Vec::new()) } else { (Vec::new(), found) };
                Some(Mismatch::Assertion { matched_automaton: side, matched_string: pair.matched.clone(), first, second })
            }
            PathStep::Epsilon => None,
        });
    }

    let loose1 = uncovered(ts1, ts2)?;
    let loose2 = uncovered(ts2, ts1)?;
    if loose1.is_empty() && loose2.is_empty() {
        return Ok(None);
    }
    let (found1, found2) = (assertions(ts1), assertions(ts2));
    let mut first: Vec<MergedAssertion> = found1.iter().filter(|a| !found2.contains(a)).copied().collect();
    let mut second: Vec<MergedAssertion> = found2.iter().filter(|a| !found1.contains(a)).copied().collect();
    if first.is_empty() && second.is_empty() {
        first = assertions(&loose1);
        second = assertions(&loose2);
    }
    let side = match (loose1.is_empty(), loose2.is_empty()) {
        (false, true) => MatchedAutomaton::First,
        (true, false) => MatchedAutomaton::Second,
        // Fewer checks accept more strings.
        _ if first.len() > second.len() => MatchedAutomaton::Second,
        _ => MatchedAutomaton::First,
    };
    Ok(Some(Mismatch::Assertion { matched_automaton: side, matched_string: division.matched.clone(), first, second }))
}

/// Transitions of `ts` that no transition of `others` can be taken
/// together with, without checking more than they do.
fn uncovered(ts: &[Transition], others: &[Transition]) -> Result<Vec<Transition>> {
    let mut out = Vec::new();
    for t in ts {
        let own = t.resolved_assertions();
        let mut covered = false;
        for other in others {
            if let Some(both) = t.intersect(other)? {
                if both.resolved_assertions() == own {
                    covered = true;
                    break;
                }
            }
        }
        if !covered {
            out.push(t.clone());
        }
    }
    Ok(out)
}

/// The subpattern mismatch a division shows, if any.
///
/// Tag groups left without a counterpart give the boundaries only their
/// side crosses, or both full tag sets when the same boundaries are
/// crossed on different sides of the character.
fn inspect_tags(division: &Division) -> Option<Mismatch> {
    if division.is_one_sided() || division.is_balanced() {
        return None;
    }
    let tags = |groups: &[StatesGroup]| -> BTreeSet<(u32, TagKind)> { groups.iter().flat_map(StatesGroup::tag_set).collect() };
    let all = |ts: &[Transition]| -> BTreeSet<(u32, TagKind)> { ts.iter().flat_map(Transition::tag_set).collect() };
    let (tags1, tags2) = (tags(&division.unmatched_first), tags(&division.unmatched_second));
    let (all1, all2) = (all(&division.first), all(&division.second));
    let mut first: Vec<(u32, TagKind)> = tags1.difference(&all2).copied().collect();
    let mut second: Vec<(u32, TagKind)> = tags2.difference(&all1).copied().collect();
    if first.is_empty() && second.is_empty() {
        first = tags1.into_iter().collect();
        second = tags2.into_iter().collect();
    }
    let side = if first.is_empty() { MatchedAutomaton::Second } else { MatchedAutomaton::First };
    Some(Mismatch::Subpattern { matched_automaton: side, matched_string: division.matched.clone(), first, second })
}

fn assertions(ts: &[Transition]) -> Vec<MergedAssertion> {
    let set: BTreeSet<MergedAssertion> = ts.iter().flat_map(Transition::resolved_assertions).collect();
    set.into_iter().collect()
}
