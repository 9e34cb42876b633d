//! State groups explored in lock step and their division into partitions.

use std::collections::BTreeSet;
use std::fmt;

use crate::charset::{self, Charset};
use crate::leaf::AssertionKind;
use crate::nfa::{Automaton, StateId};
use crate::transition::{MergedAssertion, Placement, TagKind, Transition};
use crate::{Error, Result};

/// The condition a division was taken on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathStep {
    Character(Charset),
    Assertion(AssertionKind),
    Epsilon,
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathStep::Character(set) => write!(f, "{}", set),
            PathStep::Assertion(kind) => write!(f, "{}", kind),
            PathStep::Epsilon => write!(f, "ε"),
        }
    }
}

/// Tags crossed on the way into a group, with their placement.
type TagKey = Vec<(Placement, u32, TagKind)>;

/// States of one automaton reached along one path.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatesGroup {
    pub states: BTreeSet<StateId>,
    /// Tags crossed by the transitions that led here. Empty for groups
    /// that ignore tags.
    pub tags: TagKey,
    pub transitions: Vec<Transition>,
}

impl StatesGroup {
    pub fn new(states: BTreeSet<StateId>) -> StatesGroup {
        StatesGroup { states, ..StatesGroup::default() }
    }

    pub fn start(fa: &Automaton) -> StatesGroup {
        StatesGroup::new([fa.start()].into_iter().collect())
    }

    /// Every state reached by `transitions`, whatever tags they cross.
    pub fn reached(transitions: &[Transition]) -> StatesGroup {
        StatesGroup {
            states: transitions.iter().map(|t| t.to).collect(),
            tags: Vec::new(),
            transitions: transitions.to_vec(),
        }
    }

    pub fn is_final(&self, fa: &Automaton) -> bool {
        fa.is_final_group(&self.states)
    }

    pub fn key(&self) -> Vec<StateId> {
        self.states.iter().copied().collect()
    }

    /// Every `(subpattern, kind)` boundary crossed on the way in.
    pub fn tag_set(&self) -> BTreeSet<(u32, TagKind)> {
        self.transitions.iter().flat_map(Transition::tag_set).collect()
    }

    /// Every assertion checked on the way in.
    pub fn assertions(&self) -> BTreeSet<MergedAssertion> {
        self.transitions.iter().flat_map(Transition::resolved_assertions).collect()
    }

    /// The transitions leaving this group that can be taken at all, with
    /// leading anchors applied to what they consume.
    fn outgoing(&self, fa: &Automaton) -> Result<Vec<Transition>> {
        let all: Vec<&Transition> = self.states.iter().flat_map(|&s| fa.outgoing(s)).collect();
        if let Some(n) = all.iter().find_map(|t| t.leaf.backreference()) {
            return Err(Error::StructuralIncompatibility { subpattern: n });
        }
        let mut out = Vec::with_capacity(all.len());
        for t in all {
            out.extend(t.restrict_by_anchors()?);
        }
        Ok(out)
    }

    /// Group transitions by the tags they cross. Order follows the first
    /// transition of each group.
    fn by_tags(transitions: &[Transition]) -> Vec<StatesGroup> {
        let mut groups: Vec<StatesGroup> = Vec::new();
        for t in transitions {
            let key = t.tag_key();
            let at = match groups.iter().position(|g| g.tags == key) {
                Some(at) => at,
                None => {
                    groups.push(StatesGroup { tags: key, ..StatesGroup::default() });
                    groups.len() - 1
                }
            };
            groups[at].states.insert(t.to);
            groups[at].transitions.push(t.clone());
        }
        groups
    }
}

/// A group of each automaton reached by the same input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupsPair {
    pub first: StatesGroup,
    pub second: StatesGroup,
    /// A string leading both automata here.
    pub matched: String,
}

/// One partition of a pair's outgoing transitions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Division {
    pub step: PathStep,
    /// Transitions of the first automaton taken on this step.
    pub first: Vec<Transition>,
    /// Transitions of the second automaton taken on this step.
    pub second: Vec<Transition>,
    /// A string leading both automata through this step.
    pub matched: String,
    /// Everything each automaton reaches on this step. `None` when only
    /// one of them can take it.
    pub reached: Option<GroupsPair>,
    /// Groups of both automata crossing the same tags. Filled only when
    /// dividing with tags.
    pub pairs: Vec<GroupsPair>,
    /// Tag groups of the first automaton with no counterpart.
    pub unmatched_first: Vec<StatesGroup>,
    /// Tag groups of the second automaton with no counterpart.
    pub unmatched_second: Vec<StatesGroup>,
}

impl Division {
    /// True if only one automaton has transitions here.
    pub fn is_one_sided(&self) -> bool {
        self.first.is_empty() || self.second.is_empty()
    }

    /// True if every tag group has a counterpart.
    pub fn is_balanced(&self) -> bool {
        self.unmatched_first.is_empty() && self.unmatched_second.is_empty()
    }
}

impl GroupsPair {
    pub fn new(first: StatesGroup, second: StatesGroup) -> GroupsPair {
        GroupsPair { first, second, matched: String::new() }
    }

    pub fn start(fa1: &Automaton, fa2: &Automaton) -> GroupsPair {
        GroupsPair::new(StatesGroup::start(fa1), StatesGroup::start(fa2))
    }

    /// Identity of the pair for cycle detection.
    pub fn key(&self) -> (Vec<StateId>, Vec<StateId>) {
        (self.first.key(), self.second.key())
    }

    /// Partition the outgoing transitions of both groups: by disjoint
    /// character ranges, then by assertion kind, then epsilon.
    ///
    /// Each division records every state reached on either side. With
    /// `with_tags` set, the transitions of each side are also grouped by
    /// the tags they cross and groups with equal tags are paired.
    pub fn divide_intervals(&self, fa1: &Automaton, fa2: &Automaton, with_tags: bool) -> Result<Vec<Division>> {
        let out1 = self.first.outgoing(fa1)?;
        let out2 = self.second.outgoing(fa2)?;
        let mut divisions = Vec::new();

        // characters
        let chars1: Vec<&Transition> = out1.iter().filter(|t| t.leaf.charset().is_some()).collect();
        let chars2: Vec<&Transition> = out2.iter().filter(|t| t.leaf.charset().is_some()).collect();
        let sets1: Vec<Charset> = chars1.iter().filter_map(|t| t.leaf.charset().cloned()).collect();
        let sets2: Vec<Charset> = chars2.iter().filter_map(|t| t.leaf.charset().cloned()).collect();
        let mut provenance: Vec<(Vec<usize>, Vec<usize>, Charset)> = Vec::new();
        for piece in charset::divide_intervals(&sets1, &sets2) {
            let set = Charset::from_range(piece.range);
            match provenance.iter_mut().find(|(f, s, _)| *f == piece.first && *s == piece.second) {
                Some(entry) => entry.2 = entry.2.union(&set),
                None => provenance.push((piece.first, piece.second, set)),
            }
        }
        for (first, second, set) in provenance {
            // no string can take a step made of surrogates only
            if set.sample().is_none() {
                continue;
            }
            let ts1: Vec<Transition> = first.iter().map(|&i| chars1[i].clone()).collect();
            let ts2: Vec<Transition> = second.iter().map(|&i| chars2[i].clone()).collect();
            divisions.push(self.divide(PathStep::Character(set), ts1, ts2, with_tags));
        }

        // standalone assertions
        for kind in AssertionKind::ALL {
            let ts1: Vec<Transition> = out1.iter().filter(|t| t.leaf.assertion() == Some(kind)).cloned().collect();
            let ts2: Vec<Transition> = out2.iter().filter(|t| t.leaf.assertion() == Some(kind)).cloned().collect();
            if !ts1.is_empty() || !ts2.is_empty() {
                divisions.push(self.divide(PathStep::Assertion(kind), ts1, ts2, with_tags));
            }
        }

        // epsilon
        let eps1: Vec<Transition> = out1.iter().filter(|t| t.is_eps()).cloned().collect();
        let eps2: Vec<Transition> = out2.iter().filter(|t| t.is_eps()).cloned().collect();
        if !eps1.is_empty() || !eps2.is_empty() {
            divisions.push(self.divide(PathStep::Epsilon, eps1, eps2, with_tags));
        }

        Ok(divisions)
    }

    fn divide(&self, step: PathStep, ts1: Vec<Transition>, ts2: Vec<Transition>, with_tags: bool) -> Division {
        let matched = match &step {
            PathStep::Character(set) => {
                let mut matched = self.matched.clone();
                matched.extend(set.sample());
                matched
            }
            _ => self.matched.clone(),
        };
        let pair = |first: StatesGroup, second: StatesGroup| GroupsPair { first, second, matched: matched.clone() };

        // A side without an epsilon transition stays where it is.
        let stay = step == PathStep::Epsilon;
        let reached = match (ts1.is_empty(), ts2.is_empty()) {
            (false, false) => Some(pair(StatesGroup::reached(&ts1), StatesGroup::reached(&ts2))),
            (true, false) if stay => Some(pair(self.first.clone(), StatesGroup::reached(&ts2))),
            (false, true) if stay => Some(pair(StatesGroup::reached(&ts1), self.second.clone())),
            _ => None,
        };

        let mut pairs = Vec::new();
        let mut unmatched_first = Vec::new();
        let mut unmatched_second = Vec::new();
        if with_tags {
            let groups1 = StatesGroup::by_tags(&ts1);
            let groups2 = StatesGroup::by_tags(&ts2);
            if stay && (ts1.is_empty() || ts2.is_empty()) {
                pairs.extend(groups1.into_iter().map(|g1| pair(g1, self.second.clone())));
                pairs.extend(groups2.into_iter().map(|g2| pair(self.first.clone(), g2)));
            } else {
                let mut groups2: Vec<Option<StatesGroup>> = groups2.into_iter().map(Some).collect();
                for g1 in groups1 {
                    let counterpart = groups2.iter_mut().find(|g| matches!(g, Some(g2) if g2.tags == g1.tags));
                    match counterpart.and_then(Option::take) {
                        Some(g2) => pairs.push(pair(g1, g2)),
                        None => unmatched_first.push(g1),
                    }
                }
                unmatched_second = groups2.into_iter().flatten().collect();
            }
        }

        Division { step, first: ts1, second: ts2, matched, reached, pairs, unmatched_first, unmatched_second }
    }
}
