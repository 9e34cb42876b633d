//! Transitions of a tagged automaton and their pairwise intersection.

use std::fmt;

use crate::charset::Charset;
use crate::leaf::{AssertionKind, Greediness, Leaf, NodePosition};
use crate::nfa::StateId;
use crate::{Error, Result};

/// Whether a tag opens or closes its subpattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TagKind {
    Open,
    Close,
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagKind::Open => f.write_str("open"),
            TagKind::Close => f.write_str("close"),
        }
    }
}

/// A subpattern boundary crossed by a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag {
    pub subpattern: u32,
    pub kind: TagKind,
    /// Span of the subpattern node the tag comes from.
    pub position: NodePosition,
}

impl Tag {
    pub fn open(subpattern: u32, position: NodePosition) -> Tag {
        Tag { subpattern, kind: TagKind::Open, position }
    }

    pub fn close(subpattern: u32, position: NodePosition) -> Tag {
        Tag { subpattern, kind: TagKind::Close, position }
    }

    /// The tag without its position.
    pub fn key(&self) -> (u32, TagKind) {
        (self.subpattern, self.kind)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TagKind::Open => write!(f, "({}", self.subpattern),
            TagKind::Close => write!(f, "){}", self.subpattern),
        }
    }
}

/// Which automaton a transition belongs to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Origin {
    #[default]
    First,
    Second,
    /// Built by intersecting a transition of each automaton.
    Intersection,
}

/// Where a zero-width condition sits relative to the owning transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Placement {
    Before,
    Standalone,
    After,
}

/// An assertion carried by a transition, with its placement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MergedAssertion {
    pub kind: AssertionKind,
    pub placement: Placement,
}

impl fmt::Display for MergedAssertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.placement {
            Placement::Before => write!(f, "{} before", self.kind),
            Placement::Standalone => write!(f, "{}", self.kind),
            Placement::After => write!(f, "{} after", self.kind),
        }
    }
}

/// A labeled edge between two states.
///
/// After merging, `merged_before` and `merged_after` hold the zero-width
/// transitions (assertions and tagged epsilons) matched right before and
/// right after this one. Merged entries never carry merged lists of their
/// own.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Transition {
    pub from: StateId,
    pub to: StateId,
    pub leaf: Leaf,
    pub greediness: Greediness,
    pub open_tags: Vec<Tag>,
    pub close_tags: Vec<Tag>,
    pub merged_before: Vec<Transition>,
    pub merged_after: Vec<Transition>,
    pub origin: Origin,
    pub consumes_chars: bool,
    pub loops_back: bool,
    /// Span of the leaf in the pattern.
    pub position: NodePosition,
    /// Innermost subpattern containing the leaf.
    pub subpattern: Option<u32>,
}

impl Transition {
    pub fn new(from: StateId, to: StateId, leaf: Leaf) -> Transition {
        Transition {
            from,
            to,
            consumes_chars: leaf.consumes_chars(),
            leaf,
            greediness: Greediness::default(),
            open_tags: Vec::new(),
            close_tags: Vec::new(),
            merged_before: Vec::new(),
            merged_after: Vec::new(),
            origin: Origin::default(),
            loops_back: false,
            position: NodePosition::default(),
            subpattern: None,
        }
    }

    pub fn epsilon(from: StateId, to: StateId) -> Transition {
        Transition::new(from, to, Leaf::Empty)
    }

    pub fn with_tag(mut self, tag: Tag) -> Transition {
        self.add_tag(tag);
        self
    }

    pub fn with_greediness(mut self, greediness: Greediness) -> Transition {
        self.greediness = greediness;
        self
    }

    pub fn with_position(mut self, position: NodePosition) -> Transition {
        self.position = position;
        self
    }

    pub fn with_subpattern(mut self, subpattern: Option<u32>) -> Transition {
        self.subpattern = subpattern;
        self
    }

    pub fn with_origin(mut self, origin: Origin) -> Transition {
        self.origin = origin;
        self
    }

    pub fn is_eps(&self) -> bool {
        self.leaf.is_empty()
    }

    pub fn is_assert(&self) -> bool {
        self.leaf.assertion().is_some()
    }

    /// An assertion that may still be folded into a neighbour. Word
    /// boundaries never are.
    pub fn is_unmerged_assert(&self) -> bool {
        matches!(self.leaf.assertion(), Some(kind) if !kind.is_word_boundary())
    }

    pub fn is_backreference(&self) -> bool {
        self.leaf.backreference().is_some()
    }

    pub fn has_tags(&self) -> bool {
        !self.open_tags.is_empty() || !self.close_tags.is_empty()
    }

    fn add_tag(&mut self, tag: Tag) {
        let list = match tag.kind {
            TagKind::Open => &mut self.open_tags,
            TagKind::Close => &mut self.close_tags,
        };
        if let Err(at) = list.binary_search(&tag) {
            list.insert(at, tag);
        }
    }

    /// Add the tags of `other` that this transition does not have yet.
    pub fn unite_tags(&mut self, other: &Transition) {
        for tag in other.open_tags.iter().chain(other.close_tags.iter()) {
            self.add_tag(*tag);
        }
    }

    /// Every `(subpattern, kind)` boundary this transition crosses.
    pub fn tag_set(&self) -> Vec<(u32, TagKind)> {
        let mut set: Vec<(u32, TagKind)> =
            self.open_tags.iter().chain(self.close_tags.iter()).map(Tag::key).collect();
        set.sort();
        set.dedup();
        set
    }

    /// Tag boundaries together with the side of the consumed character
    /// they are crossed on.
    pub fn tag_key(&self) -> Vec<(Placement, u32, TagKind)> {
        let mut key = Vec::new();
        let mut merged = Vec::new();
        for (placement, list) in [(Placement::Before, &self.merged_before), (Placement::After, &self.merged_after)] {
            for t in list {
                for tag in t.tag_set() {
                    key.push((placement, tag.0, tag.1));
                    merged.push(tag);
                }
            }
        }
        for tag in self.tag_set() {
            if !merged.contains(&tag) {
                key.push((Placement::Standalone, tag.0, tag.1));
            }
        }
        key.sort();
        key.dedup();
        key
    }

    /// Assertions this transition checks, with their placement.
    pub fn assertions(&self) -> Vec<MergedAssertion> {
        let mut out = Vec::new();
        for (placement, list) in [(Placement::Before, &self.merged_before), (Placement::After, &self.merged_after)] {
            for kind in list.iter().filter_map(|t| t.leaf.assertion()) {
                out.push(MergedAssertion { kind, placement });
            }
        }
        if let Some(kind) = self.leaf.assertion() {
            out.push(MergedAssertion { kind, placement: Placement::Standalone });
        }
        out.sort();
        out.dedup();
        out
    }

    /// Two merged transitions stand for the same pattern element.
    pub fn is_same_merge(&self, other: &Transition) -> bool {
        self.leaf.same_type(&other.leaf)
            && self.position == other.position
            && self.subpattern == other.subpattern
            && self.tag_set() == other.tag_set()
    }

    fn push_merged(list: &mut Vec<Transition>, mut t: Transition) {
        t.merged_before.clear();
        t.merged_after.clear();
        t.loops_back = false;
        if !list.iter().any(|m| m.is_same_merge(&t)) {
            list.push(t);
        }
    }

    /// Fold the zero-width transition `t` in front of this one, keeping
    /// merge depth at one.
    pub fn absorb_before(&mut self, t: &Transition) {
        self.unite_tags(t);
        for m in t.merged_before.iter().chain(std::iter::once(t)).chain(t.merged_after.iter()) {
            Transition::push_merged(&mut self.merged_before, m.clone());
        }
    }

    /// Fold the zero-width transition `t` behind this one.
    pub fn absorb_after(&mut self, t: &Transition) {
        self.unite_tags(t);
        for m in t.merged_before.iter().chain(std::iter::once(t)).chain(t.merged_after.iter()) {
            Transition::push_merged(&mut self.merged_after, m.clone());
        }
    }

    /// Point merged transitions at the owner's states: the ones before at
    /// `from`, the ones after at `to`.
    pub fn redirect_merged_transitions(&mut self) {
        for m in &mut self.merged_before {
            m.from = self.from;
            m.to = self.from;
        }
        for m in &mut self.merged_after {
            m.from = self.to;
            m.to = self.to;
        }
    }

    /// Drop merged assertions made redundant by a stronger one on the same
    /// side: `^` by `\A`, `\Z` by `\z`, `$` by `\Z` or `\z`.
    pub fn resolve_assertion_conflicts(&mut self) {
        let own = self.leaf.assertion();
        for list in [&mut self.merged_before, &mut self.merged_after] {
            let kinds: Vec<AssertionKind> = list.iter().filter_map(|t| t.leaf.assertion()).chain(own).collect();
            list.retain(|t| match t.leaf.assertion() {
                Some(kind) => !kinds.iter().any(|k| k.supersedes(kind)),
                None => true,
            });
        }
    }

    /// Apply the anchors merged in front of a consuming transition to the
    /// character it consumes: `\z` leaves nothing, `\Z` and `$` leave only
    /// a newline. `Ok(None)` when the transition can never be taken.
    pub fn restrict_by_anchors(&self) -> Result<Option<Transition>> {
        if !self.consumes_chars {
            return Ok(Some(self.clone()));
        }
        let mut out = self.clone();
        for anchor in self.merged_before.iter().filter(|m| m.is_unmerged_assert()) {
            match anchor.intersect(&out)? {
                Some(t) => out = t,
                None => return Ok(None),
            }
        }
        Ok(Some(out))
    }

    /// Assertions checked, with the redundant ones dropped.
    pub fn resolved_assertions(&self) -> Vec<MergedAssertion> {
        let mut t = self.clone();
        t.resolve_assertion_conflicts();
        t.assertions()
    }

    /// The condition under which this transition and `other` can be taken
    /// together.
    ///
    /// Returns `Ok(None)` when they never can. Fails with
    /// [`Error::StructuralIncompatibility`] if either side is a
    /// backreference.
    pub fn intersect(&self, other: &Transition) -> Result<Option<Transition>> {
        if let Some(n) = self.leaf.backreference().or_else(|| other.leaf.backreference()) {
            return Err(Error::StructuralIncompatibility { subpattern: n });
        }

        if self.is_eps() && !other.consumes_chars {
            return Ok(Some(Transition::absorb_epsilon(self, other)));
        }
        if other.is_eps() && !self.consumes_chars {
            return Ok(Some(Transition::absorb_epsilon(other, self)));
        }

        if self.is_unmerged_assert() && other.consumes_chars {
            return Ok(Transition::probe_assertion(self, other));
        }
        if other.is_unmerged_assert() && self.consumes_chars {
            return Ok(Transition::probe_assertion(other, self));
        }

        let leaf = match self.leaf.intersect(&other.leaf)? {
            Some(leaf) => leaf,
            None => return Ok(None),
        };
        let mut result = Transition::new(self.from, self.to, leaf)
            .with_greediness(self.greediness)
            .with_position(self.position)
            .with_subpattern(self.subpattern)
            .with_origin(Origin::Intersection);
        result.open_tags = self.open_tags.clone();
        result.close_tags = self.close_tags.clone();
        result.unite_tags(other);
        for m in self.merged_before.iter().chain(other.merged_before.iter()) {
            Transition::push_merged(&mut result.merged_before, m.clone());
        }
        for m in self.merged_after.iter().chain(other.merged_after.iter()) {
            Transition::push_merged(&mut result.merged_after, m.clone());
        }
        result.resolve_assertion_conflicts();
        result.loops_back = if self.consumes_chars && other.consumes_chars {
            self.loops_back && other.loops_back
        } else {
            self.loops_back || other.loops_back
        };
        result.redirect_merged_transitions();
        Ok(Some(result))
    }

    fn absorb_epsilon(eps: &Transition, other: &Transition) -> Transition {
        let mut result = other.clone();
        result.origin = Origin::Intersection;
        result.unite_tags(eps);
        for m in &eps.merged_before {
            Transition::push_merged(&mut result.merged_before, m.clone());
        }
        if eps.has_tags() {
            Transition::push_merged(&mut result.merged_before, eps.clone());
        }
        for m in &eps.merged_after {
            Transition::push_merged(&mut result.merged_after, m.clone());
        }
        result.resolve_assertion_conflicts();
        result.redirect_merged_transitions();
        result
    }

    /// Check an anchor against a consuming transition taken right after it.
    /// Start anchors allow any character, `\Z` and `$` only the final
    /// newline, `\z` none at all.
    fn probe_assertion(assert: &Transition, other: &Transition) -> Option<Transition> {
        let kind = assert.leaf.assertion()?;
        let leaf = match kind {
            AssertionKind::StartOfString | AssertionKind::Circumflex => other.leaf.clone(),
            AssertionKind::EndOfStringBeforeNewline | AssertionKind::Dollar => {
                let newline = Charset::from_char('\n');
                let allowed = other.leaf.charset()?.intersect(&newline);
                if allowed.is_empty() {
                    return None;
                }
                Leaf::Charset(allowed)
            }
            _ => return None,
        };
        let mut result = other.clone();
        result.leaf = leaf;
        result.origin = Origin::Intersection;
        result.absorb_before(assert);
        result.resolve_assertion_conflicts();
        result.redirect_merged_transitions();
        Some(result)
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for m in &self.merged_before {
            write!(f, "{} ", m.leaf)?;
        }
        for tag in &self.open_tags {
            write!(f, "{} ", tag)?;
        }
        write!(f, "{}", self.leaf)?;
        for tag in &self.close_tags {
            write!(f, " {}", tag)?;
        }
        for m in &self.merged_after {
            write!(f, " {}", m.leaf)?;
        }
        match self.greediness {
            Greediness::Lazy => write!(f, " lazy")?,
            Greediness::Possessive => write!(f, " possessive")?,
            Greediness::Greedy => {}
        }
        if self.loops_back {
            write!(f, " ↺")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charset::CodePointRange;
    use quickcheck::{quickcheck, Arbitrary, Gen};

    fn chars(lo: char, hi: char) -> Leaf {
        Leaf::Charset(Charset::from_range(CodePointRange::between(lo, hi)))
    }

    fn pos(start: usize) -> NodePosition {
        NodePosition::new(start, start + 1)
    }

    #[derive(Clone, Debug)]
    struct ArbTransition(Transition);

    impl Arbitrary for ArbTransition {
        fn arbitrary(g: &mut Gen) -> ArbTransition {
            let leaf = match u8::arbitrary(g) % 3 {
                0 => {
                    let lo = u32::arbitrary(g) % 200;
                    let hi = lo + u32::arbitrary(g) % 50;
                    Leaf::Charset(Charset::new(CodePointRange::new(lo, hi).ok()))
                }
                1 => Leaf::Assertion(*g.choose(&AssertionKind::ALL).unwrap_or(&AssertionKind::Dollar)),
                _ => Leaf::Empty,
            };
            let mut t = Transition::new(usize::arbitrary(g) % 8, usize::arbitrary(g) % 8, leaf)
                .with_position(pos(usize::arbitrary(g) % 10));
            if bool::arbitrary(g) {
                t.add_tag(Tag::open(1 + u32::arbitrary(g) % 3, pos(0)));
            }
            if bool::arbitrary(g) {
                t.add_tag(Tag::close(1 + u32::arbitrary(g) % 3, pos(0)));
            }
            if bool::arbitrary(g) {
                let anchor = Transition::new(0, 0, Leaf::Assertion(AssertionKind::Circumflex)).with_position(pos(20));
                t.absorb_before(&anchor);
            }
            t.loops_back = bool::arbitrary(g);
            ArbTransition(t)
        }
    }

    #[test]
    fn prop_self_intersection_keeps_leaf() {
        fn p(t: ArbTransition) -> bool {
            let t = t.0;
            let mut fresh = t.clone();
            fresh.from += 100;
            fresh.to += 100;
            match t.intersect(&fresh) {
                Ok(Some(i)) => i.leaf == t.leaf && i.tag_set() == t.tag_set(),
                _ => false,
            }
        }
        quickcheck(p as fn(ArbTransition) -> bool);
    }

    #[test]
    fn charsets_intersect_to_overlap() {
        let a = Transition::new(0, 1, chars('a', 'm'));
        let b = Transition::new(5, 6, chars('k', 'z')).with_origin(Origin::Second);
        let i = a.intersect(&b).unwrap().unwrap();
        assert_eq!(i.leaf, chars('k', 'm'));
        assert_eq!((i.from, i.to), (0, 1));
        assert_eq!(i.origin, Origin::Intersection);
        let c = Transition::new(5, 6, chars('x', 'z'));
        assert!(a.intersect(&c).unwrap().is_none());
    }

    #[test]
    fn backreference_fails_instead_of_missing() {
        let a = Transition::new(0, 1, chars('a', 'a'));
        let b = Transition::new(0, 1, Leaf::Backreference(2));
        assert_eq!(a.intersect(&b), Err(Error::StructuralIncompatibility { subpattern: 2 }));
        assert_eq!(b.intersect(&a), Err(Error::StructuralIncompatibility { subpattern: 2 }));
    }

    #[test]
    fn epsilon_is_absorbed_by_zero_width() {
        let eps = Transition::epsilon(0, 1).with_tag(Tag::open(1, pos(0))).with_position(pos(0));
        let anchor = Transition::new(0, 1, Leaf::Assertion(AssertionKind::Dollar)).with_position(pos(3));
        let i = eps.intersect(&anchor).unwrap().unwrap();
        assert_eq!(i.leaf, anchor.leaf);
        assert_eq!(i.merged_before.len(), 1);
        assert!(i.merged_before[0].is_eps());
        assert_eq!(i.tag_set(), vec![(1, TagKind::Open)]);
        // epsilon against a consumer is not a merge
        let a = Transition::new(0, 1, chars('a', 'a'));
        assert!(eps.intersect(&a).unwrap().is_none());
    }

    #[test]
    fn anchor_probe_against_consumer() {
        let a = Transition::new(0, 1, chars('\n', 'a'));
        let start = Transition::new(0, 1, Leaf::Assertion(AssertionKind::Circumflex));
        let i = start.intersect(&a).unwrap().unwrap();
        assert_eq!(i.leaf, a.leaf);
        assert_eq!(i.assertions()[0].placement, Placement::Before);

        let dollar = Transition::new(0, 1, Leaf::Assertion(AssertionKind::Dollar));
        let i = a.intersect(&dollar).unwrap().unwrap();
        assert_eq!(i.leaf, chars('\n', '\n'));

        let end = Transition::new(0, 1, Leaf::Assertion(AssertionKind::EndOfString));
        assert!(end.intersect(&a).unwrap().is_none());
        let letters = Transition::new(0, 1, chars('a', 'z'));
        assert!(dollar.intersect(&letters).unwrap().is_none());
    }

    #[test]
    fn merged_lists_are_deduplicated_and_resolved() {
        let circ = Transition::new(0, 0, Leaf::Assertion(AssertionKind::Circumflex)).with_position(pos(0));
        let start = Transition::new(0, 0, Leaf::Assertion(AssertionKind::StartOfString)).with_position(pos(0));
        let mut a = Transition::new(0, 1, chars('a', 'a'));
        a.absorb_before(&circ);
        let mut b = Transition::new(4, 5, chars('a', 'a'));
        b.absorb_before(&circ);
        b.absorb_before(&start);
        let i = a.intersect(&b).unwrap().unwrap();
        let kinds: Vec<AssertionKind> = i.merged_before.iter().filter_map(|t| t.leaf.assertion()).collect();
        assert_eq!(kinds, vec![AssertionKind::StartOfString]);
        assert!(i.merged_before.iter().all(|m| m.from == 0 && m.to == 0));
    }

    #[test]
    fn loops_back_combination() {
        let mut a = Transition::new(0, 1, chars('a', 'a'));
        a.loops_back = true;
        let b = Transition::new(0, 1, chars('a', 'a'));
        assert!(!a.intersect(&b).unwrap().unwrap().loops_back);
        let mut wb = Transition::new(0, 1, Leaf::Assertion(AssertionKind::WordBoundary));
        wb.loops_back = true;
        let wb2 = Transition::new(0, 1, Leaf::Assertion(AssertionKind::WordBoundary));
        assert!(wb.intersect(&wb2).unwrap().unwrap().loops_back);
    }

    #[test]
    fn tag_key_separates_placement() {
        let open = Transition::epsilon(0, 0).with_tag(Tag::open(1, pos(0))).with_position(pos(0));
        let mut before = Transition::new(0, 1, chars('a', 'a'));
        before.absorb_before(&open);
        let mut after = Transition::new(0, 1, chars('a', 'a'));
        after.absorb_after(&open);
        assert_eq!(before.tag_set(), after.tag_set());
        assert_ne!(before.tag_key(), after.tag_key());
    }
}
