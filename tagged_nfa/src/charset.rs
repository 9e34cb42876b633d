//! Sets of code points stored as sorted, disjoint, non-touching ranges.

use std::collections::BTreeSet;
use std::fmt;

use regex_syntax::hir::{ClassBytes, ClassUnicode};

use crate::{Error, Result};

/// The largest Unicode code point.
pub const MAX_CODE_POINT: u32 = 0x10FFFF;

/// A closed interval `[lo, hi]` of code points.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CodePointRange {
    lo: u32,
    hi: u32,
}

impl CodePointRange {
    /// Create a range, rejecting `lo > hi` and values above
    /// [`MAX_CODE_POINT`].
    pub fn new(lo: u32, hi: u32) -> Result<CodePointRange> {
        if lo > hi || hi > MAX_CODE_POINT {
            return Err(Error::MalformedCharset(format!("invalid range {:#X}-{:#X}", lo, hi)));
        }
        Ok(CodePointRange { lo, hi })
    }

    /// A range holding exactly one character.
    pub fn single(ch: char) -> CodePointRange {
        CodePointRange { lo: ch as u32, hi: ch as u32 }
    }

    /// A range between two characters, in either order.
    pub fn between(a: char, b: char) -> CodePointRange {
        let (lo, hi) = if a <= b { (a as u32, b as u32) } else { (b as u32, a as u32) };
        CodePointRange { lo, hi }
    }

    pub fn lo(&self) -> u32 {
        self.lo
    }

    pub fn hi(&self) -> u32 {
        self.hi
    }

    pub fn contains(&self, cp: u32) -> bool {
        self.lo <= cp && cp <= self.hi
    }

    /// Number of code points in the range.
    pub fn len(&self) -> u32 {
        self.hi - self.lo + 1
    }

    pub fn intersect(&self, other: &CodePointRange) -> Option<CodePointRange> {
        let lo = self.lo.max(other.lo);
        let hi = self.hi.min(other.hi);
        if lo <= hi {
            Some(CodePointRange { lo, hi })
        } else {
            None
        }
    }

    /// True if the two ranges overlap or are adjacent.
    fn touches(&self, other: &CodePointRange) -> bool {
        self.lo <= other.hi.saturating_add(1) && other.lo <= self.hi.saturating_add(1)
    }
}

/// An ordered set of code point ranges.
///
/// Invariant: ranges are sorted and no two of them overlap or touch.
/// Every constructor either normalizes its input ([`Charset::new`]) or
/// verifies it ([`Charset::from_sorted`]).
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Charset {
    ranges: Vec<CodePointRange>,
}

impl Charset {
    /// Build a charset from ranges in any order, merging overlapping and
    /// adjacent ones.
    pub fn new<I>(ranges: I) -> Charset
    where
        I: IntoIterator<Item = CodePointRange>,
    {
        let mut ranges: Vec<CodePointRange> = ranges.into_iter().collect();
        ranges.sort();
        let mut merged: Vec<CodePointRange> = Vec::with_capacity(ranges.len());
        for range in ranges {
            match merged.last_mut() {
                Some(last) if last.touches(&range) => last.hi = last.hi.max(range.hi),
                _ => merged.push(range),
            }
        }
        Charset { ranges: merged }
    }

    /// Build a charset from ranges that must already satisfy the invariant.
    pub fn from_sorted(ranges: Vec<CodePointRange>) -> Result<Charset> {
        for pair in ranges.windows(2) {
            if pair[0].hi.saturating_add(1) >= pair[1].lo {
                return Err(Error::MalformedCharset(format!(
                    "ranges {:#X}-{:#X} and {:#X}-{:#X} are unsorted, overlapping or touching",
                    pair[0].lo, pair[0].hi, pair[1].lo, pair[1].hi
                )));
            }
        }
        Ok(Charset { ranges })
    }

    pub fn empty() -> Charset {
        Charset { ranges: Vec::new() }
    }

    /// Every code point.
    pub fn full() -> Charset {
        Charset { ranges: vec![CodePointRange { lo: 0, hi: MAX_CODE_POINT }] }
    }

    pub fn from_char(ch: char) -> Charset {
        Charset { ranges: vec![CodePointRange::single(ch)] }
    }

    pub fn from_range(range: CodePointRange) -> Charset {
        Charset { ranges: vec![range] }
    }

    pub fn ranges(&self) -> &[CodePointRange] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn contains(&self, ch: char) -> bool {
        self.contains_code_point(ch as u32)
    }

    pub fn contains_code_point(&self, cp: u32) -> bool {
        self.ranges
            .binary_search_by(|r| {
                if r.hi < cp {
                    std::cmp::Ordering::Less
                } else if r.lo > cp {
                    std::cmp::Ordering::Greater
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok()
    }

    /// Code points present in both sets.
    pub fn intersect(&self, other: &Charset) -> Charset {
        let (mut i, mut j) = (0, 0);
        let mut out = Vec::new();
        while i < self.ranges.len() && j < other.ranges.len() {
            let (a, b) = (&self.ranges[i], &other.ranges[j]);
            if let Some(r) = a.intersect(b) {
                out.push(r);
            }
            if a.hi < b.hi {
                i += 1;
            } else {
                j += 1;
            }
        }
        Charset { ranges: out }
    }

    /// The complement within `[0, MAX_CODE_POINT]`.
    pub fn negate(&self) -> Charset {
        let mut out = Vec::with_capacity(self.ranges.len() + 1);
        let mut next = 0u32;
        for r in &self.ranges {
            if r.lo > next {
                out.push(CodePointRange { lo: next, hi: r.lo - 1 });
            }
            next = r.hi.saturating_add(1);
        }
        if next <= MAX_CODE_POINT {
            out.push(CodePointRange { lo: next, hi: MAX_CODE_POINT });
        }
        Charset { ranges: out }
    }

    pub fn union(&self, other: &Charset) -> Charset {
        Charset::new(self.ranges.iter().chain(other.ranges.iter()).copied())
    }

    pub fn is_subset(&self, other: &Charset) -> bool {
        self.intersect(other) == *self
    }

    /// A representative character, preferring printable ASCII.
    ///
    /// Returns `None` for an empty set or one made only of surrogates.
    pub fn sample(&self) -> Option<char> {
        let printable = CodePointRange { lo: 0x21, hi: 0x7E };
        let preferred = self
            .ranges
            .iter()
            .find_map(|r| r.intersect(&printable))
            .and_then(|r| char::from_u32(r.lo));
        preferred.or_else(|| {
            self.ranges.iter().find_map(|r| {
                char::from_u32(r.lo).or_else(|| {
                    // Skip the surrogate block.
                    if r.contains(0xE000) {
                        char::from_u32(0xE000)
                    } else {
                        None
                    }
                })
            })
        })
    }
}

impl From<&ClassUnicode> for Charset {
    fn from(class: &ClassUnicode) -> Charset {
        Charset::new(class.ranges().iter().map(|r| CodePointRange::between(r.start(), r.end())))
    }
}

impl From<&ClassBytes> for Charset {
    fn from(class: &ClassBytes) -> Charset {
        Charset::new(
            class
                .ranges()
                .iter()
                .map(|r| CodePointRange { lo: u32::from(r.start()), hi: u32::from(r.end()) }),
        )
    }
}

fn write_code_point(f: &mut fmt::Formatter<'_>, cp: u32) -> fmt::Result {
    match char::from_u32(cp) {
        Some(ch) if ch.is_ascii_graphic() && !matches!(ch, '\\' | ']' | '[' | '-' | '^') => {
            write!(f, "{}", ch)
        }
        Some(ch) if ch.is_ascii_graphic() => write!(f, "\\{}", ch),
        Some(' ') => write!(f, " "),
        Some('\n') => write!(f, "\\n"),
        Some('\r') => write!(f, "\\r"),
        Some('\t') => write!(f, "\\t"),
        _ => write!(f, "\\x{{{:X}}}", cp),
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let [r] = self.ranges.as_slice() {
            if r.lo == r.hi {
                return write_code_point(f, r.lo);
            }
        }
        write!(f, "[")?;
        for r in &self.ranges {
            write_code_point(f, r.lo)?;
            if r.hi > r.lo {
                if r.hi > r.lo + 1 {
                    write!(f, "-")?;
                }
                write_code_point(f, r.hi)?;
            }
        }
        write!(f, "]")
    }
}

/// One output range of [`divide_intervals`] and the input charsets that
/// cover it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartitionPiece {
    pub range: CodePointRange,
    /// Indices into the first input slice.
    pub first: Vec<usize>,
    /// Indices into the second input slice.
    pub second: Vec<usize>,
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Side {
    First,
    Second,
}

/// Split the union of all given charsets into non-overlapping ranges such
/// that every input charset is exactly a union of output ranges.
///
/// Each output piece records which inputs (by index, per side) cover it.
/// The split is a single sweep over the sorted range boundaries. Adjacent
/// pieces with identical provenance are merged back together.
pub fn divide_intervals(first: &[Charset], second: &[Charset]) -> Vec<PartitionPiece> {
    // (point, opens, side, index): closings at a point sort before openings
    // so the active sets are exact for the segment starting there.
    let mut events: Vec<(u32, bool, Side, usize)> = Vec::new();
    for (side, sets) in [(Side::First, first), (Side::Second, second)] {
        for (idx, set) in sets.iter().enumerate() {
            for r in set.ranges() {
                events.push((r.lo, true, side, idx));
                if r.hi < MAX_CODE_POINT {
                    events.push((r.hi + 1, false, side, idx));
                }
            }
        }
    }
    events.sort();

    let mut pieces: Vec<PartitionPiece> = Vec::new();
    let mut active_first: BTreeSet<usize> = BTreeSet::new();
    let mut active_second: BTreeSet<usize> = BTreeSet::new();
    let mut i = 0;
    while i < events.len() {
        let point = events[i].0;
        while i < events.len() && events[i].0 == point {
            let (_, opens, side, idx) = events[i];
            let active = match side {
                Side::First => &mut active_first,
                Side::Second => &mut active_second,
            };
            if opens {
                active.insert(idx);
            } else {
                active.remove(&idx);
            }
            i += 1;
        }
        if active_first.is_empty() && active_second.is_empty() {
            continue;
        }
        let hi = match events.get(i) {
            Some(&(next, ..)) => next - 1,
            None => MAX_CODE_POINT,
        };
        let first: Vec<usize> = active_first.iter().copied().collect();
        let second: Vec<usize> = active_second.iter().copied().collect();
        match pieces.last_mut() {
            Some(last)
                if last.range.hi + 1 == point && last.first == first && last.second == second =>
            {
                last.range.hi = hi;
            }
            _ => pieces.push(PartitionPiece { range: CodePointRange { lo: point, hi }, first, second }),
        }
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::{quickcheck, Arbitrary, Gen};

    impl Arbitrary for Charset {
        fn arbitrary(g: &mut Gen) -> Charset {
            let count = usize::arbitrary(g) % 5;
            Charset::new((0..count).map(|_| {
                let a = u32::arbitrary(g) % 300;
                let b = a + u32::arbitrary(g) % 40;
                CodePointRange { lo: a, hi: b }
            }))
        }
    }

    fn set(ranges: &[(char, char)]) -> Charset {
        Charset::new(ranges.iter().map(|&(a, b)| CodePointRange::between(a, b)))
    }

    #[test]
    fn new_merges_touching_ranges() {
        let cs = set(&[('d', 'f'), ('a', 'c'), ('x', 'x')]);
        assert_eq!(cs, set(&[('a', 'f'), ('x', 'x')]));
        assert_eq!(cs.ranges().len(), 2);
    }

    #[test]
    fn from_sorted_rejects_overlap() {
        let bad = vec![CodePointRange::between('a', 'f'), CodePointRange::between('e', 'z')];
        assert!(matches!(Charset::from_sorted(bad), Err(Error::MalformedCharset(_))));
        let touching = vec![CodePointRange::between('a', 'c'), CodePointRange::between('d', 'z')];
        assert!(Charset::from_sorted(touching).is_err());
        let unsorted = vec![CodePointRange::between('x', 'z'), CodePointRange::between('a', 'c')];
        assert!(Charset::from_sorted(unsorted).is_err());
    }

    #[test]
    fn range_rejects_inverted_bounds() {
        assert!(CodePointRange::new(10, 5).is_err());
        assert!(CodePointRange::new(0, MAX_CODE_POINT + 1).is_err());
    }

    #[test]
    fn intersect_and_negate() {
        let a = set(&[('a', 'm')]);
        let b = set(&[('k', 'z')]);
        assert_eq!(a.intersect(&b), set(&[('k', 'm')]));
        assert!(a.intersect(&a.negate()).is_empty());
        assert_eq!(Charset::empty().negate(), Charset::full());
        assert!(Charset::full().negate().is_empty());
    }

    #[test]
    fn divide_splits_overlaps() {
        let pieces = divide_intervals(&[set(&[('b', 'c')])], &[set(&[('b', 'b')])]);
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].range, CodePointRange::single('b'));
        assert_eq!((pieces[0].first.clone(), pieces[0].second.clone()), (vec![0], vec![0]));
        assert_eq!(pieces[1].range, CodePointRange::single('c'));
        assert_eq!((pieces[1].first.clone(), pieces[1].second.clone()), (vec![0], vec![]));
    }

    #[test]
    fn divide_of_nothing_is_empty() {
        assert!(divide_intervals(&[], &[]).is_empty());
        assert!(divide_intervals(&[Charset::empty()], &[]).is_empty());
    }

    #[test]
    fn divide_handles_full_range() {
        let pieces = divide_intervals(&[Charset::full()], &[set(&[('a', 'a')])]);
        assert_eq!(pieces.len(), 3);
        assert_eq!(pieces[2].range.hi(), MAX_CODE_POINT);
    }

    #[test]
    fn sample_prefers_printable() {
        assert_eq!(set(&[('\n', '\n'), ('q', 'r')]).sample(), Some('q'));
        assert_eq!(set(&[('\n', '\n')]).sample(), Some('\n'));
        assert_eq!(Charset::empty().sample(), None);
    }

    #[test]
    fn display_is_compact() {
        assert_eq!(set(&[('a', 'c'), ('x', 'y')]).to_string(), "[a-cxy]");
        assert_eq!(Charset::from_char('-').to_string(), "\\-");
    }

    #[test]
    fn prop_intersect_commutes() {
        fn p(a: Charset, b: Charset) -> bool {
            a.intersect(&b) == b.intersect(&a)
        }
        quickcheck(p as fn(Charset, Charset) -> bool);
    }

    #[test]
    fn prop_intersect_with_negation_is_empty() {
        fn p(a: Charset) -> bool {
            a.intersect(&a.negate()).is_empty() && a.negate().negate() == a
        }
        quickcheck(p as fn(Charset) -> bool);
    }

    #[test]
    fn prop_divide_reconstructs_inputs() {
        fn p(a: Vec<Charset>, b: Vec<Charset>) -> bool {
            let pieces = divide_intervals(&a, &b);
            for w in pieces.windows(2) {
                if w[0].range.hi >= w[1].range.lo {
                    return false;
                }
            }
            let union = Charset::new(pieces.iter().map(|p| p.range));
            let expected = a.iter().chain(b.iter()).fold(Charset::empty(), |acc, s| acc.union(s));
            if union != expected {
                return false;
            }
            let rebuilt = |side_first: bool, idx: usize| {
                Charset::new(
                    pieces
                        .iter()
                        .filter(|p| {
                            if side_first {
                                p.first.contains(&idx)
                            } else {
                                p.second.contains(&idx)
                            }
                        })
                        .map(|p| p.range),
                )
            };
            a.iter().enumerate().all(|(i, s)| rebuilt(true, i) == *s)
                && b.iter().enumerate().all(|(i, s)| rebuilt(false, i) == *s)
        }
        quickcheck(p as fn(Vec<Charset>, Vec<Charset>) -> bool);
    }
}
