// SPDX-License-Identifier: MPL-2.0

//! Sets of versions stored as sorted, disjoint intervals.
//!
//! A [`Ranges`] is a union of half-open, closed or unbounded intervals over any totally
//! ordered type. Every operation returns the canonical form: intervals are non-empty,
//! sorted by their lower bound, and neither overlapping nor touching. Two sets containing
//! the same versions therefore compare equal with the derived [`PartialEq`].
//!
//! ```
//! use version_ranges::Ranges;
//!
//! let one_to_three = Ranges::<u32>::between(1u32, 3u32);
//! let two_or_more = Ranges::<u32>::higher_than(2u32);
//! let both = one_to_three.intersection(&two_or_more);
//! assert_eq!(both, Ranges::between(2u32, 3u32));
//! assert!(both.contains(&2));
//! assert!(!both.contains(&3));
//! assert_eq!(both.complement().complement(), both);
//! ```
//!
//! The set is dense: `(1, 2)` over integers is considered non-empty even though no
//! integer lies strictly between 1 and 2.

use std::cmp::Ordering;
use std::fmt::{self, Display};
use std::ops::Bound::{self, Excluded, Included, Unbounded};
use std::ops::RangeBounds;

use smallvec::{smallvec, SmallVec};

#[cfg(any(feature = "proptest", test))]
pub mod testing;

type Interval<V> = (Bound<V>, Bound<V>);

/// A set of versions, as a union of disjoint intervals.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Ranges<V> {
    segments: SmallVec<[Interval<V>; 1]>,
}

impl<V> Ranges<V> {
    /// The set containing no version.
    pub fn empty() -> Self {
        Self {
            segments: SmallVec::new(),
        }
    }

    /// The set containing every version.
    pub fn full() -> Self {
        Self {
            segments: smallvec![(Unbounded, Unbounded)],
        }
    }

    /// Versions greater than or equal to `v`.
    pub fn higher_than(v: impl Into<V>) -> Self {
        Self {
            segments: smallvec![(Included(v.into()), Unbounded)],
        }
    }

    /// Versions strictly greater than `v`.
    pub fn strictly_higher_than(v: impl Into<V>) -> Self {
        Self {
            segments: smallvec![(Excluded(v.into()), Unbounded)],
        }
    }

    /// Versions lower than or equal to `v`.
    pub fn lower_than(v: impl Into<V>) -> Self {
        Self {
            segments: smallvec![(Unbounded, Included(v.into()))],
        }
    }

    /// Versions strictly lower than `v`.
    pub fn strictly_lower_than(v: impl Into<V>) -> Self {
        Self {
            segments: smallvec![(Unbounded, Excluded(v.into()))],
        }
    }

    /// Whether the set contains no version at all.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The intervals of the set, in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (&Bound<V>, &Bound<V>)> {
        self.segments.iter().map(|(start, end)| (start, end))
    }
}

impl<V: Clone> Ranges<V> {
    /// The set containing exactly `v`.
    pub fn singleton(v: impl Into<V>) -> Self {
        let v = v.into();
        Self {
            segments: smallvec![(Included(v.clone()), Included(v))],
        }
    }

    /// The single version of the set, if it holds exactly one.
    pub fn as_singleton(&self) -> Option<&V>
    where
        V: PartialEq,
    {
        match self.segments.as_slice() {
            [(Included(start), Included(end))] if start == end => Some(start),
            _ => None,
        }
    }

    /// The lowest and highest bounds of the set, or `None` if it is empty.
    pub fn bounding_range(&self) -> Option<(Bound<&V>, Bound<&V>)> {
        let (start, _) = self.segments.first()?;
        let (_, end) = self.segments.last()?;
        Some((start.as_ref(), end.as_ref()))
    }
}

impl<V: Ord + Clone> Ranges<V> {
    /// Versions in `[start, end)`.
    pub fn between(start: impl Into<V>, end: impl Into<V>) -> Self {
        Self::from_range_bounds((Included(start.into()), Excluded(end.into())))
    }

    /// Build a set from any standard range, `1..3`, `..=4` and so on.
    ///
    /// Inverted or degenerate bounds give the empty set.
    pub fn from_range_bounds<R, IV>(bounds: R) -> Self
    where
        R: RangeBounds<IV>,
        IV: Clone + Into<V>,
    {
        let start = bounds.start_bound().cloned().map(Into::into);
        let end = bounds.end_bound().cloned().map(Into::into);
        if is_valid_interval(&start, &end) {
            Self {
                segments: smallvec![(start, end)],
            }
        } else {
            Self::empty()
        }
    }

    /// Whether `version` is part of the set.
    pub fn contains(&self, version: &V) -> bool {
        self.segments
            .iter()
            .any(|(start, end)| above_lower(version, start) && below_upper(version, end))
    }

    /// The set of all versions not in this set.
    pub fn complement(&self) -> Self {
        let mut segments = SmallVec::new();
        // Lower bound of the next gap; `None` once an interval runs to infinity.
        let mut gap_start = Some(Unbounded);
        for (start, end) in &self.segments {
            if let Some(lower) = gap_start.take() {
                match start {
                    Unbounded => {}
                    Included(v) => segments.push((lower, Excluded(v.clone()))),
                    Excluded(v) => segments.push((lower, Included(v.clone()))),
                }
            }
            gap_start = match end {
                Unbounded => None,
                Included(v) => Some(Excluded(v.clone())),
                Excluded(v) => Some(Included(v.clone())),
            };
        }
        if let Some(lower) = gap_start {
            segments.push((lower, Unbounded));
        }
        Self { segments }
    }

    /// The set of versions contained in both sets.
    pub fn intersection(&self, other: &Self) -> Self {
        let mut segments = SmallVec::new();
        let (mut left, mut right) = (self.segments.iter(), other.segments.iter());
        let (mut l, mut r) = (left.next(), right.next());
        while let (Some((l_start, l_end)), Some((r_start, r_end))) = (l, r) {
            let start = max_lower(l_start, r_start);
            let end = min_upper(l_end, r_end);
            if is_valid_interval(start, end) {
                segments.push((start.clone(), end.clone()));
            }
            if cmp_upper(l_end, r_end) == Ordering::Less {
                l = left.next();
            } else {
                r = right.next();
            }
        }
        Self { segments }
    }

    /// The set of versions contained in either set.
    pub fn union(&self, other: &Self) -> Self {
        let mut merged: SmallVec<[Interval<V>; 1]> = SmallVec::new();
        let (mut left, mut right) = (
            self.segments.iter().peekable(),
            other.segments.iter().peekable(),
        );
        loop {
            let take_left = match (left.peek(), right.peek()) {
                (Some((l_start, _)), Some((r_start, _))) => {
                    cmp_lower(l_start, r_start) != Ordering::Greater
                }
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => break,
            };
            let next = if take_left { left.next() } else { right.next() };
            let Some((start, end)) = next else { break };
            if let Some((_, last_end)) = merged.last_mut() {
                if !has_gap(last_end, start) {
                    if cmp_upper(last_end, end) == Ordering::Less {
                        *last_end = end.clone();
                    }
                    continue;
                }
            }
            merged.push((start.clone(), end.clone()));
        }
        Self { segments: merged }
    }

    /// Whether no version is in both sets.
    pub fn is_disjoint(&self, other: &Self) -> bool {
        self.intersection(other).is_empty()
    }

    /// Whether every version of `self` is in `other`.
    pub fn subset_of(&self, other: &Self) -> bool {
        &self.intersection(other) == self
    }

    /// Whether at least one version is in both sets.
    pub fn allows_any(&self, other: &Self) -> bool {
        !self.is_disjoint(other)
    }

    /// Whether every version of `other` is in `self`.
    pub fn allows_all(&self, other: &Self) -> bool {
        other.subset_of(self)
    }

    /// Checks the canonical form. Only used by tests and strategies.
    #[cfg(any(feature = "proptest", test))]
    pub(crate) fn check_invariants(self) -> Self {
        for (start, end) in &self.segments {
            assert!(is_valid_interval(start, end), "empty interval");
        }
        for pair in self.segments.windows(2) {
            assert!(
                has_gap(&pair[0].1, &pair[1].0),
                "intervals overlap, touch, or are unsorted"
            );
        }
        self
    }
}

impl<V: Ord + Clone> FromIterator<Ranges<V>> for Ranges<V> {
    /// Union of all the given sets.
    fn from_iter<T: IntoIterator<Item = Ranges<V>>>(iter: T) -> Self {
        iter.into_iter()
            .fold(Ranges::empty(), |acc, set| acc.union(&set))
    }
}

fn above_lower<V: Ord>(version: &V, start: &Bound<V>) -> bool {
    match start {
        Unbounded => true,
        Included(s) => version >= s,
        Excluded(s) => version > s,
    }
}

fn below_upper<V: Ord>(version: &V, end: &Bound<V>) -> bool {
    match end {
        Unbounded => true,
        Included(e) => version <= e,
        Excluded(e) => version < e,
    }
}

fn is_valid_interval<V: Ord>(start: &Bound<V>, end: &Bound<V>) -> bool {
    match (start, end) {
        (Unbounded, _) | (_, Unbounded) => true,
        (Included(s), Included(e)) => s <= e,
        (Included(s), Excluded(e)) | (Excluded(s), Included(e)) | (Excluded(s), Excluded(e)) => {
            s < e
        }
    }
}

/// Orders lower bounds by where the interval starts.
fn cmp_lower<V: Ord>(a: &Bound<V>, b: &Bound<V>) -> Ordering {
    match (a, b) {
        (Unbounded, Unbounded) => Ordering::Equal,
        (Unbounded, _) => Ordering::Less,
        (_, Unbounded) => Ordering::Greater,
        (Included(x), Included(y)) | (Excluded(x), Excluded(y)) => x.cmp(y),
        (Included(x), Excluded(y)) => x.cmp(y).then(Ordering::Less),
        (Excluded(x), Included(y)) => x.cmp(y).then(Ordering::Greater),
    }
}

/// Orders upper bounds by where the interval ends.
fn cmp_upper<V: Ord>(a: &Bound<V>, b: &Bound<V>) -> Ordering {
    match (a, b) {
        (Unbounded, Unbounded) => Ordering::Equal,
        (Unbounded, _) => Ordering::Greater,
        (_, Unbounded) => Ordering::Less,
        (Included(x), Included(y)) | (Excluded(x), Excluded(y)) => x.cmp(y),
        (Included(x), Excluded(y)) => x.cmp(y).then(Ordering::Greater),
        (Excluded(x), Included(y)) => x.cmp(y).then(Ordering::Less),
    }
}

fn max_lower<'a, V: Ord>(a: &'a Bound<V>, b: &'a Bound<V>) -> &'a Bound<V> {
    if cmp_lower(a, b) == Ordering::Less {
        b
    } else {
        a
    }
}

fn min_upper<'a, V: Ord>(a: &'a Bound<V>, b: &'a Bound<V>) -> &'a Bound<V> {
    if cmp_upper(a, b) == Ordering::Greater {
        b
    } else {
        a
    }
}

/// Whether some version lies between an interval ending at `end`
/// and a later interval starting at `start`.
fn has_gap<V: Ord>(end: &Bound<V>, start: &Bound<V>) -> bool {
    match (end, start) {
        (Unbounded, _) | (_, Unbounded) => false,
        (Included(e), Included(s)) | (Included(e), Excluded(s)) | (Excluded(e), Included(s)) => {
            e < s
        }
        (Excluded(e), Excluded(s)) => e <= s,
    }
}

impl<V: Display + Eq> Display for Ranges<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `!=v` reads better than `<v || >v`.
        if let [(Unbounded, Excluded(a)), (Excluded(b), Unbounded)] = self.segments.as_slice() {
            if a == b {
                return write!(f, "!={a}");
            }
        }
        if self.segments.is_empty() {
            return write!(f, "∅");
        }
        for (idx, (start, end)) in self.segments.iter().enumerate() {
            if idx > 0 {
                f.write_str(" || ")?;
            }
            match (start, end) {
                (Unbounded, Unbounded) => f.write_str("*")?,
                (Unbounded, Included(v)) => write!(f, "<={v}")?,
                (Unbounded, Excluded(v)) => write!(f, "<{v}")?,
                (Included(v), Unbounded) => write!(f, ">={v}")?,
                (Excluded(v), Unbounded) => write!(f, ">{v}")?,
                (Included(s), Included(e)) if s == e => write!(f, "{s}")?,
                (Included(s), Included(e)) => write!(f, ">={s},<={e}")?,
                (Included(s), Excluded(e)) => write!(f, ">={s},<{e}")?,
                (Excluded(s), Included(e)) => write!(f, ">{s},<={e}")?,
                (Excluded(s), Excluded(e)) => write!(f, ">{s},<{e}")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::testing::proptest_strategy;
    use super::*;

    fn version_strat() -> impl Strategy<Value = u32> {
        any::<u32>()
    }

    proptest! {
        #[test]
        fn double_complement_is_identity(set in proptest_strategy()) {
            prop_assert_eq!(set.complement().complement(), set);
        }

        #[test]
        fn complement_is_canonical(set in proptest_strategy()) {
            set.complement().check_invariants();
        }

        #[test]
        fn complement_contains_opposite(set in proptest_strategy(), v in version_strat()) {
            prop_assert_ne!(set.contains(&v), set.complement().contains(&v));
        }

        #[test]
        fn intersection_contains_both(a in proptest_strategy(), b in proptest_strategy(), v in version_strat()) {
            let both = a.intersection(&b).check_invariants();
            prop_assert_eq!(both.contains(&v), a.contains(&v) && b.contains(&v));
        }

        #[test]
        fn intersection_is_commutative(a in proptest_strategy(), b in proptest_strategy()) {
            prop_assert_eq!(a.intersection(&b), b.intersection(&a));
        }

        #[test]
        fn union_contains_either(a in proptest_strategy(), b in proptest_strategy(), v in version_strat()) {
            let either = a.union(&b).check_invariants();
            prop_assert_eq!(either.contains(&v), a.contains(&v) || b.contains(&v));
        }

        #[test]
        fn union_follows_de_morgan(a in proptest_strategy(), b in proptest_strategy()) {
            let de_morgan = a.complement().intersection(&b.complement()).complement();
            prop_assert_eq!(a.union(&b), de_morgan);
        }

        #[test]
        fn subset_matches_intersection(a in proptest_strategy(), b in proptest_strategy()) {
            prop_assert_eq!(a.subset_of(&b), a.intersection(&b) == a);
            prop_assert!(a.intersection(&b).subset_of(&a));
        }
    }

    #[test]
    fn full_and_empty_are_complements() {
        assert_eq!(Ranges::<u32>::full().complement(), Ranges::empty());
        assert_eq!(Ranges::<u32>::empty().complement(), Ranges::full());
    }

    #[test]
    fn touching_intervals_merge() {
        let low = Ranges::<u32>::between(1u32, 3u32);
        let high = Ranges::<u32>::between(3u32, 5u32);
        assert_eq!(low.union(&high), Ranges::<u32>::between(1u32, 5u32));

        let below = Ranges::<u32>::strictly_lower_than(3u32);
        let above = Ranges::<u32>::strictly_higher_than(3u32);
        let hole = below.union(&above);
        assert!(!hole.contains(&3));
        assert_eq!(hole, Ranges::<u32>::singleton(3u32).complement());
    }

    #[test]
    fn invalid_bounds_are_empty() {
        assert!(Ranges::<u32>::between(3u32, 3u32).is_empty());
        assert!(Ranges::<u32>::from_range_bounds(5u32..2).is_empty());
        assert!(!Ranges::<u32>::from_range_bounds(5u32..=5).is_empty());
    }

    #[test]
    fn display() {
        assert_eq!(Ranges::<u32>::full().to_string(), "*");
        assert_eq!(Ranges::<u32>::empty().to_string(), "∅");
        assert_eq!(Ranges::<u32>::singleton(4u32).to_string(), "4");
        assert_eq!(Ranges::<u32>::singleton(4u32).complement().to_string(), "!=4");
        assert_eq!(Ranges::<u32>::between(1u32, 2u32).to_string(), ">=1,<2");
        let split = Ranges::<u32>::lower_than(1u32).union(&Ranges::<u32>::strictly_higher_than(7u32));
        assert_eq!(split.to_string(), "<=1 || >7");
    }

    #[test]
    fn singleton_roundtrip() {
        let one = Ranges::<u32>::singleton(9u32);
        assert_eq!(one.as_singleton(), Some(&9));
        assert_eq!(Ranges::<u32>::higher_than(9u32).as_singleton(), None);
    }
}
