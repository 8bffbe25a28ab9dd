// SPDX-License-Identifier: MPL-2.0

//! A term is the fundamental unit of operation of the resolver.
//! It is a positive or negative expression regarding a set of versions.

use std::fmt::{self, Display};

use crate::{Range, Version};

/// A positive or negative expression regarding a set of versions.
///
/// `Positive(r)` says the package is selected with a version in `r`.
/// `Negative(r)` says the package is either not selected, or selected with a version
/// outside of `r`.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Term {
    Positive(Range),
    Negative(Range),
}

/// How the knowledge held by one term relates to another term on the same package.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Relation {
    /// Every version allowed by the first term is allowed by the second.
    Satisfies,
    /// No version is allowed by both.
    Contradicts,
    Inconclusive,
}

impl Term {
    /// A term that is always true.
    pub(crate) fn any() -> Self {
        Self::Negative(Range::empty())
    }

    /// A term that is never true.
    #[cfg(test)]
    pub(crate) fn empty() -> Self {
        Self::Positive(Range::empty())
    }

    /// A positive term containing exactly that version.
    pub(crate) fn exact(version: Version) -> Self {
        Self::Positive(Range::singleton(version))
    }

    pub fn is_positive(&self) -> bool {
        matches!(self, Self::Positive(_))
    }

    /// Whether the term allows nothing at all.
    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        match self {
            Self::Positive(range) => range.is_empty(),
            Self::Negative(_) => false,
        }
    }

    #[must_use]
    pub fn negate(&self) -> Self {
        match self {
            Self::Positive(range) => Self::Negative(range.clone()),
            Self::Negative(range) => Self::Positive(range.clone()),
        }
    }

    /// Whether the version is allowed by the term.
    pub fn contains(&self, version: &Version) -> bool {
        match self {
            Self::Positive(range) => range.contains(version),
            Self::Negative(range) => !range.contains(version),
        }
    }

    /// The range of a positive term.
    ///
    /// Panics on a negative term: callers only ask for ranges of terms they know to be
    /// positive, such as the accumulated term of a package waiting for a decision.
    pub(crate) fn unwrap_positive(&self) -> &Range {
        match self {
            Self::Positive(range) => range,
            Self::Negative(range) => panic!("Negative term cannot unwrap positive range: {range}"),
        }
    }

    /// Both terms hold at once.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Positive(r1), Self::Positive(r2)) => Self::Positive(r1.intersection(r2)),
            (Self::Positive(p), Self::Negative(n)) | (Self::Negative(n), Self::Positive(p)) => {
                Self::Positive(p.intersection(&n.complement()))
            }
            (Self::Negative(r1), Self::Negative(r2)) => Self::Negative(r1.union(r2)),
        }
    }

    /// At least one of the terms holds.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        (self.negate().intersection(&other.negate())).negate()
    }

    /// Everything allowed by `self` is allowed by `other`.
    pub fn subset_of(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Positive(r1), Self::Positive(r2)) => r1.subset_of(r2),
            (Self::Positive(r1), Self::Negative(r2)) => r1.is_disjoint(r2),
            // Only a negative term allows the package to stay unselected.
            (Self::Negative(_), Self::Positive(_)) => false,
            (Self::Negative(r1), Self::Negative(r2)) => r2.subset_of(r1),
        }
    }

    /// Nothing is allowed by both terms.
    pub fn is_disjoint(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Positive(r1), Self::Positive(r2)) => r1.is_disjoint(r2),
            // Both allow the package to stay unselected.
            (Self::Negative(_), Self::Negative(_)) => false,
            (Self::Positive(p), Self::Negative(n)) | (Self::Negative(n), Self::Positive(p)) => {
                p.subset_of(n)
            }
        }
    }

    /// How knowing `self` about a package decides `other`.
    ///
    /// Contradiction is checked first so that an empty term contradicts everything.
    pub fn relation(&self, other: &Self) -> Relation {
        if self.is_disjoint(other) {
            Relation::Contradicts
        } else if self.subset_of(other) {
            Relation::Satisfies
        } else {
            Relation::Inconclusive
        }
    }
}

impl Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Positive(range) => write!(f, "{range}"),
            Self::Negative(range) => write!(f, "Not ( {range} )"),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use proptest::prelude::*;
    use version_ranges::testing::proptest_strategy;

    use super::*;

    fn map_bound(bound: std::ops::Bound<&u32>) -> std::ops::Bound<Version> {
        bound.map(|v| Version::new(u64::from(*v), 0, 0))
    }

    /// Arbitrary version ranges over `x.0.0` versions.
    pub(crate) fn range_strategy() -> impl Strategy<Value = Range> {
        proptest_strategy().prop_map(|set| {
            set.iter()
                .map(|(start, end)| {
                    Range::from_range_bounds::<_, Version>((
                        map_bound(start.as_ref()),
                        map_bound(end.as_ref()),
                    ))
                })
                .collect()
        })
    }

    pub(crate) fn strategy() -> impl Strategy<Value = Term> {
        prop_oneof![
            range_strategy().prop_map(Term::Positive),
            range_strategy().prop_map(Term::Negative),
        ]
    }

    fn version_strategy() -> impl Strategy<Value = Version> {
        any::<u32>().prop_map(|v| Version::new(u64::from(v), 0, 0))
    }

    proptest! {
        #[test]
        fn intersection_is_commutative(t1 in strategy(), t2 in strategy()) {
            prop_assert_eq!(t1.intersection(&t2), t2.intersection(&t1));
        }

        #[test]
        fn negation_contradicts(t in strategy()) {
            prop_assert_eq!(t.relation(&t.negate()), Relation::Contradicts);
        }

        #[test]
        fn intersection_contains_both(t1 in strategy(), t2 in strategy(), v in version_strategy()) {
            prop_assert_eq!(t1.intersection(&t2).contains(&v), t1.contains(&v) && t2.contains(&v));
        }

        #[test]
        fn union_contains_either(t1 in strategy(), t2 in strategy(), v in version_strategy()) {
            prop_assert_eq!(t1.union(&t2).contains(&v), t1.contains(&v) || t2.contains(&v));
        }

        #[test]
        fn intersection_is_subset(t1 in strategy(), t2 in strategy()) {
            let both = t1.intersection(&t2);
            prop_assert!(both.subset_of(&t1));
            prop_assert!(both.subset_of(&t2));
        }

        #[test]
        fn satisfies_iff_intersection_unchanged(t1 in strategy(), t2 in strategy()) {
            if t1.relation(&t2) == Relation::Satisfies {
                prop_assert_eq!(t1.intersection(&t2), t1);
            }
        }
    }

    #[test]
    fn any_and_empty() {
        let foo = Term::exact(Version::new(1, 0, 0));
        assert_eq!(foo.relation(&Term::any()), Relation::Satisfies);
        assert_eq!(Term::empty().relation(&foo), Relation::Contradicts);
        assert_eq!(Term::any().relation(&foo), Relation::Inconclusive);
        assert!(Term::empty().is_empty());
        assert!(!Term::any().is_empty());
    }
}
