// SPDX-License-Identifier: MPL-2.0

//! An incompatibility is a set of terms for different packages
//! that should never be satisfied all together.

use std::fmt::{self, Display};
use std::sync::Arc;

use smallvec::SmallVec;

use crate::internal::{Arena, HashArena, Id};
use crate::report::{DerivationTree, Derived, External};
use crate::term::{self, Term};
use crate::{Map, Marker, PackageName, Range, Set, Version};

pub(crate) type PackageId = Id<PackageName>;

/// Type alias of unique identifiers for incompatibilities.
pub(crate) type IncompId = Id<Incompatibility>;

/// An incompatibility is a set of terms for different packages
/// that should never be satisfied all together.
///
/// If `a 1.0.0` depends on `b >=2`, the partial solution can never hold both `a 1.0.0`
/// and `not b >=2`, so `{ a 1.0.0, not b >=2 }` is an incompatibility.
/// Conflict resolution derives new incompatibilities from two existing ones; the
/// derivation is kept in [`Cause::Conflict`] to explain failures.
#[derive(Debug, Clone)]
pub(crate) struct Incompatibility {
    /// At most one term per package, in insertion order.
    terms: SmallVec<[(PackageId, Term); 2]>,
    pub(crate) cause: Cause,
}

/// Where an incompatibility comes from.
#[derive(Debug, Clone)]
pub(crate) enum Cause {
    /// The root package must be selected at its version. Seeds the resolution.
    Root(PackageId, Version),
    /// `package` at `versions` depends on `dependency` in `range`.
    Dependency {
        package: PackageId,
        versions: Range,
        dependency: PackageId,
        range: Range,
    },
    /// No version in the range exists.
    NoVersions(PackageId, Range),
    /// The provider knows no version of the package at all.
    PackageNotFound(PackageId),
    /// The version requires a marker the target environment does not satisfy.
    Environment(PackageId, Version, Marker),
    /// Derived from two incompatibilities by the rule of resolution.
    Conflict(IncompId, IncompId),
}

/// How the partial solution relates to an incompatibility.
#[derive(Eq, PartialEq, Debug)]
pub(crate) enum Relation {
    /// Every term is satisfied: a conflict.
    Satisfied,
    /// At least one term is contradicted, the incompatibility cannot be satisfied
    /// until backtracking.
    Contradicted(PackageId),
    /// All terms are satisfied except the term for that package, which is inconclusive.
    AlmostSatisfied(PackageId),
    /// More than one term is inconclusive.
    Unresolved,
}

impl Incompatibility {
    /// The initial incompatibility forcing the root package at its version.
    pub(crate) fn not_root(package: PackageId, version: Version) -> Self {
        Self {
            terms: single(package, Term::Negative(Range::singleton(version.clone()))),
            cause: Cause::Root(package, version),
        }
    }

    /// No version of the package lies in `range`.
    pub(crate) fn no_versions(package: PackageId, range: Range) -> Self {
        Self {
            terms: single(package, Term::Positive(range.clone())),
            cause: Cause::NoVersions(package, range),
        }
    }

    /// The package does not exist, whatever version is asked for.
    pub(crate) fn package_not_found(package: PackageId) -> Self {
        Self {
            terms: single(package, Term::Positive(Range::full())),
            cause: Cause::PackageNotFound(package),
        }
    }

    /// This version can't be used in the target environment.
    pub(crate) fn environment(package: PackageId, version: Version, marker: Marker) -> Self {
        Self {
            terms: single(package, Term::exact(version.clone())),
            cause: Cause::Environment(package, version, marker),
        }
    }

    /// `package` at `versions` depends on `dependency` in `range`.
    ///
    /// A dependency on an empty range forbids `versions` outright. A dependency of a
    /// package on itself collapses into one term: it either forbids some of `versions` or
    /// never holds.
    pub(crate) fn from_dependency(
        package: PackageId,
        versions: Range,
        (dependency, range): (PackageId, Range),
    ) -> Self {
        let terms = if dependency == package {
            let term = Term::Positive(versions.clone()).intersection(&Term::Negative(range.clone()));
            single(package, term)
        } else if range.is_empty() {
            single(package, Term::Positive(versions.clone()))
        } else {
            let mut terms = SmallVec::new();
            terms.push((package, Term::Positive(versions.clone())));
            terms.push((dependency, Term::Negative(range.clone())));
            terms
        };
        Self {
            terms,
            cause: Cause::Dependency {
                package,
                versions,
                dependency,
                range,
            },
        }
    }

    /// Prior cause of two incompatibilities using the rule of resolution.
    ///
    /// Terms on other packages are merged by intersection; the terms on `package` are
    /// merged by union and dropped when that union always holds.
    pub(crate) fn prior_cause(
        incompat: IncompId,
        satisfier_cause: IncompId,
        package: PackageId,
        store: &Arena<Self>,
    ) -> Self {
        let left = &store[incompat];
        let right = &store[satisfier_cause];
        let mut terms: SmallVec<[(PackageId, Term); 2]> = SmallVec::new();
        for (p, t) in left.iter().chain(right.iter()) {
            if p != package {
                merge(&mut terms, p, t.clone());
            }
        }
        let shared = match (left.get(package), right.get(package)) {
            (Some(t1), Some(t2)) => t1.union(t2),
            (Some(t), None) | (None, Some(t)) => t.clone(),
            (None, None) => Term::any(),
        };
        if shared != Term::any() {
            terms.push((package, shared));
        }
        Self {
            terms,
            cause: Cause::Conflict(incompat, satisfier_cause),
        }
    }

    /// Whether this incompatibility proves that the root package can't be selected,
    /// which ends the resolution.
    pub(crate) fn is_terminal(&self, root_package: PackageId, root_version: &Version) -> bool {
        match self.terms.as_slice() {
            [] => true,
            [(package, term)] => *package == root_package && term.contains(root_version),
            _ => false,
        }
    }

    /// Get the term related to a given package (if it exists).
    pub(crate) fn get(&self, package: PackageId) -> Option<&Term> {
        self.terms
            .iter()
            .find(|(p, _)| *p == package)
            .map(|(_, term)| term)
    }

    /// Iterate over packages.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (PackageId, &Term)> {
        self.terms.iter().map(|(package, term)| (*package, term))
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.terms.len()
    }

    /// Compares the incompatibility to what is known about each package.
    pub(crate) fn relation<'a>(&self, known: impl Fn(PackageId) -> Option<&'a Term>) -> Relation {
        let mut relation = Relation::Satisfied;
        for (package, incompat_term) in self.iter() {
            let term_relation = match known(package) {
                Some(term) => term.relation(incompat_term),
                // Nothing known is the same as knowing `Term::any()`.
                None => Term::any().relation(incompat_term),
            };
            match term_relation {
                term::Relation::Satisfies => {}
                term::Relation::Contradicts => return Relation::Contradicted(package),
                term::Relation::Inconclusive => {
                    if relation == Relation::Satisfied {
                        relation = Relation::AlmostSatisfied(package);
                    } else {
                        return Relation::Unresolved;
                    }
                }
            }
        }
        relation
    }

    // Reporting ###############################################################

    /// Retrieve parent causes if derived.
    pub(crate) fn causes(&self) -> Option<(IncompId, IncompId)> {
        match self.cause {
            Cause::Conflict(id1, id2) => Some((id1, id2)),
            _ => None,
        }
    }

    /// Build a derivation tree for error reporting.
    ///
    /// Parents must already be in `precomputed`.
    pub(crate) fn build_derivation_tree(
        self_id: IncompId,
        shared_ids: &Set<IncompId>,
        store: &Arena<Self>,
        package_store: &HashArena<PackageName>,
        precomputed: &Map<IncompId, Arc<DerivationTree>>,
    ) -> DerivationTree {
        let name = |id: PackageId| package_store[id].clone();
        match &store[self_id].cause {
            Cause::Conflict(id1, id2) => DerivationTree::Derived(Derived {
                terms: store[self_id]
                    .iter()
                    .map(|(package, term)| (name(package), term.clone()))
                    .collect(),
                shared_id: shared_ids.contains(&self_id).then(|| self_id.into_raw()),
                cause1: precomputed
                    .get(id1)
                    .expect("Non-topological calls building tree")
                    .clone(),
                cause2: precomputed
                    .get(id2)
                    .expect("Non-topological calls building tree")
                    .clone(),
            }),
            Cause::Root(package, version) => {
                DerivationTree::External(External::NotRoot(name(*package), version.clone()))
            }
            Cause::NoVersions(package, range) => {
                DerivationTree::External(External::NoVersions(name(*package), range.clone()))
            }
            Cause::PackageNotFound(package) => {
                DerivationTree::External(External::NotFound(name(*package)))
            }
            Cause::Dependency {
                package,
                versions,
                dependency,
                range,
            } => DerivationTree::External(External::FromDependencyOf(
                name(*package),
                versions.clone(),
                name(*dependency),
                range.clone(),
            )),
            Cause::Environment(package, version, marker) => DerivationTree::External(
                External::Environment(name(*package), version.clone(), marker.clone()),
            ),
        }
    }

    /// Display the incompatibility.
    pub(crate) fn display<'a>(
        &'a self,
        package_store: &'a HashArena<PackageName>,
    ) -> impl Display + 'a {
        struct IncompatDisplay<'a>(&'a Incompatibility, &'a HashArena<PackageName>);

        impl Display for IncompatDisplay<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let terms: Vec<_> = self.0.iter().collect();
                match terms.as_slice() {
                    [] => write!(f, "version solving failed"),
                    [(package, Term::Positive(range))] => {
                        write!(f, "{} {} is forbidden", self.1[*package], range)
                    }
                    [(package, Term::Negative(range))] => {
                        write!(f, "{} {} is mandatory", self.1[*package], range)
                    }
                    [(p_pos, Term::Positive(r_pos)), (p_neg, Term::Negative(r_neg))]
                    | [(p_neg, Term::Negative(r_neg)), (p_pos, Term::Positive(r_pos))] => {
                        write!(
                            f,
                            "{} {} depends on {} {}",
                            self.1[*p_pos], r_pos, self.1[*p_neg], r_neg
                        )
                    }
                    slice => {
                        let terms: Vec<_> = slice
                            .iter()
                            .map(|(p, t)| format!("{} {}", self.1[*p], t))
                            .collect();
                        write!(f, "{} are incompatible", terms.join(", "))
                    }
                }
            }
        }

        IncompatDisplay(self, package_store)
    }
}

fn single(package: PackageId, term: Term) -> SmallVec<[(PackageId, Term); 2]> {
    let mut terms = SmallVec::new();
    terms.push((package, term));
    terms
}

/// Adds the term, intersecting with the existing term on that package if any.
fn merge(terms: &mut SmallVec<[(PackageId, Term); 2]>, package: PackageId, term: Term) {
    match terms.iter_mut().find(|(p, _)| *p == package) {
        Some((_, existing)) => *existing = existing.intersection(&term),
        None => terms.push((package, term)),
    }
}

// TESTS #######################################################################

#[cfg(test)]
pub(crate) mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::term::tests::strategy as term_strat;

    fn full_dependency(p1: PackageId, p2: PackageId) -> Cause {
        Cause::Dependency {
            package: p1,
            versions: Range::full(),
            dependency: p2,
            range: Range::full(),
        }
    }

    proptest! {

        /// For any three different packages p1, p2 and p3,
        /// for any three terms t1, t2 and t3,
        /// if we have the two following incompatibilities:
        ///    { p1: t1, p2: not t2 }
        ///    { p2: t2, p3: t3 }
        /// the rule of resolution says that we can deduce the following incompatibility:
        ///    { p1: t1, p3: t3 }
        #[test]
        fn rule_of_resolution(t1 in term_strat(), t2 in term_strat(), t3 in term_strat()) {
            let mut store = Arena::new();
            let mut package_store = HashArena::new();
            let p1 = package_store.alloc(PackageName::new("p1"));
            let p2 = package_store.alloc(PackageName::new("p2"));
            let p3 = package_store.alloc(PackageName::new("p3"));
            let mut terms = SmallVec::new();
            terms.push((p1, t1.clone()));
            terms.push((p2, t2.negate()));
            let i1 = store.alloc(Incompatibility { terms, cause: full_dependency(p1, p2) });

            let mut terms = SmallVec::new();
            terms.push((p2, t2));
            terms.push((p3, t3.clone()));
            let i2 = store.alloc(Incompatibility { terms, cause: full_dependency(p2, p3) });

            let i_resolution = Incompatibility::prior_cause(i1, i2, p2, &store);
            let resolved: Map<_, _> = i_resolution.iter().map(|(p, t)| (p, t.clone())).collect();
            let expected: Map<_, _> = [(p1, t1), (p3, t3)].into_iter().collect();
            prop_assert_eq!(resolved, expected);
        }
    }

    fn v(major: u64) -> Version {
        Version::new(major, 0, 0)
    }

    #[test]
    fn self_dependency_is_one_term() {
        let mut package_store = HashArena::new();
        let foo = package_store.alloc(PackageName::new("foo"));

        let satisfied = Incompatibility::from_dependency(
            foo,
            Range::singleton(v(1)),
            (foo, Range::higher_than(v(1))),
        );
        assert_eq!(satisfied.len(), 1);
        assert!(satisfied.get(foo).is_some_and(Term::is_empty));

        let forbidden =
            Incompatibility::from_dependency(foo, Range::singleton(v(1)), (foo, Range::singleton(v(2))));
        assert_eq!(forbidden.len(), 1);
        assert_eq!(forbidden.get(foo), Some(&Term::exact(v(1))));
    }

    #[test]
    fn empty_dependency_forbids_the_dependent() {
        let mut package_store = HashArena::new();
        let foo = package_store.alloc(PackageName::new("foo"));
        let bar = package_store.alloc(PackageName::new("bar"));
        let incompat =
            Incompatibility::from_dependency(foo, Range::singleton(v(1)), (bar, Range::empty()));
        assert_eq!(incompat.len(), 1);
        assert_eq!(
            incompat.display(&package_store).to_string(),
            "foo 1.0.0 is forbidden"
        );
    }

    #[test]
    fn terminal_incompatibilities() {
        let mut package_store = HashArena::new();
        let root = package_store.alloc(PackageName::new("root"));
        let foo = package_store.alloc(PackageName::new("foo"));
        let root_version = v(0);

        let forbids_root = Incompatibility::no_versions(root, Range::full());
        assert!(forbids_root.is_terminal(root, &root_version));
        let not_root = Incompatibility::not_root(root, root_version.clone());
        assert!(!not_root.is_terminal(root, &root_version));
        let dependency = Incompatibility::from_dependency(
            root,
            Range::singleton(root_version.clone()),
            (foo, Range::full()),
        );
        assert!(!dependency.is_terminal(root, &root_version));
    }

    #[test]
    fn relation_with_partial_knowledge() {
        let mut package_store = HashArena::new();
        let foo = package_store.alloc(PackageName::new("foo"));
        let bar = package_store.alloc(PackageName::new("bar"));
        let incompat = Incompatibility::from_dependency(
            foo,
            Range::singleton(v(1)),
            (bar, Range::higher_than(v(2))),
        );

        let foo_1 = Term::exact(v(1));
        let bar_low = Term::Positive(Range::strictly_lower_than(v(2)));
        let bar_high = Term::Positive(Range::higher_than(v(3)));

        let known = |p| (p == foo).then_some(&foo_1);
        assert_eq!(incompat.relation(known), Relation::AlmostSatisfied(bar));

        let known = |p| if p == foo { Some(&foo_1) } else { Some(&bar_low) };
        assert_eq!(incompat.relation(known), Relation::Satisfied);

        let known = |p| if p == foo { Some(&foo_1) } else { Some(&bar_high) };
        assert_eq!(incompat.relation(known), Relation::Contradicted(bar));

        assert_eq!(incompat.relation(|_| None), Relation::Unresolved);
    }
}
