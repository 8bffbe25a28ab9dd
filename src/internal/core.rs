// SPDX-License-Identifier: MPL-2.0

//! Core model and functions
//! to write a functional PubGrub algorithm.

use std::ops::Range as IdRange;
use std::sync::Arc;

use log::info;

use crate::internal::{
    Arena, DecisionLevel, HashArena, IncompId, Incompatibility, PackageId, PartialSolution,
    Relation, SatisfierSearch,
};
use crate::{DerivationTree, Map, PackageName, Range, Set, Version};

/// Current state of the PubGrub algorithm.
#[derive(Clone)]
pub(crate) struct State {
    pub(crate) root_package: PackageId,
    root_version: Version,

    /// Incompatibilities mentioning each package, oldest first.
    incompatibilities: Map<PackageId, Vec<IncompId>>,

    /// As an optimization, store the ids of incompatibilities that are already contradicted.
    ///
    /// For each one keep track of the decision level when it was found to be contradicted.
    /// These will stay contradicted until we have backtracked beyond its associated decision level.
    contradicted_incompatibilities: Map<IncompId, DecisionLevel>,

    /// Partial solution.
    pub(crate) partial_solution: PartialSolution,

    /// The store is the reference storage for all incompatibilities.
    pub(crate) incompatibility_store: Arena<Incompatibility>,

    /// The store is the reference storage for all packages.
    pub(crate) package_store: HashArena<PackageName>,

    /// Packages whose term changed, waiting to have their incompatibilities checked.
    unit_propagation_buffer: Vec<PackageId>,
}

impl State {
    /// Initialization of PubGrub state.
    pub(crate) fn init(root_package: PackageName, root_version: Version) -> Self {
        let mut incompatibility_store = Arena::new();
        let mut package_store = HashArena::new();
        let root_package = package_store.alloc(root_package);
        let not_root_id = incompatibility_store.alloc(Incompatibility::not_root(
            root_package,
            root_version.clone(),
        ));
        let mut incompatibilities = Map::default();
        incompatibilities.insert(root_package, vec![not_root_id]);
        Self {
            root_package,
            root_version,
            incompatibilities,
            contradicted_incompatibilities: Map::default(),
            partial_solution: PartialSolution::empty(),
            incompatibility_store,
            package_store,
            unit_propagation_buffer: Vec::new(),
        }
    }

    pub(crate) fn root_version(&self) -> &Version {
        &self.root_version
    }

    /// Add an incompatibility to the state.
    pub(crate) fn add_incompatibility(&mut self, incompat: Incompatibility) -> IncompId {
        let id = self.incompatibility_store.alloc(incompat);
        self.merge_incompatibility(id);
        id
    }

    /// Add the dependencies of a package version as incompatibilities.
    pub(crate) fn add_incompatibility_from_dependencies(
        &mut self,
        package: PackageId,
        version: Version,
        dependencies: impl IntoIterator<Item = (PackageName, Range)>,
    ) -> IdRange<IncompId> {
        let versions = Range::singleton(version);
        let package_store = &mut self.package_store;
        let new_incompats_id_range =
            self.incompatibility_store
                .alloc_iter(dependencies.into_iter().map(|(dependency, range)| {
                    Incompatibility::from_dependency(
                        package,
                        versions.clone(),
                        (package_store.alloc(dependency), range),
                    )
                }));
        for id in IncompId::range_to_iter(new_incompats_id_range.clone()) {
            self.merge_incompatibility(id);
        }
        new_incompats_id_range
    }

    /// Unit propagation is the core mechanism of the solving algorithm.
    /// CF <https://github.com/dart-lang/pub/blob/master/doc/solver.md#unit-propagation>
    ///
    /// On an unresolvable conflict, returns the terminal incompatibility.
    pub(crate) fn unit_propagation(&mut self, package: PackageId) -> Result<(), IncompId> {
        self.unit_propagation_buffer.clear();
        self.unit_propagation_buffer.push(package);
        while let Some(current_package) = self.unit_propagation_buffer.pop() {
            // Iterate over incompatibilities in reverse order
            // to evaluate first the newest incompatibilities.
            let mut conflict_id = None;
            let incompat_ids = self
                .incompatibilities
                .get(&current_package)
                .map(Vec::as_slice)
                .unwrap_or_default();
            for &incompat_id in incompat_ids.iter().rev() {
                if self
                    .contradicted_incompatibilities
                    .contains_key(&incompat_id)
                {
                    continue;
                }
                let current_incompat = &self.incompatibility_store[incompat_id];
                match self.partial_solution.relation(current_incompat) {
                    // If the partial solution satisfies the incompatibility
                    // we must perform conflict resolution.
                    Relation::Satisfied => {
                        log::trace!(
                            "satisfied: {}",
                            current_incompat.display(&self.package_store)
                        );
                        conflict_id = Some(incompat_id);
                        break;
                    }
                    Relation::AlmostSatisfied(package_almost) => {
                        log::trace!(
                            "almost satisfied on {}: {}",
                            self.package_store[package_almost],
                            current_incompat.display(&self.package_store)
                        );
                        if !self.unit_propagation_buffer.contains(&package_almost) {
                            self.unit_propagation_buffer.push(package_almost);
                        }
                        let Some(term) = current_incompat.get(package_almost) else {
                            unreachable!("the almost satisfied term belongs to the incompatibility")
                        };
                        // Add (not term) to the partial solution with incompat as cause.
                        self.partial_solution
                            .derive(package_almost, term.negate(), incompat_id);
                        // With the partial solution updated, the incompatibility is now contradicted.
                        self.contradicted_incompatibilities
                            .insert(incompat_id, self.partial_solution.current_decision_level());
                    }
                    Relation::Contradicted(_) => {
                        self.contradicted_incompatibilities
                            .insert(incompat_id, self.partial_solution.current_decision_level());
                    }
                    Relation::Unresolved => {}
                }
            }
            if let Some(incompat_id) = conflict_id {
                let (package_almost, root_cause) = self.conflict_resolution(incompat_id)?;
                self.unit_propagation_buffer.clear();
                self.unit_propagation_buffer.push(package_almost);
                let learned = &self.incompatibility_store[root_cause];
                debug_assert_eq!(
                    self.partial_solution.relation(learned),
                    Relation::AlmostSatisfied(package_almost)
                );
                let Some(term) = learned.get(package_almost) else {
                    unreachable!("the learned incompatibility mentions the satisfier package")
                };
                // Add to the partial solution with incompat as cause.
                self.partial_solution
                    .derive(package_almost, term.negate(), root_cause);
                // After conflict resolution and the partial solution update,
                // the root cause incompatibility is now contradicted.
                self.contradicted_incompatibilities
                    .insert(root_cause, self.partial_solution.current_decision_level());
            }
        }
        // If there are no more changed packages, unit propagation is done.
        Ok(())
    }

    /// Return the root cause or the terminal incompatibility.
    /// CF <https://github.com/dart-lang/pub/blob/master/doc/solver.md#unit-propagation>
    fn conflict_resolution(
        &mut self,
        incompatibility: IncompId,
    ) -> Result<(PackageId, IncompId), IncompId> {
        let mut current_incompat_id = incompatibility;
        let mut current_incompat_changed = false;
        loop {
            if self.incompatibility_store[current_incompat_id]
                .is_terminal(self.root_package, &self.root_version)
            {
                return Err(current_incompat_id);
            }
            let (package, satisfier_search_result) = self
                .partial_solution
                .satisfier_search(&self.incompatibility_store[current_incompat_id]);
            match satisfier_search_result {
                SatisfierSearch::DifferentDecisionLevels {
                    previous_satisfier_level,
                } => {
                    self.backtrack(
                        current_incompat_id,
                        current_incompat_changed,
                        previous_satisfier_level,
                    );
                    info!(
                        "backtrack to {:?}, learned: {}",
                        previous_satisfier_level,
                        self.incompatibility_store[current_incompat_id].display(&self.package_store)
                    );
                    return Ok((package, current_incompat_id));
                }
                SatisfierSearch::SameDecisionLevels { satisfier_cause } => {
                    let prior_cause = Incompatibility::prior_cause(
                        current_incompat_id,
                        satisfier_cause,
                        package,
                        &self.incompatibility_store,
                    );
                    info!("prior cause: {}", prior_cause.display(&self.package_store));
                    current_incompat_id = self.incompatibility_store.alloc(prior_cause);
                    current_incompat_changed = true;
                }
            }
        }
    }

    /// Backtracking.
    fn backtrack(
        &mut self,
        incompat: IncompId,
        incompat_changed: bool,
        decision_level: DecisionLevel,
    ) {
        self.partial_solution.backtrack(decision_level);
        // Remove contradicted incompatibilities that depend on decisions we just backtracked away.
        self.contradicted_incompatibilities
            .retain(|_, dl| *dl <= decision_level);
        if incompat_changed {
            self.merge_incompatibility(incompat);
        }
    }

    /// Register an incompatibility with every package it mentions.
    fn merge_incompatibility(&mut self, id: IncompId) {
        for (package, _) in self.incompatibility_store[id].iter() {
            self.incompatibilities.entry(package).or_default().push(id);
        }
    }

    // Error reporting #########################################################

    /// Build the derivation tree of the terminal incompatibility.
    pub(crate) fn build_derivation_tree(&self, incompat: IncompId) -> DerivationTree {
        let mut all_ids: Set<IncompId> = Set::default();
        let mut shared_ids = Set::default();
        let mut stack = vec![incompat];
        while let Some(i) = stack.pop() {
            if let Some((id1, id2)) = self.incompatibility_store[i].causes() {
                if all_ids.contains(&i) {
                    shared_ids.insert(i);
                } else {
                    stack.push(id1);
                    stack.push(id2);
                }
            }
            all_ids.insert(i);
        }
        // To avoid recursion we need to generate trees in topological order.
        // That is to say we need to ensure that the causes are processed before the incompatibility they effect.
        // It happens to be that sorting by their ID maintains this property.
        let mut sorted_ids = all_ids.into_iter().collect::<Vec<_>>();
        sorted_ids.sort_unstable_by_key(|id| id.into_raw());
        let mut precomputed = Map::default();
        for id in sorted_ids.into_iter().filter(|id| *id != incompat) {
            let tree = Incompatibility::build_derivation_tree(
                id,
                &shared_ids,
                &self.incompatibility_store,
                &self.package_store,
                &precomputed,
            );
            precomputed.insert(id, Arc::new(tree));
        }
        // Now the user can refer to the entire tree from its root.
        Incompatibility::build_derivation_tree(
            incompat,
            &shared_ids,
            &self.incompatibility_store,
            &self.package_store,
            &precomputed,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Term;

    fn v(major: u64) -> Version {
        Version::new(major, 0, 0)
    }

    /// Drives the state by hand: pick the only undecided package and add its dependencies.
    fn decide(
        state: &mut State,
        version: Version,
        dependencies: Vec<(PackageName, Range)>,
    ) -> PackageId {
        let next = state
            .partial_solution
            .undecided_packages()
            .next()
            .map(|(p, _)| p)
            .unwrap();
        let ids = state.add_incompatibility_from_dependencies(next, version.clone(), dependencies);
        state.partial_solution.add_version(
            next,
            version,
            ids,
            &state.incompatibility_store,
            &state.package_store,
        );
        next
    }

    /// A package may depend on itself any number of times.
    #[test]
    fn package_depend_on_self() {
        let foo = PackageName::new("foo");
        let cases: &[Vec<(PackageName, Range)>] = &[
            vec![(foo.clone(), Range::full())],
            vec![(foo.clone(), Range::full()), (foo.clone(), Range::full())],
            vec![(foo.clone(), Range::full()), (foo.clone(), Range::singleton(v(1)))],
            vec![
                (foo.clone(), Range::singleton(v(1))),
                (foo.clone(), Range::between(v(1), v(2))),
                (foo.clone(), Range::between(v(1), v(3))),
            ],
        ];

        for case in cases {
            let mut state = State::init(PackageName::new("root"), v(0));
            state.unit_propagation(state.root_package).unwrap();

            let root = decide(&mut state, v(0), vec![(foo.clone(), Range::singleton(v(1)))]);
            state.unit_propagation(root).unwrap();

            let next = decide(&mut state, v(1), case.clone());
            state.unit_propagation(next).unwrap();

            assert!(state.partial_solution.undecided_packages().next().is_none());
            let solution: Vec<_> = state
                .partial_solution
                .extract_solution()
                .map(|(p, v)| (state.package_store[p].to_string(), v.clone()))
                .collect();
            assert_eq!(
                solution,
                vec![("root".to_string(), v(0)), ("foo".to_string(), v(1))],
                "{case:?}"
            );
        }
    }

    #[test]
    fn conflict_backjumps_and_learns() {
        let mut state = State::init(PackageName::new("root"), v(0));
        state.unit_propagation(state.root_package).unwrap();
        let root = decide(
            &mut state,
            v(0),
            vec![(PackageName::new("foo"), Range::full())],
        );
        state.unit_propagation(root).unwrap();

        // foo 2 needs a bar that does not exist.
        let foo = decide(
            &mut state,
            v(2),
            vec![(PackageName::new("bar"), Range::full())],
        );
        state.unit_propagation(foo).unwrap();
        let bar = state.package_store.get(&PackageName::new("bar")).unwrap();
        state.add_incompatibility(Incompatibility::package_not_found(bar));
        state.unit_propagation(bar).unwrap();

        // foo 2 is now excluded and the decision on it is gone.
        assert_eq!(state.partial_solution.current_decision_level(), DecisionLevel(1));
        let foo_term = state.partial_solution.term(foo).unwrap();
        assert!(!foo_term.contains(&v(2)));
        assert!(foo_term.contains(&v(1)));
        assert!(matches!(foo_term, Term::Positive(_)));
        // The learned incompatibility excludes bar altogether.
        assert_eq!(
            state.partial_solution.term(bar),
            Some(&Term::Negative(Range::full()))
        );
    }

    #[test]
    fn terminal_conflict_builds_tree() {
        let mut state = State::init(PackageName::new("root"), v(0));
        state.unit_propagation(state.root_package).unwrap();
        let root = decide(
            &mut state,
            v(0),
            vec![(PackageName::new("foo"), Range::full())],
        );
        state.unit_propagation(root).unwrap();
        let foo = state.package_store.get(&PackageName::new("foo")).unwrap();
        state.add_incompatibility(Incompatibility::package_not_found(foo));
        let terminal = state.unit_propagation(foo).unwrap_err();
        match state.build_derivation_tree(terminal) {
            DerivationTree::Derived(derived) => {
                assert_eq!(derived.terms.len(), 1);
                assert_eq!(derived.terms[0].0, PackageName::new("root"));
            }
            DerivationTree::External(external) => panic!("unexpected external {external:?}"),
        }
    }
}
