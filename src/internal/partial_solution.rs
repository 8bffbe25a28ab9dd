// SPDX-License-Identifier: MPL-2.0

//! The partial solution: the ordered log of decisions and derivations made so far,
//! with the accumulated term of every package it mentions.

use std::fmt::{self, Display};
use std::ops::Range as IdRange;

use log::info;
use smallvec::SmallVec;

use crate::internal::{Arena, HashArena, Id, IncompId, Incompatibility, PackageId, Relation};
use crate::{PackageName, Range, Term, Version};

type FnvIndexMap<K, V> = indexmap::IndexMap<K, V, rustc_hash::FxBuildHasher>;

#[derive(Debug, Copy, Clone, Ord, PartialOrd, Eq, PartialEq)]
pub(crate) struct DecisionLevel(pub(crate) u32);

impl DecisionLevel {
    pub(crate) fn increment(self) -> Self {
        Self(self.0 + 1)
    }
}

/// One entry of the log.
#[derive(Clone, Debug)]
pub(crate) struct Assignment {
    pub(crate) package: PackageId,
    pub(crate) term: Term,
    pub(crate) decision_level: DecisionLevel,
    pub(crate) kind: AssignmentKind,
}

#[derive(Clone, Debug)]
pub(crate) enum AssignmentKind {
    /// The package was fixed to this version.
    Decision(Version),
    /// The term was implied by this incompatibility.
    Derivation(IncompId),
}

#[cfg(test)]
impl Assignment {
    pub(crate) fn is_decision(&self) -> bool {
        matches!(self.kind, AssignmentKind::Decision(_))
    }
}

/// What is known about one package.
#[derive(Clone, Debug)]
struct PackageState {
    /// Intersection of all the package's assignment terms.
    accumulated: Term,
    decision: Option<Version>,
    /// Positions of the package's assignments in the log, in order.
    indices: SmallVec<[u32; 4]>,
}

#[derive(Clone, Debug)]
pub(crate) enum SatisfierSearch {
    DifferentDecisionLevels {
        previous_satisfier_level: DecisionLevel,
    },
    SameDecisionLevels {
        satisfier_cause: IncompId,
    },
}

/// The partial solution contains all package assignments,
/// historically ordered, with a per-package view of them.
#[derive(Clone, Debug)]
pub(crate) struct PartialSolution {
    /// Decisions and derivations, in the order they were made. Decision levels never
    /// decrease along the log, so backtracking is a truncation.
    assignments: Vec<Assignment>,
    /// Packages in the order they were first mentioned.
    packages: FnvIndexMap<PackageId, PackageState>,
    current_decision_level: DecisionLevel,
    attempted_solutions: u32,
    /// Set by a backtrack, cleared by the next decision.
    backtracking: bool,
}

impl PartialSolution {
    /// Initialize an empty PartialSolution.
    pub(crate) fn empty() -> Self {
        Self {
            assignments: Vec::new(),
            packages: FnvIndexMap::default(),
            current_decision_level: DecisionLevel(0),
            attempted_solutions: 1,
            backtracking: false,
        }
    }

    pub(crate) fn current_decision_level(&self) -> DecisionLevel {
        self.current_decision_level
    }

    /// How many distinct solutions were tried: every first decision after a backtrack
    /// starts a new one.
    pub(crate) fn attempted_solutions(&self) -> u32 {
        self.attempted_solutions
    }

    /// Add a decision, opening a new decision level.
    pub(crate) fn decide(&mut self, package: PackageId, version: Version) {
        if self.backtracking {
            self.attempted_solutions += 1;
            self.backtracking = false;
        }
        self.current_decision_level = self.current_decision_level.increment();
        let term = Term::exact(version.clone());
        let index = self.assignments.len() as u32;
        let state = self
            .packages
            .entry(package)
            .or_insert_with(|| PackageState {
                accumulated: Term::any(),
                decision: None,
                indices: SmallVec::new(),
            });
        debug_assert!(
            state.decision.is_none(),
            "{package:?} already has a decision"
        );
        debug_assert!(
            state.accumulated.contains(&version),
            "{package:?}: {version} was expected to be contained in {}",
            state.accumulated,
        );
        state.accumulated = state.accumulated.intersection(&term);
        state.decision = Some(version.clone());
        state.indices.push(index);
        self.assignments.push(Assignment {
            package,
            term,
            decision_level: self.current_decision_level,
            kind: AssignmentKind::Decision(version),
        });
    }

    /// Add a derivation at the current decision level.
    pub(crate) fn derive(&mut self, package: PackageId, term: Term, cause: IncompId) {
        let index = self.assignments.len() as u32;
        let state = self
            .packages
            .entry(package)
            .or_insert_with(|| PackageState {
                accumulated: Term::any(),
                decision: None,
                indices: SmallVec::new(),
            });
        state.accumulated = state.accumulated.intersection(&term);
        state.indices.push(index);
        self.assignments.push(Assignment {
            package,
            term,
            decision_level: self.current_decision_level,
            kind: AssignmentKind::Derivation(cause),
        });
    }

    /// The accumulated term of a package, if anything is known about it.
    pub(crate) fn term(&self, package: PackageId) -> Option<&Term> {
        self.packages.get(&package).map(|state| &state.accumulated)
    }

    /// How the partial solution relates to an incompatibility.
    pub(crate) fn relation(&self, incompat: &Incompatibility) -> Relation {
        incompat.relation(|package| self.term(package))
    }

    /// Backtrack the partial solution to a given decision level.
    ///
    /// Assignments above that level are dropped and every package they touched gets its
    /// accumulated term recomputed from what is left, or is forgotten.
    pub(crate) fn backtrack(&mut self, decision_level: DecisionLevel) {
        let keep = self
            .assignments
            .iter()
            .position(|a| a.decision_level > decision_level)
            .unwrap_or(self.assignments.len());
        let removed = self.assignments.split_off(keep);
        self.current_decision_level = decision_level;
        self.backtracking = true;

        let mut touched: Vec<PackageId> = removed.iter().map(|a| a.package).collect();
        touched.sort_unstable();
        touched.dedup();
        for package in touched {
            let Some(state) = self.packages.get_mut(&package) else {
                continue;
            };
            state.indices.retain(|index| (*index as usize) < keep);
            if state.indices.is_empty() {
                self.packages.shift_remove(&package);
                continue;
            }
            let mut accumulated = Term::any();
            let mut decision = None;
            for &index in &state.indices {
                let assignment = &self.assignments[index as usize];
                accumulated = accumulated.intersection(&assignment.term);
                if let AssignmentKind::Decision(version) = &assignment.kind {
                    decision = Some(version.clone());
                }
            }
            state.accumulated = accumulated;
            state.decision = decision;
        }
    }

    /// The earliest assignment after which the package's accumulated term implies `term`.
    ///
    /// Returns the position of that assignment in the log along with it.
    pub(crate) fn satisfier(&self, package: PackageId, term: &Term) -> Option<(u32, &Assignment)> {
        let state = self.packages.get(&package)?;
        let mut accumulated = Term::any();
        for &index in &state.indices {
            let assignment = &self.assignments[index as usize];
            accumulated = accumulated.intersection(&assignment.term);
            if accumulated.subset_of(term) {
                return Some((index, assignment));
            }
        }
        None
    }

    /// Finds the most recent satisfier of a satisfied incompatibility and decides how
    /// conflict resolution continues from it.
    pub(crate) fn satisfier_search(
        &self,
        incompat: &Incompatibility,
    ) -> (PackageId, SatisfierSearch) {
        let satisfiers: SmallVec<[(PackageId, &Term, u32, &Assignment); 4]> = incompat
            .iter()
            .map(|(package, term)| match self.satisfier(package, term) {
                Some((index, assignment)) => (package, term, index, assignment),
                None => unreachable!(
                    "{package:?} has no satisfier for {term}, the incompatibility is not satisfied"
                ),
            })
            .collect();
        let Some(&(satisfier_package, satisfier_term, satisfier_index, satisfier)) =
            satisfiers.iter().max_by_key(|(_, _, index, _)| *index)
        else {
            unreachable!("an incompatibility without terms is terminal")
        };

        let mut previous_satisfier_level = satisfiers
            .iter()
            .filter(|(package, _, _, _)| *package != satisfier_package)
            .map(|(_, _, _, assignment)| assignment.decision_level)
            .max()
            .unwrap_or(DecisionLevel(1));
        if let Some(level) =
            self.previous_satisfier_level(satisfier_package, satisfier_term, satisfier_index)
        {
            previous_satisfier_level = previous_satisfier_level.max(level);
        }
        let previous_satisfier_level = previous_satisfier_level.max(DecisionLevel(1));

        let search = match &satisfier.kind {
            AssignmentKind::Derivation(cause)
                if previous_satisfier_level >= satisfier.decision_level =>
            {
                SatisfierSearch::SameDecisionLevels {
                    satisfier_cause: *cause,
                }
            }
            _ => SatisfierSearch::DifferentDecisionLevels {
                previous_satisfier_level,
            },
        };
        (satisfier_package, search)
    }

    /// Level of the earliest assignment before `satisfier` that, together with it, implies
    /// `term`. `None` when the satisfier implies `term` on its own.
    fn previous_satisfier_level(
        &self,
        package: PackageId,
        term: &Term,
        satisfier_index: u32,
    ) -> Option<DecisionLevel> {
        let satisfier = &self.assignments[satisfier_index as usize];
        if satisfier.term.subset_of(term) {
            return None;
        }
        let state = self.packages.get(&package)?;
        let mut accumulated = satisfier.term.clone();
        for &index in state.indices.iter().take_while(|&&i| i < satisfier_index) {
            let assignment = &self.assignments[index as usize];
            accumulated = accumulated.intersection(&assignment.term);
            if accumulated.subset_of(term) {
                return Some(assignment.decision_level);
            }
        }
        None
    }

    /// Decides `package` at `version` unless one of its new dependency incompatibilities
    /// would be satisfied by that decision. Returns whether the decision was made.
    pub(crate) fn add_version(
        &mut self,
        package: PackageId,
        version: Version,
        new_incompatibilities: IdRange<IncompId>,
        store: &Arena<Incompatibility>,
        package_store: &HashArena<PackageName>,
    ) -> bool {
        let exact = Term::exact(version.clone());
        let not_satisfied = |incompat: &Incompatibility| {
            incompat.relation(|p| {
                if p == package {
                    Some(&exact)
                } else {
                    self.term(p)
                }
            }) != Relation::Satisfied
        };

        if Id::range_to_iter(new_incompatibilities).all(|id| not_satisfied(&store[id])) {
            info!("add_decision: {} @ {}", package_store[package], version);
            self.decide(package, version);
            true
        } else {
            info!(
                "not adding {} @ {} because of its dependencies",
                package_store[package], version
            );
            false
        }
    }

    /// Packages that must be selected but have no decision yet, with their allowed versions.
    pub(crate) fn undecided_packages(&self) -> impl Iterator<Item = (PackageId, &Range)> + '_ {
        self.packages
            .iter()
            .filter(|(_, state)| state.decision.is_none())
            .filter_map(|(&package, state)| match &state.accumulated {
                Term::Positive(range) => Some((package, range)),
                Term::Negative(_) => None,
            })
    }

    /// If every package that must be selected has a decision,
    /// the decisions are a total solution and version solving has succeeded.
    pub(crate) fn extract_solution(&self) -> impl Iterator<Item = (PackageId, &Version)> + '_ {
        self.packages
            .iter()
            .filter_map(|(&package, state)| state.decision.as_ref().map(|v| (package, v)))
    }

    pub(crate) fn display<'a>(
        &'a self,
        package_store: &'a HashArena<PackageName>,
    ) -> impl Display + 'a {
        struct PSDisplay<'a>(&'a PartialSolution, &'a HashArena<PackageName>);

        impl Display for PSDisplay<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                writeln!(
                    f,
                    "decision level: {}, assignments: {}",
                    self.0.current_decision_level.0,
                    self.0.assignments.len()
                )?;
                for (package, state) in &self.0.packages {
                    match &state.decision {
                        Some(version) => writeln!(f, "  {} = {}", self.1[*package], version)?,
                        None => writeln!(f, "  {}: {}", self.1[*package], state.accumulated)?,
                    }
                }
                Ok(())
            }
        }

        PSDisplay(self, package_store)
    }
}
