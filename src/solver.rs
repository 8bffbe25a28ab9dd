// SPDX-License-Identifier: MPL-2.0

//! PubGrub version solving algorithm.
//!
//! It consists in efficiently finding a set of packages and versions
//! that satisfy all the constraints of a given project dependencies.
//! In addition, when that is not possible,
//! the solver tries to provide a very human-readable and clear
//! explanation as to why that failed.
//!
//! ## API
//!
//! ```
//! # use resolvent::{parse_constraint, resolve, OfflineProvider, Range, SolverOptions, Version};
//! #
//! let mut provider = OfflineProvider::new();
//! provider.add_dependencies("myapp", (1, 0, 0), [("foo", parse_constraint(">=1.0,<2.0")?)]);
//! provider.add_dependencies("foo", (1, 0, 0), Vec::<(&str, Range)>::new());
//! provider.add_dependencies("foo", (1, 5, 0), Vec::<(&str, Range)>::new());
//!
//! let solution = resolve(&provider, "myapp", (1, 0, 0), &SolverOptions::new())?;
//! assert_eq!(solution.get(&"foo".into()), Some(&Version::new(1, 5, 0)));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Where `provider` supplies the list of available packages and versions,
//! as well as the dependencies of every available package
//! by implementing the [Provider] trait.
//! The call to [resolve] for a given package at a given version
//! will compute the set of packages and versions needed
//! to satisfy the dependencies of that package and version pair.
//! If there is no solution, the reason will be provided as clear as possible.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::error::Error;

use log::{debug, info};
use priority_queue::PriorityQueue;
use rustc_hash::FxBuildHasher;

use crate::internal::{Incompatibility, PackageId, State};
use crate::report::{Explanation, NoSolution};
use crate::{
    Map, Marker, PackageName, Range, RangeExt, ResolveError, Set, SolverOptions, Version,
};

/// Main function of the library.
/// Finds a set of packages satisfying dependency bounds for a given package + version pair.
#[cold]
pub fn resolve<P: Provider>(
    provider: &P,
    package: impl Into<PackageName>,
    version: impl Into<Version>,
    options: &SolverOptions,
) -> Result<Solution, ResolveError<P::Err>> {
    let mut state = State::init(package.into(), version.into());
    let mut candidates = Candidates::new(provider, options.prereleases_allowed());
    let mut markers: Map<Marker, bool> = Map::default();
    let mut added_dependencies: Map<PackageId, Set<Version>> = Map::default();
    let mut next = state.root_package;
    loop {
        provider.should_cancel().map_err(ResolveError::Cancelled)?;

        info!(
            "unit_propagation: {:?} = '{}'",
            &next, state.package_store[next]
        );
        if let Err(terminal) = state.unit_propagation(next) {
            let derivation_tree = state.build_derivation_tree(terminal);
            let explanation =
                Explanation::new(&derivation_tree, &state.package_store[state.root_package]);
            info!("version solving failed:\n{explanation}");
            return Err(ResolveError::Unsatisfiable(Box::new(NoSolution {
                derivation_tree,
                explanation,
            })));
        }

        debug!(
            "Partial solution after unit propagation: {}",
            state.partial_solution.display(&state.package_store)
        );

        let Some(highest_priority_pkg) = pick_package(&state, &mut candidates, options)? else {
            let packages = state
                .partial_solution
                .extract_solution()
                .filter(|(p, _)| *p != state.root_package)
                .map(|(p, v)| (&state.package_store[p], v))
                .filter(|(p, _)| !p.is_virtual())
                .map(|(p, v)| (p.clone(), v.clone()))
                .collect();
            return Ok(Solution {
                packages,
                attempted_solutions: state.partial_solution.attempted_solutions(),
            });
        };
        next = highest_priority_pkg;

        let range = match state.partial_solution.term(next) {
            Some(term) if term.is_positive() => term.unwrap_positive().clone(),
            _ => {
                return Err(ResolveError::InvariantViolation(
                    "a package was chosen but we don't have a positive term.".into(),
                ))
            }
        };
        let name = state.package_store[next].clone();

        // Pick the next compatible version.
        let decision = if next == state.root_package {
            Some(state.root_version().clone())
        } else {
            let locked = options
                .locked_version(&name.base())
                .filter(|locked| range.contains(locked));
            match locked {
                Some(locked) => Some(locked.clone()),
                None => {
                    let versions = candidates.get(&name, &range)?;
                    if versions.is_empty() {
                        info!("no version of {name} is known");
                        state.add_incompatibility(Incompatibility::package_not_found(next));
                        continue;
                    }
                    versions.iter().find(|v| range.contains(v)).cloned()
                }
            }
        };
        info!("chose: {:?} = '{}' @ {:?}", &next, name, decision);

        let Some(v) = decision else {
            state.add_incompatibility(Incompatibility::no_versions(next, range));
            continue;
        };

        if !range.contains(&v) {
            return Err(ResolveError::InvariantViolation(format!(
                "{name} {v} was chosen outside of its allowed range {range}"
            )));
        }

        let is_new_dependency = added_dependencies
            .entry(next)
            .or_default()
            .insert(v.clone());

        if !is_new_dependency {
            // The dependency incompatibilities are already known and none is satisfied
            // by this version, otherwise it would have been excluded.
            info!("add_decision (not first time): {name} @ {v}");
            state.partial_solution.decide(next, v);
            continue;
        }

        // Retrieve that package dependencies.
        let dependencies = provider.dependencies_for(&name, &v).map_err(|source| {
            ResolveError::DependenciesUnavailable {
                package: name.clone(),
                version: v.clone(),
                source,
            }
        })?;

        if let Some(marker) = dependencies.requires {
            let satisfied = *markers
                .entry(marker.clone())
                .or_insert_with_key(|marker| provider.is_satisfied_by_environment(marker));
            if !satisfied {
                info!("{name} {v} requires {marker}");
                state.add_incompatibility(Incompatibility::environment(next, v, marker));
                continue;
            }
        }

        let mut constraints = Vec::with_capacity(dependencies.dependencies.len() + 1);
        for dependency in dependencies.dependencies {
            if let Some(marker) = &dependency.marker {
                let satisfied = *markers
                    .entry(marker.clone())
                    .or_insert_with_key(|marker| provider.is_satisfied_by_environment(marker));
                if !satisfied {
                    debug!("skipping {} of {name} {v}: {marker}", dependency.package);
                    continue;
                }
            }
            constraints.push((dependency.package, dependency.range));
        }
        if name.is_virtual() {
            // An extra is selected together with the same version of its base package.
            constraints.push((name.base(), Range::singleton(v.clone())));
        }

        // Add that package and version if the dependencies are not problematic.
        let dep_incompats = state.add_incompatibility_from_dependencies(next, v.clone(), constraints);
        state.partial_solution.add_version(
            next,
            v,
            dep_incompats,
            &state.incompatibility_store,
            &state.package_store,
        );
    }
}

/// Select the undecided package with the fewest candidate versions, ties broken by name.
///
/// A locked version still in range or a package asked to use its latest version counts
/// as one candidate.
fn pick_package<P: Provider>(
    state: &State,
    candidates: &mut Candidates<'_, P>,
    options: &SolverOptions,
) -> Result<Option<PackageId>, ResolveError<P::Err>> {
    let mut queue: PriorityQueue<PackageId, Reverse<(usize, &PackageName)>, FxBuildHasher> =
        PriorityQueue::default();
    for (package, range) in state.partial_solution.undecided_packages() {
        let name = &state.package_store[package];
        let count = if package == state.root_package
            || options.is_use_latest(&name.base())
            || options
                .locked_version(&name.base())
                .is_some_and(|locked| range.contains(locked))
        {
            1
        } else {
            candidates
                .get(name, range)?
                .iter()
                .filter(|v| range.contains(v))
                .count()
        };
        queue.push(package, Reverse((count, name)));
    }
    Ok(queue.pop().map(|(package, _)| package))
}

/// Caches the versions listed by the provider for the whole resolution.
struct Candidates<'a, P: Provider> {
    provider: &'a P,
    allow_prereleases: bool,
    versions: Map<(PackageName, bool), Vec<Version>>,
}

impl<'a, P: Provider> Candidates<'a, P> {
    fn new(provider: &'a P, allow_prereleases: bool) -> Self {
        Self {
            provider,
            allow_prereleases,
            versions: Map::default(),
        }
    }

    /// Versions that may be picked for `package` in `range`, newest first.
    ///
    /// Prereleases are only listed when allowed globally or by the range, or when the
    /// package has nothing else. Extras share the versions of their base package.
    fn get(
        &mut self,
        package: &PackageName,
        range: &Range,
    ) -> Result<&[Version], ResolveError<P::Err>> {
        let base = package.base();
        let allow = self.allow_prereleases || range.allows_prereleases();
        let key = (base, allow);
        if !self.versions.contains_key(&key) {
            let list = |allow| {
                self.provider
                    .versions_for(&key.0, allow)
                    .map_err(|source| ResolveError::VersionsUnavailable {
                        package: key.0.clone(),
                        source,
                    })
            };
            let mut versions = list(allow)?;
            if versions.is_empty() && !allow {
                versions = list(true)?;
            }
            self.versions.insert(key.clone(), versions);
        }
        Ok(self.versions.get(&key).map(Vec::as_slice).unwrap_or_default())
    }
}

/// Trait that allows the algorithm to retrieve available packages and their dependencies.
/// An implementor needs to be supplied to the [resolve] function.
pub trait Provider {
    /// The kind of error returned from these methods.
    ///
    /// Returning this signals that resolution should fail with this error.
    type Err: Error + 'static;

    /// Available versions of a package, the preferred one first (usually newest first).
    ///
    /// Prereleases are only expected when `allow_prereleases` is set.
    /// An empty list means that the package does not exist.
    fn versions_for(
        &self,
        package: &PackageName,
        allow_prereleases: bool,
    ) -> Result<Vec<Version>, Self::Err>;

    /// Retrieves the package dependencies.
    ///
    /// For an extra, `package` is the virtual `base[extra]` package and only the
    /// dependencies the extra adds are expected.
    fn dependencies_for(
        &self,
        package: &PackageName,
        version: &Version,
    ) -> Result<Dependencies, Self::Err>;

    /// Whether the target environment satisfies the marker.
    ///
    /// Called at most once per marker during a resolution.
    fn is_satisfied_by_environment(&self, marker: &Marker) -> bool;

    /// This is called fairly regularly during the resolution,
    /// if it returns an Err then resolution will be terminated.
    /// This is helpful if you want to add some form of early termination like a timeout,
    /// or you want to add some form of user feedback if things are taking a while.
    /// If not provided the resolver will run as long as needed.
    fn should_cancel(&self) -> Result<(), Self::Err> {
        Ok(())
    }
}

/// What a package version needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dependencies {
    /// Environment the version itself is restricted to, if any.
    pub requires: Option<Marker>,
    pub dependencies: Vec<Dependency>,
}

impl Dependencies {
    pub fn new(dependencies: impl IntoIterator<Item = Dependency>) -> Self {
        Self {
            requires: None,
            dependencies: dependencies.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn requiring(mut self, marker: Marker) -> Self {
        self.requires = Some(marker);
        self
    }
}

/// A requirement on another package.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dependency {
    pub package: PackageName,
    pub range: Range,
    /// The dependency only applies where the marker holds.
    pub marker: Option<Marker>,
}

impl Dependency {
    pub fn new(package: impl Into<PackageName>, range: Range) -> Self {
        Self {
            package: package.into(),
            range,
            marker: None,
        }
    }

    #[must_use]
    pub fn with_marker(mut self, marker: Marker) -> Self {
        self.marker = Some(marker);
        self
    }
}

/// Concrete versions picked by [resolve], one per package reachable from the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    packages: BTreeMap<PackageName, Version>,
    attempted_solutions: u32,
}

impl Solution {
    pub fn get(&self, package: &PackageName) -> Option<&Version> {
        self.packages.get(package)
    }

    /// Selected packages, sorted by name. Neither the root nor extras are included.
    pub fn packages(&self) -> &BTreeMap<PackageName, Version> {
        &self.packages
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// How many candidate solutions were tried before this one was found.
    pub fn attempted_solutions(&self) -> u32 {
        self.attempted_solutions
    }

    pub fn into_packages(self) -> BTreeMap<PackageName, Version> {
        self.packages
    }
}
