// SPDX-License-Identifier: MPL-2.0

//! Random registries: every solution found must be valid,
//! and a failure must mean that no valid selection exists.

use proptest::prelude::*;

use resolvent::{resolve, OfflineProvider, PackageName, Range, ResolveError, SolverOptions, Version};

/// Per package, per version (`1.0.0`, `2.0.0`, ...), dependencies as
/// `(package index, lowest major, span)`.
type Registry = Vec<Vec<Vec<(usize, u64, u64)>>>;

fn registry_strategy() -> impl Strategy<Value = Registry> {
    prop::collection::vec(
        prop::collection::vec(
            prop::collection::vec((0..4usize, 0..4u64, 0..3u64), 0..3),
            1..=3,
        ),
        1..=4,
    )
}

fn name(index: usize) -> PackageName {
    PackageName::new(format!("p{index}"))
}

fn version(index: usize) -> Version {
    Version::new(index as u64 + 1, 0, 0)
}

/// Dependencies with targets folded onto existing packages.
fn dependencies(registry: &Registry, package: usize, index: usize) -> Vec<(usize, Range)> {
    registry[package][index]
        .iter()
        .map(|&(target, low, span)| {
            let range = Range::between(
                Version::new(low, 0, 0),
                Version::new(low + span + 1, 0, 0),
            );
            (target % registry.len(), range)
        })
        .collect()
}

fn provider(registry: &Registry) -> OfflineProvider {
    let mut provider = OfflineProvider::new();
    for package in 0..registry.len() {
        for index in 0..registry[package].len() {
            let deps = dependencies(registry, package, index)
                .into_iter()
                .map(|(target, range)| (name(target), range));
            provider.add_dependencies(name(package), version(index), deps);
        }
    }
    provider
}

/// `selection[p]` is the version index picked for package `p`, if any.
fn is_valid(registry: &Registry, selection: &[Option<usize>]) -> bool {
    selection.iter().enumerate().all(|(package, picked)| {
        let Some(index) = picked else {
            return true;
        };
        dependencies(registry, package, *index)
            .iter()
            .all(|(target, range)| match selection[*target] {
                Some(dep_index) => range.contains(&version(dep_index)),
                None => false,
            })
    })
}

/// Brute force search for a valid selection with `p0 1.0.0`.
fn exists_solution(registry: &Registry) -> bool {
    let mut selection = vec![None; registry.len()];
    selection[0] = Some(0);
    fn search(registry: &Registry, selection: &mut Vec<Option<usize>>, package: usize) -> bool {
        if package == registry.len() {
            return is_valid(registry, selection);
        }
        if package == 0 {
            return search(registry, selection, 1);
        }
        for choice in std::iter::once(None).chain((0..registry[package].len()).map(Some)) {
            selection[package] = choice;
            if search(registry, selection, package + 1) {
                return true;
            }
        }
        selection[package] = None;
        false
    }
    search(registry, &mut selection, 0)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn sound_and_complete(registry in registry_strategy()) {
        let provider = provider(&registry);
        let result = resolve(&provider, name(0), version(0), &SolverOptions::new());
        match result {
            Ok(solution) => {
                let mut selection = vec![None; registry.len()];
                selection[0] = Some(0);
                for (package, picked) in solution.packages() {
                    let index = (0..registry.len())
                        .find(|&p| &name(p) == package)
                        .expect("only registered packages are selected");
                    prop_assert_ne!(index, 0, "the root is not part of the solution");
                    let position = (0..registry[index].len())
                        .find(|&i| &version(i) == picked)
                        .expect("only registered versions are selected");
                    selection[index] = Some(position);
                }
                prop_assert!(is_valid(&registry, &selection), "{:?}", solution);
            }
            Err(ResolveError::Unsatisfiable(_)) => {
                prop_assert!(!exists_solution(&registry));
            }
            Err(err) => prop_assert!(false, "unexpected error {:?}", err),
        }
    }

    #[test]
    fn deterministic(registry in registry_strategy()) {
        let provider = provider(&registry);
        let options = SolverOptions::new();
        let first = resolve(&provider, name(0), version(0), &options);
        let second = resolve(&provider, name(0), version(0), &options);
        match (first, second) {
            (Ok(a), Ok(b)) => prop_assert_eq!(a, b),
            (Err(ResolveError::Unsatisfiable(a)), Err(ResolveError::Unsatisfiable(b))) => {
                prop_assert_eq!(&a.explanation, &b.explanation)
            }
            _ => prop_assert!(false, "results differ"),
        }
    }
}
