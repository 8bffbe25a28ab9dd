// SPDX-License-Identifier: MPL-2.0

//! This bench monitors the performance of backtracking and term intersection.
//!
//! Dependencies are constructed in a way that many versions need to be tested before finding
//! a solution, or proving there is none.

use criterion::*;
use resolvent::{resolve, OfflineProvider, PackageName, Range, SolverOptions, Version};

fn name(n: u32) -> PackageName {
    PackageName::new(format!("pkg-{n}"))
}

fn version(v: u32) -> Version {
    Version::new(1, u64::from(v), 0)
}

/// A chain of packages where every version `1.v.0` of a package pins the next package to
/// the same version, and the end of the chain only exists at `1.0.0`.
fn backtracking_singletons(c: &mut Criterion, package_count: u32, version_count: u32) {
    let mut provider = OfflineProvider::new();
    provider.add_dependencies("root", (1, 0, 0), [(name(1), Range::full())]);
    provider.add_dependencies(name(1), version(0), Vec::<(PackageName, Range)>::new());

    for n in 1..package_count {
        for v in 1..version_count {
            provider.add_dependencies(name(n), version(v), [(name(n + 1), Range::singleton(version(v)))]);
        }
    }

    let options = SolverOptions::new();
    c.bench_function("backtracking_singletons", |b| {
        b.iter(|| {
            let _ = resolve(&provider, "root", (1, 0, 0), &options);
        })
    });
}

/// Like [backtracking_singletons], with the last package of the chain pinning a shared
/// package the root requires at a version nobody else accepts.
fn backtracking_disjoint_versions(c: &mut Criterion, package_count: u32, version_count: u32) {
    let mut provider = OfflineProvider::new();
    let shared = PackageName::new("shared");
    provider.add_dependencies(
        "root",
        (1, 0, 0),
        [
            (name(1), Range::full()),
            (shared.clone(), Range::singleton(version(0))),
        ],
    );
    provider.add_dependencies(name(1), version(0), Vec::<(PackageName, Range)>::new());

    for n in 1..package_count {
        for v in 1..version_count {
            provider.add_dependencies(name(n), version(v), [(name(n + 1), Range::singleton(version(v)))]);
        }
    }
    for v in 1..version_count {
        provider.add_dependencies(
            name(package_count),
            version(v),
            [(shared.clone(), Range::singleton(version(v)))],
        );
    }
    for v in 0..version_count {
        provider.add_dependencies(shared.clone(), version(v), Vec::<(PackageName, Range)>::new());
    }

    let options = SolverOptions::new();
    c.bench_function("backtracking_disjoint_versions", |b| {
        b.iter(|| {
            let _ = resolve(&provider, "root", (1, 0, 0), &options);
        })
    });
}

/// Every version of a package accepts a shrinking range of the next package.
fn backtracking_ranges(c: &mut Criterion, package_count: u32, version_count: u32) {
    let mut provider = OfflineProvider::new();
    provider.add_dependencies("root", (1, 0, 0), [(name(1), Range::full())]);
    provider.add_dependencies(name(1), version(0), Vec::<(PackageName, Range)>::new());

    for n in 1..package_count {
        for v in 1..version_count {
            let range = Range::higher_than(version(version_count - v));
            provider.add_dependencies(name(n), version(v), [(name(n + 1), range)]);
        }
    }

    let options = SolverOptions::new();
    c.bench_function("backtracking_ranges", |b| {
        b.iter(|| {
            let _ = resolve(&provider, "root", (1, 0, 0), &options);
        })
    });
}

fn bench_group(c: &mut Criterion) {
    backtracking_singletons(c, 100, 500);
    backtracking_disjoint_versions(c, 300, 200);
    backtracking_ranges(c, 5, 200);
}

criterion_group!(benches, bench_group);
criterion_main!(benches);
