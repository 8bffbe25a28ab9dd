// SPDX-License-Identifier: MPL-2.0

//! Incompatibility-driven package version resolution.
//!
//! Given the requirements of a project, [resolve] finds one version for every package
//! reachable from it such that every requirement holds, or proves that no such set exists.
//! The algorithm is PubGrub: on a conflict it learns a new incompatibility, jumps back to
//! the decision that caused it, and never makes the same mistake twice. Every learned
//! incompatibility remembers the two it was derived from, so a failure comes with a
//! readable [Explanation] of its root causes.
//!
//! # Basic example
//!
//! Let's imagine that we are building a user interface
//! with a menu containing dropdowns with some icons,
//! icons that we are also directly using in other parts of the interface.
//!
//! ```
//! # use resolvent::{parse_constraint, resolve, OfflineProvider, Range, SolverOptions, Version};
//! let mut provider = OfflineProvider::new();
//! let none = Vec::<(&str, Range)>::new;
//! provider.add_dependencies("root", (1, 0, 0), [("menu", Range::full()), ("icons", Range::full())]);
//! provider.add_dependencies("menu", (1, 0, 0), [("dropdown", Range::full())]);
//! provider.add_dependencies("dropdown", (1, 0, 0), [("icons", parse_constraint("^1.0")?)]);
//! provider.add_dependencies("icons", (1, 0, 0), none());
//! provider.add_dependencies("icons", (2, 0, 0), none());
//!
//! // Run the algorithm.
//! let solution = resolve(&provider, "root", (1, 0, 0), &SolverOptions::new())?;
//! assert_eq!(solution.get(&"icons".into()), Some(&Version::new(1, 0, 0)));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Versions and ranges
//!
//! [Version] is `major.minor.patch` with optional prerelease and local segments.
//! Requirements are [Range]s, unions of disjoint intervals of versions, usually written
//! with the constraint grammar of [parse_constraint]: `^1.2`, `~1.2`, `>=1,<2 || >=3`.
//!
//! # Provider
//!
//! The [Provider] trait is how the solver learns which versions of a package exist and what
//! each of them depends on. [OfflineProvider] keeps everything in memory.
//!
//! # Failure reports
//!
//! When resolution fails, [ResolveError::Unsatisfiable] holds a [NoSolution] with the
//! [DerivationTree] of the failure and its [Explanation]:
//!
//! ```txt
//! Because foo 1.5.0 depends on bar >=2.0.0,<3.0.0 and no versions of foo match >=1.0.0,<1.5.0 || >1.5.0,<2.0.0, foo >=1.0.0,<2.0.0 requires bar >=2.0.0,<3.0.0.
//! So, because root depends on both foo >=1.0.0,<2.0.0 and bar >=1.0.0,<2.0.0, version solving failed.
//! ```

mod error;
mod marker;
mod options;
mod package;
mod provider;
mod range;
pub mod report;
mod solver;
mod term;
mod type_aliases;
mod version;

pub use error::ResolveError;
pub use marker::{Environment, Marker};
pub use options::SolverOptions;
pub use package::PackageName;
pub use provider::OfflineProvider;
pub use range::{parse_constraint, ParseConstraintError, Range, RangeExt};
pub use report::{DerivationTree, Derived, Explanation, External, Hint, NoSolution};
pub use solver::{resolve, Dependencies, Dependency, Provider, Solution};
pub use term::{Relation, Term};
pub use type_aliases::{Map, Set};
pub use version::{ParseVersionError, PreRelease, PreReleaseKind, Version};
pub use version_ranges::Ranges;

mod internal;
