// SPDX-License-Identifier: MPL-2.0

//! Knobs of a resolution that are not part of the dependency graph.

use std::collections::{BTreeMap, BTreeSet};

use crate::{PackageName, Version};

/// Options of a resolution.
///
/// ```
/// # use resolvent::{SolverOptions, Version};
/// let options = SolverOptions::new()
///     .lock("foo", Version::new(1, 2, 0))
///     .lock("bar", Version::new(0, 3, 0))
///     .use_latest("bar");
/// assert_eq!(options.locked_version(&"foo".into()), Some(&Version::new(1, 2, 0)));
/// assert_eq!(options.locked_version(&"bar".into()), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SolverOptions {
    /// Previously selected versions, kept as long as they stay in range.
    locked: BTreeMap<PackageName, Version>,
    /// Packages whose lock is ignored.
    use_latest: BTreeSet<PackageName>,
    /// Consider prerelease versions for every package.
    allow_prereleases: bool,
}

impl SolverOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefer `version` for `package` while it is allowed.
    pub fn lock(mut self, package: impl Into<PackageName>, version: impl Into<Version>) -> Self {
        self.locked.insert(package.into(), version.into());
        self
    }

    /// Ignore the lock of `package`.
    pub fn use_latest(mut self, package: impl Into<PackageName>) -> Self {
        self.use_latest.insert(package.into());
        self
    }

    pub fn allow_prereleases(mut self, allow: bool) -> Self {
        self.allow_prereleases = allow;
        self
    }

    pub fn prereleases_allowed(&self) -> bool {
        self.allow_prereleases
    }

    /// The version `package` is locked at, unless it should use the latest one.
    pub fn locked_version(&self, package: &PackageName) -> Option<&Version> {
        if self.is_use_latest(package) {
            return None;
        }
        self.locked.get(package)
    }

    pub fn is_use_latest(&self, package: &PackageName) -> bool {
        self.use_latest.contains(package)
    }
}
