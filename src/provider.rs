// SPDX-License-Identifier: MPL-2.0

use std::collections::BTreeMap;
use std::convert::Infallible;

use crate::{Dependencies, Dependency, Environment, Map, Marker, PackageName, Provider, Range, Version};

/// A basic implementation of [Provider] that
/// contains all dependency information available in memory.
///
/// Markers are evaluated against a fixed [Environment].
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OfflineProvider {
    /// Keyed by package, extras included as `base[extra]`.
    dependencies: Map<PackageName, BTreeMap<Version, Dependencies>>,
    environment: Environment,
}

impl OfflineProvider {
    /// Creates an empty OfflineProvider with no dependencies, for an environment
    /// that accepts every interpreter and platform.
    pub fn new() -> Self {
        Self::default()
    }

    /// The environment markers are evaluated against.
    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Registers the dependencies of a package and version pair.
    ///
    /// All subsequent calls for a given package version pair
    /// will replace the dependencies by the new ones.
    pub fn add_dependencies<N: Into<PackageName>, I: IntoIterator<Item = (N, Range)>>(
        &mut self,
        package: impl Into<PackageName>,
        version: impl Into<Version>,
        dependencies: I,
    ) {
        let dependencies = dependencies
            .into_iter()
            .map(|(dependency, range)| Dependency::new(dependency, range));
        self.add_version(package, version, Dependencies::new(dependencies));
    }

    /// Registers a package version with its full dependency information,
    /// markers included.
    pub fn add_version(
        &mut self,
        package: impl Into<PackageName>,
        version: impl Into<Version>,
        dependencies: Dependencies,
    ) {
        self.dependencies
            .entry(package.into())
            .or_default()
            .insert(version.into(), dependencies);
    }

    /// Registers what the `extra` of a package version adds to its dependencies.
    ///
    /// The version must also be registered for the package itself to be selectable.
    pub fn add_extra<N: Into<PackageName>, I: IntoIterator<Item = (N, Range)>>(
        &mut self,
        package: impl AsRef<str>,
        extra: impl AsRef<str>,
        version: impl Into<Version>,
        dependencies: I,
    ) {
        self.add_dependencies(PackageName::with_extra(package, extra), version, dependencies);
    }

    /// Lists packages that have been saved, extras included.
    pub fn packages(&self) -> impl Iterator<Item = &PackageName> {
        self.dependencies.keys()
    }

    /// Lists versions of saved packages in sorted order.
    /// Returns [None] if no information is available regarding that package.
    pub fn versions(&self, package: &PackageName) -> Option<impl Iterator<Item = &Version>> {
        self.dependencies.get(package).map(|versions| versions.keys())
    }
}

impl Provider for OfflineProvider {
    type Err = Infallible;

    /// Versions are listed newest first.
    fn versions_for(
        &self,
        package: &PackageName,
        allow_prereleases: bool,
    ) -> Result<Vec<Version>, Infallible> {
        Ok(self
            .dependencies
            .get(package)
            .map(|versions| {
                versions
                    .keys()
                    .rev()
                    .filter(|v| allow_prereleases || !v.is_prerelease())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    /// A version without registered dependencies has none.
    fn dependencies_for(
        &self,
        package: &PackageName,
        version: &Version,
    ) -> Result<Dependencies, Infallible> {
        Ok(self
            .dependencies
            .get(package)
            .and_then(|versions| versions.get(version))
            .cloned()
            .unwrap_or_default())
    }

    fn is_satisfied_by_environment(&self, marker: &Marker) -> bool {
        self.environment.evaluate(marker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PreReleaseKind;

    #[test]
    fn versions_newest_first_without_prereleases() {
        let mut provider = OfflineProvider::new();
        provider.add_dependencies("foo", (1, 0, 0), Vec::<(&str, Range)>::new());
        provider.add_dependencies("foo", (2, 0, 0), Vec::<(&str, Range)>::new());
        let pre = Version::new(3, 0, 0).with_pre(PreReleaseKind::Beta, 1);
        provider.add_dependencies("foo", pre.clone(), Vec::<(&str, Range)>::new());

        let foo = PackageName::new("foo");
        let stable = provider.versions_for(&foo, false).unwrap();
        assert_eq!(stable, [Version::new(2, 0, 0), Version::new(1, 0, 0)]);
        let all = provider.versions_for(&foo, true).unwrap();
        assert_eq!(all.first(), Some(&pre));
        assert!(provider
            .versions_for(&PackageName::new("bar"), true)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn extras_are_stored_apart() {
        let mut provider = OfflineProvider::new();
        provider.add_dependencies("foo", (1, 0, 0), [("bar", Range::full())]);
        provider.add_extra("foo", "docs", (1, 0, 0), [("sphinx", Range::full())]);

        let base = provider
            .dependencies_for(&PackageName::new("foo"), &Version::new(1, 0, 0))
            .unwrap();
        assert_eq!(base.dependencies, [Dependency::new("bar", Range::full())]);
        let extra = provider
            .dependencies_for(&PackageName::new("foo[docs]"), &Version::new(1, 0, 0))
            .unwrap();
        assert_eq!(extra.dependencies, [Dependency::new("sphinx", Range::full())]);
    }

    #[test]
    fn markers_use_the_environment() {
        let provider = OfflineProvider::new()
            .with_environment(Environment::new().with_platform("linux"));
        assert!(provider.is_satisfied_by_environment(&Marker::Platform("linux".into())));
        assert!(!provider.is_satisfied_by_environment(&Marker::Platform("win32".into())));
    }
}
