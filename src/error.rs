// SPDX-License-Identifier: MPL-2.0

//! Handling pubgrub errors.

use thiserror::Error;

use crate::report::NoSolution;
use crate::{PackageName, Version};

/// Errors that may occur while solving dependencies.
///
/// `E` is the error type of the [Provider](crate::Provider) in use.
#[derive(Error, Debug)]
pub enum ResolveError<E: std::error::Error + 'static> {
    /// There is no solution for this set of dependencies.
    #[error("No solution")]
    Unsatisfiable(Box<NoSolution>),

    /// Error arising when the provider failed to list the versions of a package.
    #[error("Retrieving the versions of {package} failed")]
    VersionsUnavailable {
        /// Package whose versions we wanted.
        package: PackageName,
        /// Error raised by the provider.
        #[source]
        source: E,
    },

    /// Error arising when the provider failed to retrieve dependencies.
    #[error("Retrieving dependencies of {package} {version} failed")]
    DependenciesUnavailable {
        /// Package whose dependencies we want.
        package: PackageName,
        /// Version of the package for which we want the dependencies.
        version: Version,
        /// Error raised by the provider.
        #[source]
        source: E,
    },

    /// The provider asked for the resolution to stop.
    #[error("The resolution was cancelled")]
    Cancelled(#[source] E),

    /// Something unexpected happened, usually a provider breaking its contract.
    #[error("{0}")]
    InvariantViolation(String),
}

impl<E: std::error::Error + 'static> ResolveError<E> {
    /// The failure report, if the dependencies are unsatisfiable.
    pub fn no_solution(&self) -> Option<&NoSolution> {
        match self {
            Self::Unsatisfiable(no_solution) => Some(no_solution),
            _ => None,
        }
    }
}
