// SPDX-License-Identifier: MPL-2.0

//! Environment markers: conditions on the target environment that gate a dependency or a
//! whole package version.

use std::fmt::{self, Display};

use crate::{Range, Set, Version};

/// A condition on the environment the solution is resolved for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Marker {
    /// The interpreter version must lie in the range.
    Interpreter(Range),
    /// The target platform must be the named one.
    Platform(String),
    /// Any other condition, opaque to the solver.
    Expression(String),
}

impl Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interpreter(range) => write!(f, "interpreter {range}"),
            Self::Platform(platform) => write!(f, "platform {platform}"),
            Self::Expression(expression) => write!(f, "{expression}"),
        }
    }
}

/// A fixed target environment that markers are evaluated against.
///
/// An unset interpreter or platform does not constrain anything: every marker on it holds.
/// Expressions hold only when they were explicitly enabled.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Environment {
    interpreter: Option<Version>,
    platform: Option<String>,
    expressions: Set<String>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interpreter(mut self, version: impl Into<Version>) -> Self {
        self.interpreter = Some(version.into());
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expressions.insert(expression.into());
        self
    }

    pub fn interpreter(&self) -> Option<&Version> {
        self.interpreter.as_ref()
    }

    pub fn platform(&self) -> Option<&str> {
        self.platform.as_deref()
    }

    /// Whether the marker holds in this environment.
    pub fn evaluate(&self, marker: &Marker) -> bool {
        match marker {
            Marker::Interpreter(range) => self
                .interpreter
                .as_ref()
                .map_or(true, |version| range.contains(version)),
            Marker::Platform(platform) => self
                .platform
                .as_ref()
                .map_or(true, |target| target.eq_ignore_ascii_case(platform)),
            Marker::Expression(expression) => self.expressions.contains(expression),
        }
    }
}
