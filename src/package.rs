// SPDX-License-Identifier: MPL-2.0

//! Package names.

use std::fmt::{self, Display};

/// A normalized package name, optionally scoped to an extra.
///
/// Names compare case-insensitively and treat runs of `-`, `_` and `.` as a single `-`,
/// so `Foo_Bar`, `foo.bar` and `foo-bar` are the same package.
/// A name written `base[extra]` is a virtual package standing for the extra's optional
/// dependencies of `base`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "String", into = "String"))]
pub struct PackageName {
    base: String,
    extra: Option<String>,
}

impl PackageName {
    /// Parses and normalizes `name` or `name[extra]`.
    pub fn new(name: impl AsRef<str>) -> Self {
        let name = name.as_ref().trim();
        match name.split_once('[') {
            Some((base, rest)) => {
                let extra = rest.trim_end_matches(']');
                Self::with_extra(base, extra)
            }
            None => Self {
                base: normalize(name),
                extra: None,
            },
        }
    }

    /// The virtual package for `extra` of `base`.
    ///
    /// Several comma-separated extras are kept together, sorted, as one virtual package.
    pub fn with_extra(base: impl AsRef<str>, extra: impl AsRef<str>) -> Self {
        let mut extras: Vec<String> = extra
            .as_ref()
            .split(',')
            .map(normalize)
            .filter(|e| !e.is_empty())
            .collect();
        extras.sort();
        extras.dedup();
        Self {
            base: normalize(base.as_ref()),
            extra: (!extras.is_empty()).then(|| extras.join(",")),
        }
    }

    /// The package without its extra.
    pub fn base(&self) -> Self {
        Self {
            base: self.base.clone(),
            extra: None,
        }
    }

    pub fn extra(&self) -> Option<&str> {
        self.extra.as_deref()
    }

    /// Whether this name stands for an extra rather than a real package.
    pub fn is_virtual(&self) -> bool {
        self.extra.is_some()
    }
}

fn normalize(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    let mut separator = false;
    for c in name.trim().chars() {
        if matches!(c, '-' | '_' | '.') {
            separator = true;
            continue;
        }
        if separator && !normalized.is_empty() {
            normalized.push('-');
        }
        separator = false;
        normalized.push(c.to_ascii_lowercase());
    }
    normalized
}

impl Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.extra {
            Some(extra) => write!(f, "{}[{}]", self.base, extra),
            None => write!(f, "{}", self.base),
        }
    }
}

impl From<&str> for PackageName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for PackageName {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<&PackageName> for PackageName {
    fn from(name: &PackageName) -> Self {
        name.clone()
    }
}

impl From<PackageName> for String {
    fn from(name: PackageName) -> Self {
        name.to_string()
    }
}
