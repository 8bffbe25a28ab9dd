// SPDX-License-Identifier: MPL-2.0

//! Package versions: `major.minor.patch`, an optional pre-release tag and an optional
//! local label.
//!
//! Versions are ordered by release numbers first, then pre-release
//! (`dev < alpha < beta < rc < final`), then local label (no label sorts first).

use std::cmp::Ordering;
use std::fmt::{self, Display};
use std::str::FromStr;

use thiserror::Error;

/// A version of a package.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct Version {
    major: u64,
    minor: u64,
    patch: u64,
    pre: Option<PreRelease>,
    local: Option<String>,
}

/// A pre-release marker such as `a1`, `rc2` or `.dev0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PreRelease {
    pub kind: PreReleaseKind,
    pub number: u64,
}

/// Pre-release phases, in release order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PreReleaseKind {
    Dev,
    Alpha,
    Beta,
    Rc,
}

/// Errors while parsing a [`Version`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseVersionError {
    #[error("empty version")]
    Empty,
    #[error("version `{0}` has more than three release numbers")]
    TooManyComponents(String),
    #[error("invalid release number `{component}` in version `{version}`")]
    InvalidComponent { version: String, component: String },
    #[error("unknown pre-release tag `{tag}` in version `{version}`")]
    UnknownPreRelease { version: String, tag: String },
    #[error("invalid local label in version `{0}`")]
    InvalidLocal(String),
}

impl Version {
    /// A final release version.
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: None,
            local: None,
        }
    }

    /// This version with the given pre-release tag.
    pub fn with_pre(mut self, kind: PreReleaseKind, number: u64) -> Self {
        self.pre = Some(PreRelease { kind, number });
        self
    }

    /// This version with the given local label, normalized to lowercase with `.` separators.
    pub fn with_local(mut self, local: &str) -> Self {
        self.local = Some(normalize_local(local));
        self
    }

    pub fn major(&self) -> u64 {
        self.major
    }

    pub fn minor(&self) -> u64 {
        self.minor
    }

    pub fn patch(&self) -> u64 {
        self.patch
    }

    pub fn pre(&self) -> Option<PreRelease> {
        self.pre
    }

    pub fn local(&self) -> Option<&str> {
        self.local.as_deref()
    }

    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some()
    }

    /// The release part alone, without pre-release tag or local label.
    pub fn release(&self) -> Self {
        Self::new(self.major, self.minor, self.patch)
    }

    /// The first release of the next major version, or [None] on overflow.
    pub fn next_major(&self) -> Option<Self> {
        Some(Self::new(self.major.checked_add(1)?, 0, 0))
    }

    pub fn next_minor(&self) -> Option<Self> {
        Some(Self::new(self.major, self.minor.checked_add(1)?, 0))
    }

    pub fn next_patch(&self) -> Option<Self> {
        Some(Self::new(self.major, self.minor, self.patch.checked_add(1)?))
    }

    /// Parses a version and also returns how many release numbers were written.
    ///
    /// `1.2` and `1.2.0` are the same version, but `^1.2` and `~1.2` depend on the
    /// precision the constraint was written with.
    pub(crate) fn parse_with_precision(input: &str) -> Result<(Self, usize), ParseVersionError> {
        let lowered = input.trim().to_ascii_lowercase();
        let text = lowered.strip_prefix('v').unwrap_or(&lowered);
        if text.is_empty() {
            return Err(ParseVersionError::Empty);
        }
        let (public, local) = match text.split_once('+') {
            Some((public, local)) => (public, Some(local)),
            None => (text, None),
        };

        let release_end = public
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(public.len());
        let (mut release, mut rest) = public.split_at(release_end);
        // In `1.0.dev1` the last dot separates the tag, it is not an empty release number.
        if !rest.is_empty() {
            if let Some(stripped) = release.strip_suffix('.') {
                release = stripped;
                rest = &public[release_end - 1..];
            }
        }

        let components: Vec<&str> = release.split('.').collect();
        if components.len() > 3 {
            return Err(ParseVersionError::TooManyComponents(input.to_string()));
        }
        let mut numbers = [0u64; 3];
        for (slot, component) in numbers.iter_mut().zip(&components) {
            *slot = component
                .parse()
                .map_err(|_| ParseVersionError::InvalidComponent {
                    version: input.to_string(),
                    component: component.to_string(),
                })?;
        }

        let pre = if rest.is_empty() {
            None
        } else {
            Some(parse_pre_release(input, rest)?)
        };
        let local = match local {
            None => None,
            Some(label) => {
                let valid = !label.is_empty()
                    && label
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));
                if !valid {
                    return Err(ParseVersionError::InvalidLocal(input.to_string()));
                }
                Some(normalize_local(label))
            }
        };

        let [major, minor, patch] = numbers;
        Ok((
            Self {
                major,
                minor,
                patch,
                pre,
                local,
            },
            components.len(),
        ))
    }
}

fn parse_pre_release(version: &str, text: &str) -> Result<PreRelease, ParseVersionError> {
    let unknown = || ParseVersionError::UnknownPreRelease {
        version: version.to_string(),
        tag: text.to_string(),
    };
    let text = text.trim_start_matches(['-', '.', '_']);
    let tag_end = text
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(text.len());
    let (tag, number) = text.split_at(tag_end);
    let kind = match tag {
        "dev" => PreReleaseKind::Dev,
        "a" | "alpha" => PreReleaseKind::Alpha,
        "b" | "beta" => PreReleaseKind::Beta,
        "rc" | "c" | "pre" | "preview" => PreReleaseKind::Rc,
        _ => return Err(unknown()),
    };
    let number = number.trim_start_matches(['-', '.', '_']);
    let number = if number.is_empty() {
        0
    } else {
        number.parse().map_err(|_| unknown())?
    };
    Ok(PreRelease { kind, number })
}

fn normalize_local(label: &str) -> String {
    label.to_ascii_lowercase().replace(['-', '_'], ".")
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (&self.pre, &other.pre) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
            .then_with(|| match (&self.local, &other.local) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(a), Some(b)) => compare_local(a, b),
            })
    }
}

/// Local labels compare segment by segment. Numeric segments compare as numbers and
/// sort after alphanumeric ones.
fn compare_local(a: &str, b: &str) -> Ordering {
    fn segment(part: &str) -> (bool, u64, &str) {
        match part.parse::<u64>() {
            Ok(number) => (true, number, part),
            Err(_) => (false, 0, part),
        }
    }
    a.split('.').map(segment).cmp(b.split('.').map(segment))
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for Version {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_with_precision(s).map(|(version, _)| version)
    }
}

impl TryFrom<String> for Version {
    type Error = ParseVersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.to_string()
    }
}

impl From<(u64, u64, u64)> for Version {
    fn from((major, minor, patch): (u64, u64, u64)) -> Self {
        Self::new(major, minor, patch)
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(PreRelease { kind, number }) = self.pre {
            match kind {
                PreReleaseKind::Dev => write!(f, ".dev{number}")?,
                PreReleaseKind::Alpha => write!(f, "a{number}")?,
                PreReleaseKind::Beta => write!(f, "b{number}")?,
                PreReleaseKind::Rc => write!(f, "rc{number}")?,
            }
        }
        if let Some(local) = &self.local {
            write!(f, "+{local}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    #[test]
    fn parse_release_precision() {
        assert_eq!(v("1"), Version::new(1, 0, 0));
        assert_eq!(v("1.2"), Version::new(1, 2, 0));
        assert_eq!(v("v1.2.3"), Version::new(1, 2, 3));
        assert_eq!(Version::parse_with_precision("1.2").unwrap().1, 2);
    }

    #[test]
    fn parse_pre_releases() {
        let alpha = Version::new(1, 0, 0).with_pre(PreReleaseKind::Alpha, 1);
        assert_eq!(v("1.0.0a1"), alpha);
        assert_eq!(v("1.0.0-alpha.1"), alpha);
        assert_eq!(v("1.0.0.dev2").pre().map(|p| p.kind), Some(PreReleaseKind::Dev));
        assert_eq!(v("2.0rc"), Version::new(2, 0, 0).with_pre(PreReleaseKind::Rc, 0));
        assert!(matches!(
            "1.0.0-banana".parse::<Version>(),
            Err(ParseVersionError::UnknownPreRelease { .. })
        ));
    }

    #[test]
    fn parse_errors() {
        assert_eq!("".parse::<Version>(), Err(ParseVersionError::Empty));
        assert!(matches!(
            "1.2.3.4".parse::<Version>(),
            Err(ParseVersionError::TooManyComponents(_))
        ));
        assert!(matches!(
            "1..2".parse::<Version>(),
            Err(ParseVersionError::InvalidComponent { .. })
        ));
        assert!(matches!(
            "1.0+".parse::<Version>(),
            Err(ParseVersionError::InvalidLocal(_))
        ));
    }

    #[test]
    fn ordering() {
        let ordered = [
            "1.0.0.dev1",
            "1.0.0a1",
            "1.0.0a2",
            "1.0.0b1",
            "1.0.0rc1",
            "1.0.0",
            "1.0.0+local.1",
            "1.0.1",
            "1.10.0",
            "2.0.0",
        ];
        for pair in ordered.windows(2) {
            assert!(v(pair[0]) < v(pair[1]), "{} < {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn display_is_canonical() {
        assert_eq!(v("1.2").to_string(), "1.2.0");
        assert_eq!(v("1.0-RC-3").to_string(), "1.0.0rc3");
        assert_eq!(v("1.0.dev4").to_string(), "1.0.0.dev4");
        assert_eq!(v("1.0+Ubuntu_1").to_string(), "1.0.0+ubuntu.1");
        assert_eq!(v(&v("3.1b2").to_string()), v("3.1b2"));
    }

    #[test]
    fn bumps_drop_tags() {
        let version = v("1.2.3rc1+local");
        assert_eq!(version.next_major(), Some(Version::new(2, 0, 0)));
        assert_eq!(version.next_minor(), Some(Version::new(1, 3, 0)));
        assert_eq!(version.next_patch(), Some(Version::new(1, 2, 4)));
        assert_eq!(version.release(), Version::new(1, 2, 3));
    }

    #[test]
    fn bumps_overflow() {
        let top = Version::new(u64::MAX, u64::MAX, u64::MAX);
        assert_eq!(top.next_major(), None);
        assert_eq!(top.next_minor(), None);
        assert_eq!(top.next_patch(), None);
        assert_eq!(
            Version::new(1, u64::MAX, 0).next_major(),
            Some(Version::new(2, 0, 0))
        );
    }

    #[test]
    fn local_labels_compare_by_segment() {
        assert!(v("1.0.0+9") < v("1.0.0+10"));
        assert!(v("1.0.0+abc") < v("1.0.0+1"));
        assert!(v("1.0.0+ubuntu.2") < v("1.0.0+ubuntu.10"));
        assert!(v("1.0.0+ubuntu") < v("1.0.0+ubuntu.1"));
        assert!(v("1.0.0") < v("1.0.0+0"));
    }
}
