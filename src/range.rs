// SPDX-License-Identifier: MPL-2.0

//! Version ranges and the constraint syntax used to write them.
//!
//! ```
//! # use resolvent::{parse_constraint, Version};
//! let range = parse_constraint(">=1.2, <2 || ^3.1").unwrap();
//! assert!(range.contains(&"1.9.0".parse::<Version>().unwrap()));
//! assert!(range.contains(&"3.4.0".parse::<Version>().unwrap()));
//! assert!(!range.contains(&"2.5.0".parse::<Version>().unwrap()));
//! ```

use std::ops::Bound;

use thiserror::Error;
use version_ranges::Ranges;

use crate::version::{ParseVersionError, PreReleaseKind, Version};

/// A set of versions, stored as canonical disjoint intervals.
pub type Range = Ranges<Version>;

/// Errors while parsing a version constraint.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseConstraintError {
    #[error("invalid version in constraint `{constraint}`")]
    Version {
        constraint: String,
        #[source]
        source: ParseVersionError,
    },
    #[error("operator `{operator}` is missing a version in constraint `{constraint}`")]
    MissingVersion {
        constraint: String,
        operator: String,
    },
    #[error("unknown operator `{operator}` in constraint `{constraint}`")]
    Operator {
        constraint: String,
        operator: String,
    },
    #[error("wildcards are only allowed with `==` or `!=` in constraint `{0}`")]
    Wildcard(String),
    #[error("`~=` requires at least two release numbers in constraint `{0}`")]
    CompatibleRelease(String),
    #[error("no version follows the upper bound of constraint `{0}`")]
    Overflow(String),
}

/// Extra queries on [`Range`].
pub trait RangeExt {
    /// Whether a bound of the range is itself a pre-release, which opts the range into
    /// pre-releases.
    ///
    /// The `.dev0` edge of a release, as produced by `==1.2.*`, is not an opt-in.
    fn allows_prereleases(&self) -> bool;
}

impl RangeExt for Range {
    fn allows_prereleases(&self) -> bool {
        self.iter().any(|(start, end)| {
            [start, end].into_iter().any(|bound| match bound {
                Bound::Included(v) | Bound::Excluded(v) => {
                    v.is_prerelease() && !is_release_edge(v)
                }
                Bound::Unbounded => false,
            })
        })
    }
}

/// The lowest version of a release: `1.3.0.dev0` comes before every other `1.3.0`.
fn release_edge(v: &Version) -> Version {
    v.release().with_pre(PreReleaseKind::Dev, 0)
}

fn is_release_edge(v: &Version) -> bool {
    v.local().is_none() && *v == release_edge(v)
}

/// Parses a constraint such as `>=1.2,<2`, `^1.4 || ~2.0` or `==3.*`.
///
/// Comma or whitespace separated clauses are intersected, `||` (or `|`) separated
/// alternatives are unioned. An empty constraint or `*` allows every version.
pub fn parse_constraint(text: &str) -> Result<Range, ParseConstraintError> {
    text.split('|')
        .map(str::trim)
        .filter(|alternative| !alternative.is_empty())
        .try_fold(None, |acc: Option<Range>, alternative| {
            let range = parse_alternative(alternative)?;
            Ok(Some(match acc {
                Some(acc) => acc.union(&range),
                None => range,
            }))
        })
        .map(|range| range.unwrap_or_else(Range::full))
}

const OPERATOR_CHARS: &[char] = &['<', '>', '=', '!', '~', '^'];

fn parse_alternative(text: &str) -> Result<Range, ParseConstraintError> {
    // `>= 1.0` is one clause: a token made only of operator characters sticks to the next one.
    let mut clauses: Vec<String> = Vec::new();
    let mut pending = String::new();
    for token in text.split(|c: char| c == ',' || c.is_whitespace()) {
        if token.is_empty() {
            continue;
        }
        pending.push_str(token);
        if !token.chars().all(|c| OPERATOR_CHARS.contains(&c)) {
            clauses.push(std::mem::take(&mut pending));
        }
    }
    if !pending.is_empty() {
        return Err(ParseConstraintError::MissingVersion {
            constraint: text.to_string(),
            operator: pending,
        });
    }

    clauses.iter().try_fold(Range::full(), |acc, clause| {
        Ok(acc.intersection(&parse_clause(clause)?))
    })
}

fn parse_clause(clause: &str) -> Result<Range, ParseConstraintError> {
    if clause == "*" {
        return Ok(Range::full());
    }
    let operator_end = clause
        .find(|c: char| !OPERATOR_CHARS.contains(&c))
        .unwrap_or(clause.len());
    let (operator, version) = clause.split_at(operator_end);
    if version.is_empty() {
        return Err(ParseConstraintError::MissingVersion {
            constraint: clause.to_string(),
            operator: operator.to_string(),
        });
    }

    let wildcard = version.strip_suffix(".*").or(version.strip_suffix('*'));
    if let Some(prefix) = wildcard {
        return match operator {
            "" | "=" | "==" => prefix_range(clause, prefix),
            "!=" => Ok(prefix_range(clause, prefix)?.complement()),
            _ => Err(ParseConstraintError::Wildcard(clause.to_string())),
        };
    }

    let (v, precision) =
        Version::parse_with_precision(version).map_err(|source| ParseConstraintError::Version {
            constraint: clause.to_string(),
            source,
        })?;
    let bump = |next: Option<Version>| {
        next.ok_or_else(|| ParseConstraintError::Overflow(clause.to_string()))
    };
    Ok(match operator {
        "" | "=" | "==" => Range::singleton(v),
        "!=" => Range::singleton(v).complement(),
        ">" => Range::strictly_higher_than(v),
        ">=" => Range::higher_than(v),
        "<" => Range::strictly_lower_than(v),
        "<=" => Range::lower_than(v),
        "^" => {
            let upper = if v.major() > 0 || precision == 1 {
                bump(v.next_major())?
            } else if v.minor() > 0 || precision == 2 {
                bump(v.next_minor())?
            } else {
                bump(v.next_patch())?
            };
            Range::between(v, upper)
        }
        "~" => {
            let upper = if precision == 1 {
                bump(v.next_major())?
            } else {
                bump(v.next_minor())?
            };
            Range::between(v, upper)
        }
        "~=" => {
            let upper = match precision {
                1 => return Err(ParseConstraintError::CompatibleRelease(clause.to_string())),
                2 => bump(v.next_major())?,
                _ => bump(v.next_minor())?,
            };
            Range::between(v, upper)
        }
        _ => {
            return Err(ParseConstraintError::Operator {
                constraint: clause.to_string(),
                operator: operator.to_string(),
            })
        }
    })
}

/// `1.2.*` is every version starting with `1.2`.
fn prefix_range(clause: &str, prefix: &str) -> Result<Range, ParseConstraintError> {
    if prefix.is_empty() {
        return Ok(Range::full());
    }
    let (v, precision) =
        Version::parse_with_precision(prefix).map_err(|source| ParseConstraintError::Version {
            constraint: clause.to_string(),
            source,
        })?;
    let next = match precision {
        1 => v.next_major(),
        2 => v.next_minor(),
        _ => v.next_patch(),
    }
    .ok_or_else(|| ParseConstraintError::Overflow(clause.to_string()))?;
    // Pre-releases of the prefix itself (`1.2.0a1` for `1.2.*`) belong to it,
    // those of the next release (`1.3.0rc1`) do not.
    Ok(Range::between(release_edge(&v), release_edge(&next)))
}
