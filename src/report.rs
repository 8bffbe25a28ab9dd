// SPDX-License-Identifier: MPL-2.0

//! Build a report as clear as possible as to why
//! dependency solving failed.
//!
//! The derivation tree of the terminal incompatibility is turned into numbered lines,
//! one per derived incompatibility, in the style of:
//!
//! ```txt
//! Because foo 1.5.0 depends on bar >=2.0.0,<3.0.0 and no versions of foo match >=1.0.0,<1.5.0 || >1.5.0,<2.0.0, foo >=1.0.0,<2.0.0 requires bar >=2.0.0,<3.0.0.
//! So, because root depends on both foo >=1.0.0,<2.0.0 and bar >=1.0.0,<2.0.0, version solving failed.
//! ```

use std::fmt::{self, Display};
use std::sync::Arc;

use crate::{Map, Marker, PackageName, Range, Set, Term, Version};

/// Derivation tree resulting in the impossibility to solve the dependencies of our root package.
#[derive(Debug, Clone)]
pub enum DerivationTree {
    /// External incompatibility.
    External(External),
    /// Incompatibility derived from two others.
    Derived(Derived),
}

/// Incompatibilities that are not derived from others,
/// they have their own reason.
#[derive(Debug, Clone)]
pub enum External {
    /// Initial incompatibility aiming at picking the root package for the first decision.
    NotRoot(PackageName, Version),
    /// There are no versions in the given range for this package.
    NoVersions(PackageName, Range),
    /// The provider does not know the package at all.
    NotFound(PackageName),
    /// Incompatibility coming from the dependencies of a given package.
    FromDependencyOf(PackageName, Range, PackageName, Range),
    /// The version can't be used in the target environment.
    Environment(PackageName, Version, Marker),
}

/// Incompatibility derived from two others.
#[derive(Debug, Clone)]
pub struct Derived {
    /// Terms of the incompatibility.
    pub terms: Vec<(PackageName, Term)>,
    /// Indicate if that incompatibility is present multiple times
    /// in the derivation tree.
    /// If that is the case, it has a unique id, provided in that option.
    /// Then, we may want to only explain it once,
    /// and refer to the explanation for the other times.
    pub shared_id: Option<usize>,
    /// First cause.
    pub cause1: Arc<DerivationTree>,
    /// Second cause.
    pub cause2: Arc<DerivationTree>,
}

impl DerivationTree {
    /// Every external incompatibility of the tree, in depth-first order, each once.
    pub fn external_causes(&self) -> Vec<&External> {
        let mut seen: Set<*const Derived> = Set::default();
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(tree) = stack.pop() {
            match tree {
                Self::External(external) => out.push(external),
                Self::Derived(derived) => {
                    if seen.insert(derived as *const Derived) {
                        stack.push(&*derived.cause2);
                        stack.push(&*derived.cause1);
                    }
                }
            }
        }
        out
    }

    /// The terms of the incompatibility at the top of this tree.
    fn terms(&self) -> Vec<(PackageName, Term)> {
        match self {
            Self::Derived(derived) => derived.terms.clone(),
            Self::External(external) => external.terms(),
        }
    }
}

impl External {
    fn terms(&self) -> Vec<(PackageName, Term)> {
        match self {
            Self::NotRoot(package, version) => vec![(
                package.clone(),
                Term::Negative(Range::singleton(version.clone())),
            )],
            Self::NoVersions(package, range) => {
                vec![(package.clone(), Term::Positive(range.clone()))]
            }
            Self::NotFound(package) => vec![(package.clone(), Term::Positive(Range::full()))],
            Self::FromDependencyOf(package, versions, dependency, range) => vec![
                (package.clone(), Term::Positive(versions.clone())),
                (dependency.clone(), Term::Negative(range.clone())),
            ],
            Self::Environment(package, version, _) => {
                vec![(package.clone(), Term::exact(version.clone()))]
            }
        }
    }
}

impl External {
    /// The sentence used for this incompatibility in explanations. `root` is named
    /// without its versions.
    fn describe(&self, root: Option<&PackageName>) -> String {
        match self {
            Self::NotRoot(package, version) => format!("{package} is {version}"),
            Self::NoVersions(package, range) => {
                format!("no versions of {package} match {range}")
            }
            Self::NotFound(package) => format!("{package} doesn't exist"),
            Self::FromDependencyOf(package, versions, dependency, range) => format!(
                "{} depends on {}",
                terse(root, package, &Term::Positive(versions.clone()), true),
                terse(root, dependency, &Term::Negative(range.clone()), false)
            ),
            Self::Environment(package, version, marker) => format!(
                "{} requires {marker}",
                terse(root, package, &Term::exact(version.clone()), true)
            ),
        }
    }
}

impl Display for External {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.describe(None))
    }
}

/// Short form of a term: `every version of foo` when allowed and the range is full,
/// the bare name for the root or a full range.
fn terse(
    root: Option<&PackageName>,
    package: &PackageName,
    term: &Term,
    allow_every: bool,
) -> String {
    let range = match term {
        Term::Positive(range) | Term::Negative(range) => range,
    };
    if allow_every && range == &Range::full() {
        format!("every version of {package}")
    } else if Some(package) == root || range == &Range::full() {
        package.to_string()
    } else {
        format!("{package} {range}")
    }
}

/// A canned remediation suggestion attached to a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hint {
    pub title: String,
    pub description: String,
    pub links: Vec<&'static str>,
}

impl Display for Hint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}\n\n  {}", self.title, self.description)?;
        for link in &self.links {
            write!(f, "\n    {link}")?;
        }
        Ok(())
    }
}

/// Human readable account of a failure: the explanation lines and the hints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Explanation {
    lines: Vec<String>,
    hints: Vec<Hint>,
}

impl Explanation {
    /// Explain the derivation tree of a failed resolution of `root`.
    pub fn new(tree: &DerivationTree, root: &PackageName) -> Self {
        Self {
            lines: Writer::new(root).write(tree),
            hints: hints(tree),
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn hints(&self) -> &[Hint] {
        &self.hints
    }
}

impl Display for Explanation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.lines.join("\n"))?;
        for hint in &self.hints {
            write!(f, "\n\n  * {hint}")?;
        }
        Ok(())
    }
}

/// The dependencies of the root package can't be satisfied.
#[derive(Debug, Clone)]
pub struct NoSolution {
    pub derivation_tree: DerivationTree,
    pub explanation: Explanation,
}

impl Display for NoSolution {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.explanation)
    }
}

// Hints #######################################################################

const INTERPRETER_LINKS: &[&str] = &[
    "https://python-poetry.org/docs/dependency-specification/#python-restricted-dependencies",
    "https://python-poetry.org/docs/dependency-specification/#using-environment-markers",
];
const PLATFORM_LINKS: &[&str] =
    &["https://python-poetry.org/docs/dependency-specification/#using-environment-markers"];
const NOT_FOUND_LINKS: &[&str] =
    &["https://packaging.python.org/en/latest/specifications/name-normalization/"];

/// At most one hint per category, in the order the categories first appear in the tree.
fn hints(tree: &DerivationTree) -> Vec<Hint> {
    let mut hints: Vec<Hint> = Vec::new();
    let mut push = |hint: Hint| {
        if !hints.iter().any(|h| h.title == hint.title) {
            hints.push(hint);
        }
    };
    for external in tree.external_causes() {
        match external {
            External::Environment(package, version, Marker::Interpreter(range)) => push(Hint {
                title: "Check your dependencies interpreter requirement.".into(),
                description: format!(
                    "{package} {version} requires interpreter {range}, which the target \
                     environment does not provide. Restrict the dependency to the interpreter \
                     versions it supports with its interpreter or markers properties."
                ),
                links: INTERPRETER_LINKS.to_vec(),
            }),
            External::Environment(package, version, Marker::Platform(platform)) => push(Hint {
                title: "Check your dependencies platform requirement.".into(),
                description: format!(
                    "{package} {version} is only available on platform {platform}. \
                     Restrict the dependency to that platform with a marker."
                ),
                links: PLATFORM_LINKS.to_vec(),
            }),
            External::NotFound(package) => push(Hint {
                title: "Check the package name.".into(),
                description: format!(
                    "No version of {package} is known. Make sure the name is spelled \
                     correctly and the package is published."
                ),
                links: NOT_FOUND_LINKS.to_vec(),
            }),
            _ => {}
        }
    }
    hints
}

// Writer ######################################################################

/// Turns a derivation tree into explanation lines.
///
/// Derived incompatibilities are identified by their address in the tree, which stays
/// put for the whole run since the tree is borrowed.
struct Writer<'a> {
    root: &'a PackageName,
    /// Messages with their line number, if numbered. Empty messages separate paragraphs.
    lines: Vec<(String, Option<usize>)>,
    line_numbers: Map<*const Derived, usize>,
    top: *const Derived,
}

impl<'a> Writer<'a> {
    fn new(root: &'a PackageName) -> Self {
        Self {
            root,
            lines: Vec::new(),
            line_numbers: Map::default(),
            top: std::ptr::null(),
        }
    }

    fn write(mut self, tree: &DerivationTree) -> Vec<String> {
        match tree {
            DerivationTree::Derived(derived) => {
                self.top = derived as *const Derived;
                self.visit(derived, false);
            }
            DerivationTree::External(_) => {
                let message = format!("Because {}, version solving failed.", self.describe(tree));
                self.lines.push((message, None));
            }
        }

        let padding = self
            .line_numbers
            .values()
            .max()
            .map_or(0, |n| format!("({n}) ").len());
        let mut out: Vec<String> = Vec::new();
        let mut last_message: Option<&str> = None;
        for (message, number) in &self.lines {
            if message.is_empty() {
                if out.last().is_some_and(|line| !line.is_empty()) {
                    out.push(String::new());
                }
                last_message = None;
                continue;
            }
            if last_message == Some(message.as_str()) {
                continue;
            }
            last_message = Some(message);
            let prefix = match number {
                Some(n) => format!("{:<padding$}", format!("({n})")),
                None => " ".repeat(padding),
            };
            out.push(prefix + message);
        }
        while out.last().is_some_and(String::is_empty) {
            out.pop();
        }
        out
    }

    fn line_of(&self, derived: &Derived) -> Option<usize> {
        self.line_numbers
            .get(&(derived as *const Derived))
            .copied()
    }

    fn emit(&mut self, derived: &Derived, message: String, numbered: bool) {
        if numbered {
            let number = self.line_numbers.len() + 1;
            self.line_numbers.insert(derived as *const Derived, number);
            self.lines.push((message, Some(number)));
        } else {
            self.lines.push((message, None));
        }
    }

    fn visit(&mut self, derived: &Derived, conclusion: bool) {
        let numbered = conclusion || derived.shared_id.is_some();
        let conjunction = if conclusion || std::ptr::eq(derived, self.top) {
            "So,"
        } else {
            "And"
        };
        let current = self.describe_terms(&derived.terms);
        let (cause1, cause2) = (&*derived.cause1, &*derived.cause2);

        match (cause1, cause2) {
            (DerivationTree::Derived(d1), DerivationTree::Derived(d2)) => {
                match (self.line_of(d1), self.line_of(d2)) {
                    (Some(l1), Some(l2)) => {
                        let both = self.and_to_string(cause1, cause2, Some(l1), Some(l2));
                        self.emit(derived, format!("Because {both}, {current}."), numbered);
                    }
                    (Some(line), None) | (None, Some(line)) => {
                        let (with_line, without_line) = if self.line_of(d1).is_some() {
                            (cause1, d2)
                        } else {
                            (cause2, d1)
                        };
                        self.visit(without_line, false);
                        let message = format!(
                            "{conjunction} because {} ({line}), {current}.",
                            self.describe(with_line)
                        );
                        self.emit(derived, message, numbered);
                    }
                    (None, None) => {
                        let single1 = is_single_line(d1);
                        let single2 = is_single_line(d2);
                        if single1 || single2 {
                            let (first, second) = if single2 { (d1, d2) } else { (d2, d1) };
                            self.visit(first, false);
                            self.visit(second, false);
                            self.emit(derived, format!("Thus, {current}."), numbered);
                        } else {
                            self.visit(d1, true);
                            self.lines.push((String::new(), None));
                            self.visit(d2, false);
                            let reference = self
                                .line_of(d1)
                                .map(|l| format!(" ({l})"))
                                .unwrap_or_default();
                            let message = format!(
                                "{conjunction} because {}{reference}, {current}.",
                                self.describe(cause1)
                            );
                            self.emit(derived, message, numbered);
                        }
                    }
                }
            }
            (DerivationTree::Derived(inner), external @ DerivationTree::External(_))
            | (external @ DerivationTree::External(_), DerivationTree::Derived(inner)) => {
                let inner_tree = if matches!(cause1, DerivationTree::Derived(_)) {
                    cause1
                } else {
                    cause2
                };
                if let Some(line) = self.line_of(inner) {
                    let both = self.and_to_string(external, inner_tree, None, Some(line));
                    self.emit(derived, format!("Because {both}, {current}."), numbered);
                } else if let Some((collapsed_derived, collapsed_external)) =
                    self.collapsible(inner)
                {
                    self.visit(collapsed_derived, false);
                    let both = self.and_to_string(collapsed_external, external, None, None);
                    self.emit(
                        derived,
                        format!("{conjunction} because {both}, {current}."),
                        numbered,
                    );
                } else {
                    self.visit(inner, false);
                    let message = format!(
                        "{conjunction} because {}, {current}.",
                        self.describe(external)
                    );
                    self.emit(derived, message, numbered);
                }
            }
            (DerivationTree::External(_), DerivationTree::External(_)) => {
                let both = self.and_to_string(cause1, cause2, None, None);
                self.emit(derived, format!("Because {both}, {current}."), numbered);
            }
        }
    }

    /// A derived incompatibility used once, with one derived and one external cause, whose
    /// derived cause has no line yet, is folded into the line that uses it.
    fn collapsible<'t>(&self, derived: &'t Derived) -> Option<(&'t Derived, &'t DerivationTree)> {
        if derived.shared_id.is_some() {
            return None;
        }
        let (inner, external) = match (&*derived.cause1, &*derived.cause2) {
            (DerivationTree::Derived(inner), external @ DerivationTree::External(_))
            | (external @ DerivationTree::External(_), DerivationTree::Derived(inner)) => {
                (inner, external)
            }
            _ => return None,
        };
        self.line_of(inner).is_none().then_some((inner, external))
    }

    // Rendering ###############################################################

    fn terse(&self, package: &PackageName, term: &Term, allow_every: bool) -> String {
        terse(Some(self.root), package, term, allow_every)
    }

    fn describe(&self, tree: &DerivationTree) -> String {
        match tree {
            DerivationTree::Derived(derived) => self.describe_terms(&derived.terms),
            DerivationTree::External(external) => external.describe(Some(self.root)),
        }
    }

    fn describe_terms(&self, terms: &[(PackageName, Term)]) -> String {
        match terms {
            [] => "version solving failed".into(),
            [(package, Term::Positive(_))] if package == self.root => {
                "version solving failed".into()
            }
            [(package, term)] => {
                let verb = if term.is_positive() {
                    "forbidden"
                } else {
                    "required"
                };
                format!("{} is {verb}", self.terse(package, term, false))
            }
            [(p1, t1), (p2, t2)] if t1.is_positive() == t2.is_positive() => {
                if t1.is_positive() {
                    format!(
                        "{} is incompatible with {}",
                        self.terse(p1, t1, false),
                        self.terse(p2, t2, false)
                    )
                } else {
                    format!(
                        "either {} or {}",
                        self.terse(p1, t1, false),
                        self.terse(p2, t2, false)
                    )
                }
            }
            _ => {
                let positive: Vec<_> = terms
                    .iter()
                    .filter(|(_, t)| t.is_positive())
                    .map(|(p, t)| (p, t))
                    .collect();
                let negative: Vec<_> = terms
                    .iter()
                    .filter(|(_, t)| !t.is_positive())
                    .map(|(p, t)| self.terse(p, t, false))
                    .collect();
                match positive.as_slice() {
                    [] => format!("one of {} must be true", negative.join(" or ")),
                    _ if negative.is_empty() => {
                        let positive: Vec<_> = positive
                            .iter()
                            .map(|(p, t)| self.terse(p, t, false))
                            .collect();
                        format!("one of {} must be false", positive.join(" or "))
                    }
                    [(p, t)] => format!(
                        "{} requires {}",
                        self.terse(p, t, true),
                        negative.join(" or ")
                    ),
                    _ => {
                        let positive: Vec<_> = positive
                            .iter()
                            .map(|(p, t)| self.terse(p, t, false))
                            .collect();
                        format!(
                            "if {} then {}",
                            positive.join(" and "),
                            negative.join(" or ")
                        )
                    }
                }
            }
        }
    }

    /// Describes two incompatibilities that together imply a third one.
    fn and_to_string(
        &self,
        this: &DerivationTree,
        other: &DerivationTree,
        this_line: Option<usize>,
        other_line: Option<usize>,
    ) -> String {
        let this_terms = this.terms();
        let other_terms = other.terms();
        let this_side = Side {
            tree: this,
            terms: &this_terms,
            line: this_line,
        };
        let other_side = Side {
            tree: other,
            terms: &other_terms,
            line: other_line,
        };
        if let Some(text) = self.requires_both(&this_side, &other_side) {
            return text;
        }
        if let Some(text) = self.requires_through(&this_side, &other_side) {
            return text;
        }
        if let Some(text) = self.requires_forbidden(&this_side, &other_side) {
            return text;
        }
        format!(
            "{}{} and {}{}",
            self.describe(this),
            reference(this_line),
            self.describe(other),
            reference(other_line)
        )
    }

    /// `foo depends on both bar 1.0.0 and baz 1.0.0`
    fn requires_both(&self, this: &Side, other: &Side) -> Option<String> {
        if this.terms.len() == 1 || other.terms.len() == 1 {
            return None;
        }
        let (this_package, this_positive) = this.single(true)?;
        let (other_package, other_positive) = other.single(true)?;
        if this_package != other_package || this_positive != other_positive {
            return None;
        }
        let verb = if this.is_dependency() && other.is_dependency() {
            "depends on"
        } else {
            "requires"
        };
        Some(format!(
            "{} {verb} both {}{} and {}{}",
            self.terse(this_package, this_positive, true),
            self.negatives(this),
            reference(this.line),
            self.negatives(other),
            reference(other.line)
        ))
    }

    /// `foo depends on bar 1.0.0 which depends on baz 2.0.0`
    fn requires_through(&self, this: &Side, other: &Side) -> Option<String> {
        if this.terms.len() == 1 || other.terms.len() == 1 {
            return None;
        }
        let this_negative = this.single(false);
        let other_negative = other.single(false);
        let this_positive = this.single(true);
        let other_positive = other.single(true);

        let implies = |negative: Option<(&PackageName, &Term)>,
                       positive: Option<(&PackageName, &Term)>| {
            match (negative, positive) {
                (Some((p1, t1)), Some((p2, t2))) => p1 == p2 && t1.negate().subset_of(t2),
                _ => false,
            }
        };
        let (prior, prior_negative, latter) = if implies(this_negative, other_positive) {
            (this, this_negative?, other)
        } else if implies(other_negative, this_positive) {
            (other, other_negative?, this)
        } else {
            return None;
        };

        let prior_positives = prior.positives();
        let mut buffer = match prior_positives.as_slice() {
            [] => return None,
            [(package, term)] => format!(
                "{} {} ",
                self.terse(package, term, true),
                prior.verb()
            ),
            many => format!(
                "if {} then ",
                many.iter()
                    .map(|(p, t)| self.terse(p, t, false))
                    .collect::<Vec<_>>()
                    .join(" or ")
            ),
        };
        buffer.push_str(&self.terse(prior_negative.0, prior_negative.1, false));
        buffer.push_str(&reference(prior.line));
        buffer.push_str(" which ");
        buffer.push_str(latter.verb());
        buffer.push(' ');
        buffer.push_str(&self.negatives(latter));
        buffer.push_str(&reference(latter.line));
        Some(buffer)
    }

    /// `foo depends on bar 2.0.0 which doesn't match any versions`
    fn requires_forbidden(&self, this: &Side, other: &Side) -> Option<String> {
        if this.terms.len() != 1 && other.terms.len() != 1 {
            return None;
        }
        let (prior, latter) = if this.terms.len() == 1 {
            (other, this)
        } else {
            (this, other)
        };
        let (negative_package, negative) = prior.single(false)?;
        let (latter_package, latter_term) = latter.terms.first().map(|(p, t)| (p, t))?;
        if negative_package != latter_package || !negative.negate().subset_of(latter_term) {
            return None;
        }

        let mut buffer = match prior.positives().as_slice() {
            [] => return None,
            [(package, term)] => format!(
                "{} {} ",
                self.terse(package, term, true),
                prior.verb()
            ),
            many => format!(
                "if {} then ",
                many.iter()
                    .map(|(p, t)| self.terse(p, t, false))
                    .collect::<Vec<_>>()
                    .join(" or ")
            ),
        };
        buffer.push_str(&self.terse(latter_package, latter_term, false));
        buffer.push(' ');
        if let Some(line) = prior.line {
            buffer.push_str(&format!("({line}) "));
        }
        match latter.tree {
            DerivationTree::External(External::Environment(_, _, marker)) => {
                buffer.push_str(&format!("which requires {marker}"))
            }
            DerivationTree::External(External::NoVersions(..)) => {
                buffer.push_str("which doesn't match any versions")
            }
            DerivationTree::External(External::NotFound(_)) => {
                buffer.push_str("which doesn't exist")
            }
            _ => buffer.push_str("which is forbidden"),
        }
        buffer.push_str(&reference(latter.line));
        Some(buffer)
    }

    fn negatives(&self, side: &Side) -> String {
        side.terms
            .iter()
            .filter(|(_, t)| !t.is_positive())
            .map(|(p, t)| self.terse(p, t, false))
            .collect::<Vec<_>>()
            .join(" or ")
    }
}

/// One of the two incompatibilities being combined into a sentence.
struct Side<'t> {
    tree: &'t DerivationTree,
    terms: &'t [(PackageName, Term)],
    line: Option<usize>,
}

impl<'t> Side<'t> {
    /// The only term of that polarity, if there is exactly one.
    fn single(&self, positive: bool) -> Option<(&'t PackageName, &'t Term)> {
        let mut matching = self
            .terms
            .iter()
            .filter(|(_, t)| t.is_positive() == positive);
        match (matching.next(), matching.next()) {
            (Some((p, t)), None) => Some((p, t)),
            _ => None,
        }
    }

    fn positives(&self) -> Vec<(&'t PackageName, &'t Term)> {
        self.terms
            .iter()
            .filter(|(_, t)| t.is_positive())
            .map(|(p, t)| (p, t))
            .collect()
    }

    fn is_dependency(&self) -> bool {
        matches!(
            self.tree,
            DerivationTree::External(External::FromDependencyOf(..))
        )
    }

    fn verb(&self) -> &'static str {
        if self.is_dependency() {
            "depends on"
        } else {
            "requires"
        }
    }
}

fn is_single_line(derived: &Derived) -> bool {
    matches!(
        (&*derived.cause1, &*derived.cause2),
        (DerivationTree::External(_), DerivationTree::External(_))
    )
}

fn reference(line: Option<usize>) -> String {
    line.map(|l| format!(" ({l})")).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(major: u64) -> Version {
        Version::new(major, 0, 0)
    }

    fn name(n: &str) -> PackageName {
        PackageName::new(n)
    }

    fn dependency(p: &str, versions: Range, d: &str, range: Range) -> Arc<DerivationTree> {
        Arc::new(DerivationTree::External(External::FromDependencyOf(
            name(p),
            versions,
            name(d),
            range,
        )))
    }

    fn derived(
        terms: Vec<(PackageName, Term)>,
        cause1: Arc<DerivationTree>,
        cause2: Arc<DerivationTree>,
    ) -> Arc<DerivationTree> {
        Arc::new(DerivationTree::Derived(Derived {
            terms,
            shared_id: None,
            cause1,
            cause2,
        }))
    }

    fn forbidden(package: &str, range: Range) -> Vec<(PackageName, Term)> {
        vec![(name(package), Term::Positive(range))]
    }

    /// foo depends on bar, which doesn't exist.
    fn foo_is_forbidden(shared_id: Option<usize>) -> Arc<DerivationTree> {
        Arc::new(DerivationTree::Derived(Derived {
            terms: forbidden("foo", Range::full()),
            shared_id,
            cause1: Arc::new(DerivationTree::External(External::NotFound(name("bar")))),
            cause2: dependency("foo", Range::full(), "bar", Range::full()),
        }))
    }

    #[test]
    fn external_failure_is_one_line() {
        let tree = DerivationTree::External(External::NotFound(name("foo")));
        let explanation = Explanation::new(&tree, &name("root"));
        assert_eq!(
            explanation.lines(),
            ["Because foo doesn't exist, version solving failed."]
        );
        assert_eq!(explanation.hints().len(), 1);
        assert_eq!(explanation.hints()[0].title, "Check the package name.");
    }

    #[test]
    fn dependency_on_missing_package() {
        // root depends on foo, foo doesn't exist.
        let root = name("root");
        let tree = derived(
            vec![(root.clone(), Term::exact(v(1)))],
            Arc::new(DerivationTree::External(External::NotFound(name("foo")))),
            dependency("root", Range::singleton(v(1)), "foo", Range::full()),
        );
        let explanation = Explanation::new(&tree, &root);
        assert_eq!(
            explanation.lines(),
            ["Because root depends on foo which doesn't exist, version solving failed."]
        );
    }

    #[test]
    fn chain_through_a_dependency() {
        // root depends on foo >=1, foo depends on bar 2, bar 2 doesn't exist.
        let root = name("root");
        let foo_range = Range::higher_than(v(1));
        let foo_bar = dependency("foo", Range::full(), "bar", Range::singleton(v(2)));
        let no_bar = Arc::new(DerivationTree::External(External::NoVersions(
            name("bar"),
            Range::singleton(v(2)),
        )));
        let foo_forbidden = derived(
            vec![(name("foo"), Term::Positive(Range::full()))],
            no_bar,
            foo_bar,
        );
        let tree = derived(
            vec![(root.clone(), Term::exact(v(1)))],
            foo_forbidden,
            dependency("root", Range::singleton(v(1)), "foo", foo_range),
        );
        let explanation = Explanation::new(&tree, &root);
        assert_eq!(
            explanation.lines(),
            [
                "Because every version of foo depends on bar 2.0.0 which doesn't match any versions, foo is forbidden.",
                "So, because root depends on foo >=1.0.0, version solving failed.",
            ]
        );
    }

    #[test]
    fn shared_derivations_are_numbered() {
        // qux 1 depends on baz, qux 2 and baz depend on foo, which can't be selected.
        let root = name("root");
        let foo = foo_is_forbidden(Some(0));
        let baz = derived(
            forbidden("baz", Range::full()),
            foo.clone(),
            dependency("baz", Range::full(), "foo", Range::full()),
        );
        let qux1 = derived(
            forbidden("qux", Range::singleton(v(1))),
            baz,
            dependency("qux", Range::singleton(v(1)), "baz", Range::full()),
        );
        let qux2 = derived(
            forbidden("qux", Range::singleton(v(2))),
            foo,
            dependency("qux", Range::singleton(v(2)), "foo", Range::full()),
        );
        let qux = derived(forbidden("qux", Range::full()), qux1, qux2);
        let tree = derived(
            vec![(root.clone(), Term::exact(v(1)))],
            qux,
            dependency("root", Range::singleton(v(1)), "qux", Range::full()),
        );

        let explanation = Explanation::new(&tree, &root);
        assert_eq!(
            explanation.lines(),
            [
                "(1) Because every version of foo depends on bar which doesn't exist, foo is forbidden.",
                "(2) So, because qux 1.0.0 depends on baz which depends on foo, qux 1.0.0 is forbidden.",
                "",
                "    Because qux 2.0.0 depends on foo which is forbidden (1), qux 2.0.0 is forbidden.",
                "    And because qux 1.0.0 is forbidden (2), qux is forbidden.",
                "    So, because root depends on qux, version solving failed.",
            ]
        );
    }

    #[test]
    fn repeated_lines_are_written_once() {
        let root = name("root");
        let tree = derived(
            vec![(root.clone(), Term::exact(v(1)))],
            foo_is_forbidden(None),
            foo_is_forbidden(None),
        );
        let explanation = Explanation::new(&tree, &root);
        assert_eq!(
            explanation.lines(),
            [
                "Because every version of foo depends on bar which doesn't exist, foo is forbidden.",
                "Thus, version solving failed.",
            ]
        );
    }

    #[test]
    fn external_display_matches_the_explanation() {
        let no_versions = External::NoVersions(name("foo"), Range::singleton(v(2)));
        assert_eq!(no_versions.to_string(), "no versions of foo match 2.0.0");
        let dependency =
            External::FromDependencyOf(name("foo"), Range::full(), name("bar"), Range::higher_than(v(2)));
        assert_eq!(
            dependency.to_string(),
            "every version of foo depends on bar >=2.0.0"
        );
        assert_eq!(
            External::NotRoot(name("root"), v(1)).to_string(),
            "root is 1.0.0"
        );

        let tree = DerivationTree::External(no_versions);
        let explanation = Explanation::new(&tree, &name("root"));
        assert_eq!(
            explanation.lines(),
            ["Because no versions of foo match 2.0.0, version solving failed."]
        );
    }

    #[test]
    fn interpreter_hint() {
        let marker = Marker::Interpreter(Range::higher_than(Version::new(3, 8, 0)));
        let tree = DerivationTree::External(External::Environment(name("foo"), v(1), marker));
        let explanation = Explanation::new(&tree, &name("root"));
        assert_eq!(
            explanation.lines(),
            ["Because foo 1.0.0 requires interpreter >=3.8.0, version solving failed."]
        );
        let hint = &explanation.hints()[0];
        assert_eq!(hint.links.len(), 2);
        assert!(hint.description.contains("foo 1.0.0"));
    }
}
