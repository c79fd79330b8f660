// SPDX-License-Identifier: MPL-2.0

//! The single human-readable explanation produced when a resolve fails (§4.G, §7).
//!
//! A [`Diagnostic`] selects exactly one primary cause, in priority order, and renders it through
//! `Display`. It is the only user-visible explanation a failed [`crate::error::ResolveError`]
//! carries — no stack traces, no internal state dumps.

use std::fmt;

use crate::identity::{LibraryRange, NormalizedName};
use version_ranges::Version;

/// The one cause a [`Diagnostic`] settled on, in the priority order of §4.G.
#[derive(Debug, Clone)]
pub enum Cause {
    /// A new target's requested range is incompatible with some other chosen/required package.
    TargetIncompatible {
        /// The target's name.
        target: NormalizedName,
        /// The range the target requested.
        requested: LibraryRange,
        /// The conflicting requirement, and who asked for it.
        conflicting_with: NormalizedName,
        conflicting_range: LibraryRange,
    },
    /// A new target has a dependency with no candidate at all.
    TargetMissingDependency {
        target: NormalizedName,
        missing: NormalizedName,
    },
    /// An already-installed package's dependency went unsatisfied after an upgrade.
    InstalledPackageUnsatisfied {
        package: NormalizedName,
        dependency: NormalizedName,
        required_range: LibraryRange,
    },
    /// A transitive dependency (of a required id) has no candidate, ranked by BFS distance.
    TransitiveMissingDependency {
        parent: NormalizedName,
        missing: NormalizedName,
        distance: usize,
    },
}

/// An additional "packages.config allowed versions" note for an id with an extra installed pin,
/// appended to the primary cause (§4.G "Augment with").
#[derive(Debug, Clone)]
pub struct AllowedVersionsNote {
    pub name: NormalizedName,
    pub allowed: LibraryRange,
    pub pinned: Option<Version>,
}

/// The complete, ready-to-display diagnostic: one primary cause plus zero or more allowed-version
/// notes.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    cause: Cause,
    notes: Vec<AllowedVersionsNote>,
}

impl Diagnostic {
    /// Wraps a primary cause with no notes.
    pub fn new(cause: Cause) -> Self {
        Self {
            cause,
            notes: Vec::new(),
        }
    }

    /// Appends an allowed-versions note.
    pub fn with_note(mut self, note: AllowedVersionsNote) -> Self {
        self.notes.push(note);
        self
    }

    /// The selected primary cause.
    pub fn cause(&self) -> &Cause {
        &self.cause
    }

    /// Picks the highest-priority cause out of several candidates, per §4.G's four-rule order:
    /// target-incompatible, target-missing-dependency, installed-unsatisfied,
    /// transitive-missing-dependency (the last ordered by ascending BFS distance, then by name).
    pub fn select(mut candidates: Vec<Cause>) -> Option<Cause> {
        let rank = |c: &Cause| -> (u8, usize, &str) {
            match c {
                Cause::TargetIncompatible { target, .. } => (0, 0, target.as_str()),
                Cause::TargetMissingDependency { target, .. } => (1, 0, target.as_str()),
                Cause::InstalledPackageUnsatisfied { package, .. } => (2, 0, package.as_str()),
                Cause::TransitiveMissingDependency { missing, distance, .. } => {
                    (3, *distance, missing.as_str())
                }
            }
        };
        candidates.sort_by(|a, b| rank(a).cmp(&rank(b)));
        candidates.into_iter().next()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cause {
            Cause::TargetIncompatible {
                target,
                requested,
                conflicting_with,
                conflicting_range,
            } => write!(
                f,
                "{target} requested {requested} conflicts with {conflicting_with}'s requirement {conflicting_range}"
            )?,
            Cause::TargetMissingDependency { target, missing } => {
                write!(f, "{target} depends on {missing}, which has no available version")?
            }
            Cause::InstalledPackageUnsatisfied {
                package,
                dependency,
                required_range,
            } => write!(
                f,
                "{package}'s dependency on {dependency} is no longer satisfied (requires {required_range})"
            )?,
            Cause::TransitiveMissingDependency {
                parent,
                missing,
                distance,
            } => write!(
                f,
                "{parent} transitively depends on {missing} (distance {distance}), which has no available version"
            )?,
        }
        for note in &self.notes {
            write!(f, "\n  {} is constrained to {} by packages.config", note.name, note.allowed)?;
            if let Some(pinned) = &note.pinned {
                write!(f, " (pinned at {pinned})")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use version_ranges::VersionRange;

    fn range(name: &str, r: &str) -> LibraryRange {
        LibraryRange::new(name, VersionRange::parse(r).unwrap())
    }

    #[test]
    fn target_incompatible_outranks_everything_else() {
        let candidates = vec![
            Cause::TransitiveMissingDependency {
                parent: "A".into(),
                missing: "Z".into(),
                distance: 1,
            },
            Cause::TargetIncompatible {
                target: "T".into(),
                requested: range("T", "1.0.0"),
                conflicting_with: "Other".into(),
                conflicting_range: range("T", "[2.0.0, )"),
            },
        ];
        let selected = Diagnostic::select(candidates).unwrap();
        assert!(matches!(selected, Cause::TargetIncompatible { .. }));
    }

    #[test]
    fn transitive_missing_deps_order_by_distance_then_name() {
        let candidates = vec![
            Cause::TransitiveMissingDependency {
                parent: "A".into(),
                missing: "Z".into(),
                distance: 3,
            },
            Cause::TransitiveMissingDependency {
                parent: "B".into(),
                missing: "Y".into(),
                distance: 1,
            },
        ];
        let selected = Diagnostic::select(candidates).unwrap();
        match selected {
            Cause::TransitiveMissingDependency { missing, .. } => assert_eq!(missing.as_str(), "Y"),
            _ => panic!("wrong cause selected"),
        }
    }

    #[test]
    fn display_renders_note_with_pin() {
        let diag = Diagnostic::new(Cause::TargetMissingDependency {
            target: "T".into(),
            missing: "Q".into(),
        })
        .with_note(AllowedVersionsNote {
            name: "Q".into(),
            allowed: range("Q", "[1.0.0, 2.0.0)"),
            pinned: Some("1.0.0".parse().unwrap()),
        });
        let rendered = diag.to_string();
        assert!(rendered.contains("T depends on Q"));
        assert!(rendered.contains("pinned at 1.0.0.0"));
    }
}
