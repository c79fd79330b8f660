// SPDX-License-Identifier: MPL-2.0

//! Interval version ranges: `satisfies`, `combine`, `pretty-print`, parsing.

use std::cmp::Ordering;
use std::fmt::{self, Display};

use thiserror::Error;

use crate::version::{Version, VersionParseError};

#[cfg(any(feature = "proptest", test))]
use crate::version::version_strategy;

/// One endpoint of a [`VersionRange`] interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bound {
    /// No constraint on this side.
    Unbounded,
    /// The endpoint version itself satisfies the range.
    Inclusive(Version),
    /// The endpoint version itself does not satisfy the range.
    Exclusive(Version),
}

impl Bound {
    fn version(&self) -> Option<&Version> {
        match self {
            Self::Unbounded => None,
            Self::Inclusive(v) | Self::Exclusive(v) => Some(v),
        }
    }
}

/// Error returned when a range string cannot be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RangeParseError {
    /// A version component inside the range failed to parse.
    #[error(transparent)]
    Version(#[from] VersionParseError),
    /// The bracket/parenthesis syntax was malformed.
    #[error("malformed version range {input:?}: {reason}")]
    Malformed {
        /// What looked wrong.
        reason: String,
        /// The full input that failed to parse.
        input: String,
    },
}

/// An interval over [`Version`]s, with inclusive or exclusive endpoints and an optional
/// "allow prerelease" float behavior.
///
/// Two textual forms are accepted by [`VersionRange::parse`]:
/// - a bare version `1.2.3`, meaning "`1.2.3` or anything higher" (an implicit minimum),
/// - bracket notation `[1.2.3, 2.0.0)`, `[1.0.0]`, `(, 2.0.0]`, `[1.0.0, )`, mixing `[`/`]`
///   (inclusive) and `(`/`)` (exclusive), with either side left blank for unbounded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    min: Bound,
    max: Bound,
    allow_prerelease: bool,
    original: Option<String>,
}

impl VersionRange {
    /// The range containing every version (including prereleases).
    pub fn any() -> Self {
        Self {
            min: Bound::Unbounded,
            max: Bound::Unbounded,
            allow_prerelease: true,
            original: None,
        }
    }

    /// The range containing exactly one version.
    pub fn exact(v: Version) -> Self {
        Self {
            allow_prerelease: v.is_prerelease(),
            min: Bound::Inclusive(v.clone()),
            max: Bound::Inclusive(v),
            original: None,
        }
    }

    /// `v <= versions`, unbounded above.
    pub fn at_least(v: Version) -> Self {
        Self {
            allow_prerelease: v.is_prerelease(),
            min: Bound::Inclusive(v),
            max: Bound::Unbounded,
            original: None,
        }
    }

    /// Builds a range from explicit bounds.
    pub fn from_bounds(min: Bound, max: Bound) -> Self {
        let allow_prerelease = min.version().is_some_and(Version::is_prerelease)
            || max.version().is_some_and(Version::is_prerelease);
        Self {
            min,
            max,
            allow_prerelease,
            original: None,
        }
    }

    /// Parses NuGet-style interval notation (see the type-level docs for the accepted forms).
    pub fn parse(s: &str) -> Result<Self, RangeParseError> {
        let trimmed = s.trim();
        let mut range = if let Some(inner) = trimmed
            .strip_prefix(['[', '('])
            .and_then(|rest| rest.strip_suffix([']', ')']))
        {
            let min_inclusive = trimmed.starts_with('[');
            let max_inclusive = trimmed.ends_with(']');
            let mut parts = inner.splitn(2, ',');
            let min_str = parts.next().unwrap_or("").trim();
            let max_str = parts.next();
            let min = if min_str.is_empty() {
                Bound::Unbounded
            } else {
                let v: Version = min_str.parse()?;
                if min_inclusive {
                    Bound::Inclusive(v)
                } else {
                    Bound::Exclusive(v)
                }
            };
            let max = match max_str {
                None => {
                    // `[1.0.0]` with no comma: exact match.
                    return Ok(Self {
                        allow_prerelease: min.version().is_some_and(Version::is_prerelease),
                        max: min.clone(),
                        min,
                        original: Some(s.to_string()),
                    });
                }
                Some(max_str) => {
                    let max_str = max_str.trim();
                    if max_str.is_empty() {
                        Bound::Unbounded
                    } else {
                        let v: Version = max_str.parse()?;
                        if max_inclusive {
                            Bound::Inclusive(v)
                        } else {
                            Bound::Exclusive(v)
                        }
                    }
                }
            };
            Self::from_bounds(min, max)
        } else {
            // Bare version: implicit minimum, unbounded above.
            let v: Version = trimmed.parse()?;
            Self::at_least(v)
        };
        if let (Some(min), Some(max)) = (range.min.version(), range.max.version()) {
            if min > max {
                return Err(RangeParseError::Malformed {
                    reason: "lower bound is greater than upper bound".to_string(),
                    input: s.to_string(),
                });
            }
        }
        range.original = Some(s.to_string());
        Ok(range)
    }

    /// Whether `v` lies within this range, honoring the prerelease float behavior: a prerelease
    /// version only satisfies the range if the range's own minimum bound is a prerelease of the
    /// same release, or the range explicitly allows prereleases.
    pub fn satisfies(&self, v: &Version) -> bool {
        if v.is_prerelease() && !self.allow_prerelease {
            let floor_allows = match &self.min {
                Bound::Inclusive(b) | Bound::Exclusive(b) => b.is_prerelease() && b.release_eq(v),
                Bound::Unbounded => false,
            };
            if !floor_allows {
                return false;
            }
        }
        let above_min = match &self.min {
            Bound::Unbounded => true,
            Bound::Inclusive(b) => v >= b,
            Bound::Exclusive(b) => v > b,
        };
        let below_max = match &self.max {
            Bound::Unbounded => true,
            Bound::Inclusive(b) => v <= b,
            Bound::Exclusive(b) => v < b,
        };
        above_min && below_max
    }

    /// The range's lower bound, if any.
    pub fn min_version(&self) -> Option<&Version> {
        self.min.version()
    }

    /// `true` if this range is a single exact version (`[v]` or a pinned dependency).
    pub fn is_exact(&self) -> Option<&Version> {
        match (&self.min, &self.max) {
            (Bound::Inclusive(a), Bound::Inclusive(b)) if a == b => Some(a),
            _ => None,
        }
    }

    /// The original textual form, if this range was produced by [`VersionRange::parse`].
    pub fn original_string(&self) -> Option<&str> {
        self.original.as_deref()
    }

    /// The smallest range containing the union of `ranges`: `combine` takes the lowest minimum
    /// and the highest maximum, favoring the inclusive side on ties. Empty input returns
    /// [`VersionRange::any`]. Associative and idempotent.
    pub fn combine<'a>(ranges: impl IntoIterator<Item = &'a VersionRange>) -> VersionRange {
        let mut iter = ranges.into_iter();
        let Some(first) = iter.next() else {
            return VersionRange::any();
        };
        let mut min = first.min.clone();
        let mut max = first.max.clone();
        let mut allow_prerelease = first.allow_prerelease;
        for r in iter {
            min = wider_min(min, r.min.clone());
            max = wider_max(max, r.max.clone());
            allow_prerelease |= r.allow_prerelease;
        }
        VersionRange {
            min,
            max,
            allow_prerelease,
            original: None,
        }
    }

    /// A human-readable rendering using bracket notation, independent of the original string.
    pub fn pretty_print(&self) -> String {
        if let Some(v) = self.is_exact() {
            return format!("[{v}]");
        }
        let open = match &self.min {
            Bound::Inclusive(_) | Bound::Unbounded => '[',
            Bound::Exclusive(_) => '(',
        };
        let close = match &self.max {
            Bound::Inclusive(_) | Bound::Unbounded => ']',
            Bound::Exclusive(_) => ')',
        };
        let min_str = self.min.version().map_or(String::new(), Version::to_string);
        let max_str = self.max.version().map_or(String::new(), Version::to_string);
        format!("{open}{min_str}, {max_str}{close}")
    }
}

/// The wider (smaller) of two minimum bounds.
fn wider_min(a: Bound, b: Bound) -> Bound {
    match (&a, &b) {
        (Bound::Unbounded, _) | (_, Bound::Unbounded) => Bound::Unbounded,
        _ => {
            let (av, bv) = (a.version().unwrap(), b.version().unwrap());
            match av.cmp(bv) {
                Ordering::Less => a,
                Ordering::Greater => b,
                Ordering::Equal => {
                    // Inclusive is wider than exclusive at the same value.
                    if matches!(a, Bound::Inclusive(_)) {
                        a
                    } else {
                        b
                    }
                }
            }
        }
    }
}

/// The wider (larger) of two maximum bounds.
fn wider_max(a: Bound, b: Bound) -> Bound {
    match (&a, &b) {
        (Bound::Unbounded, _) | (_, Bound::Unbounded) => Bound::Unbounded,
        _ => {
            let (av, bv) = (a.version().unwrap(), b.version().unwrap());
            match av.cmp(bv) {
                Ordering::Greater => a,
                Ordering::Less => b,
                Ordering::Equal => {
                    if matches!(a, Bound::Inclusive(_)) {
                        a
                    } else {
                        b
                    }
                }
            }
        }
    }
}

/// Picks the best of `candidates` satisfying `range`.
///
/// When `range` has a lower bound, the *lowest* satisfying version wins (`MinVersion`
/// preference); when it is unbounded below, the *highest* satisfying version wins
/// (`HighestFloor` preference). Ties between candidates of equal version are broken by
/// keeping whichever was encountered first in `candidates`' iteration order.
pub fn best_match<'a, T>(
    candidates: impl IntoIterator<Item = &'a T>,
    range: &VersionRange,
    version_of: impl Fn(&T) -> &Version,
) -> Option<&'a T> {
    let prefer_min = !matches!(range.min, Bound::Unbounded);
    let mut best: Option<&'a T> = None;
    for candidate in candidates {
        let v = version_of(candidate);
        if !range.satisfies(v) {
            continue;
        }
        best = match best {
            None => Some(candidate),
            Some(current) => {
                let better = if prefer_min {
                    v < version_of(current)
                } else {
                    v > version_of(current)
                };
                if better {
                    Some(candidate)
                } else {
                    Some(current)
                }
            }
        };
    }
    best
}

impl Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pretty_print())
    }
}

/// Generates small, mostly-bounded ranges for property tests of `combine` and `satisfies`.
#[cfg(any(feature = "proptest", test))]
pub fn range_strategy() -> impl proptest::strategy::Strategy<Value = VersionRange> {
    use proptest::prelude::*;
    (
        prop::option::of(version_strategy()),
        prop::option::of(version_strategy()),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(min_v, max_v, min_inclusive, max_inclusive)| {
            let (min_v, max_v) = match (min_v, max_v) {
                (Some(a), Some(b)) if a > b => (b, a),
                other => other,
            };
            let min = match min_v {
                None => Bound::Unbounded,
                Some(v) if min_inclusive => Bound::Inclusive(v),
                Some(v) => Bound::Exclusive(v),
            };
            let max = match max_v {
                None => Bound::Unbounded,
                Some(v) if max_inclusive => Bound::Inclusive(v),
                Some(v) => Bound::Exclusive(v),
            };
            VersionRange::from_bounds(min, max)
        })
}
