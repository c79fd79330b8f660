// SPDX-License-Identifier: MPL-2.0

//! Four-part semantic versions with an optional prerelease label.

use std::cmp::Ordering;
use std::fmt::{self, Display};
use std::str::FromStr;

use thiserror::Error;

/// A single dot-separated segment of a prerelease label.
///
/// Per semver precedence rules, numeric segments compare numerically and always sort before
/// alphanumeric segments at the same position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum PrereleaseSegment {
    Numeric(u64),
    Alphanumeric(String),
}

impl PrereleaseSegment {
    fn parse(s: &str) -> Self {
        match s.parse::<u64>() {
            Ok(n) if !s.starts_with('0') || s == "0" => Self::Numeric(n),
            _ => Self::Alphanumeric(s.to_string()),
        }
    }
}

impl Display for PrereleaseSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{n}"),
            Self::Alphanumeric(s) => write!(f, "{s}"),
        }
    }
}

impl PartialOrd for PrereleaseSegment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PrereleaseSegment {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Numeric(a), Self::Numeric(b)) => a.cmp(b),
            (Self::Alphanumeric(a), Self::Alphanumeric(b)) => a.cmp(b),
            (Self::Numeric(_), Self::Alphanumeric(_)) => Ordering::Less,
            (Self::Alphanumeric(_), Self::Numeric(_)) => Ordering::Greater,
        }
    }
}

/// Error returned when a version string cannot be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VersionParseError {
    /// One of the numeric components was missing, empty, or not a valid `u32`.
    #[error("invalid numeric component {component:?} in version {input:?}")]
    InvalidComponent {
        /// The offending substring.
        component: String,
        /// The full input that failed to parse.
        input: String,
    },
    /// The string had no numeric components at all.
    #[error("empty version string")]
    Empty,
}

/// A four-part semantic version: `major.minor.patch.revision`, with an optional prerelease
/// label such as `-beta.2`.
///
/// Ordering follows semver precedence rules extended with the revision component: numeric
/// components compare first in order, then prerelease labels compare segment-by-segment, and a
/// version with no prerelease label always outranks one with the same numeric components and a
/// prerelease label.
#[derive(Debug, Clone, Eq)]
pub struct Version {
    major: u32,
    minor: u32,
    patch: u32,
    revision: u32,
    prerelease: Vec<PrereleaseSegment>,
}

impl Version {
    /// Builds a version with no prerelease label.
    pub fn new(major: u32, minor: u32, patch: u32, revision: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            revision,
            prerelease: Vec::new(),
        }
    }

    /// Builds a version with a prerelease label, e.g. `rc.1`.
    pub fn with_prerelease(
        major: u32,
        minor: u32,
        patch: u32,
        revision: u32,
        prerelease: &str,
    ) -> Self {
        Self {
            major,
            minor,
            patch,
            revision,
            prerelease: prerelease
                .split('.')
                .filter(|s| !s.is_empty())
                .map(PrereleaseSegment::parse)
                .collect(),
        }
    }

    /// The sentinel "any" version, `0.0.0.0`. Used as a floor when no lower bound is given.
    pub fn zero() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// The major component.
    pub fn major(&self) -> u32 {
        self.major
    }

    /// The minor component.
    pub fn minor(&self) -> u32 {
        self.minor
    }

    /// The patch component.
    pub fn patch(&self) -> u32 {
        self.patch
    }

    /// The revision component.
    pub fn revision(&self) -> u32 {
        self.revision
    }

    /// `true` if this version is a sentinel "any" version.
    pub fn is_zero(&self) -> bool {
        self.major == 0 && self.minor == 0 && self.patch == 0 && self.revision == 0
    }

    /// `true` if this version carries a prerelease label.
    pub fn is_prerelease(&self) -> bool {
        !self.prerelease.is_empty()
    }

    /// Whether `self` and `other` share the same `major.minor.patch.revision`, ignoring any
    /// prerelease label difference.
    pub fn release_eq(&self, other: &Self) -> bool {
        (self.major, self.minor, self.patch, self.revision)
            == (other.major, other.minor, other.patch, other.revision)
    }

    /// The version with the prerelease label stripped.
    pub fn release(&self) -> Self {
        Self::new(self.major, self.minor, self.patch, self.revision)
    }

    /// Bumps the revision by one, keeping other components and dropping any prerelease label.
    pub fn bump(&self) -> Self {
        Self::new(self.major, self.minor, self.patch, self.revision + 1)
    }
}

impl FromStr for Version {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(VersionParseError::Empty);
        }
        let (release, prerelease) = match s.split_once('-') {
            Some((r, p)) => (r, Some(p)),
            None => (s, None),
        };
        let mut parts = release.split('.');
        let mut next = |label: &str| -> Result<u32, VersionParseError> {
            let part = parts.next().unwrap_or("0");
            part.parse::<u32>()
                .map_err(|_| VersionParseError::InvalidComponent {
                    component: format!("{label}={part}"),
                    input: s.to_string(),
                })
        };
        let major = next("major")?;
        let minor = next("minor")?;
        let patch = next("patch")?;
        let revision = next("revision")?;
        if parts.next().is_some() {
            return Err(VersionParseError::InvalidComponent {
                component: release.to_string(),
                input: s.to_string(),
            });
        }
        Ok(match prerelease {
            Some(p) => Self::with_prerelease(major, minor, patch, revision, p),
            None => Self::new(major, minor, patch, revision),
        })
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}.{}", self.major, self.minor, self.patch, self.revision)?;
        if !self.prerelease.is_empty() {
            write!(f, "-")?;
            for (i, seg) in self.prerelease.iter().enumerate() {
                if i > 0 {
                    write!(f, ".")?;
                }
                write!(f, "{seg}")?;
            }
        }
        Ok(())
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch, self.revision)
            .cmp(&(other.major, other.minor, other.patch, other.revision))
            .then_with(|| match (self.prerelease.is_empty(), other.prerelease.is_empty()) {
                (true, true) => Ordering::Equal,
                // No prerelease outranks any prerelease of the same release.
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => self.prerelease.cmp(&other.prerelease),
            })
    }
}

impl std::hash::Hash for Version {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.major.hash(state);
        self.minor.hash(state);
        self.patch.hash(state);
        self.revision.hash(state);
        self.prerelease.hash(state);
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Version {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Version {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Generates small versions with an occasional numeric or alphanumeric prerelease label, for
/// property tests of range combination and ordering.
#[cfg(any(feature = "proptest", test))]
pub fn version_strategy() -> impl proptest::strategy::Strategy<Value = Version> {
    use proptest::prelude::*;
    (
        0u32..5,
        0u32..5,
        0u32..5,
        0u32..5,
        prop::option::of(prop_oneof![
            (0u64..3).prop_map(|n| n.to_string()),
            "[a-z]{1,4}".prop_map(|s| s),
        ]),
    )
        .prop_map(|(major, minor, patch, revision, prerelease)| match prerelease {
            Some(p) => Version::with_prerelease(major, minor, patch, revision, &p),
            None => Version::new(major, minor, patch, revision),
        })
}
