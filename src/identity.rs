// SPDX-License-Identifier: MPL-2.0

//! Package identities, requested ranges, and dependency edges.
//!
//! Names are compared case-insensitively everywhere: every map and set keyed by a library name
//! stores a [`NormalizedName`] rather than a raw `String`, so `"Newtonsoft.Json"` and
//! `"newtonsoft.json"` are always the same key.

use std::fmt;
use std::hash::{Hash, Hasher};

use version_ranges::{Version, VersionRange};

/// A library name, compared and hashed case-insensitively while preserving the original casing
/// for display.
#[derive(Debug, Clone, Eq)]
pub struct NormalizedName {
    display: String,
    lower: String,
}

impl NormalizedName {
    /// Wraps a raw name, pre-computing the lowercase comparison key.
    pub fn new(name: impl Into<String>) -> Self {
        let display = name.into();
        let lower = display.to_lowercase();
        Self { display, lower }
    }

    /// The name as originally supplied.
    pub fn as_str(&self) -> &str {
        &self.display
    }
}

impl PartialEq for NormalizedName {
    fn eq(&self, other: &Self) -> bool {
        self.lower == other.lower
    }
}

impl Hash for NormalizedName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.lower.hash(state);
    }
}

impl Ord for NormalizedName {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.lower.cmp(&other.lower)
    }
}

impl PartialOrd for NormalizedName {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for NormalizedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display)
    }
}

impl From<&str> for NormalizedName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for NormalizedName {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// What kind of thing a [`LibraryIdentity`]/[`LibraryRange`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LibraryKind {
    /// An ordinary versioned package from a provider.
    Package,
    /// A project within the same solution/workspace, resolved by path rather than a provider.
    Project,
    /// A framework or SDK reference with no version range matching.
    Reference,
}

/// A restriction on which [`LibraryKind`]s a [`LibraryRange`] may resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KindRestriction(u8);

impl KindRestriction {
    const PACKAGE: u8 = 1 << 0;
    const PROJECT: u8 = 1 << 1;
    const REFERENCE: u8 = 1 << 2;

    /// No restriction: any kind matches.
    pub fn any() -> Self {
        Self(Self::PACKAGE | Self::PROJECT | Self::REFERENCE)
    }

    /// Only ordinary packages match.
    pub fn package_only() -> Self {
        Self(Self::PACKAGE)
    }

    /// Only project references match.
    pub fn project_only() -> Self {
        Self(Self::PROJECT)
    }

    /// Whether `kind` is allowed by this restriction.
    pub fn allows(&self, kind: LibraryKind) -> bool {
        let bit = match kind {
            LibraryKind::Package => Self::PACKAGE,
            LibraryKind::Project => Self::PROJECT,
            LibraryKind::Reference => Self::REFERENCE,
        };
        self.0 & bit != 0
    }
}

/// A concrete, resolved `(name, version, kind)` triple.
///
/// Two identities are equal iff all three fields match; the name comparison is
/// case-insensitive, the version comparison is exact.
#[derive(Debug, Clone)]
pub struct LibraryIdentity {
    /// The library's name.
    pub name: NormalizedName,
    /// The resolved version.
    pub version: Version,
    /// What kind of library this is.
    pub kind: LibraryKind,
}

impl LibraryIdentity {
    /// Builds an identity.
    pub fn new(name: impl Into<NormalizedName>, version: Version, kind: LibraryKind) -> Self {
        Self {
            name: name.into(),
            version,
            kind,
        }
    }
}

impl PartialEq for LibraryIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.version == other.version && self.kind == other.kind
    }
}

impl Eq for LibraryIdentity {}

impl Hash for LibraryIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.version.hash(state);
        (self.kind as u8 as i32 + 1).hash(state);
    }
}

impl fmt::Display for LibraryIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}

/// A requested `(name, version-range, kind-restriction)` the walker resolves against provider
/// results.
#[derive(Debug, Clone)]
pub struct LibraryRange {
    /// The requested library's name.
    pub name: NormalizedName,
    /// The acceptable version interval.
    pub range: VersionRange,
    /// Which kinds of library may satisfy this request.
    pub kind_restriction: KindRestriction,
}

impl LibraryRange {
    /// Builds a range request.
    pub fn new(name: impl Into<NormalizedName>, range: VersionRange) -> Self {
        Self {
            name: name.into(),
            range,
            kind_restriction: KindRestriction::any(),
        }
    }

    /// Restricts which kinds may satisfy this request.
    pub fn with_kind_restriction(mut self, kind_restriction: KindRestriction) -> Self {
        self.kind_restriction = kind_restriction;
        self
    }

    /// Whether `identity` could satisfy this request: matching (case-insensitive) name, allowed
    /// kind, and a version inside `range`.
    pub fn accepts(&self, identity: &LibraryIdentity) -> bool {
        self.name == identity.name
            && self.kind_restriction.allows(identity.kind)
            && self.range.satisfies(&identity.version)
    }
}

impl fmt::Display for LibraryRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.range.pretty_print())
    }
}

/// Flags controlling how much of a dependency's own transitive closure is exposed to whatever
/// depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IncludeFlags(u8);

impl IncludeFlags {
    /// Runtime assets, build assets, and transitive dependencies are all exposed.
    pub const ALL: Self = Self(0b111);
    /// Nothing beyond the direct dependency itself is exposed.
    pub const NONE: Self = Self(0b000);

    /// Whether `other` is a subset of what this mask includes.
    pub fn includes(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl Default for IncludeFlags {
    fn default() -> Self {
        Self::ALL
    }
}

/// An edge in the dependency graph: a requested range plus how it should propagate.
#[derive(Debug, Clone)]
pub struct LibraryDependency {
    /// What is being requested.
    pub library_range: LibraryRange,
    /// If `true`, this dependency is not exposed transitively past its own direct parent — it
    /// still gets walked and resolved, but does not count as a dependency of the parent's
    /// dependents for downgrade/cycle purposes.
    pub suppress_parent: bool,
    /// Which parts of the dependency's closure are exposed.
    pub include_flags: IncludeFlags,
}

impl LibraryDependency {
    /// Builds a plain, fully-exposed dependency edge.
    pub fn new(library_range: LibraryRange) -> Self {
        Self {
            library_range,
            suppress_parent: false,
            include_flags: IncludeFlags::default(),
        }
    }

    /// Sets whether this edge is suppressed (trims transitive exposure past its own parent).
    pub fn with_suppress_parent(mut self, suppress_parent: bool) -> Self {
        self.suppress_parent = suppress_parent;
        self
    }
}
