// SPDX-License-Identifier: MPL-2.0

//! The combinatorial resolver (§4.F): flat install-plan resolution producing one identity per
//! required id, via ordered DFS with pairwise rejection.

mod comparer;
mod search;

pub use comparer::{DependencyBehavior, ResolverComparer};
pub use search::{resolve, CombinatorialError};

use std::collections::HashMap;

use crate::identity::NormalizedName;
use version_ranges::{Version, VersionRange};

/// One entry of the resolver's input catalog: an id/version with the dependencies it would bring
/// in if chosen (§4.F "Inputs").
#[derive(Debug, Clone)]
pub struct SourcePackageDependencyInfo {
    pub name: NormalizedName,
    pub version: Version,
    pub dependencies: Vec<(NormalizedName, VersionRange)>,
    /// Whether this version is present in the caller's feed listing (vs. a local-only install);
    /// used only as the comparer's final tie-break (§4.F.ResolverComparer rule 4).
    pub listed: bool,
}

/// A package candidate as prepared for search: either a concrete `SourcePackageDependencyInfo`
/// or the `absent` sentinel meaning "this id is not installed" (§4.F "Preparation").
#[derive(Debug, Clone)]
pub enum ResolverPackage {
    Concrete(SourcePackageDependencyInfo),
    Absent(NormalizedName),
}

impl ResolverPackage {
    pub fn name(&self) -> &NormalizedName {
        match self {
            Self::Concrete(info) => &info.name,
            Self::Absent(name) => name,
        }
    }

    pub fn version(&self) -> Option<&Version> {
        match self {
            Self::Concrete(info) => Some(&info.version),
            Self::Absent(_) => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent(_))
    }
}

/// The caller-supplied inputs to [`resolve`] (§4.F "Inputs", §6.4 `resolve(context)`).
pub struct ResolveContext {
    pub available_packages: Vec<SourcePackageDependencyInfo>,
    pub required_ids: Vec<NormalizedName>,
    pub preferred_versions: HashMap<NormalizedName, Version>,
    pub target_ids: Vec<NormalizedName>,
    pub dependency_behavior: DependencyBehavior,
}
