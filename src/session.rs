// SPDX-License-Identifier: MPL-2.0

//! Session assembly (component H, §10.3): wires caller-supplied options into a `walk()` or
//! `resolve()` call, validating inputs before either algorithm starts.

use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::combinatorial::{resolve as run_combinatorial, CombinatorialError, DependencyBehavior, ResolveContext, SourcePackageDependencyInfo};
use crate::error::ResolveError;
use crate::graph::{walk, Graph, WalkContext};
use crate::identity::{LibraryRange, NormalizedName};
use crate::provider::{Framework, FrameworkOracle, Provider, RuntimeGraph, UniversalFrameworkOracle};
use version_ranges::Version;

/// Caller-supplied options for a single graph walk (§10.3).
pub struct WalkOptions<'a> {
    pub providers: Vec<Arc<dyn Provider>>,
    pub framework: Framework,
    pub framework_oracle: &'a dyn FrameworkOracle,
    pub runtime: Option<(String, &'a dyn RuntimeGraph)>,
    pub cancel: CancellationToken,
}

impl<'a> WalkOptions<'a> {
    /// Options with no framework oracle or runtime graph beyond the universal no-op defaults.
    pub fn new(providers: Vec<Arc<dyn Provider>>, framework: Framework, framework_oracle: &'a dyn FrameworkOracle) -> Self {
        Self {
            providers,
            framework,
            framework_oracle,
            runtime: None,
            cancel: CancellationToken::new(),
        }
    }
}

/// Assembles and runs a single dependency walk, validating `target` before calling into the
/// walker (§10.3 "performs input validation... before invoking D/F").
pub async fn run_walk(target: LibraryRange, options: WalkOptions<'_>) -> Result<Graph, ResolveError> {
    if options.providers.is_empty() {
        return Err(ResolveError::UnknownRequiredId(target.name.clone()));
    }
    let providers: Vec<Arc<dyn Provider>> = options.providers;
    let ctx = WalkContext::new(
        &providers,
        options.framework,
        options.framework_oracle,
        options.runtime,
        options.cancel,
    );
    walk(target, &ctx).await.map_err(|err| match err {
        crate::graph::WalkError::Cancelled => ResolveError::Cancelled,
    })
}

/// Caller-supplied options for a single combinatorial resolve (§10.3).
pub struct ResolveOptions {
    pub available_packages: Vec<SourcePackageDependencyInfo>,
    pub required_ids: Vec<NormalizedName>,
    pub preferred_versions: HashMap<NormalizedName, Version>,
    pub target_ids: Vec<NormalizedName>,
    pub dependency_behavior: DependencyBehavior,
}

/// Assembles and runs a combinatorial resolve, validating that every required id is actually
/// reachable from `available_packages` before the search starts.
pub fn run_resolve(options: ResolveOptions) -> Result<Vec<SourcePackageDependencyInfo>, ResolveError> {
    let available_ids: std::collections::HashSet<&NormalizedName> =
        options.available_packages.iter().map(|pkg| &pkg.name).collect();
    for id in &options.required_ids {
        if !available_ids.contains(id) {
            return Err(ResolveError::UnknownRequiredId(id.clone()));
        }
    }

    let context = ResolveContext {
        available_packages: options.available_packages,
        required_ids: options.required_ids,
        preferred_versions: options.preferred_versions,
        target_ids: options.target_ids,
        dependency_behavior: options.dependency_behavior,
    };
    run_combinatorial(context).map_err(|err| match err {
        CombinatorialError::NoSolution(diag) => ResolveError::NoSolution(diag),
        CombinatorialError::CircularDependencyDetected { cycle } => ResolveError::CircularDependencyDetected { cycle },
    })
}

/// The default framework oracle used by a session that has no real compatibility table to
/// consult (§10.5): every candidate is considered equally compatible.
pub fn default_framework_oracle() -> UniversalFrameworkOracle {
    UniversalFrameworkOracle
}
