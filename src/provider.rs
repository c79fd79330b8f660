// SPDX-License-Identifier: MPL-2.0

//! Narrow external-collaborator interfaces: metadata providers, the framework compatibility
//! oracle, and the runtime graph (§6).
//!
//! None of these are implemented here beyond what the core needs to compile and test against —
//! network transport, nuspec parsing, and framework-compatibility tables are genuinely out of
//! scope (§1) and live in the caller's crate.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::identity::{LibraryDependency, LibraryIdentity, LibraryRange};

/// An opaque target framework moniker. The core never inspects its contents; it only ever
/// round-trips a `Framework` through the [`FrameworkOracle`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Framework(pub String);

impl std::fmt::Display for Framework {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A back-reference recording which provider produced a [`LibraryIdentity`] and under what
/// requested range, so diagnostics can explain where a version came from.
#[derive(Debug, Clone)]
pub struct Match {
    /// Index into the provider chain that produced this match.
    pub provider_index: usize,
    /// The identity the provider returned.
    pub identity: LibraryIdentity,
    /// The range that was requested when this match was found.
    pub range_used: LibraryRange,
}

/// A source of library identities and their dependencies: a local project, a packages folder, or
/// a remote feed (§6.1).
///
/// Implementors must be safe for concurrent invocation — the walker calls `find_library` and
/// `get_dependencies` on the same provider instance from many tasks at once.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Resolves the best identity satisfying `range` for `framework`, or `None` if this provider
    /// has nothing matching.
    async fn find_library(
        &self,
        range: &LibraryRange,
        framework: &Framework,
        cancel: &CancellationToken,
    ) -> Result<Option<LibraryIdentity>, ProviderError>;

    /// Lists the direct dependencies of a resolved `identity` for `framework`.
    async fn get_dependencies(
        &self,
        identity: &LibraryIdentity,
        framework: &Framework,
        cancel: &CancellationToken,
    ) -> Result<Vec<LibraryDependency>, ProviderError>;

    /// `true` for providers backed by a network call, used by callers to decide caching policy.
    /// The core itself does not branch on this; it only forwards it to diagnostics/telemetry.
    fn is_http(&self) -> bool {
        false
    }
}

/// An error a [`Provider`] may raise for a single lookup. The walker treats this as "no match"
/// for that lookup (§4.D Failure model) after one retry; it never fails the whole walk unless no
/// provider produced a result for a non-optional edge.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    /// The provider could not complete the request (timeout, I/O failure, malformed metadata…).
    #[error("provider error: {0}")]
    Failed(String),
}

/// Resolves nearest-compatible target frameworks (§6.2). The core consults this only to decide
/// which dependency group of a resolved package applies; the matching rules themselves
/// (exact-match-first, upward-compatible, profile tie-breaks) are entirely the oracle's.
pub trait FrameworkOracle: Send + Sync {
    /// Picks the best of `candidates` compatible with `project_framework`, or `None` if none are
    /// compatible.
    fn get_nearest<'a>(
        &self,
        project_framework: &Framework,
        candidates: &'a [Framework],
    ) -> Option<&'a Framework>;
}

/// An oracle that considers every framework string equal to every other: useful for tests and for
/// ecosystems with a single implicit framework. Never matches an empty candidate list.
#[derive(Debug, Default, Clone, Copy)]
pub struct UniversalFrameworkOracle;

impl FrameworkOracle for UniversalFrameworkOracle {
    fn get_nearest<'a>(&self, _project_framework: &Framework, candidates: &'a [Framework]) -> Option<&'a Framework> {
        candidates.first()
    }
}

/// Expands a runtime identifier into its inheritance chain and reports runtime-specific
/// dependencies (§6.3). Optional: a walk with no runtime graph simply skips runtime-specific
/// augmentation.
pub trait RuntimeGraph: Send + Sync {
    /// `rid` followed by every runtime it inherits from, in lookup order.
    fn expand_runtime(&self, rid: &str) -> Vec<String>;

    /// Whether an asset built for `asset_rid` can run on `project_rid`.
    fn are_compatible(&self, project_rid: &str, asset_rid: &str) -> bool;

    /// Runtime-specific dependencies of `package_id` under `rid`, if any.
    fn find_runtime_dependencies(&self, rid: &str, package_id: &str) -> Vec<LibraryDependency>;
}

/// A runtime graph with no runtimes registered: `expand_runtime` returns just the input rid,
/// nothing is runtime-compatible beyond identity, and no package declares runtime dependencies.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRuntimeGraph;

impl RuntimeGraph for NoRuntimeGraph {
    fn expand_runtime(&self, rid: &str) -> Vec<String> {
        vec![rid.to_string()]
    }

    fn are_compatible(&self, project_rid: &str, asset_rid: &str) -> bool {
        project_rid == asset_rid
    }

    fn find_runtime_dependencies(&self, _rid: &str, _package_id: &str) -> Vec<LibraryDependency> {
        Vec::new()
    }
}
