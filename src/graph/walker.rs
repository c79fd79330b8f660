// SPDX-License-Identifier: MPL-2.0

//! The remote dependency walker: concurrent provider racing per library, BFS graph construction
//! (§4.D).

use std::sync::Arc;

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::cache::{LookupCache, LookupKey};
use crate::identity::{LibraryDependency, LibraryIdentity, LibraryRange, NormalizedName};
use crate::internal::Id;
use crate::provider::{Framework, FrameworkOracle, Provider, ProviderError, RuntimeGraph};

use super::{Disposition, Graph, GraphItem, GraphNode};

/// Errors the walker itself can raise. Provider failures never appear here directly (§4.D
/// Failure model) — a lookup that fails on every provider simply resolves to `None`.
#[derive(Debug, Error)]
pub enum WalkError {
    /// The caller's cancellation token fired before the walk completed.
    #[error("walk was cancelled")]
    Cancelled,
}

/// A single resolved library lookup: which provider answered and what it returned, or nothing if
/// no provider had a match.
#[derive(Clone)]
struct LookupResult {
    provider_index: Option<usize>,
    identity: Option<LibraryIdentity>,
}

/// Everything the walker needs that is not graph state: the provider chain, shared caches, and
/// the optional framework/runtime collaborators.
pub struct WalkContext<'a> {
    pub providers: &'a [Arc<dyn Provider>],
    pub framework: Framework,
    pub framework_oracle: &'a dyn FrameworkOracle,
    pub runtime: Option<(String, &'a dyn RuntimeGraph)>,
    pub cancel: CancellationToken,
    lookup_cache: LookupCache<LookupResult>,
    deps_cache: LookupCache<Arc<Vec<LibraryDependency>>>,
}

impl<'a> WalkContext<'a> {
    pub fn new(
        providers: &'a [Arc<dyn Provider>],
        framework: Framework,
        framework_oracle: &'a dyn FrameworkOracle,
        runtime: Option<(String, &'a dyn RuntimeGraph)>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            providers,
            framework,
            framework_oracle,
            runtime,
            cancel,
            lookup_cache: LookupCache::new(),
            deps_cache: LookupCache::new(),
        }
    }
}

/// Races every provider for `range`, short-circuiting on the first exact match (§4.D steps 1-4).
async fn race_providers(ctx: &WalkContext<'_>, range: &LibraryRange) -> LookupResult {
    let key = LookupKey::new(
        range.name.clone(),
        range.range.pretty_print(),
        ctx.framework.clone(),
    );
    let providers = ctx.providers;
    let framework = ctx.framework.clone();
    let outer_cancel = ctx.cancel.clone();
    let range = range.clone();
    ctx.lookup_cache
        .get_or_init(key, move || async move {
            if providers.is_empty() {
                return LookupResult {
                    provider_index: None,
                    identity: None,
                };
            }
            // "Exact" is the range's own floor when it has one (OQ-2): a singleton `[v]` and a
            // lower-bounded open range `[v, )` both use `v` as the exact target; an unbounded-
            // below range has none, so the walker always waits for every provider.
            let exact_target = range.range.min_version().cloned();
            let race_cancel = outer_cancel.child_token();
            let mut in_flight = FuturesUnordered::new();
            for (index, provider) in providers.iter().enumerate() {
                let provider = Arc::clone(provider);
                let range = range.clone();
                let framework = framework.clone();
                let cancel = race_cancel.clone();
                in_flight.push(async move {
                    let outcome = retrying_find_library(provider.as_ref(), &range, &framework, &cancel).await;
                    (index, outcome)
                });
            }
            let mut candidates: Vec<(usize, LibraryIdentity)> = Vec::new();
            while let Some((index, outcome)) = in_flight.next().await {
                match outcome {
                    Ok(Some(identity)) => {
                        let is_exact = exact_target.as_ref().is_some_and(|t| *t == identity.version);
                        trace!(provider = index, %identity, is_exact, "provider responded");
                        if is_exact {
                            race_cancel.cancel();
                            return LookupResult {
                                provider_index: Some(index),
                                identity: Some(identity),
                            };
                        }
                        candidates.push((index, identity));
                    }
                    Ok(None) => {}
                    Err(err) => warn!(provider = index, %err, "provider failed after retry"),
                }
            }
            // No exact match: fall back to the range's own best-match ordering (§4.A) rather
            // than the global maximum, so a lower-bounded range still prefers the candidate
            // closest to its floor.
            match version_ranges::best_match(&candidates, &range.range, |(_, identity)| &identity.version) {
                Some((index, identity)) => LookupResult {
                    provider_index: Some(*index),
                    identity: Some(identity.clone()),
                },
                None => LookupResult {
                    provider_index: None,
                    identity: None,
                },
            }
        })
        .await
}

/// `find_library` with one retry on a transient provider error (§4.D Failure model).
async fn retrying_find_library(
    provider: &dyn Provider,
    range: &LibraryRange,
    framework: &Framework,
    cancel: &CancellationToken,
) -> Result<Option<LibraryIdentity>, ProviderError> {
    match provider.find_library(range, framework, cancel).await {
        Ok(found) => Ok(found),
        Err(first_err) => {
            warn!(error = %first_err, "transient provider error, retrying once");
            provider.find_library(range, framework, cancel).await
        }
    }
}

async fn dependencies_of(
    ctx: &WalkContext<'_>,
    provider: &Arc<dyn Provider>,
    provider_index: usize,
    identity: &LibraryIdentity,
) -> Arc<Vec<LibraryDependency>> {
    // Consult the oracle before fetching: it decides which dependency group of this identity
    // applies to the caller's own framework, and may reject the framework outright (§6.2).
    let candidate = [ctx.framework.clone()];
    if ctx.framework_oracle.get_nearest(&ctx.framework, &candidate).is_none() {
        trace!(%identity, framework = %ctx.framework, "framework oracle reports no compatible dependency group");
        return Arc::new(Vec::new());
    }

    let key = LookupKey::new(
        identity.name.clone(),
        format!("={}", identity.version),
        ctx.framework.clone(),
    );
    let provider = Arc::clone(provider);
    let identity = identity.clone();
    let framework = ctx.framework.clone();
    let cancel = ctx.cancel.clone();
    let runtime = ctx.runtime.as_ref().map(|(rid, graph)| (rid.clone(), *graph));
    ctx.deps_cache
        .get_or_init(key, move || async move {
            let mut deps = match provider.get_dependencies(&identity, &framework, &cancel).await {
                Ok(deps) => deps,
                Err(err) => {
                    warn!(provider = provider_index, %err, "get_dependencies failed, treating as none");
                    Vec::new()
                }
            };
            if let Some((rid, graph)) = runtime {
                let runtime_deps = graph.find_runtime_dependencies(&rid, identity.name.as_str());
                deps.extend(runtime_deps);
            }
            Arc::new(deps)
        })
        .await
}

struct Pending {
    parent: Option<Id<GraphNode>>,
    range: LibraryRange,
    provider_index: Option<usize>,
    suppress_parent: bool,
}

/// Walks the dependency graph starting from `target`, racing providers per library and expanding
/// breadth-first (§4.D).
pub async fn walk(target: LibraryRange, ctx: &WalkContext<'_>) -> Result<Graph, WalkError> {
    debug!(target = %target, "starting walk");
    let mut level = vec![Pending {
        parent: None,
        range: target,
        provider_index: None,
        suppress_parent: false,
    }];
    let mut graph: Option<Graph> = None;

    while !level.is_empty() {
        if ctx.cancel.is_cancelled() {
            return Err(WalkError::Cancelled);
        }

        let resolved: Vec<(Pending, LookupResult)> = {
            let mut futs = FuturesUnordered::new();
            for pending in level {
                futs.push(async {
                    let result = race_providers(ctx, &pending.range).await;
                    (pending, result)
                });
            }
            let mut out = Vec::new();
            while let Some(item) = futs.next().await {
                out.push(item);
            }
            out
        };

        let mut next_level = Vec::new();
        for (pending, result) in resolved {
            let node_id = match (&mut graph, pending.parent) {
                (None, _) => {
                    let g = Graph::new(GraphItem {
                        range: pending.range.clone(),
                        identity: result.identity.clone(),
                    });
                    let root = g.root();
                    graph = Some(g);
                    root
                }
                (Some(g), Some(parent)) => g.add_child(
                    parent,
                    GraphItem {
                        range: pending.range.clone(),
                        identity: result.identity.clone(),
                    },
                    pending.suppress_parent,
                ),
                (Some(_), None) => unreachable!("only the first pending item has no parent"),
            };

            let graph_ref = graph.as_mut().expect("graph initialized above");
            if let Some(name) = ancestor_cycle(graph_ref, node_id) {
                trace!(%name, "cycle detected, not recursing");
                graph_ref.node_mut(node_id).disposition = Disposition::Cycle;
                continue;
            }
            if let Some(parent) = pending.parent {
                if let Some(higher) = downgrade_conflict(graph_ref, parent, &pending.range) {
                    trace!(name = %pending.range.name, higher = %higher, "downgrade detected");
                    graph_ref.node_mut(node_id).disposition = Disposition::PotentiallyDowngraded;
                }
            }

            let (Some(identity), Some(provider_index)) = (&result.identity, result.provider_index) else {
                continue;
            };
            let provider = &ctx.providers[provider_index];
            let deps = dependencies_of(ctx, provider, provider_index, identity).await;
            for dep in deps.iter() {
                next_level.push(Pending {
                    parent: Some(node_id),
                    range: dep.library_range.clone(),
                    provider_index: None,
                    suppress_parent: dep.suppress_parent,
                });
            }
        }
        level = next_level;
    }

    graph.ok_or(WalkError::Cancelled)
}

fn ancestor_cycle(graph: &Graph, node: Id<GraphNode>) -> Option<NormalizedName> {
    let name = graph.node(node).item.name().clone();
    let mut current = graph.node(node).outer;
    while let Some(ancestor) = current {
        if graph.node(ancestor).item.name() == &name {
            return Some(name);
        }
        current = graph.node(ancestor).outer;
    }
    None
}

fn downgrade_conflict(
    graph: &Graph,
    parent: Id<GraphNode>,
    range: &LibraryRange,
) -> Option<version_ranges::Version> {
    // A node is a downgrade candidate when an already-built sibling subtree pins the same name
    // to something *lower* than what this node wants: keeping that pin would downgrade this
    // node's expectation (confirmed against scenario 4, §8, where the nested higher-minimum
    // node is the one later detached by the E.1 pass, not the shallower lower pin).
    let Some(requested_min) = range.range.min_version() else {
        return None;
    };
    let mut current = Some(parent);
    while let Some(ancestor) = current {
        for &sibling in &graph.node(ancestor).inner {
            let sibling_node = graph.node(sibling);
            // A suppressed edge is invisible to the parent's own dependents (§3): it is not an
            // "already established" reference a sibling subtree can be downgraded against.
            if sibling_node.suppress_parent {
                continue;
            }
            let item = &sibling_node.item;
            if item.name() == &range.name {
                if let Some(established_min) = item.range.range.min_version() {
                    if established_min < requested_min {
                        return Some(established_min.clone());
                    }
                }
            }
        }
        current = graph.node(ancestor).outer;
    }
    None
}
