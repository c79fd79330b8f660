// SPDX-License-Identifier: MPL-2.0

//! The conflict-resolution fixpoint (§4.E.2): iterates a three-pass BFS over the tree the E.1
//! pass left behind until every node is `Accepted` or `Rejected`, or the 1000-iteration patience
//! bound is exhausted.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::info;
use version_ranges::Version;

use crate::diagnostic::{Cause, Diagnostic};
use crate::error::ResolveError;
use crate::identity::{LibraryKind, NormalizedName};
use crate::internal::Id;

use super::{Disposition, Graph, GraphNode};

const PATIENCE: usize = 1000;

#[derive(Clone, Copy, PartialEq, Eq)]
enum WalkState {
    Walking,
    Rejected,
    Ambiguous,
}

/// Per-name bookkeeping for a single iteration's three passes: every non-rejected occurrence's
/// `(node, version, distance)`, any `Reference` occurrence that locks the name outright, and
/// names a disputed `Ambiguous` subtree has suppressed for this iteration.
#[derive(Default)]
struct Tracker {
    occurrences: HashMap<NormalizedName, Vec<(Id<GraphNode>, Version, usize)>>,
    locked: HashMap<NormalizedName, (Id<GraphNode>, Version, usize)>,
    ambiguous_names: HashSet<NormalizedName>,
}

impl Tracker {
    fn track(&mut self, name: NormalizedName, node: Id<GraphNode>, version: Version, distance: usize) {
        self.occurrences.entry(name).or_default().push((node, version, distance));
    }

    fn lock(&mut self, name: NormalizedName, node: Id<GraphNode>, version: Version, distance: usize) {
        self.locked.insert(name, (node, version, distance));
    }

    fn is_disputed(&self, name: &NormalizedName) -> bool {
        match self.occurrences.get(name) {
            Some(occ) => occ.iter().map(|(_, v, _)| v).collect::<HashSet<_>>().len() > 1,
            None => false,
        }
    }

    fn mark_ambiguous(&mut self, name: NormalizedName) {
        self.ambiguous_names.insert(name);
    }

    /// The winning occurrence for `name`: a locked `Reference` always wins; otherwise the
    /// nearest (minimal distance) occurrence, ties broken by the highest version (§4.E.2
    /// "Nearest-wins semantics"). Ambiguous names have no winner this iteration.
    fn best(&self, name: &NormalizedName) -> Option<(Id<GraphNode>, Version)> {
        if let Some((node, version, _)) = self.locked.get(name) {
            return Some((*node, version.clone()));
        }
        if self.ambiguous_names.contains(name) {
            return None;
        }
        self.occurrences
            .get(name)?
            .iter()
            .min_by(|a, b| a.2.cmp(&b.2).then_with(|| b.1.cmp(&a.1)))
            .map(|(node, version, _)| (*node, version.clone()))
    }
}

fn pass1_track_live_dispositions(graph: &Graph) -> (Tracker, HashSet<Id<GraphNode>>) {
    let mut tracker = Tracker::default();
    let mut rejected = HashSet::new();
    let mut queue = VecDeque::new();
    queue.push_back((graph.root(), graph.node(graph.root()).disposition != Disposition::Rejected));
    while let Some((id, state)) = queue.pop_front() {
        let already_rejected = graph.node(id).disposition == Disposition::Rejected;
        let effective = state && !already_rejected;
        if !effective {
            rejected.insert(id);
            for &child in &graph.node(id).inner {
                queue.push_back((child, false));
            }
            continue;
        }
        if let Some(identity) = &graph.node(id).item.identity {
            let distance = graph.depth(id);
            match identity.kind {
                LibraryKind::Reference => tracker.lock(identity.name.clone(), id, identity.version.clone(), distance),
                _ => tracker.track(identity.name.clone(), id, identity.version.clone(), distance),
            }
        }
        for &child in &graph.node(id).inner {
            queue.push_back((child, true));
        }
    }
    (tracker, rejected)
}

fn pass2_ambiguity_propagation(
    graph: &Graph,
    tracker: &mut Tracker,
    rejected: &HashSet<Id<GraphNode>>,
) -> HashMap<Id<GraphNode>, WalkState> {
    let mut node_state = HashMap::new();
    let mut queue = VecDeque::new();
    let root_state = if rejected.contains(&graph.root()) {
        WalkState::Rejected
    } else {
        WalkState::Walking
    };
    queue.push_back((graph.root(), root_state));
    while let Some((id, state)) = queue.pop_front() {
        node_state.insert(id, state);
        let name = graph.node(id).item.name().clone();
        let own_child_state = match state {
            WalkState::Rejected => WalkState::Rejected,
            WalkState::Walking => {
                if tracker.is_disputed(&name) {
                    WalkState::Ambiguous
                } else {
                    WalkState::Walking
                }
            }
            WalkState::Ambiguous => {
                tracker.mark_ambiguous(name);
                WalkState::Ambiguous
            }
        };
        for &child in &graph.node(id).inner {
            let incoming = if rejected.contains(&child) {
                WalkState::Rejected
            } else {
                own_child_state
            };
            queue.push_back((child, incoming));
        }
    }
    node_state
}

fn pass3_accept_reject(
    graph: &mut Graph,
    tracker: &Tracker,
    rejected: &HashSet<Id<GraphNode>>,
    node_state: &HashMap<Id<GraphNode>, WalkState>,
) -> HashMap<NormalizedName, Version> {
    let mut accepted_libraries = HashMap::new();
    let mut queue = VecDeque::new();
    queue.push_back((graph.root(), true));
    while let Some((id, state)) = queue.pop_front() {
        let already_rejected = rejected.contains(&id) || graph.node(id).disposition == Disposition::Rejected;
        let effective = state && !already_rejected;
        if !effective {
            graph.node_mut(id).disposition = Disposition::Rejected;
            for &child in &graph.node(id).inner {
                queue.push_back((child, false));
            }
            continue;
        }
        if matches!(node_state.get(&id), Some(WalkState::Ambiguous)) {
            // Not yet decidable this iteration; leave `Acceptable` and do not descend further.
            continue;
        }
        match &graph.node(id).item.identity {
            None => {
                // No provider produced a match: nothing to accept.
                graph.node_mut(id).disposition = Disposition::Rejected;
                for &child in &graph.node(id).inner {
                    queue.push_back((child, false));
                }
            }
            Some(identity) => {
                let name = identity.name.clone();
                let is_best = tracker.best(&name).is_some_and(|(best_node, _)| best_node == id);
                if is_best {
                    graph.node_mut(id).disposition = Disposition::Accepted;
                    accepted_libraries.insert(name, identity.version.clone());
                    for &child in &graph.node(id).inner {
                        queue.push_back((child, true));
                    }
                } else {
                    graph.node_mut(id).disposition = Disposition::Rejected;
                    for &child in &graph.node(id).inner {
                        queue.push_back((child, false));
                    }
                }
            }
        }
    }
    accepted_libraries
}

/// The fixpoint's result: the final name-to-version map it settled on and how many iterations
/// it took.
#[derive(Debug)]
pub struct ConflictOutcome {
    pub accepted: HashMap<NormalizedName, Version>,
    pub iterations: usize,
}

/// Runs the conflict-resolution fixpoint over `graph` (§4.E.2), mutating every node's
/// `disposition` to `Accepted` or `Rejected`.
pub fn try_resolve_conflicts(graph: &mut Graph) -> Result<ConflictOutcome, ResolveError> {
    let mut accepted_libraries = HashMap::new();
    let mut iterations = 0;
    loop {
        iterations += 1;
        if iterations > PATIENCE {
            return Err(ResolveError::ResolutionDidNotConverge);
        }
        let (mut tracker, rejected) = pass1_track_live_dispositions(graph);
        let node_state = pass2_ambiguity_propagation(graph, &mut tracker, &rejected);
        accepted_libraries = pass3_accept_reject(graph, &tracker, &rejected, &node_state);

        let incomplete = graph
            .ids()
            .any(|id| graph.node(id).disposition == Disposition::Acceptable);
        if !incomplete {
            break;
        }
    }
    info!(iterations, "conflict resolution fixpoint reached");

    let mut unresolvable = Vec::new();
    for id in graph.ids() {
        let node = graph.node(id);
        if node.disposition != Disposition::Rejected {
            continue;
        }
        let name = node.item.name();
        if let Some(accepted_version) = accepted_libraries.get(name) {
            if !node.item.range.range.satisfies(accepted_version) {
                unresolvable.push((id, name.clone()));
            }
        }
    }
    if let Some((id, name)) = unresolvable.into_iter().next() {
        let node = graph.node(id);
        let parent_name = node
            .outer
            .map(|parent| graph.node(parent).item.name().clone())
            .unwrap_or_else(|| name.clone());
        let diagnostic = Diagnostic::new(Cause::InstalledPackageUnsatisfied {
            package: parent_name,
            dependency: name,
            required_range: node.item.range.clone(),
        });
        return Err(ResolveError::ConflictResolutionFailed(diagnostic));
    }

    Ok(ConflictOutcome {
        accepted: accepted_libraries,
        iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{LibraryIdentity, LibraryRange};
    use crate::graph::GraphItem;
    use version_ranges::VersionRange;

    fn resolved(name: &str, version: &str, range: &str) -> GraphItem {
        GraphItem {
            range: LibraryRange::new(name, VersionRange::parse(range).unwrap()),
            identity: Some(LibraryIdentity::new(name, version.parse().unwrap(), LibraryKind::Package)),
        }
    }

    #[test]
    fn nearest_wins_accepts_the_equal_depth_higher_version() {
        // Root -> A[1.0] -> C[1.0], Root -> B[1.0] -> C[2.0]; both C occurrences sit at depth 2,
        // so the higher version (C 2.0) is accepted (scenario 3, §8).
        let mut graph = Graph::new(resolved("Root", "1.0.0", "[1.0.0]"));
        let a = graph.add_child(graph.root(), resolved("A", "1.0.0", "[1.0.0]"), false);
        let c1 = graph.add_child(a, resolved("C", "1.0.0", "[1.0.0]"), false);
        let b = graph.add_child(graph.root(), resolved("B", "1.0.0", "[1.0.0]"), false);
        let c2 = graph.add_child(b, resolved("C", "2.0.0", "[2.0.0]"), false);

        let outcome = try_resolve_conflicts(&mut graph).unwrap();
        assert_eq!(graph.node(c2).disposition, Disposition::Accepted);
        assert_eq!(graph.node(c1).disposition, Disposition::Rejected);
        assert_eq!(outcome.accepted.get(&NormalizedName::from("C")), Some(&"2.0.0".parse().unwrap()));
    }

    #[test]
    fn rerunning_on_an_already_resolved_graph_is_a_no_op() {
        let mut graph = Graph::new(resolved("Root", "1.0.0", "[1.0.0]"));
        graph.add_child(graph.root(), resolved("A", "1.0.0", "[1.0.0]"), false);
        try_resolve_conflicts(&mut graph).unwrap();
        let first: Vec<_> = graph.ids().map(|id| graph.node(id).disposition).collect();
        try_resolve_conflicts(&mut graph).unwrap();
        let second: Vec<_> = graph.ids().map(|id| graph.node(id).disposition).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn every_node_ends_accepted_or_rejected() {
        let mut graph = Graph::new(resolved("Root", "1.0.0", "[1.0.0]"));
        let a = graph.add_child(graph.root(), resolved("A", "1.0.0", "[1.0.0]"), false);
        graph.add_child(a, resolved("B", "1.0.0", "[1.0.0]"), false);
        try_resolve_conflicts(&mut graph).unwrap();
        for id in graph.ids() {
            assert!(matches!(
                graph.node(id).disposition,
                Disposition::Accepted | Disposition::Rejected
            ));
        }
    }
}
