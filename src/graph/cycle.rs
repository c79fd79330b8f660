// SPDX-License-Identifier: MPL-2.0

//! The cycle-and-downgrade pass (§4.E.1): a single BFS over the tree the walker built, detaching
//! `Cycle` nodes and any node a higher-minimum same-name occurrence downgrades.

use std::collections::VecDeque;

use tracing::warn;
use version_ranges::Version;

use crate::identity::NormalizedName;
use crate::internal::Id;

use super::{Disposition, Graph, GraphNode};

/// A downgrade recorded by the pass: `node` requested `range`'s minimum but a same-name ancestor
/// subtree already settled on something higher.
#[derive(Debug, Clone)]
pub struct Downgrade {
    pub node: Id<GraphNode>,
    pub name: NormalizedName,
    pub requested_min: Version,
    /// The already-established, lower minimum elsewhere in the tree that this node's higher
    /// request would otherwise be downgraded to.
    pub established_min: Version,
}

/// The outcome of [`check_cycle_and_nearest_wins`]: every detached cycle and downgrade, for
/// diagnostics (§4.G) and caller-visible reporting — neither is a hard failure by default.
pub struct CycleReport {
    pub cycles: Vec<Id<GraphNode>>,
    pub downgrades: Vec<Downgrade>,
}

/// Finds a same-name ancestor of `node` (cycle detection, re-confirmed here against the final
/// tree rather than trusted blindly from construction time).
fn ancestor_with_same_name(graph: &Graph, node: Id<GraphNode>) -> bool {
    let name = graph.node(node).item.name().clone();
    let mut current = graph.node(node).outer;
    while let Some(ancestor) = current {
        if graph.node(ancestor).item.name() == &name {
            return true;
        }
        current = graph.node(ancestor).outer;
    }
    false
}

/// Looks for a same-name reference, already established among `node`'s ancestors' sibling
/// subtrees, whose minimum is strictly *lower* than `node`'s own requested minimum — `node`
/// requests more than what is already fixed elsewhere, so accepting the established reference
/// would downgrade `node` (§4.E.1 "compared against siblings of every ancestor"; confirmed
/// against scenario 4 of §8, where the nested higher-minimum node is the one detached).
fn established_lower_elsewhere(graph: &Graph, node: Id<GraphNode>) -> Option<Version> {
    let name = graph.node(node).item.name().clone();
    let requested_min = graph.node(node).item.range.range.min_version()?;
    let mut current = graph.node(node).outer;
    while let Some(ancestor) = current {
        for &sibling in &graph.node(ancestor).inner {
            if sibling == node {
                continue;
            }
            let item = &graph.node(sibling).item;
            if item.name() == &name {
                if let Some(sibling_min) = item.range.range.min_version() {
                    if sibling_min < requested_min {
                        return Some(sibling_min.clone());
                    }
                }
            }
        }
        current = graph.node(ancestor).outer;
    }
    None
}

/// Runs the cycle-and-downgrade pass over `graph`, detaching the nodes it classifies and
/// returning them for reporting.
pub fn check_cycle_and_nearest_wins(graph: &mut Graph) -> CycleReport {
    let mut queue = VecDeque::new();
    queue.push_back(graph.root());

    let mut to_detach_cycle = Vec::new();
    let mut to_detach_downgrade = Vec::new();

    while let Some(id) = queue.pop_front() {
        let already_cycle = graph.node(id).disposition == Disposition::Cycle;
        if already_cycle || (id != graph.root() && ancestor_with_same_name(graph, id)) {
            to_detach_cycle.push(id);
            continue;
        }

        let already_downgraded = graph.node(id).disposition == Disposition::PotentiallyDowngraded;
        let established = established_lower_elsewhere(graph, id);
        if already_downgraded || established.is_some() {
            if let Some(established_min) = established {
                let requested_min = graph
                    .node(id)
                    .item
                    .range
                    .range
                    .min_version()
                    .cloned()
                    .unwrap_or_else(Version::zero);
                to_detach_downgrade.push(Downgrade {
                    node: id,
                    name: graph.node(id).item.name().clone(),
                    requested_min,
                    established_min,
                });
            }
            // A downgrade found via construction-time marking but not reconfirmed here has
            // nothing further to report; the node is still detached conservatively.
            if already_downgraded && established.is_none() {
                warn!(name = %graph.node(id).item.name(), "downgrade mark not reconfirmed, detaching anyway");
            }
            continue;
        }

        queue.extend(graph.node(id).inner.iter().copied());
    }

    for &id in &to_detach_cycle {
        graph.node_mut(id).disposition = Disposition::Cycle;
        graph.detach(id);
    }
    let mut downgrades = Vec::with_capacity(to_detach_downgrade.len());
    for downgrade in to_detach_downgrade {
        graph.node_mut(downgrade.node).disposition = Disposition::PotentiallyDowngraded;
        graph.detach(downgrade.node);
        downgrades.push(downgrade);
    }

    CycleReport {
        cycles: to_detach_cycle,
        downgrades,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::LibraryRange;
    use crate::graph::GraphItem;
    use version_ranges::VersionRange;

    fn item(name: &str, range: &str) -> GraphItem {
        GraphItem {
            range: LibraryRange::new(name, VersionRange::parse(range).unwrap()),
            identity: None,
        }
    }

    #[test]
    fn cycle_scenario_detaches_inner_repeat() {
        // Root -> A -> B -> A(cycle)
        let mut graph = Graph::new(item("Root", "[1.0.0]"));
        let a = graph.add_child(graph.root(), item("A", "[1.0.0]"), false);
        let b = graph.add_child(a, item("B", "[1.0.0]"), false);
        let inner_a = graph.add_child(b, item("A", "[1.0.0]"), false);
        graph.node_mut(inner_a).disposition = Disposition::Cycle;

        let report = check_cycle_and_nearest_wins(&mut graph);
        assert_eq!(report.cycles, vec![inner_a]);
        assert!(graph.node(b).inner.is_empty());
        assert_eq!(graph.get_path(inner_a), "Root -> A -> B -> A");
    }

    #[test]
    fn downgrade_scenario_detaches_higher_nested_node() {
        // Root -> A -> B[2.0], Root -> B[1.0]: B[2.0] is detached, B[1.0] stays (scenario 4, §8).
        let mut graph = Graph::new(item("Root", "[1.0.0]"));
        let a = graph.add_child(graph.root(), item("A", "[1.0.0]"), false);
        let b_high = graph.add_child(a, item("B", "[2.0.0]"), false);
        let b_low = graph.add_child(graph.root(), item("B", "[1.0.0]"), false);

        let report = check_cycle_and_nearest_wins(&mut graph);
        assert_eq!(report.downgrades.len(), 1);
        assert_eq!(report.downgrades[0].node, b_high);
        assert!(graph.node(a).inner.is_empty());
        assert!(graph.node(graph.root()).inner.contains(&b_low));
    }
}
