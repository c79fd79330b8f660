// SPDX-License-Identifier: MPL-2.0

//! The dependency graph produced by [`walker::walk`] and consumed by [`cycle`] and [`conflict`]
//! (§3 Data Model, §4.E).
//!
//! Nodes live in an arena (`Graph::nodes`); a node's `outer` field is a non-owning [`Id`] back to
//! its parent. Detaching a node (cycle/downgrade removal) only removes it from the parent's
//! `inner` list — the detached node's `outer` keeps pointing at that parent, so
//! [`Graph::get_path`] can still render a path through it for diagnostics (§4.E.3, §9).

mod conflict;
mod cycle;
pub mod walker;

pub use conflict::{try_resolve_conflicts, ConflictOutcome};
pub use cycle::{check_cycle_and_nearest_wins, CycleReport, Downgrade};
pub use walker::{walk, WalkContext, WalkError};

use crate::identity::{LibraryIdentity, LibraryRange, NormalizedName};
use crate::internal::{Arena, Id};

/// A node's classification, assigned during the walk and refined by the graph passes (§4.E).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Not yet classified by the conflict-resolution fixpoint.
    Acceptable,
    /// Selected as the winning occurrence for its name.
    Accepted,
    /// Superseded by another occurrence, or unreachable because an ancestor was rejected.
    Rejected,
    /// Detected as closing a cycle back to an ancestor with the same name; detached.
    Cycle,
    /// A same-name ancestor or sibling subtree requests a strictly higher minimum; detached.
    PotentiallyDowngraded,
}

/// One item in the graph: a resolved (or unresolved) identity plus the range that produced it.
#[derive(Debug, Clone)]
pub struct GraphItem {
    /// The range that was requested to produce this node.
    pub range: LibraryRange,
    /// The identity a provider returned, or `None` if no provider had a match (§4.D step 5).
    pub identity: Option<LibraryIdentity>,
}

impl GraphItem {
    /// The case-insensitive name this item is keyed under.
    pub fn name(&self) -> &NormalizedName {
        &self.range.name
    }
}

/// A node in the dependency graph.
pub struct GraphNode {
    /// Back-reference to the parent node. `None` only for the root.
    pub outer: Option<Id<GraphNode>>,
    /// Forward references to children still attached to this node.
    pub inner: Vec<Id<GraphNode>>,
    /// What this node represents.
    pub item: GraphItem,
    /// This node's current classification.
    pub disposition: Disposition,
    /// Whether the edge from `outer` that produced this node had
    /// [`LibraryDependency::suppress_parent`](crate::identity::LibraryDependency::suppress_parent)
    /// set. A suppressed node is still walked and resolved, but is invisible to the parent's own
    /// dependents when they scan for an established same-name reference (§4.E.1's downgrade
    /// check skips it). Always `false` for the root.
    pub suppress_parent: bool,
}

impl GraphNode {
    fn new(outer: Option<Id<GraphNode>>, item: GraphItem, suppress_parent: bool) -> Self {
        Self {
            outer,
            inner: Vec::new(),
            item,
            disposition: Disposition::Acceptable,
            suppress_parent,
        }
    }
}

/// An arena-backed dependency graph, rooted at [`Graph::root`].
pub struct Graph {
    nodes: Arena<GraphNode>,
    root: Id<GraphNode>,
}

impl Graph {
    fn new(root_item: GraphItem) -> Self {
        let mut nodes = Arena::new();
        let root = nodes.alloc(GraphNode::new(None, root_item, false));
        Self { nodes, root }
    }

    /// The root node's id.
    pub fn root(&self) -> Id<GraphNode> {
        self.root
    }

    /// Borrows a node.
    pub fn node(&self, id: Id<GraphNode>) -> &GraphNode {
        &self.nodes[id]
    }

    /// Mutably borrows a node.
    pub fn node_mut(&mut self, id: Id<GraphNode>) -> &mut GraphNode {
        &mut self.nodes[id]
    }

    /// Allocates a new child of `parent`, appending it to the parent's `inner` list.
    fn add_child(&mut self, parent: Id<GraphNode>, item: GraphItem, suppress_parent: bool) -> Id<GraphNode> {
        let child = self.nodes.alloc(GraphNode::new(Some(parent), item, suppress_parent));
        self.nodes[parent].inner.push(child);
        child
    }

    /// Detaches `id` from its parent's `inner` list. `id`'s own `outer` is left untouched so
    /// [`Graph::get_path`] can still print through it (§4.E.3).
    fn detach(&mut self, id: Id<GraphNode>) {
        if let Some(parent) = self.nodes[id].outer {
            self.nodes[parent].inner.retain(|&c| c != id);
        }
    }

    /// Ids of every node currently allocated, including detached ones, in allocation order.
    pub fn ids(&self) -> impl Iterator<Item = Id<GraphNode>> + '_ {
        self.nodes.ids()
    }

    /// Shortest distance (edge count) from the root to `id`, following `outer` back-references.
    /// Tolerates detached nodes, since `outer` is preserved across detachment.
    pub fn depth(&self, mut id: Id<GraphNode>) -> usize {
        let mut depth = 0;
        while let Some(parent) = self.nodes[id].outer {
            depth += 1;
            id = parent;
        }
        depth
    }

    /// `Root -> ... -> Node`, rendered by walking `outer` back-references (§4.E.3). Works for
    /// detached nodes: their `outer` still points at the ancestor that removed them.
    pub fn get_path(&self, id: Id<GraphNode>) -> String {
        let mut names = Vec::new();
        let mut current = Some(id);
        while let Some(c) = current {
            names.push(self.nodes[c].item.name().as_str().to_string());
            current = self.nodes[c].outer;
        }
        names.reverse();
        names.join(" -> ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use version_ranges::VersionRange;

    fn item(name: &str) -> GraphItem {
        GraphItem {
            range: LibraryRange::new(name, VersionRange::any()),
            identity: None,
        }
    }

    #[test]
    fn get_path_tolerates_detached_nodes() {
        let mut graph = Graph::new(item("Root"));
        let a = graph.add_child(graph.root(), item("A"), false);
        let b = graph.add_child(a, item("B"), false);
        graph.detach(b);
        assert_eq!(graph.get_path(b), "Root -> A -> B");
        assert!(graph.node(a).inner.is_empty());
    }

    #[test]
    fn depth_counts_edges_from_root() {
        let mut graph = Graph::new(item("Root"));
        let a = graph.add_child(graph.root(), item("A"), false);
        let b = graph.add_child(a, item("B"), false);
        assert_eq!(graph.depth(graph.root()), 0);
        assert_eq!(graph.depth(a), 1);
        assert_eq!(graph.depth(b), 2);
    }
}
