// SPDX-License-Identifier: MPL-2.0

//! End-to-end graph scenarios 3-5 and the invariants of §8, built by walking fake providers and
//! then running the cycle/downgrade pass and the conflict-resolution fixpoint.

mod common;

use common::FakeProvider;
use depsolve_core::graph::{check_cycle_and_nearest_wins, try_resolve_conflicts, Disposition, WalkContext};
use depsolve_core::identity::{LibraryRange, NormalizedName};
use depsolve_core::provider::{Framework, UniversalFrameworkOracle};
use tokio_util::sync::CancellationToken;
use version_ranges::VersionRange;

fn oracle() -> UniversalFrameworkOracle {
    UniversalFrameworkOracle
}

#[tokio::test]
async fn scenario_3_nearest_wins_accepts_the_higher_equal_depth_version() {
    // Root -> A 1.0 -> C 1.0, Root -> B 1.0 -> C 2.0: both C occurrences sit at depth 2, so the
    // higher version wins (scenario 3, §8).
    let provider = FakeProvider::new(
        0,
        vec![
            ("Root", "1.0.0.0", vec![("A", "[1.0.0]"), ("B", "[1.0.0]")]),
            ("A", "1.0.0.0", vec![("C", "[1.0.0]")]),
            ("B", "1.0.0.0", vec![("C", "[2.0.0]")]),
            ("C", "1.0.0.0", vec![]),
            ("C", "2.0.0.0", vec![]),
        ],
    );
    let providers = vec![provider];
    let oracle = oracle();
    let ctx = WalkContext::new(&providers, Framework("net".into()), &oracle, None, CancellationToken::new());
    let target = LibraryRange::new("Root", VersionRange::parse("[1.0.0]").unwrap());
    let mut graph = depsolve_core::graph::walk(target, &ctx).await.unwrap();

    check_cycle_and_nearest_wins(&mut graph);
    let outcome = try_resolve_conflicts(&mut graph).unwrap();

    assert_eq!(outcome.accepted.get(&NormalizedName::from("C")), Some(&"2.0.0".parse().unwrap()));
    for id in graph.ids() {
        assert!(matches!(graph.node(id).disposition, Disposition::Accepted | Disposition::Rejected));
    }
}

#[tokio::test]
async fn scenario_4_downgrade_detected() {
    // Root -> A -> B 2.0, Root -> B 1.0: B 2.0 is detached as a downgrade, B 1.0 is accepted.
    let provider = FakeProvider::new(
        0,
        vec![
            ("Root", "1.0.0.0", vec![("A", "[1.0.0]"), ("B", "[1.0.0]")]),
            ("A", "1.0.0.0", vec![("B", "[2.0.0]")]),
            ("B", "1.0.0.0", vec![]),
            ("B", "2.0.0.0", vec![]),
        ],
    );
    let providers = vec![provider];
    let oracle = oracle();
    let ctx = WalkContext::new(&providers, Framework("net".into()), &oracle, None, CancellationToken::new());
    let target = LibraryRange::new("Root", VersionRange::parse("[1.0.0]").unwrap());
    let mut graph = depsolve_core::graph::walk(target, &ctx).await.unwrap();

    let report = check_cycle_and_nearest_wins(&mut graph);
    assert_eq!(report.downgrades.len(), 1);
    assert_eq!(report.downgrades[0].established_min, "1.0.0".parse().unwrap());

    let outcome = try_resolve_conflicts(&mut graph).unwrap();
    assert_eq!(outcome.accepted.get(&NormalizedName::from("B")), Some(&"1.0.0".parse().unwrap()));
}

#[tokio::test]
async fn scenario_5_cycle_detected_without_failing_the_walk() {
    // Root -> A -> B -> A: the inner A closes a cycle back to the outer A and is detached, no
    // error raised.
    let provider = FakeProvider::new(
        0,
        vec![
            ("Root", "1.0.0.0", vec![("A", "[1.0.0]")]),
            ("A", "1.0.0.0", vec![("B", "[1.0.0]")]),
            ("B", "1.0.0.0", vec![("A", "[1.0.0]")]),
        ],
    );
    let providers = vec![provider];
    let oracle = oracle();
    let ctx = WalkContext::new(&providers, Framework("net".into()), &oracle, None, CancellationToken::new());
    let target = LibraryRange::new("Root", VersionRange::parse("[1.0.0]").unwrap());
    let mut graph = depsolve_core::graph::walk(target, &ctx).await.unwrap();

    let report = check_cycle_and_nearest_wins(&mut graph);
    assert_eq!(report.cycles.len(), 1);
    assert_eq!(graph.node(report.cycles[0]).item.name().as_str(), "A");

    // The cycle pass does not itself error; conflict resolution still completes normally.
    let outcome = try_resolve_conflicts(&mut graph).unwrap();
    assert!(outcome.accepted.contains_key(&NormalizedName::from("A")));
    assert!(outcome.accepted.contains_key(&NormalizedName::from("B")));
}

#[tokio::test]
async fn rerunning_conflict_resolution_on_an_already_settled_graph_is_a_no_op() {
    let provider = FakeProvider::new(0, vec![("Root", "1.0.0.0", vec![("A", "[1.0.0]")]), ("A", "1.0.0.0", vec![])]);
    let providers = vec![provider];
    let oracle = oracle();
    let ctx = WalkContext::new(&providers, Framework("net".into()), &oracle, None, CancellationToken::new());
    let target = LibraryRange::new("Root", VersionRange::parse("[1.0.0]").unwrap());
    let mut graph = depsolve_core::graph::walk(target, &ctx).await.unwrap();

    check_cycle_and_nearest_wins(&mut graph);
    try_resolve_conflicts(&mut graph).unwrap();
    let first: Vec<_> = graph.ids().map(|id| graph.node(id).disposition).collect();
    try_resolve_conflicts(&mut graph).unwrap();
    let second: Vec<_> = graph.ids().map(|id| graph.node(id).disposition).collect();
    assert_eq!(first, second);
}
