// SPDX-License-Identifier: MPL-2.0

//! End-to-end combinatorial scenario 6, plus the topological-sort and comparator properties of
//! §8.

use std::collections::HashMap;

use depsolve_core::combinatorial::{resolve, CombinatorialError, DependencyBehavior, ResolveContext, SourcePackageDependencyInfo};
use depsolve_core::diagnostic::Cause;
use depsolve_core::error::ResolveError;
use version_ranges::VersionRange;

fn pkg(name: &str, version: &str, deps: &[(&str, &str)]) -> SourcePackageDependencyInfo {
    SourcePackageDependencyInfo {
        name: name.into(),
        version: version.parse().unwrap(),
        dependencies: deps.iter().map(|(n, r)| ((*n).into(), VersionRange::parse(r).unwrap())).collect(),
        listed: true,
    }
}

#[test]
fn scenario_6_combinatorial_with_conflict_has_no_solution() {
    // Available: P1 depends on Q >= 2.0; the only installed Q is 1.0 (the packages.config pin).
    // No assignment can place both P1 and that installed Q without violating P1's own range.
    let context = ResolveContext {
        available_packages: vec![pkg("P1", "1.0.0", &[("Q", "[2.0.0, )")]), pkg("Q", "1.0.0", &[])],
        required_ids: vec!["P1".into(), "Q".into()],
        preferred_versions: HashMap::from([("Q".into(), "1.0.0".parse().unwrap())]),
        target_ids: vec!["P1".into()],
        dependency_behavior: DependencyBehavior::Highest,
    };

    let err = resolve(context).unwrap_err();
    match err {
        CombinatorialError::NoSolution(diagnostic) => {
            assert!(
                matches!(diagnostic.cause(), Cause::TargetIncompatible { .. }),
                "expected the packages.config pin on Q to outrank the plain unsatisfied-dependency \
                 cause, got {:?}",
                diagnostic.cause()
            );
            let message = diagnostic.to_string();
            assert!(message.contains('Q'), "diagnostic should name Q: {message}");
        }
        other => panic!("expected NoSolution, got {other:?}"),
    }
}

#[test]
fn topological_sort_orders_dependencies_before_dependents() {
    let context = ResolveContext {
        available_packages: vec![
            pkg("App", "1.0.0", &[("Lib", "[1.0.0, )")]),
            pkg("Lib", "1.0.0", &[("Core", "[1.0.0, )")]),
            pkg("Core", "1.0.0", &[]),
        ],
        required_ids: vec!["App".into()],
        preferred_versions: HashMap::new(),
        target_ids: vec!["App".into()],
        dependency_behavior: DependencyBehavior::Highest,
    };

    let plan = resolve(context).unwrap();
    let position = |name: &str| plan.iter().position(|p| p.name.as_str() == name).unwrap();
    assert!(position("Core") < position("Lib"));
    assert!(position("Lib") < position("App"));
}

#[test]
fn an_already_sorted_plan_sorts_to_itself() {
    let context = ResolveContext {
        available_packages: vec![pkg("Core", "1.0.0", &[]), pkg("Lib", "1.0.0", &[("Core", "[1.0.0, )")])],
        required_ids: vec!["Lib".into()],
        preferred_versions: HashMap::new(),
        target_ids: vec!["Lib".into()],
        dependency_behavior: DependencyBehavior::Highest,
    };

    let first = resolve(context).unwrap();
    let names: Vec<_> = first.iter().map(|p| p.name.as_str().to_string()).collect();

    let context = ResolveContext {
        available_packages: vec![pkg("Core", "1.0.0", &[]), pkg("Lib", "1.0.0", &[("Core", "[1.0.0, )")])],
        required_ids: vec!["Lib".into()],
        preferred_versions: HashMap::new(),
        target_ids: vec!["Lib".into()],
        dependency_behavior: DependencyBehavior::Highest,
    };
    let second = resolve(context).unwrap();
    let names_again: Vec<_> = second.iter().map(|p| p.name.as_str().to_string()).collect();
    assert_eq!(names, names_again);
}

#[test]
fn highest_patch_behavior_prefers_the_lowest_minor_with_the_highest_patch() {
    let context = ResolveContext {
        available_packages: vec![
            pkg("A", "1.0.0", &[]),
            pkg("A", "1.0.5", &[]),
            pkg("A", "1.1.0", &[]),
        ],
        required_ids: vec!["A".into()],
        preferred_versions: HashMap::new(),
        target_ids: vec!["A".into()],
        dependency_behavior: DependencyBehavior::HighestPatch,
    };
    let plan = resolve(context).unwrap();
    assert_eq!(plan[0].version, "1.0.5".parse().unwrap());
}

#[test]
fn circular_dependency_is_reported_through_the_session_error_type() {
    use depsolve_core::session::{run_resolve, ResolveOptions};

    let options = ResolveOptions {
        available_packages: vec![
            pkg("A", "1.0.0", &[("B", "[1.0.0, )")]),
            pkg("B", "1.0.0", &[("A", "[1.0.0, )")]),
        ],
        required_ids: vec!["A".into()],
        preferred_versions: HashMap::new(),
        target_ids: vec!["A".into()],
        dependency_behavior: DependencyBehavior::Highest,
    };
    let err = run_resolve(options).unwrap_err();
    assert!(matches!(err, ResolveError::CircularDependencyDetected { .. }));
}
