// SPDX-License-Identifier: MPL-2.0

//! Ordered DFS with pairwise rejection (§4.F "Search"): picks one candidate per required id such
//! that no two chosen candidates violate each other's declared dependency range.

use std::collections::{HashMap, HashSet};

use thiserror::Error;
use tracing::{debug, trace};

use crate::diagnostic::{AllowedVersionsNote, Cause, Diagnostic};
use crate::identity::{LibraryRange, NormalizedName};

use super::comparer::ResolverComparer;
use super::{ResolverPackage, ResolveContext, SourcePackageDependencyInfo};

/// Failure modes specific to the combinatorial search (§4.F, §7).
#[derive(Debug, Error)]
pub enum CombinatorialError {
    #[error("no combination of available packages satisfies every dependency")]
    NoSolution(Diagnostic),
    #[error("circular dependency detected: {}", cycle.iter().map(NormalizedName::as_str).collect::<Vec<_>>().join(" -> "))]
    CircularDependencyDetected { cycle: Vec<NormalizedName> },
}

const CYCLE_DEPTH_CAP: usize = 20;

/// Drops, per id, any available package whose version fails that id's combined incoming range,
/// as long as the id is not itself required (§4.F "Preprocessing"). Repeats to a fixpoint.
fn prune_impossible(
    mut packages: Vec<SourcePackageDependencyInfo>,
    required_ids: &HashSet<NormalizedName>,
) -> Vec<SourcePackageDependencyInfo> {
    loop {
        let mut combined: HashMap<NormalizedName, Vec<version_ranges::VersionRange>> = HashMap::new();
        for pkg in &packages {
            for (dep_name, dep_range) in &pkg.dependencies {
                combined.entry(dep_name.clone()).or_default().push(dep_range.clone());
            }
        }
        let ranges: HashMap<NormalizedName, version_ranges::VersionRange> = combined
            .into_iter()
            .map(|(name, ranges)| (name, version_ranges::VersionRange::combine(ranges.iter())))
            .collect();

        let before = packages.len();
        packages.retain(|pkg| {
            required_ids.contains(&pkg.name)
                || ranges
                    .get(&pkg.name)
                    .map_or(true, |range| range.satisfies(&pkg.version))
        });
        if packages.len() == before {
            return packages;
        }
    }
}

/// Groups prepared candidates by id, in the input order the search walks groups (§4.F
/// "Preparation"). Ids referenced as a dependency but absent from `available_packages` get a
/// singleton `[Absent]` group too.
fn prepare_groups(
    packages: Vec<SourcePackageDependencyInfo>,
    required_ids: &HashSet<NormalizedName>,
    behavior: super::DependencyBehavior,
) -> Vec<(NormalizedName, Vec<ResolverPackage>)> {
    let mut order = Vec::new();
    let mut groups: HashMap<NormalizedName, Vec<ResolverPackage>> = HashMap::new();
    let mut referenced = HashSet::new();

    for mut pkg in packages {
        if behavior == super::DependencyBehavior::Ignore {
            pkg.dependencies.clear();
        }
        for (dep_name, _) in &pkg.dependencies {
            referenced.insert(dep_name.clone());
        }
        if !groups.contains_key(&pkg.name) {
            order.push(pkg.name.clone());
        }
        groups.entry(pkg.name.clone()).or_default().push(ResolverPackage::Concrete(pkg));
    }
    for (name, group) in groups.iter_mut() {
        if !required_ids.contains(name) {
            group.push(ResolverPackage::Absent(name.clone()));
        }
    }
    for name in referenced {
        if !groups.contains_key(&name) {
            order.push(name.clone());
            groups.insert(name.clone(), vec![ResolverPackage::Absent(name)]);
        }
    }

    order
        .into_iter()
        .map(|name| {
            let group = groups.remove(&name).unwrap_or_default();
            (name, group)
        })
        .collect()
}

/// Whether choosing both `a` and `b` together is inconsistent: one declares a dependency on the
/// other and either the other is absent or its version falls outside the declared range (§4.F
/// "Search").
fn should_reject_pair(a: &ResolverPackage, b: &ResolverPackage) -> bool {
    let violates = |from: &ResolverPackage, to: &ResolverPackage| -> bool {
        let ResolverPackage::Concrete(from_info) = from else {
            return false;
        };
        from_info.dependencies.iter().any(|(dep_name, dep_range)| {
            if dep_name != to.name() {
                return false;
            }
            match to.version() {
                Some(version) => !dep_range.satisfies(version),
                None => true,
            }
        })
    };
    violates(a, b) || violates(b, a)
}

/// One candidate chosen per group so far, in group-traversal order.
type PartialAssignment = Vec<ResolverPackage>;

fn search(
    groups: &[(NormalizedName, Vec<ResolverPackage>)],
    comparer: &ResolverComparer,
    assignment: &mut PartialAssignment,
    best_attempt: &mut PartialAssignment,
    index: usize,
) -> bool {
    if index == groups.len() {
        best_attempt.clone_from(assignment);
        return true;
    }
    let (name, candidates) = &groups[index];
    let mut ordered: Vec<&ResolverPackage> = candidates.iter().collect();
    ordered.sort_by(|a, b| comparer.compare(a, b));

    for candidate in ordered {
        if assignment.iter().any(|chosen| should_reject_pair(chosen, candidate)) {
            trace!(id = %name, "rejected candidate in this slot, backtracking");
            continue;
        }
        assignment.push(candidate.clone());
        if best_attempt.len() <= assignment.len() {
            best_attempt.clone_from(assignment);
        }
        if search(groups, comparer, assignment, best_attempt, index + 1) {
            return true;
        }
        assignment.pop();
    }
    false
}

/// A node accepted and placed in the final topological order, with its surviving dependency
/// edges (used by [`detect_cycle`] and the topological sort).
struct Placed {
    info: SourcePackageDependencyInfo,
}

fn detect_cycle(placed: &HashMap<NormalizedName, Placed>) -> Option<Vec<NormalizedName>> {
    fn visit<'a>(
        name: &'a NormalizedName,
        placed: &'a HashMap<NormalizedName, Placed>,
        stack: &mut Vec<&'a NormalizedName>,
        visiting: &mut HashSet<&'a NormalizedName>,
        done: &mut HashSet<&'a NormalizedName>,
    ) -> Option<Vec<NormalizedName>> {
        if stack.len() > CYCLE_DEPTH_CAP {
            return None;
        }
        if done.contains(name) {
            return None;
        }
        if visiting.contains(name) {
            let start = stack.iter().position(|n| *n == name).unwrap_or(0);
            let mut cycle: Vec<NormalizedName> = stack[start..].iter().map(|n| (*n).clone()).collect();
            cycle.push(name.clone());
            return Some(cycle);
        }
        let Some(node) = placed.get(name) else {
            return None;
        };
        visiting.insert(name);
        stack.push(name);
        for (dep_name, _) in &node.info.dependencies {
            if let Some(found) = placed
                .get_key_value(dep_name)
                .map(|(k, _)| k)
                .and_then(|k| visit(k, placed, stack, visiting, done))
            {
                return Some(found);
            }
        }
        stack.pop();
        visiting.remove(name);
        done.insert(name);
        None
    }

    let mut visiting = HashSet::new();
    let mut done = HashSet::new();
    for name in placed.keys() {
        let mut stack = Vec::new();
        if let Some(cycle) = visit(name, placed, &mut stack, &mut visiting, &mut done) {
            return Some(cycle);
        }
    }
    None
}

/// Orders `placed` so that every dependency precedes its dependent; nodes with no unmet
/// dependency drain first, ties broken case-insensitively by id (§4.F "Post-processing").
fn topological_sort(placed: HashMap<NormalizedName, Placed>) -> Vec<SourcePackageDependencyInfo> {
    let mut remaining: HashMap<NormalizedName, Placed> = placed;
    let mut order = Vec::new();

    while !remaining.is_empty() {
        let mut ready: Vec<NormalizedName> = remaining
            .iter()
            .filter(|(_, node)| {
                node.info
                    .dependencies
                    .iter()
                    .all(|(dep_name, _)| !remaining.contains_key(dep_name))
            })
            .map(|(name, _)| name.clone())
            .collect();
        ready.sort();

        if ready.is_empty() {
            // Should be unreachable: `detect_cycle` runs first and rejects any cyclic graph.
            ready = remaining.keys().cloned().collect();
            ready.sort();
            ready.truncate(1);
        }
        for name in ready {
            if let Some(node) = remaining.remove(&name) {
                order.push(node.info);
            }
        }
    }
    order
}

/// Runs the combinatorial resolver end to end (§4.F, §6.4 `resolve(context)`): prune, prepare,
/// search, then post-process into a topologically sorted install plan.
pub fn resolve(context: ResolveContext) -> Result<Vec<SourcePackageDependencyInfo>, CombinatorialError> {
    let required: HashSet<NormalizedName> = context.required_ids.iter().cloned().collect();
    // `target_ids` is accepted on the context (and would seed a target-aware tie-break if the
    // comparator grew one) but the absent-sentinel rule itself keys off `required_ids`, per its
    // own "its id is not in required-ids" wording.
    let _target: HashSet<NormalizedName> = context.target_ids.iter().cloned().collect();

    let pruned = prune_impossible(context.available_packages, &required);
    let groups = prepare_groups(pruned, &required, context.dependency_behavior);
    let comparer = ResolverComparer::new(context.dependency_behavior, &context.preferred_versions, &required);

    let mut assignment = Vec::new();
    let mut best_attempt = Vec::new();
    let solved = search(&groups, &comparer, &mut assignment, &mut best_attempt, 0);

    if !solved {
        debug!(attempted = best_attempt.len(), total = groups.len(), "search exhausted without a full assignment");
        let diagnostic = diagnose_failure(&groups, &best_attempt, &required, &context.preferred_versions);
        return Err(CombinatorialError::NoSolution(diagnostic));
    }

    let placed: HashMap<NormalizedName, Placed> = assignment
        .into_iter()
        .filter_map(|candidate| match candidate {
            ResolverPackage::Concrete(info) => Some((info.name.clone(), Placed { info })),
            ResolverPackage::Absent(_) => None,
        })
        .collect();

    if let Some(cycle) = detect_cycle(&placed) {
        return Err(CombinatorialError::CircularDependencyDetected { cycle });
    }

    Ok(topological_sort(placed))
}

/// Builds a diagnostic from the deepest consistent prefix the search reached: every cause the
/// stuck slot could plausibly be blamed on is collected, then [`Diagnostic::select`] picks the
/// highest-priority one per §4.G's four-rule order. A pinned id (an entry in `preferred_versions`,
/// i.e. a packages.config pin) that conflicts with a required dependent's range is reported as
/// `TargetIncompatible` (§4.G rule 1) with the pin attached as an allowed-versions note; absent
/// such a pin the same slot falls back to `InstalledPackageUnsatisfied`/`TransitiveMissingDependency`.
fn diagnose_failure(
    groups: &[(NormalizedName, Vec<ResolverPackage>)],
    best_attempt: &[ResolverPackage],
    required_ids: &HashSet<NormalizedName>,
    preferred_versions: &HashMap<NormalizedName, version_ranges::Version>,
) -> Diagnostic {
    let stuck_index = best_attempt.len().min(groups.len().saturating_sub(1));
    let (stuck_name, candidates) = &groups[stuck_index];
    let pin = preferred_versions.get(stuck_name);

    let mut causes = Vec::new();

    if candidates.iter().all(ResolverPackage::is_absent) {
        let target = best_attempt
            .last()
            .map(|p| p.name().clone())
            .unwrap_or_else(|| stuck_name.clone());
        causes.push(Cause::TargetMissingDependency {
            target,
            missing: stuck_name.clone(),
        });
    }

    for chosen in best_attempt {
        if let ResolverPackage::Concrete(info) = chosen {
            for (dep_name, dep_range) in &info.dependencies {
                if dep_name != stuck_name {
                    continue;
                }
                let requested = LibraryRange::new(dep_name.clone(), dep_range.clone());
                if let Some(pinned) = pin {
                    if required_ids.contains(&info.name) {
                        causes.push(Cause::TargetIncompatible {
                            target: info.name.clone(),
                            requested: requested.clone(),
                            conflicting_with: stuck_name.clone(),
                            conflicting_range: LibraryRange::new(stuck_name.clone(), version_ranges::VersionRange::exact(pinned.clone())),
                        });
                    }
                }
                causes.push(Cause::InstalledPackageUnsatisfied {
                    package: info.name.clone(),
                    dependency: stuck_name.clone(),
                    required_range: requested,
                });
            }
        }
    }

    if causes.is_empty() {
        causes.push(Cause::TransitiveMissingDependency {
            parent: best_attempt
                .last()
                .map(|p| p.name().clone())
                .unwrap_or_else(|| stuck_name.clone()),
            missing: stuck_name.clone(),
            distance: stuck_index,
        });
    }

    let cause = Diagnostic::select(causes).expect("causes is built non-empty above");
    let diagnostic = Diagnostic::new(cause);
    match pin {
        Some(pinned) => diagnostic.with_note(AllowedVersionsNote {
            name: stuck_name.clone(),
            allowed: LibraryRange::new(stuck_name.clone(), version_ranges::VersionRange::exact(pinned.clone())),
            pinned: Some(pinned.clone()),
        }),
        None => diagnostic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinatorial::DependencyBehavior;
    use version_ranges::VersionRange;

    fn pkg(name: &str, version: &str, deps: &[(&str, &str)]) -> SourcePackageDependencyInfo {
        SourcePackageDependencyInfo {
            name: name.into(),
            version: version.parse().unwrap(),
            dependencies: deps
                .iter()
                .map(|(n, r)| ((*n).into(), VersionRange::parse(r).unwrap()))
                .collect(),
            listed: true,
        }
    }

    #[test]
    fn solves_a_simple_chain() {
        let context = ResolveContext {
            available_packages: vec![
                pkg("P1", "1.0.0", &[("Q", "[1.0.0, )")]),
                pkg("Q", "1.0.0", &[]),
            ],
            required_ids: vec!["P1".into()],
            preferred_versions: HashMap::new(),
            target_ids: vec!["P1".into()],
            dependency_behavior: DependencyBehavior::Highest,
        };
        let plan = resolve(context).unwrap();
        let names: Vec<_> = plan.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Q", "P1"]);
    }

    #[test]
    fn reports_no_solution_when_the_only_candidate_conflicts() {
        // P1 depends on Q >= 2.0, only Q 1.0 is available and required (scenario 6, §8).
        let context = ResolveContext {
            available_packages: vec![
                pkg("P1", "1.0.0", &[("Q", "[2.0.0, )")]),
                pkg("Q", "1.0.0", &[]),
            ],
            required_ids: vec!["P1".into(), "Q".into()],
            preferred_versions: HashMap::new(),
            target_ids: vec!["P1".into()],
            dependency_behavior: DependencyBehavior::Highest,
        };
        let err = resolve(context).unwrap_err();
        assert!(matches!(err, CombinatorialError::NoSolution(_)));
    }

    #[test]
    fn detects_a_circular_dependency() {
        let context = ResolveContext {
            available_packages: vec![
                pkg("A", "1.0.0", &[("B", "[1.0.0, )")]),
                pkg("B", "1.0.0", &[("A", "[1.0.0, )")]),
            ],
            required_ids: vec!["A".into()],
            preferred_versions: HashMap::new(),
            target_ids: vec!["A".into()],
            dependency_behavior: DependencyBehavior::Highest,
        };
        let err = resolve(context).unwrap_err();
        assert!(matches!(err, CombinatorialError::CircularDependencyDetected { .. }));
    }
}
