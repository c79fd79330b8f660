// SPDX-License-Identifier: MPL-2.0

//! The per-group preference order (§4.F "Preference comparator (`ResolverComparer`)"): decides
//! the search order candidates are tried in within a single id's group.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::identity::NormalizedName;

use super::ResolverPackage;

/// How to prefer among otherwise-tied candidate versions (§4.F "Inputs").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyBehavior {
    /// The minimum version wins.
    Lowest,
    /// Lowest major.minor; within that, the highest patch.
    HighestPatch,
    /// Lowest major; within that, highest minor, then patch.
    HighestMinor,
    /// The maximum version wins.
    Highest,
    /// Dependencies of chosen packages are not expanded; candidate preference falls back to
    /// `Lowest`.
    Ignore,
}

/// Orders candidates for a single id's group, most-preferred first, per the four-rule priority
/// of §4.F.
pub struct ResolverComparer<'a> {
    behavior: DependencyBehavior,
    preferred_versions: &'a HashMap<NormalizedName, version_ranges::Version>,
    required_ids: &'a HashSet<NormalizedName>,
}

impl<'a> ResolverComparer<'a> {
    pub fn new(
        behavior: DependencyBehavior,
        preferred_versions: &'a HashMap<NormalizedName, version_ranges::Version>,
        required_ids: &'a HashSet<NormalizedName>,
    ) -> Self {
        Self {
            behavior,
            preferred_versions,
            required_ids,
        }
    }

    /// `Less` means `a` is tried before `b`.
    pub fn compare(&self, a: &ResolverPackage, b: &ResolverPackage) -> Ordering {
        if let Some(order) = self.absent_rule(a, b) {
            return order;
        }
        if let Some(order) = self.preferred_version_rule(a, b) {
            return order;
        }
        // Both concrete past this point: the absent rule above returns early whenever either
        // side is absent.
        let (av, bv) = (a.version().unwrap(), b.version().unwrap());
        let behavior_order = match self.behavior {
            DependencyBehavior::Lowest | DependencyBehavior::Ignore => av.cmp(bv),
            DependencyBehavior::Highest => bv.cmp(av),
            DependencyBehavior::HighestPatch => (av.major(), av.minor())
                .cmp(&(bv.major(), bv.minor()))
                .then_with(|| bv.patch().cmp(&av.patch())),
            DependencyBehavior::HighestMinor => av
                .major()
                .cmp(&bv.major())
                .then_with(|| bv.minor().cmp(&av.minor()))
                .then_with(|| bv.patch().cmp(&av.patch())),
        };
        if behavior_order != Ordering::Equal {
            return behavior_order;
        }
        self.final_tiebreak(a, b)
    }

    fn absent_rule(&self, a: &ResolverPackage, b: &ResolverPackage) -> Option<Ordering> {
        match (a.is_absent(), b.is_absent()) {
            (true, true) => Some(Ordering::Equal),
            (false, false) => None,
            (a_absent, _) => {
                let id = a.name();
                let non_absent_wins = !self.required_ids.contains(id) && self.behavior != DependencyBehavior::Ignore;
                Some(if non_absent_wins {
                    if a_absent {
                        Ordering::Greater
                    } else {
                        Ordering::Less
                    }
                } else if a_absent {
                    Ordering::Less
                } else {
                    Ordering::Greater
                })
            }
        }
    }

    fn preferred_version_rule(&self, a: &ResolverPackage, b: &ResolverPackage) -> Option<Ordering> {
        let preferred = self.preferred_versions.get(a.name())?;
        let a_matches = a.version() == Some(preferred);
        let b_matches = b.version() == Some(preferred);
        match (a_matches, b_matches) {
            (true, false) => Some(Ordering::Less),
            (false, true) => Some(Ordering::Greater),
            _ => None,
        }
    }

    fn final_tiebreak(&self, a: &ResolverPackage, b: &ResolverPackage) -> Ordering {
        let listed = |pkg: &ResolverPackage| matches!(pkg, ResolverPackage::Concrete(info) if info.listed);
        match (listed(a), listed(b)) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => a.name().cmp(b.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinatorial::SourcePackageDependencyInfo;

    fn concrete(version: &str, listed: bool) -> ResolverPackage {
        ResolverPackage::Concrete(SourcePackageDependencyInfo {
            name: "P".into(),
            version: version.parse().unwrap(),
            dependencies: Vec::new(),
            listed,
        })
    }

    #[test]
    fn highest_behavior_prefers_maximum_version() {
        let preferred = HashMap::new();
        let required = HashSet::new();
        let comparer = ResolverComparer::new(DependencyBehavior::Highest, &preferred, &required);
        let low = concrete("1.0.0", true);
        let high = concrete("2.0.0", true);
        assert_eq!(comparer.compare(&high, &low), Ordering::Less);
    }

    #[test]
    fn preferred_version_outranks_behavior() {
        let mut preferred = HashMap::new();
        preferred.insert(NormalizedName::from("P"), "1.0.0".parse().unwrap());
        let required = HashSet::new();
        let comparer = ResolverComparer::new(DependencyBehavior::Highest, &preferred, &required);
        let preferred_candidate = concrete("1.0.0", true);
        let higher_unpreferred = concrete("2.0.0", true);
        assert_eq!(comparer.compare(&preferred_candidate, &higher_unpreferred), Ordering::Less);
    }

    #[test]
    fn absent_loses_to_concrete_for_non_required_id_unless_ignore() {
        let preferred = HashMap::new();
        let required = HashSet::new();
        let comparer = ResolverComparer::new(DependencyBehavior::Highest, &preferred, &required);
        let present = concrete("1.0.0", true);
        let absent = ResolverPackage::Absent("P".into());
        assert_eq!(comparer.compare(&present, &absent), Ordering::Less);

        let ignore_comparer = ResolverComparer::new(DependencyBehavior::Ignore, &preferred, &required);
        assert_eq!(ignore_comparer.compare(&absent, &present), Ordering::Less);
    }
}
