// SPDX-License-Identifier: MPL-2.0

//! The typed error surface returned to callers (§6.5, §7).
//!
//! Transient provider errors never reach this enum — the walker retries once and then treats a
//! persistent failure as "no match" (§4.D Failure model). Everything below is either an input
//! mistake, an unsatisfiable constraint set, or a fatal condition (non-convergence,
//! cancellation).

use crate::diagnostic::Diagnostic;
use crate::identity::NormalizedName;

/// Errors surfaced by [`crate::session::ResolverSession`] and the combinatorial
/// [`crate::combinatorial::resolve`] entry point.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// A required id in the resolve request has no corresponding entry anywhere in
    /// `available_packages`.
    #[error("required package {0} has no available versions")]
    UnknownRequiredId(NormalizedName),

    /// A version range string failed to parse.
    #[error("malformed version range: {0}")]
    MalformedRange(#[from] version_ranges::RangeParseError),

    /// `dependency_behavior` was `Ignore` while `preferred_versions` named an id not present in
    /// `required_ids`, or some other combination of caller options that cannot be jointly
    /// honored.
    #[error("inconsistent resolver configuration: {0}")]
    InconsistentBehavior(String),

    /// No assignment exists satisfying every constraint. Carries the human-readable explanation
    /// produced by the diagnostic engine (§4.G).
    #[error("{0}")]
    NoSolution(Diagnostic),

    /// The graph conflict-resolution fixpoint left at least one `Rejected` node whose accepted
    /// replacement does not satisfy that node's requested range.
    #[error("{0}")]
    ConflictResolutionFailed(Diagnostic),

    /// The combinatorial search found a complete assignment, but it contains a dependency cycle.
    #[error("circular dependency detected: {}", cycle.iter().map(NormalizedName::as_str).collect::<Vec<_>>().join(" -> "))]
    CircularDependencyDetected {
        /// The ids forming the cycle, in traversal order.
        cycle: Vec<NormalizedName>,
    },

    /// The conflict-resolution fixpoint did not stabilize within the 1000-iteration patience
    /// bound (§4.E.2).
    #[error("conflict resolution did not converge within the iteration patience bound")]
    ResolutionDidNotConverge,

    /// The caller's cancellation token fired before the walk completed.
    #[error("resolution was cancelled")]
    Cancelled,

    /// A provider failed persistently (after retry) for a lookup required by a non-optional
    /// edge, with no other provider able to supply it.
    #[error("provider failed to resolve required library {0}: {1}")]
    Provider(NormalizedName, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circular_dependency_message_lists_the_cycle_in_order() {
        let err = ResolveError::CircularDependencyDetected {
            cycle: vec!["A".into(), "B".into(), "A".into()],
        };
        assert_eq!(err.to_string(), "circular dependency detected: A -> B -> A");
    }
}
