// SPDX-License-Identifier: MPL-2.0

//! A package dependency resolver core: a remote dependency walker that builds a graph by racing
//! metadata providers, a graph conflict resolver that trims cycles and downgrades with a
//! nearest-wins fixpoint, and a combinatorial resolver that finds a single-version-per-id install
//! plan via ordered search with pairwise rejection.
//!
//! # Remote dependency walker
//!
//! [`graph::walk`] builds a [`graph::Graph`] from a root [`identity::LibraryRange`], consulting a
//! chain of [`provider::Provider`]s. Providers race concurrently per library lookup; the first
//! exact match wins outright, otherwise the highest version among all responses is kept.
//!
//! ```no_run
//! # use depsolve_core::graph::WalkContext;
//! # use depsolve_core::identity::LibraryRange;
//! # use depsolve_core::provider::{Framework, UniversalFrameworkOracle, Provider};
//! # use tokio_util::sync::CancellationToken;
//! # use std::sync::Arc;
//! # async fn example(providers: Vec<Arc<dyn Provider>>) -> Result<(), Box<dyn std::error::Error>> {
//! let oracle = UniversalFrameworkOracle;
//! let ctx = WalkContext::new(&providers, Framework("net8.0".into()), &oracle, None, CancellationToken::new());
//! let target = LibraryRange::new("Newtonsoft.Json", version_ranges::VersionRange::any());
//! let graph = depsolve_core::graph::walk(target, &ctx).await?;
//! # let _ = graph;
//! # Ok(())
//! # }
//! ```
//!
//! # Graph conflict resolution
//!
//! Once a graph is built, [`graph::check_cycle_and_nearest_wins`] detaches cyclic and downgraded
//! nodes, and [`graph::try_resolve_conflicts`] runs the three-pass fixpoint that classifies every
//! remaining node as `Accepted` or `Rejected`.
//!
//! # Combinatorial resolver
//!
//! [`combinatorial::resolve`] takes a flat catalog of available packages and produces a single
//! topologically sorted install plan, or a [`diagnostic::Diagnostic`] explaining why none exists.
//!
//! # Errors
//!
//! Every public entry point returns [`error::ResolveError`], whose `NoSolution` and
//! `ConflictResolutionFailed` variants carry a [`diagnostic::Diagnostic`] — the one human-readable
//! explanation a caller should show, per the diagnostic engine's priority rules (§4.G).

#![warn(missing_docs)]

pub mod combinatorial;
pub mod diagnostic;
pub mod error;
pub mod graph;
pub mod identity;
pub mod provider;
pub mod session;

mod cache;
mod internal;

pub use error::ResolveError;
pub use identity::{KindRestriction, LibraryDependency, LibraryIdentity, LibraryKind, LibraryRange, NormalizedName};
pub use version_ranges::{Version, VersionRange};
