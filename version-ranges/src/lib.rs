// SPDX-License-Identifier: MPL-2.0

//! Four-part semantic versions and interval version ranges.
//!
//! This crate is the version/range algebra underlying a package dependency resolver: parsing,
//! total ordering, interval membership (`satisfies`), and envelope combination (`combine`) of
//! version ranges. It has no knowledge of packages, providers, or graphs — see the `depsolve-core`
//! crate in the same workspace for that.

mod range;
mod version;

pub use range::{best_match, Bound, RangeParseError, VersionRange};
pub use version::{Version, VersionParseError};
