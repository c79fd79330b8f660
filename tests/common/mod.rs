// SPDX-License-Identifier: MPL-2.0

//! Shared fake provider for the integration scenarios of §8.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use depsolve_core::provider::{Framework, Provider, ProviderError};
use depsolve_core::{LibraryDependency, LibraryIdentity, LibraryKind, LibraryRange, VersionRange};
use tokio_util::sync::CancellationToken;

/// A catalog entry: `(name, version, dependencies)`.
pub type CatalogEntry = (&'static str, &'static str, Vec<(&'static str, &'static str)>);

/// An in-memory provider with an artificial response delay, standing in for a real feed.
pub struct FakeProvider {
    pub delay_ms: u64,
    pub catalog: Vec<CatalogEntry>,
}

impl FakeProvider {
    pub fn new(delay_ms: u64, catalog: Vec<CatalogEntry>) -> Arc<dyn Provider> {
        Arc::new(Self { delay_ms, catalog })
    }
}

#[async_trait]
impl Provider for FakeProvider {
    async fn find_library(
        &self,
        range: &LibraryRange,
        _framework: &Framework,
        _cancel: &CancellationToken,
    ) -> Result<Option<LibraryIdentity>, ProviderError> {
        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }
        let found = self
            .catalog
            .iter()
            .find(|(n, v, _)| range.name.as_str().eq_ignore_ascii_case(n) && range.range.satisfies(&v.parse().unwrap()));
        Ok(found.map(|(n, v, _)| LibraryIdentity::new(*n, v.parse().unwrap(), LibraryKind::Package)))
    }

    async fn get_dependencies(
        &self,
        identity: &LibraryIdentity,
        _framework: &Framework,
        _cancel: &CancellationToken,
    ) -> Result<Vec<LibraryDependency>, ProviderError> {
        let found = self
            .catalog
            .iter()
            .find(|(n, v, _)| identity.name.as_str().eq_ignore_ascii_case(n) && *v == identity.version.to_string());
        let deps = found.map(|(_, _, deps)| deps.clone()).unwrap_or_default();
        Ok(deps
            .into_iter()
            .map(|(name, range)| LibraryDependency::new(LibraryRange::new(name, VersionRange::parse(range).unwrap())))
            .collect())
    }
}
