//! Upstream lookups for latest versions and free-text search.
//!
//! Every source answers `Ok(None)` when it has nothing to say about a
//! coordinate and `Err` when it could not be asked. The resolver treats both
//! the same way ("no update known") but logs the second.

pub mod http_client;
pub mod maven_central;
pub mod maven_repository;
pub mod package_search;
pub mod plugin_portal;
pub mod version_utils;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::Coordinate;

/// Which endpoint produced a search hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchOrigin {
    CentralSearch,
    PackageRegistry,
}

/// One hit of a keyword search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub coordinate: Coordinate,
    pub latest_version: Option<String>,
    pub description: Option<String>,
    pub publisher: Option<String>,
    /// Number of published versions, when the endpoint reports it
    pub version_count: Option<u32>,
    pub origin: SearchOrigin,
}

/// Latest published version of a Maven artifact.
#[async_trait]
pub trait VersionSource: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &str;

    async fn latest_version(&self, coordinate: &Coordinate) -> anyhow::Result<Option<String>>;
}

/// Latest published version of a Gradle plugin.
#[async_trait]
pub trait PluginSource: Send + Sync {
    fn name(&self) -> &str;

    async fn latest_plugin_version(&self, plugin_id: &str) -> anyhow::Result<Option<String>>;
}

/// Keyword search returning package metadata.
#[async_trait]
pub trait SearchSource: Send + Sync {
    fn name(&self) -> &str;

    async fn search(&self, query: &str, limit: usize) -> anyhow::Result<Vec<SearchResult>>;
}

/// Fail with [`RegistryError::Status`](crate::error::RegistryError::Status) unless the response is a 2xx.
pub(crate) fn ensure_success(
    source_name: &'static str,
    target: &str,
    response: &reqwest::Response,
) -> Result<(), crate::error::RegistryError> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(crate::error::RegistryError::Status {
            source_name,
            target: target.to_string(),
            status: status.as_u16(),
        })
    }
}

/// Non-blank trimmed text, or `None`.
pub(crate) fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
