//! Client for a package-search service
//!
//! Keyword search over an index of JVM packages that, unlike the central
//! search, also reports descriptions and authors.
//!
//! - **Endpoint**: `GET <base>/api/search/packages?query=<text>&onlyMpp=false`
//! - **Response**: `{ "packages": [ { "group_id", "artifact_id", "description",
//!   "latest_version": { "version" }, "authors": [ { "name" } ] } ] }`
//!
//! The first listed author is reported as the publisher.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use super::{SearchOrigin, SearchResult, SearchSource, ensure_success, non_blank};
use crate::error::RegistryError;
use crate::model::Coordinate;

const SOURCE_NAME: &str = "package-search";

pub struct PackageSearch {
    client: Arc<Client>,
    base_url: String,
}

impl PackageSearch {
    pub fn new(client: Arc<Client>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    packages: Vec<PackageEntry>,
}

#[derive(Debug, Deserialize)]
struct PackageEntry {
    group_id: String,
    artifact_id: String,
    description: Option<String>,
    latest_version: Option<LatestVersion>,
    #[serde(default)]
    authors: Vec<Author>,
    versions_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct LatestVersion {
    version: String,
}

#[derive(Debug, Deserialize)]
struct Author {
    name: Option<String>,
}

impl From<PackageEntry> for SearchResult {
    fn from(entry: PackageEntry) -> Self {
        let publisher = entry
            .authors
            .iter()
            .find_map(|author| non_blank(author.name.as_deref()));
        SearchResult {
            coordinate: Coordinate::new(entry.group_id, entry.artifact_id),
            latest_version: non_blank(entry.latest_version.as_ref().map(|v| v.version.as_str())),
            description: non_blank(entry.description.as_deref()),
            publisher,
            version_count: entry.versions_count,
            origin: SearchOrigin::PackageRegistry,
        }
    }
}

#[async_trait]
impl SearchSource for PackageSearch {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn search(&self, query: &str, limit: usize) -> anyhow::Result<Vec<SearchResult>> {
        let url = Url::parse_with_params(
            &format!("{}/api/search/packages", self.base_url),
            &[("query", query.trim()), ("onlyMpp", "false")],
        )?;
        let response = self.client.get(url).send().await?;
        ensure_success(SOURCE_NAME, query, &response)?;

        let body = response.text().await?;
        let parsed: SearchResponse =
            serde_json::from_str(&body).map_err(|e| RegistryError::Malformed {
                source_name: SOURCE_NAME,
                target: query.to_string(),
                reason: e.to_string(),
            })?;

        Ok(parsed
            .packages
            .into_iter()
            .take(limit)
            .map(SearchResult::from)
            .collect())
    }
}
