//! # Maven Central Search Client
//!
//! Queries the Solr-backed search API in front of Maven Central. It answers
//! "latest version of `group:artifact`" from its index without fetching any
//! descriptor, which makes it the first stop for every artifact lookup.
//!
//! ## API Details
//!
//! - **Base URL**: `https://search.maven.org` (configurable)
//! - **Endpoint**: `GET /solrsearch/select?q=...&rows=N&wt=json`
//! - **Authentication**: None
//!
//! ## Queries
//!
//! - **Coordinate**: `q=g:"<group>" AND a:"<artifact>"`, one row
//! - **Keyword**: `q=<text>`, up to `limit` rows
//!
//! ## Response Parsing
//!
//! ```text
//! { "response": { "numFound": 1,
//!     "docs": [ { "g": "...", "a": "...", "latestVersion": "1.2.3", "versionCount": 12 } ] } }
//! ```
//!
//! - `numFound == 0` is a valid answer: the coordinate is not indexed
//! - Some documents carry `v` instead of `latestVersion` (gav-core queries)
//!
//! ## Edge Cases and Quirks
//!
//! - The index lags behind the repository by a few hours after a release
//! - Artifacts only published to other repositories are never found here

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use super::{SearchOrigin, SearchResult, SearchSource, VersionSource, ensure_success, non_blank};
use crate::error::RegistryError;
use crate::model::Coordinate;

const SOURCE_NAME: &str = "maven-central-search";

/// Client for the Maven Central search API
pub struct MavenCentralSearch {
    client: Arc<Client>,
    base_url: String,
}

impl MavenCentralSearch {
    pub fn new(client: Arc<Client>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn http_client(&self) -> Arc<Client> {
        Arc::clone(&self.client)
    }

    fn select_url(&self, query: &str, rows: usize) -> anyhow::Result<Url> {
        let url = Url::parse_with_params(
            &format!("{}/solrsearch/select", self.base_url),
            &[("q", query), ("rows", &rows.to_string()), ("wt", "json")],
        )?;
        Ok(url)
    }

    async fn select(&self, query: &str, rows: usize) -> anyhow::Result<SolrResponse> {
        let url = self.select_url(query, rows)?;
        tracing::debug!("Central search: {}", url);
        let response = self.client.get(url).send().await?;
        ensure_success(SOURCE_NAME, query, &response)?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            RegistryError::Malformed {
                source_name: SOURCE_NAME,
                target: query.to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }
}

// API response structures
#[derive(Debug, Deserialize)]
struct SolrResponse {
    response: SolrBody,
}

#[derive(Debug, Deserialize)]
struct SolrBody {
    #[serde(rename = "numFound", default)]
    num_found: u64,
    #[serde(default)]
    docs: Vec<SolrDoc>,
}

#[derive(Debug, Deserialize)]
struct SolrDoc {
    g: String,
    a: String,
    #[serde(rename = "latestVersion")]
    latest_version: Option<String>,
    v: Option<String>,
    #[serde(rename = "versionCount")]
    version_count: Option<u32>,
}

impl SolrDoc {
    fn version(&self) -> Option<String> {
        non_blank(self.latest_version.as_deref().or(self.v.as_deref()))
    }
}

#[async_trait]
impl VersionSource for MavenCentralSearch {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn latest_version(&self, coordinate: &Coordinate) -> anyhow::Result<Option<String>> {
        let query = format!("g:\"{}\" AND a:\"{}\"", coordinate.group, coordinate.artifact);
        let body = self.select(&query, 1).await?.response;
        if body.num_found == 0 {
            return Ok(None);
        }
        // The index matches tokens, so double-check the document is the one asked for.
        Ok(body
            .docs
            .iter()
            .find(|doc| doc.g == coordinate.group && doc.a == coordinate.artifact)
            .and_then(SolrDoc::version))
    }
}

#[async_trait]
impl SearchSource for MavenCentralSearch {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn search(&self, query: &str, limit: usize) -> anyhow::Result<Vec<SearchResult>> {
        let body = self.select(query.trim(), limit).await?.response;
        Ok(body
            .docs
            .into_iter()
            .map(|doc| SearchResult {
                latest_version: doc.version(),
                version_count: doc.version_count,
                coordinate: Coordinate::new(doc.g, doc.a),
                description: None,
                publisher: None,
                origin: SearchOrigin::CentralSearch,
            })
            .collect())
    }
}
