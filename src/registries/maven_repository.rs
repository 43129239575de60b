//! Client for a plain Maven repository layout
//!
//! Reads `<base>/<group as path>/<artifact>/maven-metadata.xml` and picks the
//! newest version: `<release>`, then `<latest>`, then the highest entry of
//! `<versions>`. Used for every project-configured repository and for the
//! public fallback registry.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use super::version_utils::highest;
use super::{VersionSource, ensure_success, non_blank};
use crate::error::RegistryError;
use crate::model::Coordinate;
use crate::parsers::maven::parse_tree;

const SOURCE_NAME: &str = "maven-repository";

pub struct MavenRepository {
    client: Arc<Client>,
    base_url: String,
}

impl MavenRepository {
    pub fn new(client: Arc<Client>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn metadata_url(&self, coordinate: &Coordinate) -> String {
        format!(
            "{}/{}/{}/maven-metadata.xml",
            self.base_url,
            coordinate.group.replace('.', "/"),
            coordinate.artifact
        )
    }
}

/// Newest version named by a `maven-metadata.xml` document.
pub fn latest_from_metadata(xml: &str) -> Result<Option<String>, String> {
    let root = parse_tree(xml).map_err(|e| e.to_string())?;
    let Some(versioning) = root.child("versioning") else {
        return Ok(None);
    };

    for field in ["release", "latest"] {
        if let Some(version) = non_blank(versioning.child_text(xml, field).as_deref()) {
            return Ok(Some(version));
        }
    }

    let listed: Vec<String> = versioning
        .child("versions")
        .map(|versions| {
            versions
                .children_named("version")
                .filter_map(|v| v.text(xml))
                .collect()
        })
        .unwrap_or_default();
    Ok(highest(listed.iter().map(String::as_str)).map(str::to_string))
}

#[async_trait]
impl VersionSource for MavenRepository {
    fn name(&self) -> &str {
        &self.base_url
    }

    async fn latest_version(&self, coordinate: &Coordinate) -> anyhow::Result<Option<String>> {
        let url = self.metadata_url(coordinate);
        tracing::debug!("Fetching {}", url);
        let response = self.client.get(&url).send().await?;

        // A repository that does not host the artifact is not a failure.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        ensure_success(SOURCE_NAME, &url, &response)?;

        let body = response.text().await?;
        latest_from_metadata(&body).map_err(|reason| {
            RegistryError::Malformed {
                source_name: SOURCE_NAME,
                target: url,
                reason,
            }
            .into()
        })
    }
}
