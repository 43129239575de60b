//! # Gradle Plugin Portal Client
//!
//! The portal has no JSON API for "latest version of plugin X", so the
//! plugin's page (`GET <base>/plugin/<id>`) is scraped. Several extraction
//! strategies run in order and the first one yielding a non-blank version
//! wins:
//!
//! 1. **Badge**: the element carrying the `latest-version` class
//! 2. **Heading**: an `<h3>Version x.y.z ...</h3>` heading
//! 3. **Code sample**: the first `<code>`/`<pre>` block with a `version "x"` literal
//! 4. **Meta description**: a `version x.y.z` mention in `<meta name="description">`
//!
//! Markup changes on the portal degrade to `Ok(None)`; only transport errors
//! and non-2xx answers other than 404 are errors.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, StatusCode};

use super::{PluginSource, ensure_success, non_blank};

const SOURCE_NAME: &str = "gradle-plugin-portal";

type Strategy = fn(&str) -> Option<String>;

/// Extraction strategies, most specific first.
const STRATEGIES: &[(&str, Strategy)] = &[
    ("badge", from_badge),
    ("heading", from_heading),
    ("code sample", from_code_sample),
    ("meta description", from_meta_description),
];

pub struct PluginPortal {
    client: Arc<Client>,
    base_url: String,
}

impl PluginPortal {
    pub fn new(client: Arc<Client>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn http_client(&self) -> Arc<Client> {
        Arc::clone(&self.client)
    }
}

/// Run the strategies over a plugin page.
pub fn extract_version(html: &str) -> Option<String> {
    STRATEGIES.iter().find_map(|(label, strategy)| {
        let version = strategy(html)?;
        tracing::trace!("Plugin version found by {} strategy", label);
        Some(version)
    })
}

fn from_badge(html: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r#"class="[^"]*\blatest-version\b[^"]*"[^>]*>([^<]*)<"#).expect("valid regex")
    });
    let text = re.captures(html)?.get(1)?.as_str();
    non_blank(Some(text.trim().trim_start_matches("Version").trim()))
}

fn from_heading(html: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?i)<h3[^>]*>\s*version\s+([0-9][^\s<(]*)").expect("valid regex")
    });
    non_blank(re.captures(html)?.get(1).map(|m| m.as_str()))
}

fn from_code_sample(html: &str) -> Option<String> {
    static BLOCK: OnceLock<Regex> = OnceLock::new();
    static VERSION: OnceLock<Regex> = OnceLock::new();
    let block = BLOCK.get_or_init(|| {
        Regex::new(r"(?s)<(code|pre)[^>]*>(.*?)</(?:code|pre)>").expect("valid regex")
    });
    let version = VERSION.get_or_init(|| {
        Regex::new(r#"version\s*(?:=\s*)?["']([^"'\s]+)["']"#).expect("valid regex")
    });

    block.captures_iter(html).find_map(|caps| {
        let raw = caps.get(2)?.as_str();
        let text = quick_xml::escape::unescape(raw)
            .map(|t| t.into_owned())
            .unwrap_or_else(|_| raw.to_string());
        non_blank(version.captures(&text)?.get(1).map(|m| m.as_str()))
    })
}

fn from_meta_description(html: &str) -> Option<String> {
    static META: OnceLock<Regex> = OnceLock::new();
    static VERSION: OnceLock<Regex> = OnceLock::new();
    let meta = META.get_or_init(|| {
        Regex::new(r#"(?i)<meta\s+name="description"\s+content="([^"]*)""#).expect("valid regex")
    });
    let version = VERSION.get_or_init(|| {
        Regex::new(r"(?i)\bversion\s+([0-9][0-9A-Za-z.\-+]*[0-9A-Za-z])").expect("valid regex")
    });
    let content = meta.captures(html)?.get(1)?.as_str();
    non_blank(version.captures(content)?.get(1).map(|m| m.as_str()))
}

#[async_trait]
impl PluginSource for PluginPortal {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn latest_plugin_version(&self, plugin_id: &str) -> anyhow::Result<Option<String>> {
        let url = format!("{}/plugin/{}", self.base_url, plugin_id);
        let response = self.client.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        ensure_success(SOURCE_NAME, plugin_id, &response)?;

        let html = response.text().await?;
        let version = extract_version(&html);
        if version.is_none() {
            tracing::debug!("No version found on plugin page for {}", plugin_id);
        }
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;
    use crate::registries::http_client::create_shared_client;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_badge_strategy() {
        let html = r#"<div><span class="badge latest-version">Version 1.9.24</span>
            <h3>Version 1.0 (old)</h3></div>"#;
        assert_eq!(extract_version(html).as_deref(), Some("1.9.24"));
    }

    #[test]
    fn test_blank_badge_falls_through_to_heading() {
        let html = r#"<span class="latest-version">  </span><h3>Version 8.0.1 (latest)</h3>"#;
        assert_eq!(extract_version(html).as_deref(), Some("8.0.1"));
    }

    #[test]
    fn test_code_sample_strategy() {
        let html = r#"<pre>plugins {
  id(&quot;com.github.ben-manes.versions&quot;) version &quot;0.51.0&quot;
}</pre>"#;
        assert_eq!(extract_version(html).as_deref(), Some("0.51.0"));
    }

    #[test]
    fn test_code_sample_skips_blocks_without_version() {
        let html = "<code>apply plugin: 'x'</code><code>id 'x' version '2.3'</code>";
        assert_eq!(from_code_sample(html).as_deref(), Some("2.3"));
    }

    #[test]
    fn test_meta_description_strategy() {
        let html = r#"<head><meta name="description" content="Latest version 3.4.0-beta. Adds tasks."></head>"#;
        assert_eq!(extract_version(html).as_deref(), Some("3.4.0-beta"));
    }

    #[test]
    fn test_no_strategy_matches() {
        assert_eq!(extract_version("<html><body>Nothing here</body></html>"), None);
    }

    #[tokio::test]
    async fn test_fetch_plugin_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/plugin/org.jetbrains.kotlin.jvm"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("<h3>Version 2.0.0 (latest)</h3>"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let portal = PluginPortal::new(
            create_shared_client(&HttpConfig::default()).unwrap(),
            server.uri(),
        );
        let latest = portal
            .latest_plugin_version("org.jetbrains.kotlin.jvm")
            .await
            .unwrap();
        assert_eq!(latest.as_deref(), Some("2.0.0"));
    }

    #[tokio::test]
    async fn test_unknown_plugin_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let portal = PluginPortal::new(
            create_shared_client(&HttpConfig::default()).unwrap(),
            server.uri(),
        );
        assert_eq!(portal.latest_plugin_version("no.such.plugin").await.unwrap(), None);
    }
}
