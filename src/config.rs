//! Configuration management for jvm-deps
//!
//! Looked up in order: `jvm-deps.toml` in the project root, then
//! `<config dir>/jvm-deps/config.toml`, then built-in defaults. A file that
//! cannot be read or parsed is reported and skipped.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Default cache TTL (1 hour)
const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

/// Default search cache TTL (5 minutes)
const DEFAULT_SEARCH_TTL_SECS: u64 = 300;

pub const PROJECT_CONFIG_FILE: &str = "jvm-deps.toml";

pub const DEFAULT_CENTRAL_SEARCH: &str = "https://search.maven.org";
pub const DEFAULT_FALLBACK_REPOSITORY: &str = "https://repo1.maven.org/maven2";
pub const DEFAULT_PLUGIN_PORTAL: &str = "https://plugins.gradle.org";
pub const DEFAULT_PACKAGE_SEARCH: &str = "https://package-search.services.jetbrains.com";

/// Tool configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Cache configuration
    pub cache: CacheConfig,
    /// HTTP client configuration
    pub http: HttpConfig,
    /// Update resolution configuration
    pub resolver: ResolverConfig,
    /// Project-configured Maven repositories, tried in order before the fallback
    pub repositories: Vec<String>,
    /// Upstream base URLs
    pub endpoints: EndpointsConfig,
    /// Coordinates to leave out of update checks (`*` matches any run of characters)
    pub ignore: Vec<String>,
}

/// Cache configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Version lookup TTL in seconds
    pub ttl_secs: u64,
    /// Free-text search TTL in seconds
    pub search_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_CACHE_TTL_SECS,
            search_ttl_secs: DEFAULT_SEARCH_TTL_SECS,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn search_ttl(&self) -> Duration {
        Duration::from_secs(self.search_ttl_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            connect_timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Coordinates looked up at the same time
    pub concurrency: usize,
    /// Offer a qualified latest version (`2.0-RC1`) for a stable installed one
    pub include_prereleases: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            include_prereleases: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    pub central_search: String,
    pub fallback_repository: String,
    pub plugin_portal: String,
    /// Keyword search endpoint; empty disables it
    pub package_search: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            central_search: DEFAULT_CENTRAL_SEARCH.to_string(),
            fallback_repository: DEFAULT_FALLBACK_REPOSITORY.to_string(),
            plugin_portal: DEFAULT_PLUGIN_PORTAL.to_string(),
            package_search: DEFAULT_PACKAGE_SEARCH.to_string(),
        }
    }
}

impl Config {
    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load the configuration that applies to `project_root`.
    pub fn load(project_root: &Path) -> Self {
        let candidates = [
            Some(project_root.join(PROJECT_CONFIG_FILE)),
            user_config_path(),
        ];
        for path in candidates.into_iter().flatten() {
            if !path.is_file() {
                continue;
            }
            match std::fs::read_to_string(&path) {
                Ok(content) => match Self::from_toml(&content) {
                    Ok(config) => {
                        tracing::debug!("Loaded configuration from {}", path.display());
                        return config;
                    }
                    Err(e) => tracing::warn!("Ignoring invalid config {}: {}", path.display(), e),
                },
                Err(e) => tracing::warn!("Cannot read config {}: {}", path.display(), e),
            }
        }
        Self::default()
    }

    /// Whether update checks skip `coordinate` (`group:artifact`).
    pub fn is_ignored(&self, coordinate: &str) -> bool {
        matches_any(&self.ignore, coordinate)
    }
}

/// Whether any of the `*` patterns matches `coordinate`.
pub fn matches_any(patterns: &[String], coordinate: &str) -> bool {
    patterns
        .iter()
        .any(|pattern| wildcard_match(pattern, coordinate))
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("jvm-deps").join("config.toml"))
}

/// Match `text` against `pattern` where `*` stands for any run of characters.
fn wildcard_match(pattern: &str, text: &str) -> bool {
    let mut parts = pattern.split('*');
    let Some(first) = parts.next() else {
        return text.is_empty();
    };
    let Some(mut rest) = text.strip_prefix(first) else {
        return false;
    };
    let tail: Vec<&str> = parts.collect();
    let Some((last, middle)) = tail.split_last() else {
        // No `*` at all
        return rest.is_empty();
    };
    for part in middle {
        match rest.find(part) {
            Some(pos) => rest = &rest[pos + part.len()..],
            None => return false,
        }
    }
    rest.len() >= last.len() && rest.ends_with(last)
}
