//! Update resolution: cached latest-version lookups over an ordered chain of
//! upstream sources.
//!
//! Artifacts are looked up in the central search index first, then in every
//! project-configured repository in order, then in the public fallback
//! repository. Plugins go to the plugin portal first and then to the project
//! repositories through their marker artifact. The first source with an
//! answer wins; a source that fails is logged and skipped. When nobody
//! answers, the `None` is cached like a real answer so an unreachable
//! upstream is not asked again before the entry expires.

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::cache::{Clock, MemoryCache, ReadCache, SystemClock, WriteCache};
use crate::config::{Config, ResolverConfig, matches_any};
use crate::file_types::LookupKind;
use crate::model::{Coordinate, DependencyUpdate, InstalledDependency, InstalledPlugin, PluginUpdate};
use crate::registries::http_client::create_shared_client;
use crate::registries::maven_central::MavenCentralSearch;
use crate::registries::maven_repository::MavenRepository;
use crate::registries::package_search::PackageSearch;
use crate::registries::plugin_portal::PluginPortal;
use crate::registries::version_utils::{is_newer, is_prerelease};
use crate::registries::{PluginSource, SearchResult, SearchSource, VersionSource};

/// Cached latest-version lookups shared by every caller of one run.
///
/// Cloning is cheap; clones share caches and sources.
#[derive(Clone)]
pub struct UpdateResolver {
    versions: MemoryCache<Option<String>>,
    searches: MemoryCache<Vec<SearchResult>>,
    artifact_sources: Arc<Vec<Arc<dyn VersionSource>>>,
    marker_sources: Arc<Vec<Arc<dyn VersionSource>>>,
    plugin_sources: Arc<Vec<Arc<dyn PluginSource>>>,
    search_sources: Arc<Vec<Arc<dyn SearchSource>>>,
    settings: ResolverConfig,
    ignore: Arc<Vec<String>>,
}

impl UpdateResolver {
    /// Resolver with the given caches and no upstream sources.
    pub fn new(
        versions: MemoryCache<Option<String>>,
        searches: MemoryCache<Vec<SearchResult>>,
    ) -> Self {
        Self {
            versions,
            searches,
            artifact_sources: Arc::new(Vec::new()),
            marker_sources: Arc::new(Vec::new()),
            plugin_sources: Arc::new(Vec::new()),
            search_sources: Arc::new(Vec::new()),
            settings: ResolverConfig::default(),
            ignore: Arc::new(Vec::new()),
        }
    }

    /// Resolver wired to the endpoints and repositories of `config`.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::from_config_with_clock(config, Arc::new(SystemClock))
    }

    pub fn from_config_with_clock(config: &Config, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        let client = create_shared_client(&config.http)?;
        let endpoints = &config.endpoints;

        let central = Arc::new(MavenCentralSearch::new(
            Arc::clone(&client),
            endpoints.central_search.as_str(),
        ));
        let repositories: Vec<Arc<MavenRepository>> = config
            .repositories
            .iter()
            .map(|url| Arc::new(MavenRepository::new(Arc::clone(&client), url.as_str())))
            .collect();
        let fallback = Arc::new(MavenRepository::new(
            Arc::clone(&client),
            endpoints.fallback_repository.as_str(),
        ));

        let mut resolver = Self::new(
            MemoryCache::with_clock(config.cache.ttl(), Arc::clone(&clock)),
            MemoryCache::with_clock(config.cache.search_ttl(), clock),
        )
        .with_settings(config.resolver.clone(), config.ignore.clone())
        .with_artifact_source(central.clone())
        .with_search_source(central);

        for repository in &repositories {
            if repository.base_url() == fallback.base_url() {
                continue;
            }
            resolver = resolver
                .with_artifact_source(repository.clone())
                .with_marker_source(repository.clone());
        }
        resolver = resolver
            .with_artifact_source(fallback)
            .with_plugin_source(Arc::new(PluginPortal::new(
                Arc::clone(&client),
                endpoints.plugin_portal.as_str(),
            )));

        if !endpoints.package_search.trim().is_empty() {
            resolver = resolver.with_search_source(Arc::new(PackageSearch::new(
                client,
                endpoints.package_search.as_str(),
            )));
        }
        Ok(resolver)
    }

    /// Append a source to the artifact chain.
    pub fn with_artifact_source(mut self, source: Arc<dyn VersionSource>) -> Self {
        Arc::make_mut(&mut self.artifact_sources).push(source);
        self
    }

    /// Append a repository consulted for plugin marker artifacts.
    pub fn with_marker_source(mut self, source: Arc<dyn VersionSource>) -> Self {
        Arc::make_mut(&mut self.marker_sources).push(source);
        self
    }

    pub fn with_plugin_source(mut self, source: Arc<dyn PluginSource>) -> Self {
        Arc::make_mut(&mut self.plugin_sources).push(source);
        self
    }

    pub fn with_search_source(mut self, source: Arc<dyn SearchSource>) -> Self {
        Arc::make_mut(&mut self.search_sources).push(source);
        self
    }

    pub fn with_settings(mut self, settings: ResolverConfig, ignore: Vec<String>) -> Self {
        self.settings = settings;
        self.ignore = Arc::new(ignore);
        self
    }

    /// Latest published version of an artifact, `None` when unknown.
    pub async fn latest_version(&self, coordinate: &Coordinate) -> Option<String> {
        let key = LookupKind::artifact_key(coordinate);
        if let Some(cached) = self.versions.get(&key) {
            tracing::debug!("Cache hit for {}", key);
            return cached;
        }
        tracing::debug!("Cache miss for {}", key);

        let mut latest = None;
        for source in self.artifact_sources.iter() {
            match source.latest_version(coordinate).await {
                Ok(Some(version)) => {
                    tracing::debug!("{} answered {} for {}", source.name(), version, coordinate);
                    latest = Some(version);
                    break;
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("{} failed for {}: {:#}", source.name(), coordinate, e),
            }
        }

        self.versions.insert(key, latest.clone());
        latest
    }

    /// Latest published version of a Gradle plugin, `None` when unknown.
    pub async fn latest_plugin_version(&self, plugin_id: &str) -> Option<String> {
        let key = LookupKind::Plugin.cache_key(plugin_id);
        if let Some(cached) = self.versions.get(&key) {
            tracing::debug!("Cache hit for {}", key);
            return cached;
        }

        let mut latest = None;
        for source in self.plugin_sources.iter() {
            match source.latest_plugin_version(plugin_id).await {
                Ok(Some(version)) => {
                    latest = Some(version);
                    break;
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("{} failed for {}: {:#}", source.name(), plugin_id, e),
            }
        }
        if latest.is_none() {
            let marker = Coordinate::plugin_marker(plugin_id);
            for source in self.marker_sources.iter() {
                match source.latest_version(&marker).await {
                    Ok(Some(version)) => {
                        latest = Some(version);
                        break;
                    }
                    Ok(None) => {}
                    Err(e) => tracing::warn!("{} failed for {}: {:#}", source.name(), marker, e),
                }
            }
        }

        self.versions.insert(key, latest.clone());
        latest
    }

    /// Updates for every record whose literal version is behind the latest one.
    ///
    /// Managed versions and ignored coordinates are skipped. Each distinct
    /// coordinate is looked up once no matter how many modules declare it.
    pub async fn check_for_updates(&self, installed: &[InstalledDependency]) -> Vec<DependencyUpdate> {
        let candidates: Vec<&InstalledDependency> = installed
            .iter()
            .filter(|dep| dep.version.literal().is_some())
            .filter(|dep| !matches_any(&self.ignore, &dep.coordinate.to_string()))
            .collect();
        let coordinates: BTreeSet<Coordinate> =
            candidates.iter().map(|dep| dep.coordinate.clone()).collect();

        let latest = self
            .resolve_concurrently(coordinates.into_iter().collect(), |resolver, coordinate| async move {
                let latest = resolver.latest_version(&coordinate).await;
                (coordinate, latest)
            })
            .await;

        let updates: Vec<DependencyUpdate> = candidates
            .into_iter()
            .filter_map(|dep| {
                let current = dep.version.literal()?;
                let newest = latest.get(&dep.coordinate)?.as_deref()?;
                self.offers_update(current, newest).then(|| DependencyUpdate {
                    dependency: dep.clone(),
                    latest: newest.to_string(),
                })
            })
            .collect();
        tracing::info!("{} of {} dependencies have updates", updates.len(), installed.len());
        updates
    }

    /// Updates for every versioned plugin declaration.
    pub async fn check_plugin_updates(&self, plugins: &[InstalledPlugin]) -> Vec<PluginUpdate> {
        let candidates: Vec<&InstalledPlugin> = plugins
            .iter()
            .filter(|plugin| plugin.version.is_some())
            .filter(|plugin| !matches_any(&self.ignore, &plugin.id))
            .collect();
        let ids: BTreeSet<String> = candidates.iter().map(|plugin| plugin.id.clone()).collect();

        let latest = self
            .resolve_concurrently(ids.into_iter().collect(), |resolver, id| async move {
                let latest = resolver.latest_plugin_version(&id).await;
                (id, latest)
            })
            .await;

        candidates
            .into_iter()
            .filter_map(|plugin| {
                let current = plugin.version.as_deref()?;
                let newest = latest.get(&plugin.id)?.as_deref()?;
                self.offers_update(current, newest).then(|| PluginUpdate {
                    plugin: plugin.clone(),
                    latest: newest.to_string(),
                })
            })
            .collect()
    }

    /// Keyword search over every search source, cached for the search TTL.
    ///
    /// Hits are merged by coordinate in source order; later sources only
    /// fill in fields the earlier ones left empty.
    pub async fn search(&self, query: &str, limit: usize) -> Vec<SearchResult> {
        let query = query.trim();
        if query.is_empty() || limit == 0 {
            return Vec::new();
        }
        let key = LookupKind::Search.cache_key(&format!("{query}|{limit}"));
        if let Some(cached) = self.searches.get(&key) {
            tracing::debug!("Cache hit for {}", key);
            return cached;
        }

        let mut merged: Vec<SearchResult> = Vec::new();
        for source in self.search_sources.iter() {
            match source.search(query, limit).await {
                Ok(hits) => merge_hits(&mut merged, hits),
                Err(e) => tracing::warn!("{} search failed for {:?}: {:#}", source.name(), query, e),
            }
        }
        merged.truncate(limit);

        self.searches.insert(key, merged.clone());
        merged
    }

    /// Drop every cached lookup.
    pub fn clear_cache(&self) {
        self.versions.clear();
        self.searches.clear();
        tracing::info!("Version and search caches cleared");
    }

    pub fn version_cache(&self) -> &MemoryCache<Option<String>> {
        &self.versions
    }

    pub fn search_cache(&self) -> &MemoryCache<Vec<SearchResult>> {
        &self.searches
    }

    /// Periodically evict expired entries from both caches.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start_background_cleanup(&self, every: Duration) -> Vec<JoinHandle<()>> {
        vec![
            self.versions.spawn_cleanup_task(every),
            self.searches.spawn_cleanup_task(every),
        ]
    }

    fn offers_update(&self, current: &str, latest: &str) -> bool {
        if !is_newer(latest, current) {
            return false;
        }
        self.settings.include_prereleases || !is_prerelease(latest) || is_prerelease(current)
    }

    /// Run one lookup per key, at most `concurrency` at a time.
    async fn resolve_concurrently<K, F, Fut>(
        &self,
        keys: Vec<K>,
        lookup: F,
    ) -> HashMap<K, Option<String>>
    where
        K: Eq + Hash + Send + 'static,
        F: Fn(UpdateResolver, K) -> Fut,
        Fut: Future<Output = (K, Option<String>)> + Send + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.settings.concurrency.max(1)));
        let handles: Vec<_> = keys
            .into_iter()
            .map(|key| {
                let permit = Arc::clone(&semaphore);
                let task = lookup(self.clone(), key);
                tokio::spawn(async move {
                    let _permit = permit.acquire().await;
                    task.await
                })
            })
            .collect();

        let mut resolved = HashMap::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok((key, latest)) => {
                    resolved.insert(key, latest);
                }
                Err(e) => tracing::warn!("Lookup task failed: {}", e),
            }
        }
        resolved
    }
}

fn merge_hits(merged: &mut Vec<SearchResult>, hits: Vec<SearchResult>) {
    for hit in hits {
        match merged.iter_mut().find(|m| m.coordinate == hit.coordinate) {
            Some(existing) => {
                existing.latest_version = existing.latest_version.take().or(hit.latest_version);
                existing.description = existing.description.take().or(hit.description);
                existing.publisher = existing.publisher.take().or(hit.publisher);
                existing.version_count = existing.version_count.or(hit.version_count);
            }
            None => merged.push(hit),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::cache::{DEFAULT_SEARCH_TTL, DEFAULT_TTL, ManualClock};
    use crate::model::{DeclaredVersion, PluginSyntax, SourceRange};
    use crate::registries::SearchOrigin;

    /// Answers from a fixed table and counts calls.
    struct FakeSource {
        answers: HashMap<String, Option<String>>,
        fail: bool,
        calls: AtomicUsize,
    }

    impl FakeSource {
        fn new(answers: &[(&str, Option<&str>)]) -> Arc<Self> {
            Arc::new(Self {
                answers: answers
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.map(str::to_string)))
                    .collect(),
                fail: false,
                calls: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                answers: HashMap::new(),
                fail: true,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn answer(&self, key: &str) -> anyhow::Result<Option<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("connection refused");
            }
            Ok(self.answers.get(key).cloned().flatten())
        }
    }

    #[async_trait]
    impl VersionSource for FakeSource {
        fn name(&self) -> &str {
            "fake"
        }

        async fn latest_version(&self, coordinate: &Coordinate) -> anyhow::Result<Option<String>> {
            self.answer(&coordinate.to_string())
        }
    }

    #[async_trait]
    impl PluginSource for FakeSource {
        fn name(&self) -> &str {
            "fake"
        }

        async fn latest_plugin_version(&self, plugin_id: &str) -> anyhow::Result<Option<String>> {
            self.answer(plugin_id)
        }
    }

    #[async_trait]
    impl SearchSource for FakeSource {
        fn name(&self) -> &str {
            "fake"
        }

        async fn search(&self, query: &str, _limit: usize) -> anyhow::Result<Vec<SearchResult>> {
            let version = self.answer(query)?;
            Ok(vec![SearchResult {
                coordinate: Coordinate::new("org.example", query),
                latest_version: version,
                description: None,
                publisher: Some("Example".to_string()),
                version_count: None,
                origin: SearchOrigin::CentralSearch,
            }])
        }
    }

    fn resolver_with_clock() -> (UpdateResolver, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let resolver = UpdateResolver::new(
            MemoryCache::with_clock(DEFAULT_TTL, clock.clone()),
            MemoryCache::with_clock(DEFAULT_SEARCH_TTL, clock.clone()),
        );
        (resolver, clock)
    }

    fn dependency(coordinate: &str, version: &str, module: &str) -> InstalledDependency {
        InstalledDependency {
            coordinate: Coordinate::parse(coordinate).unwrap(),
            version: DeclaredVersion::Literal(version.to_string()),
            scope: "implementation".to_string(),
            module: module.to_string(),
            range: SourceRange::new(PathBuf::from("build.gradle.kts"), 0, 1),
            from_version_catalog: false,
            catalog_key: None,
            optional: false,
            classifier: None,
            extension: None,
            exclusions: Vec::new(),
        }
    }

    fn plugin(id: &str, version: Option<&str>) -> InstalledPlugin {
        InstalledPlugin {
            id: id.to_string(),
            version: version.map(str::to_string),
            syntax: PluginSyntax::Id,
            shorthand: false,
            applied: true,
            module: "app".to_string(),
            range: SourceRange::new(PathBuf::from("build.gradle.kts"), 0, 1),
            catalog_key: None,
        }
    }

    #[tokio::test]
    async fn test_first_answer_wins() {
        let central = FakeSource::new(&[("org.example:widget", None)]);
        let repo = FakeSource::new(&[("org.example:widget", Some("1.3.0"))]);
        let fallback = FakeSource::new(&[("org.example:widget", Some("9.9.9"))]);
        let (resolver, _clock) = resolver_with_clock();
        let resolver = resolver
            .with_artifact_source(central.clone())
            .with_artifact_source(repo.clone())
            .with_artifact_source(fallback.clone());

        let latest = resolver
            .latest_version(&Coordinate::new("org.example", "widget"))
            .await;
        assert_eq!(latest.as_deref(), Some("1.3.0"));
        assert_eq!(central.calls(), 1);
        assert_eq!(repo.calls(), 1);
        assert_eq!(fallback.calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_source_is_skipped() {
        let broken = FakeSource::failing();
        let fallback = FakeSource::new(&[("org.example:widget", Some("2.0"))]);
        let (resolver, _clock) = resolver_with_clock();
        let resolver = resolver
            .with_artifact_source(broken.clone())
            .with_artifact_source(fallback);

        let latest = resolver
            .latest_version(&Coordinate::new("org.example", "widget"))
            .await;
        assert_eq!(latest.as_deref(), Some("2.0"));
        assert_eq!(broken.calls(), 1);
    }

    #[tokio::test]
    async fn test_cache_within_ttl_and_after_expiry() {
        let source = FakeSource::new(&[("org.example:widget", Some("1.0"))]);
        let (resolver, clock) = resolver_with_clock();
        let resolver = resolver.with_artifact_source(source.clone());
        let coordinate = Coordinate::new("org.example", "widget");

        resolver.latest_version(&coordinate).await;
        clock.advance(Duration::from_secs(30 * 60));
        resolver.latest_version(&coordinate).await;
        assert_eq!(source.calls(), 1);

        clock.advance(Duration::from_secs(30 * 60 + 1));
        resolver.latest_version(&coordinate).await;
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_failure_is_cached_as_none() {
        let broken = FakeSource::failing();
        let (resolver, _clock) = resolver_with_clock();
        let resolver = resolver.with_artifact_source(broken.clone());
        let coordinate = Coordinate::new("org.example", "widget");

        assert_eq!(resolver.latest_version(&coordinate).await, None);
        assert_eq!(resolver.latest_version(&coordinate).await, None);
        assert_eq!(broken.calls(), 1);
    }

    #[tokio::test]
    async fn test_clear_cache_forces_lookup() {
        let source = FakeSource::new(&[("org.example:widget", Some("1.0"))]);
        let (resolver, _clock) = resolver_with_clock();
        let resolver = resolver.with_artifact_source(source.clone());
        let coordinate = Coordinate::new("org.example", "widget");

        resolver.latest_version(&coordinate).await;
        resolver.clear_cache();
        assert!(resolver.version_cache().is_empty());
        resolver.latest_version(&coordinate).await;
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_check_for_updates() {
        let source = FakeSource::new(&[
            ("org.example:widget", Some("1.3.0")),
            ("org.example:current", Some("2.0")),
            ("org.example:rc", Some("5.0.0-RC1")),
            ("org.example:ignored", Some("9.0")),
        ]);
        let (resolver, _clock) = resolver_with_clock();
        let resolver = resolver
            .with_artifact_source(source.clone())
            .with_settings(ResolverConfig::default(), vec!["org.example:ign*".to_string()]);

        let mut managed = dependency("org.example:widget", "x", "lib");
        managed.version = DeclaredVersion::Managed;
        let installed = vec![
            dependency("org.example:widget", "1.2.0", "app"),
            dependency("org.example:widget", "1.2.0", "lib"),
            managed,
            dependency("org.example:current", "2.0", "app"),
            dependency("org.example:rc", "4.9.0", "app"),
            dependency("org.example:ignored", "1.0", "app"),
        ];

        let updates = resolver.check_for_updates(&installed).await;
        assert_eq!(updates.len(), 2);
        assert!(updates.iter().all(|u| u.latest == "1.3.0"));
        let modules: Vec<&str> = updates.iter().map(|u| u.dependency.module.as_str()).collect();
        assert_eq!(modules, vec!["app", "lib"]);
        // widget, current and rc; the ignored coordinate is never asked for
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn test_prereleases_offered_when_enabled() {
        let source = FakeSource::new(&[("org.example:rc", Some("5.0.0-RC1"))]);
        let (resolver, _clock) = resolver_with_clock();
        let settings = ResolverConfig {
            include_prereleases: true,
            ..ResolverConfig::default()
        };
        let resolver = resolver
            .with_artifact_source(source)
            .with_settings(settings, Vec::new());

        let updates = resolver
            .check_for_updates(&[dependency("org.example:rc", "4.9.0", "app")])
            .await;
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].latest, "5.0.0-RC1");
    }

    #[tokio::test]
    async fn test_plugin_updates_fall_back_to_marker() {
        let portal = FakeSource::new(&[("com.example.gen", Some("0.9.0"))]);
        let repo = FakeSource::new(&[(
            "com.example.private:com.example.private.gradle.plugin",
            Some("2.1.0"),
        )]);
        let (resolver, _clock) = resolver_with_clock();
        let resolver = resolver
            .with_plugin_source(portal.clone())
            .with_marker_source(repo.clone());

        let plugins = vec![
            plugin("com.example.gen", Some("0.8.0")),
            plugin("com.example.private", Some("2.0.0")),
            plugin("java", None),
        ];
        let mut updates = resolver.check_plugin_updates(&plugins).await;
        updates.sort_by(|a, b| a.plugin.id.cmp(&b.plugin.id));
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].plugin.id, "com.example.gen");
        assert_eq!(updates[0].latest, "0.9.0");
        assert_eq!(updates[1].latest, "2.1.0");
        assert_eq!(portal.calls(), 2);
        assert_eq!(repo.calls(), 1);
    }

    #[tokio::test]
    async fn test_search_cached_for_five_minutes() {
        let source = FakeSource::new(&[("widget", Some("1.0"))]);
        let (resolver, clock) = resolver_with_clock();
        let resolver = resolver.with_search_source(source.clone());

        let hits = resolver.search("widget", 10).await;
        assert_eq!(hits.len(), 1);
        resolver.search("  WIDGET ", 10).await;
        assert_eq!(source.calls(), 1);

        clock.advance(Duration::from_secs(5 * 60 + 1));
        resolver.search("widget", 10).await;
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_search_empty_query() {
        let source = FakeSource::new(&[]);
        let (resolver, _clock) = resolver_with_clock();
        let resolver = resolver.with_search_source(source.clone());
        assert!(resolver.search("   ", 10).await.is_empty());
        assert_eq!(source.calls(), 0);
    }

    #[test]
    fn test_merge_hits_fills_missing_fields() {
        let first = SearchResult {
            coordinate: Coordinate::new("g", "a"),
            latest_version: Some("1.0".to_string()),
            description: None,
            publisher: None,
            version_count: Some(3),
            origin: SearchOrigin::CentralSearch,
        };
        let second = SearchResult {
            coordinate: Coordinate::new("g", "a"),
            latest_version: Some("0.9".to_string()),
            description: Some("A library".to_string()),
            publisher: Some("Someone".to_string()),
            version_count: None,
            origin: SearchOrigin::PackageRegistry,
        };
        let other = SearchResult {
            coordinate: Coordinate::new("g", "b"),
            ..second.clone()
        };
        let mut merged = Vec::new();
        merge_hits(&mut merged, vec![first]);
        merge_hits(&mut merged, vec![second, other]);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].latest_version.as_deref(), Some("1.0"));
        assert_eq!(merged[0].description.as_deref(), Some("A library"));
        assert_eq!(merged[0].publisher.as_deref(), Some("Someone"));
        assert_eq!(merged[0].version_count, Some(3));
        assert_eq!(merged[0].origin, SearchOrigin::CentralSearch);
    }
}
