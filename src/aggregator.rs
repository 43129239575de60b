//! Cross-cutting package view: one [`UnifiedPackage`] per coordinate, built
//! from scan records, update results and search hits.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;

use serde::Serialize;

use crate::file_types::{FileType, GradleDialect};
use crate::model::{
    Coordinate, DependencyExclusion, DependencyUpdate, InstalledDependency, InstalledPlugin,
    PluginSyntax, PluginUpdate,
};
use crate::registries::version_utils::is_newer;
use crate::registries::{SearchOrigin, SearchResult};

/// Origin-specific details of a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "origin", rename_all = "kebab-case")]
pub enum PackageMetadata {
    /// Declared in a Gradle build script
    Script {
        dialect: GradleDialect,
        configuration: String,
        file: PathBuf,
        catalog_key: Option<String>,
    },
    /// Declared in a Maven descriptor
    Xml {
        scope: String,
        file: PathBuf,
        optional: bool,
        classifier: Option<String>,
        extension: Option<String>,
        exclusions: Vec<DependencyExclusion>,
    },
    CentralSearch {
        version_count: Option<u32>,
    },
    PluginPortal {
        plugin_id: String,
        syntax: PluginSyntax,
        applied: bool,
        file: PathBuf,
    },
    PackageRegistry {
        description: Option<String>,
        publisher: Option<String>,
    },
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnifiedPackage {
    /// `group:artifact`
    pub id: String,
    pub coordinate: Coordinate,
    /// Distinct declaring modules, sorted
    pub modules: Vec<String>,
    pub installed_version: Option<String>,
    pub latest_version: Option<String>,
    pub scope: Option<String>,
    /// Scans only see direct declarations, so this stays `false` for installed packages.
    pub is_transitive: bool,
    pub is_deprecated: bool,
    pub has_vulnerabilities: bool,
    pub metadata: PackageMetadata,
}

impl UnifiedPackage {
    fn new(coordinate: Coordinate, metadata: PackageMetadata) -> Self {
        Self {
            id: coordinate.to_string(),
            coordinate,
            modules: Vec::new(),
            installed_version: None,
            latest_version: None,
            scope: None,
            is_transitive: false,
            is_deprecated: false,
            has_vulnerabilities: false,
            metadata,
        }
    }

    pub fn is_installed(&self) -> bool {
        !self.modules.is_empty()
    }

    /// True when the package is installed and `latest_version` is strictly newer.
    pub fn has_update(&self) -> bool {
        match (&self.installed_version, &self.latest_version) {
            (Some(installed), Some(latest)) => self.is_installed() && is_newer(latest, installed),
            _ => false,
        }
    }
}

/// Group scan records by coordinate and attach the matching update.
///
/// The first record of each group (in scan order) supplies the scope and the
/// metadata; modules are unioned across the group. Output is sorted by
/// coordinate.
pub fn aggregate(
    installed: &[InstalledDependency],
    updates: &[DependencyUpdate],
) -> Vec<UnifiedPackage> {
    let latest: HashMap<&Coordinate, &str> = updates
        .iter()
        .map(|u| (&u.dependency.coordinate, u.latest.as_str()))
        .collect();

    let mut groups: BTreeMap<&Coordinate, Vec<&InstalledDependency>> = BTreeMap::new();
    for dep in installed {
        groups.entry(&dep.coordinate).or_default().push(dep);
    }

    groups
        .into_iter()
        .filter_map(|(coordinate, records)| {
            let representative = *records.first()?;
            let mut package =
                UnifiedPackage::new(coordinate.clone(), dependency_metadata(representative));
            package.modules = distinct_modules(records.iter().map(|r| r.module.as_str()));
            package.installed_version = representative
                .version
                .literal()
                .or_else(|| records.iter().find_map(|r| r.version.literal()))
                .map(str::to_string);
            package.latest_version = latest.get(coordinate).map(|v| v.to_string());
            package.scope = Some(representative.scope.clone());
            Some(package)
        })
        .collect()
}

/// Same as [`aggregate`] for plugins, keyed by the plugin marker coordinate.
pub fn aggregate_plugins(plugins: &[InstalledPlugin], updates: &[PluginUpdate]) -> Vec<UnifiedPackage> {
    let latest: HashMap<&str, &str> = updates
        .iter()
        .map(|u| (u.plugin.id.as_str(), u.latest.as_str()))
        .collect();

    let mut groups: BTreeMap<&str, Vec<&InstalledPlugin>> = BTreeMap::new();
    for plugin in plugins {
        groups.entry(plugin.id.as_str()).or_default().push(plugin);
    }

    groups
        .into_iter()
        .filter_map(|(id, records)| {
            let representative = *records.first()?;
            let metadata = PackageMetadata::PluginPortal {
                plugin_id: id.to_string(),
                syntax: representative.syntax,
                applied: records.iter().any(|r| r.applied),
                file: representative.range.file.clone(),
            };
            let mut package = UnifiedPackage::new(Coordinate::plugin_marker(id), metadata);
            package.modules = distinct_modules(records.iter().map(|r| r.module.as_str()));
            package.installed_version = records.iter().find_map(|r| r.version.clone());
            package.latest_version = latest.get(id).map(|v| v.to_string());
            Some(package)
        })
        .collect()
}

/// Packages for search hits that are not installed anywhere.
pub fn from_search_results(results: &[SearchResult]) -> Vec<UnifiedPackage> {
    results
        .iter()
        .map(|hit| {
            let metadata = match hit.origin {
                SearchOrigin::CentralSearch => PackageMetadata::CentralSearch {
                    version_count: hit.version_count,
                },
                SearchOrigin::PackageRegistry => PackageMetadata::PackageRegistry {
                    description: hit.description.clone(),
                    publisher: hit.publisher.clone(),
                },
            };
            let mut package = UnifiedPackage::new(hit.coordinate.clone(), metadata);
            package.latest_version = hit.latest_version.clone();
            package
        })
        .collect()
}

/// Combine package lists by id.
///
/// The first package seen for an id wins; later ones only fill in a missing
/// latest version and contribute their modules.
pub fn merge(lists: impl IntoIterator<Item = Vec<UnifiedPackage>>) -> Vec<UnifiedPackage> {
    let mut merged: BTreeMap<String, UnifiedPackage> = BTreeMap::new();
    for package in lists.into_iter().flatten() {
        match merged.get_mut(&package.id) {
            Some(existing) => {
                if existing.latest_version.is_none() {
                    // A hit never lowers an installed package to an equal or older release.
                    let offered = package.latest_version.filter(|latest| {
                        existing
                            .installed_version
                            .as_deref()
                            .is_none_or(|installed| is_newer(latest, installed))
                    });
                    existing.latest_version = offered;
                }
                existing.modules = distinct_modules(
                    existing
                        .modules
                        .iter()
                        .chain(package.modules.iter())
                        .map(String::as_str),
                );
            }
            None => {
                merged.insert(package.id.clone(), package);
            }
        }
    }
    merged.into_values().collect()
}

fn dependency_metadata(record: &InstalledDependency) -> PackageMetadata {
    match FileType::detect(&record.range.file) {
        Some(FileType::Maven) => PackageMetadata::Xml {
            scope: record.scope.clone(),
            file: record.range.file.clone(),
            optional: record.optional,
            classifier: record.classifier.clone(),
            extension: record.extension.clone(),
            exclusions: record.exclusions.clone(),
        },
        Some(file_type) => match file_type.dialect() {
            Some(dialect) => PackageMetadata::Script {
                dialect,
                configuration: record.scope.clone(),
                file: record.range.file.clone(),
                catalog_key: record.catalog_key.clone(),
            },
            None => PackageMetadata::None,
        },
        None => PackageMetadata::None,
    }
}

fn distinct_modules<'a>(modules: impl Iterator<Item = &'a str>) -> Vec<String> {
    modules
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}
