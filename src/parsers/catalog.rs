//! Gradle version catalog (`gradle/libs.versions.toml`)
//!
//! Scripts reference catalog entries through generated accessors such as
//! `libs.androidx.core.ktx`. Gradle treats `-`, `_` and `.` in catalog keys as
//! the same separator, so lookups go through a normalized accessor path.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::ParseError;
use crate::model::Coordinate;

/// Location of the default catalog relative to the root project.
pub const DEFAULT_CATALOG_PATH: &str = "gradle/libs.versions.toml";

/// A library alias resolved to its coordinate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogLibrary {
    /// Key as written in the catalog
    pub key: String,
    pub coordinate: Coordinate,
    /// `None` when the entry leaves the version to a platform or BOM
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogPlugin {
    pub key: String,
    pub id: String,
    pub version: Option<String>,
}

/// Alias tables loaded from one catalog file.
#[derive(Debug, Clone, Default)]
pub struct VersionCatalog {
    libraries: HashMap<String, CatalogLibrary>,
    plugins: HashMap<String, CatalogPlugin>,
}

impl VersionCatalog {
    pub fn parse(content: &str) -> Result<Self, ParseError> {
        let raw: RawCatalog =
            toml::from_str(content).map_err(|e| ParseError::Catalog(e.to_string()))?;

        let versions: HashMap<String, String> = raw
            .versions
            .into_iter()
            .filter_map(|(key, version)| version.preferred().map(|v| (key, v)))
            .collect();

        let mut libraries = HashMap::with_capacity(raw.libraries.len());
        for (key, library) in raw.libraries {
            match library.resolve(&versions) {
                Some((coordinate, version)) => {
                    libraries.insert(
                        normalize_accessor(&key),
                        CatalogLibrary {
                            key,
                            coordinate,
                            version,
                        },
                    );
                }
                None => tracing::debug!("Skipping catalog library without coordinate: {}", key),
            }
        }

        let mut plugins = HashMap::with_capacity(raw.plugins.len());
        for (key, plugin) in raw.plugins {
            let (id, version) = plugin.resolve(&versions);
            plugins.insert(normalize_accessor(&key), CatalogPlugin { key, id, version });
        }

        Ok(Self { libraries, plugins })
    }

    /// Look up a library by accessor path (`androidx.core.ktx`, without the `libs.` prefix).
    pub fn library(&self, accessor: &str) -> Option<&CatalogLibrary> {
        self.libraries.get(&normalize_accessor(accessor))
    }

    /// Look up a plugin by accessor path (without the `libs.plugins.` prefix).
    pub fn plugin(&self, accessor: &str) -> Option<&CatalogPlugin> {
        self.plugins.get(&normalize_accessor(accessor))
    }

    pub fn library_count(&self) -> usize {
        self.libraries.len()
    }

    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }
}

/// Map a catalog key or accessor path onto one canonical form.
pub fn normalize_accessor(key: &str) -> String {
    key.replace(['-', '_'], ".")
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCatalog {
    versions: HashMap<String, RawVersion>,
    libraries: HashMap<String, RawLibrary>,
    plugins: HashMap<String, RawPlugin>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawVersion {
    Plain(String),
    Rich {
        strictly: Option<String>,
        require: Option<String>,
        prefer: Option<String>,
    },
}

impl RawVersion {
    fn preferred(self) -> Option<String> {
        match self {
            RawVersion::Plain(v) => Some(v),
            RawVersion::Rich {
                strictly,
                require,
                prefer,
            } => strictly.or(require).or(prefer),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawVersionRef {
    Ref {
        #[serde(rename = "ref")]
        reference: String,
    },
    Version(RawVersion),
}

impl RawVersionRef {
    fn resolve(self, versions: &HashMap<String, String>) -> Option<String> {
        match self {
            RawVersionRef::Ref { reference } => versions.get(&reference).cloned(),
            RawVersionRef::Version(version) => version.preferred(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawLibrary {
    Notation(String),
    Table {
        module: Option<String>,
        group: Option<String>,
        name: Option<String>,
        version: Option<RawVersionRef>,
    },
}

impl RawLibrary {
    fn resolve(self, versions: &HashMap<String, String>) -> Option<(Coordinate, Option<String>)> {
        match self {
            RawLibrary::Notation(notation) => {
                let mut parts = notation.splitn(3, ':');
                let coordinate = Coordinate::new(parts.next()?, parts.next()?);
                let version = parts.next().filter(|v| !v.is_empty()).map(str::to_string);
                Some((coordinate, version))
            }
            RawLibrary::Table {
                module,
                group,
                name,
                version,
            } => {
                let coordinate = match (module, group, name) {
                    (Some(module), _, _) => Coordinate::parse(&module)?,
                    (None, Some(group), Some(name)) => Coordinate::new(group, name),
                    _ => return None,
                };
                Some((coordinate, version.and_then(|v| v.resolve(versions))))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPlugin {
    Notation(String),
    Table {
        id: String,
        version: Option<RawVersionRef>,
    },
}

impl RawPlugin {
    fn resolve(self, versions: &HashMap<String, String>) -> (String, Option<String>) {
        match self {
            RawPlugin::Notation(notation) => match notation.split_once(':') {
                Some((id, version)) => (id.to_string(), Some(version.to_string())),
                None => (notation, None),
            },
            RawPlugin::Table { id, version } => (id, version.and_then(|v| v.resolve(versions))),
        }
    }
}
