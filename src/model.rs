//! Value types shared by every component: coordinates, source ranges and the
//! installed-dependency records produced by a scan.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Group and artifact of a dependency, independent of its version.
///
/// Equality is exact and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coordinate {
    pub group: String,
    pub artifact: String,
}

impl Coordinate {
    pub fn new(group: impl Into<String>, artifact: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            artifact: artifact.into(),
        }
    }

    /// Parse `group:artifact`. Extra segments (a version) are rejected.
    pub fn parse(s: &str) -> Option<Self> {
        let (group, artifact) = s.trim().split_once(':')?;
        if group.is_empty() || artifact.is_empty() || artifact.contains(':') {
            return None;
        }
        Some(Self::new(group, artifact))
    }

    /// Gradle resolves a plugin id through its marker artifact `<id>:<id>.gradle.plugin`.
    pub fn plugin_marker(plugin_id: &str) -> Self {
        Self::new(plugin_id, format!("{plugin_id}.gradle.plugin"))
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.artifact)
    }
}

/// Exact byte span of one declaration inside one file.
///
/// A range is only meaningful against the text it was scanned from. Once the
/// file is edited every range computed for it is stale.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRange {
    pub file: PathBuf,
    pub offset: usize,
    pub length: usize,
}

impl SourceRange {
    pub fn new(file: impl Into<PathBuf>, offset: usize, length: usize) -> Self {
        Self {
            file: file.into(),
            offset,
            length,
        }
    }

    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    /// Returns the covered text, or `None` when the range does not fit `text`.
    pub fn slice<'a>(&self, text: &'a str) -> Option<&'a str> {
        text.get(self.offset..self.end())
    }
}

/// Version as written at the declaration site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DeclaredVersion {
    Literal(String),
    /// Supplied by a BOM, a platform, a parent descriptor or a catalog entry without a version.
    Managed,
}

impl DeclaredVersion {
    pub const MANAGED: &'static str = "managed";

    pub fn literal(&self) -> Option<&str> {
        match self {
            DeclaredVersion::Literal(v) => Some(v),
            DeclaredVersion::Managed => None,
        }
    }

    pub fn is_managed(&self) -> bool {
        matches!(self, DeclaredVersion::Managed)
    }
}

impl fmt::Display for DeclaredVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclaredVersion::Literal(v) => f.write_str(v),
            DeclaredVersion::Managed => f.write_str(Self::MANAGED),
        }
    }
}

/// `groupId` plus optional `artifactId`; no artifact excludes the whole group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DependencyExclusion {
    pub group: String,
    pub artifact: Option<String>,
}

impl DependencyExclusion {
    pub const WILDCARD: &'static str = "*";

    pub fn new(group: impl Into<String>, artifact: Option<String>) -> Self {
        Self {
            group: group.into(),
            artifact,
        }
    }

    /// Parse `group`, `group:*` or `group:artifact`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        match s.split_once(':') {
            Some((group, artifact)) if !group.is_empty() && !artifact.is_empty() => {
                let artifact = (artifact != Self::WILDCARD).then(|| artifact.to_string());
                Some(Self::new(group, artifact))
            }
            Some(_) => None,
            None if !s.is_empty() => Some(Self::new(s, None)),
            None => None,
        }
    }

    /// Artifact text as written in an `<exclusion>` element.
    pub fn artifact_or_wildcard(&self) -> &str {
        self.artifact.as_deref().unwrap_or(Self::WILDCARD)
    }
}

impl fmt::Display for DependencyExclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.artifact_or_wildcard())
    }
}

/// One dependency declaration found by a scan. Rescans supersede records, they
/// never update them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledDependency {
    pub coordinate: Coordinate,
    pub version: DeclaredVersion,
    /// Gradle configuration (`implementation`, `testImplementation`, ...) or Maven scope.
    pub scope: String,
    pub module: String,
    pub range: SourceRange,
    pub from_version_catalog: bool,
    /// Catalog alias as written in `libs.versions.toml` (`androidx-core-ktx`).
    pub catalog_key: Option<String>,
    pub optional: bool,
    /// `tests`, `sources`, ... from `g:a:v:classifier` or `<classifier>`
    pub classifier: Option<String>,
    /// Artifact extension from `@ext` or `<type>`; `None` means the default jar
    pub extension: Option<String>,
    pub exclusions: Vec<DependencyExclusion>,
}

/// How a plugin entry is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginSyntax {
    /// `id("x")` / `id 'x'`
    Id,
    /// `kotlin("jvm")`
    KotlinShorthand,
    /// `java`, `` `java-library` ``
    Bare,
    /// `alias(libs.plugins.x)`
    CatalogAlias,
    /// `apply plugin: 'x'` / `apply(plugin = "x")` outside a `plugins` block
    LegacyApply,
}

/// One plugin entry from a `plugins { }` block or a legacy `apply` statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledPlugin {
    pub id: String,
    pub version: Option<String>,
    pub syntax: PluginSyntax,
    pub shorthand: bool,
    /// `false` for `apply false` entries that are declared but not applied.
    pub applied: bool,
    pub module: String,
    pub range: SourceRange,
    pub catalog_key: Option<String>,
}

/// An installed dependency together with a strictly newer upstream version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyUpdate {
    pub dependency: InstalledDependency,
    pub latest: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginUpdate {
    pub plugin: InstalledPlugin,
    pub latest: String,
}
