//! Build file detection and dialect mapping
//!
//! This module maps a path to the build file family it belongs to, which
//! decides the scanner, the mutator and the cache namespace to use.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::model::Coordinate;

/// Syntax flavour of a Gradle build script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradleDialect {
    /// `build.gradle`: `implementation 'g:a:v'`
    Groovy,
    /// `build.gradle.kts`: `implementation("g:a:v")`
    Kotlin,
}

/// Supported build file types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    /// Groovy DSL build script (`build.gradle`)
    GradleGroovy,
    /// Kotlin DSL build script (`build.gradle.kts`)
    GradleKotlin,
    /// Maven project descriptor (`pom.xml`)
    Maven,
}

impl FileType {
    /// Detect the file type from a path.
    ///
    /// Settings scripts are not build scripts and are not recognized.
    pub fn detect(path: &Path) -> Option<Self> {
        let file_name = path.file_name()?.to_str()?;
        if file_name.starts_with("settings.gradle") {
            None
        } else if file_name.ends_with(".gradle.kts") {
            Some(FileType::GradleKotlin)
        } else if file_name.ends_with(".gradle") {
            Some(FileType::GradleGroovy)
        } else if file_name == "pom.xml" {
            Some(FileType::Maven)
        } else {
            None
        }
    }

    pub fn dialect(self) -> Option<GradleDialect> {
        match self {
            FileType::GradleGroovy => Some(GradleDialect::Groovy),
            FileType::GradleKotlin => Some(GradleDialect::Kotlin),
            FileType::Maven => None,
        }
    }

    pub fn is_script(self) -> bool {
        self.dialect().is_some()
    }

    /// Default configuration/scope for a dependency added without one.
    pub fn default_scope(self) -> &'static str {
        match self {
            FileType::GradleGroovy | FileType::GradleKotlin => "implementation",
            FileType::Maven => "compile",
        }
    }
}

/// Cache namespaces for version lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    /// Maven-repository artifact, declared from either build file family
    Artifact,
    /// Gradle plugin id
    Plugin,
    /// Free-text search
    Search,
}

impl LookupKind {
    /// Generate a cache key.
    ///
    /// The prefix keeps a plugin id from colliding with a group of the same name.
    pub fn cache_key(self, subject: &str) -> String {
        match self {
            LookupKind::Artifact => format!("maven:{subject}"),
            LookupKind::Plugin => format!("plugin:{subject}"),
            LookupKind::Search => format!("search:{}", subject.trim().to_lowercase()),
        }
    }

    pub fn artifact_key(coordinate: &Coordinate) -> String {
        LookupKind::Artifact.cache_key(&coordinate.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_groovy() {
        assert_eq!(
            FileType::detect(Path::new("/project/app/build.gradle")),
            Some(FileType::GradleGroovy)
        );
        assert_eq!(
            FileType::detect(Path::new("/project/gradle/publishing.gradle")),
            Some(FileType::GradleGroovy)
        );
    }

    #[test]
    fn test_detect_kotlin() {
        assert_eq!(
            FileType::detect(Path::new("/project/build.gradle.kts")),
            Some(FileType::GradleKotlin)
        );
    }

    #[test]
    fn test_detect_maven() {
        assert_eq!(
            FileType::detect(Path::new("/project/pom.xml")),
            Some(FileType::Maven)
        );
        assert_eq!(FileType::detect(Path::new("/project/other.xml")), None);
    }

    #[test]
    fn test_detect_skips_settings() {
        assert_eq!(FileType::detect(Path::new("/project/settings.gradle")), None);
        assert_eq!(
            FileType::detect(Path::new("/project/settings.gradle.kts")),
            None
        );
    }

    #[test]
    fn test_dialect_mapping() {
        assert_eq!(FileType::GradleGroovy.dialect(), Some(GradleDialect::Groovy));
        assert_eq!(FileType::GradleKotlin.dialect(), Some(GradleDialect::Kotlin));
        assert_eq!(FileType::Maven.dialect(), None);
        assert!(FileType::GradleKotlin.is_script());
        assert!(!FileType::Maven.is_script());
    }

    #[test]
    fn test_cache_key() {
        let coordinate = Coordinate::new("com.example", "widget");
        assert_eq!(
            LookupKind::artifact_key(&coordinate),
            "maven:com.example:widget"
        );
        assert_eq!(
            LookupKind::Plugin.cache_key("org.example.greeting"),
            "plugin:org.example.greeting"
        );
        assert_eq!(LookupKind::Search.cache_key("  Jackson "), "search:jackson");
    }
}
