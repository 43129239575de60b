//! Scanners for build files (Gradle scripts, Maven descriptors)

use std::path::Path;
use std::sync::Arc;

use crate::error::ParseError;
use crate::file_types::FileType;
use crate::model::{InstalledDependency, InstalledPlugin};

/// Where the scanned text comes from.
#[derive(Debug, Clone, Copy)]
pub struct ScanContext<'a> {
    /// Path recorded in every produced [`crate::model::SourceRange`]
    pub file: &'a Path,
    /// Owning module name recorded on every produced record
    pub module: &'a str,
}

impl<'a> ScanContext<'a> {
    pub fn new(file: &'a Path, module: &'a str) -> Self {
        Self { file, module }
    }
}

/// Everything one scan of one file produced.
///
/// `error` is set when the file could only be scanned partially; the records
/// found before the failure point are still returned.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    pub dependencies: Vec<InstalledDependency>,
    pub plugins: Vec<InstalledPlugin>,
    pub error: Option<ParseError>,
}

/// Trait for scanning build files
pub trait BuildFileParser: Send + Sync {
    /// Scan the given file content for dependency and plugin declarations
    fn scan(&self, content: &str, ctx: &ScanContext<'_>) -> ScanResult;

    fn scan_dependencies(&self, content: &str, ctx: &ScanContext<'_>) -> Vec<InstalledDependency> {
        self.scan(content, ctx).dependencies
    }

    fn scan_plugins(&self, content: &str, ctx: &ScanContext<'_>) -> Vec<InstalledPlugin> {
        self.scan(content, ctx).plugins
    }
}

/// Scanner for the given build file type.
///
/// The catalog is only consulted by Gradle scripts.
pub fn parser_for(
    file_type: FileType,
    catalog: Option<Arc<catalog::VersionCatalog>>,
) -> Box<dyn BuildFileParser> {
    match file_type.dialect() {
        Some(dialect) => Box::new(gradle::GradleParser::with_catalog(dialect, catalog)),
        None => Box::new(maven::MavenParser::new()),
    }
}

pub mod blocks;
pub mod catalog;
pub mod gradle;
pub mod maven;
