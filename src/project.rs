//! Project-level operations: build file discovery, parallel scanning, the
//! refresh pipeline and atomic writes.
//!
//! A scan never writes. Every mutation is computed from the current file text
//! by a [`Mutator`](crate::mutator::Mutator) and only reaches the disk through
//! [`apply_changes`], which replaces the file in one rename.

use std::fmt;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use futures::future::join_all;
use tempfile::NamedTempFile;
use walkdir::{DirEntry, WalkDir};

use crate::aggregator::{self, UnifiedPackage};
use crate::error::{EditError, ParseError, ServiceError};
use crate::file_types::FileType;
use crate::model::{
    Coordinate, DependencyExclusion, DependencyUpdate, InstalledDependency, InstalledPlugin,
    PluginUpdate,
};
use crate::mutator::{AddRequest, ScriptMutator, mutator_for};
use crate::parsers::catalog::VersionCatalog;
use crate::parsers::{ScanContext, parser_for};
use crate::registries::version_utils::is_newer;
use crate::resolver::UpdateResolver;

/// Version catalog location relative to the project root.
pub const CATALOG_PATH: &str = "gradle/libs.versions.toml";

/// Output and tooling directories that never hold source build files.
const SKIPPED_DIRS: &[&str] = &["build", "target", "out", "node_modules"];

/// One build file found under the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildFile {
    pub path: PathBuf,
    pub file_type: FileType,
    pub module: String,
}

/// A file that could not be scanned completely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanWarning {
    pub file: PathBuf,
    pub error: ParseError,
}

impl fmt::Display for ScanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.file.display(), self.error)
    }
}

/// Everything a project scan produced.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub files: Vec<BuildFile>,
    pub dependencies: Vec<InstalledDependency>,
    pub plugins: Vec<InstalledPlugin>,
    pub warnings: Vec<ScanWarning>,
}

/// Receives the two publish points of [`DependencyService::refresh`].
pub trait ScanListener: Send + Sync {
    /// Installed declarations, before any network lookup.
    fn on_installed(&self, report: &ScanReport);

    /// Update results for the installed set published earlier.
    fn on_updates(&self, updates: &[DependencyUpdate], plugin_updates: &[PluginUpdate]);
}

/// Listener that ignores both events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl ScanListener for NoopListener {
    fn on_installed(&self, _report: &ScanReport) {}

    fn on_updates(&self, _updates: &[DependencyUpdate], _plugin_updates: &[PluginUpdate]) {}
}

/// Result of one full refresh.
#[derive(Debug, Clone, Default)]
pub struct Refresh {
    pub report: ScanReport,
    pub updates: Vec<DependencyUpdate>,
    pub plugin_updates: Vec<PluginUpdate>,
    pub packages: Vec<UnifiedPackage>,
}

fn is_skipped(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_ref())
}

/// Every build file under `root`, sorted by path.
pub fn discover_build_files(root: &Path) -> Vec<BuildFile> {
    let root_module = root_module_name(root);
    let mut files: Vec<BuildFile> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !is_skipped(e))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let file_type = FileType::detect(e.path())?;
            Some(BuildFile {
                module: module_name(root, e.path(), &root_module),
                path: e.into_path(),
                file_type,
            })
        })
        .collect();
    files.sort_by(|a, b| a.path.cmp(&b.path));
    tracing::debug!("Discovered {} build files under {}", files.len(), root.display());
    files
}

/// Gradle-style module path of the directory holding `file`: `core:api` for
/// `<root>/core/api/build.gradle`, the root directory name at the top level.
pub fn module_name(root: &Path, file: &Path, root_module: &str) -> String {
    let dir = file.parent().unwrap_or(root);
    let segments: Vec<String> = dir
        .strip_prefix(root)
        .unwrap_or(dir)
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if segments.is_empty() {
        root_module.to_string()
    } else {
        segments.join(":")
    }
}

fn root_module_name(root: &Path) -> String {
    root.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .or_else(|| {
            root.canonicalize()
                .ok()
                .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        })
        .unwrap_or_else(|| "root".to_string())
}

/// Load `gradle/libs.versions.toml` when the project has one.
pub fn load_catalog(root: &Path) -> Result<Option<VersionCatalog>, ParseError> {
    let path = root.join(CATALOG_PATH);
    if !path.is_file() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path).map_err(|e| ParseError::Io(e.to_string()))?;
    let catalog = VersionCatalog::parse(&content)?;
    tracing::debug!(
        "Loaded version catalog with {} libraries and {} plugins",
        catalog.library_count(),
        catalog.plugin_count()
    );
    Ok(Some(catalog))
}

/// Scan one file from disk.
pub fn scan_file(
    build_file: &BuildFile,
    catalog: Option<Arc<VersionCatalog>>,
) -> crate::parsers::ScanResult {
    let content = match std::fs::read_to_string(&build_file.path) {
        Ok(content) => content,
        Err(e) => {
            return crate::parsers::ScanResult {
                error: Some(ParseError::Io(e.to_string())),
                ..Default::default()
            };
        }
    };
    let ctx = ScanContext::new(&build_file.path, &build_file.module);
    parser_for(build_file.file_type, catalog).scan(&content, &ctx)
}

/// Scan every build file under `root`, one blocking task per file.
///
/// Files that fail to parse contribute a warning and whatever was found
/// before the failure; they never abort the scan.
pub async fn scan_project(root: &Path) -> ScanReport {
    let root = root.to_path_buf();
    let mut report = ScanReport::default();

    let catalog = match load_catalog(&root) {
        Ok(catalog) => catalog.map(Arc::new),
        Err(error) => {
            tracing::warn!("Version catalog ignored: {}", error);
            report.warnings.push(ScanWarning {
                file: root.join(CATALOG_PATH),
                error,
            });
            None
        }
    };

    let discover_root = root.clone();
    let files = tokio::task::spawn_blocking(move || discover_build_files(&discover_root))
        .await
        .unwrap_or_else(|e| {
            tracing::warn!("Build file discovery failed: {}", e);
            Vec::new()
        });

    let tasks = files.iter().cloned().map(|file| {
        let catalog = catalog.clone();
        tokio::task::spawn_blocking(move || scan_file(&file, catalog))
    });
    let results = join_all(tasks).await;

    for (file, result) in files.iter().zip(results) {
        match result {
            Ok(scan) => {
                tracing::debug!(
                    "Scanned {}: {} dependencies, {} plugins",
                    file.path.display(),
                    scan.dependencies.len(),
                    scan.plugins.len()
                );
                if let Some(error) = scan.error {
                    tracing::warn!("Partial scan of {}: {}", file.path.display(), error);
                    report.warnings.push(ScanWarning {
                        file: file.path.clone(),
                        error,
                    });
                }
                report.dependencies.extend(scan.dependencies);
                report.plugins.extend(scan.plugins);
            }
            Err(e) => tracing::warn!("Scan task for {} failed: {}", file.path.display(), e),
        }
    }
    report.files = files;
    report
}

/// Replace `path` with `new_text` in one rename.
///
/// The text is written to a temporary file in the same directory first, so
/// a failure leaves the original untouched.
pub fn apply_changes(path: &Path, new_text: &str) -> Result<(), ServiceError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = NamedTempFile::new_in(dir).map_err(|e| ServiceError::io(path, e))?;
    temp.write_all(new_text.as_bytes())
        .and_then(|()| temp.as_file().sync_all())
        .map_err(|e| ServiceError::io(path, e))?;
    if let Ok(metadata) = std::fs::metadata(path) {
        // Keep the original mode bits; a failure here is not worth aborting for.
        let _ = std::fs::set_permissions(temp.path(), metadata.permissions());
    }
    temp.persist(path).map_err(|e| ServiceError::io(path, e.error))?;
    tracing::info!("Wrote {}", path.display());
    Ok(())
}

/// Scan, resolve and edit operations for one project.
#[derive(Clone)]
pub struct DependencyService {
    root: PathBuf,
    resolver: UpdateResolver,
}

impl DependencyService {
    pub fn new(root: impl Into<PathBuf>, resolver: UpdateResolver) -> Self {
        Self {
            root: root.into(),
            resolver,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolver(&self) -> &UpdateResolver {
        &self.resolver
    }

    /// Safe to call repeatedly; a scan only reads.
    pub async fn scan_installed_dependencies(&self) -> ScanReport {
        scan_project(&self.root).await
    }

    pub async fn latest_version(&self, coordinate: &Coordinate) -> Option<String> {
        self.resolver.latest_version(coordinate).await
    }

    /// Upstream version for `record`, or `None` when it is not newer than the declared one.
    ///
    /// A managed declaration has nothing to compare against, so any known version is offered.
    pub async fn newer_version(&self, record: &InstalledDependency) -> Option<String> {
        let latest = self.resolver.latest_version(&record.coordinate).await?;
        offer_if_newer(latest, record.version.literal())
    }

    pub async fn newer_plugin_version(&self, plugin: &InstalledPlugin) -> Option<String> {
        let latest = self.resolver.latest_plugin_version(&plugin.id).await?;
        offer_if_newer(latest, plugin.version.as_deref())
    }

    pub async fn check_for_updates(&self, installed: &[InstalledDependency]) -> Vec<DependencyUpdate> {
        self.resolver.check_for_updates(installed).await
    }

    /// Scan, publish the installed set, resolve updates, publish them.
    pub async fn refresh(&self, listener: &dyn ScanListener) -> Refresh {
        let report = self.scan_installed_dependencies().await;
        tracing::info!(
            "Found {} dependencies and {} plugins in {} files",
            report.dependencies.len(),
            report.plugins.len(),
            report.files.len()
        );
        listener.on_installed(&report);

        let (updates, plugin_updates) = tokio::join!(
            self.resolver.check_for_updates(&report.dependencies),
            self.resolver.check_plugin_updates(&report.plugins),
        );
        listener.on_updates(&updates, &plugin_updates);

        let packages = aggregator::merge([
            aggregator::aggregate(&report.dependencies, &updates),
            aggregator::aggregate_plugins(&report.plugins, &plugin_updates),
        ]);
        Refresh {
            report,
            updates,
            plugin_updates,
            packages,
        }
    }

    /// New text of `path` with `request` declared in it.
    pub fn added_content(&self, path: &Path, request: &AddRequest) -> Result<String, ServiceError> {
        let file_type = detect(path)?;
        let text = read(path)?;
        Ok(mutator_for(file_type).add(&text, request)?)
    }

    /// New text of the record's file with its version replaced.
    pub fn updated_content(
        &self,
        record: &InstalledDependency,
        new_version: &str,
    ) -> Result<String, ServiceError> {
        let (file_type, text) = record_file(record)?;
        Ok(mutator_for(file_type).update(&text, record, new_version)?)
    }

    /// New text of the record's file without the record.
    pub fn removed_content(&self, record: &InstalledDependency) -> Result<String, ServiceError> {
        let (file_type, text) = record_file(record)?;
        Ok(mutator_for(file_type).remove(&text, record)?)
    }

    pub fn exclusion_added_content(
        &self,
        record: &InstalledDependency,
        exclusion: &DependencyExclusion,
    ) -> Result<String, ServiceError> {
        let (file_type, text) = record_file(record)?;
        Ok(mutator_for(file_type).add_exclusion(&text, record, exclusion)?)
    }

    pub fn exclusion_removed_content(
        &self,
        record: &InstalledDependency,
        exclusion: &DependencyExclusion,
    ) -> Result<String, ServiceError> {
        let (file_type, text) = record_file(record)?;
        Ok(mutator_for(file_type).remove_exclusion(&text, record, exclusion)?)
    }

    /// New text of the plugin's script with its version replaced.
    pub fn updated_plugin_content(
        &self,
        plugin: &InstalledPlugin,
        new_version: &str,
    ) -> Result<String, ServiceError> {
        let path = &plugin.range.file;
        let file_type = detect(path)?;
        let Some(dialect) = file_type.dialect() else {
            return Err(EditError::Unsupported("plugins are only declared in Gradle scripts").into());
        };
        let text = read(path)?;
        Ok(ScriptMutator::new(dialect).update_plugin(&text, plugin, new_version)?)
    }

    pub fn apply_changes(&self, path: &Path, new_text: &str) -> Result<(), ServiceError> {
        apply_changes(path, new_text)
    }
}

fn detect(path: &Path) -> Result<FileType, ServiceError> {
    FileType::detect(path).ok_or_else(|| ServiceError::UnsupportedFile(path.to_path_buf()))
}

fn read(path: &Path) -> Result<String, ServiceError> {
    std::fs::read_to_string(path).map_err(|e| ServiceError::io(path, e))
}

fn record_file(record: &InstalledDependency) -> Result<(FileType, String), ServiceError> {
    let path = &record.range.file;
    Ok((detect(path)?, read(path)?))
}

fn offer_if_newer(latest: String, installed: Option<&str>) -> Option<String> {
    match installed {
        Some(installed) if !is_newer(&latest, installed) => {
            tracing::debug!("Latest {} is not newer than {}", latest, installed);
            None
        }
        _ => Some(latest),
    }
}
