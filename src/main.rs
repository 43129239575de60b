use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use jvm_deps::aggregator::{aggregate, aggregate_plugins, from_search_results, merge};
use jvm_deps::config::Config;
use jvm_deps::file_types::FileType;
use jvm_deps::model::{Coordinate, DependencyExclusion, DependencyUpdate, InstalledDependency, PluginUpdate};
use jvm_deps::mutator::AddRequest;
use jvm_deps::parsers::ScanResult;
use jvm_deps::project::{
    BuildFile, CATALOG_PATH, DependencyService, ScanListener, ScanReport, load_catalog, module_name,
    scan_file, scan_project,
};
use jvm_deps::reports;
use jvm_deps::resolver::UpdateResolver;

#[derive(Parser)]
#[command(name = "jvm-deps")]
#[command(about = "Inspect and edit Gradle and Maven dependency declarations", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Summary,
    Json,
    Markdown,
}

#[derive(Subcommand)]
enum Commands {
    /// List every declared dependency and plugin without network lookups
    Scan {
        /// Project root to walk
        #[arg(short, long, default_value = ".")]
        root: PathBuf,

        #[arg(short, long, value_enum, default_value = "summary")]
        output: OutputFormat,
    },
    /// Check declared dependencies and plugins for newer versions
    Outdated {
        #[arg(short, long, default_value = ".")]
        root: PathBuf,

        #[arg(short, long, value_enum, default_value = "summary")]
        output: OutputFormat,

        /// Exit with code 1 if any update is available
        #[arg(long)]
        fail_on_outdated: bool,
    },
    /// Declare a new dependency
    Add {
        #[arg(short, long)]
        file: PathBuf,

        /// `group:artifact`
        #[arg(short, long)]
        coordinate: String,

        /// Leave out for a managed (BOM or parent controlled) declaration
        #[arg(short, long)]
        version: Option<String>,

        /// Gradle configuration or Maven scope
        #[arg(short, long)]
        scope: Option<String>,

        /// Write the change instead of printing the diff only
        #[arg(long)]
        write: bool,
    },
    /// Change the declared version of a dependency
    Update {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(short, long)]
        coordinate: String,

        /// Target version; the latest upstream version when omitted
        #[arg(short, long)]
        version: Option<String>,

        /// Pick the declaration in this configuration or scope
        #[arg(short, long)]
        scope: Option<String>,

        #[arg(long)]
        write: bool,
    },
    /// Change the declared version of a plugin
    UpdatePlugin {
        #[arg(short, long)]
        file: PathBuf,

        /// Plugin id, `org.jetbrains.kotlin.jvm` for `kotlin("jvm")`
        #[arg(short, long)]
        id: String,

        /// Target version; the latest published version when omitted
        #[arg(short, long)]
        version: Option<String>,

        #[arg(long)]
        write: bool,
    },
    /// Delete a dependency declaration
    Remove {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(short, long)]
        coordinate: String,

        #[arg(short, long)]
        scope: Option<String>,

        #[arg(long)]
        write: bool,
    },
    /// Exclude a transitive dependency (`group` or `group:artifact`)
    Exclude {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(short, long)]
        coordinate: String,

        #[arg(short, long)]
        exclusion: String,

        #[arg(short, long)]
        scope: Option<String>,

        #[arg(long)]
        write: bool,
    },
    /// Drop a previously declared exclusion
    Include {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(short, long)]
        coordinate: String,

        #[arg(short, long)]
        exclusion: String,

        #[arg(short, long)]
        scope: Option<String>,

        #[arg(long)]
        write: bool,
    },
    /// Search upstream registries by keyword
    Search {
        query: String,

        #[arg(short, long, default_value = "20")]
        limit: usize,

        #[arg(short, long, value_enum, default_value = "summary")]
        output: OutputFormat,
    },
    /// Profile project scanning (for use with cargo-flamegraph)
    ProfileScan {
        #[arg(short, long, default_value = ".")]
        root: PathBuf,

        #[arg(short, long, default_value = "100")]
        iterations: usize,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = match cli.command {
        Commands::Scan { root, output } => run_scan(root, output).await,
        Commands::Outdated {
            root,
            output,
            fail_on_outdated,
        } => run_outdated(root, output, fail_on_outdated).await,
        Commands::Add {
            file,
            coordinate,
            version,
            scope,
            write,
        } => run_add(file, coordinate, version, scope, write),
        Commands::Update {
            file,
            coordinate,
            version,
            scope,
            write,
        } => run_update(file, coordinate, version, scope, write).await,
        Commands::UpdatePlugin {
            file,
            id,
            version,
            write,
        } => run_update_plugin(file, id, version, write).await,
        Commands::Remove {
            file,
            coordinate,
            scope,
            write,
        } => run_remove(file, coordinate, scope, write),
        Commands::Exclude {
            file,
            coordinate,
            exclusion,
            scope,
            write,
        } => run_exclusion(file, coordinate, exclusion, scope, write, true),
        Commands::Include {
            file,
            coordinate,
            exclusion,
            scope,
            write,
        } => run_exclusion(file, coordinate, exclusion, scope, write, false),
        Commands::Search {
            query,
            limit,
            output,
        } => run_search(query, limit, output).await,
        Commands::ProfileScan { root, iterations } => run_profile_scan(root, iterations).await,
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Reports scan progress on stderr.
struct ProgressListener;

impl ScanListener for ProgressListener {
    fn on_installed(&self, report: &ScanReport) {
        eprintln!(
            "Found {} dependencies and {} plugins in {} build files, checking for updates...",
            report.dependencies.len(),
            report.plugins.len(),
            report.files.len()
        );
    }

    fn on_updates(&self, updates: &[DependencyUpdate], plugin_updates: &[PluginUpdate]) {
        tracing::info!(
            "{} dependency updates, {} plugin updates",
            updates.len(),
            plugin_updates.len()
        );
    }
}

fn service_for(root: &Path) -> anyhow::Result<DependencyService> {
    let config = Config::load(root);
    let resolver = UpdateResolver::from_config(&config)?;
    Ok(DependencyService::new(root, resolver))
}

fn print_warnings(report: &ScanReport) {
    for warning in &report.warnings {
        eprintln!("warning: {}", warning);
    }
}

fn print_packages(
    root: &Path,
    packages: &[jvm_deps::aggregator::UnifiedPackage],
    output: OutputFormat,
) -> anyhow::Result<()> {
    match output {
        OutputFormat::Json => println!(
            "{}",
            reports::generate_json_report(root, packages).context("Failed to serialize report")?
        ),
        OutputFormat::Markdown => println!("{}", reports::generate_markdown_report(root, packages)),
        OutputFormat::Summary => println!("{}", reports::generate_summary(packages)),
    }
    Ok(())
}

async fn run_scan(root: PathBuf, output: OutputFormat) -> anyhow::Result<ExitCode> {
    let report = scan_project(&root).await;
    print_warnings(&report);
    let packages = merge([
        aggregate(&report.dependencies, &[]),
        aggregate_plugins(&report.plugins, &[]),
    ]);
    print_packages(&root, &packages, output)?;
    Ok(ExitCode::SUCCESS)
}

async fn run_outdated(
    root: PathBuf,
    output: OutputFormat,
    fail_on_outdated: bool,
) -> anyhow::Result<ExitCode> {
    let service = service_for(&root)?;
    let refresh = service.refresh(&ProgressListener).await;
    print_warnings(&refresh.report);
    print_packages(&root, &refresh.packages, output)?;

    if fail_on_outdated && refresh.packages.iter().any(|p| p.has_update()) {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn parse_coordinate(coordinate: &str) -> anyhow::Result<Coordinate> {
    Coordinate::parse(coordinate)
        .with_context(|| format!("Invalid coordinate '{}', expected group:artifact", coordinate))
}

fn project_dir(file: &Path) -> PathBuf {
    match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Scan `file` on its own, with the project catalog when one is found above it.
fn scan_single(file: &Path) -> anyhow::Result<ScanResult> {
    let file_type = FileType::detect(file)
        .with_context(|| format!("Unsupported build file: {}", file.display()))?;
    let dir = project_dir(file);
    let dir_name = dir
        .canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "root".to_string());

    // The catalog lives at the project root, which may be any ancestor.
    let catalog = if file_type.is_script() {
        match dir.ancestors().find(|d| d.join(CATALOG_PATH).is_file()) {
            Some(root) => load_catalog(root)?.map(std::sync::Arc::new),
            None => None,
        }
    } else {
        None
    };

    let build_file = BuildFile {
        module: module_name(&dir, file, &dir_name),
        path: file.to_path_buf(),
        file_type,
    };
    let scan = scan_file(&build_file, catalog);
    if let Some(error) = &scan.error {
        tracing::warn!("Partial scan of {}: {}", file.display(), error);
    }
    Ok(scan)
}

/// Scan `file` alone and pick the single declaration of `coordinate`.
fn find_record(
    file: &Path,
    coordinate: &Coordinate,
    scope: Option<&str>,
) -> anyhow::Result<InstalledDependency> {
    let scan = scan_single(file)?;
    let mut matches: Vec<InstalledDependency> = scan
        .dependencies
        .into_iter()
        .filter(|d| &d.coordinate == coordinate)
        .filter(|d| scope.is_none_or(|s| d.scope == s))
        .collect();
    match matches.len() {
        0 => bail!("{} is not declared in {}", coordinate, file.display()),
        1 => Ok(matches.remove(0)),
        n => bail!(
            "{} is declared {} times in {}; pass --scope to pick one",
            coordinate,
            n,
            file.display()
        ),
    }
}

/// Print the diff and write it when asked to.
fn finish_edit(file: &Path, original: &str, modified: &str, write: bool) -> anyhow::Result<ExitCode> {
    let diff = reports::preview_diff(file, original, modified);
    if diff.is_empty() {
        eprintln!("No changes for {}", file.display());
        return Ok(ExitCode::SUCCESS);
    }
    print!("{}", diff);
    if write {
        jvm_deps::project::apply_changes(file, modified)?;
        eprintln!("Wrote {}", file.display());
    }
    Ok(ExitCode::SUCCESS)
}

fn read_file(file: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(file).with_context(|| format!("Error reading {}", file.display()))
}

fn run_add(
    file: PathBuf,
    coordinate: String,
    version: Option<String>,
    scope: Option<String>,
    write: bool,
) -> anyhow::Result<ExitCode> {
    let service = service_for(&project_dir(&file))?;
    let request = AddRequest::new(parse_coordinate(&coordinate)?, version, scope);
    let original = read_file(&file)?;
    let modified = service.added_content(&file, &request)?;
    finish_edit(&file, &original, &modified, write)
}

async fn run_update(
    file: PathBuf,
    coordinate: String,
    version: Option<String>,
    scope: Option<String>,
    write: bool,
) -> anyhow::Result<ExitCode> {
    let service = service_for(&project_dir(&file))?;
    let coordinate = parse_coordinate(&coordinate)?;
    let record = find_record(&file, &coordinate, scope.as_deref())?;
    let version = match version {
        Some(version) => version,
        None => {
            if service.latest_version(&coordinate).await.is_none() {
                bail!("No upstream version known for {}", coordinate);
            }
            match service.newer_version(&record).await {
                Some(version) => version,
                None => {
                    eprintln!("{} is already up to date", coordinate);
                    return Ok(ExitCode::SUCCESS);
                }
            }
        }
    };
    let original = read_file(&file)?;
    let modified = service.updated_content(&record, &version)?;
    finish_edit(&file, &original, &modified, write)
}

async fn run_update_plugin(
    file: PathBuf,
    id: String,
    version: Option<String>,
    write: bool,
) -> anyhow::Result<ExitCode> {
    let service = service_for(&project_dir(&file))?;
    let plugin = scan_single(&file)?
        .plugins
        .into_iter()
        .find(|p| p.id == id)
        .with_context(|| format!("Plugin {} is not declared in {}", id, file.display()))?;
    let version = match version {
        Some(version) => version,
        None => {
            if service.resolver().latest_plugin_version(&plugin.id).await.is_none() {
                bail!("No published version known for {}", plugin.id);
            }
            match service.newer_plugin_version(&plugin).await {
                Some(version) => version,
                None => {
                    eprintln!("{} is already up to date", plugin.id);
                    return Ok(ExitCode::SUCCESS);
                }
            }
        }
    };
    let original = read_file(&file)?;
    let modified = service.updated_plugin_content(&plugin, &version)?;
    finish_edit(&file, &original, &modified, write)
}

fn run_remove(
    file: PathBuf,
    coordinate: String,
    scope: Option<String>,
    write: bool,
) -> anyhow::Result<ExitCode> {
    let service = service_for(&project_dir(&file))?;
    let record = find_record(&file, &parse_coordinate(&coordinate)?, scope.as_deref())?;
    let original = read_file(&file)?;
    let modified = service.removed_content(&record)?;
    finish_edit(&file, &original, &modified, write)
}

fn run_exclusion(
    file: PathBuf,
    coordinate: String,
    exclusion: String,
    scope: Option<String>,
    write: bool,
    add: bool,
) -> anyhow::Result<ExitCode> {
    let service = service_for(&project_dir(&file))?;
    let record = find_record(&file, &parse_coordinate(&coordinate)?, scope.as_deref())?;
    let exclusion = DependencyExclusion::parse(&exclusion)
        .with_context(|| format!("Invalid exclusion '{}', expected group[:artifact]", exclusion))?;
    let original = read_file(&file)?;
    let modified = if add {
        service.exclusion_added_content(&record, &exclusion)?
    } else {
        service.exclusion_removed_content(&record, &exclusion)?
    };
    finish_edit(&file, &original, &modified, write)
}

async fn run_search(query: String, limit: usize, output: OutputFormat) -> anyhow::Result<ExitCode> {
    let root = PathBuf::from(".");
    let resolver = UpdateResolver::from_config(&Config::load(&root))?;
    let results = resolver.search(&query, limit).await;
    if results.is_empty() {
        eprintln!("No results for '{}'", query);
        return Ok(ExitCode::SUCCESS);
    }

    match output {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&from_search_results(&results))
                .context("Failed to serialize results")?
        ),
        OutputFormat::Markdown => {
            println!("| Package | Latest | Description |");
            println!("|---------|--------|-------------|");
            for result in &results {
                println!(
                    "| `{}` | {} | {} |",
                    result.coordinate,
                    result.latest_version.as_deref().unwrap_or("?"),
                    result.description.as_deref().unwrap_or("")
                );
            }
        }
        OutputFormat::Summary => {
            for result in &results {
                match &result.latest_version {
                    Some(latest) => println!("{} {}", result.coordinate, latest),
                    None => println!("{}", result.coordinate),
                }
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_profile_scan(root: PathBuf, iterations: usize) -> anyhow::Result<ExitCode> {
    if iterations == 0 {
        bail!("--iterations must be at least 1");
    }
    eprintln!("Profiling project scan for: {}", root.display());
    eprintln!("Iterations: {}", iterations);

    let start = Instant::now();
    let mut declarations = 0;
    for _ in 0..iterations {
        let report = std::hint::black_box(scan_project(&root).await);
        declarations = report.dependencies.len() + report.plugins.len();
    }

    let elapsed = start.elapsed();
    eprintln!("\nProfiling complete!");
    eprintln!("Declarations per scan: {}", declarations);
    eprintln!("Total time: {:?}", elapsed);
    eprintln!("Average per iteration: {:?}", average(elapsed, iterations));

    Ok(ExitCode::SUCCESS)
}

fn average(elapsed: Duration, iterations: usize) -> Duration {
    elapsed.div_f64(iterations as f64)
}
