//! Outdated-dependency report generation
//!
//! Renders the unified package view as JSON, Markdown or a one-line-per-
//! package summary.

use std::path::Path;

use serde::Serialize;
use similar::TextDiff;

use crate::aggregator::{PackageMetadata, UnifiedPackage};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub total: usize,
    pub outdated: usize,
    pub managed: usize,
    pub up_to_date: usize,
}

impl ReportSummary {
    pub fn from_packages(packages: &[UnifiedPackage]) -> Self {
        let installed: Vec<&UnifiedPackage> = packages.iter().filter(|p| p.is_installed()).collect();
        let outdated = installed.iter().filter(|p| p.has_update()).count();
        let managed = installed
            .iter()
            .filter(|p| p.installed_version.is_none())
            .count();
        let up_to_date = installed
            .iter()
            .filter(|p| p.installed_version.is_some() && !p.has_update())
            .count();
        Self {
            total: installed.len(),
            outdated,
            managed,
            up_to_date,
        }
    }
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    project: String,
    generated_at: String,
    summary: ReportSummary,
    packages: &'a [UnifiedPackage],
}

pub fn generate_json_report(project: &Path, packages: &[UnifiedPackage]) -> serde_json::Result<String> {
    let report = JsonReport {
        project: project.display().to_string(),
        generated_at: chrono::Utc::now().to_rfc3339(),
        summary: ReportSummary::from_packages(packages),
        packages,
    };
    serde_json::to_string_pretty(&report)
}

fn origin_label(metadata: &PackageMetadata) -> &'static str {
    match metadata {
        PackageMetadata::Script { .. } => "gradle",
        PackageMetadata::Xml { .. } => "maven",
        PackageMetadata::PluginPortal { .. } => "plugin",
        PackageMetadata::CentralSearch { .. } => "central",
        PackageMetadata::PackageRegistry { .. } => "registry",
        PackageMetadata::None => "-",
    }
}

pub fn generate_markdown_report(project: &Path, packages: &[UnifiedPackage]) -> String {
    let summary = ReportSummary::from_packages(packages);
    let mut lines = vec![
        "# Dependency Report".to_string(),
        String::new(),
        format!("**Project**: {}", project.display()),
        format!("**Date**: {}", chrono::Local::now().format("%Y-%m-%d")),
        String::new(),
        "## Summary".to_string(),
        "| Status | Count |".to_string(),
        "|--------|-------|".to_string(),
        format!("| ⬆ Outdated | {} |", summary.outdated),
        format!("| ✓ Up to date | {} |", summary.up_to_date),
        format!("| ○ Managed | {} |", summary.managed),
        format!("| **Total** | **{}** |", summary.total),
        String::new(),
    ];

    let outdated: Vec<&UnifiedPackage> = packages.iter().filter(|p| p.has_update()).collect();
    if outdated.is_empty() {
        lines.push("## No updates available".to_string());
        lines.push(String::new());
        lines.push("✅ All dependencies are up to date.".to_string());
        return lines.join("\n");
    }

    lines.push("## Updates".to_string());
    lines.push(String::new());
    lines.push("| Package | Installed | Latest | Scope | Modules | Origin |".to_string());
    lines.push("|---------|-----------|--------|-------|---------|--------|".to_string());
    for package in outdated {
        lines.push(format!(
            "| `{}` | {} | {} | {} | {} | {} |",
            package.id,
            package.installed_version.as_deref().unwrap_or("managed"),
            package.latest_version.as_deref().unwrap_or("?"),
            package.scope.as_deref().unwrap_or("-"),
            package.modules.join(", "),
            origin_label(&package.metadata),
        ));
    }
    lines.join("\n")
}

/// One line per installed package, outdated ones marked with `⬆`.
pub fn generate_summary(packages: &[UnifiedPackage]) -> String {
    let summary = ReportSummary::from_packages(packages);
    let mut lines: Vec<String> = packages
        .iter()
        .filter(|p| p.is_installed())
        .map(|p| {
            let installed = p.installed_version.as_deref().unwrap_or("managed");
            match (&p.latest_version, p.has_update()) {
                (Some(latest), true) => format!("⬆ {} {} -> {}", p.id, installed, latest),
                _ => format!("  {} {}", p.id, installed),
            }
        })
        .collect();
    lines.push(format!(
        "{} dependencies, {} outdated",
        summary.total, summary.outdated
    ));
    lines.join("\n")
}

/// Unified line diff of a pending edit, empty when nothing changes.
pub fn preview_diff(path: &Path, original: &str, modified: &str) -> String {
    if original == modified {
        return String::new();
    }
    let name = path.display().to_string();
    TextDiff::from_lines(original, modified)
        .unified_diff()
        .context_radius(3)
        .header(&format!("a/{name}"), &format!("b/{name}"))
        .to_string()
}
