//! Edits for Groovy and Kotlin build scripts.

use std::ops::Range;

use crate::error::EditError;
use crate::file_types::{FileType, GradleDialect};
use crate::model::{DependencyExclusion, InstalledDependency, InstalledPlugin, PluginSyntax};
use crate::parsers::blocks::{Block, MaskedSource, is_ident_byte};
use crate::parsers::catalog::normalize_accessor;
use crate::parsers::gradle::{
    Declaration, Notation, PluginRef, dependency_declarations, plugin_declarations,
};

use super::layout::{
    detect_eol, indent_unit, line_indent, line_start, removal_range, splice,
};
use super::{AddRequest, Mutator, check_literal, check_range, stale};

const CATALOG_MANAGED: &str = "catalog-backed versions are edited in the version catalog";

/// Mutator for `build.gradle` and `build.gradle.kts`
#[derive(Debug, Clone, Copy)]
pub struct ScriptMutator {
    dialect: GradleDialect,
}

impl ScriptMutator {
    pub fn new(dialect: GradleDialect) -> Self {
        Self { dialect }
    }

    /// Find the declaration `record` was scanned from and make sure it is the only one.
    fn locate(&self, text: &str, record: &InstalledDependency) -> Result<Declaration, EditError> {
        check_range(text, record)?;
        let declarations = dependency_declarations(text, self.dialect);
        let range = record.range.offset..record.range.end();

        let declaration = declarations
            .iter()
            .find(|(r, _)| *r == range)
            .map(|(_, d)| d)
            .filter(|d| matches_record(d, record))
            .ok_or_else(|| stale(record))?;

        let count = declarations
            .iter()
            .filter(|(_, d)| matches_record(d, record))
            .count();
        if count > 1 {
            return Err(EditError::Ambiguous {
                coordinate: record.coordinate.to_string(),
                count,
            });
        }

        Ok(declaration.clone())
    }

    /// Replace or add the version of a `plugins { }` entry.
    pub fn update_plugin(
        &self,
        text: &str,
        plugin: &InstalledPlugin,
        new_version: &str,
    ) -> Result<String, EditError> {
        check_literal(new_version)?;
        let stale_plugin = || EditError::StaleRange {
            offset: plugin.range.offset,
            length: plugin.range.length,
        };
        let slice = plugin.range.slice(text).ok_or_else(stale_plugin)?;
        let range = plugin.range.offset..plugin.range.end();

        let declaration = plugin_declarations(text, self.dialect)
            .into_iter()
            .find(|(r, _)| *r == range)
            .map(|(_, d)| d)
            .ok_or_else(stale_plugin)?;
        let same_plugin = match &declaration.plugin {
            PluginRef::Id(id) => *id == plugin.id,
            PluginRef::Catalog(accessor) => plugin
                .catalog_key
                .as_deref()
                .is_some_and(|key| normalize_accessor(key) == normalize_accessor(accessor)),
        };
        if !same_plugin {
            return Err(stale_plugin());
        }

        if let Some(span) = declaration.version_span {
            return Ok(splice(
                text,
                range.start + span.start..range.start + span.end,
                new_version,
            ));
        }

        match declaration.syntax {
            PluginSyntax::Id | PluginSyntax::KotlinShorthand => {
                let code_end = MaskedSource::new(slice).code_end(0..slice.len());
                let quote = self.quote(text);
                let at = range.start + code_end;
                Ok(splice(
                    text,
                    at..at,
                    &format!(" version {quote}{new_version}{quote}"),
                ))
            }
            PluginSyntax::CatalogAlias => Err(EditError::Unsupported(CATALOG_MANAGED)),
            PluginSyntax::Bare | PluginSyntax::LegacyApply => Err(EditError::Unsupported(
                "core and legacy-applied plugins carry no version",
            )),
        }
    }

    /// Quote character used by the file's existing string literals.
    fn quote(&self, text: &str) -> char {
        match self.dialect {
            GradleDialect::Kotlin => '"',
            GradleDialect::Groovy => dependency_declarations(text, self.dialect)
                .iter()
                .find_map(|(range, _)| {
                    text[range.clone()]
                        .chars()
                        .find(|&c| matches!(c, '\'' | '"'))
                })
                .unwrap_or('\''),
        }
    }

    fn render(&self, text: &str, scope: &str, request: &AddRequest) -> String {
        let notation = match &request.version {
            Some(version) => format!("{}:{}", request.coordinate, version),
            None => request.coordinate.to_string(),
        };
        match self.dialect {
            GradleDialect::Kotlin => format!("{scope}(\"{notation}\")"),
            GradleDialect::Groovy => {
                let quote = self.quote(text);
                format!("{scope} {quote}{notation}{quote}")
            }
        }
    }

    fn default_scope(&self) -> &'static str {
        match self.dialect {
            GradleDialect::Groovy => FileType::GradleGroovy.default_scope(),
            GradleDialect::Kotlin => FileType::GradleKotlin.default_scope(),
        }
    }
}

fn matches_record(declaration: &Declaration, record: &InstalledDependency) -> bool {
    if declaration.configuration != record.scope {
        return false;
    }
    match &declaration.notation {
        Notation::Literal { coordinate, .. } => {
            !record.from_version_catalog && *coordinate == record.coordinate
        }
        Notation::Catalog { accessor } => record
            .catalog_key
            .as_deref()
            .is_some_and(|key| normalize_accessor(key) == normalize_accessor(accessor)),
    }
}

impl Mutator for ScriptMutator {
    fn remove(&self, text: &str, record: &InstalledDependency) -> Result<String, EditError> {
        self.locate(text, record)?;
        let range = removal_range(text, record.range.offset..record.range.end());
        Ok(splice(text, range, ""))
    }

    fn update(
        &self,
        text: &str,
        record: &InstalledDependency,
        new_version: &str,
    ) -> Result<String, EditError> {
        check_literal(new_version)?;
        let declaration = self.locate(text, record)?;
        let Notation::Literal {
            version_span,
            version_insert,
            ..
        } = declaration.notation
        else {
            return Err(EditError::Unsupported(CATALOG_MANAGED));
        };

        let base = record.range.offset;
        match (version_span, version_insert) {
            (Some(span), _) => Ok(splice(
                text,
                base + span.start..base + span.end,
                new_version,
            )),
            (None, Some(at)) => Ok(splice(
                text,
                base + at..base + at,
                &format!(":{new_version}"),
            )),
            (None, None) => Err(EditError::ManagedVersion),
        }
    }

    fn add(&self, text: &str, request: &AddRequest) -> Result<String, EditError> {
        let scope = request.scope.as_deref().unwrap_or(self.default_scope());
        if scope.is_empty() || !scope.bytes().all(is_ident_byte) {
            return Err(EditError::Unsupported("configuration must be an identifier"));
        }
        check_literal(&request.coordinate.group)?;
        check_literal(&request.coordinate.artifact)?;
        if let Some(version) = &request.version {
            check_literal(version)?;
        }

        let masked = MaskedSource::new(text);
        if masked.error().is_some() {
            return Err(EditError::Unsupported(
                "file has an unterminated string or comment",
            ));
        }

        let declarations = dependency_declarations(text, self.dialect);
        let duplicate = declarations.iter().any(|(_, d)| {
            d.configuration == scope
                && matches!(&d.notation, Notation::Literal { coordinate, .. } if *coordinate == request.coordinate)
        });
        if duplicate {
            return Err(EditError::AlreadyDeclared(request.coordinate.to_string()));
        }

        let statement = self.render(text, scope, request);
        let eol = detect_eol(text);
        let (blocks, block_error) = masked.find_top_level_blocks("dependencies");
        if block_error.is_some() {
            return Err(EditError::Unsupported(
                "file has an unterminated or unbalanced block",
            ));
        }

        match blocks.iter().find(|b| b.is_closed()) {
            Some(block) => Ok(insert_into_block(
                text,
                &masked,
                block,
                &declarations,
                &statement,
                eol,
            )),
            None => Ok(append_block(text, &statement, eol)),
        }
    }

    fn add_exclusion(
        &self,
        _text: &str,
        _record: &InstalledDependency,
        _exclusion: &DependencyExclusion,
    ) -> Result<String, EditError> {
        Err(EditError::Unsupported(
            "exclusions are only editable in Maven descriptors",
        ))
    }

    fn remove_exclusion(
        &self,
        _text: &str,
        _record: &InstalledDependency,
        _exclusion: &DependencyExclusion,
    ) -> Result<String, EditError> {
        Err(EditError::Unsupported(
            "exclusions are only editable in Maven descriptors",
        ))
    }
}

fn insert_into_block(
    text: &str,
    masked: &MaskedSource,
    block: &Block,
    declarations: &[(Range<usize>, Declaration)],
    statement: &str,
    eol: &str,
) -> String {
    let body = block.body(text.len());
    let close = body.end;
    let unit = indent_unit(text);
    let close_line = line_start(text, close);

    if close_line > block.open && text[close_line..close].trim().is_empty() {
        let indent = declarations
            .iter()
            .rev()
            .find(|(range, _)| body.contains(&range.start))
            .map(|(range, _)| line_indent(text, range.start).to_string())
            .unwrap_or_else(|| format!("{}{}", line_indent(text, close), unit));
        return splice(
            text,
            close_line..close_line,
            &format!("{indent}{statement}{eol}"),
        );
    }

    // The closing brace shares a line with other code; give it its own line.
    let block_indent = line_indent(text, block.keyword_start);
    let code_end = masked.code_end(body);
    splice(
        text,
        code_end..close,
        &format!("{eol}{block_indent}{unit}{statement}{eol}{block_indent}"),
    )
}

fn append_block(text: &str, statement: &str, eol: &str) -> String {
    let unit = indent_unit(text);
    let mut out = String::with_capacity(text.len() + statement.len() + 32);
    out.push_str(text);
    if !text.is_empty() {
        if !text.ends_with('\n') {
            out.push_str(eol);
        }
        out.push_str(eol);
    }
    out.push_str(&format!("dependencies {{{eol}{unit}{statement}{eol}}}{eol}"));
    out
}
