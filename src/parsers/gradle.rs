//! Scanner for Gradle build scripts (Groovy and Kotlin DSL)
//!
//! Only statements sitting directly inside a top-level `dependencies { }` or
//! `plugins { }` block are recognized, one statement per line. Anything built
//! at runtime (string templates, concatenation, loops, closures) is skipped on
//! purpose: a declaration that is not recognized is never edited.

use std::ops::Range;
use std::sync::Arc;

use super::blocks::{Block, MaskedSource, is_ident_byte, is_line_end, is_line_start, line_ranges};
use super::catalog::VersionCatalog;
use super::{BuildFileParser, ScanContext, ScanResult};
use crate::file_types::GradleDialect;
use crate::model::{
    Coordinate, DeclaredVersion, InstalledDependency, InstalledPlugin, PluginSyntax, SourceRange,
};

/// Identifiers that look like a call but never declare a dependency.
const NON_CONFIGURATIONS: &[&str] = &["apply", "exclude", "because", "id", "alias", "kotlin"];

/// Prefix Gradle puts in front of `kotlin("...")` plugin shorthands.
const KOTLIN_PLUGIN_PREFIX: &str = "org.jetbrains.kotlin.";

/// Parser for `build.gradle` and `build.gradle.kts` files
#[derive(Debug, Clone)]
pub struct GradleParser {
    dialect: GradleDialect,
    catalog: Option<Arc<VersionCatalog>>,
}

impl GradleParser {
    pub fn new(dialect: GradleDialect) -> Self {
        Self {
            dialect,
            catalog: None,
        }
    }

    /// Resolve `libs.*` references against `catalog`.
    pub fn with_catalog(dialect: GradleDialect, catalog: Option<Arc<VersionCatalog>>) -> Self {
        Self { dialect, catalog }
    }

    pub fn dialect(&self) -> GradleDialect {
        self.dialect
    }

    fn to_dependency(
        &self,
        declaration: Declaration,
        range: Range<usize>,
        ctx: &ScanContext<'_>,
    ) -> Option<InstalledDependency> {
        let mut classifier = None;
        let mut extension = None;
        let (coordinate, version, catalog_key) = match declaration.notation {
            Notation::Literal {
                coordinate,
                version,
                classifier: literal_classifier,
                extension: literal_extension,
                ..
            } => {
                classifier = literal_classifier;
                extension = literal_extension;
                (coordinate, version, None)
            }
            Notation::Catalog { accessor } => {
                if is_non_library_accessor(&accessor) {
                    return None;
                }
                let Some(library) = self.catalog.as_ref().and_then(|c| c.library(&accessor))
                else {
                    tracing::debug!("Unresolved catalog reference libs.{}", accessor);
                    return None;
                };
                (
                    library.coordinate.clone(),
                    library.version.clone(),
                    Some(library.key.clone()),
                )
            }
        };

        Some(InstalledDependency {
            coordinate,
            version: version.map_or(DeclaredVersion::Managed, DeclaredVersion::Literal),
            scope: declaration.configuration,
            module: ctx.module.to_string(),
            range: SourceRange::new(ctx.file, range.start, range.len()),
            from_version_catalog: catalog_key.is_some(),
            catalog_key,
            optional: false,
            classifier,
            extension,
            exclusions: Vec::new(),
        })
    }

    fn to_plugin(
        &self,
        declaration: PluginDeclaration,
        range: Range<usize>,
        ctx: &ScanContext<'_>,
    ) -> Option<InstalledPlugin> {
        let (id, version, catalog_key) = match declaration.plugin {
            PluginRef::Id(id) => (id, declaration.version, None),
            PluginRef::Catalog(accessor) => {
                let Some(plugin) = self.catalog.as_ref().and_then(|c| c.plugin(&accessor)) else {
                    tracing::debug!("Unresolved catalog plugin libs.plugins.{}", accessor);
                    return None;
                };
                (
                    plugin.id.clone(),
                    declaration.version.or_else(|| plugin.version.clone()),
                    Some(plugin.key.clone()),
                )
            }
        };

        Some(InstalledPlugin {
            id,
            version,
            syntax: declaration.syntax,
            shorthand: matches!(
                declaration.syntax,
                PluginSyntax::KotlinShorthand | PluginSyntax::Bare
            ),
            applied: declaration.applied,
            module: ctx.module.to_string(),
            range: SourceRange::new(ctx.file, range.start, range.len()),
            catalog_key,
        })
    }
}

impl BuildFileParser for GradleParser {
    fn scan(&self, content: &str, ctx: &ScanContext<'_>) -> ScanResult {
        let masked = MaskedSource::new(content);
        let mut result = ScanResult::default();
        let mut error = masked.error().cloned();

        let (blocks, block_error) = masked.find_top_level_blocks("dependencies");
        error = error.or(block_error);
        for (range, declaration) in declarations_in(content, &masked, &blocks, self.dialect) {
            if let Some(dep) = self.to_dependency(declaration, range, ctx) {
                result.dependencies.push(dep);
            }
        }

        let (blocks, block_error) = masked.find_top_level_blocks("plugins");
        error = error.or(block_error);
        for (range, declaration) in plugins_in(content, &masked, &blocks, self.dialect) {
            if let Some(plugin) = self.to_plugin(declaration, range, ctx) {
                result.plugins.push(plugin);
            }
        }

        tracing::debug!(
            dependencies = result.dependencies.len(),
            plugins = result.plugins.len(),
            "Scanned {}",
            ctx.file.display()
        );

        result.error = error;
        result
    }
}

/// Every recognized dependency statement with its range, in file order.
pub fn dependency_declarations(
    content: &str,
    dialect: GradleDialect,
) -> Vec<(Range<usize>, Declaration)> {
    let masked = MaskedSource::new(content);
    let (blocks, _) = masked.find_top_level_blocks("dependencies");
    declarations_in(content, &masked, &blocks, dialect)
}

/// Every recognized plugin statement with its range, legacy `apply` lines included.
pub fn plugin_declarations(
    content: &str,
    dialect: GradleDialect,
) -> Vec<(Range<usize>, PluginDeclaration)> {
    let masked = MaskedSource::new(content);
    let (blocks, _) = masked.find_top_level_blocks("plugins");
    plugins_in(content, &masked, &blocks, dialect)
}

/// Nothing past an unterminated string or comment can be trusted.
fn trusted_limit(masked: &MaskedSource) -> usize {
    masked.failure_offset().unwrap_or(usize::MAX)
}

fn declarations_in(
    content: &str,
    masked: &MaskedSource,
    blocks: &[Block],
    dialect: GradleDialect,
) -> Vec<(Range<usize>, Declaration)> {
    let limit = trusted_limit(masked);
    blocks
        .iter()
        .flat_map(|block| statement_ranges(content, masked, block.body(content.len())))
        .filter(|range| range.start < limit)
        .filter_map(|range| {
            parse_declaration(&content[range.clone()], dialect).map(|d| (range, d))
        })
        .collect()
}

fn plugins_in(
    content: &str,
    masked: &MaskedSource,
    blocks: &[Block],
    dialect: GradleDialect,
) -> Vec<(Range<usize>, PluginDeclaration)> {
    let limit = trusted_limit(masked);
    let in_blocks = blocks
        .iter()
        .flat_map(|block| statement_ranges(content, masked, block.body(content.len())))
        .filter_map(|range| parse_plugin(&content[range.clone()], dialect).map(|d| (range, d)));

    let legacy = masked
        .top_level_lines()
        .into_iter()
        .filter(|line| !masked.is_blank(line.clone()))
        .map(|line| declaration_span(content, masked, line))
        .filter_map(|range| {
            parse_legacy_apply(&content[range.clone()], dialect).map(|d| (range, d))
        });

    in_blocks
        .chain(legacy)
        .filter(|(range, _)| range.start < limit)
        .collect()
}

/// Accessor paths under `libs.` that do not name a single library.
fn is_non_library_accessor(accessor: &str) -> bool {
    ["bundles.", "versions.", "plugins."]
        .iter()
        .any(|prefix| accessor.starts_with(prefix))
}

/// Lines of `body` that hold a complete statement at the block's own nesting level.
fn statement_ranges(content: &str, masked: &MaskedSource, body: Range<usize>) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut depth = 0isize;
    for line in line_ranges(content.as_bytes(), body) {
        let (delta, min) = masked.depth_delta(line.clone());
        let top_level = depth == 0 && delta == 0 && min >= 0;
        depth = (depth + delta).max(0);
        if top_level && !masked.is_blank(line.clone()) {
            ranges.push(declaration_span(content, masked, line));
        }
    }
    ranges
}

/// Whole physical line when the statement owns it, otherwise just the code.
fn declaration_span(content: &str, masked: &MaskedSource, line: Range<usize>) -> Range<usize> {
    let start = if is_line_start(content, line.start) {
        line.start
    } else {
        let text = &content[line.clone()];
        line.start + (text.len() - text.trim_start().len())
    };
    let end = if is_line_end(content, line.end) {
        line.end
    } else {
        masked.code_end(line)
    };
    start..end.max(start)
}

/// One dependency statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub configuration: String,
    pub notation: Notation,
    /// Wrapped in `platform(...)` or `enforcedPlatform(...)`
    pub platform: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notation {
    /// `"g:a:v"` string or `group/name/version` map. Spans are relative to the parsed text.
    Literal {
        coordinate: Coordinate,
        version: Option<String>,
        version_span: Option<Range<usize>>,
        /// Where `:<version>` can be inserted into a string notation that has none
        version_insert: Option<usize>,
        classifier: Option<String>,
        extension: Option<String>,
    },
    /// `libs.some.alias`, stored without the `libs.` prefix
    Catalog { accessor: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginRef {
    Id(String),
    Catalog(String),
}

/// One plugin statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginDeclaration {
    pub plugin: PluginRef,
    pub version: Option<String>,
    /// Span of the version literal relative to the parsed text
    pub version_span: Option<Range<usize>>,
    pub syntax: PluginSyntax,
    pub applied: bool,
}

/// Parse one dependency statement such as `implementation("g:a:v")`.
///
/// Trailing comments are ignored. Returns `None` for anything that is not a
/// single literal or catalog declaration.
pub fn parse_declaration(text: &str, dialect: GradleDialect) -> Option<Declaration> {
    let masked = MaskedSource::new(text);
    let mut cur = Cursor::new(text, masked.code_end(0..text.len()));
    cur.skip_ws();

    let configuration = cur.ident()?;
    if NON_CONFIGURATIONS.contains(&configuration) {
        return None;
    }

    let had_ws = cur.skip_ws();
    let parenthesized = if cur.eat("(") {
        true
    } else if dialect == GradleDialect::Groovy && had_ws {
        false
    } else {
        return None;
    };

    let (notation, platform) = parse_argument(&mut cur, dialect)?;
    cur.skip_ws();
    if parenthesized && !cur.eat(")") {
        return None;
    }
    cur.skip_ws();
    if !cur.at_end() {
        return None;
    }

    Some(Declaration {
        configuration: configuration.to_string(),
        notation,
        platform,
    })
}

fn parse_argument(cur: &mut Cursor<'_>, dialect: GradleDialect) -> Option<(Notation, bool)> {
    cur.skip_ws();

    for wrapper in ["enforcedPlatform", "platform"] {
        let save = cur.pos;
        if cur.eat_keyword(wrapper) {
            cur.skip_ws();
            if cur.eat("(") {
                let (notation, _) = parse_argument(cur, dialect)?;
                cur.skip_ws();
                return cur.eat(")").then_some((notation, true));
            }
        }
        cur.pos = save;
    }

    if cur.at_quote(dialect) {
        let (content, span) = cur.literal(dialect)?;
        return coordinate_notation(content, span.start).map(|n| (n, false));
    }

    if cur.eat("libs.") {
        let accessor = cur.accessor()?;
        return Some((
            Notation::Catalog {
                accessor: accessor.to_string(),
            },
            false,
        ));
    }

    map_notation(cur, dialect).map(|n| (n, false))
}

/// Split `group:artifact[:version[:classifier]][@ext]`.
fn coordinate_notation(content: &str, start: usize) -> Option<Notation> {
    let (coords, extension) = match content.split_once('@') {
        Some((coords, extension)) => (coords, Some(extension.to_string())),
        None => (content, None),
    };
    let parts: Vec<&str> = coords.split(':').collect();
    if !(2..=4).contains(&parts.len()) || !is_coordinate_part(parts[0]) || !is_coordinate_part(parts[1])
    {
        return None;
    }

    let artifact_end = start + parts[0].len() + 1 + parts[1].len();
    let (version, version_span, version_insert) = match parts.get(2).filter(|v| !v.is_empty()) {
        Some(v) => {
            let version_start = artifact_end + 1;
            (
                Some(v.to_string()),
                Some(version_start..version_start + v.len()),
                None,
            )
        }
        None => (None, None, (parts.len() == 2).then_some(artifact_end)),
    };

    Some(Notation::Literal {
        coordinate: Coordinate::new(parts[0], parts[1]),
        version,
        version_span,
        version_insert,
        classifier: parts.get(3).filter(|c| !c.is_empty()).map(|c| c.to_string()),
        extension,
    })
}

/// `group: 'g', name: 'a', version: 'v'` or `group = "g", name = "a", version = "v"`.
fn map_notation(cur: &mut Cursor<'_>, dialect: GradleDialect) -> Option<Notation> {
    let separator = match dialect {
        GradleDialect::Groovy => ":",
        GradleDialect::Kotlin => "=",
    };
    let mut group = None;
    let mut name = None;
    let mut version = None;
    let mut classifier = None;
    let mut extension = None;

    loop {
        cur.skip_ws();
        let key = cur.ident()?;
        cur.skip_ws();
        if !cur.eat(separator) {
            return None;
        }
        cur.skip_ws();
        let (value, span) = cur.literal(dialect)?;
        match key {
            "group" => group = Some(value),
            "name" => name = Some(value),
            "version" => version = Some((value, span)),
            "classifier" => classifier = Some(value.to_string()),
            "ext" => extension = Some(value.to_string()),
            _ => {}
        }

        let save = cur.pos;
        cur.skip_ws();
        if !cur.eat(",") {
            cur.pos = save;
            break;
        }
    }

    let (group, name) = (group?, name?);
    if !is_coordinate_part(group) || !is_coordinate_part(name) {
        return None;
    }
    let (version, version_span) = match version {
        Some((v, span)) if !v.is_empty() => (Some(v.to_string()), Some(span)),
        _ => (None, None),
    };

    Some(Notation::Literal {
        coordinate: Coordinate::new(group, name),
        version,
        version_span,
        version_insert: None,
        classifier,
        extension,
    })
}

fn is_coordinate_part(part: &str) -> bool {
    !part.is_empty() && !part.chars().any(char::is_whitespace)
}

/// Parse one entry of a `plugins { }` block.
pub fn parse_plugin(text: &str, dialect: GradleDialect) -> Option<PluginDeclaration> {
    let masked = MaskedSource::new(text);
    let mut cur = Cursor::new(text, masked.code_end(0..text.len()));
    cur.skip_ws();

    let (plugin, syntax) = if cur.eat_keyword("id") {
        cur.skip_ws();
        let (id, _) = cur.call_argument(dialect)?;
        (PluginRef::Id(id.to_string()), PluginSyntax::Id)
    } else if cur.eat_keyword("kotlin") {
        cur.skip_ws();
        if !cur.eat("(") {
            return None;
        }
        cur.skip_ws();
        let (name, _) = cur.literal(dialect)?;
        cur.skip_ws();
        if !cur.eat(")") {
            return None;
        }
        (
            PluginRef::Id(format!("{KOTLIN_PLUGIN_PREFIX}{name}")),
            PluginSyntax::KotlinShorthand,
        )
    } else if cur.eat_keyword("alias") {
        cur.skip_ws();
        if !cur.eat("(") {
            return None;
        }
        cur.skip_ws();
        if !cur.eat("libs.plugins.") {
            return None;
        }
        let accessor = cur.accessor()?;
        cur.skip_ws();
        if !cur.eat(")") {
            return None;
        }
        (PluginRef::Catalog(accessor.to_string()), PluginSyntax::CatalogAlias)
    } else if dialect == GradleDialect::Kotlin {
        let id = if cur.eat("`") {
            let id = cur.take_until(b'`')?;
            cur.eat("`");
            id
        } else {
            cur.ident()?
        };
        (PluginRef::Id(id.to_string()), PluginSyntax::Bare)
    } else {
        return None;
    };

    let mut version = None;
    let mut applied = true;
    loop {
        cur.skip_ws();
        if cur.at_end() {
            break;
        }
        cur.eat(".");
        if cur.eat_keyword("version") {
            cur.skip_ws();
            let (v, span) = cur.call_argument(dialect)?;
            version = Some((v.to_string(), span));
        } else if cur.eat_keyword("apply") {
            cur.skip_ws();
            let paren = cur.eat("(");
            cur.skip_ws();
            applied = if cur.eat_keyword("false") {
                false
            } else if cur.eat_keyword("true") {
                true
            } else {
                return None;
            };
            cur.skip_ws();
            if paren && !cur.eat(")") {
                return None;
            }
        } else {
            return None;
        }
    }

    let (version, version_span) = version.map_or((None, None), |(v, span)| (Some(v), Some(span)));
    Some(PluginDeclaration {
        plugin,
        version,
        version_span,
        syntax,
        applied,
    })
}

/// Parse `apply plugin: 'x'` (Groovy) or `apply(plugin = "x")` (Kotlin).
pub fn parse_legacy_apply(text: &str, dialect: GradleDialect) -> Option<PluginDeclaration> {
    let masked = MaskedSource::new(text);
    let mut cur = Cursor::new(text, masked.code_end(0..text.len()));
    cur.skip_ws();
    if !cur.eat_keyword("apply") {
        return None;
    }
    cur.skip_ws();
    let paren = cur.eat("(");
    cur.skip_ws();
    if !cur.eat_keyword("plugin") {
        return None;
    }
    cur.skip_ws();
    if !(cur.eat(":") || cur.eat("=")) {
        return None;
    }
    cur.skip_ws();
    let (id, _) = cur.literal(dialect)?;
    cur.skip_ws();
    if paren && !cur.eat(")") {
        return None;
    }
    cur.skip_ws();
    if !cur.at_end() {
        return None;
    }

    Some(PluginDeclaration {
        plugin: PluginRef::Id(id.to_string()),
        version: None,
        version_span: None,
        syntax: PluginSyntax::LegacyApply,
        applied: true,
    })
}

/// Forward-only reader over a single statement.
struct Cursor<'a> {
    text: &'a str,
    pos: usize,
    end: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str, end: usize) -> Self {
        Self { text, pos: 0, end }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..self.end]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.end
    }

    fn peek(&self) -> Option<u8> {
        self.rest().as_bytes().first().copied()
    }

    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    /// Like [`Cursor::eat`] but the keyword must not continue as an identifier.
    fn eat_keyword(&mut self, keyword: &str) -> bool {
        let rest = self.rest();
        if rest.starts_with(keyword)
            && !rest.as_bytes().get(keyword.len()).is_some_and(|&b| is_ident_byte(b))
        {
            self.pos += keyword.len();
            true
        } else {
            false
        }
    }

    fn ident(&mut self) -> Option<&'a str> {
        let rest = self.rest();
        let first = *rest.as_bytes().first()?;
        if !(first.is_ascii_alphabetic() || first == b'_') {
            return None;
        }
        let len = rest.bytes().take_while(|&b| is_ident_byte(b)).count();
        self.pos += len;
        Some(&rest[..len])
    }

    /// Dotted accessor path such as `androidx.core.ktx`.
    fn accessor(&mut self) -> Option<&'a str> {
        let rest = self.rest();
        let len = rest
            .bytes()
            .take_while(|&b| is_ident_byte(b) || b == b'.')
            .count();
        let path = &rest[..len];
        if path.is_empty() || path.ends_with('.') || path.starts_with('.') {
            return None;
        }
        self.pos += len;
        Some(path)
    }

    fn take_until(&mut self, stop: u8) -> Option<&'a str> {
        let rest = self.rest();
        let len = rest.bytes().position(|b| b == stop)?;
        self.pos += len;
        Some(&rest[..len])
    }

    fn at_quote(&self, dialect: GradleDialect) -> bool {
        match self.peek() {
            Some(b'"') => true,
            Some(b'\'') => dialect == GradleDialect::Groovy,
            _ => false,
        }
    }

    /// A plain string literal. Escapes and `$` templates are rejected.
    fn literal(&mut self, dialect: GradleDialect) -> Option<(&'a str, Range<usize>)> {
        if !self.at_quote(dialect) {
            return None;
        }
        let quote = self.peek()?;
        let start = self.pos + 1;
        let len = self.text[start..self.end].bytes().position(|b| b == quote)?;
        let content = &self.text[start..start + len];
        if content.contains(['\\', '$']) {
            return None;
        }
        self.pos = start + len + 1;
        Some((content, start..start + len))
    }

    /// `"x"`, `("x")` or (Groovy) `'x'`.
    fn call_argument(&mut self, dialect: GradleDialect) -> Option<(&'a str, Range<usize>)> {
        let paren = self.eat("(");
        self.skip_ws();
        let literal = self.literal(dialect)?;
        self.skip_ws();
        if paren && !self.eat(")") {
            return None;
        }
        Some(literal)
    }
}
