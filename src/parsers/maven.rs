//! Scanner for Maven `pom.xml` descriptors
//!
//! The document is read once with quick-xml into a small element tree that
//! remembers where every tag starts and ends, so each dependency gets the
//! exact byte range of its `<dependency>` element without re-matching text.

use std::borrow::Cow;
use std::collections::HashMap;
use std::ops::Range;

use quick_xml::Reader;
use quick_xml::events::Event;

use super::{BuildFileParser, ScanContext, ScanResult};
use crate::error::ParseError;
use crate::model::{
    Coordinate, DeclaredVersion, DependencyExclusion, InstalledDependency, SourceRange,
};

/// Maven's scope when `<scope>` is absent.
pub const DEFAULT_SCOPE: &str = "compile";

const DEFAULT_TYPE: &str = "jar";

/// Upper bound on `${...}` substitution passes.
const MAX_PROPERTY_DEPTH: usize = 10;

/// One element with the byte offsets of its tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    /// `<` of the start tag
    pub open_start: usize,
    /// Just past the `>` of the start tag
    pub content_start: usize,
    /// `<` of the end tag; equals `content_start` for `<empty/>` elements
    pub close_start: usize,
    /// Just past the `>` of the end tag
    pub close_end: usize,
    pub self_closing: bool,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    fn open(name: String, open_start: usize, content_start: usize) -> Self {
        Self {
            name,
            open_start,
            content_start,
            close_start: content_start,
            close_end: content_start,
            self_closing: false,
            children: Vec::new(),
        }
    }

    /// Whole element, start tag through end tag.
    pub fn span(&self) -> Range<usize> {
        self.open_start..self.close_end
    }

    /// Text between the tags.
    pub fn inner(&self) -> Range<usize> {
        self.content_start..self.close_start
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Trimmed, unescaped text of a leaf element. Empty or non-leaf elements give `None`.
    pub fn text(&self, source: &str) -> Option<String> {
        if self.self_closing || !self.children.is_empty() {
            return None;
        }
        let raw = source.get(self.inner())?;
        let raw = strip_markup(raw);
        let text = quick_xml::escape::unescape(raw.trim())
            .map(Cow::into_owned)
            .unwrap_or_else(|_| raw.trim().to_string());
        (!text.is_empty()).then_some(text)
    }

    pub fn child_text(&self, source: &str, name: &str) -> Option<String> {
        self.child(name).and_then(|c| c.text(source))
    }
}

/// Drop comments and unwrap CDATA sections inside leaf text.
fn strip_markup(raw: &str) -> Cow<'_, str> {
    if !raw.contains('<') {
        return Cow::Borrowed(raw);
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(pos) = rest.find('<') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        if let Some(body) = rest.strip_prefix("<!--") {
            rest = body.find("-->").map_or("", |end| &body[end + 3..]);
        } else if let Some(body) = rest.strip_prefix("<![CDATA[") {
            let end = body.find("]]>").unwrap_or(body.len());
            out.push_str(&body[..end]);
            rest = body.get(end + 3..).unwrap_or("");
        } else {
            out.push('<');
            rest = &rest[1..];
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Parse `source` into an element tree rooted at the document element.
pub fn parse_tree(source: &str) -> Result<XmlElement, ParseError> {
    let mut reader = Reader::from_str(source);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root = None;

    loop {
        let before = reader.buffer_position() as usize;
        let event = reader.read_event().map_err(|e| {
            ParseError::Xml(format!("{} at offset {}", e, reader.error_position()))
        })?;
        let after = reader.buffer_position() as usize;

        match event {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                stack.push(XmlElement::open(name, before, after));
            }
            Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                let mut element = XmlElement::open(name, before, after);
                element.self_closing = true;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let mut element = stack.pop().ok_or_else(|| {
                    ParseError::Xml(format!("unexpected closing tag at offset {before}"))
                })?;
                element.close_start = before;
                element.close_end = after;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(ParseError::Xml(format!(
            "unclosed <{}> at offset {}",
            open.name, open.open_start
        )));
    }
    root.ok_or_else(|| ParseError::Xml("document has no root element".to_string()))
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), ParseError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
    } else if root.is_none() {
        *root = Some(element);
    } else {
        return Err(ParseError::Xml(format!(
            "second root element <{}> at offset {}",
            element.name, element.open_start
        )));
    }
    Ok(())
}

/// Property table used to resolve `${name}` tokens.
#[derive(Debug, Clone, Default)]
pub struct Properties {
    values: HashMap<String, String>,
}

impl Properties {
    /// Collect `<properties>` plus the built-in project and parent coordinates.
    pub fn collect(project: &XmlElement, source: &str) -> Self {
        let mut values = HashMap::new();

        if let Some(properties) = project.child("properties") {
            for property in &properties.children {
                values.insert(
                    property.name.clone(),
                    property.text(source).unwrap_or_default(),
                );
            }
        }

        let parent = project.child("parent");
        let parent_version = parent.and_then(|p| p.child_text(source, "version"));
        let parent_group = parent.and_then(|p| p.child_text(source, "groupId"));

        // A child project without its own version or group inherits the parent's.
        let version = project
            .child_text(source, "version")
            .or_else(|| parent_version.clone());
        let group = project
            .child_text(source, "groupId")
            .or_else(|| parent_group.clone());
        let artifact = project.child_text(source, "artifactId");

        for (keys, value) in [
            (&["project.version", "pom.version", "version"][..], version),
            (&["project.groupId", "pom.groupId", "groupId"][..], group),
            (&["project.artifactId", "pom.artifactId", "artifactId"][..], artifact),
            (&["project.parent.version", "parent.version"][..], parent_version),
            (&["project.parent.groupId", "parent.groupId"][..], parent_group),
        ] {
            if let Some(value) = value {
                for key in keys {
                    values
                        .entry((*key).to_string())
                        .or_insert_with(|| value.clone());
                }
            }
        }

        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Substitute `${name}` tokens, following chains up to a fixed depth.
    ///
    /// Unknown names and cycles are left as written.
    pub fn resolve(&self, value: &str) -> String {
        let mut current = value.to_string();
        for _ in 0..MAX_PROPERTY_DEPTH {
            let next = self.substitute_once(&current);
            if next == current {
                break;
            }
            current = next;
        }
        current
    }

    fn substitute_once(&self, value: &str) -> String {
        let mut out = String::with_capacity(value.len());
        let mut rest = value;
        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find('}') {
                Some(end) => {
                    let name = &after[..end];
                    match self.get(name) {
                        Some(replacement) => out.push_str(replacement),
                        None => out.push_str(&rest[start..start + 2 + end + 1]),
                    }
                    rest = &after[end + 1..];
                }
                None => {
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }
}

/// Parser for `pom.xml`
#[derive(Debug, Default, Clone)]
pub struct MavenParser;

impl MavenParser {
    pub fn new() -> Self {
        Self
    }
}

impl BuildFileParser for MavenParser {
    fn scan(&self, content: &str, ctx: &ScanContext<'_>) -> ScanResult {
        let project = match parse_tree(content) {
            Ok(project) => project,
            Err(e) => {
                tracing::warn!("Malformed descriptor {}: {}", ctx.file.display(), e);
                return ScanResult {
                    error: Some(e),
                    ..ScanResult::default()
                };
            }
        };

        let properties = Properties::collect(&project, content);
        let dependencies: Vec<InstalledDependency> = direct_dependencies(&project)
            .filter_map(|element| read_dependency(element, content, &properties, ctx))
            .collect();

        tracing::debug!(
            dependencies = dependencies.len(),
            "Scanned {}",
            ctx.file.display()
        );

        ScanResult {
            dependencies,
            ..ScanResult::default()
        }
    }
}

/// `<dependency>` elements of the project's own `<dependencies>` list.
///
/// Entries under `<dependencyManagement>`, `<build>` or `<profiles>` are not installs.
pub fn direct_dependencies(project: &XmlElement) -> impl Iterator<Item = &XmlElement> {
    project
        .children_named("dependencies")
        .flat_map(|list| list.children_named("dependency"))
}

fn read_dependency(
    element: &XmlElement,
    source: &str,
    properties: &Properties,
    ctx: &ScanContext<'_>,
) -> Option<InstalledDependency> {
    let group = element.child_text(source, "groupId")?;
    let artifact = element.child_text(source, "artifactId")?;

    let version = match element.child_text(source, "version") {
        Some(v) => DeclaredVersion::Literal(properties.resolve(&v)),
        None => DeclaredVersion::Managed,
    };
    let scope = element
        .child_text(source, "scope")
        .map(|s| properties.resolve(&s))
        .unwrap_or_else(|| DEFAULT_SCOPE.to_string());
    let optional = element
        .child_text(source, "optional")
        .is_some_and(|o| properties.resolve(&o).eq_ignore_ascii_case("true"));

    let exclusions = element
        .child("exclusions")
        .map(|list| {
            list.children_named("exclusion")
                .filter_map(|exclusion| {
                    let group = exclusion.child_text(source, "groupId")?;
                    let artifact = exclusion
                        .child_text(source, "artifactId")
                        .filter(|a| a != DependencyExclusion::WILDCARD);
                    Some(DependencyExclusion::new(group, artifact))
                })
                .collect()
        })
        .unwrap_or_default();

    let span = element.span();
    Some(InstalledDependency {
        coordinate: Coordinate::new(group, artifact),
        version,
        scope,
        module: ctx.module.to_string(),
        range: SourceRange::new(ctx.file, span.start, span.len()),
        from_version_catalog: false,
        catalog_key: None,
        optional,
        classifier: element.child_text(source, "classifier"),
        extension: element
            .child_text(source, "type")
            .filter(|t| t != DEFAULT_TYPE),
        exclusions,
    })
}
