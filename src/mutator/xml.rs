//! Edits for Maven `pom.xml` descriptors.

use crate::error::EditError;
use crate::model::{Coordinate, DependencyExclusion, InstalledDependency};
use crate::parsers::maven::{DEFAULT_SCOPE, XmlElement, direct_dependencies, parse_tree};

use super::layout::{
    detect_eol, indent_lines, indent_unit, line_indent, line_start, removal_range, splice,
};
use super::{AddRequest, Mutator, check_literal, check_range, stale};

/// Mutator for `pom.xml`
#[derive(Debug, Default, Clone, Copy)]
pub struct XmlMutator;

impl XmlMutator {
    pub fn new() -> Self {
        Self
    }

    /// The `<dependency>` element `record` was scanned from, if it is still there and unique.
    fn locate(&self, text: &str, record: &InstalledDependency) -> Result<XmlElement, EditError> {
        check_range(text, record)?;
        let project = parse_tree(text).map_err(|_| stale(record))?;
        let range = record.range.offset..record.range.end();
        let same = |e: &XmlElement| coordinate_of(e, text).as_ref() == Some(&record.coordinate);

        let target = direct_dependencies(&project)
            .find(|e| e.span() == range)
            .filter(|e| same(*e))
            .cloned()
            .ok_or_else(|| stale(record))?;

        let count = direct_dependencies(&project)
            .filter(|e| same(*e) && same_scope(e, text, &record.scope))
            .count();
        if count > 1 {
            return Err(EditError::Ambiguous {
                coordinate: record.coordinate.to_string(),
                count,
            });
        }
        Ok(target)
    }
}

fn coordinate_of(element: &XmlElement, text: &str) -> Option<Coordinate> {
    Some(Coordinate::new(
        element.child_text(text, "groupId")?,
        element.child_text(text, "artifactId")?,
    ))
}

/// A property-valued `<scope>` is not resolved here and matches every scope.
fn same_scope(element: &XmlElement, text: &str, scope: &str) -> bool {
    match element.child_text(text, "scope") {
        Some(declared) if declared.contains("${") => true,
        Some(declared) => declared == scope,
        None => scope == DEFAULT_SCOPE,
    }
}

fn same_exclusion(element: &XmlElement, text: &str, exclusion: &DependencyExclusion) -> bool {
    let artifact = element
        .child_text(text, "artifactId")
        .filter(|a| a != DependencyExclusion::WILDCARD);
    element.child_text(text, "groupId").as_deref() == Some(exclusion.group.as_str())
        && artifact == exclusion.artifact
}

fn render_dependency(request: &AddRequest, scope: &str, unit: &str) -> String {
    let mut lines = vec![
        "<dependency>".to_string(),
        format!("{unit}<groupId>{}</groupId>", request.coordinate.group),
        format!("{unit}<artifactId>{}</artifactId>", request.coordinate.artifact),
    ];
    if let Some(version) = &request.version {
        lines.push(format!("{unit}<version>{version}</version>"));
    }
    if scope != DEFAULT_SCOPE {
        lines.push(format!("{unit}<scope>{scope}</scope>"));
    }
    lines.push("</dependency>".to_string());
    lines.join("\n")
}

fn render_exclusion(exclusion: &DependencyExclusion, unit: &str) -> String {
    format!(
        "<exclusion>\n{unit}<groupId>{}</groupId>\n{unit}<artifactId>{}</artifactId>\n</exclusion>",
        exclusion.group,
        exclusion.artifact_or_wildcard()
    )
}

/// Insert `element` after the last child of `container`, or fill an empty container.
fn insert_child(text: &str, container: &XmlElement, element: &str, name: &str) -> String {
    let eol = detect_eol(text);
    let unit = indent_unit(text);

    if let Some(last) = container.children.last() {
        let base = line_indent(text, last.open_start);
        let at = last.close_end;
        return splice(
            text,
            at..at,
            &format!("{eol}{base}{}", indent_lines(element, base, eol)),
        );
    }

    let outer = line_indent(text, container.open_start);
    let base = format!("{outer}{unit}");
    let body = format!("{eol}{base}{}{eol}{outer}", indent_lines(element, &base, eol));

    if container.self_closing {
        splice(text, container.span(), &format!("<{name}>{body}</{name}>"))
    } else if text[container.inner()].trim().is_empty() {
        splice(text, container.inner(), &body)
    } else {
        // Only comments inside; keep them and add below.
        let close_line = line_start(text, container.close_start);
        if text[close_line..container.close_start].trim().is_empty() {
            splice(
                text,
                close_line..close_line,
                &format!("{base}{}{eol}", indent_lines(element, &base, eol)),
            )
        } else {
            let at = container.close_start;
            splice(text, at..at, &body)
        }
    }
}

impl Mutator for XmlMutator {
    fn remove(&self, text: &str, record: &InstalledDependency) -> Result<String, EditError> {
        let dependency = self.locate(text, record)?;
        Ok(splice(text, removal_range(text, dependency.span()), ""))
    }

    fn update(
        &self,
        text: &str,
        record: &InstalledDependency,
        new_version: &str,
    ) -> Result<String, EditError> {
        check_literal(new_version)?;
        let dependency = self.locate(text, record)?;

        match dependency.child("version") {
            Some(version) if version.self_closing => Ok(splice(
                text,
                version.span(),
                &format!("<version>{new_version}</version>"),
            )),
            Some(version) => Ok(splice(text, version.inner(), new_version)),
            None => {
                let artifact = dependency.child("artifactId").ok_or_else(|| stale(record))?;
                let own_line =
                    text[line_start(text, artifact.open_start)..artifact.open_start].trim().is_empty();
                let separator = if own_line {
                    format!(
                        "{}{}",
                        detect_eol(text),
                        line_indent(text, artifact.open_start)
                    )
                } else {
                    String::new()
                };
                let at = artifact.close_end;
                Ok(splice(
                    text,
                    at..at,
                    &format!("{separator}<version>{new_version}</version>"),
                ))
            }
        }
    }

    fn add(&self, text: &str, request: &AddRequest) -> Result<String, EditError> {
        let scope = request.scope.as_deref().unwrap_or(DEFAULT_SCOPE);
        check_literal(&request.coordinate.group)?;
        check_literal(&request.coordinate.artifact)?;
        check_literal(scope)?;
        if let Some(version) = &request.version {
            check_literal(version)?;
        }

        let project = parse_tree(text)
            .map_err(|_| EditError::Unsupported("descriptor is not well-formed XML"))?;
        if project.self_closing {
            return Err(EditError::Unsupported("descriptor has an empty root element"));
        }

        let duplicate = direct_dependencies(&project).any(|e| {
            coordinate_of(e, text).as_ref() == Some(&request.coordinate)
                && e.child_text(text, "scope").as_deref().unwrap_or(DEFAULT_SCOPE) == scope
        });
        if duplicate {
            return Err(EditError::AlreadyDeclared(request.coordinate.to_string()));
        }

        let unit = indent_unit(text);
        let element = render_dependency(request, scope, &unit);

        if let Some(list) = project.child("dependencies") {
            return Ok(insert_child(text, list, &element, "dependencies"));
        }

        // No list yet: synthesize one right before the closing root tag.
        let eol = detect_eol(text);
        let outer = format!("{}{unit}", line_indent(text, project.open_start));
        let base = format!("{outer}{unit}");
        let block = format!(
            "{outer}<dependencies>{eol}{base}{}{eol}{outer}</dependencies>",
            indent_lines(&element, &base, eol)
        );
        let close_line = line_start(text, project.close_start);
        if close_line > project.content_start
            && text[close_line..project.close_start].trim().is_empty()
        {
            Ok(splice(text, close_line..close_line, &format!("{block}{eol}")))
        } else {
            let at = project.close_start;
            Ok(splice(text, at..at, &format!("{eol}{block}{eol}")))
        }
    }

    fn add_exclusion(
        &self,
        text: &str,
        record: &InstalledDependency,
        exclusion: &DependencyExclusion,
    ) -> Result<String, EditError> {
        check_literal(&exclusion.group)?;
        check_literal(exclusion.artifact_or_wildcard())?;
        let dependency = self.locate(text, record)?;
        let unit = indent_unit(text);
        let element = render_exclusion(exclusion, &unit);

        if let Some(list) = dependency.child("exclusions") {
            if list
                .children_named("exclusion")
                .any(|e| same_exclusion(e, text, exclusion))
            {
                return Err(EditError::AlreadyDeclared(exclusion.to_string()));
            }
            return Ok(insert_child(text, list, &element, "exclusions"));
        }

        let eol = detect_eol(text);
        let anchor = dependency.children.last().ok_or_else(|| stale(record))?;
        let indent = line_indent(text, anchor.open_start);
        let inner = format!("{indent}{unit}");
        let at = anchor.close_end;
        Ok(splice(
            text,
            at..at,
            &format!(
                "{eol}{indent}<exclusions>{eol}{inner}{}{eol}{indent}</exclusions>",
                indent_lines(&element, &inner, eol)
            ),
        ))
    }

    fn remove_exclusion(
        &self,
        text: &str,
        record: &InstalledDependency,
        exclusion: &DependencyExclusion,
    ) -> Result<String, EditError> {
        let dependency = self.locate(text, record)?;
        let not_found = || EditError::NotFound(format!("exclusion {exclusion}"));
        let list = dependency.child("exclusions").ok_or_else(not_found)?;
        let entries: Vec<&XmlElement> = list.children_named("exclusion").collect();
        let target = entries
            .iter()
            .find(|e| same_exclusion(e, text, exclusion))
            .ok_or_else(not_found)?;

        // The last exclusion takes the now empty list with it.
        let span = if entries.len() == 1 {
            list.span()
        } else {
            target.span()
        };
        Ok(splice(text, removal_range(text, span), ""))
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::parsers::maven::MavenParser;
    use crate::parsers::{BuildFileParser, ScanContext};

    const POM: &str = "<project>\n  <modelVersion>4.0.0</modelVersion>\n  <dependencies>\n    <dependency>\n      <groupId>org.slf4j</groupId>\n      <artifactId>slf4j-api</artifactId>\n      <version>2.0.9</version>\n    </dependency>\n    <dependency>\n      <groupId>org.junit.jupiter</groupId>\n      <artifactId>junit-jupiter</artifactId>\n      <scope>test</scope>\n    </dependency>\n  </dependencies>\n</project>\n";

    fn scan(text: &str) -> Vec<InstalledDependency> {
        let ctx = ScanContext::new(Path::new("pom.xml"), "app");
        MavenParser::new().scan_dependencies(text, &ctx)
    }

    fn record(text: &str, artifact: &str) -> InstalledDependency {
        scan(text)
            .into_iter()
            .find(|d| d.coordinate.artifact == artifact)
            .unwrap()
    }

    #[test]
    fn test_update_version_text() {
        let updated = XmlMutator
            .update(POM, &record(POM, "slf4j-api"), "2.0.12")
            .unwrap();
        assert_eq!(updated, POM.replace("2.0.9", "2.0.12"));
    }

    #[test]
    fn test_update_property_reference_in_place() {
        let pom = "<project>\n  <dependencies>\n    <dependency>\n      <groupId>g</groupId>\n      <artifactId>a</artifactId>\n      <version>${a.version}</version>\n    </dependency>\n  </dependencies>\n</project>\n";
        let updated = XmlMutator.update(pom, &record(pom, "a"), "3.0").unwrap();
        assert_eq!(updated, pom.replace("${a.version}", "3.0"));
    }

    #[test]
    fn test_update_inserts_missing_version() {
        let updated = XmlMutator
            .update(POM, &record(POM, "junit-jupiter"), "5.10.1")
            .unwrap();
        assert_eq!(
            updated,
            POM.replace(
                "<artifactId>junit-jupiter</artifactId>\n",
                "<artifactId>junit-jupiter</artifactId>\n      <version>5.10.1</version>\n"
            )
        );
        assert_eq!(
            record(&updated, "junit-jupiter").version.literal(),
            Some("5.10.1")
        );
    }

    #[test]
    fn test_remove_dependency() {
        let removed = XmlMutator.remove(POM, &record(POM, "slf4j-api")).unwrap();
        assert_eq!(
            removed,
            "<project>\n  <modelVersion>4.0.0</modelVersion>\n  <dependencies>\n    <dependency>\n      <groupId>org.junit.jupiter</groupId>\n      <artifactId>junit-jupiter</artifactId>\n      <scope>test</scope>\n    </dependency>\n  </dependencies>\n</project>\n"
        );
    }

    #[test]
    fn test_stale_record() {
        let stale_record = record(POM, "slf4j-api");
        let edited = POM.replace("<project>", "<project>\n  <!-- moved -->");
        assert!(matches!(
            XmlMutator.update(&edited, &stale_record, "1"),
            Err(EditError::StaleRange { .. })
        ));
        assert!(matches!(
            XmlMutator.remove("<project/>", &stale_record),
            Err(EditError::StaleRange { .. })
        ));
    }

    #[test]
    fn test_duplicate_coordinate_is_ambiguous() {
        let pom = "<project>\n  <dependencies>\n    <dependency><groupId>g</groupId><artifactId>a</artifactId><version>1</version></dependency>\n    <dependency><groupId>g</groupId><artifactId>a</artifactId><version>1</version><classifier>tests</classifier></dependency>\n  </dependencies>\n</project>\n";
        let first = scan(pom).remove(0);
        assert_eq!(
            XmlMutator.remove(pom, &first),
            Err(EditError::Ambiguous {
                coordinate: "g:a".to_string(),
                count: 2
            })
        );
    }

    #[test]
    fn test_same_coordinate_in_other_scope_is_not_ambiguous() {
        let pom = "<project>\n  <dependencies>\n    <dependency><groupId>g</groupId><artifactId>a</artifactId><version>1</version></dependency>\n    <dependency><groupId>g</groupId><artifactId>a</artifactId><version>1</version><classifier>tests</classifier><scope>test</scope></dependency>\n  </dependencies>\n</project>\n";
        let records = scan(pom);
        let updated = XmlMutator.update(pom, &records[0], "2").unwrap();
        assert_eq!(
            updated,
            pom.replacen("<version>1</version>", "<version>2</version>", 1)
        );
        assert!(XmlMutator.remove(pom, &records[1]).is_ok());

        let by_property = pom.replace("<scope>test</scope>", "<scope>${dep.scope}</scope>");
        assert!(matches!(
            XmlMutator.remove(&by_property, &scan(&by_property)[0]),
            Err(EditError::Ambiguous { count: 2, .. })
        ));
    }

    #[test]
    fn test_add_after_last_dependency() {
        let request = AddRequest::new(
            Coordinate::new("com.example", "widget"),
            Some("1.0".to_string()),
            None,
        );
        let added = XmlMutator.add(POM, &request).unwrap();
        assert_eq!(
            added,
            POM.replace(
                "      <scope>test</scope>\n    </dependency>\n",
                "      <scope>test</scope>\n    </dependency>\n    <dependency>\n      <groupId>com.example</groupId>\n      <artifactId>widget</artifactId>\n      <version>1.0</version>\n    </dependency>\n"
            )
        );
    }

    #[test]
    fn test_add_synthesizes_dependencies_before_root_close() {
        let pom = "<project>\n  <modelVersion>4.0.0</modelVersion>\n</project>\n";
        let request = AddRequest::new(
            Coordinate::new("com.example", "widget"),
            Some("1.0".to_string()),
            Some("provided".to_string()),
        );
        let added = XmlMutator.add(pom, &request).unwrap();
        assert_eq!(
            added,
            "<project>\n  <modelVersion>4.0.0</modelVersion>\n  <dependencies>\n    <dependency>\n      <groupId>com.example</groupId>\n      <artifactId>widget</artifactId>\n      <version>1.0</version>\n      <scope>provided</scope>\n    </dependency>\n  </dependencies>\n</project>\n"
        );
    }

    #[test]
    fn test_add_into_empty_list() {
        let pom = "<project>\n  <dependencies/>\n</project>\n";
        let request = AddRequest::new(Coordinate::new("g", "a"), None, None);
        let added = XmlMutator.add(pom, &request).unwrap();
        assert_eq!(
            added,
            "<project>\n  <dependencies>\n    <dependency>\n      <groupId>g</groupId>\n      <artifactId>a</artifactId>\n    </dependency>\n  </dependencies>\n</project>\n"
        );
        assert!(record(&added, "a").version.is_managed());
    }

    #[test]
    fn test_add_rejects_duplicate_and_malformed() {
        let request = AddRequest::new(Coordinate::new("org.slf4j", "slf4j-api"), None, None);
        assert_eq!(
            XmlMutator.add(POM, &request),
            Err(EditError::AlreadyDeclared("org.slf4j:slf4j-api".to_string()))
        );
        let request = AddRequest::new(Coordinate::new("g", "a"), None, None);
        assert!(matches!(
            XmlMutator.add("<project>", &request),
            Err(EditError::Unsupported(_))
        ));
    }

    #[test]
    fn test_exclusion_round_trip() {
        let exclusion = DependencyExclusion::new("commons-logging", None);
        let added = XmlMutator
            .add_exclusion(POM, &record(POM, "slf4j-api"), &exclusion)
            .unwrap();
        assert!(added.contains(
            "      <version>2.0.9</version>\n      <exclusions>\n        <exclusion>\n          <groupId>commons-logging</groupId>\n          <artifactId>*</artifactId>\n        </exclusion>\n      </exclusions>\n    </dependency>"
        ));

        let scanned = record(&added, "slf4j-api");
        assert_eq!(scanned.exclusions, vec![exclusion.clone()]);
        assert_eq!(
            XmlMutator.add_exclusion(&added, &scanned, &exclusion),
            Err(EditError::AlreadyDeclared("commons-logging:*".to_string()))
        );

        let removed = XmlMutator
            .remove_exclusion(&added, &scanned, &exclusion)
            .unwrap();
        assert_eq!(removed, POM);
    }

    #[test]
    fn test_second_exclusion_keeps_list() {
        let first = DependencyExclusion::new("commons-logging", None);
        let second = DependencyExclusion::new("org.slf4j", Some("slf4j-simple".to_string()));
        let one = XmlMutator
            .add_exclusion(POM, &record(POM, "slf4j-api"), &first)
            .unwrap();
        let two = XmlMutator
            .add_exclusion(&one, &record(&one, "slf4j-api"), &second)
            .unwrap();
        assert_eq!(record(&two, "slf4j-api").exclusions, vec![first, second.clone()]);

        let back = XmlMutator
            .remove_exclusion(&two, &record(&two, "slf4j-api"), &second)
            .unwrap();
        assert_eq!(back, one);
    }

    #[test]
    fn test_remove_missing_exclusion() {
        let exclusion = DependencyExclusion::new("commons-logging", None);
        assert_eq!(
            XmlMutator.remove_exclusion(POM, &record(POM, "slf4j-api"), &exclusion),
            Err(EditError::NotFound("exclusion commons-logging:*".to_string()))
        );
    }

    #[test]
    fn test_crlf_is_preserved() {
        let pom = POM.replace('\n', "\r\n");
        let request = AddRequest::new(Coordinate::new("g", "a"), Some("1".to_string()), None);
        let added = XmlMutator.add(&pom, &request).unwrap();
        assert!(!added.replace("\r\n", "").contains('\n'));
        assert_eq!(scan(&added).len(), 3);
    }
}
