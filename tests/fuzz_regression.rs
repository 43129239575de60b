//! Regression tests for scanner robustness and range validity

use std::panic::AssertUnwindSafe;
use std::path::Path;

use jvm_deps::file_types::GradleDialect;
use jvm_deps::parsers::gradle::GradleParser;
use jvm_deps::parsers::maven::MavenParser;
use jvm_deps::parsers::{BuildFileParser, ScanContext, ScanResult};

fn validate_scan(result: &ScanResult, content: &str, parser_name: &str) {
    for dep in &result.dependencies {
        let slice = dep.range.slice(content);
        assert!(
            slice.is_some(),
            "{}: range {}+{} outside content of {} bytes for {}",
            parser_name,
            dep.range.offset,
            dep.range.length,
            content.len(),
            dep.coordinate
        );
        assert!(
            dep.range.length > 0,
            "{}: empty range for {}",
            parser_name,
            dep.coordinate
        );
    }
    for plugin in &result.plugins {
        assert!(
            plugin.range.slice(content).is_some(),
            "{}: plugin range {}+{} outside content of {} bytes for {}",
            parser_name,
            plugin.range.offset,
            plugin.range.length,
            content.len(),
            plugin.id
        );
    }
}

fn scan_gradle(content: &str, dialect: GradleDialect) -> ScanResult {
    let ctx = ScanContext::new(Path::new("build.gradle"), "fuzz");
    let parser = GradleParser::new(dialect);
    match std::panic::catch_unwind(AssertUnwindSafe(|| parser.scan(content, &ctx))) {
        Ok(result) => result,
        Err(_) => panic!("Gradle parser should not panic on {:?}", content),
    }
}

fn scan_maven(content: &str) -> ScanResult {
    let ctx = ScanContext::new(Path::new("pom.xml"), "fuzz");
    let parser = MavenParser::new();
    match std::panic::catch_unwind(AssertUnwindSafe(|| parser.scan(content, &ctx))) {
        Ok(result) => result,
        Err(_) => panic!("Maven parser should not panic on {:?}", content),
    }
}

#[test]
fn test_gradle_unterminated_inputs() {
    let inputs = [
        "dependencies {\n    implementation(\"g:a:1.0",
        "dependencies {\n    implementation 'g:a:1.0'\n",
        "dependencies {\n    /* never closed\n    implementation 'g:a:1.0'\n}\n",
        "dependencies {{{{{{\n    api 'g:a:1'\n",
        "}}}}dependencies {\n    api 'g:a:1'\n}\n",
        "plugins {\n    id(\"x\") version \"",
        "dependencies",
        "dependencies {",
        "\"dependencies {\"",
        "",
    ];
    for content in inputs {
        for dialect in [GradleDialect::Groovy, GradleDialect::Kotlin] {
            let result = scan_gradle(content, dialect);
            validate_scan(&result, content, "Gradle");
        }
    }
}

#[test]
fn test_gradle_multibyte_content() {
    // Offsets must stay on char boundaries next to non-ASCII text.
    let content = "// Abhängigkeiten ✓\ndependencies {\n    implementation(\"ünï.cödé:wïdgét:1.0\") // 🚀\n    api(\"g:a:2.0\")\n}\n";
    for dialect in [GradleDialect::Groovy, GradleDialect::Kotlin] {
        let result = scan_gradle(content, dialect);
        validate_scan(&result, content, "Gradle");
        assert!(
            result
                .dependencies
                .iter()
                .any(|d| d.coordinate.artifact == "a")
        );
    }
}

#[test]
fn test_gradle_crlf_ranges_exclude_terminator() {
    let content = "dependencies {\r\n    implementation(\"g:a:1.0\")\r\n}\r\n";
    let result = scan_gradle(content, GradleDialect::Kotlin);
    validate_scan(&result, content, "Gradle");
    assert_eq!(result.dependencies.len(), 1);
    let slice = result.dependencies[0].range.slice(content).unwrap();
    assert!(!slice.ends_with('\r'));
    assert!(!slice.ends_with('\n'));
}

#[test]
fn test_gradle_garbage_declarations() {
    let content = r#"dependencies {
    implementation("::::")
    implementation(":a:1")
    implementation("g::1")
    implementation group: , name: 'x'
    implementation(platform(
    testImplementation(libs.)
    "g:a:1.0"
    implementation("g:a:1.0"
}
"#;
    for dialect in [GradleDialect::Groovy, GradleDialect::Kotlin] {
        let result = scan_gradle(content, dialect);
        validate_scan(&result, content, "Gradle");
    }
}

#[test]
fn test_maven_malformed_inputs() {
    let inputs = [
        "<project><dependencies><dependency><groupId>g</groupId>",
        "<project><dependencies></project>",
        "<project>\n<dependencies>\n<dependency>\n<groupId>g</groupId>\n<artifactId>a</artifactId>\n<version>${a}</version>\n</dependency>\n</dependencies>\n</project>\n<trailing>",
        "<<<<>>>>",
        "<project><properties><a>${b}</a><b>${a}</b></properties><dependencies><dependency><groupId>g</groupId><artifactId>x</artifactId><version>${a}</version></dependency></dependencies></project>",
        "<?xml version=\"1.0\"?><!-- <project> -->",
        "",
    ];
    for content in inputs {
        let result = scan_maven(content);
        validate_scan(&result, content, "Maven");
        for dep in &result.dependencies {
            let slice = dep.range.slice(content).unwrap_or_default();
            assert!(slice.starts_with("<dependency"), "Maven: range must start at the element: {:?}", slice);
        }
    }
}

#[test]
fn test_maven_multibyte_content() {
    let content = "<project>\n  <!-- Äbhängigkeiten 🚀 -->\n  <dependencies>\n    <dependency>\n      <groupId>ünï</groupId>\n      <artifactId>wïdgét</artifactId>\n      <version>1.0</version>\n    </dependency>\n  </dependencies>\n</project>\n";
    let result = scan_maven(content);
    validate_scan(&result, content, "Maven");
    assert_eq!(result.dependencies.len(), 1);
    let slice = result.dependencies[0].range.slice(content).unwrap();
    assert!(slice.starts_with("<dependency>"));
    assert!(slice.ends_with("</dependency>"));
}
