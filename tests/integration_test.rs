//! Integration tests for jvm-deps

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use jvm_deps::cache::ManualClock;
use jvm_deps::config::Config;
use jvm_deps::error::EditError;
use jvm_deps::file_types::GradleDialect;
use jvm_deps::model::{Coordinate, DeclaredVersion, InstalledDependency};
use jvm_deps::mutator::{AddRequest, Mutator, ScriptMutator, XmlMutator};
use jvm_deps::parsers::gradle::GradleParser;
use jvm_deps::parsers::maven::MavenParser;
use jvm_deps::parsers::{BuildFileParser, ScanContext};
use jvm_deps::project::{DependencyService, NoopListener};
use jvm_deps::registries::version_utils::is_newer;
use jvm_deps::resolver::UpdateResolver;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn scan_kotlin(text: &str) -> Vec<InstalledDependency> {
    let ctx = ScanContext::new(Path::new("app/build.gradle.kts"), "app");
    GradleParser::new(GradleDialect::Kotlin).scan_dependencies(text, &ctx)
}

fn scan_pom(text: &str) -> Vec<InstalledDependency> {
    let ctx = ScanContext::new(Path::new("pom.xml"), "service");
    MavenParser::new().scan_dependencies(text, &ctx)
}

fn config_for(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.endpoints.central_search = server.uri();
    config.endpoints.fallback_repository = format!("{}/maven2", server.uri());
    config.endpoints.plugin_portal = server.uri();
    config.endpoints.package_search = String::new();
    config
}

async fn mount_central(server: &MockServer, group: &str, artifact: &str, latest: &str) {
    Mock::given(method("GET"))
        .and(path("/solrsearch/select"))
        .and(query_param("q", format!("g:\"{}\" AND a:\"{}\"", group, artifact)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "response": {
                "numFound": 1,
                "docs": [{ "g": group, "a": artifact, "latestVersion": latest }]
            }
        })))
        .mount(server)
        .await;
}

/// Scan and update of a single Kotlin script line
#[test]
fn test_kotlin_update_replaces_only_the_version() {
    let text = "plugins {\n    `java-library`\n}\n\ndependencies {\n    implementation(\"com.example:widget:1.2.0\")\n    testImplementation(\"org.junit.jupiter:junit-jupiter:5.10.1\")\n}\n";
    let deps = scan_kotlin(text);
    let widget = deps
        .iter()
        .find(|d| d.coordinate == Coordinate::new("com.example", "widget"))
        .unwrap();
    assert_eq!(widget.version, DeclaredVersion::Literal("1.2.0".to_string()));
    assert_eq!(widget.scope, "implementation");
    assert_eq!(widget.module, "app");

    let updated = ScriptMutator::new(GradleDialect::Kotlin)
        .update(text, widget, "1.3.0")
        .unwrap();
    assert_eq!(
        updated,
        text.replace(
            "implementation(\"com.example:widget:1.2.0\")",
            "implementation(\"com.example:widget:1.3.0\")"
        )
    );

    // Bytes outside the declaration are untouched.
    let start = widget.range.offset;
    assert_eq!(&updated[..start], &text[..start]);
    let tail = &text[widget.range.end()..];
    assert!(updated.ends_with(tail));
}

#[test]
fn test_maven_property_version_is_resolved() {
    let pom = r#"<project>
    <groupId>com.example</groupId>
    <artifactId>service</artifactId>
    <version>1.0.0</version>
    <properties>
        <app.version>2.0</app.version>
    </properties>
    <dependencies>
        <dependency>
            <groupId>com.example</groupId>
            <artifactId>core</artifactId>
            <version>${app.version}</version>
        </dependency>
    </dependencies>
</project>
"#;
    let deps = scan_pom(pom);
    assert_eq!(deps.len(), 1);
    assert_eq!(deps[0].coordinate, Coordinate::new("com.example", "core"));
    assert_eq!(deps[0].version.literal(), Some("2.0"));
    assert_eq!(deps[0].scope, "compile");
}

#[test]
fn test_add_without_dependencies_block() {
    let text = "plugins {\n    id(\"application\")\n}\n\napplication {\n    mainClass.set(\"demo.MainKt\")\n}\n";
    let request = AddRequest::new(
        Coordinate::new("com.squareup.okhttp3", "okhttp"),
        Some("4.12.0".to_string()),
        None,
    );
    let added = ScriptMutator::new(GradleDialect::Kotlin)
        .add(text, &request)
        .unwrap();

    assert!(added.starts_with(text));
    let appended = &added[text.len()..];
    assert_eq!(
        appended,
        "\ndependencies {\n    implementation(\"com.squareup.okhttp3:okhttp:4.12.0\")\n}\n"
    );
    let deps = scan_kotlin(&added);
    assert_eq!(deps.len(), 1);
}

#[test]
fn test_script_add_then_remove_round_trip() {
    let text = "dependencies {\n    implementation(\"org.slf4j:slf4j-api:2.0.9\")\n}\n";
    let mutator = ScriptMutator::new(GradleDialect::Kotlin);
    let coordinate = Coordinate::new("ch.qos.logback", "logback-classic");
    let request = AddRequest::new(
        coordinate.clone(),
        Some("1.4.14".to_string()),
        Some("runtimeOnly".to_string()),
    );

    let added = mutator.add(text, &request).unwrap();
    let matches: Vec<InstalledDependency> = scan_kotlin(&added)
        .into_iter()
        .filter(|d| d.coordinate == coordinate)
        .collect();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].scope, "runtimeOnly");
    assert_eq!(matches[0].version.literal(), Some("1.4.14"));

    let removed = mutator.remove(&added, &matches[0]).unwrap();
    assert_eq!(removed, text);
    assert!(scan_kotlin(&removed).iter().all(|d| d.coordinate != coordinate));
}

#[test]
fn test_xml_add_then_remove_round_trip() {
    let pom = "<project>\n    <dependencies>\n        <dependency>\n            <groupId>org.slf4j</groupId>\n            <artifactId>slf4j-api</artifactId>\n            <version>2.0.9</version>\n        </dependency>\n    </dependencies>\n</project>\n";
    let mutator = XmlMutator::new();
    let coordinate = Coordinate::new("org.junit.jupiter", "junit-jupiter");
    let request = AddRequest::new(
        coordinate.clone(),
        Some("5.10.1".to_string()),
        Some("test".to_string()),
    );

    let added = mutator.add(pom, &request).unwrap();
    let matches: Vec<InstalledDependency> = scan_pom(&added)
        .into_iter()
        .filter(|d| d.coordinate == coordinate)
        .collect();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].scope, "test");

    let removed = mutator.remove(&added, &matches[0]).unwrap();
    assert_eq!(removed, pom);
}

#[test]
fn test_idempotent_scan() {
    let text = "dependencies {\n    implementation(\"a.b:c:1.0\")\n    api(\"d.e:f:2.0\")\n}\n";
    let key = |d: &InstalledDependency| {
        (
            d.coordinate.clone(),
            d.version.clone(),
            d.scope.clone(),
            d.module.clone(),
            d.range.offset,
            d.range.length,
        )
    };
    let first: Vec<_> = scan_kotlin(text).iter().map(key).collect();
    let second: Vec<_> = scan_kotlin(text).iter().map(key).collect();
    assert_eq!(first, second);
}

#[test]
fn test_stale_record_is_refused() {
    let text = "dependencies {\n    implementation(\"com.example:widget:1.2.0\")\n}\n";
    let record = scan_kotlin(text).remove(0);
    let edited = format!("// header added elsewhere\n{}", text);

    let mutator = ScriptMutator::new(GradleDialect::Kotlin);
    assert!(matches!(
        mutator.update(&edited, &record, "1.3.0"),
        Err(EditError::StaleRange { .. })
    ));
    assert!(mutator.remove(&edited, &record).is_err());
}

#[test]
fn test_version_ordering() {
    assert!(is_newer("2.0.0", "1.9.9"));
    assert!(is_newer("1.0.0", "1.0.0-RC1"));
    assert!(!is_newer("1.0.0-RC1", "1.0.0"));
    assert!(!is_newer("1.0.0", "1.0.0"));
}

#[tokio::test]
async fn test_lookup_cached_until_ttl_expires() {
    let server = MockServer::start().await;
    mount_central(&server, "com.example", "widget", "1.3.0").await;

    let clock = Arc::new(ManualClock::new());
    let resolver = UpdateResolver::from_config_with_clock(&config_for(&server), clock.clone()).unwrap();
    let widget = Coordinate::new("com.example", "widget");

    assert_eq!(resolver.latest_version(&widget).await.as_deref(), Some("1.3.0"));
    clock.advance(Duration::from_secs(3599));
    assert_eq!(resolver.latest_version(&widget).await.as_deref(), Some("1.3.0"));
    assert_eq!(server.received_requests().await.unwrap().len(), 1);

    clock.advance(Duration::from_secs(2));
    assert_eq!(resolver.latest_version(&widget).await.as_deref(), Some("1.3.0"));
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_outdated_pipeline_against_mock_registry() {
    let server = MockServer::start().await;
    mount_central(&server, "com.example", "widget", "1.3.0").await;
    mount_central(&server, "org.slf4j", "slf4j-api", "2.0.9").await;

    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("app")).unwrap();
    std::fs::write(
        dir.path().join("app/build.gradle.kts"),
        "dependencies {\n    implementation(\"com.example:widget:1.2.0\")\n    implementation(\"org.slf4j:slf4j-api:2.0.9\")\n}\n",
    )
    .unwrap();

    let resolver = UpdateResolver::from_config(&config_for(&server)).unwrap();
    let service = DependencyService::new(dir.path(), resolver);
    let refresh = service.refresh(&NoopListener).await;

    assert_eq!(refresh.report.dependencies.len(), 2);
    assert_eq!(refresh.updates.len(), 1);
    assert_eq!(refresh.updates[0].latest, "1.3.0");

    let outdated: Vec<&str> = refresh
        .packages
        .iter()
        .filter(|p| p.has_update())
        .map(|p| p.id.as_str())
        .collect();
    assert_eq!(outdated, vec!["com.example:widget"]);

    let record = &refresh.updates[0].dependency;
    let updated = service.updated_content(record, &refresh.updates[0].latest).unwrap();
    assert!(updated.contains("implementation(\"com.example:widget:1.3.0\")"));
    assert!(updated.contains("implementation(\"org.slf4j:slf4j-api:2.0.9\")"));
}

#[tokio::test]
async fn test_update_never_offers_older_or_equal_version() {
    let server = MockServer::start().await;
    mount_central(&server, "com.example", "widget", "1.1.0").await;
    mount_central(&server, "org.slf4j", "slf4j-api", "2.0.9").await;
    mount_central(&server, "io.micrometer", "micrometer-core", "1.12.1").await;

    let text = "dependencies {\n    implementation(\"com.example:widget:1.2.0\")\n    implementation(\"org.slf4j:slf4j-api:2.0.9\")\n    implementation(\"io.micrometer:micrometer-core:1.12.0\")\n}\n";
    let dir = tempfile::tempdir().unwrap();
    let resolver = UpdateResolver::from_config(&config_for(&server)).unwrap();
    let service = DependencyService::new(dir.path(), resolver);
    let deps = scan_kotlin(text);
    let by_artifact = |artifact: &str| deps.iter().find(|d| d.coordinate.artifact == artifact).unwrap();

    // Registry behind the declared version, then equal to it.
    assert_eq!(service.newer_version(by_artifact("widget")).await, None);
    assert_eq!(service.newer_version(by_artifact("slf4j-api")).await, None);
    assert_eq!(
        service.newer_version(by_artifact("micrometer-core")).await.as_deref(),
        Some("1.12.1")
    );
}
