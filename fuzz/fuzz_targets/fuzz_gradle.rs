#![no_main]

use jvm_deps::file_types::GradleDialect;
use jvm_deps::parsers::gradle::GradleParser;
use jvm_deps::parsers::{BuildFileParser, ScanContext};
use libfuzzer_sys::fuzz_target;
use std::panic::AssertUnwindSafe;
use std::path::Path;

fuzz_target!(|data: &[u8]| {
    if let Ok(content) = std::str::from_utf8(data) {
        let ctx = ScanContext::new(Path::new("build.gradle"), "fuzz");

        for dialect in [GradleDialect::Groovy, GradleDialect::Kotlin] {
            let parser = GradleParser::new(dialect);
            let result = std::panic::catch_unwind(AssertUnwindSafe(|| parser.scan(content, &ctx)));

            if let Ok(scan) = result {
                for dep in &scan.dependencies {
                    assert!(dep.range.length > 0, "empty dependency range");
                    assert!(
                        dep.range.slice(content).is_some(),
                        "dependency range must lie on char boundaries within content"
                    );
                }
                for plugin in &scan.plugins {
                    assert!(
                        plugin.range.slice(content).is_some(),
                        "plugin range must lie on char boundaries within content"
                    );
                }
            }
        }
    }
});
