#![no_main]

use jvm_deps::parsers::maven::MavenParser;
use jvm_deps::parsers::{BuildFileParser, ScanContext};
use libfuzzer_sys::fuzz_target;
use std::panic::AssertUnwindSafe;
use std::path::Path;

fuzz_target!(|data: &[u8]| {
    if let Ok(content) = std::str::from_utf8(data) {
        let ctx = ScanContext::new(Path::new("pom.xml"), "fuzz");
        let parser = MavenParser::new();

        let result = std::panic::catch_unwind(AssertUnwindSafe(|| parser.scan(content, &ctx)));

        if let Ok(scan) = result {
            for dep in &scan.dependencies {
                let slice = dep.range.slice(content);
                assert!(
                    slice.is_some(),
                    "dependency range must lie on char boundaries within content"
                );
                assert!(
                    slice.is_some_and(|s| s.starts_with("<dependency")),
                    "dependency range must start at its element"
                );
            }
        }
    }
});
