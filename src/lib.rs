//! jvm-deps - dependency management for Gradle and Maven builds
//!
//! Scans `build.gradle`, `build.gradle.kts` and `pom.xml` files into typed
//! declarations with exact byte ranges, computes minimal-diff edits for
//! them, and resolves newer upstream versions through a TTL cache.

pub mod aggregator;
pub mod cache;
pub mod config;
pub mod error;
pub mod file_types;
pub mod model;
pub mod mutator;
pub mod parsers;
pub mod project;
pub mod registries;
pub mod reports;
pub mod resolver;
