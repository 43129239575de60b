//! Text mutators: compute a complete new file body for one edit intent.
//!
//! A mutator never writes anything. It validates the record's stored range
//! against the text it is given, refuses when the target is stale or not
//! unique, and otherwise returns the edited text with every byte outside the
//! edit left untouched.

pub mod layout;
pub mod script;
pub mod xml;

use crate::error::EditError;
use crate::file_types::FileType;
use crate::model::{Coordinate, DependencyExclusion, InstalledDependency};

pub use script::ScriptMutator;
pub use xml::XmlMutator;

/// A dependency to declare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddRequest {
    pub coordinate: Coordinate,
    /// `None` declares the dependency without a version (managed by a platform or parent).
    pub version: Option<String>,
    /// Configuration or scope; `None` uses the file family's default.
    pub scope: Option<String>,
}

impl AddRequest {
    pub fn new(coordinate: Coordinate, version: Option<String>, scope: Option<String>) -> Self {
        Self {
            coordinate,
            version,
            scope,
        }
    }
}

/// Edit intents shared by both file families.
///
/// Edits on an existing record fail with `EditError::Ambiguous` when more than one
/// declaration shares its coordinate and scope (the Gradle configuration or the
/// Maven `<scope>`).
pub trait Mutator: Send + Sync {
    /// Delete the declaration plus one trailing line terminator.
    fn remove(&self, text: &str, record: &InstalledDependency) -> Result<String, EditError>;

    /// Replace the declared version with `new_version`.
    fn update(
        &self,
        text: &str,
        record: &InstalledDependency,
        new_version: &str,
    ) -> Result<String, EditError>;

    /// Insert a new declaration, creating the dependency block when missing.
    fn add(&self, text: &str, request: &AddRequest) -> Result<String, EditError>;

    fn add_exclusion(
        &self,
        text: &str,
        record: &InstalledDependency,
        exclusion: &DependencyExclusion,
    ) -> Result<String, EditError>;

    fn remove_exclusion(
        &self,
        text: &str,
        record: &InstalledDependency,
        exclusion: &DependencyExclusion,
    ) -> Result<String, EditError>;
}

/// Mutator for the given build file type.
pub fn mutator_for(file_type: FileType) -> Box<dyn Mutator> {
    match file_type.dialect() {
        Some(dialect) => Box::new(ScriptMutator::new(dialect)),
        None => Box::new(XmlMutator::new()),
    }
}

/// Reject values that would need quoting or escaping to stay a single literal.
pub(crate) fn check_literal(value: &str) -> Result<(), EditError> {
    if value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '$' | '\\' | '<' | '>' | '&'))
    {
        return Err(EditError::Unsupported(
            "values must be plain literals without quotes, markup or whitespace",
        ));
    }
    Ok(())
}

/// The stored range must still fit the text and fall on character boundaries.
pub(crate) fn check_range<'a>(
    text: &'a str,
    record: &InstalledDependency,
) -> Result<&'a str, EditError> {
    record.range.slice(text).ok_or(EditError::StaleRange {
        offset: record.range.offset,
        length: record.range.length,
    })
}

pub(crate) fn stale(record: &InstalledDependency) -> EditError {
    EditError::StaleRange {
        offset: record.range.offset,
        length: record.range.length,
    }
}
