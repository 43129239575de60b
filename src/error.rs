//! Error taxonomy shared by the scanners, the mutators and the resolver.
//!
//! Scan failures are soft: they travel next to whatever the scanner managed
//! to extract. Edit failures mean "no safe edit available" and leave the
//! caller to rescan or fall back to manual editing. Registry failures never
//! leave the resolver; they are logged and cached as "no update known".

use std::path::PathBuf;

use thiserror::Error;

/// A build file could only be scanned partially, or not at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("block `{block}` opened at byte {offset} is never closed")]
    UnterminatedBlock { block: String, offset: usize },

    #[error("string literal starting at byte {offset} is never closed")]
    UnterminatedString { offset: usize },

    #[error("comment starting at byte {offset} is never closed")]
    UnterminatedComment { offset: usize },

    #[error("unbalanced closing brace at byte {offset}")]
    UnbalancedBrace { offset: usize },

    #[error("malformed XML: {0}")]
    Xml(String),

    #[error("invalid version catalog: {0}")]
    Catalog(String),

    #[error("cannot read file: {0}")]
    Io(String),
}

/// A requested edit could not be computed safely.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    /// The stored range no longer points at the declaration it was scanned from.
    #[error("declaration range {offset}+{length} no longer matches the file")]
    StaleRange { offset: usize, length: usize },

    /// The same coordinate is declared more than once, so the target is not unique.
    #[error("`{coordinate}` is declared {count} times in this file")]
    Ambiguous { coordinate: String, count: usize },

    /// The coordinate is already declared with the requested scope.
    #[error("`{0}` is already declared")]
    AlreadyDeclared(String),

    /// The version is supplied from outside the declaration and cannot be edited in place.
    #[error("version is managed outside this declaration")]
    ManagedVersion,

    /// The edit intent is not available for this file family or declaration form.
    #[error("unsupported edit: {0}")]
    Unsupported(&'static str),

    /// A nested element the edit refers to does not exist.
    #[error("{0} not found")]
    NotFound(String),
}

/// An upstream registry could not answer.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("{source_name} returned HTTP {status} for {target}")]
    Status {
        source_name: &'static str,
        target: String,
        status: u16,
    },

    #[error("{source_name} response for {target} is malformed: {reason}")]
    Malformed {
        source_name: &'static str,
        target: String,
        reason: String,
    },
}

/// A service operation on a file on disk failed.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Edit(#[from] EditError),

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not a supported build file", .0.display())]
    UnsupportedFile(PathBuf),
}

impl ServiceError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ServiceError::Io {
            path: path.into(),
            source,
        }
    }
}
