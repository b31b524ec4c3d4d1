//! Error types for parsing and schema construction.

use thiserror::Error;

use crate::validate::ValidationError;

/// Errors raised while building or extending a schema.
///
/// An extension either produces a complete snapshot or fails with one of
/// these; the original snapshot is never left half-modified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// A type expression names a type that is neither builtin nor present
    /// in the schema being built.
    #[error("Unknown type: \"{0}\".")]
    UnknownType(String),

    /// The document failed SDL validation against the schema.
    #[error("invalid schema document: {}", join_errors(.0))]
    InvalidDocument(Vec<ValidationError>),

    /// A deferred body of this type was read after its registry was dropped.
    #[error("type \"{0}\" is no longer attached to a live schema")]
    DetachedType(String),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A syntax error with the location it was found at.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Syntax Error: {message} ({line}:{column})")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            line,
            column,
        }
    }
}

/// Convenience alias for results with [`SchemaError`].
pub type Result<T> = std::result::Result<T, SchemaError>;
