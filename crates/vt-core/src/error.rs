//! Error types for variable tree operations.

use thiserror::Error;

use crate::value::ValueKind;

/// Result type for variable tree operations.
pub type TreeResult<T> = Result<T, TreeError>;

/// Errors that can occur in variable tree operations.
///
/// Codec and validation failures are reported to the caller and leave the
/// target variable unchanged; they are never allowed to propagate as an
/// uncaught fault out of a listener callback or a bulk operation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TreeError {
    /// External write to a variable whose mode forbids it.
    #[error("Read-only violation: {name}")]
    ReadOnlyViolation { name: String },

    /// Display input that does not parse as the target base type.
    #[error("Invalid {kind} input: {input:?}")]
    InvalidInput { kind: ValueKind, input: String },

    /// Enum label or index with no entry in the enumeration.
    #[error("Invalid enum selection: {input:?}")]
    InvalidEnumSelection { input: String },

    /// Numeric value outside a variable's inclusive bounds.
    #[error("Out of range: {value} not in [{minimum}, {maximum}]")]
    OutOfRange {
        value: f64,
        minimum: f64,
        maximum: f64,
    },

    /// Child name collision at tree-assembly time.
    #[error("Duplicate name: {name}")]
    DuplicateName { name: String },

    /// Failure reported by an external read/write collaborator.
    #[error("Transport error: {what}")]
    Transport { what: String },

    /// Raw value whose kind does not match the variable's base type.
    #[error("Type mismatch: expected {expected}, got {found}")]
    TypeMismatch {
        expected: ValueKind,
        found: ValueKind,
    },

    /// Operation the target node is not wired for.
    #[error("Unsupported operation: {what}")]
    Unsupported { what: String },

    /// Dotted path that does not resolve to a node of the expected kind.
    #[error("No such node: {path}")]
    NoSuchNode { path: String },
}
