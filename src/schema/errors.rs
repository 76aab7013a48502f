//! Schema error types

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors raised while loading or consulting the schema catalog
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("Type '{0}' declares no identifier field")]
    MissingIdentifier(String),

    #[error("Type '{0}' declares more than one identifier field")]
    MultipleIdentifiers(String),

    #[error("Type '{type_name}' declares field '{field}' twice")]
    DuplicateField { type_name: String, field: String },

    #[error("Field '{type_name}.{field}' references unknown type '{target}'")]
    UnknownReference {
        type_name: String,
        field: String,
        target: String,
    },

    #[error("Root accessor '{0}' is declared by more than one type")]
    DuplicateAccessor(String),

    #[error("Malformed schema {path}: {reason}")]
    Malformed { path: String, reason: String },
}

impl SchemaError {
    /// Create a malformed schema error
    pub fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// A single field-level constraint failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstraintViolation {
    /// Field path (e.g. "provincia" or "tags[2]")
    pub field: String,
    /// Human-readable message
    pub message: String,
}

impl ConstraintViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::new(field, "field is required")
    }

    pub fn undeclared_field(field: impl Into<String>) -> Self {
        Self::new(field, "field is not declared by the type")
    }
}

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field '{}': {}", self.field, self.message)
    }
}
