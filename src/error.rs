//! Engine error type
//!
//! Unifies subsystem errors into the taxonomy reported to callers. Every
//! variant maps to a stable `code()` and to the `extensions` object of a
//! response error entry.

use serde_json::{json, Value};
use thiserror::Error;

use crate::config::ConfigError;
use crate::filter::FilterError;
use crate::mutation::MutationError;
use crate::schema::{ConstraintViolation, SchemaError};
use crate::store::StoreError;

/// Engine result type
pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    /// A filter key or query argument failed to compile
    #[error(transparent)]
    Compile(#[from] FilterError),

    /// Modify/delete target does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Mutation input points at a document that does not exist
    #[error("Reference error: {0}")]
    Reference(String),

    /// Field-level validation failures
    #[error("Constraint violation: {}", join_violations(.0))]
    Constraint(Vec<ConstraintViolation>),

    /// Access guard denied the operation
    #[error("Access denied: {0}")]
    Authorization(String),

    #[error(transparent)]
    Storage(StoreError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Mutation(#[from] MutationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The request selects a field the type does not declare
    #[error("Cannot query field '{field}' on type '{type_name}'")]
    UnknownField { type_name: String, field: String },

    /// The request document could not be parsed
    #[error("Syntax error: {0}")]
    Syntax(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn join_violations(violations: &[ConstraintViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl EngineError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn reference(msg: impl Into<String>) -> Self {
        Self::Reference(msg.into())
    }

    pub fn authorization(msg: impl Into<String>) -> Self {
        Self::Authorization(msg.into())
    }

    pub fn unknown_field(type_name: impl Into<String>, field: impl Into<String>) -> Self {
        Self::UnknownField {
            type_name: type_name.into(),
            field: field.into(),
        }
    }

    pub fn syntax(msg: impl Into<String>) -> Self {
        Self::Syntax(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Get error code for responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::Compile(_) => "COMPILE_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Reference(_) => "REFERENCE_ERROR",
            Self::Constraint(_) => "CONSTRAINT_VIOLATION",
            Self::Authorization(_) => "ACCESS_DENIED",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Schema(_) => "SCHEMA_ERROR",
            Self::Mutation(_) => "MUTATION_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::UnknownField { .. } => "UNKNOWN_FIELD",
            Self::Syntax(_) => "SYNTAX_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// The `extensions` object of a response error entry
    pub fn extensions(&self) -> Value {
        let mut extensions = json!({ "code": self.code() });
        match self {
            Self::Constraint(violations) => {
                extensions["constraints"] = json!(violations);
            }
            Self::Compile(e) => {
                if let Some(key) = e.key() {
                    extensions["key"] = json!(key);
                }
            }
            _ => {}
        }
        extensions
    }

    /// Errors detected before storage was touched
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::Compile(_) | Self::Reference(_) | Self::Constraint(_) | Self::Authorization(_)
        )
    }
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { .. } => Self::NotFound(e.to_string()),
            other => Self::Storage(other),
        }
    }
}
