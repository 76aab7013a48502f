//! Mutation extraction errors

use thiserror::Error;

/// Result type for mutation extraction
pub type MutationResult<T> = Result<T, MutationError>;

/// Errors raised while turning type annotations into operations.
///
/// These surface at engine construction, never per request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MutationError {
    #[error("Operation descriptor '{descriptor}' has no name")]
    MissingName { descriptor: String },

    #[error("Malformed operation descriptor '{descriptor}': {reason}")]
    Malformed { descriptor: String, reason: String },

    #[error("Operation '{operation}' has unknown context '{context}'")]
    UnknownContext { operation: String, context: String },

    #[error("Operation '{operation}' assigns unknown field '{field}' of type '{type_name}'")]
    UnknownAssignField {
        type_name: String,
        operation: String,
        field: String,
    },

    #[error("Type '{type_name}' declares operation '{operation}' twice")]
    DuplicateOperation { type_name: String, operation: String },

    #[error("Type '{0}' has no identifier field")]
    MissingIdentifier(String),
}

impl MutationError {
    pub fn malformed(descriptor: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            descriptor: descriptor.into(),
            reason: reason.into(),
        }
    }
}
