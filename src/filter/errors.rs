//! # Filter Compile Errors

use thiserror::Error;

/// Result type for filter compilation
pub type FilterResult<T> = Result<T, FilterError>;

/// Compile errors. Always fatal to the request that caused them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("Unknown field {field} in filter key '{key}'")]
    UnknownField { key: String, field: String },

    #[error("Invalid filter key '{key}': {operator} must be the last condition")]
    MembershipNotLast { key: String, operator: String },

    #[error("Invalid filter key '{key}': expected {expected} value(s), got {got}")]
    ValueCount {
        key: String,
        expected: usize,
        got: usize,
    },

    #[error("Invalid filter key '{key}': {reason}")]
    MalformedKey { key: String, reason: String },

    #[error("Invalid argument '{name}': {reason}")]
    InvalidArgument { name: String, reason: String },

    #[error("Unknown type: {0}")]
    UnknownType(String),
}

impl FilterError {
    pub fn malformed(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedKey {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_argument(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// The filter key or argument that failed, if any
    pub fn key(&self) -> Option<&str> {
        match self {
            FilterError::UnknownField { key, .. }
            | FilterError::MembershipNotLast { key, .. }
            | FilterError::ValueCount { key, .. }
            | FilterError::MalformedKey { key, .. } => Some(key),
            FilterError::InvalidArgument { name, .. } => Some(name),
            FilterError::UnknownType(_) => None,
        }
    }
}
