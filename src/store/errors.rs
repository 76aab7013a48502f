//! Store error types
//!
//! Every store error is fatal to the call that raised it; nothing here is
//! retried.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid document id '{id}': {reason}")]
    InvalidId { id: String, reason: &'static str },

    #[error("Document {type_name}/{id} already exists")]
    AlreadyExists { type_name: String, id: String },

    #[error("Document {type_name}/{id} not found")]
    NotFound { type_name: String, id: String },

    #[error("Failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("Failed to encode document {id}: {reason}")]
    Encode { id: String, reason: String },

    #[error("Failed to lock {path}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Unknown type: {0}")]
    UnknownType(String),
}

impl StoreError {
    pub fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn decode(path: &Path, reason: impl Into<String>) -> Self {
        Self::Decode {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn not_found(type_name: &str, id: &str) -> Self {
        Self::NotFound {
            type_name: type_name.to_string(),
            id: id.to_string(),
        }
    }

    /// Returns true for errors caused by the caller rather than the disk
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            StoreError::InvalidId { .. }
                | StoreError::AlreadyExists { .. }
                | StoreError::NotFound { .. }
                | StoreError::UnknownType(_)
        )
    }
}
