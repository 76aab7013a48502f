//! Document store
//!
//! File-per-document JSON persistence with predicate scans, multi-key
//! sorting, since-cursors and atomic temp-file-and-rename writes.

mod document_store;
mod errors;
mod evaluator;
mod sorter;
mod writer;

/// A stored document: field name to JSON value
pub type Document = serde_json::Map<String, serde_json::Value>;

pub use document_store::DocumentStore;
pub use errors::{StoreError, StoreResult};
pub use evaluator::{Evaluator, RelationLoader};
pub use sorter::ResultSorter;
pub use writer::{StagedWrite, TEMP_SUFFIX};
