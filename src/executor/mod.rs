//! Query Executor subsystem for docloom
//!
//! Parses request documents, resolves root fields against the document
//! store and projects results onto the requested selection sets.
//!
//! # Execution Flow
//!
//! 1. Parse the request document
//! 2. Resolve each root field (queries together, mutations serially)
//! 3. Batch-load every related document the projection deferred
//! 4. Assemble `data` and field-level `errors`
//!
//! A failing root or nested field becomes null and contributes one error
//! entry; sibling fields still resolve.

mod batch;
mod collaborators;
mod document;
mod executor;
mod mutations;
mod request;
mod response;

pub use batch::{id_text, Deferred, DeferredMode, IdRef, PendingBatch};
pub use collaborators::{
    AccessGuard, AllowAll, Collaborators, InputSanitizer, OutputRedactor, Passthrough, StructuralValidator,
};
pub use document::{parse_document, OperationKind, QueryDocument, Selection};
pub use executor::QueryExecutor;
pub use mutations::INPUT_ARGUMENT;
pub use response::{PathSegment, Response, ResponseError};
