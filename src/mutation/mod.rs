//! Mutation operations
//!
//! Reads type-level annotations and produces the create/update/delete and
//! custom operations each type exposes.

mod catalog;
mod descriptor;
mod errors;
mod extractor;
mod operation;

pub use catalog::{MutationEntry, OperationCatalog};
pub use descriptor::{parse_descriptor, OperationDescriptor};
pub use errors::{MutationError, MutationResult};
pub use extractor::MutationExtractor;
pub use operation::{Operation, OperationContext, CREATE, DELETE, UPDATE};
