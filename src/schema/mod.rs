//! Schema subsystem
//!
//! The schema is a read-only type catalog supplied once per engine. Nothing
//! in the engine mutates it after load; it is shared as `Arc<Schema>`.

mod errors;
mod loader;
mod types;
mod validator;

pub use errors::{ConstraintViolation, SchemaError, SchemaResult};
pub use loader::SchemaLoader;
pub use types::{
    lower_first, upper_first, FieldDef, FieldKind, MutationAnnotation, ScalarKind, Schema, TypeDef,
};
pub use validator::{SchemaValidator, ValidationMode};
