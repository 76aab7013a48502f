//! Narrow contracts the executor consumes
//!
//! Access policy, input cleaning, output redaction and structural
//! validation live outside the engine. Each has a permissive default so an
//! engine works out of the box.

use std::sync::Arc;

use crate::schema::{ConstraintViolation, Schema, SchemaValidator, ValidationMode};
use crate::store::Document;

/// Decides whether a mutation may run
pub trait AccessGuard: Send + Sync {
    /// `existing` holds the documents the operation would touch (empty for create)
    fn can_execute(
        &self,
        operation: &str,
        namespace: &str,
        type_name: &str,
        incoming: &Document,
        existing: &[Document],
    ) -> bool;
}

/// Cleans raw mutation input before validation
pub trait InputSanitizer: Send + Sync {
    fn sanitize(&self, namespace: &str, type_name: &str, input: Document) -> Document;
}

/// Redacts documents before they leave the engine
pub trait OutputRedactor: Send + Sync {
    fn filter(&self, namespace: &str, type_name: &str, document: Document) -> Document;
}

/// Checks mutation input; an empty list means valid
pub trait StructuralValidator: Send + Sync {
    fn validate(
        &self,
        namespace: &str,
        type_name: &str,
        data: &Document,
        mode: ValidationMode,
    ) -> Vec<ConstraintViolation>;
}

/// Guard that allows every operation
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AccessGuard for AllowAll {
    fn can_execute(&self, _: &str, _: &str, _: &str, _: &Document, _: &[Document]) -> bool {
        true
    }
}

/// Sanitizer and redactor that return their input unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl InputSanitizer for Passthrough {
    fn sanitize(&self, _: &str, _: &str, input: Document) -> Document {
        input
    }
}

impl OutputRedactor for Passthrough {
    fn filter(&self, _: &str, _: &str, document: Document) -> Document {
        document
    }
}

impl StructuralValidator for SchemaValidator {
    fn validate(
        &self,
        _namespace: &str,
        type_name: &str,
        data: &Document,
        mode: ValidationMode,
    ) -> Vec<ConstraintViolation> {
        SchemaValidator::validate(self, type_name, data, mode)
    }
}

/// The collaborator set an executor runs with
#[derive(Clone)]
pub struct Collaborators {
    pub guard: Arc<dyn AccessGuard>,
    pub sanitizer: Arc<dyn InputSanitizer>,
    pub redactor: Arc<dyn OutputRedactor>,
    pub validator: Arc<dyn StructuralValidator>,
}

impl Collaborators {
    /// Allow-all guard, passthrough sanitizer and redactor, schema validator
    pub fn permissive(schema: Arc<Schema>) -> Self {
        Self {
            guard: Arc::new(AllowAll),
            sanitizer: Arc::new(Passthrough),
            redactor: Arc::new(Passthrough),
            validator: Arc::new(SchemaValidator::new(schema)),
        }
    }

    pub fn with_guard(mut self, guard: Arc<dyn AccessGuard>) -> Self {
        self.guard = guard;
        self
    }

    pub fn with_sanitizer(mut self, sanitizer: Arc<dyn InputSanitizer>) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    pub fn with_redactor(mut self, redactor: Arc<dyn OutputRedactor>) -> Self {
        self.redactor = redactor;
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn StructuralValidator>) -> Self {
        self.validator = validator;
        self
    }
}
