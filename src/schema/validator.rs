//! Built-in structural validator
//!
//! Checks mutation input against the type catalog:
//! - non-nullable fields are present and non-null (full documents only)
//! - no undeclared fields
//! - list fields hold arrays, scalars coerce to their kind
//! - enum values are declared
//! - references are given as an id or an object
//!
//! The validator never mutates the document and reports every violation it
//! finds rather than stopping at the first one.

use std::sync::Arc;

use serde_json::{Map, Value};

use super::errors::ConstraintViolation;
use super::types::{json_type_name, FieldDef, FieldKind, Schema, TypeDef};

/// Whether the document under validation is complete or a partial patch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// Every non-nullable field must be present
    Full,
    /// Only the fields present are checked
    Partial,
}

/// Validates documents against the schema catalog
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    schema: Arc<Schema>,
}

impl SchemaValidator {
    pub fn new(schema: Arc<Schema>) -> Self {
        Self { schema }
    }

    /// Validates `document` as an instance of `type_name`.
    ///
    /// An unknown type yields a single violation on `$type`.
    pub fn validate(
        &self,
        type_name: &str,
        document: &Map<String, Value>,
        mode: ValidationMode,
    ) -> Vec<ConstraintViolation> {
        let type_def = match self.schema.get_type(type_name) {
            Some(t) => t,
            None => {
                return vec![ConstraintViolation::new(
                    "$type",
                    format!("unknown type '{}'", type_name),
                )]
            }
        };

        let mut violations = Vec::new();

        if mode == ValidationMode::Full {
            for field in &type_def.fields {
                if field.nullable || field.identifier {
                    continue;
                }
                let present = document
                    .get(&field.name)
                    .or_else(|| document.get(&field.pointer_key()))
                    .map(|v| !v.is_null())
                    .unwrap_or(false);
                if !present {
                    violations.push(ConstraintViolation::missing_field(&field.name));
                }
            }
        }

        for (key, value) in document {
            match Self::declared_field(type_def, key) {
                Some(field) => Self::validate_value(field, key, value, &mut violations),
                None => violations.push(ConstraintViolation::undeclared_field(key)),
            }
        }

        violations
    }

    /// Finds the field a document key belongs to, including `<ref>_id` pointers
    fn declared_field<'t>(type_def: &'t TypeDef, key: &str) -> Option<&'t FieldDef> {
        type_def.field(key).or_else(|| {
            key.strip_suffix("_id")
                .and_then(|base| type_def.field(base))
                .filter(|f| f.reference_target().is_some())
        })
    }

    fn validate_value(
        field: &FieldDef,
        path: &str,
        value: &Value,
        violations: &mut Vec<ConstraintViolation>,
    ) {
        if value.is_null() {
            if !field.nullable {
                violations.push(ConstraintViolation::new(path, "null is not allowed"));
            }
            return;
        }

        if field.list {
            match value {
                Value::Array(items) => {
                    for (i, item) in items.iter().enumerate() {
                        Self::validate_item(field, &format!("{}[{}]", path, i), item, violations);
                    }
                }
                other => violations.push(ConstraintViolation::new(
                    path,
                    format!("expected a list, got {}", json_type_name(other)),
                )),
            }
            return;
        }

        Self::validate_item(field, path, value, violations);
    }

    fn validate_item(
        field: &FieldDef,
        path: &str,
        value: &Value,
        violations: &mut Vec<ConstraintViolation>,
    ) {
        match &field.kind {
            FieldKind::Scalar(kind) => {
                if let Err(message) = kind.coerce(value) {
                    violations.push(ConstraintViolation::new(path, message));
                }
            }
            FieldKind::Enum { name, values } => match value.as_str() {
                Some(s) if values.iter().any(|v| v == s) => {}
                _ => violations.push(ConstraintViolation::new(
                    path,
                    format!("expected one of {} ({})", name, values.join(", ")),
                )),
            },
            FieldKind::Reference(target) => match value {
                Value::String(_) | Value::Number(_) | Value::Object(_) => {}
                other => violations.push(ConstraintViolation::new(
                    path,
                    format!("expected a {} id, got {}", target, json_type_name(other)),
                )),
            },
        }
    }
}
