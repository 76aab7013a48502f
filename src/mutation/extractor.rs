//! Operation extraction from type annotations
//!
//! Implicit `create`/`update`/`delete` come from the type's flags; extra
//! operations come from descriptor strings. Fields claimed by an extra
//! operation are left out of the implicit create/update assign sets.

use std::collections::HashSet;

use super::descriptor::parse_descriptor;
use super::errors::{MutationError, MutationResult};
use super::operation::{Operation, OperationContext, CREATE, DELETE, UPDATE};
use crate::schema::TypeDef;

/// Derives the operation catalog of one type
pub struct MutationExtractor;

impl MutationExtractor {
    /// Implicit operations first (create, update, delete), then extras in
    /// declaration order
    pub fn extract(type_def: &TypeDef) -> MutationResult<Vec<Operation>> {
        let identifier = type_def
            .identifier()
            .map_err(|_| MutationError::MissingIdentifier(type_def.name.clone()))?
            .name
            .clone();
        let annotation = &type_def.mutations;

        let mut extras = Vec::with_capacity(annotation.operations.len());
        for text in &annotation.operations {
            extras.push(Self::extra_operation(type_def, text)?);
        }

        let claimed: HashSet<&str> = extras
            .iter()
            .flat_map(|op| op.assign_fields.iter().map(String::as_str))
            .collect();

        let default_assign: Vec<String> = type_def
            .fields
            .iter()
            .filter(|f| f.name != identifier && !claimed.contains(f.name.as_str()))
            .map(|f| f.name.clone())
            .collect();

        let mut operations = Vec::new();
        if annotation.create {
            operations.push(Operation::implicit(CREATE, OperationContext::Create, default_assign.clone()));
        }
        if annotation.update {
            operations.push(Operation::implicit(UPDATE, OperationContext::Modify, default_assign));
        }
        if annotation.delete {
            operations.push(Operation::implicit(DELETE, OperationContext::Delete, Vec::new()));
        }

        for extra in extras {
            if operations.iter().any(|op| op.name == extra.name) {
                return Err(MutationError::DuplicateOperation {
                    type_name: type_def.name.clone(),
                    operation: extra.name,
                });
            }
            operations.push(extra);
        }

        Ok(operations)
    }

    fn extra_operation(type_def: &TypeDef, text: &str) -> MutationResult<Operation> {
        let descriptor = parse_descriptor(text)?;

        let context = match descriptor.context.as_deref() {
            None => OperationContext::Modify,
            Some(raw) => raw.parse().map_err(|_| MutationError::UnknownContext {
                operation: descriptor.name.clone(),
                context: raw.to_string(),
            })?,
        };

        for field in &descriptor.assign {
            if type_def.field(field).is_none() {
                return Err(MutationError::UnknownAssignField {
                    type_name: type_def.name.clone(),
                    operation: descriptor.name.clone(),
                    field: field.clone(),
                });
            }
        }

        Ok(Operation {
            name: descriptor.name,
            context,
            assign_fields: descriptor.assign,
            set_values: descriptor.set,
            implicit: false,
        })
    }
}
