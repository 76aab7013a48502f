//! Mutation resolvers
//!
//! Create and modify run, in order:
//! input, assignable-field check, sanitizer, existing lookup (modify),
//! access guard, reference check, structural validation, scalar coercion,
//! reference storage, then the write pipeline around the store write.
//! Everything before the pipeline is a rejection: nothing is persisted.
//!
//! Delete looks the target up through the restriction pipeline, asks the
//! guard, then runs the delete pipeline around the store delete.

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::filter::{FilterCompiler, ID_ARGUMENT};
use crate::middleware::Pipeline;
use crate::mutation::{Operation, OperationContext};
use crate::observability::{log_event_with_fields, Event};
use crate::schema::{ConstraintViolation, FieldDef, FieldKind, TypeDef, ValidationMode};
use crate::store::{Document, StoreError};

use super::batch::id_text;
use super::document::Selection;
use super::request::{Origin, Request};
use super::response::PathSegment;

/// Argument wrapping the whole mutation input
pub const INPUT_ARGUMENT: &str = "input";

impl<'e> Request<'e> {
    pub fn resolve_mutation(&mut self, selection: &Selection, path: &[PathSegment]) -> EngineResult<Value> {
        let executor = self.executor;
        let entry = executor
            .mutation(&selection.name)
            .ok_or_else(|| EngineError::unknown_field("Mutation", &selection.name))?;
        let type_def = executor.schema().require_type(&entry.type_name)?;
        let operation = &entry.operation;

        let outcome = match operation.context {
            OperationContext::Delete => self.delete(type_def, operation, selection).map(|()| Value::Bool(true)),
            OperationContext::Create | OperationContext::Modify => self
                .write(type_def, operation, selection)
                .map(|doc| self.project(type_def, &doc, &selection.selections, path.to_vec(), Origin::Stored)),
        };

        if let Err(e) = &outcome {
            if e.is_rejection() {
                executor.metrics().increment_mutations_rejected();
                let request_id = self.request_id.to_string();
                log_event_with_fields(
                    Event::MutationRejected,
                    &[
                        ("request_id", &request_id),
                        ("type", &type_def.name),
                        ("operation", &operation.name),
                        ("code", e.code()),
                    ],
                );
            }
        }
        outcome
    }

    /// Create or modify; returns the persisted document after redaction
    fn write(&mut self, type_def: &TypeDef, operation: &Operation, selection: &Selection) -> EngineResult<Document> {
        let executor = self.executor;
        let namespace = executor.namespace();
        let collaborators = executor.collaborators();
        let identifier = type_def.identifier_name();
        let creating = operation.context == OperationContext::Create;

        let input = mutation_input(selection)?;
        check_assignable(type_def, operation, &input)?;
        let input = collaborators.sanitizer.sanitize(namespace, &type_def.name, input);

        let existing = if creating {
            if let Some(id) = input.get(identifier).and_then(id_text) {
                if executor.store().load(&type_def.name, &id)?.is_some() {
                    return Err(StoreError::AlreadyExists {
                        type_name: type_def.name.clone(),
                        id,
                    }
                    .into());
                }
            }
            None
        } else {
            Some(self.find_existing(type_def, &input)?)
        };

        let touched: Vec<Document> = existing.iter().cloned().collect();
        if !collaborators
            .guard
            .can_execute(&operation.name, namespace, &type_def.name, &input, &touched)
        {
            return Err(EngineError::authorization(format!(
                "operation '{}' on {} is not allowed",
                operation.name, type_def.name
            )));
        }

        let related = self.check_references(type_def, &input)?;

        let mut candidate = input;
        for (key, value) in &operation.set_values {
            candidate.insert(key.clone(), value.clone());
        }
        let mode = if creating { ValidationMode::Full } else { ValidationMode::Partial };
        let violations = collaborators
            .validator
            .validate(namespace, &type_def.name, &candidate, mode);
        if !violations.is_empty() {
            return Err(EngineError::Constraint(violations));
        }

        let mut doc = existing.unwrap_or_default();
        apply_input(type_def, &mut doc, candidate, &related);

        let id = match doc.get(identifier).and_then(id_text) {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4().to_string();
                doc.insert(identifier.to_string(), Value::String(id.clone()));
                id
            }
        };

        let handlers = executor
            .hooks()
            .chain(namespace, &type_def.name, &operation.hook_suffixes());
        let ctx = executor
            .context(self.request_id, &type_def.name)
            .with_operation(operation.name.clone());
        let store = executor.store();
        let persisted = Pipeline::run_with(&handlers, doc, &ctx, &|doc: Document| {
            if creating {
                store.create(&type_def.name, &id, &doc)?;
            } else {
                store.modify(&type_def.name, &id, &doc)?;
            }
            Ok(doc)
        })?;

        Ok(collaborators.redactor.filter(namespace, &type_def.name, persisted))
    }

    /// The stored document a modify targets, looked up through the restriction pipeline
    fn find_existing(&mut self, type_def: &TypeDef, input: &Document) -> EngineResult<Document> {
        let identifier = type_def.identifier_name();
        let id = input
            .get(identifier)
            .filter(|v| !v.is_null())
            .cloned()
            .ok_or_else(|| EngineError::Constraint(vec![ConstraintViolation::missing_field(identifier)]))?;

        self.lookup_by_id(type_def, &id)?
            .ok_or_else(|| EngineError::not_found(format!("{} '{}'", type_def.name, display_id(&id))))
    }

    fn lookup_by_id(&mut self, type_def: &TypeDef, id: &Value) -> EngineResult<Option<Document>> {
        let executor = self.executor;
        let compiler: FilterCompiler<'_> = executor.compiler();
        let mut args = Map::new();
        args.insert(ID_ARGUMENT.to_string(), id.clone());
        let spec = compiler.compile_query(&type_def.name, &args)?;
        let mut docs = executor.fetch_restricted(self.request_id, &type_def.name, spec)?;
        Ok(if docs.is_empty() { None } else { Some(docs.swap_remove(0)) })
    }

    /// Every referenced id must exist; returns the referenced documents by field
    fn check_references(&mut self, type_def: &TypeDef, input: &Document) -> EngineResult<Map<String, Value>> {
        let store = self.executor.store();
        let mut related = Map::new();

        for (key, value) in input {
            let field = match reference_field(type_def, key) {
                Some(field) => field,
                None => continue,
            };
            let target = match field.reference_target() {
                Some(target) => target,
                None => continue,
            };

            let mut loaded = Vec::new();
            for id in referenced_ids(value) {
                match store.load(target, &id)? {
                    Some(doc) => loaded.push(Value::Object(doc)),
                    None => {
                        return Err(EngineError::reference(format!(
                            "{} '{}' referenced by field '{}' does not exist",
                            target, id, field.name
                        )))
                    }
                }
            }

            let loaded = if field.list {
                Value::Array(loaded)
            } else {
                loaded.into_iter().next().unwrap_or(Value::Null)
            };
            related.insert(field.name.clone(), loaded);
        }

        Ok(related)
    }

    fn delete(&mut self, type_def: &TypeDef, operation: &Operation, selection: &Selection) -> EngineResult<()> {
        let executor = self.executor;
        let namespace = executor.namespace();
        let identifier = type_def.identifier_name();

        let id = delete_target(identifier, &selection.arguments)
            .ok_or_else(|| EngineError::Constraint(vec![ConstraintViolation::missing_field(identifier)]))?;
        let existing = self
            .lookup_by_id(type_def, &id)?
            .ok_or_else(|| EngineError::not_found(format!("{} '{}'", type_def.name, display_id(&id))))?;

        if !executor.collaborators().guard.can_execute(
            &operation.name,
            namespace,
            &type_def.name,
            &selection.arguments,
            std::slice::from_ref(&existing),
        ) {
            return Err(EngineError::authorization(format!(
                "operation '{}' on {} is not allowed",
                operation.name, type_def.name
            )));
        }

        let stored_id = existing
            .get(identifier)
            .and_then(id_text)
            .ok_or_else(|| EngineError::internal(format!("{} document without '{}'", type_def.name, identifier)))?;

        let handlers = executor
            .hooks()
            .chain(namespace, &type_def.name, &operation.hook_suffixes());
        let ctx = executor
            .context(self.request_id, &type_def.name)
            .with_operation(operation.name.clone());
        let store = executor.store();
        Pipeline::run_with(&handlers, existing, &ctx, &|doc: Document| {
            store.delete(&type_def.name, &stored_id)?;
            Ok(doc)
        })?;
        Ok(())
    }
}

/// The `input` object, or the arguments themselves
fn mutation_input(selection: &Selection) -> EngineResult<Document> {
    match selection.arguments.get(INPUT_ARGUMENT) {
        Some(Value::Object(input)) if selection.arguments.len() == 1 => Ok(input.clone()),
        Some(other) if selection.arguments.len() == 1 => Err(EngineError::Constraint(vec![ConstraintViolation::new(
            INPUT_ARGUMENT,
            format!("expected an object, got {}", other),
        )])),
        _ => Ok(selection.arguments.clone()),
    }
}

/// Delete takes the identifier argument, `id`, or its single argument
fn delete_target(identifier: &str, arguments: &Map<String, Value>) -> Option<Value> {
    let value = arguments
        .get(identifier)
        .or_else(|| arguments.get(ID_ARGUMENT))
        .or_else(|| arguments.get(INPUT_ARGUMENT))
        .or_else(|| if arguments.len() == 1 { arguments.values().next() } else { None })?;

    match value {
        Value::Object(input) => input.get(identifier).cloned(),
        Value::Null => None,
        other => Some(other.clone()),
    }
}

/// Only the identifier and the operation's assign fields may be supplied
fn check_assignable(type_def: &TypeDef, operation: &Operation, input: &Document) -> EngineResult<()> {
    let violations: Vec<ConstraintViolation> = input
        .keys()
        .filter(|key| key.as_str() != type_def.identifier_name())
        .filter(|key| {
            let field_name = reference_field(type_def, key).map_or(key.as_str(), |f| f.name.as_str());
            !operation.assigns(field_name)
        })
        .map(|key| {
            ConstraintViolation::new(
                key.as_str(),
                format!("field is not assignable by operation '{}'", operation.name),
            )
        })
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(EngineError::Constraint(violations))
    }
}

/// The reference field an input key names, either `field` or `field_id`
fn reference_field<'t>(type_def: &'t TypeDef, key: &str) -> Option<&'t FieldDef> {
    type_def
        .field(key)
        .or_else(|| key.strip_suffix("_id").and_then(|base| type_def.field(base)))
        .filter(|f| f.reference_target().is_some())
}

/// Ids named by a reference input value
fn referenced_ids(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().flat_map(referenced_ids).collect(),
        Value::Object(obj) => obj
            .get("id")
            .and_then(id_text)
            .into_iter()
            .collect(),
        other => id_text(other).into_iter().collect(),
    }
}

/// Merges validated input into `doc` in stored form
fn apply_input(type_def: &TypeDef, doc: &mut Document, input: Document, related: &Map<String, Value>) {
    for (key, value) in input {
        if let Some(field) = reference_field(type_def, &key) {
            let pointer_key = field.pointer_key();
            doc.remove(&field.name);
            doc.remove(&pointer_key);
            if value.is_null() {
                continue;
            }
            if field.inline {
                if let Some(loaded) = related.get(&field.name) {
                    doc.insert(field.name.clone(), loaded.clone());
                }
            } else {
                doc.insert(pointer_key, pointer_value(field, &value));
            }
            continue;
        }

        let stored = match type_def.field(&key) {
            Some(FieldDef {
                kind: FieldKind::Scalar(kind),
                list,
                ..
            }) => match (&value, *list) {
                (Value::Array(items), true) => Value::Array(
                    items
                        .iter()
                        .map(|item| kind.coerce(item).unwrap_or_else(|_| item.clone()))
                        .collect(),
                ),
                _ => kind.coerce(&value).unwrap_or_else(|_| value.clone()),
            },
            _ => value,
        };
        doc.insert(key, stored);
    }
}

/// Pointer form of a reference input value
fn pointer_value(field: &FieldDef, value: &Value) -> Value {
    let ids: Vec<Value> = referenced_ids(value).into_iter().map(Value::String).collect();
    if field.list {
        Value::Array(ids)
    } else {
        ids.into_iter().next().unwrap_or(Value::Null)
    }
}

fn display_id(id: &Value) -> String {
    id_text(id).unwrap_or_else(|| id.to_string())
}
