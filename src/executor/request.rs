//! Per-request resolution state
//!
//! A request projects documents onto selection sets in two phases. Phase one
//! walks the documents at hand and records a deferred slot wherever another
//! stored document is needed. Phase two (`flush`) loads those documents in
//! batches and fills the slots, which may record further slots.

use std::collections::HashMap;

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::filter::{Filter, QuerySpec};
use crate::observability::{log_event_with_fields, Event};
use crate::schema::TypeDef;
use crate::store::Document;

use super::batch::{id_text, Deferred, DeferredMode, IdRef, PendingBatch};
use super::document::Selection;
use super::executor::QueryExecutor;
use super::response::{PathSegment, ResponseError};

const TYPENAME_FIELD: &str = "__typename";

/// Where a document being projected came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Origin {
    /// Loaded from the store; absent fields are null
    Stored,
    /// Copied inside another document; absent fields may exist on the stored original
    Embedded,
}

pub(crate) struct Request<'e> {
    pub(super) executor: &'e QueryExecutor,
    pub(super) request_id: Uuid,
    batch: PendingBatch,
    errors: Vec<ResponseError>,
}

impl<'e> Request<'e> {
    pub fn new(executor: &'e QueryExecutor, request_id: Uuid) -> Self {
        Self {
            executor,
            request_id,
            batch: PendingBatch::new(),
            errors: Vec::new(),
        }
    }

    pub fn into_errors(self) -> Vec<ResponseError> {
        self.errors
    }

    /// Records a field error; the field's value is null
    pub fn fail(&mut self, path: Vec<PathSegment>, error: &EngineError) {
        let entry = ResponseError::from_engine(error, path);
        let request_id = self.request_id.to_string();
        let path = entry.path_string();
        log_event_with_fields(
            Event::FieldFailed,
            &[
                ("request_id", &request_id),
                ("path", &path),
                ("code", error.code()),
                ("error", &entry.message),
            ],
        );
        self.errors.push(entry);
    }

    pub fn resolve_root_query(&mut self, selection: &Selection, path: &[PathSegment]) -> EngineResult<Value> {
        let executor = self.executor;
        let root = executor
            .root(&selection.name)
            .ok_or_else(|| EngineError::unknown_field("Query", &selection.name))?;
        let type_def = executor.schema().require_type(&root.type_name)?;

        let spec = executor.compiler().compile_query(&type_def.name, &selection.arguments)?;
        let docs = executor.read(self.request_id, &type_def.name, spec)?;

        if root.plural {
            let items = docs
                .iter()
                .enumerate()
                .map(|(i, doc)| {
                    let item_path = child_path(path, PathSegment::Index(i));
                    self.project(type_def, doc, &selection.selections, item_path, Origin::Stored)
                })
                .collect();
            Ok(Value::Array(items))
        } else {
            Ok(match docs.first() {
                Some(doc) => self.project(type_def, doc, &selection.selections, path.to_vec(), Origin::Stored),
                None => Value::Null,
            })
        }
    }

    /// Projects `doc` onto `selections`; an empty selection set yields the whole document
    pub fn project(
        &mut self,
        type_def: &TypeDef,
        doc: &Document,
        selections: &[Selection],
        path: Vec<PathSegment>,
        origin: Origin,
    ) -> Value {
        if selections.is_empty() {
            return Value::Object(doc.clone());
        }

        let mut projected = Map::new();
        for selection in selections {
            let key = selection.response_key().to_string();
            let field_path = child_path(&path, PathSegment::Key(key.clone()));
            let value = self.project_field(type_def, doc, selection, field_path, origin);
            projected.insert(key, value);
        }
        Value::Object(projected)
    }

    fn project_field(
        &mut self,
        type_def: &TypeDef,
        doc: &Document,
        selection: &Selection,
        path: Vec<PathSegment>,
        origin: Origin,
    ) -> Value {
        if selection.name == TYPENAME_FIELD {
            return Value::String(type_def.name.clone());
        }

        let field = match type_def.field(&selection.name) {
            Some(field) => field,
            None => {
                self.fail(path, &EngineError::unknown_field(&type_def.name, &selection.name));
                return Value::Null;
            }
        };

        let target = match field.reference_target() {
            Some(target) => target,
            None => {
                if let Some(value) = doc.get(&field.name) {
                    return value.clone();
                }
                self.defer_parent(type_def, doc, selection, path, origin);
                return Value::Null;
            }
        };

        let executor = self.executor;
        let target_def = match executor.schema().get_type(target) {
            Some(t) => t,
            None => return Value::Null,
        };

        match doc.get(&field.name) {
            Some(Value::Object(embedded)) => {
                return self.project(target_def, embedded, &selection.selections, path, Origin::Embedded);
            }
            Some(Value::Array(items)) if items.iter().any(Value::is_object) => {
                let projected = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| match item {
                        Value::Object(embedded) => self.project(
                            target_def,
                            embedded,
                            &selection.selections,
                            child_path(&path, PathSegment::Index(i)),
                            Origin::Embedded,
                        ),
                        other => other.clone(),
                    })
                    .collect();
                return Value::Array(projected);
            }
            Some(Value::Null) => return Value::Null,
            Some(pointer) => return self.defer_relation(target, pointer, selection, path),
            None => {}
        }

        if let Some(pointer) = doc.get(&field.pointer_key()) {
            return self.defer_relation(target, pointer, selection, path);
        }

        self.defer_parent(type_def, doc, selection, path, origin);
        Value::Null
    }

    /// Records a relation slot; without sub-selections the pointer itself is the value
    fn defer_relation(&mut self, target: &str, pointer: &Value, selection: &Selection, path: Vec<PathSegment>) -> Value {
        if selection.selections.is_empty() {
            return pointer.clone();
        }
        let ids = match IdRef::from_pointer(pointer) {
            Some(ids) => ids,
            None => return Value::Null,
        };
        let placeholder = match ids {
            IdRef::One(_) => Value::Null,
            IdRef::Many(_) => Value::Array(Vec::new()),
        };
        self.batch.defer(Deferred {
            path,
            type_name: target.to_string(),
            ids,
            selection: selection.clone(),
            mode: DeferredMode::Relation,
        });
        placeholder
    }

    /// An embedded copy missing a field is re-read from its stored original
    fn defer_parent(
        &mut self,
        type_def: &TypeDef,
        doc: &Document,
        selection: &Selection,
        path: Vec<PathSegment>,
        origin: Origin,
    ) {
        if origin != Origin::Embedded {
            return;
        }
        if let Some(id) = doc.get(type_def.identifier_name()).and_then(id_text) {
            self.batch.defer(Deferred {
                path,
                type_name: type_def.name.clone(),
                ids: IdRef::One(id),
                selection: selection.clone(),
                mode: DeferredMode::ParentField,
            });
        }
    }

    /// Resolves every pending slot into `data`, round by round
    pub fn flush(&mut self, data: &mut Value) {
        while self.batch.has_pending() {
            let round = self.batch.take();

            let mut failures: HashMap<String, EngineError> = HashMap::new();
            for (type_name, ids) in self.batch.missing(&round) {
                if let Err(e) = self.load_batch(&type_name, ids.into_iter().collect()) {
                    failures.insert(type_name, e);
                }
            }

            for deferred in round {
                let value = match failures.get(&deferred.type_name) {
                    Some(e) => {
                        self.fail(deferred.path.clone(), e);
                        Value::Null
                    }
                    None => self.fill(&deferred),
                };
                set_at(data, &deferred.path, value);
            }
        }
    }

    /// One `idIn` fetch for `ids`, through restrictions, redaction and read hooks
    fn load_batch(&mut self, type_name: &str, ids: Vec<String>) -> EngineResult<()> {
        let executor = self.executor;
        let type_def = executor.schema().require_type(type_name)?;
        let identifier = type_def.identifier_name();

        let filter = Filter::in_list(identifier, ids.iter().cloned().map(Value::String).collect());
        let docs = executor.read(self.request_id, type_name, QuerySpec::filtered(filter))?;
        executor.metrics().increment_batch_loads();

        let request_id = self.request_id.to_string();
        let requested = ids.len().to_string();
        let loaded = docs.len().to_string();
        log_event_with_fields(
            Event::BatchLoaded,
            &[
                ("request_id", &request_id),
                ("type", type_name),
                ("requested", &requested),
                ("loaded", &loaded),
            ],
        );

        for doc in docs {
            if let Some(id) = doc.get(identifier).and_then(id_text) {
                self.batch.remember(type_name, &id, Some(doc));
            }
        }
        for id in &ids {
            if !self.batch.is_memoized(type_name, id) {
                self.batch.remember(type_name, id, None);
            }
        }
        Ok(())
    }

    fn fill(&mut self, deferred: &Deferred) -> Value {
        let executor = self.executor;
        let type_def = match executor.schema().get_type(&deferred.type_name) {
            Some(t) => t,
            None => return Value::Null,
        };

        match (deferred.mode, &deferred.ids) {
            (DeferredMode::Relation, IdRef::One(id)) => match self.batch.lookup(&type_def.name, id).cloned() {
                Some(doc) => self.project(
                    type_def,
                    &doc,
                    &deferred.selection.selections,
                    deferred.path.clone(),
                    Origin::Stored,
                ),
                None => Value::Null,
            },
            (DeferredMode::Relation, IdRef::Many(ids)) => {
                let docs: Vec<Document> = ids
                    .iter()
                    .filter_map(|id| self.batch.lookup(&type_def.name, id).cloned())
                    .collect();
                let items = docs
                    .iter()
                    .enumerate()
                    .map(|(i, doc)| {
                        self.project(
                            type_def,
                            doc,
                            &deferred.selection.selections,
                            child_path(&deferred.path, PathSegment::Index(i)),
                            Origin::Stored,
                        )
                    })
                    .collect();
                Value::Array(items)
            }
            (DeferredMode::ParentField, ids) => {
                let doc = ids
                    .ids()
                    .first()
                    .and_then(|id| self.batch.lookup(&type_def.name, id).cloned());
                match doc {
                    Some(doc) => {
                        self.project_field(type_def, &doc, &deferred.selection, deferred.path.clone(), Origin::Stored)
                    }
                    None => Value::Null,
                }
            }
        }
    }
}

pub(super) fn child_path(path: &[PathSegment], segment: PathSegment) -> Vec<PathSegment> {
    let mut child = path.to_vec();
    child.push(segment);
    child
}

/// Writes `value` at `path` inside `data`; a path that no longer exists is skipped
fn set_at(data: &mut Value, path: &[PathSegment], value: Value) {
    let mut current = data;
    for segment in path {
        let next = match segment {
            PathSegment::Key(key) => current.get_mut(key.as_str()),
            PathSegment::Index(i) => current.get_mut(*i),
        };
        current = match next {
            Some(next) => next,
            None => return,
        };
    }
    *current = value;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_at_nested() {
        let mut data = json!({"empleados": [{"provincia": null}, {"provincia": null}]});
        let path = vec![
            PathSegment::Key("empleados".into()),
            PathSegment::Index(1),
            PathSegment::Key("provincia".into()),
        ];
        set_at(&mut data, &path, json!({"nombre": "Lima"}));
        assert_eq!(data["empleados"][1]["provincia"]["nombre"], "Lima");
        assert!(data["empleados"][0]["provincia"].is_null());
    }

    #[test]
    fn test_set_at_missing_path_is_noop() {
        let mut data = json!({"empleado": null});
        let path = vec![PathSegment::Key("empleado".into()), PathSegment::Key("jefe".into())];
        set_at(&mut data, &path, json!("x"));
        assert_eq!(data, json!({"empleado": null}));
    }
}
