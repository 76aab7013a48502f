//! Query executor for docloom
//!
//! Executes parsed request documents against the document store.
//!
//! Execution flow for a query root field:
//! 1. Compile arguments into a `QuerySpec`
//! 2. Run the type's restriction pipeline over the compiled filter
//! 3. Fetch from the store (filter, since, sort, limit)
//! 4. Redact each document, then run the type's read pipeline
//! 5. Project the selection set, deferring relation lookups
//! 6. Resolve deferred relations in batches, one fetch per type per round
//!
//! Mutation root fields run serially in document order; deferred relations
//! are flushed after each one so a later mutation observes the effects of
//! an earlier one.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::EngineResult;
use crate::filter::{Filter, FilterCompiler, QuerySpec, DEFAULT_MAX_LIMIT};
use crate::middleware::{HandlerRegistry, Pipeline, PipelineContext, READ_SUFFIX, RESTRICTION_SUFFIX};
use crate::mutation::{MutationEntry, OperationCatalog};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::schema::Schema;
use crate::store::{Document, DocumentStore};

use super::collaborators::Collaborators;
use super::document::{parse_document, OperationKind, QueryDocument};
use super::request::Request;
use super::response::{PathSegment, Response};

/// A query root field
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RootField {
    pub type_name: String,
    /// Plural accessors return a list, singular ones the first match or null
    pub plural: bool,
}

/// Executes request documents for one namespace
pub struct QueryExecutor {
    namespace: String,
    schema: Arc<Schema>,
    store: Arc<DocumentStore>,
    metrics: Arc<MetricsRegistry>,
    restrictions: Arc<HandlerRegistry<Option<Filter>>>,
    hooks: Arc<HandlerRegistry<Document>>,
    collaborators: Collaborators,
    max_limit: usize,
    roots: BTreeMap<String, RootField>,
    mutations: BTreeMap<String, MutationEntry>,
}

impl QueryExecutor {
    /// Creates an executor with empty handler registries and permissive collaborators
    pub fn new(store: Arc<DocumentStore>, catalog: &OperationCatalog, metrics: Arc<MetricsRegistry>) -> Self {
        let namespace = store.namespace().to_string();
        let schema = Arc::clone(store.schema());

        let mut roots = BTreeMap::new();
        for type_def in &schema.types {
            roots.insert(
                type_def.plural_name(),
                RootField {
                    type_name: type_def.name.clone(),
                    plural: true,
                },
            );
            roots.insert(
                type_def.singular_name(),
                RootField {
                    type_name: type_def.name.clone(),
                    plural: false,
                },
            );
        }

        Self {
            mutations: catalog.resolvers(&namespace),
            collaborators: Collaborators::permissive(Arc::clone(&schema)),
            namespace,
            schema,
            store,
            metrics,
            restrictions: Arc::new(HandlerRegistry::new()),
            hooks: Arc::new(HandlerRegistry::new()),
            max_limit: DEFAULT_MAX_LIMIT,
            roots,
        }
    }

    pub fn with_restrictions(mut self, restrictions: Arc<HandlerRegistry<Option<Filter>>>) -> Self {
        self.restrictions = restrictions;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<HandlerRegistry<Document>>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_collaborators(mut self, collaborators: Collaborators) -> Self {
        self.collaborators = collaborators;
        self
    }

    pub fn with_max_limit(mut self, max_limit: usize) -> Self {
        self.max_limit = max_limit;
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Query root field names, sorted
    pub fn query_fields(&self) -> Vec<&str> {
        self.roots.keys().map(String::as_str).collect()
    }

    /// Mutation root field names, sorted
    pub fn mutation_fields(&self) -> Vec<&str> {
        self.mutations.keys().map(String::as_str).collect()
    }

    /// Parses and executes a request document
    pub fn execute(&self, text: &str) -> Response {
        self.execute_with_id(text, Uuid::new_v4())
    }

    pub fn execute_with_id(&self, text: &str, request_id: Uuid) -> Response {
        match parse_document(text) {
            Ok(document) => self.execute_document(&document, request_id),
            Err(e) => {
                self.metrics.increment_requests();
                let request_id = request_id.to_string();
                log_event_with_fields(
                    Event::RequestExecuted,
                    &[("request_id", &request_id), ("outcome", "syntax_error"), ("error", &e.to_string())],
                );
                Response::failed(&e)
            }
        }
    }

    /// Executes an already parsed document
    pub fn execute_document(&self, document: &QueryDocument, request_id: Uuid) -> Response {
        let mut request = Request::new(self, request_id);
        let mut data = Value::Object(Map::new());

        for selection in &document.selections {
            let key = selection.response_key().to_string();
            let path = vec![PathSegment::Key(key.clone())];

            let resolved = match document.kind {
                OperationKind::Query => request.resolve_root_query(selection, &path),
                OperationKind::Mutation => request.resolve_mutation(selection, &path),
            };
            let value = match resolved {
                Ok(value) => value,
                Err(e) => {
                    request.fail(path, &e);
                    Value::Null
                }
            };
            if let Value::Object(fields) = &mut data {
                fields.insert(key, value);
            }

            if document.kind == OperationKind::Mutation {
                request.flush(&mut data);
            }
        }
        request.flush(&mut data);

        let errors = request.into_errors();
        self.metrics.increment_requests();

        let request_id = request_id.to_string();
        let roots = document.selections.len().to_string();
        let error_count = errors.len().to_string();
        let kind = match document.kind {
            OperationKind::Query => "query",
            OperationKind::Mutation => "mutation",
        };
        log_event_with_fields(
            Event::RequestExecuted,
            &[
                ("request_id", &request_id),
                ("kind", kind),
                ("root_fields", &roots),
                ("errors", &error_count),
            ],
        );

        Response { data, errors }
    }

    pub(crate) fn schema(&self) -> &Schema {
        &self.schema
    }

    pub(crate) fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub(crate) fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    pub(crate) fn hooks(&self) -> &HandlerRegistry<Document> {
        &self.hooks
    }

    pub(crate) fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    pub(crate) fn root(&self, name: &str) -> Option<&RootField> {
        self.roots.get(name)
    }

    pub(crate) fn mutation(&self, name: &str) -> Option<&MutationEntry> {
        self.mutations.get(name)
    }

    pub(crate) fn compiler(&self) -> FilterCompiler<'_> {
        FilterCompiler::new(&self.schema).with_max_limit(self.max_limit)
    }

    pub(crate) fn context(&self, request_id: Uuid, type_name: &str) -> PipelineContext {
        PipelineContext::new(request_id, self.namespace.clone(), type_name)
    }

    /// Fetches through the type's restriction pipeline, without redaction
    pub(crate) fn fetch_restricted(
        &self,
        request_id: Uuid,
        type_name: &str,
        spec: QuerySpec,
    ) -> EngineResult<Vec<Document>> {
        let handlers = self
            .restrictions
            .handlers_for(&self.namespace, type_name, RESTRICTION_SUFFIX);
        let spec = if handlers.is_empty() {
            spec
        } else {
            let ctx = self.context(request_id, type_name);
            let filter = Pipeline::run(&handlers, spec.filter().cloned(), &ctx)?;
            spec.with_filter(filter)
        };
        Ok(self.store.fetch(type_name, &spec)?)
    }

    /// Redacts stored documents and runs them through the read pipeline
    pub(crate) fn present(
        &self,
        request_id: Uuid,
        type_name: &str,
        docs: Vec<Document>,
    ) -> EngineResult<Vec<Document>> {
        let handlers = self.hooks.handlers_for(&self.namespace, type_name, READ_SUFFIX);
        let ctx = self.context(request_id, type_name);
        docs.into_iter()
            .map(|doc| {
                let doc = self.collaborators.redactor.filter(&self.namespace, type_name, doc);
                Pipeline::run(&handlers, doc, &ctx)
            })
            .collect()
    }

    /// Restricted fetch followed by redaction and read hooks
    pub(crate) fn read(&self, request_id: Uuid, type_name: &str, spec: QuerySpec) -> EngineResult<Vec<Document>> {
        let docs = self.fetch_restricted(request_id, type_name, spec)?;
        self.present(request_id, type_name, docs)
    }
}
