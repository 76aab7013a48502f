//! Engine context
//!
//! Owns everything one namespace needs to execute requests. Bootstrap order:
//!
//! 1. Validate configuration, set the log threshold
//! 2. Load and validate the schema
//! 3. Build the operation catalog
//! 4. Open the store, sweeping temp files left by interrupted writes
//! 5. Build the executor
//!
//! Any failure aborts the open; no partially built context is returned.

use std::sync::Arc;

use uuid::Uuid;

use crate::config::{ConfigError, EngineConfig};
use crate::error::EngineResult;
use crate::executor::{Collaborators, QueryExecutor, Response};
use crate::filter::Filter;
use crate::middleware::HandlerRegistry;
use crate::mutation::OperationCatalog;
use crate::observability::{log_event_with_fields, Event, Logger, MetricsRegistry};
use crate::schema::{Schema, SchemaLoader};
use crate::store::{Document, DocumentStore};

pub struct EngineContext {
    config: EngineConfig,
    schema: Arc<Schema>,
    catalog: Arc<OperationCatalog>,
    store: Arc<DocumentStore>,
    metrics: Arc<MetricsRegistry>,
    executor: QueryExecutor,
}

impl EngineContext {
    /// Opens a context, loading the schema from `config.schema_path`
    pub fn open(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        Logger::set_min_severity(config.severity()?);

        let path = config
            .schema_path
            .clone()
            .ok_or_else(|| ConfigError::Invalid {
                field: "schema_path",
                reason: "required when no schema is supplied".to_string(),
            })?;
        let schema = SchemaLoader::load(&path)?;
        Self::open_with_schema(config, schema)
    }

    /// Opens a context over an in-memory schema
    pub fn open_with_schema(config: EngineConfig, schema: Schema) -> EngineResult<Self> {
        config.validate()?;
        Logger::set_min_severity(config.severity()?);

        let data_dir = config.data_dir.display().to_string();
        log_event_with_fields(
            Event::BootStart,
            &[("data_dir", &data_dir), ("namespace", &config.namespace)],
        );

        schema.validate_structure()?;
        let schema = Arc::new(schema);
        let catalog = Arc::new(OperationCatalog::build(&config.namespace, &schema)?);

        let metrics = Arc::new(MetricsRegistry::new());
        let store = Arc::new(DocumentStore::open(
            &config.data_dir,
            &config.namespace,
            Arc::clone(&schema),
            Arc::clone(&metrics),
        )?);
        let swept = if config.sweep_temp_on_open {
            store.sweep_stale_temp_files()?
        } else {
            0
        };

        let executor = QueryExecutor::new(Arc::clone(&store), &catalog, Arc::clone(&metrics))
            .with_max_limit(config.max_limit);

        let types = schema.types.len().to_string();
        let operations = executor.mutation_fields().len().to_string();
        let swept = swept.to_string();
        log_event_with_fields(
            Event::BootComplete,
            &[
                ("namespace", &config.namespace),
                ("types", &types),
                ("mutations", &operations),
                ("temp_files_swept", &swept),
            ],
        );

        Ok(Self {
            config,
            schema,
            catalog,
            store,
            metrics,
            executor,
        })
    }

    pub fn with_restrictions(mut self, restrictions: HandlerRegistry<Option<Filter>>) -> Self {
        self.executor = self.executor.with_restrictions(Arc::new(restrictions));
        self
    }

    pub fn with_hooks(mut self, hooks: HandlerRegistry<Document>) -> Self {
        self.executor = self.executor.with_hooks(Arc::new(hooks));
        self
    }

    pub fn with_collaborators(mut self, collaborators: Collaborators) -> Self {
        self.executor = self.executor.with_collaborators(collaborators);
        self
    }

    /// Executes a request document under a fresh request id
    pub fn execute(&self, text: &str) -> Response {
        self.executor.execute_with_id(text, Uuid::new_v4())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn catalog(&self) -> &Arc<OperationCatalog> {
        &self.catalog
    }

    pub fn store(&self) -> &Arc<DocumentStore> {
        &self.store
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    pub fn executor(&self) -> &QueryExecutor {
        &self.executor
    }
}
