//! File-per-document store
//!
//! Layout: `<root>/<namespace>/<TypeName>/<id>`, each file an indented JSON
//! object. In-progress writes live in `<id>.tmp` and are invisible to scans.
//!
//! There are no indexes: every fetch decodes every file of the type.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;

use super::errors::{StoreError, StoreResult};
use super::evaluator::{satisfies, Evaluator, RelationLoader};
use super::sorter::{Keyed, ResultSorter};
use super::writer::{self, is_temp_file, StagedWrite, TEMP_SUFFIX};
use super::Document;
use crate::crash_point::{maybe_crash, CrashPoint};
use crate::filter::{Filter, Operator, QuerySpec};
use crate::observability::{log_event_with_fields, Event, Logger, MetricsRegistry};
use crate::schema::{Schema, TypeDef};

/// Durable scan-based document store for one namespace
pub struct DocumentStore {
    root: PathBuf,
    namespace: String,
    schema: Arc<Schema>,
    metrics: Arc<MetricsRegistry>,
}

impl DocumentStore {
    /// Opens (creating if needed) the namespace directory under `root`
    pub fn open(
        root: impl AsRef<Path>,
        namespace: &str,
        schema: Arc<Schema>,
        metrics: Arc<MetricsRegistry>,
    ) -> StoreResult<Self> {
        let root = root.as_ref().join(namespace);
        fs::create_dir_all(&root).map_err(|e| StoreError::io(&root, e))?;

        Ok(Self {
            root,
            namespace: namespace.to_string(),
            schema,
            metrics,
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Directory holding every document of `type_name`
    pub fn type_dir(&self, type_name: &str) -> PathBuf {
        self.root.join(type_name)
    }

    /// Path of one document file
    pub fn document_path(&self, type_name: &str, id: &str) -> StoreResult<PathBuf> {
        validate_id(id)?;
        Ok(self.type_dir(type_name).join(id))
    }

    /// Writes a new document; fails if the id is taken
    pub fn create(&self, type_name: &str, id: &str, doc: &Document) -> StoreResult<()> {
        let path = self.document_path(type_name, id)?;
        if path.exists() {
            return Err(StoreError::AlreadyExists {
                type_name: type_name.to_string(),
                id: id.to_string(),
            });
        }
        self.write(type_name, id, doc)
    }

    /// Overwrites an existing document.
    ///
    /// The caller merges prior state into `doc`; nothing guards against a
    /// concurrent writer between that read and this write.
    pub fn modify(&self, type_name: &str, id: &str, doc: &Document) -> StoreResult<()> {
        let path = self.document_path(type_name, id)?;
        if !path.exists() {
            return Err(StoreError::not_found(type_name, id));
        }
        self.write(type_name, id, doc)
    }

    /// Writes the temp file for a document without publishing it
    pub fn stage(&self, type_name: &str, id: &str, doc: &Document) -> StoreResult<StagedWrite> {
        let path = self.document_path(type_name, id)?;
        writer::stage(&path, id, doc)
    }

    fn write(&self, type_name: &str, id: &str, doc: &Document) -> StoreResult<()> {
        self.stage(type_name, id, doc)?.publish()?;

        self.metrics.increment_writes();
        log_event_with_fields(
            Event::DocumentWritten,
            &[("namespace", &self.namespace), ("type", type_name), ("id", id)],
        );
        Ok(())
    }

    /// Removes a document. Returns whether a file was removed; a missing
    /// type directory or document is not an error.
    pub fn delete(&self, type_name: &str, id: &str) -> StoreResult<bool> {
        let path = self.document_path(type_name, id)?;
        if !path.exists() {
            return Ok(false);
        }

        maybe_crash(CrashPoint::BeforeDelete);

        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(StoreError::io(&path, e)),
        }

        self.metrics.increment_deletes();
        log_event_with_fields(
            Event::DocumentDeleted,
            &[("namespace", &self.namespace), ("type", type_name), ("id", id)],
        );
        Ok(true)
    }

    /// Point read by id
    pub fn load(&self, type_name: &str, id: &str) -> StoreResult<Option<Document>> {
        let path = self.document_path(type_name, id)?;
        match fs::read_to_string(&path) {
            Ok(content) => decode(&path, &content).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }

    /// Full scan: filter, sort, since-cursor, then limit
    pub fn fetch(&self, type_name: &str, spec: &QuerySpec) -> StoreResult<Vec<Document>> {
        let type_def = self
            .schema
            .get_type(type_name)
            .ok_or_else(|| StoreError::UnknownType(type_name.to_string()))?;

        let files = self.list_documents(type_name)?;
        let scanned = files.len();

        let mut evaluator = Evaluator::new(&self.schema, self);
        let mut rows = Vec::new();

        for path in files {
            let content = match fs::read_to_string(&path) {
                Ok(c) => c,
                // Deleted between listing and reading
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(StoreError::io(&path, e)),
            };
            let doc = decode(&path, &content)?;
            // Relations spliced in during evaluation stay on the working copy
            let mut working = doc.clone();

            if let Some(filter) = spec.filter() {
                if !evaluator.matches(type_def, &mut working, filter) {
                    continue;
                }
            }

            if !passes_cursor(&mut evaluator, type_def, &mut working, spec) {
                continue;
            }

            let keys = spec
                .sort()
                .iter()
                .map(|rule| evaluator.resolve(type_def, &mut working, &rule.field))
                .collect();
            rows.push(Keyed { keys, doc });
        }

        ResultSorter::sort(&mut rows, spec.sort());

        if let Some(limit) = spec.limit() {
            rows.truncate(limit);
        }

        self.metrics.record_fetch(type_name);
        self.metrics.add_documents_scanned(scanned as u64);
        let conditions = spec.filter().map_or(0, Filter::condition_count);
        log_event_with_fields(
            Event::DocumentsFetched,
            &[
                ("namespace", &self.namespace),
                ("type", type_name),
                ("conditions", &conditions.to_string()),
                ("scanned", &scanned.to_string()),
                ("returned", &rows.len().to_string()),
            ],
        );

        Ok(rows.into_iter().map(|row| row.doc).collect())
    }

    /// Removes `*.tmp` files left behind by interrupted writes
    pub fn sweep_stale_temp_files(&self) -> StoreResult<usize> {
        let mut removed = 0;
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(StoreError::io(&self.root, e)),
        };

        for entry in entries {
            let type_dir = entry.map_err(|e| StoreError::io(&self.root, e))?.path();
            if !type_dir.is_dir() {
                continue;
            }
            for file in fs::read_dir(&type_dir).map_err(|e| StoreError::io(&type_dir, e))? {
                let path = file.map_err(|e| StoreError::io(&type_dir, e))?.path();
                if !is_temp_file(&path) {
                    continue;
                }
                fs::remove_file(&path).map_err(|e| StoreError::io(&path, e))?;
                removed += 1;
                log_event_with_fields(Event::TempFileSwept, &[("path", &path.display().to_string())]);
            }
        }

        Ok(removed)
    }

    /// Document files of a type in file-name order
    fn list_documents(&self, type_name: &str) -> StoreResult<Vec<PathBuf>> {
        let dir = self.type_dir(type_name);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&dir, e)),
        };

        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| StoreError::io(&dir, e))?.path();
            if path.is_file() && !is_temp_file(&path) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

impl RelationLoader for DocumentStore {
    fn load_related(&self, type_name: &str, id: &str) -> Option<Document> {
        match self.load(type_name, id) {
            Ok(doc) => doc,
            Err(e) => {
                Logger::warn(
                    "STORE_RELATION_UNRESOLVED",
                    &[("type", type_name), ("id", id), ("error", &e.to_string())],
                );
                None
            }
        }
    }
}

/// Keeps documents strictly greater than every cursor entry
fn passes_cursor(evaluator: &mut Evaluator<'_>, type_def: &TypeDef, doc: &mut Document, spec: &QuerySpec) -> bool {
    spec.since().iter().all(|(field, value)| {
        let actual = evaluator.resolve(type_def, doc, field);
        satisfies(Operator::Gt, actual.as_ref(), std::slice::from_ref(value))
    })
}

fn decode(path: &Path, content: &str) -> StoreResult<Document> {
    match serde_json::from_str::<Value>(content) {
        Ok(Value::Object(doc)) => Ok(doc),
        Ok(_) => Err(StoreError::decode(path, "document is not a JSON object")),
        Err(e) => Err(StoreError::decode(path, e.to_string())),
    }
}

/// Ids must be plain file names
fn validate_id(id: &str) -> StoreResult<()> {
    let reason = if id.is_empty() {
        "id is empty"
    } else if id == "." || id == ".." {
        "id is a relative path"
    } else if id.contains(['/', '\\', '\0']) {
        "id contains a path separator"
    } else if id.ends_with(TEMP_SUFFIX) {
        "id uses the temp file suffix"
    } else {
        return Ok(());
    };

    Err(StoreError::InvalidId {
        id: id.to_string(),
        reason,
    })
}
