//! Schema loader
//!
//! The schema is a single JSON file holding `{"types": [...]}`. A file that
//! cannot be read, parsed, or structurally validated is rejected as a whole.

use std::fs;
use std::path::Path;

use super::errors::{SchemaError, SchemaResult};
use super::types::Schema;
use crate::observability::{log_event_with_fields, Event};

/// Reads schema files from disk
pub struct SchemaLoader;

impl SchemaLoader {
    /// Loads and validates the schema at `path`.
    pub fn load(path: &Path) -> SchemaResult<Schema> {
        let content = fs::read_to_string(path).map_err(|e| {
            SchemaError::malformed(path.display().to_string(), format!("Failed to read file: {}", e))
        })?;

        let schema = Self::from_str_at(&content, &path.display().to_string())?;

        let count = schema.types.len().to_string();
        log_event_with_fields(
            Event::SchemaLoaded,
            &[("path", &path.display().to_string()), ("types", &count)],
        );

        Ok(schema)
    }

    /// Parses and validates a schema from a JSON string.
    pub fn from_json(content: &str) -> SchemaResult<Schema> {
        Self::from_str_at(content, "<in-memory>")
    }

    fn from_str_at(content: &str, origin: &str) -> SchemaResult<Schema> {
        let schema: Schema = serde_json::from_str(content)
            .map_err(|e| SchemaError::malformed(origin, format!("Invalid JSON: {}", e)))?;

        schema.validate_structure()?;
        Ok(schema)
    }
}
