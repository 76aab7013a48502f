//! Operation catalog
//!
//! Operations are extracted once per (namespace, type) when the engine is
//! built and shared read-only afterwards.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::errors::MutationResult;
use super::extractor::MutationExtractor;
use super::operation::Operation;
use crate::schema::{lower_first, Schema};

/// A resolvable mutation: the type it acts on and the operation itself
#[derive(Debug, Clone)]
pub struct MutationEntry {
    pub type_name: String,
    pub operation: Operation,
}

/// Extracted operations keyed by (namespace, type)
#[derive(Debug, Default)]
pub struct OperationCatalog {
    by_type: BTreeMap<(String, String), Arc<Vec<Operation>>>,
}

impl OperationCatalog {
    /// Extracts the operations of every type in `schema`
    pub fn build(namespace: &str, schema: &Schema) -> MutationResult<Self> {
        let mut catalog = Self::default();
        for type_def in &schema.types {
            let operations = MutationExtractor::extract(type_def)?;
            catalog
                .by_type
                .insert((namespace.to_string(), type_def.name.clone()), Arc::new(operations));
        }
        Ok(catalog)
    }

    /// Operations of one type, in catalog order
    pub fn operations(&self, namespace: &str, type_name: &str) -> Option<Arc<Vec<Operation>>> {
        self.by_type
            .get(&(namespace.to_string(), type_name.to_string()))
            .cloned()
    }

    /// Every mutation of a namespace keyed by resolver name
    /// (`<lowerType><Operation>`)
    pub fn resolvers(&self, namespace: &str) -> BTreeMap<String, MutationEntry> {
        let mut resolvers = BTreeMap::new();
        for ((ns, type_name), operations) in &self.by_type {
            if ns != namespace {
                continue;
            }
            let prefix = lower_first(type_name);
            for operation in operations.iter() {
                resolvers.insert(
                    operation.resolver_name(&prefix),
                    MutationEntry {
                        type_name: type_name.clone(),
                        operation: operation.clone(),
                    },
                );
            }
        }
        resolvers
    }

    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}
