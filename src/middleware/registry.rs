//! Handler registry
//!
//! Handlers are registered under tags of the form
//! `"<namespace>::<Type><Suffix>"`, e.g. `default::EmpleadoRestriction` or
//! `default::EmpleadoWrite`. A type may also register a hooks object whose
//! hook named after the lower-cased suffix runs as the innermost handler of
//! that suffix.

use std::collections::HashMap;
use std::sync::Arc;

use super::pipeline::Handler;

/// Suffix of the filter-rewriting stage
pub const RESTRICTION_SUFFIX: &str = "Restriction";
/// Suffix of the post-read stage
pub const READ_SUFFIX: &str = "Read";
/// Suffix shared by every create/modify operation
pub const WRITE_SUFFIX: &str = "Write";
/// Suffix of delete operations
pub const DELETE_SUFFIX: &str = "Delete";

/// Builds a handler tag
pub fn tag(namespace: &str, type_name: &str, suffix: &str) -> String {
    format!("{}::{}{}", namespace, type_name, suffix)
}

/// Type-specific business logic, looked up by lower-cased suffix
/// (`"write"`, `"create"`, `"read"`, `"promote"`, ...)
pub trait TypeHooks<T>: Send + Sync {
    fn hook(&self, name: &str) -> Option<Handler<T>>;
}

/// Ordered handler lists per tag
pub struct HandlerRegistry<T> {
    handlers: HashMap<String, Vec<Handler<T>>>,
    type_hooks: HashMap<String, Arc<dyn TypeHooks<T>>>,
}

impl<T> Default for HandlerRegistry<T> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
            type_hooks: HashMap::new(),
        }
    }
}

impl<T> HandlerRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler to a tag's list
    pub fn register(&mut self, tag: impl Into<String>, handler: Handler<T>) -> &mut Self {
        self.handlers.entry(tag.into()).or_default().push(handler);
        self
    }

    /// Registers the hooks object of a type
    pub fn register_type_hooks(&mut self, type_name: impl Into<String>, hooks: Arc<dyn TypeHooks<T>>) -> &mut Self {
        self.type_hooks.insert(type_name.into(), hooks);
        self
    }

    pub fn has(&self, tag: &str) -> bool {
        self.handlers.get(tag).is_some_and(|h| !h.is_empty())
    }

    /// Handlers registered under `tag`; empty when none are
    pub fn get(&self, tag: &str) -> Vec<Handler<T>> {
        self.handlers.get(tag).cloned().unwrap_or_default()
    }

    /// Handlers for one suffix with the type's hook appended
    pub fn handlers_for(&self, namespace: &str, type_name: &str, suffix: &str) -> Vec<Handler<T>> {
        let mut handlers = self.get(&tag(namespace, type_name, suffix));
        if let Some(hook) = self
            .type_hooks
            .get(type_name)
            .and_then(|hooks| hooks.hook(&suffix.to_lowercase()))
        {
            handlers.push(hook);
        }
        handlers
    }

    /// Handlers for several suffixes, outermost suffix first
    pub fn chain(&self, namespace: &str, type_name: &str, suffixes: &[String]) -> Vec<Handler<T>> {
        suffixes
            .iter()
            .flat_map(|suffix| self.handlers_for(namespace, type_name, suffix))
            .collect()
    }
}
