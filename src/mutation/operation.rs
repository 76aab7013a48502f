//! Mutation operations

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::{Map, Value};

use super::errors::MutationError;
use crate::schema::upper_first;

/// What an operation does to storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationContext {
    Create,
    Modify,
    Delete,
}

impl OperationContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationContext::Create => "create",
            OperationContext::Modify => "modify",
            OperationContext::Delete => "delete",
        }
    }
}

impl fmt::Display for OperationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationContext {
    type Err = MutationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create" => Ok(OperationContext::Create),
            "modify" | "update" => Ok(OperationContext::Modify),
            "delete" => Ok(OperationContext::Delete),
            other => Err(MutationError::UnknownContext {
                operation: String::new(),
                context: other.to_string(),
            }),
        }
    }
}

/// Names of the implicit operations
pub const CREATE: &str = "create";
pub const UPDATE: &str = "update";
pub const DELETE: &str = "delete";

/// A named mutation on one type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Operation {
    pub name: String,
    pub context: OperationContext,
    /// Fields the caller may supply
    pub assign_fields: Vec<String>,
    /// Values merged over the input before persisting
    pub set_values: Map<String, Value>,
    /// True for create/update/delete derived from the type flags
    pub implicit: bool,
}

impl Operation {
    pub(crate) fn implicit(name: &str, context: OperationContext, assign_fields: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            context,
            assign_fields,
            set_values: Map::new(),
            implicit: true,
        }
    }

    /// Resolver name, e.g. `empleadoCreate`
    pub fn resolver_name(&self, singular: &str) -> String {
        format!("{}{}", singular, upper_first(&self.name))
    }

    /// Handler tag suffixes run around the persistence step, outermost first.
    /// Create and modify operations share the `Write` stage; a delete-context
    /// operation runs only its own stage (`Delete`, `Archive`, ...).
    pub fn hook_suffixes(&self) -> Vec<String> {
        match self.context {
            OperationContext::Delete => vec![upper_first(&self.name)],
            _ => vec!["Write".to_string(), upper_first(&self.name)],
        }
    }

    pub fn assigns(&self, field: &str) -> bool {
        self.assign_fields.iter().any(|f| f == field)
    }
}
