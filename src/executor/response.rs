//! Execution response
//!
//! ```json
//! {
//!   "data": {"empleados": [{"name": "Juan", "provincia": null}]},
//!   "errors": [{
//!     "message": "Unknown field salary in filter key 'salaryEquals'",
//!     "path": ["empleados"],
//!     "extensions": {"code": "COMPILE_ERROR", "key": "salaryEquals"}
//!   }]
//! }
//! ```

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::error::EngineError;

/// One step of a response path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(k) => f.write_str(k),
            PathSegment::Index(i) => write!(f, "{}", i),
        }
    }
}

/// A field-level or request-level error
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseError {
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<PathSegment>,
    pub extensions: Value,
}

impl ResponseError {
    pub fn from_engine(error: &EngineError, path: Vec<PathSegment>) -> Self {
        Self {
            message: error.to_string(),
            path,
            extensions: error.extensions(),
        }
    }

    pub fn code(&self) -> Option<&str> {
        self.extensions.get("code").and_then(Value::as_str)
    }

    /// Dotted rendering of the path for logs
    pub fn path_string(&self) -> String {
        self.path
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// Result of one request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub data: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ResponseError>,
}

impl Response {
    /// A response with no data and a single request-level error
    pub fn failed(error: &EngineError) -> Self {
        Self {
            data: Value::Null,
            errors: vec![ResponseError::from_engine(error, Vec::new())],
        }
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Convenience lookup into `data` by response key
    pub fn field(&self, key: &str) -> &Value {
        self.data.get(key).unwrap_or(&Value::Null)
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
