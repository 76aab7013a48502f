//! Engine configuration
//!
//! A single JSON file:
//!
//! ```json
//! {
//!   "data_dir": "/var/lib/docloom",
//!   "namespace": "default",
//!   "schema_path": "/etc/docloom/schema.json",
//!   "max_limit": 1000,
//!   "log_level": "info",
//!   "sweep_temp_on_open": true
//! }
//! ```
//!
//! Only `data_dir` is required.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::filter::DEFAULT_MAX_LIMIT;
use crate::observability::{log_event_with_fields, Event, Severity};

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Invalid config JSON: {0}")]
    Parse(String),

    #[error("Invalid config value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Root of the document tree (required)
    pub data_dir: PathBuf,

    /// Namespace directory under `data_dir` (default "default")
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Schema JSON file; when absent the schema is supplied in code
    #[serde(default)]
    pub schema_path: Option<PathBuf>,

    /// Upper bound for a requested `limit` (default 1000)
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,

    /// Minimum log severity (default "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Remove `*.tmp` leftovers when the store opens (default true)
    #[serde(default = "default_sweep_temp_on_open")]
    pub sweep_temp_on_open: bool,
}

fn default_namespace() -> String {
    "default".to_string()
}
fn default_max_limit() -> usize {
    DEFAULT_MAX_LIMIT
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_sweep_temp_on_open() -> bool {
    true
}

impl EngineConfig {
    /// Configuration with defaults for everything but the data directory
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            namespace: default_namespace(),
            schema_path: None,
            max_limit: default_max_limit(),
            log_level: default_log_level(),
            sweep_temp_on_open: default_sweep_temp_on_open(),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_schema_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.schema_path = Some(path.into());
        self
    }

    pub fn with_max_limit(mut self, max_limit: usize) -> Self {
        self.max_limit = max_limit;
        self
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: EngineConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        config.validate()?;
        let path = path.display().to_string();
        log_event_with_fields(
            Event::ConfigLoaded,
            &[("path", &path), ("namespace", &config.namespace)],
        );
        Ok(config)
    }

    /// Checks values serde cannot
    pub fn validate(&self) -> ConfigResult<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::invalid("data_dir", "must not be empty"));
        }

        if self.namespace.trim().is_empty() {
            return Err(ConfigError::invalid("namespace", "must not be empty"));
        }
        if self.namespace.contains(['/', '\\']) || self.namespace == "." || self.namespace == ".." {
            return Err(ConfigError::invalid(
                "namespace",
                format!("'{}' is not a plain directory name", self.namespace),
            ));
        }

        if self.max_limit == 0 {
            return Err(ConfigError::invalid("max_limit", "must be > 0"));
        }

        self.severity()?;
        Ok(())
    }

    /// Parsed `log_level`
    pub fn severity(&self) -> ConfigResult<Severity> {
        Severity::parse(&self.log_level).ok_or_else(|| {
            ConfigError::invalid(
                "log_level",
                format!(
                    "'{}' is not one of trace, info, warn, error, fatal",
                    self.log_level
                ),
            )
        })
    }
}
