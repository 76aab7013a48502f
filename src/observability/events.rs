//! Observable events
//!
//! Events are explicit and typed; the string form is what lands in the
//! `event` key of a log line.

use std::fmt;

/// Observable events in docloom
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Engine bootstrap begins
    BootStart,
    /// Engine ready to execute requests
    BootComplete,
    /// Configuration loaded
    ConfigLoaded,
    /// Schema loaded and validated
    SchemaLoaded,

    // Store
    /// A fetch scan completed
    DocumentsFetched,
    /// A document was published to disk
    DocumentWritten,
    /// A document was removed
    DocumentDeleted,
    /// A leftover temp file from an interrupted write was removed
    TempFileSwept,

    // Execution
    /// A request finished executing
    RequestExecuted,
    /// A deferred relation batch was loaded
    BatchLoaded,
    /// A mutation was rejected before touching storage
    MutationRejected,
    /// A field failed to resolve and was nulled in the response
    FieldFailed,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::BootStart => "ENGINE_STARTUP_BEGIN",
            Event::BootComplete => "ENGINE_STARTUP_COMPLETE",
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::SchemaLoaded => "SCHEMA_LOADED",

            Event::DocumentsFetched => "STORE_FETCH",
            Event::DocumentWritten => "STORE_WRITE",
            Event::DocumentDeleted => "STORE_DELETE",
            Event::TempFileSwept => "STORE_TEMP_SWEPT",

            Event::RequestExecuted => "REQUEST_COMPLETE",
            Event::BatchLoaded => "BATCH_LOADED",
            Event::MutationRejected => "MUTATION_REJECTED",
            Event::FieldFailed => "FIELD_FAILED",
        }
    }

    /// Returns true for events that describe a failure
    pub fn is_failure(&self) -> bool {
        matches!(self, Event::MutationRejected | Event::FieldFailed)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
