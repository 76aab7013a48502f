//! Observability subsystem
//!
//! - Structured logging (JSON lines)
//! - Counter metrics
//! - Typed events
//!
//! Observability is read-only: nothing here changes execution results, and
//! a failed log write is dropped silently.
//!
//! ```ignore
//! use docloom::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::DocumentWritten, &[("type", "Empleado"), ("id", "e1")]);
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};

/// Log a typed event with fields
///
/// Failure events go out at WARN, routine store traffic at TRACE, and
/// lifecycle events at INFO.
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_failure() {
        Severity::Warn
    } else {
        match event {
            Event::DocumentsFetched | Event::BatchLoaded => Severity::Trace,
            _ => Severity::Info,
        }
    };
    Logger::log(severity, event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event() {
        // Verifies no panic
        log_event_with_fields(Event::BootStart, &[]);
        log_event_with_fields(Event::DocumentWritten, &[("id", "e1")]);
    }
}
