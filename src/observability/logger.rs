//! JSON-lines logger
//!
//! Each line carries `event`, `severity` and `ts` first, then the caller's
//! fields ordered by key. Lines at ERROR and above go to stderr, the rest to
//! stdout. The threshold is process-wide and set when an engine context opens.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU8, Ordering};

use chrono::{SecondsFormat, Utc};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Severity {
    Trace = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
    Fatal = 4,
}

impl Severity {
    const ALL: [Severity; 5] = [
        Severity::Trace,
        Severity::Info,
        Severity::Warn,
        Severity::Error,
        Severity::Fatal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }

    /// Parses a configured level name, ignoring case; `warning` is accepted for WARN
    pub fn parse(level: &str) -> Option<Self> {
        if level.eq_ignore_ascii_case("warning") {
            return Some(Severity::Warn);
        }
        Self::ALL.into_iter().find(|s| s.as_str().eq_ignore_ascii_case(level))
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static THRESHOLD: AtomicU8 = AtomicU8::new(Severity::Info as u8);

pub struct Logger;

impl Logger {
    pub fn set_min_severity(severity: Severity) {
        THRESHOLD.store(severity as u8, Ordering::Relaxed);
    }

    pub fn min_severity() -> Severity {
        let raw = THRESHOLD.load(Ordering::Relaxed);
        Severity::ALL
            .into_iter()
            .find(|s| *s as u8 == raw)
            .unwrap_or(Severity::Fatal)
    }

    pub fn enabled(severity: Severity) -> bool {
        severity >= Self::min_severity()
    }

    pub fn log(severity: Severity, event: &str, fields: &[(&str, &str)]) {
        if !Self::enabled(severity) {
            return;
        }
        let ts = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let line = Self::line(severity, event, &ts, fields);
        // Write failures are dropped; logging never fails a request
        let _ = if severity >= Severity::Error {
            io::stderr().lock().write_all(line.as_bytes())
        } else {
            io::stdout().lock().write_all(line.as_bytes())
        };
    }

    pub fn warn(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Warn, event, fields);
    }

    /// Renders one newline-terminated JSON object
    fn line(severity: Severity, event: &str, ts: &str, fields: &[(&str, &str)]) -> String {
        let mut line = format!(
            "{{\"event\":{},\"severity\":\"{}\",\"ts\":\"{}\"",
            quote(event),
            severity,
            ts
        );
        // Later duplicates of a key win
        let ordered: BTreeMap<&str, &str> = fields.iter().copied().collect();
        for (key, value) in ordered {
            line.push(',');
            line.push_str(&quote(key));
            line.push(':');
            line.push_str(&quote(value));
        }
        line.push_str("}\n");
        line
    }
}

fn quote(text: &str) -> String {
    Value::from(text).to_string()
}
