//! Extra-operation descriptor parsing
//!
//! ```text
//! promote: assign = [cargo, salario], set = { activo: true, nivel: 2 }, context = "modify"
//! ```
//!
//! The name runs up to the first `:`; the rest is a comma-separated list of
//! `key = value` fragments where a value may be a bracketed list, a braced
//! map, a quoted string, or a bare word.

use std::ops::RangeInclusive;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Number, Value};

use super::errors::{MutationError, MutationResult};

/// A parsed, not yet schema-checked descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct OperationDescriptor {
    pub name: String,
    pub assign: Vec<String>,
    pub set: Map<String, Value>,
    pub context: Option<String>,
}

fn fragment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // key = [..] | {..} | "..." | '...' | bare
        Regex::new(r#"(\w+)\s*=\s*(\[[^\]]*\]|\{[^}]*\}|"[^"]*"|'[^']*'|[^,\s][^,]*)"#)
            .unwrap_or_else(|e| unreachable!("static pattern failed to compile: {e}"))
    })
}

/// Parses one descriptor string
pub fn parse_descriptor(text: &str) -> MutationResult<OperationDescriptor> {
    let (name, body) = match text.split_once(':') {
        Some((name, body)) => (name.trim(), body),
        None => (text.trim(), ""),
    };

    if name.is_empty() {
        return Err(MutationError::MissingName {
            descriptor: text.to_string(),
        });
    }
    if !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(MutationError::malformed(text, format!("invalid operation name '{}'", name)));
    }

    let mut descriptor = OperationDescriptor {
        name: name.to_string(),
        assign: Vec::new(),
        set: Map::new(),
        context: None,
    };

    let mut covered = 0;
    for captures in fragment_pattern().captures_iter(body) {
        let span = captures.get(0).map_or(covered..covered, |m| m.range());
        let commas = if covered == 0 { 0..=0 } else { 1..=1 };
        check_separator(text, &body[covered..span.start], commas)?;
        covered = span.end;

        let key = &captures[1];
        let raw = captures[2].trim();

        match key {
            "assign" => descriptor.assign = parse_list(text, raw)?,
            "set" => descriptor.set = parse_map(text, raw)?,
            "context" => descriptor.context = Some(unquote(raw).to_string()),
            other => {
                return Err(MutationError::malformed(text, format!("unknown key '{}'", other)));
            }
        }
    }

    check_separator(text, &body[covered..], 0..=1)?;

    Ok(descriptor)
}

/// Text around fragments may only be whitespace and the allowed number of commas
fn check_separator(descriptor: &str, gap: &str, commas: RangeInclusive<usize>) -> MutationResult<()> {
    let stray = gap.trim_matches(|c: char| c == ',' || c.is_whitespace());
    if !stray.is_empty() {
        return Err(MutationError::malformed(
            descriptor,
            format!("expected `key = value`, found '{}'", stray),
        ));
    }
    if !commas.contains(&gap.matches(',').count()) {
        return Err(MutationError::malformed(descriptor, "fragments must be separated by one comma"));
    }
    Ok(())
}

fn parse_list(descriptor: &str, raw: &str) -> MutationResult<Vec<String>> {
    let inner = raw
        .strip_prefix('[')
        .and_then(|r| r.strip_suffix(']'))
        .ok_or_else(|| MutationError::malformed(descriptor, "assign expects a [list]"))?;

    Ok(inner
        .split(',')
        .map(|item| unquote(item.trim()).to_string())
        .filter(|item| !item.is_empty())
        .collect())
}

fn parse_map(descriptor: &str, raw: &str) -> MutationResult<Map<String, Value>> {
    let inner = raw
        .strip_prefix('{')
        .and_then(|r| r.strip_suffix('}'))
        .ok_or_else(|| MutationError::malformed(descriptor, "set expects a {map}"))?;

    let mut map = Map::new();
    for entry in inner.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (key, value) = entry
            .split_once(':')
            .ok_or_else(|| MutationError::malformed(descriptor, format!("set entry '{}' has no ':'", entry)))?;
        let key = unquote(key.trim());
        if key.is_empty() {
            return Err(MutationError::malformed(descriptor, "set entry has an empty key"));
        }
        map.insert(key.to_string(), coerce(value.trim()));
    }
    Ok(map)
}

/// `true`/`false` → bool, numeric → number, otherwise an unquoted string
pub fn coerce(raw: &str) -> Value {
    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Some(n) = raw.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(n);
    }
    Value::String(unquote(raw).to_string())
}

fn unquote(s: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = s.strip_prefix(quote).and_then(|r| r.strip_suffix(quote)) {
            return inner;
        }
    }
    s
}
