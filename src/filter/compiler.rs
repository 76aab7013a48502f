//! Filter-key compiler
//!
//! Compiles identifier-style filter keys into predicate trees:
//!
//! ```text
//! nameLikeOrAgeGreaterThan = "juan,22"
//!   → Or(Condition(name, LIKE, "juan"), Condition(age, GT, "22"))
//! ```
//!
//! Per key: tokenize at uppercase letters, peel `Or`/`And` separators, find
//! each segment's operator as the longest vocabulary run ending the segment
//! (EQ when none), resolve the field through the schema, then hand out the
//! comma-split values left to right. `And` binds tighter than `Or`; separate
//! keys are joined with `And`.

use serde_json::{Map, Value};

use crate::schema::{Schema, TypeDef};

use super::ast::{Arity, Filter, FilterValue, Operator, QuerySpec, SortDirection, SortRule};
use super::errors::{FilterError, FilterResult};
use super::resolver::resolve_path;
use super::tokenizer::{connector, operator, split_camel, Connector};

/// Argument names with a fixed meaning; everything else is a filter key
pub const ID_ARGUMENT: &str = "id";
pub const ORDER_BY_ARGUMENT: &str = "orderBy";
pub const SINCE_ARGUMENT: &str = "since";
pub const LIMIT_ARGUMENT: &str = "limit";

/// Default cap on `limit`
pub const DEFAULT_MAX_LIMIT: usize = 1000;

/// One parsed `field operator` run of a key
#[derive(Debug, Clone, PartialEq)]
struct Segment {
    /// How this segment joins the previous one (ignored for the first)
    connector: Connector,
    field: String,
    operator: Operator,
}

/// Compiles filter keys against a schema
#[derive(Debug, Clone, Copy)]
pub struct FilterCompiler<'s> {
    schema: &'s Schema,
    max_limit: usize,
}

impl<'s> FilterCompiler<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Self {
            schema,
            max_limit: DEFAULT_MAX_LIMIT,
        }
    }

    /// Caps requested limits at `max_limit`
    pub fn with_max_limit(mut self, max_limit: usize) -> Self {
        self.max_limit = max_limit;
        self
    }

    /// Compiles a map of filter keys into one filter (`And` over keys).
    ///
    /// Returns `None` for an empty map.
    pub fn compile(&self, type_name: &str, filters: &Map<String, Value>) -> FilterResult<Option<Filter>> {
        let type_def = self.type_def(type_name)?;

        let mut children = Vec::with_capacity(filters.len());
        for (key, raw) in filters {
            children.push(self.compile_key_for(type_def, key, raw)?);
        }

        if children.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Filter::and(children)))
        }
    }

    /// Compiles a single filter key with its raw value
    pub fn compile_key(&self, type_name: &str, key: &str, raw: &Value) -> FilterResult<Filter> {
        let type_def = self.type_def(type_name)?;
        self.compile_key_for(type_def, key, raw)
    }

    /// Builds a full query spec from resolver arguments.
    ///
    /// `id` becomes `<identifier>Equals`; `orderBy`, `since` and `limit` are
    /// read as sort, cursor and limit; the rest are filter keys.
    pub fn compile_query(&self, type_name: &str, args: &Map<String, Value>) -> FilterResult<QuerySpec> {
        let type_def = self.type_def(type_name)?;

        let mut filters = Map::new();
        let mut spec = QuerySpec::all();

        for (name, raw) in args {
            match name.as_str() {
                ID_ARGUMENT => {
                    let key = format!("{}Equals", type_def.identifier_name());
                    filters.insert(key, raw.clone());
                }
                ORDER_BY_ARGUMENT => {
                    spec = spec.with_sort(self.parse_order_by(type_def, raw)?);
                }
                SINCE_ARGUMENT => {
                    let cursor = raw.as_object().ok_or_else(|| {
                        FilterError::invalid_argument(SINCE_ARGUMENT, "expected an object of field: value")
                    })?;
                    for (field, value) in cursor {
                        let path = self.resolve_field(type_def, SINCE_ARGUMENT, field)?;
                        spec = spec.with_since(path, value.clone());
                    }
                }
                LIMIT_ARGUMENT => {
                    spec = spec.with_limit(self.parse_limit(raw)?);
                }
                _ => {
                    filters.insert(name.clone(), raw.clone());
                }
            }
        }

        let filter = self.compile(type_name, &filters)?;
        Ok(spec.with_filter(filter))
    }

    fn type_def(&self, type_name: &str) -> FilterResult<&'s TypeDef> {
        self.schema
            .get_type(type_name)
            .ok_or_else(|| FilterError::UnknownType(type_name.to_string()))
    }

    fn compile_key_for(&self, type_def: &TypeDef, key: &str, raw: &Value) -> FilterResult<Filter> {
        let segments = parse_segments(key)?;

        // IN / NOT_IN swallow the remaining values, so only the last segment may use them
        if let Some(pos) = segments.iter().position(|s| s.operator.is_membership()) {
            if pos + 1 != segments.len() {
                return Err(FilterError::MembershipNotLast {
                    key: key.to_string(),
                    operator: segments[pos].operator.to_string(),
                });
            }
        }

        let values = split_values(raw);
        let assigned = assign_values(key, &segments, &values)?;

        let mut groups: Vec<Vec<Filter>> = vec![Vec::new()];
        for (segment, value) in segments.iter().zip(assigned) {
            let path = self.resolve_field(type_def, key, &segment.field)?;
            let condition = Filter::condition(path, segment.operator, value);

            if segment.connector == Connector::Or && !groups.last().map_or(true, Vec::is_empty) {
                groups.push(Vec::new());
            }
            if let Some(group) = groups.last_mut() {
                group.push(condition);
            }
        }

        Ok(Filter::or(groups.into_iter().map(Filter::and).collect()))
    }

    fn resolve_field(&self, type_def: &TypeDef, key: &str, field: &str) -> FilterResult<String> {
        resolve_path(self.schema, type_def, field).map_err(|unresolved| FilterError::UnknownField {
            key: key.to_string(),
            field: unresolved,
        })
    }

    /// `orderBy: "name,-age"`, `"age desc"`, or a list of such items
    fn parse_order_by(&self, type_def: &TypeDef, raw: &Value) -> FilterResult<Vec<SortRule>> {
        let items: Vec<String> = match raw {
            Value::String(s) => s.split(',').map(|p| p.trim().to_string()).collect(),
            Value::Array(items) => items
                .iter()
                .map(|v| {
                    v.as_str().map(|s| s.trim().to_string()).ok_or_else(|| {
                        FilterError::invalid_argument(ORDER_BY_ARGUMENT, "expected a list of field names")
                    })
                })
                .collect::<FilterResult<_>>()?,
            _ => {
                return Err(FilterError::invalid_argument(
                    ORDER_BY_ARGUMENT,
                    "expected a field list",
                ))
            }
        };

        let mut rules = Vec::new();
        for item in items.iter().filter(|s| !s.is_empty()) {
            let (field, direction) = parse_sort_item(item);
            let path = self.resolve_field(type_def, ORDER_BY_ARGUMENT, field)?;
            rules.push(SortRule { field: path, direction });
        }
        Ok(rules)
    }

    fn parse_limit(&self, raw: &Value) -> FilterResult<Option<usize>> {
        let limit = match raw {
            Value::Null => return Ok(None),
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        }
        .ok_or_else(|| FilterError::invalid_argument(LIMIT_ARGUMENT, "expected a non-negative integer"))?;

        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(Some(limit.min(self.max_limit)))
    }
}

fn parse_sort_item(item: &str) -> (&str, SortDirection) {
    if let Some(field) = item.strip_prefix('-') {
        return (field.trim(), SortDirection::Desc);
    }
    if let Some((field, dir)) = item.rsplit_once(char::is_whitespace) {
        match dir.to_ascii_lowercase().as_str() {
            "desc" => return (field.trim(), SortDirection::Desc),
            "asc" => return (field.trim(), SortDirection::Asc),
            _ => {}
        }
    }
    (item, SortDirection::Asc)
}

/// Splits a key into `field operator` segments joined by connectors
fn parse_segments(key: &str) -> FilterResult<Vec<Segment>> {
    let tokens = split_camel(key);
    if tokens.is_empty() {
        return Err(FilterError::malformed(key, "empty filter key"));
    }

    let mut segments = Vec::new();
    let mut field: Vec<&str> = Vec::new();
    let mut pending = Connector::And;
    let mut dangling = false;
    let mut i = 0;

    while i < tokens.len() {
        let token = tokens[i];

        if let Some(c) = connector(token) {
            if !field.is_empty() {
                // A separator right after a bare field closes it with EQ
                segments.push(close(&mut field, pending, Operator::Eq));
            }
            pending = c;
            dangling = true;
            i += 1;
            continue;
        }

        if !field.is_empty() {
            let end = tokens[i..]
                .iter()
                .position(|t| connector(t).is_some())
                .map_or(tokens.len(), |p| i + p);
            if let Some(op) = operator(&tokens[i..end]) {
                segments.push(close(&mut field, pending, op));
                dangling = false;
                i = end;
                continue;
            }
        }

        field.push(token);
        dangling = false;
        i += 1;
    }

    if !field.is_empty() {
        segments.push(close(&mut field, pending, Operator::Eq));
    } else if dangling {
        return Err(FilterError::malformed(key, "key ends with a separator"));
    }

    if segments.is_empty() {
        return Err(FilterError::malformed(key, "no field in filter key"));
    }

    Ok(segments)
}

fn close(field: &mut Vec<&str>, connector: Connector, operator: Operator) -> Segment {
    let name = field.concat();
    field.clear();
    Segment {
        connector,
        field: name,
        operator,
    }
}

/// Strings split on commas; arrays are taken as-is; other scalars are one value
fn split_values(raw: &Value) -> Vec<Value> {
    match raw {
        Value::String(s) => s
            .split(',')
            .map(|part| Value::String(part.trim().to_string()))
            .collect(),
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}

/// Hands values to segments left to right, repeating the last value when
/// segments outnumber values. Leftover values are an error.
fn assign_values(key: &str, segments: &[Segment], values: &[Value]) -> FilterResult<Vec<FilterValue>> {
    let last = values
        .last()
        .ok_or_else(|| FilterError::malformed(key, "no value supplied"))?;

    let take = |cursor: usize| values.get(cursor).unwrap_or(last).clone();

    let mut cursor = 0;
    let mut assigned = Vec::with_capacity(segments.len());
    let mut expected = 0;

    for segment in segments {
        match segment.operator.arity() {
            Arity::One => {
                assigned.push(FilterValue::Single(take(cursor)));
                cursor += 1;
                expected += 1;
            }
            Arity::Two => {
                assigned.push(FilterValue::List(vec![take(cursor), take(cursor + 1)]));
                cursor += 2;
                expected += 2;
            }
            Arity::Rest => {
                let rest = if cursor < values.len() {
                    values[cursor..].to_vec()
                } else {
                    vec![last.clone()]
                };
                expected += rest.len();
                cursor = values.len().max(cursor + 1);
                assigned.push(FilterValue::List(rest));
            }
        }
    }

    if cursor < values.len() {
        return Err(FilterError::ValueCount {
            key: key.to_string(),
            expected,
            got: values.len(),
        });
    }

    Ok(assigned)
}
