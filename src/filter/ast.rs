//! Predicate tree and query specification
//!
//! A compiled filter is a tree of `And`/`Or` nodes over `Condition` leaves.
//! Condition fields are dotted paths already resolved against the schema
//! (`provincia.pais.countryCode`).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    Containing,
    StartingWith,
    EndingWith,
    In,
    NotIn,
    Between,
}

/// How many values an operator consumes from the raw value list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    One,
    Two,
    Rest,
}

impl Operator {
    /// Get the operator string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "EQ",
            Operator::Ne => "NE",
            Operator::Gt => "GT",
            Operator::Gte => "GTE",
            Operator::Lt => "LT",
            Operator::Lte => "LTE",
            Operator::Like => "LIKE",
            Operator::Containing => "CONTAINING",
            Operator::StartingWith => "STARTING_WITH",
            Operator::EndingWith => "ENDING_WITH",
            Operator::In => "IN",
            Operator::NotIn => "NOT_IN",
            Operator::Between => "BETWEEN",
        }
    }

    pub fn arity(&self) -> Arity {
        match self {
            Operator::Between => Arity::Two,
            Operator::In | Operator::NotIn => Arity::Rest,
            _ => Arity::One,
        }
    }

    /// IN and NOT_IN must close a compiled key
    pub fn is_membership(&self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Right-hand side of a condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    List(Vec<Value>),
    Single(Value),
}

impl FilterValue {
    /// Values as a slice (a single value is a one-element slice)
    pub fn as_slice(&self) -> &[Value] {
        match self {
            FilterValue::Single(v) => std::slice::from_ref(v),
            FilterValue::List(vs) => vs,
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        FilterValue::Single(Value::String(s.to_string()))
    }
}

impl From<Value> for FilterValue {
    fn from(v: Value) -> Self {
        FilterValue::Single(v)
    }
}

impl From<Vec<Value>> for FilterValue {
    fn from(vs: Vec<Value>) -> Self {
        FilterValue::List(vs)
    }
}

/// A single field comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Dotted field path
    pub field: String,
    pub operator: Operator,
    pub value: FilterValue,
}

/// Predicate tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Filter {
    Condition(Condition),
    And { children: Vec<Filter> },
    Or { children: Vec<Filter> },
}

impl Filter {
    /// Create a condition leaf
    pub fn condition(field: impl Into<String>, operator: Operator, value: impl Into<FilterValue>) -> Self {
        Filter::Condition(Condition {
            field: field.into(),
            operator,
            value: value.into(),
        })
    }

    /// Create an equality leaf
    pub fn eq(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::condition(field, Operator::Eq, value)
    }

    /// Create a membership leaf
    pub fn in_list(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::condition(field, Operator::In, FilterValue::List(values))
    }

    /// Conjunction; a single child is returned as-is
    pub fn and(mut children: Vec<Filter>) -> Self {
        if children.len() == 1 {
            children.remove(0)
        } else {
            Filter::And { children }
        }
    }

    /// Disjunction; a single child is returned as-is
    pub fn or(mut children: Vec<Filter>) -> Self {
        if children.len() == 1 {
            children.remove(0)
        } else {
            Filter::Or { children }
        }
    }

    /// Number of condition leaves in the tree
    pub fn condition_count(&self) -> usize {
        match self {
            Filter::Condition(_) => 1,
            Filter::And { children } | Filter::Or { children } => {
                children.iter().map(Filter::condition_count).sum()
            }
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// One `(field, direction)` sort rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortRule {
    pub field: String,
    pub direction: SortDirection,
}

impl SortRule {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Everything a fetch needs: filter, sort, cursor and limit.
///
/// Immutable once built; rewriting (e.g. by restriction handlers) produces a
/// new value through the `with_*` methods.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuerySpec {
    filter: Option<Filter>,
    sort: Vec<SortRule>,
    since: BTreeMap<String, Value>,
    limit: Option<usize>,
}

impl QuerySpec {
    /// A spec matching every document
    pub fn all() -> Self {
        Self::default()
    }

    /// A spec with only a filter
    pub fn filtered(filter: Filter) -> Self {
        Self::default().with_filter(Some(filter))
    }

    pub fn with_filter(mut self, filter: Option<Filter>) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_sort(mut self, sort: Vec<SortRule>) -> Self {
        self.sort = sort;
        self
    }

    /// Adds a `field > value` cursor entry
    pub fn with_since(mut self, field: impl Into<String>, value: Value) -> Self {
        self.since.insert(field.into(), value);
        self
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    pub fn sort(&self) -> &[SortRule] {
        &self.sort
    }

    pub fn since(&self) -> &BTreeMap<String, Value> {
        &self.since
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }
}
