//! Result ordering for fetches
//!
//! Multi-key stable sort over pre-resolved sort keys. The first rule that
//! orders two documents decides; full ties keep scan order.

use std::cmp::Ordering;

use serde_json::Value;

use super::Document;
use crate::filter::{SortDirection, SortRule};

/// A document paired with its resolved sort keys (one per rule)
pub(crate) struct Keyed {
    pub keys: Vec<Option<Value>>,
    pub doc: Document,
}

/// Sorts documents whose keys were resolved in rule order
pub struct ResultSorter;

impl ResultSorter {
    pub(crate) fn sort(rows: &mut [Keyed], rules: &[SortRule]) {
        if rules.is_empty() {
            return;
        }

        rows.sort_by(|a, b| {
            for (i, rule) in rules.iter().enumerate() {
                let ordering = Self::compare_values(
                    a.keys.get(i).and_then(Option::as_ref),
                    b.keys.get(i).and_then(Option::as_ref),
                );
                let ordering = match rule.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }

    /// Compares two JSON values for sorting.
    ///
    /// Ordering rules:
    /// - absent < null < bool < number < string < array < object
    /// - same types compare naturally; arrays and objects tie
    pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
        match (a, b) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a_val), Some(b_val)) => {
                let type_order = |v: &Value| -> u8 {
                    match v {
                        Value::Null => 0,
                        Value::Bool(_) => 1,
                        Value::Number(_) => 2,
                        Value::String(_) => 3,
                        Value::Array(_) => 4,
                        Value::Object(_) => 5,
                    }
                };

                let a_type = type_order(a_val);
                let b_type = type_order(b_val);
                if a_type != b_type {
                    return a_type.cmp(&b_type);
                }

                match (a_val, b_val) {
                    (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
                    (Value::Number(x), Value::Number(y)) => {
                        let x = x.as_f64().unwrap_or(0.0);
                        let y = y.as_f64().unwrap_or(0.0);
                        x.partial_cmp(&y).unwrap_or(Ordering::Equal)
                    }
                    (Value::String(x), Value::String(y)) => x.cmp(y),
                    _ => Ordering::Equal,
                }
            }
        }
    }
}
