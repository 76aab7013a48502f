//! Predicate evaluation over documents
//!
//! Resolves dotted field paths (expanding `<field>_id` pointers on the way)
//! and tests conditions against the resolved value.
//!
//! Comparison rules:
//! - numbers compare numerically, including numeric strings against numbers
//! - strings compare lexicographically
//! - a list-valued field matches when any element matches (NE and NOT_IN:
//!   when no element matches)
//! - an absent field or null satisfies only NE

use std::cmp::Ordering;
use std::collections::HashMap;

use serde_json::Value;

use super::Document;
use crate::filter::{Condition, Filter, Operator};
use crate::schema::{FieldDef, Schema, TypeDef};

/// Point lookups used to expand relation pointers
pub trait RelationLoader {
    fn load_related(&self, type_name: &str, id: &str) -> Option<Document>;
}

/// Evaluates filters for a single scan.
///
/// Related documents loaded while resolving paths are memoized for the
/// lifetime of the evaluator.
pub struct Evaluator<'a> {
    schema: &'a Schema,
    loader: &'a dyn RelationLoader,
    memo: HashMap<(String, String), Option<Document>>,
}

impl<'a> Evaluator<'a> {
    pub fn new(schema: &'a Schema, loader: &'a dyn RelationLoader) -> Self {
        Self {
            schema,
            loader,
            memo: HashMap::new(),
        }
    }

    /// Checks a document against a filter tree
    pub fn matches(&mut self, type_def: &TypeDef, doc: &mut Document, filter: &Filter) -> bool {
        match filter {
            Filter::Condition(condition) => self.matches_condition(type_def, doc, condition),
            Filter::And { children } => children.iter().all(|c| self.matches(type_def, doc, c)),
            Filter::Or { children } => children.iter().any(|c| self.matches(type_def, doc, c)),
        }
    }

    fn matches_condition(&mut self, type_def: &TypeDef, doc: &mut Document, condition: &Condition) -> bool {
        let actual = self.resolve(type_def, doc, &condition.field);
        satisfies(condition.operator, actual.as_ref(), condition.value.as_slice())
    }

    /// Resolves a dotted path, splicing loaded relations into `doc`
    pub fn resolve(&mut self, type_def: &TypeDef, doc: &mut Document, path: &str) -> Option<Value> {
        let segments: Vec<&str> = path.split('.').collect();
        self.resolve_segments(type_def, doc, &segments)
    }

    fn resolve_segments(&mut self, type_def: &TypeDef, doc: &mut Document, segments: &[&str]) -> Option<Value> {
        let (head, rest) = segments.split_first()?;
        let field = type_def.field(head);

        if rest.is_empty() {
            if let Some(v) = doc.get(*head) {
                return Some(v.clone());
            }
            return field
                .filter(|f| f.reference_target().is_some())
                .and_then(|f| doc.get(&f.pointer_key()).cloned());
        }

        let field = field?;
        let target = self.schema.get_type(field.reference_target()?)?;

        // `a.id` reads the pointer without loading the related document
        if !doc.contains_key(*head) && rest.len() == 1 && rest[0] == target.identifier_name() {
            if let Some(pointer) = doc.get(&field.pointer_key()) {
                return Some(pointer.clone());
            }
        }

        if !doc.contains_key(*head) {
            let expanded = self.expand_pointer(field, target, doc)?;
            doc.insert(head.to_string(), expanded);
        }

        match doc.get_mut(*head)? {
            Value::Object(related) => self.resolve_segments(target, related, rest),
            Value::Array(items) => {
                let mut collected = Vec::new();
                for item in items.iter_mut() {
                    if let Value::Object(related) = item {
                        match self.resolve_segments(target, related, rest) {
                            Some(Value::Array(values)) => collected.extend(values),
                            Some(value) => collected.push(value),
                            None => {}
                        }
                    }
                }
                if collected.is_empty() {
                    None
                } else {
                    Some(Value::Array(collected))
                }
            }
            _ => None,
        }
    }

    fn expand_pointer(&mut self, field: &FieldDef, target: &TypeDef, doc: &Document) -> Option<Value> {
        match doc.get(&field.pointer_key())? {
            Value::Array(ids) => {
                let loaded: Vec<Value> = ids
                    .iter()
                    .filter_map(id_text)
                    .filter_map(|id| self.load(&target.name, &id))
                    .map(Value::Object)
                    .collect();
                Some(Value::Array(loaded))
            }
            pointer => {
                let id = id_text(pointer)?;
                self.load(&target.name, &id).map(Value::Object)
            }
        }
    }

    fn load(&mut self, type_name: &str, id: &str) -> Option<Document> {
        let key = (type_name.to_string(), id.to_string());
        if let Some(cached) = self.memo.get(&key) {
            return cached.clone();
        }
        let loaded = self.loader.load_related(type_name, id);
        self.memo.insert(key, loaded.clone());
        loaded
    }
}

fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Tests one operator against a resolved value
pub(crate) fn satisfies(operator: Operator, actual: Option<&Value>, targets: &[Value]) -> bool {
    let actual = match actual {
        None | Some(Value::Null) => return operator == Operator::Ne,
        Some(v) => v,
    };

    if let Value::Array(items) = actual {
        return match operator {
            Operator::Ne | Operator::NotIn => {
                let positive = if operator == Operator::Ne { Operator::Eq } else { Operator::In };
                !items.iter().any(|item| satisfies_scalar(positive, item, targets))
            }
            Operator::Containing => targets
                .first()
                .is_some_and(|t| items.iter().any(|item| loose_eq(item, t))),
            _ => items.iter().any(|item| satisfies_scalar(operator, item, targets)),
        };
    }

    satisfies_scalar(operator, actual, targets)
}

fn satisfies_scalar(operator: Operator, actual: &Value, targets: &[Value]) -> bool {
    let first = match targets.first() {
        Some(t) => t,
        None => return false,
    };

    match operator {
        Operator::Eq => loose_eq(actual, first),
        Operator::Ne => !loose_eq(actual, first),
        Operator::Gt => compare(actual, first) == Some(Ordering::Greater),
        Operator::Gte => matches!(compare(actual, first), Some(Ordering::Greater | Ordering::Equal)),
        Operator::Lt => compare(actual, first) == Some(Ordering::Less),
        Operator::Lte => matches!(compare(actual, first), Some(Ordering::Less | Ordering::Equal)),
        Operator::Like => text_pair(actual, first).is_some_and(|(a, p)| matches_like(&a, &p)),
        Operator::Containing => text_pair(actual, first).is_some_and(|(a, p)| a.contains(&p)),
        Operator::StartingWith => text_pair(actual, first).is_some_and(|(a, p)| a.starts_with(&p)),
        Operator::EndingWith => text_pair(actual, first).is_some_and(|(a, p)| a.ends_with(&p)),
        Operator::In => targets.iter().any(|t| loose_eq(actual, t)),
        Operator::NotIn => !targets.iter().any(|t| loose_eq(actual, t)),
        Operator::Between => match targets {
            [low, high] => {
                matches!(compare(actual, low), Some(Ordering::Greater | Ordering::Equal))
                    && matches!(compare(actual, high), Some(Ordering::Less | Ordering::Equal))
            }
            _ => false,
        },
    }
}

/// Equality with numeric-string coercion
pub(crate) fn loose_eq(a: &Value, b: &Value) -> bool {
    a == b || compare(a, b) == Some(Ordering::Equal)
}

/// Orders two scalars; `None` when they are not comparable
pub(crate) fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::Number(x), Value::String(s)) => x.as_f64()?.partial_cmp(&s.trim().parse::<f64>().ok()?),
        (Value::String(s), Value::Number(y)) => s.trim().parse::<f64>().ok()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::String(s)) => s.parse::<bool>().ok().map(|y| x.cmp(&y)),
        (Value::String(s), Value::Bool(y)) => s.parse::<bool>().ok().map(|x| x.cmp(y)),
        _ => None,
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn text_pair(actual: &Value, pattern: &Value) -> Option<(String, String)> {
    Some((as_text(actual)?, as_text(pattern)?))
}

/// LIKE matching: SQL wildcards (`%` any run, `_` one char) when present,
/// otherwise substring containment. Case-insensitive either way.
fn matches_like(value: &str, pattern: &str) -> bool {
    let value = value.to_lowercase();
    let pattern = pattern.to_lowercase();

    if !pattern.contains(['%', '_']) {
        return value.contains(&pattern);
    }

    let v: Vec<char> = value.chars().collect();
    let p: Vec<char> = pattern.chars().collect();
    let (mut vi, mut pi) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while vi < v.len() {
        if pi < p.len() && (p[pi] == '_' || p[pi] == v[vi]) {
            vi += 1;
            pi += 1;
        } else if pi < p.len() && p[pi] == '%' {
            backtrack = Some((pi, vi));
            pi += 1;
        } else if let Some((star, matched)) = backtrack {
            pi = star + 1;
            vi = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }

    p[pi..].iter().all(|&c| c == '%')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterValue;
    use crate::schema::{FieldDef, ScalarKind};
    use serde_json::json;
    use std::cell::Cell;

    fn schema() -> Schema {
        Schema::new(vec![
            TypeDef::new(
                "Empleado",
                vec![
                    FieldDef::identifier("id"),
                    FieldDef::scalar("name", ScalarKind::String),
                    FieldDef::scalar("age", ScalarKind::Int),
                    FieldDef::scalar("tags", ScalarKind::String).list(),
                    FieldDef::reference("provincia", "Provincia"),
                    FieldDef::reference("oficinas", "Oficina").list(),
                ],
            ),
            TypeDef::new(
                "Provincia",
                vec![FieldDef::identifier("id"), FieldDef::scalar("nombre", ScalarKind::String)],
            ),
            TypeDef::new(
                "Oficina",
                vec![FieldDef::identifier("id"), FieldDef::scalar("ciudad", ScalarKind::String)],
            ),
        ])
    }

    struct FixtureLoader {
        calls: Cell<usize>,
    }

    impl RelationLoader for FixtureLoader {
        fn load_related(&self, type_name: &str, id: &str) -> Option<Document> {
            self.calls.set(self.calls.get() + 1);
            let doc = match (type_name, id) {
                ("Provincia", "p1") => json!({"id": "p1", "nombre": "Cordoba"}),
                ("Oficina", "o1") => json!({"id": "o1", "ciudad": "Rosario"}),
                ("Oficina", "o2") => json!({"id": "o2", "ciudad": "Salta"}),
                _ => return None,
            };
            doc.as_object().cloned()
        }
    }

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn check(filter: &Filter, document: Value) -> bool {
        let schema = schema();
        let loader = FixtureLoader { calls: Cell::new(0) };
        let mut evaluator = Evaluator::new(&schema, &loader);
        let type_def = schema.get_type("Empleado").unwrap();
        evaluator.matches(type_def, &mut doc(document), filter)
    }

    #[test]
    fn test_numeric_string_coercion() {
        let filter = Filter::condition("age", Operator::Gt, "22");
        assert!(check(&filter, json!({"age": 30})));
        assert!(!check(&filter, json!({"age": 22})));
        assert!(check(&Filter::eq("age", "30"), json!({"age": 30})));
    }

    #[test]
    fn test_like_modes() {
        assert!(check(&Filter::condition("name", Operator::Like, "JUAN"), json!({"name": "Don Juan"})));
        assert!(check(&Filter::condition("name", Operator::Like, "%son"), json!({"name": "Jackson"})));
        assert!(!check(&Filter::condition("name", Operator::Like, "%son"), json!({"name": "Sonia"})));
        assert!(check(&Filter::condition("name", Operator::Like, "j_an"), json!({"name": "Juan"})));
    }

    #[test]
    fn test_string_operators_are_case_sensitive() {
        assert!(check(&Filter::condition("name", Operator::StartingWith, "Ju"), json!({"name": "Juan"})));
        assert!(!check(&Filter::condition("name", Operator::StartingWith, "ju"), json!({"name": "Juan"})));
        assert!(check(&Filter::condition("name", Operator::EndingWith, "an"), json!({"name": "Juan"})));
        assert!(check(&Filter::condition("name", Operator::Containing, "ua"), json!({"name": "Juan"})));
    }

    #[test]
    fn test_membership_and_between() {
        let within = Filter::in_list("age", vec![json!("20"), json!("30")]);
        assert!(check(&within, json!({"age": 30})));
        assert!(!check(&within, json!({"age": 31})));

        let outside = Filter::condition("age", Operator::NotIn, vec![json!(20)]);
        assert!(check(&outside, json!({"age": 30})));

        let between = Filter::condition("age", Operator::Between, vec![json!(18), json!(30)]);
        assert!(check(&between, json!({"age": 18})));
        assert!(check(&between, json!({"age": 30})));
        assert!(!check(&between, json!({"age": 31})));
    }

    #[test]
    fn test_missing_field_only_satisfies_ne() {
        assert!(!check(&Filter::eq("name", "x"), json!({})));
        assert!(!check(&Filter::condition("name", Operator::Like, "x"), json!({})));
        assert!(check(&Filter::condition("name", Operator::Ne, "x"), json!({})));
        assert!(check(&Filter::condition("name", Operator::Ne, "x"), json!({"name": null})));
    }

    #[test]
    fn test_list_fields() {
        let doc = json!({"tags": ["rust", "go"]});
        assert!(check(&Filter::eq("tags", "go"), doc.clone()));
        assert!(check(&Filter::condition("tags", Operator::Containing, "rust"), doc.clone()));
        assert!(!check(&Filter::condition("tags", Operator::Containing, "rus"), doc.clone()));
        assert!(!check(&Filter::condition("tags", Operator::Ne, "go"), doc.clone()));
        assert!(check(&Filter::condition("tags", Operator::Ne, "java"), doc));
    }

    #[test]
    fn test_pointer_expansion_is_spliced_and_memoized() {
        let schema = schema();
        let loader = FixtureLoader { calls: Cell::new(0) };
        let mut evaluator = Evaluator::new(&schema, &loader);
        let type_def = schema.get_type("Empleado").unwrap();

        let mut first = doc(json!({"id": "e1", "provincia_id": "p1"}));
        let mut second = doc(json!({"id": "e2", "provincia_id": "p1"}));
        let filter = Filter::eq("provincia.nombre", "Cordoba");

        assert!(evaluator.matches(type_def, &mut first, &filter));
        assert!(evaluator.matches(type_def, &mut second, &filter));
        assert_eq!(loader.calls.get(), 1);
        assert_eq!(first["provincia"]["nombre"], "Cordoba");
    }

    #[test]
    fn test_pointer_identifier_skips_load() {
        let schema = schema();
        let loader = FixtureLoader { calls: Cell::new(0) };
        let mut evaluator = Evaluator::new(&schema, &loader);
        let type_def = schema.get_type("Empleado").unwrap();

        let mut d = doc(json!({"id": "e1", "provincia_id": "p1"}));
        assert_eq!(evaluator.resolve(type_def, &mut d, "provincia.id"), Some(json!("p1")));
        assert_eq!(loader.calls.get(), 0);
    }

    #[test]
    fn test_pointer_list_expansion() {
        let filter = Filter::eq("oficinas.ciudad", "Salta");
        assert!(check(&filter, json!({"id": "e1", "oficinas_id": ["o1", "o2"]})));
        assert!(!check(&filter, json!({"id": "e1", "oficinas_id": ["o1"]})));
    }

    #[test]
    fn test_inline_relation() {
        let filter = Filter::eq("provincia.nombre", "Jujuy");
        assert!(check(&filter, json!({"provincia": {"id": "p9", "nombre": "Jujuy"}})));
    }

    #[test]
    fn test_dangling_pointer_is_absent() {
        let filter = Filter::eq("provincia.nombre", "Cordoba");
        assert!(!check(&filter, json!({"provincia_id": "missing"})));
    }

    #[test]
    fn test_or_and_trees() {
        let filter = Filter::or(vec![
            Filter::condition("name", Operator::Like, "juan"),
            Filter::condition("age", Operator::Gt, "22"),
        ]);
        assert!(check(&filter, json!({"name": "Pedro", "age": 40})));
        assert!(check(&filter, json!({"name": "Juana", "age": 10})));
        assert!(!check(&filter, json!({"name": "Pedro", "age": 10})));
    }

    #[test]
    fn test_between_needs_two_values() {
        assert!(!satisfies(Operator::Between, Some(&json!(5)), FilterValue::from(json!(5)).as_slice()));
    }
}
