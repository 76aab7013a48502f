//! Request-scoped relation batching
//!
//! Field resolution that needs another document does not fetch on the
//! spot. It records a [`Deferred`] slot instead. Once a resolution round
//! has walked the whole result shape, every id still unknown is loaded with
//! one `idIn` fetch per type, memoized, and the slots are filled from the
//! memo. Filling a slot may record new slots one level deeper; those form
//! the next round. Ids already memoized are never fetched again.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde_json::Value;

use super::document::Selection;
use super::response::PathSegment;
use crate::store::Document;

/// Ids a slot waits on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdRef {
    One(String),
    Many(Vec<String>),
}

impl IdRef {
    /// Reads a pointer value (`"p1"`, `7`, or a list of those)
    pub fn from_pointer(value: &Value) -> Option<Self> {
        match value {
            Value::Array(items) => Some(IdRef::Many(items.iter().filter_map(id_text).collect())),
            other => id_text(other).map(IdRef::One),
        }
    }

    pub fn ids(&self) -> &[String] {
        match self {
            IdRef::One(id) => std::slice::from_ref(id),
            IdRef::Many(ids) => ids,
        }
    }
}

/// Textual form of an identifier value
pub fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// What filling a slot means
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredMode {
    /// Project the related document(s) with the selection's sub-selections
    Relation,
    /// Resolve the selection itself on the freshly loaded parent
    ParentField,
}

/// A response slot waiting on stored documents
#[derive(Debug, Clone)]
pub struct Deferred {
    /// Where the value lands in `data`
    pub path: Vec<PathSegment>,
    /// Type of the documents to load
    pub type_name: String,
    pub ids: IdRef,
    pub selection: Selection,
    pub mode: DeferredMode,
}

/// Pending slots and the per-type memo of loaded documents
#[derive(Debug, Default)]
pub struct PendingBatch {
    pending: Vec<Deferred>,
    memo: HashMap<String, HashMap<String, Option<Document>>>,
}

impl PendingBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn defer(&mut self, deferred: Deferred) {
        self.pending.push(deferred);
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Takes the current round's slots
    pub fn take(&mut self) -> Vec<Deferred> {
        std::mem::take(&mut self.pending)
    }

    /// Per type, the ids of `round` not memoized yet
    pub fn missing(&self, round: &[Deferred]) -> BTreeMap<String, BTreeSet<String>> {
        let mut missing: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for deferred in round {
            for id in deferred.ids.ids() {
                if !self.is_memoized(&deferred.type_name, id) {
                    missing
                        .entry(deferred.type_name.clone())
                        .or_default()
                        .insert(id.clone());
                }
            }
        }
        missing
    }

    /// Records a load outcome; `None` marks an id that does not resolve
    pub fn remember(&mut self, type_name: &str, id: &str, doc: Option<Document>) {
        self.memo
            .entry(type_name.to_string())
            .or_default()
            .insert(id.to_string(), doc);
    }

    pub fn is_memoized(&self, type_name: &str, id: &str) -> bool {
        self.memo.get(type_name).is_some_and(|docs| docs.contains_key(id))
    }

    /// The memoized document, if it resolved
    pub fn lookup(&self, type_name: &str, id: &str) -> Option<&Document> {
        self.memo.get(type_name)?.get(id)?.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn slot(type_name: &str, ids: IdRef) -> Deferred {
        Deferred {
            path: vec![PathSegment::Key("empleados".into())],
            type_name: type_name.to_string(),
            ids,
            selection: Selection {
                alias: None,
                name: "provincia".into(),
                arguments: Map::new(),
                selections: Vec::new(),
            },
            mode: DeferredMode::Relation,
        }
    }

    #[test]
    fn test_missing_groups_and_dedups() {
        let batch = PendingBatch::new();
        let round = vec![
            slot("Provincia", IdRef::One("p1".into())),
            slot("Provincia", IdRef::One("p1".into())),
            slot("Provincia", IdRef::Many(vec!["p2".into(), "p1".into()])),
            slot("Oficina", IdRef::One("o1".into())),
        ];
        let missing = batch.missing(&round);
        assert_eq!(missing.len(), 2);
        assert_eq!(missing["Provincia"].iter().collect::<Vec<_>>(), vec!["p1", "p2"]);
    }

    #[test]
    fn test_memoized_ids_are_not_missing() {
        let mut batch = PendingBatch::new();
        batch.remember("Provincia", "p1", json!({"id": "p1"}).as_object().cloned());
        batch.remember("Provincia", "gone", None);

        let round = vec![slot("Provincia", IdRef::Many(vec!["p1".into(), "gone".into(), "p3".into()]))];
        let missing = batch.missing(&round);
        assert_eq!(missing["Provincia"].iter().collect::<Vec<_>>(), vec!["p3"]);

        assert!(batch.lookup("Provincia", "p1").is_some());
        assert!(batch.lookup("Provincia", "gone").is_none());
        assert!(batch.is_memoized("Provincia", "gone"));
    }

    #[test]
    fn test_take_drains_round() {
        let mut batch = PendingBatch::new();
        batch.defer(slot("Provincia", IdRef::One("p1".into())));
        assert!(batch.has_pending());
        assert_eq!(batch.take().len(), 1);
        assert!(!batch.has_pending());
    }

    #[test]
    fn test_pointer_forms() {
        assert_eq!(IdRef::from_pointer(&json!("p1")), Some(IdRef::One("p1".into())));
        assert_eq!(IdRef::from_pointer(&json!(7)), Some(IdRef::One("7".into())));
        assert_eq!(
            IdRef::from_pointer(&json!(["a", 2])),
            Some(IdRef::Many(vec!["a".into(), "2".into()]))
        );
        assert_eq!(IdRef::from_pointer(&json!(null)), None);
    }
}
