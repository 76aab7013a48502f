//! Store Integrity Tests
//!
//! - Documents round-trip through one pretty-printed JSON file each
//! - Readers never observe a staged, unpublished write
//! - Concurrent writers of one id never publish a torn document
//! - Delete is idempotent
//! - Ids cannot escape the type directory

mod common;

use common::{create_temp_data_dir, doc, schema};
use docloom::filter::{Filter, Operator, QuerySpec, SortRule};
use docloom::observability::MetricsRegistry;
use docloom::store::{DocumentStore, StoreError, TEMP_SUFFIX};
use serde_json::json;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

fn open_store(data_dir: &Path) -> DocumentStore {
    DocumentStore::open(data_dir, "default", Arc::new(schema()), Arc::new(MetricsRegistry::new()))
        .expect("store must open")
}

// =============================================================================
// Round trip
// =============================================================================

#[test]
fn test_document_is_one_pretty_json_file() {
    let temp_dir = create_temp_data_dir();
    let store = open_store(temp_dir.path());
    let d = doc(json!({"id": "e1", "name": "Juan", "tags": ["a", "b"]}));
    store.create("Empleado", "e1", &d).unwrap();

    let path = temp_dir.path().join("default").join("Empleado").join("e1");
    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains('\n'), "file should be pretty-printed");
    assert_eq!(serde_json::from_str::<serde_json::Value>(&content).unwrap(), json!(d));

    assert_eq!(store.load("Empleado", "e1").unwrap(), Some(d));
}

#[test]
fn test_create_twice_fails() {
    let temp_dir = create_temp_data_dir();
    let store = open_store(temp_dir.path());
    store.create("Empleado", "e1", &doc(json!({"id": "e1"}))).unwrap();

    let err = store.create("Empleado", "e1", &doc(json!({"id": "e1"}))).unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists { .. }));
}

#[test]
fn test_delete_is_idempotent() {
    let temp_dir = create_temp_data_dir();
    let store = open_store(temp_dir.path());
    store.create("Empleado", "e1", &doc(json!({"id": "e1"}))).unwrap();

    assert!(store.delete("Empleado", "e1").unwrap());
    assert!(!store.delete("Empleado", "e1").unwrap());
    assert!(!store.delete("Oficina", "never-written").unwrap());
}

#[test]
fn test_ids_cannot_escape_type_directory() {
    let temp_dir = create_temp_data_dir();
    let store = open_store(temp_dir.path());
    for id in ["../e1", "a/b", "..", "", "e1.tmp"] {
        let err = store.create("Empleado", id, &doc(json!({"id": id}))).unwrap_err();
        assert!(matches!(err, StoreError::InvalidId { .. }), "{:?} should be rejected", id);
    }
}

#[test]
fn test_missing_type_directory_fetches_empty() {
    let temp_dir = create_temp_data_dir();
    let store = open_store(temp_dir.path());
    assert!(store.fetch("Pais", &QuerySpec::all()).unwrap().is_empty());
}

#[test]
fn test_malformed_file_is_reported() {
    let temp_dir = create_temp_data_dir();
    let store = open_store(temp_dir.path());
    store.create("Empleado", "e1", &doc(json!({"id": "e1"}))).unwrap();
    fs::write(temp_dir.path().join("default").join("Empleado").join("e1"), "{ not json").unwrap();

    let err = store.fetch("Empleado", &QuerySpec::all()).unwrap_err();
    assert!(matches!(err, StoreError::Decode { .. }));
}

// =============================================================================
// Atomic publish
// =============================================================================

#[test]
fn test_staged_write_is_invisible_until_published() {
    let temp_dir = create_temp_data_dir();
    let store = open_store(temp_dir.path());
    store.create("Empleado", "e1", &doc(json!({"id": "e1", "age": 22}))).unwrap();

    let staged = store
        .stage("Empleado", "e1", &doc(json!({"id": "e1", "age": 23})))
        .unwrap();
    let temp_path = staged.temp_path().to_path_buf();
    assert!(temp_path.to_string_lossy().ends_with(TEMP_SUFFIX));

    let all = store.fetch("Empleado", &QuerySpec::all()).unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0]["age"], 22);

    staged.publish().unwrap();
    assert_eq!(store.load("Empleado", "e1").unwrap().unwrap()["age"], 23);
    assert!(!temp_path.exists());
}

#[test]
fn test_concurrent_writers_of_one_id_never_tear() {
    let temp_dir = create_temp_data_dir();
    let store = open_store(temp_dir.path());
    store.create("Empleado", "e1", &doc(json!({"id": "e1", "writer": "seed", "payload": ""}))).unwrap();

    const WRITES: usize = 60;
    let done = AtomicBool::new(false);

    thread::scope(|scope| {
        let writers: Vec<_> = ["a", "b"]
            .into_iter()
            .map(|writer| {
                let store = &store;
                scope.spawn(move || {
                    let payload = writer.repeat(64 * 1024);
                    for round in 0..WRITES {
                        let d = doc(json!({"id": "e1", "writer": writer, "round": round, "payload": payload}));
                        store.modify("Empleado", "e1", &d).unwrap();
                    }
                })
            })
            .collect();

        let reader = scope.spawn(|| {
            let mut reads = 0;
            while !done.load(Ordering::Relaxed) {
                let d = store.load("Empleado", "e1").unwrap().expect("e1 stays published");
                let writer = d["writer"].as_str().unwrap().to_string();
                let payload = d["payload"].as_str().unwrap();
                if writer != "seed" {
                    assert_eq!(payload.len(), 64 * 1024);
                    assert!(payload.chars().all(|c| c.to_string() == writer));
                }
                reads += 1;
            }
            reads
        });

        for writer in writers {
            writer.join().unwrap();
        }
        done.store(true, Ordering::Relaxed);
        assert!(reader.join().unwrap() > 0);
    });

    let last = store.load("Empleado", "e1").unwrap().unwrap();
    assert_eq!(last["round"], WRITES - 1);
    let leftovers: Vec<_> = fs::read_dir(store.type_dir("Empleado"))
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.to_string_lossy().ends_with(TEMP_SUFFIX))
        .collect();
    assert!(leftovers.is_empty(), "{:?}", leftovers);
}

// =============================================================================
// Fetch semantics
// =============================================================================

#[test]
fn test_filter_sort_since_limit_order() {
    let temp_dir = create_temp_data_dir();
    let store = open_store(temp_dir.path());
    for (id, age) in [("a", 30), ("b", 20), ("c", 30), ("d", 10), ("e", 40)] {
        store.create("Empleado", id, &doc(json!({"id": id, "age": age}))).unwrap();
    }

    let spec = QuerySpec::filtered(Filter::condition("age", Operator::Gte, json!(20)))
        .with_sort(vec![SortRule::desc("age")])
        .with_since("age", json!(20))
        .with_limit(Some(2));
    let ids: Vec<_> = store
        .fetch("Empleado", &spec)
        .unwrap()
        .into_iter()
        .map(|d| d["id"].clone())
        .collect();
    assert_eq!(ids, vec![json!("e"), json!("a")]);
}

#[test]
fn test_equal_sort_keys_keep_file_order() {
    let temp_dir = create_temp_data_dir();
    let store = open_store(temp_dir.path());
    for id in ["m", "b", "x", "a"] {
        store.create("Empleado", id, &doc(json!({"id": id, "age": 1}))).unwrap();
    }

    let spec = QuerySpec::all().with_sort(vec![SortRule::asc("age")]);
    let ids: Vec<_> = store
        .fetch("Empleado", &spec)
        .unwrap()
        .into_iter()
        .map(|d| d["id"].clone())
        .collect();
    assert_eq!(ids, vec![json!("a"), json!("b"), json!("m"), json!("x")]);
}

#[test]
fn test_namespaces_are_isolated() {
    let temp_dir = create_temp_data_dir();
    let metrics = Arc::new(MetricsRegistry::new());
    let schema = Arc::new(schema());
    let one = DocumentStore::open(temp_dir.path(), "one", Arc::clone(&schema), Arc::clone(&metrics)).unwrap();
    let two = DocumentStore::open(temp_dir.path(), "two", schema, metrics).unwrap();

    one.create("Pais", "ar", &doc(json!({"id": "ar"}))).unwrap();
    assert_eq!(one.fetch("Pais", &QuerySpec::all()).unwrap().len(), 1);
    assert!(two.fetch("Pais", &QuerySpec::all()).unwrap().is_empty());
}
