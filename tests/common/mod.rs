//! Shared fixtures for docloom integration tests
//!
//! Schema: Pais <- Provincia <- Oficina, and Empleado pointing at a
//! Provincia (pointer) and an Oficina (inline copy).

#![allow(dead_code)]

use docloom::schema::{Schema, SchemaLoader};
use docloom::{Document, EngineConfig, EngineContext};
use serde_json::{json, Value};
use std::path::Path;
use tempfile::TempDir;

pub const SCHEMA: &str = r#"{
    "types": [
        {"name": "Pais", "plural": "paises", "fields": [
            {"name": "id", "type": "ID", "identifier": true},
            {"name": "nombre", "type": "String"},
            {"name": "countryCode", "type": "String"}
        ]},
        {"name": "Provincia", "fields": [
            {"name": "id", "type": "ID", "identifier": true},
            {"name": "nombre", "type": "String", "nullable": false},
            {"name": "pais", "type": "Pais"}
        ]},
        {"name": "Oficina", "fields": [
            {"name": "id", "type": "ID", "identifier": true},
            {"name": "nombre", "type": "String"},
            {"name": "provincia", "type": "Provincia"}
        ]},
        {"name": "Empleado", "fields": [
            {"name": "id", "type": "ID", "identifier": true},
            {"name": "name", "type": "String", "nullable": false},
            {"name": "age", "type": "Int"},
            {"name": "activo", "type": "Boolean"},
            {"name": "cargo", "type": "String"},
            {"name": "estado", "type": "Estado", "values": ["ACTIVO", "BAJA"]},
            {"name": "tags", "type": "String", "list": true},
            {"name": "provincia", "type": "Provincia"},
            {"name": "oficina", "type": "Oficina", "inline": true}
        ], "mutations": {
            "operations": [
                "promote: assign = [cargo], set = {activo: true}",
                "archive: context = delete"
            ]
        }}
    ]
}"#;

pub fn create_temp_data_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}

pub fn schema() -> Schema {
    SchemaLoader::from_json(SCHEMA).expect("fixture schema must load")
}

pub fn doc(value: Value) -> Document {
    value.as_object().cloned().expect("fixture document must be an object")
}

pub fn open_engine(data_dir: &Path) -> EngineContext {
    let config = EngineConfig::new(data_dir).with_namespace("default");
    EngineContext::open_with_schema(config, schema()).expect("engine must open")
}

/// Writes the fixture documents straight to the store, in stored form
pub fn seed(ctx: &EngineContext) {
    let store = ctx.store();
    let rows = [
        ("Pais", json!({"id": "ar", "nombre": "Argentina", "countryCode": "AR"})),
        ("Pais", json!({"id": "pe", "nombre": "Peru", "countryCode": "PE"})),
        ("Provincia", json!({"id": "p1", "nombre": "Salta", "pais_id": "ar"})),
        ("Provincia", json!({"id": "p2", "nombre": "Lima", "pais_id": "pe"})),
        ("Oficina", json!({"id": "o1", "nombre": "Centro", "provincia_id": "p2"})),
        (
            "Empleado",
            json!({"id": "e1", "name": "Juan", "age": 22, "estado": "ACTIVO", "provincia_id": "p1",
                   "oficina": {"id": "o1", "nombre": "Centro"}}),
        ),
        ("Empleado", json!({"id": "e2", "name": "Ana", "age": 40, "estado": "ACTIVO", "provincia_id": "p2"})),
        ("Empleado", json!({"id": "e3", "name": "Luis", "age": 31, "estado": "BAJA", "provincia_id": "p1"})),
        ("Empleado", json!({"id": "e4", "name": "Marta", "age": 22, "estado": "ACTIVO"})),
    ];
    for (type_name, value) in rows {
        let d = doc(value);
        let id = d["id"].as_str().expect("fixture id").to_string();
        store.create(type_name, &id, &d).expect("seed write");
    }
}

/// A seeded engine over a fresh temp dir
pub fn seeded_engine() -> (TempDir, EngineContext) {
    let dir = create_temp_data_dir();
    let ctx = open_engine(dir.path());
    seed(&ctx);
    (dir, ctx)
}

/// Names of a list field in response order
pub fn names(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item["name"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
