//! Mutation Tests
//!
//! Create, modify, delete and annotated operations through the engine.
//! A rejected mutation must leave the store untouched.

mod common;

use common::seeded_engine;
use docloom::store::TEMP_SUFFIX;
use docloom::QuerySpec;
use serde_json::json;

fn empleado_count(ctx: &docloom::EngineContext) -> usize {
    ctx.store().fetch("Empleado", &QuerySpec::all()).unwrap().len()
}

// =============================================================================
// Create
// =============================================================================

#[test]
fn test_create_coerces_and_stores_pointer() {
    let (_dir, ctx) = seeded_engine();
    let response = ctx.execute(
        r#"mutation {
            empleadoCreate(input: {name: "Pedro", age: "35", tags: ["a", 7], provincia: "p2"}) {
                id name age tags provincia { nombre }
            }
        }"#,
    );
    assert!(response.is_ok(), "{:?}", response.errors);

    let created = response.field("empleadoCreate");
    assert_eq!(created["name"], "Pedro");
    assert_eq!(created["age"], 35);
    assert_eq!(created["tags"], json!(["a", "7"]));
    assert_eq!(created["provincia"], json!({"nombre": "Lima"}));

    let id = created["id"].as_str().unwrap();
    let stored = ctx.store().load("Empleado", id).unwrap().unwrap();
    assert_eq!(stored["provincia_id"], "p2");
    assert!(stored.get("provincia").is_none());
}

#[test]
fn test_create_with_explicit_id_and_inline_reference() {
    let (_dir, ctx) = seeded_engine();
    let response = ctx.execute(r#"mutation { empleadoCreate(id: "e9", name: "Rosa", oficina: "o1") { id } }"#);
    assert_eq!(response.field("empleadoCreate"), &json!({"id": "e9"}));

    let stored = ctx.store().load("Empleado", "e9").unwrap().unwrap();
    assert_eq!(
        stored["oficina"],
        json!({"id": "o1", "nombre": "Centro", "provincia_id": "p2"})
    );
}

#[test]
fn test_create_existing_id_fails() {
    let (_dir, ctx) = seeded_engine();
    let response = ctx.execute(r#"mutation { empleadoCreate(id: "e1", name: "Otro") { id } }"#);
    assert!(response.field("empleadoCreate").is_null());
    assert_eq!(response.errors[0].code(), Some("STORAGE_ERROR"));
    assert_eq!(ctx.store().load("Empleado", "e1").unwrap().unwrap()["name"], "Juan");
}

#[test]
fn test_missing_required_field_is_rejected() {
    let (dir, ctx) = seeded_engine();
    let response = ctx.execute(r#"mutation { empleadoCreate(input: {age: 30}) { id } }"#);

    assert!(response.field("empleadoCreate").is_null());
    assert_eq!(response.errors[0].code(), Some("CONSTRAINT_VIOLATION"));
    assert_eq!(response.errors[0].extensions["constraints"][0]["field"], "name");
    assert_eq!(empleado_count(&ctx), 4);
    assert_eq!(ctx.metrics().snapshot().mutations_rejected, 1);

    let leftovers = std::fs::read_dir(dir.path().join("default").join("Empleado"))
        .unwrap()
        .filter(|e| e.as_ref().unwrap().file_name().to_string_lossy().ends_with(TEMP_SUFFIX))
        .count();
    assert_eq!(leftovers, 0);
}

#[test]
fn test_unknown_reference_is_rejected() {
    let (_dir, ctx) = seeded_engine();
    let response = ctx.execute(r#"mutation { empleadoCreate(input: {name: "X", provincia: "p404"}) { id } }"#);
    assert_eq!(response.errors[0].code(), Some("REFERENCE_ERROR"));
    assert!(response.errors[0].message.contains("p404"));
    assert_eq!(empleado_count(&ctx), 4);
}

#[test]
fn test_enum_value_is_validated() {
    let (_dir, ctx) = seeded_engine();
    let response = ctx.execute(r#"mutation { empleadoCreate(input: {name: "X", estado: JUBILADO}) { id } }"#);
    assert_eq!(response.errors[0].code(), Some("CONSTRAINT_VIOLATION"));

    let response = ctx.execute(r#"mutation { empleadoCreate(input: {name: "X", estado: BAJA}) { estado } }"#);
    assert_eq!(response.field("empleadoCreate"), &json!({"estado": "BAJA"}));
}

// =============================================================================
// Modify
// =============================================================================

#[test]
fn test_modify_merges_over_stored_document() {
    let (_dir, ctx) = seeded_engine();
    let response = ctx.execute(r#"mutation { empleadoUpdate(input: {id: "e2", age: 41}) { name age provincia { nombre } } }"#);
    assert!(response.is_ok(), "{:?}", response.errors);
    assert_eq!(
        response.field("empleadoUpdate"),
        &json!({"name": "Ana", "age": 41, "provincia": {"nombre": "Lima"}})
    );
}

#[test]
fn test_modify_can_clear_reference() {
    let (_dir, ctx) = seeded_engine();
    ctx.execute(r#"mutation { empleadoUpdate(id: "e2", provincia: null) { id } }"#);
    let stored = ctx.store().load("Empleado", "e2").unwrap().unwrap();
    assert!(stored.get("provincia_id").is_none());
}

#[test]
fn test_modify_missing_document() {
    let (_dir, ctx) = seeded_engine();
    let response = ctx.execute(r#"mutation { empleadoUpdate(input: {id: "e404", age: 1}) { id } }"#);
    assert_eq!(response.errors[0].code(), Some("NOT_FOUND"));
}

#[test]
fn test_modify_without_identifier() {
    let (_dir, ctx) = seeded_engine();
    let response = ctx.execute(r#"mutation { empleadoUpdate(input: {age: 1}) { id } }"#);
    assert_eq!(response.errors[0].code(), Some("CONSTRAINT_VIOLATION"));
}

#[test]
fn test_sequential_modifies_last_write_wins() {
    let (_dir, ctx) = seeded_engine();
    // No version check: concurrent modifies of one document race and the
    // last rename wins. Sequential requests show the same outcome.
    ctx.execute(r#"mutation { empleadoUpdate(id: "e1", age: 23) { id } }"#);
    ctx.execute(r#"mutation { empleadoUpdate(id: "e1", age: 24) { id } }"#);
    assert_eq!(ctx.store().load("Empleado", "e1").unwrap().unwrap()["age"], 24);
}

// =============================================================================
// Annotated operations
// =============================================================================

#[test]
fn test_annotated_operation_applies_set_values() {
    let (_dir, ctx) = seeded_engine();
    let response = ctx.execute(r#"mutation { empleadoPromote(id: "e3", cargo: "jefe") { name cargo activo } }"#);
    assert!(response.is_ok(), "{:?}", response.errors);
    assert_eq!(
        response.field("empleadoPromote"),
        &json!({"name": "Luis", "cargo": "jefe", "activo": true})
    );
}

#[test]
fn test_operation_rejects_fields_it_does_not_assign() {
    let (_dir, ctx) = seeded_engine();
    let response = ctx.execute(r#"mutation { empleadoPromote(id: "e3", name: "Otro") { id } }"#);
    assert_eq!(response.errors[0].code(), Some("CONSTRAINT_VIOLATION"));

    // cargo belongs to promote, so the implicit update may not touch it
    let response = ctx.execute(r#"mutation { empleadoUpdate(id: "e3", cargo: "jefe") { id } }"#);
    assert_eq!(response.errors[0].code(), Some("CONSTRAINT_VIOLATION"));
    assert!(ctx.store().load("Empleado", "e3").unwrap().unwrap().get("cargo").is_none());
}

// =============================================================================
// Delete
// =============================================================================

#[test]
fn test_delete_then_not_found() {
    let (_dir, ctx) = seeded_engine();
    let response = ctx.execute(r#"mutation { empleadoDelete(id: "e4") }"#);
    assert_eq!(response.field("empleadoDelete"), &json!(true));
    assert!(ctx.store().load("Empleado", "e4").unwrap().is_none());

    let response = ctx.execute(r#"mutation { empleadoDelete(id: "e4") }"#);
    assert_eq!(response.errors[0].code(), Some("NOT_FOUND"));
}

// =============================================================================
// Serial execution
// =============================================================================

#[test]
fn test_mutation_fields_run_in_order() {
    let (_dir, ctx) = seeded_engine();
    let response = ctx.execute(
        r#"mutation {
            a: provinciaCreate(id: "p9", nombre: "Jujuy", pais: "ar") { id }
            b: empleadoCreate(input: {name: "Eva", provincia: "p9"}) { provincia { nombre pais { nombre } } }
            c: provinciaDelete(id: "p404")
        }"#,
    );
    assert_eq!(response.field("a"), &json!({"id": "p9"}));
    assert_eq!(
        response.field("b"),
        &json!({"provincia": {"nombre": "Jujuy", "pais": {"nombre": "Argentina"}}})
    );
    assert!(response.field("c").is_null());
    assert_eq!(response.errors.len(), 1);
    assert_eq!(response.errors[0].path_string(), "c");
}

#[test]
fn test_unknown_mutation_field() {
    let (_dir, ctx) = seeded_engine();
    let response = ctx.execute(r#"mutation { empleadoFire(id: "e1") }"#);
    assert_eq!(response.errors[0].code(), Some("UNKNOWN_FIELD"));
}
