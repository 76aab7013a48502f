//! Relation Batching Tests
//!
//! Related documents are loaded with one `idIn` fetch per type per
//! resolution round, never one fetch per parent row.

mod common;

use common::seeded_engine;
use serde_json::json;

#[test]
fn test_one_fetch_per_related_type() {
    let (_dir, ctx) = seeded_engine();
    let before = ctx.metrics().fetches_for("Provincia");

    let response = ctx.execute(r#"{ empleados(orderBy: "name") { name provincia { nombre pais { countryCode } } } }"#);
    assert!(response.is_ok(), "{:?}", response.errors);
    assert_eq!(
        response.field("empleados"),
        &json!([
            {"name": "Ana", "provincia": {"nombre": "Lima", "pais": {"countryCode": "PE"}}},
            {"name": "Juan", "provincia": {"nombre": "Salta", "pais": {"countryCode": "AR"}}},
            {"name": "Luis", "provincia": {"nombre": "Salta", "pais": {"countryCode": "AR"}}},
            {"name": "Marta", "provincia": null}
        ])
    );

    assert_eq!(ctx.metrics().fetches_for("Provincia") - before, 1);
    assert_eq!(ctx.metrics().fetches_for("Pais"), 1);
}

#[test]
fn test_batches_span_root_fields() {
    let (_dir, ctx) = seeded_engine();
    let response = ctx.execute(
        r#"{
            a: empleado(id: "e1") { provincia { nombre } }
            b: empleado(id: "e2") { provincia { nombre } }
        }"#,
    );
    assert_eq!(response.field("a"), &json!({"provincia": {"nombre": "Salta"}}));
    assert_eq!(response.field("b"), &json!({"provincia": {"nombre": "Lima"}}));
    assert_eq!(ctx.metrics().fetches_for("Provincia"), 1);
}

#[test]
fn test_pointer_without_subselection_is_raw_id() {
    let (_dir, ctx) = seeded_engine();
    let response = ctx.execute(r#"{ empleado(id: "e2") { provincia } }"#);
    assert_eq!(response.field("empleado"), &json!({"provincia": "p2"}));
    assert_eq!(ctx.metrics().fetches_for("Provincia"), 0);
}

#[test]
fn test_inline_copy_refetches_missing_field() {
    let (_dir, ctx) = seeded_engine();
    // e1 carries an inline copy of o1 without its provincia pointer
    let response = ctx.execute(r#"{ empleado(id: "e1") { oficina { nombre provincia { nombre } } } }"#);
    assert!(response.is_ok(), "{:?}", response.errors);
    assert_eq!(
        response.field("empleado"),
        &json!({"oficina": {"nombre": "Centro", "provincia": {"nombre": "Lima"}}})
    );
    assert_eq!(ctx.metrics().fetches_for("Oficina"), 1);
}

#[test]
fn test_dangling_pointer_resolves_to_null() {
    let (_dir, ctx) = seeded_engine();
    ctx.store().delete("Provincia", "p2").unwrap();

    let response = ctx.execute(r#"{ empleado(id: "e2") { name provincia { nombre } } }"#);
    assert!(response.is_ok());
    assert_eq!(response.field("empleado"), &json!({"name": "Ana", "provincia": null}));
}

#[test]
fn test_typename_and_aliases() {
    let (_dir, ctx) = seeded_engine();
    let response = ctx.execute(r#"{ empleado(id: "e3") { __typename nombre: name provincia { t: __typename } } }"#);
    assert_eq!(
        response.field("empleado"),
        &json!({"__typename": "Empleado", "nombre": "Luis", "provincia": {"t": "Provincia"}})
    );
}

#[test]
fn test_unknown_nested_field_nulls_only_that_field() {
    let (_dir, ctx) = seeded_engine();
    let response = ctx.execute(r#"{ empleado(id: "e3") { name provincia { nombre poblacion } } }"#);
    assert_eq!(
        response.field("empleado"),
        &json!({"name": "Luis", "provincia": {"nombre": "Salta", "poblacion": null}})
    );
    assert_eq!(response.errors.len(), 1);
    assert_eq!(response.errors[0].code(), Some("UNKNOWN_FIELD"));
    assert_eq!(response.errors[0].path_string(), "empleado.provincia.poblacion");
}
