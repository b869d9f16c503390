// parlor-core/tests/path_resolver.rs
// ============================================================================
// Module: Path Resolver Tests
// Description: Dotted-path reads and writes over the state graph.
// Purpose: Validate record/collection dispatch and creation semantics.
// Dependencies: parlor-core, serde_json
// ============================================================================

//! ## Overview
//! Exercises `path_get`/`path_set` across instances, keyed collections, and
//! ordered collections, including intermediate-record creation on writes.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_docs_in_private_items,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use parlor_core::ClassTable;
use parlor_core::PathError;
use parlor_core::SchemaSpec;
use parlor_core::StateValue;
use parlor_core::path_get;
use parlor_core::path_set;
use serde_json::json;

fn quiz_like_root() -> StateValue {
    let schema: SchemaSpec = serde_json::from_value(json!({
        "root": "GameState",
        "classes": {
            "GameState": {
                "players": {"map": "Player"},
                "title": {"type": "string"}
            },
            "Player": {
                "name": {"type": "string"},
                "score": {"type": "number"}
            }
        }
    }))
    .unwrap();
    let table = ClassTable::build(&schema).unwrap();
    StateValue::Instance(table.instantiate_with_defaults().unwrap())
}

#[test]
fn set_descends_keyed_collections_creating_records() {
    let mut root = quiz_like_root();
    path_set(&mut root, "players.a.score", StateValue::Number(3.0)).unwrap();
    let read = path_get(&root, "players.a.score").unwrap();
    assert_eq!(read.to_json(), json!(3.0));
}

#[test]
fn set_writes_declared_instance_fields() {
    let mut root = quiz_like_root();
    path_set(&mut root, "title", StateValue::String("quiz night".to_string())).unwrap();
    assert_eq!(path_get(&root, "title").unwrap().to_json(), json!("quiz night"));
}

#[test]
fn set_rejects_undeclared_instance_fields() {
    let mut root = quiz_like_root();
    let err = path_set(&mut root, "missing", StateValue::Number(1.0)).unwrap_err();
    assert!(matches!(err, PathError::UndeclaredField { .. }));
}

#[test]
fn set_with_empty_path_is_a_no_op() {
    let mut root = quiz_like_root();
    let before = root.to_json();
    path_set(&mut root, "", StateValue::Number(9.0)).unwrap();
    path_set(&mut root, "...", StateValue::Number(9.0)).unwrap();
    assert_eq!(root.to_json(), before);
}

#[test]
fn empty_segments_are_ignored() {
    let mut root = quiz_like_root();
    path_set(&mut root, ".players..b.score.", StateValue::Number(5.0)).unwrap();
    assert_eq!(path_get(&root, "players.b.score").unwrap().to_json(), json!(5.0));
}

#[test]
fn get_misses_return_none() {
    let root = quiz_like_root();
    assert!(path_get(&root, "players.ghost.score").is_none());
    assert!(path_get(&root, "title.anything").is_none());
}

#[test]
fn get_with_empty_path_returns_root() {
    let root = quiz_like_root();
    assert!(path_get(&root, "").is_some());
}

#[test]
fn set_through_scalar_fails() {
    let mut root = quiz_like_root();
    path_set(&mut root, "players.a.score", StateValue::Number(1.0)).unwrap();
    let err = path_set(&mut root, "players.a.score.deep", StateValue::Number(2.0)).unwrap_err();
    assert!(matches!(err, PathError::NotAContainer { .. }));
}

#[test]
fn array_segments_index_numerically() {
    let mut root = StateValue::Array(vec![StateValue::Number(1.0)]);
    path_set(&mut root, "0", StateValue::Number(7.0)).unwrap();
    path_set(&mut root, "1", StateValue::Number(8.0)).unwrap();
    assert_eq!(path_get(&root, "1").unwrap().to_json(), json!(8.0));

    let err = path_set(&mut root, "9", StateValue::Number(9.0)).unwrap_err();
    assert!(matches!(err, PathError::IndexOutOfRange { .. }));
}

#[test]
fn unset_instance_field_becomes_record_on_descent() {
    let schema: SchemaSpec = serde_json::from_value(json!({
        "root": "Holder",
        "classes": {
            "Holder": {"nested": {"ref": "Holder"}}
        }
    }))
    .unwrap();
    let table = ClassTable::build(&schema).unwrap();
    let mut root = StateValue::Instance(table.instantiate_with_defaults().unwrap());
    path_set(&mut root, "nested.deep", StateValue::Bool(true)).unwrap();
    assert_eq!(path_get(&root, "nested.deep").unwrap().to_json(), json!(true));
}
