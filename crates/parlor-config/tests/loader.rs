// parlor-config/tests/loader.rs
// ============================================================================
// Module: Definition Loader Tests
// Description: Resolution order and fail-closed limits.
// Purpose: Validate inline, file, and rejection paths of the loader.
// Dependencies: parlor-config, parlor-core, serde_json, tempfile
// ============================================================================

//! ## Overview
//! Exercises the loader through temporary directories: inline definitions
//! win, identifiers resolve to files, and oversized, malformed, or
//! traversal-shaped inputs are rejected with descriptive reasons.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_docs_in_private_items,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::fs;

use parlor_config::DefinitionLoader;
use parlor_config::LoaderError;
use parlor_config::RoomOptions;
use serde_json::Value;
use serde_json::json;

fn minimal_definition() -> Value {
    json!({
        "id": "mini",
        "name": "Mini",
        "version": "0.1.0",
        "schema": {
            "root": "GameState",
            "classes": {"GameState": {"players": {"map": "Player"}},
                         "Player": {"name": {"type": "string"}}}
        },
        "machine": {
            "id": "mini",
            "initial": "idle",
            "states": {"idle": {}}
        }
    })
}

#[test]
fn inline_definitions_take_precedence() {
    let dir = tempfile::tempdir().unwrap();
    let loader = DefinitionLoader::new(dir.path());
    let options = RoomOptions {
        definition: Some(minimal_definition()),
        definition_id: Some("on-disk".into()),
        ..RoomOptions::default()
    };
    let definition = loader.resolve(&options).unwrap();
    assert_eq!(definition.id.as_str(), "mini");
}

#[test]
fn definition_ids_resolve_under_the_directory() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("mini.json"),
        serde_json::to_string(&minimal_definition()).unwrap(),
    )
    .unwrap();
    let loader = DefinitionLoader::new(dir.path());
    let definition = loader.resolve(&RoomOptions::with_definition_id("mini")).unwrap();
    assert_eq!(definition.name, "Mini");
}

#[test]
fn missing_definitions_fail_with_io_errors() {
    let dir = tempfile::tempdir().unwrap();
    let loader = DefinitionLoader::new(dir.path());
    let err = loader.resolve(&RoomOptions::with_definition_id("ghost")).unwrap_err();
    assert!(matches!(err, LoaderError::Io(_)));
}

#[test]
fn traversal_shaped_identifiers_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let loader = DefinitionLoader::new(dir.path());
    let err = loader.resolve(&RoomOptions::with_definition_id("../escape")).unwrap_err();
    assert!(matches!(err, LoaderError::Rejected(_)));
}

#[test]
fn oversized_files_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("big.json"), vec![b' '; 2 * 1024 * 1024]).unwrap();
    let loader = DefinitionLoader::new(dir.path());
    let err = loader.resolve(&RoomOptions::with_definition_id("big")).unwrap_err();
    assert!(matches!(err, LoaderError::Rejected(_)));
}

#[test]
fn malformed_json_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("bad.json"), "{not json").unwrap();
    let loader = DefinitionLoader::new(dir.path());
    let err = loader.resolve(&RoomOptions::with_definition_id("bad")).unwrap_err();
    assert!(matches!(err, LoaderError::Parse(_)));
}

#[test]
fn invalid_definitions_fail_validation() {
    let mut definition = minimal_definition();
    definition["machine"]["initial"] = json!("nowhere");
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("invalid.json"),
        serde_json::to_string(&definition).unwrap(),
    )
    .unwrap();
    let loader = DefinitionLoader::new(dir.path());
    let err = loader.resolve(&RoomOptions::with_definition_id("invalid")).unwrap_err();
    assert!(matches!(err, LoaderError::Invalid(_)));
}

#[test]
fn inline_definitions_are_validated_too() {
    let mut definition = minimal_definition();
    definition["schema"]["root"] = json!("Nowhere");
    let err = DefinitionLoader::from_inline(definition).unwrap_err();
    assert!(matches!(err, LoaderError::Invalid(_)));
}
