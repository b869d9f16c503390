// parlor-host/tests/room_lifecycle.rs
// ============================================================================
// Module: Room Lifecycle Tests
// Description: Binding, roster management, message filtering, disposal.
// Purpose: Validate the host surface around the interpreter.
// Dependencies: parlor-config, parlor-core, parlor-host, serde_json
// ============================================================================

//! ## Overview
//! Exercises the room host surface: definition binding and hashing, event
//! registration, payload filtering, idempotent joins, the built-in player
//! fallback, and disposal semantics.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_docs_in_private_items,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use parlor_core::LogicalTime;
use parlor_core::SessionId;
use parlor_host::Room;
use parlor_host::RoomDeps;
use parlor_host::RoomError;
use parlor_host::payload;
use serde_json::Value;
use serde_json::json;

const QUIZ_DEFINITION: &str = include_str!("data/enhanced_quiz.json");

fn quiz_room() -> Room {
    let definition = serde_json::from_str(QUIZ_DEFINITION).unwrap();
    Room::bind(definition, None, RoomDeps::default()).unwrap()
}

#[test]
fn binding_records_a_stable_definition_hash() {
    let first = quiz_room();
    let second = quiz_room();
    assert_eq!(first.definition_hash(), second.definition_hash());
    assert!(!first.definition_hash().value.is_empty());
}

#[test]
fn registered_events_are_the_union_of_on_keys() {
    let room = quiz_room();
    let names: Vec<&str> =
        room.registered_events().iter().map(parlor_core::EventName::as_str).collect();
    assert_eq!(names, vec!["answer", "start"]);
}

#[test]
fn acceptable_events_track_the_current_state() {
    let room = quiz_room();
    let mut names: Vec<String> =
        room.acceptable_events().iter().map(ToString::to_string).collect();
    names.sort();
    assert_eq!(names, vec!["answer".to_string(), "start".to_string()]);
}

#[test]
fn unregistered_event_types_are_dropped() {
    let mut room = quiz_room();
    let session = SessionId::new("A");
    room.handle_join(&session, None);
    let before = room.state_snapshot();

    room.handle_message(&session, "cheat", &payload(&[("value", json!("2"))]));
    assert_eq!(room.state_snapshot(), before);
}

#[test]
fn non_record_payloads_are_dropped() {
    let mut room = quiz_room();
    let session = SessionId::new("A");
    room.handle_join(&session, None);
    let before = room.state_snapshot();

    room.handle_message(&session, "start", &json!("not-a-record"));
    room.handle_message(&session, "start", &json!(42));
    assert_eq!(room.state_snapshot(), before);
}

#[test]
fn joins_create_player_entries_with_defaults() {
    let mut room = quiz_room();
    let session = SessionId::new("A");
    room.handle_join(&session, Some("Ada"));

    assert_eq!(room.state_at("players.A.name"), Some(json!("Ada")));
    assert_eq!(room.state_at("players.A.phase"), Some(json!("waiting")));
    assert_eq!(room.state_at("players.A.score").and_then(|v| v.as_f64()), Some(0.0));
    assert_eq!(room.sessions(), vec![session]);
}

#[test]
fn rejoining_preserves_the_existing_entry() {
    let mut room = quiz_room();
    let session = SessionId::new("A");
    room.handle_join(&session, Some("Ada"));
    room.handle_message(&session, "start", &payload(&[]));
    assert_eq!(room.state_at("players.A.phase"), Some(json!("question")));

    room.handle_join(&session, Some("Imposter"));
    assert_eq!(room.state_at("players.A.name"), Some(json!("Ada")));
    assert_eq!(room.state_at("players.A.phase"), Some(json!("question")));
}

#[test]
fn leaves_remove_the_roster_entry() {
    let mut room = quiz_room();
    let a = SessionId::new("A");
    let b = SessionId::new("B");
    room.handle_join(&a, None);
    room.handle_join(&b, None);
    room.handle_leave(&a);

    assert_eq!(room.sessions(), vec![b]);
    assert_eq!(room.state_at("players.A"), None);
}

#[test]
fn rooms_without_a_player_class_use_the_builtin_shape() {
    let definition = json!({
        "id": "minimal",
        "name": "Minimal",
        "version": "0.1.0",
        "schema": {
            "root": "GameState",
            "classes": {
                "GameState": {"players": {"map": "Member"}},
                "Member": {"name": {"type": "string"}}
            }
        },
        "machine": {
            "id": "minimal",
            "initial": "idle",
            "states": {"idle": {}}
        }
    });
    let mut room = Room::bind(serde_json::from_value(definition).unwrap(), None, RoomDeps::default())
        .unwrap();
    let session = SessionId::new("s1");
    room.handle_join(&session, Some("guest"));

    assert_eq!(room.state_at("players.s1.name"), Some(json!("guest")));
    assert_eq!(room.state_at("players.s1.score").and_then(|v| v.as_f64()), Some(0.0));
}

#[test]
fn invalid_definitions_fail_room_creation() {
    let definition = json!({
        "id": "broken",
        "name": "Broken",
        "version": "0.1.0",
        "schema": {
            "root": "GameState",
            "classes": {"GameState": {}}
        },
        "machine": {
            "id": "broken",
            "initial": "idle",
            "states": {
                "idle": {"on": {"go": {"target": "nowhere"}}}
            }
        }
    });
    let err = Room::bind(serde_json::from_value(definition).unwrap(), None, RoomDeps::default())
        .unwrap_err();
    assert!(matches!(err, RoomError::Definition(_)));
}

#[test]
fn config_is_surfaced_under_context() {
    let definition = json!({
        "id": "configured",
        "name": "Configured",
        "version": "0.1.0",
        "schema": {
            "root": "GameState",
            "classes": {"GameState": {"motto": {"type": "string"}}}
        },
        "machine": {
            "id": "configured",
            "initial": "idle",
            "states": {
                "idle": {
                    "entry": [{"type": "setState", "path": "motto", "value": "${context.config.motto}"}]
                }
            }
        }
    });
    let room = Room::bind(
        serde_json::from_value(definition).unwrap(),
        Some(json!({"motto": "be kind"})),
        RoomDeps::default(),
    )
    .unwrap();
    assert_eq!(room.state_at("motto"), Some(json!("be kind")));
}

#[test]
fn disposed_rooms_drop_all_inputs() {
    let mut room = quiz_room();
    let session = SessionId::new("A");
    room.handle_join(&session, None);
    room.dispose();
    assert!(room.is_disposed());

    let before = room.state_snapshot();
    room.handle_message(&session, "start", &payload(&[]));
    room.handle_join(&SessionId::new("B"), None);
    room.handle_leave(&session);
    room.advance_clock(LogicalTime::from_millis(5000));
    assert_eq!(room.state_snapshot(), before);
}

#[test]
fn the_root_state_is_never_replaced() {
    let mut room = quiz_room();
    let session = SessionId::new("A");
    room.handle_join(&session, None);
    room.handle_message(&session, "start", &payload(&[]));

    let snapshot = room.state_snapshot();
    let Value::Object(fields) = snapshot else {
        panic!("root state must remain a record");
    };
    assert!(fields.contains_key("players"));
}
