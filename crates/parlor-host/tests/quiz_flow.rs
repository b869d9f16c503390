// parlor-host/tests/quiz_flow.rs
// ============================================================================
// Module: Quiz Flow Tests
// Description: End-to-end scenarios over the enhanced-quiz definition.
// Purpose: Drive a full room through per-player quiz rounds.
// Dependencies: parlor-config, parlor-core, parlor-host, serde_json
// ============================================================================

//! ## Overview
//! Drives one room bound to the enhanced-quiz definition through the full
//! player flow: start, scoring on correct answers, scheduled advancement,
//! wrong answers, completion, and per-player isolation.

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
use parlor_host::payload;
use serde_json::Value;
use serde_json::json;

/// The enhanced-quiz definition used across scenarios.
const QUIZ_DEFINITION: &str = include_str!("data/enhanced_quiz.json");

fn quiz_room() -> Room {
    let definition = serde_json::from_str(QUIZ_DEFINITION).unwrap();
    Room::bind(definition, None, RoomDeps::default()).unwrap()
}

fn read(room: &Room, path: &str) -> Value {
    room.state_at(path).unwrap_or(Value::Null)
}

fn number(room: &Room, path: &str) -> f64 {
    read(room, path).as_f64().unwrap_or(f64::NAN)
}

/// Scenario 1: the per-player quiz flow starts.
#[test]
fn start_enters_the_first_question() {
    let mut room = quiz_room();
    let session = SessionId::new("A");
    room.handle_join(&session, Some("Ada"));
    room.handle_message(&session, "start", &payload(&[]));

    assert_eq!(read(&room, "players.A.phase"), json!("question"));
    assert_eq!(number(&room, "players.A.questionIndex"), 0.0);
    assert_eq!(
        read(&room, "players.A.currentQuestion.text"),
        json!("What is the capital of France?")
    );
    assert_eq!(number(&room, "players.A.timeLeft"), 30.0);
    assert_eq!(read(&room, "players.A.showFeedback"), json!(false));
}

/// Scenario 2: a correct answer scores and enters feedback.
#[test]
fn correct_answer_scores_and_shows_feedback() {
    let mut room = quiz_room();
    let session = SessionId::new("A");
    room.handle_join(&session, Some("Ada"));
    room.handle_message(&session, "start", &payload(&[]));
    assert_eq!(read(&room, "players.A.currentQuestion.correctAnswer"), json!("2"));

    room.handle_message(&session, "answer", &payload(&[("value", json!("2"))]));

    assert_eq!(read(&room, "players.A.phase"), json!("feedback"));
    assert_eq!(read(&room, "players.A.showFeedback"), json!(true));
    assert_eq!(number(&room, "players.A.score"), 1.0);
}

/// Scenario 3: the scheduled advance moves to the next question.
#[test]
fn scheduled_advance_loads_the_next_question() {
    let mut room = quiz_room();
    let session = SessionId::new("A");
    room.handle_join(&session, Some("Ada"));
    room.handle_message(&session, "start", &payload(&[]));
    room.handle_message(&session, "answer", &payload(&[("value", json!("2"))]));

    room.advance_clock(LogicalTime::from_millis(3000));

    assert_eq!(number(&room, "players.A.questionIndex"), 1.0);
    assert_eq!(read(&room, "players.A.phase"), json!("question"));
    assert_eq!(read(&room, "players.A.showFeedback"), json!(false));
    assert_eq!(read(&room, "players.A.currentQuestion.text"), json!("The Earth is flat."));
    assert_eq!(number(&room, "players.A.timeLeft"), 30.0);
}

/// Scenario 4: a wrong answer enters feedback without scoring.
#[test]
fn wrong_answer_does_not_score() {
    let mut room = quiz_room();
    let session = SessionId::new("A");
    room.handle_join(&session, Some("Ada"));
    room.handle_message(&session, "start", &payload(&[]));
    room.handle_message(&session, "answer", &payload(&[("value", json!("2"))]));
    room.advance_clock(LogicalTime::from_millis(3000));
    assert_eq!(read(&room, "players.A.currentQuestion.correctAnswer"), json!("false"));

    room.handle_message(&session, "answer", &payload(&[("value", json!("true"))]));

    assert_eq!(read(&room, "players.A.phase"), json!("feedback"));
    assert_eq!(read(&room, "players.A.showFeedback"), json!(true));
    assert_eq!(number(&room, "players.A.score"), 1.0);
}

/// Scenario 5: answering every question finishes the quiz.
#[test]
fn quiz_completes_after_the_last_question() {
    let mut room = quiz_room();
    let session = SessionId::new("A");
    room.handle_join(&session, Some("Ada"));
    room.handle_message(&session, "start", &payload(&[]));

    let mut at = 0u64;
    for answer in ["2", "false", "1", "1"] {
        room.handle_message(&session, "answer", &payload(&[("value", json!(answer))]));
        at += 3000;
        room.advance_clock(LogicalTime::from_millis(at));
    }

    assert_eq!(read(&room, "players.A.phase"), json!("finished"));
    assert_eq!(read(&room, "players.A.showFeedback"), json!(false));
    assert_eq!(number(&room, "players.A.score"), 4.0);
}

/// Scenario 6: one player's activity never leaks into another's state.
#[test]
fn players_are_isolated() {
    let mut room = quiz_room();
    let a = SessionId::new("A");
    let b = SessionId::new("B");
    room.handle_join(&a, Some("Ada"));
    room.handle_join(&b, Some("Brin"));

    let outside_before = outside_players(&room.state_snapshot());

    room.handle_message(&a, "start", &payload(&[]));
    room.handle_message(&a, "answer", &payload(&[("value", json!("2"))]));

    assert_eq!(number(&room, "players.A.score"), 1.0);
    assert_eq!(read(&room, "players.A.phase"), json!("feedback"));
    assert_eq!(read(&room, "players.B.phase"), json!("waiting"));
    assert_eq!(number(&room, "players.B.score"), 0.0);

    // No fields of the root state outside `players` were mutated.
    assert_eq!(outside_players(&room.state_snapshot()), outside_before);
}

/// Root-state snapshot with the `players` collection removed.
fn outside_players(snapshot: &Value) -> Value {
    let mut snapshot = snapshot.clone();
    if let Some(map) = snapshot.as_object_mut() {
        map.remove("players");
    }
    snapshot
}

/// Answering during feedback neither scores nor reschedules.
#[test]
fn answers_during_feedback_are_inert() {
    let mut room = quiz_room();
    let session = SessionId::new("A");
    room.handle_join(&session, Some("Ada"));
    room.handle_message(&session, "start", &payload(&[]));
    room.handle_message(&session, "answer", &payload(&[("value", json!("2"))]));
    let pending = room.pending_scheduled();

    room.handle_message(&session, "answer", &payload(&[("value", json!("2"))]));

    assert_eq!(number(&room, "players.A.score"), 1.0);
    assert_eq!(room.pending_scheduled(), pending);
}

/// Disposal cancels the pending advance.
#[test]
fn dispose_cancels_pending_batches() {
    let mut room = quiz_room();
    let session = SessionId::new("A");
    room.handle_join(&session, Some("Ada"));
    room.handle_message(&session, "start", &payload(&[]));
    room.handle_message(&session, "answer", &payload(&[("value", json!("2"))]));
    assert!(room.pending_scheduled() > 0);

    room.dispose();
    assert_eq!(room.pending_scheduled(), 0);

    room.advance_clock(LogicalTime::from_millis(60_000));
    assert_eq!(read(&room, "players.A.phase"), json!("feedback"));
}
