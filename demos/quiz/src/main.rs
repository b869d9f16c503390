// demos/quiz/src/main.rs
// ============================================================================
// Module: Quiz Demo
// Description: Drives the enhanced-quiz definition through a scripted room.
// Purpose: Show the data-driven room host end to end without a transport.
// Dependencies: parlor-core, parlor-host, serde_json
// ============================================================================

//! ## Overview
//! Binds the bundled quiz definition to a room, joins two players, and
//! plays one of them through the full quiz while printing replicated-state
//! snapshots. The transport is faked with direct calls; a real deployment
//! forwards client messages and drives the clock the same way.

#![allow(
    clippy::print_stdout,
    clippy::expect_used,
    reason = "Demo binary reports progress on stdout and aborts on setup errors."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use parlor_core::LogicalTime;
use parlor_core::MemoryBroadcaster;
use parlor_core::SessionId;
use parlor_host::Room;
use parlor_host::RoomDeps;
use parlor_host::StderrAuditSink;
use parlor_host::payload;
use serde_json::json;

/// Bundled enhanced-quiz definition.
const DEFINITION: &str = include_str!("../definition.json");

/// Plays a scripted quiz round and prints state snapshots.
fn main() {
    let definition = serde_json::from_str(DEFINITION).expect("bundled definition parses");
    let broadcaster = Arc::new(MemoryBroadcaster::new());
    let deps = RoomDeps {
        broadcaster: Box::new(SharedBroadcaster(Arc::clone(&broadcaster))),
        audit: Box::new(StderrAuditSink),
    };
    let mut room = Room::bind(definition, None, deps).expect("definition binds");

    let ada = SessionId::new("ada");
    let brin = SessionId::new("brin");
    room.handle_join(&ada, Some("Ada"));
    room.handle_join(&brin, Some("Brin"));

    println!("== room created ({}) ==", room.definition_hash().value);

    room.handle_message(&ada, "start", &payload(&[]));
    println!(
        "ada starts: {}",
        room.state_at("players.ada.currentQuestion.text").unwrap_or_default()
    );

    let mut clock = 0u64;
    for answer in ["2", "false", "1", "0"] {
        room.handle_message(&ada, "answer", &payload(&[("value", json!(answer))]));
        clock += 3_000;
        room.advance_clock(LogicalTime::from_millis(clock));
        println!(
            "after answering {answer:>5}: phase={} score={}",
            room.state_at("players.ada.phase").unwrap_or_default(),
            room.state_at("players.ada.score").unwrap_or_default()
        );
    }

    println!("== final snapshot ==");
    println!("{}", serde_json::to_string_pretty(&room.state_snapshot()).unwrap_or_default());
    for (event, data) in broadcaster.take() {
        println!("broadcast {event}: {data}");
    }
    room.dispose();
}

// ============================================================================
// SECTION: Broadcast Plumbing
// ============================================================================

/// Clonable handle over the demo's recording broadcaster.
struct SharedBroadcaster(Arc<MemoryBroadcaster>);

impl parlor_core::Broadcaster for SharedBroadcaster {
    fn broadcast(
        &self,
        event: &str,
        data: &serde_json::Value,
    ) -> Result<(), parlor_core::BroadcastError> {
        self.0.broadcast(event, data)
    }
}
