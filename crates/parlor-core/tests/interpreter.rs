// parlor-core/tests/interpreter.rs
// ============================================================================
// Module: Interpreter Tests
// Description: Statechart dispatch, guards, delays, and final states.
// Purpose: Validate the event dispatch algorithm end to end.
// Dependencies: parlor-core, serde_json
// ============================================================================

//! ## Overview
//! Exercises the interpreter over small machines: candidate ordering,
//! guard fail-closed behavior, entry/exit sequencing, delayed transitions
//! with cancellation on exit, and absorbing final states.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_docs_in_private_items,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use parlor_core::ClassTable;
use parlor_core::Environment;
use parlor_core::Interpreter;
use parlor_core::LogicalTime;
use parlor_core::MemoryAuditSink;
use parlor_core::NoopBroadcaster;
use parlor_core::Scheduler;
use parlor_core::SchemaSpec;
use parlor_core::StateValue;
use parlor_core::compile_machine;
use parlor_core::core::machine::MachineSpec;
use parlor_core::path_get;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

/// Interpreter world: machine plus the room pieces it executes against.
struct World {
    interpreter: Interpreter,
    state: StateValue,
    classes: ClassTable,
    scheduler: Scheduler,
    broadcaster: NoopBroadcaster,
    audit: MemoryAuditSink,
    data: Value,
    context: Value,
    now: LogicalTime,
}

impl World {
    fn new(machine: Value) -> Self {
        let schema: SchemaSpec = serde_json::from_value(json!({
            "root": "GameState",
            "classes": {
                "GameState": {
                    "log": {"array": "string"},
                    "counter": {"type": "number"},
                    "phase": {"type": "string"}
                }
            }
        }))
        .unwrap();
        let classes = ClassTable::build(&schema).unwrap();
        let state = StateValue::Instance(classes.instantiate_with_defaults().unwrap());
        let spec: MachineSpec = serde_json::from_value(machine).unwrap();
        let compiled = compile_machine(&spec).unwrap();
        let mut world = Self {
            interpreter: Interpreter::new(compiled),
            state,
            classes,
            scheduler: Scheduler::new(),
            broadcaster: NoopBroadcaster,
            audit: MemoryAuditSink::new(),
            data: json!({}),
            context: json!({}),
            now: LogicalTime::ZERO,
        };
        world.start();
        world
    }

    fn start(&mut self) {
        let mut env = Environment {
            state: &mut self.state,
            classes: &self.classes,
            data: &self.data,
            context: &self.context,
            scheduler: &mut self.scheduler,
            broadcaster: &self.broadcaster,
            audit: &self.audit,
            now: self.now,
        };
        self.interpreter.start(&mut env);
    }

    fn send(&mut self, event: &str, payload: Value) {
        let payload: Map<String, Value> = match payload {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let mut env = Environment {
            state: &mut self.state,
            classes: &self.classes,
            data: &self.data,
            context: &self.context,
            scheduler: &mut self.scheduler,
            broadcaster: &self.broadcaster,
            audit: &self.audit,
            now: self.now,
        };
        self.interpreter.send(&mut env, &event.into(), &payload);
    }

    /// Advances time and fires every due scheduler entry in order.
    fn advance(&mut self, to_ms: u64) {
        let to = LogicalTime::from_millis(to_ms);
        while let Some(entry) = self.scheduler.pop_due(to) {
            self.now = entry.fire_at;
            let mut env = Environment {
                state: &mut self.state,
                classes: &self.classes,
                data: &self.data,
                context: &self.context,
                scheduler: &mut self.scheduler,
                broadcaster: &self.broadcaster,
                audit: &self.audit,
                now: self.now,
            };
            self.interpreter.handle_scheduled(&mut env, entry.work);
        }
        self.now = to;
    }

    fn log(&self) -> Value {
        path_get(&self.state, "log").map(StateValue::to_json).unwrap_or(Value::Null)
    }
}

/// Writes a marker into the root log array at a fixed slot.
fn append(index: usize, value: &str) -> Value {
    json!({"type": "setState", "path": format!("log.{index}"), "value": value})
}

#[test]
fn initial_state_entry_actions_run_on_start() {
    let world = World::new(json!({
        "id": "m",
        "initial": "idle",
        "states": {
            "idle": {"entry": [append(0, "entered")]}
        }
    }));
    assert_eq!(world.log(), json!(["entered"]));
}

#[test]
fn transition_runs_exit_actions_entry_in_order() {
    let mut world = World::new(json!({
        "id": "m",
        "initial": "a",
        "states": {
            "a": {
                "entry": [append(0, "enter-a")],
                "exit": [append(1, "exit-a")],
                "on": {"go": {"target": "b", "actions": [append(2, "move")]}}
            },
            "b": {"entry": [append(3, "enter-b")]}
        }
    }));
    world.send("go", json!({}));
    assert_eq!(world.log(), json!(["enter-a", "exit-a", "move", "enter-b"]));
}

#[test]
fn internal_transitions_keep_state_and_skip_exit() {
    let mut world = World::new(json!({
        "id": "m",
        "initial": "a",
        "states": {
            "a": {
                "exit": [append(0, "exit-a")],
                "on": {"poke": {"actions": [append(0, "poked")]}}
            }
        }
    }));
    world.send("poke", json!({}));
    assert_eq!(world.interpreter.current_state().as_str(), "a");
    assert_eq!(world.log(), json!(["poked"]));
}

#[test]
fn first_matching_guard_wins() {
    let mut world = World::new(json!({
        "id": "m",
        "initial": "a",
        "states": {
            "a": {
                "on": {"judge": [
                    {"cond": {"==": [{"var": "event.value"}, 1]}, "actions": [append(0, "one")]},
                    {"cond": {"==": [{"var": "event.value"}, 2]}, "actions": [append(0, "two")]},
                    {"actions": [append(0, "fallback")]}
                ]}
            }
        }
    }));
    world.send("judge", json!({"value": 2}));
    assert_eq!(world.log(), json!(["two"]));
}

#[test]
fn guard_errors_count_as_false_and_search_continues() {
    let mut world = World::new(json!({
        "id": "m",
        "initial": "a",
        "states": {
            "a": {
                "on": {"judge": [
                    {"cond": {"/": [1, 0]}, "actions": [append(0, "boom")]},
                    {"actions": [append(0, "safe")]}
                ]}
            }
        }
    }));
    world.send("judge", json!({}));
    assert_eq!(world.log(), json!(["safe"]));
}

#[test]
fn unmatched_events_are_ignored() {
    let mut world = World::new(json!({
        "id": "m",
        "initial": "a",
        "states": {
            "a": {"on": {"known": {"actions": [append(0, "seen")]}}}
        }
    }));
    world.send("unknown", json!({}));
    assert_eq!(world.log(), json!([]));
    assert_eq!(world.interpreter.current_state().as_str(), "a");
}

#[test]
fn acceptable_events_match_the_current_state() {
    let mut world = World::new(json!({
        "id": "m",
        "initial": "a",
        "states": {
            "a": {"on": {"go": {"target": "b"}, "stay": {}}},
            "b": {"on": {"back": {"target": "a"}}}
        }
    }));
    let mut names: Vec<String> =
        world.interpreter.acceptable_events().iter().map(ToString::to_string).collect();
    names.sort();
    assert_eq!(names, vec!["go".to_string(), "stay".to_string()]);

    world.send("go", json!({}));
    let names: Vec<String> =
        world.interpreter.acceptable_events().iter().map(ToString::to_string).collect();
    assert_eq!(names, vec!["back".to_string()]);
}

#[test]
fn after_timers_fire_once_at_their_delay() {
    let mut world = World::new(json!({
        "id": "m",
        "initial": "waiting",
        "states": {
            "waiting": {
                "after": {"1000": {"target": "done", "actions": [append(0, "timed-out")]}}
            },
            "done": {"entry": [append(1, "finished")]}
        }
    }));
    world.advance(999);
    assert_eq!(world.log(), json!([]));
    world.advance(1000);
    assert_eq!(world.log(), json!(["timed-out", "finished"]));
    assert_eq!(world.interpreter.current_state().as_str(), "done");

    // Nothing left to fire.
    world.advance(10_000);
    assert_eq!(world.log(), json!(["timed-out", "finished"]));
}

#[test]
fn after_timers_cancel_on_state_exit() {
    let mut world = World::new(json!({
        "id": "m",
        "initial": "waiting",
        "states": {
            "waiting": {
                "on": {"leave": {"target": "elsewhere"}},
                "after": {"1000": {"actions": [append(0, "timed-out")]}}
            },
            "elsewhere": {}
        }
    }));
    world.send("leave", json!({}));
    world.advance(5000);
    assert_eq!(world.log(), json!([]));
}

#[test]
fn after_timers_reinstall_on_reentry() {
    let mut world = World::new(json!({
        "id": "m",
        "initial": "waiting",
        "states": {
            "waiting": {
                "on": {"reset": {"target": "waiting"}},
                "after": {"1000": {"actions": [append(0, "timed-out")]}}
            }
        }
    }));
    world.advance(400);
    world.send("reset", json!({}));
    // The original timer was cancelled; the reinstalled one fires at 1400.
    world.advance(1200);
    assert_eq!(world.log(), json!([]));
    world.advance(1400);
    assert_eq!(world.log(), json!(["timed-out"]));
}

#[test]
fn final_states_ignore_undeclared_events() {
    let mut world = World::new(json!({
        "id": "m",
        "initial": "a",
        "states": {
            "a": {"on": {"finish": {"target": "end"}}},
            "end": {
                "type": "final",
                "entry": [append(0, "ended")],
                "on": {"reset": {"target": "a", "actions": [append(1, "reset")]}}
            }
        }
    }));
    world.send("finish", json!({}));
    world.send("finish", json!({}));
    assert_eq!(world.log(), json!(["ended"]));

    // Explicitly declared handlers still fire on final states.
    world.send("reset", json!({}));
    assert_eq!(world.log(), json!(["ended", "reset"]));
    assert_eq!(world.interpreter.current_state().as_str(), "a");
}

#[test]
fn guarded_after_transitions_honour_conditions() {
    let mut world = World::new(json!({
        "id": "m",
        "initial": "waiting",
        "states": {
            "waiting": {
                "on": {"bump": {"actions": [{"type": "increment", "path": "counter"}]}},
                "after": {"500": [
                    {"cond": {">": [{"var": "state.counter"}, 0]}, "actions": [append(0, "counted")]},
                    {"actions": [append(0, "empty")]}
                ]}
            }
        }
    }));
    world.send("bump", json!({}));
    world.advance(500);
    assert_eq!(world.log(), json!(["counted"]));
}
