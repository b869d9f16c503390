// parlor-core/src/runtime/interpreter.rs
// ============================================================================
// Module: Statechart Interpreter
// Description: Drives the compiled statechart for one room.
// Purpose: Dispatch events, honour guards and delays, and invoke actions.
// Dependencies: crate::{core, interfaces, runtime}, parlor-logic, serde_json
// ============================================================================

//! ## Overview
//! The interpreter is a value-state engine over a machine compiled once per
//! room: per-state transition lists with pre-compiled guards and action
//! templates. Candidates are evaluated in declaration order and the first
//! passing guard wins; guard failures count as false and the search
//! continues. The interpreter never mutates replicated state directly;
//! every write flows through the action runtime. Delayed transitions are
//! installed on state entry, stamped with a state generation, and discarded
//! at fire time when the generation moved on.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use parlor_logic::LogicNode;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::core::identifiers::EventName;
use crate::core::identifiers::StateName;
use crate::core::machine::MachineSpec;
use crate::core::machine::StateKind;
use crate::core::machine::Transition;
use crate::interfaces::RoomAuditEvent;
use crate::runtime::actions::CompiledAction;
use crate::runtime::actions::Environment;
use crate::runtime::actions::compile_actions;
use crate::runtime::actions::execute_actions;
use crate::runtime::scheduler::ScheduledWork;

// ============================================================================
// SECTION: Compiled Machine
// ============================================================================

/// Executable form of one transition.
#[derive(Debug, Clone)]
pub struct CompiledTransition {
    /// Target state for external transitions.
    pub target: Option<StateName>,
    /// Pre-compiled guard tree.
    pub guard: Option<LogicNode>,
    /// Transition actions.
    pub actions: Vec<CompiledAction>,
}

/// Executable form of one state.
#[derive(Debug, Clone, Default)]
pub struct CompiledState {
    /// Absorbing-state marker.
    pub is_final: bool,
    /// External transitions in declaration order per event.
    pub on: BTreeMap<EventName, Vec<CompiledTransition>>,
    /// Delayed transitions keyed by delay in milliseconds.
    pub after: Vec<(u64, Vec<CompiledTransition>)>,
    /// Entry actions.
    pub entry: Vec<CompiledAction>,
    /// Exit actions.
    pub exit: Vec<CompiledAction>,
}

/// Executable form of a statechart.
#[derive(Debug, Clone)]
pub struct CompiledMachine {
    /// Initial state name.
    pub initial: StateName,
    /// Compiled states.
    pub states: BTreeMap<StateName, CompiledState>,
}

/// Machine compilation errors.
#[derive(Debug, Error)]
pub enum MachineCompileError {
    /// Initial state is not declared.
    #[error("initial state is not declared: {0}")]
    UnknownInitialState(String),
    /// Delay key is not a millisecond count.
    #[error("state `{state}` has a non-numeric after delay: {delay}")]
    InvalidDelay {
        /// State declaring the delay.
        state: String,
        /// Offending delay key.
        delay: String,
    },
    /// Guard failed to compile.
    #[error("state `{state}` has an invalid guard: {detail}")]
    InvalidGuard {
        /// State declaring the guard.
        state: String,
        /// Compiler diagnostic.
        detail: String,
    },
}

/// Compiles a machine specification into executable form.
///
/// # Errors
///
/// Returns [`MachineCompileError`] when the initial state is undeclared, a
/// delay key is non-numeric, or a guard fails to compile.
pub fn compile_machine(spec: &MachineSpec) -> Result<CompiledMachine, MachineCompileError> {
    if !spec.states.contains_key(&spec.initial) {
        return Err(MachineCompileError::UnknownInitialState(spec.initial.to_string()));
    }

    let mut states = BTreeMap::new();
    for (state_name, node) in &spec.states {
        let mut on = BTreeMap::new();
        for (event, transitions) in &node.on {
            on.insert(event.clone(), compile_transitions(state_name, transitions.as_slice())?);
        }

        let mut after = Vec::new();
        for (delay, transitions) in &node.after {
            let delay_ms =
                delay.parse::<u64>().map_err(|_| MachineCompileError::InvalidDelay {
                    state: state_name.to_string(),
                    delay: delay.clone(),
                })?;
            after.push((delay_ms, compile_transitions(state_name, transitions.as_slice())?));
        }

        states.insert(
            state_name.clone(),
            CompiledState {
                is_final: node.kind == Some(StateKind::Final),
                on,
                after,
                entry: compile_actions(node.entry.as_slice()),
                exit: compile_actions(node.exit.as_slice()),
            },
        );
    }

    Ok(CompiledMachine {
        initial: spec.initial.clone(),
        states,
    })
}

/// Compiles one transition list.
fn compile_transitions(
    state_name: &StateName,
    transitions: &[Transition],
) -> Result<Vec<CompiledTransition>, MachineCompileError> {
    let mut compiled = Vec::with_capacity(transitions.len());
    for transition in transitions {
        let guard = match &transition.cond {
            Some(cond) => {
                Some(parlor_logic::compile(cond).map_err(|err| MachineCompileError::InvalidGuard {
                    state: state_name.to_string(),
                    detail: err.to_string(),
                })?)
            }
            None => None,
        };
        compiled.push(CompiledTransition {
            target: transition.target.clone(),
            guard,
            actions: compile_actions(transition.actions.as_slice()),
        });
    }
    Ok(compiled)
}

// ============================================================================
// SECTION: Interpreter
// ============================================================================

/// Statechart interpreter for one room.
///
/// # Invariants
/// - `current` always names a compiled state.
/// - `generation` increments on every state switch; scheduled `after` timers
///   carry the generation they were installed under.
#[derive(Debug)]
pub struct Interpreter {
    /// Compiled machine.
    machine: CompiledMachine,
    /// Current state name.
    current: StateName,
    /// State generation stamp for timer cancellation.
    generation: u64,
    /// Last inbound event record (`{type, ...payload}`).
    last_event: Value,
}

impl Interpreter {
    /// Creates an interpreter positioned at the machine's initial state.
    #[must_use]
    pub fn new(machine: CompiledMachine) -> Self {
        let current = machine.initial.clone();
        Self {
            machine,
            current,
            generation: 0,
            last_event: Value::Null,
        }
    }

    /// Returns the current state name.
    #[must_use]
    pub const fn current_state(&self) -> &StateName {
        &self.current
    }

    /// Returns the event names the current state accepts.
    #[must_use]
    pub fn acceptable_events(&self) -> Vec<EventName> {
        self.machine
            .states
            .get(&self.current)
            .map(|state| state.on.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Enters the initial state: runs its entry actions and installs timers.
    pub fn start(&mut self, env: &mut Environment<'_>) {
        self.last_event = serde_json::json!({ "type": "init" });
        let event = self.last_event.clone();
        let (entry, _) = self.state_pieces(&self.current.clone());
        execute_actions(env, &event, &entry);
        self.install_after_timers(env);
    }

    /// Dispatches one inbound event through the statechart.
    ///
    /// Unmatched events are dropped with an audit record; final states only
    /// react to explicitly declared handlers.
    pub fn send(&mut self, env: &mut Environment<'_>, event_name: &EventName, payload: &Map<String, Value>) {
        let mut event_record = Map::with_capacity(payload.len() + 1);
        event_record.insert("type".to_string(), Value::String(event_name.to_string()));
        for (key, value) in payload {
            event_record.entry(key.clone()).or_insert_with(|| value.clone());
        }
        let event = Value::Object(event_record);
        self.last_event = event.clone();

        let Some(state) = self.machine.states.get(&self.current) else {
            return;
        };
        let Some(candidates) = state.on.get(event_name) else {
            env.audit.emit(&RoomAuditEvent::EventDropped {
                event: event_name.to_string(),
                reason: if state.is_final {
                    "final state".to_string()
                } else {
                    "no handler in current state".to_string()
                },
            });
            return;
        };

        let Some(transition) = self.select_transition(env, candidates, &event) else {
            env.audit.emit(&RoomAuditEvent::EventDropped {
                event: event_name.to_string(),
                reason: "no transition matched".to_string(),
            });
            return;
        };
        self.run_transition(env, transition, &event, event_name.as_str());
    }

    /// Processes one fired scheduler entry.
    pub fn handle_scheduled(&mut self, env: &mut Environment<'_>, work: ScheduledWork) {
        match work {
            ScheduledWork::ActionBatch {
                event,
                actions,
            } => {
                execute_actions(env, &event, &actions);
            }
            ScheduledWork::AfterTimer {
                state,
                generation,
                delay_ms,
            } => {
                if generation != self.generation || state != self.current {
                    return;
                }
                let Some(compiled) = self.machine.states.get(&self.current) else {
                    return;
                };
                let Some((_, candidates)) =
                    compiled.after.iter().find(|(delay, _)| *delay == delay_ms)
                else {
                    return;
                };
                let event = self.last_event.clone();
                let label = format!("after:{delay_ms}");
                let Some(transition) = self.select_transition(env, candidates, &event) else {
                    return;
                };
                self.run_transition(env, transition, &event, &label);
            }
        }
    }

    // ------------------------------------------------------------------
    // Transition machinery
    // ------------------------------------------------------------------

    /// Selects the first candidate whose guard passes.
    ///
    /// Guard evaluation errors are audited and treated as false, so the
    /// search continues with the next candidate.
    fn select_transition(
        &self,
        env: &Environment<'_>,
        candidates: &[CompiledTransition],
        event: &Value,
    ) -> Option<CompiledTransition> {
        let view = env.dispatch_view(event);
        for candidate in candidates {
            match &candidate.guard {
                None => return Some(candidate.clone()),
                Some(guard) => match guard.evaluate_bool(&view) {
                    Ok(true) => return Some(candidate.clone()),
                    Ok(false) => {}
                    Err(err) => {
                        env.audit.emit(&RoomAuditEvent::GuardFailed {
                            state: self.current.clone(),
                            reason: err.to_string(),
                        });
                    }
                },
            }
        }
        None
    }

    /// Runs a selected transition: exit, transition, entry, timers.
    fn run_transition(
        &mut self,
        env: &mut Environment<'_>,
        transition: CompiledTransition,
        event: &Value,
        event_label: &str,
    ) {
        let from = self.current.clone();
        let changes_state =
            transition.target.as_ref().is_some_and(|target| *target != self.current);

        if changes_state {
            let (_, exit) = self.state_pieces(&from);
            execute_actions(env, event, &exit);
        }

        execute_actions(env, event, &transition.actions);

        if let Some(target) = transition.target.clone() {
            self.generation += 1;
            self.current = target.clone();
            let (entry, _) = self.state_pieces(&target);
            execute_actions(env, event, &entry);
            self.install_after_timers(env);
        }

        env.audit.emit(&RoomAuditEvent::TransitionTaken {
            from,
            to: transition.target,
            event: event_label.to_string(),
        });
    }

    /// Installs the current state's `after` timers at the current time.
    fn install_after_timers(&self, env: &mut Environment<'_>) {
        let Some(state) = self.machine.states.get(&self.current) else {
            return;
        };
        for (delay_ms, _) in &state.after {
            env.scheduler.schedule(
                env.now.saturating_add_millis(*delay_ms),
                ScheduledWork::AfterTimer {
                    state: self.current.clone(),
                    generation: self.generation,
                    delay_ms: *delay_ms,
                },
            );
        }
    }

    /// Clones a state's entry and exit action lists.
    fn state_pieces(&self, state: &StateName) -> (Vec<CompiledAction>, Vec<CompiledAction>) {
        self.machine
            .states
            .get(state)
            .map(|compiled| (compiled.entry.clone(), compiled.exit.clone()))
            .unwrap_or_default()
    }
}
