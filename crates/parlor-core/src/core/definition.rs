// parlor-core/src/core/definition.rs
// ============================================================================
// Module: Game Definition
// Description: The complete declarative description of one game.
// Purpose: Define the definition record with fail-fast validation helpers.
// Dependencies: crate::{core, runtime, state}, parlor-logic, serde
// ============================================================================

//! ## Overview
//! A game definition is pure data: the schema for the replicated state, the
//! statechart driving game logic, and free-form static game data. Definitions
//! are untrusted inputs; `validate` runs every cross-reference check before a
//! room is allowed to bind one.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::HashDigest;
use crate::core::hashing::HashError;
use crate::core::identifiers::DefinitionId;
use crate::core::identifiers::DefinitionVersion;
use crate::core::machine::ActionSpec;
use crate::core::machine::MachineSpec;
use crate::core::machine::OneOrMany;
use crate::core::machine::Transition;
use crate::core::schema::SchemaSpec;
use crate::runtime::actions::is_catalogue_action;
use crate::state::ClassTable;
use crate::state::SchemaError;

// ============================================================================
// SECTION: Game Definition
// ============================================================================

/// Canonical game definition record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameDefinition {
    /// Definition identifier.
    pub id: DefinitionId,
    /// Human-readable name.
    pub name: String,
    /// Definition version identifier.
    pub version: DefinitionVersion,
    /// Replicated-state schema DSL.
    pub schema: SchemaSpec,
    /// Statechart driving the game logic.
    pub machine: MachineSpec,
    /// Free-form static game data exposed to guards and actions as `data.*`.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub data: Map<String, Value>,
    /// Advisory allowlist of action names used by the machine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<String>>,
}

impl GameDefinition {
    /// Computes the canonical hash of the definition.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::Canonicalization`] when serialization fails.
    pub fn canonical_hash(&self) -> Result<HashDigest, HashError> {
        crate::core::hashing::hash_canonical_json(DEFAULT_HASH_ALGORITHM, self)
    }

    /// Validates the definition's cross-reference invariants.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError`] when validation fails.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        ensure_schema_resolves(&self.schema)?;
        ensure_states_declared(&self.machine)?;
        ensure_targets_declared(&self.machine)?;
        ensure_after_delays_numeric(&self.machine)?;
        ensure_guards_compile(&self.machine)?;
        ensure_actions_known(&self.machine, self.actions.as_deref())?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Game definition validation errors.
#[derive(Debug, Error)]
pub enum DefinitionError {
    /// Schema class references failed to resolve.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// Machine declares no states.
    #[error("machine must declare at least one state")]
    MissingStates,
    /// Initial state is not declared.
    #[error("initial state is not declared: {0}")]
    UnknownInitialState(String),
    /// Transition target does not name a sibling state.
    #[error("state `{state}` targets undeclared state: {target}")]
    UnknownTargetState {
        /// State declaring the transition.
        state: String,
        /// Missing target name.
        target: String,
    },
    /// Delayed-transition key is not a millisecond count.
    #[error("state `{state}` has a non-numeric after delay: {delay}")]
    InvalidDelay {
        /// State declaring the delay.
        state: String,
        /// Offending delay key.
        delay: String,
    },
    /// Guard logic tree failed to compile.
    #[error("state `{state}` has an invalid guard: {detail}")]
    InvalidGuard {
        /// State declaring the guard.
        state: String,
        /// Compiler diagnostic.
        detail: String,
    },
    /// Action name is not in the runtime catalogue.
    #[error("state `{state}` references unknown action: {action}")]
    UnknownAction {
        /// State referencing the action.
        state: String,
        /// Unknown action name.
        action: String,
    },
    /// Action name is outside the definition's advisory allowlist.
    #[error("state `{state}` uses action outside the declared allowlist: {action}")]
    ActionNotAllowed {
        /// State referencing the action.
        state: String,
        /// Disallowed action name.
        action: String,
    },
}

// ============================================================================
// SECTION: Validation Helpers
// ============================================================================

/// Ensures the schema's class references resolve by building a class table.
fn ensure_schema_resolves(schema: &SchemaSpec) -> Result<(), DefinitionError> {
    ClassTable::build(schema)?;
    Ok(())
}

/// Ensures the machine declares states and its initial state exists.
fn ensure_states_declared(machine: &MachineSpec) -> Result<(), DefinitionError> {
    if machine.states.is_empty() {
        return Err(DefinitionError::MissingStates);
    }
    if !machine.states.contains_key(&machine.initial) {
        return Err(DefinitionError::UnknownInitialState(machine.initial.to_string()));
    }
    Ok(())
}

/// Ensures every transition target names a declared state.
fn ensure_targets_declared(machine: &MachineSpec) -> Result<(), DefinitionError> {
    for (state_name, state) in &machine.states {
        for transition in all_transitions(state) {
            if let Some(target) = &transition.target
                && !machine.states.contains_key(target)
            {
                return Err(DefinitionError::UnknownTargetState {
                    state: state_name.to_string(),
                    target: target.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Ensures `after` keys parse as millisecond counts.
fn ensure_after_delays_numeric(machine: &MachineSpec) -> Result<(), DefinitionError> {
    for (state_name, state) in &machine.states {
        for delay in state.after.keys() {
            if delay.parse::<u64>().is_err() {
                return Err(DefinitionError::InvalidDelay {
                    state: state_name.to_string(),
                    delay: delay.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Ensures every transition guard compiles.
fn ensure_guards_compile(machine: &MachineSpec) -> Result<(), DefinitionError> {
    for (state_name, state) in &machine.states {
        for transition in all_transitions(state) {
            if let Some(cond) = &transition.cond {
                parlor_logic::compile(cond).map_err(|err| DefinitionError::InvalidGuard {
                    state: state_name.to_string(),
                    detail: err.to_string(),
                })?;
            }
        }
    }
    Ok(())
}

/// Ensures machine-referenced action names are known and allowlisted.
///
/// Only actions attached directly to states and transitions are checked;
/// actions nested inside `when`/`scheduleActions` bodies are skipped at
/// runtime instead of failing the definition.
fn ensure_actions_known(
    machine: &MachineSpec,
    allowlist: Option<&[String]>,
) -> Result<(), DefinitionError> {
    for (state_name, state) in &machine.states {
        let mut actions: Vec<&ActionSpec> = Vec::new();
        actions.extend(state.entry.as_slice());
        actions.extend(state.exit.as_slice());
        for transition in all_transitions(state) {
            actions.extend(transition.actions.as_slice());
        }
        for action in actions {
            if !is_catalogue_action(&action.kind) {
                return Err(DefinitionError::UnknownAction {
                    state: state_name.to_string(),
                    action: action.kind.clone(),
                });
            }
            if let Some(allowed) = allowlist
                && !allowed.iter().any(|name| name == &action.kind)
            {
                return Err(DefinitionError::ActionNotAllowed {
                    state: state_name.to_string(),
                    action: action.kind.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Iterates every transition declared by a state (`on` then `after`).
fn all_transitions(state: &crate::core::machine::StateNode) -> impl Iterator<Item = &Transition> {
    state
        .on
        .values()
        .chain(state.after.values())
        .flat_map(OneOrMany::as_slice)
}
