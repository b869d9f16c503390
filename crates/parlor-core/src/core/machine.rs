// parlor-core/src/core/machine.rs
// ============================================================================
// Module: Statechart Specification
// Description: Machine, state, transition, and action declarations.
// Purpose: Define the statechart DSL types with stable serialized forms.
// Dependencies: crate::core::identifiers, serde, serde_json
// ============================================================================

//! ## Overview
//! The statechart DSL is a flat hierarchical-machine subset: named states
//! with external (`on`) and delayed (`after`) transitions, entry/exit
//! actions, and an optional `final` marker. Transitions carry declarative
//! guards (logic trees) and action descriptors whose parameters are token
//! templates expanded at dispatch time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::core::identifiers::EventName;
use crate::core::identifiers::StateName;

// ============================================================================
// SECTION: One-Or-Many
// ============================================================================

/// Accepts either a single element or a list in serialized form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    /// Single inline element.
    One(T),
    /// Explicit list of elements.
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    /// Returns the elements as a slice regardless of serialized form.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        match self {
            Self::One(item) => std::slice::from_ref(item),
            Self::Many(items) => items,
        }
    }
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

// ============================================================================
// SECTION: Machine Specification
// ============================================================================

/// Statechart declaration for a game definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineSpec {
    /// Machine identifier (informational).
    pub id: String,
    /// Initial state entered when the room starts.
    pub initial: StateName,
    /// Server-only context values exposed to guards and actions.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub context: Map<String, Value>,
    /// Declared states.
    pub states: BTreeMap<StateName, StateNode>,
}

/// One state of the statechart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateNode {
    /// External transitions keyed by event name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub on: BTreeMap<EventName, OneOrMany<Transition>>,
    /// Delayed transitions keyed by delay in milliseconds (serialized as
    /// object keys, so the delays arrive as strings).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub after: BTreeMap<String, OneOrMany<Transition>>,
    /// Actions run when the state is entered.
    #[serde(default, skip_serializing_if = "one_or_many_is_empty")]
    pub entry: OneOrMany<ActionSpec>,
    /// Actions run when the state is exited.
    #[serde(default, skip_serializing_if = "one_or_many_is_empty")]
    pub exit: OneOrMany<ActionSpec>,
    /// State kind marker (`"final"` for absorbing states).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<StateKind>,
}

/// Returns true when a one-or-many action list is empty.
fn one_or_many_is_empty(value: &OneOrMany<ActionSpec>) -> bool {
    value.as_slice().is_empty()
}

/// State kind markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateKind {
    /// Absorbing state: only explicitly declared handlers fire.
    Final,
}

// ============================================================================
// SECTION: Transitions
// ============================================================================

/// One guarded transition.
///
/// # Invariants
/// - A missing `target` marks an internal transition: actions run without a
///   state change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// Target state; must name a sibling state when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<StateName>,
    /// Guard logic tree evaluated over `{event, context, state, data}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cond: Option<Value>,
    /// Actions run when the transition is taken.
    #[serde(default, skip_serializing_if = "one_or_many_is_empty")]
    pub actions: OneOrMany<ActionSpec>,
}

// ============================================================================
// SECTION: Actions
// ============================================================================

/// One action descriptor: a catalogue name plus flattened parameters.
///
/// Serialized as `{"type": "setState", "path": ..., "value": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSpec {
    /// Catalogue name of the action.
    #[serde(rename = "type")]
    pub kind: String,
    /// Action parameters (token templates expanded at dispatch).
    #[serde(flatten)]
    pub params: Map<String, Value>,
}
