// parlor-core/src/state/value.rs
// ============================================================================
// Module: State Values
// Description: Tagged value graph for replicated room state.
// Purpose: Represent instances, collections, and primitives uniformly.
// Dependencies: crate::core::identifiers, serde_json
// ============================================================================

//! ## Overview
//! `StateValue` is the runtime representation of everything replicated to
//! clients: primitives with f64 number semantics, class instances with fixed
//! declared fields, keyed collections (maps), and ordered collections
//! (arrays). Plain maps double as the "empty record" created by path writes.
//! Guards and token templates never see these values directly; they operate
//! on the plain-JSON snapshots produced by [`StateValue::to_json`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde_json::Value;

use crate::core::identifiers::ClassName;

// ============================================================================
// SECTION: State Values
// ============================================================================

/// One node of the replicated state graph.
#[derive(Debug, Clone, PartialEq)]
pub enum StateValue {
    /// Unset or explicit null.
    Null,
    /// Boolean primitive.
    Bool(bool),
    /// Numeric primitive (f64 semantics).
    Number(f64),
    /// String primitive.
    String(String),
    /// Instance of a schema-declared class.
    Instance(Instance),
    /// Keyed collection (also the shape of ad-hoc records created by writes).
    Map(BTreeMap<String, StateValue>),
    /// Ordered collection.
    Array(Vec<StateValue>),
}

impl StateValue {
    /// Creates an empty keyed collection.
    #[must_use]
    pub const fn empty_map() -> Self {
        Self::Map(BTreeMap::new())
    }

    /// Converts a plain JSON value into a state value.
    ///
    /// Objects become keyed collections; there is no way to smuggle an
    /// instance in through JSON.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => n.as_f64().map_or(Self::Null, Self::Number),
            Value::String(s) => Self::String(s.clone()),
            Value::Array(items) => Self::Array(items.iter().map(Self::from_json).collect()),
            Value::Object(map) => Self::Map(
                map.iter().map(|(key, item)| (key.clone(), Self::from_json(item))).collect(),
            ),
        }
    }

    /// Produces the plain-JSON snapshot of this value.
    ///
    /// Non-finite numbers collapse to `null`, matching JSON serialization.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => serde_json::Number::from_f64(*n).map_or(Value::Null, Value::Number),
            Self::String(s) => Value::String(s.clone()),
            Self::Instance(instance) => instance.to_json(),
            Self::Map(map) => Value::Object(
                map.iter().map(|(key, item)| (key.clone(), item.to_json())).collect(),
            ),
            Self::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
        }
    }

    /// Returns the numeric value, if this is a number.
    #[must_use]
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns true for scalar leaves that cannot be descended into.
    #[must_use]
    pub const fn is_scalar(&self) -> bool {
        matches!(self, Self::Bool(_) | Self::Number(_) | Self::String(_))
    }
}

// ============================================================================
// SECTION: Instances
// ============================================================================

/// Instance of a schema-declared class.
///
/// # Invariants
/// - The field set is fixed at construction; writes to undeclared fields are
///   rejected by the path resolver and by [`Instance::assign`].
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    /// Declaring class name.
    class: ClassName,
    /// Declared fields and their current values.
    fields: BTreeMap<String, StateValue>,
}

impl Instance {
    /// Creates an instance with a pre-initialized field set.
    #[must_use]
    pub const fn new(class: ClassName, fields: BTreeMap<String, StateValue>) -> Self {
        Self {
            class,
            fields,
        }
    }

    /// Returns the declaring class name.
    #[must_use]
    pub const fn class(&self) -> &ClassName {
        &self.class
    }

    /// Returns true when the field is declared.
    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Returns a declared field's value.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&StateValue> {
        self.fields.get(name)
    }

    /// Returns a declared field's value mutably.
    #[must_use]
    pub fn field_mut(&mut self, name: &str) -> Option<&mut StateValue> {
        self.fields.get_mut(name)
    }

    /// Assigns a declared field, returning false for undeclared names.
    pub fn assign(&mut self, name: &str, value: StateValue) -> bool {
        match self.fields.get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Produces the plain-JSON snapshot of the instance.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.fields.iter().map(|(key, item)| (key.clone(), item.to_json())).collect(),
        )
    }
}
