// parlor-core/src/core/schema.rs
// ============================================================================
// Module: Schema DSL
// Description: Class and field declarations for replicated room state.
// Purpose: Define the schema DSL types with stable serialized forms.
// Dependencies: crate::core::identifiers, serde, serde_json
// ============================================================================

//! ## Overview
//! A schema declares the replicated-state shape of one game: named classes,
//! their typed fields, and primitive default values. Field types reference
//! either a primitive or another declared class; cross-references are
//! resolved when the class table is built (two passes, so forward references
//! work).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::ClassName;

// ============================================================================
// SECTION: Schema Specification
// ============================================================================

/// Schema declaration for a game definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaSpec {
    /// Class instantiated as the room's root state.
    pub root: ClassName,
    /// Declared classes and their fields.
    pub classes: BTreeMap<ClassName, BTreeMap<String, FieldType>>,
    /// Primitive default values per class.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub defaults: BTreeMap<ClassName, BTreeMap<String, Value>>,
}

// ============================================================================
// SECTION: Field Types
// ============================================================================

/// Primitive field types supported by the schema DSL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    /// UTF-8 string field.
    String,
    /// Numeric field (f64 semantics).
    Number,
    /// Boolean field.
    Boolean,
}

/// Field type declaration.
///
/// Serialized forms are mutually exclusive single-key records:
/// `{"type": "string"}`, `{"ref": "Class"}`, `{"map": "Class"}`,
/// `{"array": "Class" | "string" | "number" | "boolean"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldType {
    /// Primitive scalar field.
    Primitive {
        /// Primitive kind.
        #[serde(rename = "type")]
        kind: PrimitiveType,
    },
    /// Single nested instance of a declared class.
    Ref {
        /// Referenced class name.
        #[serde(rename = "ref")]
        class: ClassName,
    },
    /// Keyed collection of instances of a declared class.
    Map {
        /// Element class name.
        map: ClassName,
    },
    /// Ordered collection of instances or primitives.
    Array {
        /// Element type.
        array: ElementType,
    },
}

/// Array element type: a primitive name or a declared class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ElementType {
    /// Primitive element (`string`, `number`, `boolean`).
    Primitive(PrimitiveType),
    /// Declared class element.
    Class(ClassName),
}
