// parlor-core/src/core/mod.rs
// ============================================================================
// Module: Core Domain Types
// Description: Definition models, identifiers, hashing, and logical time.
// Purpose: Re-export the core domain type modules.
// Dependencies: crate::core::{definition, hashing, identifiers, machine, schema, time}
// ============================================================================

//! ## Overview
//! Canonical domain types shared across the room runtime: game definitions
//! and their validation, identifier newtypes, canonical hashing, and the
//! logical time model.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod definition;
pub mod hashing;
pub mod identifiers;
pub mod machine;
pub mod schema;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use definition::DefinitionError;
pub use definition::GameDefinition;
pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use hashing::HashError;
pub use hashing::hash_bytes;
pub use hashing::hash_canonical_json;
pub use identifiers::ClassName;
pub use identifiers::DefinitionId;
pub use identifiers::DefinitionVersion;
pub use identifiers::EventName;
pub use identifiers::SessionId;
pub use identifiers::StateName;
pub use machine::ActionSpec;
pub use machine::MachineSpec;
pub use machine::OneOrMany;
pub use machine::StateKind;
pub use machine::StateNode;
pub use machine::Transition;
pub use schema::ElementType;
pub use schema::FieldType;
pub use schema::PrimitiveType;
pub use schema::SchemaSpec;
pub use time::LogicalTime;
