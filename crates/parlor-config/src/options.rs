// parlor-config/src/options.rs
// ============================================================================
// Module: Room Options
// Description: Creation options supplied when a room is opened.
// Purpose: Carry definition selection and opaque per-room configuration.
// Dependencies: parlor-core, serde, serde_json
// ============================================================================

//! ## Overview
//! Room options select which definition a room binds (inline value or a
//! definition id resolvable by the loader) and carry opaque per-room
//! configuration surfaced to guards and actions under `context.config`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use parlor_core::DefinitionId;
use parlor_core::DefinitionVersion;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Room Options
// ============================================================================

/// Options supplied at room creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomOptions {
    /// Owning project identifier (informational).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Definition identifier resolved by the loader when no inline
    /// definition is supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition_id: Option<DefinitionId>,
    /// Requested definition version (informational).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<DefinitionVersion>,
    /// Full definition supplied inline; takes precedence over
    /// `definition_id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<Value>,
    /// Opaque per-room configuration surfaced at `context.config`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
}

impl RoomOptions {
    /// Creates options binding an inline definition.
    #[must_use]
    pub fn with_definition(definition: Value) -> Self {
        Self {
            definition: Some(definition),
            ..Self::default()
        }
    }

    /// Creates options resolving a definition by identifier.
    #[must_use]
    pub fn with_definition_id(definition_id: impl Into<DefinitionId>) -> Self {
        Self {
            definition_id: Some(definition_id.into()),
            ..Self::default()
        }
    }
}
