// parlor-core/src/core/identifiers.rs
// ============================================================================
// Module: Parlor Identifiers
// Description: Canonical opaque identifiers for definitions, machines, and sessions.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! This module defines the canonical string-based identifiers used throughout
//! Parlor. Identifiers are opaque and serialize as strings. Validation is
//! handled at definition or runtime boundaries rather than within these
//! simple wrappers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// Declares a transparent string identifier newtype.
macro_rules! string_identifier {
    ($(#[$doc:meta])* $name:ident, $create_doc:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[doc = $create_doc]
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

string_identifier!(
    /// Game definition identifier.
    DefinitionId,
    "Creates a new definition identifier."
);

string_identifier!(
    /// Game definition version identifier.
    DefinitionVersion,
    "Creates a new definition version."
);

string_identifier!(
    /// Replicated-state class name declared by a schema.
    ClassName,
    "Creates a new class name."
);

string_identifier!(
    /// Statechart state name.
    StateName,
    "Creates a new state name."
);

string_identifier!(
    /// Event name accepted by a statechart.
    EventName,
    "Creates a new event name."
);

string_identifier!(
    /// Opaque stable identifier for one connected client within a room.
    SessionId,
    "Creates a new session identifier."
);
