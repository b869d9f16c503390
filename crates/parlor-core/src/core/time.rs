// parlor-core/src/core/time.rs
// ============================================================================
// Module: Parlor Time Model
// Description: Logical clock values for room scheduling.
// Purpose: Provide deterministic, replayable time across room runtimes.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Rooms run on a logical clock measured in milliseconds. The core never
//! reads wall-clock time; the host advances the clock explicitly, which keeps
//! event handling and scheduled batches deterministic and testable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Logical Time
// ============================================================================

/// Logical room time in milliseconds.
///
/// # Invariants
/// - Values are explicitly supplied by the host; monotonicity is a host
///   responsibility and the scheduler tolerates repeats.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct LogicalTime(u64);

impl LogicalTime {
    /// Time zero, the instant a room is created.
    pub const ZERO: Self = Self(0);

    /// Creates a logical time from milliseconds.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Returns the time as milliseconds.
    #[must_use]
    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    /// Returns this time advanced by a delay, saturating on overflow.
    #[must_use]
    pub const fn saturating_add_millis(&self, delay_ms: u64) -> Self {
        Self(self.0.saturating_add(delay_ms))
    }
}

impl fmt::Display for LogicalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}
