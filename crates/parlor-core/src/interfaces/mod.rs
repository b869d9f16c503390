// parlor-core/src/interfaces/mod.rs
// ============================================================================
// Module: Parlor Interfaces
// Description: Backend-agnostic interfaces for broadcasting and audit.
// Purpose: Define the contract surfaces used by the room runtime.
// Dependencies: crate::core, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Interfaces define how a room integrates with its surrounding framework
//! without embedding transport details. The core emits structured audit
//! events through a sink trait rather than a global logger, so deployments
//! route diagnostics to their preferred pipeline without redesign.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::identifiers::DefinitionId;
use crate::core::identifiers::EventName;
use crate::core::identifiers::SessionId;
use crate::core::identifiers::StateName;
use crate::core::time::LogicalTime;

// ============================================================================
// SECTION: Broadcaster
// ============================================================================

/// Broadcast errors for client delivery.
#[derive(Debug, Error)]
pub enum BroadcastError {
    /// Broadcaster reported an error.
    #[error("broadcast error: {0}")]
    Delivery(String),
}

/// Outbound message fan-out to every connected client.
pub trait Broadcaster {
    /// Emits an event to all clients of the room.
    ///
    /// # Errors
    ///
    /// Returns [`BroadcastError`] when delivery fails.
    fn broadcast(&self, event: &str, data: &Value) -> Result<(), BroadcastError>;
}

/// Broadcaster that drops every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBroadcaster;

impl Broadcaster for NoopBroadcaster {
    fn broadcast(&self, _event: &str, _data: &Value) -> Result<(), BroadcastError> {
        Ok(())
    }
}

/// Broadcaster that records messages in memory, for tests and replay.
#[derive(Debug, Default)]
pub struct MemoryBroadcaster {
    /// Recorded `(event, data)` pairs.
    messages: Mutex<Vec<(String, Value)>>,
}

impl MemoryBroadcaster {
    /// Creates an empty recording broadcaster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains and returns the recorded messages.
    #[must_use]
    pub fn take(&self) -> Vec<(String, Value)> {
        self.messages.lock().map(|mut guard| std::mem::take(&mut *guard)).unwrap_or_default()
    }
}

impl Broadcaster for MemoryBroadcaster {
    fn broadcast(&self, event: &str, data: &Value) -> Result<(), BroadcastError> {
        if let Ok(mut guard) = self.messages.lock() {
            guard.push((event.to_string(), data.clone()));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Audit Events
// ============================================================================

/// Structured audit events emitted by the room runtime.
///
/// # Invariants
/// - Events never contain client-identifying data beyond session ids.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RoomAuditEvent {
    /// Room bound a definition and started.
    RoomCreated {
        /// Definition identifier.
        definition_id: DefinitionId,
        /// Canonical definition digest (hex).
        definition_hash: String,
    },
    /// Inbound event forwarded to the interpreter.
    EventDispatched {
        /// Sender session, when the event came from a client.
        session_id: Option<SessionId>,
        /// Event name.
        #[serde(rename = "event_name")]
        event: EventName,
    },
    /// Inbound event dropped without dispatch.
    EventDropped {
        /// Event name as received.
        #[serde(rename = "event_name")]
        event: String,
        /// Drop reason.
        reason: String,
    },
    /// Transition selected and executed.
    TransitionTaken {
        /// Source state.
        from: StateName,
        /// Target state, when the transition was external.
        to: Option<StateName>,
        /// Triggering event name.
        #[serde(rename = "event_name")]
        event: String,
    },
    /// Guard evaluation failed; the candidate was treated as false.
    GuardFailed {
        /// State owning the transition.
        state: StateName,
        /// Evaluation diagnostic.
        reason: String,
    },
    /// Action skipped (unknown name or unusable parameters).
    ActionSkipped {
        /// Action name.
        action: String,
        /// Skip reason.
        reason: String,
    },
    /// State write failed; the action was dropped.
    PathFailed {
        /// Dotted path that failed.
        path: String,
        /// Failure diagnostic.
        reason: String,
    },
    /// Action batch scheduled on the logical clock.
    BatchScheduled {
        /// Fire time on the room clock.
        fire_at: LogicalTime,
        /// Number of actions in the batch.
        actions: usize,
    },
    /// Scheduled work fired.
    BatchFired {
        /// Fire time on the room clock.
        fire_at: LogicalTime,
    },
    /// Broadcast emitted to clients.
    BroadcastSent {
        /// Broadcast event name.
        #[serde(rename = "event_name")]
        event: String,
    },
    /// Broadcast delivery failed.
    BroadcastFailed {
        /// Broadcast event name.
        #[serde(rename = "event_name")]
        event: String,
        /// Failure diagnostic.
        reason: String,
    },
    /// Definition-authored `log` action output.
    DefinitionLog {
        /// Rendered log message.
        message: String,
    },
    /// Player inserted into the roster.
    PlayerJoined {
        /// Joining session.
        session_id: SessionId,
        /// Whether the join was an idempotent rejoin.
        rejoined: bool,
    },
    /// Player removed from the roster.
    PlayerLeft {
        /// Leaving session.
        session_id: SessionId,
    },
    /// Room disposed; pending scheduled work cancelled.
    RoomDisposed {
        /// Scheduled entries cancelled at disposal.
        cancelled: usize,
    },
}

// ============================================================================
// SECTION: Audit Sinks
// ============================================================================

/// Sink for structured room audit events.
pub trait RoomAuditSink {
    /// Consumes one audit event.
    fn emit(&self, event: &RoomAuditEvent);
}

/// Sink that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuditSink;

impl RoomAuditSink for NoopAuditSink {
    fn emit(&self, _event: &RoomAuditEvent) {}
}

/// Sink that records events in memory, for tests.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    /// Recorded events in emission order.
    events: Mutex<Vec<RoomAuditEvent>>,
}

impl MemoryAuditSink {
    /// Creates an empty recording sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains and returns the recorded events.
    #[must_use]
    pub fn take(&self) -> Vec<RoomAuditEvent> {
        self.events.lock().map(|mut guard| std::mem::take(&mut *guard)).unwrap_or_default()
    }
}

impl RoomAuditSink for MemoryAuditSink {
    fn emit(&self, event: &RoomAuditEvent) {
        if let Ok(mut guard) = self.events.lock() {
            guard.push(event.clone());
        }
    }
}
