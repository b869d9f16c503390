// parlor-host/src/audit.rs
// ============================================================================
// Module: Host Audit Sinks
// Description: Deployment-facing sinks for room audit events.
// Purpose: Emit structured JSON lines without a hard logging dependency.
// Dependencies: parlor-core, serde_json
// ============================================================================

//! ## Overview
//! The core emits structured audit events through a sink trait; this module
//! supplies the deployment default, a JSON-lines writer on standard error.
//! Deployments with their own pipelines implement `RoomAuditSink` directly.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io;
use std::io::Write;

use parlor_core::RoomAuditEvent;
use parlor_core::RoomAuditSink;

// ============================================================================
// SECTION: Stderr Sink
// ============================================================================

/// Sink writing one JSON line per event to standard error.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrAuditSink;

impl RoomAuditSink for StderrAuditSink {
    fn emit(&self, event: &RoomAuditEvent) {
        if let Ok(line) = serde_json::to_string(event) {
            let mut stderr = io::stderr().lock();
            let _ = writeln!(stderr, "{line}");
        }
    }
}
