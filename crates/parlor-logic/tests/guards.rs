// parlor-logic/tests/guards.rs
// ============================================================================
// Module: Guard Evaluation Tests
// Description: Public-API checks for guard-shaped logic trees.
// Purpose: Validate fail-closed behavior through the crate surface.
// Dependencies: parlor-logic, serde_json
// ============================================================================

//! ## Overview
//! Exercises the public compile/evaluate surface the way guard call sites
//! use it: compile once, evaluate over view snapshots, absorb errors as
//! false.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_docs_in_private_items,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use parlor_logic::CompileError;
use parlor_logic::compile;
use serde_json::json;

#[test]
fn compiled_guards_are_reusable_across_views() {
    let guard = compile(&json!({">=": [{"var": "state.count"}, 3]})).unwrap();
    assert!(!guard.evaluate_bool(&json!({"state": {"count": 2}})).unwrap());
    assert!(guard.evaluate_bool(&json!({"state": {"count": 3}})).unwrap());
    assert!(guard.evaluate_bool(&json!({"state": {"count": 9}})).unwrap());
}

#[test]
fn guard_call_sites_can_absorb_errors_as_false() {
    let guard = compile(&json!({"/": [{"var": "state.count"}, 0]})).unwrap();
    let outcome = guard.evaluate_bool(&json!({"state": {"count": 1}})).unwrap_or(false);
    assert!(!outcome);
}

#[test]
fn malformed_trees_fail_compilation_not_evaluation() {
    assert!(matches!(
        compile(&json!({"teleport": [1]})),
        Err(CompileError::UnknownOperator(_))
    ));
    assert!(matches!(
        compile(&json!({"var": 42})),
        Err(CompileError::InvalidVar(_))
    ));
}

#[test]
fn missing_view_slices_read_as_null() {
    let guard = compile(&json!({"==": [{"var": "event.value"}, null]})).unwrap();
    assert!(guard.evaluate_bool(&json!({})).unwrap());
}
