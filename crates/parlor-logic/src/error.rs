// parlor-logic/src/error.rs
// ============================================================================
// Module: Logic Errors
// Description: Structured errors for logic-tree compilation and evaluation.
// Purpose: Surface fail-closed diagnostics without panicking.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Compilation errors reject a definition outright; evaluation errors degrade
//! a single guard or expression. Both carry enough detail to name the
//! offending operator or operand in audit output.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Compile Errors
// ============================================================================

/// Errors raised while compiling a logic tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// Serialized input exceeded the size limit.
    #[error("logic tree exceeds size limit: {actual_bytes} bytes (max {max_bytes})")]
    InputTooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual serialized size in bytes.
        actual_bytes: usize,
    },
    /// Tree nesting exceeded the depth limit.
    #[error("logic tree nesting exceeds limit: depth {actual_depth} (max {max_depth})")]
    NestingTooDeep {
        /// Maximum allowed nesting depth.
        max_depth: usize,
        /// Depth at which the limit was exceeded.
        actual_depth: usize,
    },
    /// Operator received more arguments than permitted.
    #[error("operator `{op}` exceeds argument limit: {actual} (max {max})")]
    TooManyArgs {
        /// Operator name.
        op: String,
        /// Maximum allowed argument count.
        max: usize,
        /// Actual argument count.
        actual: usize,
    },
    /// Operator name is not part of the dialect.
    #[error("unknown logic operator: {0}")]
    UnknownOperator(String),
    /// Operator received an argument count outside its arity.
    #[error("operator `{op}` expects {expected} arguments, got {actual}")]
    WrongArity {
        /// Operator name.
        op: String,
        /// Human-readable arity description.
        expected: &'static str,
        /// Actual argument count.
        actual: usize,
    },
    /// `var` argument was not a path string or `[path, default]` pair.
    #[error("invalid var reference: {0}")]
    InvalidVar(String),
}

// ============================================================================
// SECTION: Eval Errors
// ============================================================================

/// Errors raised while evaluating a compiled logic tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// An operand could not be coerced to a number.
    #[error("operand is not numeric: {0}")]
    NotANumber(String),
    /// Division or remainder by zero.
    #[error("division by zero")]
    DivisionByZero,
    /// An operand had a shape the operator cannot consume.
    #[error("operator `{op}` cannot consume operand: {detail}")]
    InvalidOperand {
        /// Operator name.
        op: &'static str,
        /// Operand description.
        detail: String,
    },
}
