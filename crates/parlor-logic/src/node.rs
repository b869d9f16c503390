// parlor-logic/src/node.rs
// ============================================================================
// Module: Logic Node Model
// Description: Compiled representation of logic trees.
// Purpose: Define the executable intermediate form produced by compilation.
// Dependencies: serde_json, smallvec
// ============================================================================

//! ## Overview
//! Logic trees are compiled once per definition into [`LogicNode`] values so
//! evaluation never re-parses JSON. Operator children use inline small
//! vectors since authored trees are shallow and narrow in practice.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde_json::Value;
use smallvec::SmallVec;

// ============================================================================
// SECTION: Variable Paths
// ============================================================================

/// Pre-split dotted path used by `var` dereferences.
///
/// # Invariants
/// - Segments contain no dots and are never empty; empty segments are dropped
///   at compile time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarPath {
    /// Ordered path segments.
    segments: Vec<String>,
}

impl VarPath {
    /// Splits a dotted path string into segments, dropping empty segments.
    #[must_use]
    pub fn parse(path: &str) -> Self {
        Self {
            segments: path.split('.').filter(|s| !s.is_empty()).map(str::to_string).collect(),
        }
    }

    /// Returns the path segments in order.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Returns true when the path has no segments (the whole-view reference).
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for VarPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

// ============================================================================
// SECTION: Operators
// ============================================================================

/// Operators of the logic dialect.
///
/// # Invariants
/// - Arity is validated at compile time; evaluation may assume the compiled
///   argument counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Loose equality with numeric coercion (`==`).
    LooseEq,
    /// Loose inequality (`!=`).
    LooseNe,
    /// Strict structural equality (`===`).
    StrictEq,
    /// Strict structural inequality (`!==`).
    StrictNe,
    /// Numeric less-than, or three-argument between (`<`).
    Lt,
    /// Numeric less-or-equal, or three-argument between (`<=`).
    Le,
    /// Numeric greater-than (`>`).
    Gt,
    /// Numeric greater-or-equal (`>=`).
    Ge,
    /// Short-circuit conjunction returning the deciding operand (`and`).
    And,
    /// Short-circuit disjunction returning the deciding operand (`or`).
    Or,
    /// Logical negation (`!`).
    Not,
    /// Double negation to a boolean (`!!`).
    ToBool,
    /// Variadic addition; single-argument form is a numeric cast (`+`).
    Add,
    /// Subtraction; single-argument form is negation (`-`).
    Sub,
    /// Variadic multiplication (`*`).
    Mul,
    /// Division (`/`).
    Div,
    /// Remainder (`%`).
    Rem,
    /// Substring or array membership (`in`).
    In,
    /// Condition chains (`if`).
    If,
}

impl Operator {
    /// Returns the dialect name of the operator.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::LooseEq => "==",
            Self::LooseNe => "!=",
            Self::StrictEq => "===",
            Self::StrictNe => "!==",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::And => "and",
            Self::Or => "or",
            Self::Not => "!",
            Self::ToBool => "!!",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::In => "in",
            Self::If => "if",
        }
    }
}

// ============================================================================
// SECTION: Compiled Nodes
// ============================================================================

/// Compiled logic-tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum LogicNode {
    /// Literal JSON value passed through unchanged.
    Literal(Value),
    /// Array whose elements are themselves compiled nodes.
    Array(Vec<LogicNode>),
    /// Variable dereference against the view.
    Var {
        /// Dotted path into the view.
        path: VarPath,
        /// Fallback expression evaluated when the path misses.
        default: Option<Box<LogicNode>>,
    },
    /// Operator application.
    Op {
        /// Operator kind.
        op: Operator,
        /// Compiled argument nodes.
        args: SmallVec<[Box<LogicNode>; 4]>,
    },
}
