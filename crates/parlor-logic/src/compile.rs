// parlor-logic/src/compile.rs
// ============================================================================
// Module: Logic Compiler
// Description: Turns authored JSON logic trees into compiled nodes.
// Purpose: Validate operators, arity, and limits once per definition.
// Dependencies: crate::{error, node}, serde_json, smallvec
// ============================================================================

//! ## Overview
//! Authored logic is untrusted definition data. Compilation enforces hard
//! limits (input size, nesting depth, operator arity) and rejects unknown
//! operators so evaluation can stay simple and total.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Value;
use smallvec::SmallVec;

use crate::error::CompileError;
use crate::node::LogicNode;
use crate::node::Operator;
use crate::node::VarPath;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum serialized input size in bytes.
const MAX_INPUT_BYTES: usize = 1024 * 1024;
/// Maximum nesting depth for compiled trees.
const MAX_NESTING: usize = 64;
/// Maximum argument count for a single operator node.
const MAX_ARGS: usize = 256;

// ============================================================================
// SECTION: Public API
// ============================================================================

/// Compiles an authored logic tree into an executable node.
///
/// A JSON object with exactly one key is an operator application; `var` is
/// the variable-dereference form. Any other value is a literal (arrays
/// compile element-wise so operator nodes inside them stay live).
///
/// # Errors
///
/// Returns [`CompileError`] when the tree exceeds limits, names an unknown
/// operator, or applies an operator outside its arity.
pub fn compile(tree: &Value) -> Result<LogicNode, CompileError> {
    let approximate_bytes = serde_json::to_string(tree).map(|s| s.len()).unwrap_or(usize::MAX);
    if approximate_bytes > MAX_INPUT_BYTES {
        return Err(CompileError::InputTooLarge {
            max_bytes: MAX_INPUT_BYTES,
            actual_bytes: approximate_bytes,
        });
    }
    compile_inner(tree, 0)
}

// ============================================================================
// SECTION: Compilation
// ============================================================================

/// Compiles one node, tracking nesting depth.
fn compile_inner(tree: &Value, depth: usize) -> Result<LogicNode, CompileError> {
    if depth > MAX_NESTING {
        return Err(CompileError::NestingTooDeep {
            max_depth: MAX_NESTING,
            actual_depth: depth,
        });
    }
    match tree {
        Value::Object(map) if map.len() == 1 => compile_operator(map, depth),
        Value::Array(items) => {
            let mut nodes = Vec::with_capacity(items.len());
            for item in items {
                nodes.push(compile_inner(item, depth + 1)?);
            }
            Ok(LogicNode::Array(nodes))
        }
        other => Ok(LogicNode::Literal(other.clone())),
    }
}

/// Compiles a single-key object as an operator application.
fn compile_operator(map: &Map<String, Value>, depth: usize) -> Result<LogicNode, CompileError> {
    let (name, raw_args) = match map.iter().next() {
        Some(entry) => entry,
        None => return Ok(LogicNode::Literal(Value::Object(map.clone()))),
    };

    if name == "var" {
        return compile_var(raw_args, depth);
    }

    let op = operator_by_name(name).ok_or_else(|| CompileError::UnknownOperator(name.clone()))?;

    // Single non-array arguments are shorthand for a one-element list.
    let arg_values: Vec<&Value> = match raw_args {
        Value::Array(items) => items.iter().collect(),
        single => vec![single],
    };
    if arg_values.len() > MAX_ARGS {
        return Err(CompileError::TooManyArgs {
            op: name.clone(),
            max: MAX_ARGS,
            actual: arg_values.len(),
        });
    }
    check_arity(op, arg_values.len())?;

    let mut args: SmallVec<[Box<LogicNode>; 4]> = SmallVec::with_capacity(arg_values.len());
    for value in arg_values {
        args.push(Box::new(compile_inner(value, depth + 1)?));
    }
    Ok(LogicNode::Op {
        op,
        args,
    })
}

/// Compiles the `var` form: a path string or a `[path, default]` pair.
fn compile_var(raw: &Value, depth: usize) -> Result<LogicNode, CompileError> {
    match raw {
        Value::String(path) => Ok(LogicNode::Var {
            path: VarPath::parse(path),
            default: None,
        }),
        Value::Array(items) => match items.as_slice() {
            [Value::String(path)] => Ok(LogicNode::Var {
                path: VarPath::parse(path),
                default: None,
            }),
            [Value::String(path), default] => Ok(LogicNode::Var {
                path: VarPath::parse(path),
                default: Some(Box::new(compile_inner(default, depth + 1)?)),
            }),
            _ => Err(CompileError::InvalidVar(raw.to_string())),
        },
        _ => Err(CompileError::InvalidVar(raw.to_string())),
    }
}

/// Maps an operator name to its compiled kind.
fn operator_by_name(name: &str) -> Option<Operator> {
    match name {
        "==" => Some(Operator::LooseEq),
        "!=" => Some(Operator::LooseNe),
        "===" => Some(Operator::StrictEq),
        "!==" => Some(Operator::StrictNe),
        "<" => Some(Operator::Lt),
        "<=" => Some(Operator::Le),
        ">" => Some(Operator::Gt),
        ">=" => Some(Operator::Ge),
        "and" => Some(Operator::And),
        "or" => Some(Operator::Or),
        "!" => Some(Operator::Not),
        "!!" => Some(Operator::ToBool),
        "+" => Some(Operator::Add),
        "-" => Some(Operator::Sub),
        "*" => Some(Operator::Mul),
        "/" => Some(Operator::Div),
        "%" => Some(Operator::Rem),
        "in" => Some(Operator::In),
        "if" => Some(Operator::If),
        _ => None,
    }
}

/// Validates the argument count for an operator.
fn check_arity(op: Operator, actual: usize) -> Result<(), CompileError> {
    let ok = match op {
        Operator::Not | Operator::ToBool => actual == 1,
        Operator::LooseEq
        | Operator::LooseNe
        | Operator::StrictEq
        | Operator::StrictNe
        | Operator::Gt
        | Operator::Ge
        | Operator::Div
        | Operator::Rem
        | Operator::In => actual == 2,
        Operator::Lt | Operator::Le => actual == 2 || actual == 3,
        Operator::Sub => actual == 1 || actual == 2,
        Operator::And | Operator::Or | Operator::Add | Operator::Mul => actual >= 1,
        Operator::If => actual >= 2,
    };
    if ok {
        Ok(())
    } else {
        Err(CompileError::WrongArity {
            op: op.name().to_string(),
            expected: arity_description(op),
            actual,
        })
    }
}

/// Human-readable arity description for diagnostics.
const fn arity_description(op: Operator) -> &'static str {
    match op {
        Operator::Not | Operator::ToBool => "exactly 1",
        Operator::LooseEq
        | Operator::LooseNe
        | Operator::StrictEq
        | Operator::StrictNe
        | Operator::Gt
        | Operator::Ge
        | Operator::Div
        | Operator::Rem
        | Operator::In => "exactly 2",
        Operator::Lt | Operator::Le => "2 or 3",
        Operator::Sub => "1 or 2",
        Operator::And | Operator::Or | Operator::Add | Operator::Mul => "at least 1",
        Operator::If => "at least 2",
    }
}
