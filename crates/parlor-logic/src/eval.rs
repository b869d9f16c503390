// parlor-logic/src/eval.rs
// ============================================================================
// Module: Logic Evaluation
// Description: Executes compiled logic nodes over plain JSON views.
// Purpose: Provide total, coercion-aware evaluation with fail-closed errors.
// Dependencies: crate::{error, node}, serde_json
// ============================================================================

//! ## Overview
//! Evaluation follows the semantics of the dialect the definitions are
//! authored in: loose equality coerces numbers and strings, truthiness is
//! JS-shaped, `and`/`or` return the deciding operand. Errors never panic;
//! guard call sites absorb them as `false`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;

use crate::error::EvalError;
use crate::node::LogicNode;
use crate::node::Operator;
use crate::node::VarPath;

// ============================================================================
// SECTION: Public API
// ============================================================================

impl LogicNode {
    /// Evaluates the node against a view, producing a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError`] on non-numeric arithmetic operands, division by
    /// zero, or operands an operator cannot consume.
    pub fn evaluate(&self, view: &Value) -> Result<Value, EvalError> {
        match self {
            Self::Literal(value) => Ok(value.clone()),
            Self::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(item.evaluate(view)?);
                }
                Ok(Value::Array(out))
            }
            Self::Var {
                path,
                default,
            } => resolve_var(path, default.as_deref(), view),
            Self::Op {
                op,
                args,
            } => apply(*op, args, view),
        }
    }

    /// Evaluates the node and reduces the result to its truthiness.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError`] when the underlying evaluation fails.
    pub fn evaluate_bool(&self, view: &Value) -> Result<bool, EvalError> {
        Ok(truthy(&self.evaluate(view)?))
    }
}

/// JS-shaped truthiness: `false`, `0`, `NaN`, `""`, and `null` are falsy.
///
/// Arrays and objects are always truthy, including empty ones.
#[must_use]
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Renders a scalar value the way string interpolation displays it.
///
/// Integral numbers drop the trailing `.0`; non-scalar values return `None`.
#[must_use]
pub fn scalar_to_display(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(format_number(n.as_f64().unwrap_or(f64::NAN))),
        Value::String(s) => Some(s.clone()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

// ============================================================================
// SECTION: Variable Resolution
// ============================================================================

/// Resolves a `var` dereference, falling back to the default expression.
fn resolve_var(
    path: &VarPath,
    default: Option<&LogicNode>,
    view: &Value,
) -> Result<Value, EvalError> {
    if path.is_root() {
        return Ok(view.clone());
    }
    let mut current = view;
    for segment in path.segments() {
        let next = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        match next {
            Some(value) => current = value,
            None => {
                return match default {
                    Some(node) => node.evaluate(view),
                    None => Ok(Value::Null),
                };
            }
        }
    }
    Ok(current.clone())
}

// ============================================================================
// SECTION: Operator Application
// ============================================================================

/// Applies an operator to compiled arguments.
fn apply(op: Operator, args: &[Box<LogicNode>], view: &Value) -> Result<Value, EvalError> {
    match op {
        Operator::LooseEq => {
            let (a, b) = eval_pair(args, view)?;
            Ok(Value::Bool(loose_eq(&a, &b)))
        }
        Operator::LooseNe => {
            let (a, b) = eval_pair(args, view)?;
            Ok(Value::Bool(!loose_eq(&a, &b)))
        }
        Operator::StrictEq => {
            let (a, b) = eval_pair(args, view)?;
            Ok(Value::Bool(strict_eq(&a, &b)))
        }
        Operator::StrictNe => {
            let (a, b) = eval_pair(args, view)?;
            Ok(Value::Bool(!strict_eq(&a, &b)))
        }
        Operator::Lt => compare(args, view, |a, b| a < b),
        Operator::Le => compare(args, view, |a, b| a <= b),
        Operator::Gt => compare(args, view, |a, b| a > b),
        Operator::Ge => compare(args, view, |a, b| a >= b),
        Operator::And => {
            let mut last = Value::Bool(true);
            for arg in args {
                last = arg.evaluate(view)?;
                if !truthy(&last) {
                    return Ok(last);
                }
            }
            Ok(last)
        }
        Operator::Or => {
            let mut last = Value::Bool(false);
            for arg in args {
                last = arg.evaluate(view)?;
                if truthy(&last) {
                    return Ok(last);
                }
            }
            Ok(last)
        }
        Operator::Not => {
            let value = eval_single(args, view)?;
            Ok(Value::Bool(!truthy(&value)))
        }
        Operator::ToBool => {
            let value = eval_single(args, view)?;
            Ok(Value::Bool(truthy(&value)))
        }
        Operator::Add => {
            let mut sum = 0.0;
            for arg in args {
                sum += to_number(&arg.evaluate(view)?)?;
            }
            Ok(number(sum))
        }
        Operator::Sub => {
            if args.len() == 1 {
                let value = to_number(&eval_single(args, view)?)?;
                return Ok(number(-value));
            }
            let (a, b) = eval_pair(args, view)?;
            Ok(number(to_number(&a)? - to_number(&b)?))
        }
        Operator::Mul => {
            let mut product = 1.0;
            for arg in args {
                product *= to_number(&arg.evaluate(view)?)?;
            }
            Ok(number(product))
        }
        Operator::Div => {
            let (a, b) = eval_pair(args, view)?;
            let divisor = to_number(&b)?;
            if divisor == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            Ok(number(to_number(&a)? / divisor))
        }
        Operator::Rem => {
            let (a, b) = eval_pair(args, view)?;
            let divisor = to_number(&b)?;
            if divisor == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            Ok(number(to_number(&a)? % divisor))
        }
        Operator::In => {
            let (needle, haystack) = eval_pair(args, view)?;
            membership(&needle, &haystack)
        }
        Operator::If => {
            let mut index = 0;
            while index + 1 < args.len() {
                if truthy(&args[index].evaluate(view)?) {
                    return args[index + 1].evaluate(view);
                }
                index += 2;
            }
            match args.get(index) {
                Some(fallback) => fallback.evaluate(view),
                None => Ok(Value::Null),
            }
        }
    }
}

/// Evaluates a single-argument operator's operand.
fn eval_single(args: &[Box<LogicNode>], view: &Value) -> Result<Value, EvalError> {
    match args.first() {
        Some(arg) => arg.evaluate(view),
        None => Ok(Value::Null),
    }
}

/// Evaluates the first two operands of a binary operator.
fn eval_pair(args: &[Box<LogicNode>], view: &Value) -> Result<(Value, Value), EvalError> {
    let a = match args.first() {
        Some(arg) => arg.evaluate(view)?,
        None => Value::Null,
    };
    let b = match args.get(1) {
        Some(arg) => arg.evaluate(view)?,
        None => Value::Null,
    };
    Ok((a, b))
}

/// Numeric comparison; the three-argument form checks a between-range.
fn compare(
    args: &[Box<LogicNode>],
    view: &Value,
    cmp: fn(f64, f64) -> bool,
) -> Result<Value, EvalError> {
    let (a, b) = eval_pair(args, view)?;
    let left = to_number(&a)?;
    let middle = to_number(&b)?;
    if !cmp(left, middle) {
        return Ok(Value::Bool(false));
    }
    if let Some(third) = args.get(2) {
        let right = to_number(&third.evaluate(view)?)?;
        return Ok(Value::Bool(cmp(middle, right)));
    }
    Ok(Value::Bool(true))
}

// ============================================================================
// SECTION: Coercions
// ============================================================================

/// Strict equality: same JSON type required; numbers compare numerically so
/// integral and floating representations of the same value agree.
fn strict_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(fx), Some(fy)) => fx == fy,
            _ => x == y,
        },
        _ => a == b,
    }
}

/// Loose equality: scalars coerce across number/string/bool; composites
/// compare structurally.
fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Array(_) | Value::Object(_), _) | (_, Value::Array(_) | Value::Object(_)) => a == b,
        _ => match (to_number(a), to_number(b)) {
            (Ok(x), Ok(y)) => x == y,
            _ => false,
        },
    }
}

/// Coerces a value to a number: bools become 0/1, strings parse (empty is 0),
/// null is 0.
fn to_number(value: &Value) -> Result<f64, EvalError> {
    match value {
        Value::Null => Ok(0.0),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => n.as_f64().ok_or_else(|| EvalError::NotANumber(n.to_string())),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(0.0);
            }
            trimmed.parse::<f64>().map_err(|_| EvalError::NotANumber(s.clone()))
        }
        other => Err(EvalError::NotANumber(other.to_string())),
    }
}

/// Wraps an f64 into a JSON number, collapsing non-finite results to null.
fn number(value: f64) -> Value {
    serde_json::Number::from_f64(value).map_or(Value::Null, Value::Number)
}

/// Formats a number the way interpolation displays it.
fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.fract() == 0.0 && value.abs() < 9_007_199_254_740_992.0 {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "Integral check and magnitude bound keep the cast exact."
        )]
        let whole = value as i64;
        return whole.to_string();
    }
    format!("{value}")
}

/// Membership: substring when the haystack is a string, element equality when
/// it is an array.
fn membership(needle: &Value, haystack: &Value) -> Result<Value, EvalError> {
    match haystack {
        Value::String(text) => {
            let probe = scalar_to_display(needle).ok_or_else(|| EvalError::InvalidOperand {
                op: "in",
                detail: "needle is not a scalar".to_string(),
            })?;
            Ok(Value::Bool(text.contains(&probe)))
        }
        Value::Array(items) => Ok(Value::Bool(items.iter().any(|item| strict_eq(item, needle)))),
        other => Err(EvalError::InvalidOperand {
            op: "in",
            detail: format!("haystack is not a string or array: {other}"),
        }),
    }
}
