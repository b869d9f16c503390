// parlor-core/src/runtime/actions.rs
// ============================================================================
// Module: Action Runtime
// Description: The whitelisted catalogue of state-mutating operations.
// Purpose: Execute rendered action descriptors against the replicated state.
// Dependencies: crate::{core, interfaces, runtime, state}, parlor-logic, serde, serde_json
// ============================================================================

//! ## Overview
//! Definitions can only mutate state through this fixed catalogue. Every
//! action's parameter tree is token-rendered against the dispatch view
//! `{event, state, context, data}` immediately before it runs, so later
//! actions in a list observe earlier writes. A misbehaving action is audited
//! and skipped; it never aborts its siblings or the room.

// ============================================================================
// SECTION: Imports
// ============================================================================

use parlor_logic::scalar_to_display;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;

use crate::core::identifiers::ClassName;
use crate::core::machine::ActionSpec;
use crate::core::machine::OneOrMany;
use crate::core::time::LogicalTime;
use crate::interfaces::Broadcaster;
use crate::interfaces::RoomAuditEvent;
use crate::interfaces::RoomAuditSink;
use crate::runtime::scheduler::ScheduledWork;
use crate::runtime::scheduler::Scheduler;
use crate::runtime::template::TemplateValue;
use crate::state::ClassTable;
use crate::state::StateValue;
use crate::state::path_get;
use crate::state::path_set;

// ============================================================================
// SECTION: Catalogue
// ============================================================================

/// Names of every action callable from definitions.
const CATALOGUE: &[&str] = &[
    "setState",
    "increment",
    "incrementIfEqual",
    "setFromData",
    "setFromArray",
    "createInstance",
    "createInstanceFromArray",
    "ensureInstanceAtPath",
    "when",
    "scheduleActions",
    "broadcast",
    "log",
];

/// Returns true when the name belongs to the action catalogue.
#[must_use]
pub fn is_catalogue_action(name: &str) -> bool {
    CATALOGUE.contains(&name)
}

// ============================================================================
// SECTION: Execution Environment
// ============================================================================

/// Mutable world an action batch executes against.
///
/// # Invariants
/// - `context` and `data` are JSON objects owned by the room and immutable
///   for the room's lifetime.
pub struct Environment<'a> {
    /// Replicated state root.
    pub state: &'a mut StateValue,
    /// Class table built from the definition's schema.
    pub classes: &'a ClassTable,
    /// Static definition data (`data.*` in views).
    pub data: &'a Value,
    /// Server-only context (`context.*` in views).
    pub context: &'a Value,
    /// Room scheduler for delayed work.
    pub scheduler: &'a mut Scheduler,
    /// Outbound broadcast surface.
    pub broadcaster: &'a dyn Broadcaster,
    /// Structured audit sink.
    pub audit: &'a dyn RoomAuditSink,
    /// Current logical time.
    pub now: LogicalTime,
}

impl Environment<'_> {
    /// Builds the dispatch view `{event, state, context, data}`.
    #[must_use]
    pub fn dispatch_view(&self, event: &Value) -> Value {
        json!({
            "event": event,
            "state": self.state.to_json(),
            "context": self.context,
            "data": self.data,
        })
    }

    /// Builds the eventless view `{state, context, data}` used by `when`.
    #[must_use]
    fn condition_view(&self) -> Value {
        json!({
            "state": self.state.to_json(),
            "context": self.context,
            "data": self.data,
        })
    }
}

// ============================================================================
// SECTION: Compiled Actions
// ============================================================================

/// Executable form of one action descriptor.
///
/// `when` and `scheduleActions` compose over nested action lists, so they
/// compile structurally; every other catalogue entry keeps its parameters as
/// a compiled template rendered at dispatch.
#[derive(Debug, Clone)]
pub enum CompiledAction {
    /// Leaf catalogue operation.
    Op {
        /// Catalogue name (unknown names are skipped at dispatch).
        name: String,
        /// Compiled parameter tree.
        params: TemplateValue,
    },
    /// Conditional branch over nested actions.
    When {
        /// Condition template; rendered, compiled, and evaluated over
        /// `{state, context, data}` at dispatch.
        cond: TemplateValue,
        /// Actions run when the condition is truthy.
        then: Vec<CompiledAction>,
        /// Actions run when the condition is falsy.
        otherwise: Vec<CompiledAction>,
    },
    /// Deferred batch on the room clock.
    Schedule {
        /// Delay template resolving to milliseconds.
        delay: TemplateValue,
        /// Actions captured for the batch.
        actions: Vec<CompiledAction>,
    },
}

/// Compiles action descriptors into executable form.
///
/// Unknown names and malformed composite parameters compile to leaf
/// operations so the skip happens at dispatch, audited, without failing the
/// definition.
#[must_use]
pub fn compile_actions(specs: &[ActionSpec]) -> Vec<CompiledAction> {
    specs.iter().map(compile_action).collect()
}

/// Compiles one action descriptor.
fn compile_action(spec: &ActionSpec) -> CompiledAction {
    match spec.kind.as_str() {
        "when" => compile_when(spec),
        "scheduleActions" => compile_schedule(spec),
        _ => leaf(spec),
    }
}

/// Compiles a `when` composite, falling back to a leaf on bad shapes.
fn compile_when(spec: &ActionSpec) -> CompiledAction {
    let cond = spec.params.get("cond").cloned().unwrap_or(Value::Bool(true));
    let Some(then) = nested_actions(spec.params.get("then")) else {
        return leaf(spec);
    };
    let Some(otherwise) = spec
        .params
        .get("else")
        .map_or(Some(Vec::new()), |raw| nested_actions(Some(raw)))
    else {
        return leaf(spec);
    };
    CompiledAction::When {
        cond: TemplateValue::compile(&cond),
        then,
        otherwise,
    }
}

/// Compiles a `scheduleActions` composite, falling back to a leaf on bad
/// shapes.
fn compile_schedule(spec: &ActionSpec) -> CompiledAction {
    let delay = spec.params.get("delayMs").cloned().unwrap_or(json!(0));
    let Some(actions) = nested_actions(spec.params.get("actions")) else {
        return leaf(spec);
    };
    CompiledAction::Schedule {
        delay: TemplateValue::compile(&delay),
        actions,
    }
}

/// Parses and compiles a nested action list parameter.
fn nested_actions(raw: Option<&Value>) -> Option<Vec<CompiledAction>> {
    let raw = raw?;
    let specs: OneOrMany<ActionSpec> = serde_json::from_value(raw.clone()).ok()?;
    Some(compile_actions(specs.as_slice()))
}

/// Compiles a leaf operation.
fn leaf(spec: &ActionSpec) -> CompiledAction {
    CompiledAction::Op {
        name: spec.kind.clone(),
        params: TemplateValue::compile(&Value::Object(spec.params.clone())),
    }
}

// ============================================================================
// SECTION: Parameter Records
// ============================================================================

/// `setState` parameters.
#[derive(Debug, Deserialize)]
struct SetStateParams {
    /// Target state path.
    path: String,
    /// Value to write (explicit null is a legitimate write).
    #[serde(default)]
    value: Value,
}

/// `increment` parameters.
#[derive(Debug, Deserialize)]
struct IncrementParams {
    /// Target state path.
    path: String,
    /// Amount added to the current value (default 1).
    #[serde(default)]
    delta: Option<Value>,
}

/// `incrementIfEqual` parameters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IncrementIfEqualParams {
    /// Target state path.
    path: String,
    /// State path compared against `value`.
    equals_path: String,
    /// Comparison value (string-compared against the state value).
    value: Value,
    /// Amount added on a match (default 1).
    #[serde(default)]
    delta: Option<Value>,
}

/// `setFromData` parameters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetFromDataParams {
    /// Target state path.
    state_path: String,
    /// Source path into the definition's static data.
    data_path: String,
}

/// `setFromArray` parameters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetFromArrayParams {
    /// Target state path.
    state_path: String,
    /// Path to an array inside the definition's static data.
    array_path: String,
    /// Optional field projected out of the selected element.
    #[serde(default)]
    key: Option<String>,
    /// Literal element index.
    #[serde(default)]
    index: Option<Value>,
    /// State path read for the element index when `index` is absent.
    #[serde(default)]
    index_state_path: Option<String>,
}

/// `createInstance` / `ensureInstanceAtPath` parameters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateInstanceParams {
    /// Class to instantiate.
    class_name: String,
    /// Target state path.
    state_path: String,
    /// Field values assigned to the new instance.
    #[serde(default)]
    data: Option<Value>,
}

/// `createInstanceFromArray` parameters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateFromArrayParams {
    /// Class to instantiate.
    class_name: String,
    /// Target state path.
    state_path: String,
    /// Path to an array inside the definition's static data.
    array_path: String,
    /// Literal element index.
    #[serde(default)]
    index: Option<Value>,
    /// State path read for the element index when `index` is absent.
    #[serde(default)]
    index_state_path: Option<String>,
}

/// `broadcast` parameters.
#[derive(Debug, Deserialize)]
struct BroadcastParams {
    /// Broadcast event name.
    event: String,
    /// Optional payload delivered to every client.
    #[serde(default)]
    data: Option<Value>,
}

/// `log` parameters.
#[derive(Debug, Deserialize)]
struct LogParams {
    /// Message rendered into the audit stream.
    #[serde(default)]
    message: Value,
}

// ============================================================================
// SECTION: Execution
// ============================================================================

/// Executes an action list in order.
///
/// Each action renders its parameters against a fresh view, so earlier
/// writes in the same list are visible to later token expansions.
pub fn execute_actions(env: &mut Environment<'_>, event: &Value, actions: &[CompiledAction]) {
    for action in actions {
        execute_action(env, event, action);
    }
}

/// Executes one compiled action.
fn execute_action(env: &mut Environment<'_>, event: &Value, action: &CompiledAction) {
    match action {
        CompiledAction::Op {
            name,
            params,
        } => {
            let rendered = params.render(&env.dispatch_view(event));
            execute_op(env, name, rendered);
        }
        CompiledAction::When {
            cond,
            then,
            otherwise,
        } => {
            let rendered = cond.render(&env.dispatch_view(event));
            let outcome = parlor_logic::compile(&rendered)
                .map_err(|err| err.to_string())
                .and_then(|node| {
                    node.evaluate_bool(&env.condition_view()).map_err(|err| err.to_string())
                });
            let branch = match outcome {
                Ok(true) => then,
                Ok(false) => otherwise,
                Err(reason) => {
                    env.audit.emit(&RoomAuditEvent::ActionSkipped {
                        action: "when".to_string(),
                        reason: format!("condition failed: {reason}"),
                    });
                    otherwise
                }
            };
            execute_actions(env, event, branch);
        }
        CompiledAction::Schedule {
            delay,
            actions,
        } => {
            let rendered = delay.render(&env.dispatch_view(event));
            let Some(delay_ms) = coerce_number(&rendered).and_then(number_to_millis) else {
                env.audit.emit(&RoomAuditEvent::ActionSkipped {
                    action: "scheduleActions".to_string(),
                    reason: format!("delayMs is not a duration: {rendered}"),
                });
                return;
            };
            let fire_at = env.now.saturating_add_millis(delay_ms);
            env.scheduler.schedule(
                fire_at,
                ScheduledWork::ActionBatch {
                    event: event.clone(),
                    actions: actions.clone(),
                },
            );
            env.audit.emit(&RoomAuditEvent::BatchScheduled {
                fire_at,
                actions: actions.len(),
            });
        }
    }
}

/// Dispatches a rendered leaf operation by catalogue name.
fn execute_op(env: &mut Environment<'_>, name: &str, rendered: Value) {
    match name {
        "setState" => match parse::<SetStateParams>(rendered) {
            Ok(params) => apply_set(env, &params.path, StateValue::from_json(&params.value)),
            Err(reason) => skip(env, name, reason),
        },
        "increment" => match parse::<IncrementParams>(rendered) {
            Ok(params) => {
                let delta = optional_number(params.delta.as_ref()).unwrap_or(1.0);
                increment_at(env, &params.path, delta);
            }
            Err(reason) => skip(env, name, reason),
        },
        "incrementIfEqual" => match parse::<IncrementIfEqualParams>(rendered) {
            Ok(params) => {
                let current = path_get(env.state, &params.equals_path)
                    .map(StateValue::to_json)
                    .and_then(|value| scalar_to_display(&value))
                    .unwrap_or_default();
                let expected = scalar_to_display(&params.value).unwrap_or_default();
                if current == expected {
                    let delta = optional_number(params.delta.as_ref()).unwrap_or(1.0);
                    increment_at(env, &params.path, delta);
                }
            }
            Err(reason) => skip(env, name, reason),
        },
        "setFromData" => match parse::<SetFromDataParams>(rendered) {
            Ok(params) => match data_lookup(env.data, &params.data_path) {
                Some(found) => {
                    let value = StateValue::from_json(&found);
                    apply_set(env, &params.state_path, value);
                }
                None => skip(env, name, format!("no data at {}", params.data_path)),
            },
            Err(reason) => skip(env, name, reason),
        },
        "setFromArray" => match parse::<SetFromArrayParams>(rendered) {
            Ok(params) => {
                let Some(element) = select_element(
                    env,
                    name,
                    &params.array_path,
                    params.index.as_ref(),
                    params.index_state_path.as_deref(),
                ) else {
                    return;
                };
                let projected = match &params.key {
                    Some(key) => element.get(key).cloned().unwrap_or(Value::Null),
                    None => element,
                };
                apply_set(env, &params.state_path, StateValue::from_json(&projected));
            }
            Err(reason) => skip(env, name, reason),
        },
        "createInstance" => match parse::<CreateInstanceParams>(rendered) {
            Ok(params) => place_instance(
                env,
                name,
                &params.class_name,
                &params.state_path,
                params.data.as_ref(),
            ),
            Err(reason) => skip(env, name, reason),
        },
        "createInstanceFromArray" => match parse::<CreateFromArrayParams>(rendered) {
            Ok(params) => {
                let Some(element) = select_element(
                    env,
                    name,
                    &params.array_path,
                    params.index.as_ref(),
                    params.index_state_path.as_deref(),
                ) else {
                    return;
                };
                place_instance(env, name, &params.class_name, &params.state_path, Some(&element));
            }
            Err(reason) => skip(env, name, reason),
        },
        "ensureInstanceAtPath" => match parse::<CreateInstanceParams>(rendered) {
            Ok(params) => {
                if matches!(path_get(env.state, &params.state_path), Some(StateValue::Instance(_)))
                {
                    return;
                }
                place_instance(
                    env,
                    name,
                    &params.class_name,
                    &params.state_path,
                    params.data.as_ref(),
                );
            }
            Err(reason) => skip(env, name, reason),
        },
        "broadcast" => match parse::<BroadcastParams>(rendered) {
            Ok(params) => {
                let data = params.data.unwrap_or(Value::Null);
                match env.broadcaster.broadcast(&params.event, &data) {
                    Ok(()) => env.audit.emit(&RoomAuditEvent::BroadcastSent {
                        event: params.event,
                    }),
                    Err(err) => env.audit.emit(&RoomAuditEvent::BroadcastFailed {
                        event: params.event,
                        reason: err.to_string(),
                    }),
                }
            }
            Err(reason) => skip(env, name, reason),
        },
        "log" => match parse::<LogParams>(rendered) {
            Ok(params) => {
                let message = scalar_to_display(&params.message)
                    .unwrap_or_else(|| params.message.to_string());
                env.audit.emit(&RoomAuditEvent::DefinitionLog {
                    message,
                });
            }
            Err(reason) => skip(env, name, reason),
        },
        // Composite names reach this arm only when their parameters failed
        // to compile structurally.
        "when" | "scheduleActions" => skip(env, name, "malformed parameters".to_string()),
        other => skip(env, other, "unknown action".to_string()),
    }
}

// ============================================================================
// SECTION: Operation Helpers
// ============================================================================

/// Parses rendered parameters into a typed record.
fn parse<P: serde::de::DeserializeOwned>(rendered: Value) -> Result<P, String> {
    serde_json::from_value(rendered).map_err(|err| format!("invalid parameters: {err}"))
}

/// Emits an action-skipped audit event.
fn skip(env: &Environment<'_>, action: &str, reason: String) {
    env.audit.emit(&RoomAuditEvent::ActionSkipped {
        action: action.to_string(),
        reason,
    });
}

/// Writes a value at a path, auditing failures.
fn apply_set(env: &mut Environment<'_>, path: &str, value: StateValue) {
    if let Err(err) = path_set(env.state, path, value) {
        env.audit.emit(&RoomAuditEvent::PathFailed {
            path: path.to_string(),
            reason: err.to_string(),
        });
    }
}

/// Adds a delta to the numeric value at a path, treating non-numbers as 0.
fn increment_at(env: &mut Environment<'_>, path: &str, delta: f64) {
    let current = path_get(env.state, path).and_then(StateValue::as_number).unwrap_or(0.0);
    apply_set(env, path, StateValue::Number(current + delta));
}

/// Reads a dotted path out of the definition's static data.
fn data_lookup(data: &Value, path: &str) -> Option<Value> {
    let mut current = data;
    for segment in path.split('.').filter(|segment| !segment.is_empty()) {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current.clone())
}

/// Selects an element from a data array by literal or state-resolved index.
fn select_element(
    env: &Environment<'_>,
    action: &str,
    array_path: &str,
    index: Option<&Value>,
    index_state_path: Option<&str>,
) -> Option<Value> {
    let Some(Value::Array(items)) = data_lookup(env.data, array_path) else {
        skip(env, action, format!("no data array at {array_path}"));
        return None;
    };
    let resolved = resolve_index(env, index, index_state_path);
    let Some(index) = resolved else {
        skip(env, action, "element index is not a number".to_string());
        return None;
    };
    match items.get(index) {
        Some(element) => Some(element.clone()),
        None => {
            skip(env, action, format!("index {index} out of range for {array_path}"));
            None
        }
    }
}

/// Resolves an element index: literal first, then a state path, then 0.
fn resolve_index(
    env: &Environment<'_>,
    index: Option<&Value>,
    index_state_path: Option<&str>,
) -> Option<usize> {
    if let Some(literal) = index {
        return coerce_number(literal).and_then(number_to_index);
    }
    if let Some(path) = index_state_path {
        return path_get(env.state, path).and_then(StateValue::as_number).and_then(number_to_index);
    }
    Some(0)
}

/// Constructs an instance, assigns declared fields, and writes it at a path.
fn place_instance(
    env: &mut Environment<'_>,
    action: &str,
    class_name: &str,
    state_path: &str,
    data: Option<&Value>,
) {
    let class = ClassName::new(class_name);
    let mut instance = match env.classes.new_instance(&class) {
        Ok(instance) => instance,
        Err(err) => {
            skip(env, action, err.to_string());
            return;
        }
    };
    if let Some(Value::Object(fields)) = data {
        for (field, value) in fields {
            // Undeclared fields are dropped; the schema fixes field sets.
            let _ = instance.assign(field, StateValue::from_json(value));
        }
    }
    apply_set(env, state_path, StateValue::Instance(instance));
}

// ============================================================================
// SECTION: Numeric Coercion
// ============================================================================

/// Coerces a rendered parameter to a number.
fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Coerces an optional rendered parameter to a number.
fn optional_number(value: Option<&Value>) -> Option<f64> {
    value.and_then(coerce_number)
}

/// Converts a non-negative integral number to a collection index.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "Bounds and integrality are checked before the cast."
)]
fn number_to_index(value: f64) -> Option<usize> {
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value < 4_294_967_296.0 {
        Some(value as usize)
    } else {
        None
    }
}

/// Converts a non-negative number to whole milliseconds.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "Bounds are checked before the cast; fractions truncate."
)]
fn number_to_millis(value: f64) -> Option<u64> {
    if value.is_finite() && value >= 0.0 && value < 9_007_199_254_740_992.0 {
        Some(value as u64)
    } else {
        None
    }
}
