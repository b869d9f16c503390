// parlor-core/src/runtime/template.rs
// ============================================================================
// Module: Token Templates
// Description: `${dotted.path}` placeholder expansion for action parameters.
// Purpose: Compile parameter trees once, render them per dispatch.
// Dependencies: crate::runtime (none), parlor-logic, serde_json
// ============================================================================

//! ## Overview
//! Action parameters may embed `${dotted.path}` placeholders resolved
//! against the dispatch view `{event, state, context, data}`. Parameter
//! trees compile once per definition into [`TemplateValue`] so rendering
//! never re-scans strings. A string that is exactly one placeholder keeps
//! the resolved value's type; mixed strings interpolate scalars and render
//! unresolved or non-scalar pieces as the empty string. Rendering is a pure
//! function of the view.

// ============================================================================
// SECTION: Imports
// ============================================================================

use parlor_logic::VarPath;
use parlor_logic::scalar_to_display;
use serde_json::Map;
use serde_json::Value;

// ============================================================================
// SECTION: Compiled Templates
// ============================================================================

/// One piece of a compiled template string.
#[derive(Debug, Clone, PartialEq)]
enum Segment {
    /// Literal text copied through.
    Literal(String),
    /// Placeholder resolved against the view.
    Placeholder(VarPath),
}

/// Compiled template string.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    /// Ordered literal and placeholder segments.
    segments: Vec<Segment>,
}

impl Template {
    /// Parses a string, returning `None` when it contains no placeholders.
    ///
    /// An unterminated `${` is treated as literal text.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let mut segments = Vec::new();
        let mut rest = input;
        let mut saw_placeholder = false;

        while let Some(start) = rest.find("${") {
            let Some(end) = rest[start + 2..].find('}') else {
                break;
            };
            if start > 0 {
                segments.push(Segment::Literal(rest[..start].to_string()));
            }
            let expr = &rest[start + 2..start + 2 + end];
            segments.push(Segment::Placeholder(VarPath::parse(expr)));
            saw_placeholder = true;
            rest = &rest[start + 2 + end + 1..];
        }
        if !saw_placeholder {
            return None;
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }
        Some(Self {
            segments,
        })
    }

    /// Renders the template against a view.
    ///
    /// A whole-string placeholder keeps the resolved value's type; everything
    /// else renders to a string.
    #[must_use]
    pub fn render(&self, view: &Value) -> Value {
        if let [Segment::Placeholder(path)] = self.segments.as_slice() {
            return match lookup(view, path) {
                Some(Value::Null) | None => Value::String(String::new()),
                Some(found) => found.clone(),
            };
        }

        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(path) => {
                    if let Some(found) = lookup(view, path)
                        && let Some(text) = scalar_to_display(found)
                    {
                        out.push_str(&text);
                    }
                }
            }
        }
        Value::String(out)
    }
}

// ============================================================================
// SECTION: Compiled Parameter Trees
// ============================================================================

/// Compiled form of an action parameter tree.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateValue {
    /// Subtree without placeholders, passed through by clone.
    Literal(Value),
    /// String with placeholders.
    Text(Template),
    /// Array with at least one templated element.
    Array(Vec<TemplateValue>),
    /// Object with at least one templated member.
    Object(Vec<(String, TemplateValue)>),
}

impl TemplateValue {
    /// Compiles a parameter tree, collapsing placeholder-free subtrees.
    #[must_use]
    pub fn compile(value: &Value) -> Self {
        match value {
            Value::String(text) => match Template::parse(text) {
                Some(template) => Self::Text(template),
                None => Self::Literal(value.clone()),
            },
            Value::Array(items) => {
                let compiled: Vec<Self> = items.iter().map(Self::compile).collect();
                if compiled.iter().all(|item| matches!(item, Self::Literal(_))) {
                    Self::Literal(value.clone())
                } else {
                    Self::Array(compiled)
                }
            }
            Value::Object(map) => {
                let compiled: Vec<(String, Self)> =
                    map.iter().map(|(key, item)| (key.clone(), Self::compile(item))).collect();
                if compiled.iter().all(|(_, item)| matches!(item, Self::Literal(_))) {
                    Self::Literal(value.clone())
                } else {
                    Self::Object(compiled)
                }
            }
            other => Self::Literal(other.clone()),
        }
    }

    /// Renders the compiled tree against a view.
    #[must_use]
    pub fn render(&self, view: &Value) -> Value {
        match self {
            Self::Literal(value) => value.clone(),
            Self::Text(template) => template.render(view),
            Self::Array(items) => Value::Array(items.iter().map(|item| item.render(view)).collect()),
            Self::Object(members) => {
                let mut map = Map::with_capacity(members.len());
                for (key, item) in members {
                    map.insert(key.clone(), item.render(view));
                }
                Value::Object(map)
            }
        }
    }
}

// ============================================================================
// SECTION: One-Shot Rendering
// ============================================================================

/// Renders a raw value tree against a view in one pass.
///
/// Equivalent to compiling and immediately rendering; useful for parameter
/// trees that only exist at dispatch time.
#[must_use]
pub fn render_tokens(value: &Value, view: &Value) -> Value {
    TemplateValue::compile(value).render(view)
}

// ============================================================================
// SECTION: View Lookup
// ============================================================================

/// Resolves a placeholder path against the view.
fn lookup<'a>(view: &'a Value, path: &VarPath) -> Option<&'a Value> {
    let mut current = view;
    for segment in path.segments() {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}
