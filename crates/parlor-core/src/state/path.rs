// parlor-core/src/state/path.rs
// ============================================================================
// Module: Path Resolution
// Description: Dotted-path reads and writes over the state graph.
// Purpose: Navigate records and keyed collections uniformly.
// Dependencies: crate::state::value, thiserror
// ============================================================================

//! ## Overview
//! Dotted paths address the replicated state uniformly: instance hops use
//! declared field slots, keyed-collection hops use map entries, and ordered
//! collections accept numeric segments. Writes create empty records for
//! missing intermediates so `players.<sid>.score` resolves the same way in
//! action parameters and logic views. Empty segments are ignored, and an
//! entirely empty path is a read of the root or a write no-op.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::state::value::StateValue;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Path resolution errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// A hop landed on a scalar that cannot be descended into.
    #[error("cannot descend into scalar at segment: {segment}")]
    NotAContainer {
        /// Offending path segment.
        segment: String,
    },
    /// An instance hop named an undeclared field.
    #[error("class `{class}` declares no field: {field}")]
    UndeclaredField {
        /// Instance class name.
        class: String,
        /// Undeclared field name.
        field: String,
    },
    /// An array hop was not a numeric index.
    #[error("array segment is not an index: {segment}")]
    BadIndex {
        /// Offending path segment.
        segment: String,
    },
    /// An array write index was outside `0..=len`.
    #[error("array index {index} out of range (len {len})")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Collection length.
        len: usize,
    },
}

// ============================================================================
// SECTION: Reads
// ============================================================================

/// Reads the value at a dotted path, or `None` when any hop misses.
#[must_use]
pub fn path_get<'a>(root: &'a StateValue, path: &str) -> Option<&'a StateValue> {
    let mut current = root;
    for segment in segments(path) {
        current = match current {
            StateValue::Instance(instance) => instance.field(segment)?,
            StateValue::Map(map) => map.get(segment)?,
            StateValue::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

// ============================================================================
// SECTION: Writes
// ============================================================================

/// Writes a value at a dotted path, creating missing intermediate records.
///
/// An empty path is a no-op. Missing intermediates become empty records:
/// keyed collections gain an entry, unset instance fields are populated, and
/// descending into a scalar is an error.
///
/// # Errors
///
/// Returns [`PathError`] when a hop violates the graph shape.
pub fn path_set(root: &mut StateValue, path: &str, value: StateValue) -> Result<(), PathError> {
    let parts: Vec<&str> = segments(path).collect();
    let Some((last, intermediate)) = parts.split_last() else {
        return Ok(());
    };

    let mut current = root;
    for segment in intermediate {
        current = descend_mut(current, segment)?;
    }
    write_leaf(current, last, value)
}

/// Descends one hop mutably, creating empty records where permitted.
fn descend_mut<'a>(
    current: &'a mut StateValue,
    segment: &str,
) -> Result<&'a mut StateValue, PathError> {
    match current {
        StateValue::Instance(instance) => {
            let class = instance.class().to_string();
            let slot = instance.field_mut(segment).ok_or_else(|| PathError::UndeclaredField {
                class,
                field: segment.to_string(),
            })?;
            ensure_container(slot, segment)
        }
        StateValue::Map(map) => {
            let slot = map.entry(segment.to_string()).or_insert_with(StateValue::empty_map);
            ensure_container(slot, segment)
        }
        StateValue::Array(items) => {
            let index = segment.parse::<usize>().map_err(|_| PathError::BadIndex {
                segment: segment.to_string(),
            })?;
            let len = items.len();
            let slot = items.get_mut(index).ok_or(PathError::IndexOutOfRange {
                index,
                len,
            })?;
            ensure_container(slot, segment)
        }
        _ => Err(PathError::NotAContainer {
            segment: segment.to_string(),
        }),
    }
}

/// Turns an unset slot into an empty record and rejects scalars.
fn ensure_container<'a>(
    slot: &'a mut StateValue,
    segment: &str,
) -> Result<&'a mut StateValue, PathError> {
    if matches!(slot, StateValue::Null) {
        *slot = StateValue::empty_map();
    }
    if slot.is_scalar() {
        return Err(PathError::NotAContainer {
            segment: segment.to_string(),
        });
    }
    Ok(slot)
}

/// Writes the final segment.
fn write_leaf(parent: &mut StateValue, segment: &str, value: StateValue) -> Result<(), PathError> {
    match parent {
        StateValue::Instance(instance) => {
            let class = instance.class().to_string();
            if instance.assign(segment, value) {
                Ok(())
            } else {
                Err(PathError::UndeclaredField {
                    class,
                    field: segment.to_string(),
                })
            }
        }
        StateValue::Map(map) => {
            map.insert(segment.to_string(), value);
            Ok(())
        }
        StateValue::Array(items) => {
            let index = segment.parse::<usize>().map_err(|_| PathError::BadIndex {
                segment: segment.to_string(),
            })?;
            let len = items.len();
            if index < len {
                items[index] = value;
                Ok(())
            } else if index == len {
                items.push(value);
                Ok(())
            } else {
                Err(PathError::IndexOutOfRange {
                    index,
                    len,
                })
            }
        }
        _ => Err(PathError::NotAContainer {
            segment: segment.to_string(),
        }),
    }
}

// ============================================================================
// SECTION: Segmentation
// ============================================================================

/// Splits a dotted path into non-empty segments.
fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('.').filter(|segment| !segment.is_empty())
}
