//! Slash-delimited path addressing over JSON values
//!
//! A path like `/form/email` or `form/email` locates a value inside nested
//! objects. A leading `/` is optional, empty segments are ignored, and a path
//! with no segments denotes the whole value. Numeric segments index arrays.
//!
//! Reads never fail: traversal stops with `None` as soon as an intermediate
//! value is not a container or a key is missing.

use serde_json::{Map, Value};

/// Largest run of `null` padding a single write may add to an array
const MAX_ARRAY_GAP: usize = 1024;

/// Split a path into its non-empty segments
pub fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Read the value at `path`, or `None` if any segment is missing
pub fn get<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in segments(path) {
        current = step(current, segment)?;
    }
    Some(current)
}

/// Write `new_value` at `path`, creating intermediate objects as needed
///
/// Intermediates that exist but are not containers are replaced with empty
/// objects. Existing arrays are never replaced: an index past the end pads
/// the array with `null`, and a non-numeric segment leaves the model untouched
/// with a warning. A path with zero segments is a no-op.
pub fn set(value: &mut Value, path: &str, new_value: Value) {
    let parts = segments(path);
    let Some((last, parents)) = parts.split_last() else {
        return;
    };

    let mut current = value;
    for segment in parents {
        let Some(next) = descend_or_create(current, segment) else {
            tracing::warn!("Cannot set {:?}: {:?} does not index an array", path, segment);
            return;
        };
        current = next;
    }

    if !write_slot(current, last, new_value) {
        tracing::warn!("Cannot set {:?}: {:?} does not index an array", path, last);
    }
}

/// Remove the value at `path`, returning it if it existed
pub fn remove(value: &mut Value, path: &str) -> Option<Value> {
    let parts = segments(path);
    let (last, parents) = parts.split_last()?;

    let mut current = value;
    for segment in parents {
        current = step_mut(current, segment)?;
    }

    match current {
        Value::Object(map) => map.remove(*last),
        Value::Array(items) => {
            let index = last.parse::<usize>().ok()?;
            (index < items.len()).then(|| items.remove(index))
        }
        _ => None,
    }
}

fn step<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

fn step_mut<'a>(value: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    match value {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(|i| items.get_mut(i)),
        _ => None,
    }
}

fn descend_or_create<'a>(value: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    if !is_container(value) {
        *value = Value::Object(Map::new());
    }

    let slot = match value {
        Value::Array(items) => {
            let index = array_index(items, segment)?;
            &mut items[index]
        }
        Value::Object(map) => map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new())),
        _ => return None,
    };

    if !is_container(slot) {
        *slot = Value::Object(Map::new());
    }
    Some(slot)
}

/// Returns `false` when `container` is an array and `segment` is not an index
fn write_slot(container: &mut Value, segment: &str, new_value: Value) -> bool {
    if !is_container(container) {
        *container = Value::Object(Map::new());
    }

    match container {
        Value::Array(items) => match array_index(items, segment) {
            Some(index) => {
                items[index] = new_value;
                true
            }
            None => false,
        },
        Value::Object(map) => {
            map.insert(segment.to_string(), new_value);
            true
        }
        _ => false,
    }
}

/// Parse `segment` as an index into `items`, padding with `null` up to it
fn array_index(items: &mut Vec<Value>, segment: &str) -> Option<usize> {
    let index = segment.parse::<usize>().ok()?;
    if index > items.len() + MAX_ARRAY_GAP {
        return None;
    }
    if index >= items.len() {
        items.resize(index + 1, Value::Null);
    }
    Some(index)
}

fn is_container(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}
