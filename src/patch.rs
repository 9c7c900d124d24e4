//! Patch protocol: one JSON patch per line, applied to a `UiTree`
//!
//! Wire format (newline-delimited JSON, no envelope):
//!
//! ```text
//! {"op":"set","path":"/root","value":"page"}
//! {"op":"add","path":"/elements/page","value":{"key":"page","type":"Stack","props":{}}}
//! {"op":"replace","path":"/elements/page/props/gap","value":8}
//! {"op":"remove","path":"/elements/page"}
//! ```
//!
//! Targets:
//! - `/root` reassigns the root key
//! - `/elements/<key>` replaces (or removes) the whole element
//! - `/elements/<key>/<sub...>` deep-sets (or removes) a field of an existing
//!   element; a missing element makes this a no-op
//!
//! Malformed input never fails the stream: blank lines, `//` comments and
//! unparseable lines are skipped, and patches that cannot be applied are
//! logged and ignored.

use crate::path;
use crate::tree::{UiElement, UiTree};
use crate::util::preview;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One incremental mutation of a UI tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Patch {
    Set { path: String, value: Value },
    Add { path: String, value: Value },
    Replace { path: String, value: Value },
    Remove { path: String },
}

impl Patch {
    pub fn path(&self) -> &str {
        match self {
            Self::Set { path, .. }
            | Self::Add { path, .. }
            | Self::Replace { path, .. }
            | Self::Remove { path } => path,
        }
    }

    /// Wire name of the operation
    pub fn op(&self) -> &'static str {
        match self {
            Self::Set { .. } => "set",
            Self::Add { .. } => "add",
            Self::Replace { .. } => "replace",
            Self::Remove { .. } => "remove",
        }
    }
}

/// What a patch path points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target<'a> {
    Root,
    Element(&'a str),
    ElementField { key: &'a str, field: &'a str },
    Unknown,
}

fn target(path: &str) -> Target<'_> {
    if path == "/root" {
        return Target::Root;
    }
    let Some(rest) = path.strip_prefix("/elements/") else {
        return Target::Unknown;
    };
    match rest.split_once('/') {
        Some((key, field)) if !key.is_empty() && !field.is_empty() => {
            Target::ElementField { key, field }
        }
        Some((key, _)) if !key.is_empty() => Target::Element(key),
        None if !rest.is_empty() => Target::Element(rest),
        _ => Target::Unknown,
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Parse one line of the stream
///
/// Returns `None` for blank lines, `//` comments and anything that is not a
/// valid patch object.
pub fn parse_patch_line(line: &str) -> Option<Patch> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with("//") {
        return None;
    }

    match serde_json::from_str::<Patch>(trimmed) {
        Ok(patch) => Some(patch),
        Err(e) => {
            tracing::warn!("Skipping malformed patch line ({}): {}", e, preview(trimmed));
            None
        }
    }
}

// ============================================================================
// Application
// ============================================================================

/// Apply a patch to the tree, returning whether anything changed
pub fn apply_patch(tree: &mut UiTree, patch: &Patch) -> bool {
    match patch {
        Patch::Set { path, value } | Patch::Add { path, value } | Patch::Replace { path, value } => {
            apply_write(tree, path, value)
        }
        Patch::Remove { path } => apply_remove(tree, path),
    }
}

fn apply_write(tree: &mut UiTree, patch_path: &str, value: &Value) -> bool {
    match target(patch_path) {
        Target::Root => match value.as_str() {
            Some(root) => {
                tree.root = root.to_string();
                true
            }
            None => {
                tracing::warn!("Ignoring non-string root value: {}", value);
                false
            }
        },
        Target::Element(key) => match element_from_value(key, value) {
            Some(element) => {
                tree.insert(key, element);
                true
            }
            None => false,
        },
        Target::ElementField { key, field } => {
            let Some(element) = tree.get_mut(key) else {
                tracing::debug!("Deep-set on missing element {:?} ignored", key);
                return false;
            };
            write_field(element, field, value.clone())
        }
        Target::Unknown => {
            tracing::warn!("Ignoring patch with unsupported path {:?}", patch_path);
            false
        }
    }
}

fn apply_remove(tree: &mut UiTree, patch_path: &str) -> bool {
    match target(patch_path) {
        Target::Root => {
            tree.root.clear();
            true
        }
        Target::Element(key) => tree.remove(key).is_some(),
        Target::ElementField { key, field } => match tree.get_mut(key) {
            Some(element) => remove_field(element, field),
            None => false,
        },
        Target::Unknown => {
            tracing::warn!("Ignoring remove with unsupported path {:?}", patch_path);
            false
        }
    }
}

/// Decode a whole element, filling in `key` from the path when omitted
fn element_from_value(key: &str, value: &Value) -> Option<UiElement> {
    let mut value = value.clone();
    if let Value::Object(map) = &mut value {
        map.entry("key")
            .or_insert_with(|| Value::String(key.to_string()));
    }
    match serde_json::from_value::<UiElement>(value) {
        Ok(element) => Some(element),
        Err(e) => {
            tracing::warn!("Ignoring invalid element {:?}: {}", key, e);
            None
        }
    }
}

fn write_field(element: &mut UiElement, field: &str, value: Value) -> bool {
    // Fast path: prop writes are the bulk of a stream and skip the element round trip
    if let Some(prop_path) = field.strip_prefix("props/") {
        let mut props = Value::Object(std::mem::take(&mut element.props));
        path::set(&mut props, prop_path, value);
        element.props = into_map(props);
        return true;
    }

    edit_as_value(element, |v| {
        path::set(v, field, value);
        true
    })
}

fn remove_field(element: &mut UiElement, field: &str) -> bool {
    if let Some(prop_path) = field.strip_prefix("props/") {
        let mut props = Value::Object(std::mem::take(&mut element.props));
        let removed = path::remove(&mut props, prop_path).is_some();
        element.props = into_map(props);
        return removed;
    }

    edit_as_value(element, |v| path::remove(v, field).is_some())
}

/// Edit the element through its JSON form; edits that break the element shape are dropped
fn edit_as_value(element: &mut UiElement, edit: impl FnOnce(&mut Value) -> bool) -> bool {
    let mut value = match serde_json::to_value(&*element) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("Could not encode element {:?}: {}", element.key, e);
            return false;
        }
    };

    if !edit(&mut value) {
        return false;
    }

    match serde_json::from_value::<UiElement>(value) {
        Ok(updated) => {
            *element = updated;
            true
        }
        Err(e) => {
            tracing::warn!("Ignoring patch that breaks element {:?}: {}", element.key, e);
            false
        }
    }
}

fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
