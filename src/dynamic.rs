//! Dynamic values: literals or `{ "path": ... }` references into the data model
//!
//! Any single-key object of the shape `{"path": "<string>"}` is a reference.
//! Literal values must not use that exact shape.

use crate::path;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;

/// `${/some/path}` tokens inside interpolated strings
static INTERPOLATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("interpolation pattern is valid"));

/// A value that is either literal or read from the data model at use time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DynamicValue {
    /// `{"path": "/a/b"}`
    Path(PathRef),
    /// Anything else, passed through unchanged
    Literal(Value),
}

/// Reference half of a `DynamicValue`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathRef {
    pub path: String,
}

impl DynamicValue {
    pub fn path(path: impl Into<String>) -> Self {
        Self::Path(PathRef { path: path.into() })
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    /// Resolve against the data model; `null` and missing paths yield `None`
    pub fn resolve(&self, data: &Value) -> Option<Value> {
        match self {
            Self::Path(r) => path::get(data, &r.path).filter(|v| !v.is_null()).cloned(),
            Self::Literal(Value::Null) => None,
            Self::Literal(v) => Some(v.clone()),
        }
    }
}

impl From<Value> for DynamicValue {
    fn from(value: Value) -> Self {
        match as_path_ref(&value) {
            Some(p) => Self::path(p),
            None => Self::Literal(value),
        }
    }
}

/// Resolve a raw JSON value that may be a `{path}` reference
pub fn resolve(value: &Value, data: &Value) -> Option<Value> {
    match as_path_ref(value) {
        Some(p) => path::get(data, p).filter(|v| !v.is_null()).cloned(),
        None if value.is_null() => None,
        None => Some(value.clone()),
    }
}

pub(crate) fn as_path_ref(value: &Value) -> Option<&str> {
    let map = value.as_object()?;
    if map.len() != 1 {
        return None;
    }
    map.get("path")?.as_str()
}

/// Replace each `${path}` token with the stringified value at that path
///
/// Missing and `null` values become the empty string.
pub fn interpolate(template: &str, data: &Value) -> String {
    INTERPOLATION
        .replace_all(template, |caps: &regex::Captures<'_>| {
            path::get(data, &caps[1])
                .map(stringify)
                .unwrap_or_default()
        })
        .into_owned()
}

/// Render a value the way it would appear inside user-facing text
pub fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i.to_string(),
            (None, Some(f)) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

/// Truthiness of an optional value: absent, `null`, `false`, `0`, NaN and `""` are falsy
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Strict equality over resolved values
///
/// Numbers compare numerically (`1 == 1.0`), strings and booleans by value,
/// absent equals absent. Objects and arrays are never equal to anything.
pub fn strict_eq(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x.as_f64() == y.as_f64(),
        (Some(Value::String(x)), Some(Value::String(y))) => x == y,
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x == y,
        (Some(Value::Null), Some(Value::Null)) => true,
        _ => false,
    }
}
