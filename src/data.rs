//! The data model consulted by paths, visibility and validation
//!
//! A `DataModel` owns one JSON value. Every mutation goes through a path so
//! writes are attributable; nothing is created implicitly except the
//! intermediate objects along a `set` path.

use crate::path;
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex};

/// Data model shared between the caller and in-flight action dispatches
///
/// Uses std::sync::Mutex: locks are short and never held across an await.
pub type SharedDataModel = Arc<Mutex<DataModel>>;

/// Owned, path-addressed application state
#[derive(Debug, Clone, PartialEq)]
pub struct DataModel {
    root: Value,
}

impl DataModel {
    /// Create an empty model (`{}`)
    pub fn new() -> Self {
        Self {
            root: Value::Object(Map::new()),
        }
    }

    /// Wrap an existing value
    pub fn from_value(root: Value) -> Self {
        Self { root }
    }

    /// Wrap this model for sharing with an `ActionExecutor`
    pub fn into_shared(self) -> SharedDataModel {
        Arc::new(Mutex::new(self))
    }

    /// Read the value at `path`
    pub fn get(&self, path: &str) -> Option<&Value> {
        path::get(&self.root, path)
    }

    /// Write `value` at `path`
    pub fn set(&mut self, path: &str, value: Value) {
        tracing::trace!(path, "data model set");
        path::set(&mut self.root, path, value);
    }

    /// Apply several path/value writes in order
    pub fn update<I, P>(&mut self, updates: I)
    where
        I: IntoIterator<Item = (P, Value)>,
        P: AsRef<str>,
    {
        for (path, value) in updates {
            self.set(path.as_ref(), value);
        }
    }

    /// Remove the value at `path`
    pub fn remove(&mut self, path: &str) -> Option<Value> {
        path::remove(&mut self.root, path)
    }

    /// The whole model as a JSON value
    pub fn as_value(&self) -> &Value {
        &self.root
    }

    pub fn into_value(self) -> Value {
        self.root
    }
}

impl Default for DataModel {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Value> for DataModel {
    fn from(root: Value) -> Self {
        Self::from_value(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_model_is_empty_object() {
        let model = DataModel::new();
        assert_eq!(model.as_value(), &json!({}));
        assert_eq!(model.get("/anything"), None);
    }

    #[test]
    fn test_update_applies_in_order() {
        let mut model = DataModel::new();
        model.update([
            ("/form/name", json!("first")),
            ("/form/name", json!("second")),
            ("/form/age", json!(30)),
        ]);
        assert_eq!(model.get("/form/name"), Some(&json!("second")));
        assert_eq!(model.get("/form/age"), Some(&json!(30)));
    }

    #[test]
    fn test_remove_returns_old_value() {
        let mut model = DataModel::from_value(json!({"a": {"b": 1}}));
        assert_eq!(model.remove("/a/b"), Some(json!(1)));
        assert_eq!(model.get("/a/b"), None);
    }
}
