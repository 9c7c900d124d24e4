//! Flat, key-addressed UI tree
//!
//! Elements reference their children by key, never by embedding, so the tree
//! is a map of `key -> element` plus a root pointer. Elements are held behind
//! `Arc`: cloning a tree is a shallow copy and mutation is copy-on-write via
//! `Arc::make_mut`.

use crate::logic::VisibilityCondition;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// One typed element of the interface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiElement {
    pub key: String,
    #[serde(rename = "type")]
    pub element_type: String,
    #[serde(default)]
    pub props: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<VisibilityCondition>,
}

impl UiElement {
    pub fn new(key: impl Into<String>, element_type: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            element_type: element_type.into(),
            props: Map::new(),
            children: None,
            parent_key: None,
            visible: None,
        }
    }

    pub fn with_prop(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }

    pub fn with_children<I, S>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.children = Some(children.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_visible(mut self, visible: impl Into<VisibilityCondition>) -> Self {
        self.visible = Some(visible.into());
        self
    }

    /// Child keys in order (empty when the element has none)
    pub fn child_keys(&self) -> &[String] {
        self.children.as_deref().unwrap_or(&[])
    }
}

/// Root pointer plus every element by key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiTree {
    #[serde(default)]
    pub root: String,
    #[serde(default)]
    pub elements: HashMap<String, Arc<UiElement>>,
}

impl UiTree {
    /// Empty tree (`{"root": "", "elements": {}}`)
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&UiElement> {
        self.elements.get(key).map(Arc::as_ref)
    }

    /// The root element, if the root key resolves
    pub fn root_element(&self) -> Option<&UiElement> {
        self.get(&self.root)
    }

    /// Mutable access, cloning the element first if a snapshot shares it
    pub fn get_mut(&mut self, key: &str) -> Option<&mut UiElement> {
        self.elements.get_mut(key).map(Arc::make_mut)
    }

    /// Insert or replace the element stored under `key`
    pub fn insert(&mut self, key: impl Into<String>, element: UiElement) {
        self.elements.insert(key.into(), Arc::new(element));
    }

    pub fn remove(&mut self, key: &str) -> Option<Arc<UiElement>> {
        self.elements.remove(key)
    }

    /// Build a tree from a flat element list linked by `parentKey`
    ///
    /// The first element without a parent becomes the root. Children are
    /// appended in list order to any parent that does not declare its own
    /// children.
    pub fn from_flat(elements: impl IntoIterator<Item = UiElement>) -> Self {
        let elements: Vec<UiElement> = elements.into_iter().collect();
        let mut tree = Self::new();

        if let Some(root) = elements.iter().find(|e| e.parent_key.is_none()) {
            tree.root = root.key.clone();
        }

        let mut derived: HashMap<String, Vec<String>> = HashMap::new();
        for element in &elements {
            if let Some(parent) = &element.parent_key {
                derived
                    .entry(parent.clone())
                    .or_default()
                    .push(element.key.clone());
            }
        }

        for mut element in elements {
            if element.children.is_none() {
                element.children = derived.remove(&element.key);
            }
            tree.insert(element.key.clone(), element);
        }

        tree
    }

    /// (parent key, missing child key) pairs for children not present in the map
    ///
    /// Dangling references are legal; the tree walk renders nothing for them.
    pub fn dangling_children(&self) -> Vec<(String, String)> {
        let mut dangling: Vec<(String, String)> = self
            .elements
            .iter()
            .flat_map(|(key, element)| {
                element
                    .child_keys()
                    .iter()
                    .filter(|child| !self.elements.contains_key(*child))
                    .map(move |child| (key.clone(), child.clone()))
            })
            .collect();
        dangling.sort();
        dangling
    }
}
