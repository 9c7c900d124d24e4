//! Tree walk and dispatch contract for host renderers
//!
//! The walker owns traversal order and visibility; hosts only supply a renderer
//! per element type. Visibility is inherited: a hidden element hides its whole
//! subtree. Missing elements render as nothing.

use crate::action::Action;
use crate::dynamic::{resolve, stringify};
use crate::logic::{evaluate_visibility, VisibilityContext};
use crate::tree::{UiElement, UiTree};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// What a renderer receives for one visible element
pub struct RenderProps<'a, O> {
    pub element: &'a UiElement,
    /// Already-rendered visible children, in order
    pub children: Vec<O>,
    pub on_action: Option<&'a dyn Fn(&Action)>,
    /// Host-wide loading flag, the same for every node
    pub loading: bool,
    /// Data model, for resolving dynamic props
    pub data: &'a Value,
}

impl<O> RenderProps<'_, O> {
    /// Prop value with `{path}` references resolved
    pub fn prop(&self, name: &str) -> Option<Value> {
        resolve(self.element.props.get(name)?, self.data)
    }

    /// Parse an action declared under prop `name`
    pub fn action(&self, name: &str) -> Option<Action> {
        let value = self.element.props.get(name)?;
        match serde_json::from_value(value.clone()) {
            Ok(action) => Some(action),
            Err(e) => {
                tracing::warn!(
                    "Element '{}' has invalid action in prop '{}': {}",
                    self.element.key,
                    name,
                    e
                );
                None
            }
        }
    }

    /// Hand an action to the host; no-op without an action handler
    pub fn dispatch(&self, action: &Action) {
        if let Some(on_action) = self.on_action {
            on_action(action);
        }
    }
}

pub type RenderFn<O> = Arc<dyn Fn(RenderProps<'_, O>) -> O + Send + Sync>;

/// Element type -> renderer, with an optional fallback for unknown types
pub struct RendererRegistry<O> {
    renderers: HashMap<String, RenderFn<O>>,
    fallback: Option<RenderFn<O>>,
}

impl<O> RendererRegistry<O> {
    pub fn new() -> Self {
        Self {
            renderers: HashMap::new(),
            fallback: None,
        }
    }

    pub fn register<F>(&mut self, element_type: impl Into<String>, render: F)
    where
        F: Fn(RenderProps<'_, O>) -> O + Send + Sync + 'static,
    {
        self.renderers.insert(element_type.into(), Arc::new(render));
    }

    pub fn with_renderer<F>(mut self, element_type: impl Into<String>, render: F) -> Self
    where
        F: Fn(RenderProps<'_, O>) -> O + Send + Sync + 'static,
    {
        self.register(element_type, render);
        self
    }

    pub fn with_fallback<F>(mut self, render: F) -> Self
    where
        F: Fn(RenderProps<'_, O>) -> O + Send + Sync + 'static,
    {
        self.fallback = Some(Arc::new(render));
        self
    }

    /// Renderer for `element_type`, falling back when unregistered
    pub fn resolve(&self, element_type: &str) -> Option<&RenderFn<O>> {
        self.renderers.get(element_type).or(self.fallback.as_ref())
    }
}

impl<O> Default for RendererRegistry<O> {
    fn default() -> Self {
        Self::new()
    }
}

/// Depth-first walk from the root, children before parents
pub struct TreeWalker<'a, O> {
    registry: &'a RendererRegistry<O>,
    visibility: VisibilityContext<'a>,
    on_action: Option<&'a dyn Fn(&Action)>,
    loading: bool,
}

impl<'a, O> TreeWalker<'a, O> {
    pub fn new(registry: &'a RendererRegistry<O>, visibility: VisibilityContext<'a>) -> Self {
        Self {
            registry,
            visibility,
            on_action: None,
            loading: false,
        }
    }

    pub fn with_action_handler(mut self, on_action: &'a dyn Fn(&Action)) -> Self {
        self.on_action = Some(on_action);
        self
    }

    pub fn with_loading(mut self, loading: bool) -> Self {
        self.loading = loading;
        self
    }

    /// Render the tree; `None` when the root is missing, hidden or unrenderable
    pub fn walk(&self, tree: &UiTree) -> Option<O> {
        let mut ancestors = Vec::new();
        self.visit(tree, &tree.root, &mut ancestors)
    }

    fn visit<'t>(&self, tree: &'t UiTree, key: &'t str, ancestors: &mut Vec<&'t str>) -> Option<O> {
        let element = tree.get(key)?;

        if ancestors.contains(&key) {
            tracing::warn!(
                "Element '{}' is its own ancestor ({}), skipping",
                key,
                ancestors.join(" > ")
            );
            return None;
        }

        if !evaluate_visibility(element.visible.as_ref(), &self.visibility) {
            return None;
        }

        let Some(render) = self.registry.resolve(&element.element_type) else {
            tracing::warn!(
                "No renderer for element type '{}' (key '{}'), skipping subtree",
                element.element_type,
                key
            );
            return None;
        };

        ancestors.push(key);
        let children = element
            .child_keys()
            .iter()
            .filter_map(|child| self.visit(tree, child, ancestors))
            .collect();
        ancestors.pop();

        Some(render(RenderProps {
            element,
            children,
            on_action: self.on_action,
            loading: self.loading,
            data: self.visibility.data,
        }))
    }
}

/// Indented text outline of a tree
///
/// ```text
/// Card card title="Labs"
///   Text intro text="Welcome"
/// ```
pub struct OutlineRenderer;

impl OutlineRenderer {
    /// Registry rendering every type through the outline fallback
    pub fn registry() -> RendererRegistry<String> {
        RendererRegistry::new().with_fallback(Self::render)
    }

    pub fn render(props: RenderProps<'_, String>) -> String {
        let element = props.element;
        let mut line = format!("{} {}", element.element_type, element.key);

        let mut names: Vec<&String> = element.props.keys().collect();
        names.sort();
        for name in names {
            let value = props.prop(name).unwrap_or(Value::Null);
            let shown = match &value {
                Value::String(s) => format!("{:?}", s),
                other => stringify(other),
            };
            line.push_str(&format!(" {}={}", name, crate::util::preview(&shown)));
        }
        if props.loading {
            line.push_str(" [loading]");
        }

        for child in &props.children {
            for child_line in child.lines() {
                line.push_str("\n  ");
                line.push_str(child_line);
            }
        }
        line
    }
}
