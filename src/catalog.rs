//! Component catalog and schema compiler
//!
//! A catalog names the element types a generator may emit, the props each one
//! takes, the actions a host handles, and any custom validation functions. From
//! it we compile:
//!
//! - one element schema per type: `{key, type: <literal>, props, children?, parentKey?, visible?}`
//! - a combined element schema: the single type directly, or a union on `type`
//! - a tree schema: `{root, elements: {key -> combined}}`
//!
//! Validation never panics; it returns every issue found, each qualified by the
//! slash path of the offending value.

use crate::dynamic::as_path_ref;
use crate::tree::{UiElement, UiTree};
use crate::validation::builtin_function_names;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

// ============================================================================
// Errors
// ============================================================================

/// One problem found while checking a value against a schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaIssue {
    /// Slash path of the offending value (`""` for the value itself)
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "(root): {}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Every issue found while validating an element or tree
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{} schema issue(s): {}", .issues.len(), join_issues(.issues))]
pub struct SchemaError {
    pub issues: Vec<SchemaIssue>,
}

fn join_issues(issues: &[SchemaIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON catalog: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid TOML catalog: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("unsupported catalog format {} (expected .json or .toml)", .0.display())]
    UnknownFormat(PathBuf),
}

// ============================================================================
// Prop schemas
// ============================================================================

/// Shape of a value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PropKind {
    String,
    Number,
    Integer,
    Boolean,
    Array {
        items: Box<PropSchema>,
    },
    Object {
        #[serde(default)]
        fields: BTreeMap<String, PropSchema>,
        #[serde(default)]
        required: Vec<String>,
    },
    /// Map with arbitrary keys and uniform values
    Record {
        values: Box<PropSchema>,
    },
    Enum {
        values: Vec<Value>,
    },
    /// Objects discriminated by the string field `tag`
    Tagged {
        tag: String,
        variants: BTreeMap<String, PropSchema>,
    },
    Any,
}

/// A small declarative schema for props and action params
///
/// In catalog files: `{ "type": "string", "nullable": true }`,
/// `{ "type": "array", "items": { "type": "number" } }`, and so on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropSchema {
    #[serde(flatten)]
    pub kind: PropKind,
    /// `null` is accepted
    #[serde(default, skip_serializing_if = "is_false")]
    pub nullable: bool,
    /// A `{"path": ...}` reference is accepted in place of the value
    #[serde(default, skip_serializing_if = "is_false")]
    pub dynamic: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl From<PropKind> for PropSchema {
    fn from(kind: PropKind) -> Self {
        Self {
            kind,
            nullable: false,
            dynamic: false,
            description: None,
        }
    }
}

impl PropSchema {
    pub fn string() -> Self {
        PropKind::String.into()
    }

    pub fn number() -> Self {
        PropKind::Number.into()
    }

    pub fn integer() -> Self {
        PropKind::Integer.into()
    }

    pub fn boolean() -> Self {
        PropKind::Boolean.into()
    }

    pub fn any() -> Self {
        PropKind::Any.into()
    }

    pub fn array(items: PropSchema) -> Self {
        PropKind::Array {
            items: Box::new(items),
        }
        .into()
    }

    pub fn record(values: PropSchema) -> Self {
        PropKind::Record {
            values: Box::new(values),
        }
        .into()
    }

    pub fn object<I, K>(fields: I, required: &[&str]) -> Self
    where
        I: IntoIterator<Item = (K, PropSchema)>,
        K: Into<String>,
    {
        PropKind::Object {
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            required: required.iter().map(|s| s.to_string()).collect(),
        }
        .into()
    }

    pub fn one_of<I>(values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        PropKind::Enum {
            values: values.into_iter().map(Into::into).collect(),
        }
        .into()
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn dynamic(mut self) -> Self {
        self.dynamic = true;
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Check `value`, collecting issues under `at`
    pub fn check(&self, value: &Value, at: &str, issues: &mut Vec<SchemaIssue>) {
        if value.is_null() {
            if !self.nullable && self.kind != PropKind::Any {
                issues.push(issue(at, format!("expected {}, got null", self.summary())));
            }
            return;
        }
        if self.dynamic && as_path_ref(value).is_some() {
            return;
        }

        let mismatch = |issues: &mut Vec<SchemaIssue>| {
            issues.push(issue(
                at,
                format!("expected {}, got {}", self.summary(), type_name(value)),
            ));
        };

        match &self.kind {
            PropKind::Any => {}
            PropKind::String if !value.is_string() => mismatch(issues),
            PropKind::Number if !value.is_number() => mismatch(issues),
            PropKind::Boolean if !value.is_boolean() => mismatch(issues),
            PropKind::Integer if !is_integer(value) => mismatch(issues),
            PropKind::String | PropKind::Number | PropKind::Boolean | PropKind::Integer => {}
            PropKind::Enum { values } => {
                if !values.contains(value) {
                    mismatch(issues);
                }
            }
            PropKind::Array { items } => match value.as_array() {
                Some(array) => {
                    for (i, item) in array.iter().enumerate() {
                        items.check(item, &join(at, &i.to_string()), issues);
                    }
                }
                None => mismatch(issues),
            },
            PropKind::Record { values } => match value.as_object() {
                Some(map) => {
                    for (key, item) in map {
                        values.check(item, &join(at, key), issues);
                    }
                }
                None => mismatch(issues),
            },
            PropKind::Object { fields, required } => {
                let Some(map) = value.as_object() else {
                    return mismatch(issues);
                };
                for name in required {
                    if !map.contains_key(name) {
                        issues.push(issue(&join(at, name), "required field is missing".into()));
                    }
                }
                for (name, schema) in fields {
                    if let Some(field) = map.get(name) {
                        schema.check(field, &join(at, name), issues);
                    }
                }
            }
            PropKind::Tagged { tag, variants } => {
                let Some(map) = value.as_object() else {
                    return mismatch(issues);
                };
                match map.get(tag).and_then(Value::as_str) {
                    Some(name) => match variants.get(name) {
                        Some(variant) => variant.check(value, at, issues),
                        None => issues.push(issue(
                            &join(at, tag),
                            format!(
                                "unknown {} '{}' (expected one of: {})",
                                tag,
                                name,
                                variants.keys().cloned().collect::<Vec<_>>().join(", ")
                            ),
                        )),
                    },
                    None => issues.push(issue(&join(at, tag), "missing discriminator".into())),
                }
            }
        }
    }

    /// Check `value` as a whole
    pub fn validate(&self, value: &Value) -> Result<(), SchemaError> {
        let mut issues = Vec::new();
        self.check(value, "", &mut issues);
        if issues.is_empty() {
            Ok(())
        } else {
            Err(SchemaError { issues })
        }
    }

    /// Compact type notation for messages and prompts
    pub fn summary(&self) -> String {
        let base = match &self.kind {
            PropKind::String => "string".to_string(),
            PropKind::Number => "number".to_string(),
            PropKind::Integer => "integer".to_string(),
            PropKind::Boolean => "boolean".to_string(),
            PropKind::Any => "any".to_string(),
            PropKind::Array { items } => format!("{}[]", items.summary()),
            PropKind::Record { values } => format!("{{[key]: {}}}", values.summary()),
            PropKind::Enum { values } => values
                .iter()
                .map(Value::to_string)
                .collect::<Vec<_>>()
                .join(" | "),
            PropKind::Object { fields, required } => {
                let fields: Vec<String> = fields
                    .iter()
                    .map(|(name, schema)| {
                        let optional = if required.contains(name) { "" } else { "?" };
                        format!("{}{}: {}", name, optional, schema.summary())
                    })
                    .collect();
                format!("{{{}}}", fields.join(", "))
            }
            PropKind::Tagged { tag, variants } => format!(
                "{} by {}",
                variants.keys().cloned().collect::<Vec<_>>().join(" | "),
                tag
            ),
        };

        match (self.nullable, self.dynamic) {
            (false, false) => base,
            (true, false) => format!("{} | null", base),
            (false, true) => format!("{} | {{path}}", base),
            (true, true) => format!("{} | {{path}} | null", base),
        }
    }
}

fn issue(path: &str, message: String) -> SchemaIssue {
    SchemaIssue {
        path: path.to_string(),
        message,
    }
}

fn join(at: &str, segment: &str) -> String {
    format!("{}/{}", at, segment)
}

fn is_integer(value: &Value) -> bool {
    value.is_i64() || value.is_u64() || value.as_f64().is_some_and(|f| f.fract() == 0.0)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// A component type the generator may emit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDef {
    #[serde(default)]
    pub props: BTreeMap<String, PropSchema>,
    /// Props that must be present
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub has_children: bool,
}

/// An action the host handles
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<BTreeMap<String, PropSchema>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub components: BTreeMap<String, ComponentDef>,
    #[serde(default)]
    pub actions: BTreeMap<String, ActionDef>,
    /// Custom validation function name -> description
    #[serde(default)]
    pub functions: BTreeMap<String, String>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_component(mut self, name: impl Into<String>, component: ComponentDef) -> Self {
        self.components.insert(name.into(), component);
        self
    }

    pub fn with_action(mut self, name: impl Into<String>, action: ActionDef) -> Self {
        self.actions.insert(name.into(), action);
        self
    }

    pub fn with_function(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.functions.insert(name.into(), description.into());
        self
    }

    pub fn from_json(s: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_toml(s: &str) -> Result<Self, CatalogError> {
        Ok(toml::from_str(s)?)
    }

    /// Load a `.json` or `.toml` catalog file
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let catalog = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&contents)?,
            Some("toml") => Self::from_toml(&contents)?,
            _ => return Err(CatalogError::UnknownFormat(path.to_path_buf())),
        };
        tracing::debug!(
            "Loaded catalog {} ({} components, {} actions)",
            path.display(),
            catalog.components.len(),
            catalog.actions.len()
        );
        Ok(catalog)
    }

    pub fn has_component(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    pub fn component_names(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }

    /// Schema for one element of type `name`
    pub fn element_schema(&self, name: &str) -> Option<PropSchema> {
        let component = self.components.get(name)?;
        let props = PropSchema::from(PropKind::Object {
            fields: component.props.clone(),
            required: component.required.clone(),
        });
        let children = if component.has_children {
            PropSchema::array(PropSchema::string())
        } else {
            PropSchema::array(PropSchema::string()).describe("must be empty")
        };

        Some(PropSchema::object(
            [
                ("key", PropSchema::string()),
                ("type", PropSchema::one_of([name])),
                ("props", props),
                ("children", children.nullable()),
                ("parentKey", PropSchema::string().nullable()),
                ("visible", PropSchema::any()),
            ],
            &["key", "type"],
        ))
    }

    /// Schema accepting an element of any catalog type
    pub fn combined_schema(&self) -> PropSchema {
        if self.components.len() == 1 {
            if let Some(schema) = self.component_names().next().and_then(|n| self.element_schema(n)) {
                return schema;
            }
        }

        let variants = self
            .component_names()
            .filter_map(|name| Some((name.to_string(), self.element_schema(name)?)))
            .collect();
        PropKind::Tagged {
            tag: "type".into(),
            variants,
        }
        .into()
    }

    pub fn tree_schema(&self) -> PropSchema {
        PropSchema::object(
            [
                ("root", PropSchema::string()),
                ("elements", PropSchema::record(self.combined_schema())),
            ],
            &["root", "elements"],
        )
    }

    /// Validate one element, returning it typed on success
    pub fn validate_element(&self, value: &Value) -> Result<UiElement, SchemaError> {
        let mut issues = Vec::new();
        self.combined_schema().check(value, "", &mut issues);
        self.check_children(value, "", &mut issues);
        finish(value, issues)
    }

    /// Validate a whole tree, returning it typed on success
    pub fn validate_tree(&self, value: &Value) -> Result<UiTree, SchemaError> {
        let mut issues = Vec::new();
        self.tree_schema().check(value, "", &mut issues);
        if let Some(elements) = value.get("elements").and_then(Value::as_object) {
            for (key, element) in elements {
                self.check_children(element, &format!("/elements/{}", key), &mut issues);
            }
        }
        finish(value, issues)
    }

    /// Leaf components must not list children
    fn check_children(&self, element: &Value, at: &str, issues: &mut Vec<SchemaIssue>) {
        let Some(component) = element
            .get("type")
            .and_then(Value::as_str)
            .and_then(|t| self.components.get(t))
        else {
            return;
        };
        let has_children = element
            .get("children")
            .and_then(Value::as_array)
            .is_some_and(|c| !c.is_empty());
        if has_children && !component.has_children {
            issues.push(issue(
                &join(at, "children"),
                "component does not accept children".into(),
            ));
        }
    }

    /// Briefing for an external generator: components, actions, visibility
    /// grammar and validation functions
    pub fn generate_prompt(&self) -> String {
        let mut out = String::new();
        let title = self.name.as_deref().unwrap_or("this interface");
        let _ = writeln!(out, "You generate user interfaces for {}.", title);
        let _ = writeln!(
            out,
            "Emit one JSON patch per line: {{\"op\": \"set\"|\"add\"|\"replace\"|\"remove\", \"path\": ..., \"value\": ...}}."
        );
        let _ = writeln!(
            out,
            "Set \"/root\" to the root element key and \"/elements/<key>\" to each element \
             {{\"key\", \"type\", \"props\", \"children\"?: [keys], \"visible\"?}}."
        );

        out.push_str("\nAVAILABLE COMPONENTS:\n");
        for (name, component) in &self.components {
            let _ = write!(out, "- {}", name);
            if let Some(description) = &component.description {
                let _ = write!(out, ": {}", description);
            }
            let props = PropSchema::from(PropKind::Object {
                fields: component.props.clone(),
                required: component.required.clone(),
            });
            let _ = write!(out, " props {}", props.summary());
            if component.has_children {
                out.push_str(" [accepts children]");
            }
            out.push('\n');
        }

        if !self.actions.is_empty() {
            out.push_str("\nAVAILABLE ACTIONS:\n");
            for (name, action) in &self.actions {
                let _ = write!(out, "- {}", name);
                if let Some(description) = &action.description {
                    let _ = write!(out, ": {}", description);
                }
                if let Some(params) = &action.params {
                    let params = PropSchema::from(PropKind::Object {
                        fields: params.clone(),
                        required: Vec::new(),
                    });
                    let _ = write!(out, " params {}", params.summary());
                }
                out.push('\n');
            }
        }

        out.push_str(VISIBILITY_GRAMMAR);

        out.push_str("\nVALIDATION FUNCTIONS:\n");
        let builtins: Vec<&str> = builtin_function_names().collect();
        let _ = writeln!(out, "- built-in: {}", builtins.join(", "));
        for (name, description) in &self.functions {
            let _ = writeln!(out, "- {}: {}", name, description);
        }

        out
    }
}

const VISIBILITY_GRAMMAR: &str = r#"
VISIBILITY ("visible" on any element):
- true / false
- {"path": "/data/path"} visible when the value is truthy
- {"auth": "signedIn"} or {"auth": "signedOut"}
- {"and": [...]}, {"or": [...]}, {"not": {...}}
- {"eq": [a, b]}, {"neq": [a, b]}, {"gt": [a, b]}, {"gte": [a, b]}, {"lt": [a, b]}, {"lte": [a, b]}
  where a and b are literals or {"path": "/data/path"}
"#;

fn finish<T: serde::de::DeserializeOwned>(
    value: &Value,
    issues: Vec<SchemaIssue>,
) -> Result<T, SchemaError> {
    if !issues.is_empty() {
        return Err(SchemaError { issues });
    }
    T::deserialize(value).map_err(|e| SchemaError {
        issues: vec![issue("", e.to_string())],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog() -> Catalog {
        Catalog::new()
            .with_component(
                "Card",
                ComponentDef {
                    props: BTreeMap::from([
                        ("title".to_string(), PropSchema::string().dynamic()),
                        ("padding".to_string(), PropSchema::integer().nullable()),
                    ]),
                    required: vec!["title".into()],
                    description: Some("A bordered container".into()),
                    has_children: true,
                },
            )
            .with_component(
                "Text",
                ComponentDef {
                    props: BTreeMap::from([
                        ("text".to_string(), PropSchema::string()),
                        ("tone".to_string(), PropSchema::one_of(["muted", "loud"])),
                    ]),
                    required: vec!["text".into()],
                    ..Default::default()
                },
            )
            .with_action(
                "save",
                ActionDef {
                    description: Some("Persist the form".into()),
                    params: Some(BTreeMap::from([("id".to_string(), PropSchema::number())])),
                },
            )
            .with_function("isSlug", "lowercase letters and dashes")
    }

    #[test]
    fn test_validate_element() {
        let element = catalog()
            .validate_element(&json!({
                "key": "t", "type": "Text", "props": {"text": "hi", "tone": "muted"}
            }))
            .unwrap();
        assert_eq!(element.element_type, "Text");
    }

    #[test]
    fn test_element_issues_are_path_qualified() {
        let err = catalog()
            .validate_element(&json!({
                "key": "c", "type": "Card", "props": {"padding": 1.5}
            }))
            .unwrap_err();
        let paths: Vec<&str> = err.issues.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, vec!["/props/title", "/props/padding"]);
    }

    #[test]
    fn test_dynamic_and_nullable_props() {
        let c = catalog();
        assert!(c
            .validate_element(&json!({
                "key": "c", "type": "Card", "props": {"title": {"path": "/t"}, "padding": null}
            }))
            .is_ok());
        // Text.text is not dynamic
        assert!(c
            .validate_element(&json!({
                "key": "t", "type": "Text", "props": {"text": {"path": "/t"}}
            }))
            .is_err());
    }

    #[test]
    fn test_leaf_rejects_children() {
        let err = catalog()
            .validate_element(&json!({
                "key": "t", "type": "Text", "props": {"text": "x"}, "children": ["a"]
            }))
            .unwrap_err();
        assert_eq!(err.issues[0].path, "/children");
    }

    #[test]
    fn test_validate_tree_rejects_unknown_type() {
        let err = catalog()
            .validate_tree(&json!({
                "root": "c",
                "elements": {
                    "c": {"key": "c", "type": "Card", "props": {"title": "Hi"}, "children": ["x"]},
                    "x": {"key": "x", "type": "Marquee", "props": {}}
                }
            }))
            .unwrap_err();
        assert_eq!(err.issues.len(), 1);
        assert_eq!(err.issues[0].path, "/elements/x/type");
        assert!(err.issues[0].message.contains("Marquee"));
    }

    #[test]
    fn test_validate_tree_ok() {
        let tree = catalog()
            .validate_tree(&json!({
                "root": "c",
                "elements": {
                    "c": {"key": "c", "type": "Card", "props": {"title": "Hi"}, "children": ["t"]},
                    "t": {"key": "t", "type": "Text", "props": {"text": "body"}, "parentKey": "c"}
                }
            }))
            .unwrap();
        assert_eq!(tree.root_element().unwrap().child_keys(), ["t"]);
    }

    #[test]
    fn test_validate_never_panics_on_garbage() {
        let c = catalog();
        for value in [json!(null), json!(3), json!("x"), json!([1]), json!({"elements": 4})] {
            assert!(c.validate_tree(&value).is_err());
            assert!(c.validate_element(&value).is_err());
        }
    }

    #[test]
    fn test_single_type_catalog_uses_element_schema() {
        let single = Catalog::new().with_component("Text", ComponentDef::default());
        let err = single
            .validate_element(&json!({"key": "a", "type": "Image"}))
            .unwrap_err();
        assert_eq!(err.issues[0].path, "/type");
    }

    #[test]
    fn test_catalog_from_toml_and_json() {
        let from_toml = Catalog::from_toml(
            r#"
            name = "labs"

            [components.Heading]
            description = "Section heading"
            required = ["text"]
            props.text = { type = "string" }
            props.level = { type = "enum", values = [1, 2, 3] }

            [actions.refresh]
            description = "Reload data"

            [functions]
            isSlug = "lowercase letters and dashes"
            "#,
        )
        .unwrap();
        assert!(from_toml.has_component("Heading"));
        assert_eq!(
            from_toml.components["Heading"].props["level"].kind,
            PropKind::Enum {
                values: vec![json!(1), json!(2), json!(3)]
            }
        );

        let from_json = Catalog::from_json(&serde_json::to_string(&from_toml).unwrap()).unwrap();
        assert_eq!(from_json, from_toml);
    }

    #[test]
    fn test_generate_prompt() {
        let prompt = catalog().generate_prompt();
        assert!(prompt.contains("- Card: A bordered container props {padding?: integer | null, title: string | {path}} [accepts children]"));
        assert!(prompt.contains("- save: Persist the form params {id?: number}"));
        assert!(prompt.contains(r#"{"auth": "signedIn"}"#));
        assert!(prompt.contains("minLength"));
        assert!(prompt.contains("- isSlug: lowercase letters and dashes"));
    }

    #[test]
    fn test_load_rejects_unknown_extension() {
        let err = Catalog::load(Path::new("catalog.yaml")).unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. } | CatalogError::UnknownFormat(_)));
    }
}
