//! genui - declarative UI engine
//!
//! A user interface is described as data: a flat map of typed elements keyed by
//! string, with a root pointer. This crate resolves values and visibility against
//! a JSON data model, validates field values against declarative rules, executes
//! named actions, and builds the element tree incrementally from a stream of
//! newline-delimited patch operations.
//!
//! Architecture:
//! - path / data / dynamic: JSON pointer addressing and the data model
//! - logic: boolean expression language for visibility and validation gating
//! - validation: named checks with per-field state tracking
//! - action: parameter resolution, confirmation, continuations, loading set
//! - tree / patch / stream: element tree, patch protocol, streaming builder
//! - catalog: component prop schemas, tree validation, generator prompt
//! - render: tree walk contract consumed by a host renderer
//! - transport: file/stdin/HTTP patch sources

pub mod action;
pub mod catalog;
pub mod data;
pub mod dynamic;
pub mod logic;
pub mod path;
pub mod patch;
pub mod render;
pub mod stream;
pub mod transport;
pub mod tree;
pub mod util;
pub mod validation;

pub use action::{
    resolve_action, Action, ActionConfirm, ActionError, ActionExecutor, ActionOnError,
    ActionOnSuccess, ActionRegistry, ResolvedAction,
};
pub use catalog::{Catalog, CatalogError, PropSchema, SchemaError};
pub use data::{DataModel, SharedDataModel};
pub use dynamic::{interpolate, resolve, DynamicValue};
pub use logic::{
    evaluate_logic, evaluate_visibility, AuthState, LogicExpression, LogicParseError,
    VisibilityCondition, VisibilityContext,
};
pub use patch::{apply_patch, parse_patch_line, Patch};
pub use render::{OutlineRenderer, RenderProps, RendererRegistry, TreeWalker};
pub use stream::{StreamBuilder, StreamError, StreamOutcome};
pub use tree::{UiElement, UiTree};
pub use validation::{
    run_validation, FieldValidator, ValidationCheck, ValidationConfig, ValidationContext,
    ValidationResult,
};

pub use serde_json::Value;
