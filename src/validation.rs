//! Declarative field validation
//!
//! A `ValidationConfig` is an ordered list of named checks plus an optional
//! `enabled` expression that gates the whole config. Check functions are looked
//! up in the host-supplied custom registry first, then in the built-in table.
//!
//! Unknown function names are treated as passing (with a warning) so a typo in
//! a generated rule never blocks an entire form.

use crate::dynamic::{is_truthy, strict_eq, DynamicValue};
use crate::logic::{evaluate_logic, LogicExpression, VisibilityContext};
use crate::path;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, LazyLock};

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

/// Host-supplied check function: (value under validation, resolved args) -> valid
pub type ValidationFunction =
    Arc<dyn Fn(Option<&Value>, &Map<String, Value>) -> bool + Send + Sync>;

/// Custom check functions keyed by name
pub type FunctionRegistry = HashMap<String, ValidationFunction>;

type BuiltinFn = fn(Option<&Value>, &Map<String, Value>) -> bool;

// ============================================================================
// Configuration types
// ============================================================================

/// One named check, e.g. `{"fn": "minLength", "args": {"min": 8}, "message": "..."}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationCheck {
    #[serde(rename = "fn")]
    pub function: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<BTreeMap<String, DynamicValue>>,
    pub message: String,
}

/// When the host should run validation (advisory only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidateOn {
    Change,
    Blur,
    Submit,
}

/// Checks for one field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationConfig {
    #[serde(default)]
    pub checks: Vec<ValidationCheck>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validate_on: Option<ValidateOn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<LogicExpression>,
}

/// Inputs to a validation run
#[derive(Clone, Copy)]
pub struct ValidationContext<'a> {
    /// The field value (None when absent)
    pub value: Option<&'a Value>,
    /// Whole data model, used for `{path}` args and the `enabled` expression
    pub data: &'a Value,
    pub custom_functions: Option<&'a FunctionRegistry>,
}

impl<'a> ValidationContext<'a> {
    pub fn new(value: Option<&'a Value>, data: &'a Value) -> Self {
        Self {
            value,
            data,
            custom_functions: None,
        }
    }

    pub fn with_functions(mut self, functions: &'a FunctionRegistry) -> Self {
        self.custom_functions = Some(functions);
        self
    }
}

/// Outcome of a single check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult {
    #[serde(rename = "fn")]
    pub function: String,
    pub valid: bool,
    pub message: String,
}

/// Outcome of a whole config
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub checks: Vec<CheckResult>,
}

impl ValidationResult {
    /// Result for a disabled or empty config
    pub fn passed() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            checks: Vec::new(),
        }
    }
}

// ============================================================================
// Built-in functions
// ============================================================================

const BUILTIN_FUNCTIONS: &[(&str, BuiltinFn)] = &[
    ("required", required),
    ("email", email),
    ("minLength", min_length),
    ("maxLength", max_length),
    ("pattern", pattern),
    ("min", min),
    ("max", max),
    ("numeric", numeric),
    ("url", url_check),
    ("matches", matches),
];

/// Names of the built-in check functions, in table order
pub fn builtin_function_names() -> impl Iterator<Item = &'static str> {
    BUILTIN_FUNCTIONS.iter().map(|(name, _)| *name)
}

fn builtin(name: &str) -> Option<BuiltinFn> {
    BUILTIN_FUNCTIONS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, f)| *f)
}

fn required(value: Option<&Value>, _args: &Map<String, Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        other => is_truthy(other),
    }
}

fn email(value: Option<&Value>, _args: &Map<String, Value>) -> bool {
    value
        .and_then(Value::as_str)
        .is_some_and(|s| EMAIL.is_match(s))
}

fn min_length(value: Option<&Value>, args: &Map<String, Value>) -> bool {
    match (value.and_then(Value::as_str), number_arg(args, "min")) {
        (Some(s), Some(min)) => s.chars().count() as f64 >= min,
        _ => false,
    }
}

fn max_length(value: Option<&Value>, args: &Map<String, Value>) -> bool {
    match (value.and_then(Value::as_str), number_arg(args, "max")) {
        (Some(s), Some(max)) => s.chars().count() as f64 <= max,
        _ => false,
    }
}

fn pattern(value: Option<&Value>, args: &Map<String, Value>) -> bool {
    let (Some(s), Some(source)) = (
        value.and_then(Value::as_str),
        args.get("pattern").and_then(Value::as_str),
    ) else {
        return false;
    };
    match Regex::new(source) {
        Ok(re) => re.is_match(s),
        Err(e) => {
            tracing::debug!("Invalid validation pattern {:?}: {}", source, e);
            false
        }
    }
}

fn min(value: Option<&Value>, args: &Map<String, Value>) -> bool {
    match (value.and_then(number), number_arg(args, "min")) {
        (Some(v), Some(min)) => v >= min,
        _ => false,
    }
}

fn max(value: Option<&Value>, args: &Map<String, Value>) -> bool {
    match (value.and_then(number), number_arg(args, "max")) {
        (Some(v), Some(max)) => v <= max,
        _ => false,
    }
}

fn numeric(value: Option<&Value>, _args: &Map<String, Value>) -> bool {
    match value {
        Some(Value::Number(_)) => true,
        Some(Value::String(s)) => s.trim().parse::<f64>().is_ok_and(f64::is_finite),
        _ => false,
    }
}

fn url_check(value: Option<&Value>, _args: &Map<String, Value>) -> bool {
    value
        .and_then(Value::as_str)
        .is_some_and(|s| url::Url::parse(s).is_ok())
}

fn matches(value: Option<&Value>, args: &Map<String, Value>) -> bool {
    strict_eq(value, args.get("other"))
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

fn number_arg(args: &Map<String, Value>, key: &str) -> Option<f64> {
    args.get(key).and_then(number)
}

// ============================================================================
// Running checks
// ============================================================================

/// Run one check against the context
pub fn run_validation_check(check: &ValidationCheck, ctx: &ValidationContext<'_>) -> CheckResult {
    let args: Map<String, Value> = check
        .args
        .iter()
        .flatten()
        .filter_map(|(k, v)| v.resolve(ctx.data).map(|resolved| (k.clone(), resolved)))
        .collect();

    let custom = ctx
        .custom_functions
        .and_then(|functions| functions.get(&check.function));

    let valid = match (custom, builtin(&check.function)) {
        (Some(f), _) => f(ctx.value, &args),
        (None, Some(f)) => f(ctx.value, &args),
        (None, None) => {
            tracing::warn!(
                "Unknown validation function {:?}, treating as valid",
                check.function
            );
            true
        }
    };

    CheckResult {
        function: check.function.clone(),
        valid,
        message: check.message.clone(),
    }
}

/// Run every check in the config
///
/// A config whose `enabled` expression evaluates false is never invalid.
pub fn run_validation(config: &ValidationConfig, ctx: &ValidationContext<'_>) -> ValidationResult {
    if let Some(enabled) = &config.enabled {
        if !evaluate_logic(enabled, &VisibilityContext::new(ctx.data)) {
            return ValidationResult::passed();
        }
    }

    let checks: Vec<CheckResult> = config
        .checks
        .iter()
        .map(|check| run_validation_check(check, ctx))
        .collect();

    let errors: Vec<String> = checks
        .iter()
        .filter(|c| !c.valid)
        .map(|c| c.message.clone())
        .collect();

    ValidationResult {
        valid: errors.is_empty(),
        errors,
        checks,
    }
}

// ============================================================================
// Per-field state tracking
// ============================================================================

/// Lifecycle state of one field, keyed by its data path
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FieldValidationState {
    pub touched: bool,
    pub validated: bool,
    pub result: Option<ValidationResult>,
}

/// Registered field configs, custom functions and per-field state
///
/// States are created on the first `touch`/`validate` for a path and removed
/// by `clear`.
#[derive(Default)]
pub struct FieldValidator {
    fields: HashMap<String, ValidationConfig>,
    states: HashMap<String, FieldValidationState>,
    functions: FunctionRegistry,
}

impl FieldValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_functions(functions: FunctionRegistry) -> Self {
        Self {
            functions,
            ..Self::default()
        }
    }

    /// Add or replace a custom check function
    pub fn register_function<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(Option<&Value>, &Map<String, Value>) -> bool + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(f));
    }

    /// Associate a config with a field path
    pub fn register_field(&mut self, path: impl Into<String>, config: ValidationConfig) {
        self.fields.insert(path.into(), config);
    }

    pub fn unregister_field(&mut self, path: &str) {
        self.fields.remove(path);
        self.states.remove(path);
    }

    /// Mark a field as touched without validating it
    pub fn touch(&mut self, path: &str) {
        self.states.entry(path.to_string()).or_default().touched = true;
    }

    /// Validate a registered field against the current data model
    ///
    /// Unregistered paths validate as passing.
    pub fn validate(&mut self, path: &str, data: &Value) -> ValidationResult {
        let config = self.fields.get(path).cloned().unwrap_or_default();
        self.validate_with(path, &config, data)
    }

    /// Validate a field against an explicit config and record the result
    pub fn validate_with(
        &mut self,
        path: &str,
        config: &ValidationConfig,
        data: &Value,
    ) -> ValidationResult {
        let ctx = ValidationContext::new(path::get(data, path), data).with_functions(&self.functions);
        let result = run_validation(config, &ctx);

        let state = self
            .states
            .entry(path.to_string())
            .or_insert_with(|| FieldValidationState {
                touched: true,
                ..Default::default()
            });
        state.validated = true;
        state.result = Some(result.clone());

        result
    }

    /// Validate every registered field; true when all pass
    pub fn validate_all(&mut self, data: &Value) -> bool {
        let mut paths: Vec<String> = self.fields.keys().cloned().collect();
        paths.sort();

        let mut all_valid = true;
        for path in paths {
            if !self.validate(&path, data).valid {
                all_valid = false;
            }
        }
        all_valid
    }

    /// Forget a field's state
    pub fn clear(&mut self, path: &str) {
        self.states.remove(path);
    }

    pub fn state(&self, path: &str) -> Option<&FieldValidationState> {
        self.states.get(path)
    }

    /// Error messages from the field's last validation
    pub fn errors(&self, path: &str) -> &[String] {
        self.states
            .get(path)
            .and_then(|s| s.result.as_ref())
            .map(|r| r.errors.as_slice())
            .unwrap_or(&[])
    }

    /// Names of the custom functions, sorted
    pub fn function_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

// ============================================================================
// Check builders
// ============================================================================

/// Constructors for the built-in checks
pub mod check {
    use super::ValidationCheck;
    use crate::dynamic::DynamicValue;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn build(function: &str, args: &[(&str, DynamicValue)], message: &str) -> ValidationCheck {
        ValidationCheck {
            function: function.to_string(),
            args: (!args.is_empty()).then(|| {
                args.iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect::<BTreeMap<_, _>>()
            }),
            message: message.to_string(),
        }
    }

    pub fn required(message: &str) -> ValidationCheck {
        build("required", &[], message)
    }

    pub fn email(message: &str) -> ValidationCheck {
        build("email", &[], message)
    }

    pub fn min_length(min: usize, message: &str) -> ValidationCheck {
        build("minLength", &[("min", json!(min).into())], message)
    }

    pub fn max_length(max: usize, message: &str) -> ValidationCheck {
        build("maxLength", &[("max", json!(max).into())], message)
    }

    pub fn pattern(pattern: &str, message: &str) -> ValidationCheck {
        build("pattern", &[("pattern", json!(pattern).into())], message)
    }

    pub fn min(min: f64, message: &str) -> ValidationCheck {
        build("min", &[("min", json!(min).into())], message)
    }

    pub fn max(max: f64, message: &str) -> ValidationCheck {
        build("max", &[("max", json!(max).into())], message)
    }

    pub fn numeric(message: &str) -> ValidationCheck {
        build("numeric", &[], message)
    }

    pub fn url(message: &str) -> ValidationCheck {
        build("url", &[], message)
    }

    /// Field must equal the value at `other_path`
    pub fn matches(other_path: &str, message: &str) -> ValidationCheck {
        build("matches", &[("other", DynamicValue::path(other_path))], message)
    }
}
