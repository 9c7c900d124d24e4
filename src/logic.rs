//! Logic expressions and visibility conditions
//!
//! Expressions are JSON objects with a single operator key:
//!
//! ```text
//! {"path": "/flag"}                      truthy check
//! {"eq": [{"path": "/role"}, "admin"]}   strict equality (also "neq")
//! {"gt": [{"path": "/age"}, 17]}         numeric comparison (gt/gte/lt/lte)
//! {"and": [expr, ...]} {"or": [expr, ...]} {"not": expr}
//! ```
//!
//! Visibility conditions additionally accept a bare boolean and
//! `{"auth": "signedIn" | "signedOut"}`.
//!
//! Operators are looked up in a fixed order (`auth`, `and`, `or`, `not`,
//! `path`, then the comparisons), so an object carrying several operator keys
//! resolves to the first one found. A visibility condition that matches no
//! operator is kept verbatim and evaluates to hidden.
//!
//! Comparisons fail closed: when either operand does not resolve to a number,
//! `gt`/`gte`/`lt`/`lte` evaluate to `false` rather than erroring.

use crate::dynamic::{is_truthy, strict_eq, DynamicValue};
use crate::path;
use crate::util::preview;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// Expression AST
// ============================================================================

/// Boolean expression over the data model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "Value")]
pub enum LogicExpression {
    And(Vec<LogicExpression>),
    Or(Vec<LogicExpression>),
    Not(Box<LogicExpression>),
    Path(String),
    Eq([DynamicValue; 2]),
    Neq([DynamicValue; 2]),
    Gt([DynamicValue; 2]),
    Gte([DynamicValue; 2]),
    Lt([DynamicValue; 2]),
    Lte([DynamicValue; 2]),
}

/// Visibility condition attached to an element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged, from = "Value")]
pub enum VisibilityCondition {
    Bool(bool),
    Auth(AuthCondition),
    Logic(LogicExpression),
    /// Unrecognised condition, kept as received; never visible
    Invalid(Value),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid logic expression: {0}")]
pub struct LogicParseError(String);

type Comparison = fn([DynamicValue; 2]) -> LogicExpression;

const COMPARISONS: &[(&str, Comparison)] = &[
    ("eq", LogicExpression::Eq),
    ("neq", LogicExpression::Neq),
    ("gt", LogicExpression::Gt),
    ("gte", LogicExpression::Gte),
    ("lt", LogicExpression::Lt),
    ("lte", LogicExpression::Lte),
];

impl LogicExpression {
    /// Parse the JSON form, taking the first operator key in precedence order
    pub fn parse(value: &Value) -> Result<Self, LogicParseError> {
        let map = value
            .as_object()
            .ok_or_else(|| LogicParseError(format!("expected an object, got {}", value)))?;

        if let Some(items) = map.get("and") {
            return Ok(Self::And(parse_list(items, "and")?));
        }
        if let Some(items) = map.get("or") {
            return Ok(Self::Or(parse_list(items, "or")?));
        }
        if let Some(inner) = map.get("not") {
            return Ok(Self::Not(Box::new(Self::parse(inner)?)));
        }
        if let Some(p) = map.get("path") {
            return p
                .as_str()
                .map(|p| Self::Path(p.to_string()))
                .ok_or_else(|| LogicParseError("\"path\" must be a string".into()));
        }
        for (op, build) in COMPARISONS {
            if let Some(operands) = map.get(*op) {
                return operand_pair(operands, op).map(build);
            }
        }

        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        Err(LogicParseError(format!("no known operator among {:?}", keys)))
    }
}

fn parse_list(items: &Value, op: &str) -> Result<Vec<LogicExpression>, LogicParseError> {
    items
        .as_array()
        .ok_or_else(|| LogicParseError(format!("\"{}\" takes an array", op)))?
        .iter()
        .map(LogicExpression::parse)
        .collect()
}

fn operand_pair(operands: &Value, op: &str) -> Result<[DynamicValue; 2], LogicParseError> {
    match operands.as_array().map(Vec::as_slice) {
        Some([a, b]) => Ok([a.clone().into(), b.clone().into()]),
        _ => Err(LogicParseError(format!("\"{}\" takes exactly two operands", op))),
    }
}

impl TryFrom<Value> for LogicExpression {
    type Error = LogicParseError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Value> for VisibilityCondition {
    fn from(value: Value) -> Self {
        if let Value::Bool(b) = value {
            return Self::Bool(b);
        }
        if let Some(auth) = value.get("auth") {
            return match AuthRequirement::deserialize(auth) {
                Ok(auth) => Self::Auth(AuthCondition { auth }),
                Err(e) => {
                    tracing::warn!("Invalid auth condition ({}), hiding element", e);
                    Self::Invalid(value)
                }
            };
        }
        match LogicExpression::parse(&value) {
            Ok(expr) => Self::Logic(expr),
            Err(e) => {
                tracing::warn!("{}, hiding element: {}", e, preview(&value.to_string()));
                Self::Invalid(value)
            }
        }
    }
}

/// `{"auth": "signedIn"}` leaf
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthCondition {
    pub auth: AuthRequirement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthRequirement {
    SignedIn,
    SignedOut,
}

/// Authentication flag supplied by the host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuthState {
    pub signed_in: bool,
}

impl AuthState {
    pub fn signed_in() -> Self {
        Self { signed_in: true }
    }

    pub fn signed_out() -> Self {
        Self { signed_in: false }
    }
}

/// Everything an expression may consult
#[derive(Debug, Clone, Copy)]
pub struct VisibilityContext<'a> {
    pub data: &'a Value,
    pub auth: AuthState,
}

impl<'a> VisibilityContext<'a> {
    pub fn new(data: &'a Value) -> Self {
        Self {
            data,
            auth: AuthState::default(),
        }
    }

    pub fn with_auth(mut self, auth: AuthState) -> Self {
        self.auth = auth;
        self
    }
}

// ============================================================================
// Evaluation
// ============================================================================

/// Evaluate a logic expression against the data model
pub fn evaluate_logic(expr: &LogicExpression, ctx: &VisibilityContext<'_>) -> bool {
    match expr {
        LogicExpression::And(items) => items.iter().all(|e| evaluate_logic(e, ctx)),
        LogicExpression::Or(items) => items.iter().any(|e| evaluate_logic(e, ctx)),
        LogicExpression::Not(inner) => !evaluate_logic(inner, ctx),
        LogicExpression::Path(p) => is_truthy(path::get(ctx.data, p)),
        LogicExpression::Eq([a, b]) => {
            strict_eq(a.resolve(ctx.data).as_ref(), b.resolve(ctx.data).as_ref())
        }
        LogicExpression::Neq([a, b]) => {
            !strict_eq(a.resolve(ctx.data).as_ref(), b.resolve(ctx.data).as_ref())
        }
        LogicExpression::Gt(pair) => compare(pair, ctx, |l, r| l > r),
        LogicExpression::Gte(pair) => compare(pair, ctx, |l, r| l >= r),
        LogicExpression::Lt(pair) => compare(pair, ctx, |l, r| l < r),
        LogicExpression::Lte(pair) => compare(pair, ctx, |l, r| l <= r),
    }
}

fn compare(
    [a, b]: &[DynamicValue; 2],
    ctx: &VisibilityContext<'_>,
    op: impl Fn(f64, f64) -> bool,
) -> bool {
    match (as_number(a.resolve(ctx.data)), as_number(b.resolve(ctx.data))) {
        (Some(l), Some(r)) => op(l, r),
        _ => false,
    }
}

fn as_number(value: Option<Value>) -> Option<f64> {
    match value {
        Some(Value::Number(n)) => n.as_f64(),
        _ => None,
    }
}

/// Evaluate an optional visibility condition; absence means visible
pub fn evaluate_visibility(
    condition: Option<&VisibilityCondition>,
    ctx: &VisibilityContext<'_>,
) -> bool {
    let Some(condition) = condition else {
        return true;
    };

    match condition {
        VisibilityCondition::Bool(b) => *b,
        VisibilityCondition::Auth(AuthCondition { auth }) => match auth {
            AuthRequirement::SignedIn => ctx.auth.signed_in,
            AuthRequirement::SignedOut => !ctx.auth.signed_in,
        },
        VisibilityCondition::Logic(expr) => evaluate_logic(expr, ctx),
        VisibilityCondition::Invalid(_) => false,
    }
}

// ============================================================================
// Builders
// ============================================================================

impl LogicExpression {
    /// Truthy when the value at `path` is truthy
    pub fn when(path: impl Into<String>) -> Self {
        Self::Path(path.into())
    }

    /// Truthy when the value at `path` is falsy
    pub fn unless(path: impl Into<String>) -> Self {
        Self::Not(Box::new(Self::when(path)))
    }

    pub fn eq(a: impl Into<DynamicValue>, b: impl Into<DynamicValue>) -> Self {
        Self::Eq([a.into(), b.into()])
    }

    pub fn neq(a: impl Into<DynamicValue>, b: impl Into<DynamicValue>) -> Self {
        Self::Neq([a.into(), b.into()])
    }

    pub fn gt(a: impl Into<DynamicValue>, b: impl Into<DynamicValue>) -> Self {
        Self::Gt([a.into(), b.into()])
    }

    pub fn gte(a: impl Into<DynamicValue>, b: impl Into<DynamicValue>) -> Self {
        Self::Gte([a.into(), b.into()])
    }

    pub fn lt(a: impl Into<DynamicValue>, b: impl Into<DynamicValue>) -> Self {
        Self::Lt([a.into(), b.into()])
    }

    pub fn lte(a: impl Into<DynamicValue>, b: impl Into<DynamicValue>) -> Self {
        Self::Lte([a.into(), b.into()])
    }

    pub fn and(items: impl IntoIterator<Item = LogicExpression>) -> Self {
        Self::And(items.into_iter().collect())
    }

    pub fn or(items: impl IntoIterator<Item = LogicExpression>) -> Self {
        Self::Or(items.into_iter().collect())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(inner: LogicExpression) -> Self {
        Self::Not(Box::new(inner))
    }
}

impl VisibilityCondition {
    pub fn always() -> Self {
        Self::Bool(true)
    }

    pub fn never() -> Self {
        Self::Bool(false)
    }

    pub fn signed_in() -> Self {
        Self::Auth(AuthCondition {
            auth: AuthRequirement::SignedIn,
        })
    }

    pub fn signed_out() -> Self {
        Self::Auth(AuthCondition {
            auth: AuthRequirement::SignedOut,
        })
    }
}

impl From<LogicExpression> for VisibilityCondition {
    fn from(expr: LogicExpression) -> Self {
        Self::Logic(expr)
    }
}

impl From<bool> for VisibilityCondition {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(v: Value) -> LogicExpression {
        serde_json::from_value(v).expect("valid expression")
    }

    #[test]
    fn test_parse_wire_forms() {
        assert_eq!(parse(json!({"path": "/a"})), LogicExpression::when("/a"));
        assert_eq!(
            parse(json!({"eq": [{"path": "/role"}, "admin"]})),
            LogicExpression::eq(DynamicValue::path("/role"), json!("admin"))
        );
        assert_eq!(
            parse(json!({"and": [{"path": "/a"}, {"not": {"path": "/b"}}]})),
            LogicExpression::and([LogicExpression::when("/a"), LogicExpression::unless("/b")])
        );
    }

    #[test]
    fn test_path_is_truthy_cast() {
        let data = json!({"on": true, "zero": 0, "name": "x"});
        let ctx = VisibilityContext::new(&data);
        assert!(evaluate_logic(&LogicExpression::when("/on"), &ctx));
        assert!(!evaluate_logic(&LogicExpression::when("/zero"), &ctx));
        assert!(evaluate_logic(&LogicExpression::when("/name"), &ctx));
        assert!(!evaluate_logic(&LogicExpression::when("/missing"), &ctx));
    }

    #[test]
    fn test_numeric_comparisons_are_strict_and_exclusive() {
        let data = json!({"n": 5});
        let ctx = VisibilityContext::new(&data);
        for other in [3, 5, 8] {
            let n = DynamicValue::path("/n");
            let gt = evaluate_logic(&LogicExpression::gt(n.clone(), json!(other)), &ctx);
            let lt = evaluate_logic(&LogicExpression::lt(n.clone(), json!(other)), &ctx);
            let eq = evaluate_logic(&LogicExpression::eq(n.clone(), json!(other)), &ctx);
            assert_eq!([gt, lt, eq].iter().filter(|b| **b).count(), 1, "n vs {}", other);
            assert_eq!(
                evaluate_logic(&LogicExpression::gte(n.clone(), json!(other)), &ctx),
                gt || eq
            );
            assert_eq!(
                evaluate_logic(&LogicExpression::lte(n, json!(other)), &ctx),
                lt || eq
            );
        }
    }

    #[test]
    fn test_non_numeric_comparisons_are_false() {
        let data = json!({"s": "10", "missing": null});
        let ctx = VisibilityContext::new(&data);
        for operand in [DynamicValue::path("/s"), DynamicValue::path("/missing")] {
            for expr in [
                LogicExpression::gt(operand.clone(), json!(1)),
                LogicExpression::gte(operand.clone(), json!(1)),
                LogicExpression::lt(operand.clone(), json!(1)),
                LogicExpression::lte(operand.clone(), json!(1)),
            ] {
                assert!(!evaluate_logic(&expr, &ctx), "{:?}", expr);
            }
        }
    }

    #[test]
    fn test_eq_neq_strict() {
        let data = json!({"role": "admin", "count": 1});
        let ctx = VisibilityContext::new(&data);
        assert!(evaluate_logic(
            &LogicExpression::eq(DynamicValue::path("/role"), json!("admin")),
            &ctx
        ));
        assert!(evaluate_logic(
            &LogicExpression::neq(DynamicValue::path("/count"), json!("1")),
            &ctx
        ));
        assert!(evaluate_logic(
            &LogicExpression::eq(DynamicValue::path("/nope"), Value::Null),
            &ctx
        ));
    }

    #[test]
    fn test_empty_and_or() {
        let data = json!({});
        let ctx = VisibilityContext::new(&data);
        assert!(evaluate_logic(&LogicExpression::and([]), &ctx));
        assert!(!evaluate_logic(&LogicExpression::or([]), &ctx));
    }

    #[test]
    fn test_absent_visibility_is_visible() {
        let data = json!({});
        for auth in [AuthState::signed_in(), AuthState::signed_out()] {
            let ctx = VisibilityContext::new(&data).with_auth(auth);
            assert!(evaluate_visibility(None, &ctx));
        }
    }

    #[test]
    fn test_visibility_forms() {
        let data = json!({"flag": false});
        let ctx = VisibilityContext::new(&data).with_auth(AuthState::signed_in());

        let cond: VisibilityCondition = serde_json::from_value(json!(false)).unwrap();
        assert!(!evaluate_visibility(Some(&cond), &ctx));

        let cond: VisibilityCondition =
            serde_json::from_value(json!({"auth": "signedIn"})).unwrap();
        assert_eq!(cond, VisibilityCondition::signed_in());
        assert!(evaluate_visibility(Some(&cond), &ctx));
        assert!(!evaluate_visibility(
            Some(&VisibilityCondition::signed_out()),
            &ctx
        ));

        let cond: VisibilityCondition = serde_json::from_value(json!({"path": "/flag"})).unwrap();
        assert!(!evaluate_visibility(Some(&cond), &ctx));

        // auth is not a logic operand, so nesting it inside `or` leaves the element hidden
        let raw = json!({"or": [{"path": "/flag"}, {"auth": "signedIn"}]});
        let cond: VisibilityCondition = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(cond, VisibilityCondition::Invalid(raw));
        assert!(!evaluate_visibility(Some(&cond), &ctx));
    }

    #[test]
    fn test_and_or_take_precedence_over_path() {
        let data = json!({"x": true, "y": false});
        let ctx = VisibilityContext::new(&data);

        let cond: VisibilityCondition =
            serde_json::from_value(json!({"and": [{"path": "/x"}], "path": "/y"})).unwrap();
        assert_eq!(
            cond,
            VisibilityCondition::Logic(LogicExpression::and([LogicExpression::when("/x")]))
        );
        assert!(evaluate_visibility(Some(&cond), &ctx));

        assert_eq!(
            parse(json!({"path": "/y", "or": [{"path": "/y"}]})),
            LogicExpression::or([LogicExpression::when("/y")])
        );
        assert_eq!(
            parse(json!({"not": {"path": "/x"}, "eq": [1, 1]})),
            LogicExpression::unless("/x")
        );
    }

    #[test]
    fn test_unknown_operator_fails_closed() {
        let data = json!({"x": true});
        let ctx = VisibilityContext::new(&data);

        for raw in [
            json!({"xor": [{"path": "/x"}]}),
            json!({"eq": [1]}),
            json!({"and": [{"path": "/x"}, {"bogus": 1}]}),
            json!({"auth": "admin"}),
            json!("visible"),
        ] {
            let cond: VisibilityCondition = serde_json::from_value(raw.clone()).unwrap();
            assert_eq!(cond, VisibilityCondition::Invalid(raw));
            assert!(!evaluate_visibility(Some(&cond), &ctx));
        }

        assert!(serde_json::from_value::<LogicExpression>(json!({"xor": []})).is_err());
    }

    #[test]
    fn test_invalid_condition_serializes_verbatim() {
        let raw = json!({"xor": [{"path": "/x"}]});
        let cond = VisibilityCondition::from(raw.clone());
        assert_eq!(serde_json::to_value(&cond).unwrap(), raw);
        assert_eq!(
            serde_json::to_value(LogicExpression::when("/a")).unwrap(),
            json!({"path": "/a"})
        );
    }
}
