//! Named actions: parameter resolution, confirmation, continuations
//!
//! An `Action` is declared in the tree as data. At dispatch time its params are
//! resolved against the data model into a `ResolvedAction`, the host may be asked
//! to confirm, and the registered handler runs. `onSuccess`/`onError` describe
//! what happens afterwards: navigation, data writes, or another action.
//!
//! Phases of one `execute` call:
//!
//! ```text
//!   Resolving ──▶ Confirming? ──▶ Executing ──▶ Chaining? ──▶ done
//!                     │               │
//!                     └─ cancel ──▶ Cancelled
//!                                     └─ handler error ──▶ onError / Handler
//! ```

use crate::data::SharedDataModel;
use crate::dynamic::{interpolate, DynamicValue};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::oneshot;

/// Placeholder in `onError.set` values replaced by the handler's error text
pub const ERROR_MESSAGE_PLACEHOLDER: &str = "$error.message";

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmVariant {
    #[default]
    Default,
    Danger,
}

/// Confirmation dialog shown before the handler runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionConfirm {
    pub title: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirm_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_label: Option<String>,
    #[serde(default)]
    pub variant: ConfirmVariant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionOnSuccess {
    /// Hand a path to the host's navigate callback
    Navigate(String),
    /// Write `path -> value` pairs into the data model
    Set(Map<String, Value>),
    /// Run another action by name, without params
    Action(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionOnError {
    /// Write pairs; the string `$error.message` is replaced by the error text
    Set(Map<String, Value>),
    Action(String),
}

/// An action as declared on an element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<BTreeMap<String, DynamicValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirm: Option<ActionConfirm>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_success: Option<ActionOnSuccess>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_error: Option<ActionOnError>,
}

impl Action {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: None,
            confirm: None,
            on_success: None,
            on_error: None,
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<DynamicValue>) -> Self {
        self.params
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn with_confirm(mut self, title: impl Into<String>, message: impl Into<String>) -> Self {
        self.confirm = Some(ActionConfirm {
            title: title.into(),
            message: message.into(),
            confirm_label: None,
            cancel_label: None,
            variant: ConfirmVariant::Default,
        });
        self
    }

    pub fn on_success(mut self, then: ActionOnSuccess) -> Self {
        self.on_success = Some(then);
        self
    }

    pub fn on_error(mut self, then: ActionOnError) -> Self {
        self.on_error = Some(then);
        self
    }
}

/// An action with params resolved and confirm text interpolated
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedAction {
    pub name: String,
    pub params: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirm: Option<ActionConfirm>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_success: Option<ActionOnSuccess>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_error: Option<ActionOnError>,
}

impl ResolvedAction {
    /// A bare chained action: no params, no confirmation, no continuations
    fn chained(name: &str) -> Self {
        Self {
            name: name.to_string(),
            params: Map::new(),
            confirm: None,
            on_success: None,
            on_error: None,
        }
    }
}

/// Resolve params and interpolate confirm text against `data`
///
/// Params whose reference is absent are left out of the resolved map.
pub fn resolve_action(action: &Action, data: &Value) -> ResolvedAction {
    let params = action
        .params
        .iter()
        .flatten()
        .filter_map(|(name, value)| value.resolve(data).map(|v| (name.clone(), v)))
        .collect();

    let confirm = action.confirm.as_ref().map(|confirm| ActionConfirm {
        title: interpolate(&confirm.title, data),
        message: interpolate(&confirm.message, data),
        ..confirm.clone()
    });

    ResolvedAction {
        name: action.name.clone(),
        params,
        confirm,
        on_success: action.on_success.clone(),
        on_error: action.on_error.clone(),
    }
}

// ============================================================================
// Handlers
// ============================================================================

pub type ActionHandler =
    Arc<dyn Fn(Map<String, Value>) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync>;

pub type NavigateFn = Arc<dyn Fn(&str) + Send + Sync>;

/// Action name -> async handler
#[derive(Clone, Default)]
pub struct ActionRegistry {
    handlers: HashMap<String, ActionHandler>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F, Fut>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(Map<String, Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        self.handlers
            .insert(name.into(), Arc::new(move |params| handler(params).boxed()));
    }

    pub fn get(&self, name: &str) -> Option<&ActionHandler> {
        self.handlers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("handlers", &self.names())
            .finish()
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    /// The confirmation was declined or superseded
    #[error("action '{0}' was cancelled")]
    Cancelled(String),

    /// The handler failed and no `onError` continuation absorbed it
    #[error("action '{action}' failed: {message}")]
    Handler { action: String, message: String },
}

// ============================================================================
// Executor
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum Phase {
    Resolving,
    Confirming,
    Executing,
    Chaining,
}

struct PendingConfirmation {
    action: ResolvedAction,
    reply: oneshot::Sender<bool>,
}

/// Removes the name from the loading set when dropped, even if the handler
/// future is dropped mid-flight
struct LoadingGuard<'a> {
    loading: &'a Mutex<HashSet<String>>,
    name: String,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        lock(self.loading).remove(&self.name);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Runs actions against a shared data model
///
/// Share it behind an `Arc` when actions are dispatched from several tasks; all
/// methods take `&self`.
pub struct ActionExecutor {
    registry: ActionRegistry,
    data: SharedDataModel,
    navigate: Option<NavigateFn>,
    loading: Mutex<HashSet<String>>,
    pending: Mutex<Option<PendingConfirmation>>,
}

impl ActionExecutor {
    pub fn new(registry: ActionRegistry, data: SharedDataModel) -> Self {
        Self {
            registry,
            data,
            navigate: None,
            loading: Mutex::new(HashSet::new()),
            pending: Mutex::new(None),
        }
    }

    pub fn with_navigate<F>(mut self, navigate: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.navigate = Some(Arc::new(navigate));
        self
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    pub fn data(&self) -> &SharedDataModel {
        &self.data
    }

    pub fn is_loading(&self, name: &str) -> bool {
        lock(&self.loading).contains(name)
    }

    /// Names of actions whose handlers are currently running, sorted
    pub fn loading_actions(&self) -> Vec<String> {
        let mut names: Vec<String> = lock(&self.loading).iter().cloned().collect();
        names.sort_unstable();
        names
    }

    /// The action waiting on `confirm()`/`cancel()`, if any
    pub fn pending_confirmation(&self) -> Option<ResolvedAction> {
        lock(&self.pending).as_ref().map(|p| p.action.clone())
    }

    /// Approve the pending confirmation; false when nothing is pending
    pub fn confirm(&self) -> bool {
        self.answer(true)
    }

    /// Decline the pending confirmation; false when nothing is pending
    pub fn cancel(&self) -> bool {
        self.answer(false)
    }

    fn answer(&self, approved: bool) -> bool {
        match lock(&self.pending).take() {
            Some(pending) => {
                tracing::debug!(action = %pending.action.name, approved, "Confirmation answered");
                // The waiting execute() may have been dropped; nothing to do then
                let _ = pending.reply.send(approved);
                true
            }
            None => false,
        }
    }

    /// Resolve and run `action`
    ///
    /// Returns the handler's value, or `None` when no handler is registered or
    /// an `onError` continuation absorbed the failure.
    pub async fn execute(&self, action: &Action) -> Result<Option<Value>, ActionError> {
        tracing::debug!(action = %action.name, phase = ?Phase::Resolving);
        let resolved = {
            let data = lock(&*self.data);
            resolve_action(action, data.as_value())
        };

        if !self.registry.contains(&resolved.name) {
            tracing::warn!("No handler registered for action '{}'", resolved.name);
            return Ok(None);
        }

        if resolved.confirm.is_some() {
            self.await_confirmation(&resolved).await?;
        }

        self.run(resolved).await
    }

    async fn await_confirmation(&self, action: &ResolvedAction) -> Result<(), ActionError> {
        tracing::debug!(action = %action.name, phase = ?Phase::Confirming);
        let (reply, answer) = oneshot::channel();
        let previous = lock(&self.pending).replace(PendingConfirmation {
            action: action.clone(),
            reply,
        });
        if let Some(previous) = previous {
            tracing::debug!(action = %previous.action.name, "Confirmation superseded");
            let _ = previous.reply.send(false);
        }

        match answer.await {
            Ok(true) => Ok(()),
            _ => Err(ActionError::Cancelled(action.name.clone())),
        }
    }

    fn run(&self, action: ResolvedAction) -> BoxFuture<'_, Result<Option<Value>, ActionError>> {
        async move {
            let Some(handler) = self.registry.get(&action.name).cloned() else {
                tracing::warn!("No handler registered for action '{}'", action.name);
                return Ok(None);
            };

            tracing::debug!(action = %action.name, phase = ?Phase::Executing);
            let result = {
                lock(&self.loading).insert(action.name.clone());
                let _guard = LoadingGuard {
                    loading: &self.loading,
                    name: action.name.clone(),
                };
                handler(action.params.clone()).await
            };

            match result {
                Ok(value) => {
                    if let Some(then) = &action.on_success {
                        self.on_success(then).await?;
                    }
                    Ok(Some(value))
                }
                Err(err) => {
                    let message = err.to_string();
                    tracing::warn!("Action '{}' failed: {:#}", action.name, err);
                    self.on_error(&action, message).await.map(|()| None)
                }
            }
        }
        .boxed()
    }

    async fn on_success(&self, then: &ActionOnSuccess) -> Result<(), ActionError> {
        match then {
            ActionOnSuccess::Navigate(path) => match &self.navigate {
                Some(navigate) => navigate(path),
                None => tracing::debug!("No navigate callback for '{}'", path),
            },
            ActionOnSuccess::Set(pairs) => self.write(pairs, None),
            ActionOnSuccess::Action(name) => {
                tracing::debug!(action = %name, phase = ?Phase::Chaining);
                self.run(ResolvedAction::chained(name)).await?;
            }
        }
        Ok(())
    }

    async fn on_error(&self, action: &ResolvedAction, message: String) -> Result<(), ActionError> {
        match &action.on_error {
            Some(ActionOnError::Set(pairs)) => {
                self.write(pairs, Some(&message));
                Ok(())
            }
            Some(ActionOnError::Action(name)) => {
                tracing::debug!(action = %name, phase = ?Phase::Chaining);
                self.run(ResolvedAction::chained(name)).await.map(|_| ())
            }
            None => Err(ActionError::Handler {
                action: action.name.clone(),
                message,
            }),
        }
    }

    fn write(&self, pairs: &Map<String, Value>, error_message: Option<&str>) {
        let mut data = lock(&*self.data);
        for (path, value) in pairs {
            let value = match (value, error_message) {
                (Value::String(s), Some(message)) if s == ERROR_MESSAGE_PLACEHOLDER => {
                    Value::String(message.to_string())
                }
                _ => value.clone(),
            };
            data.set(path, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DataModel;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn shared(value: Value) -> SharedDataModel {
        DataModel::from_value(value).into_shared()
    }

    async fn wait_for_confirmation(executor: &ActionExecutor) -> ResolvedAction {
        loop {
            if let Some(pending) = executor.pending_confirmation() {
                return pending;
            }
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn test_action_wire_form() {
        let action: Action = serde_json::from_value(json!({
            "name": "save",
            "params": {"id": {"path": "/form/id"}, "mode": "draft"},
            "confirm": {"title": "Save?", "message": "Really", "variant": "danger"},
            "onSuccess": {"navigate": "/done"},
            "onError": {"set": {"/form/error": "$error.message"}}
        }))
        .unwrap();

        assert_eq!(action.confirm.as_ref().unwrap().variant, ConfirmVariant::Danger);
        assert_eq!(action.on_success, Some(ActionOnSuccess::Navigate("/done".into())));
        assert!(matches!(action.on_error, Some(ActionOnError::Set(_))));
        assert_eq!(
            action.params.as_ref().unwrap()["id"],
            DynamicValue::path("/form/id")
        );
    }

    #[test]
    fn test_resolve_action() {
        let data = json!({"user": {"id": 7, "name": "Ada"}});
        let action = Action::new("delete")
            .with_param("id", json!({"path": "/user/id"}))
            .with_param("missing", json!({"path": "/nope"}))
            .with_param("hard", json!(true))
            .with_confirm("Delete ${/user/name}?", "User ${/user/id} and ${/nope} go away");

        let resolved = resolve_action(&action, &data);
        assert_eq!(Value::Object(resolved.params), json!({"id": 7, "hard": true}));
        let confirm = resolved.confirm.unwrap();
        assert_eq!(confirm.title, "Delete Ada?");
        assert_eq!(confirm.message, "User 7 and  go away");
    }

    #[tokio::test]
    async fn test_execute_passes_params_and_applies_success() {
        let mut registry = ActionRegistry::new();
        registry.register("greet", |params| async move {
            Ok(json!(format!("hello {}", params["who"].as_str().unwrap_or("?"))))
        });
        let data = shared(json!({"name": "Ada"}));
        let executor = ActionExecutor::new(registry, data.clone());

        let action = Action::new("greet")
            .with_param("who", json!({"path": "/name"}))
            .on_success(ActionOnSuccess::Set(
                json!({"/status": "done"}).as_object().unwrap().clone(),
            ));
        let value = executor.execute(&action).await.unwrap();

        assert_eq!(value, Some(json!("hello Ada")));
        assert_eq!(data.lock().unwrap().get("/status"), Some(&json!("done")));
        assert!(executor.loading_actions().is_empty());
    }

    #[tokio::test]
    async fn test_navigate_callback() {
        let mut registry = ActionRegistry::new();
        registry.register("go", |_| async { Ok(Value::Null) });
        let visited = Arc::new(Mutex::new(Vec::new()));
        let sink = visited.clone();
        let executor = ActionExecutor::new(registry, shared(json!({})))
            .with_navigate(move |path| sink.lock().unwrap().push(path.to_string()));

        executor
            .execute(&Action::new("go").on_success(ActionOnSuccess::Navigate("/next".into())))
            .await
            .unwrap();
        assert_eq!(*visited.lock().unwrap(), vec!["/next".to_string()]);
    }

    #[tokio::test]
    async fn test_cancel_rejects_without_loading() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut registry = ActionRegistry::new();
        registry.register("delete", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(Value::Null) }
        });
        let executor = Arc::new(ActionExecutor::new(registry, shared(json!({"n": 3}))));

        let task = {
            let executor = executor.clone();
            tokio::spawn(async move {
                let action = Action::new("delete").with_confirm("Delete", "${/n} items");
                executor.execute(&action).await
            })
        };

        let pending = wait_for_confirmation(&executor).await;
        assert_eq!(pending.confirm.unwrap().message, "3 items");
        assert!(!executor.is_loading("delete"));

        assert!(executor.cancel());
        let result = task.await.unwrap();
        assert_eq!(result, Err(ActionError::Cancelled("delete".into())));
        assert!(!executor.is_loading("delete"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!executor.cancel());
    }

    #[tokio::test]
    async fn test_confirm_runs_handler() {
        let mut registry = ActionRegistry::new();
        registry.register("delete", |_| async { Ok(json!("gone")) });
        let executor = Arc::new(ActionExecutor::new(registry, shared(json!({}))));

        let task = {
            let executor = executor.clone();
            tokio::spawn(async move {
                executor
                    .execute(&Action::new("delete").with_confirm("Sure?", "No undo"))
                    .await
            })
        };

        wait_for_confirmation(&executor).await;
        assert!(executor.confirm());
        assert_eq!(task.await.unwrap(), Ok(Some(json!("gone"))));
        assert!(executor.pending_confirmation().is_none());
    }

    #[tokio::test]
    async fn test_superseding_confirmation_cancels_previous() {
        let mut registry = ActionRegistry::new();
        registry.register("a", |_| async { Ok(json!("a")) });
        registry.register("b", |_| async { Ok(json!("b")) });
        let executor = Arc::new(ActionExecutor::new(registry, shared(json!({}))));

        let first = {
            let executor = executor.clone();
            tokio::spawn(async move {
                executor.execute(&Action::new("a").with_confirm("A", "")).await
            })
        };
        wait_for_confirmation(&executor).await;

        let second = {
            let executor = executor.clone();
            tokio::spawn(async move {
                executor.execute(&Action::new("b").with_confirm("B", "")).await
            })
        };

        assert_eq!(first.await.unwrap(), Err(ActionError::Cancelled("a".into())));
        assert_eq!(wait_for_confirmation(&executor).await.name, "b");
        executor.confirm();
        assert_eq!(second.await.unwrap(), Ok(Some(json!("b"))));
    }

    #[tokio::test]
    async fn test_loading_while_handler_runs() {
        let (release, gate) = oneshot::channel::<()>();
        let gate = Arc::new(Mutex::new(Some(gate)));
        let mut registry = ActionRegistry::new();
        registry.register("slow", move |_| {
            let gate = gate.lock().unwrap().take();
            async move {
                if let Some(gate) = gate {
                    let _ = gate.await;
                }
                Ok(Value::Null)
            }
        });
        let executor = Arc::new(ActionExecutor::new(registry, shared(json!({}))));

        let task = {
            let executor = executor.clone();
            tokio::spawn(async move { executor.execute(&Action::new("slow")).await })
        };

        while !executor.is_loading("slow") {
            tokio::task::yield_now().await;
        }
        assert_eq!(executor.loading_actions(), vec!["slow".to_string()]);

        release.send(()).unwrap();
        task.await.unwrap().unwrap();
        assert!(!executor.is_loading("slow"));
    }

    #[tokio::test]
    async fn test_error_set_substitutes_message() {
        let mut registry = ActionRegistry::new();
        registry.register("submit", |_| async { Err(anyhow::anyhow!("server said no")) });
        let data = shared(json!({}));
        let executor = ActionExecutor::new(registry, data.clone());

        let action = Action::new("submit").on_error(ActionOnError::Set(
            json!({"/form/error": "$error.message", "/form/failed": true})
                .as_object()
                .unwrap()
                .clone(),
        ));
        assert_eq!(executor.execute(&action).await, Ok(None));

        let data = data.lock().unwrap();
        assert_eq!(data.get("/form/error"), Some(&json!("server said no")));
        assert_eq!(data.get("/form/failed"), Some(&json!(true)));
        assert!(!executor.is_loading("submit"));
    }

    #[tokio::test]
    async fn test_error_without_continuation_propagates() {
        let mut registry = ActionRegistry::new();
        registry.register("submit", |_| async { Err(anyhow::anyhow!("boom")) });
        let executor = ActionExecutor::new(registry, shared(json!({})));

        let err = executor.execute(&Action::new("submit")).await.unwrap_err();
        assert_eq!(
            err,
            ActionError::Handler {
                action: "submit".into(),
                message: "boom".into()
            }
        );
        assert!(executor.loading_actions().is_empty());
    }

    #[tokio::test]
    async fn test_chained_actions() {
        let mut registry = ActionRegistry::new();
        registry.register("first", |_| async { Ok(json!(1)) });
        registry.register("fails", |_| async { Err(anyhow::anyhow!("nope")) });
        let data = shared(json!({}));
        {
            let data = data.clone();
            registry.register("record", move |params| {
                let data = data.clone();
                async move {
                    data.lock().unwrap().set("/recorded", Value::Object(params));
                    Ok(Value::Null)
                }
            });
        }
        let executor = ActionExecutor::new(registry, data.clone());

        executor
            .execute(&Action::new("first").on_success(ActionOnSuccess::Action("record".into())))
            .await
            .unwrap();
        assert_eq!(data.lock().unwrap().get("/recorded"), Some(&json!({})));

        data.lock().unwrap().remove("/recorded");
        let result = executor
            .execute(&Action::new("fails").on_error(ActionOnError::Action("record".into())))
            .await;
        assert_eq!(result, Ok(None));
        assert_eq!(data.lock().unwrap().get("/recorded"), Some(&json!({})));
    }

    #[tokio::test]
    async fn test_unregistered_action_is_skipped() {
        let executor = ActionExecutor::new(ActionRegistry::new(), shared(json!({})));
        assert_eq!(executor.execute(&Action::new("ghost")).await, Ok(None));
    }

    #[tokio::test]
    async fn test_unregistered_action_skips_confirmation() {
        let executor = ActionExecutor::new(ActionRegistry::new(), shared(json!({})));
        let action = Action::new("ghost").with_confirm("Really?", "This does nothing");

        let result = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            executor.execute(&action),
        )
        .await
        .expect("execute should not wait for a confirmation");
        assert_eq!(result, Ok(None));
        assert!(executor.pending_confirmation().is_none());
    }
}
