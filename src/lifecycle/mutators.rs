use std::sync::Arc;

use serde_json::{Map, Value};

use crate::flow::{Dispatcher, Message};
use crate::lifecycle::context::{contexts, Clock, LifecycleContext, SystemClock, LOADING_KEY};
use crate::merge::{update, MergeError};
use crate::state::State;

/// Lifecycle transitions for one namespace.
///
/// `loading` is a pure state transition; `on_success` and `on_failure`
/// build callbacks that route the outcome back into a flow through its
/// dispatcher, never touching state directly.
#[derive(Clone)]
pub struct Lifecycle {
    namespace: String,
    clock: Arc<dyn Clock>,
}

impl Lifecycle {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// `state` with `loading[namespace]` set to a fresh loading context.
    pub fn loading(&self, state: &State) -> Result<State, MergeError> {
        let context = contexts::loading(Value::Null, Some(self.clock.as_ref()));
        Ok(state.with(LOADING_KEY, self.tag(state, &context)?))
    }

    /// `state` with `loading[namespace]` set to an errored context.
    pub fn errored(&self, state: &State, error: Value) -> Result<State, MergeError> {
        let context = contexts::errored(error, Some(self.clock.as_ref()));
        Ok(state.with(LOADING_KEY, self.tag(state, &context)?))
    }

    /// `state` with `state[namespace] = result` and `loading[namespace]`
    /// set to a success context carrying the same result.
    pub fn succeeded(&self, state: &State, result: Value) -> Result<State, MergeError> {
        let context = contexts::success(result.clone(), Some(self.clock.as_ref()));
        let mut patch = Map::new();
        patch.insert(LOADING_KEY.to_string(), self.tag(state, &context)?);
        patch.insert(self.namespace.clone(), result);
        Ok(state.merge(&patch))
    }

    /// Callback that dispatches the errored transition for each error it
    /// receives.
    pub fn on_failure<E>(&self, dispatcher: Dispatcher) -> impl Fn(E) + Send + Sync + 'static
    where
        E: Into<Value> + 'static,
    {
        let lifecycle = self.clone();
        move |error: E| {
            let lifecycle = lifecycle.clone();
            let error = error.into();
            dispatcher.dispatch(Message::update(move |state, _| {
                Ok(Some(lifecycle.errored(state, error)?.into()))
            }));
        }
    }

    /// Callback that dispatches the success transition for each result it
    /// receives.
    pub fn on_success(&self, dispatcher: Dispatcher) -> impl Fn(Value) + Send + Sync + 'static {
        let lifecycle = self.clone();
        move |result: Value| {
            let lifecycle = lifecycle.clone();
            dispatcher.dispatch(Message::update(move |state, _| {
                Ok(Some(lifecycle.succeeded(state, result)?.into()))
            }));
        }
    }

    // loading[namespace] = context, other namespaces kept
    fn tag(&self, state: &State, context: &LifecycleContext) -> Result<Value, MergeError> {
        let mut slot = Map::new();
        slot.insert(self.namespace.clone(), context.to_value());
        let slot = Value::Object(slot);
        let loading = update([state.get(LOADING_KEY), Some(&slot)])?;
        Ok(Value::Object(loading))
    }
}

/// `state` with `loading[namespace]` marked as loading.
pub fn mutate_to_loading(namespace: &str, state: &State) -> Result<State, MergeError> {
    Lifecycle::new(namespace).loading(state)
}

/// Callback dispatching `loading[namespace] = errored(error)`.
pub fn mutate_to_failure<E>(
    namespace: &str,
    dispatcher: &Dispatcher,
) -> impl Fn(E) + Send + Sync + 'static
where
    E: Into<Value> + 'static,
{
    Lifecycle::new(namespace).on_failure(dispatcher.clone())
}

/// Callback dispatching `state[namespace] = result` together with
/// `loading[namespace] = success(result)`.
pub fn mutate_to_success(
    namespace: &str,
    dispatcher: &Dispatcher,
) -> impl Fn(Value) + Send + Sync + 'static {
    Lifecycle::new(namespace).on_success(dispatcher.clone())
}
