use std::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::flow::Dispatcher;
use crate::merge::MergeError;
use crate::state::{Patch, State};

/// Errors returned by a source or update function during a drain pass.
///
/// The run loop logs these and moves on to the next source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Merge failed: {0}")]
    Merge(#[from] MergeError),

    #[error("Unexpected state shape: {0}")]
    InvalidState(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Failed(String),
}

/// Outcome of evaluating one source: a patch to commit, `None` for no
/// change, or an error.
pub type SourceResult = Result<Option<Patch>, SourceError>;

/// A state-producing function registered with a flow.
///
/// Every source is re-evaluated for every message, in registration order,
/// against the latest committed state.
pub trait Source: Send + Sync {
    fn evaluate(&self, state: &State, dispatcher: &Dispatcher) -> SourceResult;
}

impl<F> Source for F
where
    F: Fn(&State, &Dispatcher) -> SourceResult + Send + Sync,
{
    fn evaluate(&self, state: &State, dispatcher: &Dispatcher) -> SourceResult {
        self(state, dispatcher)
    }
}

/// One-shot function of the current state, evaluated inside the run loop.
pub type UpdateFn = Box<dyn FnOnce(&State, &Dispatcher) -> SourceResult + Send>;

/// An entry in a flow's queue.
pub enum Message {
    /// Opaque payload; it only triggers a pass over the sources.
    Payload(Value),
    /// Deferred update evaluated against the state current at its turn.
    Update(UpdateFn),
}

impl Message {
    pub fn payload(payload: impl Into<Value>) -> Self {
        Message::Payload(payload.into())
    }

    pub fn update<F>(update: F) -> Self
    where
        F: FnOnce(&State, &Dispatcher) -> SourceResult + Send + 'static,
    {
        Message::Update(Box::new(update))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Message::Payload(_) => "payload",
            Message::Update(_) => "update",
        }
    }

    pub(crate) fn evaluate(self, state: &State, dispatcher: &Dispatcher) -> SourceResult {
        match self {
            Message::Payload(payload) => {
                tracing::trace!(%payload, "payload message has no update of its own");
                Ok(None)
            }
            Message::Update(update) => update(state, dispatcher),
        }
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Payload(payload) => f.debug_tuple("Payload").field(payload).finish(),
            Message::Update(_) => f.write_str("Update(..)"),
        }
    }
}

impl From<Value> for Message {
    fn from(payload: Value) -> Self {
        Message::Payload(payload)
    }
}
