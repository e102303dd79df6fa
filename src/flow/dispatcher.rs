use std::sync::Weak;

use crate::flow::engine::FlowInner;
use crate::flow::message::{Message, SourceResult};
use crate::state::State;

/// Handle used by sources and async callbacks to enqueue messages.
///
/// Holds only a weak reference, so callbacks parked inside long-running
/// tasks do not keep a dropped flow alive. Dispatching into a dropped flow
/// logs a warning and discards the message.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Weak<FlowInner>,
}

impl Dispatcher {
    pub(crate) fn new(inner: Weak<FlowInner>) -> Self {
        Self { inner }
    }

    /// Enqueue `message`, draining the queue if no drain is active.
    ///
    /// Returns false if the flow no longer exists.
    pub fn dispatch(&self, message: Message) -> bool {
        match self.inner.upgrade() {
            Some(inner) => {
                inner.on_new_message(message);
                true
            }
            None => {
                tracing::warn!(kind = message.kind(), "Dispatch to a dropped flow ignored");
                false
            }
        }
    }

    /// Shorthand for dispatching [`Message::update`].
    pub fn update<F>(&self, update: F) -> bool
    where
        F: FnOnce(&State, &Dispatcher) -> SourceResult + Send + 'static,
    {
        self.dispatch(Message::update(update))
    }

    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("alive", &self.is_alive())
            .finish()
    }
}
