use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use crate::flow::dispatcher::Dispatcher;
use crate::flow::message::{Message, Source, SourceResult};
use crate::state::{Patch, State};

/// Callback notified with every newly committed state.
pub type Listener = Arc<dyn Fn(&State) + Send + Sync>;

/// Token returned by [`Flow::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// The state cell and its run loop.
///
/// A flow owns the current state and a FIFO queue of messages. Each
/// dispatched message is evaluated, followed by every registered source in
/// registration order, each against the latest committed state. Only one
/// drain runs at a time: dispatching while a drain is active (from a
/// source, a subscriber or another thread) only enqueues.
///
/// Cloning a `Flow` yields another handle to the same cell.
#[derive(Clone)]
pub struct Flow {
    inner: Arc<FlowInner>,
}

pub(crate) struct FlowInner {
    sources: Vec<Box<dyn Source>>,
    mailbox: Mutex<Mailbox>,
    state: RwLock<Option<State>>,
    subscribers: Mutex<Vec<Subscriber>>,
    next_subscription: AtomicU64,
    this: Weak<FlowInner>,
}

/// The queue and the draining flag share a lock so a message can never be
/// left behind between "queue is empty" and "drain finished".
struct Mailbox {
    pending: VecDeque<Message>,
    draining: bool,
}

struct Subscriber {
    id: SubscriptionId,
    listener: Listener,
}

/// Where an evaluated function came from, for log output.
#[derive(Debug, Clone, Copy)]
enum Origin {
    Message(&'static str),
    Source(usize),
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Message(kind) => write!(f, "{} message", kind),
            Origin::Source(index) => write!(f, "source #{}", index),
        }
    }
}

/// Build a flow from an ordered list of sources.
pub fn create_flow(sources: Vec<Box<dyn Source>>) -> Flow {
    Flow::new(sources)
}

impl Flow {
    pub fn new(sources: Vec<Box<dyn Source>>) -> Self {
        let inner = Arc::new_cyclic(|this| FlowInner {
            sources,
            mailbox: Mutex::new(Mailbox {
                pending: VecDeque::new(),
                draining: false,
            }),
            state: RwLock::new(None),
            subscribers: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(0),
            this: this.clone(),
        });
        Self { inner }
    }

    pub fn builder() -> FlowBuilder {
        FlowBuilder::default()
    }

    /// Seed the initial empty state `{}` through the run loop.
    ///
    /// Calling it again resets the state to `{}`.
    pub fn start(&self) {
        self.dispatch(Message::update(|_, _| Ok(Some(Patch::Replace(State::new())))));
    }

    /// Enqueue `message`, draining the queue unless a drain is active.
    pub fn dispatch(&self, message: Message) {
        self.inner.on_new_message(message);
    }

    /// Current snapshot; `None` until the first commit.
    pub fn get_state(&self) -> Option<State> {
        self.inner.state.read().clone()
    }

    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(Arc::downgrade(&self.inner))
    }

    /// Register a listener called synchronously after every commit, in
    /// registration order.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&State) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.inner.subscribers.lock().push(Subscriber {
            id,
            listener: Arc::new(listener),
        });
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.inner.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }

    pub fn source_count(&self) -> usize {
        self.inner.sources.len()
    }

    /// Whether a drain is in progress.
    pub fn is_draining(&self) -> bool {
        self.inner.mailbox.lock().draining
    }

    /// Number of messages waiting behind the active drain.
    pub fn pending_messages(&self) -> usize {
        self.inner.mailbox.lock().pending.len()
    }
}

impl fmt::Debug for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flow")
            .field("state", &self.get_state())
            .field("sources", &self.source_count())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl FlowInner {
    pub(crate) fn on_new_message(&self, message: Message) {
        {
            let mut mailbox = self.mailbox.lock();
            mailbox.pending.push_back(message);
            if mailbox.draining {
                tracing::trace!(pending = mailbox.pending.len(), "Drain active, message queued");
                return;
            }
            mailbox.draining = true;
        }

        // A panicking source must not leave the flow stuck in Draining.
        let _reset = scopeguard::guard_on_unwind((), |_| {
            self.mailbox.lock().draining = false;
        });

        let dispatcher = Dispatcher::new(self.this.clone());
        loop {
            let message = {
                let mut mailbox = self.mailbox.lock();
                match mailbox.pending.pop_front() {
                    Some(message) => message,
                    None => {
                        mailbox.draining = false;
                        break;
                    }
                }
            };

            let origin = Origin::Message(message.kind());
            self.evaluate(origin, |state| message.evaluate(state, &dispatcher));
            for (index, source) in self.sources.iter().enumerate() {
                self.evaluate(Origin::Source(index), |state| {
                    source.evaluate(state, &dispatcher)
                });
            }
        }
    }

    fn evaluate<F>(&self, origin: Origin, run: F)
    where
        F: FnOnce(&State) -> SourceResult,
    {
        let current = self.state.read().clone().unwrap_or_default();
        match run(&current) {
            Ok(Some(patch)) => self.commit(&current, patch),
            Ok(None) => {}
            Err(err) => {
                tracing::error!(
                    origin = %origin,
                    error = %err,
                    "Uncaught error while evaluating source"
                );
            }
        }
    }

    fn commit(&self, current: &State, patch: Patch) {
        let Some(next) = patch.apply(current) else {
            return;
        };
        *self.state.write() = Some(next.clone());
        tracing::debug!(state = %next, "Replacing state");

        // Snapshot so listeners may (un)subscribe while being notified.
        let listeners: Vec<Listener> = self
            .subscribers
            .lock()
            .iter()
            .map(|s| Arc::clone(&s.listener))
            .collect();
        for listener in listeners {
            listener(&next);
        }
    }
}

/// Incremental construction of a [`Flow`].
#[derive(Default)]
pub struct FlowBuilder {
    sources: Vec<Box<dyn Source>>,
}

impl FlowBuilder {
    /// Append a closure source.
    pub fn source<F>(mut self, source: F) -> Self
    where
        F: Fn(&State, &Dispatcher) -> SourceResult + Send + Sync + 'static,
    {
        self.sources.push(Box::new(source));
        self
    }

    /// Append any [`Source`] implementation.
    pub fn with_source(mut self, source: impl Source + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn build(self) -> Flow {
        Flow::new(self.sources)
    }
}
