//! Shared test utilities and mock infrastructure.

#![allow(dead_code, unused_imports)]

pub mod mock_backend;

use futures_core::future::BoxFuture;
use kashflow::fetch::{FetchError, RequestOptions, Transport};
use kashflow::flow::Flow;
use kashflow::lifecycle::Clock;
use kashflow::state::State;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// Clock that always reads `millis`.
pub fn fixed_clock(millis: u64) -> Arc<dyn Clock> {
    Arc::new(move || millis)
}

/// Subscribe a recorder to `flow`; the returned buffer holds every
/// committed state in notification order.
pub fn record_states(flow: &Flow) -> Arc<Mutex<Vec<State>>> {
    let states = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&states);
    flow.subscribe(move |state| sink.lock().push(state.clone()));
    states
}

/// Poll `check` until it holds or `timeout` elapses.
pub async fn wait_until<F>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}

/// In-process transport answering from a queue of canned outcomes.
#[derive(Default)]
pub struct StubTransport {
    outcomes: Mutex<VecDeque<(Duration, Result<Value, FetchError>)>>,
    calls: Mutex<Vec<(String, RequestOptions)>>,
}

impl StubTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, outcome: Result<Value, FetchError>) {
        self.respond_after(Duration::ZERO, outcome);
    }

    pub fn respond_after(&self, delay: Duration, outcome: Result<Value, FetchError>) {
        self.outcomes.lock().push_back((delay, outcome));
    }

    pub fn calls(&self) -> Vec<(String, RequestOptions)> {
        self.calls.lock().clone()
    }
}

impl Transport for StubTransport {
    fn request<'a>(
        &'a self,
        url: &'a str,
        options: &'a RequestOptions,
    ) -> BoxFuture<'a, Result<Value, FetchError>> {
        self.calls.lock().push((url.to_string(), options.clone()));
        let (delay, outcome) = self
            .outcomes
            .lock()
            .pop_front()
            .unwrap_or((Duration::ZERO, Err(FetchError::Transport("no canned outcome".to_string()))));
        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            outcome
        })
    }
}
