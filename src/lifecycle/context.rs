use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::state::State;

/// One second in lifecycle-time units (milliseconds).
pub const SECONDS: u64 = 1000;

pub const OK: &str = "success";
pub const LOADING: &str = "loading";
pub const ERRORED: &str = "errored";

/// Key under which lifecycle contexts are stored in the state tree.
pub const LOADING_KEY: &str = "loading";

/// Source of lifecycle timestamps, in milliseconds since the Unix epoch.
///
/// Any `Fn() -> u64` closure is a clock, which keeps tests deterministic.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

impl<F> Clock for F
where
    F: Fn() -> u64 + Send + Sync,
{
    fn now_millis(&self) -> u64 {
        self()
    }
}

/// Read `clock`, or the system clock when none is given.
pub fn fallback_time_to_now(clock: Option<&dyn Clock>) -> u64 {
    match clock {
        Some(clock) => clock.now_millis(),
        None => SystemClock.now_millis(),
    }
}

/// Status tag of an asynchronous operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Loading,
    Errored,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Success => OK,
            Status::Loading => LOADING,
            Status::Errored => ERRORED,
        }
    }
}

/// Tagged outcome of one asynchronous operation.
///
/// Serialized as `{ "type": ..., "time": ..., "kash": ... }` inside
/// `state.loading[namespace]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleContext {
    #[serde(rename = "type")]
    pub status: Status,
    pub time: u64,
    #[serde(default)]
    pub kash: Value,
}

impl LifecycleContext {
    pub fn new(status: Status, kash: Value, clock: Option<&dyn Clock>) -> Self {
        Self {
            status,
            time: fallback_time_to_now(clock),
            kash,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == Status::Loading
    }

    pub fn is_settled(&self) -> bool {
        !self.is_loading()
    }

    pub fn to_value(&self) -> Value {
        json!({
            "type": self.status.as_str(),
            "time": self.time,
            "kash": self.kash,
        })
    }
}

/// One constructor per status tag.
pub mod contexts {
    use super::{Clock, LifecycleContext, Status};
    use serde_json::Value;

    pub fn success(result: Value, clock: Option<&dyn Clock>) -> LifecycleContext {
        LifecycleContext::new(Status::Success, result, clock)
    }

    pub fn loading(payload: Value, clock: Option<&dyn Clock>) -> LifecycleContext {
        LifecycleContext::new(Status::Loading, payload, clock)
    }

    pub fn errored(error: Value, clock: Option<&dyn Clock>) -> LifecycleContext {
        LifecycleContext::new(Status::Errored, error, clock)
    }
}

impl State {
    /// Parse `loading[namespace]` back into a typed context.
    ///
    /// Returns `None` when the slot is missing or not shaped like a context.
    pub fn lifecycle(&self, namespace: &str) -> Option<LifecycleContext> {
        let slot = self.get(LOADING_KEY)?.get(namespace)?;
        serde_json::from_value(slot.clone()).ok()
    }
}
