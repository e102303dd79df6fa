//! Lifecycle tagging for asynchronous operations.
//!
//! Each namespace gets a context under `state.loading[namespace]` that
//! moves from `loading` to either `success` or `errored`:
//!
//! ```text
//! mutate_to_loading ──→ { type: "loading" }
//!        │
//!        ├── on_success(result) ──→ { type: "success", kash: result }, state[ns] = result
//!        └── on_failure(error)  ──→ { type: "errored", kash: error }
//! ```

mod context;
mod mutators;

pub use context::{
    contexts, fallback_time_to_now, Clock, LifecycleContext, Status, SystemClock, ERRORED,
    LOADING, LOADING_KEY, OK, SECONDS,
};
pub use mutators::{mutate_to_failure, mutate_to_loading, mutate_to_success, Lifecycle};
