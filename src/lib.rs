//! A minimal unidirectional state engine.
//!
//! A [`Flow`] owns one immutable [`State`] and a FIFO queue of messages.
//! Registered sources are re-evaluated for every message, their patches
//! commit as new snapshots, and subscribers see each snapshot in order.
//! Asynchronous work re-enters only through a [`Dispatcher`], with its
//! progress tagged under `state.loading[namespace]` by the [`lifecycle`]
//! helpers and the [`fetch`] adapter.

pub mod config;
pub mod fetch;
pub mod flow;
pub mod lifecycle;
pub mod logging;
pub mod merge;
pub mod state;

pub use fetch::{configure_simple_fetch, simple_fetch, FetchError, RequestOptions, SimpleFetch};
pub use flow::{create_flow, render, Dispatcher, Flow, Message, Source, SourceError, SourceResult};
pub use lifecycle::{
    contexts, mutate_to_failure, mutate_to_loading, mutate_to_success, LifecycleContext, Status,
};
pub use merge::{update, MergeError};
pub use state::{Patch, State};
