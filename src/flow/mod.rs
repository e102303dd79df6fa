//! The flow engine: one state cell, one message queue, one run loop.
//!
//! # Architecture
//!
//! ```text
//! dispatch(Message) ──→ queue ──→ drain ──→ message + sources ──→ commit ──→ subscribers
//!        ↑                                                                      │
//!        └────────────── async callbacks (fetch, timers, ...) ──────────────────┘
//! ```
//!
//! - **Message**: a payload or a one-shot update function
//! - **Source**: a function re-evaluated for every message
//! - **Patch**: what an evaluation asks to commit
//! - **View**: a subscriber that presents each new state

mod dispatcher;
mod engine;
mod message;
mod view;

pub use dispatcher::Dispatcher;
pub use engine::{create_flow, Flow, FlowBuilder, Listener, SubscriptionId};
pub use message::{Message, Source, SourceError, SourceResult, UpdateFn};
pub use view::{render, JsonLinesView, View};
