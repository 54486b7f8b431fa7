//! # chatter
//!
//! **chatter** is an in-process publish/subscribe event bus. Loosely-coupled
//! components announce events by name and other components react, without
//! either side holding a direct reference to the other.
//!
//! It provides:
//! - a pattern language for topics with wildcards ([`Identifier`]);
//! - lifecycle-aware declarative registration ([`Wired`] / [`Wiring`]);
//! - liveness-aware subscriber handles, so registering never keeps an
//!   object alive ([`SubscriberRef`]);
//! - an optional worker-thread pool for asynchronous dispatch with isolated
//!   error capture ([`WorkerPool`]).
//!
//! ## Architecture
//! ```text
//!   application code                      EventBus
//!   ────────────────                      ────────
//!   publish("job:done", args, kwargs) ──► followers["job"]  (registration order)
//!                                           │ per entry:
//!                                           ├─ Identifier match (wildcards)
//!                                           ├─ guard predicate (optional)
//!                                           ├─ SubscriberRef::resolve
//!                                           │    (dead ⇒ skipped silently)
//!                                           ▼
//!                                 pool empty?          pool active?
//!                                 run on caller's      enqueue to FIFO
//!                                 stack, errors        worker queue,
//!                                 propagate            errors captured
//!                                                      ──► drain_errors()
//! ```
//!
//! ## Execution modes
//! Chosen per dispatch from the current pool state, not per subscriber:
//!
//! | Pool      | Where handlers run      | Failure visibility                |
//! |-----------|-------------------------|-----------------------------------|
//! | empty     | publisher's call stack  | propagates out of `publish`       |
//! | non-empty | arbitrary worker thread | only via [`drain_errors`]         |
//!
//! ## Example
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use chatter::{follow, EventBus, Kwargs};
//!
//! let bus = EventBus::new();
//!
//! let greeted = Arc::new(AtomicUsize::new(0));
//! let seen = Arc::clone(&greeted);
//! follow(&bus, "greeting", move |ticket| {
//!     assert_eq!(ticket.named("who").and_then(|v| v.as_str()), Some("world"));
//!     seen.fetch_add(1, Ordering::SeqCst);
//!     Ok(())
//! });
//!
//! let kwargs = Kwargs::from([("who".to_string(), chatter::Value::from("world"))]);
//! bus.publish("greeting", vec![], kwargs)?;
//! assert_eq!(greeted.load(Ordering::SeqCst), 1);
//! # Ok::<(), chatter::BusError>(())
//! ```
//!
//! ## Guarantees and non-goals
//! - Best-effort delivery in registration order at dispatch time; nothing
//!   more. No persistence, no cross-process transport, no priorities.
//! - Dead subscriber entries stay registered and are skipped at each
//!   dispatch (accepted memory-growth trade-off).
//! - The hop counter on [`Ticket`] is advisory: `republish` decrements it,
//!   the bus never enforces a floor.

mod core;
mod error;
mod events;
mod subscribers;
mod wiring;

// ---- Public re-exports ----

pub use crate::core::{BusConfig, EventBus, WorkerPool};
pub use error::{BusError, CapturedError, HandlerError};
pub use events::{
    Identifier, Kwargs, MatchMode, Ticket, ACTION_CALL, ACTION_ENTRY, ACTION_EXIT,
};
pub use subscribers::{Guard, Handler, HandlerResult, SubscriberRef};
pub use wiring::{expose, follow, follow_when, Exposed, Wired, Wiring};

/// Payload value type for event arguments (re-exported from `serde_json`).
pub use serde_json::Value;

// ---- Process-wide bus convenience API ----

/// Publishes on the process-wide bus ([`EventBus::global`]).
pub fn publish(pattern: &str, args: Vec<Value>, kwargs: Kwargs) -> Result<(), BusError> {
    EventBus::global().publish(pattern, args, kwargs)
}

/// Sets the worker count on the process-wide bus; `0` disables async
/// dispatch and tears the pool down.
pub fn set_multiplicity(n: i64) -> Result<(), BusError> {
    EventBus::global().set_multiplicity(n)
}

/// Drains asynchronously captured failures from the process-wide bus.
pub fn drain_errors() -> Vec<CapturedError> {
    EventBus::global().drain_errors()
}
